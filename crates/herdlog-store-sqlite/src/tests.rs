//! Integration tests for `SqliteStore` against an in-memory database.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use herdlog_core::{
  Analytics, AnalyticsConfig, AnimalIdentity, Tag,
  animal::Herd,
  answer::NewAnswer,
  milk::DateRange,
  records::{LactationSample, MilkRecord, MotherCalfLink},
  store::HerdStore,
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  let s = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");
  s.install_default_registry().await.expect("registry");
  s
}

fn cow(number: &str) -> AnimalIdentity { AnimalIdentity::new(3, 1, number).unwrap() }

fn at(month: u32, day: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, month, day, 6, 30, 0).unwrap()
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

async fn answer(
  s: &SqliteStore,
  animal: &AnimalIdentity,
  tag: Tag,
  value: &str,
  when: DateTime<Utc>,
) -> Uuid {
  let written = s
    .record_answers_at(vec![NewAnswer::new(animal.clone(), tag.id(), value)], when)
    .await
    .unwrap();
  written[0].answer_id
}

fn milk(number: &str, on: NaiveDate, morning: f64, evening: f64) -> MilkRecord {
  MilkRecord {
    owner_id:       3,
    animal_type_id: 1,
    animal_number:  number.into(),
    record_date:    on,
    morning_qty:    morning,
    evening_qty:    evening,
  }
}

// ─── Registry ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn default_registry_covers_every_tag() {
  let s = store().await;
  s.install_default_registry().await.unwrap();
  let engine = Analytics::new(Arc::new(s));
  let registry = engine.verify_registry().await.unwrap();
  assert_eq!(registry.resolve(66).unwrap(), Tag::DeliveryDate);
}

#[tokio::test]
async fn empty_registry_fails_verification() {
  let s = SqliteStore::open_in_memory().await.unwrap();
  s.register_tag(Tag::Sex).await.unwrap();
  let engine = Analytics::new(Arc::new(s));
  let err = engine.verify_registry().await.unwrap_err();
  assert!(matches!(err, herdlog_core::Error::MissingTags(_)));
}

#[tokio::test]
async fn answers_to_unknown_questions_are_rejected_whole() {
  let s = store().await;
  let batch = vec![
    NewAnswer::new(cow("A1"), Tag::Sex.id(), "female"),
    NewAnswer::new(cow("A1"), 9_999, "?"),
  ];
  let err = s.record_answers(batch).await.unwrap_err();
  assert!(matches!(err, Error::UnknownQuestion(9_999)));
  assert!(s.animal_numbers(Herd::new(3, 1).unwrap()).await.unwrap().is_empty());
}

#[tokio::test]
async fn custom_question_maps_to_its_tag() {
  let s = store().await;
  s.add_question(412, Tag::Pregnant, Some("Is she in calf?".into()))
    .await
    .unwrap();
  s.record_answers_at(vec![NewAnswer::new(cow("A1"), 412, "yes")], at(2, 1))
    .await
    .unwrap();
  let found = s.latest_answer(&cow("A1"), Tag::Pregnant).await.unwrap().unwrap();
  assert_eq!(found.question_id, 412);
  assert!(found.is_yes());
}

// ─── Answers ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn latest_answer_is_newest_live_event() {
  let s = store().await;
  let a = cow("A1");
  answer(&s, &a, Tag::Pregnant, "no", at(1, 1)).await;
  answer(&s, &a, Tag::Pregnant, "yes", at(3, 1)).await;
  let newest = answer(&s, &a, Tag::Pregnant, "no", at(5, 1)).await;
  s.tombstone_answer(newest).await.unwrap();

  let found = s.latest_answer(&a, Tag::Pregnant).await.unwrap().unwrap();
  assert_eq!(found.value, "yes");
  assert_eq!(found.created_at, at(3, 1));

  // Repeated reads agree.
  let again = s.latest_answer(&a, Tag::Pregnant).await.unwrap().unwrap();
  assert_eq!(again.answer_id, found.answer_id);
}

#[tokio::test]
async fn equal_timestamps_resolve_to_last_insert() {
  let s = store().await;
  let a = cow("A1");
  answer(&s, &a, Tag::Sex, "male", at(1, 1)).await;
  answer(&s, &a, Tag::Sex, "female", at(1, 1)).await;
  let found = s.latest_answer(&a, Tag::Sex).await.unwrap().unwrap();
  assert_eq!(found.value, "female");

  let batch = s.latest_answers(&a, &[Tag::Sex]).await.unwrap();
  assert_eq!(batch.value(Tag::Sex), "female");
}

#[tokio::test]
async fn latest_answers_matches_per_tag_lookups() {
  let s = store().await;
  let a = cow("A1");
  answer(&s, &a, Tag::Sex, "female", at(1, 1)).await;
  answer(&s, &a, Tag::Lactating, "no", at(1, 1)).await;
  answer(&s, &a, Tag::Lactating, "yes", at(2, 1)).await;
  answer(&s, &cow("B2"), Tag::Pregnant, "yes", at(2, 1)).await;

  let batch = s.latest_answers(&a, &Tag::CLASSIFICATION).await.unwrap();
  assert_eq!(batch.len(), 2);
  for tag in Tag::CLASSIFICATION {
    let single = s.latest_answer(&a, tag).await.unwrap();
    assert_eq!(batch.get(tag).map(|e| e.answer_id), single.map(|e| e.answer_id));
  }
}

#[tokio::test]
async fn batch_shares_timestamp_and_answer_at_finds_it() {
  let s = store().await;
  let a = cow("D1");
  let written = s
    .record_answers_at(
      vec![
        NewAnswer::new(a.clone(), Tag::DateOfAi.id(), "2024-04-09"),
        NewAnswer::new(a.clone(), Tag::BullNumber.id(), "HF-221"),
      ],
      at(4, 9),
    )
    .await
    .unwrap();
  assert_eq!(written[0].created_at, written[1].created_at);

  let bull = s.answer_at(&a, Tag::BullNumber, at(4, 9)).await.unwrap();
  assert_eq!(bull.unwrap().value, "HF-221");
  assert!(s.answer_at(&a, Tag::BullNumber, at(4, 10)).await.unwrap().is_none());
}

#[tokio::test]
async fn history_is_newest_first_without_tombstones() {
  let s = store().await;
  let a = cow("A1");
  answer(&s, &a, Tag::HeatDate, "h1", at(1, 1)).await;
  let gone = answer(&s, &a, Tag::HeatDate, "h2", at(2, 1)).await;
  answer(&s, &a, Tag::DateOfAi, "ai", at(3, 1)).await;
  s.tombstone_answer(gone).await.unwrap();

  let history = s.answers(&a, &[Tag::HeatDate, Tag::DateOfAi]).await.unwrap();
  let values: Vec<&str> = history.iter().map(|e| e.value.as_str()).collect();
  assert_eq!(values, ["ai", "h1"]);
}

#[tokio::test]
async fn tombstoning_unknown_answer_fails() {
  let s = store().await;
  let id = Uuid::new_v4();
  assert!(matches!(
    s.tombstone_answer(id).await,
    Err(Error::AnswerNotFound(missing)) if missing == id
  ));
}

#[tokio::test]
async fn animal_numbers_are_sorted_distinct_and_live() {
  let s = store().await;
  answer(&s, &cow("B2"), Tag::Sex, "female", at(1, 1)).await;
  answer(&s, &cow("A1"), Tag::Sex, "female", at(1, 1)).await;
  answer(&s, &cow("A1"), Tag::Pregnant, "no", at(1, 2)).await;
  let only = answer(&s, &cow("C3"), Tag::Sex, "male", at(1, 1)).await;
  s.tombstone_answer(only).await.unwrap();
  answer(&s, &AnimalIdentity::new(4, 1, "Z9").unwrap(), Tag::Sex, "male", at(1, 1)).await;

  let numbers = s.animal_numbers(Herd::new(3, 1).unwrap()).await.unwrap();
  assert_eq!(numbers, ["A1", "B2"]);
}

// ─── Milk, samples, links ────────────────────────────────────────────────────

#[tokio::test]
async fn milk_upsert_replaces_same_day() {
  let s = store().await;
  s.record_milk(milk("A1", day(2024, 1, 1), 10.0, 8.0)).await.unwrap();
  s.record_milk(milk("A1", day(2024, 1, 1), 11.0, 9.0)).await.unwrap();
  s.record_milk(milk("A1", day(2024, 1, 3), 5.0, 5.0)).await.unwrap();

  let all = s.milk_sum(&cow("A1"), None).await.unwrap();
  assert_eq!((all.morning, all.evening), (16.0, 14.0));

  let first_two = DateRange::new(day(2024, 1, 1), day(2024, 1, 2));
  let some = s.milk_sum(&cow("A1"), first_two).await.unwrap();
  assert_eq!(some.total(), 20.0);

  let last = DateRange::new(day(2024, 1, 3), day(2024, 1, 3));
  assert_eq!(s.milk_sum(&cow("A1"), last).await.unwrap().total(), 10.0);

  let empty = DateRange::new(day(2024, 2, 1), day(2024, 2, 28));
  assert_eq!(s.milk_sum(&cow("A1"), empty).await.unwrap().total(), 0.0);
}

#[tokio::test]
async fn mother_link_prefers_latest_correction() {
  let s = store().await;
  for mother in ["WRONG", "RIGHT"] {
    s.record_birth(MotherCalfLink {
      owner_id:             3,
      animal_type_id:       1,
      delivery_date:        day(2024, 2, 2),
      mother_animal_number: mother.into(),
      calf_animal_number:   "K1".into(),
    })
    .await
    .unwrap();
  }
  let link = s.mother_link(&cow("K1")).await.unwrap().unwrap();
  assert_eq!(link.mother_animal_number, "RIGHT");
  assert_eq!(link.delivery_date, day(2024, 2, 2));
  assert!(s.mother_link(&cow("NOBODY")).await.unwrap().is_none());

  let calves = s.calf_links(&cow("WRONG")).await.unwrap();
  assert_eq!(calves.len(), 1);
}

// ─── Through the engine ──────────────────────────────────────────────────────

#[tokio::test]
async fn lactation_yields_end_to_end() {
  let s = store().await;
  let a = cow("L1");
  for (on, status) in [
    (day(2024, 1, 1), "yes"),
    (day(2024, 4, 1), "no"),
    (day(2024, 6, 1), "yes"),
  ] {
    s.record_lactation_sample(LactationSample {
      owner_id:         3,
      animal_type_id:   1,
      animal_number:    "L1".into(),
      created_at:       Utc.from_utc_datetime(&on.and_hms_opt(7, 0, 0).unwrap()),
      lactating_status: status.into(),
      pregnancy_status: "no".into(),
    })
    .await
    .unwrap();
  }
  for d in day(2024, 1, 1).iter_days().take_while(|d| *d <= day(2024, 4, 1)) {
    s.record_milk(milk("L1", d, 10.0, 8.0)).await.unwrap();
  }
  for d in day(2024, 6, 1).iter_days().take_while(|d| *d <= day(2024, 6, 30)) {
    s.record_milk(milk("L1", d, 12.0, 9.0)).await.unwrap();
  }

  let engine = Analytics::with_config(
    Arc::new(s),
    AnalyticsConfig { today: Some(day(2024, 6, 30)), ..Default::default() },
  );
  let summary = engine.lactation_summary(&a).await.unwrap();
  assert_eq!(summary.lactation_count, 2);
  assert_eq!(summary.last_lactation_yield, 18.0 * 92.0);
  assert_eq!(summary.current.days_in_milk, 30);
  assert_eq!(summary.current.yield_total, 21.0 * 30.0);
}
