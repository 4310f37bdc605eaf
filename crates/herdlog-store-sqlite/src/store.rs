//! [`SqliteStore`], the SQLite implementation of [`HerdStore`].

use std::path::Path;

use chrono::{DateTime, SubsecRound as _, Utc};
use rusqlite::OptionalExtension as _;
use strum::IntoEnumIterator as _;
use uuid::Uuid;

use herdlog_core::{
  AnimalIdentity, Tag,
  animal::Herd,
  answer::{AnswerEvent, NewAnswer, TagAnswers},
  milk::DateRange,
  records::{LactationSample, MilkRecord, MilkSum, MotherCalfLink},
  store::HerdStore,
};

use crate::{
  Error, Result,
  encode::{
    ANSWER_COLUMNS, RawAnswer, RawLink, RawSample, encode_day,
    encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

/// `IN (...)` body for a set of tag ids. Tag ids come from the closed
/// [`Tag`] enumeration, never from input text.
fn tag_list(tags: &[Tag]) -> String {
  tags
    .iter()
    .map(|t| t.id().to_string())
    .collect::<Vec<_>>()
    .join(", ")
}

fn animal_key(animal: &AnimalIdentity) -> (i64, i64, String) {
  (animal.owner_id, animal.animal_type_id, animal.animal_number.clone())
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A herdlog store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Registry writes ───────────────────────────────────────────────────────

  /// Add `tag` to the registry. Re-registering is a no-op.
  pub async fn register_tag(&self, tag: Tag) -> Result<()> {
    let (id, name) = (tag.id(), tag.name());
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO tags (tag_id, name) VALUES (?1, ?2)",
          rusqlite::params![id, name],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Add a question carrying `tag`. The tag must already be registered.
  pub async fn add_question(
    &self,
    question_id: i64,
    tag: Tag,
    text: Option<String>,
  ) -> Result<()> {
    let tag_id = tag.id();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO questions (question_id, tag_id, text) VALUES (?1, ?2, ?3)",
          rusqlite::params![question_id, tag_id, text],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Register every [`Tag`] plus one question per tag whose id equals the
  /// tag id. Idempotent.
  pub async fn install_default_registry(&self) -> Result<()> {
    let tags: Vec<(i64, &'static str)> =
      Tag::iter().map(|t| (t.id(), t.name())).collect();
    let count = tags.len();
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for (id, name) in &tags {
          tx.execute(
            "INSERT OR IGNORE INTO tags (tag_id, name) VALUES (?1, ?2)",
            rusqlite::params![id, name],
          )?;
          tx.execute(
            "INSERT OR IGNORE INTO questions (question_id, tag_id, text)
             VALUES (?1, ?1, ?2)",
            rusqlite::params![id, name],
          )?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    tracing::info!(tags = count, "default tag registry installed");
    Ok(())
  }

  // ── Answer writes ─────────────────────────────────────────────────────────

  /// Append `batch` stamped with the current time.
  pub async fn record_answers(&self, batch: Vec<NewAnswer>) -> Result<Vec<AnswerEvent>> {
    self.record_answers_at(batch, Utc::now()).await
  }

  /// Append `batch` with every answer sharing `at`. Either the whole batch
  /// is written or none of it.
  pub async fn record_answers_at(
    &self,
    batch: Vec<NewAnswer>,
    at: DateTime<Utc>,
  ) -> Result<Vec<AnswerEvent>> {
    let at = at.trunc_subsecs(6);
    let question_ids: Vec<i64> = batch.iter().map(|a| a.question_id).collect();
    let tags = self.question_tags(question_ids).await?;

    let mut written = Vec::with_capacity(batch.len());
    for input in batch {
      let tag_id = tags
        .iter()
        .find(|(q, _)| *q == input.question_id)
        .map(|(_, t)| *t)
        .ok_or(Error::UnknownQuestion(input.question_id))?;
      written.push(AnswerEvent {
        answer_id:   Uuid::new_v4(),
        animal:      input.animal,
        question_id: input.question_id,
        tag:         Tag::try_from(tag_id)?,
        value:       input.value,
        logic_value: input.logic_value,
        created_at:  at,
        deleted:     false,
      });
    }

    let rows: Vec<_> = written
      .iter()
      .map(|a| {
        (
          encode_uuid(a.answer_id),
          a.animal.owner_id,
          a.animal.animal_type_id,
          a.animal.animal_number.clone(),
          a.question_id,
          a.value.clone(),
          a.logic_value.clone(),
        )
      })
      .collect();
    let at_str = encode_dt(at);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO answers (
               answer_id, owner_id, animal_type_id, animal_number,
               question_id, value, logic_value, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          )?;
          for (id, owner, kind, number, question, value, logic) in &rows {
            stmt.execute(rusqlite::params![
              id, owner, kind, number, question, value, logic, at_str,
            ])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(written)
  }

  /// `(question_id, tag_id)` for each known question among `ids`.
  async fn question_tags(&self, ids: Vec<i64>) -> Result<Vec<(i64, i64)>> {
    let found = self
      .conn
      .call(move |conn| {
        let mut stmt =
          conn.prepare("SELECT tag_id FROM questions WHERE question_id = ?1")?;
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
          if let Some(tag_id) = stmt
            .query_row(rusqlite::params![id], |r| r.get::<_, i64>(0))
            .optional()?
          {
            found.push((id, tag_id));
          }
        }
        Ok(found)
      })
      .await?;
    Ok(found)
  }

  /// Set the tombstone on an answer.
  pub async fn tombstone_answer(&self, answer_id: Uuid) -> Result<()> {
    let id_str = encode_uuid(answer_id);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE answers SET deleted = 1 WHERE answer_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    if changed == 0 {
      return Err(Error::AnswerNotFound(answer_id));
    }
    Ok(())
  }

  // ── Other log writes ──────────────────────────────────────────────────────

  /// Store a day's milk for one animal. A live record for the same day is
  /// tombstoned in the same transaction.
  pub async fn record_milk(&self, record: MilkRecord) -> Result<()> {
    let day = encode_day(record.record_date);
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "UPDATE milk_records SET deleted = 1
           WHERE owner_id = ?1 AND animal_type_id = ?2
             AND animal_number = ?3 AND record_date = ?4 AND deleted = 0",
          rusqlite::params![
            record.owner_id,
            record.animal_type_id,
            record.animal_number,
            day
          ],
        )?;
        tx.execute(
          "INSERT INTO milk_records (
             owner_id, animal_type_id, animal_number, record_date,
             morning_qty, evening_qty
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            record.owner_id,
            record.animal_type_id,
            record.animal_number,
            day,
            record.morning_qty,
            record.evening_qty,
          ],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  pub async fn record_birth(&self, link: MotherCalfLink) -> Result<()> {
    let day = encode_day(link.delivery_date);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO mother_calf_links (
             owner_id, animal_type_id, delivery_date,
             mother_animal_number, calf_animal_number
           ) VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            link.owner_id,
            link.animal_type_id,
            day,
            link.mother_animal_number,
            link.calf_animal_number,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  pub async fn record_lactation_sample(&self, sample: LactationSample) -> Result<()> {
    let at = encode_dt(sample.created_at);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO lactation_samples (
             owner_id, animal_type_id, animal_number, created_at,
             lactating_status, pregnancy_status
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            sample.owner_id,
            sample.animal_type_id,
            sample.animal_number,
            at,
            sample.lactating_status,
            sample.pregnancy_status,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Shared reads ──────────────────────────────────────────────────────────

  /// Answers for `animal` matching `filter` (extra SQL over `a`/`q`),
  /// newest first with ties broken by insertion order.
  async fn query_answers(
    &self,
    animal: &AnimalIdentity,
    filter: String,
    extra: Option<String>,
    limit: Option<u32>,
  ) -> Result<Vec<AnswerEvent>> {
    let (owner, kind, number) = animal_key(animal);
    let limit = limit.map(|n| format!("LIMIT {n}")).unwrap_or_default();
    let sql = format!(
      "SELECT {ANSWER_COLUMNS}
       FROM answers a
       JOIN questions q ON q.question_id = a.question_id
       WHERE a.owner_id = ?1 AND a.animal_type_id = ?2
         AND a.animal_number = ?3 AND a.deleted = 0
         AND ({filter})
         AND (?4 IS NULL OR a.created_at = ?4)
       ORDER BY a.created_at DESC, a.rowid DESC
       {limit}"
    );

    let raws: Vec<RawAnswer> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![owner, kind, number, extra],
            RawAnswer::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAnswer::into_answer).collect()
  }
}

// ─── HerdStore impl ──────────────────────────────────────────────────────────

impl HerdStore for SqliteStore {
  type Error = Error;

  async fn registered_tags(&self) -> Result<Vec<i64>> {
    let ids = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT tag_id FROM tags ORDER BY tag_id")?;
        let rows = stmt
          .query_map([], |r| r.get::<_, i64>(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(ids)
  }

  async fn latest_answer(
    &self,
    animal: &AnimalIdentity,
    tag: Tag,
  ) -> Result<Option<AnswerEvent>> {
    let filter = format!("q.tag_id = {}", tag.id());
    let mut found = self.query_answers(animal, filter, None, Some(1)).await?;
    Ok(found.pop())
  }

  /// One query for every tag: rank each tag's answers and keep the first.
  async fn latest_answers(
    &self,
    animal: &AnimalIdentity,
    tags: &[Tag],
  ) -> Result<TagAnswers> {
    if tags.is_empty() {
      return Ok(TagAnswers::default());
    }
    let (owner, kind, number) = animal_key(animal);
    let sql = format!(
      "SELECT answer_id, owner_id, animal_type_id, animal_number, question_id,
              tag_id, value, logic_value, created_at, deleted
       FROM (
         SELECT {ANSWER_COLUMNS},
                ROW_NUMBER() OVER (
                  PARTITION BY q.tag_id
                  ORDER BY a.created_at DESC, a.rowid DESC
                ) AS rn
         FROM answers a
         JOIN questions q ON q.question_id = a.question_id
         WHERE a.owner_id = ?1 AND a.animal_type_id = ?2
           AND a.animal_number = ?3 AND a.deleted = 0
           AND q.tag_id IN ({})
       )
       WHERE rn = 1",
      tag_list(tags)
    );

    let raws: Vec<RawAnswer> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![owner, kind, number], RawAnswer::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawAnswer::into_answer)
      .collect::<Result<Vec<_>>>()
      .map(|answers| answers.into_iter().collect())
  }

  async fn answer_at(
    &self,
    animal: &AnimalIdentity,
    tag: Tag,
    at: DateTime<Utc>,
  ) -> Result<Option<AnswerEvent>> {
    let filter = format!("q.tag_id = {}", tag.id());
    let mut found = self
      .query_answers(animal, filter, Some(encode_dt(at)), Some(1))
      .await?;
    Ok(found.pop())
  }

  async fn answers(
    &self,
    animal: &AnimalIdentity,
    tags: &[Tag],
  ) -> Result<Vec<AnswerEvent>> {
    if tags.is_empty() {
      return Ok(Vec::new());
    }
    let filter = format!("q.tag_id IN ({})", tag_list(tags));
    self.query_answers(animal, filter, None, None).await
  }

  async fn animal_numbers(&self, herd: Herd) -> Result<Vec<String>> {
    let Herd { owner_id, animal_type_id } = herd;
    let numbers = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT animal_number FROM answers
           WHERE owner_id = ?1 AND animal_type_id = ?2 AND deleted = 0
           ORDER BY animal_number",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![owner_id, animal_type_id], |r| {
            r.get::<_, String>(0)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(numbers)
  }

  async fn lactation_samples(
    &self,
    animal: &AnimalIdentity,
  ) -> Result<Vec<LactationSample>> {
    let (owner, kind, number) = animal_key(animal);
    let raws: Vec<RawSample> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT owner_id, animal_type_id, animal_number, created_at,
                  lactating_status, pregnancy_status
           FROM lactation_samples
           WHERE owner_id = ?1 AND animal_type_id = ?2 AND animal_number = ?3
           ORDER BY created_at, sample_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![owner, kind, number], |row| {
            Ok(RawSample {
              owner_id:         row.get(0)?,
              animal_type_id:   row.get(1)?,
              animal_number:    row.get(2)?,
              created_at:       row.get(3)?,
              lactating_status: row.get(4)?,
              pregnancy_status: row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSample::into_sample).collect()
  }

  async fn milk_sum(
    &self,
    animal: &AnimalIdentity,
    range: Option<DateRange>,
  ) -> Result<MilkSum> {
    let (owner, kind, number) = animal_key(animal);
    let bounds = range.map(|r| (encode_day(r.start), encode_day(r.end)));
    let (from, to) = bounds.unzip();

    let (morning, evening) = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COALESCE(SUM(morning_qty), 0), COALESCE(SUM(evening_qty), 0)
           FROM milk_records
           WHERE owner_id = ?1 AND animal_type_id = ?2 AND animal_number = ?3
             AND deleted = 0
             AND (?4 IS NULL OR record_date BETWEEN ?4 AND ?5)",
          rusqlite::params![owner, kind, number, from, to],
          |r| Ok((r.get::<_, f64>(0)?, r.get::<_, f64>(1)?)),
        )?)
      })
      .await?;
    Ok(MilkSum { morning, evening })
  }

  async fn mother_link(&self, calf: &AnimalIdentity) -> Result<Option<MotherCalfLink>> {
    let (owner, kind, number) = animal_key(calf);
    let sql = format!(
      "SELECT {} FROM mother_calf_links
       WHERE owner_id = ?1 AND animal_type_id = ?2 AND calf_animal_number = ?3
       ORDER BY link_id DESC
       LIMIT 1",
      RawLink::COLUMNS
    );
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![owner, kind, number], RawLink::from_row)
            .optional()?,
        )
      })
      .await?;
    raw.map(RawLink::into_link).transpose()
  }

  async fn calf_links(&self, mother: &AnimalIdentity) -> Result<Vec<MotherCalfLink>> {
    let (owner, kind, number) = animal_key(mother);
    let sql = format!(
      "SELECT {} FROM mother_calf_links
       WHERE owner_id = ?1 AND animal_type_id = ?2 AND mother_animal_number = ?3
       ORDER BY link_id",
      RawLink::COLUMNS
    );
    let raws: Vec<RawLink> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![owner, kind, number], RawLink::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawLink::into_link).collect()
  }
}
