//! Tag Resolver: point queries against the answer log.
//!
//! `latest_by_tag` is the primitive every other derivation is built from: the
//! newest non-deleted answer whose question carries a given tag. A miss is
//! `Ok(None)`, an unknown fact, never an error.

use chrono::{DateTime, Utc};
use futures::future::try_join_all;

use crate::{
  Error, Result,
  analytics::Analytics,
  animal::{AnimalIdentity, Herd},
  answer::{AnswerEvent, TagAnswers},
  store::HerdStore,
  tag::Tag,
};

impl<S: HerdStore> Analytics<S> {
  /// The active answer for `(animal, tag)`.
  pub async fn latest_by_tag(
    &self,
    animal: &AnimalIdentity,
    tag: Tag,
  ) -> Result<Option<AnswerEvent>> {
    animal.validate()?;
    self.bounded("latest_by_tag", self.resolve(animal, tag)).await
  }

  /// [`latest_by_tag`](Self::latest_by_tag) for a raw tag id. Unknown ids
  /// fail fast with [`Error::UnregisteredTag`].
  pub async fn latest_by_tag_id(
    &self,
    animal: &AnimalIdentity,
    tag_id: i64,
  ) -> Result<Option<AnswerEvent>> {
    let tag = Tag::try_from(tag_id)?;
    self.latest_by_tag(animal, tag).await
  }

  /// The active answer for each of `tags`, in one store round trip where the
  /// backend supports it.
  pub async fn latest_by_tags(
    &self,
    animal: &AnimalIdentity,
    tags: &[Tag],
  ) -> Result<TagAnswers> {
    animal.validate()?;
    self.bounded("latest_by_tags", self.resolve_many(animal, tags)).await
  }

  /// Animal numbers with at least one live answer in `herd`.
  pub async fn herd_members(&self, herd: Herd) -> Result<Vec<String>> {
    self.bounded("herd_members", self.members(herd)).await
  }

  // ── Unbounded building blocks ─────────────────────────────────────────

  pub(crate) async fn resolve(
    &self,
    animal: &AnimalIdentity,
    tag: Tag,
  ) -> Result<Option<AnswerEvent>> {
    self.store.latest_answer(animal, tag).await.map_err(Error::store)
  }

  pub(crate) async fn resolve_many(
    &self,
    animal: &AnimalIdentity,
    tags: &[Tag],
  ) -> Result<TagAnswers> {
    self
      .store
      .latest_answers(animal, tags)
      .await
      .map_err(Error::store)
  }

  /// The answer for `tag` written in the same batch as `at`.
  pub(crate) async fn resolve_at(
    &self,
    animal: &AnimalIdentity,
    tag: Tag,
    at: DateTime<Utc>,
  ) -> Result<Option<AnswerEvent>> {
    self.store.answer_at(animal, tag, at).await.map_err(Error::store)
  }

  /// Every live answer for `tags`, newest first.
  pub(crate) async fn history(
    &self,
    animal: &AnimalIdentity,
    tags: &[Tag],
  ) -> Result<Vec<AnswerEvent>> {
    self.store.answers(animal, tags).await.map_err(Error::store)
  }

  pub(crate) async fn members(&self, herd: Herd) -> Result<Vec<String>> {
    self.store.animal_numbers(herd).await.map_err(Error::store)
  }

  /// Members of several herds, listed concurrently.
  pub(crate) async fn members_of(
    &self,
    herds: &[Herd],
  ) -> Result<Vec<AnimalIdentity>> {
    let listed = try_join_all(herds.iter().copied().map(|herd| async move {
      let numbers = self.members(herd).await?;
      Ok::<_, Error>(numbers.into_iter().map(move |n| herd.animal(n)))
    }))
    .await?;
    Ok(listed.into_iter().flatten().collect())
  }
}
