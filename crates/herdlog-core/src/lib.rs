//! Core types, the storage trait, and the animal-fact derivation engine for
//! herdlog.
//!
//! An animal has no state row. Everything known about it is reconstructed on
//! read from a log of tagged answers, lactation samples, milk records and
//! birth links. This crate is deliberately free of HTTP and database
//! dependencies; storage backends implement [`store::HerdStore`].

pub mod analytics;
pub mod animal;
pub mod answer;
pub mod breeding;
pub mod classify;
pub mod error;
pub mod lactation;
pub mod memory;
pub mod milk;
pub mod profile;
pub mod records;
pub mod resolver;
pub mod store;
pub mod tag;

pub use analytics::{Analytics, AnalyticsConfig};
pub use animal::AnimalIdentity;
pub use error::{Error, Result};
pub use tag::Tag;
