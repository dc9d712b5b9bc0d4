//! Domain model for registered pets.
//!
//! # Invariants
//! - Every stored record is identified by a `PetId` assigned by the store.
//! - Records are immutable once stored.

pub mod pet;
