//! Record store contracts and implementations.
//!
//! # Responsibility
//! - Define the `PetRepository` contract the registry service depends on.
//! - Keep SQL and id generation inside the persistence boundary.
//!
//! # Invariants
//! - Ids are assigned inside `insert`, never supplied by callers.
//! - Lookups match exactly one field and return an empty list on no match.

pub mod memory_repo;
pub mod pet_repo;
