//! Process-local record store.
//!
//! Keeps records in insertion order behind a read/write lock. Nothing is
//! persisted across restarts. An optional record cap turns further inserts
//! into `RepoError::Unavailable`.

use crate::model::pet::{NewPet, Pet, PetId};
use crate::repo::pet_repo::{PetRepository, RepoError, RepoResult};
use crate::search::selector::{FieldValue, PetField};
use log::{debug, warn};
use parking_lot::RwLock;
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    pets: Vec<Pet>,
    ids: HashSet<PetId>,
}

/// In-memory `PetRepository`.
#[derive(Default)]
pub struct MemoryPetRepository {
    state: RwLock<MemoryState>,
    max_records: Option<usize>,
}

impl MemoryPetRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that refuses inserts once it holds `max_records` pets.
    pub fn with_max_records(max_records: usize) -> Self {
        Self {
            state: RwLock::default(),
            max_records: Some(max_records),
        }
    }

    pub fn max_records(&self) -> Option<usize> {
        self.max_records
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.state.read().pets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().pets.is_empty()
    }
}

impl PetRepository for MemoryPetRepository {
    fn insert(&self, pet: &NewPet) -> RepoResult<PetId> {
        let mut state = self.state.write();
        if let Some(max) = self.max_records {
            if state.pets.len() >= max {
                warn!(
                    "event=pet_insert module=memory_repo status=error reason=full max_records={max}"
                );
                return Err(RepoError::Unavailable(format!(
                    "memory store is full ({max} records)"
                )));
            }
        }

        let mut id = Uuid::new_v4();
        while !state.ids.insert(id) {
            id = Uuid::new_v4();
        }
        state.pets.push(Pet::from_new(id, pet.clone()));
        debug!("event=pet_insert module=memory_repo status=ok id={id}");
        Ok(id)
    }

    fn find_by_field(&self, field: PetField, value: &FieldValue) -> RepoResult<Vec<Pet>> {
        let state = self.state.read();
        let matches = state
            .pets
            .iter()
            .filter(|pet| field_matches(pet, field, value))
            .cloned()
            .collect::<Vec<_>>();
        debug!(
            "event=pet_find module=memory_repo status=ok field={field} matches={}",
            matches.len()
        );
        Ok(matches)
    }
}

fn field_matches(pet: &Pet, field: PetField, value: &FieldValue) -> bool {
    match (field, value) {
        (PetField::Name, FieldValue::Text(text)) => pet.name == *text,
        (PetField::Gender, FieldValue::Text(text)) => pet.gender == *text,
        (PetField::Breed, FieldValue::Text(text)) => pet.breed == *text,
        (PetField::Age, FieldValue::Integer(age)) => pet.age == *age,
        _ => false,
    }
}
