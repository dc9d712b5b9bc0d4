//! Registry use-case service.
//!
//! # Responsibility
//! - Register new pets and answer single-field searches.
//! - Serialize registrations against the shared record store.
//! - Map store results to reply envelopes.
//!
//! # Invariants
//! - Registrations hold the write lock for the whole `insert` call.
//! - Searches never take the write lock.
//! - `SearchCriterion::Unspecified` never reaches the store.
//! - `RegisterNewPetReply::code` is authoritative over any attached error.

use crate::model::pet::{NewPet, Pet, PetId};
use crate::repo::pet_repo::{PetRepository, RepoError};
use crate::search::selector::{select_predicate, SearchCriterion};
use log::{error, info};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub const REGISTER_SUCCESS_MESSAGE: &str = "Pet registered successfully";
pub const REGISTER_FAILURE_MESSAGE: &str = "Failed to register pet";

/// Status code carried by a registration reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum ReplyCode {
    Success,
    Failure,
}

impl ReplyCode {
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
        }
    }
}

impl From<ReplyCode> for i32 {
    fn from(value: ReplyCode) -> Self {
        value.as_i32()
    }
}

impl TryFrom<i32> for ReplyCode {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Success),
            1 => Ok(Self::Failure),
            other => Err(format!("unknown reply code `{other}`")),
        }
    }
}

/// Reply to a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterNewPetReply {
    pub code: ReplyCode,
    pub message: String,
    /// Store-assigned id; present only on success.
    pub pet_id: Option<PetId>,
}

impl RegisterNewPetReply {
    fn success(pet_id: PetId) -> Self {
        Self {
            code: ReplyCode::Success,
            message: REGISTER_SUCCESS_MESSAGE.to_string(),
            pet_id: Some(pet_id),
        }
    }

    fn failure() -> Self {
        Self {
            code: ReplyCode::Failure,
            message: REGISTER_FAILURE_MESSAGE.to_string(),
            pet_id: None,
        }
    }
}

/// Registration reply plus the store error behind a failure.
#[derive(Debug)]
pub struct RegisterOutcome {
    pub reply: RegisterNewPetReply,
    pub error: Option<RepoError>,
}

impl RegisterOutcome {
    pub fn is_success(&self) -> bool {
        self.reply.code == ReplyCode::Success
    }
}

/// Record as returned to search callers. The id stays server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetRecord {
    pub name: String,
    pub gender: String,
    pub age: u32,
    pub breed: String,
    pub image: Vec<u8>,
}

impl From<Pet> for PetRecord {
    fn from(pet: Pet) -> Self {
        Self {
            name: pet.name,
            gender: pet.gender,
            age: pet.age,
            breed: pet.breed,
            image: pet.image,
        }
    }
}

/// Reply to a search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPetReply {
    pub pets: Vec<PetRecord>,
}

/// Service-level failure on the read path.
#[derive(Debug)]
pub enum RegistryError {
    Storage(RepoError),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(err) => write!(f, "storage error: {err}"),
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
        }
    }
}

impl From<RepoError> for RegistryError {
    fn from(value: RepoError) -> Self {
        Self::Storage(value)
    }
}

/// Registry facade over a shared record store.
pub struct RegistryService<R: PetRepository> {
    repo: R,
    write_lock: Mutex<()>,
}

impl<R: PetRepository> RegistryService<R> {
    /// Creates a service that owns `repo`.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            write_lock: Mutex::new(()),
        }
    }

    /// Borrows the underlying store.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Registers one pet.
    ///
    /// # Contract
    /// - Success: `code = Success`, `message = REGISTER_SUCCESS_MESSAGE`,
    ///   `pet_id` set, no error.
    /// - Store failure: `code = Failure`, `message = REGISTER_FAILURE_MESSAGE`,
    ///   and the store error in `RegisterOutcome::error`.
    pub fn register_new_pet(&self, pet: NewPet) -> RegisterOutcome {
        let started_at = Instant::now();
        let inserted = {
            let _guard = self.write_lock.lock();
            self.repo.insert(&pet)
        };

        match inserted {
            Ok(pet_id) => {
                info!(
                    "event=register_pet module=service status=ok pet_id={pet_id} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                RegisterOutcome {
                    reply: RegisterNewPetReply::success(pet_id),
                    error: None,
                }
            }
            Err(err) => {
                error!(
                    "event=register_pet module=service status=error duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                RegisterOutcome {
                    reply: RegisterNewPetReply::failure(),
                    error: Some(err),
                }
            }
        }
    }

    /// Returns every record matching the criterion's single field.
    ///
    /// # Errors
    /// - `RegistryError::Storage` when the store lookup fails.
    pub fn search_pet(&self, criterion: &SearchCriterion) -> Result<SearchPetReply, RegistryError> {
        let Some(predicate) = select_predicate(criterion) else {
            info!("event=search_pet module=service status=ok criterion=none matches=0");
            return Ok(SearchPetReply::default());
        };

        let pets = self
            .repo
            .find_by_field(predicate.field, &predicate.value)
            .map_err(|err| {
                error!(
                    "event=search_pet module=service status=error field={} error={err}",
                    predicate.field
                );
                RegistryError::Storage(err)
            })?;

        info!(
            "event=search_pet module=service status=ok field={} matches={}",
            predicate.field,
            pets.len()
        );
        Ok(SearchPetReply {
            pets: pets.into_iter().map(PetRecord::from).collect(),
        })
    }
}
