//! Core domain logic for the pet registry.
//! This crate owns record storage, search resolution and write serialization.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status, LogSink};
pub use model::pet::{NewPet, Pet, PetId};
pub use repo::memory_repo::MemoryPetRepository;
pub use repo::pet_repo::{PetRepository, RepoError, RepoResult, SqlitePetRepository};
pub use search::selector::{
    select_predicate, FieldPredicate, FieldValue, PetField, SearchCriterion,
};
pub use service::registry_service::{
    PetRecord, RegisterNewPetReply, RegisterOutcome, RegistryError, RegistryService, ReplyCode,
    SearchPetReply, REGISTER_FAILURE_MESSAGE, REGISTER_SUCCESS_MESSAGE,
};

/// Minimal health-check API for transport probes.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
