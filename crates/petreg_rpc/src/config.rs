//! Server configuration and store bootstrap.

use petreg_core::{
    MemoryPetRepository, PetRepository, RegistryService, RepoResult, SqlitePetRepository,
};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:50051";
pub const DB_PATH_ENV: &str = "PETREG_DB_PATH";
const DEFAULT_DB_FILE_NAME: &str = "petreg.sqlite3";

/// Which record store backs the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Sqlite { path: PathBuf },
    Memory { max_records: Option<usize> },
}

impl StoreConfig {
    /// Opens the configured store behind a registry service.
    pub fn open_service(&self) -> RepoResult<RegistryService<Box<dyn PetRepository>>> {
        let repo: Box<dyn PetRepository> = match self {
            Self::Sqlite { path } => Box::new(SqlitePetRepository::open(path)?),
            Self::Memory {
                max_records: Some(max),
            } => Box::new(MemoryPetRepository::with_max_records(*max)),
            Self::Memory { max_records: None } => Box::new(MemoryPetRepository::new()),
        };
        Ok(RegistryService::new(repo))
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Sqlite { path } => format!("sqlite:{}", path.display()),
            Self::Memory {
                max_records: Some(max),
            } => format!("memory:max_records={max}"),
            Self::Memory { max_records: None } => "memory".to_string(),
        }
    }
}

/// Fully resolved settings for [`crate::Server`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub store: StoreConfig,
}

/// Picks the database file: explicit path, then `PETREG_DB_PATH`, then a
/// file in the system temp directory.
pub fn resolve_db_path(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit.filter(|path| !path.as_os_str().is_empty()) {
        return path;
    }
    if let Ok(raw) = std::env::var(DB_PATH_ENV) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    std::env::temp_dir().join(DEFAULT_DB_FILE_NAME)
}
