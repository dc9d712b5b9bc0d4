//! Record store contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist pets with a store-generated id.
//! - Run single-column equality lookups.
//!
//! # Invariants
//! - Concurrent inserts never share an id.
//! - Read paths reject invalid persisted rows instead of masking them.

use crate::db::migrations::{current_version, latest_version};
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::pet::{NewPet, Pet, PetId};
use crate::search::selector::{FieldValue, PetField};
use log::{debug, error};
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

const PETS_TABLE: &str = "pets";
const REQUIRED_PET_COLUMNS: &[&str] = &["id", "name", "gender", "age", "breed", "picture"];

const PET_SELECT_SQL: &str = "SELECT
    id,
    name,
    gender,
    age,
    breed,
    picture
FROM pets";

pub type RepoResult<T> = Result<T, RepoError>;

/// Storage failure surfaced by record store operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Connection was not migrated to the schema this binary expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    InvalidData(String),
    /// Backend refused the operation for a reason outside SQLite, such as a
    /// capped in-memory store that is full.
    Unavailable(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted pet data: {message}"),
            Self::Unavailable(message) => write!(f, "record store unavailable: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistence backend for pet records.
///
/// Implementations must be safe to share across request workers.
pub trait PetRepository: Send + Sync {
    /// Assigns a fresh id, persists the record and returns the id.
    fn insert(&self, pet: &NewPet) -> RepoResult<PetId>;

    /// Returns every record whose `field` equals `value`, in insertion order.
    fn find_by_field(&self, field: PetField, value: &FieldValue) -> RepoResult<Vec<Pet>>;
}

macro_rules! forward_pet_repository {
    ($wrapper:ident) => {
        impl<R: PetRepository + ?Sized> PetRepository for $wrapper<R> {
            fn insert(&self, pet: &NewPet) -> RepoResult<PetId> {
                (**self).insert(pet)
            }

            fn find_by_field(&self, field: PetField, value: &FieldValue) -> RepoResult<Vec<Pet>> {
                (**self).find_by_field(field, value)
            }
        }
    };
}

forward_pet_repository!(Arc);
forward_pet_repository!(Box);

/// SQLite-backed record store.
///
/// `rusqlite::Connection` is not `Sync`, so statements are serialized on an
/// internal mutex.
pub struct SqlitePetRepository {
    conn: Mutex<Connection>,
}

impl SqlitePetRepository {
    /// Wraps a connection after checking it carries the current schema.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Self::try_new(open_db(path)?)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> RepoResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    /// Number of stored records.
    pub fn count(&self) -> RepoResult<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM pets;", [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count `{count}`")))
    }
}

impl PetRepository for SqlitePetRepository {
    fn insert(&self, pet: &NewPet) -> RepoResult<PetId> {
        let id = Uuid::new_v4();
        let conn = self.conn.lock();

        conn.execute(
            "INSERT INTO pets (
                id,
                name,
                gender,
                age,
                breed,
                picture
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                id.to_string(),
                pet.name.as_str(),
                pet.gender.as_str(),
                i64::from(pet.age),
                pet.breed.as_str(),
                pet.image.as_slice(),
            ],
        )
        .map_err(|err| {
            error!("event=pet_insert module=repo status=error error={err}");
            err
        })?;

        debug!(
            "event=pet_insert module=repo status=ok id={id} image_bytes={}",
            pet.image.len()
        );
        Ok(id)
    }

    fn find_by_field(&self, field: PetField, value: &FieldValue) -> RepoResult<Vec<Pet>> {
        if !field.accepts(value) {
            return Ok(Vec::new());
        }

        let bind_value = match value {
            FieldValue::Text(text) => Value::Text(text.clone()),
            FieldValue::Integer(number) => Value::Integer(i64::from(*number)),
        };

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "{PET_SELECT_SQL}
             WHERE {} = ?1
             ORDER BY rowid ASC;",
            field.column()
        ))?;

        let mut rows = stmt.query([bind_value])?;
        let mut pets = Vec::new();
        while let Some(row) = rows.next()? {
            pets.push(parse_pet_row(row)?);
        }

        debug!(
            "event=pet_find module=repo status=ok field={field} matches={}",
            pets.len()
        );
        Ok(pets)
    }
}

fn ensure_schema(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let table_exists: bool = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [PETS_TABLE],
        |row| row.get(0),
    )?;
    if !table_exists {
        return Err(RepoError::MissingRequiredTable(PETS_TABLE));
    }

    let mut stmt = conn.prepare("PRAGMA table_info(pets);")?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>("name"))?
        .collect::<Result<Vec<_>, _>>()?;

    for &column in REQUIRED_PET_COLUMNS {
        if !columns.iter().any(|name| name == column) {
            return Err(RepoError::MissingRequiredColumn {
                table: PETS_TABLE,
                column,
            });
        }
    }

    Ok(())
}

fn parse_pet_row(row: &Row<'_>) -> RepoResult<Pet> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{id_text}` in pets.id")))?;

    let age_raw: i64 = row.get("age")?;
    let age = u32::try_from(age_raw)
        .map_err(|_| RepoError::InvalidData(format!("age `{age_raw}` out of range in pets.age")))?;

    Ok(Pet {
        id,
        name: row.get("name")?,
        gender: row.get("gender")?,
        age,
        breed: row.get("breed")?,
        image: row.get("picture")?,
    })
}
