//! Wire protocol: newline-delimited JSON envelopes and typed payloads.
//!
//! # Invariants
//! - One request or response per line.
//! - `picture` bytes travel as standard base64 strings.
//! - A register response may carry both `result` and `error`; the result's
//!   `code` is authoritative.

use petreg_core::{
    NewPet, PetId, PetRecord, RegisterNewPetReply, ReplyCode, SearchCriterion, SearchPetReply,
};
use serde::{Deserialize, Serialize};

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
pub const STORAGE_ERROR: i32 = -32001;

/// Largest accepted frame, image payload included.
pub const MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Ping,
    RegisterNewPet,
    SearchPet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request<P = serde_json::Value> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub method: Method,
    #[serde(default)]
    pub params: P,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response<R = serde_json::Value> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<R>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl RpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl<R> Response<R> {
    pub fn success(id: Option<u64>, result: R) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<u64>, error: RpcError) -> Self {
        Self {
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// `register_new_pet` params. Missing fields default to empty or zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterNewPetParams {
    pub name: String,
    pub gender: String,
    pub age: u32,
    pub breed: String,
    #[serde(with = "base64_bytes")]
    pub picture: Vec<u8>,
}

impl From<RegisterNewPetParams> for NewPet {
    fn from(params: RegisterNewPetParams) -> Self {
        NewPet {
            name: params.name,
            gender: params.gender,
            age: params.age,
            breed: params.breed,
            image: params.picture,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterNewPetResult {
    pub code: i32,
    pub msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pet_id: Option<PetId>,
}

impl RegisterNewPetResult {
    pub fn is_success(&self) -> bool {
        self.code == ReplyCode::Success.as_i32()
    }
}

impl From<RegisterNewPetReply> for RegisterNewPetResult {
    fn from(reply: RegisterNewPetReply) -> Self {
        Self {
            code: reply.code.as_i32(),
            msg: reply.message,
            pet_id: reply.pet_id,
        }
    }
}

/// The one field a search selects on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchDetail {
    Name(String),
    Gender(String),
    Age(u32),
    Breed(String),
}

/// `search_pet` params. A missing `detail` is a valid request with no
/// criterion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPetParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<SearchDetail>,
}

impl From<SearchPetParams> for SearchCriterion {
    fn from(params: SearchPetParams) -> Self {
        match params.detail {
            Some(SearchDetail::Name(name)) => Self::ByName(name),
            Some(SearchDetail::Gender(gender)) => Self::ByGender(gender),
            Some(SearchDetail::Age(age)) => Self::ByAge(age),
            Some(SearchDetail::Breed(breed)) => Self::ByBreed(breed),
            None => Self::Unspecified,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePet {
    pub name: String,
    pub gender: String,
    pub age: u32,
    pub breed: String,
    #[serde(default, with = "base64_bytes")]
    pub picture: Vec<u8>,
}

impl From<PetRecord> for WirePet {
    fn from(record: PetRecord) -> Self {
        Self {
            name: record.name,
            gender: record.gender,
            age: record.age,
            breed: record.breed,
            picture: record.image,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPetResult {
    #[serde(default)]
    pub pets: Vec<WirePet>,
}

impl From<SearchPetReply> for SearchPetResult {
    fn from(reply: SearchPetReply) -> Self {
        Self {
            pets: reply.pets.into_iter().map(WirePet::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingResult {
    pub message: String,
    pub version: String,
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
