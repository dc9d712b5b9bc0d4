//! Pet record model.
//!
//! # Responsibility
//! - Define the stored record and the client-supplied input shape.
//!
//! # Invariants
//! - `Pet::id` is generated by the store at insert time, never by a client.
//! - Text fields and `age` are free-form: empty strings and zero age are valid.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque, globally unique record identifier.
pub type PetId = Uuid;

/// Record fields as submitted by a client, before an id is assigned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPet {
    pub name: String,
    pub gender: String,
    pub age: u32,
    pub breed: String,
    /// Raw image bytes; empty when the client sent no picture.
    #[serde(default)]
    pub image: Vec<u8>,
}

impl NewPet {
    pub fn new(
        name: impl Into<String>,
        gender: impl Into<String>,
        age: u32,
        breed: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            gender: gender.into(),
            age,
            breed: breed.into(),
            image: Vec::new(),
        }
    }

    /// Attaches an image payload.
    pub fn with_image(mut self, image: impl Into<Vec<u8>>) -> Self {
        self.image = image.into();
        self
    }
}

/// Stored pet record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pet {
    pub id: PetId,
    pub name: String,
    pub gender: String,
    pub age: u32,
    pub breed: String,
    #[serde(default)]
    pub image: Vec<u8>,
}

impl Pet {
    /// Binds store-assigned `id` to submitted fields.
    pub fn from_new(id: PetId, pet: NewPet) -> Self {
        Self {
            id,
            name: pet.name,
            gender: pet.gender,
            age: pet.age,
            breed: pet.breed,
            image: pet.image,
        }
    }

    /// Returns the client-visible fields without the id.
    pub fn fields(&self) -> NewPet {
        NewPet {
            name: self.name.clone(),
            gender: self.gender.clone(),
            age: self.age,
            breed: self.breed.clone(),
            image: self.image.clone(),
        }
    }
}
