//! Search criterion to store predicate resolution.
//!
//! # Invariants
//! - A criterion resolves to at most one predicate.
//! - `SearchCriterion::Unspecified` resolves to no predicate; callers answer
//!   with an empty result and never query the store.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// What a client is searching by. Exactly one field per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchCriterion {
    ByName(String),
    ByGender(String),
    ByAge(u32),
    ByBreed(String),
    /// No field selected.
    Unspecified,
}

/// Searchable record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PetField {
    Name,
    Gender,
    Age,
    Breed,
}

impl PetField {
    /// Column backing this field in the `pets` table.
    pub fn column(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Gender => "gender",
            Self::Age => "age",
            Self::Breed => "breed",
        }
    }
}

impl PetField {
    /// Whether `value` has the kind this field stores.
    ///
    /// A mismatched value can never be equal to a stored field.
    pub fn accepts(self, value: &FieldValue) -> bool {
        matches!(
            (self, value),
            (Self::Age, FieldValue::Integer(_))
                | (Self::Name | Self::Gender | Self::Breed, FieldValue::Text(_))
        )
    }
}

impl Display for PetField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

/// Value compared for equality against a [`PetField`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Integer(u32),
}

/// Single-column equality predicate handed to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPredicate {
    pub field: PetField,
    pub value: FieldValue,
}

/// Resolves a criterion into the predicate the store should run.
///
/// Returns `None` for [`SearchCriterion::Unspecified`].
pub fn select_predicate(criterion: &SearchCriterion) -> Option<FieldPredicate> {
    let (field, value) = match criterion {
        SearchCriterion::ByName(name) => (PetField::Name, FieldValue::Text(name.clone())),
        SearchCriterion::ByGender(gender) => (PetField::Gender, FieldValue::Text(gender.clone())),
        SearchCriterion::ByAge(age) => (PetField::Age, FieldValue::Integer(*age)),
        SearchCriterion::ByBreed(breed) => (PetField::Breed, FieldValue::Text(breed.clone())),
        SearchCriterion::Unspecified => return None,
    };
    Some(FieldPredicate { field, value })
}

#[cfg(test)]
mod tests {
    use super::{select_predicate, FieldPredicate, FieldValue, PetField, SearchCriterion};

    #[test]
    fn each_variant_maps_to_its_own_column() {
        let cases = [
            (
                SearchCriterion::ByName("Buddy".to_string()),
                PetField::Name,
                FieldValue::Text("Buddy".to_string()),
            ),
            (
                SearchCriterion::ByGender("Female".to_string()),
                PetField::Gender,
                FieldValue::Text("Female".to_string()),
            ),
            (SearchCriterion::ByAge(7), PetField::Age, FieldValue::Integer(7)),
            (
                SearchCriterion::ByBreed("Poodle".to_string()),
                PetField::Breed,
                FieldValue::Text("Poodle".to_string()),
            ),
        ];

        for (criterion, field, value) in cases {
            assert_eq!(
                select_predicate(&criterion),
                Some(FieldPredicate { field, value })
            );
        }
    }

    #[test]
    fn unspecified_has_no_predicate() {
        assert_eq!(select_predicate(&SearchCriterion::Unspecified), None);
    }

    #[test]
    fn empty_string_is_still_a_predicate() {
        let predicate = select_predicate(&SearchCriterion::ByName(String::new()))
            .expect("empty name is a valid criterion");
        assert_eq!(predicate.value, FieldValue::Text(String::new()));
    }

    #[test]
    fn field_columns_are_stable() {
        assert_eq!(PetField::Name.column(), "name");
        assert_eq!(PetField::Age.to_string(), "age");
    }

    #[test]
    fn fields_only_accept_their_value_kind() {
        assert!(PetField::Age.accepts(&FieldValue::Integer(0)));
        assert!(!PetField::Age.accepts(&FieldValue::Text("3".to_string())));
        assert!(PetField::Breed.accepts(&FieldValue::Text(String::new())));
        assert!(!PetField::Name.accepts(&FieldValue::Integer(3)));
    }
}
