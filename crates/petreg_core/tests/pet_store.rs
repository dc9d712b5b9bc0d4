use petreg_core::db::migrations::latest_version;
use petreg_core::db::open_db_in_memory;
use petreg_core::{FieldValue, NewPet, PetField, PetRepository, RepoError, SqlitePetRepository};
use rusqlite::Connection;

fn text(value: &str) -> FieldValue {
    FieldValue::Text(value.to_string())
}

#[test]
fn insert_then_find_by_each_field() {
    let repo = SqlitePetRepository::open_in_memory().unwrap();
    let pet = NewPet::new("Luna", "Female", 5, "Husky").with_image(vec![0x89, b'P', b'N', b'G']);
    let id = repo.insert(&pet).unwrap();

    let lookups = [
        (PetField::Name, text("Luna")),
        (PetField::Gender, text("Female")),
        (PetField::Age, FieldValue::Integer(5)),
        (PetField::Breed, text("Husky")),
    ];
    for (field, value) in lookups {
        let found = repo.find_by_field(field, &value).unwrap();
        assert_eq!(found.len(), 1, "lookup by {field}");
        assert_eq!(found[0].id, id);
        assert_eq!(found[0].fields(), pet);
    }
}

#[test]
fn no_match_returns_empty_list() {
    let repo = SqlitePetRepository::open_in_memory().unwrap();
    repo.insert(&NewPet::new("Luna", "Female", 5, "Husky")).unwrap();

    let found = repo.find_by_field(PetField::Name, &text("Nobody")).unwrap();
    assert!(found.is_empty());
}

#[test]
fn empty_fields_and_zero_age_are_stored_as_is() {
    let repo = SqlitePetRepository::open_in_memory().unwrap();
    let blank = NewPet::default();
    let id = repo.insert(&blank).unwrap();

    let found = repo.find_by_field(PetField::Age, &FieldValue::Integer(0)).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, id);
    assert_eq!(found[0].fields(), blank);

    let by_empty_name = repo.find_by_field(PetField::Name, &text("")).unwrap();
    assert_eq!(by_empty_name.len(), 1);
}

#[test]
fn age_lookup_with_text_value_matches_nothing() {
    let repo = SqlitePetRepository::open_in_memory().unwrap();
    repo.insert(&NewPet::new("Max", "Male", 3, "Pug")).unwrap();

    let found = repo.find_by_field(PetField::Age, &text("3")).unwrap();
    assert!(found.is_empty());
}

#[test]
fn results_follow_insertion_order() {
    let repo = SqlitePetRepository::open_in_memory().unwrap();
    let ids = (0..5)
        .map(|age| repo.insert(&NewPet::new("Twin", "Male", age, "Pug")).unwrap())
        .collect::<Vec<_>>();

    let found = repo.find_by_field(PetField::Breed, &text("Pug")).unwrap();
    assert_eq!(found.iter().map(|pet| pet.id).collect::<Vec<_>>(), ids);
    assert_eq!(repo.count().unwrap(), 5);
}

#[test]
fn insertion_order_ignores_created_at_clock() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clock.db");

    let ids = {
        let repo = SqlitePetRepository::open(&path).unwrap();
        (0..3)
            .map(|age| repo.insert(&NewPet::new("Tick", "Male", age, "Mixed")).unwrap())
            .collect::<Vec<_>>()
    };

    // Earlier rows carry later timestamps, as after a wall clock step back.
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute("UPDATE pets SET created_at = 9000000000000 - rowid;", []).unwrap();
    }

    let repo = SqlitePetRepository::open(&path).unwrap();
    let found = repo.find_by_field(PetField::Name, &text("Tick")).unwrap();
    assert_eq!(found.iter().map(|pet| pet.id).collect::<Vec<_>>(), ids);
}

#[test]
fn large_image_payload_is_byte_exact() {
    let repo = SqlitePetRepository::open_in_memory().unwrap();
    let image = (0..=255u8).cycle().take(256 * 1024).collect::<Vec<_>>();
    repo.insert(&NewPet::new("Pixel", "Male", 1, "Corgi").with_image(image.clone()))
        .unwrap();

    let found = repo.find_by_field(PetField::Name, &text("Pixel")).unwrap();
    assert_eq!(found[0].image, image);
}

#[test]
fn file_backed_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pets.db");

    let id = {
        let repo = SqlitePetRepository::open(&path).unwrap();
        repo.insert(&NewPet::new("Bella", "Female", 2, "Beagle")).unwrap()
    };

    let reopened = SqlitePetRepository::open(&path).unwrap();
    let found = reopened.find_by_field(PetField::Name, &text("Bella")).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, id);
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    match SqlitePetRepository::try_new(conn) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert_eq!(expected_version, latest_version()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_pets_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqlitePetRepository::try_new(conn);
    assert!(matches!(result, Err(RepoError::MissingRequiredTable("pets"))));
}

#[test]
fn repository_rejects_connection_missing_picture_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE pets (
            id TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            gender TEXT NOT NULL,
            age INTEGER NOT NULL,
            breed TEXT NOT NULL
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqlitePetRepository::try_new(conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredColumn {
            table: "pets",
            column: "picture"
        })
    ));
}

#[test]
fn corrupt_row_is_reported_not_masked() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO pets (id, name) VALUES ('not-a-uuid', 'Ghost');",
        [],
    )
    .unwrap();
    let repo = SqlitePetRepository::try_new(conn).unwrap();

    let err = repo.find_by_field(PetField::Name, &text("Ghost")).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}
