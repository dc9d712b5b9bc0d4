//! Image file helpers for the client subcommands.

use anyhow::{Context, Result};
use petreg_rpc::WirePet;
use std::path::{Path, PathBuf};

/// Reads an image file, or returns no bytes when no path is given.
pub async fn load_image(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read image `{}`", path.display())),
        None => Ok(Vec::new()),
    }
}

/// Writes the pet's picture into `dir` and returns the file path.
///
/// Pets without a picture are skipped and yield `None`.
pub async fn save_image(dir: &Path, pet: &WirePet) -> Result<Option<PathBuf>> {
    if pet.picture.is_empty() {
        return Ok(None);
    }

    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create `{}`", dir.display()))?;
    let path = dir.join(image_file_name(pet));
    tokio::fs::write(&path, &pet.picture)
        .await
        .with_context(|| format!("failed to write image `{}`", path.display()))?;
    Ok(Some(path))
}

fn image_file_name(pet: &WirePet) -> String {
    let stem = format!("{}, {}, {}, {}", pet.name, pet.gender, pet.age, pet.breed);
    let safe = stem
        .chars()
        .map(|ch| match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            ch if ch.is_control() => '_',
            ch => ch,
        })
        .collect::<String>();
    format!("{safe}.jpg")
}

#[cfg(test)]
mod tests {
    use super::{image_file_name, load_image, save_image};
    use petreg_rpc::WirePet;

    fn pet(picture: Vec<u8>) -> WirePet {
        WirePet {
            name: "Max/Jr".to_string(),
            gender: "Male".to_string(),
            age: 2,
            breed: "Pug".to_string(),
            picture,
        }
    }

    #[test]
    fn file_name_has_no_path_separators() {
        assert_eq!(image_file_name(&pet(Vec::new())), "Max_Jr, Male, 2, Pug.jpg");
    }

    #[tokio::test]
    async fn saved_image_loads_back_identically() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = vec![0xFF, 0xD8, 0xFF, 0x00];

        let path = save_image(dir.path(), &pet(bytes.clone()))
            .await
            .unwrap()
            .expect("non-empty picture is written");
        assert_eq!(load_image(Some(path.as_path())).await.unwrap(), bytes);
    }

    #[tokio::test]
    async fn empty_picture_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        assert!(save_image(dir.path(), &pet(Vec::new())).await.unwrap().is_none());
        assert!(load_image(None).await.unwrap().is_empty());
    }
}
