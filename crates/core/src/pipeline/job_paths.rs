//! Output naming and folder expansion for batch inputs.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use crate::shared::constants::{FOLDER_IMAGE_EXTENSIONS, OUTPUT_SUFFIX};

/// `<stem>_anonymized.<ext>`, placed in `output_dir` or next to the input.
pub fn default_output_path(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    let mut name: OsString = input.file_stem().unwrap_or_default().to_os_string();
    name.push(OUTPUT_SUFFIX);
    if let Some(ext) = input.extension() {
        name.push(".");
        name.push(ext);
    }
    let dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    dir.join(name)
}

/// Sibling directory `<folder>_anonymized` receiving a folder's outputs.
pub fn folder_output_dir(folder: &Path) -> PathBuf {
    let mut name: OsString = folder.file_name().unwrap_or_default().to_os_string();
    name.push(OUTPUT_SUFFIX);
    folder.with_file_name(name)
}

/// Lists the images directly inside `folder`, sorted by path.
pub fn collect_images(folder: &Path) -> io::Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in std::fs::read_dir(folder)? {
        let path = entry?.path();
        if path.is_file() && has_folder_image_extension(&path) {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

fn has_folder_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| FOLDER_IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_next_to_input() {
        assert_eq!(
            default_output_path(Path::new("/data/clip.mp4"), None),
            PathBuf::from("/data/clip_anonymized.mp4")
        );
    }

    #[test]
    fn test_default_output_in_directory() {
        assert_eq!(
            default_output_path(Path::new("/data/photo.JPG"), Some(Path::new("/out"))),
            PathBuf::from("/out/photo_anonymized.JPG")
        );
    }

    #[test]
    fn test_default_output_without_extension() {
        assert_eq!(
            default_output_path(Path::new("raw"), None),
            PathBuf::from("raw_anonymized")
        );
    }

    #[test]
    fn test_folder_output_dir_is_sibling() {
        assert_eq!(
            folder_output_dir(Path::new("/data/holiday")),
            PathBuf::from("/data/holiday_anonymized")
        );
    }

    #[test]
    fn test_collect_images_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.JPG", "c.jpeg", "notes.txt", "d.webp"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.png")).unwrap();

        let found: Vec<_> = collect_images(dir.path())
            .unwrap()
            .into_iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(found, ["a.JPG", "b.png", "c.jpeg"]);
    }

    #[test]
    fn test_collect_images_missing_folder_fails() {
        assert!(collect_images(Path::new("/nonexistent/folder")).is_err());
    }
}
