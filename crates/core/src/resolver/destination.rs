//! Collision-free destination naming.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// A filename that cannot be used as a destination.
#[derive(Debug, Error)]
#[error("Invalid filename detected: {name}")]
pub struct InvalidName {
    /// The rejected filename.
    pub name: String,
}

/// Returns a path inside `folder` for `filename` that does not exist yet.
///
/// `photo.jpg` becomes `photo_1.jpg`, `photo_2.jpg`, ... until a free name is
/// found. Filenames with parent-directory segments or an absolute/root marker
/// are refused outright.
pub fn unique_destination(folder: &Path, filename: &str) -> Result<PathBuf, InvalidName> {
    validate_filename(filename)?;

    let mut destination = folder.join(filename);
    if !destination.exists() {
        return Ok(destination);
    }

    let name = Path::new(filename);
    let mut stem = name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = name
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    if stem.contains("..") || stem.contains('/') || stem.contains('\\') {
        stem = sanitize_stem(&stem);
    }

    let mut counter: u64 = 1;
    while destination.exists() {
        destination = folder.join(format!("{stem}_{counter}{suffix}"));
        counter += 1;
    }
    Ok(destination)
}

fn validate_filename(filename: &str) -> Result<(), InvalidName> {
    let invalid = || InvalidName {
        name: filename.to_string(),
    };

    if filename.is_empty() || filename.starts_with('/') || filename.starts_with('\\') {
        return Err(invalid());
    }

    let escapes = Path::new(filename).components().any(|component| {
        matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes || filename.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(invalid());
    }

    Ok(())
}

fn sanitize_stem(stem: &str) -> String {
    stem.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim()
        .to_string()
}
