//! Path containment checks.
//!
//! Every path the sorter touches is resolved (symlinks and `..` included) and
//! checked against the monitored root before any filesystem mutation happens.

use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// A path resolved to a location outside the trusted root.
#[derive(Debug, Error)]
#[error("Path traversal detected: {path}")]
pub struct PathTraversal {
    /// The offending path, as resolved (or as joined if it could not be resolved).
    pub path: PathBuf,
}

/// Join `parts` onto `root` and verify the result stays strictly inside `root`.
///
/// Both sides are canonicalized first, so symlinks and `..` segments cannot be
/// used to escape. Segments that do not exist yet are normalized lexically on
/// top of their deepest existing ancestor.
pub fn safe_join<I, P>(root: &Path, parts: I) -> Result<PathBuf, PathTraversal>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut joined = root.to_path_buf();
    for part in parts {
        joined.push(part);
    }

    let root = root
        .canonicalize()
        .map_err(|_| PathTraversal { path: joined.clone() })?;
    let resolved = resolve(&joined).map_err(|_| PathTraversal { path: joined.clone() })?;

    if is_within(&root, &resolved) {
        Ok(resolved)
    } else {
        tracing::warn!("Path traversal attempt detected: {}", joined.display());
        Err(PathTraversal { path: resolved })
    }
}

/// Verify an already-built `path` resolves strictly inside `root`.
///
/// `root` is expected to be canonical already.
pub fn ensure_within(root: &Path, path: &Path) -> Result<PathBuf, PathTraversal> {
    let resolved = resolve(path).map_err(|_| PathTraversal {
        path: path.to_path_buf(),
    })?;
    if is_within(root, &resolved) {
        Ok(resolved)
    } else {
        Err(PathTraversal { path: resolved })
    }
}

/// Whether `path` is a strict descendant of `root`.
///
/// Purely lexical; callers pass resolved paths.
pub fn is_within(root: &Path, path: &Path) -> bool {
    path != root && path.starts_with(root)
}

/// Canonicalize `path` without requiring it to exist.
///
/// The longest existing prefix is canonicalized by the OS; the remaining
/// components are applied lexically. A dangling symlink along the way is an
/// error, since its target cannot be checked.
pub fn resolve(path: &Path) -> io::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut resolved = PathBuf::new();
    let mut on_disk = true;

    for component in absolute.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => resolved.push(component),
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
                // Popping back out of the missing tail lands on the canonical
                // prefix again; later segments must be resolved on disk.
                if !on_disk && resolved.symlink_metadata().is_ok() {
                    on_disk = true;
                }
            }
            Component::Normal(name) => {
                let candidate = resolved.join(name);
                if !on_disk {
                    resolved = candidate;
                    continue;
                }
                match candidate.canonicalize() {
                    Ok(real) => resolved = real,
                    Err(_) => {
                        let is_link = candidate
                            .symlink_metadata()
                            .map(|meta| meta.file_type().is_symlink())
                            .unwrap_or(false);
                        if is_link {
                            return Err(io::Error::new(
                                io::ErrorKind::InvalidInput,
                                format!("dangling symlink: {}", candidate.display()),
                            ));
                        }
                        on_disk = false;
                        resolved = candidate;
                    }
                }
            }
        }
    }

    Ok(resolved)
}
