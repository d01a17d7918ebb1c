//! Extension → category mapping.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Name of the catch-all category.
pub const OTHERS: &str = "Others";

/// One `[[categories]]` entry from the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Folder name, created directly under the monitored root.
    pub name: String,
    /// Extensions routed to this folder, e.g. `".jpg"`. Case and the leading
    /// dot are normalized when the map is built.
    #[serde(default)]
    pub extensions: Vec<String>,
}

impl CategoryConfig {
    /// Creates a category entry.
    pub fn new<I, S>(name: impl Into<String>, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            extensions: extensions.into_iter().map(Into::into).collect(),
        }
    }
}

/// Categories shipped when no configuration file is available.
pub fn default_categories() -> Vec<CategoryConfig> {
    vec![
        CategoryConfig::new(
            "Images",
            [".jpg", ".jpeg", ".png", ".gif", ".bmp", ".svg", ".webp", ".ico", ".tiff"],
        ),
        CategoryConfig::new(
            "Documents",
            [".pdf", ".doc", ".docx", ".txt", ".rtf", ".odt", ".xls", ".xlsx", ".ppt", ".pptx"],
        ),
        CategoryConfig::new(
            "Videos",
            [".mp4", ".avi", ".mkv", ".mov", ".wmv", ".flv", ".webm", ".m4v", ".3gp"],
        ),
        CategoryConfig::new(
            "Audio",
            [".mp3", ".wav", ".flac", ".aac", ".ogg", ".wma", ".m4a"],
        ),
        CategoryConfig::new(
            "Archives",
            [".zip", ".rar", ".7z", ".tar", ".gz", ".bz2", ".xz"],
        ),
        CategoryConfig::new(
            "Programs",
            [".exe", ".msi", ".dmg", ".pkg", ".deb", ".rpm", ".appx"],
        ),
        CategoryConfig::new(
            "Code",
            [".py", ".js", ".html", ".css", ".java", ".cpp", ".c", ".php", ".rb", ".go"],
        ),
        CategoryConfig::new(OTHERS, Vec::<String>::new()),
    ]
}

#[derive(Debug, Clone)]
struct Category {
    name: String,
    extensions: HashSet<String>,
}

/// Immutable, ordered category table shared by all workers.
///
/// Lookups scan categories in declaration order, so when extension sets
/// overlap the first declared category wins.
#[derive(Debug, Clone)]
pub struct CategoryMap {
    categories: Vec<Category>,
}

impl Default for CategoryMap {
    fn default() -> Self {
        Self::from_config(&default_categories())
    }
}

impl CategoryMap {
    /// Builds the map from configuration entries, normalizing extensions.
    pub fn from_config(entries: &[CategoryConfig]) -> Self {
        let categories = entries
            .iter()
            .map(|entry| Category {
                name: entry.name.clone(),
                extensions: entry
                    .extensions
                    .iter()
                    .filter_map(|ext| normalize_extension(ext))
                    .collect(),
            })
            .collect();
        Self { categories }
    }

    /// Returns the category for `extension` (`".JPG"`, `"jpg"` and `".jpg"`
    /// are equivalent), or [`OTHERS`] when nothing matches.
    pub fn classify(&self, extension: &str) -> &str {
        let Some(needle) = normalize_extension(extension) else {
            return OTHERS;
        };
        self.categories
            .iter()
            .find(|category| category.extensions.contains(&needle))
            .map(|category| category.name.as_str())
            .unwrap_or(OTHERS)
    }

    /// Classifies a file by its final extension.
    pub fn classify_path(&self, path: &Path) -> &str {
        match extension_of(path) {
            Some(ext) => self.classify(&ext),
            None => OTHERS,
        }
    }

    /// Category names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|category| category.name.as_str())
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Whether the map has no categories at all.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Extensions claimed by more than one category, with the category that
    /// wins the lookup.
    pub fn overlapping_extensions(&self) -> Vec<(String, String)> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut overlaps = Vec::new();
        for category in &self.categories {
            for ext in &category.extensions {
                if !seen.insert(ext.as_str()) {
                    overlaps.push((ext.clone(), self.classify(ext).to_string()));
                }
            }
        }
        overlaps.sort();
        overlaps
    }
}

/// The final extension of `path`, lowercased, with its leading dot.
///
/// `archive.tar.gz` yields `.gz`; dotfiles such as `.bashrc` have none.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
}

fn normalize_extension(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        return None;
    }
    Some(format!(".{}", trimmed.to_lowercase()))
}
