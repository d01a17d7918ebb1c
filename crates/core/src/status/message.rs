use serde::{Deserialize, Serialize};

/// A user-facing notification about one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub title: String,
    pub text: String,
}

impl StatusMessage {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
        }
    }

    /// A file was moved into its category folder.
    pub fn sorted(name: &str, category: &str) -> Self {
        Self::new("File Sorted", format!("{name} was moved to {category}."))
    }

    /// A move failed and the file was left in place.
    pub fn move_error(name: &str) -> Self {
        Self::new("Move Error", format!("Could not move {name}. Check permissions."))
    }

    /// Processing panicked.
    pub fn unexpected(name: &str) -> Self {
        Self::new("Move Error", format!("An unexpected error occurred with {name}."))
    }
}

impl std::fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_texts() {
        assert_eq!(
            StatusMessage::sorted("photo.jpg", "Images"),
            StatusMessage::new("File Sorted", "photo.jpg was moved to Images.")
        );
        assert_eq!(
            StatusMessage::move_error("a.zip").text,
            "Could not move a.zip. Check permissions."
        );
        assert_eq!(StatusMessage::unexpected("a.zip").title, "Move Error");
    }

    #[test]
    fn test_display() {
        let msg = StatusMessage::sorted("a.txt", "Documents");
        assert_eq!(msg.to_string(), "File Sorted: a.txt was moved to Documents.");
    }
}
