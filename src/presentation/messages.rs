//! Status messages and animation titles.

use serde::{Deserialize, Serialize};

/// Messages shown while the sequence plays, in rotation order.
pub const DEFAULT_STATUS_MESSAGES: [&str; 6] = [
    "Booting divine core...",
    "Pulling karma-repo...",
    "Validating spirit-auth...",
    "Optimizing blessing-loop...",
    "Encrypting future.log...",
    "Deployment Successful.",
];

/// Omikuji type whose title is used for unknown ids.
pub const DEFAULT_OMIKUJI_TYPE: &str = "engineer-fortune";

const ANIMATION_TITLES: [(&str, &str); 5] = [
    ("engineer-fortune", "運命をデプロイ中..."),
    ("tech-selection", "技術スタックをビルド中..."),
    ("debug-fortune", "バグを探索中..."),
    ("code-review", "コードを解析中..."),
    ("deploy-fortune", "本番環境にプッシュ中..."),
];

/// Heading shown above the animation for an omikuji type.
///
/// Unknown ids fall back to the `engineer-fortune` title.
#[must_use]
pub fn animation_title(omikuji_type: &str) -> &'static str {
    ANIMATION_TITLES
        .iter()
        .find(|(id, _)| *id == omikuji_type)
        .or_else(|| ANIMATION_TITLES.iter().find(|(id, _)| *id == DEFAULT_OMIKUJI_TYPE))
        .map_or("", |(_, title)| title)
}

/// Known omikuji type ids.
pub fn omikuji_types() -> impl Iterator<Item = &'static str> {
    ANIMATION_TITLES.iter().map(|(id, _)| *id)
}

/// An ordered, finite list of status messages.
///
/// The scheduler's message index grows without bound; [`message_at`]
/// clamps it to the last entry.
///
/// [`message_at`]: StatusMessages::message_at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusMessages {
    messages: Vec<String>,
}

impl StatusMessages {
    /// Wraps a caller-supplied list.
    #[must_use]
    pub const fn new(messages: Vec<String>) -> Self {
        Self { messages }
    }

    /// Message for `index`, clamped to the last entry. `None` if empty.
    #[must_use]
    pub fn message_at(&self, index: usize) -> Option<&str> {
        let last = self.messages.len().checked_sub(1)?;
        self.messages.get(index.min(last)).map(String::as_str)
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if there are no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Iterates the messages in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(String::as_str)
    }
}

impl Default for StatusMessages {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS_MESSAGES.map(String::from).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_messages() {
        let messages = StatusMessages::default();
        assert_eq!(messages.len(), 6);
        assert_eq!(messages.message_at(0), Some("Booting divine core..."));
        assert_eq!(messages.message_at(5), Some("Deployment Successful."));
    }

    #[test]
    fn test_index_clamps_to_last() {
        let messages = StatusMessages::default();
        assert_eq!(messages.message_at(6), Some("Deployment Successful."));
        assert_eq!(messages.message_at(usize::MAX), Some("Deployment Successful."));
    }

    #[test]
    fn test_empty_list_is_none() {
        let messages = StatusMessages::new(Vec::new());
        assert!(messages.is_empty());
        assert_eq!(messages.message_at(0), None);
        assert_eq!(messages.message_at(42), None);
    }

    #[test]
    fn test_custom_messages() {
        let messages = StatusMessages::new(vec!["a".into(), "b".into()]);
        assert_eq!(messages.message_at(1), Some("b"));
        assert_eq!(messages.message_at(10), Some("b"));
        assert_eq!(messages.iter().collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn test_animation_titles() {
        assert_eq!(animation_title("engineer-fortune"), "運命をデプロイ中...");
        assert_eq!(animation_title("debug-fortune"), "バグを探索中...");
        assert_eq!(animation_title("deploy-fortune"), "本番環境にプッシュ中...");
        assert_eq!(animation_title("no-such-type"), "運命をデプロイ中...");
        assert_eq!(omikuji_types().count(), 5);
    }
}
