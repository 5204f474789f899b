//! Resolved per-path diff behaviour (§3 FileSpec's `driver` field): funcname
//! pattern, word-diff regex, external command, textconv hook, and a binary
//! override, the things a userdiff attribute would otherwise carry.

use regex::Regex;

/// A driver is resolved once per path and shared by every `FileSpec` built
/// for that path; cloning is cheap since `Regex` is internally `Arc`-shared.
#[derive(Debug, Clone, Default)]
pub struct UserDiffDriver {
    pub name: Option<String>,
    pub funcname_pattern: Option<Regex>,
    pub word_regex: Option<Regex>,
    pub external_command: Option<String>,
    pub textconv_command: Option<String>,
    /// `Some(true)`/`Some(false)` forces binary classification regardless of
    /// content sniffing; `None` defers to `FileSpec::binary`'s NUL scan.
    pub binary_override: Option<bool>,
}

impl UserDiffDriver {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_external_command(command: impl Into<String>) -> Self {
        Self {
            external_command: Some(command.into()),
            ..Self::default()
        }
    }

    pub fn is_binary_forced(&self) -> Option<bool> {
        self.binary_override
    }
}
