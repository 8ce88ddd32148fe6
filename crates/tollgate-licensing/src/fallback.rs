//! Static tokens honoured when the license server cannot be used.

use std::collections::HashMap;
use std::sync::LazyLock;

const BUILTIN_TOKENS: &[(&str, &str)] = &[
    ("valid-license-token", "basic"),
    ("mvp-test-token", "basic"),
];

static BUILTIN: LazyLock<FallbackTable> = LazyLock::new(|| FallbackTable::new(BUILTIN_TOKENS));

/// Immutable mapping from literal tokens to a subscription level.
#[derive(Debug, Clone, Default)]
pub struct FallbackTable {
    entries: HashMap<String, String>,
}

impl FallbackTable {
    pub fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|(token, level)| (token.to_string(), level.to_string()))
                .collect(),
        }
    }

    /// The process-wide table shipped with the crate.
    pub fn builtin() -> &'static FallbackTable {
        &BUILTIN
    }

    /// Exact-match lookup; no trimming, no case folding.
    pub fn lookup(&self, token: &str) -> Option<&str> {
        self.entries.get(token).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
