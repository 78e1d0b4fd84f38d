//! session::tokens
//!
//! Per-key request tokens for ordering asynchronous completions.
//!
//! Every generation issues a fresh token for the key it will install into.
//! When the generation completes, the token is checked against the latest
//! one issued for that key; an older token means a newer request has
//! superseded it and the completion must be dropped.
//!
//! # Example
//!
//! ```
//! use pollen::core::types::ResourceKey;
//! use pollen::session::RequestTokens;
//!
//! let mut tokens = RequestTokens::new();
//! let a = tokens.issue(&ResourceKey::Current);
//! let b = tokens.issue(&ResourceKey::Current);
//!
//! assert!(!tokens.is_latest(&ResourceKey::Current, a));
//! assert!(tokens.is_latest(&ResourceKey::Current, b));
//! ```

use std::collections::HashMap;

use crate::core::types::ResourceKey;

/// Monotonic request token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    /// The raw sequence number.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RequestToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Issues tokens and remembers the latest per key.
#[derive(Debug, Default)]
pub struct RequestTokens {
    next: u64,
    latest: HashMap<ResourceKey, RequestToken>,
}

impl RequestTokens {
    /// Create an empty token table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new token for `key`, superseding any earlier one.
    pub fn issue(&mut self, key: &ResourceKey) -> RequestToken {
        self.next += 1;
        let token = RequestToken(self.next);
        self.latest.insert(key.clone(), token);
        token
    }

    /// True if `token` is still the newest issued for `key`.
    pub fn is_latest(&self, key: &ResourceKey, token: RequestToken) -> bool {
        self.latest.get(key) == Some(&token)
    }

    /// The newest token issued for `key`.
    pub fn latest(&self, key: &ResourceKey) -> Option<RequestToken> {
        self.latest.get(key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::RecordId;

    #[test]
    fn tokens_increase() {
        let mut tokens = RequestTokens::new();
        let a = tokens.issue(&ResourceKey::Current);
        let b = tokens.issue(&ResourceKey::Current);
        assert!(b > a);
        assert_eq!(tokens.latest(&ResourceKey::Current), Some(b));
    }

    #[test]
    fn keys_do_not_supersede_each_other() {
        let mut tokens = RequestTokens::new();
        let record = ResourceKey::Record(RecordId::new());
        let current = tokens.issue(&ResourceKey::Current);
        let other = tokens.issue(&record);
        assert!(tokens.is_latest(&ResourceKey::Current, current));
        assert!(tokens.is_latest(&record, other));
    }

    #[test]
    fn unknown_key_has_no_latest() {
        let tokens = RequestTokens::new();
        assert!(tokens.latest(&ResourceKey::Current).is_none());
    }

    #[test]
    fn token_from_other_key_is_not_latest() {
        let mut tokens = RequestTokens::new();
        let record = ResourceKey::Record(RecordId::new());
        let token = tokens.issue(&record);
        assert!(!tokens.is_latest(&ResourceKey::Current, token));
    }
}
