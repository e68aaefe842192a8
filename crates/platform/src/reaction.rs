//! Normalized reaction emoji keys.
//!
//! A reaction maps to exactly one role within a panel, so the emoji is
//! normalized into a stable key: the unicode emoji itself, or the
//! mention form of a custom emoji. The mention form is also what gets
//! persisted, so parsing and rendering must round-trip.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReactionKey {
    /// Plain unicode emoji, stored verbatim.
    Unicode(String),
    /// Guild custom emoji.
    Custom { id: u64, name: String, animated: bool },
}

#[derive(Debug, thiserror::Error)]
#[error("invalid reaction emoji: {0:?}")]
pub struct InvalidReactionKey(pub String);

impl ReactionKey {
    /// Chat-markup rendering, identical to the persisted form.
    pub fn mention(&self) -> String {
        match self {
            ReactionKey::Unicode(emoji) => emoji.clone(),
            ReactionKey::Custom { id, name, animated: false } => format!("<:{name}:{id}>"),
            ReactionKey::Custom { id, name, animated: true } => format!("<a:{name}:{id}>"),
        }
    }
}

impl fmt::Display for ReactionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mention())
    }
}

impl FromStr for ReactionKey {
    type Err = InvalidReactionKey;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        if input.is_empty() {
            return Err(InvalidReactionKey(input.to_string()));
        }

        if let Some(inner) = input.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
            let (animated, rest) = match inner.strip_prefix("a:") {
                Some(rest) => (true, rest),
                None => (false, inner.strip_prefix(':').ok_or_else(|| InvalidReactionKey(input.to_string()))?),
            };
            let (name, id) = rest
                .split_once(':')
                .ok_or_else(|| InvalidReactionKey(input.to_string()))?;
            if name.is_empty() {
                return Err(InvalidReactionKey(input.to_string()));
            }
            let id: u64 = id
                .parse()
                .map_err(|_| InvalidReactionKey(input.to_string()))?;
            return Ok(ReactionKey::Custom { id, name: name.to_string(), animated });
        }

        Ok(ReactionKey::Unicode(input.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unicode_round_trip() {
        let key: ReactionKey = "🦀".parse().unwrap();
        assert_eq!(key, ReactionKey::Unicode("🦀".to_string()));
        assert_eq!(key.mention(), "🦀");
    }

    #[test]
    fn custom_round_trip() {
        let key: ReactionKey = "<:pog:123456>".parse().unwrap();
        assert_eq!(
            key,
            ReactionKey::Custom { id: 123456, name: "pog".to_string(), animated: false }
        );
        assert_eq!(key.mention(), "<:pog:123456>");
    }

    #[test]
    fn animated_custom_round_trip() {
        let key: ReactionKey = "<a:party:99>".parse().unwrap();
        assert_eq!(key.mention(), "<a:party:99>");
    }

    #[test]
    fn rejects_garbage_custom_forms() {
        assert!("<:noid:>".parse::<ReactionKey>().is_err());
        assert!("<::42>".parse::<ReactionKey>().is_err());
        assert!("<pog:42>".parse::<ReactionKey>().is_err());
        assert!("".parse::<ReactionKey>().is_err());
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let key: ReactionKey = " 🦀 ".parse().unwrap();
        assert_eq!(key.mention(), "🦀");
    }
}
