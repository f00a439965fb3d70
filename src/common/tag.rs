// src/common/tag.rs

use core::fmt;
use core::str::FromStr;
use std::collections::HashMap;

/// Identifier of a sensed tag (the anti-collision UID bytes reported by the reader).
///
/// Displayed and parsed as lower-case hex, which is also the key format of the
/// command table. Tags compare by identity only; there is no ordering.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct TagId(Vec<u8>);

impl TagId {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        TagId(bytes.into())
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TagId({})", self.to_hex())
    }
}

impl FromStr for TagId {
    type Err = hex::FromHexError;

    /// Parses a hex identifier. Case is ignored; an empty string is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        hex::decode(trimmed).map(TagId)
    }
}

impl From<&[u8]> for TagId {
    fn from(value: &[u8]) -> Self {
        TagId(value.to_vec())
    }
}

/// Immutable mapping from tag to the command line launched while it is present.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandTable {
    entries: HashMap<TagId, String>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Command configured for `tag`, or `None` for an unknown tag.
    pub fn lookup(&self, tag: &TagId) -> Option<&str> {
        self.entries.get(tag).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TagId, &str)> {
        self.entries.iter().map(|(tag, cmd)| (tag, cmd.as_str()))
    }
}

impl FromIterator<(TagId, String)> for CommandTable {
    fn from_iter<I: IntoIterator<Item = (TagId, String)>>(iter: I) -> Self {
        CommandTable {
            entries: iter.into_iter().collect(),
        }
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display_hex() {
        let tag: TagId = "04A1B2C3".parse().unwrap();
        assert_eq!(tag.as_bytes(), &[0x04, 0xa1, 0xb2, 0xc3]);
        assert_eq!(tag.to_string(), "04a1b2c3");
        assert_eq!(format!("{:?}", tag), "TagId(04a1b2c3)");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("".parse::<TagId>().is_err());
        assert!("   ".parse::<TagId>().is_err());
        assert!("abc".parse::<TagId>().is_err());
        assert!("zz11".parse::<TagId>().is_err());
    }

    #[test]
    fn test_identity_equality() {
        let a = TagId::new(vec![1, 2, 3]);
        let b: TagId = "010203".parse().unwrap();
        let c = TagId::from(&[1u8, 2, 4][..]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_command_table_lookup() {
        let a: TagId = "aa".parse().unwrap();
        let z: TagId = "ff".parse().unwrap();
        let table: CommandTable = vec![(a.clone(), "foo".to_string())].into_iter().collect();
        assert_eq!(table.lookup(&a), Some("foo"));
        assert_eq!(table.lookup(&z), None);
        assert_eq!(table.len(), 1);
        assert!(!table.is_empty());
        assert!(CommandTable::new().is_empty());
    }
}
