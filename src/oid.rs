//! Object identifiers.
//!
//! An [`OId`] is a plain 20-byte value. Ids coming out of the engine are
//! always copied, never aliased, so an `OId` stays valid after the native
//! structure it was read from is gone.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{GgitError, GgitResult};
use crate::native::raw;

/// width of a raw identifier in bytes
pub const RAW_SIZE: usize = raw::GIT_OID_RAWSZ;

/// width of the hexadecimal form
pub const HEX_SIZE: usize = RAW_SIZE * 2;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OId([u8; RAW_SIZE]);

impl OId {
    /// parse the full-length hexadecimal form (either case)
    pub fn from_hex(hex: &str) -> GgitResult<Self> {
        if hex.len() != HEX_SIZE {
            return Err(GgitError::InvalidOId(format!(
                "expected {} hex characters, got {}",
                HEX_SIZE,
                hex.len()
            )));
        }

        let mut bytes = [0u8; RAW_SIZE];
        hex::decode_to_slice(hex, &mut bytes)
            .map_err(|e| GgitError::InvalidOId(format!("{hex}: {e}")))?;

        Ok(Self(bytes))
    }

    /// build from raw bytes; the slice must be exactly [`RAW_SIZE`] long
    pub fn from_bytes(bytes: &[u8]) -> GgitResult<Self> {
        let bytes: [u8; RAW_SIZE] = bytes.try_into().map_err(|_| {
            GgitError::InvalidOId(format!(
                "expected {} raw bytes, got {}",
                RAW_SIZE,
                bytes.len()
            ))
        })?;

        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; RAW_SIZE] {
        &self.0
    }

    /// lowercase hexadecimal form, always [`HEX_SIZE`] characters
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// short form of the id
    pub fn short(&self) -> String {
        self.to_hex()[..7].to_string()
    }

    /// the all-zero id
    pub fn zero() -> Self {
        Self([0; RAW_SIZE])
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// check if the hex form starts with `prefix` (either case)
    pub fn has_prefix(&self, prefix: &str) -> bool {
        prefix.len() <= HEX_SIZE && self.to_hex().starts_with(&prefix.to_ascii_lowercase())
    }

    /// copy an id out of native memory; `None` for a null pointer
    ///
    /// # Safety
    /// `ptr` must be null or point to a live `git_oid`.
    pub(crate) unsafe fn from_native(ptr: *const raw::git_oid) -> Option<Self> {
        if ptr.is_null() {
            None
        } else {
            Some(Self((*ptr).id))
        }
    }

    pub(crate) fn to_native(self) -> raw::git_oid {
        raw::git_oid { id: self.0 }
    }
}

impl fmt::Display for OId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for OId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OId({})", self.to_hex())
    }
}

impl FromStr for OId {
    type Err = GgitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<git2::Oid> for OId {
    fn from(oid: git2::Oid) -> Self {
        let mut bytes = [0u8; RAW_SIZE];
        bytes.copy_from_slice(oid.as_bytes());
        Self(bytes)
    }
}

impl From<OId> for git2::Oid {
    fn from(oid: OId) -> Self {
        // a RAW_SIZE slice always converts
        git2::Oid::from_bytes(&oid.0).unwrap_or_else(|_| git2::Oid::zero())
    }
}

impl Serialize for OId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for OId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        OId::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SAMPLE: &str = "0123456789abcdef0123456789abcdef01234567";

    #[test]
    fn test_parse_and_format() {
        let oid = OId::from_hex(SAMPLE).unwrap();
        assert_eq!(oid.to_hex(), SAMPLE);
        assert_eq!(oid.to_string(), SAMPLE);
        assert_eq!(oid.short(), "0123456");
        assert!(oid.has_prefix("01234"));
        assert!(oid.has_prefix("0123456789ABCDEF"));
        assert!(!oid.has_prefix("1"));
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert!(matches!(OId::from_hex("abc"), Err(GgitError::InvalidOId(_))));
        let long = format!("{SAMPLE}0");
        assert!(OId::from_hex(&long).is_err());
        assert!(OId::from_hex("").is_err());
    }

    #[test]
    fn test_rejects_non_hex() {
        let bad = SAMPLE.replace('a', "g");
        assert!(matches!(OId::from_hex(&bad), Err(GgitError::InvalidOId(_))));
    }

    #[test]
    fn test_zero() {
        assert!(OId::zero().is_zero());
        assert!(!OId::from_hex(SAMPLE).unwrap().is_zero());
    }

    #[test]
    fn test_from_bytes() {
        let oid = OId::from_bytes(&[7u8; RAW_SIZE]).unwrap();
        assert_eq!(oid.as_bytes(), &[7u8; RAW_SIZE]);
        assert!(OId::from_bytes(&[7u8; 3]).is_err());
    }

    #[test]
    fn test_git2_interop() {
        let ours = OId::from_hex(SAMPLE).unwrap();
        let theirs: git2::Oid = ours.into();
        assert_eq!(theirs.to_string(), SAMPLE);
        assert_eq!(OId::from(theirs), ours);
    }

    #[test]
    fn test_serde_as_hex() {
        let oid = OId::from_hex(SAMPLE).unwrap();
        let json = serde_json::to_string(&oid).unwrap();
        assert_eq!(json, format!("\"{SAMPLE}\""));
        let back: OId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, oid);
    }

    proptest! {
        #[test]
        fn test_hex_round_trip_is_canonical(s in "[0-9a-fA-F]{40}") {
            let oid = OId::from_hex(&s).unwrap();
            prop_assert_eq!(oid.to_hex(), s.to_ascii_lowercase());
        }

        #[test]
        fn test_short_or_long_strings_are_rejected(s in "[0-9a-f]{0,39}|[0-9a-f]{41,60}") {
            prop_assert!(OId::from_hex(&s).is_err());
        }
    }
}
