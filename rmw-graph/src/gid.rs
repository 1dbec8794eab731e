use std::fmt;

use serde::{Deserialize, Serialize};

/// Storage size of a DDS entity identifier, in bytes.
pub const GID_STORAGE_SIZE: usize = 24;

/// Opaque identifier of a DDS-level entity (participant, data writer or
/// data reader), unique process-wide for the lifetime of the entity.
///
/// Ordered lexicographically by its bytes so that it can be used as an
/// ordered-map key.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Gid([u8; GID_STORAGE_SIZE]);

impl Gid {
    pub const fn from_bytes(bytes: [u8; GID_STORAGE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Wire representation of the identifier.
    pub const fn as_bytes(&self) -> &[u8; GID_STORAGE_SIZE] {
        &self.0
    }

    pub fn compare(&self, other: &Gid) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl From<[u8; GID_STORAGE_SIZE]> for Gid {
    fn from(bytes: [u8; GID_STORAGE_SIZE]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}
