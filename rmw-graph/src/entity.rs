use std::fmt;

use crate::gid::Gid;
use crate::qos::QosProfile;

/// Node name reported when the owning node of an endpoint cannot be
/// resolved through the participant map.
pub const NODE_NAME_UNKNOWN: &str = "_NODE_NAME_UNKNOWN_";
pub const NODE_NAMESPACE_UNKNOWN: &str = "_NODE_NAMESPACE_UNKNOWN_";

#[derive(Debug, Default, Hash, strum::EnumString, strum::Display, Eq, PartialEq, Clone, Copy)]
pub enum EndpointKind {
    #[default]
    #[strum(serialize = "publisher")]
    Publisher,
    #[strum(serialize = "subscription")]
    Subscription,
}

/// One discovered data writer or data reader, as reported by the
/// transport-level discovery events. Owned by the graph cache.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EntityInfo {
    pub topic_name: String,
    pub topic_type: String,
    pub participant_gid: Gid,
    pub qos: QosProfile,
}

impl EntityInfo {
    pub fn new(
        topic_name: impl Into<String>,
        topic_type: impl Into<String>,
        participant_gid: Gid,
        qos: QosProfile,
    ) -> Self {
        Self {
            topic_name: topic_name.into(),
            topic_type: topic_type.into(),
            participant_gid,
            qos,
        }
    }
}

/// Full endpoint metadata returned by the by-topic introspection queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointInfo {
    pub node_name: String,
    pub node_namespace: String,
    pub topic_type: String,
    pub endpoint_kind: EndpointKind,
    pub endpoint_gid: Gid,
    pub qos_profile: QosProfile,
}

pub const TYPE_HASH_SIZE: usize = 32;

/// Versioned hash of a message type description, exchanged between
/// endpoints through the USER_DATA QoS to detect type incompatibilities.
#[derive(Debug, Default, Hash, PartialEq, Eq, Clone, Copy)]
pub struct TypeHash {
    pub version: u8,
    pub value: [u8; TYPE_HASH_SIZE],
}

impl TypeHash {
    /// The unset hash. Version zero means "no hash available" and is a
    /// valid state, not an error.
    pub const ZERO: TypeHash = TypeHash {
        version: 0,
        value: [0u8; TYPE_HASH_SIZE],
    };

    pub const fn new(version: u8, value: [u8; TYPE_HASH_SIZE]) -> Self {
        Self { version, value }
    }

    pub fn from_rihs_string(rihs_str: &str) -> Option<Self> {
        let hex_part = rihs_str.strip_prefix("RIHS01_")?;
        if hex_part.len() != 2 * TYPE_HASH_SIZE {
            return None;
        }
        let mut value = [0u8; TYPE_HASH_SIZE];
        for (i, chunk) in hex_part.as_bytes().chunks(2).enumerate() {
            let chunk = std::str::from_utf8(chunk).ok()?;
            value[i] = u8::from_str_radix(chunk, 16).ok()?;
        }
        Some(TypeHash { version: 1, value })
    }

    pub fn to_rihs_string(&self) -> String {
        let hex_str: String = self.value.iter().map(|b| format!("{:02x}", b)).collect();
        format!("RIHS{:02x}_{}", self.version, hex_str)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rihs_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeHashParseError {
    InvalidHashString(String),
}

impl fmt::Display for TypeHashParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHashString(s) => write!(f, "invalid type hash string: '{}'", s),
        }
    }
}

impl std::error::Error for TypeHashParseError {}

/// Encodes a type hash as a `typehash=<rihs>;` token suitable for a
/// semicolon-delimited key/value USER_DATA blob. An unset hash encodes
/// to the empty string.
pub fn encode_type_hash_for_user_data(type_hash: &TypeHash) -> String {
    if type_hash.version == 0 {
        return String::new();
    }
    format!("typehash={};", type_hash.to_rihs_string())
}

/// Scans a semicolon-delimited `key=value` USER_DATA blob for the
/// `typehash` key. A missing key yields [`TypeHash::ZERO`]; only a
/// present-but-malformed value is an error.
pub fn parse_type_hash_from_user_data(
    user_data: &[u8],
) -> Result<TypeHash, TypeHashParseError> {
    let blob = String::from_utf8_lossy(user_data);
    for token in blob.split(';') {
        let Some((key, value)) = token.split_once('=') else {
            continue;
        };
        if key != "typehash" {
            continue;
        }
        return TypeHash::from_rihs_string(value)
            .ok_or_else(|| TypeHashParseError::InvalidHashString(value.to_string()));
    }
    Ok(TypeHash::ZERO)
}
