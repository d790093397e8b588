//! Document identifiers and the path-segment codec
//!
//! A document is keyed either by an opaque string or by a 12-byte binary id that
//! travels as 24 hex characters at the HTTP boundary. Which one a path segment
//! means is decided per request by the `hexId` query flag.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;
use rand::{rng, Rng};
use thiserror::Error;

/// Length of a binary document id in bytes
pub const OBJECT_ID_LENGTH: usize = 12;

/// Length of a binary document id in hex characters
pub const OBJECT_ID_HEX_LENGTH: usize = OBJECT_ID_LENGTH * 2;

/// Per-process random bytes mixed into generated ids
static PROCESS_UNIQUE: Lazy<[u8; 5]> = Lazy::new(|| {
    let mut bytes = [0u8; 5];
    rng().fill(&mut bytes);
    bytes
});

/// Counter for generated ids, seeded randomly so restarts don't collide
static ID_COUNTER: Lazy<AtomicU32> = Lazy::new(|| AtomicU32::new(rng().random::<u32>()));

/// Failure to turn a path segment into a [`DocumentId`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// Input is not decodable hex (odd length or a non-hex character)
    #[error("malformed hex id: {0}")]
    MalformedHex(String),

    /// Input is valid hex but not a usable binary id
    #[error("invalid id value: {0}")]
    InvalidValue(String),
}

/// Fixed-size 12-byte binary identifier.
///
/// Layout of generated ids:
/// - bytes 0..4: seconds since the Unix epoch, big-endian
/// - bytes 4..9: per-process random value
/// - bytes 9..12: big-endian counter
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId([u8; OBJECT_ID_LENGTH]);

impl ObjectId {
    /// Generate a fresh id
    pub fn generate() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or_default();
        let count = ID_COUNTER.fetch_add(1, Ordering::Relaxed);

        let mut bytes = [0u8; OBJECT_ID_LENGTH];
        bytes[0..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&*PROCESS_UNIQUE);
        bytes[9..12].copy_from_slice(&count.to_be_bytes()[1..4]);

        // A zeroed clock plus zeroed random bytes would produce the one value
        // `is_valid` rejects.
        if bytes.iter().all(|b| *b == 0) {
            bytes[11] = 1;
        }

        ObjectId(bytes)
    }

    /// Create an id from raw bytes, checking the validity predicate
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IdError> {
        let array: [u8; OBJECT_ID_LENGTH] = bytes.try_into().map_err(|_| {
            IdError::InvalidValue(format!(
                "expected {} bytes, got {}",
                OBJECT_ID_LENGTH,
                bytes.len()
            ))
        })?;

        let id = ObjectId(array);
        if !id.is_valid() {
            return Err(IdError::InvalidValue("all-zero id".to_string()));
        }
        Ok(id)
    }

    /// Parse 24 hex characters
    pub fn parse_hex(s: &str) -> Result<Self, IdError> {
        let bytes = hex::decode(s).map_err(|e| IdError::MalformedHex(format!("{}: {}", s, e)))?;
        Self::from_bytes(&bytes)
    }

    /// Get the underlying bytes
    pub fn as_bytes(&self) -> &[u8; OBJECT_ID_LENGTH] {
        &self.0
    }

    /// Lowercase hex representation
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// The all-zero value is reserved and never names a document
    pub fn is_valid(&self) -> bool {
        self.0.iter().any(|b| *b != 0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hex(s)
    }
}

/// Identifier stored in a document's `_id` field
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DocumentId {
    /// Opaque string id, used verbatim
    Raw(String),
    /// 12-byte binary id
    Binary(ObjectId),
}

impl DocumentId {
    /// Decode a path segment (or body `_id`) into an identifier.
    ///
    /// With `hex == false` the input is taken as an opaque string and this never fails.
    /// Otherwise the input must be even-length hex ([`IdError::MalformedHex`]) that
    /// decodes to a valid 12-byte id ([`IdError::InvalidValue`]).
    pub fn decode(raw: &str, hex: bool) -> Result<Self, IdError> {
        if !hex {
            return Ok(DocumentId::Raw(raw.to_string()));
        }
        ObjectId::parse_hex(raw).map(DocumentId::Binary)
    }

    /// Generate a fresh binary id
    pub fn generate() -> Self {
        DocumentId::Binary(ObjectId::generate())
    }

    /// String form used for the JSON `_id` field
    pub fn encode(&self) -> String {
        match self {
            DocumentId::Raw(s) => s.clone(),
            DocumentId::Binary(oid) => oid.to_hex(),
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentId::Raw(s) => f.write_str(s),
            DocumentId::Binary(oid) => write!(f, "{}", oid),
        }
    }
}
