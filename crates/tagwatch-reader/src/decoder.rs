//! Turns a detected target into a normalized identifier.
//!
//! Each family keeps its identifier in a different field. The decoder picks
//! that field, takes its meaningful bytes and renders them as lowercase hex
//! with no separators. ISO14443B targets are identified by their application
//! data, not by their PUPI.

use std::fmt;

use serde::{Deserialize, Serialize};
use tagwatch_hardware::RawTarget;

use crate::catalog::ModulationCatalog;
use crate::error::{ReaderError, Result};

/// Lowercase hex identifier of a detected tag.
///
/// # Examples
///
/// ```
/// use tagwatch_reader::TagId;
///
/// let id = TagId::from_bytes(&[0xDE, 0xAD, 0xBE, 0xEF]);
/// assert_eq!(id.as_str(), "deadbeef");
/// assert_eq!(format!("Tag ID: {id}"), "Tag ID: deadbeef");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(String);

impl TagId {
    /// Encode identifier bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes))
    }

    /// The hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the identifier, returning the hex string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TagId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Decode the identifier of `target`.
///
/// # Errors
///
/// Returns [`ReaderError::UnrecognizedScheme`] if the target answered at a
/// modulation outside `catalog` or belongs to a family without a known
/// identifier field.
///
/// # Examples
///
/// ```
/// use tagwatch_hardware::RawTarget;
/// use tagwatch_reader::{ModulationCatalog, decode_target};
///
/// let uid = [0x04, 0x5A, 0x1B, 0x22, 0x6C, 0x5E, 0x80];
/// let target = RawTarget::iso14443a([0x00, 0x44], 0x00, &uid)?;
/// let id = decode_target(&target, &ModulationCatalog::standard())?;
/// assert_eq!(id.as_str(), "045a1b226c5e80");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn decode_target(target: &RawTarget, catalog: &ModulationCatalog) -> Result<TagId> {
    let modulation = target.modulation();
    if !catalog.contains(&modulation) {
        return Err(ReaderError::UnrecognizedScheme { modulation });
    }

    let bytes = match target {
        RawTarget::Iso14443a { uid, .. } => uid.as_bytes(),
        RawTarget::Iso14443b {
            application_data, ..
        } => application_data.as_bytes(),
        RawTarget::Felica { id, .. } => id.as_bytes(),
        RawTarget::Jewel { id, .. } => id.as_bytes(),
        RawTarget::Iso14443biClass { uid } => uid.as_bytes(),
        RawTarget::Unsupported { .. } => {
            return Err(ReaderError::UnrecognizedScheme { modulation });
        }
    };

    Ok(TagId::from_bytes(bytes))
}
