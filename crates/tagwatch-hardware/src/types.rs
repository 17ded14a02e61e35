//! Common types shared across NFC device implementations.
//!
//! This module defines the modulation descriptors a reader can be asked to
//! probe, the targets a reader reports back, and small helper types used by
//! the device traits.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{HardwareError, Result};

/// Physical-layer protocol family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModulationType {
    /// ISO/IEC 14443 type A (Mifare, NTAG, ...).
    #[serde(rename = "iso14443a")]
    Iso14443a,

    /// ISO/IEC 14443 type B.
    #[serde(rename = "iso14443b")]
    Iso14443b,

    /// Sony FeliCa.
    #[serde(rename = "felica")]
    Felica,

    /// Innovision Jewel / Topaz.
    #[serde(rename = "jewel")]
    Jewel,

    /// HID iClass (ISO/IEC 14443-2B based).
    #[serde(rename = "iso14443b_iclass")]
    Iso14443biClass,

    /// ST SRx (ISO/IEC 14443-2B based).
    #[serde(rename = "iso14443b2sr")]
    Iso14443b2sr,

    /// ASK CTx (ISO/IEC 14443-2B based).
    #[serde(rename = "iso14443b2ct")]
    Iso14443b2ct,

    /// Innovatron ISO/IEC 14443 B' (Calypso).
    #[serde(rename = "iso14443b_prime")]
    Iso14443bPrime,

    /// NFCIP-1 data exchange protocol.
    #[serde(rename = "dep")]
    Dep,
}

impl ModulationType {
    /// Get a human-readable name for the modulation family.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Iso14443a => "ISO/IEC 14443A",
            Self::Iso14443b => "ISO/IEC 14443-4B",
            Self::Felica => "FeliCa",
            Self::Jewel => "Innovision Jewel",
            Self::Iso14443biClass => "ISO/IEC 14443-2B iClass",
            Self::Iso14443b2sr => "ISO/IEC 14443-2B ST SRx",
            Self::Iso14443b2ct => "ISO/IEC 14443-2B ASK CTx",
            Self::Iso14443bPrime => "ISO/IEC 14443-4B'",
            Self::Dep => "D.E.P.",
        }
    }
}

impl fmt::Display for ModulationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Baud rate class of a modulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BaudRate {
    /// 106 kbps.
    #[serde(rename = "106")]
    Nbr106,

    /// 212 kbps.
    #[serde(rename = "212")]
    Nbr212,

    /// 424 kbps.
    #[serde(rename = "424")]
    Nbr424,

    /// 847 kbps.
    #[serde(rename = "847")]
    Nbr847,
}

impl BaudRate {
    /// Rate in kbps.
    pub fn kbps(&self) -> u32 {
        match self {
            Self::Nbr106 => 106,
            Self::Nbr212 => 212,
            Self::Nbr424 => 424,
            Self::Nbr847 => 847,
        }
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} kbps", self.kbps())
    }
}

/// A modulation scheme a reader can probe for: protocol family plus baud rate.
///
/// # Examples
///
/// ```
/// use tagwatch_hardware::types::{BaudRate, Modulation, ModulationType};
///
/// let modulation = Modulation::new(ModulationType::Felica, BaudRate::Nbr212);
/// assert_eq!(modulation.to_string(), "FeliCa (212 kbps)");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modulation {
    /// Protocol family.
    #[serde(rename = "type")]
    pub modulation_type: ModulationType,

    /// Baud rate class.
    pub baud_rate: BaudRate,
}

impl Modulation {
    /// Create a new modulation descriptor.
    pub const fn new(modulation_type: ModulationType, baud_rate: BaudRate) -> Self {
        Self {
            modulation_type,
            baud_rate,
        }
    }
}

impl fmt::Display for Modulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.modulation_type, self.baud_rate)
    }
}

/// Fixed-capacity identifier buffer.
///
/// Readers report identifiers in fixed-size fields of which only a prefix is
/// meaningful. `UidBuffer` keeps the field together with its valid length and
/// guarantees `len <= N`.
///
/// # Examples
///
/// ```
/// use tagwatch_hardware::types::UidBuffer;
///
/// let uid = UidBuffer::<10>::from_slice(&[0x04, 0xAB, 0xCD, 0xEF]).unwrap();
/// assert_eq!(uid.as_bytes(), &[0x04, 0xAB, 0xCD, 0xEF]);
/// assert_eq!(uid.len(), 4);
///
/// assert!(UidBuffer::<4>::from_slice(&[0u8; 5]).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UidBuffer<const N: usize> {
    bytes: [u8; N],
    len: usize,
}

impl<const N: usize> UidBuffer<N> {
    /// Capacity of the underlying field in bytes.
    pub const CAPACITY: usize = N;

    /// Create a buffer from a raw field and its valid length.
    ///
    /// # Errors
    ///
    /// Returns an error if `len` exceeds the field capacity.
    pub fn new(bytes: [u8; N], len: usize) -> Result<Self> {
        if len > N {
            return Err(HardwareError::invalid_data(format!(
                "Identifier length {} exceeds field capacity of {} bytes",
                len, N
            )));
        }
        Ok(Self { bytes, len })
    }

    /// Create a buffer whose whole field is meaningful.
    pub const fn full(bytes: [u8; N]) -> Self {
        Self { bytes, len: N }
    }

    /// Copy `data` into a zero-padded field.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` is longer than the field capacity.
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let mut bytes = [0u8; N];
        bytes
            .get_mut(..data.len())
            .ok_or_else(|| {
                HardwareError::invalid_data(format!(
                    "Identifier of {} bytes does not fit a {}-byte field",
                    data.len(),
                    N
                ))
            })?
            .copy_from_slice(data);
        Ok(Self {
            bytes,
            len: data.len(),
        })
    }

    /// The meaningful identifier bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// The whole field including padding.
    pub fn raw(&self) -> &[u8; N] {
        &self.bytes
    }

    /// Number of meaningful bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no meaningful bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A target reported by a reader, one variant per protocol family.
///
/// Each variant carries the family-specific fields the reader returns during
/// passive activation. Identifier fields are [`UidBuffer`]s sized after the
/// protocol's maximum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawTarget {
    /// ISO/IEC 14443A target.
    Iso14443a {
        /// Answer to request (SENS_RES).
        atqa: [u8; 2],
        /// Select acknowledge (SEL_RES).
        sak: u8,
        /// NFCID1, 4, 7 or 10 bytes.
        uid: UidBuffer<10>,
        /// Answer to select, empty if the target is not ISO/IEC 14443-4 compliant.
        ats: Vec<u8>,
    },

    /// ISO/IEC 14443B target.
    Iso14443b {
        /// Pseudo-unique PICC identifier.
        pupi: [u8; 4],
        /// Application data field of the ATQB.
        application_data: UidBuffer<4>,
        /// Protocol info field of the ATQB.
        protocol_info: [u8; 3],
        /// Card identifier assigned during ATTRIB.
        card_identifier: u8,
    },

    /// FeliCa target at 212 or 424 kbps.
    Felica {
        /// Baud rate the target answered at.
        baud_rate: BaudRate,
        /// Polling response code.
        response_code: u8,
        /// NFCID2.
        id: UidBuffer<8>,
        /// Manufacturer parameters.
        pad: [u8; 8],
        /// System code, when requested during polling.
        system_code: Option<[u8; 2]>,
    },

    /// Jewel / Topaz target.
    Jewel {
        /// Answer to request (SENS_RES).
        sens_res: [u8; 2],
        /// Jewel ID.
        id: UidBuffer<4>,
    },

    /// iClass target.
    Iso14443biClass {
        /// Card serial number.
        uid: UidBuffer<8>,
    },

    /// Target of a family this crate does not model field by field.
    Unsupported {
        /// Modulation the target answered at.
        modulation: Modulation,
        /// Raw target data as returned by the reader.
        data: Vec<u8>,
    },
}

impl RawTarget {
    /// Modulation the target was detected with.
    pub fn modulation(&self) -> Modulation {
        match self {
            Self::Iso14443a { .. } => Modulation::new(ModulationType::Iso14443a, BaudRate::Nbr106),
            Self::Iso14443b { .. } => Modulation::new(ModulationType::Iso14443b, BaudRate::Nbr106),
            Self::Felica { baud_rate, .. } => Modulation::new(ModulationType::Felica, *baud_rate),
            Self::Jewel { .. } => Modulation::new(ModulationType::Jewel, BaudRate::Nbr106),
            Self::Iso14443biClass { .. } => {
                Modulation::new(ModulationType::Iso14443biClass, BaudRate::Nbr106)
            }
            Self::Unsupported { modulation, .. } => *modulation,
        }
    }

    /// Convenience constructor for an ISO/IEC 14443A target.
    ///
    /// # Errors
    ///
    /// Returns an error if `uid` is longer than 10 bytes.
    pub fn iso14443a(atqa: [u8; 2], sak: u8, uid: &[u8]) -> Result<Self> {
        Ok(Self::Iso14443a {
            atqa,
            sak,
            uid: UidBuffer::from_slice(uid)?,
            ats: Vec::new(),
        })
    }
}

impl fmt::Display for RawTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} target", self.modulation())
    }
}

/// Outcome of one hardware poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollResponse {
    /// Number of targets the reader detected.
    pub count: usize,

    /// First detected target, if any.
    pub target: Option<RawTarget>,
}

impl PollResponse {
    /// A poll that found nothing.
    pub fn none() -> Self {
        Self {
            count: 0,
            target: None,
        }
    }

    /// A poll that found exactly one target.
    pub fn single(target: RawTarget) -> Self {
        Self {
            count: 1,
            target: Some(target),
        }
    }
}

/// Logic level of a digital output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineLevel {
    /// Driven high.
    High,

    /// Driven low.
    Low,
}

impl fmt::Display for LineLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// Generic reader information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Reader name (e.g., "ACS ACR122U PICC Interface 00 00").
    pub name: String,

    /// Connection string the reader was opened with.
    pub connstring: String,

    /// Optional firmware version string.
    pub firmware_version: Option<String>,
}

impl DeviceInfo {
    /// Create a new DeviceInfo with required fields.
    pub fn new(name: impl Into<String>, connstring: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connstring: connstring.into(),
            firmware_version: None,
        }
    }

    /// Set the firmware version.
    pub fn with_firmware_version(mut self, firmware_version: impl Into<String>) -> Self {
        self.firmware_version = Some(firmware_version.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modulation_display() {
        let modulation = Modulation::new(ModulationType::Iso14443a, BaudRate::Nbr106);
        assert_eq!(modulation.to_string(), "ISO/IEC 14443A (106 kbps)");
    }

    #[test]
    fn test_modulation_serialization() {
        let modulation = Modulation::new(ModulationType::Felica, BaudRate::Nbr424);
        let json = serde_json::to_string(&modulation).unwrap();
        assert_eq!(json, r#"{"type":"felica","baud_rate":"424"}"#);

        let parsed: Modulation = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, modulation);
    }

    #[test]
    fn test_uid_buffer_rejects_oversized_length() {
        assert!(UidBuffer::<4>::new([1, 2, 3, 4], 5).is_err());
        assert!(UidBuffer::<4>::new([1, 2, 3, 4], 4).is_ok());
    }

    #[test]
    fn test_uid_buffer_prefix() {
        let uid = UidBuffer::<10>::new([0xDE, 0xAD, 0xBE, 0xEF, 9, 9, 9, 9, 9, 9], 4).unwrap();
        assert_eq!(uid.as_bytes(), &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(uid.raw().len(), 10);
        assert!(!uid.is_empty());
    }

    #[test]
    fn test_uid_buffer_from_slice_pads() {
        let data = UidBuffer::<4>::from_slice(&[0x01, 0x02]).unwrap();
        assert_eq!(data.as_bytes(), &[0x01, 0x02]);
        assert_eq!(data.raw(), &[0x01, 0x02, 0x00, 0x00]);
    }

    #[test]
    fn test_raw_target_modulation() {
        let felica = RawTarget::Felica {
            baud_rate: BaudRate::Nbr424,
            response_code: 0x01,
            id: UidBuffer::full([1, 2, 3, 4, 5, 6, 7, 8]),
            pad: [0; 8],
            system_code: None,
        };
        assert_eq!(
            felica.modulation(),
            Modulation::new(ModulationType::Felica, BaudRate::Nbr424)
        );

        let other = RawTarget::Unsupported {
            modulation: Modulation::new(ModulationType::Iso14443b2sr, BaudRate::Nbr106),
            data: vec![0xD0, 0x02],
        };
        assert_eq!(other.modulation().modulation_type, ModulationType::Iso14443b2sr);
    }

    #[test]
    fn test_poll_response_constructors() {
        assert_eq!(PollResponse::none().count, 0);

        let target = RawTarget::iso14443a([0x00, 0x04], 0x08, &[1, 2, 3, 4]).unwrap();
        let response = PollResponse::single(target.clone());
        assert_eq!(response.count, 1);
        assert_eq!(response.target, Some(target));
    }

    #[test]
    fn test_device_info_builder() {
        let info = DeviceInfo::new("ACR122U", "pcsc:ACR122U").with_firmware_version("PN532 v1.6");
        assert_eq!(info.name, "ACR122U");
        assert_eq!(info.connstring, "pcsc:ACR122U");
        assert_eq!(info.firmware_version, Some("PN532 v1.6".to_string()));
    }
}
