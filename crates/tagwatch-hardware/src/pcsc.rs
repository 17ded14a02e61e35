//! PN53x readers (ACR122U and compatibles) driven through PC/SC.
//!
//! The reader is opened in direct mode and PN53x commands are wrapped in the
//! ACR122U pseudo-APDU `FF 00 00 00 Lc <command>`, sent with the CCID escape
//! control code. Polling issues one `InListPassiveTarget` per modulation, in
//! the order given, until a target answers or the timeout elapses.
//!
//! PC/SC calls block, so every exchange runs on
//! [`tokio::task::spawn_blocking`] against a card handle held in a lock.
//! An exchange whose caller gave up still runs to completion and the handle
//! stays usable for the next one.
//!
//! Frame parsing lives in [`frame`] and does not need a reader.

use std::ffi::CString;
use std::time::{Duration, Instant};

use pcsc::{Card, Context, Disposition, Protocols, Scope, ShareMode};
use tracing::{debug, trace};

use crate::{
    HardwareError, Result,
    blocking::BlockingCell,
    traits::{NfcDevice, NfcDriver},
    types::{DeviceInfo, Modulation, PollResponse},
};

/// CCID escape function number (`IOCTL_CCID_ESCAPE` = `SCARD_CTL_CODE(3500)`).
const CCID_ESCAPE: u32 = 3500;

/// Response buffer size for one escape exchange.
const RESPONSE_BUFFER_SIZE: usize = 300;

/// Passive activation retries per `InListPassiveTarget`.
///
/// The PN53x default (0xFF) retries forever, which would make a single poll
/// unbounded.
const PASSIVE_ACTIVATION_RETRIES: u8 = 0x01;

/// PC/SC driver for PN53x-based readers.
#[derive(Debug, Default, Clone, Copy)]
pub struct PcscDriver;

impl PcscDriver {
    /// Create a new driver.
    pub fn new() -> Self {
        Self
    }
}

impl NfcDriver for PcscDriver {
    type Device = PcscDevice;

    async fn open(&self, connstring: &str) -> Result<PcscDevice> {
        let wanted = connstring.strip_prefix("pcsc:").unwrap_or(connstring).to_string();

        tokio::task::spawn_blocking(move || connect(&wanted))
            .await
            .map_err(|e| HardwareError::other(format!("PC/SC open task failed: {e}")))?
    }
}

fn connect(wanted: &str) -> Result<PcscDevice> {
    let context = Context::establish(Scope::User)
        .map_err(|e| {
            HardwareError::communication(format!("Failed to establish PC/SC context: {e}"))
        })?;

    let readers = context
        .list_readers_owned()
        .map_err(|e| HardwareError::communication(format!("Failed to list readers: {e}")))?;

    let reader = select_reader(&readers, wanted)
        .ok_or_else(|| HardwareError::disconnected(display_connstring(wanted)))?;
    let reader_name = reader.to_string_lossy().into_owned();

    debug!("Connecting to PC/SC reader {}", reader_name);

    let card = context
        .connect(reader, ShareMode::Direct, Protocols::UNDEFINED)
        .map_err(|e| match e {
            pcsc::Error::SharingViolation => HardwareError::device_busy(reader_name.clone()),
            other => HardwareError::communication(format!(
                "Failed to connect to {reader_name}: {other}"
            )),
        })?;

    Ok(PcscDevice {
        card: BlockingCell::new(reader_name.clone(), card),
        reader: reader_name,
        firmware: None,
    })
}

/// Pick the reader whose name contains `wanted`, or the first one when empty.
fn select_reader<'a>(readers: &'a [CString], wanted: &str) -> Option<&'a CString> {
    if wanted.is_empty() {
        return readers.first();
    }
    readers
        .iter()
        .find(|reader| reader.to_string_lossy().contains(wanted))
}

fn display_connstring(connstring: &str) -> &str {
    if connstring.is_empty() {
        "<autodetect>"
    } else {
        connstring
    }
}

/// An open PN53x reader.
pub struct PcscDevice {
    card: BlockingCell<Card>,
    reader: String,
    firmware: Option<String>,
}

impl std::fmt::Debug for PcscDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcscDevice")
            .field("reader", &self.reader)
            .field("firmware", &self.firmware)
            .finish()
    }
}

impl NfcDevice for PcscDevice {
    async fn initiator_init(&mut self) -> Result<()> {
        let firmware = self
            .card
            .run(|card| {
                let reply = transceive(card, &frame::get_firmware_version())?;
                let firmware = frame::parse_firmware_version(&reply)?;

                let reply = transceive(card, &frame::set_max_retries(PASSIVE_ACTIVATION_RETRIES))?;
                frame::expect_reply(&reply, frame::RF_CONFIGURATION)?;

                Ok(firmware)
            })
            .await
            .map_err(|e| HardwareError::initialization_failed(e.to_string()))?;

        debug!("{} runs {}", self.reader, firmware);
        self.firmware = Some(firmware);
        Ok(())
    }

    async fn poll_target(
        &mut self,
        modulations: &[Modulation],
        target_count: u8,
        timeout: Duration,
    ) -> Result<PollResponse> {
        let modulations = modulations.to_vec();
        // The PN53x lists at most two targets
        let max_targets = target_count.clamp(1, 2);

        self.card
            .run(move |card| poll_blocking(card, &modulations, max_targets, timeout))
            .await
    }

    async fn close(&mut self) -> Result<()> {
        self.card
            .release(|card| {
                card.disconnect(Disposition::LeaveCard).map_err(|(_card, e)| {
                    HardwareError::communication(format!("Failed to release reader: {e}"))
                })
            })
            .await
    }

    fn info(&self) -> DeviceInfo {
        let info = DeviceInfo::new(self.reader.clone(), format!("pcsc:{}", self.reader));
        match &self.firmware {
            Some(firmware) => info.with_firmware_version(firmware.clone()),
            None => info,
        }
    }
}

fn poll_blocking(
    card: &Card,
    modulations: &[Modulation],
    max_targets: u8,
    timeout: Duration,
) -> Result<PollResponse> {
    let deadline = Instant::now() + timeout;

    for modulation in modulations {
        if Instant::now() >= deadline {
            trace!("Poll deadline reached before {}", modulation);
            break;
        }

        let Some(command) = frame::in_list_passive_target(*modulation, max_targets) else {
            trace!("PN53x cannot probe {}, skipping", modulation);
            continue;
        };

        let reply = transceive(card, &command)?;
        let response = frame::parse_in_list_passive_target(*modulation, &reply)?;
        if response.count > 0 {
            return Ok(response);
        }
    }

    Ok(PollResponse::none())
}

/// Send one PN53x command through the escape channel and return its reply.
fn transceive(card: &Card, command: &[u8]) -> Result<Vec<u8>> {
    let apdu = frame::wrap_escape(command)?;
    let mut buffer = [0u8; RESPONSE_BUFFER_SIZE];

    let response = card
        .control(pcsc::ctl_code(CCID_ESCAPE.into()), &apdu, &mut buffer)
        .map_err(|e| HardwareError::communication(format!("Escape command failed: {e}")))?;

    frame::strip_status_word(response)
}

/// PN53x frame building and parsing.
pub mod frame {
    use crate::{
        HardwareError, Result,
        types::{BaudRate, Modulation, ModulationType, PollResponse, RawTarget, UidBuffer},
    };

    /// Host-to-PN53x frame identifier.
    pub const HOST_TO_PN53X: u8 = 0xD4;

    /// PN53x-to-host frame identifier.
    pub const PN53X_TO_HOST: u8 = 0xD5;

    /// `GetFirmwareVersion` command code.
    pub const GET_FIRMWARE_VERSION: u8 = 0x02;

    /// `RFConfiguration` command code.
    pub const RF_CONFIGURATION: u8 = 0x32;

    /// `InListPassiveTarget` command code.
    pub const IN_LIST_PASSIVE_TARGET: u8 = 0x4A;

    /// FeliCa polling request: system code FFFF, request system code, one slot.
    const FELICA_POLLING: [u8; 5] = [0x00, 0xFF, 0xFF, 0x01, 0x00];

    /// Wrap a PN53x command in the ACR122U direct-transmit pseudo-APDU.
    ///
    /// # Errors
    ///
    /// Returns an error if the command does not fit a short APDU.
    pub fn wrap_escape(command: &[u8]) -> Result<Vec<u8>> {
        let lc = u8::try_from(command.len())
            .map_err(|_| HardwareError::invalid_data("PN53x command too long"))?;
        let mut apdu = Vec::with_capacity(command.len() + 5);
        apdu.extend_from_slice(&[0xFF, 0x00, 0x00, 0x00, lc]);
        apdu.extend_from_slice(command);
        Ok(apdu)
    }

    /// Split the `90 00` status word off a reader response.
    ///
    /// # Errors
    ///
    /// Returns an error if the response is too short or reports failure.
    pub fn strip_status_word(response: &[u8]) -> Result<Vec<u8>> {
        match response {
            [body @ .., 0x90, 0x00] => Ok(body.to_vec()),
            [.., sw1, sw2] => Err(HardwareError::communication(format!(
                "Reader returned status {sw1:02X}{sw2:02X}"
            ))),
            _ => Err(HardwareError::invalid_data("Reader response too short")),
        }
    }

    /// `GetFirmwareVersion` command.
    pub fn get_firmware_version() -> Vec<u8> {
        vec![HOST_TO_PN53X, GET_FIRMWARE_VERSION]
    }

    /// `RFConfiguration` item 5 (MaxRetries).
    pub fn set_max_retries(passive_activation: u8) -> Vec<u8> {
        vec![HOST_TO_PN53X, RF_CONFIGURATION, 0x05, 0xFF, 0x01, passive_activation]
    }

    /// `InListPassiveTarget` for `modulation`, or `None` if the PN53x cannot
    /// probe it.
    pub fn in_list_passive_target(modulation: Modulation, max_targets: u8) -> Option<Vec<u8>> {
        let (brty, initiator_data): (u8, &[u8]) =
            match (modulation.modulation_type, modulation.baud_rate) {
                (ModulationType::Iso14443a, BaudRate::Nbr106) => (0x00, &[]),
                (ModulationType::Felica, BaudRate::Nbr212) => (0x01, &FELICA_POLLING[..]),
                (ModulationType::Felica, BaudRate::Nbr424) => (0x02, &FELICA_POLLING[..]),
                // AFI 0x00 selects every application family
                (ModulationType::Iso14443b, BaudRate::Nbr106) => (0x03, &[0x00]),
                (ModulationType::Jewel, BaudRate::Nbr106) => (0x04, &[]),
                _ => return None,
            };

        let mut command = vec![HOST_TO_PN53X, IN_LIST_PASSIVE_TARGET, max_targets, brty];
        command.extend_from_slice(initiator_data);
        Some(command)
    }

    /// Check that `reply` answers `command` and return its payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the reply header does not match.
    pub fn expect_reply(reply: &[u8], command: u8) -> Result<&[u8]> {
        match reply {
            [PN53X_TO_HOST, code, payload @ ..] if *code == command + 1 => Ok(payload),
            _ => Err(HardwareError::invalid_data(format!(
                "Unexpected PN53x reply to command {command:02X}: {reply:02X?}"
            ))),
        }
    }

    /// Parse a `GetFirmwareVersion` reply into a display string.
    ///
    /// # Errors
    ///
    /// Returns an error if the reply is malformed.
    pub fn parse_firmware_version(reply: &[u8]) -> Result<String> {
        match expect_reply(reply, GET_FIRMWARE_VERSION)? {
            [ic, version, revision, ..] => Ok(format!("PN5{ic:02x} v{version}.{revision}")),
            _ => Err(HardwareError::invalid_data("Truncated firmware version")),
        }
    }

    /// Parse an `InListPassiveTarget` reply for a probe at `modulation`.
    ///
    /// Only the first listed target is decoded.
    ///
    /// # Errors
    ///
    /// Returns an error if the reply is malformed or truncated.
    pub fn parse_in_list_passive_target(
        modulation: Modulation,
        reply: &[u8],
    ) -> Result<PollResponse> {
        let payload = expect_reply(reply, IN_LIST_PASSIVE_TARGET)?;
        let mut reader = Reader::new(payload);

        let count = usize::from(reader.byte()?);
        if count == 0 {
            return Ok(PollResponse::none());
        }

        // Logical target number
        reader.byte()?;

        let target = match (modulation.modulation_type, modulation.baud_rate) {
            (ModulationType::Iso14443a, _) => parse_iso14443a(&mut reader)?,
            (ModulationType::Felica, baud_rate) => parse_felica(&mut reader, baud_rate)?,
            (ModulationType::Iso14443b, _) => parse_iso14443b(&mut reader)?,
            (ModulationType::Jewel, _) => parse_jewel(&mut reader)?,
            _ => RawTarget::Unsupported {
                modulation,
                data: reader.rest().to_vec(),
            },
        };

        Ok(PollResponse {
            count,
            target: Some(target),
        })
    }

    fn parse_iso14443a(reader: &mut Reader<'_>) -> Result<RawTarget> {
        let atqa = reader.array::<2>()?;
        let sak = reader.byte()?;
        let uid_len = usize::from(reader.byte()?);
        let uid = UidBuffer::from_slice(reader.take(uid_len)?)?;

        // ATS length byte counts itself
        let ats = match reader.byte() {
            Ok(ats_len) if ats_len > 1 => reader.take(usize::from(ats_len) - 1)?.to_vec(),
            _ => Vec::new(),
        };

        Ok(RawTarget::Iso14443a {
            atqa,
            sak,
            uid,
            ats,
        })
    }

    fn parse_felica(reader: &mut Reader<'_>, baud_rate: BaudRate) -> Result<RawTarget> {
        let pol_res_len = reader.byte()?;
        let response_code = reader.byte()?;
        let id = UidBuffer::full(reader.array::<8>()?);
        let pad = reader.array::<8>()?;
        // POL_RES is 18 bytes, 20 when the system code was requested
        let system_code = if pol_res_len >= 20 {
            Some(reader.array::<2>()?)
        } else {
            None
        };

        Ok(RawTarget::Felica {
            baud_rate,
            response_code,
            id,
            pad,
            system_code,
        })
    }

    fn parse_iso14443b(reader: &mut Reader<'_>) -> Result<RawTarget> {
        let atqb_code = reader.byte()?;
        if atqb_code != 0x50 {
            return Err(HardwareError::invalid_data(format!(
                "Unexpected ATQB code {atqb_code:02X}"
            )));
        }
        let pupi = reader.array::<4>()?;
        let application_data = UidBuffer::full(reader.array::<4>()?);
        let protocol_info = reader.array::<3>()?;

        let card_identifier = match reader.byte() {
            Ok(attrib_len) if attrib_len > 0 => reader.byte()? & 0x0F,
            _ => 0,
        };

        Ok(RawTarget::Iso14443b {
            pupi,
            application_data,
            protocol_info,
            card_identifier,
        })
    }

    fn parse_jewel(reader: &mut Reader<'_>) -> Result<RawTarget> {
        let sens_res = reader.array::<2>()?;
        let id = UidBuffer::full(reader.array::<4>()?);
        Ok(RawTarget::Jewel { sens_res, id })
    }

    /// Bounds-checked cursor over a reply payload.
    struct Reader<'a> {
        data: &'a [u8],
    }

    impl<'a> Reader<'a> {
        fn new(data: &'a [u8]) -> Self {
            Self { data }
        }

        fn take(&mut self, len: usize) -> Result<&'a [u8]> {
            if self.data.len() < len {
                return Err(HardwareError::invalid_data(format!(
                    "Target data truncated: wanted {} bytes, {} left",
                    len,
                    self.data.len()
                )));
            }
            let (head, tail) = self.data.split_at(len);
            self.data = tail;
            Ok(head)
        }

        fn byte(&mut self) -> Result<u8> {
            Ok(self.take(1)?[0])
        }

        fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
            let mut out = [0u8; N];
            out.copy_from_slice(self.take(N)?);
            Ok(out)
        }

        fn rest(&self) -> &'a [u8] {
            self.data
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_reader() {
        let readers = vec![
            CString::new("Generic Smart Card Reader 00 00").unwrap(),
            CString::new("ACS ACR122U PICC Interface 01 00").unwrap(),
        ];

        assert_eq!(select_reader(&readers, ""), readers.first());
        assert_eq!(select_reader(&readers, "ACR122U"), readers.get(1));
        assert_eq!(select_reader(&readers, "SCL3711"), None);
    }
}
