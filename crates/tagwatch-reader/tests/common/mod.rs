//! Shared helpers for tagwatch-reader integration tests.

#![allow(dead_code)]

use std::time::Duration;

use tagwatch_hardware::mock::{MockNfcDevice, MockNfcDriver, MockNfcHandle};
use tagwatch_hardware::{BaudRate, Modulation, RawTarget, UidBuffer};
use tagwatch_reader::{ReaderConfig, ReaderSession};

/// Poll timeout used by integration tests.
pub const TEST_POLL_TIMEOUT: Duration = Duration::from_millis(50);

/// Poll interval used by integration tests.
pub const TEST_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Configuration with short timings.
pub fn test_config() -> ReaderConfig {
    ReaderConfig::default()
        .with_poll_timeout(TEST_POLL_TIMEOUT)
        .with_poll_interval(TEST_POLL_INTERVAL)
}

/// Open a session on a fresh mock reader.
pub async fn open_session() -> (ReaderSession<MockNfcDevice>, MockNfcHandle) {
    let (driver, handle) = MockNfcDriver::new();
    let session = ReaderSession::connect(&driver, test_config())
        .await
        .expect("mock reader should open");
    (session, handle)
}

/// ISO14443A target with the given UID.
pub fn type_a(uid: &[u8]) -> RawTarget {
    RawTarget::iso14443a([0x00, 0x44], 0x00, uid).expect("UID fits an ISO14443A field")
}

/// ISO14443B target with the given application data.
pub fn type_b(application_data: &[u8]) -> RawTarget {
    RawTarget::Iso14443b {
        pupi: [0x11, 0x22, 0x33, 0x44],
        application_data: UidBuffer::from_slice(application_data)
            .expect("application data fits an ISO14443B field"),
        protocol_info: [0x00, 0x81, 0x81],
        card_identifier: 0,
    }
}

/// Target of a family the standard catalog does not probe.
pub fn unsupported(modulation: Modulation) -> RawTarget {
    RawTarget::Unsupported {
        modulation,
        data: vec![0xD0, 0x02, 0x1A, 0x3B],
    }
}

/// FeliCa target at `baud_rate` with an 8-byte NFCID2.
pub fn felica(baud_rate: BaudRate, id: [u8; 8]) -> RawTarget {
    RawTarget::Felica {
        baud_rate,
        response_code: 0x01,
        id: UidBuffer::full(id),
        pad: [0; 8],
        system_code: Some([0x88, 0xB4]),
    }
}
