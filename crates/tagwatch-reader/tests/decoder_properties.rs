//! Property-based tests for identifier decoding.

use proptest::prelude::*;
use tagwatch_hardware::{BaudRate, Modulation, ModulationType, RawTarget, UidBuffer};
use tagwatch_reader::{ModulationCatalog, ReaderError, decode_target};

/// Strategy for a FeliCa NFCID2 field together with a valid length.
fn felica_field() -> impl Strategy<Value = ([u8; 8], usize)> {
    (any::<[u8; 8]>(), 0usize..=8)
}

/// Strategy for modulations outside the standard catalog.
fn foreign_modulation() -> impl Strategy<Value = Modulation> {
    prop_oneof![
        Just(Modulation::new(ModulationType::Iso14443b2sr, BaudRate::Nbr106)),
        Just(Modulation::new(ModulationType::Iso14443b2ct, BaudRate::Nbr106)),
        Just(Modulation::new(ModulationType::Iso14443bPrime, BaudRate::Nbr106)),
        Just(Modulation::new(ModulationType::Dep, BaudRate::Nbr106)),
        Just(Modulation::new(ModulationType::Dep, BaudRate::Nbr424)),
        Just(Modulation::new(ModulationType::Iso14443a, BaudRate::Nbr847)),
    ]
}

proptest! {
    /// Property: an ISO14443A UID decodes to the hex of exactly its bytes.
    #[test]
    fn prop_type_a_decodes_to_hex(uid in prop::collection::vec(any::<u8>(), 0..=10)) {
        let target = RawTarget::iso14443a([0x00, 0x44], 0x00, &uid).unwrap();
        let id = decode_target(&target, &ModulationCatalog::standard()).unwrap();

        prop_assert_eq!(id.as_str(), hex::encode(&uid));
    }

    /// Property: only the first `len` bytes of a field contribute, lowercase,
    /// without separators.
    #[test]
    fn prop_felica_decodes_valid_prefix((field, len) in felica_field()) {
        let target = RawTarget::Felica {
            baud_rate: BaudRate::Nbr212,
            response_code: 0x01,
            id: UidBuffer::new(field, len).unwrap(),
            pad: [0; 8],
            system_code: None,
        };
        let id = decode_target(&target, &ModulationCatalog::standard()).unwrap();

        prop_assert_eq!(id.as_str().len(), len * 2);
        prop_assert_eq!(id.as_str(), hex::encode(&field[..len]));
        prop_assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    /// Property: decoding twice yields the same identifier.
    #[test]
    fn prop_decoding_is_deterministic(uid in prop::collection::vec(any::<u8>(), 1..=10)) {
        let target = RawTarget::iso14443a([0x00, 0x04], 0x08, &uid).unwrap();
        let catalog = ModulationCatalog::standard();

        prop_assert_eq!(
            decode_target(&target, &catalog).unwrap(),
            decode_target(&target, &catalog).unwrap()
        );
    }

    /// Property: a target outside the catalog never yields an identifier.
    #[test]
    fn prop_foreign_modulation_is_rejected(
        modulation in foreign_modulation(),
        data in prop::collection::vec(any::<u8>(), 0..16),
    ) {
        let target = RawTarget::Unsupported { modulation, data };
        let result = decode_target(&target, &ModulationCatalog::standard());

        prop_assert!(
            matches!(result, Err(ReaderError::UnrecognizedScheme { .. })),
            "expected UnrecognizedScheme"
        );
    }

    /// Property: lengths past the field capacity never reach the decoder.
    #[test]
    fn prop_oversized_length_is_rejected(field in any::<[u8; 8]>(), len in 9usize..64) {
        prop_assert!(UidBuffer::new(field, len).is_err());
    }
}
