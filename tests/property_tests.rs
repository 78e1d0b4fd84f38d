//! Property-based tests for the metadata codec and request parameters.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

use proptest::prelude::*;
use serde_json::{Map, Value};

use pollen::core::codec::{decode, try_decode, DecodeError, START_MARKER, TERMINATORS};
use pollen::core::params::{resolve_seed, GenerationFlag, GenerationParams, SEED_UPPER_BOUND};

/// Strategy for JSON leaf values.
fn json_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        ".{0,20}".prop_map(Value::from),
        Just(Value::Null),
    ]
}

/// Strategy for metadata objects, nested one level deep.
fn json_object() -> impl Strategy<Value = Map<String, Value>> {
    let value = prop_oneof![
        3 => json_leaf(),
        1 => prop::collection::vec(json_leaf(), 0..4).prop_map(Value::from),
    ];
    prop::collection::btree_map("[a-z_]{1,10}", value, 0..8)
        .prop_map(|entries| entries.into_iter().collect())
}

/// Strategy for bytes that do not contain the start marker.
fn marker_free_bytes() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..64).prop_filter("must not contain marker", |bytes| {
        !bytes.windows(START_MARKER.len()).any(|w| w == START_MARKER)
    })
}

fn embed(prefix: &[u8], object: &Map<String, Value>, terminator: u8, suffix: &[u8]) -> Vec<u8> {
    let mut payload = prefix.to_vec();
    payload.extend_from_slice(&START_MARKER);
    payload.extend_from_slice(serde_json::to_string(object).unwrap().as_bytes());
    payload.push(terminator);
    payload.extend_from_slice(suffix);
    payload
}

// =============================================================================
// Codec
// =============================================================================

proptest! {
    /// marker + JSON text + terminator decodes to the same object.
    #[test]
    fn embedded_object_roundtrips(
        prefix in marker_free_bytes(),
        object in json_object(),
        terminator in prop::sample::select(TERMINATORS.to_vec()),
        suffix in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let payload = embed(&prefix, &object, terminator, &suffix);
        let metadata = decode(&payload).expect("metadata present");
        prop_assert_eq!(metadata.as_map(), &object);
    }

    /// Arbitrary bytes never panic the decoder.
    #[test]
    fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = decode(&bytes);
        let _ = try_decode(&bytes);
    }

    /// Arbitrary bytes after a marker never panic and only ever yield objects.
    #[test]
    fn garbage_after_marker_never_panics(tail in prop::collection::vec(any::<u8>(), 0..256)) {
        let mut payload = START_MARKER.to_vec();
        payload.extend_from_slice(&tail);
        if let Some(metadata) = decode(&payload) {
            prop_assert!(serde_json::to_value(&metadata).unwrap().is_object());
        }
    }

    /// Payloads without the marker have no metadata.
    #[test]
    fn no_marker_is_absent(bytes in marker_free_bytes()) {
        prop_assert_eq!(try_decode(&bytes), Err(DecodeError::MarkerNotFound));
        prop_assert!(decode(&bytes).is_none());
    }

    /// A marker with no terminator after it yields nothing.
    #[test]
    fn unterminated_is_absent(
        prefix in marker_free_bytes(),
        tail in prop::collection::vec(any::<u8>().prop_filter("no terminator", |b| !TERMINATORS.contains(b)), 0..64),
    ) {
        let mut payload = prefix.clone();
        payload.extend_from_slice(&START_MARKER);
        payload.extend_from_slice(&tail);
        prop_assert!(
            matches!(try_decode(&payload), Err(DecodeError::TerminatorNotFound { .. })),
            "expected TerminatorNotFound"
        );
        prop_assert!(decode(&payload).is_none());
    }

    /// With two blocks only the first is used.
    #[test]
    fn first_block_wins(first in json_object(), second in json_object()) {
        let mut payload = embed(&[0xFF, 0xD8], &first, 0x06, &[]);
        payload.extend_from_slice(&embed(&[], &second, 0x00, &[0xFF, 0xD9]));
        let metadata = decode(&payload).expect("metadata present");
        prop_assert_eq!(metadata.as_map(), &first);
    }
}

#[test]
fn known_payload_decodes_seed() {
    let mut payload = vec![0xFF, 0xFE];
    payload.extend_from_slice(&START_MARKER);
    payload.extend_from_slice(b"{\"seed\":42}");
    payload.push(0x06);
    payload.extend_from_slice(b"junk\x00more junk");

    let metadata = decode(&payload).expect("metadata present");
    assert_eq!(Value::Object(metadata.into_map()), serde_json::json!({"seed": 42}));
}

// =============================================================================
// Parameters
// =============================================================================

proptest! {
    /// Integer seed text, negative included, is used as is.
    #[test]
    fn numeric_seed_kept(seed in any::<i64>()) {
        prop_assert_eq!(resolve_seed(Some(&seed.to_string())), seed);
    }

    /// Non-numeric seed text is replaced by a seed in range.
    #[test]
    fn non_numeric_seed_replaced(text in "[a-zA-Z ]{0,12}") {
        let seed = resolve_seed(Some(&text));
        prop_assert!((0..SEED_UPPER_BOUND).contains(&seed));
    }

    /// Flags appear on the wire exactly when set.
    #[test]
    fn flags_on_wire_iff_set(mask in 0u8..16) {
        let mut params = GenerationParams::new("p").with_seed(1);
        for (i, flag) in GenerationFlag::ALL.iter().enumerate() {
            if mask & (1 << i) != 0 {
                params = params.with_flag(*flag);
            }
        }

        let pairs = params.query_pairs();
        for (i, flag) in GenerationFlag::ALL.iter().enumerate() {
            let on_wire = pairs.iter().find(|(k, _)| *k == flag.wire_key());
            if mask & (1 << i) != 0 {
                prop_assert_eq!(on_wire.map(|(_, v)| v.as_str()), Some("true"));
            } else {
                prop_assert!(on_wire.is_none());
            }
        }
    }
}
