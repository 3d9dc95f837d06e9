use super::*;
use proptest::prelude::*;

#[test]
fn hash_key_accepts_prefixed_and_bare_hex() {
    let mut bytes = [0u8; HASH_KEY_BYTES];
    bytes[31] = 1;
    let expected = HashKey::new(bytes);

    let prefixed = format!("0x{}01", "00".repeat(31));
    let bare = format!("{}01", "00".repeat(31));
    assert_eq!(HashKey::from_hex(&prefixed).unwrap(), expected);
    assert_eq!(HashKey::from_hex(&bare).unwrap(), expected);
    assert_eq!(expected.to_hex(), prefixed);
}

#[test]
fn hash_key_rejects_wrong_length_and_bad_digits() {
    let short = format!("0x{}", "ab".repeat(31));
    assert!(matches!(
        HashKey::from_hex(&short),
        Err(HexIdError::InvalidLength {
            expected: 64,
            actual: 62
        })
    ));

    let bad = format!("0x{}", "zz".repeat(32));
    assert_eq!(HashKey::from_hex(&bad), Err(HexIdError::InvalidHex));
}

#[test]
fn identity_parsing_normalizes_case() {
    let upper: Identity = "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA".parse().unwrap();
    let lower: Identity = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".parse().unwrap();
    assert_eq!(upper, lower);
    assert_eq!(upper, Identity::repeat(0xaa));
    assert_eq!(upper.to_string(), "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
}

#[test]
fn zero_identity_is_detected() {
    assert!(Identity::ZERO.is_zero());
    assert!(!Identity::repeat(0x11).is_zero());
    let parsed: Identity = format!("0x{}", "0".repeat(40)).parse().unwrap();
    assert!(parsed.is_zero());
}

#[test]
fn identities_serialize_as_canonical_strings() {
    let json = serde_json::to_string(&Identity::repeat(0x11)).unwrap();
    assert_eq!(json, "\"0x1111111111111111111111111111111111111111\"");

    let entry = RegistryEntry {
        creator: Identity::repeat(0x22),
        registered_at: Timestamp(42),
    };
    let value = serde_json::to_value(entry).unwrap();
    assert_eq!(
        value["creator"],
        "0x2222222222222222222222222222222222222222"
    );
    assert_eq!(value["registered_at"], 42);
}

#[test]
fn new_token_is_owned_by_creator() {
    let creator = Identity::repeat(0xaa);
    let token = Token::new(TokenId::random(), "Soup", "desc", creator, Timestamp(7));
    assert_eq!(token.owner, creator);
    assert_eq!(token.creator, creator);
}

#[test]
fn token_ids_parse_from_display_form() {
    let id = TokenId::random();
    let parsed: TokenId = id.to_string().parse().unwrap();
    assert_eq!(parsed, id);
}

#[test]
fn tx_refs_are_random_and_prefixed() {
    let a = TxRef::generate();
    let b = TxRef::generate();
    assert_ne!(a, b);
    assert!(a.to_hex().starts_with("0x"));
    assert_eq!(a.to_hex().len(), 2 + TX_REF_BYTES * 2);
}

#[test]
fn events_are_tagged_by_name() {
    let event = ProvenanceEvent::AdministratorTransferred {
        previous: Identity::repeat(1),
        new: Identity::repeat(2),
    };
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["event"], event.name());
}

proptest! {
    #[test]
    fn identity_text_form_is_case_insensitive(bytes in proptest::array::uniform20(any::<u8>())) {
        let identity = Identity::new(bytes);
        let upper = format!("0x{}", hex::encode_upper(bytes));
        prop_assert_eq!(upper.parse::<Identity>().unwrap(), identity);
    }
}
