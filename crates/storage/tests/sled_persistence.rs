use proofpot_storage::{LedgerStore, OwnerSwap, RegistryStore, SledStorage};
use proofpot_types::{HashKey, Identity, RegistryEntry, Timestamp, Token, TokenId};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn entry(creator: u8, at: u64) -> RegistryEntry {
    RegistryEntry {
        creator: Identity::repeat(creator),
        registered_at: Timestamp(at),
    }
}

#[test]
fn sled_restart_restores_registry_and_ledger() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().to_path_buf();
    let hash = HashKey::new([7u8; 32]);
    let alice = Identity::repeat(0xaa);
    let bob = Identity::repeat(0xbb);

    let token_id = {
        let storage = SledStorage::new(&path).expect("sled storage");
        assert_eq!(
            storage.insert_entry_if_absent(&hash, &entry(0x11, 100)).unwrap(),
            None
        );

        let token = Token::new(TokenId::random(), "Soup", "desc", alice, Timestamp(5));
        assert!(storage.insert_token_if_absent(&token).unwrap());
        let swapped = storage.swap_owner(&token.token_id, &alice, &bob).unwrap();
        assert!(matches!(swapped, OwnerSwap::Swapped(_)));

        storage
            .store_metadata("access_policy", b"{\"mode\":\"open\"}".to_vec())
            .unwrap();
        storage.flush().expect("flush");
        token.token_id
    };

    let reopened = SledStorage::new(&path).expect("reopen sled storage");
    assert_eq!(reopened.get_entry(&hash).unwrap(), Some(entry(0x11, 100)));
    assert_eq!(
        reopened.insert_entry_if_absent(&hash, &entry(0x22, 200)).unwrap(),
        Some(entry(0x11, 100))
    );

    let token = reopened.get_token(&token_id).unwrap().expect("token persisted");
    assert_eq!(token.owner, bob);
    assert_eq!(token.creator, alice);
    assert!(reopened.tokens_owned_by(&bob).unwrap().contains(&token_id));
    assert!(reopened.tokens_owned_by(&alice).unwrap().is_empty());
    assert_eq!(
        reopened.load_metadata("access_policy").unwrap(),
        Some(b"{\"mode\":\"open\"}".to_vec())
    );
}

#[test]
fn concurrent_inserts_for_one_hash_admit_exactly_one() {
    let storage = Arc::new(SledStorage::temporary().expect("temporary sled"));
    let hash = HashKey::new([3u8; 32]);

    let handles: Vec<_> = (1..=8u8)
        .map(|i| {
            let storage = storage.clone();
            thread::spawn(move || {
                storage
                    .insert_entry_if_absent(&hash, &entry(i, i as u64))
                    .unwrap()
                    .is_none()
            })
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|inserted| *inserted)
        .count();
    assert_eq!(winners, 1);
    assert_eq!(storage.entry_count().unwrap(), 1);
}

#[test]
fn concurrent_owner_swaps_from_one_owner_admit_exactly_one() {
    let storage = Arc::new(SledStorage::temporary().expect("temporary sled"));
    let alice = Identity::repeat(0xaa);
    let token = Token::new(TokenId::random(), "Bread", "", alice, Timestamp(1));
    storage.insert_token_if_absent(&token).unwrap();

    let handles: Vec<_> = (1..=8u8)
        .map(|i| {
            let storage = storage.clone();
            let token_id = token.token_id;
            thread::spawn(move || {
                storage
                    .swap_owner(&token_id, &alice, &Identity::repeat(i))
                    .unwrap()
            })
        })
        .collect();

    let outcomes: Vec<OwnerSwap> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let swapped = outcomes
        .iter()
        .filter(|o| matches!(o, OwnerSwap::Swapped(_)))
        .count();
    assert_eq!(swapped, 1);
    assert!(outcomes
        .iter()
        .all(|o| matches!(o, OwnerSwap::Swapped(_) | OwnerSwap::OwnerMismatch { .. })));
}
