//! End-to-end tests over a repository backed by the in-memory store.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aes::Aes256;
use aes_gcm::{AeadInPlace, AesGcm, KeyInit};
use fieldseal::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;

fn client_repository(config: &SealConfig) -> Repository<MemoryStore> {
    let keyring = Arc::new(Keyring::new(config).expect("keyring failed"));
    let policy = FieldPolicy::new()
        .encrypt_field("name")
        .index_field("name")
        .encrypt_field("notes");
    Repository::new(MemoryStore::new(), DocumentCodec::new(keyring, policy))
}

fn fields(value: Value) -> Fields {
    value.as_object().expect("object literal").clone()
}

/// Builds a legacy-format string encrypted under a raw 32-byte key.
fn legacy_fixture(key: &[u8; 32], plaintext: &str) -> String {
    let cipher = AesGcm::<Aes256, U16>::new_from_slice(key).expect("cipher init failed");
    let iv = [0x5au8; 16];
    let mut buffer = plaintext.as_bytes().to_vec();
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(&iv), b"", &mut buffer)
        .expect("encrypt failed");
    format!("{}:{}:{}", hex::encode(iv), hex::encode(tag), hex::encode(buffer))
}

#[test]
fn test_write_search_read_cycle() {
    let config = SealConfig::new("operator secret");
    let clients = client_repository(&config);

    let id = clients
        .insert(fields(json!({
            "name": "Acme Corp",
            "notes": "net 30, contact via billing portal",
            "plan": "pro",
        })))
        .expect("insert failed");

    // At rest: envelope ciphertext plus a sibling hash, plaintext gone.
    let raw = clients.store().get(&id).expect("store failed").expect("missing document");
    let stored_name = raw["name"].as_str().unwrap();
    assert_eq!(classify(stored_name), Format::V1);
    assert!(!stored_name.contains("Acme"));

    let keyring = Keyring::new(&config).expect("keyring failed");
    assert_eq!(
        raw["nameHash"].as_str().unwrap(),
        blind_index(&keyring, "acme corp").expect("index failed"),
    );

    // Exact-match search with a differently-cased query term.
    let found = clients.find_by_index("name", "ACME CORP").expect("search failed");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get_str("name"), Some("Acme Corp"));

    // Read back: everything decrypted, unlisted fields untouched.
    let loaded = clients.get(&id).expect("get failed").expect("missing document");
    assert_eq!(loaded.get_str("name"), Some("Acme Corp"));
    assert_eq!(loaded.get_str("notes"), Some("net 30, contact via billing portal"));
    assert_eq!(loaded.get_str("plan"), Some("pro"));
}

#[test]
fn test_update_moves_index_with_value() {
    let config = SealConfig::new("operator secret");
    let clients = client_repository(&config);

    let id = clients.insert(fields(json!({"name": "Acme Corp"}))).expect("insert failed");

    let updated = clients
        .update(&id, json!({"$set": {"name": "Acme Corporation"}}))
        .expect("update failed")
        .expect("missing document");
    assert_eq!(updated.get_str("name"), Some("Acme Corporation"));

    assert!(clients.find_by_index("name", "Acme Corp").unwrap().is_empty());
    assert_eq!(clients.find_by_index("name", "acme corporation").unwrap().len(), 1);

    // The re-encrypted value is a fresh envelope, not the original one.
    let raw = clients.store().get(&id).unwrap().unwrap();
    assert_eq!(classify(raw["name"].as_str().unwrap()), Format::V1);
}

#[test]
fn test_bulk_update_by_query() {
    let config = SealConfig::new("operator secret");
    let clients = client_repository(&config);

    clients.insert(fields(json!({"name": "Acme Corp", "plan": "free"}))).unwrap();
    clients.insert(fields(json!({"name": "Blue LLC", "plan": "free"}))).unwrap();
    clients.insert(fields(json!({"name": "Crate GmbH", "plan": "pro"}))).unwrap();

    let touched = clients
        .update_where(
            &fields(json!({"plan": "free"})),
            json!({"$set": {"notes": "migrated from free tier"}}),
        )
        .expect("bulk update failed");
    assert_eq!(touched, 2);

    // Notes were encrypted inside the update payload; names untouched.
    let found = clients.find_by_index("name", "Blue LLC").unwrap();
    assert_eq!(found[0].get_str("notes"), Some("migrated from free tier"));

    let untouched = clients.find_by_index("name", "Crate GmbH").unwrap();
    assert!(untouched[0].get_str("notes").is_none());
}

#[test]
fn test_double_save_does_not_double_encrypt() {
    let config = SealConfig::new("operator secret");
    let clients = client_repository(&config);

    let id = clients.insert(fields(json!({"name": "Acme Corp"}))).unwrap();
    let raw = clients.store().get(&id).unwrap().unwrap();

    // Re-insert the stored (already encrypted) form, as a hook-happy
    // object mapper would. The envelope must survive unchanged.
    let mut reinserted = raw.clone();
    reinserted.remove("_id");
    let id2 = clients.insert(reinserted).unwrap();
    let raw2 = clients.store().get(&id2).unwrap().unwrap();

    assert_eq!(raw2["name"], raw["name"]);
    assert_eq!(raw2["nameHash"], raw["nameHash"]);

    let loaded = clients.get(&id2).unwrap().unwrap();
    assert_eq!(loaded.get_str("name"), Some("Acme Corp"));
}

#[test]
fn test_legacy_document_reads_through_fallback_key() {
    let legacy_key = [0x42u8; 32];
    let config = SealConfig::new("operator secret").with_legacy_key(hex::encode(legacy_key));
    let clients = client_repository(&config);

    // Seed the store with a document written by the previous system.
    let fixture = legacy_fixture(&legacy_key, "Heritage Holdings");
    let id = clients
        .store()
        .insert(fields(json!({"name": fixture, "plan": "pro"})))
        .expect("seed failed");

    let loaded = clients.get(&id).expect("get failed").expect("missing document");
    assert_eq!(loaded.get_str("name"), Some("Heritage Holdings"));
}

#[test]
fn test_undecryptable_field_round_trips_unchanged() {
    let legacy_key = [0x42u8; 32];
    // No legacy key configured: the fixture cannot be decrypted.
    let config = SealConfig::new("operator secret");
    let clients = client_repository(&config);

    let fixture = legacy_fixture(&legacy_key, "Heritage Holdings");
    let id = clients
        .store()
        .insert(fields(json!({"name": fixture.clone(), "plan": "pro"})))
        .expect("seed failed");

    // The unreadable field keeps its raw stored value; the rest of the
    // document still loads.
    let loaded = clients.get(&id).expect("get failed").expect("missing document");
    assert_eq!(loaded.get_str("name"), Some(fixture.as_str()));
    assert_eq!(loaded.get_str("plan"), Some("pro"));
}

#[test]
fn test_rotated_secret_leaves_ciphertext_and_indexes_dark() {
    let clients = client_repository(&SealConfig::new("old secret"));
    let id = clients.insert(fields(json!({"name": "Acme Corp"}))).unwrap();
    let raw = clients.store().get(&id).unwrap().unwrap();

    // Same data under a new secret, no migration pass.
    let rotated = client_repository(&SealConfig::new("new secret"));
    let id2 = rotated.store().insert(raw).expect("seed failed");

    // Ciphertext no longer decrypts (field round-trips unchanged) and the
    // old blind index no longer matches queries.
    let loaded = rotated.get(&id2).unwrap().unwrap();
    assert_eq!(classify(loaded.get_str("name").unwrap()), Format::V1);
    assert!(rotated.find_by_index("name", "Acme Corp").unwrap().is_empty());
}

#[test]
fn test_plaintext_seed_data_reads_and_upgrades() {
    let config = SealConfig::new("operator secret");
    let clients = client_repository(&config);

    // Administrative seed row written before encryption was enabled.
    let id = clients
        .store()
        .insert(fields(json!({"name": "Seed Tenant"})))
        .expect("seed failed");

    // Reads as-is.
    let loaded = clients.get(&id).unwrap().unwrap();
    assert_eq!(loaded.get_str("name"), Some("Seed Tenant"));

    // A save through the boundary upgrades it to the current envelope.
    let updated = clients.update(&id, json!({"name": "Seed Tenant"})).unwrap().unwrap();
    assert_eq!(updated.get_str("name"), Some("Seed Tenant"));
    let raw = clients.store().get(&id).unwrap().unwrap();
    assert_eq!(classify(raw["name"].as_str().unwrap()), Format::V1);
}
