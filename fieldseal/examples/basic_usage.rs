//! Basic usage example for fieldseal.

use fieldseal::prelude::*;
use serde_json::json;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Fieldseal Basic Usage Example");
    println!("=============================\n");

    // Resolve key material from configuration. In production the secret
    // comes from the host application's config file or secret manager.
    let config = SealConfig::new("example operator secret");
    let keyring = Arc::new(Keyring::new(&config)?);
    println!("✓ Keyring resolved from configuration\n");

    // Declare the policy for this entity type once.
    let policy = FieldPolicy::new()
        .encrypt_field("name")
        .index_field("name")
        .encrypt_field("notes");
    println!("✓ Policy declared: name (encrypted + indexed), notes (encrypted)\n");

    // Build the repository boundary over a store.
    let clients = Repository::new(MemoryStore::new(), DocumentCodec::new(keyring, policy));

    // Save a plaintext document; encryption happens inside the boundary.
    let fields = json!({
        "name": "Acme Corp",
        "notes": "net 30",
        "plan": "pro",
    })
    .as_object()
    .cloned()
    .ok_or("object literal")?;

    let id = clients.insert(fields)?;
    println!("✓ Document saved with id {id}");

    // At rest, the name is an opaque envelope plus a sibling hash.
    let raw = clients.store().get(&id)?.ok_or("document missing")?;
    println!("  At rest:  name = {}", raw["name"]);
    println!("            nameHash = {}\n", raw["nameHash"]);

    // Exact-match search never decrypts anything: the query term is hashed
    // and matched against the stored hash. Case does not matter.
    let found = clients.find_by_index("name", "ACME CORP")?;
    println!("✓ Search for \"ACME CORP\" found {} document(s)", found.len());

    // Reads come back decrypted.
    let loaded = clients.get(&id)?.ok_or("document missing")?;
    println!("✓ Loaded:   name = {:?}", loaded.get_str("name"));
    println!("            notes = {:?}", loaded.get_str("notes"));

    Ok(())
}
