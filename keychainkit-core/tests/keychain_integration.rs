//! End-to-end behavior of keychain handles over a shared in-memory store.

mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use keychainkit_core::query::{AttributeKey, AttributeValue};
use keychainkit_core::{AccessibilityPolicy, Keychain, KeychainConfig, KeychainError, MemoryBackend};

#[test]
fn test_keychain_flow_end_to_end() {
    let backend = common::shared_backend();
    let keychain = common::prefixed(&backend, "test_");

    keychain.set("password", "hello :)").expect("set text");
    keychain
        .set_data("blob", &[0x00, 0xff, 0x10])
        .expect("set data");
    keychain.set_bool("flag", true).expect("set bool");

    assert_eq!(backend.len(), 3);
    let mut accounts = backend.accounts();
    accounts.sort();
    assert_eq!(accounts, vec!["test_blob", "test_flag", "test_password"]);

    assert_eq!(
        keychain.get("password").expect("get").as_deref(),
        Some("hello :)")
    );
    assert_eq!(
        keychain.get_data("blob").expect("get data"),
        Some(vec![0x00, 0xff, 0x10])
    );
    assert_eq!(keychain.get_bool("flag").expect("get bool"), Some(true));

    let mut keys = keychain.all_keys().expect("all keys");
    keys.sort();
    assert_eq!(keys, vec!["test_blob", "test_flag", "test_password"]);

    assert!(keychain.delete("password").expect("delete"));
    assert_eq!(keychain.get("password").expect("get"), None);

    keychain.clear().expect("clear");
    assert!(keychain.all_keys().expect("all keys").is_empty());
    assert!(backend.is_empty());
}

#[test]
fn test_prefix_isolation() {
    let backend = common::shared_backend();
    let plain = Keychain::new(Arc::clone(&backend));
    let prefixed = common::prefixed(&backend, "app_");

    plain.set("token", "plain value").expect("set plain");
    prefixed.set("token", "prefixed value").expect("set prefixed");

    assert_eq!(plain.get("token").expect("get").as_deref(), Some("plain value"));
    assert_eq!(
        prefixed.get("token").expect("get").as_deref(),
        Some("prefixed value")
    );
    assert_eq!(
        plain.get("app_token").expect("get").as_deref(),
        Some("prefixed value")
    );

    assert!(prefixed.delete("token").expect("delete"));
    assert_eq!(plain.get("token").expect("get").as_deref(), Some("plain value"));
}

#[test]
fn test_clear_and_all_keys_ignore_prefix() {
    let backend = common::shared_backend();
    let first = common::prefixed(&backend, "first_");
    let second = common::prefixed(&backend, "second_");

    first.set("a", "1").expect("set");
    second.set("b", "2").expect("set");

    let mut keys = first.all_keys().expect("all keys");
    keys.sort();
    assert_eq!(keys, vec!["first_a", "second_b"]);

    first.clear().expect("clear");
    assert_eq!(second.get("b").expect("get"), None);
    assert!(second.all_keys().expect("all keys").is_empty());
}

#[test]
fn test_text_round_trips() {
    let keychain = Keychain::new(common::shared_backend());
    let values = [
        String::new(),
        "plain ascii".to_string(),
        "héllo wörld 🔐 こんにちは".to_string(),
        "x".repeat(64 * 1024),
    ];

    for value in &values {
        let key = common::unique_key("text");
        keychain.set(&key, value).expect("set");
        assert_eq!(keychain.get(&key).expect("get").as_deref(), Some(value.as_str()));
    }
}

#[test]
fn test_binary_payload_is_not_text() {
    let keychain = Keychain::new(common::shared_backend());
    keychain.set_data("raw", &[0xc3, 0x28]).expect("set data");

    assert_eq!(keychain.get("raw"), Err(KeychainError::Encoding));
    assert_eq!(
        keychain.get_data("raw").expect("get data"),
        Some(vec![0xc3, 0x28])
    );
}

#[test]
fn test_overwrite_keeps_single_item() {
    let backend = common::shared_backend();
    let keychain = Keychain::new(Arc::clone(&backend));

    keychain.set("k", "one").expect("set");
    keychain
        .set_with_access("k", "two", Some(AccessibilityPolicy::AfterFirstUnlockThisDeviceOnly))
        .expect("overwrite");

    assert_eq!(backend.len(), 1);
    assert_eq!(keychain.get("k").expect("get").as_deref(), Some("two"));
}

#[test]
fn test_access_group_scoping() {
    let backend = common::shared_backend();
    let shared = Keychain::with_config(
        KeychainConfig::new().with_access_group("team.shared"),
        Arc::clone(&backend),
    );
    let other = Keychain::with_config(
        KeychainConfig::new().with_access_group("team.other"),
        Arc::clone(&backend),
    );
    let unscoped = Keychain::new(Arc::clone(&backend));

    shared.set("k", "shared").expect("set");
    other.set("k", "other").expect("set");

    assert_eq!(shared.get("k").expect("get").as_deref(), Some("shared"));
    assert_eq!(other.get("k").expect("get").as_deref(), Some("other"));
    assert_eq!(unscoped.all_keys().expect("all keys").len(), 2);

    shared.clear().expect("clear");
    assert_eq!(shared.get("k").expect("get"), None);
    assert_eq!(other.get("k").expect("get").as_deref(), Some("other"));
}

#[test]
fn test_synchronizable_scoping() {
    let backend = common::shared_backend();
    let (synced, observer) = common::observed(
        &backend,
        KeychainConfig::new().with_synchronizable(true),
    );
    let local = Keychain::new(Arc::clone(&backend));

    synced.set("k", "synced").expect("set");
    let write = observer.take().expect("write query");
    assert_eq!(
        write
            .get(AttributeKey::Synchronizable)
            .and_then(AttributeValue::as_bool),
        Some(true)
    );

    // Local handles only see local items.
    assert_eq!(local.get("k").expect("get"), None);
    assert!(local.all_keys().expect("all keys").is_empty());

    local.set("k", "local").expect("set");
    assert_eq!(backend.len(), 2);

    // The wildcard on reads matches both items; the first match wins.
    assert!(synced.get("k").expect("get").is_some());
    assert_eq!(synced.all_keys().expect("all keys").len(), 2);

    // Writing through the synchronized handle removes both copies first.
    synced.set("k", "again").expect("set");
    assert_eq!(backend.len(), 1);
    assert_eq!(local.get("k").expect("get"), None);
}

#[test]
fn test_concurrent_writers_on_one_handle() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 50;

    let backend = Arc::new(MemoryBackend::new());
    let keychain = Arc::new(common::prefixed(&backend, "conc_"));

    let handles: Vec<_> = (0..THREADS)
        .map(|thread_id| {
            let keychain = Arc::clone(&keychain);
            thread::spawn(move || {
                let key = format!("worker-{thread_id}");
                for round in 0..ROUNDS {
                    let value = format!("{thread_id}:{round}");
                    keychain.set(&key, &value).expect("set");
                    assert_eq!(
                        keychain.get(&key).expect("get").as_deref(),
                        Some(value.as_str())
                    );
                    keychain.set("shared", &value).expect("set shared");
                    if round % 10 == 9 {
                        assert!(keychain.delete(&key).expect("delete"));
                        assert_eq!(keychain.get(&key).expect("get"), None);
                    }
                }
                keychain.set(&key, "done").expect("final set");
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker panicked");
    }

    let keys: HashSet<String> = keychain.all_keys().expect("all keys").into_iter().collect();
    assert_eq!(keys.len(), THREADS + 1);
    assert_eq!(backend.len(), THREADS + 1);
    for thread_id in 0..THREADS {
        assert_eq!(
            keychain.get(&format!("worker-{thread_id}")).expect("get").as_deref(),
            Some("done")
        );
    }

    let shared = keychain.get("shared").expect("get").expect("shared value");
    let (thread_id, round) = shared.split_once(':').expect("well-formed value");
    assert!(thread_id.parse::<usize>().expect("thread id") < THREADS);
    assert!(round.parse::<usize>().expect("round") < ROUNDS);
}

#[test]
fn test_concurrent_clear_and_reads() {
    const THREADS: usize = 6;

    let keychain = Arc::new(Keychain::new(common::shared_backend()));

    let handles: Vec<_> = (0..THREADS)
        .map(|thread_id| {
            let keychain = Arc::clone(&keychain);
            thread::spawn(move || {
                for round in 0..40 {
                    match (thread_id + round) % 4 {
                        0 => keychain.set("k", &format!("value-{thread_id}")).expect("set"),
                        1 => {
                            if let Some(value) = keychain.get("k").expect("get") {
                                assert!(value.starts_with("value-"));
                            }
                        }
                        2 => {
                            keychain.delete("k").expect("delete");
                        }
                        _ => keychain.clear().expect("clear"),
                    }
                    keychain.all_keys().expect("all keys");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker panicked");
    }

    assert!(keychain.all_keys().expect("all keys").len() <= 1);
}
