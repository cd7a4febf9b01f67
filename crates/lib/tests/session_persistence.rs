//! Integration test: the login flag round-trips through the on-disk store across
//! "restarts" (fresh gates over a reopened file), the way the clients use it.

use omnichat::auth::{SessionGate, SESSION_FLAG_KEY};
use omnichat::config::{self, Config};
use omnichat::storage::{FileStore, KeyValueStore};
use std::path::PathBuf;

fn temp_config_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("omnichat-session-test-{}", uuid::Uuid::new_v4()))
        .join("config.json")
}

fn open_gate(store_path: &PathBuf) -> SessionGate<FileStore> {
    let store = FileStore::open(store_path).expect("open store");
    let mut gate = SessionGate::new(store);
    gate.restore_session();
    gate
}

#[test]
fn login_survives_restart_and_logout_does_not() {
    let config_path = temp_config_path();
    let store_path = config::resolve_store_path(&Config::default(), &config_path);

    let mut gate = open_gate(&store_path);
    assert!(!gate.is_logged_in());
    assert!(gate.login("wrong").is_err());
    assert!(!store_path.exists());

    gate.login("*6J^o!kqIXsK^oK#").expect("correct secret");
    let on_disk: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&store_path).expect("store written"))
            .expect("store is json");
    assert_eq!(on_disk, serde_json::json!({ "isLoggedIn": "true" }));

    let mut restarted = open_gate(&store_path);
    assert!(restarted.is_logged_in());

    restarted.logout();
    assert_eq!(restarted.store().get(SESSION_FLAG_KEY), None);

    let after_logout = open_gate(&store_path);
    assert!(!after_logout.is_logged_in());

    if let Some(dir) = config_path.parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
}

#[test]
fn tampered_flag_is_not_trusted() {
    let config_path = temp_config_path();
    let store_path = config::resolve_store_path(&Config::default(), &config_path);
    std::fs::create_dir_all(store_path.parent().unwrap()).unwrap();
    std::fs::write(&store_path, r#"{"isLoggedIn":"yes"}"#).unwrap();

    let gate = open_gate(&store_path);
    assert!(!gate.is_logged_in());

    if let Some(dir) = config_path.parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
}
