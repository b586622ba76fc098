//! Tests for the file-backed auth session storage.

use client_lib::adapters::FileAuthStorage;
use client_lib::app::AuthStore;
use std::sync::Arc;
use tempfile::TempDir;
use walkthrough_core::domain::{AuthSession, User};
use walkthrough_core::ports::{AuthStorage, PortError};

fn user() -> User {
    User {
        id: 1,
        email: "a@x.com".to_string(),
        created_at: None,
    }
}

#[test]
fn missing_file_means_logged_out() {
    let tmp = TempDir::new().expect("temp dir should be created");
    let storage = FileAuthStorage::new(tmp.path().join("auth.json"));
    assert_eq!(storage.load().unwrap(), None);
}

#[test]
fn login_persists_and_logout_removes_file() {
    let tmp = TempDir::new().expect("temp dir should be created");
    let path = tmp.path().join("nested").join("dir").join("auth.json");

    let store = AuthStore::new(Arc::new(FileAuthStorage::new(&path)));
    store.set_auth("t1", user());
    assert!(path.exists());

    let reopened = AuthStore::new(Arc::new(FileAuthStorage::new(&path)));
    assert_eq!(reopened.current(), Some(AuthSession::new("t1", user())));

    reopened.logout();
    assert!(!path.exists());
    assert_eq!(
        AuthStore::new(Arc::new(FileAuthStorage::new(&path))).current(),
        None
    );
}

#[test]
fn corrupt_file_is_reported_and_store_starts_logged_out() {
    let tmp = TempDir::new().expect("temp dir should be created");
    let path = tmp.path().join("auth.json");
    std::fs::write(&path, r#"{"token": "t1"}"#).expect("file should be written");

    let storage = FileAuthStorage::new(&path);
    assert!(matches!(storage.load(), Err(PortError::Storage(_))));

    let store = AuthStore::new(Arc::new(storage));
    assert!(!store.is_authenticated());
}

#[test]
fn clearing_absent_file_is_fine() {
    let tmp = TempDir::new().expect("temp dir should be created");
    let storage = FileAuthStorage::new(tmp.path().join("auth.json"));
    storage.save(None).unwrap();
}

#[test]
fn file_corrupted_while_running_reads_as_logged_out() {
    let tmp = TempDir::new().expect("temp dir should be created");
    let path = tmp.path().join("auth.json");
    let store = AuthStore::new(Arc::new(FileAuthStorage::new(&path)));

    FileAuthStorage::new(&path)
        .save(Some(&AuthSession::new("t1", user())))
        .unwrap();
    assert!(store.refresh());
    assert_eq!(store.token().as_deref(), Some("t1"));

    std::fs::write(&path, "not json").expect("file should be written");
    assert!(store.refresh());
    assert!(!store.is_authenticated());

    FileAuthStorage::new(&path)
        .save(Some(&AuthSession::new("t2", user())))
        .unwrap();
    assert!(store.refresh());
    assert_eq!(store.token().as_deref(), Some("t2"));
}
