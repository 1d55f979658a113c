use horcrux::backend::Provider;
use horcrux::config::ConfigStore;

#[test]
fn missing_file_loads_all_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let store = ConfigStore::load(dir.path().join("absent.json"));
    assert!(!store.get().any_enabled());
}

#[test]
fn corrupt_file_loads_all_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cfg.json");
    std::fs::write(&path, "{not json").unwrap();

    let store = ConfigStore::load(&path);
    assert!(!store.get().any_enabled());
}

#[test]
fn enable_persists_and_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cfg.json");

    let mut store = ConfigStore::load(&path);
    store.enable(Provider::Gdrive).unwrap();
    store.enable(Provider::Flickr).unwrap();

    let reloaded = ConfigStore::load(&path);
    assert_eq!(reloaded.get(), store.get());
    assert!(reloaded.get().using_gdrive);
    assert!(!reloaded.get().using_dropbox);
    assert!(reloaded.get().using_flickr);
}

#[test]
fn enable_is_idempotent_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cfg.json");

    let mut store = ConfigStore::load(&path);
    store.enable(Provider::Dropbox).unwrap();
    store.enable(Provider::Dropbox).unwrap();

    let reloaded = ConfigStore::load(&path);
    assert!(reloaded.get().using_dropbox);
    assert!(!reloaded.get().using_gdrive);
}

#[test]
fn is_enabled_reflects_flags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cfg.json");

    let mut store = ConfigStore::load(&path);
    assert!(!store.is_enabled(Provider::Gdrive));
    store.enable(Provider::Gdrive).unwrap();
    assert!(store.is_enabled(Provider::Gdrive));
    assert!(!store.is_enabled(Provider::Flickr));
}
