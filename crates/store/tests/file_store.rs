use std::sync::{Arc, Mutex};

use store::{
    blob_path_at, BlobStore, FileStore, MemoryStore, Project, ProjectDraft, ProjectStore,
    SettingsStore, StoreError,
};
use swatch::{default_palette, PartialPalette, Srgb8};
use tempfile::TempDir;

fn draft(header: &str) -> ProjectDraft {
    ProjectDraft {
        eyebrow: "Case study".into(),
        header: header.into(),
        subtitle: "Subtitle".into(),
        cover_url: "https://example.com/cover.png".into(),
        ..ProjectDraft::default()
    }
}

#[test]
fn projects_persist_newest_first_across_reopen() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::open(dir.path()).unwrap();

    let first = store.create(draft("First")).unwrap();
    let second = store.create(draft("Second")).unwrap();
    assert_ne!(first.id, second.id);

    let reopened = FileStore::open(dir.path()).unwrap();
    let headers: Vec<_> = reopened
        .get_all()
        .unwrap()
        .into_iter()
        .map(|project| project.header)
        .collect();
    assert_eq!(headers, ["Second", "First"]);
}

#[test]
fn update_and_delete_report_missing_ids() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    let created = store.create(draft("Before")).unwrap();

    let updated = store
        .update(&created.id, draft("After").with_palette(&default_palette()))
        .unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.header, "After");
    assert!(updated.explicit_palette().is_some());

    assert!(matches!(
        store.update("missing", draft("x")),
        Err(StoreError::NotFound(id)) if id == "missing"
    ));

    store.delete(&created.id).unwrap();
    assert!(store.get_all().unwrap().is_empty());
    assert!(matches!(store.delete(&created.id), Err(StoreError::NotFound(_))));
}

#[test]
fn subscribers_see_initial_list_and_every_mutation() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    store.create(draft("Existing")).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let subscription = store
        .subscribe(Box::new(move |projects: &[Project]| {
            sink.lock().unwrap().push(projects.len());
        }))
        .unwrap();

    let added = store.create(draft("Added")).unwrap();
    store.delete(&added.id).unwrap();
    drop(subscription);
    store.create(draft("Unobserved")).unwrap();

    assert_eq!(*seen.lock().unwrap(), [1, 2, 1]);
}

#[test]
fn refresh_reports_changes_made_by_another_handle() {
    let dir = TempDir::new().unwrap();
    let window = FileStore::open(dir.path()).unwrap();
    let operator = FileStore::open(dir.path()).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _subscription = window
        .subscribe(Box::new(move |projects: &[Project]| {
            sink.lock().unwrap().push(projects.len());
        }))
        .unwrap();
    assert!(!window.refresh().unwrap());

    let created = operator.create(draft("From the CLI")).unwrap();
    assert!(window.refresh().unwrap());
    assert!(!window.refresh().unwrap());

    operator.update(&created.id, draft("Renamed")).unwrap();
    assert!(window.refresh().unwrap());
    assert_eq!(window.get_all().unwrap()[0].header, "Renamed");

    // The window's own writes are not reported twice.
    window.create(draft("Local")).unwrap();
    assert!(!window.refresh().unwrap());

    assert_eq!(*seen.lock().unwrap(), [0, 1, 1, 2]);
}

#[test]
fn settings_round_trip_colors_document() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    assert!(store.get_colors().unwrap().is_none());

    let palette = default_palette().with_stop(0, Srgb8::new(0x11, 0x22, 0x33));
    store.set_colors(&palette).unwrap();

    let stored = store.get_colors().unwrap().unwrap();
    assert_eq!(stored.c1.as_deref(), Some("#112233"));
    assert_eq!(stored.merge(&default_palette()), palette);

    let raw = std::fs::read_to_string(dir.path().join("settings.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["colors"]["c4"], "#d7c8a2");
}

#[test]
fn uploads_land_under_blob_tree_as_file_urls() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    let key = blob_path_at(1_700_000_000_000, "cover.png");

    let url = store.upload(&key, b"png-bytes").unwrap();
    assert!(url.starts_with("file://"));
    let on_disk = url.trim_start_matches("file://");
    assert_eq!(std::fs::read(on_disk).unwrap(), b"png-bytes");
    assert!(on_disk.ends_with("blobs/projects/1700000000000-cover.png"));
}

#[test]
fn offline_memory_store_fails_every_call() {
    let store = MemoryStore::new().with_colors(PartialPalette::from_palette(&default_palette()));
    assert!(store.get_colors().unwrap().is_some());

    store.set_offline(true);
    assert!(matches!(store.get_colors(), Err(StoreError::Unavailable(_))));
    assert!(matches!(store.get_all(), Err(StoreError::Unavailable(_))));
    assert!(matches!(
        store.create(draft("x")),
        Err(StoreError::Unavailable(_))
    ));
    assert!(matches!(
        store.upload("projects/1-a.png", b""),
        Err(StoreError::Unavailable(_))
    ));

    store.set_offline(false);
    let url = store.upload("projects/1-a.png", b"abc").unwrap();
    assert_eq!(url, "memory://projects/1-a.png");
    assert_eq!(store.blob("projects/1-a.png").unwrap(), b"abc");
}
