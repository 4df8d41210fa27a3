//! Collaborators that hold project records, the saved palette and uploaded
//! cover images. The background and the gallery only ever talk to the traits
//! declared here; the backing implementation is chosen by the binary.
//!
//! Types:
//!
//! - `Project` / `ProjectDraft` are the stored record and its create/update
//!   payload.
//! - `ProjectStore`, `SettingsStore` and `BlobStore` are the three collaborator
//!   interfaces.
//! - `FileStore` keeps everything under one data directory as JSON plus a
//!   `blobs/` tree.
//! - `MemoryStore` keeps everything in memory and can be switched offline to
//!   exercise failure paths.
//! - `Subscription` unregisters a change callback when dropped.
//!
//! Functions:
//!
//! - `blob_path` builds the `projects/{timestamp_ms}-{filename}` upload key.

mod error;
mod file;
mod memory;
mod model;
mod subscribe;

pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use model::{DraftError, Project, ProjectDraft};
pub use subscribe::{ProjectsCallback, Subscription};

use swatch::{DisplayPalette, PartialPalette};

pub type StoreResult<T> = Result<T, StoreError>;

pub trait ProjectStore: Send + Sync {
    /// Stores a new record and returns it with its assigned id.
    fn create(&self, draft: ProjectDraft) -> StoreResult<Project>;
    fn update(&self, id: &str, draft: ProjectDraft) -> StoreResult<Project>;
    fn delete(&self, id: &str) -> StoreResult<()>;
    /// All records, newest first.
    fn get_all(&self) -> StoreResult<Vec<Project>>;
    /// Registers `callback`; it is invoked once with the current list and then
    /// after every mutation until the returned guard is dropped.
    fn subscribe(&self, callback: ProjectsCallback) -> StoreResult<Subscription>;
    /// Re-reads the backing records and notifies subscribers when they
    /// changed outside this handle. Returns whether a notification went out.
    fn refresh(&self) -> StoreResult<bool> {
        Ok(false)
    }
}

pub trait SettingsStore: Send + Sync {
    fn get_colors(&self) -> StoreResult<Option<PartialPalette>>;
    fn set_colors(&self, palette: &DisplayPalette) -> StoreResult<()>;
}

pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under `path` and returns a URL the cover loader accepts.
    fn upload(&self, path: &str, bytes: &[u8]) -> StoreResult<String>;
}

/// Upload key for a cover image, stamped with the current wall clock.
pub fn blob_path(filename: &str) -> String {
    blob_path_at(chrono::Utc::now().timestamp_millis(), filename)
}

pub fn blob_path_at(timestamp_ms: i64, filename: &str) -> String {
    let name = filename
        .rsplit(|ch: char| ch == '/' || ch == '\\')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("upload");
    format!("projects/{timestamp_ms}-{name}")
}

/// Millisecond-timestamp id that does not collide with `existing`.
pub(crate) fn next_project_id<'a>(existing: impl Iterator<Item = &'a str> + Clone) -> String {
    let mut candidate = chrono::Utc::now().timestamp_millis();
    while existing.clone().any(|id| id == candidate.to_string()) {
        candidate += 1;
    }
    candidate.to_string()
}
