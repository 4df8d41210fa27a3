use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Map, Value};
use swatch::{DisplayPalette, PartialPalette};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::model::{Project, ProjectDraft};
use crate::subscribe::{lock, ProjectsCallback, Subscribers, Subscription};
use crate::{next_project_id, BlobStore, ProjectStore, SettingsStore, StoreResult};

const PROJECTS_FILE: &str = "projects.json";
const SETTINGS_FILE: &str = "settings.json";
const BLOBS_DIR: &str = "blobs";
const COLORS_KEY: &str = "colors";

/// Stores projects, settings and uploaded blobs under a single directory:
///
/// ```text
/// <root>/projects.json   newest-first array of project records
/// <root>/settings.json   {"colors": {"c1": .., "c4": ..}}
/// <root>/blobs/projects/<timestamp>-<name>
/// ```
///
/// Several processes may share one root. Writes replace `projects.json`
/// atomically, and [`ProjectStore::refresh`] picks up changes made elsewhere.
pub struct FileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
    /// Project list as last delivered to subscribers.
    last_seen: Mutex<Option<Vec<Project>>>,
    subscribers: Subscribers,
}

impl FileStore {
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root).map_err(|err| StoreError::io(root, err))?;
        let root = fs::canonicalize(root).map_err(|err| StoreError::io(root, err))?;
        info!(root = %root.display(), "opened file store");
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
            last_seen: Mutex::new(None),
            subscribers: Subscribers::default(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn blob_dir(&self) -> PathBuf {
        self.root.join(BLOBS_DIR)
    }

    fn read_projects(&self) -> StoreResult<Vec<Project>> {
        let path = self.root.join(PROJECTS_FILE);
        match read_optional(&path)? {
            Some(contents) => serde_json::from_str(&contents)
                .map_err(|source| StoreError::Decode { path, source }),
            None => Ok(Vec::new()),
        }
    }

    fn write_projects(&self, projects: &[Project]) -> StoreResult<()> {
        let path = self.root.join(PROJECTS_FILE);
        let staging = self.root.join(format!("{PROJECTS_FILE}.tmp"));
        let serialized = serde_json::to_string_pretty(projects)?;
        fs::write(&staging, serialized).map_err(|err| StoreError::io(&staging, err))?;
        fs::rename(&staging, &path).map_err(|err| StoreError::io(&path, err))
    }

    fn read_settings(&self) -> StoreResult<Map<String, Value>> {
        let path = self.root.join(SETTINGS_FILE);
        match read_optional(&path)? {
            Some(contents) => serde_json::from_str(&contents)
                .map_err(|source| StoreError::Decode { path, source }),
            None => Ok(Map::new()),
        }
    }

    /// Applies `edit` to the stored list and notifies listeners afterwards.
    fn mutate<T>(
        &self,
        edit: impl FnOnce(&mut Vec<Project>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let (result, snapshot) = {
            let _guard = lock(&self.write_lock);
            let mut projects = self.read_projects()?;
            let result = edit(&mut projects)?;
            self.write_projects(&projects)?;
            *lock(&self.last_seen) = Some(projects.clone());
            (result, projects)
        };
        self.subscribers.notify(&snapshot);
        Ok(result)
    }
}

impl ProjectStore for FileStore {
    fn create(&self, draft: ProjectDraft) -> StoreResult<Project> {
        self.mutate(|projects| {
            let id = next_project_id(projects.iter().map(|project| project.id.as_str()));
            let project = Project::from_draft(id, draft);
            projects.insert(0, project.clone());
            debug!(id = %project.id, "created project");
            Ok(project)
        })
    }

    fn update(&self, id: &str, draft: ProjectDraft) -> StoreResult<Project> {
        self.mutate(|projects| {
            let slot = projects
                .iter_mut()
                .find(|project| project.id == id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            *slot = Project::from_draft(id, draft);
            debug!(id, "updated project");
            Ok(slot.clone())
        })
    }

    fn delete(&self, id: &str) -> StoreResult<()> {
        self.mutate(|projects| {
            let before = projects.len();
            projects.retain(|project| project.id != id);
            if projects.len() == before {
                return Err(StoreError::NotFound(id.to_string()));
            }
            debug!(id, "deleted project");
            Ok(())
        })
    }

    fn get_all(&self) -> StoreResult<Vec<Project>> {
        self.read_projects()
    }

    fn subscribe(&self, callback: ProjectsCallback) -> StoreResult<Subscription> {
        let current = self.read_projects()?;
        *lock(&self.last_seen) = Some(current.clone());
        let (subscription, callback) = self.subscribers.register(callback);
        callback(&current);
        Ok(subscription)
    }

    fn refresh(&self) -> StoreResult<bool> {
        let current = {
            let _guard = lock(&self.write_lock);
            let current = self.read_projects()?;
            let mut seen = lock(&self.last_seen);
            if seen.as_ref() == Some(&current) {
                return Ok(false);
            }
            *seen = Some(current.clone());
            current
        };
        debug!(projects = current.len(), "project list changed on disk");
        self.subscribers.notify(&current);
        Ok(true)
    }
}

impl SettingsStore for FileStore {
    fn get_colors(&self) -> StoreResult<Option<PartialPalette>> {
        let settings = self.read_settings()?;
        let Some(value) = settings.get(COLORS_KEY) else {
            return Ok(None);
        };
        let Some(colors) = value.as_object() else {
            warn!("settings colors are not an object; ignoring them");
            return Ok(None);
        };
        // Each stop stands alone so one bad entry only loses that stop.
        let stops = ["c1", "c2", "c3", "c4"].map(|key| match colors.get(key) {
            Some(Value::String(raw)) => Some(raw.clone()),
            Some(Value::Null) | None => None,
            Some(other) => {
                warn!(stop = key, value = %other, "ignoring non-string palette stop");
                None
            }
        });
        Ok(Some(PartialPalette::from_stops(stops)))
    }

    fn set_colors(&self, palette: &DisplayPalette) -> StoreResult<()> {
        let _guard = lock(&self.write_lock);
        let mut settings = self.read_settings()?;
        settings.insert(COLORS_KEY.to_string(), serde_json::to_value(palette)?);
        let path = self.root.join(SETTINGS_FILE);
        let serialized = serde_json::to_string_pretty(&settings)?;
        fs::write(&path, serialized).map_err(|err| StoreError::io(&path, err))?;
        debug!(%palette, "saved palette");
        Ok(())
    }
}

impl BlobStore for FileStore {
    fn upload(&self, path: &str, bytes: &[u8]) -> StoreResult<String> {
        let relative = sanitize_blob_path(path)?;
        let target = self.blob_dir().join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|err| StoreError::io(parent, err))?;
        }
        fs::write(&target, bytes).map_err(|err| StoreError::io(&target, err))?;
        info!(path, bytes = bytes.len(), "stored blob");
        Ok(format!("file://{}", target.display()))
    }
}

fn read_optional(path: &Path) -> StoreResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) if contents.trim().is_empty() => Ok(None),
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(StoreError::io(path, err)),
    }
}

/// Accepts only plain relative paths so uploads stay inside the blob tree.
fn sanitize_blob_path(path: &str) -> StoreResult<PathBuf> {
    let candidate = Path::new(path);
    let mut clean = PathBuf::new();
    for component in candidate.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => return Err(StoreError::InvalidPath(path.to_string())),
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(clean)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_rejects_escaping_paths() {
        assert!(sanitize_blob_path("projects/1-a.png").is_ok());
        assert!(sanitize_blob_path("./projects/1-a.png").is_ok());
        assert!(matches!(
            sanitize_blob_path("../outside.png"),
            Err(StoreError::InvalidPath(_))
        ));
        assert!(matches!(
            sanitize_blob_path("/etc/passwd"),
            Err(StoreError::InvalidPath(_))
        ));
        assert!(matches!(sanitize_blob_path(""), Err(StoreError::InvalidPath(_))));
    }

    #[test]
    fn empty_files_read_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        fs::write(dir.path().join(PROJECTS_FILE), "  \n").unwrap();
        assert!(store.get_all().unwrap().is_empty());
        assert!(store.get_colors().unwrap().is_none());
    }

    #[test]
    fn non_string_stop_is_dropped_alone() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        fs::write(
            dir.path().join(SETTINGS_FILE),
            r##"{"colors": {"c1": "#ff0000", "c2": 5, "c3": null, "c4": "#00ff00"}}"##,
        )
        .unwrap();

        let colors = store.get_colors().unwrap().unwrap();
        assert_eq!(
            colors.stops(),
            [Some("#ff0000"), None, None, Some("#00ff00")]
        );
        assert_eq!(
            colors.merge(&swatch::default_palette()).to_hex_strings(),
            ["#ff0000", "#2094c5", "#b4532a", "#00ff00"]
        );
    }

    #[test]
    fn corrupt_settings_surface_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        fs::write(dir.path().join(SETTINGS_FILE), "{ nope").unwrap();
        assert!(matches!(
            store.get_colors(),
            Err(StoreError::Decode { .. })
        ));
    }
}
