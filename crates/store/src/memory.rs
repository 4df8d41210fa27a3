use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use swatch::{DisplayPalette, PartialPalette};

use crate::error::StoreError;
use crate::model::{Project, ProjectDraft};
use crate::subscribe::{lock, ProjectsCallback, Subscribers, Subscription};
use crate::{next_project_id, BlobStore, ProjectStore, SettingsStore, StoreResult};

#[derive(Default)]
struct MemoryState {
    projects: Vec<Project>,
    colors: Option<PartialPalette>,
    blobs: BTreeMap<String, Vec<u8>>,
}

/// In-process store for dry runs and tests. While offline every call fails
/// with [`StoreError::Unavailable`].
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    offline: AtomicBool,
    subscribers: Subscribers,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_projects(projects: Vec<Project>) -> Self {
        let store = Self::default();
        lock(&store.state).projects = projects;
        store
    }

    pub fn with_colors(self, colors: PartialPalette) -> Self {
        lock(&self.state).colors = Some(colors);
        self
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn blob(&self, path: &str) -> Option<Vec<u8>> {
        lock(&self.state).blobs.get(path).cloned()
    }

    fn ensure_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store is offline".into()))
        } else {
            Ok(())
        }
    }

    fn mutate<T>(
        &self,
        edit: impl FnOnce(&mut Vec<Project>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        self.ensure_online()?;
        let (result, snapshot) = {
            let mut state = lock(&self.state);
            let result = edit(&mut state.projects)?;
            (result, state.projects.clone())
        };
        self.subscribers.notify(&snapshot);
        Ok(result)
    }
}

impl ProjectStore for MemoryStore {
    fn create(&self, draft: ProjectDraft) -> StoreResult<Project> {
        self.mutate(|projects| {
            let id = next_project_id(projects.iter().map(|project| project.id.as_str()));
            let project = Project::from_draft(id, draft);
            projects.insert(0, project.clone());
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
            Ok(slot.clone())
        })
    }

    fn delete(&self, id: &str) -> StoreResult<()> {
        self.mutate(|projects| {
            let before = projects.len();
            projects.retain(|project| project.id != id);
            if projects.len() == before {
                Err(StoreError::NotFound(id.to_string()))
            } else {
                Ok(())
            }
        })
    }

    fn get_all(&self) -> StoreResult<Vec<Project>> {
        self.ensure_online()?;
        Ok(lock(&self.state).projects.clone())
    }

    fn subscribe(&self, callback: ProjectsCallback) -> StoreResult<Subscription> {
        let current = self.get_all()?;
        let (subscription, callback) = self.subscribers.register(callback);
        callback(&current);
        Ok(subscription)
    }
}

impl SettingsStore for MemoryStore {
    fn get_colors(&self) -> StoreResult<Option<PartialPalette>> {
        self.ensure_online()?;
        Ok(lock(&self.state).colors.clone())
    }

    fn set_colors(&self, palette: &DisplayPalette) -> StoreResult<()> {
        self.ensure_online()?;
        lock(&self.state).colors = Some(PartialPalette::from_palette(palette));
        Ok(())
    }
}

impl BlobStore for MemoryStore {
    fn upload(&self, path: &str, bytes: &[u8]) -> StoreResult<String> {
        self.ensure_online()?;
        if path.trim().is_empty() {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        lock(&self.state)
            .blobs
            .insert(path.to_string(), bytes.to_vec());
        Ok(format!("memory://{path}"))
    }
}
