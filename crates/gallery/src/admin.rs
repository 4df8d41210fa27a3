use std::sync::Arc;

use store::{
    blob_path, BlobStore, DraftError, Project, ProjectDraft, ProjectStore, SettingsStore,
    StoreError,
};
use swatch::{default_palette, DisplayPalette, PaletteSource, Srgb8, UniformBridge};
use thiserror::Error;
use tracing::info;

use crate::manual::ManualPicker;

/// Failures shown to the operator of the admin panel. None of them reach the
/// background.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("admin access is disabled; set a password under [admin]")]
    Disabled,
    #[error("incorrect password")]
    WrongPassword,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid project: {0}")]
    Draft(#[from] DraftError),
}

/// The three store collaborators the admin panel works against.
#[derive(Clone)]
pub struct Collaborators {
    pub projects: Arc<dyn ProjectStore>,
    pub settings: Arc<dyn SettingsStore>,
    pub blobs: Arc<dyn BlobStore>,
}

impl Collaborators {
    /// Uses one backend for all three roles.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: ProjectStore + SettingsStore + BlobStore + 'static,
    {
        Self {
            projects: store.clone(),
            settings: store.clone(),
            blobs: store,
        }
    }
}

/// Password check in front of the admin panel.
#[derive(Debug, Clone, Default)]
pub struct AdminGate {
    password: Option<String>,
}

impl AdminGate {
    pub fn new(password: Option<String>) -> Self {
        Self {
            password: password.filter(|value| !value.is_empty()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.password.is_some()
    }

    pub fn unlock(&self, attempt: &str) -> Result<(), AdminError> {
        match &self.password {
            None => Err(AdminError::Disabled),
            Some(password) if password == attempt => Ok(()),
            Some(_) => Err(AdminError::WrongPassword),
        }
    }
}

/// An unlocked admin panel: palette editing plus project management.
///
/// Palette edits go straight to the background like the manual picker does;
/// they only reach the settings store on [`AdminSession::save`].
pub struct AdminSession {
    stores: Collaborators,
    picker: ManualPicker,
}

impl AdminSession {
    pub fn new(stores: Collaborators, bridge: UniformBridge) -> Self {
        Self {
            stores,
            picker: ManualPicker::with_source(bridge, default_palette(), PaletteSource::Admin),
        }
    }

    /// Checks `attempt` against `gate` and opens a session.
    pub fn login(
        gate: &AdminGate,
        attempt: &str,
        stores: Collaborators,
        bridge: UniformBridge,
    ) -> Result<Self, AdminError> {
        gate.unlock(attempt)?;
        info!("admin session opened");
        Ok(Self::new(stores, bridge))
    }

    /// Reads the saved palette, fills missing stops from the default and
    /// writes it to the background once.
    pub fn load_palette(&mut self) -> Result<DisplayPalette, AdminError> {
        let palette = match self.stores.settings.get_colors()? {
            Some(saved) => saved.merge(&default_palette()),
            None => default_palette(),
        };
        self.picker.set_all(palette);
        info!(colors = ?palette.to_hex_strings(), "loaded saved palette");
        Ok(palette)
    }

    pub fn colors(&self) -> DisplayPalette {
        self.picker.colors()
    }

    pub fn set_stop(&mut self, index: usize, color: Srgb8) -> bool {
        self.picker.set_stop(index, color)
    }

    pub fn set_palette(&mut self, palette: DisplayPalette) -> bool {
        self.picker.set_all(palette)
    }

    pub fn save(&self) -> Result<(), AdminError> {
        let palette = self.picker.colors();
        self.stores.settings.set_colors(&palette)?;
        info!(colors = ?palette.to_hex_strings(), "saved palette");
        Ok(())
    }

    pub fn projects(&self) -> Result<Vec<Project>, AdminError> {
        Ok(self.stores.projects.get_all()?)
    }

    /// Blank form. Without colors the gallery extracts the palette from the
    /// cover.
    pub fn new_draft(&self) -> ProjectDraft {
        ProjectDraft::default()
    }

    pub fn create_project(&self, draft: ProjectDraft) -> Result<Project, AdminError> {
        draft.validate_with_colors()?;
        let project = self.stores.projects.create(draft)?;
        info!(id = %project.id, header = %project.header, "created project");
        Ok(project)
    }

    pub fn update_project(&self, id: &str, draft: ProjectDraft) -> Result<Project, AdminError> {
        draft.validate_with_colors()?;
        let project = self.stores.projects.update(id, draft)?;
        info!(id = %project.id, "updated project");
        Ok(project)
    }

    pub fn delete_project(&self, id: &str) -> Result<(), AdminError> {
        self.stores.projects.delete(id)?;
        info!(%id, "deleted project");
        Ok(())
    }

    /// Uploads a cover under `projects/{timestamp}-{filename}` and returns the
    /// URL to store on the project.
    pub fn upload_cover(&self, filename: &str, bytes: &[u8]) -> Result<String, AdminError> {
        let path = blob_path(filename);
        let url = self.stores.blobs.upload(&path, bytes)?;
        info!(%path, %url, size = bytes.len(), "uploaded cover");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::MemoryStore;
    use swatch::{PartialPalette, RenderPalette};

    fn draft() -> ProjectDraft {
        ProjectDraft {
            eyebrow: "Case study".into(),
            header: "Harbor".into(),
            subtitle: "Tidal data".into(),
            cover_url: "https://cdn.test/harbor.png".into(),
            ..ProjectDraft::with_default_colors()
        }
    }

    #[test]
    fn gate_checks_password() {
        let gate = AdminGate::new(Some("hunter2".into()));
        assert!(gate.unlock("hunter2").is_ok());
        assert!(matches!(gate.unlock("nope"), Err(AdminError::WrongPassword)));
        assert!(matches!(
            AdminGate::new(Some(String::new())).unlock(""),
            Err(AdminError::Disabled)
        ));
    }

    #[test]
    fn login_loads_saved_palette_once() {
        let store = Arc::new(MemoryStore::new().with_colors(PartialPalette::from_stops([
            Some("#ff0000".into()),
            None,
            Some("garbage".into()),
            None,
        ])));
        let bridge = UniformBridge::new();
        let publication = bridge.publish(RenderPalette::default());
        let gate = AdminGate::new(Some("pw".into()));

        let mut session =
            AdminSession::login(&gate, "pw", Collaborators::from_store(store), bridge).unwrap();
        let palette = session.load_palette().unwrap();

        let defaults = default_palette();
        assert_eq!(palette.stop(0), Some(Srgb8::new(255, 0, 0)));
        assert_eq!(palette.stop(1), defaults.stop(1));
        assert_eq!(palette.stop(2), defaults.stop(2));
        let committed = publication.snapshot();
        assert_eq!(committed.source, PaletteSource::Admin);
        assert_eq!(committed.revision, 1);
        assert_eq!(committed.palette, palette.to_render_space());
    }

    #[test]
    fn save_writes_edited_colors() {
        let store = Arc::new(MemoryStore::new());
        let mut session =
            AdminSession::new(Collaborators::from_store(store.clone()), UniformBridge::new());
        session.set_stop(3, Srgb8::new(1, 2, 3));
        session.save().unwrap();

        let saved = store.get_colors().unwrap().unwrap();
        assert_eq!(saved.merge(&default_palette()), session.colors());
    }

    #[test]
    fn store_failures_surface_as_admin_errors() {
        let store = Arc::new(MemoryStore::new());
        store.set_offline(true);
        let mut session =
            AdminSession::new(Collaborators::from_store(store), UniformBridge::new());
        assert!(matches!(session.load_palette(), Err(AdminError::Store(_))));
        assert!(matches!(session.save(), Err(AdminError::Store(_))));
        assert_eq!(session.colors(), default_palette());
    }

    #[test]
    fn project_crud_validates_drafts() {
        let store = Arc::new(MemoryStore::new());
        let session = AdminSession::new(Collaborators::from_store(store), UniformBridge::new());

        let created = session.create_project(draft()).unwrap();
        assert_eq!(session.projects().unwrap(), vec![created.clone()]);

        let mut malformed = draft();
        malformed.color2 = Some("teal-ish".into());
        assert!(matches!(
            session.update_project(&created.id, malformed),
            Err(AdminError::Draft(DraftError::InvalidColor(2)))
        ));
        let mut untitled = draft();
        untitled.header.clear();
        assert!(matches!(
            session.create_project(untitled),
            Err(AdminError::Draft(DraftError::MissingField("header")))
        ));

        let mut renamed = created.to_draft();
        renamed.header = "Harbor II".into();
        assert_eq!(
            session.update_project(&created.id, renamed).unwrap().header,
            "Harbor II"
        );

        session.delete_project(&created.id).unwrap();
        assert!(session.projects().unwrap().is_empty());
        assert!(matches!(
            session.delete_project(&created.id),
            Err(AdminError::Store(StoreError::NotFound(_)))
        ));
    }

    #[test]
    fn cover_driven_projects_stay_cover_driven() {
        let store = Arc::new(MemoryStore::new());
        let session = AdminSession::new(Collaborators::from_store(store), UniformBridge::new());

        let blank = ProjectDraft {
            eyebrow: "Tool".into(),
            header: "Lathe".into(),
            subtitle: "CNC notes".into(),
            cover_url: "https://cdn.test/lathe.png".into(),
            ..session.new_draft()
        };
        let created = session.create_project(blank).unwrap();
        assert!(created.explicit_palette().is_none());

        let mut renamed = created.to_draft();
        renamed.header = "Lathe II".into();
        let updated = session.update_project(&created.id, renamed).unwrap();
        assert_eq!(updated.header, "Lathe II");
        assert!(updated.explicit_palette().is_none());

        let explicit = updated.to_draft().with_palette(&default_palette());
        let updated = session.update_project(&created.id, explicit).unwrap();
        assert_eq!(updated.explicit_palette(), Some(default_palette()));

        let cleared = updated.to_draft().without_colors();
        let updated = session.update_project(&created.id, cleared).unwrap();
        assert!(updated.explicit_palette().is_none());
    }

    #[test]
    fn upload_uses_timestamped_path() {
        let store = Arc::new(MemoryStore::new());
        let session =
            AdminSession::new(Collaborators::from_store(store.clone()), UniformBridge::new());
        let url = session.upload_cover("shots/cover.png", b"png").unwrap();
        let path = url.strip_prefix("memory://").unwrap();
        assert!(path.starts_with("projects/"));
        assert!(path.ends_with("-cover.png"));
        assert_eq!(store.blob(path).as_deref(), Some(&b"png"[..]));
    }
}
