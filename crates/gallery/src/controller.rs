use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};
use store::Project;
use swatch::{DisplayPalette, PaletteSource, UniformBridge};
use tracing::{debug, info, warn};

use crate::extract::extract_from_image;
use crate::loader::{CoverError, CoverLoader};
use crate::visibility::{ItemState, ScrollModel, VISIBILITY_THRESHOLD};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GalleryOptions {
    pub visibility_threshold: f32,
    /// Only the first `max_sections` projects get a section.
    pub max_sections: Option<usize>,
}

impl Default for GalleryOptions {
    fn default() -> Self {
        Self {
            visibility_threshold: VISIBILITY_THRESHOLD,
            max_sections: None,
        }
    }
}

/// A finished extraction, delivered back to the controller thread.
#[derive(Debug)]
pub struct ExtractionResult {
    pub project_id: String,
    pub cover_url: String,
    pub outcome: Result<DisplayPalette, CoverError>,
}

#[derive(Debug)]
struct GalleryItem {
    project: Project,
    state: ItemState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CachedPalette {
    cover_url: String,
    palette: DisplayPalette,
}

/// Project sections, which one is active, and the palette each resolved to.
///
/// The gallery is driven from a single thread. Cover extraction runs on
/// worker threads and comes back through [`Gallery::results`]; feed each
/// result to [`Gallery::handle_result`].
pub struct Gallery {
    bridge: UniformBridge,
    loader: Arc<dyn CoverLoader>,
    options: GalleryOptions,
    items: Vec<GalleryItem>,
    cache: HashMap<String, CachedPalette>,
    scroll: ScrollModel,
    active: Option<usize>,
    open: bool,
    result_tx: Sender<ExtractionResult>,
    result_rx: Receiver<ExtractionResult>,
}

impl Gallery {
    pub fn new(bridge: UniformBridge, loader: Arc<dyn CoverLoader>, options: GalleryOptions) -> Self {
        let (result_tx, result_rx) = unbounded();
        Self {
            bridge,
            loader,
            options,
            items: Vec::new(),
            cache: HashMap::new(),
            scroll: ScrollModel::new(0),
            active: None,
            open: false,
            result_tx,
            result_rx,
        }
    }

    pub fn results(&self) -> &Receiver<ExtractionResult> {
        &self.result_rx
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn scroll_offset(&self) -> f32 {
        self.scroll.offset()
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.items.iter().map(|item| &item.project)
    }

    pub fn active_project(&self) -> Option<&Project> {
        self.active
            .and_then(|index| self.items.get(index))
            .map(|item| &item.project)
    }

    pub fn state(&self, project_id: &str) -> Option<ItemState> {
        self.items
            .iter()
            .find(|item| item.project.id == project_id)
            .map(|item| item.state)
    }

    pub fn cached_palette(&self, project_id: &str) -> Option<DisplayPalette> {
        self.cache.get(project_id).map(|cached| cached.palette)
    }

    /// Replaces the project list, keeping per-item state for records whose
    /// cover did not change.
    pub fn set_projects(&mut self, projects: Vec<Project>) {
        let limit = self.options.max_sections.unwrap_or(usize::MAX);
        let active_before = self.active_project().cloned();
        let mut previous: HashMap<String, GalleryItem> = self
            .items
            .drain(..)
            .map(|item| (item.project.id.clone(), item))
            .collect();

        self.items = projects
            .into_iter()
            .take(limit)
            .map(|project| {
                let state = match previous.remove(&project.id) {
                    Some(old) if old.project.cover_url == project.cover_url => old.state,
                    _ => ItemState::Hidden,
                };
                GalleryItem { project, state }
            })
            .collect();

        let items = &self.items;
        self.cache.retain(|id, cached| {
            items
                .iter()
                .any(|item| &item.project.id == id && item.project.cover_url == cached.cover_url)
        });
        // Explicit palettes may have been edited; let the next activation
        // re-read them.
        for item in &mut self.items {
            if item.state == ItemState::Resolved && !self.cache.contains_key(&item.project.id) {
                item.state = ItemState::Hidden;
            }
        }

        self.scroll.set_sections(self.items.len());
        self.active = active_before.as_ref().and_then(|before| {
            self.items
                .iter()
                .position(|item| item.project.id == before.id)
                .filter(|&index| {
                    let now = &self.items[index].project;
                    now.cover_url == before.cover_url && now.colors() == before.colors()
                })
        });
        debug!(sections = self.items.len(), "gallery projects updated");
        // Only a removed or recolored active project writes again; edits to
        // other fields leave newer manual or admin palettes alone.
        if self.open {
            self.evaluate();
        }
    }

    /// Shows or hides the gallery. Opening starts at the first section.
    pub fn toggle(&mut self) -> bool {
        if self.open {
            self.close();
        } else {
            self.open();
        }
        self.open
    }

    pub fn open(&mut self) {
        if self.open {
            return;
        }
        self.open = true;
        self.scroll.scroll_to(0.0);
        self.active = None;
        info!(sections = self.items.len(), "gallery opened");
        self.evaluate();
    }

    pub fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        self.active = None;
        for item in &mut self.items {
            if item.state == ItemState::Visible {
                item.state = ItemState::Hidden;
            }
        }
        info!("gallery closed");
    }

    pub fn scroll_by(&mut self, viewports: f32) {
        if !self.open {
            return;
        }
        self.scroll.scroll_by(viewports);
        self.evaluate();
    }

    fn evaluate(&mut self) {
        let threshold = self.options.visibility_threshold;
        for (index, item) in self.items.iter_mut().enumerate() {
            let visible = self.scroll.ratio(index) >= threshold;
            item.state = match (item.state, visible) {
                (ItemState::Hidden, true) => ItemState::Visible,
                (ItemState::Visible, false) => ItemState::Hidden,
                (state, _) => state,
            };
        }

        // With nothing above the threshold the previous section stays active.
        if let Some(index) = self.scroll.active_section(threshold) {
            if self.active != Some(index) {
                self.active = Some(index);
                self.activate(index);
            }
        }
    }

    fn activate(&mut self, index: usize) {
        let Some(item) = self.items.get_mut(index) else {
            return;
        };
        let id = item.project.id.clone();
        debug!(project = %id, state = ?item.state, "section activated");

        if let Some(palette) = item.project.explicit_palette() {
            item.state = ItemState::Resolved;
            self.bridge
                .set_palette(palette.to_render_space(), PaletteSource::Project(id));
            return;
        }

        if let Some(cached) = self.cache.get(&id) {
            item.state = ItemState::Resolved;
            self.bridge
                .set_palette(cached.palette.to_render_space(), PaletteSource::Extracted(id));
            return;
        }

        if item.state == ItemState::Pending {
            return;
        }
        item.state = ItemState::Pending;
        let project = item.project.clone();
        if let Err(err) = self.spawn_extraction(project) {
            warn!(project = %id, error = %err, "failed to start cover extraction");
            if let Some(item) = self.items.get_mut(index) {
                item.state = ItemState::Failed;
            }
        }
    }

    fn spawn_extraction(&self, project: Project) -> std::io::Result<()> {
        let loader = Arc::clone(&self.loader);
        let tx = self.result_tx.clone();
        thread::Builder::new()
            .name("heroshade-extract".into())
            .spawn(move || {
                let outcome = loader
                    .load(&project)
                    .map(|image| extract_from_image(&image));
                let _ = tx.send(ExtractionResult {
                    project_id: project.id,
                    cover_url: project.cover_url,
                    outcome,
                });
            })
            .map(|_| ())
    }

    /// Applies a finished extraction. The palette is cached either way but
    /// only written when its project is still the active section.
    pub fn handle_result(&mut self, result: ExtractionResult) {
        let ExtractionResult {
            project_id,
            cover_url,
            outcome,
        } = result;
        let Some(index) = self
            .items
            .iter()
            .position(|item| item.project.id == project_id && item.project.cover_url == cover_url)
        else {
            debug!(project = %project_id, "dropping extraction for a removed project");
            return;
        };

        match outcome {
            Ok(palette) => {
                self.items[index].state = ItemState::Resolved;
                self.cache.insert(
                    project_id.clone(),
                    CachedPalette { cover_url, palette },
                );
                if self.open && self.active == Some(index) {
                    self.bridge
                        .set_palette(palette.to_render_space(), PaletteSource::Extracted(project_id));
                } else {
                    debug!(project = %project_id, "cached palette for an inactive section");
                }
            }
            Err(err) => {
                self.items[index].state = ItemState::Failed;
                warn!(project = %project_id, error = %err, "cover extraction failed; keeping current palette");
            }
        }
    }

    /// Handles every result that is already waiting. Returns how many were
    /// applied.
    pub fn poll(&mut self) -> usize {
        let pending: Vec<_> = self.result_rx.try_iter().collect();
        let count = pending.len();
        for result in pending {
            self.handle_result(result);
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use image::{DynamicImage, Rgba, RgbaImage};
    use swatch::{RenderPalette, Srgb8};

    struct SolidLoader {
        color: [u8; 4],
        calls: AtomicUsize,
    }

    impl CoverLoader for SolidLoader {
        fn load(&self, _project: &Project) -> Result<DynamicImage, CoverError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                10,
                10,
                Rgba(self.color),
            )))
        }
    }

    fn project(id: &str) -> Project {
        Project {
            id: id.into(),
            eyebrow: "Study".into(),
            header: format!("Project {id}"),
            subtitle: "Subtitle".into(),
            cover_url: format!("https://cdn.test/{id}.png"),
            color1: None,
            color2: None,
            color3: None,
            color4: None,
        }
    }

    fn gallery(loader: Arc<SolidLoader>) -> (Gallery, UniformBridge) {
        let bridge = UniformBridge::new();
        let gallery = Gallery::new(bridge.clone(), loader, GalleryOptions::default());
        (gallery, bridge)
    }

    fn wait(gallery: &mut Gallery) {
        let result = gallery
            .results()
            .recv_timeout(Duration::from_secs(5))
            .unwrap();
        gallery.handle_result(result);
    }

    #[test]
    fn extraction_result_is_cached_and_reused() {
        let loader = Arc::new(SolidLoader {
            color: [0, 0, 255, 255],
            calls: AtomicUsize::new(0),
        });
        let (mut gallery, bridge) = gallery(Arc::clone(&loader));
        let publication = bridge.publish(RenderPalette::default());
        gallery.set_projects(vec![project("a"), project("b")]);

        gallery.open();
        assert_eq!(gallery.state("a"), Some(ItemState::Pending));
        wait(&mut gallery);
        assert_eq!(gallery.state("a"), Some(ItemState::Resolved));
        let expected = gallery.cached_palette("a").unwrap();
        assert_eq!(expected.stop(0), Some(Srgb8::new(0, 0, 255)));
        assert_eq!(publication.snapshot().palette, expected.to_render_space());
        assert_eq!(
            publication.snapshot().source,
            PaletteSource::Extracted("a".into())
        );

        gallery.scroll_by(1.0);
        wait(&mut gallery);
        gallery.scroll_by(-1.0);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            publication.snapshot().source,
            PaletteSource::Extracted("a".into())
        );
    }

    #[test]
    fn stale_result_is_cached_but_not_written() {
        let loader = Arc::new(SolidLoader {
            color: [255, 0, 0, 255],
            calls: AtomicUsize::new(0),
        });
        let (mut gallery, bridge) = gallery(loader);
        let publication = bridge.publish(RenderPalette::default());
        let mut explicit = project("b");
        explicit.color1 = Some("#111111".into());
        explicit.color2 = Some("#222222".into());
        explicit.color3 = Some("#333333".into());
        explicit.color4 = Some("#444444".into());
        gallery.set_projects(vec![project("a"), explicit]);

        gallery.open();
        gallery.scroll_by(1.0);
        let revision = publication.snapshot().revision;
        wait(&mut gallery);

        assert_eq!(gallery.state("a"), Some(ItemState::Resolved));
        assert!(gallery.cached_palette("a").is_some());
        assert_eq!(publication.snapshot().revision, revision);
        assert_eq!(
            publication.snapshot().source,
            PaletteSource::Project("b".into())
        );
    }

    #[test]
    fn closed_gallery_ignores_scroll() {
        let loader = Arc::new(SolidLoader {
            color: [0, 0, 0, 255],
            calls: AtomicUsize::new(0),
        });
        let (mut gallery, _bridge) = gallery(Arc::clone(&loader));
        gallery.set_projects(vec![project("a"), project("b")]);
        gallery.scroll_by(1.0);
        assert_eq!(gallery.scroll_offset(), 0.0);
        assert_eq!(gallery.state("a"), Some(ItemState::Hidden));
        assert_eq!(loader.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn project_limit_truncates_sections() {
        let loader = Arc::new(SolidLoader {
            color: [0, 0, 0, 255],
            calls: AtomicUsize::new(0),
        });
        let mut gallery = Gallery::new(
            UniformBridge::new(),
            loader,
            GalleryOptions {
                max_sections: Some(1),
                ..GalleryOptions::default()
            },
        );
        gallery.set_projects(vec![project("a"), project("b")]);
        assert_eq!(gallery.projects().count(), 1);
        assert_eq!(gallery.state("b"), None);
    }

    fn explicit(id: &str, hex: &str) -> Project {
        let mut project = project(id);
        project.color1 = Some(hex.into());
        project.color2 = Some("#222222".into());
        project.color3 = Some("#333333".into());
        project.color4 = Some("#444444".into());
        project
    }

    #[test]
    fn unrelated_edits_keep_newer_palette() {
        let loader = Arc::new(SolidLoader {
            color: [0, 0, 0, 255],
            calls: AtomicUsize::new(0),
        });
        let (mut gallery, bridge) = gallery(loader);
        let publication = bridge.publish(RenderPalette::default());
        gallery.set_projects(vec![explicit("a", "#111111")]);
        gallery.open();
        assert_eq!(
            publication.snapshot().source,
            PaletteSource::Project("a".into())
        );

        let manual = DisplayPalette::new([Srgb8::new(9, 9, 9); 4]);
        bridge.set_palette(manual.to_render_space(), PaletteSource::Manual);

        let mut renamed = explicit("a", "#111111");
        renamed.header = "Renamed".into();
        gallery.set_projects(vec![renamed]);
        assert_eq!(publication.snapshot().source, PaletteSource::Manual);
        assert_eq!(publication.snapshot().palette, manual.to_render_space());

        gallery.set_projects(vec![explicit("a", "#abcdef")]);
        assert_eq!(
            publication.snapshot().source,
            PaletteSource::Project("a".into())
        );
        assert_eq!(
            publication.snapshot().palette,
            explicit("a", "#abcdef")
                .explicit_palette()
                .unwrap()
                .to_render_space()
        );
    }

    #[test]
    fn changed_cover_drops_cached_palette() {
        let loader = Arc::new(SolidLoader {
            color: [0, 255, 0, 255],
            calls: AtomicUsize::new(0),
        });
        let (mut gallery, _bridge) = gallery(Arc::clone(&loader));
        gallery.set_projects(vec![project("a")]);
        gallery.open();
        wait(&mut gallery);
        assert!(gallery.cached_palette("a").is_some());

        let mut moved = project("a");
        moved.cover_url = "https://cdn.test/other.png".into();
        gallery.set_projects(vec![moved]);
        assert!(gallery.cached_palette("a").is_none());
        assert_eq!(gallery.state("a"), Some(ItemState::Pending));
        wait(&mut gallery);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
    }
}
