use std::fmt;
use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use tracing::{debug, warn};

use crate::palette::RenderPalette;

/// Which producer committed the palette currently on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaletteSource {
    Default,
    Manual,
    Admin,
    /// Explicit palette stored on a project.
    Project(String),
    /// Palette derived from a project's cover image.
    Extracted(String),
}

impl fmt::Display for PaletteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaletteSource::Default => f.write_str("default"),
            PaletteSource::Manual => f.write_str("manual"),
            PaletteSource::Admin => f.write_str("admin"),
            PaletteSource::Project(id) => write!(f, "project:{id}"),
            PaletteSource::Extracted(id) => write!(f, "extracted:{id}"),
        }
    }
}

/// One complete palette write. Readers always see a whole value.
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedPalette {
    pub palette: RenderPalette,
    pub source: PaletteSource,
    pub revision: u64,
}

#[derive(Debug)]
struct PaletteCell {
    current: ArcSwap<CommittedPalette>,
}

impl PaletteCell {
    fn new(initial: RenderPalette) -> Self {
        Self {
            current: ArcSwap::from_pointee(CommittedPalette {
                palette: initial,
                source: PaletteSource::Default,
                revision: 0,
            }),
        }
    }

    fn commit(&self, palette: RenderPalette, source: PaletteSource) -> u64 {
        let previous = self.current.rcu(|current| {
            Arc::new(CommittedPalette {
                palette,
                source: source.clone(),
                revision: current.revision + 1,
            })
        });
        previous.revision + 1
    }

    fn snapshot(&self) -> Arc<CommittedPalette> {
        self.current.load_full()
    }
}

/// Nullable, cloneable handle to the palette of the running background.
///
/// The render loop publishes a cell when it mounts and retracts it when it is
/// disposed. Producers hold a clone of the bridge and write through it; while
/// nothing is published their writes are dropped.
#[derive(Clone, Default)]
pub struct UniformBridge {
    slot: Arc<ArcSwapOption<PaletteCell>>,
}

impl UniformBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live handle to the mounted background, or `None` when unmounted.
    pub fn get(&self) -> Option<PaletteHandle> {
        self.slot
            .load_full()
            .map(|cell| PaletteHandle { cell })
    }

    pub fn is_mounted(&self) -> bool {
        self.slot.load().is_some()
    }

    /// Commits all four stops together. Returns `false` (and does nothing)
    /// when no background is mounted.
    pub fn set_palette(&self, palette: RenderPalette, source: PaletteSource) -> bool {
        match self.get() {
            Some(handle) => {
                handle.set_palette(palette, source);
                true
            }
            None => {
                debug!(%source, "background not mounted; dropping palette write");
                false
            }
        }
    }

    pub fn snapshot(&self) -> Option<Arc<CommittedPalette>> {
        self.get().map(|handle| handle.snapshot())
    }

    /// Installs a fresh palette cell for a newly mounted render loop.
    pub fn publish(&self, initial: RenderPalette) -> Publication {
        let cell = Arc::new(PaletteCell::new(initial));
        let previous = self.slot.swap(Some(Arc::clone(&cell)));
        if previous.is_some() {
            warn!("replacing a palette publication that was never retracted");
        }
        Publication {
            slot: Arc::clone(&self.slot),
            cell,
            retracted: false,
        }
    }
}

impl fmt::Debug for UniformBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UniformBridge")
            .field("mounted", &self.is_mounted())
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct PaletteHandle {
    cell: Arc<PaletteCell>,
}

impl PaletteHandle {
    pub fn set_palette(&self, palette: RenderPalette, source: PaletteSource) -> u64 {
        let revision = self.cell.commit(palette, source.clone());
        debug!(%source, revision, "committed palette");
        revision
    }

    pub fn snapshot(&self) -> Arc<CommittedPalette> {
        self.cell.snapshot()
    }
}

/// Owned by the render loop for as long as it is mounted.
///
/// Retracting (explicitly or on drop) clears the bridge only if this is still
/// the current publication, so a stale loop cannot unmount its successor.
pub struct Publication {
    slot: Arc<ArcSwapOption<PaletteCell>>,
    cell: Arc<PaletteCell>,
    retracted: bool,
}

impl Publication {
    pub fn handle(&self) -> PaletteHandle {
        PaletteHandle {
            cell: Arc::clone(&self.cell),
        }
    }

    /// Per-frame read used by the render loop.
    pub fn snapshot(&self) -> Arc<CommittedPalette> {
        self.cell.snapshot()
    }

    pub fn is_retracted(&self) -> bool {
        self.retracted
    }

    pub fn retract(&mut self) {
        if self.retracted {
            return;
        }
        self.retracted = true;
        let cell = &self.cell;
        self.slot.rcu(|current| match current {
            Some(existing) if Arc::ptr_eq(existing, cell) => None,
            other => other.clone(),
        });
    }
}

impl Drop for Publication {
    fn drop(&mut self) {
        self.retract();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Srgb8;
    use crate::palette::DisplayPalette;
    use std::thread;

    fn solid(value: u8) -> RenderPalette {
        DisplayPalette::new([Srgb8::new(value, value, value); 4]).to_render_space()
    }

    #[test]
    fn writes_before_mount_are_ignored() {
        let bridge = UniformBridge::new();
        assert!(bridge.get().is_none());
        assert!(!bridge.set_palette(solid(10), PaletteSource::Manual));
        assert!(bridge.snapshot().is_none());
    }

    #[test]
    fn published_cell_receives_writes() {
        let bridge = UniformBridge::new();
        let publication = bridge.publish(RenderPalette::default());
        assert_eq!(publication.snapshot().source, PaletteSource::Default);

        assert!(bridge.set_palette(solid(40), PaletteSource::Admin));
        let snapshot = publication.snapshot();
        assert_eq!(snapshot.palette, solid(40));
        assert_eq!(snapshot.source, PaletteSource::Admin);
        assert_eq!(snapshot.revision, 1);
    }

    #[test]
    fn retract_is_idempotent_and_unmounts() {
        let bridge = UniformBridge::new();
        let handle_holder = bridge.clone();
        let mut publication = bridge.publish(RenderPalette::default());
        assert!(handle_holder.is_mounted());

        publication.retract();
        publication.retract();
        assert!(publication.is_retracted());
        assert!(!handle_holder.is_mounted());
        assert!(!handle_holder.set_palette(solid(1), PaletteSource::Manual));
    }

    #[test]
    fn stale_publication_does_not_unmount_successor() {
        let bridge = UniformBridge::new();
        let first = bridge.publish(RenderPalette::default());
        let second = bridge.publish(solid(90));
        drop(first);
        assert!(bridge.is_mounted());
        assert_eq!(bridge.snapshot().unwrap().palette, second.snapshot().palette);
    }

    #[test]
    fn handle_outliving_publication_does_not_remount() {
        let bridge = UniformBridge::new();
        let publication = bridge.publish(RenderPalette::default());
        let handle = bridge.get().unwrap();
        drop(publication);
        handle.set_palette(solid(5), PaletteSource::Manual);
        assert!(bridge.get().is_none());
    }

    #[test]
    fn concurrent_writers_never_tear_a_palette() {
        let bridge = UniformBridge::new();
        let publication = bridge.publish(solid(0));

        let writers: Vec<_> = (1..=4u8)
            .map(|writer| {
                let bridge = bridge.clone();
                thread::spawn(move || {
                    for _ in 0..500 {
                        bridge.set_palette(solid(writer * 50), PaletteSource::Manual);
                    }
                })
            })
            .collect();

        for _ in 0..2000 {
            let stops = publication.snapshot().palette.stops();
            assert!(stops.iter().all(|stop| *stop == stops[0]));
        }

        for writer in writers {
            writer.join().unwrap();
        }
        assert_eq!(publication.snapshot().revision, 2000);
    }
}
