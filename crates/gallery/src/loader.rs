//! Cover image loading.
//!
//! A project's cover is looked up in two places, in order:
//!
//! 1. the local asset `{asset_root}/assets/projects/{id}.png`;
//! 2. the stored `cover_url`, which may be `http(s)://`, `file://`, a path
//!    relative to the asset root (`/assets/...`) or a plain filesystem path.
//!
//! Loading is blocking and runs on extraction worker threads only.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::DynamicImage;
use reqwest::blocking::Client;
use reqwest::Url;
use store::Project;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CoverError {
    #[error("no cover reference for '{0}'")]
    Missing(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to fetch {url}: {source}")]
    Http {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to decode cover image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("unsupported cover url '{0}'")]
    Unsupported(String),
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Where a cover's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverSource {
    Asset(PathBuf),
    File(PathBuf),
    Remote(Url),
}

pub trait CoverLoader: Send + Sync {
    fn load(&self, project: &Project) -> Result<DynamicImage, CoverError>;
}

/// Loads covers from the local asset tree, disk and HTTP.
#[derive(Debug, Clone)]
pub struct StandardCoverLoader {
    asset_root: Option<PathBuf>,
    http: Client,
}

impl StandardCoverLoader {
    pub fn new(asset_root: Option<PathBuf>, timeout: Duration) -> Result<Self, CoverError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(CoverError::Client)?;
        Ok(Self { asset_root, http })
    }

    pub fn asset_root(&self) -> Option<&Path> {
        self.asset_root.as_deref()
    }

    /// Candidate sources for `project`, most preferred first. The local asset
    /// only appears when the file exists.
    pub fn sources(&self, project: &Project) -> Vec<CoverSource> {
        let mut sources = Vec::with_capacity(2);
        if let Some(asset) = self.asset_path(&project.id).filter(|path| path.is_file()) {
            sources.push(CoverSource::Asset(asset));
        }
        if let Some(source) = self.classify_url(&project.cover_url) {
            if !sources.contains(&source) {
                sources.push(source);
            }
        }
        sources
    }

    fn asset_path(&self, project_id: &str) -> Option<PathBuf> {
        self.asset_root.as_ref().map(|root| {
            root.join("assets")
                .join("projects")
                .join(format!("{project_id}.png"))
        })
    }

    fn classify_url(&self, raw: &str) -> Option<CoverSource> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(url) = Url::parse(trimmed) {
            return match url.scheme() {
                "http" | "https" => Some(CoverSource::Remote(url)),
                "file" => url.to_file_path().ok().map(CoverSource::File),
                // Anything else (`memory://`, `data:`) is handed to `read` so
                // the failure is reported, not silently skipped.
                _ => Some(CoverSource::File(PathBuf::from(trimmed))),
            };
        }
        if let (Some(root), Some(relative)) = (&self.asset_root, trimmed.strip_prefix('/')) {
            let candidate = root.join(relative);
            if candidate.exists() {
                return Some(CoverSource::Asset(candidate));
            }
        }
        Some(CoverSource::File(PathBuf::from(trimmed)))
    }

    fn read(&self, source: &CoverSource) -> Result<Vec<u8>, CoverError> {
        match source {
            CoverSource::Asset(path) | CoverSource::File(path) => {
                if path.to_string_lossy().contains("://") {
                    return Err(CoverError::Unsupported(path.display().to_string()));
                }
                fs::read(path).map_err(|source| CoverError::Io {
                    path: path.clone(),
                    source,
                })
            }
            CoverSource::Remote(url) => self.fetch(url),
        }
    }

    fn fetch(&self, url: &Url) -> Result<Vec<u8>, CoverError> {
        debug!(%url, "fetching cover image");
        let http_error = |source| CoverError::Http {
            url: url.clone(),
            source,
        };
        let response = self
            .http
            .get(url.clone())
            .send()
            .map_err(http_error)?
            .error_for_status()
            .map_err(http_error)?;
        let bytes = response.bytes().map_err(http_error)?;
        Ok(bytes.to_vec())
    }

    fn decode(&self, source: &CoverSource) -> Result<DynamicImage, CoverError> {
        let bytes = self.read(source)?;
        Ok(image::load_from_memory(&bytes)?)
    }

    /// Loads a single cover reference (URL or path) without the asset lookup.
    pub fn load_reference(&self, reference: &str) -> Result<DynamicImage, CoverError> {
        let source = self
            .classify_url(reference)
            .ok_or_else(|| CoverError::Missing(reference.to_string()))?;
        self.decode(&source)
    }
}

impl CoverLoader for StandardCoverLoader {
    fn load(&self, project: &Project) -> Result<DynamicImage, CoverError> {
        let sources = self.sources(project);
        let mut last_error = CoverError::Missing(project.id.clone());
        for source in sources {
            match self.decode(&source) {
                Ok(image) => {
                    debug!(project = %project.id, ?source, "loaded cover image");
                    return Ok(image);
                }
                Err(err) => {
                    debug!(project = %project.id, ?source, error = %err, "cover source failed");
                    last_error = err;
                }
            }
        }
        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn project(id: &str, cover_url: &str) -> Project {
        Project {
            id: id.into(),
            eyebrow: "Study".into(),
            header: "Header".into(),
            subtitle: "Subtitle".into(),
            cover_url: cover_url.into(),
            color1: None,
            color2: None,
            color3: None,
            color4: None,
        }
    }

    fn loader(root: Option<&Path>) -> StandardCoverLoader {
        StandardCoverLoader::new(root.map(Path::to_path_buf), Duration::from_secs(1)).unwrap()
    }

    fn write_png(path: &Path, color: [u8; 4]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        RgbaImage::from_pixel(2, 2, Rgba(color)).save(path).unwrap();
    }

    #[test]
    fn local_asset_is_preferred_over_url() {
        let dir = TempDir::new().unwrap();
        let asset = dir.path().join("assets/projects/42.png");
        write_png(&asset, [255, 0, 0, 255]);

        let sources = loader(Some(dir.path())).sources(&project("42", "https://cdn.test/c.png"));
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0], CoverSource::Asset(asset));
        assert!(matches!(sources[1], CoverSource::Remote(_)));
    }

    #[test]
    fn missing_asset_falls_back_to_url() {
        let dir = TempDir::new().unwrap();
        let sources = loader(Some(dir.path())).sources(&project("7", "https://cdn.test/c.png"));
        assert_eq!(
            sources,
            vec![CoverSource::Remote(Url::parse("https://cdn.test/c.png").unwrap())]
        );
    }

    #[test]
    fn file_urls_and_site_paths_resolve_to_disk() {
        let dir = TempDir::new().unwrap();
        let cover = dir.path().join("covers/a.png");
        write_png(&cover, [0, 0, 255, 255]);
        let loader = loader(Some(dir.path()));

        let url = Url::from_file_path(&cover).unwrap();
        assert_eq!(
            loader.sources(&project("1", url.as_str())),
            vec![CoverSource::File(cover.clone())]
        );
        assert_eq!(
            loader.sources(&project("1", "/covers/a.png")),
            vec![CoverSource::Asset(cover)]
        );
    }

    #[test]
    fn loads_plain_path() {
        let dir = TempDir::new().unwrap();
        let cover = dir.path().join("cover.png");
        write_png(&cover, [10, 20, 30, 255]);

        let image = loader(None)
            .load(&project("9", cover.to_str().unwrap()))
            .unwrap();
        assert_eq!(image.to_rgba8().get_pixel(0, 0), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn unreadable_cover_reports_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.png");
        let err = loader(None)
            .load(&project("9", missing.to_str().unwrap()))
            .unwrap_err();
        assert!(matches!(err, CoverError::Io { .. }));

        let err = loader(None).load(&project("9", "  ")).unwrap_err();
        assert!(matches!(err, CoverError::Missing(_)));
        let err = loader(None).load_reference("").unwrap_err();
        assert!(matches!(err, CoverError::Missing(_)));

        let err = loader(None)
            .load(&project("9", "memory://projects/1-a.png"))
            .unwrap_err();
        assert!(matches!(err, CoverError::Unsupported(_)));
    }

    #[test]
    fn corrupt_bytes_report_decode_error() {
        let dir = TempDir::new().unwrap();
        let cover = dir.path().join("cover.png");
        fs::write(&cover, b"not a png").unwrap();
        let err = loader(None)
            .load(&project("9", cover.to_str().unwrap()))
            .unwrap_err();
        assert!(matches!(err, CoverError::Decode(_)));
    }
}
