use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use swatch::{DisplayPalette, PartialPalette, Srgb8};

pub const CONFIG_FILE_NAME: &str = "heroshade.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    pub motion: MotionSection,
    pub render: RenderSection,
    pub palette: PartialPalette,
    pub admin: AdminSection,
    pub gallery: GallerySection,
    pub store: StoreSection,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            motion: MotionSection::default(),
            render: RenderSection::default(),
            palette: PartialPalette::default(),
            admin: AdminSection::default(),
            gallery: GallerySection::default(),
            store: StoreSection::default(),
        }
    }
}

/// Pointer and flow constants of the background animation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MotionSection {
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub pointer_smoothing: Duration,
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub drive_smoothing: Duration,
    pub drive_gain: f32,
    pub flow_speed: f32,
    pub reduced_motion: bool,
}

impl Default for MotionSection {
    fn default() -> Self {
        Self {
            pointer_smoothing: Duration::from_millis(220),
            drive_smoothing: Duration::from_millis(300),
            drive_gain: 2.2,
            flow_speed: 0.7,
            reduced_motion: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderSection {
    pub width: u32,
    pub height: u32,
    pub fps: Option<f32>,
    #[serde(
        deserialize_with = "deserialize_antialias_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub antialias: Option<AntialiasSetting>,
    pub color_space: ColorSpaceSetting,
    pub title: String,
}

impl Default for RenderSection {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: None,
            antialias: None,
            color_space: ColorSpaceSetting::Auto,
            title: "heroshade".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AntialiasSetting {
    Auto,
    Off,
    Samples2,
    Samples4,
    Samples8,
    Samples16,
}

impl AntialiasSetting {
    pub fn from_samples(samples: u32) -> Option<Self> {
        match samples {
            0 | 1 => Some(Self::Off),
            2 => Some(Self::Samples2),
            4 => Some(Self::Samples4),
            8 => Some(Self::Samples8),
            16 => Some(Self::Samples16),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpaceSetting {
    #[default]
    Auto,
    Gamma,
    Linear,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GallerySection {
    /// Directory containing `assets/projects/<id>.png`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_root: Option<PathBuf>,
    pub visibility_threshold: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_sections: Option<usize>,
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub fetch_timeout: Duration,
}

impl Default for GallerySection {
    fn default() -> Self {
        Self {
            asset_root: None,
            visibility_threshold: 0.3,
            max_sections: None,
            fetch_timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreSection {
    pub backend: StoreBackend,
    /// Overrides the data directory used by the file backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// How often a running window re-reads the store for changes made by
    /// other processes.
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub watch_interval: Duration,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            data_dir: None,
            watch_interval: Duration::from_secs(1),
        }
    }
}

fn default_version() -> u32 {
    1
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() || v.is_infinite() {
                return Err(E::custom("duration must be a finite non-negative number"));
            }
            Ok(Duration::from_secs_f64(v))
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*duration).to_string())
}

fn deserialize_antialias_opt<'de, D>(deserializer: D) -> Result<Option<AntialiasSetting>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Helper {
        Str(String),
        Num(i64),
    }

    let helper: Option<Helper> = Option::deserialize(deserializer)?;
    let result = match helper {
        None => None,
        Some(Helper::Str(raw)) => Some(parse_antialias(&raw).map_err(de::Error::custom)?),
        Some(Helper::Num(value)) => {
            if value < 0 {
                return Err(de::Error::custom("antialias value must be non-negative"));
            }
            Some(parse_antialias(&value.to_string()).map_err(de::Error::custom)?)
        }
    };
    Ok(result)
}

pub fn parse_antialias(raw: &str) -> Result<AntialiasSetting, String> {
    let lowered = raw.trim().to_ascii_lowercase();
    let normalized = lowered.strip_prefix("samples").unwrap_or(&lowered);
    match normalized {
        "auto" | "max" | "default" => Ok(AntialiasSetting::Auto),
        "off" | "none" | "disable" | "disabled" | "0" | "1" => Ok(AntialiasSetting::Off),
        "2" => Ok(AntialiasSetting::Samples2),
        "4" => Ok(AntialiasSetting::Samples4),
        "8" => Ok(AntialiasSetting::Samples8),
        "16" => Ok(AntialiasSetting::Samples16),
        other => Err(format!("invalid antialias setting '{other}'")),
    }
}

impl SiteConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: SiteConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Reads and validates `path`; a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Initial manual-picker palette: configured stops over the defaults.
    pub fn initial_palette(&self) -> DisplayPalette {
        self.palette.merge(&DisplayPalette::default())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        let motion = &self.motion;
        if motion.pointer_smoothing.is_zero() {
            return Err(ConfigError::Invalid(
                "motion.pointer_smoothing must be greater than zero".into(),
            ));
        }
        if motion.drive_smoothing.is_zero() {
            return Err(ConfigError::Invalid(
                "motion.drive_smoothing must be greater than zero".into(),
            ));
        }
        for (name, value) in [
            ("motion.drive_gain", motion.drive_gain),
            ("motion.flow_speed", motion.flow_speed),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a finite number >= 0"
                )));
            }
        }

        if self.render.width == 0 || self.render.height == 0 {
            return Err(ConfigError::Invalid(
                "render.width and render.height must be greater than zero".into(),
            ));
        }
        if let Some(fps) = self.render.fps {
            if !fps.is_finite() || fps < 0.0 {
                return Err(ConfigError::Invalid("render.fps must be >= 0".into()));
            }
        }

        for (index, stop) in self.palette.stops().into_iter().enumerate() {
            if let Some(raw) = stop {
                Srgb8::parse_hex(raw).map_err(|err| {
                    ConfigError::Invalid(format!("palette.c{}: {err}", index + 1))
                })?;
            }
        }

        if let Some(password) = &self.admin.password {
            if password.is_empty() {
                return Err(ConfigError::Invalid(
                    "admin.password may not be empty; omit it to disable the admin panel".into(),
                ));
            }
        }

        let threshold = self.gallery.visibility_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ConfigError::Invalid(
                "gallery.visibility_threshold must be in (0, 1]".into(),
            ));
        }
        if self.gallery.max_sections == Some(0) {
            return Err(ConfigError::Invalid(
                "gallery.max_sections must be at least 1 when set".into(),
            ));
        }
        if self.store.watch_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "store.watch_interval must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}
