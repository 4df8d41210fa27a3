use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use renderer::{Antialiasing, ColorSpaceMode};
use swatch::{DisplayPalette, Srgb8, STOP_COUNT};

#[derive(Parser, Debug)]
#[command(
    name = "heroshade",
    author,
    version,
    about = "Animated shader background with live palette producers",
    arg_required_else_help = false
)]
pub struct Cli {
    /// Configuration file (defaults to `heroshade.toml` in the config directory).
    #[arg(long, global = true, env = "HEROSHADE_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Initial manual palette, four hex colors separated by commas.
    #[arg(long, value_name = "HEX,HEX,HEX,HEX", value_parser = parse_palette)]
    pub palette: Option<DisplayPalette>,

    /// Window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size)]
    pub size: Option<(u32, u32)>,

    /// Optional FPS cap (0 = follow the display).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Anti-aliasing policy: `auto`, `off`, or an explicit MSAA sample count (e.g. `4`).
    #[arg(long, value_name = "MODE", value_parser = parse_antialias)]
    pub antialias: Option<Antialiasing>,

    /// Output color space handling: `auto`, `gamma`, or `linear`.
    #[arg(long, value_name = "MODE", value_parser = parse_color_space)]
    pub color_space: Option<ColorSpaceMode>,

    /// Freeze the flow animation; pointer smoothing keeps running.
    #[arg(long, env = "HEROSHADE_REDUCED_MOTION")]
    pub reduced_motion: bool,

    /// Admin password; overrides `[admin].password`.
    #[arg(long, env = "HEROSHADE_ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    /// Do not read control commands from stdin.
    #[arg(long)]
    pub no_control: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the four dominant colors of an image (path or URL).
    Extract(ExtractArgs),
    /// Render one frame of the background to a PNG without opening a window.
    Snapshot(SnapshotArgs),
    /// Show or change the saved admin palette.
    Palette(PaletteCommand),
    /// Manage gallery projects.
    Project(ProjectCommand),
    /// Print resolved config, data and cache directories.
    Paths,
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    #[arg(value_name = "IMAGE")]
    pub image: String,
    /// Print JSON (`{"c1": .., "c4": ..}`) instead of one color per line.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SnapshotArgs {
    #[arg(long, value_name = "PNG")]
    pub out: PathBuf,
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size)]
    pub size: Option<(u32, u32)>,
    /// Flow time to evaluate, in seconds.
    #[arg(long, value_name = "SECONDS", default_value_t = 0.0)]
    pub flow_time: f32,
    /// Palette to render; defaults to the configured palette.
    #[arg(long, value_name = "HEX,HEX,HEX,HEX", value_parser = parse_palette)]
    pub palette: Option<DisplayPalette>,
}

#[derive(Args, Debug)]
pub struct PaletteCommand {
    #[command(subcommand)]
    pub action: PaletteAction,
}

#[derive(Subcommand, Debug)]
pub enum PaletteAction {
    /// Print the saved palette, missing stops filled from the default.
    Show,
    /// Save a new palette. Fewer than four colors keep the remaining saved
    /// stops.
    Set {
        #[arg(value_name = "HEX", num_args = 1..=4, required = true)]
        colors: Vec<String>,
    },
    /// Save the default palette.
    Reset,
}

#[derive(Args, Debug)]
pub struct ProjectCommand {
    #[command(subcommand)]
    pub action: ProjectAction,
}

#[derive(Subcommand, Debug)]
pub enum ProjectAction {
    /// List projects, newest first.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Create a project. Without `--colors` its palette comes from the cover.
    Add(ProjectFields),
    /// Change fields of an existing project.
    Update {
        id: String,
        #[command(flatten)]
        fields: ProjectFields,
    },
    /// Delete a project.
    Remove { id: String },
    /// Upload a cover image and print its URL.
    Upload {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[derive(Args, Debug, Default)]
pub struct ProjectFields {
    #[arg(long)]
    pub eyebrow: Option<String>,
    #[arg(long)]
    pub header: Option<String>,
    #[arg(long)]
    pub subtitle: Option<String>,
    /// Cover image URL.
    #[arg(long = "cover", value_name = "URL", conflicts_with = "cover_file")]
    pub cover_url: Option<String>,
    /// Upload this file and use its URL as the cover.
    #[arg(long, value_name = "FILE")]
    pub cover_file: Option<PathBuf>,
    /// Explicit palette. Projects without one use their cover's colors.
    #[arg(long, value_name = "HEX,HEX,HEX,HEX", value_parser = parse_palette)]
    pub colors: Option<DisplayPalette>,
    /// Drop the explicit palette so the colors come from the cover again.
    #[arg(long, conflicts_with = "colors")]
    pub from_cover: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_antialias(value: &str) -> Result<Antialiasing, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("anti-alias mode must not be empty".to_string());
    }

    let normalized = trimmed.to_ascii_lowercase();
    match normalized.as_str() {
        "auto" | "max" | "default" => Ok(Antialiasing::Auto),
        "off" | "none" | "disable" | "disabled" | "0" => Ok(Antialiasing::Off),
        _ => {
            let samples: u32 = normalized.parse().map_err(|_| {
                format!("invalid anti-alias sample count '{trimmed}'; use auto/off or 2/4/8/16")
            })?;

            if samples == 0 || samples == 1 {
                return Ok(Antialiasing::Off);
            }

            if !matches!(samples, 2 | 4 | 8 | 16) {
                return Err(format!(
                    "unsupported sample count {samples}; supported values are 2, 4, 8, or 16"
                ));
            }

            Ok(Antialiasing::Samples(samples))
        }
    }
}

pub fn parse_color_space(value: &str) -> Result<ColorSpaceMode, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("color space must not be empty".to_string());
    }

    let normalized = trimmed.to_ascii_lowercase();
    match normalized.as_str() {
        "auto" => Ok(ColorSpaceMode::Auto),
        "gamma" | "srgb-off" => Ok(ColorSpaceMode::Gamma),
        "linear" | "srgb" => Ok(ColorSpaceMode::Linear),
        other => Err(format!(
            "unknown color space '{other}'; expected auto, gamma, or linear"
        )),
    }
}

pub fn parse_surface_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid width '{}'", w.trim()))?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid height '{}'", h.trim()))?;
    if width == 0 || height == 0 {
        return Err("size must be greater than zero".into());
    }
    Ok((width, height))
}

/// Four hex colors separated by commas or whitespace.
pub fn parse_palette(value: &str) -> Result<DisplayPalette, String> {
    let parts: Vec<&str> = value
        .split(|ch: char| ch == ',' || ch.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect();
    if parts.len() != STOP_COUNT {
        return Err(format!(
            "expected {STOP_COUNT} colors, got {}",
            parts.len()
        ));
    }
    let mut stops = [Srgb8::new(0, 0, 0); STOP_COUNT];
    for (slot, part) in stops.iter_mut().zip(parts) {
        *slot = Srgb8::parse_hex(part).map_err(|err| err.to_string())?;
    }
    Ok(DisplayPalette::new(stops))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_palette_lists() {
        let palette = parse_palette("#111111, #222222 #333 444444").unwrap();
        assert_eq!(
            palette.stops(),
            [
                Srgb8::new(0x11, 0x11, 0x11),
                Srgb8::new(0x22, 0x22, 0x22),
                Srgb8::new(0x33, 0x33, 0x33),
                Srgb8::new(0x44, 0x44, 0x44),
            ]
        );
        assert!(parse_palette("#111111,#222222").is_err());
        assert!(parse_palette("#111111,#222222,#333333,nope").is_err());
    }

    #[test]
    fn parses_sizes_and_modes() {
        assert_eq!(parse_surface_size("1920x1080"), Ok((1920, 1080)));
        assert!(parse_surface_size("0x10").is_err());
        assert!(parse_surface_size("wide").is_err());
        assert_eq!(parse_antialias("4"), Ok(Antialiasing::Samples(4)));
        assert_eq!(parse_antialias("1"), Ok(Antialiasing::Off));
        assert!(parse_antialias("3").is_err());
        assert_eq!(parse_color_space("Gamma"), Ok(ColorSpaceMode::Gamma));
        assert!(parse_color_space("hdr").is_err());
    }

    #[test]
    fn run_flags_and_subcommands_parse() {
        let cli = Cli::try_parse_from([
            "heroshade",
            "--palette",
            "#000000,#111111,#222222,#333333",
            "--fps",
            "30",
        ])
        .unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.run.fps, Some(30.0));
        assert!(cli.run.palette.is_some());

        let cli = Cli::try_parse_from(["heroshade", "palette", "set", "#fff", "#000"]).unwrap();
        match cli.command {
            Some(Command::Palette(PaletteCommand {
                action: PaletteAction::Set { colors },
            })) => assert_eq!(colors, vec!["#fff", "#000"]),
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::try_parse_from([
            "heroshade", "project", "update", "17", "--header", "New",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Project(ProjectCommand {
                action: ProjectAction::Update { id, fields },
            })) => {
                assert_eq!(id, "17");
                assert_eq!(fields.header.as_deref(), Some("New"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
