//! Line-oriented control channel read from stdin while the window runs.
//!
//! ```text
//! picker                       toggle the palette overlay (same as `:`)
//! gallery                      toggle the project gallery (same as `1`)
//! scroll <viewports>           scroll the gallery, e.g. `scroll 0.5`
//! color <1-4> <hex>            set one stop in the overlay
//! palette <hex> x4             set all four stops in the overlay
//! reset                        restore the default palette in the overlay
//! login <password>             unlock the admin palette
//! save                         save the admin palette
//! logout                       leave the admin session
//! status                       print the current palette and gallery state
//! quit                         close the window
//! ```

use std::io::{self, BufRead};
use std::thread;

use crossbeam_channel::Sender;
use swatch::{DisplayPalette, Srgb8, STOP_COUNT};
use tracing::{debug, warn};

use crate::cli::parse_palette;

#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    TogglePicker,
    ToggleGallery,
    Scroll(f32),
    /// Zero-based stop index.
    SetStop(usize, Srgb8),
    SetPalette(DisplayPalette),
    Reset,
    Login(String),
    Save,
    Logout,
    Status,
    Quit,
}

/// Parses one control line. Blank lines and `#` comments yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<ControlCommand>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let (verb, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (trimmed, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "picker" | ":" => ControlCommand::TogglePicker,
        "gallery" | "1" => ControlCommand::ToggleGallery,
        "scroll" => {
            let viewports = rest
                .parse::<f32>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| format!("invalid scroll amount '{rest}'"))?;
            ControlCommand::Scroll(viewports)
        }
        "color" => {
            let (index, hex) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| "usage: color <1-4> <hex>".to_string())?;
            let index = index
                .parse::<usize>()
                .ok()
                .filter(|index| (1..=STOP_COUNT).contains(index))
                .ok_or_else(|| format!("stop must be 1-{STOP_COUNT}, got '{index}'"))?;
            let color = Srgb8::parse_hex(hex.trim()).map_err(|err| err.to_string())?;
            ControlCommand::SetStop(index - 1, color)
        }
        "palette" => ControlCommand::SetPalette(parse_palette(rest)?),
        "reset" => ControlCommand::Reset,
        "login" => {
            if rest.is_empty() {
                return Err("usage: login <password>".into());
            }
            ControlCommand::Login(rest.to_string())
        }
        "save" => ControlCommand::Save,
        "logout" => ControlCommand::Logout,
        "status" => ControlCommand::Status,
        "quit" | "exit" => ControlCommand::Quit,
        other => return Err(format!("unknown command '{other}'")),
    };
    Ok(Some(command))
}

/// Reads stdin on a detached thread and forwards parsed commands. The thread
/// ends on EOF or once the receiver is gone.
pub fn spawn_stdin_reader(tx: Sender<ControlCommand>) -> io::Result<()> {
    thread::Builder::new()
        .name("heroshade-control".into())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        warn!(error = %err, "failed to read control input");
                        break;
                    }
                };
                match parse_line(&line) {
                    Ok(Some(command)) => {
                        if tx.send(command).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(message) => println!("control: {message}"),
                }
            }
            debug!("control input closed");
        })
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_palette_commands() {
        assert_eq!(
            parse_line("color 2 #ff0000"),
            Ok(Some(ControlCommand::SetStop(1, Srgb8::new(255, 0, 0))))
        );
        assert!(parse_line("color 5 #ff0000").is_err());
        assert!(parse_line("color 1").is_err());
        assert!(matches!(
            parse_line("palette #000 #111 #222 #333"),
            Ok(Some(ControlCommand::SetPalette(_)))
        ));
        assert_eq!(parse_line("reset"), Ok(Some(ControlCommand::Reset)));
    }

    #[test]
    fn parses_shell_and_admin_commands() {
        assert_eq!(parse_line(":"), Ok(Some(ControlCommand::TogglePicker)));
        assert_eq!(parse_line("Gallery"), Ok(Some(ControlCommand::ToggleGallery)));
        assert_eq!(parse_line("scroll -0.5"), Ok(Some(ControlCommand::Scroll(-0.5))));
        assert!(parse_line("scroll far").is_err());
        assert_eq!(
            parse_line("login  open sesame "),
            Ok(Some(ControlCommand::Login("open sesame".into())))
        );
        assert!(parse_line("login").is_err());
        assert_eq!(parse_line("quit"), Ok(Some(ControlCommand::Quit)));
    }

    #[test]
    fn ignores_blank_lines_and_comments() {
        assert_eq!(parse_line("   "), Ok(None));
        assert_eq!(parse_line("# note"), Ok(None));
        assert!(parse_line("dance").is_err());
    }
}
