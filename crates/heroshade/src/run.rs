use std::sync::Arc;

use anyhow::{Context, Result};
use crossbeam_channel::{never, select, tick, unbounded};
use gallery::{
    AdminGate, AdminSession, Collaborators, Gallery, GalleryOptions, ManualPicker, Project,
    StandardCoverLoader,
};
use renderer::{
    Antialiasing, ColorSpaceMode, MotionConfig, RendererConfig, ShellEvent, WindowRuntime,
};
use siteconfig::{AntialiasSetting, ColorSpaceSetting, SiteConfig};
use swatch::{DisplayPalette, UniformBridge};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::bootstrap::{asset_root, AppContext};
use crate::cli::RunArgs;
use crate::control::{spawn_stdin_reader, ControlCommand};

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run(args: RunArgs, context: AppContext) -> Result<()> {
    let AppContext {
        paths,
        config,
        stores,
    } = context;

    let renderer_config = renderer_config(&args, &config);
    let initial_palette = args.palette.unwrap_or_else(|| config.initial_palette());
    let gate = AdminGate::new(
        args.admin_password
            .clone()
            .or_else(|| config.admin.password.clone()),
    );
    let loader = StandardCoverLoader::new(
        Some(asset_root(&paths, &config)),
        config.gallery.fetch_timeout,
    )
    .context("failed to build cover loader")?;
    let options = GalleryOptions {
        visibility_threshold: config.gallery.visibility_threshold,
        max_sections: config.gallery.max_sections,
    };

    let bridge = UniformBridge::new();
    info!(
        size = ?renderer_config.surface_size,
        fps = ?renderer_config.target_fps,
        reduced_motion = renderer_config.reduced_motion,
        admin = gate.is_enabled(),
        "starting heroshade"
    );
    let runtime = WindowRuntime::spawn(renderer_config, bridge.clone())
        .context("failed to mount the background")?;

    let mut controller = Controller {
        picker: ManualPicker::new(bridge.clone(), initial_palette),
        gallery: Gallery::new(bridge.clone(), Arc::new(loader), options),
        bridge,
        stores: stores.clone(),
        gate,
        admin: None,
        overlay_open: false,
    };
    if args.palette.is_some() || !config.palette.stops().iter().all(Option::is_none) {
        controller.picker.apply();
    }

    let (projects_tx, projects_rx) = unbounded::<Vec<Project>>();
    let subscription = match stores.projects.subscribe(Box::new(move |projects: &[Project]| {
        let _ = projects_tx.send(projects.to_vec());
    })) {
        Ok(subscription) => Some(subscription),
        Err(err) => {
            warn!(error = %err, "project store unavailable; gallery stays empty");
            None
        }
    };
    let (mut projects_rx, watch) = if subscription.is_some() {
        (projects_rx, tick(config.store.watch_interval))
    } else {
        (never(), never())
    };

    let mut control_rx = if args.no_control {
        never()
    } else {
        let (tx, rx) = unbounded();
        match spawn_stdin_reader(tx) {
            Ok(()) => rx,
            Err(err) => {
                warn!(error = %err, "failed to start control reader");
                never()
            }
        }
    };

    let events = runtime.events().clone();
    let results = controller.gallery.results().clone();
    loop {
        let mut projects_closed = false;
        let mut control_closed = false;
        let flow = select! {
            recv(events) -> event => match event {
                Ok(event) => controller.handle_shell_event(event),
                Err(_) => Flow::Exit,
            },
            recv(projects_rx) -> projects => {
                match projects {
                    Ok(projects) => controller.gallery.set_projects(projects),
                    Err(_) => projects_closed = true,
                }
                Flow::Continue
            },
            recv(watch) -> _ => {
                // Picks up edits made by `heroshade project ...` in another
                // process; changes arrive through the subscription.
                if let Err(err) = stores.projects.refresh() {
                    debug!(error = %err, "project store refresh failed");
                }
                Flow::Continue
            },
            recv(results) -> result => {
                if let Ok(result) = result {
                    controller.gallery.handle_result(result);
                }
                Flow::Continue
            },
            recv(control_rx) -> command => match command {
                Ok(command) => controller.handle_command(command),
                Err(_) => {
                    control_closed = true;
                    Flow::Continue
                }
            },
        };
        if flow == Flow::Exit {
            break;
        }
        if projects_closed {
            projects_rx = never();
        }
        if control_closed {
            debug!("control channel closed");
            control_rx = never();
        }
    }

    drop(subscription);
    runtime.shutdown()?;
    info!("heroshade stopped");
    Ok(())
}

pub fn renderer_config(args: &RunArgs, config: &SiteConfig) -> RendererConfig {
    let render = &config.render;
    let motion = &config.motion;
    let target_fps = args
        .fps
        .or(render.fps)
        .filter(|fps| *fps > 0.0 && fps.is_finite());

    RendererConfig {
        surface_size: args.size.unwrap_or((render.width, render.height)),
        target_fps,
        antialiasing: args
            .antialias
            .unwrap_or_else(|| map_antialias(render.antialias)),
        color_space: args
            .color_space
            .unwrap_or_else(|| map_color_space(render.color_space)),
        motion: MotionConfig {
            pointer_smoothing: motion.pointer_smoothing,
            drive_smoothing: motion.drive_smoothing,
            drive_gain: motion.drive_gain,
            flow_speed: motion.flow_speed,
        },
        reduced_motion: args.reduced_motion || motion.reduced_motion,
        title: render.title.clone(),
        show_window: true,
    }
}

fn map_antialias(setting: Option<AntialiasSetting>) -> Antialiasing {
    match setting {
        None | Some(AntialiasSetting::Auto) => Antialiasing::Auto,
        Some(AntialiasSetting::Off) => Antialiasing::Off,
        Some(AntialiasSetting::Samples2) => Antialiasing::Samples(2),
        Some(AntialiasSetting::Samples4) => Antialiasing::Samples(4),
        Some(AntialiasSetting::Samples8) => Antialiasing::Samples(8),
        Some(AntialiasSetting::Samples16) => Antialiasing::Samples(16),
    }
}

fn map_color_space(setting: ColorSpaceSetting) -> ColorSpaceMode {
    match setting {
        ColorSpaceSetting::Auto => ColorSpaceMode::Auto,
        ColorSpaceSetting::Gamma => ColorSpaceMode::Gamma,
        ColorSpaceSetting::Linear => ColorSpaceMode::Linear,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// Owns the producers on the main thread and routes window and control
/// input to them.
struct Controller {
    bridge: UniformBridge,
    stores: Collaborators,
    gate: AdminGate,
    gallery: Gallery,
    picker: ManualPicker,
    admin: Option<AdminSession>,
    overlay_open: bool,
}

impl Controller {
    fn handle_shell_event(&mut self, event: ShellEvent) -> Flow {
        match event {
            ShellEvent::ToggleGallery => {
                let open = self.gallery.toggle();
                println!("gallery {}", if open { "shown" } else { "hidden" });
            }
            ShellEvent::TogglePicker => self.toggle_overlay(),
            ShellEvent::Scroll { viewports } => self.gallery.scroll_by(viewports),
            ShellEvent::Resized { width, height } => {
                debug!(width, height, "window resized");
            }
            ShellEvent::Closed => {
                info!("window closed");
                return Flow::Exit;
            }
            ShellEvent::Fatal(message) => {
                error!(%message, "background stopped");
                return Flow::Exit;
            }
        }
        Flow::Continue
    }

    fn handle_command(&mut self, command: ControlCommand) -> Flow {
        match command {
            ControlCommand::TogglePicker => self.toggle_overlay(),
            ControlCommand::ToggleGallery => {
                return self.handle_shell_event(ShellEvent::ToggleGallery)
            }
            ControlCommand::Scroll(viewports) => self.gallery.scroll_by(viewports),
            ControlCommand::SetStop(index, color) => {
                self.edit(|admin, picker| match admin {
                    Some(session) => session.set_stop(index, color),
                    None => picker.set_stop(index, color),
                });
            }
            ControlCommand::SetPalette(palette) => self.set_palette(palette),
            ControlCommand::Reset => self.set_palette(swatch::default_palette()),
            ControlCommand::Login(password) => self.login(&password),
            ControlCommand::Save => match &self.admin {
                Some(session) => match session.save() {
                    Ok(()) => println!("admin: palette saved"),
                    Err(err) => report_admin_error(&err),
                },
                None => println!("admin: log in first"),
            },
            ControlCommand::Logout => {
                if self.admin.take().is_some() {
                    println!("admin: logged out");
                }
            }
            ControlCommand::Status => self.print_status(),
            ControlCommand::Quit => return Flow::Exit,
        }
        Flow::Continue
    }

    fn toggle_overlay(&mut self) {
        self.overlay_open = !self.overlay_open;
        if self.overlay_open {
            // The admin panel already wrote its palette on login.
            if self.admin.is_none() {
                self.picker.apply();
            }
            println!(
                "{} open",
                if self.admin.is_some() { "admin" } else { "picker" }
            );
        } else {
            println!("overlay closed");
        }
    }

    fn set_palette(&mut self, palette: DisplayPalette) {
        self.edit(|admin, picker| match admin {
            Some(session) => session.set_palette(palette),
            None => picker.set_all(palette),
        });
    }

    /// Palette edits only apply while the overlay is open.
    fn edit(&mut self, apply: impl FnOnce(Option<&mut AdminSession>, &mut ManualPicker) -> bool) {
        if !self.overlay_open {
            println!("open the palette overlay first (':' or `picker`)");
            return;
        }
        if !apply(self.admin.as_mut(), &mut self.picker) {
            debug!("palette edit kept locally; background not mounted");
        }
    }

    fn login(&mut self, password: &str) {
        let session = AdminSession::login(
            &self.gate,
            password,
            self.stores.clone(),
            self.bridge.clone(),
        );
        match session {
            Ok(mut session) => {
                match session.load_palette() {
                    Ok(palette) => println!(
                        "admin: loaded palette {}",
                        palette.to_hex_strings().join(" ")
                    ),
                    Err(err) => report_admin_error(&err),
                }
                self.admin = Some(session);
                self.overlay_open = true;
            }
            Err(err) => report_admin_error(&err),
        }
    }

    fn print_status(&self) {
        match self.bridge.snapshot() {
            Some(committed) => println!(
                "palette {} (source {}, revision {})",
                committed
                    .palette
                    .to_display_space()
                    .to_hex_strings()
                    .join(" "),
                committed.source,
                committed.revision
            ),
            None => println!("background not mounted"),
        }
        println!(
            "overlay {}, admin {}",
            if self.overlay_open { "open" } else { "closed" },
            if self.admin.is_some() { "unlocked" } else { "locked" }
        );
        match self.gallery.active_project() {
            Some(project) if self.gallery.is_open() => println!(
                "gallery open at {:.2}: {} ({})",
                self.gallery.scroll_offset(),
                project.header,
                project.id
            ),
            _ if self.gallery.is_open() => println!("gallery open, no projects"),
            _ => println!("gallery hidden"),
        }
    }
}

fn report_admin_error(err: &gallery::AdminError) {
    warn!(error = %err, "admin operation failed");
    println!("admin: {err}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_config_prefers_flags_over_file() {
        let config = SiteConfig::from_toml_str(
            r#"
            [render]
            width = 800
            height = 600
            fps = 30
            antialias = "off"
            color_space = "gamma"

            [motion]
            reduced_motion = true
            "#,
        )
        .unwrap();

        let from_file = renderer_config(&RunArgs::default(), &config);
        assert_eq!(from_file.surface_size, (800, 600));
        assert_eq!(from_file.target_fps, Some(30.0));
        assert_eq!(from_file.antialiasing, Antialiasing::Off);
        assert_eq!(from_file.color_space, ColorSpaceMode::Gamma);
        assert!(from_file.reduced_motion);

        let args = RunArgs {
            size: Some((320, 200)),
            fps: Some(0.0),
            antialias: Some(Antialiasing::Samples(4)),
            color_space: Some(ColorSpaceMode::Linear),
            ..RunArgs::default()
        };
        let overridden = renderer_config(&args, &config);
        assert_eq!(overridden.surface_size, (320, 200));
        assert_eq!(overridden.target_fps, None);
        assert_eq!(overridden.antialiasing, Antialiasing::Samples(4));
        assert_eq!(overridden.color_space, ColorSpaceMode::Linear);
    }

    #[test]
    fn motion_constants_flow_from_config() {
        let config = SiteConfig::default();
        let motion = renderer_config(&RunArgs::default(), &config).motion;
        assert_eq!(motion.pointer_smoothing, config.motion.pointer_smoothing);
        assert_eq!(motion.drive_smoothing, config.motion.drive_smoothing);
        assert_eq!(motion.drive_gain, 2.2);
        assert_eq!(motion.flow_speed, 0.7);
    }
}
