//! `palette` and `project` subcommands. They run an admin session against the
//! configured store with no background mounted.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use gallery::{AdminSession, Collaborators, Project};
use store::ProjectDraft;
use swatch::{default_palette, DisplayPalette, Srgb8, UniformBridge};

use crate::cli::{PaletteAction, ProjectAction, ProjectFields};

fn session(stores: Collaborators) -> AdminSession {
    AdminSession::new(stores, UniformBridge::new())
}

pub fn handle_palette(action: PaletteAction, stores: Collaborators) -> Result<()> {
    let mut session = session(stores);
    match action {
        PaletteAction::Show => {
            let palette = session.load_palette()?;
            print_palette(&palette);
        }
        PaletteAction::Set { colors } => {
            let mut palette = session.load_palette()?;
            for (index, raw) in colors.iter().enumerate() {
                let color = Srgb8::parse_hex(raw)
                    .with_context(|| format!("invalid color {} '{raw}'", index + 1))?;
                palette = palette.with_stop(index, color);
            }
            session.set_palette(palette);
            session.save()?;
            print_palette(&palette);
        }
        PaletteAction::Reset => {
            session.set_palette(default_palette());
            session.save()?;
            print_palette(&default_palette());
        }
    }
    Ok(())
}

fn print_palette(palette: &DisplayPalette) {
    for (index, hex) in palette.to_hex_strings().iter().enumerate() {
        println!("c{} {hex}", index + 1);
    }
}

pub fn handle_project(action: ProjectAction, stores: Collaborators) -> Result<()> {
    let session = session(stores);
    match action {
        ProjectAction::List { json } => {
            let projects = session.projects()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&projects)?);
            } else if projects.is_empty() {
                println!("No projects.");
            } else {
                for project in &projects {
                    print_project(project);
                }
            }
        }
        ProjectAction::Add(fields) => {
            let draft = apply_fields(&session, session.new_draft(), fields)?;
            let project = session.create_project(draft)?;
            println!("{}", project.id);
        }
        ProjectAction::Update { id, fields } => {
            let existing = session
                .projects()?
                .into_iter()
                .find(|project| project.id == id)
                .with_context(|| format!("project '{id}' does not exist"))?;
            let draft = apply_fields(&session, existing.to_draft(), fields)?;
            let project = session.update_project(&id, draft)?;
            print_project(&project);
        }
        ProjectAction::Remove { id } => {
            session.delete_project(&id)?;
            println!("removed {id}");
        }
        ProjectAction::Upload { file } => {
            println!("{}", upload(&session, &file)?);
        }
    }
    Ok(())
}

fn apply_fields(
    session: &AdminSession,
    mut draft: ProjectDraft,
    fields: ProjectFields,
) -> Result<ProjectDraft> {
    if let Some(eyebrow) = fields.eyebrow {
        draft.eyebrow = eyebrow;
    }
    if let Some(header) = fields.header {
        draft.header = header;
    }
    if let Some(subtitle) = fields.subtitle {
        draft.subtitle = subtitle;
    }
    if let Some(cover_url) = fields.cover_url {
        draft.cover_url = cover_url;
    }
    if let Some(file) = fields.cover_file {
        draft.cover_url = upload(session, &file)?;
    }
    if let Some(colors) = fields.colors {
        draft = draft.with_palette(&colors);
    }
    if fields.from_cover {
        draft = draft.without_colors();
    }
    Ok(draft)
}

fn upload(session: &AdminSession, file: &Path) -> Result<String> {
    let Some(name) = file.file_name().and_then(|name| name.to_str()) else {
        bail!("cover path {} has no file name", file.display());
    };
    let bytes =
        fs::read(file).with_context(|| format!("failed to read cover {}", file.display()))?;
    Ok(session.upload_cover(name, &bytes)?)
}

fn print_project(project: &Project) {
    let colors = project
        .explicit_palette()
        .map(|palette| palette.to_hex_strings().join(" "))
        .unwrap_or_else(|| "from cover".to_string());
    println!(
        "{:<14} {:<12} {:<24} {}",
        project.id, project.eyebrow, project.header, colors
    );
    println!("{:<14} {}", "", project.subtitle);
    println!("{:<14} {}", "", project.cover_url);
}
