mod admin;
mod bootstrap;
mod cli;
mod control;
mod paths;
mod run;

use anyhow::{Context, Result};
use gallery::{extract_from_image, StandardCoverLoader};
use renderer::save_snapshot;
use serde_json::json;

use crate::bootstrap::{bootstrap, AppContext};
use crate::cli::{Command, ExtractArgs, SnapshotArgs};

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();
    let context = bootstrap(cli.config.as_deref())?;

    match cli.command {
        None => run::run(cli.run, context),
        Some(Command::Extract(args)) => extract(args, &context),
        Some(Command::Snapshot(args)) => snapshot(args, &context),
        Some(Command::Palette(command)) => admin::handle_palette(command.action, context.stores),
        Some(Command::Project(command)) => admin::handle_project(command.action, context.stores),
        Some(Command::Paths) => {
            let paths = &context.paths;
            println!("config: {}", paths.config_dir().display());
            println!("data:   {}", paths.data_dir().display());
            println!("cache:  {}", paths.cache_dir().display());
            println!("file:   {}", paths.config_file().display());
            Ok(())
        }
    }
}

fn extract(args: ExtractArgs, context: &AppContext) -> Result<()> {
    let loader = StandardCoverLoader::new(None, context.config.gallery.fetch_timeout)
        .context("failed to build image loader")?;
    let image = loader
        .load_reference(&args.image)
        .with_context(|| format!("failed to load image '{}'", args.image))?;
    let [c1, c2, c3, c4] = extract_from_image(&image).to_hex_strings();

    if args.json {
        let value = json!({ "c1": c1, "c2": c2, "c3": c3, "c4": c4 });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        for hex in [c1, c2, c3, c4] {
            println!("{hex}");
        }
    }
    Ok(())
}

fn snapshot(args: SnapshotArgs, context: &AppContext) -> Result<()> {
    let render = &context.config.render;
    let (width, height) = args.size.unwrap_or((render.width, render.height));
    let palette = args
        .palette
        .unwrap_or_else(|| context.config.initial_palette());
    save_snapshot(
        &args.out,
        width,
        height,
        args.flow_time,
        &palette.to_render_space(),
    )?;
    println!("{}", args.out.display());
    Ok(())
}
