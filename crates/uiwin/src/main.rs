#![warn(missing_docs)]

//! Entry point for the `uiwin` binary.

mod cli;
mod error;
mod fs_loader;
mod script;

use std::{process, sync::Arc};

use clap::Parser;
use tokio::runtime::Builder;
use tracing::{error, info};
use uiwin_config::UiConfig;
use uiwin_core::{AssetLoader, Manifest, UiManager};

use crate::{
    cli::{Cli, Commands, RunArgs},
    error::{Error, Result},
    fs_loader::FsLoader,
    script::{Runner, ScriptController},
};

fn main() {
    if let Err(err) = run() {
        error!("{err}");
        eprintln!("error: {err}");
        process::exit(1);
    }
}

/// Parse CLI arguments, install logging, and dispatch to the chosen subcommand.
fn run() -> Result<()> {
    let Cli {
        log,
        config,
        root,
        command,
    } = Cli::parse();
    logging::init(&log.spec());

    let config = uiwin_config::load_effective(config.as_deref())?;
    let loader = FsLoader::new(root);
    info!(root = %loader.root().display(), bundle_root = %config.bundle_root, "bundle");

    // One scheduler thread: the manager's state machine assumes it.
    let rt = Builder::new_current_thread().enable_all().build()?;
    match command {
        Commands::Run(args) => rt.block_on(run_script(config, loader, &args)),
        Commands::Manifest { name } => rt.block_on(print_manifest(&config, &loader, &name)),
    }
}

/// Execute the `run` subcommand.
async fn run_script(config: UiConfig, loader: FsLoader, args: &RunArgs) -> Result<()> {
    let steps = script::parse_steps(&args.steps)?;
    let mut builder = UiManager::builder(Arc::new(loader)).config(config);
    for name in script::templates(&steps) {
        builder = builder.window(name, ScriptController::default);
    }
    let mut runner = Runner::new(builder.build(), args.settle);
    for step in &steps {
        runner.step(step).await;
    }
    runner.drain(args.drain_timeout).await;

    for (name, open) in runner.summary() {
        println!("{:<6} {name}", if open { "shown" } else { "hidden" });
    }
    if runner.failed().is_empty() {
        Ok(())
    } else {
        Err(Error::LoadFailed(runner.failed().to_vec()))
    }
}

/// Execute the `manifest` subcommand.
async fn print_manifest(config: &UiConfig, loader: &FsLoader, name: &str) -> Result<()> {
    let path = config.manifest_path(name);
    let bytes = loader
        .load_bytes(&path)
        .await
        .map_err(|source| Error::Load {
            path: path.clone(),
            source,
        })?;
    let manifest = Manifest::parse(&bytes).map_err(|_| Error::Manifest(path))?;
    for dep in manifest.iter() {
        println!("{}", config.dependency_path(dep));
    }
    println!("{}", config.resource_path(name));
    Ok(())
}
