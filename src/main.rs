//! Binary entrypoint for the slideshow.
//!
//! Delegates all logic to the library crate; no local modules here.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use rust_slideshow::{Configuration, Error, ScanOptions, Slideshow, catalog, picker, viewer};
use tracing::{Level, error, info};
use tracing_subscriber::{EnvFilter, fmt};

/// Full-screen slideshow of the images under one or more folders.
#[derive(Debug, Parser)]
#[command(name = "slideshow", version, about)]
struct Cli {
    /// Folders to show; a folder picker opens when none are given
    #[arg(value_name = "FOLDERS")]
    folders: Vec<PathBuf>,

    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    /// Start in a window instead of fullscreen
    #[arg(long)]
    windowed: bool,

    /// Print the images in slideshow order and exit
    #[arg(long)]
    list: bool,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!("rust_slideshow={level},slideshow={level},wgpu=warn,winit=warn"))
    })?;
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let mut cfg = match &cli.config {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Configuration::default(),
    }
    .validated()
    .context("validating configuration")?;
    if cli.windowed {
        cfg.start_fullscreen = false;
    }

    let roots = match picker::select_roots(cli.folders) {
        Ok(roots) => roots,
        Err(Error::NoSelection) => {
            info!("no folders selected; exiting");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    let catalog = catalog::build(&roots, &ScanOptions::from(&cfg));
    if cli.list {
        for image in catalog.as_slice() {
            println!("{}", image.as_path().display());
        }
        return Ok(());
    }
    if catalog.is_empty() {
        error!(error = %Error::EmptyCatalog, roots = roots.len(), "nothing to show");
        picker::notify_empty_catalog(&roots);
    }

    let slideshow = Slideshow::new(catalog, &cfg, Instant::now());
    viewer::run(slideshow, &cfg)?;
    info!("slideshow closed");
    Ok(())
}
