mod headless;
mod viewer;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use token_cloud::LayoutConfig;
use tracing::Level;

const SAMPLE_DOCUMENTS: &str = include_str!("../demos/sample.json");

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON array of scored documents; the bundled sample is used when omitted.
    input: Option<PathBuf>,
    /// JSON layout config; missing keys keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Run the layout without a window and print the final geometry as JSON.
    #[arg(long)]
    headless: bool,
    #[arg(long, default_value_t = 1200.0)]
    width: f32,
    #[arg(long, default_value_t = 800.0)]
    height: f32,
    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => LayoutConfig::default(),
    };

    if args.headless {
        return headless::run(args.input.as_deref(), config, args.width, args.height);
    }

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([args.width + viewer::CONTROLS_WIDTH, args.height]),
        ..Default::default()
    };

    let input = args.input.clone();
    eframe::run_native(
        "token-cloud",
        options,
        Box::new(move |cc| Ok(Box::new(viewer::TokenCloudApp::new(cc, input, config)))),
    )
    .map_err(|error| anyhow!("viewer exited with an error: {error}"))
}

fn load_config(path: &Path) -> Result<LayoutConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: LayoutConfig = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

/// Reads the documents at `path`, or the bundled sample without one.
pub(crate) fn load_documents(path: Option<&Path>) -> Result<Vec<token_cloud::Document>> {
    let Some(path) = path else {
        return token_cloud::parse_documents(SAMPLE_DOCUMENTS)
            .context("failed to parse bundled sample documents");
    };

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read documents {}", path.display()))?;
    token_cloud::parse_documents(&raw)
        .with_context(|| format!("failed to parse documents {}", path.display()))
}
