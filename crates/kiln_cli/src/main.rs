//! Kiln CLI - composite scene files without a GPU
//!
//! ```text
//! kiln render scene.toml --config kiln.toml --deferred
//! kiln config > kiln.toml
//! ```

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use kiln_compositor::{Compositor, CompositorConfig, SceneDescription};
use kiln_renderer::{CompletionDelivery, HeadlessContext, Status, SubmissionRecord};
use tracing_subscriber::EnvFilter;

const COMPLETION_TIMEOUT: Duration = Duration::from_secs(10);

/// Kiln compositor command line interface
#[derive(Parser, Debug)]
#[command(name = "kiln", version, about, long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Composite one frame of a scene file and print the recorded passes
    Render {
        /// Scene description (TOML)
        scene: PathBuf,

        /// Compositor configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Deliver the completion callback from another thread
        #[arg(long)]
        deferred: bool,
    },

    /// Print the default configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Render {
            scene,
            config,
            deferred,
        } => render(&scene, config.as_deref(), deferred),
        Commands::Config => {
            print!("{}", CompositorConfig::default().to_toml_string()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<CompositorConfig> {
    match path {
        Some(path) => CompositorConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(CompositorConfig::from_toml_str("")?),
    }
}

fn render(scene_path: &Path, config_path: Option<&Path>, deferred: bool) -> Result<()> {
    let mut config = load_config(config_path)?;
    if deferred {
        config.frame.delivery = CompletionDelivery::Deferred;
    }

    let scene = SceneDescription::load(scene_path)
        .with_context(|| format!("Failed to load scene {}", scene_path.display()))?;
    let mut tree = scene
        .build_tree(config.frame.size())
        .context("Failed to build layer tree")?;
    let scenes = scene.build_scenes().context("Failed to record child scenes")?;

    let context = Arc::new(
        HeadlessContext::new(config.renderer.clone()).with_delivery(config.frame.delivery),
    );
    let mut compositor = Compositor::new(context.clone(), config);
    let target = compositor.create_frame_target()?;

    tracing::info!("rendering {}", scene_path.display());
    let (tx, rx) = mpsc::channel();
    let outcome = compositor
        .draw_frame(
            &mut tree,
            &target,
            &scenes,
            Box::new(move |status| {
                // The receiver only goes away once we have stopped waiting
                let _ = tx.send(status);
            }),
        )
        .context("Failed to draw frame")?;
    let status = rx
        .recv_timeout(COMPLETION_TIMEOUT)
        .context("Frame never completed")?;
    context.wait_idle();

    println!(
        "frame {}: bounds {:?}, {} layers painted, {} skipped",
        outcome.frame_number,
        outcome.paint_bounds,
        outcome.stats.layers_painted,
        outcome.stats.layers_skipped
    );
    if let Some(submission) = context.last_submission() {
        print_submission(&submission);
    }
    println!("status: {status:?}");

    if status != Status::Completed {
        bail!("Frame finished with status {:?}", status);
    }
    Ok(())
}

fn print_submission(submission: &SubmissionRecord) {
    for (index, pass) in submission.passes.iter().enumerate() {
        println!(
            "  pass {} '{}' {}x{}: {} commands",
            index, pass.label, pass.size.width, pass.size.height, pass.command_count
        );
        for label in &pass.command_labels {
            println!("    {label}");
        }
    }
}
