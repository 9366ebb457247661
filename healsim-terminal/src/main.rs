/// Healing Simulator Terminal - ASCII preview of the healing scenes
///
/// Controls:
///   - 1 / 2 / 3: Starlight, Forest, Ocean
///   - Q/ESC: Quit
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use clap::Parser;
use healsim_core::SceneKind;
use healsim_terminal::{AppConfig, TerminalApp};

#[derive(Parser, Debug)]
#[command(name = "healsim-terminal")]
#[command(about = "Render the healing simulator scenes in the terminal", long_about = None)]
#[command(version)]
struct Cli {
    /// Scene to open with (starlight, forest, ocean)
    #[arg(short, long, default_value_t = SceneKind::Starlight)]
    scene: SceneKind,

    /// Seed for procedural placement; random when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Target frames per second
    #[arg(long, default_value = "30")]
    fps: u32,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr, which shares the screen with the renderer
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let seed = cli.seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default()
    });
    log::info!("starting with {} (seed {seed})", cli.scene);

    let mut app = TerminalApp::new(AppConfig {
        scene: cli.scene,
        seed,
        fps: cli.fps,
    })
    .context("failed to initialise terminal")?;
    app.run().context("terminal renderer stopped")?;

    println!("Thank you for resting with the Healing Simulator.");
    Ok(())
}
