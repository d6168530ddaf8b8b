use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pebo::config::DisplayBackend;
use pebo::daemon::{open_arms, open_displays};
use pebo::display::{EyeDisplay, FrameBuffer};
use pebo::eyes::{Mood, RoboEyesDual, StopSignal};
use pebo::preview::{PreviewOptions, render_preview};
use pebo::{Config, Daemon};

/// PEBO - desk companion robot: animated OLED eyes and servo arms
#[derive(Parser)]
#[command(name = "pebo", version, about)]
struct Cli {
    /// Port for the control API
    #[arg(long, env = "PEBO_PORT")]
    port: Option<u16>,

    /// Mood to start in (default, tired, angry, happy, love, qr)
    #[arg(short, long, env = "PEBO_MOOD")]
    mood: Option<Mood>,

    /// Display backend (ssd1306, memory, png)
    #[arg(long, env = "PEBO_DISPLAY_BACKEND")]
    backend: Option<DisplayBackend>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Don't serve the control API
    #[arg(long)]
    no_api: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Show one mood on the panels until ctrl-c
    Mood {
        mood: Mood,
        /// Stop after this many seconds
        #[arg(short, long)]
        seconds: Option<u64>,
    },
    /// Render a mood to PNG files
    Preview {
        #[arg(default_value = "default")]
        mood: Mood,
        /// Number of frames to render
        #[arg(short, long, default_value = "60")]
        frames: u32,
        /// Output directory (defaults to the data dir)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Random seed for blink and idle timing
        #[arg(long, default_value = "0")]
        seed: u64,
    },
    /// Light both panels, then blank them
    TestDisplay,
    /// Move the arms to the given angles, then back to rest
    TestServo {
        #[arg(long, default_value = "90")]
        left: f32,
        #[arg(long, default_value = "90")]
        right: f32,
    },
    /// Install pebo as a system service
    Install,
    /// Uninstall the pebo system service
    Uninstall,
    /// Show service status
    Status,
    /// Tail the service log file
    Logs {
        /// Number of lines to show
        #[arg(short = 'n', long, default_value = "50")]
        lines: usize,
        /// Follow log output
        #[arg(short, long)]
        follow: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,pebo=info",
        1 => "info,pebo=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli);
    tracing::debug!(?config, "loaded configuration");

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Mood { mood, seconds } => cmd_mood(config, mood, seconds).await,
            Command::Preview {
                mood,
                frames,
                out,
                seed,
            } => cmd_preview(&config, mood, frames, out, seed),
            Command::TestDisplay => test_display(&config).await,
            Command::TestServo { left, right } => test_servo(&config, left, right).await,
            Command::Install => cmd_install(cli.port.unwrap_or(config.server.port), cli.mood),
            Command::Uninstall => cmd_uninstall(),
            Command::Status => cmd_status(),
            Command::Logs { lines, follow } => cmd_logs(lines, follow),
        };
    }

    tracing::info!(
        port = config.server.port,
        mood = %config.eyes.mood,
        api = config.server.enabled,
        "starting pebo"
    );

    let daemon = Daemon::new(config)?;
    daemon.run().await?;

    Ok(())
}

/// Config file and env, then command-line overrides
fn load_config(cli: &Cli) -> Config {
    let mut config = Config::load();
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(mood) = cli.mood {
        config.eyes.mood = mood;
    }
    if let Some(backend) = cli.backend {
        config.display.backend = backend;
    }
    if cli.no_api {
        config.server.enabled = false;
    }
    config
}

/// Run a single mood loop in the foreground
async fn cmd_mood(config: Config, mood: Mood, seconds: Option<u64>) -> anyhow::Result<()> {
    config.validate()?;
    let (left, right) = open_displays(&config.display)?;
    let mut eyes = RoboEyesDual::new(left, right, config.eyes)?;

    let stop = StopSignal::new();
    let ctrl_c_stop = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_stop.stop();
        }
    });

    println!("Showing {mood} - press ctrl-c to stop");

    tokio::task::spawn_blocking(move || {
        eyes.begin()?;
        match seconds {
            Some(secs) => eyes.run_mood_for(mood, Duration::from_secs(secs), &stop)?,
            None => eyes.run_mood(mood, &stop)?,
        }
        eyes.clear()
    })
    .await??;

    Ok(())
}

/// Render frames to PNG
fn cmd_preview(
    config: &Config,
    mood: Mood,
    frames: u32,
    out: Option<PathBuf>,
    seed: u64,
) -> anyhow::Result<()> {
    let dir = out.unwrap_or_else(|| config.data_dir.join("preview").join(mood.as_str()));
    let options = PreviewOptions {
        mood,
        frames,
        seed,
        panel: (config.display.width, config.display.height),
        eyes: config.eyes.clone(),
    };

    let report = render_preview(&dir, &options)?;
    println!(
        "Wrote {} frames to {}\nPreview: {}",
        report.frames,
        report.dir.display(),
        report.composite.display()
    );
    Ok(())
}

/// Light every pixel on both panels for two seconds
async fn test_display(config: &Config) -> anyhow::Result<()> {
    let (mut left, mut right) = open_displays(&config.display)?;
    let (width, height) = left.size();

    let mut frame = FrameBuffer::new(width, height);
    frame.fill(true);

    println!("Lighting both panels ({width}x{height})...");
    left.show(&frame)?;
    right.show(&frame)?;
    tokio::time::sleep(Duration::from_secs(2)).await;

    left.clear()?;
    right.clear()?;
    println!("Done");
    Ok(())
}

/// Move the arms, wait, then rest and release
async fn test_servo(config: &Config, left: f32, right: f32) -> anyhow::Result<()> {
    let mut settings = config.arms.clone();
    settings.enabled = true;
    let mut arms =
        open_arms(&settings).ok_or_else(|| anyhow::anyhow!("servo driver not available"))?;

    println!("Moving arms to left={left} right={right}...");
    arms.set_angles(left, right)?;
    tokio::time::sleep(Duration::from_secs(1)).await;

    arms.rest()?;
    tokio::time::sleep(Duration::from_millis(500)).await;
    arms.release()?;
    println!("Done");
    Ok(())
}

/// Install pebo as a system service
fn cmd_install(port: u16, mood: Option<Mood>) -> anyhow::Result<()> {
    let binary = std::env::current_exe()?;
    let config = pebo::lifecycle::ServiceConfig {
        binary_path: binary,
        port,
        mood,
        extra_args: Vec::new(),
    };

    pebo::lifecycle::install_service(&config)?;
    println!("PEBO installed as system service");
    Ok(())
}

/// Uninstall the pebo system service
fn cmd_uninstall() -> anyhow::Result<()> {
    pebo::lifecycle::uninstall_service()?;
    println!("PEBO system service removed");
    Ok(())
}

/// Show service status
fn cmd_status() -> anyhow::Result<()> {
    let status = pebo::lifecycle::service_status()?;
    println!("PEBO service: {status}");
    Ok(())
}

/// Tail the service log file
fn cmd_logs(lines: usize, follow: bool) -> anyhow::Result<()> {
    let log_path =
        pebo::lifecycle::log_path().ok_or_else(|| anyhow::anyhow!("could not determine log path"))?;

    if !log_path.exists() {
        anyhow::bail!("log file not found: {}", log_path.display());
    }

    let mut args = vec![format!("-n{lines}"), log_path.display().to_string()];
    if follow {
        args.insert(0, "-f".to_string());
    }

    let status = std::process::Command::new("tail").args(&args).status()?;

    if !status.success() {
        anyhow::bail!("tail exited with {status}");
    }

    Ok(())
}
