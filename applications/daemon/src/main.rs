/// piosc - OSC remote control for a single-display video kiosk
use clap::{Parser, Subcommand};
use piosc_daemon::{
    logging, shutdown_signal, ConfigOverrides, DaemonConfig, OscListener, Provisioner,
};
use piosc_playback::{
    resolve_channel, CommandRouter, PlaybackService, PlaybackSupervisor, ProcessLauncher,
    SystemLauncher, VolumeConfig, VolumeController,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "piosc")]
#[command(about = "OSC remote control for a video kiosk", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Listen for OSC commands and drive the display
    Serve {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Address to listen on
        #[arg(long)]
        ip: Option<String>,
        /// UDP port to listen on
        #[arg(long)]
        port: Option<u16>,
        /// Directory containing video files
        #[arg(long)]
        video_dir: Option<PathBuf>,
        /// Volume change step (1-20)
        #[arg(long)]
        volume_step: Option<i64>,
        /// Path to log file
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
    /// Install the image viewer and cursor hider if missing
    Provision {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            ip,
            port,
            video_dir,
            volume_step,
            log_file,
        } => {
            let overrides = ConfigOverrides {
                host: ip,
                port,
                video_dir,
                volume_step,
                log_file,
            };
            serve(config.as_deref(), &overrides).await?;
        }
        Commands::Provision { config } => {
            provision(config.as_deref()).await?;
        }
    }

    Ok(())
}

async fn serve(config_path: Option<&Path>, overrides: &ConfigOverrides) -> anyhow::Result<()> {
    // Signals during startup are held until the listener is running
    let shutdown = shutdown_signal()?;

    // Load configuration
    let mut config = DaemonConfig::load(config_path)?;
    config.apply(overrides);
    logging::init(&config.logging.file)?;

    if let Err(e) = config.validate() {
        tracing::error!("{}", e);
        return Err(e.into());
    }
    let addr = config.listen_addr()?;

    tracing::info!("Starting Video Player on {}", addr);
    tracing::info!("Video directory: {}", config.media.directory.display());
    tracing::info!("Volume step: {}", config.volume_step());

    let launcher: Arc<dyn ProcessLauncher> = Arc::new(SystemLauncher::new());
    let playback = config.to_playback_config();
    let mixer = playback.tools.mixer.clone();

    let supervisor = PlaybackSupervisor::new(Arc::clone(&launcher), playback);
    supervisor.blanker().disable_screensaver().await;

    let listener = match OscListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Error starting OSC server: {}", e);
            return Err(e.into());
        }
    };

    // Make sure required packages are installed
    if config.provision.auto_install {
        Provisioner::new(
            Arc::clone(&launcher),
            config.tools.clone(),
            config.provision.packages.clone(),
        )
        .ensure_viewer()
        .await;
    }

    let channel = resolve_channel(launcher.as_ref(), &mixer).await;
    let mut volume = VolumeController::new(
        Arc::clone(&launcher),
        mixer,
        VolumeConfig::new(config.volume_step(), channel),
    );
    tracing::info!("Current volume: {}%", volume.get_volume().await);

    // Shows the idle frame before the first command is read
    let (handle, service) = PlaybackService::spawn(CommandRouter::new(supervisor, volume));

    tracing::info!("Video Player is running. Press Ctrl+C to exit.");
    listener.run(handle.clone(), shutdown).await?;

    tracing::info!("Shutting down...");
    if let Err(e) = handle.shutdown().await {
        tracing::warn!("Playback service already stopped: {}", e);
    }
    if let Err(e) = service.await {
        tracing::error!("Playback service task failed: {}", e);
    }

    tracing::info!("Video Player stopped");
    Ok(())
}

async fn provision(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = DaemonConfig::load(config_path)?;
    logging::init_console();

    let launcher: Arc<dyn ProcessLauncher> = Arc::new(SystemLauncher::new());
    let provisioner = Provisioner::new(launcher, config.tools.clone(), config.provision.packages);

    if !provisioner.ensure_viewer().await {
        anyhow::bail!("{:?} is still unavailable", config.tools.viewer);
    }

    println!("{:?} is available", config.tools.viewer);
    Ok(())
}
