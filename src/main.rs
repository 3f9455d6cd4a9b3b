//! Affect Inference CLI
//!
//! Serves arousal/valence predictions over HTTP, or runs a single prediction.

use affect_inference::{
    config::Config,
    core::{AffectPredictor, PhysiologicalSample, RngNoise},
    VERSION,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "affect-server")]
#[command(version = VERSION)]
#[command(about = "Arousal/valence inference from heart rate and EDA", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP inference server
    Serve {
        /// Interface to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,

        /// Path to the persisted arousal model
        #[arg(long)]
        arousal_model: Option<PathBuf>,

        /// Path to the persisted valence model
        #[arg(long)]
        valence_model: Option<PathBuf>,
    },

    /// Run a single prediction and print the result
    Predict {
        /// Heart rate in beats per minute
        #[arg(long)]
        heart_rate: f64,

        /// Electrodermal activity in microsiemens
        #[arg(long)]
        eda: f64,

        /// Path to the persisted arousal model
        #[arg(long)]
        arousal_model: Option<PathBuf>,

        /// Path to the persisted valence model
        #[arg(long)]
        valence_model: Option<PathBuf>,
    },

    /// Show configuration
    Config {
        /// Write the default configuration file if none exists
        #[arg(long)]
        init: bool,
    },
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            arousal_model,
            valence_model,
        } => {
            let mut config = Config::load()?;
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            apply_model_paths(&mut config, arousal_model, valence_model);
            cmd_serve(config)
        }
        Commands::Predict {
            heart_rate,
            eda,
            arousal_model,
            valence_model,
        } => {
            let mut config = Config::load()?;
            apply_model_paths(&mut config, arousal_model, valence_model);
            cmd_predict(&config, heart_rate, eda)
        }
        Commands::Config { init } => cmd_config(init),
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "affect_inference=info,tower_http=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn apply_model_paths(config: &mut Config, arousal: Option<PathBuf>, valence: Option<PathBuf>) {
    if let Some(path) = arousal {
        config.arousal_model_path = path;
    }
    if let Some(path) = valence {
        config.valence_model_path = path;
    }
}

#[cfg(feature = "server")]
fn cmd_serve(config: Config) -> anyhow::Result<()> {
    use affect_inference::server::{serve, ServerConfig};

    println!("Affect Inference v{VERSION}");
    println!("  Listening on: {}", config.bind_addr());
    println!("  Arousal model: {:?}", config.arousal_model_path);
    println!("  Valence model: {:?}", config.valence_model_path);
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    ctrlc_handler(stop_tx)?;

    let runtime = tokio::runtime::Runtime::new()?;
    let state = runtime.block_on(async {
        serve(ServerConfig::from(&config), async move {
            let _ = stop_rx.await;
            tracing::info!("Shutdown signal received");
        })
        .await
    })?;

    println!();
    println!("{}", state.summary());
    Ok(())
}

#[cfg(not(feature = "server"))]
fn cmd_serve(_config: Config) -> anyhow::Result<()> {
    anyhow::bail!("serve requires the `server` feature")
}

fn cmd_predict(config: &Config, heart_rate: f64, eda: f64) -> anyhow::Result<()> {
    let predictor =
        AffectPredictor::load_or_fallback(&config.arousal_model_path, &config.valence_model_path);
    let sample = PhysiologicalSample::new(heart_rate, eda);

    let result = predictor.infer(&sample, &mut RngNoise::thread())?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn cmd_config(init: bool) -> anyhow::Result<()> {
    if init {
        let path = Config::config_path();
        if path.exists() {
            println!("Config file already exists: {:?}", path);
        } else {
            Config::default().save()?;
            println!("Wrote default configuration to {:?}", path);
        }
        println!();
    }

    let config = Config::load()?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Set up Ctrl+C handler.
#[cfg(feature = "server")]
fn ctrlc_handler(stop: tokio::sync::oneshot::Sender<()>) -> anyhow::Result<()> {
    let stop = std::sync::Mutex::new(Some(stop));
    ctrlc::set_handler(move || {
        if let Some(tx) = stop.lock().ok().and_then(|mut guard| guard.take()) {
            let _ = tx.send(());
        }
    })?;
    Ok(())
}
