//! SimpleEQ CLI Application

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use simpleeq_core::domain::*;
use simpleeq_infra::{
    render_file, render_signal, AuditionSource, CpalEnumerator, EqOutputStream, SignalGenerator,
    TestSignal,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "simpleeq")]
#[command(about = "Three-band parametric equalizer", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a WAV file, or a generated test signal, through the EQ
    Render {
        /// Output WAV file
        output: PathBuf,
        /// Input WAV file (mono or stereo); a test signal is rendered when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[command(flatten)]
        source: SignalArgs,
        /// Length of a generated signal in seconds
        #[arg(long, default_value_t = 5.0)]
        seconds: f32,
        #[command(flatten)]
        eq: EqArgs,
    },
    /// Play a test signal through the EQ on an output device
    Play {
        /// Output device name
        #[arg(short, long)]
        device: Option<String>,
        #[command(flatten)]
        source: SignalArgs,
        /// Stop after this many seconds (default: until Ctrl-C)
        #[arg(long)]
        seconds: Option<u64>,
        /// Reload EQ settings whenever the config file changes
        #[arg(long)]
        watch: bool,
        #[command(flatten)]
        eq: EqArgs,
    },
    /// Print the magnitude response of the current settings
    Response {
        /// Number of log-spaced points between 20 Hz and 20 kHz
        #[arg(long, default_value_t = 32)]
        points: usize,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        eq: EqArgs,
    },
    /// List output devices
    Devices,
    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SignalKind {
    Sine,
    Sweep,
    Noise,
}

#[derive(Args)]
struct SignalArgs {
    /// Test signal
    #[arg(long, value_enum, default_value_t = SignalKind::Sweep)]
    signal: SignalKind,
    /// Sine frequency in Hz
    #[arg(long, default_value_t = 1000.0)]
    freq: f32,
    /// Peak amplitude (0..1)
    #[arg(long, default_value_t = 0.25)]
    amplitude: f32,
}

impl SignalArgs {
    fn source(&self) -> AuditionSource {
        let signal = match self.signal {
            SignalKind::Sine => TestSignal::Sine { freq: self.freq },
            SignalKind::Sweep => TestSignal::Sweep {
                start: 20.0,
                end: 20000.0,
                duration_secs: 10.0,
            },
            SignalKind::Noise => TestSignal::WhiteNoise,
        };
        AuditionSource {
            signal,
            amplitude: self.amplitude,
        }
    }
}

/// Overrides applied on top of the configured EQ settings
#[derive(Args)]
struct EqArgs {
    /// Low-cut frequency in Hz
    #[arg(long)]
    low_cut: Option<f32>,
    /// Low-cut slope (0 = 12 dB/oct .. 3 = 48 dB/oct)
    #[arg(long)]
    low_cut_slope: Option<i64>,
    /// High-cut frequency in Hz
    #[arg(long)]
    high_cut: Option<f32>,
    /// High-cut slope (0 = 12 dB/oct .. 3 = 48 dB/oct)
    #[arg(long)]
    high_cut_slope: Option<i64>,
    /// Peak center frequency in Hz
    #[arg(long)]
    peak_freq: Option<f32>,
    /// Peak gain in dB
    #[arg(long)]
    peak_gain: Option<f32>,
    /// Peak quality
    #[arg(long)]
    peak_q: Option<f32>,
}

impl EqArgs {
    fn apply(&self, params: &ParameterStore) -> anyhow::Result<()> {
        let floats = [
            (ParamId::LowCutFreq, self.low_cut),
            (ParamId::HighCutFreq, self.high_cut),
            (ParamId::PeakFreq, self.peak_freq),
            (ParamId::PeakGain, self.peak_gain),
            (ParamId::PeakQuality, self.peak_q),
        ];
        for (id, value) in floats {
            if let Some(value) = value {
                params.set(id, value)?;
            }
        }

        if let Some(index) = self.low_cut_slope {
            params.set_choice(ParamId::LowCutSlope, index)?;
        }
        if let Some(index) = self.high_cut_slope {
            params.set_choice(ParamId::HighCutSlope, index)?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct ResponsePoint {
    freq: f64,
    db: f64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "simpleeq=debug,simpleeq_core=debug,simpleeq_infra=debug,info"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => ConfigManager::default_config_dir()?.join("config.toml"),
    };

    match cli.command {
        Commands::Render {
            output,
            input,
            source,
            seconds,
            eq,
        } => {
            let config = load_config(&config_path).await?;
            let params = parameter_store(&config, &eq)?;
            let block_size = config.audio.block_size as usize;

            let report = match input {
                Some(input) => render_file(&input, &output, params, block_size)?,
                None => {
                    let source = source.source();
                    let sample_rate = config.audio.sample_rate;
                    let mut generator =
                        SignalGenerator::new(source.signal, sample_rate, source.amplitude);
                    let frames = (f64::from(seconds.max(0.0)) * f64::from(sample_rate)) as u64;
                    render_signal(&mut generator, &output, params, sample_rate, frames, block_size)?
                }
            };

            println!(
                "Rendered {} frames at {} Hz to {}",
                report.frames,
                report.sample_rate,
                output.display()
            );
        }
        Commands::Play {
            device,
            source,
            seconds,
            watch,
            eq,
        } => {
            let config = load_config(&config_path).await?;
            let params = parameter_store(&config, &eq)?;
            play(&config, &config_path, params, device, source.source(), seconds, watch).await?;
        }
        Commands::Response { points, json, eq } => {
            let config = load_config(&config_path).await?;
            let params = parameter_store(&config, &eq)?;
            print_response(&config, params, points, json)?;
        }
        Commands::Devices => {
            let enumerator = CpalEnumerator::new();
            let default_name = enumerator.default_output_device().ok().map(|d| d.name);

            for device in enumerator.output_devices()? {
                let marker = if Some(&device.name) == default_name.as_ref() {
                    "*"
                } else {
                    " "
                };
                let rates: Vec<String> = device
                    .sample_rates
                    .iter()
                    .map(|r| r.hz().to_string())
                    .collect();
                println!("{} {} [{} Hz]", marker, device.name, rates.join(", "));
            }
        }
        Commands::InitConfig { force } => {
            if config_path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    config_path.display()
                );
            }
            EqConfig::default().save_to_file(&config_path).await?;
            println!("Wrote {}", config_path.display());
        }
    }

    Ok(())
}

/// Explicit paths must load; the default path falls back through `ConfigManager`
async fn load_config(path: &Path) -> anyhow::Result<EqConfig> {
    let default_dir = ConfigManager::default_config_dir()?;
    if path.parent() == Some(default_dir.as_path()) {
        return Ok(ConfigManager::new(default_dir).load().await);
    }

    EqConfig::load_from_file(path)
        .await
        .with_context(|| format!("Failed to load {}", path.display()))
}

fn parameter_store(config: &EqConfig, overrides: &EqArgs) -> anyhow::Result<Arc<ParameterStore>> {
    let params = ParameterStore::from_settings(&config.eq)?;
    overrides.apply(&params)?;
    tracing::debug!(settings = ?params.capture_settings(), "EQ settings");
    Ok(Arc::new(params))
}

fn print_response(
    config: &EqConfig,
    params: Arc<ParameterStore>,
    points: usize,
    json: bool,
) -> anyhow::Result<()> {
    let mut eq = EqProcessor::new(params);
    eq.prepare(ProcessSpec::from(&config.audio.stream_config()))?;

    let points = points.max(2);
    let ratio = (20000.0f64 / 20.0).powf(1.0 / (points - 1) as f64);
    let frequencies: Vec<f64> = (0..points).map(|i| 20.0 * ratio.powi(i as i32)).collect();
    let response = eq.magnitude_response(&frequencies)?;

    if json {
        let curve: Vec<ResponsePoint> = frequencies
            .iter()
            .zip(&response)
            .map(|(&freq, &db)| ResponsePoint { freq, db })
            .collect();
        println!("{}", serde_json::to_string_pretty(&curve)?);
    } else {
        for (freq, db) in frequencies.iter().zip(&response) {
            println!("{:>9.1} Hz  {:>8.2} dB", freq, db);
        }
    }
    Ok(())
}

async fn play(
    config: &EqConfig,
    config_path: &Path,
    params: Arc<ParameterStore>,
    device: Option<String>,
    source: AuditionSource,
    seconds: Option<u64>,
    watch: bool,
) -> anyhow::Result<()> {
    let enumerator = CpalEnumerator::new();
    let device = device
        .or_else(|| config.audio.output_device.clone())
        .map(DeviceId::new);

    let stream = EqOutputStream::start(
        &enumerator,
        device.as_ref(),
        &config.audio.stream_config(),
        Arc::clone(&params),
        source,
    )?;
    println!("Playing on {} (Ctrl-C to stop)", stream.device_name());

    let _watcher = if watch {
        Some(spawn_reloader(config_path, Arc::clone(&params)).await?)
    } else {
        None
    };

    match seconds {
        Some(seconds) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
            }
        }
        None => tokio::signal::ctrl_c().await?,
    }

    stream.stop()?;
    Ok(())
}

/// Push EQ settings from the config file into `params` whenever it changes
async fn spawn_reloader(
    config_path: &Path,
    params: Arc<ParameterStore>,
) -> anyhow::Result<ConfigWatcher> {
    let dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let watcher = ConfigWatcher::new(dir).await?;
    tokio::spawn(watch_settings(watcher.subscribe(), config_path.to_path_buf(), params));

    Ok(watcher)
}

/// Reload on every change to `config_path` until the watcher goes away
async fn watch_settings(
    mut rx: broadcast::Receiver<PathBuf>,
    config_path: PathBuf,
    params: Arc<ParameterStore>,
) {
    loop {
        let path = match rx.recv().await {
            Ok(path) => path,
            // Missed events still mean the file changed
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Config watcher lagged");
                config_path.clone()
            }
            Err(RecvError::Closed) => break,
        };
        if path.file_name() != config_path.file_name() {
            continue;
        }
        reload_settings(&path, &params).await;
    }
}

async fn reload_settings(path: &Path, params: &ParameterStore) {
    match EqConfig::load_from_file(path).await {
        Ok(config) => match params.apply_settings(&config.eq) {
            Ok(()) => tracing::info!(path = %path.display(), "EQ settings reloaded"),
            Err(e) => tracing::warn!(error = %e, "Rejected reloaded EQ settings"),
        },
        Err(e) => tracing::warn!(error = %e, "Ignoring unreadable config change"),
    }
}
