//! Example showing how a config file drives the equalizer
//!
//! Run with: cargo run --package simpleeq-core --example config_demo

use simpleeq_core::domain::*;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("simpleeq_core=debug,info")
        .init();

    println!("=== SimpleEQ Configuration Demo ===\n");

    let mut config = EqConfig::default();
    config.eq.low_cut_freq = 80.0;
    config.eq.low_cut_slope = Slope::Db24;
    config.eq.peak_freq = 3000.0;
    config.eq.peak_gain_db = 4.5;

    let dir = std::env::temp_dir().join("simpleeq-demo");
    let manager = ConfigManager::new(dir);
    manager.save(&config).await?;
    println!("Saved configuration to {}", manager.config_path().display());

    let loaded = manager.load().await;
    let params = Arc::new(ParameterStore::from_settings(&loaded.eq)?);

    let mut eq = EqProcessor::new(params);
    eq.prepare(ProcessSpec::from(&loaded.audio.stream_config()))?;

    let frequencies = [30.0, 80.0, 500.0, 3000.0, 10000.0];
    let response = eq.magnitude_response(&frequencies)?;

    println!("\nMagnitude response:");
    for (freq, db) in frequencies.iter().zip(&response) {
        println!("  {:>7.0} Hz  {:>7.2} dB", freq, db);
    }

    manager.clear().await?;
    Ok(())
}
