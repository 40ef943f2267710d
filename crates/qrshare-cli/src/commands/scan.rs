use std::fs;
use std::io::{self, Read};

use anyhow::{Context, Result};
use qrshare_core::{BundleRenderer, HealthBundle, UiEvent};

use crate::cli::OutputFormat;
use crate::commands::{Reported, TerminalApp};
use crate::output::print_bundle;

/// Start the camera, wait for one QR code, show what it unlocks.
pub async fn scan(app: &mut TerminalApp) -> Result<()> {
    app.handle(UiEvent::StartScan).await.map_err(Reported)?;

    let outcome = tokio::select! {
        result = app.scan_once() => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    match outcome {
        Some(result) => {
            if result.map_err(Reported)?.is_none() {
                eprintln!("Scanner stopped without reading a QR code");
            }
        }
        None => {
            app.handle(UiEvent::StopScan).await.map_err(Reported)?;
            eprintln!("Scan cancelled");
        }
    }
    Ok(())
}

fn read_input(file: &Option<String>) -> Result<String> {
    match file {
        Some(path) => fs::read_to_string(path).with_context(|| format!("Failed to read file: {path}")),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

pub fn render(file: &Option<String>, format: OutputFormat) -> Result<()> {
    let content = read_input(file)?;
    let bundle: HealthBundle = serde_json::from_str(&content).context("Invalid bundle JSON")?;
    print_bundle(&BundleRenderer.render(&bundle), format);
    Ok(())
}
