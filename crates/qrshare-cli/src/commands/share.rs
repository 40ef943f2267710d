use std::fs;

use anyhow::{Context, Result};
use colored::Colorize;
use qrshare_core::{ShareRequest, UiEvent};

use crate::cli::{OutputFormat, ShareArgs};
use crate::commands::{Reported, TerminalApp};
use crate::output::{print_success, print_value};

pub async fn share(app: &mut TerminalApp, args: &ShareArgs) -> Result<()> {
    let req = ShareRequest::new(
        args.data_types.iter().cloned(),
        args.expires,
        args.purpose.clone(),
    );
    app.handle(UiEvent::SubmitShare(req))
        .await
        .map_err(Reported)?;

    if let (Some(path), Some(session)) = (&args.qr_out, app.active_session()) {
        fs::write(path, &session.qr_image)
            .with_context(|| format!("Failed to write QR code to {}", path.display()))?;
        print_success(&format!("QR code written to {}", path.display().to_string().cyan()));
    }

    if args.wait {
        eprintln!("Session open. Press Ctrl-C to cancel it.");
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?;
        if let Some(id) = app.active_session().map(|s| s.session_id.clone()) {
            app.handle(UiEvent::CancelSession(id))
                .await
                .map_err(Reported)?;
        }
    }
    Ok(())
}

pub async fn cancel(app: &mut TerminalApp, session_id: &str) -> Result<()> {
    app.handle(UiEvent::CancelSession(session_id.to_string()))
        .await
        .map_err(Reported)?;
    Ok(())
}

pub async fn status(app: &TerminalApp, session_id: &str, format: OutputFormat) -> Result<()> {
    let status = app.client().session_status(session_id).await?;
    print_value(&status.0, format);
    Ok(())
}
