pub mod auth;
pub mod scan;
pub mod share;

use qrshare_core::{Camera, QrShareApp, ShareError};

use crate::output::TerminalView;

pub type TerminalApp = QrShareApp<TerminalView, Box<dyn Camera>>;

/// A failure the view has already shown to the user.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct Reported(#[from] pub ShareError);
