//! # qrshare-core
//!
//! Client-side core for sharing health data through short-lived QR codes.
//!
//! A patient asks the backend for a share session ([`QrSessionClient`]),
//! shows the returned QR code and can cancel it. A provider points a
//! camera at the code ([`ScannerController`]), submits the decoded payload
//! and gets a bundle of health records back, which [`BundleRenderer`]
//! turns into something displayable. [`QrShareApp`] wires these to any
//! front end implementing [`View`].
//!
//! ```ignore
//! use qrshare_core::{ClientOptions, QrSessionClient, ShareRequest, TwoTierTokenProvider};
//!
//! let tokens = TwoTierTokenProvider::for_profile("default")?;
//! let client = QrSessionClient::new("http://localhost:8080", tokens, ClientOptions::default())?;
//! let session = client
//!     .request_session(ShareRequest::new(["VITALS"], 15, "checkup"))
//!     .await?;
//! println!("{} expires {}", session.session_id, session.expires_at.display_local());
//! ```

pub mod app;
pub mod client;
pub mod error;
pub mod model;
pub mod render;
pub mod scanner;
pub mod time;
pub mod token;

pub use app::{CancelAffordance, Notice, NoticeKind, QrShareApp, SessionView, UiEvent, View, ViewModel};
pub use client::{ClientOptions, QrSessionClient};
pub use error::{ErrorCategory, Result, ShareError};
pub use model::{BundleEntry, HealthBundle, QrSession, ScanPayload, SessionStatus, ShareRequest};
pub use render::{BundleRenderer, DisplayEntry, DisplayModel};
pub use scanner::{Camera, CommandCamera, DecodeStream, LineCamera, ScannerController, ScannerState};
pub use crate::time::ExpiresAt;
pub use token::{
    AuthTokenProvider, EnvTokenStore, FileTokenStore, MemoryTokenStore, StoredCredentials,
    TokenStore, TwoTierTokenProvider,
};
