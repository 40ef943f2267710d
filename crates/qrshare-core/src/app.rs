//! Composition root tying the session client, the scanner and a view
//! together.
//!
//! Front ends implement [`View`] and feed [`UiEvent`]s into
//! [`QrShareApp::handle`]; everything else stays testable without a
//! browser or terminal.

use time::UtcOffset;

use crate::client::QrSessionClient;
use crate::error::{ErrorCategory, Result, ShareError};
use crate::model::{QrSession, ShareRequest};
use crate::render::{BundleRenderer, DisplayModel};
use crate::scanner::{Camera, ScannerController, ScannerState};
use crate::time::local_offset;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    SubmitShare(ShareRequest),
    CancelSession(String),
    StartScan,
    StopScan,
}

/// The one cancel button bound to the active session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelAffordance {
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub session_id: String,
    pub qr_image: Vec<u8>,
    pub qr_data_url: String,
    pub expires_at: String,
    pub purpose: Option<String>,
    pub cancel: CancelAffordance,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewModel {
    /// False while a session is displayed; re-enabled on cancel.
    pub form_enabled: bool,
    pub session: Option<SessionView>,
    pub scanner: ScannerState,
    pub bundle: Option<DisplayModel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// A blocking user notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub category: Option<ErrorCategory>,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            message: message.into(),
            category: None,
        }
    }

    pub fn error(err: &ShareError) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: err.to_string(),
            category: Some(err.category()),
        }
    }
}

pub trait View {
    fn render(&mut self, model: &ViewModel);
    fn notify(&mut self, notice: &Notice);
}

pub struct QrShareApp<V: View, C: Camera> {
    client: QrSessionClient,
    scanner: ScannerController<C>,
    renderer: BundleRenderer,
    view: V,
    session: Option<QrSession>,
    bundle: Option<DisplayModel>,
    display_offset: UtcOffset,
}

impl<V: View, C: Camera> QrShareApp<V, C> {
    pub fn new(client: QrSessionClient, camera: C, view: V) -> Self {
        Self {
            client,
            scanner: ScannerController::new(camera),
            renderer: BundleRenderer,
            view,
            session: None,
            bundle: None,
            display_offset: local_offset(),
        }
    }

    /// Offset used when formatting expiry times.
    pub fn with_display_offset(mut self, offset: UtcOffset) -> Self {
        self.display_offset = offset;
        self
    }

    pub fn client(&self) -> &QrSessionClient {
        &self.client
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// The displayed session, unless its expiry has already passed.
    pub fn active_session(&self) -> Option<&QrSession> {
        self.session.as_ref().filter(|s| !s.expires_at.is_expired())
    }

    pub fn scanner_state(&self) -> ScannerState {
        self.scanner.state()
    }

    pub fn view_model(&self) -> ViewModel {
        ViewModel {
            form_enabled: self.active_session().is_none(),
            session: self.active_session().map(|s| SessionView {
                session_id: s.session_id.clone(),
                qr_image: s.qr_image.clone(),
                qr_data_url: s.qr_data_url(),
                expires_at: s.expires_at.display_in(self.display_offset),
                purpose: s.purpose.clone(),
                cancel: CancelAffordance {
                    session_id: s.session_id.clone(),
                },
            }),
            scanner: self.scanner.state(),
            bundle: self.bundle.clone(),
        }
    }

    /// Render the current state.
    pub fn refresh(&mut self) {
        let model = self.view_model();
        self.view.render(&model);
    }

    /// Apply one UI event. Failures are reported through [`View::notify`]
    /// before being returned; the app is always left in a stable state.
    pub async fn handle(&mut self, event: UiEvent) -> Result<()> {
        let result = match event {
            UiEvent::SubmitShare(req) => self.submit_share(req).await,
            UiEvent::CancelSession(id) => self.cancel_session(&id).await,
            UiEvent::StartScan => self.scanner.start().await.map(|_| ()),
            UiEvent::StopScan => {
                self.scanner.stop();
                Ok(())
            }
        };
        self.finish(result)
    }

    /// Wait for the scanner's first decode, exchange it for a bundle and
    /// display it. Returns `Ok(None)` when the scanner is not running or
    /// its stream ended without a decode.
    pub async fn scan_once(&mut self) -> Result<Option<DisplayModel>> {
        let result = self.scan_and_submit().await;
        self.finish(result)
    }

    async fn submit_share(&mut self, req: ShareRequest) -> Result<()> {
        if let Some(expired) = self.session.take_if(|s| s.expires_at.is_expired()) {
            tracing::debug!(session_id = %expired.session_id, "dropping expired QR session");
        }
        if let Some(active) = &self.session {
            return Err(ShareError::validation(format!(
                "QR session {} is still active; cancel it before sharing again",
                active.session_id
            )));
        }
        let session = self.client.request_session(req).await?;
        self.session = Some(session);
        Ok(())
    }

    async fn cancel_session(&mut self, session_id: &str) -> Result<()> {
        match self.client.cancel_session(session_id).await {
            Ok(()) => {
                self.clear_session(session_id);
                self.view.notify(&Notice::info("QR session cancelled"));
                Ok(())
            }
            Err(e @ ShareError::SessionNotFound { .. }) => {
                self.clear_session(session_id);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    fn clear_session(&mut self, session_id: &str) {
        if self
            .session
            .as_ref()
            .is_some_and(|s| s.session_id == session_id)
        {
            self.session = None;
        }
    }

    async fn scan_and_submit(&mut self) -> Result<Option<DisplayModel>> {
        let Some(payload) = self.scanner.next_payload().await? else {
            return Ok(None);
        };
        let bundle = self.client.submit_scan(&payload).await?;
        self.scanner.stop();

        let model = self.renderer.render(&bundle);
        self.bundle = Some(model.clone());
        Ok(Some(model))
    }

    fn finish<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            tracing::debug!(category = %e.category(), error = %e, "reporting error to user");
            self.view.notify(&Notice::error(e));
        }
        self.refresh();
        result
    }
}
