//! Client-side view of one generation connection.
//!
//! [`GenerationSession`] owns no I/O. The caller feeds it socket lifecycle
//! events and decoded frames, and asks it whether a submit or cancel is
//! allowed; when it is, the session applies its optimistic state change and
//! hands back the [`OutboundMessage`] to put on the wire.
//!
//! Two flags drive everything: the connection status and `busy`. Idle moves
//! to busy on a local submit or a `started` frame. Busy returns to idle on
//! `ready`, `final` with an image, `cancelled`, a local cancel, or the socket
//! closing. Late frames from a job cancelled locally are still applied.

use thiserror::Error;
use tracing::{debug, trace};

use crate::form::GenerationForm;
use crate::protocol::{OutboundMessage, ServerMessage};
use crate::render::RenderedImage;
use crate::session::progress::ProgressState;

/// Socket status as seen by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Open,
    Closed,
}

/// Why a submit or cancel was not performed
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("not connected to the backend")]
    NotConnected,

    #[error("a generation is already running")]
    Busy,

    #[error("no generation is running")]
    Idle,
}

/// What a handled frame changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionUpdate {
    /// Backend signalled it is ready; session is idle
    Ready,
    Started(ProgressState),
    Progress(ProgressState),
    /// A new image replaced the displayed one
    ImageReady,
    Cancelled,
    /// Frame was malformed, unknown, or carried nothing usable
    Ignored,
}

/// State of the single generation connection
#[derive(Debug, Clone)]
pub struct GenerationSession {
    connection: ConnectionStatus,
    busy: bool,
    progress: Option<ProgressState>,
    image: Option<RenderedImage>,
    requested_steps: u32,
}

impl GenerationSession {
    /// `default_steps` is used for a `started` frame without `total` before any submit
    pub fn new(default_steps: u32) -> Self {
        Self {
            connection: ConnectionStatus::Connecting,
            busy: false,
            progress: None,
            image: None,
            requested_steps: default_steps,
        }
    }

    pub fn connection(&self) -> ConnectionStatus {
        self.connection
    }

    pub fn is_open(&self) -> bool {
        self.connection == ConnectionStatus::Open
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn progress(&self) -> Option<ProgressState> {
        self.progress
    }

    /// Percentage shown on the progress bar; 0 without progress
    pub fn percent(&self) -> u8 {
        self.progress.map(|p| p.percent()).unwrap_or(0)
    }

    /// Most recent finished image, if any
    pub fn image(&self) -> Option<&RenderedImage> {
        self.image.as_ref()
    }

    pub fn on_open(&mut self) {
        debug!("Connection open");
        self.connection = ConnectionStatus::Open;
        self.go_idle();
    }

    pub fn on_close(&mut self) {
        debug!(was_busy = self.busy, "Connection closed");
        self.connection = ConnectionStatus::Closed;
        self.go_idle();
    }

    /// Decode and apply a text frame. Undecodable frames are ignored.
    pub fn handle_text(&mut self, text: &str) -> SessionUpdate {
        match ServerMessage::parse(text) {
            Some(message) => self.handle_message(message),
            None => {
                debug!(len = text.len(), "Ignoring malformed frame");
                SessionUpdate::Ignored
            }
        }
    }

    pub fn handle_message(&mut self, message: ServerMessage) -> SessionUpdate {
        trace!(kind = message.kind(), "Inbound frame");

        match message {
            ServerMessage::Ready => {
                self.go_idle();
                SessionUpdate::Ready
            }
            ServerMessage::Started { total } => {
                let progress = ProgressState::new(0, total.unwrap_or(self.requested_steps));
                self.busy = true;
                self.progress = Some(progress);
                debug!(total = progress.total, "Generation started");
                SessionUpdate::Started(progress)
            }
            ServerMessage::Progress {
                step: Some(step),
                total: Some(total),
            } => {
                let progress = ProgressState::new(step, total);
                self.progress = Some(progress);
                SessionUpdate::Progress(progress)
            }
            ServerMessage::Final {
                image: Some(payload),
                meta,
            } => {
                self.image = Some(RenderedImage::from_payload(payload, meta));
                self.go_idle();
                debug!("Final image received");
                SessionUpdate::ImageReady
            }
            ServerMessage::Cancelled => {
                self.go_idle();
                debug!("Backend confirmed cancellation");
                SessionUpdate::Cancelled
            }
            ServerMessage::Progress { .. } | ServerMessage::Final { image: None, .. } => {
                SessionUpdate::Ignored
            }
            ServerMessage::Unknown(kind) => {
                debug!(kind = %kind, "Ignoring unknown frame type");
                SessionUpdate::Ignored
            }
        }
    }

    /// Check the submit guards without changing state
    pub fn check_submit(&self, form: &GenerationForm) -> Result<(), Rejection> {
        if !form.has_prompt() {
            return Err(Rejection::EmptyPrompt);
        }
        if !self.is_open() {
            return Err(Rejection::NotConnected);
        }
        if self.busy {
            return Err(Rejection::Busy);
        }
        Ok(())
    }

    /// Start a generation from the form.
    ///
    /// Marks the session busy with `0 / steps` progress before the backend
    /// acknowledges anything.
    pub fn submit(&mut self, form: &GenerationForm) -> Result<OutboundMessage, Rejection> {
        self.check_submit(form)?;
        let request = form
            .build_request()
            .map_err(|_| Rejection::EmptyPrompt)?;

        self.busy = true;
        self.requested_steps = request.steps;
        self.progress = Some(ProgressState::new(0, request.steps));
        debug!(
            steps = request.steps,
            has_image = request.image.is_some(),
            "Submitting generation"
        );

        Ok(OutboundMessage::Generate(request))
    }

    pub fn check_cancel(&self) -> Result<(), Rejection> {
        if !self.is_open() {
            return Err(Rejection::NotConnected);
        }
        if !self.busy {
            return Err(Rejection::Idle);
        }
        Ok(())
    }

    /// Stop the running generation. Local state goes idle without waiting
    /// for the backend's `cancelled` frame.
    pub fn cancel(&mut self) -> Result<OutboundMessage, Rejection> {
        self.check_cancel()?;
        self.go_idle();
        debug!("Cancelling generation");
        Ok(OutboundMessage::Cancel)
    }

    fn go_idle(&mut self) {
        self.busy = false;
        self.progress = None;
    }
}
