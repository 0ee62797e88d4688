//! Event loop tying the form, the session and the socket together

use std::future::Future;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

use crate::app::command::{Command, HELP};
use crate::config::Settings;
use crate::error::{AppError, Result};
use crate::form::GenerationForm;
use crate::render::{status_line, ImageWriter};
use crate::session::{GenerationSession, SessionUpdate};
use crate::transport::{Connection, TransportEvent};

const BAR_WIDTH: usize = 30;

/// How a one-shot generation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Image received and written to this path
    Saved(PathBuf),
    /// Cancelled locally or by the backend
    Cancelled,
    /// Backend reported `ready` again before producing an image
    Reset,
    /// Socket closed before an image arrived
    Disconnected(Option<String>),
}

/// Whether the interactive loop keeps going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// A client session bound to one backend
pub struct Studio {
    settings: Settings,
    form: GenerationForm,
    session: GenerationSession,
    writer: ImageWriter,
    saved: Vec<PathBuf>,
}

impl Studio {
    pub fn new(settings: Settings) -> Self {
        let form = GenerationForm::from_defaults(&settings.defaults);
        Self::with_form(settings, form)
    }

    pub fn with_form(settings: Settings, form: GenerationForm) -> Self {
        let session = GenerationSession::new(form.steps());
        let writer = ImageWriter::from_config(&settings.output);
        Self {
            settings,
            form,
            session,
            writer,
            saved: Vec::new(),
        }
    }

    pub fn form(&self) -> &GenerationForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut GenerationForm {
        &mut self.form
    }

    pub fn session(&self) -> &GenerationSession {
        &self.session
    }

    /// Paths of every image written so far
    pub fn saved(&self) -> &[PathBuf] {
        &self.saved
    }

    async fn connect(&mut self) -> Result<Connection> {
        let backend = &self.settings.backend;
        let connection = Connection::open(&backend.ws_url, backend.connect_timeout()).await?;
        self.session.on_open();
        Ok(connection)
    }

    /// Apply frames until the backend's `ready` greeting, the ready timeout,
    /// or the socket closing. Returns false if the socket closed.
    async fn await_ready(&mut self, connection: &mut Connection) -> Result<bool> {
        let deadline = tokio::time::sleep(self.settings.backend.ready_timeout());
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                event = connection.next_event() => match event {
                    TransportEvent::Text(text) => {
                        let update = self.session.handle_text(&text);
                        if update == SessionUpdate::Ready {
                            debug!("Backend ready");
                            return Ok(true);
                        }
                        self.report(update).await;
                    }
                    TransportEvent::Closed(reason) => {
                        self.session.on_close();
                        println!("Disconnected{}", reason_suffix(reason.as_deref()));
                        return Ok(false);
                    }
                },
                _ = &mut deadline => {
                    debug!("No ready frame before timeout, continuing");
                    return Ok(true);
                }
            }
        }
    }

    /// Submit the current form once and wait for the result.
    ///
    /// Ctrl-C while generating sends a cancel; the run ends on the backend's
    /// `cancelled` ack or a second Ctrl-C.
    pub async fn run_once(&mut self) -> Result<Outcome> {
        self.run_once_until(|| async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    }

    /// [`Studio::run_once`] with a caller-supplied interrupt in place of Ctrl-C.
    ///
    /// `interrupt` is called again on every loop turn; each completion counts
    /// as one interrupt.
    pub async fn run_once_until<F, Fut>(&mut self, mut interrupt: F) -> Result<Outcome>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut connection = self.connect().await?;
        let result = self.drive_once(&mut connection, &mut interrupt).await;
        let closed = connection.close().await;
        let outcome = result?;
        closed?;
        Ok(outcome)
    }

    async fn drive_once<F, Fut>(
        &mut self,
        connection: &mut Connection,
        interrupt: &mut F,
    ) -> Result<Outcome>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        if !self.await_ready(connection).await? {
            return Ok(Outcome::Disconnected(None));
        }

        let message = self
            .session
            .submit(&self.form)
            .map_err(|rejection| AppError::InvalidRequest(rejection.to_string()))?;
        connection.send(&message).await?;
        info!(
            prompt = %self.form.prompt().trim(),
            steps = self.form.steps(),
            "Generation submitted"
        );
        println!("{}", status_line(self.session.progress().as_ref(), BAR_WIDTH));

        let mut cancel_sent = false;
        loop {
            tokio::select! {
                event = connection.next_event() => match event {
                    TransportEvent::Text(text) => match self.session.handle_text(&text) {
                        SessionUpdate::ImageReady => {
                            let path = self.save_image().await?;
                            return Ok(Outcome::Saved(path));
                        }
                        SessionUpdate::Cancelled => {
                            println!("Cancelled");
                            return Ok(Outcome::Cancelled);
                        }
                        SessionUpdate::Ready => {
                            warn!("Backend reset before producing an image");
                            return Ok(Outcome::Reset);
                        }
                        update => self.report(update).await,
                    },
                    TransportEvent::Closed(reason) => {
                        self.session.on_close();
                        println!("Disconnected{}", reason_suffix(reason.as_deref()));
                        return Ok(Outcome::Disconnected(reason));
                    }
                },
                _ = interrupt() => {
                    if cancel_sent || !self.stop_once(connection).await? {
                        return Ok(Outcome::Cancelled);
                    }
                    cancel_sent = true;
                }
            }
        }
    }

    /// Cancel the running one-shot job. Returns false when nothing was running.
    async fn stop_once(&mut self, connection: &mut Connection) -> Result<bool> {
        match self.session.cancel() {
            Ok(cancel) => {
                connection.send(&cancel).await?;
                println!("Stopping, press Ctrl-C again to quit");
                Ok(true)
            }
            Err(rejection) => {
                debug!(%rejection, "Nothing to cancel");
                Ok(false)
            }
        }
    }

    /// Read prompts and commands from `input` until `:quit`, end of input
    /// with nothing running, Ctrl-C while idle, or the socket closing.
    pub async fn run_interactive<R>(&mut self, input: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut connection = self.connect().await?;
        let result = self.drive_interactive(&mut connection, input).await;
        let closed = connection.close().await;
        result?;
        closed
    }

    async fn drive_interactive<R>(&mut self, connection: &mut Connection, input: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        if !self.await_ready(connection).await? {
            return Ok(());
        }
        println!("Connected to {}. Type :help for commands.", connection.url());

        let mut lines = input.lines();
        let mut input_open = true;

        loop {
            if !input_open && !self.session.is_busy() {
                return Ok(());
            }

            tokio::select! {
                event = connection.next_event() => match event {
                    TransportEvent::Text(text) => {
                        let update = self.session.handle_text(&text);
                        self.report(update).await;
                    }
                    TransportEvent::Closed(reason) => {
                        self.session.on_close();
                        println!("Disconnected{}", reason_suffix(reason.as_deref()));
                        return Ok(());
                    }
                },
                line = lines.next_line(), if input_open => match line? {
                    Some(line) => {
                        if self.execute(&line, connection).await? == Flow::Quit {
                            return Ok(());
                        }
                    }
                    None => input_open = false,
                },
                _ = tokio::signal::ctrl_c() => {
                    if self.session.is_busy() {
                        self.stop(connection).await;
                    } else {
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn execute(&mut self, line: &str, connection: &mut Connection) -> Result<Flow> {
        let command = match Command::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(Flow::Continue),
            Err(e) => {
                println!("{}", e);
                return Ok(Flow::Continue);
            }
        };

        match command {
            Command::Submit(prompt) => {
                self.form.set_prompt(prompt);
                match self.session.submit(&self.form) {
                    Ok(message) => {
                        if let Err(e) = connection.send(&message).await {
                            println!("Send failed: {}", e);
                        } else {
                            let progress = self.session.progress();
                            println!("{}", status_line(progress.as_ref(), BAR_WIDTH));
                        }
                    }
                    Err(rejection) => println!("Cannot generate: {}", rejection),
                }
            }
            Command::Negative(text) => self.form.set_negative(text),
            Command::Width(width) => {
                self.form.set_width(width);
                println!("width: {}", self.form.width());
            }
            Command::Height(height) => {
                self.form.set_height(height);
                println!("height: {}", self.form.height());
            }
            Command::Steps(steps) => {
                self.form.set_steps(steps);
                println!("steps: {}", self.form.steps());
            }
            Command::Guidance(guidance) => match self.form.set_guidance(guidance) {
                Ok(()) => println!("guidance: {:.1}", self.form.guidance()),
                Err(e) => println!("{}", e),
            },
            Command::Seed(seed) => self.form.set_seed(seed),
            Command::LockSeed => {
                self.form.lock_seed();
                println!("seed: {}", self.form.seed());
            }
            Command::RandomSeed => {
                self.form.randomize_seed();
                println!("seed: {}", self.form.seed());
            }
            Command::Image(path) => match self.form.load_reference(&path).await {
                Ok(()) => println!("Reference image: {}", path.display()),
                Err(e) => println!("Cannot use {}: {}", path.display(), e),
            },
            Command::ClearImage => self.form.clear_reference(),
            Command::Strength(strength) => match self.form.set_strength(strength) {
                Ok(()) => println!("strength: {:.2}", self.form.strength()),
                Err(e) => println!("{}", e),
            },
            Command::Stop => self.stop(connection).await,
            Command::Show => println!("{}", self.form),
            Command::Help => println!("{}", HELP),
            Command::Quit => return Ok(Flow::Quit),
        }

        Ok(Flow::Continue)
    }

    async fn stop(&mut self, connection: &mut Connection) {
        match self.session.cancel() {
            Ok(message) => match connection.send(&message).await {
                Ok(()) => println!("Stopped"),
                Err(e) => println!("Send failed: {}", e),
            },
            Err(rejection) => println!("Cannot stop: {}", rejection),
        }
    }

    /// Print an update. A final image that cannot be saved is reported and
    /// the session carries on.
    async fn report(&mut self, update: SessionUpdate) {
        match update {
            SessionUpdate::Started(progress) | SessionUpdate::Progress(progress) => {
                println!("{}", status_line(Some(&progress), BAR_WIDTH));
            }
            SessionUpdate::ImageReady => {
                if let Err(e) = self.save_image().await {
                    warn!(error = %e, "Could not save image");
                    println!("Could not save image: {}", e);
                }
            }
            SessionUpdate::Cancelled => println!("Cancelled"),
            SessionUpdate::Ready | SessionUpdate::Ignored => {}
        }
    }

    async fn save_image(&mut self) -> Result<PathBuf> {
        let image = self
            .session
            .image()
            .ok_or_else(|| AppError::Internal("No image to save".to_string()))?;
        let path = self.writer.write(image).await?;
        println!("Saved {}", path.display());
        self.saved.push(path.clone());
        Ok(path)
    }
}

fn reason_suffix(reason: Option<&str>) -> String {
    reason.map(|r| format!(": {}", r)).unwrap_or_default()
}
