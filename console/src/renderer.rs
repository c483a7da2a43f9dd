use crate::format::{format_tool_arguments, truncate, DEFAULT_TRUNCATE, PARTIAL_TRUNCATE};
use crate::output::{Console, Tone};
use crate::state::RenderState;
use crate::status::StatusLine;
use forge_core::{EventHandler, SessionEvent, ToolData};
use std::io;
use std::sync::Arc;
use tracing::{debug, warn};

/// How much of the session is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// Every event as an annotated transcript
    Verbose,
    /// A rolling status line plus the final answer
    #[default]
    Terse,
}

impl DisplayMode {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            DisplayMode::Verbose
        } else {
            DisplayMode::Terse
        }
    }
}

/// Turns session events into console output
pub struct EventRenderer {
    mode: DisplayMode,
    console: Arc<Console>,
    state: Arc<RenderState>,
    status: Option<Arc<dyn StatusLine>>,
}

impl EventRenderer {
    pub fn new(mode: DisplayMode, console: Arc<Console>, state: Arc<RenderState>) -> Self {
        Self {
            mode,
            console,
            state,
            status: None,
        }
    }

    /// Status line driven in terse mode
    pub fn with_status(mut self, status: Option<Arc<dyn StatusLine>>) -> Self {
        self.status = status;
        self
    }

    fn verbose(&self) -> bool {
        self.mode == DisplayMode::Verbose
    }

    fn set_status(&self, message: &str) {
        if let Some(status) = &self.status {
            status.update(message);
        }
    }

    fn stop_status(&self) {
        if let Some(status) = &self.status {
            status.stop();
        }
    }

    /// Render one event
    pub fn render(&self, event: &SessionEvent) -> io::Result<()> {
        match event {
            SessionEvent::ToolExecutionStart(data) => self.tool_start(data)?,
            SessionEvent::ToolExecutionComplete(data) => self.tool_complete(data)?,
            SessionEvent::ToolExecutionProgress(data) => {
                if let Some(progress) = data.progress_message.as_deref().filter(|p| !p.is_empty()) {
                    if self.verbose() {
                        self.console.annotation(&format!("  ⏳ {}", progress))?;
                    }
                }
            }
            SessionEvent::ToolExecutionPartialResult(data) => {
                if let Some(partial) = data.partial_output.as_deref().filter(|p| !p.is_empty()) {
                    if self.verbose() {
                        self.console
                            .annotation(&format!("  … partial: {}", truncate(partial, PARTIAL_TRUNCATE)))?;
                    }
                }
            }
            SessionEvent::AssistantMessageDelta { delta_content } => {
                self.state.push_delta(delta_content.as_deref().unwrap_or_default());
            }
            SessionEvent::AssistantMessage { content } => self.message(content.as_deref())?,
            SessionEvent::AssistantTurnStart => {
                if self.verbose() {
                    self.console.panel("Assistant is thinking…", None, None, Tone::Info)?;
                } else {
                    self.set_status("Thinking…");
                }
            }
            SessionEvent::AssistantTurnEnd => {
                if self.verbose() {
                    self.console.panel("Turn complete", None, None, Tone::Info)?;
                }
            }
            SessionEvent::SessionStart => {
                if self.verbose() {
                    self.console.emphasis("Session started", Tone::Success)?;
                }
            }
            SessionEvent::SessionError(data) => {
                let text = data.text();
                if !self.state.record_error(text.clone()) {
                    debug!("Not capturing session error after completion or an earlier error: {}", text);
                }
                // Keep the error readable when a spinner is drawing
                self.stop_status();
                self.console.error("Session error:", &text)?;
            }
            SessionEvent::SessionIdle => {
                self.stop_status();
                self.state.mark_done();
            }
            SessionEvent::Unknown { kind } => {
                debug!("Unhandled event kind: {}", kind);
            }
        }
        Ok(())
    }

    fn tool_start(&self, data: &ToolData) -> io::Result<()> {
        let label = data.label();
        if !self.verbose() {
            self.set_status(&format!("Calling {}…", label));
            return Ok(());
        }

        let arguments = format_tool_arguments(data.arguments.as_ref());
        let body = if arguments.is_empty() {
            "(no arguments)".to_string()
        } else {
            arguments
        };
        self.console
            .panel("⚙  Calling tool:", Some(label.as_str()), Some(body.as_str()), Tone::Tool)
    }

    fn tool_complete(&self, data: &ToolData) -> io::Result<()> {
        let label = data.label();
        if !self.verbose() {
            self.set_status(&format!("✓ {}", label));
            return Ok(());
        }

        let body = match data.result_content().filter(|content| !content.is_empty()) {
            Some(content) => truncate(content, DEFAULT_TRUNCATE),
            None => "(no output)".to_string(),
        };
        self.console
            .panel("✓  Tool complete:", Some(label.as_str()), Some(body.as_str()), Tone::Success)
    }

    /// Flush the streamed fragments, falling back to the event's own content
    fn message(&self, content: Option<&str>) -> io::Result<()> {
        let buffered = self.state.take_message();
        let text = if buffered.is_empty() {
            content.unwrap_or_default().to_string()
        } else {
            buffered
        };
        if text.trim().is_empty() {
            return Ok(());
        }

        self.stop_status();
        self.console.blank()?;
        self.console.markdown(&text)?;
        self.console.blank()
    }
}

impl EventHandler for EventRenderer {
    fn handle(&self, event: &SessionEvent) {
        debug!("Rendering event {}", event.kind());
        if let Err(e) = self.render(event) {
            warn!("Failed to render {} event: {}", event.kind(), e);
        }
    }
}
