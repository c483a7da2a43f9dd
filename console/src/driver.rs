use crate::output::Console;
use crate::renderer::{DisplayMode, EventRenderer};
use crate::state::RenderState;
use crate::status::{SpinnerStatus, StatusLine};
use forge_core::bootstrap::ensure_executable;
use forge_core::{ClientError, ClientFactory, ClientOptions, CopilotClient, SessionConfig};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Everything one run needs
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub prompt: String,
    pub config: SessionConfig,
    pub client_options: ClientOptions,
    pub mode: DisplayMode,
    /// Upper bound on the wait for the session to finish
    pub timeout: Option<Duration>,
}

/// Why a run failed
#[derive(Error, Debug)]
pub enum DriverError {
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Error reported by the session itself
    #[error("{0}")]
    Session(String),

    #[error("Session did not finish within {0:?}")]
    Timeout(Duration),
}

/// Runs one session from prompt to completion
pub struct SessionDriver {
    factory: Arc<dyn ClientFactory>,
    console: Arc<Console>,
    status: Option<Arc<dyn StatusLine>>,
}

impl SessionDriver {
    pub fn new(factory: Arc<dyn ClientFactory>, console: Arc<Console>) -> Self {
        Self {
            factory,
            console,
            status: None,
        }
    }

    /// Replace the spinner used in terse mode
    pub fn with_status(mut self, status: Arc<dyn StatusLine>) -> Self {
        self.status = Some(status);
        self
    }

    /// Run the session; the client is stopped whatever happens.
    pub async fn run(&self, request: SessionRequest) -> Result<(), DriverError> {
        if request.client_options.explicit_cli_path {
            if let Err(e) = ensure_executable(&request.client_options.cli_path) {
                warn!(
                    "Could not make {} executable: {}",
                    request.client_options.cli_path.display(),
                    e
                );
            }
        }

        let client = self.factory.create(request.client_options.clone())?;
        let result = self.drive(client.as_ref(), &request).await;

        match client.stop().await {
            Ok(()) => result,
            Err(stop_error) => match result {
                Ok(()) => Err(stop_error.into()),
                Err(e) => {
                    warn!("Failed to stop client after error: {}", stop_error);
                    Err(e)
                }
            },
        }
    }

    async fn drive(&self, client: &dyn CopilotClient, request: &SessionRequest) -> Result<(), DriverError> {
        client.start().await?;
        let session = client.create_session(&request.config).await?;
        info!("Session {} created", session.id());

        let state = Arc::new(RenderState::new());
        let status = match request.mode {
            DisplayMode::Terse => {
                let status = self
                    .status
                    .clone()
                    .unwrap_or_else(|| Arc::new(SpinnerStatus::new()) as Arc<dyn StatusLine>);
                status.start("Initialising…");
                Some(status)
            }
            DisplayMode::Verbose => None,
        };

        let renderer = EventRenderer::new(request.mode, self.console.clone(), state.clone())
            .with_status(status.clone());
        session.on(Arc::new(renderer));

        if let Err(e) = session.send(&request.prompt).await {
            if let Some(status) = &status {
                status.stop();
            }
            if let Err(destroy_error) = session.destroy().await {
                warn!("Failed to destroy session after send error: {}", destroy_error);
            }
            return Err(e.into());
        }
        debug!("Prompt sent, waiting for the session to finish");

        let finished = match request.timeout {
            Some(limit) => tokio::time::timeout(limit, state.wait_done()).await.is_ok(),
            None => {
                state.wait_done().await;
                true
            }
        };

        if let Some(status) = &status {
            if status.is_active() {
                status.stop();
            }
        }

        let outcome = match (state.error(), finished, request.timeout) {
            (Some(error), _, _) => Err(DriverError::Session(error)),
            (None, false, Some(limit)) => Err(DriverError::Timeout(limit)),
            _ => Ok(()),
        };
        if let Err(destroy_error) = session.destroy().await {
            if outcome.is_ok() {
                return Err(destroy_error.into());
            }
            warn!("Failed to destroy session: {}", destroy_error);
        }
        outcome
    }
}
