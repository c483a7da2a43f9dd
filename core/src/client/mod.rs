use crate::config::SessionConfig;
use crate::events::EventHandler;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

pub mod rpc;
pub mod stdio;

pub use stdio::{StdioClientFactory, StdioCopilotClient};

/// Default executable name of the Copilot CLI
pub const DEFAULT_CLI_PATH: &str = "copilot";

/// A connection to the Copilot runtime
#[async_trait]
pub trait CopilotClient: Send + Sync {
    /// Launch or connect to the runtime
    async fn start(&self) -> Result<(), ClientError>;

    /// Create a session from the given configuration
    async fn create_session(&self, config: &SessionConfig) -> Result<Arc<dyn CopilotSession>, ClientError>;

    /// Shut the runtime down. Safe to call when `start` failed or never ran.
    async fn stop(&self) -> Result<(), ClientError>;
}

/// One conversation with the runtime
#[async_trait]
pub trait CopilotSession: Send + Sync {
    fn id(&self) -> &str;

    /// Register a handler; every subsequent event is delivered to it in emission order
    fn on(&self, handler: Arc<dyn EventHandler>);

    /// Send a user prompt. Returns once the runtime has accepted it.
    async fn send(&self, prompt: &str) -> Result<(), ClientError>;

    async fn destroy(&self) -> Result<(), ClientError>;
}

/// Options used to construct a client
#[derive(Debug, Clone, PartialEq)]
pub struct ClientOptions {
    /// Copilot CLI executable; looked up on `PATH` when bare
    pub cli_path: PathBuf,
    /// Set when the CLI path was given explicitly rather than defaulted
    pub explicit_cli_path: bool,
    pub github_token: Option<String>,
    pub log_level: String,
    pub cwd: Option<PathBuf>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            cli_path: PathBuf::from(DEFAULT_CLI_PATH),
            explicit_cli_path: false,
            github_token: None,
            log_level: "info".to_string(),
            cwd: None,
        }
    }
}

impl ClientOptions {
    pub fn with_github_token(mut self, token: Option<String>) -> Self {
        self.github_token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn with_cli_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cli_path = path.into();
        self.explicit_cli_path = true;
        self
    }
}

/// Builds clients from options
pub trait ClientFactory: Send + Sync {
    fn create(&self, options: ClientOptions) -> Result<Arc<dyn CopilotClient>, ClientError>;
}

/// Errors raised while talking to the runtime
#[derive(Error, Debug, Clone)]
pub enum ClientError {
    #[error("Failed to launch Copilot CLI: {0}")]
    Launch(String),

    #[error("Client is not started")]
    NotStarted,

    #[error("Connection to Copilot CLI closed")]
    ConnectionClosed,

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ClientError {
    fn from(error: std::io::Error) -> Self {
        ClientError::Io(error.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(error: serde_json::Error) -> Self {
        ClientError::Protocol(error.to_string())
    }
}
