use anyhow::Result;
use clap::Args;
use forge_console::{Console, DisplayMode, DriverError, SessionDriver, SessionRequest};
use forge_core::{ClientFactory, ClientOptions, SessionConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub mod retrospective;
pub mod stats;

pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Flags shared by every session command
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Custom prompt; the command's built-in prompt is used when omitted
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Model to use for the analysis
    #[arg(short, long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// GitHub token for authentication
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Show detailed tool call output
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Give up if the session has not finished after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Copilot CLI executable
    #[arg(long, env = "COPILOT_CLI_PATH")]
    pub cli_path: Option<PathBuf>,
}

impl SessionArgs {
    pub fn client_options(&self) -> ClientOptions {
        let options = ClientOptions::default().with_github_token(self.github_token.clone());
        match &self.cli_path {
            Some(path) => options.with_cli_path(path),
            None => options,
        }
    }

    pub fn request(&self, default_prompt: &str, config: SessionConfig) -> SessionRequest {
        SessionRequest {
            prompt: self.prompt.clone().unwrap_or_else(|| default_prompt.to_string()),
            config,
            client_options: self.client_options(),
            mode: DisplayMode::from_verbose(self.verbose),
            timeout: self.timeout.map(Duration::from_secs),
        }
    }
}

/// Fixed text of one command
pub struct Flow {
    pub banner: &'static str,
    /// Prefix of the failure line, e.g. `Error during retrospective`
    pub failure: &'static str,
}

/// Print the banner, run the session and map the outcome to an exit code.
///
/// Session-reported failures and timeouts exit with 1; client failures
/// propagate as errors.
pub async fn run_flow(
    flow: &Flow,
    request: SessionRequest,
    factory: Arc<dyn ClientFactory>,
    console: Arc<Console>,
) -> Result<ExitCode> {
    console.banner(flow.banner)?;
    info!("Running session with model {}", request.config.model);

    let driver = SessionDriver::new(factory, console.clone());
    match driver.run(request).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e @ (DriverError::Session(_) | DriverError::Timeout(_))) => {
            console.failure(&format!("\n{}: {}", flow.failure, e))?;
            Ok(ExitCode::FAILURE)
        }
        Err(DriverError::Client(e)) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use forge_core::{ClientError, CopilotClient, CopilotSession, EventHandler, SessionEvent};
    use std::sync::Mutex;

    /// Client whose session replays `events` from inside `send`
    struct ScriptedFactory {
        events: Vec<SessionEvent>,
        stopped: Arc<Mutex<bool>>,
    }

    impl ScriptedFactory {
        fn new(events: Vec<SessionEvent>) -> Arc<Self> {
            Arc::new(Self {
                events,
                stopped: Arc::new(Mutex::new(false)),
            })
        }

        fn stopped(&self) -> bool {
            *self.stopped.lock().unwrap()
        }
    }

    impl ClientFactory for ScriptedFactory {
        fn create(&self, _options: ClientOptions) -> Result<Arc<dyn CopilotClient>, ClientError> {
            Ok(Arc::new(ScriptedClient {
                events: self.events.clone(),
                stopped: self.stopped.clone(),
            }))
        }
    }

    struct ScriptedClient {
        events: Vec<SessionEvent>,
        stopped: Arc<Mutex<bool>>,
    }

    #[async_trait]
    impl CopilotClient for ScriptedClient {
        async fn start(&self) -> Result<(), ClientError> {
            Ok(())
        }

        async fn create_session(&self, _config: &SessionConfig) -> Result<Arc<dyn CopilotSession>, ClientError> {
            Ok(Arc::new(ScriptedSession {
                events: self.events.clone(),
                handlers: Mutex::new(Vec::new()),
            }))
        }

        async fn stop(&self) -> Result<(), ClientError> {
            *self.stopped.lock().unwrap() = true;
            Ok(())
        }
    }

    struct ScriptedSession {
        events: Vec<SessionEvent>,
        handlers: Mutex<Vec<Arc<dyn EventHandler>>>,
    }

    #[async_trait]
    impl CopilotSession for ScriptedSession {
        fn id(&self) -> &str {
            "scripted"
        }

        fn on(&self, handler: Arc<dyn EventHandler>) {
            self.handlers.lock().unwrap().push(handler);
        }

        async fn send(&self, _prompt: &str) -> Result<(), ClientError> {
            let handlers = self.handlers.lock().unwrap().clone();
            for event in &self.events {
                for handler in &handlers {
                    handler.handle(event);
                }
            }
            Ok(())
        }

        async fn destroy(&self) -> Result<(), ClientError> {
            Ok(())
        }
    }

    struct FailingFactory;

    impl ClientFactory for FailingFactory {
        fn create(&self, _options: ClientOptions) -> Result<Arc<dyn CopilotClient>, ClientError> {
            Err(ClientError::NotStarted)
        }
    }

    fn verbose_args() -> SessionArgs {
        SessionArgs {
            verbose: true,
            ..args()
        }
    }

    fn args() -> SessionArgs {
        SessionArgs {
            prompt: None,
            model: DEFAULT_MODEL.to_string(),
            github_token: None,
            verbose: false,
            timeout: None,
            cli_path: None,
        }
    }

    #[test]
    fn test_request_defaults() {
        let request = args().request("default prompt", SessionConfig::builder(DEFAULT_MODEL).build());
        assert_eq!(request.prompt, "default prompt");
        assert_eq!(request.mode, DisplayMode::Terse);
        assert_eq!(request.timeout, None);
        assert_eq!(request.client_options, ClientOptions::default());
    }

    #[test]
    fn test_request_overrides() {
        let args = SessionArgs {
            prompt: Some("custom".to_string()),
            github_token: Some("tok".to_string()),
            verbose: true,
            timeout: Some(30),
            cli_path: Some(PathBuf::from("/opt/copilot")),
            ..args()
        };
        let request = args.request("default prompt", SessionConfig::builder(DEFAULT_MODEL).build());
        assert_eq!(request.prompt, "custom");
        assert_eq!(request.mode, DisplayMode::Verbose);
        assert_eq!(request.timeout, Some(Duration::from_secs(30)));
        assert_eq!(request.client_options.github_token.as_deref(), Some("tok"));
        assert!(request.client_options.explicit_cli_path);
        assert_eq!(request.client_options.cli_path, PathBuf::from("/opt/copilot"));
    }

    #[tokio::test]
    async fn test_session_error_exits_with_failure() {
        let factory = ScriptedFactory::new(vec![SessionEvent::error("X")]);
        let (console, capture) = Console::buffered();

        let code = stats::run(verbose_args(), factory.clone(), Arc::new(console)).await.unwrap();

        assert_eq!(code, ExitCode::FAILURE);
        assert_eq!(capture.stderr(), "\nError during GitHub stats analysis: X\n");
        assert!(capture.stdout().contains("Starting GitHub statistics analysis…"));
        assert!(factory.stopped());
    }

    #[tokio::test]
    async fn test_timeout_exits_with_failure() {
        let flow = Flow {
            banner: "Starting",
            failure: "Error during retrospective",
        };
        let factory = ScriptedFactory::new(Vec::new());
        let (console, capture) = Console::buffered();
        let request = SessionRequest {
            timeout: Some(Duration::from_millis(50)),
            ..verbose_args().request("prompt", SessionConfig::builder(DEFAULT_MODEL).build())
        };

        let code = run_flow(&flow, request, factory.clone(), Arc::new(console)).await.unwrap();

        assert_eq!(code, ExitCode::FAILURE);
        assert_eq!(
            capture.stderr(),
            "\nError during retrospective: Session did not finish within 50ms\n"
        );
        assert!(factory.stopped());
    }

    #[tokio::test]
    async fn test_idle_exits_with_success() {
        let factory = ScriptedFactory::new(vec![
            SessionEvent::delta("All good"),
            SessionEvent::SessionIdle,
        ]);
        let (console, capture) = Console::buffered();

        let code = retrospective::run(verbose_args(), factory.clone(), Arc::new(console)).await.unwrap();

        assert_eq!(code, ExitCode::SUCCESS);
        assert_eq!(capture.stderr(), "");
        assert!(capture.stdout().contains("Starting retrospective analysis..."));
        assert!(factory.stopped());
    }

    #[tokio::test]
    async fn test_client_failure_propagates() {
        let (console, capture) = Console::buffered();
        let result = stats::run(verbose_args(), Arc::new(FailingFactory), Arc::new(console)).await;

        assert!(result.is_err());
        assert_eq!(capture.stderr(), "");
    }
}
