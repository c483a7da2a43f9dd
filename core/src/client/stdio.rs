use crate::client::rpc::{CloseHandler, NotificationHandler, RpcConnection};
use crate::client::{ClientError, ClientFactory, ClientOptions, CopilotClient, CopilotSession};
use crate::config::SessionConfig;
use crate::events::{EventHandler, SessionEvent};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// Environment variable the CLI is told to read its auth token from
const AUTH_TOKEN_ENV: &str = "COPILOT_SDK_AUTH_TOKEN";

type Handlers = Arc<Mutex<HashMap<String, Vec<Arc<dyn EventHandler>>>>>;

/// Client that launches the Copilot CLI and speaks JSON-RPC over its stdio
pub struct StdioCopilotClient {
    options: ClientOptions,
    running: tokio::sync::Mutex<Option<Running>>,
    handlers: Handlers,
}

struct Running {
    child: Option<Child>,
    connection: Arc<RpcConnection>,
}

impl StdioCopilotClient {
    pub fn new(options: ClientOptions) -> Self {
        Self {
            options,
            running: tokio::sync::Mutex::new(None),
            handlers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.options.cli_path);
        command.args(["--headless", "--stdio", "--log-level", self.options.log_level.as_str()]);

        if let Some(token) = &self.options.github_token {
            command.args(["--auth-token-env", AUTH_TOKEN_ENV]);
            command.env(AUTH_TOKEN_ENV, token);
        }
        if let Some(cwd) = &self.options.cwd {
            command.current_dir(cwd);
        }

        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        command
    }

    /// Wire a connection whose `session.event` notifications reach registered handlers
    fn connect<R, W>(&self, reader: R, writer: W) -> RpcConnection
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let handlers = self.handlers.clone();
        let on_notification: NotificationHandler = Arc::new(move |method: &str, params: Value| {
            if method != "session.event" {
                debug!("Ignoring notification {}", method);
                return;
            }
            route_event(&handlers, params);
        });

        // A hang-up would otherwise leave sessions waiting for an idle that never comes
        let handlers = self.handlers.clone();
        let on_close: CloseHandler = Box::new(move || {
            warn!("Copilot CLI closed the connection");
            broadcast(&handlers, &SessionEvent::error(ClientError::ConnectionClosed.to_string()));
        });
        RpcConnection::new(reader, writer, on_notification, on_close)
    }

    async fn connection(&self) -> Result<Arc<RpcConnection>, ClientError> {
        self.running
            .lock()
            .await
            .as_ref()
            .map(|running| running.connection.clone())
            .ok_or(ClientError::NotStarted)
    }

    #[cfg(test)]
    pub(crate) async fn attach<R, W>(&self, reader: R, writer: W)
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let connection = Arc::new(self.connect(reader, writer));
        *self.running.lock().await = Some(Running { child: None, connection });
    }
}

fn route_event(handlers: &Handlers, params: Value) {
    let Some(session_id) = params.get("sessionId").and_then(Value::as_str) else {
        warn!("session.event without sessionId");
        return;
    };
    let event = SessionEvent::from_value(params.get("event").cloned().unwrap_or(Value::Null));

    // Clone out so handlers never run under the registry lock
    let targets = handlers
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .get(session_id)
        .cloned()
        .unwrap_or_default();

    debug!("Session {} event {} -> {} handler(s)", session_id, event.kind(), targets.len());
    for handler in targets {
        handler.handle(&event);
    }
}

/// Deliver `event` to the handlers of every live session
fn broadcast(handlers: &Handlers, event: &SessionEvent) {
    let targets: Vec<Arc<dyn EventHandler>> = handlers
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .values()
        .flatten()
        .cloned()
        .collect();
    for handler in targets {
        handler.handle(event);
    }
}

#[async_trait]
impl CopilotClient for StdioCopilotClient {
    async fn start(&self) -> Result<(), ClientError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Ok(());
        }

        info!("Launching Copilot CLI: {}", self.options.cli_path.display());
        let mut child = self
            .command()
            .spawn()
            .map_err(|e| ClientError::Launch(format!("{}: {}", self.options.cli_path.display(), e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ClientError::Launch("Failed to get stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ClientError::Launch("Failed to get stdout".to_string()))?;

        let connection = Arc::new(self.connect(stdout, stdin));
        connection.request("ping", json!({})).await?;

        *running = Some(Running {
            child: Some(child),
            connection,
        });
        Ok(())
    }

    async fn create_session(&self, config: &SessionConfig) -> Result<Arc<dyn CopilotSession>, ClientError> {
        let connection = self.connection().await?;
        let result = connection
            .request("session.create", serde_json::to_value(config)?)
            .await?;

        let id = result
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::Protocol("session.create returned no sessionId".to_string()))?
            .to_string();

        info!("Created session {} with model {}", id, config.model);
        self.handlers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id.clone(), Vec::new());

        Ok(Arc::new(StdioSession {
            id,
            connection,
            handlers: self.handlers.clone(),
        }))
    }

    async fn stop(&self) -> Result<(), ClientError> {
        let Some(mut running) = self.running.lock().await.take() else {
            return Ok(());
        };

        let live: Vec<String> = self
            .handlers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .drain()
            .map(|(id, _)| id)
            .collect();
        for id in live {
            if let Err(e) = running
                .connection
                .request("session.destroy", json!({ "sessionId": id }))
                .await
            {
                warn!("Failed to destroy session {} during shutdown: {}", id, e);
            }
        }

        running.connection.close();
        if let Some(child) = running.child.as_mut() {
            if let Err(e) = child.kill().await {
                warn!("Failed to kill Copilot CLI: {}", e);
            }
        }
        info!("Copilot CLI stopped");
        Ok(())
    }
}

/// Session handle returned by [`StdioCopilotClient`]
pub struct StdioSession {
    id: String,
    connection: Arc<RpcConnection>,
    handlers: Handlers,
}

#[async_trait]
impl CopilotSession for StdioSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn on(&self, handler: Arc<dyn EventHandler>) {
        self.handlers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(self.id.clone())
            .or_default()
            .push(handler);
    }

    async fn send(&self, prompt: &str) -> Result<(), ClientError> {
        self.connection
            .request("session.send", json!({ "sessionId": self.id, "prompt": prompt }))
            .await?;
        Ok(())
    }

    async fn destroy(&self) -> Result<(), ClientError> {
        self.handlers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.id);
        self.connection
            .request("session.destroy", json!({ "sessionId": self.id }))
            .await?;
        Ok(())
    }
}

/// Factory producing [`StdioCopilotClient`]s
#[derive(Debug, Default, Clone)]
pub struct StdioClientFactory;

impl ClientFactory for StdioClientFactory {
    fn create(&self, options: ClientOptions) -> Result<Arc<dyn CopilotClient>, ClientError> {
        Ok(Arc::new(StdioCopilotClient::new(options)))
    }
}
