use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declarative configuration for one Copilot session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub model: String,
    pub system_message: SystemMessage,
    #[serde(rename = "mcpServers")]
    pub tool_servers: BTreeMap<String, ToolServerSpec>,
    pub streaming: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemMessage {
    pub content: String,
}

/// Declaration of an external MCP tool server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolServerSpec {
    /// A process launched by the runtime and spoken to over stdio
    Local {
        command: String,
        args: Vec<String>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        env: BTreeMap<String, String>,
        #[serde(default = "all_tools")]
        tools: Vec<String>,
    },
    /// A server already reachable over HTTP
    Http {
        url: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        headers: BTreeMap<String, String>,
        #[serde(default = "all_tools")]
        tools: Vec<String>,
    },
}

fn all_tools() -> Vec<String> {
    vec!["*".to_string()]
}

impl ToolServerSpec {
    /// Local process server exposing all of its tools
    pub fn local<I, S>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ToolServerSpec::Local {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            env: BTreeMap::new(),
            tools: all_tools(),
        }
    }

    /// HTTP server exposing all of its tools
    pub fn http(url: impl Into<String>) -> Self {
        ToolServerSpec::Http {
            url: url.into(),
            headers: BTreeMap::new(),
            tools: all_tools(),
        }
    }

    /// Add an environment override (local) or header (http)
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        match &mut self {
            ToolServerSpec::Local { env, .. } => {
                env.insert(key.into(), value.into());
            }
            ToolServerSpec::Http { headers, .. } => {
                headers.insert(key.into(), value.into());
            }
        }
        self
    }

    /// Environment overrides of a local server
    pub fn env(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            ToolServerSpec::Local { env, .. } => Some(env),
            ToolServerSpec::Http { .. } => None,
        }
    }
}

impl SessionConfig {
    pub fn builder(model: impl Into<String>) -> SessionConfigBuilder {
        SessionConfigBuilder {
            model: model.into(),
            system_message: String::new(),
            tool_servers: BTreeMap::new(),
            streaming: true,
        }
    }
}

/// Builder for [`SessionConfig`]. Streaming is on unless disabled.
#[derive(Debug, Clone)]
pub struct SessionConfigBuilder {
    model: String,
    system_message: String,
    tool_servers: BTreeMap<String, ToolServerSpec>,
    streaming: bool,
}

impl SessionConfigBuilder {
    pub fn system_message(mut self, content: impl Into<String>) -> Self {
        self.system_message = content.into();
        self
    }

    pub fn tool_server(mut self, name: impl Into<String>, spec: ToolServerSpec) -> Self {
        self.tool_servers.insert(name.into(), spec);
        self
    }

    pub fn tool_servers(mut self, servers: BTreeMap<String, ToolServerSpec>) -> Self {
        self.tool_servers.extend(servers);
        self
    }

    pub fn streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn build(self) -> SessionConfig {
        SessionConfig {
            model: self.model,
            system_message: SystemMessage {
                content: self.system_message,
            },
            tool_servers: self.tool_servers,
            streaming: self.streaming,
        }
    }
}
