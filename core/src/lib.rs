pub mod bootstrap;
pub mod client;
pub mod config;
pub mod events;
pub mod servers;

// Re-export main types for convenience
pub use client::{
    ClientError, ClientFactory, ClientOptions, CopilotClient, CopilotSession, StdioClientFactory,
    StdioCopilotClient,
};
pub use config::{SessionConfig, SessionConfigBuilder, SystemMessage, ToolServerSpec};
pub use events::{ErrorData, EventHandler, RawEvent, SessionEvent, ToolData, ToolResult};
