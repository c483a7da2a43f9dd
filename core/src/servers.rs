//! Tool-server presets used by the report commands.

use crate::config::ToolServerSpec;

pub const GITHUB_SERVER: &str = "github";
pub const CONTEXT7_SERVER: &str = "context7";

/// Environment variable the GitHub MCP server reads its token from
pub const GITHUB_TOKEN_KEY: &str = "GITHUB_PERSONAL_ACCESS_TOKEN";

/// Environment variable consulted when no token is passed explicitly
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

const LAUNCHER: &str = "npx";

/// GitHub data server. Uses `token` when given, else `$GITHUB_TOKEN`, else an empty string.
pub fn github(token: Option<&str>) -> ToolServerSpec {
    let token = match token {
        Some(token) => token.to_string(),
        None => std::env::var(GITHUB_TOKEN_ENV).unwrap_or_default(),
    };
    ToolServerSpec::local(LAUNCHER, ["-y", "@modelcontextprotocol/server-github"])
        .with_env(GITHUB_TOKEN_KEY, token)
}

/// Context7 documentation lookup server
pub fn context7() -> ToolServerSpec {
    ToolServerSpec::local(LAUNCHER, ["-y", "@upstash/context7-mcp@latest"])
}
