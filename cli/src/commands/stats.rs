use super::{run_flow, Flow, SessionArgs};
use anyhow::Result;
use forge_console::Console;
use forge_core::{servers, ClientFactory, SessionConfig};
use std::process::ExitCode;
use std::sync::Arc;

pub const SYSTEM_MESSAGE: &str = concat!(
    "You are a GitHub statistics analyst. ",
    "Your role is to analyze the current repository using the available GitHub MCP tools ",
    "and generate a comprehensive statistics report. ",
    "Focus on: repository activity metrics (stars, forks, watchers), contributor statistics, ",
    "commit frequency, pull request metrics, issue metrics, and code evolution trends. ",
    "Use the GitHub MCP server to pull real data about the repository. ",
    "Present findings in a structured, easy-to-read format with clear sections and data visualizations ",
    "where appropriate."
);

pub const DEFAULT_PROMPT: &str = concat!(
    "Analyze the GitHub statistics for this repository. ",
    "Provide a comprehensive overview with the following sections:\n",
    "1. **Repository Overview**: Basic stats (stars, forks, watchers, language, size)\n",
    "2. **Recent Activity**: Summary of recent commits, PRs, and issues (last 30 days)\n",
    "3. **Contributor Statistics**: Top contributors and their activity patterns\n",
    "4. **Pull Request Metrics**: PR volume, merge time, review patterns\n",
    "5. **Issue Metrics**: Issue creation rate, resolution time, open vs closed\n",
    "6. **Code Evolution**: Language distribution, repository growth trends\n",
    "Use the available GitHub tools to gather real data from the repository."
);

const FLOW: Flow = Flow {
    banner: "Starting GitHub statistics analysis…",
    failure: "Error during GitHub stats analysis",
};

/// Session configuration with the GitHub tool server
pub fn build_session_config(model: &str, github_token: Option<&str>) -> SessionConfig {
    SessionConfig::builder(model)
        .system_message(SYSTEM_MESSAGE)
        .tool_server(servers::GITHUB_SERVER, servers::github(github_token))
        .streaming(true)
        .build()
}

pub async fn run(args: SessionArgs, factory: Arc<dyn ClientFactory>, console: Arc<Console>) -> Result<ExitCode> {
    let config = build_session_config(&args.model, args.github_token.as_deref());
    run_flow(&FLOW, args.request(DEFAULT_PROMPT, config), factory, console).await
}
