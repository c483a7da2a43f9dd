use super::{run_flow, Flow, SessionArgs};
use anyhow::Result;
use forge_console::Console;
use forge_core::{servers, ClientFactory, SessionConfig};
use std::process::ExitCode;
use std::sync::Arc;

pub const SYSTEM_MESSAGE: &str = concat!(
    "You are a retrospective facilitator for a software development team. ",
    "Your role is to analyze the current repository using the available MCP tools ",
    "(GitHub API, Context7, WorkIQ) and generate a comprehensive team retrospective. ",
    "Focus on: recent activity (commits, PRs, issues), what went well, what could be improved, ",
    "action items, and team collaboration patterns. ",
    "Use the GitHub MCP server to pull real data about the repository. ",
    "Present findings in a structured retrospective format."
);

pub const DEFAULT_PROMPT: &str = concat!(
    "Perform a retrospective for this repository. ",
    "Analyze recent commits, pull requests, issues, and overall project activity. ",
    "Structure the retrospective with these sections:\n",
    "1. **Summary**: Overview of recent activity\n",
    "2. **What Went Well**: Positive highlights from recent work\n",
    "3. **What Could Be Improved**: Areas for improvement\n",
    "4. **Action Items**: Concrete next steps\n",
    "5. **Team Collaboration**: Observations about teamwork and contribution patterns\n",
    "Use the available tools to gather real data from the repository."
);

const FLOW: Flow = Flow {
    banner: "Starting retrospective analysis...",
    failure: "Error during retrospective",
};

/// Session configuration with the GitHub and Context7 tool servers
pub fn build_session_config(model: &str, github_token: Option<&str>) -> SessionConfig {
    SessionConfig::builder(model)
        .system_message(SYSTEM_MESSAGE)
        .tool_server(servers::GITHUB_SERVER, servers::github(github_token))
        .tool_server(servers::CONTEXT7_SERVER, servers::context7())
        .streaming(true)
        .build()
}

pub async fn run(args: SessionArgs, factory: Arc<dyn ClientFactory>, console: Arc<Console>) -> Result<ExitCode> {
    let config = build_session_config(&args.model, args.github_token.as_deref());
    run_flow(&FLOW, args.request(DEFAULT_PROMPT, config), factory, console).await
}
