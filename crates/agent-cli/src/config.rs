//! Command-line flags and environment-derived settings

use agent_core::{GenerationOptions, SessionConfig};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "calc-agent",
    about = "Tool-calling calculator agent for any OpenAI-compatible LLM",
    version
)]
pub struct Args {
    /// Display tool calls and their results as they happen
    #[arg(long)]
    pub show_thinking: bool,

    /// Print each answer at once instead of word by word
    #[arg(long)]
    pub no_stream: bool,

    /// Completion requests allowed per question
    #[arg(long, default_value_t = agent_core::reasoning::DEFAULT_MAX_ITERATIONS)]
    pub max_iterations: usize,

    /// Use the tools of a remote MCP server instead of the built-in calculator
    #[arg(long, env = "MCP_SERVER_URL")]
    pub mcp_url: Option<String>,

    /// Override LLM_MODEL
    #[arg(long)]
    pub model: Option<String>,

    /// Ask a single question and exit
    #[arg(short, long)]
    pub message: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Session settings for the chosen model
    pub fn session_config(&self, default_model: &str) -> SessionConfig {
        SessionConfig {
            generation: GenerationOptions {
                model: self.model.clone().unwrap_or_else(|| default_model.to_string()),
                ..GenerationOptions::default()
            },
            streaming: !self.no_stream,
            max_iterations: self.max_iterations,
            show_thinking: self.show_thinking,
            stream_delay: agent_core::emission::DEFAULT_STREAM_DELAY,
            system_prompt: None,
        }
    }
}

/// Log filter directive: `RUST_LOG`, then `LOG_LEVEL`, then `info`
pub fn log_filter(rust_log: Option<&str>, log_level: Option<&str>, verbose: bool) -> String {
    if let Some(directive) = rust_log.filter(|d| !d.trim().is_empty()) {
        return directive.to_string();
    }
    if verbose {
        return "debug".into();
    }

    let level = match log_level.map(|l| l.trim().to_ascii_uppercase()).as_deref() {
        Some("DEBUG") => "debug",
        Some("WARNING" | "WARN") => "warn",
        Some("ERROR" | "CRITICAL") => "error",
        Some("TRACE") => "trace",
        _ => "info",
    };
    level.into()
}
