//! calc-agent
//!
//! Terminal front end: reads configuration from the environment (and `.env`),
//! builds a session around the built-in calculator tools or a remote MCP
//! server, and runs an interactive prompt loop.

mod config;
mod repl;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{AgentProfile, Observer, ObserverSet, Session, TracingObserver};
use agent_runtime::{McpConfig, McpHttpToolProvider, OpenAiCompatProvider, OpenAiConfig};

use crate::config::{Args, log_filter};
use crate::repl::ThinkingPrinter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Logs go to stderr so answers on stdout stay clean
    let filter = log_filter(
        std::env::var("RUST_LOG").ok().as_deref(),
        std::env::var("LOG_LEVEL").ok().as_deref(),
        args.verbose,
    );
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();

    // Initialize LLM provider
    let llm_config = OpenAiConfig::from_env().context("failed to load LLM configuration")?;
    let endpoint = llm_config.base_url.clone();
    let session_config = args.session_config(&llm_config.model);
    let provider = Arc::new(OpenAiCompatProvider::from_config(llm_config)?);

    // Pick the tool source
    let profile = match &args.mcp_url {
        Some(url) => {
            let tools = McpHttpToolProvider::new(McpConfig::new(url))?;
            AgentProfile::new("MCP Agent", Arc::new(tools))
        }
        None => calculator::profile(),
    };

    let mut observers: Vec<Arc<dyn Observer>> = vec![Arc::new(TracingObserver)];
    if args.show_thinking {
        observers.push(Arc::new(ThinkingPrinter));
    }

    let mut session = Session::new(profile, provider, session_config)
        .with_observer(Arc::new(ObserverSet::new(observers)));

    if let Err(e) = session.initialize().await {
        if let Err(cleanup) = session.shutdown().await {
            tracing::warn!(error = %cleanup, "Cleanup after failed initialization");
        }
        return Err(anyhow::Error::new(e).context("failed to initialize agent"));
    }

    tracing::info!(
        agent = %session.profile().name,
        model = %session.config().generation.model,
        endpoint = %endpoint,
        tools = session.descriptors().len(),
        thinking = session.config().show_thinking,
        streaming = session.config().streaming,
        "Agent ready"
    );

    let mut stdout = tokio::io::stdout();
    let outcome = match args.message.as_deref() {
        Some(question) => {
            repl::ask(&mut session, question, CancellationToken::new(), &mut stdout).await
        }
        None => repl::run(&mut session, BufReader::new(tokio::io::stdin()), &mut stdout).await,
    };

    if let Err(e) = session.shutdown().await {
        tracing::warn!(error = %e, "Cleanup failed");
    }

    outcome
}
