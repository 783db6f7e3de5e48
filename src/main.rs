use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use chatguard::config::Config;
use chatguard::moderation::classifier::SafetyClassifier;
use chatguard::moderation::lexical::LexicalFilter;
use chatguard::moderation::openai::OpenAiModeration;
use chatguard::moderation::rules::RuleSet;
use chatguard::output::terminal;

/// Chatguard: a moderated relay in front of a hosted chat model.
///
/// Rate-limits clients, screens messages with lexical rules and a remote
/// moderation service, and streams the model's reply back.
#[derive(Parser)]
#[command(name = "chatguard", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP relay
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "3000")]
        port: u16,

        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
    },

    /// Run a message through moderation without contacting the chat model
    Check {
        /// The message to check
        message: String,

        /// Also ask the remote moderation service
        #[arg(long)]
        classify: bool,
    },

    /// List the active forbidden-pair rules
    Rules,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("chatguard=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Serve { port, bind } => {
            info!(port = port, bind = %bind, "Starting relay");
            chatguard::web::run_server(config, port, &bind).await?;
        }

        Commands::Check { message, classify } => {
            let rules = RuleSet::load(config.rules_path.as_deref())?;
            let filter = LexicalFilter::new(rules);
            let violations = filter.scan(&message);
            terminal::display_lexical_result(&message, &violations);

            if classify {
                config.require_openai()?;
                let provider =
                    OpenAiModeration::from_config(reqwest::Client::new(), &config);
                let classifier = SafetyClassifier::new(Arc::new(provider));
                let result = classifier.classify(&message).await;
                terminal::display_classification(&result);
            }
        }

        Commands::Rules => {
            let rules = RuleSet::load(config.rules_path.as_deref())?;
            terminal::display_rules(&rules);
        }
    }

    Ok(())
}
