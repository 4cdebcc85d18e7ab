use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use sondera_agent::{GraphExecutor, StageContext};
use sondera_core::config::{AppConfig, RunOverrides};
use sondera_core::policy::PolicyStore;
use sondera_core::traits::{GroundedSearch, TextGenerator};
use sondera_core::types::ChatMessage;

#[derive(Parser)]
#[command(name = "sondera", version, about = "Iterative web research agent with cited answers")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "sondera.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Research a question and print the cited answer
    Ask {
        /// The question to research
        #[arg(trailing_var_arg = true, required = true)]
        question: Vec<String>,

        /// Maximum reflection loops for this run
        #[arg(long)]
        max_loops: Option<u32>,

        /// Initial search query count for this run
        #[arg(long)]
        queries: Option<u32>,

        /// Model id for reflection and answer synthesis
        #[arg(long)]
        model: Option<String>,
    },
    /// Show current configuration
    Config,
    /// Manage the policy preamble
    Policy {
        #[command(subcommand)]
        action: PolicyAction,
    },
}

#[derive(Subcommand)]
enum PolicyAction {
    /// Re-read the policy file and print the active preamble
    Reload,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("sondera=info,warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Commands::Config => {
            // Redact the key before printing
            let mut shown = config.clone();
            if shown.model.api_key.is_some() {
                shown.model.api_key = Some("***".to_string());
            }
            println!("{}", toml::to_string_pretty(&shown)?);
            Ok(())
        }
        Commands::Policy {
            action: PolicyAction::Reload,
        } => {
            let store = PolicyStore::new(&config.policy.path);
            println!("{}", store.reload());
            Ok(())
        }
        Commands::Ask {
            question,
            max_loops,
            queries,
            model,
        } => {
            let question = question.join(" ");
            let overrides = RunOverrides {
                initial_search_query_count: queries,
                max_research_loops: max_loops,
                reasoning_model: model,
                query_generator_model: None,
            };

            let backend = Arc::new(sondera_llm::create_backend(config.retry.clone()));
            let generator: Arc<dyn TextGenerator> = backend.clone();
            let search: Arc<dyn GroundedSearch> = backend;
            let policy = Arc::new(PolicyStore::new(&config.policy.path));

            let executor =
                GraphExecutor::new(StageContext::new(generator, search, policy, config));
            let outcome = executor
                .execute(vec![ChatMessage::user(question)], overrides)
                .await?;

            if let Some(answer) = outcome.messages.last() {
                println!("{}", answer.content);
            }

            if !outcome.sources_gathered.is_empty() {
                println!("\nSources:");
                for source in &outcome.sources_gathered {
                    println!("  {} <{}>", source.label, source.value);
                }
            }

            for artifact in &outcome.artifacts {
                println!("\n## {}\n\n{}", artifact.title, artifact.content);
            }
            if let Some(feedback) = &outcome.self_check_feedback {
                println!("\nReview notes:\n{feedback}");
            }

            info!(
                sources = outcome.sources_gathered.len(),
                artifacts = outcome.artifacts.len(),
                "run finished"
            );
            Ok(())
        }
    }
}
