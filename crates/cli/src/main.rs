use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use genie_agents::IntentOrchestrator;
use genie_core::{classify_intent_rules, extract_json_object, interpret_provider_object, IntentQuery};
use genie_observability::{init_tracing, AppMetrics};
use genie_providers::{ProviderRegistry, ProviderSettings};
use serde_json::json;

#[derive(Debug, Parser)]
#[command(name = "genie")]
#[command(about = "HomeGenie voice gateway CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Keyword classifier only; never leaves the process.
    Classify { text: String },
    /// Full provider cascade using GENIE_* configuration.
    Intent {
        text: String,
        #[arg(long, default_value_t = 0)]
        user_id: i64,
        #[arg(long)]
        context: Option<String>,
        /// Print every provider attempt alongside the response.
        #[arg(long)]
        trace: bool,
    },
    /// Reads raw provider output from stdin and prints the recovered object.
    Normalize,
    /// Lists configured providers in attempt order.
    Providers,
    /// Interactive intent session.
    Chat {
        #[arg(long, default_value_t = 0)]
        user_id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("genie_cli");
    let cli = Cli::parse();

    match cli.command {
        Command::Classify { text } => {
            let classification = classify_intent_rules(&text);
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "response": classification.reply,
                    "intent": classification.result,
                }))?
            );
        }
        Command::Intent {
            text,
            user_id,
            context,
            trace,
        } => {
            let query = IntentQuery::new(text, user_id, context).context("invalid query")?;
            let orchestrator = build_orchestrator()?;
            let resolution = orchestrator.resolve(&query).await;

            if trace {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "resolved_by": resolution.resolved_by,
                        "attempts": resolution.attempts,
                        "result": resolution.response,
                    }))?
                );
            } else {
                println!("{}", serde_json::to_string_pretty(&resolution.response)?);
            }
        }
        Command::Normalize => {
            let mut raw = String::new();
            io::stdin()
                .read_to_string(&mut raw)
                .context("failed reading stdin")?;

            let object = extract_json_object(&raw)?;
            let verdict = interpret_provider_object(&object);
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "object": object,
                    "valid": verdict.is_ok(),
                    "error": verdict.err().map(|err| err.to_string()),
                }))?
            );
        }
        Command::Providers => {
            let settings = ProviderSettings::from_env();
            let registry = ProviderRegistry::from_settings(&settings, http_client()?);
            println!("{}", serde_json::to_string_pretty(&registry.descriptors())?);
        }
        Command::Chat { user_id } => run_chat(build_orchestrator()?, user_id).await?,
    }

    Ok(())
}

async fn run_chat(orchestrator: IntentOrchestrator, user_id: i64) -> Result<()> {
    println!("HomeGenie intent chat. type 'exit' to quit.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }
        let Ok(query) = IntentQuery::new(message, user_id, None) else {
            continue;
        };

        let response = orchestrator.recognize_intent(&query).await;
        println!("\n{}", response.response_text);
        let category = response
            .intent
            .extracted_data
            .as_ref()
            .map(|data| format!(" {}", data.category.as_label()))
            .unwrap_or_default();
        println!(
            "[{}{} {:.2}{}]\n",
            response.intent.intent.as_label(),
            category,
            response.intent.confidence,
            if response.intent.is_emergency {
                " EMERGENCY"
            } else {
                ""
            }
        );
    }

    Ok(())
}

fn build_orchestrator() -> Result<IntentOrchestrator> {
    let settings = ProviderSettings::from_env();
    let registry = ProviderRegistry::from_settings(&settings, http_client()?);

    Ok(
        IntentOrchestrator::new(Arc::new(registry), AppMetrics::shared())
            .with_attempt_timeout(settings.attempt_timeout),
    )
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(6))
        .timeout(Duration::from_secs(20))
        .build()
        .context("failed to build HTTP client")
}
