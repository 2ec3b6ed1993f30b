//! Conversation driver for the ordering engine
//!
//! Feeds utterances to one conversation and prints what the engine decided.
//! `PersistOrder` actions are executed against an in-memory ledger.
//!
//! # Usage
//!
//! ```bash
//! # Interactive, one utterance per line
//! comanda_cli chat --menu config/menu.yaml
//!
//! # Scripted
//! printf 'mesa 5, somos 3 pessoas\nquero 2 caipirinhas\nconfirma\n/pago\n' | comanda_cli chat
//!
//! # One-off analysis, no session
//! comanda_cli analyze "quero uma coca e um salmao grelhado" -o json
//! ```
//!
//! Lines starting with `/obs ` set special instructions; `/pago` confirms payment.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;

use comanda::reply::format_order_summary;
use comanda::{
    DialogueGenerator, DueAction, InMemoryOrderLedger, OrderingEngine, ReplyContext, Stage,
    SystemClock, TurnOutcome,
};
use comanda_types::{ConversationKey, Platform};

#[derive(Parser)]
#[command(name = "comanda_cli")]
#[command(version = "0.1.0")]
#[command(about = "Drive the restaurant ordering engine from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Menu catalog YAML
    #[arg(long, global = true, env = "COMANDA_MENU", default_value = "config/menu.yaml")]
    menu: PathBuf,

    /// Engine configuration YAML (built-in defaults when absent)
    #[arg(long, global = true, env = "COMANDA_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', global = true, default_value = "pretty", value_enum)]
    format: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Read utterances from stdin, one per line, for a single conversation
    Chat {
        /// Conversation key
        #[arg(long, default_value = "cli")]
        conversation: String,

        /// Customer name attached to every turn
        #[arg(long)]
        name: Option<String>,
    },

    /// Classify and extract items from one utterance
    Analyze { text: String },

    /// Print the menu grouped by category
    Menu,
}

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match build_engine(&cli) {
        Ok(engine) => match &cli.command {
            Commands::Chat { conversation, name } => {
                cmd_chat(&engine, conversation, name.clone(), cli.format).await
            }
            Commands::Analyze { text } => cmd_analyze(&engine, text, cli.format),
            Commands::Menu => {
                let menu = engine.catalog().list_available_items();
                print!("{}", comanda::reply::format_menu(&menu));
                Ok(())
            }
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.format == OutputFormat::Json {
                println!("{}", serde_json::json!({ "error": e.to_string() }));
            } else {
                eprintln!("{}: {:#}", "error".red().bold(), e);
            }
            ExitCode::FAILURE
        }
    }
}

fn build_engine(cli: &Cli) -> anyhow::Result<OrderingEngine> {
    let engine =
        OrderingEngine::from_files(cli.config.as_deref(), &cli.menu, Arc::new(SystemClock))?;
    Ok(engine)
}

// =============================================================================
// COMMANDS
// =============================================================================

async fn cmd_chat(
    engine: &OrderingEngine,
    conversation: &str,
    name: Option<String>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let key = ConversationKey::new(conversation);
    let customer = comanda_types::CustomerInfo { name, phone: None };
    let ledger = InMemoryOrderLedger::new();
    let generator = CannedReplies;

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let utterance = line.trim();
        if utterance.is_empty() {
            continue;
        }

        if let Some(notes) = utterance.strip_prefix("/obs ") {
            match engine.set_special_instructions(&key, notes) {
                Ok(()) => println!("{} {}", "obs".cyan(), notes),
                Err(e) => eprintln!("{}: {}", "error".red().bold(), e),
            }
            continue;
        }
        if utterance == "/pago" {
            match engine.confirm_payment(&key) {
                Ok(completed) => println!("{} pedido {} pago", "OK".green(), completed.order_id),
                Err(e) => eprintln!("{}: {}", "error".red().bold(), e),
            }
            continue;
        }

        let outcome = engine.process_turn(
            &key,
            Platform::Other("cli".into()),
            utterance,
            Some(&customer),
        );

        let mut persisted = None;
        if outcome.due_actions.contains(&DueAction::PersistOrder) {
            persisted = Some(engine.persist_order(&key, &ledger).await);
        }

        match format {
            OutputFormat::Json => {
                let persisted_json = persisted.as_ref().map(|r| match r {
                    Ok(id) => serde_json::json!({ "order_id": id }),
                    Err(e) => serde_json::json!({ "error": e.to_string() }),
                });
                println!(
                    "{}",
                    serde_json::json!({ "turn": &outcome, "persisted": persisted_json })
                );
            }
            OutputFormat::Pretty => {
                print_outcome(&outcome);
                match &persisted {
                    Some(Ok(id)) => println!("  {} pedido {} registrado", "persist".green(), id),
                    Some(Err(e)) => println!("  {} {}", "persist".red(), e),
                    None => {}
                }
                let stage = engine
                    .session_snapshot(&key)
                    .map(|s| s.stage())
                    .unwrap_or(outcome.stage);
                let mut context = outcome.reply_context.clone();
                context.stage = stage;
                println!("  {} {}", "bot".bold(), generator.generate(&context).await?);
            }
        }
        io::stdout().flush()?;
    }

    Ok(())
}

fn cmd_analyze(engine: &OrderingEngine, text: &str, format: OutputFormat) -> anyhow::Result<()> {
    let menu = engine.catalog().list_available_items();
    let analysis = engine.analyze(text, &menu);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&analysis)?),
        OutputFormat::Pretty => {
            println!("{} {:?}", "intent".bold(), analysis.intent);
            if let Some(table) = analysis.fields.table_number {
                println!("  mesa: {}", table);
            }
            if let Some(party) = analysis.fields.party_size {
                println!("  pessoas: {}", party);
            }
            for item in &analysis.fields.items {
                println!(
                    "  {} {}x {} (strength {:.2})",
                    "item".green(),
                    item.quantity,
                    item.name,
                    item.strength
                );
            }
            for suggestion in &analysis.suggestions {
                println!(
                    "  {} {} ({:.2})",
                    "similar".yellow(),
                    suggestion.item.name,
                    suggestion.similarity
                );
            }
        }
    }
    Ok(())
}

fn print_outcome(outcome: &TurnOutcome) {
    println!("{}", "-".repeat(60));
    println!(
        "{} {:?}  {} {}",
        "intent".bold(),
        outcome.intent,
        "stage".bold(),
        outcome.stage.to_string().cyan()
    );
    for action in &outcome.due_actions {
        println!("  {} {:?}", "action".yellow(), action);
    }
    for line in format_order_summary(&outcome.order).lines() {
        println!("  {}", line.dimmed());
    }
}

// =============================================================================
// REPLIES
// =============================================================================

/// Fixed replies keyed on stage, standing in for a language model
struct CannedReplies;

#[async_trait]
impl DialogueGenerator for CannedReplies {
    async fn generate(&self, context: &ReplyContext) -> anyhow::Result<String> {
        let reply = match context.stage {
            Stage::Greeting => {
                "Olá! Qual o número da mesa e quantas pessoas?".to_string()
            }
            Stage::Ordering => format!("{}. O que mais vai ser?", context.table_context),
            Stage::Confirming => "Registrando seu pedido...".to_string(),
            Stage::Payment => "Pedido registrado! Pagamento via PIX ou com o atendente.".to_string(),
            Stage::Completed => "Pagamento confirmado, obrigado!".to_string(),
        };
        Ok(reply)
    }
}
