//! `llm-compare`: stream one prompt to several models and compare them.

mod config;
mod render;

use std::error::Error;
use std::io::Write as _;

use clap::{Parser, Subcommand};
use compare_core::prelude::*;
use compare_core::{AggregatePhase, Transition, init_observability};

#[derive(Parser)]
#[command(name = "llm-compare")]
#[command(about = "Compare LLM responses side by side over a streaming API")]
#[command(version)]
struct Cli {
    /// API base URL (overrides COMPARE_API_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the models the server can stream from
    Models,

    /// Submit a prompt and stream every selected model's answer
    Run {
        /// Prompt text
        prompt: String,

        /// Model key to compare (repeatable)
        #[arg(short, long = "model")]
        models: Vec<String>,

        /// Compare every model in the catalog
        #[arg(long, conflicts_with = "models")]
        all: bool,

        /// Hide live tokens and print only the final report
        #[arg(short, long)]
        quiet: bool,
    },

    /// List previously submitted prompts
    History,

    /// Show a stored prompt with its responses and statistics
    Show {
        /// Prompt id
        id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    config::init();
    init_observability();

    let cli = Cli::parse();
    let api = ApiClient::new(config::client_config(cli.base_url)?)?;

    match cli.command {
        Commands::Models => {
            let catalog = api.list_models().await?;
            print!("{}", render::catalog(&catalog));
        }
        Commands::Run {
            prompt,
            models,
            all,
            quiet,
        } => {
            let selection = if all {
                api.list_models().await?.select_all()
            } else {
                SelectionSet::new(models)
            };
            run(api, &prompt, selection, quiet).await?;
        }
        Commands::History => {
            let prompts = api.list_prompts().await?;
            print!("{}", render::history(&prompts));
        }
        Commands::Show { id } => {
            let detail = api.prompt_detail(PromptId(id)).await?;
            print!("{}", render::detail(&detail));
        }
    }
    Ok(())
}

async fn run(
    api: ApiClient,
    prompt: &str,
    selection: SelectionSet,
    quiet: bool,
) -> Result<(), Box<dyn Error>> {
    let mut live = Comparison::new(api).start(prompt, selection).await?;
    println!("prompt #{} submitted", live.prompt().id);

    let cancel = live.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() && cancel.cancel() {
            tracing::info!("interrupted; cancelling stream");
        }
    });

    let mut stdout = std::io::stdout();
    let mut current: Option<ModelKey> = None;
    while let Some(update) = live.next_update().await {
        let AggregateUpdate::Model(ModelUpdate {
            model,
            token,
            transition,
            ..
        }) = update
        else {
            continue;
        };
        if quiet {
            continue;
        }
        if let Some(token) = token {
            if current.as_ref() != Some(&model) {
                write!(stdout, "\n[{model}] ")?;
                current = Some(model.clone());
            }
            write!(stdout, "{token}")?;
            stdout.flush()?;
        }
        if transition == Transition::Terminated(ModelStatus::Errored) {
            writeln!(stdout, "\n[{model}] failed")?;
            current = None;
        }
    }
    writeln!(stdout)?;

    match live.aggregator().phase() {
        AggregatePhase::Cancelled => {
            eprintln!("cancelled; partial responses discarded");
            Ok(())
        }
        _ => {
            let report = live.finish().await?;
            print!("{}", render::report(&report));
            Ok(())
        }
    }
}
