use anyhow::Result;
use clap::Parser;
use crest_core::{AppConfig, HistoryLog, Observer};
use crest_llm::OllamaClient;
use crest_tools::BackgroundTracker;
use crossterm::style::Stylize;

mod builtins;
mod repl;

use repl::Shell;

#[derive(Parser)]
#[command(name = "crest")]
#[command(version)]
#[command(about = "Interactive shell with AI command suggestions from a local inference endpoint", long_about = None)]
struct Cli {
    /// Override the suggestion endpoint URL.
    #[arg(long)]
    endpoint: Option<String>,

    /// Override the model requested from the suggestion endpoint.
    #[arg(long)]
    model: Option<String>,

    /// Do not print the startup banner.
    #[arg(long)]
    no_banner: bool,

    /// Echo session-log lines to stderr.
    #[arg(long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("crest: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let workspace = std::env::current_dir()?;
    let mut config = AppConfig::load(&workspace)?;
    if let Some(endpoint) = cli.endpoint {
        config.suggest.endpoint = endpoint;
    }
    if let Some(model) = cli.model {
        config.suggest.model = model;
    }

    let mut observer = Observer::new(&workspace)?;
    observer.set_verbose(cli.verbose);

    if config.show_banner && !cli.no_banner {
        print_banner(&config.suggest.model);
    }

    let suggester = OllamaClient::new(config.suggest.clone())?;
    let mut shell = Shell {
        config,
        history: HistoryLog::new(),
        observer,
        suggester,
        background: BackgroundTracker::new(),
    };
    repl::run(&mut shell)
}

fn print_banner(model: &str) {
    println!("{}", "========================================".cyan().bold());
    println!("{}", "       Crest Shell, AI assisted         ".cyan().bold());
    println!("{}", "========================================".cyan().bold());
    println!(
        "{}",
        "Press Tab at any point for AI-powered command suggestions.".yellow()
    );
    println!(
        "{}",
        "Type 'help' for the list of built-in commands.".yellow()
    );
    let model_hint = format!("Suggestions need a local inference server with the '{model}' model.");
    println!("{}", model_hint.as_str().yellow());
    println!();
}
