mod config;
mod error;
mod render;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bridge::{Controller, Dispatch, Draft, Invocation};
use clap::{Parser, Subcommand};
use protocol::{GlobalKey, HostCallable, SortOrder, ToolResponse};
use sandbox::{Catalog, SandboxHost};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use error::Result;
use render::render;

const CONFIG_FILE: &str = "stays.toml";

const HELP: &str = "\
commands:
  city <name>      set the draft city
  rating [value]   set the draft minimum rating (blank clears it)
  sort <order>     rating | price
  apply            run the search with the draft
  select <id>      select a stay from the results
  ask <prompt>     send a follow-up message to the conversation
  show             print the current view
  help             show this message
  quit             exit";

#[derive(Parser)]
#[command(name = "stays")]
#[command(about = "Drive the stays widget against a sandbox host", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive widget session
    Repl,
    /// Run one search and print the resulting view
    Search {
        #[arg(long)]
        city: String,
        /// Minimum rating; non-numeric input means no minimum
        #[arg(long, default_value = "")]
        min_rating: String,
        #[arg(long, default_value = "rating")]
        sort: SortOrder,
    },
    /// Search a city, then select one of its stays
    Select {
        #[arg(long)]
        city: String,
        #[arg(long)]
        id: String,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config)?;
    init_tracing(&config.log.filter);

    let host = Arc::new(build_host(&config)?);
    let controller = Arc::new(Controller::mount(Some(host)));

    match cli.command {
        Some(Commands::Repl) | None => cmd_repl(controller).await,
        Some(Commands::Search {
            city,
            min_rating,
            sort,
        }) => cmd_search(&controller, city, min_rating, sort).await,
        Some(Commands::Select { city, id }) => cmd_select(&controller, city, &id).await,
    }
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Build the sandbox host described by `config`.
fn build_host(config: &Config) -> Result<SandboxHost> {
    let catalog = match &config.catalog.path {
        Some(path) => load_catalog(path)?,
        None => Catalog::builtin()?,
    };
    let mut host =
        SandboxHost::new(catalog).with_latency(Duration::from_millis(config.host.latency_ms));

    if let Some(input) = config.tool_input.to_value() {
        host = host.with_global(GlobalKey::ToolInput, input);
    }
    if let Some(theme) = config.host.theme {
        host = host.with_global(GlobalKey::Theme, serde_json::to_value(theme)?);
    }
    if let Some(mode) = config.host.display_mode {
        host = host.with_global(GlobalKey::DisplayMode, serde_json::to_value(mode)?);
    }

    let exposed = [
        (HostCallable::CallTool, config.host.call_tool),
        (HostCallable::SetWidgetState, config.host.set_widget_state),
        (HostCallable::SendFollowUpMessage, config.host.send_follow_up_message),
    ];
    for (callable, enabled) in exposed {
        if !enabled {
            debug!(%callable, "hidden by config");
            host = host.without(callable);
        }
    }
    Ok(host)
}

fn load_catalog(path: &Path) -> Result<Catalog> {
    let catalog = Catalog::load(path)?;
    debug!(path = %path.display(), stays = catalog.len(), "loaded catalog");
    Ok(catalog)
}

async fn cmd_search(
    controller: &Controller<SandboxHost>,
    city: String,
    min_rating: String,
    sort: SortOrder,
) -> Result<()> {
    let draft = Draft {
        city,
        min_rating,
        sort,
    };
    report(controller.apply_search(&draft).await?);
    println!("{}", render(&controller.view()));
    Ok(())
}

async fn cmd_select(controller: &Controller<SandboxHost>, city: String, id: &str) -> Result<()> {
    let draft = Draft {
        city,
        ..Default::default()
    };
    report(controller.apply_search(&draft).await?);
    report(controller.select_item(id).await?);
    println!("{}", render(&controller.view()));
    Ok(())
}

async fn cmd_repl(controller: Arc<Controller<SandboxHost>>) -> Result<()> {
    println!("stays v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'help' for commands, 'quit' or Ctrl+D to exit.\n");
    println!("{}\n", render(&controller.view()));

    // Re-render whenever the host pushes new globals.
    let weak = Arc::downgrade(&controller);
    let _watch = controller.watch(move || {
        if let Some(controller) = weak.upgrade() {
            println!("\n{}\n", render(&controller.view()));
        }
    });

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let input = line.trim();
        let (verb, rest) = input
            .split_once(char::is_whitespace)
            .map_or((input, ""), |(verb, rest)| (verb, rest.trim()));

        match verb {
            "" => continue,
            "quit" | "exit" => break,
            "help" => println!("{HELP}"),
            "show" => println!("{}", render(&controller.view())),
            "city" => {
                let city = rest.to_string();
                controller.edit_draft(|draft| draft.city = city);
            }
            "rating" => {
                let raw = rest.to_string();
                controller.edit_draft(|draft| draft.min_rating = raw);
            }
            "sort" => match rest.parse::<SortOrder>() {
                Ok(sort) => controller.edit_draft(|draft| draft.sort = sort),
                Err(e) => eprintln!("{e}"),
            },
            "apply" => {
                let controller = Arc::clone(&controller);
                tokio::spawn(async move {
                    match controller.apply_draft().await {
                        Ok(outcome) => report(outcome),
                        Err(e) => eprintln!("Error: {e}"),
                    }
                });
            }
            "select" if !rest.is_empty() => {
                let controller = Arc::clone(&controller);
                let id = rest.to_string();
                tokio::spawn(async move {
                    match controller.select_item(id).await {
                        Ok(outcome) => report(outcome),
                        Err(e) => eprintln!("Error: {e}"),
                    }
                });
            }
            "ask" if !rest.is_empty() => {
                let controller = Arc::clone(&controller);
                let prompt = rest.to_string();
                tokio::spawn(async move {
                    match controller.send_follow_up(&prompt).await {
                        Ok(Dispatch::Sent(())) => println!("follow-up sent"),
                        Ok(Dispatch::Skipped) => println!("follow-up unavailable"),
                        Err(e) => eprintln!("Error: {e}"),
                    }
                });
            }
            _ => eprintln!("unknown command: {input} (try 'help')"),
        }
    }

    println!("\nBye.");
    Ok(())
}

/// Print what came back from an invocation.
fn report(outcome: Dispatch<Invocation>) {
    let Some(invocation) = outcome.sent() else {
        println!("search unavailable; state saved locally");
        return;
    };
    match serde_json::from_value::<ToolResponse>(invocation.response) {
        Ok(response) => println!("{}", response.text()),
        Err(e) => warn!(error = %e, "unexpected tool response"),
    }
}
