use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tutor_core::{Config, ConversationStore, HttpGateway, StaleReplyPolicy};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;

#[derive(Parser)]
#[command(name = "tutor")]
#[command(version, about = "Chat with the math tutor from your terminal")]
struct Cli {
    /// Chat endpoint (overrides TUTOR_ENDPOINT and the config file)
    #[arg(short, long, global = true)]
    endpoint: Option<String>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive chat (default)
    Chat,
    /// Ask one question and print the tutor's reply
    Ask {
        /// Your question
        question: String,
    },
    /// Check that the tutor server is reachable
    Health,
    /// Show or change the saved configuration
    Config {
        /// Save this chat endpoint
        #[arg(long)]
        set_endpoint: Option<String>,
        /// Save this greeting for new conversations
        #[arg(long)]
        greeting: Option<String>,
        /// What to do with a reply that arrives after the chat was cleared
        #[arg(long, value_enum)]
        stale_replies: Option<StaleReplies>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StaleReplies {
    Append,
    Discard,
}

impl From<StaleReplies> for StaleReplyPolicy {
    fn from(value: StaleReplies) -> Self {
        match value {
            StaleReplies::Append => StaleReplyPolicy::Append,
            StaleReplies::Discard => StaleReplyPolicy::Discard,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Chat);

    if matches!(command, Commands::Chat) {
        logging::init_file(cli.verbose)?;
    } else {
        logging::init_stderr(cli.verbose)?;
    }

    let config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "could not read config, using defaults");
        Config::new()
    });
    let endpoint = config.resolve_endpoint(cli.endpoint.as_deref());

    match command {
        Commands::Chat => run_chat(&config, &endpoint).await,
        Commands::Ask { question } => ask(&config, &endpoint, &question).await,
        Commands::Health => health(&endpoint).await,
        Commands::Config {
            set_endpoint,
            greeting,
            stale_replies,
        } => update_config(config, set_endpoint, greeting, stale_replies),
    }
}

async fn run_chat(config: &Config, endpoint: &str) -> Result<()> {
    info!(%endpoint, "starting chat session");
    let gateway = Arc::new(HttpGateway::new(endpoint));

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();
    let mut app = App::new(gateway.clone(), endpoint, config.session());

    // Probe the server in the background; the header updates when it answers
    let health_tx = events.sender();
    tokio::spawn(async move {
        let health = gateway.health().await.map_err(|e| {
            warn!(error = %e, "health check failed");
            e.to_string()
        });
        let _ = health_tx.send(tui::AppEvent::Health(health));
    });

    let result = event_loop(&mut terminal, &mut events, &mut app).await;
    tui::restore()?;
    result
}

async fn event_loop(
    terminal: &mut tui::Tui,
    events: &mut tui::EventHandler,
    app: &mut App,
) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        tokio::select! {
            event = events.next() => match event {
                Some(event) => handler::handle_event(app, event),
                None => break,
            },
            settled = app.store.settle(), if app.store.is_pending() => {
                if settled {
                    app.on_settled();
                }
            }
        }
    }
    Ok(())
}

async fn ask(config: &Config, endpoint: &str, question: &str) -> Result<()> {
    let gateway = Arc::new(HttpGateway::new(endpoint));
    let mut store = ConversationStore::from_config(gateway, config.session());

    if !store.submit(question) {
        bail!("Question is empty");
    }
    store.settle().await;

    let reply = store
        .history()
        .last()
        .ok_or_else(|| anyhow!("Conversation is empty"))?;
    println!("{}", reply.content);
    Ok(())
}

async fn health(endpoint: &str) -> Result<()> {
    let gateway = HttpGateway::new(endpoint);

    match gateway.health().await {
        Ok(health) => {
            println!("status:        {}", health.status);
            println!("mcp connected: {}", health.mcp_connected);
            println!("tools:         {}", health.tools_count);
            Ok(())
        }
        Err(e) => Err(anyhow!("Tutor server unreachable at {}: {}", endpoint, e)),
    }
}

fn update_config(
    mut config: Config,
    endpoint: Option<String>,
    greeting: Option<String>,
    stale_replies: Option<StaleReplies>,
) -> Result<()> {
    let changed = endpoint.is_some() || greeting.is_some() || stale_replies.is_some();

    if let Some(endpoint) = endpoint {
        config.endpoint = Some(endpoint);
    }
    if let Some(greeting) = greeting {
        config.greeting = Some(greeting);
    }
    if let Some(policy) = stale_replies {
        config.stale_replies = Some(policy.into());
    }

    if changed {
        config.save()?;
        info!(path = %Config::get_config_path()?.display(), "saved config");
    }

    let session = config.session();
    println!("config:        {}", Config::get_config_path()?.display());
    println!("endpoint:      {}", config.resolve_endpoint(None));
    println!("greeting:      {}", session.greeting);
    println!(
        "stale replies: {}",
        match session.stale_replies {
            StaleReplyPolicy::Append => "append",
            StaleReplyPolicy::Discard => "discard",
        }
    );
    Ok(())
}
