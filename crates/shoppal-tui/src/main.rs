use std::fs::{self, File};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use shoppal_core::{Config, Dispatcher, HttpTransport, Role, SendOutcome, Session};
use tracing_subscriber::EnvFilter;

mod app;
mod export;
mod handler;
mod markdown;
mod tui;
mod ui;

use app::App;
use handler::handle_event;

const LOG_ENV: &str = "SHOPPAL_LOG";

#[derive(Parser)]
#[command(name = "shoppal")]
#[command(version, about = "Chat with a Shop Pal shopping agent from the terminal")]
struct Cli {
    /// Agent endpoint (overrides SHOPPAL_ENDPOINT and the config file)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Don't send the startup greeting
    #[arg(long, global = true)]
    no_greet: bool,

    /// Continue an existing agent session
    #[arg(long, global = true)]
    session: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive chat (default)
    Chat,
    /// Send messages in order and print the agent's replies
    Ask {
        /// Messages to send, one exchange each
        #[arg(required = true)]
        message: Vec<String>,
    },
    /// Write the effective configuration to the config file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(endpoint) = cli.endpoint.clone() {
        config.endpoint = endpoint;
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    if cli.no_greet {
        config.auto_greet = false;
    }

    let session = cli.session.map(Session::with_token).unwrap_or_default();

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => run_chat(config, session).await,
        Commands::Ask { message } => run_ask(config, session, message).await,
        Commands::Init => {
            config.save()?;
            println!("Wrote {}", Config::get_config_path()?.display());
            Ok(())
        }
    }
}

fn log_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// The terminal owns stderr while the chat is open, so log to a file.
fn init_file_logging() -> Result<()> {
    let dir = dirs::cache_dir()
        .context("Could not determine cache directory")?
        .join("shoppal");
    fs::create_dir_all(&dir)?;
    let file = File::create(dir.join("shoppal.log"))?;

    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .init();

    Ok(())
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_transport(config: &Config) -> Result<HttpTransport> {
    HttpTransport::new(&config.endpoint, config.timeout())
        .with_context(|| format!("Could not create HTTP client for {}", config.endpoint))
}

async fn run_chat(config: Config, session: Session) -> Result<()> {
    init_file_logging()?;
    tracing::info!(endpoint = %config.endpoint, "starting chat");

    let transport = Arc::new(build_transport(&config)?);
    let mut app = App::new(&config, transport).with_session(session);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    app.start(config.auto_greet);

    let result: Result<()> = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;

            if let Some(event) = events.next().await {
                handle_event(&mut app, event);
            }
            app.poll_exchange().await;
        }
        Ok(())
    }
    .await;

    tui::restore()?;

    // Don't leave a request running after the window is gone
    if let Some(task) = app.exchange_task.take() {
        task.abort();
    }

    result
}

async fn run_ask(config: Config, session: Session, messages: Vec<String>) -> Result<()> {
    init_stderr_logging();

    let transport = build_transport(&config)?;
    let mut dispatcher = Dispatcher::with_session(session);

    for message in messages {
        let before = dispatcher.transcript().len();

        match dispatcher.send(&transport, message).await {
            SendOutcome::Delivered { .. } => {}
            SendOutcome::Failed(err) => bail!("Exchange with {} failed: {err}", config.endpoint),
            SendOutcome::Rejected => bail!("An exchange is already in flight"),
        }

        let replies = dispatcher.transcript().snapshot()[before..]
            .iter()
            .filter(|turn| turn.role == Role::Bot && turn.is_displayable());
        for turn in replies {
            for line in markdown::plain_text(&markdown::render_lines(&turn.content)) {
                println!("{line}");
            }
            println!();
        }
    }

    if dispatcher.session().is_established() {
        eprintln!("session: {}", dispatcher.session().token());
    }

    Ok(())
}
