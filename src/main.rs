mod app;
mod config;
mod coordinator;
mod executor;
mod hook;
mod theme;
mod ui;
mod view;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use std::thread::ThreadId;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app::{App, HEADLESS_TIMEOUT};
use config::HarnessConfig;
use coordinator::{ColorSource, HookInstaller};

#[derive(Parser, Debug)]
#[command(name = "hookdemo")]
#[command(version = "0.1.0")]
#[command(about = "Install a runtime hook off the UI thread and watch the result land on screen")]
struct Args {
    /// Config file (defaults to <config dir>/hookdemo/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run N activations without a UI and print the final state as JSON
    #[arg(short, long, value_name = "N")]
    activate: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they stay out of the alternate screen
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = HarnessConfig::load(args.config.as_deref())?;
    let mut app = App::from_config(&config, Handle::current())?;

    if let Some(count) = args.activate {
        return run_headless(&mut app, count).await;
    }

    run_tui(&mut app, config.tick_rate())
}

async fn run_headless<I: HookInstaller, C: ColorSource>(app: &mut App<I, C>, count: u32) -> Result<()> {
    app.run_activations(count, HEADLESS_TIMEOUT).await?;
    let output = app::headless_report(&app.view, count);
    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

/// Remembers the thread that owns the terminal. Worker panics are confined to
/// their worker and must leave the terminal alone.
#[derive(Debug, Clone, Copy)]
struct TerminalOwner(ThreadId);

impl TerminalOwner {
    fn current() -> Self {
        Self(std::thread::current().id())
    }

    fn is_current(&self) -> bool {
        std::thread::current().id() == self.0
    }
}

fn run_tui<I: HookInstaller, C: ColorSource>(app: &mut App<I, C>, tick_rate: Duration) -> Result<()> {
    // Leave the terminal usable if anything panics while it is in raw mode
    let owner = TerminalOwner::current();
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if owner.is_current() {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
        }
        original_hook(info);
    }));

    // Setup terminal
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let result = run_app(&mut terminal, app, tick_rate);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// The interactive context: commits, draws, and input all happen here
fn run_app<I: HookInstaller, C: ColorSource>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<I, C>,
    tick_rate: Duration,
) -> Result<()> {
    loop {
        app.tick();
        terminal.draw(|f| ui::draw(f, &app.view))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
