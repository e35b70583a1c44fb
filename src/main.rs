use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use crossterm::event::KeyEventKind;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;

mod ai;
mod app;
mod config;
mod db;
mod error;
mod models;
mod newsletter;
mod services;
mod tui;

use app::App;
use config::Config;
use db::Repository;
use error::{AppError, Result};
use newsletter::{city_today, current_newsletter_dates, NewsletterGenerator};
use tui::{draw, handle_key_event};

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Generate {
        community: Option<PathBuf>,
        out: Option<PathBuf>,
    },
    Dates,
    Edit(Option<i64>),
}

fn parse_args(args: &[String]) -> Result<Command> {
    let mut iter = args.iter().skip(1);
    let Some(first) = iter.next() else {
        return Ok(Command::Edit(None));
    };

    match first.as_str() {
        "--generate" => {
            let mut community = None;
            let mut out = None;
            while let Some(flag) = iter.next() {
                let value = iter
                    .next()
                    .ok_or_else(|| AppError::Config(format!("{flag} needs a file path")))?;
                match flag.as_str() {
                    "--community" => community = Some(PathBuf::from(value)),
                    "--out" => out = Some(PathBuf::from(value)),
                    other => return Err(AppError::Config(format!("unknown option: {other}"))),
                }
            }
            Ok(Command::Generate { community, out })
        }
        "--dates" => Ok(Command::Dates),
        "--edit" => match iter.next() {
            Some(id) => id
                .parse()
                .map(|id| Command::Edit(Some(id)))
                .map_err(|_| AppError::Config(format!("invalid draft id: {id}"))),
            None => Ok(Command::Edit(None)),
        },
        other => Err(AppError::Config(format!(
            "unknown option: {other} (expected --generate, --dates or --edit)"
        ))),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let command = parse_args(&args)?;

    // Generation runs are headless, so show progress there; the editor only
    // surfaces warnings and errors.
    let default_level = match command {
        Command::Generate { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load()?;

    match command {
        Command::Dates => {
            let dates = current_newsletter_dates(city_today());
            println!("Current date: {}", dates.current_date);
            println!("Week start:   {}", dates.week_start);
            println!("Week end:     {}", dates.week_end);
            println!("Date range:   {}", dates.date_range);
            Ok(())
        }
        Command::Generate { community, out } => run_generate(&config, community, out).await,
        Command::Edit(draft_id) => run_editor(&config, draft_id).await,
    }
}

async fn run_generate(
    config: &Config,
    community: Option<PathBuf>,
    out: Option<PathBuf>,
) -> Result<()> {
    let community_text = match community {
        Some(path) => Some(
            std::fs::read_to_string(&path)
                .with_context(|| format!("reading community note {}", path.display()))?,
        ),
        None => None,
    };

    let repository = Repository::new(&config.db_path).await?;
    let outcome = match NewsletterGenerator::from_config(config, repository) {
        Ok(generator) => generator.generate(community_text.as_deref()).await,
        Err(e) => Err(e),
    };
    let generated = outcome.inspect_err(|e| tracing::error!("{}", failure_message(e)))?;

    if let Some(path) = out {
        std::fs::write(&path, &generated.draft.html_content)?;
        println!("Wrote HTML to {}", path.display());
    }

    println!("Draft #{} ({})", generated.id, generated.provider);
    println!("Subject:    {}", generated.draft.subject);
    println!("Date range: {}", generated.draft.date_range);
    Ok(())
}

/// Fatal errors mean nothing was attempted or every provider gave up; the
/// rest happened after the model answered.
fn failure_message(e: &AppError) -> String {
    if e.is_fatal() {
        format!("Newsletter not generated: {e}. Check the API keys and provider settings.")
    } else {
        format!("Newsletter generation failed: {e}")
    }
}

async fn run_editor(config: &Config, draft_id: Option<i64>) -> Result<()> {
    let mut app = App::new(config, draft_id).await?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }
    if app.is_dirty() {
        eprintln!("{} unsaved section edits were discarded", app.pending.len());
    }

    Ok(())
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|frame| draw(frame, app))?;

        // Poll for completed section rewrites
        app.poll_regeneration_result();

        // Poll for events with timeout to allow async operations
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(action) = handle_key_event(key, app.show_help) {
                        let should_quit = app.handle_action(action).await?;
                        if should_quit {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}
