//! Bartender — operator console.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  stdin console ──▶ AppCommand ──▶ Controller ──▶ LogEventSink│
//! │                                      │                       │
//! │                    JsonConfigFile ───┤                       │
//! │                                      ▼                       │
//! │            cdev GpioBank (rpi)  or  SimulatedBackend         │
//! │                                      ▲                       │
//! │                           LevelMonitor (2 s scan)            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads one command per line until `quit` or end of input, then runs the
//! teardown so no relay is left energized.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};

use bartender::adapters::config_file::JsonConfigFile;
use bartender::adapters::log_sink::LogEventSink;
use bartender::app::commands::{AppCommand, CommandReply};
use bartender::app::ports::ConfigError;
use bartender::drivers::registry::BackendChoice;
use bartender::recipe::RecipeBook;
use bartender::Controller;

/// Pump, valve and float-switch controller for the bartender.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// JSON configuration file (defaults apply when it is missing)
    #[arg(short, long, default_value = "bartender.json")]
    config: PathBuf,

    /// JSON recipe file for the `drink` command
    #[arg(short, long, default_value = "recipes.json")]
    recipes: PathBuf,

    /// Run without touching GPIO
    #[arg(short, long)]
    simulate: bool,

    /// Do not start the background level monitor
    #[arg(long)]
    no_monitor: bool,
}

const HELP: &str = "\
commands:
  pour <reservoir> <ml>            pour from one reservoir
  refill <reservoir>               refill in the background
  drink <name>                     dispense a recipe from the recipe file
  dispense <name> <r>=<ml>...      dispense an ad-hoc drink
  valve <id> open|close            manual valve override
  pump <id> on|off                 manual pump override
  test pump|valve <id> [ms]        timed test actuation
  stop pump|valve <id>             end a test actuation
  status | recipes | help | quit";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    info!("Bartender v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Configuration ──────────────────────────────────────────
    let config_file = JsonConfigFile::new(&cli.config);
    let config = config_file
        .load_or_default()
        .with_context(|| format!("loading {}", config_file.path().display()))?;

    let recipes = match RecipeBook::load(&cli.recipes) {
        Ok(book) => book,
        Err(ConfigError::NotFound) => {
            info!("No recipe file at {}", cli.recipes.display());
            RecipeBook::default()
        }
        Err(e) => {
            warn!("Recipe file {} unusable ({}), continuing without", cli.recipes.display(), e);
            RecipeBook::default()
        }
    };

    // ── 2. Controller ─────────────────────────────────────────────
    let controller = Controller::builder(config)
        .backend(backend_choice(cli.simulate))
        .sink(Arc::new(LogEventSink::new()))
        .level_monitor(!cli.no_monitor)
        .start()
        .context("starting controller")?;

    // ── 3. Console ────────────────────────────────────────────────
    let result = console(&controller, &recipes);

    // ── 4. Teardown (always) ──────────────────────────────────────
    controller.shutdown();
    result
}

fn backend_choice(simulate: bool) -> BackendChoice {
    if simulate {
        return BackendChoice::Simulated;
    }
    #[cfg(feature = "rpi")]
    {
        BackendChoice::live(bartender::adapters::cdev::open)
    }
    #[cfg(not(feature = "rpi"))]
    {
        warn!("Built without the `rpi` feature; running in simulation mode");
        BackendChoice::Simulated
    }
}

fn console(controller: &Controller, recipes: &RecipeBook) -> Result<()> {
    let stdin = io::stdin();
    let mut out = io::stdout();
    writeln!(out, "{}", HELP)?;

    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut words = line.split_whitespace();
        let cmd = match words.next().unwrap_or_default() {
            "quit" | "exit" => break,
            "help" => {
                writeln!(out, "{}", HELP)?;
                continue;
            }
            "recipes" => {
                for name in recipes.names() {
                    writeln!(out, "  {}", name)?;
                }
                continue;
            }
            "drink" => {
                let name = words.collect::<Vec<_>>().join(" ");
                match recipes.get(&name) {
                    Some(recipe) => AppCommand::Dispense(recipe.clone()),
                    None => {
                        writeln!(out, "unknown drink: {}", name)?;
                        continue;
                    }
                }
            }
            _ => match line.parse::<AppCommand>() {
                Ok(cmd) => cmd,
                Err(e) => {
                    writeln!(out, "{}", e)?;
                    continue;
                }
            },
        };

        match controller.handle_command(cmd) {
            Ok(reply) => print_reply(&mut out, &reply)?,
            Err(e) => {
                error!("Command failed: {}", e);
                writeln!(out, "error: {}", e)?;
            }
        }
    }
    Ok(())
}

fn print_reply(out: &mut impl Write, reply: &CommandReply) -> Result<()> {
    match reply {
        CommandReply::Level(ml) => writeln!(out, "level: {:.1} mL", ml)?,
        CommandReply::Accepted => writeln!(out, "started")?,
        CommandReply::Done => writeln!(out, "ok")?,
        CommandReply::TestStarted { duration_ms } => writeln!(out, "testing for {} ms", duration_ms)?,
        CommandReply::Status(status) => writeln!(out, "{}", serde_json::to_string_pretty(status)?)?,
    }
    Ok(())
}
