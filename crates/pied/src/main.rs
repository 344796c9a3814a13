use anyhow::Context;
use clap::{Parser, Subcommand};
use pied::config;
use pied::events::Command;
use pied::gui::app::{AppInit, AppModel};
use pied::gui::menu;
use pied::sys::{runtime, server};
use piemenu::{PieMenu, TokioScheduler};
use relm4::prelude::*;
use std::io::Write;
use std::os::unix::net::UnixStream;

#[derive(Parser, Debug)]
#[command(name = "pied", version, about = "Radial pie menu overlay", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Open the menu at the cursor.
    Show,
    /// Raise the overlay and open the menu once the pointer gesture asks for it.
    Arm,
    /// Hide the menu.
    Hide,
}

impl From<Commands> for Command {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Show => Command::Show,
            Commands::Arm => Command::Arm,
            Commands::Hide => Command::Hide,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Some(command) => send_command(command.into()),
        None => run_daemon(),
    }
}

fn run_daemon() -> anyhow::Result<()> {
    let config = config::load_or_setup();

    let (tx, rx) = async_channel::bounded(32);

    // Start Background Services
    let handle = runtime::start_background_services(tx).context("Failed to start tokio runtime")?;
    let (scheduler, timers) = TokioScheduler::new(handle);

    let mut pie = PieMenu::new(menu::root_node(&config), config.policy.clone(), scheduler);
    menu::populate(&mut pie, &config).context("Failed to build menu from config")?;

    let app = RelmApp::new("org.pied.pied");
    app.run::<AppModel>(AppInit {
        menu: pie,
        theme_colors: config.theme_colors,
        events: rx,
        timers,
    });
    Ok(())
}

fn send_command(command: Command) -> anyhow::Result<()> {
    let path = server::socket_path();
    let mut stream = UnixStream::connect(&path).map_err(|e| {
        anyhow::anyhow!(
            "Failed to connect to pied daemon at {}: {}. Is pied running?",
            path.display(),
            e
        )
    })?;

    writeln!(stream, "{}", command)?;
    Ok(())
}
