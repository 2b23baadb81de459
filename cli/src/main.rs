use anyhow::Result;
use clap::{Parser, Subcommand};
use quip_core::config;
use quip_core::engine::Engine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

mod history;
mod knowledge;
mod onboard;
mod wallpaper;

const REPL_HISTORY_FILE: &str = "repl_history.txt";

#[derive(Parser)]
#[command(name = "quip")]
#[command(about = "quip - A tiny chat companion that runs entirely on your machine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Onboard,
    Chat {
        #[arg(short, long)]
        message: Option<String>,
    },
    #[command(subcommand)]
    Knowledge(knowledge::KnowledgeCommands),
    #[command(subcommand)]
    History(history::HistoryCommands),
    #[command(subcommand)]
    Wallpaper(wallpaper::WallpaperCommands),
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    let command = cli.command.unwrap_or_else(|| {
        if !config::config_exists() {
            Commands::Onboard
        } else {
            Commands::Chat { message: None }
        }
    });

    match command {
        Commands::Onboard => {
            let onboard_config = onboard::run_onboard().map_err(|e| {
                eprintln!("❌ Onboarding failed: {}", e);
                e
            })?;
            config::save_config(&onboard_config)?;
        }
        Commands::Chat { message } => {
            let config = config::load_config()?;
            let mut engine = Engine::open(config)?;

            if let Some(msg) = message {
                let reply = engine.respond(&msg)?;
                println!("{}", reply);
                engine.save_all()?;
            } else {
                if engine.state().config.prefetch_wallpapers {
                    quip_core::wallpaper::prefetch(engine.state().store.dir());
                }

                run_repl(&mut engine)?;
                engine.save_all()?;
            }
        }
        Commands::Knowledge(command) => knowledge::handle_command(command)?,
        Commands::History(command) => history::handle_command(command)?,
        Commands::Wallpaper(command) => wallpaper::handle_command(command).await?,
    }

    Ok(())
}

fn run_repl(engine: &mut Engine) -> Result<()> {
    println!("💬 Quip");
    if engine.state().profile.name.is_none() {
        println!("Tell me your name to get started (Ctrl+D to exit):\n");
    } else {
        println!(
            "Welcome back, {}! Type your message (Ctrl+D to exit):\n",
            engine.state().profile.display_name()
        );
    }

    let history_path = engine.state().store.dir().join(REPL_HISTORY_FILE);

    let mut rl = DefaultEditor::new()?;
    let _ = rl.load_history(&history_path);

    loop {
        match rl.readline("> ") {
            Ok(line) => {
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                match engine.respond(&line) {
                    Ok(reply) => {
                        println!("{}", reply);
                        println!();
                    }
                    Err(e) => {
                        eprintln!("❌ Error: {}", e);
                    }
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("\n👋 Goodbye!");
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    let _ = rl.save_history(&history_path);
    Ok(())
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("QUIP_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
}
