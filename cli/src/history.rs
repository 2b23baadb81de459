use anyhow::Result;
use console::style;
use quip_core::config;
use quip_core::store::{History, Store};

pub fn handle_command(command: HistoryCommands) -> Result<()> {
    let config = config::load_config()?;
    let store = Store::open(&config.data_dir)?;

    match command {
        HistoryCommands::Show { limit } => show(&store, limit),
        HistoryCommands::Clear => clear(&store),
    }
}

fn show(store: &Store, limit: usize) -> Result<()> {
    let history = store.load_history()?;

    if history.is_empty() {
        println!("{} No saved conversation yet", style("!").yellow());
        println!();
        println!("Chat saves on exit, or say 'save conversation' mid-chat.");
        return Ok(());
    }

    println!(
        "{} Saved exchanges ({} total, showing last {})",
        style("✓").green().bold(),
        history.len(),
        limit.min(history.len())
    );
    println!();

    for exchange in history.tail(limit) {
        if exchange.timestamp.is_empty() {
            println!("  {} {}", style(">").cyan().bold(), exchange.user);
        } else {
            println!(
                "  {} {} {}",
                style(">").cyan().bold(),
                exchange.user,
                style(&exchange.timestamp).dim()
            );
        }
        println!("    {}", exchange.reply);
    }

    Ok(())
}

fn clear(store: &Store) -> Result<()> {
    store.save_history(&History::default())?;
    println!("{} Chat history cleared", style("✓").green().bold());
    Ok(())
}

#[derive(clap::Subcommand, Clone, Debug)]
pub enum HistoryCommands {
    Show {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    Clear,
}
