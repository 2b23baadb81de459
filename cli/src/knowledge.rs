use anyhow::Result;
use console::style;
use quip_core::config;
use quip_core::store::Store;

pub fn handle_command(command: KnowledgeCommands) -> Result<()> {
    let config = config::load_config()?;
    let store = Store::open(&config.data_dir)?;

    match command {
        KnowledgeCommands::List => list(&store),
        KnowledgeCommands::Teach { question, answer } => teach(&store, &question, &answer),
        KnowledgeCommands::Forget { question } => forget(&store, &question),
    }
}

fn list(store: &Store) -> Result<()> {
    let knowledge = store.load_knowledge()?;

    if knowledge.is_empty() {
        println!("{} Nothing learned yet", style("!").yellow());
        println!();
        println!("Teach something:");
        println!("  quip knowledge teach \"question\" \"answer\"");
        return Ok(());
    }

    println!(
        "{} Known answers ({})",
        style("✓").green().bold(),
        knowledge.len()
    );
    println!();

    for (question, answer) in knowledge.iter() {
        println!("  {} → {}", style(question).white().bold(), answer);
    }

    Ok(())
}

fn teach(store: &Store, question: &str, answer: &str) -> Result<()> {
    let mut knowledge = store.load_knowledge()?;

    match knowledge.teach(question, answer) {
        Some(key) => {
            store.save_knowledge(&knowledge)?;
            println!("{} Learned '{}'", style("✓").green().bold(), key);
            Ok(())
        }
        None => anyhow::bail!("both question and answer must be non-empty"),
    }
}

fn forget(store: &Store, question: &str) -> Result<()> {
    let mut knowledge = store.load_knowledge()?;

    match knowledge.forget(question) {
        Some(_) => {
            store.save_knowledge(&knowledge)?;
            println!("{} Forgot '{}'", style("✓").green().bold(), question);
            Ok(())
        }
        None => anyhow::bail!("nothing known about '{}'", question),
    }
}

#[derive(clap::Subcommand, Clone, Debug)]
pub enum KnowledgeCommands {
    List,
    Teach { question: String, answer: String },
    Forget { question: String },
}
