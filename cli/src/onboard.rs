use anyhow::{Context, Result};
use console::style;
use dialoguer::{Input, Select};
use quip_core::config::{self, Config};
use quip_core::store::{KNOWLEDGE_FILE, PROFILE_FILE, Store};
use quip_core::wallpaper::CATALOG;

const BANNER: &str = r"
    -------------------------------------

     ██████╗ ██╗   ██╗██╗██████╗
    ██╔═══██╗██║   ██║██║██╔══██╗
    ██║   ██║██║   ██║██║██████╔╝
    ██║▄▄ ██║██║   ██║██║██╔═══╝
    ╚██████╔╝╚██████╔╝██║██║
     ╚══▀▀═╝  ╚═════╝ ╚═╝╚═╝

    -------------------------------------
";

fn print_step(step: usize, total: usize, title: &str) {
    println!();
    println!(
        "{}",
        style(format!("[{}/{}] {}", step, total, title))
            .cyan()
            .bold()
    );
    println!();
}

fn setup_name() -> Result<Option<String>> {
    let name: String = Input::new()
        .with_prompt("What should I call you? (leave empty to be asked in chat)")
        .allow_empty(true)
        .interact_text()
        .context("Failed to read name")?;

    let name = name.trim().to_string();
    if name.is_empty() {
        Ok(None)
    } else {
        Ok(Some(name))
    }
}

fn setup_wallpaper() -> Result<Option<String>> {
    let mut items: Vec<String> = vec!["Skip for now".to_string()];
    items.extend(
        CATALOG
            .iter()
            .enumerate()
            .map(|(i, url)| format!("Catalog #{}: {}", i + 1, short_url(url))),
    );

    let selection = Select::new()
        .with_prompt("Pick a wallpaper")
        .items(&items)
        .default(0)
        .interact()
        .context("Failed to select wallpaper")?;

    if selection == 0 {
        Ok(None)
    } else {
        Ok(Some(CATALOG[selection - 1].to_string()))
    }
}

fn short_url(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

pub fn run_onboard() -> Result<Config> {
    println!("{}", style(BANNER).cyan().bold());

    println!("  {}", style("Welcome to Quip!").white().bold());
    println!(
        "  {}",
        style("This wizard will set up your companion in under 30 seconds.").dim()
    );
    println!();

    print_step(1, 3, "Your Name");
    let name = setup_name()?;

    print_step(2, 3, "Wallpaper");
    let wallpaper = setup_wallpaper()?;

    let config = Config::default();

    print_step(3, 3, "Data Directory");
    let store = Store::open(&config.data_dir)?;

    let mut profile = store.load_profile()?;
    if let Some(name) = name {
        profile.name = Some(name);
    }
    if let Some(url) = wallpaper {
        profile.wallpaper = Some(url);
    }
    store.save_profile(&profile)?;
    println!(
        "  {} Profile saved to {}",
        style("✓").green(),
        style(config.data_dir.join(PROFILE_FILE).display()).cyan()
    );

    if !config.data_dir.join(KNOWLEDGE_FILE).exists() {
        let knowledge = store.load_knowledge()?;
        store.save_knowledge(&knowledge)?;
        println!(
            "  {} Knowledge base seeded with {} starter answers",
            style("✓").green(),
            knowledge.len()
        );
    } else {
        println!("  {} Existing knowledge base kept", style("✓").green());
    }

    println!();
    println!("  {} Configuration complete!", style("✓").green().bold());
    println!(
        "  {} Config saved to {}",
        style("→").green(),
        style(config::get_config_path().display()).cyan()
    );
    println!();
    println!(
        "  {} You can now run: {}",
        style("→").green(),
        style("quip chat").cyan().bold()
    );
    println!();

    Ok(config)
}
