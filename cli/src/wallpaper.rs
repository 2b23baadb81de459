use anyhow::Result;
use console::style;
use quip_core::config;
use quip_core::store::Store;
use quip_core::wallpaper::{self, CATALOG};

pub async fn handle_command(command: WallpaperCommands) -> Result<()> {
    let config = config::load_config()?;
    let store = Store::open(&config.data_dir)?;

    match command {
        WallpaperCommands::List => list(&store),
        WallpaperCommands::Set { selection } => set(&store, &selection),
        WallpaperCommands::Fetch => fetch(&store).await,
    }
}

fn list(store: &Store) -> Result<()> {
    let profile = store.load_profile()?;

    println!("{} Wallpaper catalog", style("✓").green().bold());
    println!();

    for (i, url) in CATALOG.iter().enumerate() {
        let marker = if profile.wallpaper.as_deref() == Some(*url) {
            style("*").green().bold().to_string()
        } else {
            " ".to_string()
        };
        let cached = if wallpaper::cache_path(store.dir(), url).exists() {
            format!(" {}", style("(cached)").dim())
        } else {
            String::new()
        };
        println!("  {} {}. {}{}", marker, i + 1, url, cached);
    }

    if let Some(url) = profile.wallpaper.as_deref() {
        if !CATALOG.contains(&url) {
            println!();
            println!("  {} custom: {}", style("*").green().bold(), url);
        }
    }

    Ok(())
}

fn set(store: &Store, selection: &str) -> Result<()> {
    let url = wallpaper::resolve_selection(selection)?;

    let mut profile = store.load_profile()?;
    profile.wallpaper = Some(url.to_string());
    store.save_profile(&profile)?;

    println!("{} Wallpaper set to {}", style("✓").green().bold(), url);
    Ok(())
}

async fn fetch(store: &Store) -> Result<()> {
    println!(
        "{} Fetching {} wallpapers...",
        style("→").cyan(),
        CATALOG.len()
    );

    let mut failed = 0;
    for (url, result) in wallpaper::download_all(store.dir()).await {
        match result {
            Ok(path) => println!("  {} {}", style("✓").green(), path.display()),
            Err(e) => {
                failed += 1;
                println!("  {} {}: {}", style("!").yellow(), url, e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} downloads failed", failed, CATALOG.len());
    }

    println!();
    println!("{} All wallpapers cached", style("✓").green().bold());
    Ok(())
}

#[derive(clap::Subcommand, Clone, Debug)]
pub enum WallpaperCommands {
    List,
    Set { selection: String },
    Fetch,
}
