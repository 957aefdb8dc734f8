//! Catalog listing commands

use anyhow::{Context, Result};
use clap::Parser;

use alabanza_core::{MixRepo, SongRepo, StoreConfig};

/// Arguments for the songs command
#[derive(Parser, Debug)]
pub struct SongsArgs {
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the mixes command
#[derive(Parser, Debug)]
pub struct MixesArgs {
    /// Show one mix with its songs resolved
    #[arg(long)]
    pub id: Option<i64>,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub async fn run_songs(args: SongsArgs, config: &StoreConfig) -> Result<()> {
    let (exec, _) = alabanza_core::open(config).await?;
    let songs = SongRepo::new(&exec)
        .list_light()
        .await
        .context("Failed to list songs")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&songs)?);
        return Ok(());
    }
    for song in &songs {
        println!(
            "{:>5}  {:<40}  {:<12}  {}",
            song.id,
            song.name,
            song.tones.join(","),
            song.best
        );
    }
    Ok(())
}

pub async fn run_mixes(args: MixesArgs, config: &StoreConfig) -> Result<()> {
    let (exec, _) = alabanza_core::open(config).await?;
    let repo = MixRepo::new(&exec);

    let Some(id) = args.id else {
        let mixes = repo.list().await.context("Failed to list mixes")?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&mixes)?);
            return Ok(());
        }
        for mix in &mixes {
            println!("{:>5}  {:<40}  {} songs", mix.id, mix.name, mix.songs.len());
        }
        return Ok(());
    };

    let details = repo
        .details(id)
        .await
        .context("Failed to load mix")?
        .with_context(|| format!("mix {id} not found"))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&details)?);
        return Ok(());
    }
    println!("{}", details.mix.name);
    for (n, song) in details.resolved.iter().enumerate() {
        println!("{:>3}. {}  [{}]", n + 1, song.name, song.tones.join(","));
    }
    for name in details.missing() {
        println!("  ?  {name} (not in catalog)");
    }
    Ok(())
}
