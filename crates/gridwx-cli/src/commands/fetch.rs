use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use gridwx_cli::config::GridWxConfig;
use gridwx_io::FeedCache;

pub fn handle(
    config: &GridWxConfig,
    year: i32,
    force: bool,
    cache_dir: Option<&PathBuf>,
) -> Result<()> {
    let root = cache_dir.unwrap_or(&config.paths.cache_root);
    let cache = FeedCache::new(root, config.fetch.clone()).with_force(force);
    info!(year, cache = %cache.root().display(), force, "fetching raw feeds");

    let load_csv = cache.ensure_load_csv(year)?;
    let weather_archive = cache.ensure_weather_archive(year)?;
    println!("Load CSV       : {}", load_csv.display());
    println!("Weather archive: {}", weather_archive.display());
    Ok(())
}
