//! Download-and-cache for the two raw feeds.
//!
//! Files land under the cache root as `CARGA_ENERGIA_{year}.csv` and
//! `inmet/INMET_{year}.zip`. An existing file is reused unless the cache is
//! forced.

use std::fs::{self, File};
use std::io::{copy, Read};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use gridwx_core::{Feed, FetchConfig, GridWxError, GridWxResult};

#[derive(Debug, Clone)]
pub struct FeedCache {
    root: PathBuf,
    fetch: FetchConfig,
    force: bool,
}

impl FeedCache {
    pub fn new(root: impl Into<PathBuf>, fetch: FetchConfig) -> Self {
        Self {
            root: root.into(),
            fetch,
            force: false,
        }
    }

    /// Re-download even when a cached copy exists.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn load_csv_path(&self, year: i32) -> PathBuf {
        self.root.join(format!("CARGA_ENERGIA_{year}.csv"))
    }

    pub fn weather_archive_path(&self, year: i32) -> PathBuf {
        self.root.join("inmet").join(format!("INMET_{year}.zip"))
    }

    /// Cached load CSV for `year`, downloading it first if needed.
    pub fn ensure_load_csv(&self, year: i32) -> GridWxResult<PathBuf> {
        let url = self.fetch.load_url_for(year);
        self.ensure(year, Feed::Load, &url, self.load_csv_path(year))
    }

    /// Cached weather archive for `year`, downloading it first if needed.
    pub fn ensure_weather_archive(&self, year: i32) -> GridWxResult<PathBuf> {
        let url = self.fetch.weather_url_for(year);
        self.ensure(year, Feed::Weather, &url, self.weather_archive_path(year))
    }

    fn ensure(&self, year: i32, feed: Feed, url: &str, dest: PathBuf) -> GridWxResult<PathBuf> {
        if dest.exists() && !self.force {
            info!(%feed, year, path = %dest.display(), "using cached feed");
            return Ok(dest);
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        info!(%feed, year, url, "downloading feed");
        download_with_retry(&self.fetch, url, &dest).map_err(|err| GridWxError::Fetch {
            year,
            feed,
            url: url.to_string(),
            message: format!("{err:#}"),
        })?;
        Ok(dest)
    }
}

/// Retry with exponential backoff; the last error is returned once
/// `fetch.retries` extra attempts are spent.
fn download_with_retry(fetch: &FetchConfig, url: &str, dest: &Path) -> Result<()> {
    let agent = ureq::AgentBuilder::new()
        .timeout(Duration::from_secs(fetch.timeout_secs))
        .build();

    let mut attempt = 0;
    loop {
        match download_to_path(&agent, url, dest) {
            Ok(()) => return Ok(()),
            Err(err) if attempt < fetch.retries => {
                let delay = fetch.backoff_ms.saturating_mul(1u64 << attempt.min(16));
                warn!(
                    url,
                    attempt = attempt + 1,
                    delay_ms = delay,
                    "download failed, retrying: {err:#}"
                );
                thread::sleep(Duration::from_millis(delay));
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Stream `url` into a `.part` file next to `dest`, then rename into place.
fn download_to_path(agent: &ureq::Agent, url: &str, dest: &Path) -> Result<()> {
    let response = agent
        .get(url)
        .call()
        .with_context(|| format!("requesting {url}"))?;
    if response.status() >= 400 {
        bail!("HTTP {}", response.status());
    }

    save_stream(&mut response.into_reader(), dest)
}

/// Write `reader` to a `.part` file next to `dest` and rename it into place.
/// The `.part` file is removed when either step fails.
fn save_stream(reader: &mut impl Read, dest: &Path) -> Result<()> {
    let partial = dest.with_extension("part");
    let result = write_partial(reader, &partial, dest);
    if result.is_err() {
        let _ = fs::remove_file(&partial);
    }
    result
}

fn write_partial(reader: &mut impl Read, partial: &Path, dest: &Path) -> Result<()> {
    let mut file = File::create(partial)
        .with_context(|| format!("creating download target {}", partial.display()))?;
    copy(reader, &mut file).with_context(|| format!("writing feed to {}", partial.display()))?;
    drop(file);
    fs::rename(partial, dest).with_context(|| format!("moving {} into place", dest.display()))?;
    Ok(())
}
