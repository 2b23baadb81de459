use anyhow::{Context, Result, bail};
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Built-in wallpaper choices.
pub const CATALOG: &[&str] = &[
    "https://images.unsplash.com/photo-1507525428034-b723cf961d3e?auto=format&fit=crop&w=800&q=80",
    "https://images.unsplash.com/photo-1506744038136-46273834b3fb?auto=format&fit=crop&w=800&q=80",
    "https://images.unsplash.com/photo-1470770841072-f978cf4d019e?auto=format&w=800&q=80",
    "https://images.unsplash.com/photo-1493558103817-58b2924bce98?auto=format&fit=crop&w=800&q=80",
    "https://images.unsplash.com/photo-1519125323398-675f0ddb6308?auto=format&fit=crop&w=800&q=80",
];

const WALLPAPER_SUBDIR: &str = "wallpapers";
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);

pub fn wallpaper_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(WALLPAPER_SUBDIR)
}

/// Local cache file for a URL. The name is a digest of the URL so query
/// strings never leak into the filesystem.
pub fn cache_path(data_dir: &Path, url: &str) -> PathBuf {
    let digest = md5::compute(url.as_bytes());
    wallpaper_dir(data_dir).join(format!("{:x}.jpg", digest))
}

// Connect and per-read-gap timeouts rather than a whole-request deadline, so
// a slow but live transfer is never cut off mid-download.
fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(DOWNLOAD_TIMEOUT)
        .read_timeout(DOWNLOAD_TIMEOUT)
        .build()
        .unwrap_or_default()
}

/// Downloads one wallpaper into the cache and returns its local path. A file
/// already in the cache is not fetched again.
pub async fn download(data_dir: &Path, url: &str) -> Result<PathBuf> {
    let target = cache_path(data_dir, url);
    if target.exists() {
        debug!("wallpaper already cached at {}", target.display());
        return Ok(target);
    }

    let dir = wallpaper_dir(data_dir);
    tokio::fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let response = client()
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch {}", url))?;

    if !response.status().is_success() {
        bail!("Wallpaper fetch failed with {} for {}", response.status(), url);
    }

    // Stream into a scratch file first so an interrupted download never
    // passes for a cached wallpaper.
    let partial = target.with_extension("part");
    let mut file = tokio::fs::File::create(&partial)
        .await
        .with_context(|| format!("Failed to create {}", partial.display()))?;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => file.write_all(&bytes).await?,
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e).with_context(|| format!("Failed to stream {}", url));
            }
        }
    }
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&partial, &target)
        .await
        .with_context(|| format!("Failed to move {} into place", partial.display()))?;

    Ok(target)
}

/// Fetches the whole catalog, one task per URL.
pub async fn download_all(data_dir: &Path) -> Vec<(&'static str, Result<PathBuf>)> {
    let mut handles = Vec::new();
    for &url in CATALOG {
        let data_dir = data_dir.to_path_buf();
        handles.push((
            url,
            tokio::spawn(async move { download(&data_dir, url).await }),
        ));
    }

    let mut results = Vec::new();
    for (url, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(anyhow::anyhow!("download task failed: {}", e)),
        };
        results.push((url, result));
    }
    results
}

/// Fire-and-forget catalog prefetch for startup. Failures are logged and
/// otherwise ignored.
pub fn prefetch(data_dir: &Path) {
    let data_dir = data_dir.to_path_buf();
    drop(tokio::spawn(async move {
        for (url, result) in download_all(&data_dir).await {
            if let Err(e) = result {
                warn!("wallpaper prefetch failed for {}: {}", url, e);
            }
        }
    }));
}

/// Resolves a user selection: a number picks from the catalog (1-based), a
/// URL is taken as-is.
pub fn resolve_selection(selection: &str) -> Result<&str> {
    let selection = selection.trim();

    if let Ok(index) = selection.parse::<usize>() {
        if (1..=CATALOG.len()).contains(&index) {
            return Ok(CATALOG[index - 1]);
        }
        bail!("wallpaper number must be between 1 and {}", CATALOG.len());
    }

    if selection.starts_with("http://") || selection.starts_with("https://") {
        return Ok(selection);
    }

    bail!(
        "pick a catalog number (1-{}) or give a full URL",
        CATALOG.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn catalog_has_choices() {
        assert_eq!(CATALOG.len(), 5);
        assert!(CATALOG.iter().all(|url| url.starts_with("https://")));
    }

    #[test]
    fn cache_paths_are_digests_under_the_wallpaper_dir() {
        let data_dir = Path::new("/tmp/data");
        let path = cache_path(data_dir, CATALOG[0]);
        assert!(path.starts_with("/tmp/data/wallpapers"));

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.ends_with(".jpg"));
        assert_eq!(name.len(), 32 + 4);
        assert!(!name.contains('?'));
    }

    #[test]
    fn different_urls_get_different_cache_files() {
        let data_dir = Path::new("/tmp/data");
        assert_ne!(
            cache_path(data_dir, CATALOG[0]),
            cache_path(data_dir, CATALOG[1])
        );
    }

    #[test]
    fn selection_by_number_and_url() {
        assert_eq!(resolve_selection("1").unwrap(), CATALOG[0]);
        assert_eq!(resolve_selection(" 5 ").unwrap(), CATALOG[4]);
        assert_eq!(
            resolve_selection("https://example.com/a.jpg").unwrap(),
            "https://example.com/a.jpg"
        );

        assert!(resolve_selection("0").is_err());
        assert!(resolve_selection("6").is_err());
        assert!(resolve_selection("beach").is_err());
    }

    #[tokio::test]
    async fn cached_file_is_not_fetched_again() {
        let tmp = TempDir::new().unwrap();
        let url = "https://example.invalid/wallpaper.jpg";

        let target = cache_path(tmp.path(), url);
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(&target, b"cached bytes").unwrap();

        // The host does not resolve, so this only succeeds via the cache.
        let path = download(tmp.path(), url).await.unwrap();
        assert_eq!(path, target);
        assert_eq!(std::fs::read(&path).unwrap(), b"cached bytes");
    }
}
