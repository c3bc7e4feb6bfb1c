use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use tokio::sync::{mpsc, Semaphore};
use tracing::{info, warn};

const CONCURRENCY: usize = 4;
const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 2000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetch stats returned after completion.
pub struct FetchStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

pub struct FetchedPage {
    pub url: String,
    pub html: Option<String>,
    pub error: Option<String>,
}

/// Read a URL list file: one URL per line, blank lines and `#` comments
/// skipped. The list is configuration, never a compiled-in constant.
pub fn read_url_list(path: &Path) -> Result<Vec<String>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("reading URL list {}", path.display()))?;
    let urls: Vec<String> = data
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(String::from)
        .collect();
    if urls.is_empty() {
        bail!("URL list {} contains no URLs", path.display());
    }
    Ok(urls)
}

/// Fetch pages concurrently, streaming results back as they arrive.
/// One failing URL logs a warning and never aborts the batch.
pub async fn fetch_pages(urls: Vec<String>) -> Result<(Vec<FetchedPage>, FetchStats)> {
    let client = Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("building HTTP client")?;
    let semaphore = Arc::new(Semaphore::new(CONCURRENCY));
    let total = urls.len();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    // Channel: workers send results, main loop collects them unordered
    let (tx, mut rx) = mpsc::channel::<FetchedPage>(CONCURRENCY * 2);

    for url in urls {
        let client = client.clone();
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            let _permit = sem.acquire().await.unwrap();
            let page = fetch_with_retry(&client, &url).await;
            let _ = tx.send(page).await;
        });
    }

    // Drop our copy of tx so rx closes when all spawned tasks finish
    drop(tx);

    let mut pages = Vec::with_capacity(total);
    let mut ok = 0usize;
    let mut errors = 0usize;

    while let Some(page) = rx.recv().await {
        if page.error.is_some() {
            errors += 1;
        } else {
            ok += 1;
        }
        pages.push(page);
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!("Fetched {} pages ({} ok, {} errors)", total, ok, errors);

    Ok((pages, FetchStats { total, ok, errors }))
}

async fn fetch_with_retry(client: &Client, url: &str) -> FetchedPage {
    let mut last_err = String::new();

    for attempt in 0..=MAX_RETRIES {
        match fetch_one(client, url).await {
            Ok(html) => {
                return FetchedPage {
                    url: url.to_string(),
                    html: Some(html),
                    error: None,
                }
            }
            Err(e) => {
                last_err = e.to_string();
                let transient = ["429", "500", "502", "503", "timed out"]
                    .iter()
                    .any(|s| last_err.contains(s));
                if !transient || attempt == MAX_RETRIES {
                    break;
                }
                let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
                warn!(
                    "Transient failure on {} (attempt {}/{}), backing off {:.1}s: {}",
                    url,
                    attempt + 1,
                    MAX_RETRIES,
                    backoff.as_secs_f64(),
                    last_err
                );
                tokio::time::sleep(backoff).await;
            }
        }
    }

    warn!("Failed to retrieve {}: {}", url, last_err);
    FetchedPage {
        url: url.to_string(),
        html: None,
        error: Some(last_err),
    }
}

async fn fetch_one(client: &Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        bail!("HTTP {} for {}", status.as_u16(), url);
    }
    Ok(response.text().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_list_skips_comments_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(
            &path,
            "# report pages\nhttps://www.radrap.ch/comptesrendus/170\n\nhttps://www.radrap.ch/comptesrendus/191\n",
        )
        .unwrap();
        let urls = read_url_list(&path).unwrap();
        assert_eq!(urls.len(), 2);
        assert!(urls[0].ends_with("/170"));
    }

    #[test]
    fn empty_url_list_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(&path, "# nothing here\n").unwrap();
        assert!(read_url_list(&path).is_err());
    }
}
