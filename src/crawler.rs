use std::fs::File;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{StatusCode, Url};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::CrawlSettings;
use crate::parser::ability::{extract_description, DESCRIPTION_NOT_FOUND};
use crate::parser::listing::{self, ListingEntry};
use crate::parser::parse_species;
use crate::records::{RawRow, SpeciesRecord, RAW_COLUMNS};

/// Crawl stats returned after completion.
pub struct CrawlStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

enum FetchError {
    /// 429, 5xx, connect and timeout failures.
    Transient(anyhow::Error),
    Fatal(anyhow::Error),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            FetchError::Transient(e.into())
        } else {
            FetchError::Fatal(e.into())
        }
    }
}

/// HTTP client shared by every crawl task. The semaphore caps in-flight
/// requests to the crawled host.
struct Fetcher {
    client: reqwest::Client,
    semaphore: Semaphore,
    settings: CrawlSettings,
}

impl Fetcher {
    fn new(settings: CrawlSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Fetcher {
            client,
            semaphore: Semaphore::new(settings.concurrency.max(1)),
            settings,
        })
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        with_retries(&self.settings, url, || self.fetch_once(url)).await
    }

    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| FetchError::Fatal(e.into()))?;
        tokio::time::sleep(self.settings.jitter()).await;

        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if is_retryable(status) {
            return Err(FetchError::Transient(anyhow!("HTTP {status}")));
        }
        if !status.is_success() {
            return Err(FetchError::Fatal(anyhow!("HTTP {status}")));
        }
        Ok(resp.text().await?)
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Run `op` until it succeeds, fails fatally, or runs out of retries.
/// Transient failures back off exponentially between attempts.
async fn with_retries<F, Fut>(settings: &CrawlSettings, url: &str, mut op: F) -> Result<String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String, FetchError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(body) => return Ok(body),
            Err(FetchError::Transient(e)) if attempt < settings.max_retries => {
                let backoff = settings.backoff(attempt);
                warn!(
                    "Transient failure on {} ({}), attempt {}/{}, backing off {:.1}s",
                    url,
                    e,
                    attempt + 1,
                    settings.max_retries,
                    backoff.as_secs_f64()
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(FetchError::Transient(e) | FetchError::Fatal(e)) => {
                return Err(e.context(format!("GET {url}")));
            }
        }
    }
}

/// Crawl the listing page and every linked detail page, streaming one CSV
/// row per species to `output` as results arrive.
pub async fn crawl(settings: &CrawlSettings, output: &Path) -> Result<CrawlStats> {
    let start = Url::parse(&settings.start_url)
        .with_context(|| format!("Invalid start URL {}", settings.start_url))?;
    let fetcher = Arc::new(Fetcher::new(settings.clone())?);

    info!("Fetching listing page: {}", start);
    let html = fetcher
        .fetch_text(start.as_str())
        .await
        .context("Failed to fetch listing page")?;
    let entries = listing::parse_listing(&html, &start);
    let found = entries.len();
    let mut entries = listing::dedup(entries);
    info!("Listing rows: {} ({} unique detail pages)", found, entries.len());
    if let Some(n) = settings.limit {
        entries.truncate(n);
    }
    let total = entries.len();

    let mut writer = open_writer(output)?;

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    // Channel: workers send records, this loop writes CSV rows
    let (tx, mut rx) =
        tokio::sync::mpsc::channel::<Result<SpeciesRecord>>(settings.concurrency.max(1) * 2);

    for entry in entries {
        let fetcher = Arc::clone(&fetcher);
        let tx = tx.clone();
        tokio::spawn(async move {
            let result = crawl_species(&fetcher, &entry)
                .await
                .with_context(|| format!("Failed to crawl {}", entry.url));
            let _ = tx.send(result).await;
        });
    }

    // Drop our copy of tx so rx closes when all spawned tasks finish
    drop(tx);

    let mut ok = 0usize;
    let mut errors = 0usize;
    while let Some(result) = rx.recv().await {
        match result {
            Ok(record) => {
                writer.serialize(RawRow::from(&record))?;
                ok += 1;
            }
            Err(e) => {
                warn!("{:#}", e);
                errors += 1;
            }
        }
        pb.inc(1);
    }
    writer.flush()?;

    pb.finish_and_clear();
    info!("Crawled {} pages ({} ok, {} errors)", total, ok, errors);

    Ok(CrawlStats { total, ok, errors })
}

/// CSV writer with the crawl header already written, so an empty crawl still
/// produces a readable file.
fn open_writer(path: &Path) -> Result<csv::Writer<File>> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(RAW_COLUMNS)?;
    Ok(writer)
}

async fn crawl_species(fetcher: &Fetcher, entry: &ListingEntry) -> Result<SpeciesRecord> {
    let url = Url::parse(&entry.url)?;
    let html = fetcher.fetch_text(url.as_str()).await?;
    let record = parse_species(&html, &url, entry.form_hint.as_deref());

    let descriptions = join_all(
        record
            .habilidades
            .iter()
            .map(|a| fetch_description(fetcher, &a.url)),
    )
    .await;
    Ok(with_descriptions(record, descriptions))
}

async fn fetch_description(fetcher: &Fetcher, url: &str) -> String {
    match fetcher.fetch_text(url).await {
        Ok(html) => extract_description(&html),
        Err(e) => {
            debug!("Ability page failed: {:#}", e);
            DESCRIPTION_NOT_FOUND.to_string()
        }
    }
}

/// Attach descriptions to abilities by position; missing ones get the placeholder.
fn with_descriptions(mut record: SpeciesRecord, descriptions: Vec<String>) -> SpeciesRecord {
    let mut descriptions = descriptions.into_iter();
    for ability in &mut record.habilidades {
        ability.descricao = Some(
            descriptions
                .next()
                .unwrap_or_else(|| DESCRIPTION_NOT_FOUND.to_string()),
        );
    }
    record
}
