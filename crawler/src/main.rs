use anyhow::{anyhow, Context, Result};
use clap::Parser;
use reqwest::{header, Client, StatusCode, Url};
use scraper::{Html, Selector};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "findex-crawler")]
#[command(about = "Crawl pages and feed their text to the index service")]
struct Cli {
    /// Path to a file with seed URLs (one per line)
    #[arg(long)]
    seeds: String,
    /// Base URL of the index server
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    server: String,
    /// Maximum number of documents to submit
    #[arg(long, default_value_t = 1000)]
    max_docs: usize,
    /// Maximum pages to crawl per host (politeness)
    #[arg(long, default_value_t = 10)]
    max_per_host: usize,
    /// Delay between requests, milliseconds
    #[arg(long, default_value_t = 200)]
    delay_ms: u64,
    /// Request timeout seconds
    #[arg(long, default_value_t = 12)]
    timeout_secs: u64,
    /// Documents per update request to the server
    #[arg(long, default_value_t = 25)]
    batch_size: usize,
    /// User-Agent string
    #[arg(long, default_value = "findex-crawler/0.1 (+https://example.com/bot)")]
    user_agent: String,
    /// If true, only follow links that stay on the seed's host
    #[arg(long, default_value_t = true)]
    same_host_only: bool,
}

/// Failure fetching or parsing one page. The page is skipped and the index
/// service is never called for it.
#[derive(Debug, Error)]
enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("not an html page ({0})")]
    NotHtml(String),
    #[error("page too large ({0} bytes)")]
    TooLarge(usize),
}

struct Page {
    text: String,
    links: Vec<Url>,
}

struct Extractor {
    body: Selector,
    anchor: Selector,
}

impl Extractor {
    fn new() -> Self {
        Self {
            body: Selector::parse("body").expect("valid selector"),
            anchor: Selector::parse("a").expect("valid selector"),
        }
    }

    /// Strip markup down to the body's plain text and collect outgoing links.
    fn extract(&self, base: &Url, html: &str) -> Page {
        let doc = Html::parse_document(html);
        let text = doc
            .select(&self.body)
            .next()
            .map(|n| n.text().collect::<Vec<_>>().join(" "))
            .unwrap_or_default()
            .trim()
            .to_string();

        let mut links = Vec::new();
        for a in doc.select(&self.anchor) {
            if let Some(href) = a.value().attr("href") {
                if let Ok(u) = Url::parse(href).or_else(|_| base.join(href)) {
                    if u.scheme().starts_with("http") {
                        links.push(u);
                    }
                }
            }
        }
        Page { text, links }
    }
}

const MAX_PAGE_BYTES: usize = 2 * 1024 * 1024;

async fn fetch_page(client: &Client, extractor: &Extractor, url: &Url) -> Result<Page, FetchError> {
    let resp = client.get(url.clone()).send().await?;
    if !resp.status().is_success() {
        return Err(FetchError::Status(resp.status()));
    }
    if let Some(ct) = resp.headers().get(header::CONTENT_TYPE) {
        let ct = ct.to_str().unwrap_or("").to_string();
        if !ct.starts_with("text/html") {
            return Err(FetchError::NotHtml(ct));
        }
    }
    let bytes = resp.bytes().await?;
    if bytes.len() > MAX_PAGE_BYTES {
        return Err(FetchError::TooLarge(bytes.len()));
    }
    let html = String::from_utf8_lossy(&bytes);
    Ok(extractor.extract(url, &html))
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    texts: &'a [String],
}

/// Submit a batch of extracted texts; the service assigns document IDs.
async fn submit_batch(client: &Client, server: &str, texts: &[String]) -> Result<Vec<u32>> {
    let resp = client
        .post(format!("{server}/update_index"))
        .json(&SubmitRequest { texts })
        .send()
        .await
        .context("posting update to index server")?;
    if !resp.status().is_success() {
        return Err(anyhow!("index server rejected update: {}", resp.status()));
    }
    let body: serde_json::Value = resp.json().await?;
    let ids = body["ids"]
        .as_array()
        .map(|a| a.iter().filter_map(|v| v.as_u64().map(|n| n as u32)).collect())
        .unwrap_or_default();
    Ok(ids)
}

fn load_seeds(path: &str) -> Result<VecDeque<Url>> {
    let mut frontier = VecDeque::new();
    for line in BufReader::new(File::open(path).context("opening seeds file")?).lines() {
        let s = line?.trim().to_string();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let u = Url::parse(&s).or_else(|_| Url::parse(&format!("https://{s}")));
        if let Ok(u) = u {
            frontier.push_back(u);
        }
    }
    Ok(frontier)
}

fn norm(u: &Url) -> String {
    let mut s = u.clone();
    s.set_fragment(None);
    s.to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Cli::parse();

    let client = Client::builder()
        .user_agent(args.user_agent.clone())
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()?;

    let mut frontier = load_seeds(&args.seeds)?;
    if frontier.is_empty() {
        return Err(anyhow!("no valid seeds"));
    }
    tracing::info!(
        seeds = frontier.len(),
        max_docs = args.max_docs,
        server = %args.server,
        "crawl starting"
    );

    let extractor = Extractor::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut per_host: HashMap<String, usize> = HashMap::new();
    let mut batch: Vec<String> = Vec::new();
    let mut submitted = 0usize;

    while submitted + batch.len() < args.max_docs {
        let Some(url) = frontier.pop_front() else { break };
        if !seen.insert(norm(&url)) {
            continue;
        }
        if let Some(host) = url.host_str() {
            let count = per_host.entry(host.to_string()).or_insert(0);
            if *count >= args.max_per_host {
                continue;
            }
            *count += 1;
        }

        match fetch_page(&client, &extractor, &url).await {
            Ok(page) => {
                for link in page.links {
                    if args.same_host_only && link.host_str() != url.host_str() {
                        continue;
                    }
                    frontier.push_back(link);
                }
                if !page.text.is_empty() {
                    batch.push(page.text);
                }
            }
            Err(err) => {
                tracing::warn!(url = %url, %err, "skipping page");
            }
        }

        if batch.len() >= args.batch_size {
            let ids = submit_batch(&client, &args.server, &batch).await?;
            submitted += batch.len();
            batch.clear();
            tracing::info!(submitted, first_id = ?ids.first(), frontier = frontier.len(), "batch indexed");
        }

        sleep(Duration::from_millis(args.delay_ms)).await;
    }

    if !batch.is_empty() {
        submit_batch(&client, &args.server, &batch).await?;
        submitted += batch.len();
    }

    tracing::info!(submitted, visited = seen.len(), "crawl finished");
    Ok(())
}
