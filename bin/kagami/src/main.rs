use std::{num::NonZeroU32, path::PathBuf, str::FromStr, time::Duration};

use anyhow::Context;
use clap::Parser;
use fake_user_agent::get_chrome_rua;
use kagami::{
    fetch::load_manifest,
    mpd::{resolve_items, ResolveOptions, SegmentFilter},
    ParallelDownloader,
};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client, ClientBuilder,
};

/// Mirror every file referenced by a static MPEG-DASH manifest, preserving
/// the URL-relative folder structure locally.
#[derive(Parser, Debug, Clone)]
pub struct KagamiArgs {
    /// Debug output
    #[clap(long, alias = "debug")]
    verbose: bool,

    /// Output directory for the mirrored tree
    #[clap(short, long, default_value = "dash_downloads")]
    output: PathBuf,

    /// Only download representations whose @id matches this (repeatable)
    #[clap(long = "filter-repr-id")]
    filter_repr_id: Vec<String>,

    /// Only download representations whose mimeType starts with this prefix (repeatable)
    #[clap(long = "filter-mime")]
    filter_mime: Vec<String>,

    /// Number of parallel downloads
    #[clap(long, default_value = "8")]
    concurrency: NonZeroU32,

    /// Number of retries per file
    #[clap(long, default_value = "3")]
    retries: u32,

    /// Per-request timeout in seconds
    #[clap(long, default_value = "30")]
    timeout: u64,

    /// Total segment count for $Number$-based SegmentTemplates without a timeline
    #[clap(long)]
    segment_count: Option<u64>,

    /// Parse the manifest and list the resolved URLs without downloading
    #[clap(long)]
    dry_run: bool,

    /// Extra HTTP header, e.g. "Authorization: Bearer TOKEN" (repeatable)
    #[clap(short = 'H', long = "headers")]
    headers: Vec<String>,

    /// Custom User-Agent string
    #[clap(long)]
    user_agent: Option<String>,

    /// Restrict downloads to this domain (safety check)
    #[clap(long)]
    only_domain: Option<String>,

    /// Manifest URL or local file path
    mpd: String,
}

impl KagamiArgs {
    fn client(&self) -> anyhow::Result<Client> {
        let mut headers = HeaderMap::new();
        for header in &self.headers {
            let Some((key, value)) = header.split_once(':') else {
                log::warn!("Ignoring malformed header: {header}");
                continue;
            };
            let Ok(name) = HeaderName::from_str(key.trim()) else {
                log::warn!("Ignoring invalid header name: {key}");
                continue;
            };
            let Ok(value) = HeaderValue::from_str(value.trim()) else {
                log::warn!("Ignoring invalid header value in: {header}");
                continue;
            };
            headers.insert(name, value);
        }

        let user_agent = self
            .user_agent
            .clone()
            .unwrap_or_else(|| get_chrome_rua().to_string());

        Ok(ClientBuilder::new()
            .default_headers(headers)
            .user_agent(user_agent)
            .timeout(Duration::from_secs(self.timeout))
            .build()?)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = KagamiArgs::parse();

    let mut builder = pretty_env_logger::formatted_builder();
    builder.parse_filters(if args.verbose { "debug" } else { "info" });
    builder.init();

    let client = args.client()?;

    let (base_url, mpd) = load_manifest(&client, &args.mpd)
        .await
        .context("loading manifest")?;

    let options = ResolveOptions {
        filter: SegmentFilter {
            representation_ids: args.filter_repr_id.clone(),
            mime_prefixes: args.filter_mime.clone(),
        },
        segment_count: args.segment_count,
    };
    let items = resolve_items(&mpd, &base_url, &options).context("resolving segments")?;
    println!("Discovered {} file(s).", items.len());

    if args.dry_run {
        for item in items.iter() {
            println!("{}", item.url);
        }
        return Ok(());
    }

    let downloader = ParallelDownloader::new(
        client,
        args.output.clone(),
        args.concurrency,
        args.retries,
        args.only_domain.clone(),
    );
    let summary = downloader.download(items.into_items()).await?;

    println!(
        "Done. Success: {}, Failed: {}. Output: {}",
        summary.succeeded,
        summary.failed.len(),
        std::fs::canonicalize(&args.output)?.display()
    );

    Ok(())
}
