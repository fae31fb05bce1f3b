use dash_mpd::MPD;
use reqwest::Client;
use url::Url;

use crate::error::{KagamiError, KagamiResult};

const DASH_ACCEPT: &str = "application/dash+xml,video/vnd.mpeg.dash.mpd";

/// Retrieves and parses the manifest, returning it together with the base URL
/// every relative reference resolves against.
///
/// An `http://` / `https://` location is fetched over the network; anything
/// else is read as a local file and exposed under its `file://` URL so the
/// rest of the pipeline never cares where the manifest came from.
pub async fn load_manifest(client: &Client, location: &str) -> KagamiResult<(Url, MPD)> {
    let (base_url, text) = read_manifest(client, location).await?;
    let mpd = dash_mpd::parse(&text)?;
    if mpd.mpdtype.as_deref() == Some("dynamic") {
        log::warn!("Manifest is dynamic; resolving a single snapshot of it.");
    }
    Ok((base_url, mpd))
}

async fn read_manifest(client: &Client, location: &str) -> KagamiResult<(Url, String)> {
    if location.starts_with("http://") || location.starts_with("https://") {
        let url = Url::parse(location)?;
        let response = client
            .get(url.clone())
            .header("Accept", DASH_ACCEPT)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(KagamiError::HttpError(response.status()));
        }
        let text = response.text().await?;
        Ok((url, text))
    } else {
        let path = tokio::fs::canonicalize(location).await?;
        let text = tokio::fs::read_to_string(&path).await?;
        let url = Url::from_file_path(&path).map_err(|_| {
            KagamiError::MpdParsing(format!("invalid manifest path: {}", path.display()))
        })?;
        Ok((url, text))
    }
}
