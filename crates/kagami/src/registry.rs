use std::{collections::HashMap, path::PathBuf};

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use url::Url;

/// One file to mirror. The relative path is derived from the URL alone, so
/// the same URL always lands at the same destination and two different URLs
/// never collide on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadItem {
    pub url: Url,
    pub relative_path: PathBuf,
}

impl DownloadItem {
    fn new(url: Url) -> Self {
        let relative_path = relative_path_for(&url);
        Self { url, relative_path }
    }
}

/// URL path with the leading slash stripped. A query string, when present,
/// becomes one extra percent-encoded path segment, so distinct query variants
/// of the same path stay distinct on disk.
fn relative_path_for(url: &Url) -> PathBuf {
    let mut path = PathBuf::from(url.path().trim_start_matches('/'));
    if let Some(query) = url.query() {
        path.push(utf8_percent_encode(query, NON_ALPHANUMERIC).to_string());
    }
    path
}

/// Insertion-ordered set of download items keyed by absolute URL. Registering
/// a URL a second time replaces the entry in place, keeping iteration order
/// reproducible for dry-run listings and the fetch work list.
#[derive(Debug, Default)]
pub struct ItemRegistry {
    items: Vec<DownloadItem>,
    index: HashMap<Url, usize>,
}

impl ItemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, url: Url) {
        let item = DownloadItem::new(url);
        match self.index.get(&item.url) {
            Some(&position) => self.items[position] = item,
            None => {
                self.index.insert(item.url.clone(), self.items.len());
                self.items.push(item);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &DownloadItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<DownloadItem> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_relative_path_mirrors_url_path() {
        assert_eq!(
            relative_path_for(&url("https://cdn.example.com/live/video/seg-1.m4s")),
            PathBuf::from("live/video/seg-1.m4s")
        );
    }

    #[test]
    fn test_relative_path_embeds_query_as_segment() {
        let with_query = relative_path_for(&url("https://cdn.example.com/seg-1.m4s?a=1"));
        assert_eq!(with_query, PathBuf::from("seg-1.m4s/a%3D1"));
        // Pure function of the URL: deriving twice gives the same path.
        assert_eq!(
            with_query,
            relative_path_for(&url("https://cdn.example.com/seg-1.m4s?a=1"))
        );
        // Different query, different path.
        assert_ne!(
            with_query,
            relative_path_for(&url("https://cdn.example.com/seg-1.m4s?a=2"))
        );
    }

    #[test]
    fn test_register_deduplicates_by_url() {
        let mut registry = ItemRegistry::new();
        registry.register(url("https://cdn.example.com/a.m4s"));
        registry.register(url("https://cdn.example.com/b.m4s"));
        registry.register(url("https://cdn.example.com/a.m4s"));

        assert_eq!(registry.len(), 2);
        let urls: Vec<&str> = registry.iter().map(|item| item.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://cdn.example.com/a.m4s", "https://cdn.example.com/b.m4s"]
        );
    }
}
