//! Media repository adapter (Wikimedia Commons)
//!
//! Searches the File namespace for the resolved title and returns direct
//! image URLs in search-rank order. Non-image files (audio, PDF, video)
//! are dropped.
//!
//! API Documentation: https://commons.wikimedia.org/w/api.php

use serde::Deserialize;

use super::{SourceClient, SourceError, SourceKind, UpstreamRequest};

/// File namespace on Commons
const FILE_NAMESPACE: &str = "6";

#[derive(Debug, Deserialize)]
struct MediaResponse {
    query: Option<MediaQuery>,
}

#[derive(Debug, Deserialize)]
struct MediaQuery {
    #[serde(default)]
    pages: Vec<MediaPage>,
}

#[derive(Debug, Deserialize)]
struct MediaPage {
    #[serde(default)]
    index: u32,
    #[serde(default)]
    imageinfo: Vec<ImageInfo>,
}

#[derive(Debug, Deserialize)]
struct ImageInfo {
    url: Option<String>,
    mime: Option<String>,
}

/// Commons client
#[derive(Clone)]
pub struct MediaSource {
    client: SourceClient,
    endpoint: String,
}

impl MediaSource {
    pub fn new(client: SourceClient, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Up to `limit` image URLs for `title`, best match first
    pub async fn images_for(&self, title: &str, limit: usize) -> Result<Vec<String>, SourceError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let request = UpstreamRequest::get(SourceKind::Media, self.endpoint.as_str())
            .param("action", "query")
            .param("format", "json")
            .param("formatversion", "2")
            .param("generator", "search")
            .param("gsrsearch", title)
            .param("gsrnamespace", FILE_NAMESPACE)
            .param("gsrlimit", limit.to_string())
            .param("prop", "imageinfo")
            .param("iiprop", "url|mime");

        let response: MediaResponse = self.client.get_decoded(request).await?;
        let Some(query) = response.query else {
            // No query block means the search matched nothing
            return Ok(Vec::new());
        };

        let mut pages = query.pages;
        pages.sort_by_key(|p| p.index);

        let urls = pages
            .into_iter()
            .filter_map(|page| page.imageinfo.into_iter().next())
            .filter(|info| info.mime.as_deref().map_or(true, |m| m.starts_with("image/")))
            .filter_map(|info| info.url)
            .take(limit)
            .collect();
        Ok(urls)
    }
}
