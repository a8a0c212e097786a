//! Encyclopedia adapter (Wikipedia Action API)
//!
//! Read-only calls, all `format=json&formatversion=2`:
//! - `list=search` - free-text search, titles only
//! - `prop=pageprops` - knowledge-graph cross reference and disambiguation marker
//! - `prop=extracts|pageimages` - plain-text intro and lead thumbnail
//! - `action=parse` - rendered HTML, mined for infobox rows and coordinates
//! - `prop=links` - article links, the candidates for geographic mentions
//! - `list=random` - one random article title (never cached)
//!
//! API Documentation: https://www.mediawiki.org/wiki/API:Main_page

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::{decode, SourceClient, SourceError, SourceKind, UpstreamRequest};
use crate::types::Coordinates;

struct Selectors {
    infobox: Selector,
    row: Selector,
    header_cell: Selector,
    data_cell: Selector,
    geo: Selector,
    geo_dec: Selector,
}

static SELECTORS: Lazy<Option<Selectors>> = Lazy::new(|| {
    Some(Selectors {
        infobox: Selector::parse("table.infobox").ok()?,
        row: Selector::parse("tr").ok()?,
        header_cell: Selector::parse("th").ok()?,
        data_cell: Selector::parse("td").ok()?,
        geo: Selector::parse("span.geo").ok()?,
        geo_dec: Selector::parse("span.geo-dec").ok()?,
    })
});

/// Most titles the Action API accepts in one `titles=` parameter
const MAX_TITLES_PER_QUERY: usize = 50;

/// Article namespace
const MAIN_NAMESPACE: &str = "0";

/// Properties of a single page
#[derive(Debug, Clone, PartialEq)]
pub struct PageProps {
    /// Title after redirect resolution
    pub title: String,
    /// Knowledge-graph identifier (e.g. "Q937")
    pub wikibase_item: Option<String>,
    /// Page is a disambiguation list
    pub disambiguation: bool,
}

/// Plain-text intro and lead image
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageSummary {
    pub extract: Option<String>,
    pub thumbnail: Option<String>,
}

/// Structured data mined from the rendered page
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageDetails {
    pub infobox: BTreeMap<String, String>,
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: String,
    #[serde(default)]
    info: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct PagesResponse {
    query: Option<PagesQuery>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct PagesQuery {
    #[serde(default)]
    pages: Vec<RawPage>,
    #[serde(default)]
    normalized: Vec<TitleChange>,
    #[serde(default)]
    redirects: Vec<TitleChange>,
}

#[derive(Debug, Deserialize)]
struct TitleChange {
    from: String,
    to: String,
}

#[derive(Debug, Deserialize)]
struct RawLink {
    title: String,
}

#[derive(Debug, Deserialize)]
struct RandomResponse {
    query: Option<RandomQuery>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RandomQuery {
    #[serde(default)]
    random: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct RawPage {
    title: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
    pageprops: Option<RawPageProps>,
    extract: Option<String>,
    thumbnail: Option<RawThumbnail>,
    #[serde(default)]
    links: Vec<RawLink>,
}

#[derive(Debug, Deserialize)]
struct RawPageProps {
    wikibase_item: Option<String>,
    disambiguation: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawThumbnail {
    source: String,
}

#[derive(Debug, Deserialize)]
struct ParseResponse {
    parse: Option<ParseBody>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ParseBody {
    text: String,
}

/// Wikipedia client
#[derive(Clone)]
pub struct EncyclopediaSource {
    client: SourceClient,
    endpoint: String,
    search_limit: usize,
}

impl EncyclopediaSource {
    pub fn new(client: SourceClient, endpoint: impl Into<String>, search_limit: usize) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            search_limit,
        }
    }

    fn request(&self) -> UpstreamRequest {
        UpstreamRequest::get(SourceKind::Encyclopedia, self.endpoint.as_str())
            .param("format", "json")
            .param("formatversion", "2")
    }

    /// Titles matching `query`, best first
    pub async fn search(&self, query: &str) -> Result<Vec<String>, SourceError> {
        let request = self
            .request()
            .param("action", "query")
            .param("list", "search")
            .param("srsearch", query)
            .param("srlimit", self.search_limit.to_string())
            .param("srprop", "");
        let query = self
            .client
            .get_with(request, |body| {
                let response: SearchResponse = decode(SourceKind::Encyclopedia, body)?;
                if let Some(error) = response.error {
                    return Err(api_error(error));
                }
                response
                    .query
                    .ok_or_else(|| SourceError::Parse("search response has no query block".to_string()))
            })
            .await?;

        let titles: Vec<String> = query.search.into_iter().map(|hit| hit.title).collect();
        debug!(candidates = titles.len(), "Encyclopedia search complete");
        Ok(titles)
    }

    /// Page properties, `None` when the page does not exist
    pub async fn page_props(&self, title: &str) -> Result<Option<PageProps>, SourceError> {
        let request = self
            .request()
            .param("action", "query")
            .param("prop", "pageprops")
            .param("redirects", "1")
            .param("titles", title);

        let Some(page) = self.fetch_page(request).await? else {
            return Ok(None);
        };
        let props = page.pageprops;
        Ok(Some(PageProps {
            title: page.title,
            wikibase_item: props
                .as_ref()
                .and_then(|p| p.wikibase_item.clone())
                .filter(|id| !id.trim().is_empty()),
            disambiguation: props.map_or(false, |p| p.disambiguation.is_some()),
        }))
    }

    /// Intro extract and lead thumbnail, `None` when the page does not exist
    pub async fn summary(&self, title: &str) -> Result<Option<PageSummary>, SourceError> {
        let request = self
            .request()
            .param("action", "query")
            .param("prop", "extracts|pageimages")
            .param("exintro", "1")
            .param("explaintext", "1")
            .param("pithumbsize", "800")
            .param("redirects", "1")
            .param("titles", title);

        let Some(page) = self.fetch_page(request).await? else {
            return Ok(None);
        };
        Ok(Some(PageSummary {
            extract: page.extract.filter(|text| !text.trim().is_empty()),
            thumbnail: page.thumbnail.map(|t| t.source),
        }))
    }

    /// Infobox rows and coordinates from the rendered page
    pub async fn page_details(&self, title: &str) -> Result<Option<PageDetails>, SourceError> {
        let request = self
            .request()
            .param("action", "parse")
            .param("prop", "text")
            .param("redirects", "1")
            .param("page", title);
        let parsed = self
            .client
            .get_with(request, |body| {
                let response: ParseResponse = decode(SourceKind::Encyclopedia, body)?;
                match response.error {
                    Some(error) if error.code == "missingtitle" => return Ok(None),
                    Some(error) => return Err(api_error(error)),
                    None => {}
                }
                response
                    .parse
                    .map(Some)
                    .ok_or_else(|| SourceError::Parse("parse response has no parse block".to_string()))
            })
            .await?;

        Ok(parsed.map(|body| extract_page_details(&body.text)))
    }

    /// Titles of articles linked from `title`, in upstream (alphabetical) order
    pub async fn links(&self, title: &str) -> Result<Vec<String>, SourceError> {
        let request = self
            .request()
            .param("action", "query")
            .param("prop", "links")
            .param("plnamespace", MAIN_NAMESPACE)
            .param("pllimit", "max")
            .param("redirects", "1")
            .param("titles", title);

        let Some(page) = self.fetch_page(request).await? else {
            return Ok(Vec::new());
        };
        Ok(page.links.into_iter().map(|link| link.title).collect())
    }

    /// Knowledge-graph ids of `titles`, as `(requested title, id)` in request order
    ///
    /// Redirects and title normalization are followed. Pages that are missing
    /// or have no id are left out. Sent in batches of fifty titles.
    pub async fn wikibase_items(&self, titles: &[String]) -> Result<Vec<(String, String)>, SourceError> {
        let mut found = Vec::new();
        for batch in titles.chunks(MAX_TITLES_PER_QUERY) {
            let request = self
                .request()
                .param("action", "query")
                .param("prop", "pageprops")
                .param("ppprop", "wikibase_item")
                .param("redirects", "1")
                .param("titles", batch.join("|"));

            let query = self.client.get_with(request, pages_query).await?;
            let renames: HashMap<&str, &str> = query
                .normalized
                .iter()
                .chain(&query.redirects)
                .map(|change| (change.from.as_str(), change.to.as_str()))
                .collect();
            let ids: HashMap<&str, &str> = query
                .pages
                .iter()
                .filter(|page| !page.missing && !page.invalid)
                .filter_map(|page| {
                    let id = page.pageprops.as_ref()?.wikibase_item.as_deref()?;
                    Some((page.title.as_str(), id))
                })
                .collect();

            for requested in batch {
                let mut title = requested.as_str();
                // normalized, then redirected
                for _ in 0..2 {
                    if let Some(next) = renames.get(title) {
                        title = *next;
                    }
                }
                if let Some(id) = ids.get(title) {
                    found.push((requested.clone(), id.to_string()));
                }
            }
        }
        debug!(requested = titles.len(), found = found.len(), "Knowledge-graph ids looked up");
        Ok(found)
    }

    /// Title of a random article
    pub async fn random_title(&self) -> Result<Option<String>, SourceError> {
        let request = self
            .request()
            .param("action", "query")
            .param("list", "random")
            .param("rnnamespace", MAIN_NAMESPACE)
            .param("rnlimit", "1");
        let response: RandomResponse = self.client.get_fresh(request).await?;
        if let Some(error) = response.error {
            return Err(api_error(error));
        }
        let query = response
            .query
            .ok_or_else(|| SourceError::Parse("random response has no query block".to_string()))?;
        Ok(query.random.into_iter().next().map(|hit| hit.title))
    }

    async fn fetch_page(&self, request: UpstreamRequest) -> Result<Option<RawPage>, SourceError> {
        let page = self.client.get_with(request, first_page).await?;
        if page.missing || page.invalid {
            return Ok(None);
        }
        Ok(Some(page))
    }
}

fn pages_query(body: serde_json::Value) -> Result<PagesQuery, SourceError> {
    let response: PagesResponse = decode(SourceKind::Encyclopedia, body)?;
    if let Some(error) = response.error {
        return Err(api_error(error));
    }
    response
        .query
        .ok_or_else(|| SourceError::Parse("query response has no query block".to_string()))
}

fn first_page(body: serde_json::Value) -> Result<RawPage, SourceError> {
    pages_query(body)?
        .pages
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::Parse("query response has no pages".to_string()))
}

/// Errors the Action API reports inside a 200 response
fn api_error(error: ApiErrorBody) -> SourceError {
    match error.code.as_str() {
        "ratelimited" | "maxlag" => SourceError::RateLimited,
        _ => SourceError::Parse(format!("encyclopedia API error {}: {}", error.code, error.info)),
    }
}

/// Mine infobox rows and coordinates from article HTML
///
/// Kept synchronous: the parsed document is not `Send` and must not live
/// across an await point.
pub fn extract_page_details(html: &str) -> PageDetails {
    let Some(sel) = SELECTORS.as_ref() else {
        return PageDetails::default();
    };
    let document = Html::parse_fragment(html);

    let mut infobox = BTreeMap::new();
    if let Some(table) = document.select(&sel.infobox).next() {
        for row in table.select(&sel.row) {
            let (Some(th), Some(td)) = (row.select(&sel.header_cell).next(), row.select(&sel.data_cell).next())
            else {
                continue;
            };
            let key = visible_text(th);
            let value = visible_text(td);
            if key.is_empty() || value.is_empty() {
                continue;
            }
            infobox.entry(key).or_insert(value);
        }
    }

    let coordinates = document
        .select(&sel.geo)
        .find_map(|span| parse_geo(&visible_text(span)))
        .or_else(|| {
            document
                .select(&sel.geo_dec)
                .find_map(|span| parse_geo_dec(&visible_text(span)))
        });

    PageDetails {
        infobox,
        coordinates,
    }
}

/// Text of an element without stylesheets, scripts or footnote markers,
/// whitespace collapsed
fn visible_text(element: ElementRef<'_>) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor.value().as_element().map_or(false, |el| {
                matches!(el.name(), "style" | "script")
                    || (el.name() == "sup" && el.classes().any(|c| c == "reference"))
            })
        });
        if !hidden {
            parts.push(&**text);
        }
    }
    parts
        .concat()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// `"48.856667; 2.352222"` (the `geo` microformat)
fn parse_geo(text: &str) -> Option<Coordinates> {
    let mut parts = text.split(|c: char| c == ';' || c.is_whitespace()).filter(|p| !p.is_empty());
    let lat = parts.next()?.parse::<f64>().ok()?;
    let lon = parts.next()?.parse::<f64>().ok()?;
    Coordinates::new(lat, lon)
}

/// `"48.8567°N 2.3508°E"` (decimal degrees with hemisphere letters)
fn parse_geo_dec(text: &str) -> Option<Coordinates> {
    let mut parts = text.split_whitespace();
    let lat = signed_degrees(parts.next()?, 'N', 'S')?;
    let lon = signed_degrees(parts.next()?, 'E', 'W')?;
    Coordinates::new(lat, lon)
}

fn signed_degrees(token: &str, positive: char, negative: char) -> Option<f64> {
    let hemisphere = token.chars().last()?;
    let sign = if hemisphere == positive {
        1.0
    } else if hemisphere == negative {
        -1.0
    } else {
        return None;
    };
    let number = token.trim_end_matches(hemisphere).trim_end_matches('°');
    number.parse::<f64>().ok().map(|v| v * sign)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::testing::client_with;
    use serde_json::json;

    const PARIS_HTML: &str = r#"
        <div class="mw-parser-output">
          <table class="infobox ib-settlement vcard">
            <tbody>
              <tr><th colspan="2" class="infobox-above">Paris</th></tr>
              <tr><th class="infobox-label">Country</th><td class="infobox-data">France</td></tr>
              <tr><th class="infobox-label">Mayor</th>
                  <td class="infobox-data">Anne   Hidalgo<sup class="reference"><a>[1]</a></sup></td></tr>
              <tr><th class="infobox-label">Area</th>
                  <td class="infobox-data"><style>.x{color:red}</style>105.4 km<sup>2</sup></td></tr>
            </tbody>
          </table>
          <span class="geo-inline"><span class="geo-dec">48.8567°N 2.3522°E</span>
          <span class="geo">48.856700; 2.352200</span></span>
        </div>"#;

    #[test]
    fn test_extract_infobox_rows() {
        let details = extract_page_details(PARIS_HTML);
        assert_eq!(details.infobox.get("Country").map(String::as_str), Some("France"));
        assert_eq!(details.infobox.get("Mayor").map(String::as_str), Some("Anne Hidalgo"));
        assert_eq!(details.infobox.get("Area").map(String::as_str), Some("105.4 km2"));
        // Header rows without a data cell are skipped
        assert!(!details.infobox.contains_key("Paris"));
    }

    #[test]
    fn test_extract_geo_coordinates() {
        let details = extract_page_details(PARIS_HTML);
        let coords = details.coordinates.unwrap();
        assert!((coords.lat - 48.8567).abs() < 1e-6);
        assert!((coords.lon - 2.3522).abs() < 1e-6);
    }

    #[test]
    fn test_geo_dec_fallback_with_southern_hemisphere() {
        let html = r#"<span class="geo-dec">33.8688°S 151.2093°E</span>"#;
        let coords = extract_page_details(html).coordinates.unwrap();
        assert!((coords.lat + 33.8688).abs() < 1e-6);
        assert!((coords.lon - 151.2093).abs() < 1e-6);
    }

    #[test]
    fn test_page_without_infobox() {
        let details = extract_page_details("<p>Just prose.</p>");
        assert!(details.infobox.is_empty());
        assert!(details.coordinates.is_none());
    }

    #[tokio::test]
    async fn test_search_returns_titles_in_rank_order() {
        let (client, _) = client_with(|req| {
            assert_eq!(req.param_value("list"), Some("search"));
            assert_eq!(req.param_value("srsearch"), Some("einstein"));
            Ok(json!({"query": {"search": [
                {"ns": 0, "title": "Albert Einstein", "pageid": 736},
                {"ns": 0, "title": "Einstein family", "pageid": 1}
            ]}}))
        });
        let source = EncyclopediaSource::new(client, "https://example.test/w/api.php", 10);
        let titles = source.search("einstein").await.unwrap();
        assert_eq!(titles, vec!["Albert Einstein", "Einstein family"]);
    }

    #[tokio::test]
    async fn test_search_without_query_block_is_malformed() {
        let (client, _) = client_with(|_| Ok(json!({"batchcomplete": true})));
        let source = EncyclopediaSource::new(client, "https://example.test/w/api.php", 10);
        assert!(matches!(source.search("x").await, Err(SourceError::Parse(_))));
    }

    #[tokio::test]
    async fn test_page_props_reads_identifier_and_disambiguation() {
        let (client, _) = client_with(|_| {
            Ok(json!({"query": {"pages": [{
                "pageid": 1, "ns": 0, "title": "Mercury",
                "pageprops": {"disambiguation": "", "wikibase_item": "Q302"}
            }]}}))
        });
        let source = EncyclopediaSource::new(client, "https://example.test/w/api.php", 10);
        let props = source.page_props("Mercury").await.unwrap().unwrap();
        assert_eq!(props.wikibase_item.as_deref(), Some("Q302"));
        assert!(props.disambiguation);
    }

    #[tokio::test]
    async fn test_missing_page_is_none() {
        let (client, _) = client_with(|_| {
            Ok(json!({"query": {"pages": [{"ns": 0, "title": "Nowhere", "missing": true}]}}))
        });
        let source = EncyclopediaSource::new(client, "https://example.test/w/api.php", 10);
        assert_eq!(source.page_props("Nowhere").await.unwrap(), None);
        assert_eq!(source.summary("Nowhere").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_summary_reads_extract_and_thumbnail() {
        let (client, _) = client_with(|req| {
            assert_eq!(req.param_value("prop"), Some("extracts|pageimages"));
            Ok(json!({"query": {"pages": [{
                "title": "Albert Einstein",
                "extract": "Albert Einstein was a physicist.",
                "thumbnail": {"source": "https://upload.example/einstein.jpg", "width": 800, "height": 1000}
            }]}}))
        });
        let source = EncyclopediaSource::new(client, "https://example.test/w/api.php", 10);
        let summary = source.summary("Albert Einstein").await.unwrap().unwrap();
        assert_eq!(summary.extract.as_deref(), Some("Albert Einstein was a physicist."));
        assert_eq!(summary.thumbnail.as_deref(), Some("https://upload.example/einstein.jpg"));
    }

    #[tokio::test]
    async fn test_page_details_missing_title() {
        let (client, _) = client_with(|_| {
            Ok(json!({"error": {"code": "missingtitle", "info": "The page you specified doesn't exist."}}))
        });
        let source = EncyclopediaSource::new(client, "https://example.test/w/api.php", 10);
        assert_eq!(source.page_details("Nowhere").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_api_error_is_retried_not_cached() {
        let (client, fetch) = client_with(|_| {
            Ok(json!({"error": {"code": "ratelimited", "info": "You've exceeded your rate limit."}}))
        });
        let source = EncyclopediaSource::new(client, "https://example.test/w/api.php", 10);

        assert_eq!(source.search("Brazil").await, Err(SourceError::RateLimited));
        assert_eq!(source.search("Brazil").await, Err(SourceError::RateLimited));
        assert_eq!(fetch.calls(), 2);
    }

    #[tokio::test]
    async fn test_missing_title_answer_is_cached() {
        let (client, fetch) = client_with(|_| {
            Ok(json!({"error": {"code": "missingtitle", "info": "The page you specified doesn't exist."}}))
        });
        let source = EncyclopediaSource::new(client, "https://example.test/w/api.php", 10);

        assert_eq!(source.page_details("Nowhere").await.unwrap(), None);
        assert_eq!(source.page_details("Nowhere").await.unwrap(), None);
        assert_eq!(fetch.calls(), 1);
    }

    #[tokio::test]
    async fn test_links_of_a_page() {
        let (client, _) = client_with(|req| {
            assert_eq!(req.param_value("prop"), Some("links"));
            assert_eq!(req.param_value("plnamespace"), Some("0"));
            Ok(json!({"query": {"pages": [{
                "title": "Brazil",
                "links": [{"ns": 0, "title": "Amazon River"}, {"ns": 0, "title": "Rio de Janeiro"}]
            }]}}))
        });
        let source = EncyclopediaSource::new(client, "https://example.test/w/api.php", 10);
        assert_eq!(source.links("Brazil").await.unwrap(), vec!["Amazon River", "Rio de Janeiro"]);
    }

    #[tokio::test]
    async fn test_wikibase_items_follow_redirects_in_request_order() {
        let (client, fetch) = client_with(|req| {
            assert_eq!(req.param_value("titles"), Some("rio de Janeiro|Amazon river|Nowhere|Samba"));
            Ok(json!({"query": {
                "normalized": [{"from": "rio de Janeiro", "to": "Rio de Janeiro"}],
                "redirects": [{"from": "Amazon river", "to": "Amazon River"}],
                "pages": [
                    {"title": "Amazon River", "pageprops": {"wikibase_item": "Q3783"}},
                    {"title": "Nowhere", "missing": true},
                    {"title": "Rio de Janeiro", "pageprops": {"wikibase_item": "Q8678"}},
                    {"title": "Samba"}
                ]
            }}))
        });
        let source = EncyclopediaSource::new(client, "https://example.test/w/api.php", 10);
        let titles: Vec<String> = ["rio de Janeiro", "Amazon river", "Nowhere", "Samba"]
            .iter()
            .map(|t| t.to_string())
            .collect();

        let ids = source.wikibase_items(&titles).await.unwrap();
        assert_eq!(
            ids,
            vec![
                ("rio de Janeiro".to_string(), "Q8678".to_string()),
                ("Amazon river".to_string(), "Q3783".to_string()),
            ]
        );
        assert_eq!(fetch.calls(), 1);
    }

    #[tokio::test]
    async fn test_wikibase_items_are_batched() {
        let (client, fetch) = client_with(|_| Ok(json!({"query": {"pages": []}})));
        let source = EncyclopediaSource::new(client, "https://example.test/w/api.php", 10);
        let titles: Vec<String> = (0..120).map(|i| format!("Place {i}")).collect();

        assert!(source.wikibase_items(&titles).await.unwrap().is_empty());
        assert_eq!(fetch.calls(), 3);
    }

    #[tokio::test]
    async fn test_random_title_is_never_cached() {
        let (client, fetch) = client_with(|req| {
            assert_eq!(req.param_value("list"), Some("random"));
            Ok(json!({"query": {"random": [{"id": 1, "ns": 0, "title": "Tea"}]}}))
        });
        let source = EncyclopediaSource::new(client, "https://example.test/w/api.php", 10);

        assert_eq!(source.random_title().await.unwrap().as_deref(), Some("Tea"));
        assert_eq!(source.random_title().await.unwrap().as_deref(), Some("Tea"));
        assert_eq!(fetch.calls(), 2);
    }

    #[tokio::test]
    async fn test_page_details_parses_html() {
        let (client, _) = client_with(|_| Ok(json!({"parse": {"title": "Paris", "pageid": 22989, "text": PARIS_HTML}})));
        let source = EncyclopediaSource::new(client, "https://example.test/w/api.php", 10);
        let details = source.page_details("Paris").await.unwrap().unwrap();
        assert_eq!(details.infobox.len(), 3);
        assert!(details.coordinates.is_some());
    }
}
