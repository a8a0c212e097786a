//! Scripted fake upstream shared by the integration tests
//!
//! `world` answers like the real services would for two topics, "Brazil"
//! and "Albert Einstein". Tests wrap it to inject hangs, failures and gates.
//!
//! Brazil links to two located places; none of Einstein's links have a
//! knowledge-graph id, so his geographic mentions never reach the graph.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use wenc_agg::orchestrator::Orchestrator;
use wenc_agg::sources::{HttpFetch, SourceError, SourceKind, UpstreamRequest};
use wenc_common::config::EndpointConfig;
use wenc_common::{ManualClock, WencConfig};

pub const ENCYCLOPEDIA: &str = "https://wiki.example.test/w/api.php";
pub const KNOWLEDGE_GRAPH: &str = "https://graph.example.test/sparql";
pub const COUNTRIES: &str = "https://countries.example.test/v3.1";
pub const WEATHER: &str = "https://weather.example.test/v1/forecast";
pub const MEDIA: &str = "https://media.example.test/w/api.php";

/// How the fake answers one request
pub enum Reply {
    Json(Value),
    Fail(SourceError),
    /// Never answers; only a timeout ends the call
    Hang,
    /// Signals `entered`, then answers with `value` once `release` fires
    Gated {
        entered: Arc<Notify>,
        release: Arc<Notify>,
        value: Value,
    },
}

pub struct FakeUpstream<F> {
    script: F,
    log: Mutex<Vec<UpstreamRequest>>,
}

impl<F> FakeUpstream<F>
where
    F: Fn(&UpstreamRequest) -> Reply + Send + Sync + 'static,
{
    pub fn new(script: F) -> Arc<Self> {
        Arc::new(Self {
            script,
            log: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<UpstreamRequest> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, source: SourceKind) -> usize {
        self.log.lock().unwrap().iter().filter(|r| r.source == source).count()
    }
}

#[async_trait]
impl<F> HttpFetch for FakeUpstream<F>
where
    F: Fn(&UpstreamRequest) -> Reply + Send + Sync + 'static,
{
    async fn fetch_json(&self, request: &UpstreamRequest) -> Result<Value, SourceError> {
        self.log.lock().unwrap().push(request.clone());
        let reply = (self.script)(request);
        match reply {
            Reply::Json(value) => Ok(value),
            Reply::Fail(err) => Err(err),
            Reply::Hang => std::future::pending().await,
            Reply::Gated {
                entered,
                release,
                value,
            } => {
                entered.notify_one();
                release.notified().await;
                Ok(value)
            }
        }
    }
}

pub fn test_config() -> WencConfig {
    WencConfig {
        request_timeout_secs: 2,
        endpoints: EndpointConfig {
            encyclopedia: ENCYCLOPEDIA.to_string(),
            knowledge_graph: KNOWLEDGE_GRAPH.to_string(),
            countries: COUNTRIES.to_string(),
            weather: WEATHER.to_string(),
            media: MEDIA.to_string(),
        },
        ..WencConfig::default()
    }
}

/// Clock fixed at 2024-06-01, so plausible years end at 2025
pub fn test_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()))
}

pub fn orchestrator<F>(fake: &Arc<FakeUpstream<F>>) -> Orchestrator
where
    F: Fn(&UpstreamRequest) -> Reply + Send + Sync + 'static,
{
    Orchestrator::new(&test_config(), fake.clone(), test_clock())
}

// ============================================================================
// Canned world
// ============================================================================

pub const EINSTEIN_SUMMARY: &str = "Born in 1879, died in 1955, cited in 2020 papers.";

pub const BRAZIL_HTML: &str = r#"
    <div class="mw-parser-output">
      <table class="infobox ib-country vcard">
        <tr><th colspan="2">Federative Republic of Brazil</th></tr>
        <tr><th>Capital</th><td>Brasília</td></tr>
        <tr><th>Official languages</th><td>Portuguese</td></tr>
      </table>
      <span class="geo">-15.7939; -47.8828</span>
    </div>"#;

pub const EINSTEIN_HTML: &str = r#"
    <div class="mw-parser-output">
      <table class="infobox biography vcard">
        <tr><th>Born</th><td>14 March 1879<br/>Ulm</td></tr>
        <tr><th>Died</th><td>18 April 1955</td></tr>
      </table>
    </div>"#;

fn uri(id: &str) -> Value {
    json!({"type": "uri", "value": format!("http://www.wikidata.org/entity/{id}")})
}

fn literal(value: &str) -> Value {
    json!({"type": "literal", "value": value})
}

fn row(prop: &str, prop_label: &str, value: Value, value_label: &str) -> Value {
    json!({
        "prop": uri(prop),
        "propLabel": literal(prop_label),
        "value": value,
        "valueLabel": literal(value_label)
    })
}

fn pages(page: Value) -> Value {
    json!({"batchcomplete": true, "query": {"pages": [page]}})
}

/// Knowledge-graph id of each titled page in the world
fn wikibase_item(title: &str) -> Option<&'static str> {
    match title {
        "Brazil" => Some("Q155"),
        "Albert Einstein" => Some("Q937"),
        "Amazon River" => Some("Q3783"),
        "Rio de Janeiro" => Some("Q8678"),
        "Samba" => Some("Q11403"),
        _ => None,
    }
}

/// `P625` points of the linked places
fn place_point(id: &str) -> Option<&'static str> {
    match id {
        "Q3783" => Some("Point(-51.0 -0.5)"),
        "Q8678" => Some("Point(-43.2 -22.9)"),
        _ => None,
    }
}

fn link_list(titles: &[&str]) -> Value {
    titles.iter().map(|t| json!({"ns": 0, "title": t})).collect()
}

/// Answers for the Brazil / Albert Einstein world
pub fn world(req: &UpstreamRequest) -> Reply {
    let p = |name: &str| req.param_value(name).unwrap_or_default().to_string();
    match req.source {
        SourceKind::Encyclopedia => {
            if p("list") == "search" {
                let titles: Vec<&str> = match p("srsearch").to_lowercase().as_str() {
                    "brazil" => vec!["Brazil", "Brazil national football team"],
                    "albert einstein" | "einstein" => vec!["Albert Einstein", "Einstein family"],
                    _ => vec![],
                };
                let hits: Vec<Value> = titles.iter().map(|t| json!({"ns": 0, "title": t})).collect();
                return Reply::Json(json!({"query": {"search": hits}}));
            }
            if p("prop") == "pageprops" {
                let found: Vec<Value> = p("titles")
                    .split('|')
                    .map(|title| match wikibase_item(title) {
                        Some(id) => json!({"title": title, "pageprops": {"wikibase_item": id}}),
                        None => json!({"title": title, "missing": true}),
                    })
                    .collect();
                return Reply::Json(json!({"batchcomplete": true, "query": {"pages": found}}));
            }
            if p("prop") == "links" {
                let page = match p("titles").as_str() {
                    "Brazil" => json!({"title": "Brazil", "links": link_list(&[
                        "Brazil national football team", "Samba", "Rio de Janeiro", "Amazon River"
                    ])}),
                    "Albert Einstein" => json!({"title": "Albert Einstein", "links": link_list(&[
                        "Photoelectric effect", "Theory of relativity"
                    ])}),
                    other => json!({"title": other, "missing": true}),
                };
                return Reply::Json(pages(page));
            }
            if p("prop") == "extracts|pageimages" {
                let page = match p("titles").as_str() {
                    "Brazil" => json!({
                        "title": "Brazil",
                        "extract": "Brazil is the largest country in South America. It declared independence in 1822.",
                        "thumbnail": {"source": "https://upload.example.test/thumb/Flag_of_Brazil.png"}
                    }),
                    "Albert Einstein" => json!({"title": "Albert Einstein", "extract": EINSTEIN_SUMMARY}),
                    other => json!({"title": other, "missing": true}),
                };
                return Reply::Json(pages(page));
            }
            if p("action") == "parse" {
                return match p("page").as_str() {
                    "Brazil" => Reply::Json(json!({"parse": {"title": "Brazil", "text": BRAZIL_HTML}})),
                    "Albert Einstein" => {
                        Reply::Json(json!({"parse": {"title": "Albert Einstein", "text": EINSTEIN_HTML}}))
                    }
                    _ => Reply::Json(json!({"error": {"code": "missingtitle", "info": "missing"}})),
                };
            }
            Reply::Fail(SourceError::Status { status: 400, body: "unscripted encyclopedia call".into() })
        }
        SourceKind::KnowledgeGraph => {
            let query = p("query");
            if query.contains("VALUES ?item") {
                let rows: Vec<Value> = ["Q3783", "Q8678", "Q11403"]
                    .iter()
                    .filter(|id| query.contains(&format!("wd:{id} ")))
                    .filter_map(|id| {
                        let point = place_point(id)?;
                        Some(json!({"item": uri(id), "coord": literal(point)}))
                    })
                    .collect();
                return Reply::Json(json!({"head": {"vars": ["item", "coord"]}, "results": {"bindings": rows}}));
            }
            if query.contains("UNION") {
                let rows = if query.contains("wd:Q155") {
                    vec![
                        json!({"prop": uri("P36"), "propLabel": literal("capital"), "item": uri("Q2844"),
                               "itemLabel": literal("Brasília"), "link": literal("outgoing")}),
                        json!({"prop": uri("P17"), "propLabel": literal("country"), "item": uri("Q3783"),
                               "itemLabel": literal("Amazon River"), "link": literal("incoming")}),
                        json!({"prop": uri("P17"), "propLabel": literal("country"), "item": uri("Q8678"),
                               "itemLabel": literal("Rio de Janeiro"), "link": literal("incoming")}),
                    ]
                } else {
                    vec![]
                };
                return Reply::Json(json!({"head": {"vars": ["prop", "item", "link"]}, "results": {"bindings": rows}}));
            }
            let rows = if query.contains("wd:Q937") {
                vec![
                    row("P31", "instance of", uri("Q5"), "human"),
                    row("P19", "place of birth", uri("Q3012"), "Ulm"),
                    row("P166", "award received", uri("Q38104"), "Nobel Prize in Physics"),
                    row("P166", "award received", uri("Q38104"), "Nobel Prize in Physics"),
                ]
            } else if query.contains("wd:Q155") {
                vec![
                    row("P31", "instance of", uri("Q6256"), "country"),
                    row("P36", "capital", uri("Q2844"), "Brasília"),
                    row("P625", "coordinate location", literal("Point(-53.0 -14.0)"), "Point(-53.0 -14.0)"),
                ]
            } else {
                vec![]
            };
            Reply::Json(json!({"head": {"vars": ["prop", "propLabel", "value", "valueLabel"]}, "results": {"bindings": rows}}))
        }
        SourceKind::Countries => {
            if req.url.ends_with("/name/Brazil") {
                Reply::Json(json!([{
                    "name": {"common": "Brazil", "official": "Federative Republic of Brazil"},
                    "capital": ["Brasília"],
                    "region": "Americas",
                    "subregion": "South America",
                    "population": 212559409,
                    "area": 8515767.0,
                    "flags": {"png": "https://flagcdn.example.test/br.png"},
                    "latlng": [-10.0, -55.0],
                    "cca3": "BRA"
                }]))
            } else {
                Reply::Fail(SourceError::NotFound)
            }
        }
        SourceKind::Weather => Reply::Json(json!({
            "current_weather": {
                "temperature": 24.5, "windspeed": 9.0, "winddirection": 120.0,
                "weathercode": 1, "is_day": 1, "time": "2024-06-01T12:00"
            }
        })),
        SourceKind::Media => {
            let pages: Vec<Value> = match p("gsrsearch").as_str() {
                "Brazil" => vec![
                    json!({"index": 1, "imageinfo": [{"url": "https://upload.example.test/Brazil_map.png", "mime": "image/png"}]}),
                    json!({"index": 2, "imageinfo": [{"url": "https://upload.example.test/Rio.jpg", "mime": "image/jpeg"}]}),
                ],
                "Albert Einstein" => vec![
                    json!({"index": 1, "imageinfo": [{"url": "https://upload.example.test/Einstein_1921.jpg", "mime": "image/jpeg"}]}),
                ],
                _ => vec![],
            };
            Reply::Json(json!({"query": {"pages": pages}}))
        }
    }
}
