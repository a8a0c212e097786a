//! Enrichment orchestrator
//!
//! Turns one query into one [`TopicRecord`]:
//!
//! 1. Resolve the entity (search + page properties)
//! 2. Page details: summary, thumbnail, infobox, page coordinates
//! 3. Country metadata, if the query or title looks like a country
//! 4. Relations, if the entity has a knowledge-graph id
//! 5. Weather, if any coordinates are known (page, country, then `P625`)
//! 6. Images, page thumbnail first
//! 7. Geographic mentions: linked pages with a coordinate location
//! 8. Years mentioned in the summary
//!
//! Steps run one after another, each under the per-call timeout. A failed
//! step leaves its field empty and adds a notice; it never stops the steps
//! after it. Only a failed search yields no record at all.
//!
//! The wider graph neighbourhood is not part of the record; callers ask for
//! it with [`Orchestrator::neighbourhood`] when drawing a graph.

use chrono::Datelike;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use wenc_common::{Clock, WencConfig};

use crate::analysis::{extract_years, match_country, plausible_range};
use crate::cache::ResponseCache;
use crate::error::{RelationError, ResolveError, TopicError};
use crate::mentions::GeoMentionFetcher;
use crate::relations::{Neighbourhood, RelationFetcher};
use crate::resolver::EntityResolver;
use crate::session::{QueryTicket, Session};
use crate::sources::countries::CountrySource;
use crate::sources::encyclopedia::EncyclopediaSource;
use crate::sources::knowledge_graph::KnowledgeGraphSource;
use crate::sources::media::MediaSource;
use crate::sources::weather::WeatherSource;
use crate::sources::{with_deadline, HttpFetch, SourceClient, SourceError, SourceKind};
use crate::types::{
    Coordinates, FailureKind, GeoMention, RelationSet, SoftFailure, StepResult, TopicField, TopicOutcome,
    TopicRecord,
};

/// Knowledge-graph property holding an entity's coordinate location
const COORDINATE_PROPERTY: &str = "P625";

/// Sequences the upstream calls for one topic and merges the answers
#[derive(Clone)]
pub struct Orchestrator {
    resolver: EntityResolver,
    encyclopedia: EncyclopediaSource,
    countries: CountrySource,
    weather: WeatherSource,
    media: MediaSource,
    relations: RelationFetcher,
    mentions: GeoMentionFetcher,
    cache: Arc<ResponseCache>,
    clock: Arc<dyn Clock>,
    call_timeout: Duration,
    max_images: usize,
    max_geo_mentions: usize,
}

/// Staleness check for runs tied to a session
struct Run<'a> {
    session: Option<(&'a Session, QueryTicket)>,
}

impl Run<'_> {
    fn is_stale(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|(session, ticket)| !session.is_current(ticket))
    }
}

impl Orchestrator {
    /// Wire all adapters over one transport and one fresh response cache
    pub fn new(config: &WencConfig, transport: Arc<dyn HttpFetch>, clock: Arc<dyn Clock>) -> Self {
        let cache = Arc::new(ResponseCache::new(config.cache_ttl(), clock.clone()));
        let client = SourceClient::new(transport, cache.clone())
            .with_ttl(SourceKind::Weather, config.weather_cache_ttl());
        let endpoints = &config.endpoints;
        let call_timeout = config.request_timeout();

        let encyclopedia = EncyclopediaSource::new(
            client.clone(),
            endpoints.encyclopedia.as_str(),
            config.search_limit,
        );
        let knowledge_graph = KnowledgeGraphSource::new(client.clone(), endpoints.knowledge_graph.as_str());

        let mut resolver = EntityResolver::new(encyclopedia.clone(), call_timeout);
        if config.label_search_fallback {
            resolver = resolver.with_label_fallback(knowledge_graph.clone());
        }

        Self {
            resolver,
            encyclopedia: encyclopedia.clone(),
            countries: CountrySource::new(client.clone(), endpoints.countries.as_str()),
            weather: WeatherSource::new(client.clone(), endpoints.weather.as_str()),
            media: MediaSource::new(client, endpoints.media.as_str()),
            relations: RelationFetcher::new(knowledge_graph.clone(), config.max_relations, call_timeout)
                .with_graph_edges(config.max_graph_edges),
            mentions: GeoMentionFetcher::new(
                encyclopedia.clone(),
                knowledge_graph,
                config.max_geo_mentions,
                call_timeout,
            ),
            cache,
            clock,
            call_timeout,
            max_images: config.max_images,
            max_geo_mentions: config.max_geo_mentions,
        }
    }

    /// Response cache shared by every adapter
    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Title of a random encyclopedia article, never cached
    pub async fn random_title(&self) -> Result<Option<String>, SourceError> {
        with_deadline(self.call_timeout, self.encyclopedia.random_title()).await
    }

    /// Incoming and outgoing edges around the record's entity, for graphs
    ///
    /// Capped separately from the record's relations. Untracked entities
    /// have an empty neighbourhood.
    pub async fn neighbourhood(&self, record: &TopicRecord) -> Neighbourhood {
        let Some(id) = record.entity.knowledge_graph_id() else {
            return Neighbourhood::default();
        };
        match self.relations.neighbourhood(id).await {
            Ok(neighbourhood) => neighbourhood,
            Err(RelationError::InvalidInput(id)) => Neighbourhood {
                edges: Vec::new(),
                failure: Some(unusable_id(&id)),
            },
        }
    }

    /// Build the record for `query`
    pub async fn resolve_topic(&self, query: &str) -> Result<TopicOutcome, TopicError> {
        let query = validate_query(query)?;
        let outcome = self.run(query, Run { session: None }).await;
        // Without a session nothing can supersede the run
        Ok(outcome.unwrap_or(TopicOutcome::NoResults))
    }

    /// Build the record for `query` as the session's newest query
    ///
    /// Returns `Ok(None)` when a newer query started before this one
    /// finished; its result is then dropped and never displayed. Otherwise
    /// the session displays the found record, or nothing when there is none.
    pub async fn resolve_topic_in(
        &self,
        session: &Session,
        query: &str,
    ) -> Result<Option<TopicOutcome>, TopicError> {
        let query = validate_query(query)?;
        let ticket = session.begin();
        let Some(outcome) = self.run(query, Run { session: Some((session, ticket)) }).await else {
            debug!(query = %query, generation = ticket.generation(), "Query superseded");
            return Ok(None);
        };

        if !session.publish(&ticket, outcome.record().cloned()) {
            return Ok(None);
        }
        Ok(Some(outcome))
    }

    /// `None` once the run has gone stale
    async fn run(&self, query: &str, run: Run<'_>) -> Option<TopicOutcome> {
        let resolution = match self.resolver.resolve(query).await {
            Ok(Some(resolution)) => resolution,
            Ok(None) => {
                info!(query = %query, "No results");
                return Some(TopicOutcome::NoResults);
            }
            Err(ResolveError::InvalidInput(_)) => return Some(TopicOutcome::NoResults),
            Err(ResolveError::Source(e)) => {
                warn!(query = %query, error = %e, "Search unavailable");
                return Some(TopicOutcome::Unavailable { failure: e.into() });
            }
        };
        if run.is_stale() {
            return None;
        }

        let mut record = TopicRecord::new(query, resolution.entity, self.clock.now());
        if let Some(failure) = resolution.notice {
            record.note_failure(TopicField::Entity, failure);
        }
        let title = record.entity.display_title().to_string();

        // Page details
        let summary = self.step(TopicField::Summary, self.encyclopedia.summary(&title)).await;
        let mut thumbnail = None;
        if let Some(summary) = merge(&mut record, TopicField::Summary, summary) {
            record.summary_text = summary.extract;
            thumbnail = summary.thumbnail;
        }
        if run.is_stale() {
            return None;
        }

        let details = self.step(TopicField::Infobox, self.encyclopedia.page_details(&title)).await;
        let mut page_point = None;
        if let Some(details) = merge(&mut record, TopicField::Infobox, details) {
            record.infobox = details.infobox;
            page_point = details.coordinates;
        }
        record.coordinates = page_point;
        if run.is_stale() {
            return None;
        }

        // Country
        let country = match match_country(query).or_else(|| match_country(&title)) {
            Some(name) => {
                debug!(name = %name, "Query looks like a country");
                self.step(TopicField::Country, self.countries.by_name(name)).await
            }
            None => StepResult::Skipped,
        };
        let country_meta = merge(&mut record, TopicField::Country, country);
        record.country_meta = country_meta;
        if run.is_stale() {
            return None;
        }

        // Relations
        let relations = match record.entity.knowledge_graph_id() {
            Some(id) => self.fetch_relations(id).await,
            None => StepResult::Skipped,
        };
        if let Some(edges) = merge(&mut record, TopicField::Relations, relations) {
            record.relations = edges;
        }
        let graph_point = record
            .relations
            .with_property(COORDINATE_PROPERTY)
            .find_map(|edge| Coordinates::from_wkt_point(&edge.target_id));
        if record.coordinates.is_none() {
            record.coordinates = graph_point;
        }
        if run.is_stale() {
            return None;
        }

        // Weather
        let weather_point = page_point
            .or_else(|| record.country_meta.as_ref().and_then(|c| c.coordinates))
            .or(graph_point);
        let weather = match weather_point {
            Some(point) => self.step(TopicField::Weather, self.weather.current(point)).await,
            None => StepResult::Skipped,
        };
        let weather = merge(&mut record, TopicField::Weather, weather);
        record.weather = weather;
        if run.is_stale() {
            return None;
        }

        // Images
        let images = if self.max_images == 0 {
            StepResult::Skipped
        } else {
            let call = self.media.images_for(&title, self.max_images);
            self.step(TopicField::Images, async move { call.await.map(Some) }).await
        };
        let found = merge(&mut record, TopicField::Images, images).unwrap_or_default();
        record.images = lead_with_thumbnail(thumbnail, found, self.max_images);
        if run.is_stale() {
            return None;
        }

        // Geographic mentions
        let mentions = if self.max_geo_mentions == 0 {
            StepResult::Skipped
        } else {
            self.fetch_mentions(&title).await
        };
        if let Some(mentions) = merge(&mut record, TopicField::GeoMentions, mentions) {
            record.geo_mentions = mentions;
        }

        // Years
        if let Some(text) = &record.summary_text {
            let current_year = self.clock.now().year();
            record.extracted_years = extract_years(text, plausible_range(current_year));
        }

        if run.is_stale() {
            return None;
        }
        info!(
            query = %query,
            title = %title,
            relations = record.relations.len(),
            images = record.images.len(),
            geo_mentions = record.geo_mentions.len(),
            degraded = record.notices.len(),
            "Topic resolved"
        );
        Some(TopicOutcome::Found {
            record: Box::new(record),
        })
    }

    /// One upstream lookup under the per-call timeout
    async fn step<T, F>(&self, field: TopicField, call: F) -> StepResult<T>
    where
        F: Future<Output = Result<Option<T>, SourceError>>,
    {
        let result = StepResult::from_lookup(with_deadline(self.call_timeout, call).await);
        match &result {
            StepResult::Failed(failure) => warn!(field = %field, failure = %failure, "Step degraded"),
            StepResult::NoResult => debug!(field = %field, "Step found nothing"),
            _ => {}
        }
        result
    }

    async fn fetch_relations(&self, id: &str) -> StepResult<RelationSet> {
        match self.relations.fetch(id).await {
            Ok(outcome) => match outcome.failure {
                Some(failure) => StepResult::Failed(failure),
                None if outcome.edges.is_empty() => StepResult::NoResult,
                None => StepResult::Fetched(outcome.edges),
            },
            Err(RelationError::InvalidInput(id)) => StepResult::Failed(unusable_id(&id)),
        }
    }

    /// Runs its own per-call deadlines, one per upstream call
    async fn fetch_mentions(&self, title: &str) -> StepResult<Vec<GeoMention>> {
        let result = StepResult::from_lookup(self.mentions.fetch(title).await);
        if let StepResult::Failed(failure) = &result {
            warn!(field = %TopicField::GeoMentions, failure = %failure, "Step degraded");
        }
        result
    }
}

fn unusable_id(id: &str) -> SoftFailure {
    SoftFailure::new(
        FailureKind::Malformed,
        format!("encyclopedia returned an unusable knowledge-graph id {id:?}"),
    )
}

fn validate_query(query: &str) -> Result<&str, TopicError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(TopicError::InvalidInput("query is empty".to_string()));
    }
    Ok(query)
}

/// Fold a step into the record: failures become notices, values are returned
fn merge<T>(record: &mut TopicRecord, field: TopicField, result: StepResult<T>) -> Option<T> {
    match result {
        StepResult::Fetched(value) => Some(value),
        StepResult::NoResult | StepResult::Skipped => None,
        StepResult::Failed(failure) => {
            record.note_failure(field, failure);
            None
        }
    }
}

/// `thumbnail` first, then `found` without repeats, at most `max` URLs
fn lead_with_thumbnail(thumbnail: Option<String>, found: Vec<String>, max: usize) -> Vec<String> {
    let mut images: Vec<String> = Vec::with_capacity(max);
    for url in thumbnail.into_iter().chain(found) {
        if images.len() >= max {
            break;
        }
        if !images.contains(&url) {
            images.push(url);
        }
    }
    images
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityReference;
    use chrono::Utc;

    #[test]
    fn test_merge_records_failures_only() {
        let mut record = TopicRecord::new("q", EntityReference::untracked("q"), Utc::now());
        assert_eq!(merge(&mut record, TopicField::Weather, StepResult::Fetched(1)), Some(1));
        assert_eq!(merge::<u8>(&mut record, TopicField::Weather, StepResult::NoResult), None);
        assert_eq!(merge::<u8>(&mut record, TopicField::Weather, StepResult::Skipped), None);
        assert!(!record.is_degraded());

        let failure = SoftFailure::new(FailureKind::Timeout, "slow");
        assert_eq!(merge::<u8>(&mut record, TopicField::Country, StepResult::Failed(failure)), None);
        assert_eq!(record.notice_for(TopicField::Country).unwrap().failure.kind, FailureKind::Timeout);
    }

    #[test]
    fn test_thumbnail_leads_and_cap_holds() {
        let found = vec!["b".to_string(), "a".to_string(), "c".to_string()];
        assert_eq!(
            lead_with_thumbnail(Some("a".to_string()), found.clone(), 3),
            vec!["a", "b", "c"]
        );
        assert_eq!(lead_with_thumbnail(None, found.clone(), 2), vec!["b", "a"]);
        assert!(lead_with_thumbnail(Some("a".to_string()), found, 0).is_empty());
    }

    #[test]
    fn test_validate_query_trims() {
        assert_eq!(validate_query("  Brazil \n"), Ok("Brazil"));
        assert!(matches!(validate_query(" \t "), Err(TopicError::InvalidInput(_))));
    }
}
