//! Renderings of a [`TopicRecord`]: text view, timeline, DOT graph, GeoJSON
//!
//! Every renderer copes with partially populated records; an absent field is
//! simply left out.

use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt::Write;

use crate::types::{Coordinates, EdgeDirection, NeighbourEdge, SourceConfidence, TopicRecord};

/// Widest histogram bar, in characters
const MAX_BAR: usize = 40;

/// Longest summary shown in the text view
const MAX_SUMMARY_CHARS: usize = 1200;

/// Human-readable view of the whole record
pub fn text_view(record: &TopicRecord) -> String {
    let mut out = String::new();
    let entity = &record.entity;

    let _ = writeln!(out, "{}", entity.display_title());
    let _ = writeln!(out, "{}", "=".repeat(entity.display_title().chars().count().max(3)));
    match (entity.knowledge_graph_id(), entity.source_confidence()) {
        (Some(id), SourceConfidence::Ambiguous) => {
            let _ = writeln!(out, "Knowledge graph: {} (best guess for \"{}\")", id, record.query);
        }
        (Some(id), _) => {
            let _ = writeln!(out, "Knowledge graph: {}", id);
        }
        (None, _) => {}
    }

    if let Some(summary) = &record.summary_text {
        let _ = writeln!(out, "\n{}", truncate_chars(summary, MAX_SUMMARY_CHARS));
    }

    if !record.infobox.is_empty() {
        let _ = writeln!(out, "\nInfobox");
        let width = record.infobox.keys().map(|k| k.chars().count()).max().unwrap_or(0);
        for (key, value) in &record.infobox {
            let _ = writeln!(out, "  {:<width$}  {}", key, value, width = width);
        }
    }

    if let Some(point) = &record.coordinates {
        let _ = writeln!(out, "\nCoordinates: {}", point);
    }

    if let Some(country) = &record.country_meta {
        let _ = writeln!(out, "\nCountry: {} ({})", country.common_name, country.official_name);
        if !country.capitals.is_empty() {
            let _ = writeln!(out, "  Capital:    {}", country.capitals.join(", "));
        }
        if let Some(region) = &country.region {
            match &country.subregion {
                Some(sub) => {
                    let _ = writeln!(out, "  Region:     {} / {}", region, sub);
                }
                None => {
                    let _ = writeln!(out, "  Region:     {}", region);
                }
            }
        }
        if let Some(population) = country.population {
            let _ = writeln!(out, "  Population: {}", group_thousands(population));
        }
        if let Some(area) = country.area_km2 {
            let _ = writeln!(out, "  Area:       {} km²", group_thousands(area.round() as u64));
        }
        if let Some(flag) = &country.flag_url {
            let _ = writeln!(out, "  Flag:       {}", flag);
        }
    }

    if let Some(weather) = &record.weather {
        let _ = writeln!(
            out,
            "\nWeather: {:.1} °C, wind {:.0} km/h from {:.0}°",
            weather.temperature_c, weather.windspeed_kmh, weather.wind_direction_deg
        );
        if let Some(at) = &weather.observed_at {
            let _ = writeln!(out, "  Observed {} UTC", at);
        }
    }

    if !record.relations.is_empty() {
        let _ = writeln!(out, "\nRelations ({})", record.relations.len());
        let mut last_property: Option<&str> = None;
        for edge in record.relations.sorted_for_display() {
            if last_property != Some(edge.property.as_str()) {
                let _ = writeln!(out, "  {} ({})", edge.property_label, edge.property);
                last_property = Some(edge.property.as_str());
            }
            let _ = writeln!(out, "    - {}", edge.target_label);
        }
    }

    if !record.images.is_empty() {
        let _ = writeln!(out, "\nImages");
        for url in &record.images {
            let _ = writeln!(out, "  {}", url);
        }
    }

    if !record.geo_mentions.is_empty() {
        let _ = writeln!(out, "\nPlaces mentioned ({})", record.geo_mentions.len());
        for mention in &record.geo_mentions {
            let _ = writeln!(out, "  {}  {}", mention.title, mention.coordinates);
        }
    }

    if !record.extracted_years.is_empty() {
        let _ = writeln!(out, "\nTimeline");
        out.push_str(&year_histogram(&record.extracted_years));
    }

    if !record.notices.is_empty() {
        let _ = writeln!(out, "\nUnavailable");
        for notice in &record.notices {
            let _ = writeln!(out, "  {}: {}", notice.field, notice.failure);
        }
    }

    out
}

/// Count of each year, ascending
pub fn year_counts(years: &[i32]) -> BTreeMap<i32, usize> {
    let mut counts = BTreeMap::new();
    for year in years {
        *counts.entry(*year).or_insert(0) += 1;
    }
    counts
}

/// One bar per distinct year, scaled to the most frequent year
pub fn year_histogram(years: &[i32]) -> String {
    let counts = year_counts(years);
    let peak = counts.values().copied().max().unwrap_or(0);
    let mut out = String::new();
    for (year, count) in counts {
        let width = (count * MAX_BAR).div_ceil(peak.max(1)).max(1);
        let _ = writeln!(out, "  {:>4} {} {}", year, "#".repeat(width), count);
    }
    out
}

/// Relationship graph in Graphviz DOT
///
/// The entity is the centre node. The record's relations and the outgoing
/// `neighbours` point away from it; incoming `neighbours` point at it. Edges
/// are labelled with the property label, and nodes sharing an id are drawn
/// once.
pub fn relation_graph_dot(record: &TopicRecord, neighbours: &[NeighbourEdge]) -> String {
    let entity = &record.entity;
    let centre = entity.knowledge_graph_id().unwrap_or("topic");

    let mut out = String::new();
    let _ = writeln!(out, "digraph \"{}\" {{", escape(centre));
    let _ = writeln!(out, "  rankdir=LR;");
    let _ = writeln!(
        out,
        "  \"{}\" [label=\"{}\", shape=box, style=bold];",
        escape(centre),
        escape(entity.display_title())
    );

    let relations = record.relations.sorted_for_display().into_iter().map(|e| {
        (EdgeDirection::Outgoing, e.property_label.as_str(), e.target_id.as_str(), e.target_label.as_str())
    });
    let wider = neighbours.iter().map(|e| {
        (e.direction, e.property_label.as_str(), e.other_id.as_str(), e.other_label.as_str())
    });

    let mut nodes: Vec<(&str, &str)> = Vec::new();
    let mut edges: Vec<(EdgeDirection, &str, &str)> = Vec::new();
    for (direction, property_label, other_id, other_label) in relations.chain(wider) {
        if other_id != centre && !nodes.iter().any(|(id, _)| *id == other_id) {
            nodes.push((other_id, other_label));
        }
        let edge = (direction, other_id, property_label);
        if !edges.contains(&edge) {
            edges.push(edge);
        }
    }

    for (id, label) in &nodes {
        let _ = writeln!(out, "  \"{}\" [label=\"{}\"];", escape(id), escape(label));
    }
    for (direction, other, label) in &edges {
        let (from, to) = match direction {
            EdgeDirection::Outgoing => (centre, *other),
            EdgeDirection::Incoming => (*other, centre),
        };
        let _ = writeln!(
            out,
            "  \"{}\" -> \"{}\" [label=\"{}\"];",
            escape(from),
            escape(to),
            escape(label)
        );
    }
    out.push_str("}\n");
    out
}

/// Topic point and geographic mentions as a GeoJSON `FeatureCollection`
pub fn geo_mentions_geojson(record: &TopicRecord) -> Value {
    let topic = record.coordinates.map(|point| {
        feature(
            point,
            json!({
                "title": record.entity.display_title(),
                "id": record.entity.knowledge_graph_id(),
                "role": "topic",
            }),
        )
    });
    let mentions = record.geo_mentions.iter().map(|mention| {
        feature(
            mention.coordinates,
            json!({
                "title": mention.title,
                "id": mention.knowledge_graph_id,
                "role": "mention",
            }),
        )
    });
    let features: Vec<Value> = topic.into_iter().chain(mentions).collect();
    json!({ "type": "FeatureCollection", "features": features })
}

fn feature(point: Coordinates, properties: Value) -> Value {
    json!({
        "type": "Feature",
        "geometry": { "type": "Point", "coordinates": [point.lon, point.lat] },
        "properties": properties,
    })
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', " ")
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}…", text[..cut].trim_end()),
        None => text.to_string(),
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
