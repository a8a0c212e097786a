//! Country metadata adapter (REST Countries v3.1)
//!
//! `GET /name/{name}?fullText=true` with a field filter. A 404 means no
//! country has that name and is reported as "nothing found".
//!
//! API Documentation: https://restcountries.com

use serde::Deserialize;
use tracing::debug;

use super::{SourceClient, SourceError, SourceKind, UpstreamRequest};
use crate::types::{Coordinates, CountryMeta};

/// Fields requested from the service
const FIELDS: &str = "name,capital,region,subregion,population,area,flags,latlng,cca3";

#[derive(Debug, Deserialize)]
struct RawCountry {
    name: RawName,
    #[serde(default)]
    capital: Vec<String>,
    region: Option<String>,
    subregion: Option<String>,
    population: Option<u64>,
    area: Option<f64>,
    flags: Option<RawFlags>,
    #[serde(default)]
    latlng: Vec<f64>,
    cca3: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawName {
    common: String,
    #[serde(default)]
    official: String,
}

#[derive(Debug, Deserialize)]
struct RawFlags {
    png: Option<String>,
    svg: Option<String>,
}

impl From<RawCountry> for CountryMeta {
    fn from(raw: RawCountry) -> Self {
        let coordinates = match raw.latlng.as_slice() {
            [lat, lon, ..] => Coordinates::new(*lat, *lon),
            _ => None,
        };
        CountryMeta {
            official_name: if raw.name.official.is_empty() {
                raw.name.common.clone()
            } else {
                raw.name.official
            },
            common_name: raw.name.common,
            capitals: raw.capital,
            region: raw.region.filter(|r| !r.is_empty()),
            subregion: raw.subregion.filter(|r| !r.is_empty()),
            population: raw.population,
            area_km2: raw.area.filter(|a| *a > 0.0),
            flag_url: raw.flags.and_then(|f| f.png.or(f.svg)),
            coordinates,
            cca3: raw.cca3,
        }
    }
}

/// REST Countries client
#[derive(Clone)]
pub struct CountrySource {
    client: SourceClient,
    base_url: String,
}

impl CountrySource {
    pub fn new(client: SourceClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Metadata for the country called exactly `name`
    pub async fn by_name(&self, name: &str) -> Result<Option<CountryMeta>, SourceError> {
        let url = format!("{}/name/{}", self.base_url, name.trim());
        let request = UpstreamRequest::get(SourceKind::Countries, url)
            .param("fullText", "true")
            .param("fields", FIELDS);

        let countries: Vec<RawCountry> = match self.client.get_decoded(request).await {
            Ok(countries) => countries,
            Err(SourceError::NotFound) => {
                debug!(name = %name, "No country with that name");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let wanted = name.trim().to_lowercase();
        let mut countries = countries.into_iter();
        let first = countries.next();
        let exact = countries.find(|c| c.name.common.to_lowercase() == wanted);

        let chosen = match first {
            Some(c) if c.name.common.to_lowercase() == wanted => Some(c),
            other => exact.or(other),
        };
        Ok(chosen.map(CountryMeta::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::testing::client_with;
    use serde_json::json;

    fn brazil() -> serde_json::Value {
        json!({
            "name": {"common": "Brazil", "official": "Federative Republic of Brazil", "nativeName": {}},
            "capital": ["Brasília"],
            "region": "Americas",
            "subregion": "South America",
            "population": 212559409,
            "area": 8515767.0,
            "flags": {"png": "https://flagcdn.com/w320/br.png", "svg": "https://flagcdn.com/br.svg"},
            "latlng": [-10.0, -55.0],
            "cca3": "BRA"
        })
    }

    #[tokio::test]
    async fn test_by_name_normalizes_record() {
        let (client, _) = client_with(|req| {
            assert_eq!(req.url, "https://example.test/v3.1/name/Brazil");
            assert_eq!(req.param_value("fullText"), Some("true"));
            Ok(json!([brazil()]))
        });
        let source = CountrySource::new(client, "https://example.test/v3.1/");
        let meta = source.by_name("Brazil").await.unwrap().unwrap();

        assert_eq!(meta.common_name, "Brazil");
        assert_eq!(meta.official_name, "Federative Republic of Brazil");
        assert_eq!(meta.capitals, vec!["Brasília"]);
        assert_eq!(meta.population, Some(212_559_409));
        assert_eq!(meta.flag_url.as_deref(), Some("https://flagcdn.com/w320/br.png"));
        assert_eq!(meta.coordinates, Coordinates::new(-10.0, -55.0));
        assert_eq!(meta.cca3.as_deref(), Some("BRA"));
    }

    #[tokio::test]
    async fn test_not_found_is_none() {
        let (client, _) = client_with(|_| Err(SourceError::NotFound));
        let source = CountrySource::new(client, "https://example.test/v3.1");
        assert_eq!(source.by_name("Atlantis").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_prefers_exact_common_name() {
        let (client, _) = client_with(|_| {
            Ok(json!([
                {"name": {"common": "Guinea-Bissau", "official": "Republic of Guinea-Bissau"}},
                {"name": {"common": "Guinea", "official": "Republic of Guinea"}, "latlng": [11.0, -10.0]}
            ]))
        });
        let source = CountrySource::new(client, "https://example.test/v3.1");
        let meta = source.by_name("guinea").await.unwrap().unwrap();
        assert_eq!(meta.common_name, "Guinea");
        assert!(meta.capitals.is_empty());
        assert_eq!(meta.flag_url, None);
    }

    #[tokio::test]
    async fn test_unexpected_shape_is_parse_error() {
        let (client, _) = client_with(|_| Ok(json!({"status": 200, "message": "odd"})));
        let source = CountrySource::new(client, "https://example.test/v3.1");
        assert!(matches!(source.by_name("Peru").await, Err(SourceError::Parse(_))));
    }
}
