use crate::config::toml_config::GeocodingSettings;
use crate::domain::model::{GeocodeHit, GeocodeSource};
use crate::domain::ports::Geocoder;
use crate::utils::error::{MapiesError, Result};
use crate::utils::validation::validate_coordinates;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

fn build_client(settings: &GeocodingSettings) -> Result<Client> {
    Ok(Client::builder()
        .timeout(settings.timeout())
        .user_agent(settings.user_agent.clone())
        .build()?)
}

fn checked_hit(
    lat: f64,
    lng: f64,
    formatted_address: Option<String>,
    source: GeocodeSource,
) -> Option<GeocodeHit> {
    if validate_coordinates(lat, lng).is_err() {
        tracing::warn!("⚠️ {:?} returned out-of-range coordinates ({}, {})", source, lat, lng);
        return None;
    }
    Some(GeocodeHit {
        lat,
        lng,
        formatted_address,
        source,
    })
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: Option<String>,
}

/// OpenStreetMap Nominatim 搜尋 API
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(settings: &GeocodingSettings) -> Result<Self> {
        Ok(Self {
            client: build_client(settings)?,
            base_url: settings.nominatim_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    fn name(&self) -> &str {
        "nominatim"
    }

    async fn geocode(&self, address: &str) -> Result<Option<GeocodeHit>> {
        let endpoint = format!("{}/search", self.base_url);
        tracing::debug!("📡 Nominatim lookup: {}", address);

        let response = self
            .client
            .get(&endpoint)
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MapiesError::GeocodingError {
                message: format!("Nominatim responded with status {}", response.status()),
            });
        }

        let places: Vec<NominatimPlace> = response.json().await?;
        let Some(place) = places.into_iter().next() else {
            return Ok(None);
        };

        match (place.lat.parse::<f64>(), place.lon.parse::<f64>()) {
            (Ok(lat), Ok(lng)) => Ok(checked_hit(
                lat,
                lng,
                place.display_name,
                GeocodeSource::Nominatim,
            )),
            _ => {
                tracing::warn!(
                    "⚠️ Nominatim returned unparsable coordinates: {} / {}",
                    place.lat,
                    place.lon
                );
                Ok(None)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct MapboxResponse {
    #[serde(default)]
    features: Vec<MapboxFeature>,
}

#[derive(Debug, Deserialize)]
struct MapboxFeature {
    center: Vec<f64>,
    place_name: Option<String>,
}

/// Mapbox Geocoding v5 (`mapbox.places`)
pub struct MapboxGeocoder {
    client: Client,
    base_url: Url,
    token: String,
}

impl MapboxGeocoder {
    /// 沒有設定 access token 時回傳 `None`
    pub fn from_settings(settings: &GeocodingSettings) -> Result<Option<Self>> {
        let Some(token) = settings.mapbox_token() else {
            return Ok(None);
        };

        let base_url = Url::parse(&settings.mapbox_url).map_err(|e| {
            MapiesError::InvalidConfigValueError {
                field: "geocoding.mapbox_url".to_string(),
                value: settings.mapbox_url.clone(),
                reason: e.to_string(),
            }
        })?;

        Ok(Some(Self {
            client: build_client(settings)?,
            base_url,
            token: token.to_string(),
        }))
    }

    fn endpoint(&self, address: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| MapiesError::ConfigError {
                message: format!("Mapbox URL cannot be a base: {}", self.base_url),
            })?
            .pop_if_empty()
            .extend(["geocoding", "v5", "mapbox.places"])
            .push(&format!("{}.json", address));
        Ok(url)
    }
}

#[async_trait]
impl Geocoder for MapboxGeocoder {
    fn name(&self) -> &str {
        "mapbox"
    }

    async fn geocode(&self, address: &str) -> Result<Option<GeocodeHit>> {
        let endpoint = self.endpoint(address)?;
        tracing::debug!("📡 Mapbox lookup: {}", address);

        let response = self
            .client
            .get(endpoint)
            .query(&[("access_token", self.token.as_str()), ("limit", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MapiesError::GeocodingError {
                message: format!("Mapbox responded with status {}", response.status()),
            });
        }

        let body: MapboxResponse = response.json().await?;
        let Some(feature) = body.features.into_iter().next() else {
            return Ok(None);
        };

        // Mapbox 的 center 是 [lng, lat]
        match feature.center.as_slice() {
            [lng, lat] => Ok(checked_hit(
                *lat,
                *lng,
                feature.place_name,
                GeocodeSource::Mapbox,
            )),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn settings_for(server: &MockServer) -> GeocodingSettings {
        GeocodingSettings {
            nominatim_url: server.base_url(),
            mapbox_url: server.base_url(),
            mapbox_token: Some("pk.test".to_string()),
            ..GeocodingSettings::default()
        }
    }

    #[tokio::test]
    async fn test_nominatim_parses_first_result() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/search")
                    .query_param("q", "10 Downing St, London")
                    .query_param("format", "json");
                then.status(200).json_body(serde_json::json!([
                    {"lat": "51.5034", "lon": "-0.1276", "display_name": "10 Downing Street"}
                ]));
            })
            .await;

        let geocoder = NominatimGeocoder::new(&settings_for(&server)).unwrap();
        let hit = geocoder
            .geocode("10 Downing St, London")
            .await
            .unwrap()
            .unwrap();

        mock.assert_async().await;
        assert_eq!(hit.source, GeocodeSource::Nominatim);
        assert!((hit.lat - 51.5034).abs() < 1e-9);
        assert!((hit.lng + 0.1276).abs() < 1e-9);
        assert_eq!(hit.formatted_address.as_deref(), Some("10 Downing Street"));
    }

    #[tokio::test]
    async fn test_nominatim_empty_result_is_miss() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/search");
                then.status(200).json_body(serde_json::json!([]));
            })
            .await;

        let geocoder = NominatimGeocoder::new(&settings_for(&server)).unwrap();
        assert!(geocoder.geocode("nowhere").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_nominatim_error_status_is_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/search");
                then.status(429);
            })
            .await;

        let geocoder = NominatimGeocoder::new(&settings_for(&server)).unwrap();
        let err = geocoder.geocode("anywhere").await.unwrap_err();
        assert!(matches!(err, MapiesError::GeocodingError { .. }));
    }

    #[tokio::test]
    async fn test_mapbox_reads_lng_lat_center() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path_contains("/geocoding/v5/mapbox.places/")
                    .query_param("access_token", "pk.test");
                then.status(200).json_body(serde_json::json!({
                    "features": [{"center": [-73.9857, 40.7484], "place_name": "Empire State Building"}]
                }));
            })
            .await;

        let geocoder = MapboxGeocoder::from_settings(&settings_for(&server))
            .unwrap()
            .unwrap();
        let hit = geocoder
            .geocode("350 5th Ave, New York")
            .await
            .unwrap()
            .unwrap();

        mock.assert_async().await;
        assert_eq!(hit.source, GeocodeSource::Mapbox);
        assert!((hit.lat - 40.7484).abs() < 1e-9);
        assert!((hit.lng + 73.9857).abs() < 1e-9);
    }

    #[test]
    fn test_mapbox_disabled_without_token() {
        let settings = GeocodingSettings::default();
        assert!(MapboxGeocoder::from_settings(&settings).unwrap().is_none());
    }

    #[test]
    fn test_mapbox_endpoint_encodes_address() {
        let settings = GeocodingSettings {
            mapbox_token: Some("pk.test".to_string()),
            ..GeocodingSettings::default()
        };
        let geocoder = MapboxGeocoder::from_settings(&settings).unwrap().unwrap();
        let url = geocoder.endpoint("1 Main St #4").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.mapbox.com/geocoding/v5/mapbox.places/1%20Main%20St%20%234.json"
        );
    }
}
