use crate::adapters::http::{MapboxGeocoder, NominatimGeocoder};
use crate::config::toml_config::GeocodingSettings;
use crate::domain::model::GeocodeHit;
use crate::domain::ports::Geocoder;
use crate::utils::error::Result;
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

fn unit_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)\b\d+(?:st|nd|rd|th)\s+(?:floor|fl)\b\.?",
            r"(?i)\b(?:suite|ste|apt|apartment|unit|floor|room|rm|bldg|building)\b\.?\s*#?\s*[\w-]+",
            r"(?i)\b(?:suite|ste|apt|apartment|unit|floor|room|rm|bldg|building)\d[\w-]*",
            // 全大寫的 FL 是州名縮寫，不當成樓層
            r"\b[Ff]l\b\.?\s*#?\s*[\w-]+",
            r"#\s*[\w-]+",
        ]
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
    })
}

fn split_parts(address: &str) -> Vec<String> {
    address
        .split(',')
        .map(|part| part.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|part| !part.is_empty())
        .collect()
}

/// 地址改寫順序：原始地址、去除門牌單位的清理版、去掉街道的行政區版
pub fn address_variations(address: &str) -> Vec<String> {
    let original = address.trim().to_string();
    if original.is_empty() {
        return Vec::new();
    }

    let mut stripped = original.clone();
    for pattern in unit_patterns() {
        stripped = pattern.replace_all(&stripped, "").to_string();
    }
    let parts = split_parts(&stripped);

    let mut variations = vec![original];
    let cleaned = parts.join(", ");
    if !cleaned.is_empty() {
        variations.push(cleaned);
    }
    if parts.len() >= 3 {
        variations.push(parts[1..].join(", "));
    }

    let mut unique: Vec<String> = Vec::with_capacity(variations.len());
    for variation in variations {
        if !unique.iter().any(|seen| seen.eq_ignore_ascii_case(&variation)) {
            unique.push(variation);
        }
    }
    unique
}

/// 依序嘗試多個供應商（Nominatim → Mapbox），失敗時改寫地址並固定延遲重試
pub struct GeocodingChain {
    providers: Vec<Box<dyn Geocoder>>,
    max_attempts: u32,
    retry_delay: Duration,
    provider_delay: Duration,
}

impl GeocodingChain {
    pub fn new(providers: Vec<Box<dyn Geocoder>>, settings: &GeocodingSettings) -> Self {
        Self {
            providers,
            max_attempts: settings.max_attempts.max(1),
            retry_delay: settings.retry_delay(),
            provider_delay: settings.provider_delay(),
        }
    }

    pub fn from_settings(settings: &GeocodingSettings) -> Result<Self> {
        let mut providers: Vec<Box<dyn Geocoder>> =
            vec![Box::new(NominatimGeocoder::new(settings)?)];
        match MapboxGeocoder::from_settings(settings)? {
            Some(mapbox) => providers.push(Box::new(mapbox)),
            None => tracing::warn!("⚠️ MAPBOX token not configured, Nominatim is the only geocoder"),
        }
        Ok(Self::new(providers, settings))
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub async fn resolve(&self, address: &str) -> Option<GeocodeHit> {
        let variations = address_variations(address);
        if variations.is_empty() || self.providers.is_empty() {
            return None;
        }

        for attempt in 1..=self.max_attempts {
            let index = (attempt as usize - 1).min(variations.len() - 1);
            let query = &variations[index];

            for (i, provider) in self.providers.iter().enumerate() {
                if i > 0 && !self.provider_delay.is_zero() {
                    tokio::time::sleep(self.provider_delay).await;
                }

                match provider.geocode(query).await {
                    Ok(Some(hit)) => {
                        tracing::debug!(
                            "📍 {} resolved '{}' on attempt {} -> ({}, {})",
                            provider.name(),
                            query,
                            attempt,
                            hit.lat,
                            hit.lng
                        );
                        return Some(hit);
                    }
                    Ok(None) => {
                        tracing::debug!("{} found no match for '{}'", provider.name(), query);
                    }
                    Err(e) => {
                        tracing::warn!(
                            "⚠️ {} lookup failed for '{}' (attempt {}): {}",
                            provider.name(),
                            query,
                            attempt,
                            e
                        );
                    }
                }
            }

            if attempt < self.max_attempts && !self.retry_delay.is_zero() {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        tracing::warn!(
            "❌ Could not geocode '{}' after {} attempts",
            address,
            self.max_attempts
        );
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::GeocodeSource;
    use crate::utils::error::MapiesError;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// 依查詢字串回應的假供應商，並記錄所有查詢
    struct ScriptedGeocoder {
        name: &'static str,
        answers: Vec<(&'static str, Option<(f64, f64)>)>,
        fail_transport: bool,
        queries: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedGeocoder {
        fn new(name: &'static str, queries: Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                name,
                answers: Vec::new(),
                fail_transport: false,
                queries,
            }
        }

        fn answer(mut self, query: &'static str, coords: (f64, f64)) -> Self {
            self.answers.push((query, Some(coords)));
            self
        }

        fn failing(mut self) -> Self {
            self.fail_transport = true;
            self
        }
    }

    #[async_trait]
    impl Geocoder for ScriptedGeocoder {
        fn name(&self) -> &str {
            self.name
        }

        async fn geocode(&self, address: &str) -> Result<Option<GeocodeHit>> {
            self.queries
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, address));
            if self.fail_transport {
                return Err(MapiesError::GeocodingError {
                    message: "connection reset".to_string(),
                });
            }
            Ok(self
                .answers
                .iter()
                .find(|(query, _)| *query == address)
                .and_then(|(_, coords)| *coords)
                .map(|(lat, lng)| GeocodeHit {
                    lat,
                    lng,
                    formatted_address: None,
                    source: if self.name == "mapbox" {
                        GeocodeSource::Mapbox
                    } else {
                        GeocodeSource::Nominatim
                    },
                }))
        }
    }

    fn instant_settings() -> GeocodingSettings {
        GeocodingSettings {
            retry_delay_ms: 0,
            provider_delay_ms: 0,
            request_delay_ms: 0,
            ..GeocodingSettings::default()
        }
    }

    #[test]
    fn test_address_variations_strip_units_and_drop_street() {
        let variations = address_variations("123 Main St, Suite 400, Springfield, IL 62701");
        assert_eq!(
            variations,
            vec![
                "123 Main St, Suite 400, Springfield, IL 62701".to_string(),
                "123 Main St, Springfield, IL 62701".to_string(),
                "Springfield, IL 62701".to_string(),
            ]
        );
    }

    #[test]
    fn test_address_variations_keep_state_abbreviations() {
        let variations = address_variations("200 Ocean Dr #12, Miami, FL 33139");
        assert_eq!(variations[1], "200 Ocean Dr, Miami, FL 33139");
        assert_eq!(variations[2], "Miami, FL 33139");
    }

    #[test]
    fn test_address_variations_strip_floors_and_lettered_units() {
        let variations = address_variations("10 Market St, Fl 2, Denver, CO");
        assert_eq!(variations[1], "10 Market St, Denver, CO");
        assert_eq!(variations[2], "Denver, CO");

        for (address, cleaned) in [
            ("5 Pine Rd, Suite A, Boise, ID", "5 Pine Rd, Boise, ID"),
            ("5 Pine Rd Unit B-2, Boise, ID", "5 Pine Rd, Boise, ID"),
            ("5 Pine Rd, 3rd Floor, Boise, ID", "5 Pine Rd, Boise, ID"),
            ("5 Pine Rd Apt4, Boise, ID", "5 Pine Rd, Boise, ID"),
            ("5 Pine Rd, fl. 7, Tampa, FL 33602", "5 Pine Rd, Tampa, FL 33602"),
        ] {
            assert_eq!(address_variations(address)[1], cleaned, "{}", address);
        }

        // 街名中包含單位字首時不誤刪
        assert_eq!(
            address_variations("7 United Way, Floral Park, NY"),
            vec![
                "7 United Way, Floral Park, NY".to_string(),
                "Floral Park, NY".to_string(),
            ]
        );
    }

    #[test]
    fn test_address_variations_deduplicate() {
        assert_eq!(address_variations("Paris"), vec!["Paris".to_string()]);
        assert!(address_variations("   ").is_empty());
    }

    #[tokio::test]
    async fn test_first_provider_hit_wins() {
        let queries = Arc::new(Mutex::new(Vec::new()));
        let chain = GeocodingChain::new(
            vec![
                Box::new(ScriptedGeocoder::new("nominatim", queries.clone()).answer("Oslo", (59.91, 10.75))),
                Box::new(ScriptedGeocoder::new("mapbox", queries.clone())),
            ],
            &instant_settings(),
        );

        let hit = chain.resolve("Oslo").await.unwrap();
        assert_eq!(hit.source, GeocodeSource::Nominatim);
        assert_eq!(*queries.lock().unwrap(), vec!["nominatim:Oslo".to_string()]);
    }

    #[tokio::test]
    async fn test_falls_back_to_mapbox_then_rewrites_address() {
        let queries = Arc::new(Mutex::new(Vec::new()));
        let chain = GeocodingChain::new(
            vec![
                Box::new(ScriptedGeocoder::new("nominatim", queries.clone()).failing()),
                Box::new(
                    ScriptedGeocoder::new("mapbox", queries.clone())
                        .answer("1 Elm St, Austin, TX", (30.27, -97.74)),
                ),
            ],
            &instant_settings(),
        );

        let hit = chain.resolve("1 Elm St, Apt 5, Austin, TX").await.unwrap();
        assert_eq!(hit.source, GeocodeSource::Mapbox);
        assert_eq!(
            *queries.lock().unwrap(),
            vec![
                "nominatim:1 Elm St, Apt 5, Austin, TX".to_string(),
                "mapbox:1 Elm St, Apt 5, Austin, TX".to_string(),
                "nominatim:1 Elm St, Austin, TX".to_string(),
                "mapbox:1 Elm St, Austin, TX".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let queries = Arc::new(Mutex::new(Vec::new()));
        let chain = GeocodingChain::new(
            vec![
                Box::new(ScriptedGeocoder::new("nominatim", queries.clone())),
                Box::new(ScriptedGeocoder::new("mapbox", queries.clone())),
            ],
            &instant_settings(),
        );

        assert!(chain.resolve("Nowhere Lane").await.is_none());
        // 3 次嘗試 × 2 個供應商
        assert_eq!(queries.lock().unwrap().len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_waits_fixed_backoff() {
        let queries = Arc::new(Mutex::new(Vec::new()));
        let settings = GeocodingSettings {
            provider_delay_ms: 0,
            ..GeocodingSettings::default()
        };
        let chain = GeocodingChain::new(
            vec![Box::new(ScriptedGeocoder::new("nominatim", queries.clone()))],
            &settings,
        );

        let started = tokio::time::Instant::now();
        assert!(chain.resolve("Nowhere").await.is_none());
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(4000));
        assert!(elapsed < Duration::from_millis(4100));
    }
}
