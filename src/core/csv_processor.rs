use crate::config::toml_config::ImportSettings;
use crate::core::geocoding::GeocodingChain;
use crate::core::maps::MapService;
use crate::core::plans::{limits_for, remaining_markers};
use crate::domain::model::{
    markers_collection, new_id, ColumnMapping, CsvRow, CsvUploadJob, GeocodeSource, JobStatus,
    JobSummary, Marker, RowError, CSV_JOBS,
};
use crate::domain::ports::Storage;
use crate::utils::error::{MapiesError, Result};
use crate::utils::monitor::JobMonitor;
use crate::utils::validation::validate_coordinates;
use chrono::Utc;
use std::collections::HashSet;
use std::time::Duration;

const NAME_ALIASES: &[&str] = &[
    "name",
    "title",
    "business name",
    "business",
    "location name",
    "store name",
    "company",
];
const ADDRESS_ALIASES: &[&str] = &[
    "address",
    "street",
    "street address",
    "address1",
    "address line 1",
    "addr",
    "full address",
];
const CITY_ALIASES: &[&str] = &["city", "town", "locality"];
const STATE_ALIASES: &[&str] = &["state", "province", "region", "state/province"];
const ZIP_ALIASES: &[&str] = &["zip", "zipcode", "zip code", "postal code", "postcode", "postal"];
const COUNTRY_ALIASES: &[&str] = &["country", "country code"];
const LAT_ALIASES: &[&str] = &["lat", "latitude", "y"];
const LNG_ALIASES: &[&str] = &["lng", "lon", "long", "longitude", "x"];
const CATEGORY_ALIASES: &[&str] = &["category", "type", "group", "tag"];

/// 解析 `name=Store Name` 形式的欄位對應
pub fn parse_mapping_pairs(pairs: &[String]) -> Result<ColumnMapping> {
    let mut mapping = ColumnMapping::default();
    for pair in pairs.iter().filter(|p| !p.trim().is_empty()) {
        let (field, header) = pair.split_once('=').ok_or_else(|| {
            MapiesError::validation(format!("mapping '{}' must look like field=Header", pair))
        })?;
        let header = Some(header.trim().to_string());
        match field.trim().to_ascii_lowercase().as_str() {
            "name" => mapping.name = header,
            "address" => mapping.address = header,
            "city" => mapping.city = header,
            "state" => mapping.state = header,
            "zip" => mapping.zip = header,
            "country" => mapping.country = header,
            "lat" | "latitude" => mapping.lat = header,
            "lng" | "lon" | "longitude" => mapping.lng = header,
            "category" => mapping.category = header,
            other => {
                return Err(MapiesError::validation(format!(
                    "unknown mapping field '{}'",
                    other
                )))
            }
        }
    }
    Ok(mapping)
}

fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_ascii_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// 以標題列中出現最多的分隔符號為準（`,` `;` `\t`）
pub fn detect_delimiter(header_line: &[u8]) -> u8 {
    [b',', b';', b'\t']
        .into_iter()
        .map(|d| (d, header_line.iter().filter(|b| **b == d).count()))
        .max_by_key(|(_, count)| *count)
        .filter(|(_, count)| *count > 0)
        .map(|(d, _)| d)
        .unwrap_or(b',')
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct ColumnIndexes {
    name: Option<usize>,
    address: Option<usize>,
    city: Option<usize>,
    state: Option<usize>,
    zip: Option<usize>,
    country: Option<usize>,
    lat: Option<usize>,
    lng: Option<usize>,
    category: Option<usize>,
}

impl ColumnIndexes {
    fn resolve(headers: &[String], mapping: &ColumnMapping) -> Result<Self> {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();

        let columns = if mapping.is_empty() {
            let detect = |aliases: &[&str]| {
                aliases
                    .iter()
                    .find_map(|alias| normalized.iter().position(|h| h == alias))
            };
            ColumnIndexes {
                name: detect(NAME_ALIASES),
                address: detect(ADDRESS_ALIASES),
                city: detect(CITY_ALIASES),
                state: detect(STATE_ALIASES),
                zip: detect(ZIP_ALIASES),
                country: detect(COUNTRY_ALIASES),
                lat: detect(LAT_ALIASES),
                lng: detect(LNG_ALIASES),
                category: detect(CATEGORY_ALIASES),
            }
        } else {
            let find = |header: &Option<String>| -> Result<Option<usize>> {
                match header.as_deref().map(str::trim).filter(|h| !h.is_empty()) {
                    None => Ok(None),
                    Some(wanted) => normalized
                        .iter()
                        .position(|h| *h == normalize_header(wanted))
                        .map(Some)
                        .ok_or_else(|| {
                            MapiesError::validation(format!(
                                "column '{}' not found in CSV headers",
                                wanted
                            ))
                        }),
                }
            };
            ColumnIndexes {
                name: find(&mapping.name)?,
                address: find(&mapping.address)?,
                city: find(&mapping.city)?,
                state: find(&mapping.state)?,
                zip: find(&mapping.zip)?,
                country: find(&mapping.country)?,
                lat: find(&mapping.lat)?,
                lng: find(&mapping.lng)?,
                category: find(&mapping.category)?,
            }
        };

        let has_coordinates = columns.lat.is_some() && columns.lng.is_some();
        if columns.address.is_none() && columns.city.is_none() && !has_coordinates {
            return Err(MapiesError::validation(
                "CSV needs an address, city or latitude/longitude columns",
            ));
        }
        Ok(columns)
    }

    fn extract(&self, record: &csv::StringRecord, row: usize) -> CsvRow {
        let field = |index: Option<usize>| {
            index
                .and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        CsvRow {
            row,
            name: field(self.name),
            address: field(self.address),
            city: field(self.city),
            state: field(self.state),
            zip: field(self.zip),
            country: field(self.country),
            lat: field(self.lat),
            lng: field(self.lng),
            category: field(self.category),
        }
    }
}

pub fn parse_csv(
    bytes: &[u8],
    mapping: &ColumnMapping,
    settings: &ImportSettings,
) -> Result<Vec<CsvRow>> {
    if bytes.len() > settings.max_file_bytes {
        return Err(MapiesError::validation(format!(
            "CSV file is {} bytes, the limit is {}",
            bytes.len(),
            settings.max_file_bytes
        )));
    }

    let content = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    if content.iter().all(u8::is_ascii_whitespace) {
        return Err(MapiesError::validation("CSV file is empty"));
    }

    let header_line = content.split(|b| *b == b'\n').next().unwrap_or_default();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(detect_delimiter(header_line))
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let columns = ColumnIndexes::resolve(&headers, mapping)?;

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        if rows.len() >= settings.max_rows {
            return Err(MapiesError::validation(format!(
                "CSV has more than {} rows",
                settings.max_rows
            )));
        }
        rows.push(columns.extract(&record, index + 1));
    }

    if rows.is_empty() {
        return Err(MapiesError::validation("CSV has no data rows"));
    }
    Ok(rows)
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowPlan {
    Provided { lat: f64, lng: f64 },
    NeedsGeocoding { address: String },
    Invalid { reason: String },
}

/// 支援 `48,8566` 這類以逗號為小數點的寫法
fn parse_coordinate(value: Option<&str>) -> Option<f64> {
    let value = value?.trim();
    let normalized = if value.contains(',') && !value.contains('.') {
        value.replace(',', ".")
    } else {
        value.to_string()
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn validate_row(row: &CsvRow) -> RowPlan {
    let lat = parse_coordinate(row.lat.as_deref());
    let lng = parse_coordinate(row.lng.as_deref());

    if let (Some(lat), Some(lng)) = (lat, lng) {
        if validate_coordinates(lat, lng).is_ok() {
            return RowPlan::Provided { lat, lng };
        }
    }

    let address = row.full_address();
    if !address.is_empty() {
        return RowPlan::NeedsGeocoding { address };
    }

    match (lat, lng) {
        (Some(lat), Some(lng)) => RowPlan::Invalid {
            reason: format!("coordinates ({}, {}) are out of range", lat, lng),
        },
        _ => RowPlan::Invalid {
            reason: "row has no address or coordinates".to_string(),
        },
    }
}

pub fn marker_name(row: &CsvRow) -> String {
    if let Some(name) = row.name.as_deref().filter(|n| !n.trim().is_empty()) {
        return name.trim().to_string();
    }
    let address = row.full_address();
    if !address.is_empty() {
        return address;
    }
    format!("Marker {}", row.row)
}

/// CSV 匯入工作：逐列驗證、地理編碼、寫入標記並更新進度
pub struct CsvProcessor<'a, S: Storage> {
    maps: &'a MapService<S>,
    geocoder: &'a GeocodingChain,
    settings: &'a ImportSettings,
    request_delay: Duration,
    monitor: &'a JobMonitor,
}

impl<'a, S: Storage> CsvProcessor<'a, S> {
    pub fn new(
        maps: &'a MapService<S>,
        geocoder: &'a GeocodingChain,
        settings: &'a ImportSettings,
        request_delay: Duration,
        monitor: &'a JobMonitor,
    ) -> Self {
        Self {
            maps,
            geocoder,
            settings,
            request_delay,
            monitor,
        }
    }

    /// 執行工作；致命錯誤會記錄在工作文件中，不會回傳給呼叫端
    pub async fn run(&self, job: &mut CsvUploadJob) -> JobSummary {
        tracing::info!(job_id = %job.id, map_id = %job.map_id, "🚀 Processing CSV job '{}'", job.filename);

        job.status = JobStatus::Processing;
        job.started_at = Some(Utc::now());
        self.persist(job).await;
        self.monitor.log_stats("Job started");

        match self.process(job).await {
            Ok(()) => {
                job.status = JobStatus::Completed;
                tracing::info!(
                    job_id = %job.id,
                    "✅ CSV job completed: {} ok, {} failed, {} skipped of {}",
                    job.successful_rows,
                    job.failed_rows,
                    job.skipped_rows,
                    job.total_rows
                );
            }
            Err(e) => {
                job.status = JobStatus::Failed;
                job.error_message = Some(e.user_friendly_message());
                tracing::error!(
                    job_id = %job.id,
                    "❌ CSV job failed: {} (Category: {:?})",
                    e,
                    e.category()
                );
            }
        }

        let now = Utc::now();
        job.completed_at = Some(now);
        job.updated_at = now;
        self.persist(job).await;
        self.monitor.log_final_stats(job.processed_rows);

        job.summary()
    }

    async fn process(&self, job: &mut CsvUploadJob) -> Result<()> {
        let store = self.maps.store();
        let bytes = store.storage().read_file(&job.upload_path).await?;
        let rows = parse_csv(&bytes, &job.column_mapping, self.settings)?;

        job.total_rows = rows.len() as u32;
        self.persist(job).await;
        self.monitor.log_stats("CSV parsed");

        let map = self.maps.get_map(&job.map_id).await?;
        let tier = self.maps.tier_of(&map.owner_id).await?;
        let geocoding_allowed = limits_for(tier).geocoding;

        let existing = self.maps.markers_of(&job.map_id).await?;
        let already_imported: HashSet<usize> = existing
            .iter()
            .filter(|m| m.source_job_id.as_deref() == Some(job.id.as_str()))
            .filter_map(|m| m.source_row)
            .collect();
        let mut quota = remaining_markers(tier, existing.len() as u32);
        let collection = markers_collection(&job.map_id);

        for row in &rows {
            if already_imported.contains(&row.row) {
                job.successful_rows += 1;
                self.advance(job).await;
                continue;
            }

            if quota == Some(0) {
                if job.skipped_rows == 0 {
                    self.record_error(
                        job,
                        row.row,
                        format!("{} plan marker limit reached", tier.as_str()),
                    );
                }
                job.skipped_rows += 1;
                self.advance(job).await;
                continue;
            }

            let resolved = match validate_row(row) {
                RowPlan::Provided { lat, lng } => Ok((lat, lng, GeocodeSource::Provided)),
                RowPlan::NeedsGeocoding { .. } if !geocoding_allowed => {
                    Err("geocoding is not included in this plan".to_string())
                }
                RowPlan::NeedsGeocoding { address } => {
                    let hit = self.geocoder.resolve(&address).await;
                    if !self.request_delay.is_zero() {
                        tokio::time::sleep(self.request_delay).await;
                    }
                    hit.map(|hit| (hit.lat, hit.lng, hit.source))
                        .ok_or_else(|| format!("could not geocode '{}'", address))
                }
                RowPlan::Invalid { reason } => Err(reason),
            };

            match resolved {
                Ok((lat, lng, source)) => {
                    let now = Utc::now();
                    let marker = Marker {
                        id: new_id(),
                        map_id: job.map_id.clone(),
                        name: marker_name(row),
                        address: row.full_address(),
                        lat,
                        lng,
                        category: row.category.clone(),
                        visible: true,
                        geocode_source: source,
                        source_job_id: Some(job.id.clone()),
                        source_row: Some(row.row),
                        created_at: now,
                        updated_at: now,
                    };
                    match store.set(&collection, &marker.id, &marker).await {
                        Ok(()) => {
                            job.successful_rows += 1;
                            quota = quota.map(|q| q.saturating_sub(1));
                        }
                        Err(e) => {
                            tracing::warn!(job_id = %job.id, row = row.row, "⚠️ Marker write failed: {}", e);
                            job.failed_rows += 1;
                            self.record_error(job, row.row, format!("marker write failed: {}", e));
                        }
                    }
                }
                Err(reason) => {
                    tracing::debug!(job_id = %job.id, row = row.row, "Row skipped: {}", reason);
                    job.failed_rows += 1;
                    self.record_error(job, row.row, reason);
                }
            }

            self.advance(job).await;
        }

        if let Err(e) = self.maps.record_import(&job.map_id).await {
            tracing::warn!(map_id = %job.map_id, "⚠️ Map stats update failed: {}", e);
        }
        Ok(())
    }

    fn record_error(&self, job: &mut CsvUploadJob, row: usize, message: String) {
        if job.errors.len() < self.settings.max_recorded_errors {
            job.errors.push(RowError { row, message });
        }
    }

    async fn advance(&self, job: &mut CsvUploadJob) {
        job.processed_rows += 1;
        job.updated_at = Utc::now();
        self.persist(job).await;
    }

    /// 進度寫入失敗只記錄，不中斷工作
    async fn persist(&self, job: &CsvUploadJob) {
        if let Err(e) = self.maps.store().set(CSV_JOBS, &job.id, job).await {
            tracing::warn!(job_id = %job.id, "⚠️ Failed to persist job progress: {}", e);
        }
    }
}
