use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const USERS: &str = "users";
pub const MAPS: &str = "maps";
pub const CSV_JOBS: &str = "csvJobs";
pub const PUBLIC_MAPS: &str = "publicMaps";

pub fn markers_collection(map_id: &str) -> String {
    format!("{}/{}/markers", MAPS, map_id)
}

pub fn polygons_collection(map_id: &str) -> String {
    format!("{}/{}/polygons", MAPS, map_id)
}

pub fn public_markers_collection(map_id: &str) -> String {
    format!("{}/{}/markers", PUBLIC_MAPS, map_id)
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    #[default]
    Freemium,
    Starter,
    Professional,
    Enterprise,
}

impl PlanTier {
    /// 不認識的方案一律視為免費方案
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "starter" => PlanTier::Starter,
            "professional" | "pro" => PlanTier::Professional,
            "enterprise" => PlanTier::Enterprise,
            _ => PlanTier::Freemium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Freemium => "freemium",
            PlanTier::Starter => "starter",
            PlanTier::Professional => "professional",
            PlanTier::Enterprise => "enterprise",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Unpaid,
    Incomplete,
    IncompleteExpired,
    Paused,
}

impl SubscriptionStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "trialing" => Some(Self::Trialing),
            "past_due" => Some(Self::PastDue),
            "canceled" | "cancelled" => Some(Self::Canceled),
            "unpaid" => Some(Self::Unpaid),
            "incomplete" => Some(Self::Incomplete),
            "incomplete_expired" => Some(Self::IncompleteExpired),
            "paused" => Some(Self::Paused),
            _ => None,
        }
    }

    pub fn grants_access(&self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionInfo {
    pub id: String,
    pub status: SubscriptionStatus,
    pub price_id: Option<String>,
    pub tier: PlanTier,
    pub current_period_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub invoice_id: String,
    pub amount_paid: i64,
    pub currency: String,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub subscription_tier: PlanTier,
    #[serde(default)]
    pub stripe_customer_id: Option<String>,
    #[serde(default)]
    pub subscription: Option<SubscriptionInfo>,
    #[serde(default)]
    pub last_payment: Option<PaymentRecord>,
    #[serde(default)]
    pub payment_failed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            email: email.into(),
            display_name: None,
            subscription_tier: PlanTier::Freemium,
            stripe_customer_id: None,
            subscription: None,
            last_payment: None,
            payment_failed: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_tier(mut self, tier: PlanTier) -> Self {
        self.subscription_tier = tier;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapRole {
    Viewer,
    Editor,
    Admin,
    Owner,
}

impl MapRole {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "viewer" => Some(MapRole::Viewer),
            "editor" => Some(MapRole::Editor),
            "admin" => Some(MapRole::Admin),
            "owner" => Some(MapRole::Owner),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collaborator {
    pub user_id: String,
    pub email: String,
    pub role: MapRole,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapSettings {
    pub style: String,
    pub clustering: bool,
    pub search_bar: bool,
    pub marker_shape: String,
    pub marker_color: String,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            style: "streets".to_string(),
            clustering: true,
            search_bar: true,
            marker_shape: "pin".to_string(),
            marker_color: "#3B82F6".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapStats {
    pub marker_count: u32,
    pub visible_marker_count: u32,
    pub polygon_count: u32,
    pub last_import_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Default for MapStats {
    fn default() -> Self {
        Self {
            marker_count: 0,
            visible_marker_count: 0,
            polygon_count: 0,
            last_import_at: None,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapDoc {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub settings: MapSettings,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub collaborators: Vec<Collaborator>,
    #[serde(default)]
    pub stats: MapStats,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeocodeSource {
    Provided,
    Nominatim,
    Mapbox,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub id: String,
    pub map_id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub category: Option<String>,
    pub visible: bool,
    pub geocode_source: GeocodeSource,
    #[serde(default)]
    pub source_job_id: Option<String>,
    #[serde(default)]
    pub source_row: Option<usize>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 建立或更新標記時由呼叫端提供的欄位
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerInput {
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub visible: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Polygon {
    pub id: String,
    pub map_id: String,
    pub name: String,
    /// `[lng, lat]`，首尾相同的封閉環
    pub coordinates: Vec<[f64; 2]>,
    pub fill_color: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub category: Option<String>,
}

impl ColumnMapping {
    pub fn is_empty(&self) -> bool {
        self == &ColumnMapping::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvUploadJob {
    pub id: String,
    pub user_id: String,
    pub map_id: String,
    pub filename: String,
    pub upload_path: String,
    #[serde(default)]
    pub column_mapping: ColumnMapping,
    pub status: JobStatus,
    pub total_rows: u32,
    pub processed_rows: u32,
    pub successful_rows: u32,
    pub failed_rows: u32,
    pub skipped_rows: u32,
    #[serde(default)]
    pub errors: Vec<RowError>,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl CsvUploadJob {
    pub fn new(
        user_id: &str,
        map_id: &str,
        filename: &str,
        upload_path: String,
        column_mapping: ColumnMapping,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            user_id: user_id.to_string(),
            map_id: map_id.to_string(),
            filename: filename.to_string(),
            upload_path,
            column_mapping,
            status: JobStatus::Pending,
            total_rows: 0,
            processed_rows: 0,
            successful_rows: 0,
            failed_rows: 0,
            skipped_rows: 0,
            errors: Vec::new(),
            retry_count: 0,
            error_message: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn reset_progress(&mut self) {
        self.total_rows = 0;
        self.processed_rows = 0;
        self.successful_rows = 0;
        self.failed_rows = 0;
        self.skipped_rows = 0;
        self.errors.clear();
        self.error_message = None;
        self.started_at = None;
        self.completed_at = None;
        self.status = JobStatus::Pending;
        self.updated_at = Utc::now();
    }

    pub fn summary(&self) -> JobSummary {
        JobSummary {
            total_rows: self.total_rows,
            successful_rows: self.successful_rows,
            failed_rows: self.failed_rows,
            skipped_rows: self.skipped_rows,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub total_rows: u32,
    pub successful_rows: u32,
    pub failed_rows: u32,
    pub skipped_rows: u32,
}

/// 依欄位對應解析後的 CSV 資料列，`row` 從 1 起算（不含標題列）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CsvRow {
    pub row: usize,
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub category: Option<String>,
}

impl CsvRow {
    /// 組合完整地址，略過空白欄位
    pub fn full_address(&self) -> String {
        [
            &self.address,
            &self.city,
            &self.state,
            &self.zip,
            &self.country,
        ]
        .iter()
        .filter_map(|part| part.as_deref())
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeHit {
    pub lat: f64,
    pub lng: f64,
    pub formatted_address: Option<String>,
    pub source: GeocodeSource,
}

/// 公開地圖的唯讀鏡像，不含協作者名單
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicMap {
    pub id: String,
    pub name: String,
    pub description: String,
    pub settings: MapSettings,
    pub stats: MapStats,
    pub updated_at: DateTime<Utc>,
}

impl From<&MapDoc> for PublicMap {
    fn from(map: &MapDoc) -> Self {
        Self {
            id: map.id.clone(),
            name: map.name.clone(),
            description: map.description.clone(),
            settings: map.settings.clone(),
            stats: map.stats.clone(),
            updated_at: map.updated_at,
        }
    }
}
