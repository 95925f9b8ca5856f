use crate::config::toml_config::{BillingSettings, GeocodingSettings, ImportSettings};
use crate::domain::model::GeocodeHit;
use crate::utils::error::Result;
use async_trait::async_trait;

/// 原始檔案儲存（本機目錄、S3 或記憶體）
pub trait Storage: Send + Sync {
    /// 檔案不存在時回傳 `MapiesError::NotFound`
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn delete_file(&self, path: &str) -> impl std::future::Future<Output = Result<()>> + Send;
    /// 只列出 `dir` 底下的直接子檔案，回傳完整相對路徑
    fn list_files(&self, dir: &str)
        -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn geocoding(&self) -> &GeocodingSettings;
    fn import(&self) -> &ImportSettings;
    fn billing(&self) -> &BillingSettings;
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    fn name(&self) -> &str;
    /// `Ok(None)` 表示此供應商找不到地址
    async fn geocode(&self, address: &str) -> Result<Option<GeocodeHit>>;
}
