use crate::adapters::documents::DocumentStore;
use crate::core::billing::BillingService;
use crate::core::geocoding::GeocodingChain;
use crate::core::jobs::JobEngine;
use crate::core::maps::MapService;
use crate::domain::ports::{ConfigProvider, Storage};
use crate::utils::error::Result;
use std::sync::Arc;

/// 後端服務組合：CLI 與 Lambda 共用
pub struct Backend<S: Storage, C: ConfigProvider> {
    jobs: JobEngine<S, C>,
    billing: BillingService<S>,
}

impl<S: Storage, C: ConfigProvider> Backend<S, C> {
    /// 依設定建立 Nominatim → Mapbox 地理編碼鏈
    pub fn from_config(storage: S, config: C) -> Result<Self> {
        let geocoder = GeocodingChain::from_settings(config.geocoding())?;
        tracing::debug!("Geocoders: {:?}", geocoder.provider_names());
        Ok(Self::with_geocoder(storage, config, geocoder))
    }

    pub fn with_geocoder(storage: S, config: C, geocoder: GeocodingChain) -> Self {
        let store = Arc::new(DocumentStore::new(storage));
        let billing = BillingService::new(store.clone(), config.billing().clone());
        let jobs = JobEngine::new(MapService::new(store), geocoder, config);
        Self { jobs, billing }
    }

    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.jobs = self.jobs.with_monitoring(enabled);
        self
    }

    pub fn jobs(&self) -> &JobEngine<S, C> {
        &self.jobs
    }

    pub fn maps(&self) -> &MapService<S> {
        self.jobs.maps()
    }

    pub fn billing(&self) -> &BillingService<S> {
        &self.billing
    }
}
