use crate::core::csv_processor::CsvProcessor;
use crate::core::geocoding::GeocodingChain;
use crate::core::maps::MapService;
use crate::core::plans::{require_feature, Feature};
use crate::core::sharing::Permission;
use crate::domain::model::{ColumnMapping, CsvUploadJob, JobStatus, JobSummary, CSV_JOBS};
use crate::domain::ports::{ConfigProvider, Storage};
use crate::utils::error::{MapiesError, Result};
use crate::utils::monitor::JobMonitor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub user_id: String,
    pub map_id: String,
    pub filename: String,
    #[serde(skip)]
    pub content: Vec<u8>,
    #[serde(default)]
    pub column_mapping: ColumnMapping,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReceipt {
    pub job_id: String,
    pub status: JobStatus,
    pub summary: JobSummary,
}

impl From<&CsvUploadJob> for JobReceipt {
    fn from(job: &CsvUploadJob) -> Self {
        Self {
            job_id: job.id.clone(),
            status: job.status,
            summary: job.summary(),
        }
    }
}

pub fn upload_path(user_id: &str, job_id: &str) -> String {
    format!("uploads/{}/{}.csv", user_id, job_id)
}

/// CSV 匯入工作的進入點：上傳、重試與查詢狀態
pub struct JobEngine<S: Storage, C: ConfigProvider> {
    maps: MapService<S>,
    geocoder: GeocodingChain,
    config: C,
    monitor: JobMonitor,
}

impl<S: Storage, C: ConfigProvider> JobEngine<S, C> {
    pub fn new(maps: MapService<S>, geocoder: GeocodingChain, config: C) -> Self {
        Self {
            maps,
            geocoder,
            config,
            monitor: JobMonitor::default(),
        }
    }

    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor = JobMonitor::new(enabled);
        self
    }

    pub fn maps(&self) -> &MapService<S> {
        &self.maps
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    fn processor(&self) -> CsvProcessor<'_, S> {
        CsvProcessor::new(
            &self.maps,
            &self.geocoder,
            self.config.import(),
            self.config.geocoding().request_delay(),
            &self.monitor,
        )
    }

    pub async fn process_csv_upload(&self, request: UploadRequest) -> Result<JobReceipt> {
        let map = self
            .maps
            .map_for(&request.user_id, &request.map_id, Permission::Edit)
            .await?;
        require_feature(self.maps.tier_of(&map.owner_id).await?, Feature::CsvImport)?;

        if request.content.is_empty() {
            return Err(MapiesError::validation("uploaded CSV file is empty"));
        }
        let filename = request.filename.trim();
        let filename = if filename.is_empty() { "upload.csv" } else { filename };

        let mut job = CsvUploadJob::new(
            &request.user_id,
            &request.map_id,
            filename,
            String::new(),
            request.column_mapping,
        );
        job.upload_path = upload_path(&request.user_id, &job.id);

        let store = self.maps.store();
        store
            .storage()
            .write_file(&job.upload_path, &request.content)
            .await?;
        store.set(CSV_JOBS, &job.id, &job).await?;
        tracing::info!(
            job_id = %job.id,
            "📥 Stored upload '{}' ({} bytes) for map {}",
            job.filename,
            request.content.len(),
            job.map_id
        );

        self.processor().run(&mut job).await;
        Ok(JobReceipt::from(&job))
    }

    pub async fn retry_csv_job(&self, user_id: &str, job_id: &str) -> Result<JobReceipt> {
        let mut job = self.job_status(user_id, job_id).await?;

        let retryable = match job.status {
            JobStatus::Failed => true,
            // 超出配額而略過的列在升級方案後可以補匯入
            JobStatus::Completed => job.failed_rows > 0 || job.skipped_rows > 0,
            JobStatus::Pending | JobStatus::Processing => false,
        };
        if !retryable {
            return Err(MapiesError::validation(format!(
                "job '{}' is {:?} with {} failed and {} skipped rows and cannot be retried",
                job.id, job.status, job.failed_rows, job.skipped_rows
            )));
        }

        job.retry_count += 1;
        job.reset_progress();
        self.maps.store().set(CSV_JOBS, &job.id, &job).await?;
        tracing::info!(job_id = %job.id, "🔁 Retrying CSV job (attempt {})", job.retry_count);

        self.processor().run(&mut job).await;
        Ok(JobReceipt::from(&job))
    }

    /// 工作只對建立者可見
    pub async fn job_status(&self, user_id: &str, job_id: &str) -> Result<CsvUploadJob> {
        let job: CsvUploadJob = self.maps.store().require(CSV_JOBS, job_id, "job").await?;
        if job.user_id != user_id {
            return Err(MapiesError::permission(format!(
                "job '{}' belongs to another user",
                job_id
            )));
        }
        Ok(job)
    }
}
