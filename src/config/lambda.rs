#[cfg(feature = "lambda")]
use crate::config::toml_config::{AppConfig, BillingSettings, GeocodingSettings, ImportSettings};
#[cfg(feature = "lambda")]
use crate::domain::ports::{ConfigProvider, Storage};
#[cfg(feature = "lambda")]
use crate::utils::error::{MapiesError, Result};
#[cfg(feature = "lambda")]
use aws_sdk_s3::primitives::ByteStream;
#[cfg(feature = "lambda")]
use aws_sdk_s3::Client as S3Client;
#[cfg(feature = "lambda")]
use std::env;

#[cfg(feature = "lambda")]
#[derive(Debug, Clone)]
pub struct LambdaConfig {
    pub s3_bucket: String,
    pub s3_region: String,
    pub app: AppConfig,
}

#[cfg(feature = "lambda")]
impl LambdaConfig {
    pub fn from_env() -> Result<Self> {
        let mut app = AppConfig::default();

        if let Ok(url) = env::var("NOMINATIM_URL") {
            app.geocoding.nominatim_url = url;
        }
        if let Ok(url) = env::var("MAPBOX_URL") {
            app.geocoding.mapbox_url = url;
        }
        app.geocoding.mapbox_token = env::var("MAPBOX_TOKEN").ok();
        if let Ok(agent) = env::var("GEOCODER_USER_AGENT") {
            app.geocoding.user_agent = agent;
        }
        app.billing.webhook_secret = env::var("STRIPE_WEBHOOK_SECRET").ok();
        // 格式: price_abc=starter,price_def=professional
        if let Ok(pairs) = env::var("STRIPE_PRICE_TIERS") {
            for pair in pairs.split(',') {
                if let Some((price, tier)) = pair.split_once('=') {
                    app.billing.price_tiers.insert(
                        price.trim().to_string(),
                        crate::domain::model::PlanTier::parse(tier),
                    );
                }
            }
        }

        Ok(Self {
            s3_bucket: env::var("S3_BUCKET").map_err(|_| MapiesError::MissingConfigError {
                field: "S3_BUCKET".to_string(),
            })?,
            s3_region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            app,
        })
    }
}

#[cfg(feature = "lambda")]
impl ConfigProvider for LambdaConfig {
    fn geocoding(&self) -> &GeocodingSettings {
        &self.app.geocoding
    }

    fn import(&self) -> &ImportSettings {
        &self.app.import
    }

    fn billing(&self) -> &BillingSettings {
        &self.app.billing
    }
}

#[cfg(feature = "lambda")]
impl crate::utils::validation::Validate for LambdaConfig {
    fn validate(&self) -> Result<()> {
        use crate::utils::validation::*;

        validate_s3_bucket_name("s3_bucket", &self.s3_bucket)?;
        validate_aws_region("s3_region", &self.s3_region)?;
        self.app.validate_config()?;

        tracing::info!("✅ Lambda configuration validation passed");
        Ok(())
    }
}

#[cfg(feature = "lambda")]
fn validate_s3_bucket_name(field_name: &str, bucket_name: &str) -> Result<()> {
    if bucket_name.len() < 3 || bucket_name.len() > 63 {
        return Err(MapiesError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: bucket_name.to_string(),
            reason: "S3 bucket name must be between 3 and 63 characters".to_string(),
        });
    }

    if !bucket_name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return Err(MapiesError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: bucket_name.to_string(),
            reason: "S3 bucket name can only contain lowercase letters, numbers, hyphens, and dots"
                .to_string(),
        });
    }

    if bucket_name.starts_with('-') || bucket_name.ends_with('-') {
        return Err(MapiesError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: bucket_name.to_string(),
            reason: "S3 bucket name cannot start or end with a hyphen".to_string(),
        });
    }

    Ok(())
}

#[cfg(feature = "lambda")]
fn validate_aws_region(field_name: &str, region: &str) -> Result<()> {
    crate::utils::validation::validate_non_empty_string(field_name, region)?;

    if !region
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(MapiesError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: region.to_string(),
            reason: "AWS region can only contain lowercase letters, numbers, and hyphens"
                .to_string(),
        });
    }

    Ok(())
}

/// 以 S3 bucket 作為文件與上傳檔案的儲存後端
#[cfg(feature = "lambda")]
#[derive(Debug, Clone)]
pub struct S3Storage {
    client: S3Client,
    bucket: String,
}

#[cfg(feature = "lambda")]
impl S3Storage {
    pub fn new(client: S3Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[cfg(feature = "lambda")]
impl Storage for S3Storage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let resp = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                let missing = err
                    .as_service_error()
                    .map(|e| e.is_no_such_key())
                    .unwrap_or(false);
                if missing {
                    return Err(MapiesError::not_found("object", path));
                }
                return Err(MapiesError::ProcessingError {
                    message: format!("Failed to read s3://{}/{}: {}", self.bucket, path, err),
                });
            }
        };

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| MapiesError::ProcessingError {
                message: format!("Failed to collect S3 data: {}", e),
            })?;

        Ok(data.into_bytes().to_vec())
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(|e| MapiesError::ProcessingError {
                message: format!("Failed to write s3://{}/{}: {}", self.bucket, path, e),
            })?;
        Ok(())
    }

    async fn delete_file(&self, path: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| MapiesError::ProcessingError {
                message: format!("Failed to delete s3://{}/{}: {}", self.bucket, path, e),
            })?;
        Ok(())
    }

    async fn list_files(&self, dir: &str) -> Result<Vec<String>> {
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        let mut files = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let output = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&prefix)
                .delimiter("/")
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| MapiesError::ProcessingError {
                    message: format!("Failed to list s3://{}/{}: {}", self.bucket, prefix, e),
                })?;

            files.extend(
                output
                    .contents()
                    .iter()
                    .filter_map(|object| object.key())
                    .map(str::to_string),
            );

            match output.next_continuation_token() {
                Some(token) if output.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        files.sort();
        Ok(files)
    }
}
