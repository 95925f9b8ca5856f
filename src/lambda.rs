#[cfg(feature = "lambda")]
use aws_config::BehaviorVersion;
#[cfg(feature = "lambda")]
use aws_sdk_s3::config::Region;
#[cfg(feature = "lambda")]
use aws_sdk_s3::Client as S3Client;
#[cfg(feature = "lambda")]
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
#[cfg(feature = "lambda")]
use mapies::core::export::export_map;
#[cfg(feature = "lambda")]
use mapies::domain::model::ColumnMapping;
#[cfg(feature = "lambda")]
use mapies::domain::ports::Storage;
#[cfg(feature = "lambda")]
use mapies::utils::{logger, validation::Validate};
#[cfg(feature = "lambda")]
use mapies::{Backend, LambdaConfig, MapiesError, S3Storage, UploadRequest};
#[cfg(feature = "lambda")]
use serde::Deserialize;
#[cfg(feature = "lambda")]
use serde_json::{json, Value};

/// 以 `action` 區分的呼叫事件；CSV 可以直接內嵌或指向已上傳的 S3 物件
#[cfg(feature = "lambda")]
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Request {
    ProcessCsvUpload {
        user_id: String,
        map_id: String,
        #[serde(default)]
        filename: String,
        csv_text: Option<String>,
        s3_key: Option<String>,
        #[serde(default)]
        column_mapping: ColumnMapping,
    },
    RetryCsvJob {
        user_id: String,
        job_id: String,
    },
    JobStatus {
        user_id: String,
        job_id: String,
    },
    ExportMap {
        user_id: String,
        map_id: String,
    },
    StripeWebhook {
        payload: String,
        signature: Option<String>,
    },
}

#[cfg(feature = "lambda")]
fn to_lambda_error(e: MapiesError) -> Error {
    tracing::error!(
        "❌ Request failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    Box::new(e)
}

#[cfg(feature = "lambda")]
async fn handle(
    backend: &Backend<S3Storage, LambdaConfig>,
    request: Request,
) -> Result<Value, MapiesError> {
    match request {
        Request::ProcessCsvUpload {
            user_id,
            map_id,
            filename,
            csv_text,
            s3_key,
            column_mapping,
        } => {
            let content = match (csv_text, s3_key) {
                (Some(text), _) => text.into_bytes(),
                (None, Some(key)) => backend.maps().store().storage().read_file(&key).await?,
                (None, None) => {
                    return Err(MapiesError::validation("either csvText or s3Key is required"))
                }
            };
            let receipt = backend
                .jobs()
                .process_csv_upload(UploadRequest {
                    user_id,
                    map_id,
                    filename,
                    content,
                    column_mapping,
                })
                .await?;
            Ok(serde_json::to_value(receipt)?)
        }
        Request::RetryCsvJob { user_id, job_id } => {
            let receipt = backend.jobs().retry_csv_job(&user_id, &job_id).await?;
            Ok(serde_json::to_value(receipt)?)
        }
        Request::JobStatus { user_id, job_id } => {
            let job = backend.jobs().job_status(&user_id, &job_id).await?;
            Ok(serde_json::to_value(job)?)
        }
        Request::ExportMap { user_id, map_id } => {
            let path = export_map(backend.maps(), &user_id, &map_id).await?;
            Ok(json!({ "path": path }))
        }
        Request::StripeWebhook { payload, signature } => {
            let outcome = backend
                .billing()
                .handle_payload(payload.as_bytes(), signature.as_deref())
                .await?;
            Ok(serde_json::to_value(outcome)?)
        }
    }
}

#[cfg(feature = "lambda")]
async fn function_handler(event: LambdaEvent<Request>) -> Result<Value, Error> {
    tracing::info!("Starting mapies Lambda request {}", event.context.request_id);

    let lambda_config = LambdaConfig::from_env().map_err(to_lambda_error)?;
    lambda_config.validate().map_err(to_lambda_error)?;

    // 創建AWS配置和S3客戶端
    let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let region = Region::new(lambda_config.s3_region.clone());
    let config = aws_sdk_s3::config::Builder::from(&config)
        .region(region)
        .force_path_style(true)
        .build();
    let s3_client = S3Client::from_conf(config);

    let storage = S3Storage::new(s3_client, lambda_config.s3_bucket.clone());
    let backend = Backend::from_config(storage, lambda_config).map_err(to_lambda_error)?;

    let response = handle(&backend, event.payload)
        .await
        .map_err(to_lambda_error)?;

    tracing::info!("✅ Lambda request completed");
    Ok(response)
}

#[cfg(feature = "lambda")]
#[tokio::main]
async fn main() -> Result<(), Error> {
    logger::init_lambda_logger();
    run(service_fn(function_handler)).await
}
