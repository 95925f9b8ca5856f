use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapiesError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Plan limit exceeded: {message}")]
    PlanLimitExceeded { message: String },

    #[error("Geocoding error: {message}")]
    GeocodingError { message: String },

    #[error("Webhook error: {message}")]
    WebhookError { message: String },
}

pub type Result<T> = std::result::Result<T, MapiesError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Data,
    Storage,
    Access,
    Billing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl MapiesError {
    pub fn not_found(kind: &str, id: impl Into<String>) -> Self {
        MapiesError::NotFound {
            kind: kind.to_string(),
            id: id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        MapiesError::ValidationError {
            message: message.into(),
        }
    }

    pub fn permission(message: impl Into<String>) -> Self {
        MapiesError::PermissionDenied {
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, MapiesError::NotFound { .. })
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            MapiesError::ConfigError { .. }
            | MapiesError::ConfigValidationError { .. }
            | MapiesError::InvalidConfigValueError { .. }
            | MapiesError::MissingConfigError { .. } => ErrorCategory::Configuration,
            MapiesError::ApiError(_) | MapiesError::GeocodingError { .. } => {
                ErrorCategory::Network
            }
            MapiesError::CsvError(_)
            | MapiesError::SerializationError(_)
            | MapiesError::ProcessingError { .. }
            | MapiesError::ValidationError { .. } => ErrorCategory::Data,
            MapiesError::ZipError(_) | MapiesError::IoError(_) | MapiesError::NotFound { .. } => {
                ErrorCategory::Storage
            }
            MapiesError::PermissionDenied { .. } | MapiesError::PlanLimitExceeded { .. } => {
                ErrorCategory::Access
            }
            MapiesError::WebhookError { .. } => ErrorCategory::Billing,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            MapiesError::PlanLimitExceeded { .. } => ErrorSeverity::Low,
            MapiesError::ApiError(_) | MapiesError::GeocodingError { .. } => ErrorSeverity::Medium,
            MapiesError::ConfigError { .. }
            | MapiesError::ConfigValidationError { .. }
            | MapiesError::InvalidConfigValueError { .. }
            | MapiesError::MissingConfigError { .. }
            | MapiesError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the TOML file and environment variables, then run again"
            }
            ErrorCategory::Network => {
                "Geocoding providers may be rate limiting; retry the job later"
            }
            ErrorCategory::Data => "Check the CSV headers, delimiter and column mapping",
            ErrorCategory::Storage => "Check that the data directory or bucket exists and is writable",
            ErrorCategory::Access => "Check map permissions or upgrade the subscription plan",
            ErrorCategory::Billing => "Check the webhook signing secret and the event payload",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            MapiesError::NotFound { kind, id } => format!("Could not find {} '{}'", kind, id),
            MapiesError::PermissionDenied { message } => {
                format!("You do not have access: {}", message)
            }
            MapiesError::PlanLimitExceeded { message } => {
                format!("Your plan does not allow this: {}", message)
            }
            MapiesError::ValidationError { message } => format!("Invalid input: {}", message),
            MapiesError::CsvError(e) => format!("The CSV file could not be read: {}", e),
            other => other.to_string(),
        }
    }
}
