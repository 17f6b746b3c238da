use thiserror::Error;

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ('{value}'): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Slug '{slug}' is already in use")]
    DuplicateSlugError { slug: String },

    #[error("Payment order '{order_id}' already exists")]
    DuplicateOrderError { order_id: String },

    #[error("Insufficient tokens: need {required}, have {available}")]
    InsufficientTokensError { required: i64, available: i64 },

    #[error("{resource} not found")]
    NotFoundError { resource: String },

    #[error("Hosting provider rate limit reached")]
    RateLimitedError,

    #[error("Deploy failed: {message}")]
    DeployError { message: String },

    #[error("Payment provider error: {message}")]
    PaymentError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Business,
    Upstream,
    System,
}

impl SiteError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SiteError::ConfigError { .. }
            | SiteError::MissingConfigError { .. }
            | SiteError::InvalidConfigValueError { .. }
            | SiteError::ValidationError { .. } => ErrorCategory::Validation,
            SiteError::DuplicateSlugError { .. }
            | SiteError::DuplicateOrderError { .. }
            | SiteError::InsufficientTokensError { .. }
            | SiteError::NotFoundError { .. } => ErrorCategory::Business,
            SiteError::ApiError(_)
            | SiteError::RateLimitedError
            | SiteError::DeployError { .. }
            | SiteError::PaymentError { .. } => ErrorCategory::Upstream,
            SiteError::ZipError(_) | SiteError::IoError(_) | SiteError::SerializationError(_) => {
                ErrorCategory::System
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SiteError::RateLimitedError => ErrorSeverity::Low,
            SiteError::ConfigError { .. }
            | SiteError::MissingConfigError { .. }
            | SiteError::InvalidConfigValueError { .. }
            | SiteError::ValidationError { .. }
            | SiteError::DuplicateSlugError { .. }
            | SiteError::DuplicateOrderError { .. }
            | SiteError::InsufficientTokensError { .. }
            | SiteError::NotFoundError { .. } => ErrorSeverity::Medium,
            SiteError::ApiError(_) | SiteError::DeployError { .. } | SiteError::PaymentError { .. } => {
                ErrorSeverity::High
            }
            SiteError::ZipError(_) | SiteError::IoError(_) | SiteError::SerializationError(_) => {
                ErrorSeverity::Critical
            }
        }
    }

    /// HTTP-equivalent status for callers that sit behind a routing layer.
    pub fn http_status(&self) -> u16 {
        match self {
            SiteError::ConfigError { .. }
            | SiteError::MissingConfigError { .. }
            | SiteError::InvalidConfigValueError { .. }
            | SiteError::ValidationError { .. }
            | SiteError::DuplicateSlugError { .. }
            | SiteError::DuplicateOrderError { .. }
            | SiteError::InsufficientTokensError { .. } => 400,
            SiteError::NotFoundError { .. } => 404,
            SiteError::RateLimitedError => 429,
            _ => 500,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            SiteError::InsufficientTokensError { required, .. } => {
                format!("You need {} token(s) for this action. Please purchase more tokens.", required)
            }
            SiteError::DuplicateSlugError { slug } => {
                format!("The address '{}' is already taken. Pick another one.", slug)
            }
            SiteError::RateLimitedError => {
                "The hosting provider is throttling us. Try again in a few minutes.".to_string()
            }
            SiteError::ValidationError { message } => message.clone(),
            other => format!("{}", other),
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self.category() {
            ErrorCategory::Validation => "Check the request fields and retry".to_string(),
            ErrorCategory::Business => match self {
                SiteError::InsufficientTokensError { .. } => {
                    "Purchase more tokens, then retry the same request".to_string()
                }
                _ => "Adjust the request and retry".to_string(),
            },
            ErrorCategory::Upstream => match self {
                SiteError::RateLimitedError => {
                    "Wait a few minutes and retry; no tokens were consumed".to_string()
                }
                _ => "Check provider status and credentials, then retry".to_string(),
            },
            ErrorCategory::System => "Inspect local filesystem and logs".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SiteError>;
