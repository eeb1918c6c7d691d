use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Request to {url} failed: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} returned HTTP {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Seen-job store error: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Notification failed: {message}")]
    Notification { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfig { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Persistence,
    Notification,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl WatchError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            WatchError::Fetch { .. } | WatchError::HttpStatus { .. } => ErrorCategory::Network,
            WatchError::Persistence(_) | WatchError::Serialization(_) => {
                ErrorCategory::Persistence
            }
            WatchError::Notification { .. } => ErrorCategory::Notification,
            WatchError::ConfigValidation { .. }
            | WatchError::InvalidConfigValue { .. }
            | WatchError::MissingConfig { .. } => ErrorCategory::Configuration,
            WatchError::Io(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Notification => ErrorSeverity::Low,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Persistence => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// Whether the next scheduled pass may reasonably succeed where this one failed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Network | ErrorCategory::Persistence | ErrorCategory::Notification
        )
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            WatchError::Fetch { .. } => {
                "Check network connectivity; the next scheduled pass will retry"
            }
            WatchError::HttpStatus { .. } => {
                "The source site rejected the request; check the search URL and user agent"
            }
            WatchError::Persistence(_) => {
                "Check that the database file is reachable and writable (DATABASE_URL)"
            }
            WatchError::Serialization(_) => "A stored record is corrupt; inspect the seen_jobs table",
            WatchError::Notification { .. } => {
                "Check SMTP host, EMAIL_USER/EMAIL_PASS and the recipient address"
            }
            WatchError::Io(_) => "Check file paths and permissions",
            WatchError::ConfigValidation { .. }
            | WatchError::InvalidConfigValue { .. }
            | WatchError::MissingConfig { .. } => {
                "Fix the configuration file or the corresponding environment variable"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not load the job listing page: {}", self),
            ErrorCategory::Persistence => format!("Could not access the seen-job store: {}", self),
            ErrorCategory::Notification => format!("Could not send the job digest: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, WatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_follow_taxonomy() {
        let err = WatchError::HttpStatus {
            url: "https://example.com".to_string(),
            status: reqwest::StatusCode::FORBIDDEN,
        };
        assert_eq!(err.category(), ErrorCategory::Network);
        assert!(err.is_transient());

        let err = WatchError::Persistence(sqlx::Error::PoolClosed);
        assert_eq!(err.category(), ErrorCategory::Persistence);
        assert_eq!(err.severity(), ErrorSeverity::High);

        let err = WatchError::Notification {
            message: "relay refused".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Low);

        let err = WatchError::MissingConfig {
            field: "mail.recipient".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(!err.is_transient());
        assert!(err.user_friendly_message().contains("mail.recipient"));
    }
}
