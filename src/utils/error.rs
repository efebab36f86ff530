use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Validation error: {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Environment error: {message}")]
    Environment { message: String },

    #[error("Orchestration error: {message}")]
    Orchestration { message: String },

    #[error("Readiness timeout: {service} did not become ready after {attempts} attempts")]
    ReadinessTimeout { service: String, attempts: u32 },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provisioning interrupted")]
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Environment,
    Runtime,
    Readiness,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ProvisionError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn environment(message: impl Into<String>) -> Self {
        Self::Environment {
            message: message.into(),
        }
    }

    pub fn orchestration(message: impl Into<String>) -> Self {
        Self::Orchestration {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } | Self::Config { .. } => ErrorCategory::Input,
            Self::Environment { .. } => ErrorCategory::Environment,
            Self::Orchestration { .. } | Self::Interrupted => ErrorCategory::Runtime,
            Self::ReadinessTimeout { .. } | Self::Http(_) => ErrorCategory::Readiness,
            Self::Io(_) | Self::Yaml(_) | Self::Json(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Validation { .. } | Self::Config { .. } => ErrorSeverity::Medium,
            Self::Environment { .. } => ErrorSeverity::Critical,
            Self::Io(_) | Self::Yaml(_) | Self::Json(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    /// 錯誤發生時是否已經可能動到外部資源（需要回滾）
    pub fn requires_rollback(&self) -> bool {
        !matches!(
            self,
            Self::Validation { .. } | Self::Config { .. } | Self::Environment { .. }
        )
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Validation { field, reason } => format!("Invalid value for {}: {}", field, reason),
            Self::Environment { message } => format!("Container runtime unavailable: {}", message),
            Self::Orchestration { message } => format!("Failed to start services: {}", message),
            Self::ReadinessTimeout { service, .. } => {
                format!("{} did not become ready in time", service)
            }
            Self::Config { message } => format!("Invalid stack configuration: {}", message),
            Self::Interrupted => "Provisioning was interrupted".to_string(),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => "Check the command line flags and the --config file, then rerun",
            ErrorCategory::Environment => {
                "Install the container runtime and its compose plugin, and make sure the daemon is running"
            }
            ErrorCategory::Runtime => "Inspect the runtime output above; images may need to be pulled or ports freed",
            ErrorCategory::Readiness => "Check the container logs; the service may need more time or different settings",
            ErrorCategory::System => "Check permissions and free space in the working directory",
        }
    }
}

pub type Result<T> = std::result::Result<T, ProvisionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rollback_classification() {
        assert!(!ProvisionError::validation("db_password", "too short").requires_rollback());
        assert!(!ProvisionError::environment("docker missing").requires_rollback());
        assert!(ProvisionError::orchestration("compose failed").requires_rollback());
        assert!(ProvisionError::Interrupted.requires_rollback());
        assert!(ProvisionError::ReadinessTimeout {
            service: "pgadmin".to_string(),
            attempts: 30,
        }
        .requires_rollback());
    }

    #[test]
    fn test_readiness_timeout_names_service() {
        let err = ProvisionError::ReadinessTimeout {
            service: "postgres".to_string(),
            attempts: 30,
        };
        assert!(err.to_string().contains("postgres"));
        assert!(err.to_string().contains("30"));
        assert_eq!(err.category(), ErrorCategory::Readiness);
    }

    #[test]
    fn test_environment_is_critical() {
        let err = ProvisionError::environment("daemon unreachable");
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.user_friendly_message().contains("daemon unreachable"));
    }
}
