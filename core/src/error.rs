use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Extraction failed for {entity}/{metric}: {reason}")]
    Extraction {
        entity: String,
        metric: String,
        reason: String,
    },

    #[error("Validation failed: {reason}")]
    Validation { reason: String },

    #[error("No records extracted for any entity/metric pair")]
    EmptyExtraction,

    #[error("Load into '{table}' failed: {source}")]
    Load {
        table: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EtlError {
    pub fn extraction(entity: &str, metric: &str, reason: impl ToString) -> Self {
        EtlError::Extraction {
            entity: entity.to_string(),
            metric: metric.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        EtlError::Validation { reason: reason.into() }
    }

    /// True for failures that abort the whole run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, EtlError::Extraction { .. })
    }
}

pub type EtlResult<T> = Result<T, EtlError>;
