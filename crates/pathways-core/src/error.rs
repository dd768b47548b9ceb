use thiserror::Error;

#[derive(Debug, Error)]
pub enum PathwayError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("enrollment lookup failed: {0}")]
    ExternalLookup(String),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl PathwayError {
    pub fn pathway_not_found(pathway_id: i64) -> Self {
        Self::NotFound(format!("pathway {pathway_id}"))
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::ExternalLookup(_) => 502,
            Self::Internal(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, PathwayError>;
