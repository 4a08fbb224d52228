use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutreachError {
    #[error("campaign not found: {0}")]
    CampaignNotFound(String),

    #[error("email '{email_type}' not found in campaign {campaign}")]
    EmailNotFound { campaign: String, email_type: String },

    #[error("email '{email_type}' already exists in campaign {campaign}")]
    EmailExists { campaign: String, email_type: String },

    #[error("invalid transition from {from} to {to}: {reason}")]
    InvalidTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("invalid stage: {0}")]
    InvalidStage(String),

    #[error("invalid response type: {0}")]
    InvalidResponseType(String),

    #[error("invalid email type: {0}")]
    InvalidEmailType(String),

    #[error("invalid email status: {0}")]
    InvalidEmailStatus(String),

    #[error("invalid tier: {0}")]
    InvalidTier(String),

    #[error("backup store error: {0}")]
    Backup(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OutreachError>;
