#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Unknown module: {0}")]
    UnknownModule(String),

    #[error("Unknown field '{field}' in module '{module}'")]
    UnknownField { module: String, field: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Form generation {edit} is stale, current generation is {current}")]
    StaleForm { edit: u64, current: u64 },

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}
