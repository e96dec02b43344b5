use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Which external call a fetch failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    Resolve,
    Stats,
}

impl std::fmt::Display for FetchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchStage::Resolve => write!(f, "resolve"),
            FetchStage::Stats => write!(f, "stats"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("fetch failed during {stage}: {message}")]
    Fetch { stage: FetchStage, message: String },

    #[error("webhook delivery failed: {0}")]
    Delivery(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn fetch(stage: FetchStage, err: impl std::fmt::Display) -> Self {
        Error::Fetch {
            stage,
            message: err.to_string(),
        }
    }
}
