use thiserror::Error;

#[derive(Error, Debug)]
pub enum MissiondError {
    #[error("store error: {0}")]
    Store(#[from] etcd_client::Error),

    #[error("bus error: {0}")]
    Bus(#[from] rumqttc::ClientError),

    #[error("decode failure: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, MissiondError>;
