//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl FlowError {
    /// ダイアログに出す説明文
    ///
    /// ステータスエラーはサーバーが返した `error` の文言をそのまま使う
    pub fn user_message(&self) -> String {
        match self {
            FlowError::Status { message, .. } => message.clone(),
            FlowError::Network(msg) | FlowError::Decode(msg) | FlowError::Config(msg) => {
                msg.clone()
            }
            FlowError::Json(e) => e.to_string(),
        }
    }
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, FlowError>;
