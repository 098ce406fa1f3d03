//! ページ設定
//!
//! ホストページが `<script type="application/json" id="app-config">` で
//! 渡す設定。全フィールドにデフォルトがあるため、部分指定や未指定でも動く。

use serde::{Deserialize, Serialize};

use crate::error::{FlowError, Result};

/// 設定を埋め込む要素のID
pub const CONFIG_ELEMENT_ID: &str = "app-config";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub flow: FlowConfig,
    pub transition: TransitionConfig,
    pub forms: FormConfig,
}

/// 診断フローの設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    pub questions_url: String,
    pub analyze_url: String,
    pub analyze_image_url: String,
    /// 送信時の `name` フィールド
    pub subject_name: String,
    /// 結果表示後にスクロールするまでの待ち時間
    pub result_scroll_delay_ms: u32,
    pub main_selector: String,
    pub result_selector: String,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            questions_url: "/api/questions".into(),
            analyze_url: "/api/analyze".into(),
            analyze_image_url: "/api/analyze_image".into(),
            subject_name: "Anonymous".into(),
            result_scroll_delay_ms: 200,
            main_selector: "main".into(),
            result_selector: "#result".into(),
        }
    }
}

/// ページ遷移アニメーションの設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    pub overlay_id: String,
    pub entrance_delay_ms: u32,
    pub navigate_delay_ms: u32,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            overlay_id: "transitionOverlay".into(),
            entrance_delay_ms: 30,
            navigate_delay_ms: 320,
        }
    }
}

/// フォーム補強の設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    /// 登録ページかどうか。未指定ならタイトル/パスから推定する
    pub registration_page: Option<bool>,
    pub password_min_length: u32,
    pub toast_ttl_ms: u32,
    pub pending_label: String,
    pub error_flash_class: String,
    pub success_flash_class: String,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            registration_page: None,
            password_min_length: 6,
            toast_ttl_ms: 3500,
            pending_label: "Please wait\u{2026}".into(),
            error_flash_class: "bg-red-50".into(),
            success_flash_class: "bg-green-50".into(),
        }
    }
}

impl AppConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json).map_err(|e| FlowError::Config(e.to_string()))
    }
}
