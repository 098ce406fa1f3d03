//! Derma Check Common Library
//!
//! ブラウザ(WASM)側から使う、画面に依存しない状態・型・ルール

pub mod config;
pub mod controller;
pub mod error;
pub mod flow;
pub mod forms;
pub mod link;
pub mod strength;
pub mod toast;
pub mod types;

pub use config::{AppConfig, FlowConfig, FormConfig, TransitionConfig};
pub use controller::{AnalysisApi, FlowController, Host, Region};
pub use error::{FlowError, Result};
pub use flow::{FlowState, FlowView, Mode, ModeKind, UploadFile};
pub use link::{classify, LinkClick, LinkDecision, PassReason};
pub use strength::{estimate_strength, strength_label};
pub use toast::{ToastKind, ToastSpec, ToastStack};
pub use types::{AnalysisResult, AnalyzeRequest, Question};
