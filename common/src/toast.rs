//! トースト通知
//!
//! `ToastStack` は表示中トーストの台帳。DOM側はこれに従って要素を出し入れする。
//! 自動消去とクリック消去のどちらが先でも、削除は一度だけ成立する。

use serde::{Deserialize, Serialize};

pub const DEFAULT_TTL_MS: u32 = 3500;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    #[default]
    Success,
    Error,
}

impl ToastKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToastKind::Success => "success",
            ToastKind::Error => "error",
        }
    }

    pub fn default_title(&self) -> &'static str {
        match self {
            ToastKind::Success => "Success",
            ToastKind::Error => "Error",
        }
    }
}

/// 表示依頼
#[derive(Debug, Clone, PartialEq)]
pub struct ToastSpec {
    pub kind: ToastKind,
    pub title: String,
    pub description: String,
    pub ttl_ms: u32,
}

impl ToastSpec {
    pub fn success(description: impl Into<String>) -> Self {
        Self::new(ToastKind::Success, "", description)
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(ToastKind::Error, title, description)
    }

    pub fn new(kind: ToastKind, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            description: description.into(),
            ttl_ms: DEFAULT_TTL_MS,
        }
    }

    pub fn with_ttl(mut self, ttl_ms: u32) -> Self {
        self.ttl_ms = ttl_ms;
        self
    }

    /// 空のタイトルは種類ごとの既定値にする
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            self.kind.default_title()
        } else {
            &self.title
        }
    }
}

pub type ToastId = u64;

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: ToastId,
    pub spec: ToastSpec,
}

/// 表示中トーストの並び（追加順）
#[derive(Debug, Default)]
pub struct ToastStack {
    next_id: ToastId,
    live: Vec<Toast>,
}

impl ToastStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, spec: ToastSpec) -> ToastId {
        self.next_id += 1;
        let id = self.next_id;
        self.live.push(Toast { id, spec });
        id
    }

    /// 削除する。既に消えていれば false
    pub fn remove(&mut self, id: ToastId) -> bool {
        match self.live.iter().position(|t| t.id == id) {
            Some(pos) => {
                self.live.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: ToastId) -> bool {
        self.live.iter().any(|t| t.id == id)
    }

    pub fn ids(&self) -> Vec<ToastId> {
        self.live.iter().map(|t| t.id).collect()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn clear(&mut self) {
        self.live.clear();
    }
}
