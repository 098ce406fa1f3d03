//! リンククリックの判定
//!
//! 遷移アニメーションを挟むのは同一オリジンのアプリ内リンクだけ。

use url::Url;

/// クリックされたアンカーの属性
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkClick {
    pub href: Option<String>,
    pub target: Option<String>,
    pub rel: Option<String>,
    pub download: bool,
    pub no_transition: bool,
    pub modifier: bool,
}

/// 素通しする理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassReason {
    Modifier,
    NewTab,
    Download,
    External,
    NoTransition,
    MissingHref,
    Fragment,
    CrossOrigin,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LinkDecision {
    /// 既定の遷移を止め、アニメーション後にこのURLへ移動する
    Intercept(Url),
    Pass(PassReason),
}

impl LinkDecision {
    pub fn is_intercept(&self) -> bool {
        matches!(self, LinkDecision::Intercept(_))
    }
}

pub fn classify(link: &LinkClick, current: &Url) -> LinkDecision {
    if link.modifier {
        return LinkDecision::Pass(PassReason::Modifier);
    }
    if link.target.as_deref() == Some("_blank") {
        return LinkDecision::Pass(PassReason::NewTab);
    }
    if link.download {
        return LinkDecision::Pass(PassReason::Download);
    }
    let external = link
        .rel
        .as_deref()
        .map(|rel| rel.split_ascii_whitespace().any(|t| t.eq_ignore_ascii_case("external")))
        .unwrap_or(false);
    if external {
        return LinkDecision::Pass(PassReason::External);
    }
    if link.no_transition {
        return LinkDecision::Pass(PassReason::NoTransition);
    }

    let href = match link.href.as_deref().map(str::trim) {
        Some(h) if !h.is_empty() => h,
        _ => return LinkDecision::Pass(PassReason::MissingHref),
    };
    if href.starts_with('#') {
        return LinkDecision::Pass(PassReason::Fragment);
    }

    match current.join(href) {
        Ok(resolved) if same_origin(&resolved, current) => LinkDecision::Intercept(resolved),
        _ => LinkDecision::Pass(PassReason::CrossOrigin),
    }
}

/// スキーム・ホスト・ポートが一致するか
pub fn same_origin(a: &Url, b: &Url) -> bool {
    let origin = a.origin();
    origin.is_tuple() && origin == b.origin()
}
