//! ページ埋め込み設定の読み込み

use derma_check_common::config::CONFIG_ELEMENT_ID;
use derma_check_common::AppConfig;
use gloo::utils::document;
use tracing::{debug, warn};

/// `<script type="application/json" id="app-config">` を読む
///
/// 要素が無い、または壊れている場合は既定値で続行する。
pub fn load() -> AppConfig {
    let Some(el) = document().get_element_by_id(CONFIG_ELEMENT_ID) else {
        debug!("no embedded config, using defaults");
        return AppConfig::default();
    };
    let text = el.text_content().unwrap_or_default();
    match AppConfig::from_json(&text) {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "embedded config ignored");
            AppConfig::default()
        }
    }
}

#[cfg(all(target_arch = "wasm32", test))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn embed(json: &str) -> web_sys::Element {
        let el = document().create_element("script").unwrap();
        el.set_attribute("type", "application/json").unwrap();
        el.set_id(CONFIG_ELEMENT_ID);
        el.set_text_content(Some(json));
        document().body().unwrap().append_child(&el).unwrap();
        el
    }

    #[wasm_bindgen_test]
    fn wasm_load_without_element() {
        assert_eq!(load(), AppConfig::default());
    }

    #[wasm_bindgen_test]
    fn wasm_load_embedded() {
        let el = embed(r#"{"forms": {"registration_page": true}}"#);
        assert_eq!(load().forms.registration_page, Some(true));
        el.remove();
    }

    #[wasm_bindgen_test]
    fn wasm_load_broken_falls_back() {
        let el = embed("{not json");
        assert_eq!(load(), AppConfig::default());
        el.remove();
    }
}
