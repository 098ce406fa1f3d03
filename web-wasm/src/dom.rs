//! DOM準備完了の待ち合わせ

use gloo::events::EventListener;
use gloo::utils::document;

/// DOMの解析が終わっていればすぐ、そうでなければ `DOMContentLoaded` で一度だけ呼ぶ
pub fn on_ready(f: impl FnOnce() + 'static) {
    let document = document();
    if document.ready_state() == "loading" {
        EventListener::once(&document, "DOMContentLoaded", move |_| f()).forget();
    } else {
        f();
    }
}

#[cfg(all(target_arch = "wasm32", test))]
mod wasm_tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn wasm_runs_immediately_after_load() {
        let called = Rc::new(Cell::new(false));
        let flag = called.clone();
        on_ready(move || flag.set(true));
        assert!(called.get());
    }
}
