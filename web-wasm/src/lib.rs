//! Derma Check ブラウザ側コントローラ (Leptos + WASM)
//!
//! 読み込み時に設定を読み、診断フローを `#flow-root` に描画し、
//! ページ遷移とフォーム補強を取り付ける。

mod api;
mod app;
mod components;
mod config;
mod dom;
mod forms;
mod host;
mod toast;
mod transition;

use gloo::utils::document;
use leptos::prelude::*;
use tracing::{debug, info};
use wasm_bindgen::prelude::*;

use crate::app::{App, FLOW_ROOT_ID};
use crate::forms::FormEnhancer;
use crate::toast::ToastService;

#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();
    dom::on_ready(boot);
}

fn boot() {
    let config = config::load();

    match document()
        .get_element_by_id(FLOW_ROOT_ID)
        .and_then(|el| el.dyn_into::<web_sys::HtmlElement>().ok())
    {
        Some(root) => {
            let flow = config.flow.clone();
            leptos::mount::mount_to(root, move || view! { <App config=flow /> }).forget();
        }
        None => debug!("no flow root on this page"),
    }

    if let Some(listener) = transition::mount(&config.transition) {
        listener.forget();
    }

    let toasts = ToastService::init();
    FormEnhancer::new(config.forms, toasts).run();
    info!("page enhancements ready");
}
