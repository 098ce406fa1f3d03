//! ブラウザ側の副作用（スクロール、ダイアログ、プレビュー生成）

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use derma_check_common::{FlowConfig, FlowError, Host, Region, Result};
use futures::channel::oneshot;
use gloo::timers::callback::Timeout;
use gloo::utils::{document, window};
use wasm_bindgen::prelude::*;
use web_sys::{FileReader, ScrollBehavior, ScrollIntoViewOptions, ScrollToOptions};

use crate::api::client::{describe_js_error, SelectedFile};

pub struct BrowserHost {
    main_selector: String,
    result_selector: String,
}

impl BrowserHost {
    pub fn new(config: &FlowConfig) -> Self {
        Self {
            main_selector: config.main_selector.clone(),
            result_selector: config.result_selector.clone(),
        }
    }

    fn selector(&self, region: Region) -> &str {
        match region {
            Region::Main => &self.main_selector,
            Region::Result => &self.result_selector,
        }
    }
}

fn smooth_scroll_into_view(selector: &str) {
    if let Ok(Some(el)) = document().query_selector(selector) {
        let opts = ScrollIntoViewOptions::new();
        opts.set_behavior(ScrollBehavior::Smooth);
        el.scroll_into_view_with_scroll_into_view_options(&opts);
    }
}

#[async_trait(?Send)]
impl Host for BrowserHost {
    type File = SelectedFile;

    fn scroll_to_top(&self) {
        let opts = ScrollToOptions::new();
        opts.set_top(0.0);
        opts.set_behavior(ScrollBehavior::Smooth);
        window().scroll_to_with_scroll_to_options(&opts);
    }

    fn scroll_into_view(&self, region: Region) {
        smooth_scroll_into_view(self.selector(region));
    }

    fn scroll_into_view_after(&self, region: Region, delay_ms: u32) {
        let selector = self.selector(region).to_string();
        Timeout::new(delay_ms, move || smooth_scroll_into_view(&selector)).forget();
    }

    fn alert(&self, message: &str) {
        let _ = window().alert_with_message(message);
    }

    async fn read_as_data_url(&self, file: &SelectedFile) -> Result<String> {
        read_data_url(&file.0).await
    }
}

/// FileReaderでData URLを読む
pub async fn read_data_url(file: &web_sys::File) -> Result<String> {
    let reader = FileReader::new().map_err(|e| FlowError::Decode(describe_js_error(&e)))?;
    let (tx, rx) = oneshot::channel::<Result<String>>();
    let tx = Rc::new(RefCell::new(Some(tx)));

    let onload = {
        let tx = tx.clone();
        let reader = reader.clone();
        Closure::once_into_js(move |_: web_sys::ProgressEvent| {
            let outcome = reader
                .result()
                .ok()
                .and_then(|v| v.as_string())
                .ok_or_else(|| FlowError::Decode("FileReader returned no data URL".into()));
            if let Some(tx) = tx.borrow_mut().take() {
                let _ = tx.send(outcome);
            }
        })
    };
    let onerror = {
        let tx = tx.clone();
        Closure::once_into_js(move |_: web_sys::ProgressEvent| {
            if let Some(tx) = tx.borrow_mut().take() {
                let _ = tx.send(Err(FlowError::Decode("FileReader failed".into())));
            }
        })
    };
    reader.set_onload(Some(onload.unchecked_ref()));
    reader.set_onerror(Some(onerror.unchecked_ref()));

    reader
        .read_as_data_url(file)
        .map_err(|e| FlowError::Decode(describe_js_error(&e)))?;

    rx.await
        .map_err(|_| FlowError::Decode("FileReader dropped".into()))?
}
