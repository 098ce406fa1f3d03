//! 解析API連携
//!
//! fetchで `/api/questions`, `/api/analyze`, `/api/analyze_image` を呼ぶ。
//! JsValueのエラーはここで `FlowError` に変換する。

use async_trait::async_trait;
use derma_check_common::types::{failure_message, parse_questions};
use derma_check_common::{
    AnalysisApi, AnalysisResult, AnalyzeRequest, FlowConfig, FlowError, Question, Result,
    UploadFile,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{FormData, Request, RequestInit, RequestMode, Response};

/// 選択された画像ファイル
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFile(pub web_sys::File);

impl UploadFile for SelectedFile {
    fn file_name(&self) -> String {
        self.0.name()
    }
}

/// JsValueのエラーを文字列にする
pub fn describe_js_error(value: &JsValue) -> String {
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

fn network(value: JsValue) -> FlowError {
    FlowError::Network(describe_js_error(&value))
}

pub struct HttpAnalysisApi {
    questions_url: String,
    analyze_url: String,
    analyze_image_url: String,
}

impl HttpAnalysisApi {
    pub fn new(config: &FlowConfig) -> Self {
        Self {
            questions_url: config.questions_url.clone(),
            analyze_url: config.analyze_url.clone(),
            analyze_image_url: config.analyze_image_url.clone(),
        }
    }
}

/// fetchを実行し、ステータスと本文を返す
async fn send(request: &Request) -> Result<(u16, String)> {
    let window = web_sys::window().ok_or_else(|| FlowError::Network("no window".into()))?;
    let resp_value = JsFuture::from(window.fetch_with_request(request))
        .await
        .map_err(network)?;
    let resp: Response = resp_value.dyn_into().map_err(network)?;

    let text = JsFuture::from(resp.text().map_err(network)?)
        .await
        .map_err(network)?;
    Ok((resp.status(), text.as_string().unwrap_or_default()))
}

/// エンドポイントは別オリジンでもよいのでCORSで送る
fn build_request(method: &str, url: &str, body: Option<&JsValue>) -> Result<Request> {
    let opts = RequestInit::new();
    opts.set_method(method);
    opts.set_mode(RequestMode::Cors);
    if let Some(body) = body {
        opts.set_body(body);
    }
    Request::new_with_str_and_init(url, &opts).map_err(network)
}

fn check_status(status: u16, body: &str) -> Result<()> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(FlowError::Status {
            status,
            message: failure_message(body),
        })
    }
}

#[async_trait(?Send)]
impl AnalysisApi for HttpAnalysisApi {
    type File = SelectedFile;

    async fn fetch_questions(&self) -> Result<Vec<Question>> {
        let request = build_request("GET", &self.questions_url, None)?;
        let (status, body) = send(&request).await?;
        check_status(status, &body)?;
        parse_questions(&body)
    }

    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalysisResult> {
        let body = serde_json::to_string(request)?;

        let req = build_request("POST", &self.analyze_url, Some(&JsValue::from_str(&body)))?;
        req.headers()
            .set("Content-Type", "application/json")
            .map_err(network)?;

        let (status, body) = send(&req).await?;
        check_status(status, &body)?;
        AnalysisResult::from_json(&body)
    }

    async fn analyze_image(&self, file: &SelectedFile, name: &str) -> Result<AnalysisResult> {
        // Content-Typeはブラウザがboundary付きで設定する
        let form = FormData::new().map_err(network)?;
        form.append_with_blob_and_filename("image", &file.0, &file.0.name())
            .map_err(network)?;
        form.append_with_str("name", name).map_err(network)?;

        let body: &JsValue = &form;
        let req = build_request("POST", &self.analyze_image_url, Some(body))?;
        let (status, body) = send(&req).await?;
        check_status(status, &body)?;
        AnalysisResult::from_json(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_status_success() {
        assert!(check_status(200, "{}").is_ok());
        assert!(check_status(204, "").is_ok());
    }

    #[test]
    fn test_check_status_uses_error_field() {
        let err = check_status(400, r#"{"error": "No selected file"}"#).unwrap_err();
        match err {
            FlowError::Status { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "No selected file");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_check_status_generic_message() {
        let err = check_status(502, "Bad Gateway").unwrap_err();
        assert_eq!(err.user_message(), "Upload failed");
    }
}

#[cfg(all(target_arch = "wasm32", test))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn wasm_requests_allow_cross_origin() {
        let get = build_request("GET", "https://api.example/api/questions", None).unwrap();
        assert_eq!(get.mode(), RequestMode::Cors);
        assert_eq!(get.method(), "GET");

        let post = build_request("POST", "/api/analyze", Some(&JsValue::from_str("{}"))).unwrap();
        assert_eq!(post.mode(), RequestMode::Cors);
        assert_eq!(post.method(), "POST");
    }
}
