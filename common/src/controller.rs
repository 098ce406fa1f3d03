//! 診断フローコントローラ
//!
//! 状態遷移は `FlowState` に任せ、ここではAPI呼び出しと画面側の副作用
//! （スクロール、ダイアログ、プレビュー生成）を順序付ける。
//! `RefCell` の借用は `.await` をまたがない。

use std::cell::RefCell;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::config::FlowConfig;
use crate::error::Result;
use crate::flow::{AnswerStep, FlowState, FlowView, ModeKind, UploadFile};
use crate::types::{AnalysisResult, AnalyzeRequest, Question};

/// 設問送信に失敗したときのダイアログ文言
pub const QUESTIONNAIRE_FAILURE: &str =
    "An error occurred while processing your test. Please try again.";

/// 画像解析に失敗したときのダイアログ文言（理由を後ろに付ける）
pub const IMAGE_FAILURE_PREFIX: &str = "Failed to analyze image. ";

/// 解析API
#[async_trait(?Send)]
pub trait AnalysisApi {
    type File: UploadFile;

    async fn fetch_questions(&self) -> Result<Vec<Question>>;

    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalysisResult>;

    async fn analyze_image(&self, file: &Self::File, name: &str) -> Result<AnalysisResult>;
}

/// スクロール先
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Main,
    Result,
}

/// 画面側の副作用
#[async_trait(?Send)]
pub trait Host {
    type File;

    fn scroll_to_top(&self);

    fn scroll_into_view(&self, region: Region);

    /// 表示直後の要素に向けて、少し待ってからスクロールする
    fn scroll_into_view_after(&self, region: Region, delay_ms: u32);

    /// 閉じるまで操作を止めるダイアログ
    fn alert(&self, message: &str);

    async fn read_as_data_url(&self, file: &Self::File) -> Result<String>;
}

type Observer = Box<dyn Fn(&FlowView)>;

pub struct FlowController<A, H>
where
    A: AnalysisApi,
    H: Host<File = A::File>,
{
    api: A,
    host: H,
    subject_name: String,
    result_scroll_delay_ms: u32,
    state: RefCell<FlowState<A::File>>,
    observer: RefCell<Option<Observer>>,
}

/// drop時に送信中フラグを下ろす
struct UploadingGuard<'a, F: UploadFile> {
    state: &'a RefCell<FlowState<F>>,
    epoch: u64,
}

impl<F: UploadFile> Drop for UploadingGuard<'_, F> {
    fn drop(&mut self) {
        self.state.borrow_mut().clear_uploading(self.epoch);
    }
}

impl<A, H> FlowController<A, H>
where
    A: AnalysisApi,
    H: Host<File = A::File>,
{
    pub fn new(api: A, host: H, config: &FlowConfig) -> Self {
        Self {
            api,
            host,
            subject_name: config.subject_name.clone(),
            result_scroll_delay_ms: config.result_scroll_delay_ms,
            state: RefCell::new(FlowState::new()),
            observer: RefCell::new(None),
        }
    }

    /// 状態が変わるたびに呼ばれるコールバックを登録する
    pub fn subscribe(&self, observer: impl Fn(&FlowView) + 'static) {
        *self.observer.borrow_mut() = Some(Box::new(observer));
        self.notify();
    }

    pub fn view(&self) -> FlowView {
        self.state.borrow().view()
    }

    pub fn mode(&self) -> ModeKind {
        self.state.borrow().kind()
    }

    fn notify(&self) {
        let view = self.state.borrow().view();
        if let Some(observer) = self.observer.borrow().as_ref() {
            observer(&view);
        }
    }

    /// 設問を取得する。失敗時はログのみで設問は空のまま
    pub async fn initialize(&self) {
        match self.api.fetch_questions().await {
            Ok(questions) => {
                debug!(count = questions.len(), "questions loaded");
                self.state.borrow_mut().set_questions(questions);
                self.notify();
            }
            Err(e) => error!(error = %e, "Error loading questions"),
        }
    }

    pub fn start_questionnaire(&self) {
        let started = self.state.borrow_mut().start_questionnaire();
        if !started {
            warn!("questionnaire cannot start without questions");
            return;
        }
        debug!("questionnaire started");
        self.notify();
        self.host.scroll_to_top();
    }

    pub async fn answer(&self, value: impl Into<String>) {
        let step = self.state.borrow_mut().record_answer(value.into());
        match step {
            AnswerStep::Advanced(index) => {
                debug!(index, "advanced to next question");
                self.notify();
                self.host.scroll_into_view(Region::Main);
            }
            AnswerStep::Complete => self.submit_questionnaire().await,
            AnswerStep::Ignored => warn!("answer ignored"),
        }
    }

    async fn submit_questionnaire(&self) {
        let Some((answers, epoch)) = self.state.borrow_mut().begin_submit() else {
            warn!("questionnaire submission already in flight");
            return;
        };
        self.notify();

        let request = AnalyzeRequest {
            answers,
            name: self.subject_name.clone(),
        };
        let outcome = self.api.analyze(&request).await;

        let failed = outcome.is_err();
        let result = match outcome {
            Ok(result) => Some(result),
            Err(e) => {
                error!(error = %e, "Error submitting test");
                None
            }
        };
        let applied = self.state.borrow_mut().finish_submit(epoch, result);
        if !applied {
            debug!("discarding stale questionnaire response");
            return;
        }
        self.notify();

        if failed {
            self.host.alert(QUESTIONNAIRE_FAILURE);
        } else {
            self.host
                .scroll_into_view_after(Region::Result, self.result_scroll_delay_ms);
        }
    }

    pub fn start_upload(&self) {
        self.state.borrow_mut().start_upload();
        debug!("upload started");
        self.notify();
        self.host.scroll_to_top();
    }

    /// ファイルを差し替え、プレビューを生成する
    ///
    /// デコード中に別のファイルが選ばれた場合、古いデコード結果は捨てる。
    pub async fn select_file(&self, file: Option<A::File>) {
        let pending = self.state.borrow_mut().select_file(file);
        self.notify();

        let Some((token, file)) = pending else {
            return;
        };
        match self.host.read_as_data_url(&file).await {
            Ok(data_url) => {
                if self.state.borrow_mut().apply_preview(token, data_url) {
                    self.notify();
                } else {
                    debug!(token, "discarding superseded preview");
                }
            }
            Err(e) => warn!(error = %e, "preview decode failed"),
        }
    }

    pub async fn submit_image(&self) {
        let Some((file, epoch)) = self.state.borrow_mut().begin_upload() else {
            return;
        };
        self.notify();

        let outcome = {
            let _busy = UploadingGuard {
                state: &self.state,
                epoch,
            };
            self.api.analyze_image(&file, &self.subject_name).await
        };

        match outcome {
            Ok(result) => {
                let applied = self.state.borrow_mut().finish_upload(epoch, result);
                self.notify();
                if applied {
                    self.host
                        .scroll_into_view_after(Region::Result, self.result_scroll_delay_ms);
                }
            }
            Err(e) => {
                error!(error = %e, "image analysis failed");
                self.notify();
                if self.state.borrow().epoch() == epoch {
                    self.host
                        .alert(&format!("{}{}", IMAGE_FAILURE_PREFIX, e.user_message()));
                }
            }
        }
    }

    pub fn restart(&self) {
        self.state.borrow_mut().restart();
        debug!("flow restarted");
        self.notify();
        self.host.scroll_to_top();
    }
}
