//! 診断フローの状態
//!
//! 表示モードは `Mode` 一つで表し、モード固有の値はバリアントの中に持つ。
//! 非同期処理の完了時は `epoch`（モード開始ごとに増える）と
//! プレビューの `generation` を照合し、古い完了は捨てる。

use serde::{Deserialize, Serialize};

use crate::types::{AnalysisResult, Question};

/// アップロード対象のファイル
pub trait UploadFile: Clone {
    fn file_name(&self) -> String;
}

/// 表示モードの種類
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeKind {
    #[default]
    Idle,
    Questionnaire,
    Upload,
    Result,
}

impl ModeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModeKind::Idle => "idle",
            ModeKind::Questionnaire => "questionnaire",
            ModeKind::Upload => "upload",
            ModeKind::Result => "result",
        }
    }
}

/// 表示モード
#[derive(Debug, Clone, PartialEq)]
pub enum Mode<F> {
    Idle,
    Questionnaire {
        index: usize,
        answers: Vec<String>,
        submitting: bool,
    },
    Upload {
        file: Option<F>,
        preview: Option<String>,
        /// 現在のファイルに対応するプレビュー世代
        generation: u64,
        uploading: bool,
    },
    Result(AnalysisResult),
}

impl<F> Mode<F> {
    pub fn kind(&self) -> ModeKind {
        match self {
            Mode::Idle => ModeKind::Idle,
            Mode::Questionnaire { .. } => ModeKind::Questionnaire,
            Mode::Upload { .. } => ModeKind::Upload,
            Mode::Result(_) => ModeKind::Result,
        }
    }
}

/// 回答を記録した結果
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerStep {
    /// 次の設問へ進んだ
    Advanced(usize),
    /// 最後の設問に回答した。送信へ進む
    Complete,
    /// 設問モード外、または送信中
    Ignored,
}

/// ビュー向けのスナップショット（ファイルハンドルを含まない）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowView {
    pub mode: ModeKind,
    pub question_index: usize,
    pub question_count: usize,
    pub current_question: Option<Question>,
    pub answers: Vec<String>,
    pub file_name: Option<String>,
    pub preview: Option<String>,
    pub uploading: bool,
    pub submitting: bool,
    pub result: Option<AnalysisResult>,
}

impl FlowView {
    pub fn can_start_questionnaire(&self) -> bool {
        self.question_count > 0
    }

    pub fn has_file(&self) -> bool {
        self.file_name.is_some()
    }

    /// 1始まりの進捗（"3 / 8" 表示用）
    pub fn progress(&self) -> (usize, usize) {
        (self.question_index + 1, self.question_count)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowState<F> {
    questions: Vec<Question>,
    mode: Mode<F>,
    epoch: u64,
    next_generation: u64,
}

impl<F> Default for FlowState<F> {
    fn default() -> Self {
        Self {
            questions: Vec::new(),
            mode: Mode::Idle,
            epoch: 0,
            next_generation: 0,
        }
    }
}

impl<F: UploadFile> FlowState<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> &Mode<F> {
        &self.mode
    }

    pub fn kind(&self) -> ModeKind {
        self.mode.kind()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn set_questions(&mut self, questions: Vec<Question>) {
        self.questions = questions;
    }

    fn enter(&mut self, mode: Mode<F>) {
        self.epoch += 1;
        self.mode = mode;
    }

    /// 設問モードを開始する。設問が無ければ開始しない
    pub fn start_questionnaire(&mut self) -> bool {
        if self.questions.is_empty() {
            return false;
        }
        self.enter(Mode::Questionnaire {
            index: 0,
            answers: Vec::new(),
            submitting: false,
        });
        true
    }

    pub fn record_answer(&mut self, value: String) -> AnswerStep {
        let last = self.questions.len().saturating_sub(1);
        match &mut self.mode {
            Mode::Questionnaire {
                index,
                answers,
                submitting: false,
            } => {
                answers.push(value);
                if *index < last {
                    *index += 1;
                    AnswerStep::Advanced(*index)
                } else {
                    AnswerStep::Complete
                }
            }
            _ => AnswerStep::Ignored,
        }
    }

    /// 送信を開始する。送信中フラグを立て、送る回答とepochを返す
    pub fn begin_submit(&mut self) -> Option<(Vec<String>, u64)> {
        let epoch = self.epoch;
        let total = self.questions.len();
        match &mut self.mode {
            Mode::Questionnaire {
                answers,
                submitting,
                ..
            } if !*submitting && answers.len() == total => {
                *submitting = true;
                Some((answers.clone(), epoch))
            }
            _ => None,
        }
    }

    /// 送信結果を反映する。epochが変わっていれば何もしない
    ///
    /// 失敗時は最後の回答を取り消し、同じ回答操作で再送できる状態に戻す。
    pub fn finish_submit(&mut self, epoch: u64, outcome: Option<AnalysisResult>) -> bool {
        if epoch != self.epoch {
            return false;
        }
        if self.kind() != ModeKind::Questionnaire {
            return false;
        }
        let total = self.questions.len();
        match outcome {
            Some(result) => self.mode = Mode::Result(result),
            None => {
                if let Mode::Questionnaire {
                    answers,
                    submitting,
                    ..
                } = &mut self.mode
                {
                    *submitting = false;
                    if answers.len() == total {
                        answers.pop();
                    }
                }
            }
        }
        true
    }

    pub fn start_upload(&mut self) {
        self.enter(Mode::Upload {
            file: None,
            preview: None,
            generation: 0,
            uploading: false,
        });
    }

    /// ファイルを差し替える。デコードが必要なら世代番号とファイルを返す
    pub fn select_file(&mut self, selected: Option<F>) -> Option<(u64, F)> {
        self.next_generation += 1;
        let token = self.next_generation;
        match &mut self.mode {
            Mode::Upload {
                file,
                preview,
                generation,
                ..
            } => {
                *generation = token;
                *preview = None;
                *file = selected.clone();
                selected.map(|f| (token, f))
            }
            _ => None,
        }
    }

    /// デコード結果を反映する。世代が古ければ捨てる
    pub fn apply_preview(&mut self, token: u64, data_url: String) -> bool {
        match &mut self.mode {
            Mode::Upload {
                file: Some(_),
                preview,
                generation,
                ..
            } if *generation == token => {
                *preview = Some(data_url);
                true
            }
            _ => false,
        }
    }

    /// 画像送信を開始する。ファイルが無いか送信中なら None
    pub fn begin_upload(&mut self) -> Option<(F, u64)> {
        let epoch = self.epoch;
        match &mut self.mode {
            Mode::Upload {
                file: Some(file),
                uploading,
                ..
            } if !*uploading => {
                *uploading = true;
                Some((file.clone(), epoch))
            }
            _ => None,
        }
    }

    /// 送信中フラグを下ろす（成功・失敗どちらでも呼ぶ）
    pub fn clear_uploading(&mut self, epoch: u64) {
        if epoch != self.epoch {
            return;
        }
        if let Mode::Upload { uploading, .. } = &mut self.mode {
            *uploading = false;
        }
    }

    pub fn finish_upload(&mut self, epoch: u64, result: AnalysisResult) -> bool {
        if epoch != self.epoch || self.kind() != ModeKind::Upload {
            return false;
        }
        self.mode = Mode::Result(result);
        true
    }

    /// 設問以外を初期状態に戻す
    pub fn restart(&mut self) {
        self.enter(Mode::Idle);
    }

    pub fn view(&self) -> FlowView {
        let mut view = FlowView {
            mode: self.kind(),
            question_count: self.questions.len(),
            ..FlowView::default()
        };
        match &self.mode {
            Mode::Idle => {}
            Mode::Questionnaire {
                index,
                answers,
                submitting,
            } => {
                view.question_index = *index;
                view.current_question = self.questions.get(*index).cloned();
                view.answers = answers.clone();
                view.submitting = *submitting;
            }
            Mode::Upload {
                file,
                preview,
                uploading,
                ..
            } => {
                view.file_name = file.as_ref().map(UploadFile::file_name);
                view.preview = preview.clone();
                view.uploading = *uploading;
            }
            Mode::Result(result) => {
                view.result = Some(result.clone());
            }
        }
        view
    }
}
