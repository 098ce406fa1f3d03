//! 診断フローコントローラのテスト
//!
//! モックのAPIと画面ホストで、モード遷移・送信ガード・プレビューの世代管理を検証

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;
use derma_check_common::controller::{IMAGE_FAILURE_PREFIX, QUESTIONNAIRE_FAILURE};
use derma_check_common::{
    AnalysisApi, AnalysisResult, AnalyzeRequest, FlowConfig, FlowController, FlowError, Host,
    ModeKind, Question, Region, Result, UploadFile,
};
use futures::channel::oneshot;
use futures::executor::{block_on, LocalPool};
use futures::task::LocalSpawnExt;

#[derive(Debug, Clone, PartialEq)]
struct TestFile(String);

impl UploadFile for TestFile {
    fn file_name(&self) -> String {
        self.0.clone()
    }
}

#[derive(Default)]
struct Calls {
    analyze: Vec<AnalyzeRequest>,
    images: Vec<(String, String)>,
}

#[derive(Default, Clone)]
struct ApiKnobs {
    analyze_fails: Rc<Cell<bool>>,
    image_error: Rc<RefCell<Option<String>>>,
    analyze_gate: Rc<RefCell<Option<oneshot::Receiver<()>>>>,
    image_gate: Rc<RefCell<Option<oneshot::Receiver<()>>>>,
}

struct MockApi {
    questions: Option<Vec<Question>>,
    calls: Rc<RefCell<Calls>>,
    knobs: ApiKnobs,
}

fn result_json(level: &str) -> AnalysisResult {
    AnalysisResult::from_json(&format!(
        r#"{{"score": 2, "total": 8, "level": "{}", "description": "ok"}}"#,
        level
    ))
    .unwrap()
}

#[async_trait(?Send)]
impl AnalysisApi for MockApi {
    type File = TestFile;

    async fn fetch_questions(&self) -> Result<Vec<Question>> {
        self.questions
            .clone()
            .ok_or_else(|| FlowError::Network("offline".into()))
    }

    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalysisResult> {
        self.calls.borrow_mut().analyze.push(request.clone());
        let gate = self.knobs.analyze_gate.borrow_mut().take();
        if let Some(rx) = gate {
            let _ = rx.await;
        }
        if self.knobs.analyze_fails.get() {
            Err(FlowError::Status {
                status: 500,
                message: "boom".into(),
            })
        } else {
            Ok(result_json("Mild"))
        }
    }

    async fn analyze_image(&self, file: &TestFile, name: &str) -> Result<AnalysisResult> {
        self.calls
            .borrow_mut()
            .images
            .push((file.0.clone(), name.to_string()));
        let gate = self.knobs.image_gate.borrow_mut().take();
        if let Some(rx) = gate {
            let _ = rx.await;
        }
        match self.knobs.image_error.borrow().clone() {
            Some(message) => Err(FlowError::Status {
                status: 400,
                message,
            }),
            None => Ok(result_json("Low")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum HostEvent {
    Top,
    Scroll(Region),
    ScrollLater(Region, u32),
    Alert(String),
}

type DecodeReply = std::result::Result<String, String>;

#[derive(Default, Clone)]
struct MockHost {
    events: Rc<RefCell<Vec<HostEvent>>>,
    decodes: Rc<RefCell<HashMap<String, oneshot::Receiver<DecodeReply>>>>,
}

#[async_trait(?Send)]
impl Host for MockHost {
    type File = TestFile;

    fn scroll_to_top(&self) {
        self.events.borrow_mut().push(HostEvent::Top);
    }

    fn scroll_into_view(&self, region: Region) {
        self.events.borrow_mut().push(HostEvent::Scroll(region));
    }

    fn scroll_into_view_after(&self, region: Region, delay_ms: u32) {
        self.events
            .borrow_mut()
            .push(HostEvent::ScrollLater(region, delay_ms));
    }

    fn alert(&self, message: &str) {
        self.events
            .borrow_mut()
            .push(HostEvent::Alert(message.to_string()));
    }

    async fn read_as_data_url(&self, file: &TestFile) -> Result<String> {
        let pending = self.decodes.borrow_mut().remove(&file.0);
        match pending {
            Some(rx) => match rx.await {
                Ok(Ok(url)) => Ok(url),
                Ok(Err(e)) => Err(FlowError::Decode(e)),
                Err(_) => Err(FlowError::Decode("reader dropped".into())),
            },
            None => Ok(format!("data:image/png;base64,{}", file.0)),
        }
    }
}

struct Fixture {
    controller: Rc<FlowController<MockApi, MockHost>>,
    calls: Rc<RefCell<Calls>>,
    knobs: ApiKnobs,
    host: MockHost,
}

impl Fixture {
    fn new(questions: Option<Vec<Question>>) -> Self {
        let calls = Rc::new(RefCell::new(Calls::default()));
        let knobs = ApiKnobs::default();
        let host = MockHost::default();
        let api = MockApi {
            questions,
            calls: calls.clone(),
            knobs: knobs.clone(),
        };
        let controller = Rc::new(FlowController::new(api, host.clone(), &FlowConfig::default()));
        Self {
            controller,
            calls,
            knobs,
            host,
        }
    }

    fn with_questions(n: usize) -> Self {
        let fixture = Self::new(Some(questions(n)));
        block_on(fixture.controller.initialize());
        fixture
    }

    fn events(&self) -> Vec<HostEvent> {
        self.host.events.borrow().clone()
    }

    fn alerts(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                HostEvent::Alert(m) => Some(m),
                _ => None,
            })
            .collect()
    }
}

fn questions(n: usize) -> Vec<Question> {
    (0..n)
        .map(|i| Question::new(i.to_string(), format!("Question {}", i + 1)))
        .collect()
}

// =============================================
// 初期化
// =============================================

/// 設問の取得
#[test]
fn test_initialize_loads_questions() {
    let f = Fixture::with_questions(3);
    let view = f.controller.view();
    assert_eq!(view.mode, ModeKind::Idle);
    assert_eq!(view.question_count, 3);
    assert!(view.can_start_questionnaire());
}

/// 取得失敗時は設問が空のまま、設問モードに入れない
#[test]
fn test_initialize_failure_degrades_to_empty() {
    let f = Fixture::new(None);
    block_on(f.controller.initialize());

    assert_eq!(f.controller.view().question_count, 0);
    f.controller.start_questionnaire();
    assert_eq!(f.controller.mode(), ModeKind::Idle);
    assert!(f.events().is_empty());
}

// =============================================
// 設問フロー
// =============================================

/// 3問に回答すると1回だけ送信される
#[test]
fn test_three_answers_submit_once() {
    let f = Fixture::with_questions(3);
    f.controller.start_questionnaire();

    block_on(f.controller.answer("A"));
    block_on(f.controller.answer("B"));
    assert!(f.calls.borrow().analyze.is_empty());
    block_on(f.controller.answer("C"));

    let calls = f.calls.borrow();
    assert_eq!(calls.analyze.len(), 1);
    assert_eq!(calls.analyze[0].answers, vec!["A", "B", "C"]);
    assert_eq!(calls.analyze[0].name, "Anonymous");

    let view = f.controller.view();
    assert_eq!(view.mode, ModeKind::Result);
    assert_eq!(view.result.as_ref().and_then(|r| r.level()), Some("Mild"));

    assert_eq!(
        f.events(),
        vec![
            HostEvent::Top,
            HostEvent::Scroll(Region::Main),
            HostEvent::Scroll(Region::Main),
            HostEvent::ScrollLater(Region::Result, 200),
        ]
    );
}

/// 送信失敗時はダイアログを出し、最後の回答からやり直せる
#[test]
fn test_submit_failure_allows_retry() {
    let f = Fixture::with_questions(2);
    f.knobs.analyze_fails.set(true);
    f.controller.start_questionnaire();

    block_on(f.controller.answer("yes"));
    block_on(f.controller.answer("no"));

    assert_eq!(f.alerts(), vec![QUESTIONNAIRE_FAILURE.to_string()]);
    let view = f.controller.view();
    assert_eq!(view.mode, ModeKind::Questionnaire);
    assert_eq!(view.answers, vec!["yes"]);
    assert_eq!(view.question_index, 1);
    assert!(!view.submitting);

    f.knobs.analyze_fails.set(false);
    block_on(f.controller.answer("no"));

    let calls = f.calls.borrow();
    assert_eq!(calls.analyze.len(), 2);
    assert_eq!(calls.analyze[1].answers, vec!["yes", "no"]);
    assert_eq!(f.controller.mode(), ModeKind::Result);
}

/// 送信中の再送信・追加回答は無視される
#[test]
fn test_questionnaire_in_flight_guard() {
    let f = Fixture::with_questions(1);
    let (release, gate) = oneshot::channel();
    *f.knobs.analyze_gate.borrow_mut() = Some(gate);
    f.controller.start_questionnaire();

    let mut pool = LocalPool::new();
    let spawner = pool.spawner();
    for _ in 0..3 {
        let c = f.controller.clone();
        spawner
            .spawn_local(async move { c.answer("yes").await })
            .unwrap();
    }
    pool.run_until_stalled();

    assert!(f.controller.view().submitting);
    assert_eq!(f.calls.borrow().analyze.len(), 1);

    release.send(()).unwrap();
    pool.run_until_stalled();

    assert_eq!(f.calls.borrow().analyze.len(), 1);
    assert_eq!(f.calls.borrow().analyze[0].answers, vec!["yes"]);
    assert_eq!(f.controller.mode(), ModeKind::Result);
}

/// 送信中にやり直した場合、遅れて届いた結果は反映しない
#[test]
fn test_restart_during_submission_discards_response() {
    let f = Fixture::with_questions(1);
    let (release, gate) = oneshot::channel();
    *f.knobs.analyze_gate.borrow_mut() = Some(gate);
    f.controller.start_questionnaire();

    let mut pool = LocalPool::new();
    let c = f.controller.clone();
    pool.spawner()
        .spawn_local(async move { c.answer("yes").await })
        .unwrap();
    pool.run_until_stalled();

    f.controller.restart();
    release.send(()).unwrap();
    pool.run_until_stalled();

    assert_eq!(f.controller.mode(), ModeKind::Idle);
    assert!(f.controller.view().result.is_none());
    assert!(f.alerts().is_empty());
}

// =============================================
// アップロードフロー
// =============================================

/// ファイル未選択なら送信しない
#[test]
fn test_submit_image_without_file_is_noop() {
    let f = Fixture::with_questions(2);
    f.controller.start_upload();
    let before = f.controller.view();

    block_on(f.controller.submit_image());

    assert!(f.calls.borrow().images.is_empty());
    assert_eq!(f.controller.view(), before);
}

/// 送信中フラグは1回の送信で false→true→false
#[test]
fn test_uploading_flag_round_trip_on_success() {
    let f = Fixture::with_questions(0);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    f.controller
        .subscribe(move |view| log.borrow_mut().push(view.uploading));

    f.controller.start_upload();
    block_on(f.controller.select_file(Some(TestFile("face.png".into()))));
    seen.borrow_mut().clear();

    block_on(f.controller.submit_image());

    assert_eq!(*seen.borrow(), vec![true, false]);
    assert_eq!(f.controller.mode(), ModeKind::Result);
    assert_eq!(
        f.calls.borrow().images,
        vec![("face.png".to_string(), "Anonymous".to_string())]
    );
    assert!(f
        .events()
        .contains(&HostEvent::ScrollLater(Region::Result, 200)));
}

/// 失敗時もフラグは下り、サーバーの理由をダイアログに出す
#[test]
fn test_uploading_flag_round_trip_on_failure() {
    let f = Fixture::with_questions(0);
    *f.knobs.image_error.borrow_mut() = Some("Unsupported file type".into());
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    f.controller
        .subscribe(move |view| log.borrow_mut().push(view.uploading));

    f.controller.start_upload();
    block_on(f.controller.select_file(Some(TestFile("face.gif".into()))));
    seen.borrow_mut().clear();

    block_on(f.controller.submit_image());

    assert_eq!(*seen.borrow(), vec![true, false]);
    assert_eq!(f.controller.mode(), ModeKind::Upload);
    assert_eq!(
        f.alerts(),
        vec![format!("{}Unsupported file type", IMAGE_FAILURE_PREFIX)]
    );
    // ファイルは残るので再送できる
    assert_eq!(f.controller.view().file_name.as_deref(), Some("face.gif"));
}

/// 送信中の二重送信は無視される
#[test]
fn test_image_in_flight_guard() {
    let f = Fixture::with_questions(0);
    let (release, gate) = oneshot::channel();
    *f.knobs.image_gate.borrow_mut() = Some(gate);
    f.controller.start_upload();
    block_on(f.controller.select_file(Some(TestFile("face.png".into()))));

    let mut pool = LocalPool::new();
    let spawner = pool.spawner();
    for _ in 0..2 {
        let c = f.controller.clone();
        spawner
            .spawn_local(async move { c.submit_image().await })
            .unwrap();
    }
    pool.run_until_stalled();
    assert!(f.controller.view().uploading);
    assert_eq!(f.calls.borrow().images.len(), 1);

    release.send(()).unwrap();
    pool.run_until_stalled();
    assert!(!f.controller.view().uploading);
    assert_eq!(f.calls.borrow().images.len(), 1);
}

/// 古いファイルのデコード結果は新しい選択を上書きしない
#[test]
fn test_superseded_decode_is_discarded() {
    let f = Fixture::with_questions(0);
    let (send_a, recv_a) = oneshot::channel();
    let (send_b, recv_b) = oneshot::channel();
    f.host.decodes.borrow_mut().insert("a.png".into(), recv_a);
    f.host.decodes.borrow_mut().insert("b.png".into(), recv_b);
    f.controller.start_upload();

    let mut pool = LocalPool::new();
    let spawner = pool.spawner();
    for name in ["a.png", "b.png"] {
        let c = f.controller.clone();
        spawner
            .spawn_local(async move { c.select_file(Some(TestFile(name.into()))).await })
            .unwrap();
    }
    pool.run_until_stalled();

    send_b.send(Ok("data:b".into())).unwrap();
    pool.run_until_stalled();
    send_a.send(Ok("data:a".into())).unwrap();
    pool.run_until_stalled();

    let view = f.controller.view();
    assert_eq!(view.file_name.as_deref(), Some("b.png"));
    assert_eq!(view.preview.as_deref(), Some("data:b"));
}

/// デコード失敗はプレビューが空のまま
#[test]
fn test_decode_failure_leaves_preview_empty() {
    let f = Fixture::with_questions(0);
    let (send, recv) = oneshot::channel();
    f.host.decodes.borrow_mut().insert("broken.png".into(), recv);
    send.send(Err("not an image".into())).unwrap();
    f.controller.start_upload();

    block_on(f.controller.select_file(Some(TestFile("broken.png".into()))));

    let view = f.controller.view();
    assert!(view.has_file());
    assert_eq!(view.preview, None);
    assert!(f.alerts().is_empty());
}

/// 選択解除でプレビューも消える
#[test]
fn test_clear_selection() {
    let f = Fixture::with_questions(0);
    f.controller.start_upload();
    block_on(f.controller.select_file(Some(TestFile("face.png".into()))));
    assert!(f.controller.view().preview.is_some());

    block_on(f.controller.select_file(None));
    let view = f.controller.view();
    assert!(!view.has_file());
    assert_eq!(view.preview, None);
}

// =============================================
// モード切替とやり直し
// =============================================

/// 各モードの開始は他方の値を消す
#[test]
fn test_start_modes_clear_each_other() {
    let f = Fixture::with_questions(3);
    f.controller.start_questionnaire();
    block_on(f.controller.answer("yes"));

    f.controller.start_upload();
    let view = f.controller.view();
    assert_eq!(view.mode, ModeKind::Upload);
    assert!(view.answers.is_empty());

    block_on(f.controller.select_file(Some(TestFile("face.png".into()))));
    f.controller.start_questionnaire();
    let view = f.controller.view();
    assert_eq!(view.mode, ModeKind::Questionnaire);
    assert_eq!(view.question_index, 0);
    assert!(view.file_name.is_none());
    assert!(view.preview.is_none());
}

/// どのモードからでも同じ初期状態に戻る
#[test]
fn test_restart_converges_from_every_mode() {
    let fresh = Fixture::with_questions(2).controller.view();

    let idle = Fixture::with_questions(2);
    idle.controller.restart();
    assert_eq!(idle.controller.view(), fresh);

    let questionnaire = Fixture::with_questions(2);
    questionnaire.controller.start_questionnaire();
    block_on(questionnaire.controller.answer("yes"));
    questionnaire.controller.restart();
    assert_eq!(questionnaire.controller.view(), fresh);

    let upload = Fixture::with_questions(2);
    upload.controller.start_upload();
    block_on(upload.controller.select_file(Some(TestFile("face.png".into()))));
    upload.controller.restart();
    assert_eq!(upload.controller.view(), fresh);

    let result = Fixture::with_questions(2);
    result.controller.start_questionnaire();
    block_on(result.controller.answer("yes"));
    block_on(result.controller.answer("no"));
    assert_eq!(result.controller.mode(), ModeKind::Result);
    result.controller.restart();
    assert_eq!(result.controller.view(), fresh);
    assert_eq!(result.events().last(), Some(&HostEvent::Top));
}
