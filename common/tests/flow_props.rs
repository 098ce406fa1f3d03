//! 診断フロー状態の性質テスト

use derma_check_common::flow::AnswerStep;
use derma_check_common::{FlowState, ModeKind, Question, UploadFile};
use proptest::prelude::*;

#[derive(Debug, Clone, PartialEq)]
struct TestFile(String);

impl UploadFile for TestFile {
    fn file_name(&self) -> String {
        self.0.clone()
    }
}

#[derive(Debug, Clone)]
enum Action {
    StartQuestionnaire,
    StartUpload,
    Answer(String),
    SelectFile(Option<String>),
    Restart,
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        Just(Action::StartQuestionnaire),
        Just(Action::StartUpload),
        "[a-z]{1,4}".prop_map(Action::Answer),
        proptest::option::of("[a-z]{1,6}\\.png").prop_map(Action::SelectFile),
        Just(Action::Restart),
    ]
}

fn state_with(n: usize) -> FlowState<TestFile> {
    let mut state = FlowState::new();
    state.set_questions(
        (0..n)
            .map(|i| Question::new(i.to_string(), format!("Q{}", i)))
            .collect(),
    );
    state
}

fn apply(state: &mut FlowState<TestFile>, action: &Action) {
    match action {
        Action::StartQuestionnaire => {
            state.start_questionnaire();
        }
        Action::StartUpload => state.start_upload(),
        Action::Answer(v) => {
            state.record_answer(v.clone());
        }
        Action::SelectFile(name) => {
            state.select_file(name.clone().map(TestFile));
        }
        Action::Restart => state.restart(),
    }
}

proptest! {
    /// 回答数は呼び出し回数と一致し、最後の1問でだけ送信に進む
    #[test]
    fn answers_track_calls(n in 1usize..10, values in proptest::collection::vec("[a-z]{1,3}", 1..12)) {
        let mut state = state_with(n);
        state.start_questionnaire();

        let mut completes = 0;
        for (i, value) in values.iter().enumerate() {
            match state.record_answer(value.clone()) {
                AnswerStep::Advanced(index) => prop_assert_eq!(index, i + 1),
                AnswerStep::Complete => {
                    completes += 1;
                    prop_assert!(state.begin_submit().is_some());
                }
                AnswerStep::Ignored => {}
            }
        }

        let expected = values.len().min(n);
        let view = state.view();
        prop_assert_eq!(view.answers.len(), expected);
        prop_assert_eq!(&view.answers[..], &values[..expected]);
        prop_assert_eq!(completes, if values.len() >= n { 1 } else { 0 });
    }

    /// どんな操作列の後でもやり直しで同じ状態に戻る
    #[test]
    fn restart_converges(actions in proptest::collection::vec(action(), 0..20)) {
        let mut state = state_with(3);
        for a in &actions {
            apply(&mut state, a);
        }
        state.restart();
        prop_assert_eq!(state.view(), state_with(3).view());
    }

    /// 結果を持つのは結果モードのときだけ
    #[test]
    fn result_only_in_result_mode(actions in proptest::collection::vec(action(), 0..20)) {
        let mut state = state_with(2);
        for a in &actions {
            apply(&mut state, a);
            let view = state.view();
            prop_assert_eq!(view.result.is_some(), view.mode == ModeKind::Result);
            if view.mode != ModeKind::Upload {
                prop_assert!(view.file_name.is_none() && view.preview.is_none());
            }
            if view.mode != ModeKind::Questionnaire {
                prop_assert!(view.answers.is_empty());
            }
        }
    }
}
