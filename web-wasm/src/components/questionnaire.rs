//! 設問カードコンポーネント

use derma_check_common::FlowView;
use leptos::prelude::*;

use crate::components::progress_bar::ProgressBar;

/// 選択肢の表示名（先頭だけ大文字）
fn choice_label(choice: &str) -> String {
    let mut chars = choice.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[component]
pub fn QuestionCard<FA, FR>(
    flow: RwSignal<FlowView>,
    on_answer: FA,
    on_restart: FR,
) -> impl IntoView
where
    FA: Fn(String) + 'static + Clone + Send + Sync,
    FR: Fn(()) + 'static + Clone + Send + Sync,
{
    let question = Memo::new(move |_| flow.with(|v| v.current_question.clone()));
    let submitting = move || flow.with(|v| v.submitting);

    let progress = Signal::derive(move || {
        flow.with(|v| {
            let (current, total) = v.progress();
            if total == 0 {
                0.0
            } else {
                current as f32 / total as f32
            }
        })
    });
    let label = Signal::derive(move || {
        flow.with(|v| {
            let (current, total) = v.progress();
            format!("Question {} of {}", current, total)
        })
    });

    view! {
        <section class="questionnaire">
            <ProgressBar progress=progress label=label />

            <h3 class="question-text">
                {move || question.get().map(|q| q.text).unwrap_or_default()}
            </h3>

            <div class="choices">
                <For
                    each=move || {
                        question
                            .get()
                            .map(|q| q.choices.into_iter().enumerate().collect::<Vec<_>>())
                            .unwrap_or_default()
                    }
                    key=|(i, choice)| (*i, choice.clone())
                    children=move |(_, choice)| {
                        let on_answer = on_answer.clone();
                        let text = choice_label(&choice);
                        view! {
                            <button
                                class="btn btn-choice"
                                disabled=submitting
                                on:click=move |_| on_answer(choice.clone())
                            >
                                {text}
                            </button>
                        }
                    }
                />
            </div>

            <Show when=submitting>
                <p class="text-muted">"Analyzing your answers..."</p>
            </Show>

            <button
                class="btn btn-tertiary"
                on:click={
                    let on_restart = on_restart.clone();
                    move |_| on_restart(())
                }
            >
                "Start over"
            </button>
        </section>
    }
}
