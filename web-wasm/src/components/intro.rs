//! 開始画面コンポーネント

use derma_check_common::FlowView;
use leptos::prelude::*;

#[component]
pub fn Intro<FQ, FU>(
    flow: RwSignal<FlowView>,
    on_start_questionnaire: FQ,
    on_start_upload: FU,
) -> impl IntoView
where
    FQ: Fn(()) + 'static + Clone + Send + Sync,
    FU: Fn(()) + 'static + Clone + Send + Sync,
{
    let can_start = move || flow.with(|v| v.can_start_questionnaire());

    view! {
        <section class="intro">
            <h2>"How sensitive is your skin?"</h2>
            <p class="text-muted">
                "Answer a few quick questions or upload a photo for an instant assessment."
            </p>
            <div class="intro-actions">
                <button
                    class="btn btn-primary"
                    disabled=move || !can_start()
                    on:click={
                        let on_start_questionnaire = on_start_questionnaire.clone();
                        move |_| on_start_questionnaire(())
                    }
                >
                    "Start Questionnaire"
                </button>
                <button
                    class="btn btn-secondary"
                    on:click={
                        let on_start_upload = on_start_upload.clone();
                        move |_| on_start_upload(())
                    }
                >
                    "Upload a Photo"
                </button>
            </div>
        </section>
    }
}
