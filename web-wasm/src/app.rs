//! 診断フローのメインコンポーネント

use std::rc::Rc;

use derma_check_common::{FlowConfig, FlowController, FlowView, ModeKind};
use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::api::client::{HttpAnalysisApi, SelectedFile};
use crate::components::{
    intro::Intro, questionnaire::QuestionCard, result_panel::ResultPanel,
    upload_area::UploadArea,
};
use crate::host::BrowserHost;

pub type Controller = FlowController<HttpAnalysisApi, BrowserHost>;

/// フローの描画を差し込む要素のID
pub const FLOW_ROOT_ID: &str = "flow-root";

#[component]
pub fn App(config: FlowConfig) -> impl IntoView {
    let flow = RwSignal::new(FlowView::default());

    let controller = Rc::new(Controller::new(
        HttpAnalysisApi::new(&config),
        BrowserHost::new(&config),
        &config,
    ));
    controller.subscribe(move |view| flow.set(view.clone()));
    let controller = StoredValue::new_local(controller);

    {
        let c = controller.get_value();
        spawn_local(async move { c.initialize().await });
    }

    let on_start_questionnaire = move |_: ()| controller.get_value().start_questionnaire();
    let on_start_upload = move |_: ()| controller.get_value().start_upload();
    let on_restart = move |_: ()| controller.get_value().restart();

    let on_answer = move |value: String| {
        let c = controller.get_value();
        spawn_local(async move { c.answer(value).await });
    };

    let on_file_selected = move |file: Option<SelectedFile>| {
        let c = controller.get_value();
        spawn_local(async move { c.select_file(file).await });
    };

    let on_submit_image = move |_: ()| {
        let c = controller.get_value();
        spawn_local(async move { c.submit_image().await });
    };

    let mode = Memo::new(move |_| flow.with(|v| v.mode));

    view! {
        <div class="flow" data-mode=move || mode.get().as_str()>
            <Show when=move || mode.get() == ModeKind::Idle>
                <Intro
                    flow=flow
                    on_start_questionnaire=on_start_questionnaire
                    on_start_upload=on_start_upload
                />
            </Show>

            <Show when=move || mode.get() == ModeKind::Questionnaire>
                <QuestionCard flow=flow on_answer=on_answer on_restart=on_restart />
            </Show>

            <Show when=move || mode.get() == ModeKind::Upload>
                <UploadArea
                    flow=flow
                    on_file_selected=on_file_selected
                    on_submit=on_submit_image
                    on_restart=on_restart
                />
            </Show>

            <Show when=move || mode.get() == ModeKind::Result>
                <ResultPanel flow=flow on_restart=on_restart />
            </Show>
        </div>
    }
}
