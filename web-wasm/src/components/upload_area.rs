//! 画像アップロードコンポーネント

use derma_check_common::FlowView;
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{DragEvent, FileList, HtmlInputElement};

use crate::api::client::SelectedFile;

/// サーバーが受け付ける形式
const ACCEPTED_TYPES: &str = "image/png,image/jpeg,image/webp";

fn first_file(files: Option<FileList>) -> Option<SelectedFile> {
    files.and_then(|list| list.get(0)).map(SelectedFile)
}

#[component]
pub fn UploadArea<FF, FS, FR>(
    flow: RwSignal<FlowView>,
    on_file_selected: FF,
    on_submit: FS,
    on_restart: FR,
) -> impl IntoView
where
    FF: Fn(Option<SelectedFile>) + 'static + Clone + Send + Sync,
    FS: Fn(()) + 'static + Clone + Send + Sync,
    FR: Fn(()) + 'static + Clone + Send + Sync,
{
    let (is_dragover, set_is_dragover) = signal(false);
    let uploading = move || flow.with(|v| v.uploading);
    let has_file = move || flow.with(|v| v.has_file());
    let preview = move || flow.with(|v| v.preview.clone());

    let on_change = {
        let on_file_selected = on_file_selected.clone();
        move |ev: web_sys::Event| {
            let input = ev
                .target()
                .and_then(|t| t.dyn_into::<HtmlInputElement>().ok());
            if let Some(input) = input {
                on_file_selected(first_file(input.files()));
            }
        }
    };

    let on_drop = {
        let on_file_selected = on_file_selected.clone();
        move |ev: DragEvent| {
            ev.prevent_default();
            set_is_dragover.set(false);
            if uploading() {
                return;
            }
            if let Some(dt) = ev.data_transfer() {
                if let Some(file) = first_file(dt.files()) {
                    on_file_selected(Some(file));
                }
            }
        }
    };

    let on_dragover = move |ev: DragEvent| {
        ev.prevent_default();
        set_is_dragover.set(true);
    };

    let on_dragleave = move |_: DragEvent| {
        set_is_dragover.set(false);
    };

    view! {
        <section class="upload">
            <label
                class=move || {
                    let mut classes = vec!["upload-area"];
                    if is_dragover.get() {
                        classes.push("dragover");
                    }
                    if uploading() {
                        classes.push("disabled");
                    }
                    classes.join(" ")
                }
                on:drop=on_drop
                on:dragover=on_dragover
                on:dragleave=on_dragleave
            >
                <input
                    type="file"
                    class="upload-input"
                    accept=ACCEPTED_TYPES
                    disabled=uploading
                    on:change=on_change
                />
                <Show
                    when=move || preview().is_some()
                    fallback=|| view! {
                        <div class="upload-icon">"📷"</div>
                        <p>"Drag & drop a clear, well-lit photo or click to choose"</p>
                        <p class="text-muted">"Supported formats: PNG, JPEG, WEBP"</p>
                    }
                >
                    <img class="upload-preview" src=move || preview().unwrap_or_default() alt="Selected photo" />
                </Show>
            </label>

            <p class="upload-file-name">
                {move || flow.with(|v| v.file_name.clone()).unwrap_or_default()}
            </p>

            <div class="upload-actions">
                <button
                    class="btn btn-primary"
                    disabled=move || !has_file() || uploading()
                    on:click={
                        let on_submit = on_submit.clone();
                        move |_| on_submit(())
                    }
                >
                    {move || if uploading() { "Analyzing..." } else { "Analyze Image" }}
                </button>
                <button
                    class="btn btn-tertiary"
                    disabled=uploading
                    on:click={
                        let on_restart = on_restart.clone();
                        move |_| on_restart(())
                    }
                >
                    "Back"
                </button>
            </div>
        </section>
    }
}
