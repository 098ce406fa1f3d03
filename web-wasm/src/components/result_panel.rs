//! 解析結果コンポーネント

use derma_check_common::{AnalysisResult, FlowView};
use leptos::prelude::*;

/// "Score: 4 / 8" 形式。スコアが無ければ None
fn score_line(result: &AnalysisResult) -> Option<String> {
    match (result.score(), result.total()) {
        (Some(score), Some(total)) => Some(format!("Score: {} / {}", score, total)),
        (Some(score), None) => Some(format!("Score: {}", score)),
        _ => None,
    }
}

fn level_class(result: &AnalysisResult) -> String {
    let level = result.level().unwrap_or("unknown").to_ascii_lowercase();
    format!("result-level level-{}", level)
}

#[component]
pub fn ResultPanel<FR>(flow: RwSignal<FlowView>, on_restart: FR) -> impl IntoView
where
    FR: Fn(()) + 'static + Clone + Send + Sync,
{
    let result = Memo::new(move |_| flow.with(|v| v.result.clone().unwrap_or_default()));
    let metrics = move || result.with(|r| r.metrics());

    view! {
        <section id="result" class="result-panel">
            <h2>"Your Result"</h2>
            <p class=move || result.with(level_class)>
                {move || result.with(|r| r.level().unwrap_or("-").to_string())}
            </p>
            <p class="result-score">
                {move || result.with(score_line).unwrap_or_default()}
            </p>
            <p class="result-description">
                {move || result.with(|r| r.description().unwrap_or_default().to_string())}
            </p>

            <Show when=move || !metrics().is_empty()>
                <ul class="result-metrics">
                    <For
                        each=metrics
                        key=|(name, _)| name.clone()
                        children=|(name, value)| {
                            view! {
                                <li>
                                    <span class="metric-name">{name}</span>
                                    <span class="metric-value">{format!("{:.1}", value)}</span>
                                </li>
                            }
                        }
                    />
                </ul>
            </Show>

            <button
                class="btn btn-primary"
                on:click={
                    let on_restart = on_restart.clone();
                    move |_| on_restart(())
                }
            >
                "Take Again"
            </button>
        </section>
    }
}
