//! ページ遷移アニメーション
//!
//! `#transitionOverlay` に `in` / `out` クラスを付け外しする。
//! オーバーレイが無いページでは何もしない。

use derma_check_common::link::{classify, LinkClick, LinkDecision};
use derma_check_common::TransitionConfig;
use gloo::events::{EventListener, EventListenerOptions};
use gloo::timers::callback::Timeout;
use gloo::utils::{document, window};
use tracing::debug;
use url::Url;
use wasm_bindgen::prelude::*;
use web_sys::{Element, MouseEvent};

pub const CLASS_IN: &str = "in";
pub const CLASS_OUT: &str = "out";

/// 次のフレームで `in` を付け、少し後に `out` を付ける
fn play_entrance(overlay: &Element, delay_ms: u32) {
    let overlay = overlay.clone();
    let callback = Closure::once_into_js(move || {
        let _ = overlay.class_list().add_1(CLASS_IN);
        Timeout::new(delay_ms, move || {
            let _ = overlay.class_list().add_1(CLASS_OUT);
        })
        .forget();
    });
    let _ = window().request_animation_frame(callback.unchecked_ref());
}

/// 退出アニメーション（`out` を外して `in` を付け直す）
fn play_exit(overlay: &Element) {
    let classes = overlay.class_list();
    let _ = classes.remove_1(CLASS_OUT);
    let _ = classes.add_1(CLASS_IN);
}

/// クリックされたアンカーの属性を読む
fn link_click(anchor: &Element, event: &MouseEvent) -> LinkClick {
    LinkClick {
        href: anchor.get_attribute("href"),
        target: anchor.get_attribute("target"),
        rel: anchor.get_attribute("rel"),
        download: anchor.has_attribute("download"),
        no_transition: anchor.get_attribute("data-no-transition").as_deref() == Some("true"),
        modifier: event.meta_key() || event.ctrl_key() || event.shift_key() || event.alt_key(),
    }
}

/// オーバーレイがあれば入場アニメーションを再生し、リンククリックを横取りする
///
/// リスナーはdocumentに一つだけ付けるので、後から追加されたリンクにも効く。
/// 返したリスナーを破棄すると横取りをやめる。
pub fn mount(config: &TransitionConfig) -> Option<EventListener> {
    let document = document();
    let overlay = document.get_element_by_id(&config.overlay_id)?;
    play_entrance(&overlay, config.entrance_delay_ms);

    let navigate_delay_ms = config.navigate_delay_ms;
    let listener = EventListener::new_with_options(
        &document,
        "click",
        EventListenerOptions::enable_prevent_default(),
        move |event| {
            let Some(mouse) = event.dyn_ref::<MouseEvent>() else {
                return;
            };
            let anchor = event
                .target()
                .and_then(|t| t.dyn_into::<Element>().ok())
                .and_then(|el| el.closest("a").ok().flatten());
            let Some(anchor) = anchor else {
                return;
            };
            let Ok(Ok(current)) = window().location().href().map(|h| Url::parse(&h)) else {
                return;
            };

            match classify(&link_click(&anchor, mouse), &current) {
                LinkDecision::Intercept(url) => {
                    event.prevent_default();
                    play_exit(&overlay);
                    debug!(%url, "navigating after transition");
                    Timeout::new(navigate_delay_ms, move || {
                        let _ = window().location().set_href(url.as_str());
                    })
                    .forget();
                }
                LinkDecision::Pass(reason) => debug!(?reason, "link passed through"),
            }
        },
    );
    Some(listener)
}

#[cfg(all(target_arch = "wasm32", test))]
mod wasm_tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use wasm_bindgen_test::*;
    use web_sys::MouseEventInit;

    wasm_bindgen_test_configure!(run_in_browser);

    fn anchor(html: &str) -> Element {
        let holder = document().create_element("div").unwrap();
        holder.set_inner_html(html);
        holder.first_element_child().unwrap()
    }

    fn click() -> MouseEvent {
        MouseEvent::new("click").unwrap()
    }

    #[wasm_bindgen_test]
    fn wasm_link_click_reads_attributes() {
        let a = anchor(
            r#"<a href="/report.pdf" download target="_blank" rel="external" data-no-transition="true">x</a>"#,
        );
        let link = link_click(&a, &click());
        assert_eq!(link.href.as_deref(), Some("/report.pdf"));
        assert_eq!(link.target.as_deref(), Some("_blank"));
        assert_eq!(link.rel.as_deref(), Some("external"));
        assert!(link.download);
        assert!(link.no_transition);
        assert!(!link.modifier);
    }

    #[wasm_bindgen_test]
    fn wasm_play_exit_swaps_classes() {
        let overlay = document().create_element("div").unwrap();
        overlay.class_list().add_2(CLASS_IN, CLASS_OUT).unwrap();

        play_exit(&overlay);

        assert!(overlay.class_list().contains(CLASS_IN));
        assert!(!overlay.class_list().contains(CLASS_OUT));
    }

    /// documentのリスナーの後に走り、判定結果を記録してから実際の遷移を止める
    fn record_prevented(flag: Rc<Cell<Option<bool>>>) -> EventListener {
        EventListener::new_with_options(
            &window(),
            "click",
            EventListenerOptions::enable_prevent_default(),
            move |event| {
                flag.set(Some(event.default_prevented()));
                event.prevent_default();
            },
        )
    }

    fn click_on(el: &Element) {
        let init = MouseEventInit::new();
        init.set_bubbles(true);
        init.set_cancelable(true);
        let event = MouseEvent::new_with_mouse_event_init_dict("click", &init).unwrap();
        el.dispatch_event(&event).unwrap();
    }

    #[wasm_bindgen_test]
    fn wasm_mount_intercepts_internal_links_only() {
        let overlay = document().create_element("div").unwrap();
        overlay.set_id("transitionTestOverlay");
        overlay.class_list().add_2(CLASS_IN, CLASS_OUT).unwrap();
        let body = document().body().unwrap();
        body.append_child(&overlay).unwrap();
        let internal = anchor(r#"<a href="/x">in</a>"#);
        let external = anchor(r#"<a href="https://external.example/x">out</a>"#);
        body.append_child(&internal).unwrap();
        body.append_child(&external).unwrap();

        let config = TransitionConfig {
            overlay_id: "transitionTestOverlay".into(),
            entrance_delay_ms: 600_000,
            navigate_delay_ms: 600_000,
        };
        let listener = mount(&config).unwrap();
        let prevented = Rc::new(Cell::new(None));
        let recorder = record_prevented(prevented.clone());

        click_on(&external);
        assert_eq!(prevented.get(), Some(false));
        assert!(overlay.class_list().contains(CLASS_IN));
        assert!(overlay.class_list().contains(CLASS_OUT));

        click_on(&internal);
        assert_eq!(prevented.get(), Some(true));
        assert!(overlay.class_list().contains(CLASS_IN));
        assert!(!overlay.class_list().contains(CLASS_OUT));

        drop(recorder);
        drop(listener);
        internal.remove();
        external.remove();
        overlay.remove();
    }

    #[wasm_bindgen_test]
    fn wasm_mount_without_overlay_is_noop() {
        let config = TransitionConfig {
            overlay_id: "noSuchOverlay".into(),
            ..TransitionConfig::default()
        };
        assert!(mount(&config).is_none());
    }

    #[wasm_bindgen_test]
    fn wasm_external_link_not_intercepted() {
        let a = anchor(r#"<a href="https://external.example/x">x</a>"#);
        let current = Url::parse(&window().location().href().unwrap()).unwrap();
        assert!(!classify(&link_click(&a, &click()), &current).is_intercept());
    }
}
