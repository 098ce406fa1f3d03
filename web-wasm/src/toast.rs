//! トースト表示サービス
//!
//! コンテナは最初の表示時に一度だけ作る。各トーストはTTL経過かクリックで消え、
//! どちらが先でも削除は `ToastStack` 上で一度だけ成立する。

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use derma_check_common::toast::{ToastId, ToastSpec, ToastStack};
use gloo::events::EventListener;
use gloo::timers::callback::Timeout;
use gloo::utils::document;
use web_sys::Element;

pub const CONTAINER_CLASS: &str = "toast-container";

struct Entry {
    element: Element,
    timer: Option<Timeout>,
    _listener: EventListener,
}

#[derive(Default)]
struct Inner {
    container: Option<Element>,
    stack: ToastStack,
    entries: HashMap<ToastId, Entry>,
}

#[derive(Clone, Default)]
pub struct ToastService {
    inner: Rc<RefCell<Inner>>,
}

fn remove_entry(inner: &RefCell<Inner>, id: ToastId) -> bool {
    let entry = {
        let mut inner = inner.borrow_mut();
        if !inner.stack.remove(id) {
            return false;
        }
        inner.entries.remove(&id)
    };
    if let Some(mut entry) = entry {
        entry.element.remove();
        if let Some(timer) = entry.timer.take() {
            timer.cancel();
        }
    }
    true
}

fn dismiss_weak(inner: &Weak<RefCell<Inner>>, id: ToastId) {
    if let Some(inner) = inner.upgrade() {
        remove_entry(&inner, id);
    }
}

impl ToastService {
    pub fn init() -> Self {
        Self::default()
    }

    fn ensure_container(&self) -> Option<Element> {
        if let Some(existing) = self.inner.borrow().container.as_ref() {
            if existing.is_connected() {
                return Some(existing.clone());
            }
        }
        let container = document().create_element("div").ok()?;
        container.set_class_name(CONTAINER_CLASS);
        document().body()?.append_child(&container).ok()?;
        self.inner.borrow_mut().container = Some(container.clone());
        Some(container)
    }

    fn render(spec: &ToastSpec) -> Option<Element> {
        let doc = document();
        let el = doc.create_element("div").ok()?;
        el.set_class_name(&format!("toast {}", spec.kind.as_str()));

        let title = doc.create_element("div").ok()?;
        title.set_class_name("title");
        title.set_text_content(Some(spec.display_title()));
        el.append_child(&title).ok()?;

        if !spec.description.is_empty() {
            let desc = doc.create_element("div").ok()?;
            desc.set_class_name("desc");
            desc.set_text_content(Some(&spec.description));
            el.append_child(&desc).ok()?;
        }
        Some(el)
    }

    /// トーストを追加する。DOMに出せなかった場合は None
    pub fn show(&self, spec: ToastSpec) -> Option<ToastId> {
        let container = self.ensure_container()?;
        let el = Self::render(&spec)?;
        container.append_child(&el).ok()?;

        let ttl_ms = spec.ttl_ms;
        let id = self.inner.borrow_mut().stack.push(spec);
        let weak = Rc::downgrade(&self.inner);

        let timer = {
            let weak = weak.clone();
            Timeout::new(ttl_ms, move || dismiss_weak(&weak, id))
        };
        let listener = EventListener::new(&el, "click", move |_| dismiss_weak(&weak, id));

        self.inner.borrow_mut().entries.insert(
            id,
            Entry {
                element: el,
                timer: Some(timer),
                _listener: listener,
            },
        );
        Some(id)
    }

    /// 即座に消す。既に消えていれば false
    pub fn dismiss(&self, id: ToastId) -> bool {
        remove_entry(&self.inner, id)
    }

    pub fn live_ids(&self) -> Vec<ToastId> {
        self.inner.borrow().stack.ids()
    }

    /// 表示中のトーストとコンテナを取り除く
    pub fn teardown(&self) {
        let (entries, container) = {
            let mut inner = self.inner.borrow_mut();
            inner.stack.clear();
            let entries: Vec<Entry> = inner.entries.drain().map(|(_, e)| e).collect();
            (entries, inner.container.take())
        };
        for entry in entries {
            entry.element.remove();
        }
        if let Some(container) = container {
            container.remove();
        }
    }
}

#[cfg(all(target_arch = "wasm32", test))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_futures::JsFuture;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    async fn sleep(ms: i32) {
        let promise = js_sys::Promise::new(&mut |resolve, _| {
            gloo::utils::window()
                .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms)
                .unwrap();
        });
        JsFuture::from(promise).await.unwrap();
    }

    fn toast_count() -> u32 {
        document().query_selector_all(".toast").unwrap().length()
    }

    #[wasm_bindgen_test]
    fn wasm_single_container() {
        let service = ToastService::init();
        service.show(ToastSpec::success("one")).unwrap();
        service.show(ToastSpec::error("", "two")).unwrap();

        let containers = document()
            .query_selector_all(&format!(".{}", CONTAINER_CLASS))
            .unwrap();
        assert_eq!(containers.length(), 1);
        assert_eq!(toast_count(), 2);
        service.teardown();
        assert_eq!(toast_count(), 0);
    }

    #[wasm_bindgen_test]
    fn wasm_toast_markup() {
        let service = ToastService::init();
        service.show(ToastSpec::error("", "Some fields need your attention.")).unwrap();

        let el = document().query_selector(".toast.error").unwrap().unwrap();
        let title = el.query_selector(".title").unwrap().unwrap();
        assert_eq!(title.text_content().as_deref(), Some("Error"));
        let desc = el.query_selector(".desc").unwrap().unwrap();
        assert_eq!(desc.text_content().as_deref(), Some("Some fields need your attention."));
        service.teardown();
    }

    #[wasm_bindgen_test]
    async fn wasm_toast_expires_after_ttl() {
        let service = ToastService::init();
        let id = service.show(ToastSpec::success("bye").with_ttl(20)).unwrap();
        assert_eq!(service.live_ids(), vec![id]);

        sleep(60).await;
        assert!(service.live_ids().is_empty());
        assert_eq!(toast_count(), 0);
        service.teardown();
    }

    #[wasm_bindgen_test]
    async fn wasm_click_dismisses_and_cancels_timer() {
        let service = ToastService::init();
        let id = service.show(ToastSpec::success("click me").with_ttl(30)).unwrap();

        let el: web_sys::HtmlElement = wasm_bindgen::JsCast::unchecked_into(
            document().query_selector(".toast").unwrap().unwrap(),
        );
        el.click();
        assert!(service.live_ids().is_empty());
        assert!(!service.dismiss(id));

        // タイマーが残っていても二重に消さない
        sleep(60).await;
        assert!(service.live_ids().is_empty());
        service.teardown();
    }
}
