//! サーバー描画フォームの補強
//!
//! テンプレートには手を入れず、読み込み時にフォームを走査して
//! 入力検証、送信ガード、パスワード表示切替、強度メーターを付ける。
//! 判定ルールは `derma_check_common::forms` 側にある。

use std::rc::Rc;

use derma_check_common::forms::{
    flash_kind, flash_selector, hardening_for, initial_focus, is_post_form,
    is_registration_page, toggle_label, FieldAttrs, FieldValidity,
    NativeValidity, ERROR_CLASS, INVALID_CLASS, SUBMIT_BLOCKED_DESC, SUBMIT_BLOCKED_TITLE,
    SUBMIT_BUTTON_SELECTOR,
};
use derma_check_common::strength::{estimate_strength, strength_class, strength_label, MAX_SCORE};
use derma_check_common::{FormConfig, ToastSpec};
use gloo::events::{EventListener, EventListenerOptions};
use gloo::utils::{document, window};
use tracing::debug;
use wasm_bindgen::JsCast;
use web_sys::{
    Element, HtmlButtonElement, HtmlElement, HtmlFormElement, HtmlInputElement,
    HtmlSelectElement, HtmlTextAreaElement, NodeList,
};

use crate::toast::ToastService;

/// NodeListを指定の型に絞って集める
fn nodes_as<T: JsCast>(list: NodeList) -> Vec<T> {
    (0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|node| node.dyn_into::<T>().ok())
        .collect()
}

fn query_all<T: JsCast>(root: &Element, selector: &str) -> Vec<T> {
    root.query_selector_all(selector).map(nodes_as).unwrap_or_default()
}

// ============================================
// 入力欄
// ============================================

#[derive(Clone)]
enum Field {
    Input(HtmlInputElement),
    Select(HtmlSelectElement),
    TextArea(HtmlTextAreaElement),
}

impl Field {
    fn from_element(el: Element) -> Option<Self> {
        el.dyn_into::<HtmlInputElement>()
            .map(Field::Input)
            .or_else(|el| el.dyn_into::<HtmlSelectElement>().map(Field::Select))
            .or_else(|el| el.dyn_into::<HtmlTextAreaElement>().map(Field::TextArea))
            .ok()
    }

    fn element(&self) -> &HtmlElement {
        match self {
            Field::Input(el) => el,
            Field::Select(el) => el,
            Field::TextArea(el) => el,
        }
    }

    fn native(&self) -> NativeValidity {
        let (will_validate, valid, message) = match self {
            Field::Input(el) => (el.will_validate(), el.check_validity(), el.validation_message()),
            Field::Select(el) => (el.will_validate(), el.check_validity(), el.validation_message()),
            Field::TextArea(el) => (el.will_validate(), el.check_validity(), el.validation_message()),
        };
        NativeValidity {
            will_validate,
            valid,
            message: message.unwrap_or_default(),
        }
    }

    fn is_marked_invalid(&self) -> bool {
        self.element().class_list().contains(INVALID_CLASS)
    }

    fn focus(&self) {
        let _ = self.element().focus();
    }
}

/// 入力欄の親にある `.form-error` を探す。`create` なら無ければ作る
fn error_element(field: &HtmlElement, create: bool) -> Option<Element> {
    let parent = field.parent_element()?;
    if let Ok(Some(existing)) = parent.query_selector(&format!(".{}", ERROR_CLASS)) {
        return Some(existing);
    }
    if !create {
        return None;
    }
    let err = document().create_element("p").ok()?;
    err.set_class_name(ERROR_CLASS);
    parent.append_child(&err).ok()?;
    Some(err)
}

fn apply_validity(field: &Field, validity: &FieldValidity) {
    let el = field.element();
    if validity.is_invalid {
        if let Some(err) = error_element(el, true) {
            err.set_text_content(Some(&validity.error_text));
        }
        let _ = el.class_list().add_1(INVALID_CLASS);
    } else {
        if let Some(err) = error_element(el, false) {
            err.set_text_content(Some(""));
        }
        let _ = el.class_list().remove_1(INVALID_CLASS);
    }
}

/// 検証してエラー表示を更新する。通れば true
fn validate(field: &Field) -> bool {
    let validity = FieldValidity::evaluate(&field.native());
    apply_validity(field, &validity);
    validity.is_valid()
}

/// email/password の既定の制約を補う
fn harden(input: &HtmlInputElement, password_min_length: u32) {
    let attrs = FieldAttrs {
        input_type: input.type_(),
        name: input.name(),
        required: input.required(),
        min_length: input.min_length(),
    };
    let patch = hardening_for(&attrs, password_min_length);
    if patch.set_required {
        input.set_required(true);
    }
    if let Some(min) = patch.set_min_length {
        input.set_min_length(min);
    }
}

/// 送信ボタンを無効にして処理中の文言に差し替える
fn mark_pending(button: &Element, pending_label: &str) {
    let _ = button.set_attribute("disabled", "true");
    if let Some(input) = button.dyn_ref::<HtmlInputElement>() {
        let _ = button.set_attribute("data-original-text", &input.value());
        input.set_value(pending_label);
    } else {
        let original = button.text_content().unwrap_or_default();
        let _ = button.set_attribute("data-original-text", &original);
        button.set_text_content(Some(pending_label));
    }
}

// ============================================
// FormEnhancer
// ============================================

pub struct FormEnhancer {
    config: Rc<FormConfig>,
    toasts: ToastService,
}

impl FormEnhancer {
    pub fn new(config: FormConfig, toasts: ToastService) -> Self {
        Self {
            config: Rc::new(config),
            toasts,
        }
    }

    pub fn run(&self) {
        self.migrate_flash();
        self.enhance_forms();
        self.add_password_toggles();
        self.add_strength_meter();
    }

    fn toast(&self, spec: ToastSpec) {
        self.toasts.show(spec.with_ttl(self.config.toast_ttl_ms));
    }

    /// サーバーのフラッシュ表示をトーストに移して取り除く
    pub fn migrate_flash(&self) {
        let Some(root) = document().document_element() else {
            return;
        };
        let selector = flash_selector(&self.config.error_flash_class, &self.config.success_flash_class);
        let banners: Vec<Element> = query_all(&root, &selector);
        let body = document().body();

        for banner in banners {
            let Some(kind) = flash_kind(
                &banner.class_name(),
                &self.config.error_flash_class,
                &self.config.success_flash_class,
            ) else {
                continue;
            };
            let text = banner.text_content().unwrap_or_default();
            self.toast(ToastSpec::new(kind, kind.default_title(), text.trim()));

            let parent = banner.parent_element();
            banner.remove();
            // 空になった囲みも消す（bodyは残す）
            if let Some(parent) = parent {
                let is_body = body
                    .as_ref()
                    .is_some_and(|b| **b == parent);
                if !is_body && parent.child_element_count() == 0 {
                    parent.remove();
                }
            }
        }
    }

    pub fn enhance_forms(&self) {
        let Some(root) = document().document_element() else {
            return;
        };
        for form in query_all::<HtmlFormElement>(&root, "form") {
            if is_post_form(form.get_attribute("method").as_deref()) {
                self.enhance_form(form);
            }
        }
    }

    fn enhance_form(&self, form: HtmlFormElement) {
        let fields: Vec<Field> = query_all::<Element>(&form, "input, select, textarea")
            .into_iter()
            .filter_map(Field::from_element)
            .collect();

        for field in &fields {
            if let Field::Input(input) = field {
                harden(input, self.config.password_min_length);
            }
        }

        for field in &fields {
            let on_blur = field.clone();
            EventListener::new(field.element(), "blur", move |_| {
                validate(&on_blur);
            })
            .forget();

            let on_input = field.clone();
            EventListener::new(field.element(), "input", move |_| {
                // エラー表示中の欄だけ入力中に再検証する
                if on_input.is_marked_invalid() {
                    validate(&on_input);
                }
            })
            .forget();
        }

        let invalid: Vec<bool> = fields
            .iter()
            .map(|f| {
                let native = f.native();
                native.will_validate && !native.valid
            })
            .collect();
        if let Some(index) = initial_focus(&invalid) {
            fields[index].focus();
        }

        let fields = Rc::new(fields);
        let config = self.config.clone();
        let toasts = self.toasts.clone();
        let target = form.clone();
        EventListener::new_with_options(
            &target,
            "submit",
            EventListenerOptions::enable_prevent_default(),
            move |event| {
                // 全欄を検証してから判定する
                let ok = fields.iter().fold(true, |ok, f| validate(f) && ok);
                if !ok {
                    event.prevent_default();
                    if let Some(bad) = fields.iter().find(|f| f.is_marked_invalid()) {
                        bad.focus();
                    }
                    toasts.show(
                        ToastSpec::error(SUBMIT_BLOCKED_TITLE, SUBMIT_BLOCKED_DESC)
                            .with_ttl(config.toast_ttl_ms),
                    );
                    debug!("form submission blocked by validation");
                    return;
                }
                if let Ok(Some(button)) = form.query_selector(SUBMIT_BUTTON_SELECTOR) {
                    mark_pending(&button, &config.pending_label);
                }
            },
        )
        .forget();
    }

    /// パスワード欄に表示切替ボタンを付ける（一度だけ）
    pub fn add_password_toggles(&self) {
        let Some(root) = document().document_element() else {
            return;
        };
        for input in query_all::<HtmlInputElement>(&root, r#"input[type="password"]"#) {
            if input.get_attribute("data-has-toggle").as_deref() == Some("true") {
                continue;
            }
            let _ = input.set_attribute("data-has-toggle", "true");
            let Some(wrap) = input
                .parent_element()
                .and_then(|p| p.dyn_into::<HtmlElement>().ok())
            else {
                continue;
            };
            let _ = attach_toggle(&wrap, &input);
        }
    }

    /// 登録ページのパスワード欄に強度メーターを付ける
    pub fn add_strength_meter(&self) {
        let path = window().location().pathname().unwrap_or_default();
        if !is_registration_page(self.config.registration_page, &document().title(), &path) {
            return;
        }
        let input = document()
            .query_selector(r#"form input[type="password"][name="password"]"#)
            .ok()
            .flatten()
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok());
        let Some(input) = input else {
            return;
        };
        if input.get_attribute("data-has-strength").as_deref() == Some("true") {
            return;
        }
        let _ = input.set_attribute("data-has-strength", "true");
        let _ = attach_strength_meter(&input);
    }
}

fn attach_toggle(wrap: &HtmlElement, input: &HtmlInputElement) -> Option<()> {
    let position = window()
        .get_computed_style(wrap)
        .ok()
        .flatten()
        .and_then(|style| style.get_property_value("position").ok());
    if position.as_deref() == Some("static") {
        let _ = wrap.style().set_property("position", "relative");
    }
    let _ = input.style().set_property("padding-right", "2.25rem");

    let button: HtmlButtonElement = document().create_element("button").ok()?.dyn_into().ok()?;
    button.set_type("button");
    button.set_class_name("password-toggle");
    let _ = button.set_attribute("aria-label", "Toggle password visibility");
    button.set_text_content(Some(toggle_label(true)));

    let target = input.clone();
    let label = button.clone();
    EventListener::new(&button, "click", move |_| {
        let masked = target.type_() == "password";
        target.set_type(if masked { "text" } else { "password" });
        label.set_text_content(Some(toggle_label(!masked)));
    })
    .forget();

    wrap.append_child(&button).ok()?;
    Some(())
}

fn update_strength(input: &HtmlInputElement, wrap: &Element, label: &Element) {
    let score = estimate_strength(&input.value());
    let classes = wrap.class_list();
    for s in 0..=MAX_SCORE {
        let _ = classes.remove_1(&strength_class(s));
    }
    let _ = classes.add_1(&strength_class(score));
    label.set_text_content(Some(&format!("Strength: {}", strength_label(score))));
}

fn attach_strength_meter(input: &HtmlInputElement) -> Option<()> {
    let doc = document();
    let wrap = doc.create_element("div").ok()?;
    wrap.set_class_name("strength-wrap");
    let meter = doc.create_element("div").ok()?;
    meter.set_class_name("strength-meter");
    let bar = doc.create_element("div").ok()?;
    bar.set_class_name("bar");
    meter.append_child(&bar).ok()?;
    let label = doc.create_element("div").ok()?;
    label.set_class_name("strength-label");
    wrap.append_child(&meter).ok()?;
    wrap.append_child(&label).ok()?;
    input.parent_element()?.append_child(&wrap).ok()?;

    update_strength(input, &wrap, &label);

    let target = input.clone();
    EventListener::new(input, "input", move |_| update_strength(&target, &wrap, &label)).forget();
    Some(())
}

#[cfg(all(target_arch = "wasm32", test))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;
    use web_sys::{Event, EventInit};

    wasm_bindgen_test_configure!(run_in_browser);

    fn fixture(html: &str) -> Element {
        let holder = document().create_element("div").unwrap();
        holder.set_inner_html(html);
        document().body().unwrap().append_child(&holder).unwrap();
        holder
    }

    fn enhancer(registration: Option<bool>) -> (FormEnhancer, ToastService) {
        let toasts = ToastService::init();
        let config = FormConfig {
            registration_page: registration,
            ..FormConfig::default()
        };
        (FormEnhancer::new(config, toasts.clone()), toasts)
    }

    fn input(root: &Element, selector: &str) -> HtmlInputElement {
        root.query_selector(selector).unwrap().unwrap().dyn_into().unwrap()
    }

    fn dispatch_submit(form: &HtmlFormElement) -> bool {
        let init = EventInit::new();
        init.set_cancelable(true);
        let event = Event::new_with_event_init_dict("submit", &init).unwrap();
        form.dispatch_event(&event).unwrap()
    }

    #[wasm_bindgen_test]
    fn wasm_hardening_applies_defaults() {
        let root = fixture(
            r#"<form method="post"><div><input type="email" name="email"></div>
               <div><input type="password" name="password"></div></form>"#,
        );
        let (enhancer, toasts) = enhancer(Some(false));
        enhancer.enhance_forms();

        assert!(input(&root, "input[name=email]").required());
        assert_eq!(input(&root, "input[name=password]").min_length(), 6);
        toasts.teardown();
        root.remove();
    }

    #[wasm_bindgen_test]
    fn wasm_blur_marks_and_input_clears() {
        let root = fixture(
            r#"<form method="post"><div><input type="text" name="nick" value="ok"></div>
               <div><input type="text" name="city" required></div></form>"#,
        );
        let (enhancer, toasts) = enhancer(Some(false));
        enhancer.enhance_forms();

        let city = input(&root, "input[name=city]");
        // 最初の不正な欄にフォーカスする
        let active = document().active_element().unwrap();
        assert!(active == **city);

        // 未表示の欄は入力だけでは検証しない
        city.dispatch_event(&Event::new("input").unwrap()).unwrap();
        assert!(!city.class_list().contains(INVALID_CLASS));
        assert!(root.query_selector(".form-error").unwrap().is_none());

        city.dispatch_event(&Event::new("blur").unwrap()).unwrap();
        assert!(city.class_list().contains(INVALID_CLASS));
        let err = root.query_selector(".form-error").unwrap().unwrap();
        assert!(!err.text_content().unwrap_or_default().is_empty());

        city.set_value("Osaka");
        city.dispatch_event(&Event::new("input").unwrap()).unwrap();
        assert!(!city.class_list().contains(INVALID_CLASS));
        assert_eq!(err.text_content().as_deref(), Some(""));
        toasts.teardown();
        root.remove();
    }

    #[wasm_bindgen_test]
    fn wasm_get_forms_are_left_alone() {
        let root = fixture(r#"<form method="get"><div><input type="email" name="email"></div></form>"#);
        let (enhancer, toasts) = enhancer(Some(false));
        enhancer.enhance_forms();

        assert!(!input(&root, "input[name=email]").required());
        toasts.teardown();
        root.remove();
    }

    #[wasm_bindgen_test]
    fn wasm_submit_blocked_when_invalid() {
        let root = fixture(
            r#"<form method="post" action="/nowhere"><div><input type="email" name="email"></div>
               <button type="submit">Log in</button></form>"#,
        );
        let (enhancer, toasts) = enhancer(Some(false));
        enhancer.enhance_forms();

        let form: HtmlFormElement = root.query_selector("form").unwrap().unwrap().dyn_into().unwrap();
        let proceeded = dispatch_submit(&form);

        assert!(!proceeded);
        let email = input(&root, "input[name=email]");
        assert!(email.class_list().contains(INVALID_CLASS));
        let err = root.query_selector(".form-error").unwrap().unwrap();
        assert!(!err.text_content().unwrap_or_default().is_empty());
        assert_eq!(toasts.live_ids().len(), 1);

        let button = root.query_selector("button").unwrap().unwrap();
        assert!(!button.has_attribute("disabled"));
        toasts.teardown();
        root.remove();
    }

    #[wasm_bindgen_test]
    fn wasm_valid_submit_marks_button_pending() {
        let root = fixture(
            r#"<form method="post" action="javascript:void(0)"><div><input type="text" name="q" value="ok"></div>
               <button>Go</button></form>"#,
        );
        let (enhancer, toasts) = enhancer(Some(false));
        enhancer.enhance_forms();

        let form: HtmlFormElement = root.query_selector("form").unwrap().unwrap().dyn_into().unwrap();
        // 既定動作を止めて遷移を防ぐ
        let stop = EventListener::new_with_options(
            &form,
            "submit",
            EventListenerOptions::enable_prevent_default(),
            |e| e.prevent_default(),
        );
        dispatch_submit(&form);

        let button = root.query_selector("button").unwrap().unwrap();
        assert!(button.has_attribute("disabled"));
        assert_eq!(button.get_attribute("data-original-text").as_deref(), Some("Go"));
        assert_eq!(button.text_content().as_deref(), Some("Please wait\u{2026}"));
        assert!(toasts.live_ids().is_empty());
        drop(stop);
        toasts.teardown();
        root.remove();
    }

    #[wasm_bindgen_test]
    fn wasm_password_toggle_added_once() {
        let root = fixture(r#"<div><input type="password" name="pw"></div>"#);
        let (enhancer, toasts) = enhancer(Some(false));
        enhancer.add_password_toggles();
        enhancer.add_password_toggles();

        let buttons = root.query_selector_all(".password-toggle").unwrap();
        assert_eq!(buttons.length(), 1);

        let button: HtmlElement = root
            .query_selector(".password-toggle")
            .unwrap()
            .unwrap()
            .dyn_into()
            .unwrap();
        let pw = input(&root, "input[name=pw]");
        button.click();
        assert_eq!(pw.type_(), "text");
        assert_eq!(button.text_content().as_deref(), Some("Hide"));
        button.click();
        assert_eq!(pw.type_(), "password");
        assert_eq!(button.text_content().as_deref(), Some("Show"));
        toasts.teardown();
        root.remove();
    }

    #[wasm_bindgen_test]
    fn wasm_strength_meter_tracks_input() {
        let root = fixture(r#"<form><div><input type="password" name="password"></div></form>"#);
        let (enhancer, toasts) = enhancer(Some(true));
        enhancer.add_strength_meter();
        enhancer.add_strength_meter();

        assert_eq!(root.query_selector_all(".strength-wrap").unwrap().length(), 1);
        let wrap = root.query_selector(".strength-wrap").unwrap().unwrap();
        let label = root.query_selector(".strength-label").unwrap().unwrap();
        assert!(wrap.class_list().contains("strength-0"));
        assert_eq!(label.text_content().as_deref(), Some("Strength: Very weak"));

        let pw = input(&root, "input[name=password]");
        pw.set_value("Abcdef123!");
        pw.dispatch_event(&Event::new("input").unwrap()).unwrap();
        assert!(wrap.class_list().contains("strength-4"));
        assert!(!wrap.class_list().contains("strength-0"));
        assert_eq!(label.text_content().as_deref(), Some("Strength: Very strong"));
        toasts.teardown();
        root.remove();
    }

    #[wasm_bindgen_test]
    fn wasm_flash_banners_become_toasts() {
        let root = fixture(
            r#"<section class="flashes"><div class="bg-red-50"> Wrong password </div>
               <div class="bg-green-50">Saved</div></section>"#,
        );
        let (enhancer, toasts) = enhancer(Some(false));
        enhancer.migrate_flash();

        assert_eq!(toasts.live_ids().len(), 2);
        assert!(root.query_selector(".flashes").unwrap().is_none());
        let desc = document().query_selector(".toast.error .desc").unwrap().unwrap();
        assert_eq!(desc.text_content().as_deref(), Some("Wrong password"));
        toasts.teardown();
        root.remove();
    }
}
