//! フォーム補強のルール
//!
//! DOMには触らない。フォームの対象判定、既定の制約の補い方、
//! 入力欄のエラー表示状態をここで決める。

use crate::toast::ToastKind;

/// エラー表示用の要素に付けるクラス
pub const ERROR_CLASS: &str = "form-error";

/// 不正な入力欄に付けるクラス
pub const INVALID_CLASS: &str = "is-invalid";

/// ブラウザが理由を返さなかった場合の文言
pub const FALLBACK_MESSAGE: &str = "Invalid value";

pub const SUBMIT_BLOCKED_TITLE: &str = "Please fix errors";
pub const SUBMIT_BLOCKED_DESC: &str = "Some fields need your attention.";

/// 送信ボタンの探索セレクタ
pub const SUBMIT_BUTTON_SELECTOR: &str =
    r#"button[type="submit"], button:not([type]), input[type="submit"]"#;

/// POSTで送信されるフォームか（method未指定もPOST扱い）
pub fn is_post_form(method: Option<&str>) -> bool {
    match method {
        None => true,
        Some(m) => m.trim().eq_ignore_ascii_case("post"),
    }
}

/// 登録ページかどうか
///
/// 設定で明示されていればそれに従い、無ければタイトルとパスから推定する。
pub fn is_registration_page(explicit: Option<bool>, title: &str, path: &str) -> bool {
    explicit.unwrap_or_else(|| {
        title.to_ascii_lowercase().contains("register") || path.contains("register")
    })
}

/// 入力欄の現在の制約
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldAttrs {
    pub input_type: String,
    pub name: String,
    pub required: bool,
    /// `minLength`（未設定は0以下）
    pub min_length: i32,
}

/// 補う制約
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hardening {
    pub set_required: bool,
    pub set_min_length: Option<i32>,
}

impl Hardening {
    pub fn is_empty(&self) -> bool {
        !self.set_required && self.set_min_length.is_none()
    }
}

/// テンプレートを直さずに既定の制約を補う
///
/// - `type=email name=email` は必須にする
/// - `type=password name=password` は最小文字数を設定する
pub fn hardening_for(attrs: &FieldAttrs, password_min_length: u32) -> Hardening {
    let mut patch = Hardening::default();
    let ty = attrs.input_type.to_ascii_lowercase();
    if ty == "email" && attrs.name == "email" && !attrs.required {
        patch.set_required = true;
    }
    if ty == "password" && attrs.name == "password" && attrs.min_length <= 0 {
        patch.set_min_length = Some(i32::try_from(password_min_length).unwrap_or(i32::MAX));
    }
    patch
}

/// ブラウザの制約検証の結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NativeValidity {
    pub will_validate: bool,
    pub valid: bool,
    pub message: String,
}

/// 入力欄のエラー表示状態
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldValidity {
    pub is_invalid: bool,
    pub error_text: String,
}

impl FieldValidity {
    pub fn evaluate(native: &NativeValidity) -> Self {
        if native.will_validate && !native.valid {
            let text = if native.message.trim().is_empty() {
                FALLBACK_MESSAGE.to_string()
            } else {
                native.message.clone()
            };
            Self {
                is_invalid: true,
                error_text: text,
            }
        } else {
            Self::default()
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.is_invalid
    }
}

/// 初期フォーカス先（最初の不正な欄、無ければ先頭）
pub fn initial_focus(invalid: &[bool]) -> Option<usize> {
    invalid
        .iter()
        .position(|&bad| bad)
        .or(if invalid.is_empty() { None } else { Some(0) })
}

/// パスワード表示切替ボタンの文言
pub fn toggle_label(masked: bool) -> &'static str {
    if masked {
        "Show"
    } else {
        "Hide"
    }
}

/// サーバー側のフラッシュ表示を探すセレクタ
pub fn flash_selector(error_class: &str, success_class: &str) -> String {
    format!(".{}, .{}", error_class, success_class)
}

/// フラッシュ表示のクラス属性からトーストの種類を決める（エラーが優先）
pub fn flash_kind(class_name: &str, error_class: &str, success_class: &str) -> Option<ToastKind> {
    let has = |wanted: &str| class_name.split_whitespace().any(|c| c == wanted);
    if has(error_class) {
        Some(ToastKind::Error)
    } else if has(success_class) {
        Some(ToastKind::Success)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(ty: &str, name: &str) -> FieldAttrs {
        FieldAttrs {
            input_type: ty.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_is_post_form() {
        assert!(is_post_form(None));
        assert!(is_post_form(Some("POST")));
        assert!(is_post_form(Some("post")));
        assert!(!is_post_form(Some("get")));
        assert!(!is_post_form(Some("")));
        assert!(!is_post_form(Some("dialog")));
    }

    #[test]
    fn test_registration_page_explicit_flag_wins() {
        assert!(!is_registration_page(Some(false), "Register", "/register"));
        assert!(is_registration_page(Some(true), "Login", "/login"));
    }

    #[test]
    fn test_registration_page_heuristic() {
        assert!(is_registration_page(None, "Register - Derma", "/"));
        assert!(is_registration_page(None, "Sign up", "/register"));
        assert!(!is_registration_page(None, "Login", "/login"));
    }

    #[test]
    fn test_hardening_email() {
        let patch = hardening_for(&attrs("email", "email"), 6);
        assert!(patch.set_required);
        assert_eq!(patch.set_min_length, None);

        let already = FieldAttrs { required: true, ..attrs("email", "email") };
        assert!(hardening_for(&already, 6).is_empty());

        // 名前が違えば触らない
        assert!(hardening_for(&attrs("email", "contact"), 6).is_empty());
    }

    #[test]
    fn test_hardening_password() {
        let patch = hardening_for(&attrs("password", "password"), 6);
        assert_eq!(patch.set_min_length, Some(6));

        let explicit = FieldAttrs { min_length: 12, ..attrs("password", "password") };
        assert!(hardening_for(&explicit, 6).is_empty());

        // ブラウザの未設定値は -1
        let unset = FieldAttrs { min_length: -1, ..attrs("password", "password") };
        assert_eq!(hardening_for(&unset, 8).set_min_length, Some(8));
    }

    #[test]
    fn test_evaluate_invalid_uses_native_message() {
        let native = NativeValidity {
            will_validate: true,
            valid: false,
            message: "Please fill out this field.".into(),
        };
        let validity = FieldValidity::evaluate(&native);
        assert!(validity.is_invalid);
        assert_eq!(validity.error_text, "Please fill out this field.");
    }

    #[test]
    fn test_evaluate_invalid_fallback_message() {
        let native = NativeValidity { will_validate: true, valid: false, message: String::new() };
        assert_eq!(FieldValidity::evaluate(&native).error_text, FALLBACK_MESSAGE);
    }

    #[test]
    fn test_evaluate_skips_fields_without_validation() {
        let native = NativeValidity { will_validate: false, valid: false, message: "x".into() };
        assert!(FieldValidity::evaluate(&native).is_valid());
    }

    #[test]
    fn test_initial_focus() {
        assert_eq!(initial_focus(&[false, true, true]), Some(1));
        assert_eq!(initial_focus(&[false, false]), Some(0));
        assert_eq!(initial_focus(&[]), None);
    }

    #[test]
    fn test_toggle_label() {
        assert_eq!(toggle_label(true), "Show");
        assert_eq!(toggle_label(false), "Hide");
    }

    #[test]
    fn test_flash_kind() {
        let kind = |c: &str| flash_kind(c, "bg-red-50", "bg-green-50");
        assert_eq!(kind("p-4 bg-red-50 rounded"), Some(ToastKind::Error));
        assert_eq!(kind("bg-green-50"), Some(ToastKind::Success));
        assert_eq!(kind("bg-green-50 bg-red-50"), Some(ToastKind::Error));
        assert_eq!(kind("bg-red-500"), None);
        assert_eq!(kind(""), None);
    }

    #[test]
    fn test_flash_selector() {
        assert_eq!(flash_selector("bg-red-50", "bg-green-50"), ".bg-red-50, .bg-green-50");
    }
}
