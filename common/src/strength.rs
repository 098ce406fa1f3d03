//! パスワード強度の簡易推定

/// 強度ラベル（スコア0〜4に対応）
pub const STRENGTH_LABELS: [&str; 5] = ["Very weak", "Weak", "Fair", "Strong", "Very strong"];

pub const MAX_SCORE: u8 = 4;

/// 長さと文字種から0〜4のスコアを出す
///
/// - 6文字以上: +1
/// - 10文字以上: +1
/// - 大文字と小文字の両方: +1
/// - 数字と記号の両方: +1
pub fn estimate_strength(password: &str) -> u8 {
    if password.is_empty() {
        return 0;
    }
    let len = password.chars().count();
    let mut score = 0u8;

    if len >= 6 {
        score += 1;
    }
    if len >= 10 {
        score += 1;
    }

    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        score += 1;
    }

    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    // 英数字・アンダースコア・空白以外を記号とみなす
    let has_symbol = password
        .chars()
        .any(|c| !(c.is_ascii_alphanumeric() || c == '_' || c.is_whitespace()));
    if has_digit && has_symbol {
        score += 1;
    }

    score.min(MAX_SCORE)
}

pub fn strength_label(score: u8) -> &'static str {
    STRENGTH_LABELS[usize::from(score.min(MAX_SCORE))]
}

/// メーターに付けるクラス名
pub fn strength_class(score: u8) -> String {
    format!("strength-{}", score.min(MAX_SCORE))
}
