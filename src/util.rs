// ./src/util.rs
//! Small helpers shared across components.
use std::time::{SystemTime, UNIX_EPOCH};

/// Prints debug messages with a unix-timestamp prefix when `debug` is set.
///
/// # Examples
///
/// ```rust
/// use fnagent::debug_print;
///
/// debug_print(true, "processing request...");
/// debug_print(false, "this won't print");
/// ```
pub fn debug_print(debug: bool, message: &str) {
    if debug {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        println!("[{}] {}", timestamp, message);
    }
}

/// Lower-cases and strips diacritics, so rule and template matching treats
/// "đặt vé" and "dat ve" the same way without pulling in a new
/// normalisation crate (SPEC_FULL.md §4.3 trade-off). Only folds the
/// Vietnamese and generic Latin-1 diacritics the glossary's bilingual
/// examples actually use; anything outside that range passes through
/// untouched.
pub fn fold_diacritics(input: &str) -> String {
    input
        .to_lowercase()
        .chars()
        .map(fold_char)
        .collect::<String>()
}

fn fold_char(c: char) -> char {
    match c {
        'à' | 'á' | 'ạ' | 'ả' | 'ã' | 'â' | 'ầ' | 'ấ' | 'ậ' | 'ẩ' | 'ẫ' | 'ă' | 'ằ' | 'ắ' | 'ặ'
        | 'ẳ' | 'ẵ' => 'a',
        'è' | 'é' | 'ẹ' | 'ẻ' | 'ẽ' | 'ê' | 'ề' | 'ế' | 'ệ' | 'ể' | 'ễ' => 'e',
        'ì' | 'í' | 'ị' | 'ỉ' | 'ĩ' => 'i',
        'ò' | 'ó' | 'ọ' | 'ỏ' | 'õ' | 'ô' | 'ồ' | 'ố' | 'ộ' | 'ổ' | 'ỗ' | 'ơ' | 'ờ' | 'ớ' | 'ợ'
        | 'ở' | 'ỡ' => 'o',
        'ù' | 'ú' | 'ụ' | 'ủ' | 'ũ' | 'ư' | 'ừ' | 'ứ' | 'ự' | 'ử' | 'ữ' => 'u',
        'ỳ' | 'ý' | 'ỵ' | 'ỷ' | 'ỹ' => 'y',
        'đ' => 'd',
        other => other,
    }
}

/// Current time as milliseconds since the Unix epoch, used for timing
/// instrumentation that doesn't need wall-clock precision beyond that.
pub fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}
