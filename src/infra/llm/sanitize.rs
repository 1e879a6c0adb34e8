//! Cleanup applied to user-authored message content before it reaches a vendor.

use std::sync::LazyLock;

use regex::Regex;

// Chat-template control tokens such as `<|im_start|>`, with the blanks around
// them. The replacement space can never complete a new token.
static SPECIAL_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[ \t]*<\|[A-Za-z0-9_]+\|>[ \t]*").expect("special token pattern is valid")
});

/// Strips injection-prone constructs from free text. Idempotent, and a
/// no-op on ordinary prose.
pub fn sanitize_user_content(content: &str) -> String {
    let normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    let visible = normalized
        .chars()
        .filter(|ch| !is_stripped_char(*ch))
        .collect::<String>();

    SPECIAL_TOKEN.replace_all(&visible, " ").trim().to_string()
}

fn is_stripped_char(ch: char) -> bool {
    if ch == '\n' || ch == '\t' {
        return false;
    }
    ch.is_control()
        || matches!(
            ch,
            '\u{200B}'..='\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}' | '\u{FEFF}'
        )
}
