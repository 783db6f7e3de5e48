// Text normalization shared by messages and rule terms.
//
// Steps, in order:
// 1. lowercase
// 2. leetspeak substitution: 0 -> o, 1 and ! -> l
// 3. collapse runs of the same letter ("druuugs" -> "drugs")
// 4. split on whitespace and , . ! ? : ; _ / -
//
// Because `!` becomes `l` in step 2, a trailing "!" glues onto the word
// before it ("drugs!" -> "drugsl"). Rule terms go through the same pipeline,
// so matching stays consistent either way.

use std::sync::LazyLock;

use regex_lite::Regex;

static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s,.!?:;_/\-]+").expect("separator pattern is valid"));

/// Normalize raw text into an ordered token sequence.
pub fn normalize(text: &str) -> Vec<String> {
    let substituted: String = text
        .to_lowercase()
        .chars()
        .map(|c| match c {
            '0' => 'o',
            '1' | '!' => 'l',
            other => other,
        })
        .collect();

    let collapsed = collapse_repeats(&substituted);

    SEPARATORS
        .split(&collapsed)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Collapse runs of identical consecutive letters to a single letter.
/// Digits and punctuation runs are left alone.
fn collapse_repeats(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev: Option<char> = None;
    for c in text.chars() {
        if c.is_alphabetic() && prev == Some(c) {
            continue;
        }
        out.push(c);
        prev = Some(c);
    }
    out
}
