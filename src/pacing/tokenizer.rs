//! Unit splitter for token-mode pacing.
//!
//! Yields word-granularity units for Latin text and character-granularity
//! units for CJK text, which is what gives the typing cadence its feel.

use std::collections::HashSet;

use once_cell::sync::Lazy;

/// Characters that always form their own unit. ASCII punctuation plus the
/// common CJK marks.
static PUNCTUATION: Lazy<HashSet<char>> = Lazy::new(|| {
    [
        '.', ',', '!', '?', ':', ';', //
        '。', '，', '！', '？', '：', '；', //
        '、', '（', '）', '(', ')', '[', ']', '{', '}', //
        '《', '》', '<', '>', '"', '\'', '“', '”', '‘', '’', //
        '-', '—', '+', '=', '/', '\\', '|', '@', '#', '$', '%', '^', '&', '*', '~',
    ]
    .into_iter()
    .collect()
});

fn is_ascii_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Split a fragment into ordered pacing units.
///
/// Rules, checked in order per character: `\n` is its own unit; `\r` is
/// dropped; space and tab are their own units; punctuation is its own
/// unit; consecutive ASCII word characters (letters, digits, underscore)
/// merge into one unit; anything else (CJK ideographs and other non-ASCII)
/// is a single-character unit.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut word = String::new();

    let mut flush_word = |word: &mut String, tokens: &mut Vec<String>| {
        if !word.is_empty() {
            tokens.push(std::mem::take(word));
        }
    };

    for ch in input.chars() {
        match ch {
            '\n' => {
                flush_word(&mut word, &mut tokens);
                tokens.push("\n".to_string());
            }
            '\r' => {}
            ' ' | '\t' => {
                flush_word(&mut word, &mut tokens);
                tokens.push(ch.to_string());
            }
            _ if PUNCTUATION.contains(&ch) => {
                flush_word(&mut word, &mut tokens);
                tokens.push(ch.to_string());
            }
            _ if is_ascii_word_char(ch) => word.push(ch),
            _ => {
                flush_word(&mut word, &mut tokens);
                tokens.push(ch.to_string());
            }
        }
    }
    flush_word(&mut word, &mut tokens);

    tokens
}
