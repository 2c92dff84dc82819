//! Command-line codec for crossing the elevation boundary.
//!
//! The elevation front-end accepts a single command string, so the target
//! argument vector is serialized with [`encode`] before the spawn and
//! tokenized back with [`decode`] on the elevated side. The convention is
//! the usual one: whitespace separates arguments, `"…"` groups, and a run
//! of N backslashes in front of a literal quote is written as 2N+1
//! backslashes so the quote survives re-tokenization. Backslashes not
//! followed by a quote are left untouched.

use std::sync::LazyLock;

use regex::Regex;

/// Placeholder for a quotation mark during the multi-pass rewrite.
///
/// NUL can never occur inside an argv element, so the sentinel cannot
/// collide with payload.
const QUOTE_SENTINEL: char = '\u{0}';

/// A single token already wrapped in quotes with no unescaped quote inside.
static SINGLE_WRAPPED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^"(\\"|[^"])*"$"#).expect("static regex is valid"));

/// Every quotation mark together with the backslash run preceding it.
static ESCAPE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\\*)""#).expect("static regex is valid"));

/// Serialize an argument vector into a single command-line string.
///
/// Tokenizing the result with [`decode`] reproduces the vector for every
/// argument that does not carry an unescaped quote without any whitespace
/// next to it. An argument with no whitespace at all is passed through
/// verbatim, even when it contains quote characters; an argument that is
/// already a single quoted token is assumed pre-encoded and not wrapped
/// again.
pub fn encode(args: &[String]) -> String {
    args.iter()
        .map(|arg| wrap(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Tokenize a command-line string back into an argument vector.
///
/// Whitespace outside quotes separates arguments and runs of it collapse.
/// A `"` toggles quoted state. A run of N backslashes immediately before a
/// `"` yields N/2 literal backslashes, plus a literal quote when N is odd;
/// with N even the quote toggles state instead. Backslashes anywhere else
/// are literal. An unterminated quote extends to the end of the line.
pub fn decode(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut in_quotes = false;

    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let mut run = 1usize;
                while chars.peek() == Some(&'\\') {
                    chars.next();
                    run += 1;
                }
                if chars.peek() == Some(&'"') {
                    current.push_str(&"\\".repeat(run / 2));
                    if run % 2 == 1 {
                        // Escaped quote; consume it here so it cannot toggle.
                        chars.next();
                        current.push('"');
                    }
                } else {
                    current.push_str(&"\\".repeat(run));
                }
                in_token = true;
            }
            '"' => {
                in_quotes = !in_quotes;
                in_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if in_token {
                    args.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }
    if in_token {
        args.push(current);
    }
    args
}

/// Wrap a single argument in quotes when it needs them.
fn wrap(arg: &str) -> String {
    if arg.chars().any(char::is_whitespace) && !SINGLE_WRAPPED.is_match(arg) {
        return format!("\"{}\"", escape(arg));
    }
    arg.to_owned()
}

/// Escape the interior of an argument about to be wrapped in quotes.
///
/// Runs the N-backslashes-plus-quote rewrite from the longest backslash run
/// found down to zero, parking rewritten quotes behind [`QUOTE_SENTINEL`] so
/// later passes cannot re-match already-rewritten text, then restores them.
/// A trailing backslash run is doubled so it cannot escape the closing
/// quote added by [`wrap`].
fn escape(arg: &str) -> String {
    let longest = ESCAPE_PATTERN
        .captures_iter(arg)
        .filter_map(|caps| caps.get(1).map(|m| m.len()))
        .max()
        .unwrap_or(0);

    let mut result = arg.to_owned();
    for run in (0..=longest).rev() {
        let original = format!("{}\"", "\\".repeat(run));
        let replacement = format!("{}{QUOTE_SENTINEL}", "\\".repeat(2 * run + 1));
        result = result.replace(&original, &replacement);
    }
    let mut result = result.replace(QUOTE_SENTINEL, "\"");

    let trailing = result.chars().rev().take_while(|&c| c == '\\').count();
    if trailing > 0 {
        result.push_str(&"\\".repeat(trailing));
    }
    result
}
