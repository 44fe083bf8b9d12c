//! Markup → plain-text reduction for the synthetic fallback PDF.
//!
//! The fallback renderer cannot lay out HTML, so it prints a short text
//! preview instead. This module applies a few cheap, deterministic
//! regex/string rules, in order:
//!
//! 1. Drop `<script>`, `<style>`, `<head>` and comment blocks entirely
//! 2. Turn block-level tags into line breaks so words don't glue together
//! 3. Strip every remaining tag
//! 4. Decode the common named and numeric entities
//! 5. Collapse runs of whitespace
//!
//! followed by [`truncate_chars`] and [`wrap_words`] for layout.

use once_cell::sync::Lazy;
use regex::Regex;

/// Reduce markup to readable plain text.
pub fn html_to_text(html: &str) -> String {
    let s = drop_invisible_blocks(html);
    let s = break_block_tags(&s);
    let s = strip_tags(&s);
    let s = decode_entities(&s);
    collapse_whitespace(&s)
}

// ── Rule 1: Drop invisible blocks ────────────────────────────────────────────

static RE_INVISIBLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<head\b.*?</head\s*>|<!--.*?-->")
        .unwrap()
});

fn drop_invisible_blocks(input: &str) -> String {
    RE_INVISIBLE.replace_all(input, " ").into_owned()
}

// ── Rule 2: Block tags become line breaks ───────────────────────────────────

static RE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</?(?:p|div|br|h[1-6]|li|ul|ol|tr|table|section|article|header|footer|blockquote|pre)\b[^>]*>")
        .unwrap()
});

fn break_block_tags(input: &str) -> String {
    RE_BLOCK.replace_all(input, "\n").into_owned()
}

// ── Rule 3: Strip remaining tags ────────────────────────────────────────────

static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

fn strip_tags(input: &str) -> String {
    RE_TAG.replace_all(input, "").into_owned()
}

// ── Rule 4: Decode entities ─────────────────────────────────────────────────

static RE_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});").unwrap());

fn decode_entities(input: &str) -> String {
    RE_ENTITY
        .replace_all(input, |caps: &regex::Captures| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match body {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    "copy" => Some('©'),
                    "mdash" => Some('—'),
                    "ndash" => Some('–'),
                    "hellip" => Some('…'),
                    _ => None,
                }
            };
            decoded.map(String::from).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

// ── Rule 5: Collapse whitespace ─────────────────────────────────────────────

static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

fn collapse_whitespace(input: &str) -> String {
    RE_SPACES.replace_all(input.trim(), " ").into_owned()
}

// ── Layout helpers ──────────────────────────────────────────────────────────

/// Keep at most `max` characters, appending `...` when something was cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", text[..idx].trim_end()),
        None => text.to_string(),
    }
}

/// Greedy word wrap at `width` characters. Words longer than `width` are
/// split hard.
pub fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_len = 0usize;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if line_len > 0 {
                lines.push(std::mem::take(&mut line));
                line_len = 0;
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        if word.is_empty() {
            continue;
        }
        let needed = if line_len == 0 { word.len() } else { line_len + 1 + word.len() };
        if needed > width {
            lines.push(std::mem::take(&mut line));
            line_len = 0;
        }
        if line_len > 0 {
            line.push(' ');
            line_len += 1;
        }
        line.extend(word.iter());
        line_len += word.len();
    }
    if line_len > 0 {
        lines.push(line);
    }
    lines
}
