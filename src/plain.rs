//! Last-resort conversion: the page's text, cut into bounded paragraphs.

use std::sync::LazyLock;

use regex::Regex;

use crate::docx::{Block, Span};
use crate::dom::collapse_ws;
use crate::mapper::paragraph_block;

static RE_INVISIBLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<!--.*?-->|<head\b[^>]*>.*?</head\s*>|<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>|<noscript\b[^>]*>.*?</noscript\s*>|<template\b[^>]*>.*?</template\s*>",
    )
    .expect("static pattern")
});
static RE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("static pattern"));
static RE_SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.?!]\s+").expect("static pattern"));

/// Visible text of `html` with tags removed and whitespace collapsed.
pub fn strip_tags(html: &str) -> String {
    let visible = RE_INVISIBLE.replace_all(html, " ");
    let text = RE_TAG.replace_all(&visible, " ");
    collapse_ws(&decode_entities_basic(&text)).trim().to_string()
}

/// Splits `text` into chunks of at most `max_chars` characters, preferring
/// sentence boundaries. Sentences are packed greedily and joined by a single
/// space; a sentence longer than `max_chars` starts a new chunk and is broken
/// between words.
pub fn split_paragraphs(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if char_len(text) <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for sentence in sentences(text) {
        let sentence_len = char_len(sentence);
        if sentence_len > max_chars {
            // Oversized: starts its own chunk; only its last piece may take
            // the following sentences.
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            let mut pieces = bounded_pieces(sentence, max_chars);
            if let Some(last) = pieces.pop() {
                chunks.extend(pieces);
                current_len = char_len(&last);
                current = last;
            }
        } else if current.is_empty() {
            current = sentence.to_string();
            current_len = sentence_len;
        } else if current_len + 1 + sentence_len <= max_chars {
            current.push(' ');
            current.push_str(sentence);
            current_len += 1 + sentence_len;
        } else {
            chunks.push(std::mem::replace(&mut current, sentence.to_string()));
            current_len = sentence_len;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// One unformatted paragraph block per chunk of the page's text.
pub fn plain_text_blocks(html: &str, max_chars: usize) -> Vec<Block> {
    split_paragraphs(&strip_tags(html), max_chars)
        .into_iter()
        .map(|chunk| paragraph_block(vec![Span::plain(chunk)]))
        .collect()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut last = 0usize;
    for m in RE_SENTENCE_END.find_iter(text) {
        // The terminator is a single ASCII byte.
        let end = m.start() + 1;
        let s = text[last..end].trim();
        if !s.is_empty() {
            out.push(s);
        }
        last = m.end();
    }
    let tail = text[last..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

fn bounded_pieces(sentence: &str, max_chars: usize) -> Vec<String> {
    if char_len(sentence) <= max_chars {
        return vec![sentence.to_string()];
    }

    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;
    for word in sentence.split_whitespace() {
        let mut word_chars: Vec<char> = word.chars().collect();
        while word_chars.len() > max_chars {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word_chars.split_off(max_chars);
            pieces.push(word_chars.into_iter().collect());
            word_chars = rest;
        }
        let word_len = word_chars.len();
        if word_len == 0 {
            continue;
        }
        let word: String = word_chars.into_iter().collect();
        if current.is_empty() {
            current = word;
            current_len = word_len;
        } else if current_len + 1 + word_len <= max_chars {
            current.push(' ');
            current.push_str(&word);
            current_len += 1 + word_len;
        } else {
            pieces.push(std::mem::replace(&mut current, word));
            current_len = word_len;
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

fn decode_entities_basic(s: &str) -> String {
    // Preserves UTF-8: walks chars, never bytes.
    let mut out = String::with_capacity(s.len());
    let mut it = s.chars().peekable();

    while let Some(ch) = it.next() {
        if ch != '&' {
            out.push(ch);
            continue;
        }

        // Bounded so malformed input stays cheap.
        let mut ent = String::new();
        let mut ended = false;
        while let Some(&c) = it.peek() {
            if c == ';' {
                it.next();
                ended = true;
                break;
            }
            if c == '&' || c.is_whitespace() || ent.len() > 32 {
                break;
            }
            it.next();
            ent.push(c);
        }

        let decoded: Option<char> = if !ended {
            None
        } else {
            match ent.as_str() {
                "nbsp" => Some(' '),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "amp" => Some('&'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "mdash" => Some('\u{2014}'),
                "ndash" => Some('\u{2013}'),
                "hellip" => Some('\u{2026}'),
                "copy" => Some('\u{a9}'),
                _ => {
                    if let Some(hex) = ent.strip_prefix("#x").or_else(|| ent.strip_prefix("#X")) {
                        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
                    } else if let Some(dec) = ent.strip_prefix('#') {
                        dec.parse::<u32>().ok().and_then(char::from_u32)
                    } else {
                        None
                    }
                }
            }
        };

        match decoded {
            Some(c) => out.push(c),
            None => {
                // Unknown or malformed: keep literal.
                out.push('&');
                out.push_str(&ent);
                if ended {
                    out.push(';');
                }
            }
        }
    }

    out
}
