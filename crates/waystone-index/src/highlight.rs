//! Search-hit highlighting.
//!
//! Grounded in `MuBoldFormatter` in
//! `original_source/src/core/search/search_engine.py`, which wraps matched
//! tokens in `` `!`_..._`!`` (micron bold+underline toggles) and caps the
//! fragment at `maxchars=100`.

const HIGHLIGHT_OPEN: &str = "`!`_";
const HIGHLIGHT_CLOSE: &str = "`_`!";

/// Finds the first query term occurring in `text` (case-insensitively),
/// wraps it in the micron bold+underline markup, and returns a fragment of
/// at most `max_chars` centered on the match. Returns `None` if no term
/// appears in `text` at all, so the caller can fall back to a plain
/// prefix of the text.
pub fn highlight(text: &str, terms: &[String], max_chars: usize) -> Option<String> {
    let lower = text.to_lowercase();
    let mut best: Option<(usize, usize)> = None;
    for term in terms {
        if term.is_empty() {
            continue;
        }
        if let Some(pos) = lower.find(term.as_str()) {
            if best.map(|(p, _)| pos < p).unwrap_or(true) {
                best = Some((pos, term.len()));
            }
        }
    }
    let (pos, len) = best?;

    let half_window = max_chars / 2;
    let start = pos.saturating_sub(half_window);
    let end = (pos + len + half_window).min(text.len());
    let start = floor_char_boundary(text, start);
    let end = ceil_char_boundary(text, end);

    let mut fragment = String::new();
    fragment.push_str(&text[start..pos]);
    fragment.push_str(HIGHLIGHT_OPEN);
    fragment.push_str(&text[pos..pos + len]);
    fragment.push_str(HIGHLIGHT_CLOSE);
    fragment.push_str(&text[pos + len..end]);
    Some(fragment)
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx < s.len() && !s.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}
