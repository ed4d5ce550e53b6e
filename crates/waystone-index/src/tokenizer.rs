//! Term extraction. `Text` uses `charabia`'s segmenter/normalizer (the same
//! tokenization layer `milli` builds its word index on); `NodeName` uses a
//! character n-gram analyzer matching the original's
//! `NgramWordAnalyzer(minsize=4, maxsize=15)`, so a partial node name still
//! matches.

use charabia::{TokenKind, Tokenizer, TokenizerBuilder};

/// Word-level tokens for the `Text` field: lowercased, normalized,
/// punctuation/separators dropped. Built fresh per call, matching the
/// `TokenizerBuilder::new().build()` call sites in `milli`'s extraction
/// pipeline rather than sharing one across threads.
pub fn tokenize_text(text: &str) -> Vec<String> {
    let mut builder = TokenizerBuilder::new();
    let tokenizer = builder.build();
    tokenizer
        .tokenize(text)
        .filter(|t| matches!(t.kind, TokenKind::Word | TokenKind::StopWord) && !t.lemma().is_empty())
        .map(|t| t.lemma().to_lowercase())
        .collect()
}

/// Character n-grams (length 4..=15, clipped to the word's own length) of
/// each whitespace-delimited word in `text`, for the `NodeName` field.
pub fn tokenize_ngrams(text: &str) -> Vec<String> {
    const MIN: usize = 4;
    const MAX: usize = 15;

    let mut grams = Vec::new();
    for word in text.split_whitespace() {
        let lower = word.to_lowercase();
        let chars: Vec<char> = lower.chars().collect();
        let len = chars.len();
        if len == 0 {
            continue;
        }
        let max = MAX.min(len);
        let min = MIN.min(max);
        for size in min..=max {
            for start in 0..=(len - size) {
                grams.push(chars[start..start + size].iter().collect());
            }
        }
    }
    grams
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_text_lowercases_and_splits_on_punctuation() {
        let tokens = tokenize_text("Hello, World! Testing-123.");
        assert!(tokens.contains(&"hello".to_string()));
        assert!(tokens.contains(&"world".to_string()));
    }

    #[test]
    fn ngrams_respects_min_and_max_size() {
        let grams = tokenize_ngrams("abc");
        // "abc" is shorter than MIN=4, so it degrades to its own full length.
        assert!(grams.contains(&"abc".to_string()));
    }

    #[test]
    fn ngrams_covers_sliding_windows_within_bounds() {
        let grams = tokenize_ngrams("waystone");
        assert!(grams.contains(&"ways".to_string()));
        assert!(grams.contains(&"waystone".to_string()));
    }
}
