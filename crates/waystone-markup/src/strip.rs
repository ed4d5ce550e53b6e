use once_cell::sync::Lazy;
use regex::Regex;

// Compiled once, mirroring the module-level `re.compile` calls in
// `original_source/src/core/crawl.py`.
static RE_FB_SHORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"`[fb]").unwrap());
static RE_FB_LONG: Lazy<Regex> = Lazy::new(|| Regex::new(r"`[FB]...").unwrap());
static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"`<[^>]*>").unwrap());
static RE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)#.*$").unwrap());
static RE_GT_LINE_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*>+").unwrap());
static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());
static RE_PARAGRAPH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n+").unwrap());

/// Single-letter format toggles and the bare backtick escape, in the order
/// the original iterates `_MICRON_CHARS = "car!_=`"`.
const MICRON_CHARS: [char; 7] = ['c', 'a', 'r', '!', '_', '=', '`'];

/// Converts a page's raw markup into a plain-text approximation suitable
/// for indexing. Idempotent: `strip_micron(strip_micron(x)) == strip_micron(x)`.
pub fn strip_micron(text: &str) -> String {
    let mut s = text.to_string();

    // Short form first, then long form: the long-form regex overlaps a
    // subset of the short form's matches, so order matters (spec.md §9).
    s = RE_FB_SHORT.replace_all(&s, "").into_owned();
    s = RE_FB_LONG.replace_all(&s, "").into_owned();

    for ch in MICRON_CHARS {
        let pattern = format!("`{ch}");
        s = s.replace(&pattern, "");
    }

    s = RE_TAGS.replace_all(&s, " ").into_owned();
    s = RE_COMMENT.replace_all(&s, "").into_owned();
    s = RE_GT_LINE_START.replace_all(&s, "").into_owned();
    s = s.replace('\\', " ");
    s = RE_SPACES.replace_all(&s, " ").into_owned();
    s = RE_PARAGRAPH.replace_all(&s, "\n\n").into_owned();
    s = s.replace('`', "");

    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotent() {
        let samples = [
            "`Faaa`B333\nHere is a `[label`72914442a3689add83a09a767963f57c:/page/index.mu]",
            "plain text, no markup at all",
            "`c`a`r`!`_`=``",
            "# just a comment\n> quoted line\nreal text",
        ];
        for s in samples {
            let once = strip_micron(s);
            let twice = strip_micron(&once);
            assert_eq!(once, twice, "not idempotent for input {s:?}");
        }
    }

    #[test]
    fn strips_color_escapes_short_and_long_form() {
        // short form: `f / `b (2 chars)
        assert_eq!(strip_micron("a`fb"), "ab");
        // long form: `Fxxx / `Bxxx (5 chars)
        assert_eq!(strip_micron("a`Faaab"), "ab");
    }

    #[test]
    fn drops_single_letter_toggles_and_escapes() {
        assert_eq!(strip_micron("`c`a`r`!`_`=``text"), "text");
    }

    #[test]
    fn replaces_tag_blocks_with_space() {
        assert_eq!(strip_micron("a`<tagcontent>b"), "a b");
    }

    #[test]
    fn strips_line_comments() {
        assert_eq!(strip_micron("keep\n# a comment to drop\nmore"), "keep\n\nmore");
    }

    #[test]
    fn strips_leading_quote_markers() {
        assert_eq!(strip_micron("> quoted\ntext"), " quoted\ntext");
    }

    #[test]
    fn collapses_spaces_and_blank_lines() {
        assert_eq!(strip_micron("a    b"), "a b");
        assert_eq!(strip_micron("a\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn backslashes_become_spaces() {
        assert_eq!(strip_micron(r"a\b"), "a b");
    }

    #[test]
    fn drops_remaining_backticks() {
        // `x` doesn't match any of the color/toggle/tag passes, so only the
        // final "drop any remaining back-ticks" step touches it.
        assert_eq!(strip_micron("a`xb"), "axb");
    }

    #[test]
    fn short_form_color_escape_matches_any_trailing_f_or_b() {
        // A quirk inherited from the original: `[fb] is a blanket pattern,
        // so a literal backtick immediately followed by 'b' is always
        // treated as a background-color escape, even out of context.
        assert_eq!(strip_micron("a`b"), "a");
    }
}
