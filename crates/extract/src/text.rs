//! Turning rich-text descriptions into short plain-text summaries.

use crate::consts::{BLOCK_ELEMENTS, ENRICHER_REGEX, WHITESPACE_REGEX};
use memchr::memrchr;
use scraper::{Html, Node};

const ELLIPSIS: char = '…';

/// Strip markup from an HTML fragment, leaving readable text.
///
/// Block-level elements separate words, host enrichers such as
/// `@UUID[Compendium.x.y]{Fireball}` are reduced to their label, and all
/// runs of whitespace collapse to a single space.
///
/// ```rust
/// use bestiary_extract::html_to_text;
/// assert_eq!(html_to_text("<p>Small &amp; <b>mean</b></p><p>Casts @UUID[Item.abc]{Light}</p>"), "Small & mean Casts Light");
/// ```
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut text = String::with_capacity(html.len());
    for node in fragment.tree.root().descendants() {
        match node.value() {
            Node::Text(chunk) => text.push_str(chunk),
            Node::Element(element) if BLOCK_ELEMENTS.contains(&element.name()) => text.push(' '),
            _ => {},
        }
    }
    let text = ENRICHER_REGEX.replace_all(&text, |captures: &regex::Captures| {
        captures.get(1).map(|label| label.as_str().to_string()).unwrap_or_default()
    });
    WHITESPACE_REGEX.replace_all(&text, " ").trim().to_string()
}

/// Shorten text to at most `max_chars` characters (ellipsis included),
/// cutting at the last word boundary that fits.
///
/// Text that already fits is returned untouched. A single word longer than
/// the limit is cut mid-word rather than dropped.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    // Leave room for the ellipsis.
    let cut = text.char_indices().nth(max_chars - 1).map(|(i, _)| i).unwrap_or(text.len());
    let candidate = &text[..cut];
    let candidate = match memrchr(b' ', candidate.as_bytes()) {
        Some(space) if space > 0 => &candidate[..space],
        _ => candidate,
    };
    let mut out = candidate.trim_end().to_string();
    out.push(ELLIPSIS);
    out
}

/// [`html_to_text`] then [`truncate`]; `None` when nothing readable is left.
pub(crate) fn summarize(html: &str, max_chars: usize) -> Option<String> {
    let text = html_to_text(html);
    (!text.is_empty()).then(|| truncate(&text, max_chars))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("plain text", "plain text")]
    #[case("<p>One</p><p>Two</p>", "One Two")]
    #[case("<ul><li>bite</li><li>claw</li></ul>", "bite claw")]
    #[case("  lots \n\n of\t space ", "lots of space")]
    #[case("Roll [[/r 1d20+5]] to hit", "Roll to hit")]
    #[case("See @Compendium[dnd5e.rules.abc]", "See")]
    #[case("", "")]
    fn test_html_to_text(#[case] html: &str, #[case] expected: &str) {
        assert_eq!(html_to_text(html), expected);
    }

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate("A small goblin.", 200), "A small goblin.");
    }

    #[test]
    fn cuts_at_word_boundary() {
        let out = truncate("The ancient red dragon sleeps on gold", 20);
        assert_eq!(out, "The ancient red…");
        assert!(out.chars().count() <= 20);
    }

    #[test]
    fn cuts_long_word() {
        assert_eq!(truncate("Supercalifragilistic", 6), "Super…");
    }

    #[test]
    fn counts_characters_not_bytes() {
        let out = truncate("Ärger über Öl und Übel", 12);
        assert!(out.chars().count() <= 12);
        assert!(out.ends_with(ELLIPSIS));
    }

    #[test]
    fn summarize_empty_markup() {
        assert_eq!(summarize("<p> </p>", 50), None);
        assert_eq!(summarize("<p>Hi</p>", 50).as_deref(), Some("Hi"));
    }
}
