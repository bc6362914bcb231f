use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

/// Document types that describe a creature in most game systems.
pub(crate) const CREATURE_TYPES: &[&str] = &["npc", "character", "creature"];
/// Foundry's placeholder portrait; a document using it has no real image.
pub(crate) const DEFAULT_PORTRAIT: &str = "icons/svg/mystery-man.svg";
/// Game systems ship their own placeholder art under this directory
/// (`systems/pf2e/icons/default-icons/npc.svg`).
pub(crate) const DEFAULT_ICONS_DIR: &str = "/default-icons/";
/// Description used on every fallback entry.
pub const FALLBACK_DESCRIPTION: &str = "Data extraction failed";
/// Default description length, in characters.
pub const DEFAULT_DESCRIPTION_LENGTH: usize = 200;

// "1/4", "-1 / 2", "0.5/1"
regex!(FRACTION_REGEX, r"^\s*(-?\d+(?:\.\d+)?)\s*/\s*(\d+(?:\.\d+)?)\s*$");
// Leading number of a free-text value like "3 (700 XP)" or "+2".
regex!(LEADING_NUMBER_REGEX, r"^\s*([+-]?\d+(?:\.\d+)?)");
regex!(WHITESPACE_REGEX, r"\s+");

/// Elements whose boundaries separate words once markup is stripped.
pub(crate) const BLOCK_ELEMENTS: &[&str] = &["p", "li", "h1", "h2", "h3", "h4", "h5", "h6", "div", "br", "tr", "td"];
// Foundry enrichers: @UUID[Compendium.x.y]{Label}, [[/r 1d6]]
regex!(ENRICHER_REGEX, r"@\w+\[[^\]]*\](?:\{([^}]*)\})?|\[\[[^\]]*\]\]");
