//! Product description cleanup for search queries.
//!
//! Catalog descriptions are packed with packaging and unit noise
//! (`12X350ML`, `C/6`, `PCT`, `2L`). Search providers do better with the
//! product words alone. The cleanup is heuristic and lossy: it may drop a
//! meaningful word that happens to look like a unit.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex_lite::Regex;

/// Unit and packaging words removed wherever they appear as a whole token.
pub const DEFAULT_UNIT_TOKENS: &[&str] = &[
    "UN", "UND", "UNID", "UNIDADE", "CX", "CXA", "CAIXA", "KG", "G", "GR", "GRS", "MG", "L", "LT",
    "LTS", "ML", "PCT", "PCTE", "PC", "FD", "FARDO", "LATA", "VD", "VIDRO", "PET", "SC",
    "SACHE", "DP", "DISPLAY",
];

/// Token-shaped packaging patterns, matched against the uppercased token.
pub const DEFAULT_PATTERNS: &[&str] = &[
    // Pack counts: C/24, X/12
    r"^[CX]/\d+$",
    // Multipliers: 12X500, 12X500ML, 6X, 2X1,5L
    r"^\d+([.,]\d+)?X(\d+([.,]\d+)?)?[A-Z]*$",
    // Count suffix: 12C, 6C1
    r"^\d+C\d*$",
    // Quantity with unit: 500ML, 2L, 1,5KG, 200G
    r"^\d+([.,]\d+)?(ML|L|LT|LTS|G|GR|GRS|KG|MG|UN|UND|M|CM|MM|CC|OZ)$",
];

static DEFAULT_RULES: Lazy<CleanupRules> = Lazy::new(CleanupRules::default);

/// Clean a product description with the default rules.
///
/// Returns an empty string for empty input.
pub fn clean_text(description: &str) -> String {
    DEFAULT_RULES.clean(description)
}

/// Vocabulary and patterns that mark a token as packaging noise.
#[derive(Debug, Clone)]
pub struct CleanupRules {
    unit_tokens: HashSet<String>,
    patterns: Vec<Regex>,
}

impl CleanupRules {
    /// Build a rule table from a vocabulary and token patterns.
    pub fn new<I, S>(unit_tokens: I, patterns: &[&str]) -> Result<Self, regex_lite::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unit_tokens = unit_tokens
            .into_iter()
            .map(|t| t.as_ref().to_uppercase())
            .collect();
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            unit_tokens,
            patterns,
        })
    }

    /// Strip noise tokens and punctuation, collapsing whitespace.
    ///
    /// Each whitespace token is first checked whole (so `C/6` and `1,5L` are
    /// recognised), then split on punctuation and each part checked again.
    /// Output tokens are alphanumeric only, which makes the cleanup
    /// idempotent.
    pub fn clean(&self, text: &str) -> String {
        let mut kept: Vec<&str> = Vec::new();

        for raw in text.split_whitespace() {
            let token = raw.trim_matches(|c: char| !c.is_alphanumeric());
            if token.is_empty() || self.is_noise(token) {
                continue;
            }

            kept.extend(
                token
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|part| !part.is_empty() && !self.is_noise(part)),
            );
        }

        kept.join(" ")
    }

    /// Whether a single token is a unit word or packaging pattern.
    pub fn is_noise(&self, token: &str) -> bool {
        let upper = token.to_uppercase();
        self.unit_tokens.contains(&upper) || self.patterns.iter().any(|p| p.is_match(&upper))
    }
}

impl Default for CleanupRules {
    fn default() -> Self {
        Self::new(DEFAULT_UNIT_TOKENS, DEFAULT_PATTERNS).expect("default cleanup patterns are valid")
    }
}
