//! Honorific Stripping
//!
//! Titles and polite formulas ("Lama", "Rinpoche", "Khenpo", ...) are removed
//! from a query before search so that `བླ་མ་མི་ལ་རས་པ` and `མི་ལ་རས་པ`
//! search alike.
//!
//! The catalog is written in EWTS with bracket alternations (`[pm]`,
//! `(c|[sz])`). [`HonorificCatalog::build`] expands every alternation,
//! transliterates each variant once and compiles one start-anchored and one
//! end-anchored alternation. The compiled catalog is immutable and shared.

use std::sync::{Arc, LazyLock};

use indexmap::IndexSet;
use regex::Regex;

use super::error::{PreprocessError, PreprocessResult};
use super::ewts::{Ewts, Transliterator};

// ============================================================================
// Catalog
// ============================================================================

/// One catalog line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEntry {
    /// EWTS literal, optionally with `[xy]` or `(a|b)` alternations.
    Ewts(String),
    /// ASCII regular-expression fragment used as-is (catalog identifiers
    /// such as `bdrc:` that users paste in front of names).
    Pattern(String),
}

impl CatalogEntry {
    pub fn ewts(literal: impl Into<String>) -> Self {
        Self::Ewts(literal.into())
    }

    pub fn pattern(fragment: impl Into<String>) -> Self {
        Self::Pattern(fragment.into())
    }
}

/// Honorific prefixes (EWTS). Trailing space becomes a trailing tsheg.
pub const DEFAULT_PREFIXES: &[&str] = &[
    "mkhan [pm]o ",
    "rgya gar kyi ",
    "mkhan chen ",
    "a lag ",
    "a khu ",
    "rgan ",
    "rgan lags ",
    "zhabs drung ",
    "mkhas grub ",
    "mkhas dbang ",
    "mkhas pa ",
    "bla ma ",
    "sman pa ",
    "em chi ",
    "yongs 'dzin ",
    "ma hA ",
    "sngags pa ",
    "sngags mo ",
    "sngags pa'i rgyal po ",
    "sems dpa' chen po ",
    "rnal 'byor [pm]a ",
    "rje ",
    "rje btsun ",
    "rje btsun [pm]a ",
    "kun mkhyen ",
    "lo tsA ba ",
    "lo tswa ba ",
    "lo cA ba ",
    "lo chen ",
    "slob dpon ",
    "paN\\+Di ta ",
    "paN chen ",
    "srI ",
    "dpal ",
    "dge slong ",
    "dge slong ma ",
    "dge bshes ",
    "dge ba'i bshes gnyen ",
    "shAkya'i dge slong ",
    "'phags pa ",
    "A rya ",
    "gu ru ",
    "sprul sku ",
    "a ni ",
    "a ni lags ",
    "rig 'dzin ",
    "chen [pm]o ",
    "A tsar\\+yA ",
    "gter ston ",
    "gter chen ",
    "thams cad mkhyen pa ",
    "rgyal dbang ",
    "rgyal ba ",
    "btsun [pm]a ",
    "dge rgan ",
    "theg pa chen po'i ",
    "hor ",
    "sog [pm]o ",
    "sog ",
    "a lags sha ",
    "khal kha ",
    "cha har ",
    "jung gar ",
    "o rad ",
    "hor chin ",
    "thu med ",
    "hor pa ",
    "na'i man ",
    "ne nam ",
    "su nyid ",
    "har chen ",
];

/// Catalog identifiers pasted before names (`bdrc:`, `bdr:`, `tbrc-`).
/// The separator class stops at the first Tibetan character.
pub const DEFAULT_PREFIX_PATTERNS: &[&str] = &[
    r"bdrc[^a-zA-Z0-9\p{Tibetan}]*",
    "bdr: *",
    r"tbrc[^a-zA-Z0-9\p{Tibetan}]*",
];

/// Honorific suffixes (EWTS). Leading space becomes a leading tsheg.
pub const DEFAULT_SUFFIXES: &[&str] = &[
    " dpal bzang po",
    " lags",
    " rin po che",
    " sprul sku",
    " le'u",
    " rgyud kyi rgyal po",
    " bzhugs so",
    " sku gzhogs",
    " (c|[sz])es bya ba",
];

/// Default prefix catalog: transliterated literals, then identifier patterns.
pub fn default_prefix_entries() -> Vec<CatalogEntry> {
    DEFAULT_PREFIXES
        .iter()
        .map(|s| CatalogEntry::ewts(*s))
        .chain(DEFAULT_PREFIX_PATTERNS.iter().map(|s| CatalogEntry::pattern(*s)))
        .collect()
}

pub fn default_suffix_entries() -> Vec<CatalogEntry> {
    DEFAULT_SUFFIXES.iter().map(|s| CatalogEntry::ewts(*s)).collect()
}

static DEFAULT_CATALOG: LazyLock<Arc<HonorificCatalog>> = LazyLock::new(|| {
    Arc::new(HonorificCatalog::build(
        &default_prefix_entries(),
        &default_suffix_entries(),
        &Ewts,
    ))
});

#[derive(Debug, Clone, Copy)]
enum Anchor {
    Start,
    End,
}

/// Compiled prefix and suffix patterns.
#[derive(Debug, Clone, Default)]
pub struct HonorificCatalog {
    prefix: Option<Regex>,
    suffix: Option<Regex>,
}

impl HonorificCatalog {
    /// Compile catalogs. Literals that fail to expand or transliterate are
    /// dropped with a warning; the rest of the catalog still builds.
    pub fn build(
        prefixes: &[CatalogEntry],
        suffixes: &[CatalogEntry],
        transliterator: &dyn Transliterator,
    ) -> Self {
        let catalog = Self {
            prefix: compile(prefixes, transliterator, Anchor::Start),
            suffix: compile(suffixes, transliterator, Anchor::End),
        };
        log::debug!(
            "Honorific catalog built (prefix: {}, suffix: {})",
            catalog.prefix.is_some(),
            catalog.suffix.is_some()
        );
        catalog
    }

    /// A catalog that matches nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in catalog, compiled on first use.
    pub fn shared() -> Arc<Self> {
        Arc::clone(&DEFAULT_CATALOG)
    }

    pub fn is_empty(&self) -> bool {
        self.prefix.is_none() && self.suffix.is_none()
    }

    pub fn prefix_pattern(&self) -> Option<&Regex> {
        self.prefix.as_ref()
    }

    pub fn suffix_pattern(&self) -> Option<&Regex> {
        self.suffix.as_ref()
    }
}

fn compile(
    entries: &[CatalogEntry],
    transliterator: &dyn Transliterator,
    anchor: Anchor,
) -> Option<Regex> {
    let mut parts: IndexSet<String> = IndexSet::new();

    for entry in entries {
        match entry {
            CatalogEntry::Ewts(literal) => {
                let variants = match expand_alternations(literal) {
                    Ok(v) => v,
                    Err(e) => {
                        log::warn!("Skipping honorific literal: {e}");
                        continue;
                    }
                };
                for variant in variants {
                    if variant.trim().is_empty() {
                        continue;
                    }
                    match transliterator.to_unicode(&variant) {
                        Ok(native) => {
                            parts.insert(regex::escape(&native));
                        }
                        Err(e) => log::warn!("Skipping honorific variant: {e}"),
                    }
                }
            }
            CatalogEntry::Pattern(fragment) => match Regex::new(fragment) {
                Ok(_) => {
                    parts.insert(fragment.clone());
                }
                Err(e) => log::warn!("Skipping honorific pattern '{fragment}': {e}"),
            },
        }
    }

    if parts.is_empty() {
        return None;
    }

    let alternation = parts.into_iter().collect::<Vec<_>>().join("|");
    let source = match anchor {
        Anchor::Start => format!("^(?:{alternation})"),
        Anchor::End => format!("(?:{alternation})$"),
    };

    match Regex::new(&source) {
        Ok(re) => Some(re),
        Err(e) => {
            log::warn!("Honorific alternation failed to compile: {e}");
            None
        }
    }
}

// ============================================================================
// Alternation Expansion
// ============================================================================

/// Expand `[xy]` character alternations and `(a|b)` groups into every
/// literal they describe. A backslash makes the next character literal.
///
/// `"mkhan [pm]o "` expands to `["mkhan po ", "mkhan mo "]`.
pub fn expand_alternations(literal: &str) -> PreprocessResult<Vec<String>> {
    let chars: Vec<char> = literal.chars().collect();
    let mut pos = 0;
    let variants = expand_sequence(&chars, &mut pos, false, literal)?;
    if pos != chars.len() {
        return Err(PreprocessError::Alternation(literal.to_string()));
    }
    Ok(variants)
}

fn expand_sequence(
    chars: &[char],
    pos: &mut usize,
    nested: bool,
    literal: &str,
) -> PreprocessResult<Vec<String>> {
    let unbalanced = || PreprocessError::Alternation(literal.to_string());
    let mut variants = vec![String::new()];

    while let Some(&c) = chars.get(*pos) {
        let options: Vec<String> = match c {
            '|' | ')' if nested => break,
            '[' => {
                let len = chars[*pos..]
                    .iter()
                    .position(|&x| x == ']')
                    .ok_or_else(unbalanced)?;
                let options: Vec<String> = chars[*pos + 1..*pos + len]
                    .iter()
                    .map(|c| c.to_string())
                    .collect();
                if options.is_empty() {
                    return Err(unbalanced());
                }
                *pos += len + 1;
                options
            }
            '(' => {
                *pos += 1;
                let mut options = Vec::new();
                loop {
                    options.extend(expand_sequence(chars, pos, true, literal)?);
                    match chars.get(*pos) {
                        Some('|') => *pos += 1,
                        Some(')') => {
                            *pos += 1;
                            break;
                        }
                        _ => return Err(unbalanced()),
                    }
                }
                options
            }
            '\\' => {
                let escaped = chars.get(*pos + 1).ok_or_else(unbalanced)?;
                *pos += 2;
                vec![escaped.to_string()]
            }
            ']' | ')' | '|' => return Err(unbalanced()),
            other => {
                *pos += 1;
                vec![other.to_string()]
            }
        };

        variants = variants
            .iter()
            .flat_map(|v| options.iter().map(move |o| format!("{v}{o}")))
            .collect();
    }

    Ok(variants)
}

// ============================================================================
// Normalizer
// ============================================================================

/// Removes honorific prefixes and suffixes from a query.
#[derive(Debug, Clone)]
pub struct HonorificNormalizer {
    catalog: Arc<HonorificCatalog>,
}

impl Default for HonorificNormalizer {
    fn default() -> Self {
        Self::new(HonorificCatalog::shared())
    }
}

impl HonorificNormalizer {
    pub fn new(catalog: Arc<HonorificCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &HonorificCatalog {
        &self.catalog
    }

    /// Remove a leading honorific, then a trailing one, then surrounding
    /// whitespace. The pass repeats until nothing changes, so
    /// `strip(strip(s)) == strip(s)`.
    pub fn strip(&self, s: &str) -> String {
        let mut current = s.trim().to_string();

        loop {
            let mut next = current.clone();
            if let Some(re) = &self.catalog.prefix {
                next = re.replace(&next, "").into_owned();
            }
            if let Some(re) = &self.catalog.suffix {
                next = re.replace(&next, "").into_owned();
            }
            let next = next.trim();

            if next == current {
                return current;
            }
            current = next.to_string();
        }
    }
}
