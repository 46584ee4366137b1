//! EWTS Transliteration
//!
//! Converts Extended Wylie (EWTS) romanization into Tibetan Unicode. The
//! converter covers the letters, vowels and stacking rules that occur in
//! names and titles: prefix letters, superscripts, subscripts, explicit `+`
//! stacks for Sanskrit forms, the a-chung `'`, and space as tsheg.
//!
//! ```text
//! "bla ma "      -> བླ་མ་
//! "rgyal ba "    -> རྒྱལ་བ་
//! "paN+Di ta "   -> པཎྜི་ཏ་
//! ```

use super::error::{PreprocessError, PreprocessResult};
use super::tsheg::TSHEG;

// ============================================================================
// Letter Tables
// ============================================================================

/// Consonants, longest romanization first so lexing is greedy.
const CONSONANTS: &[(&str, char)] = &[
    ("tsh", 'ཚ'),
    ("kh", 'ཁ'),
    ("ng", 'ང'),
    ("ch", 'ཆ'),
    ("ny", 'ཉ'),
    ("Th", 'ཋ'),
    ("th", 'ཐ'),
    ("ph", 'ཕ'),
    ("ts", 'ཙ'),
    ("dz", 'ཛ'),
    ("zh", 'ཞ'),
    ("sh", 'ཤ'),
    ("Sh", 'ཥ'),
    ("k", 'ཀ'),
    ("g", 'ག'),
    ("c", 'ཅ'),
    ("j", 'ཇ'),
    ("T", 'ཊ'),
    ("D", 'ཌ'),
    ("N", 'ཎ'),
    ("t", 'ཏ'),
    ("d", 'ད'),
    ("n", 'ན'),
    ("p", 'པ'),
    ("b", 'བ'),
    ("m", 'མ'),
    ("w", 'ཝ'),
    ("z", 'ཟ'),
    ("'", 'འ'),
    ("y", 'ཡ'),
    ("r", 'ར'),
    ("l", 'ལ'),
    ("s", 'ས'),
    ("h", 'ཧ'),
];

/// Vowels and the signs they produce; `a` is inherent and writes nothing.
const VOWELS: &[(&str, &str)] = &[
    ("-I", "\u{0f71}\u{0f80}"),
    ("-i", "\u{0f80}"),
    ("ai", "\u{0f7b}"),
    ("au", "\u{0f7d}"),
    ("a", ""),
    ("A", "\u{0f71}"),
    ("i", "\u{0f72}"),
    ("I", "\u{0f71}\u{0f72}"),
    ("u", "\u{0f74}"),
    ("U", "\u{0f71}\u{0f74}"),
    ("e", "\u{0f7a}"),
    ("o", "\u{0f7c}"),
];

/// Carrier letter for syllables that start with a vowel.
const A_CHEN: char = 'ཨ';

/// Distance between a base consonant and its subjoined form.
const SUBJOINED_OFFSET: u32 = 0x50;

const PREFIX_LETTERS: &[&str] = &["g", "d", "b", "m", "'"];

// ============================================================================
// Transliterator Trait
// ============================================================================

/// Converts a romanized literal into native Tibetan script.
///
/// Used once per catalog literal when building the honorific patterns.
pub trait Transliterator: Send + Sync {
    fn to_unicode(&self, romanized: &str) -> PreprocessResult<String>;
}

/// Extended Wylie converter.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ewts;

impl Transliterator for Ewts {
    fn to_unicode(&self, romanized: &str) -> PreprocessResult<String> {
        let mut out = String::with_capacity(romanized.len() * 3);
        for (i, syllable) in romanized.split(' ').enumerate() {
            if i > 0 {
                out.push(TSHEG);
            }
            if !syllable.is_empty() {
                out.push_str(&convert_syllable(syllable).map_err(|reason| {
                    PreprocessError::Transliteration {
                        literal: romanized.to_string(),
                        reason,
                    }
                })?);
            }
        }
        Ok(out)
    }
}

// ============================================================================
// Syllable Conversion
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Piece {
    Consonant(&'static str, char),
    Vowel(&'static str),
    Plus,
}

fn lex(syllable: &str) -> Result<Vec<Piece>, String> {
    let mut pieces = Vec::new();
    let mut rest = syllable;

    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix('+') {
            pieces.push(Piece::Plus);
            rest = tail;
            continue;
        }

        let consonant = CONSONANTS.iter().find(|(k, _)| rest.starts_with(k));
        let vowel = VOWELS.iter().find(|(k, _)| rest.starts_with(k));

        match (consonant, vowel) {
            (Some((ck, ch)), Some((vk, _))) if ck.len() >= vk.len() => {
                pieces.push(Piece::Consonant(*ck, *ch));
                rest = &rest[ck.len()..];
            }
            (_, Some((vk, sign))) => {
                pieces.push(Piece::Vowel(*sign));
                rest = &rest[vk.len()..];
            }
            (Some((ck, ch)), None) => {
                pieces.push(Piece::Consonant(*ck, *ch));
                rest = &rest[ck.len()..];
            }
            (None, None) => {
                let bad = rest.chars().next().unwrap_or_default();
                return Err(format!("unexpected character {bad:?} in '{syllable}'"));
            }
        }
    }

    Ok(pieces)
}

/// A run of consonants between vowels.
struct Run {
    letters: Vec<(&'static str, char)>,
    explicit: bool,
}

fn take_run(pieces: &[Piece], mut i: usize) -> Result<(Run, usize), String> {
    let mut run = Run {
        letters: Vec::new(),
        explicit: false,
    };
    let mut pending_plus = false;

    while let Some(piece) = pieces.get(i) {
        match *piece {
            Piece::Consonant(key, ch) => {
                run.letters.push((key, ch));
                pending_plus = false;
            }
            Piece::Plus => {
                if run.letters.is_empty() || pending_plus {
                    return Err("'+' must join two letters".to_string());
                }
                run.explicit = true;
                pending_plus = true;
            }
            Piece::Vowel(_) => break,
        }
        i += 1;
    }

    if pending_plus {
        return Err("dangling '+'".to_string());
    }
    Ok((run, i))
}

fn convert_syllable(syllable: &str) -> Result<String, String> {
    let pieces = lex(syllable)?;
    let mut out = String::new();
    let mut i = 0;
    let mut initial = true;

    while i < pieces.len() {
        let (run, next) = take_run(&pieces, i)?;
        match pieces.get(next) {
            Some(Piece::Vowel(sign)) => {
                if run.letters.is_empty() {
                    out.push(A_CHEN);
                } else if initial {
                    render_initial(&run, &mut out);
                } else {
                    render_stack(&run.letters, &mut out);
                }
                out.push_str(sign);
                i = next + 1;
            }
            _ => {
                if initial {
                    return Err(format!("no vowel in '{syllable}'"));
                }
                // Suffix letters after the vowel are written unstacked.
                if run.explicit {
                    render_stack(&run.letters, &mut out);
                } else {
                    out.extend(run.letters.iter().map(|(_, ch)| *ch));
                }
                i = next;
            }
        }
        initial = false;
    }

    Ok(out)
}

/// Render the consonants before the first vowel, separating a prefix letter
/// from the stack it precedes.
fn render_initial(run: &Run, out: &mut String) {
    let letters = &run.letters;
    if run.explicit || letters.len() == 1 {
        render_stack(letters, out);
        return;
    }

    let first = letters[0].0;
    let splits_prefix = match letters.len() {
        2 => !takes_subscript(first, letters[1].0) && PREFIX_LETTERS.contains(&first),
        _ => PREFIX_LETTERS.contains(&first) && is_valid_stack(&letters[1..]),
    };

    if splits_prefix {
        out.push(letters[0].1);
        render_stack(&letters[1..], out);
    } else {
        render_stack(letters, out);
    }
}

fn render_stack(letters: &[(&'static str, char)], out: &mut String) {
    let mut iter = letters.iter();
    if let Some((_, head)) = iter.next() {
        out.push(*head);
    }
    for (_, ch) in iter {
        out.push(subjoined(*ch));
    }
}

fn subjoined(base: char) -> char {
    char::from_u32(base as u32 + SUBJOINED_OFFSET).unwrap_or(base)
}

fn takes_subscript(root: &str, sub: &str) -> bool {
    match sub {
        "y" => matches!(root, "k" | "kh" | "g" | "p" | "ph" | "b" | "m"),
        "r" => matches!(
            root,
            "k" | "kh" | "g" | "t" | "th" | "d" | "p" | "ph" | "b" | "m" | "sh" | "s" | "h"
        ),
        "l" => matches!(root, "k" | "g" | "b" | "z" | "r" | "s"),
        "w" => true,
        _ => false,
    }
}

fn takes_superscript(sup: &str, root: &str) -> bool {
    match sup {
        "r" => matches!(
            root,
            "k" | "g" | "ng" | "j" | "ny" | "t" | "d" | "n" | "b" | "m" | "ts" | "dz"
        ),
        "l" => matches!(
            root,
            "k" | "g" | "ng" | "c" | "j" | "t" | "d" | "p" | "b" | "h"
        ),
        "s" => matches!(
            root,
            "k" | "g" | "ng" | "ny" | "t" | "d" | "n" | "p" | "b" | "m" | "ts"
        ),
        _ => false,
    }
}

fn is_valid_stack(letters: &[(&'static str, char)]) -> bool {
    let keys: Vec<&str> = letters.iter().map(|(k, _)| *k).collect();
    match keys.as_slice() {
        [_] => true,
        [a, b] => takes_superscript(a, b) || takes_subscript(a, b),
        [a, b, c] => {
            (takes_superscript(a, b) && takes_subscript(b, c))
                || (takes_subscript(a, b) && *c == "w")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("bla ma ", "བླ་མ་")]
    #[case("mkhan po ", "མཁན་པོ་")]
    #[case("rje btsun ", "རྗེ་བཙུན་")]
    #[case("yongs 'dzin ", "ཡོངས་འཛིན་")]
    #[case("dge slong ", "དགེ་སློང་")]
    #[case("rgyal ba ", "རྒྱལ་བ་")]
    #[case("sprul sku ", "སྤྲུལ་སྐུ་")]
    #[case("dge ba'i bshes gnyen ", "དགེ་བའི་བཤེས་གཉེན་")]
    #[case("'phags pa ", "འཕགས་པ་")]
    #[case(" rin po che", "་རིན་པོ་ཆེ")]
    #[case(" bzhugs so", "་བཞུགས་སོ")]
    #[case("a ni ", "ཨ་ནི་")]
    #[case("em chi ", "ཨེམ་ཆི་")]
    #[case("ma hA ", "མ་ཧཱ་")]
    #[case("srI ", "སྲཱི་")]
    #[case("paN+Di ta ", "པཎྜི་ཏ་")]
    #[case("shAkya'i dge slong ", "ཤཱཀྱའི་དགེ་སློང་")]
    #[case("rnal 'byor pa ", "རྣལ་འབྱོར་པ་")]
    #[case("bka' 'gyur", "བཀའ་འགྱུར")]
    fn test_catalog_forms(#[case] ewts: &str, #[case] expected: &str) {
        assert_eq!(Ewts.to_unicode(ewts).unwrap(), expected);
    }

    #[test]
    fn test_rejects_unknown_characters() {
        let err = Ewts.to_unicode("bla ma 7").unwrap_err();
        assert!(matches!(err, PreprocessError::Transliteration { .. }));
    }

    #[test]
    fn test_rejects_dangling_plus() {
        assert!(Ewts.to_unicode("paN+").is_err());
        assert!(Ewts.to_unicode("+Di").is_err());
    }

    #[test]
    fn test_rejects_syllable_without_vowel() {
        assert!(Ewts.to_unicode("bdr").is_err());
    }

    #[test]
    fn test_empty_literal() {
        assert_eq!(Ewts.to_unicode("").unwrap(), "");
    }
}
