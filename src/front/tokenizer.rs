//! IPA normalization and tokenization.
//!
//! Input is a UTF-8 IPA string. The pack's normalization rules run first as
//! ordered, guard-aware replacements; the scanner then walks Unicode scalars
//! recognizing stress marks, the length mark, tie bars, Chao tone letters,
//! clause punctuation and word-boundary whitespace, and resolves each symbol
//! against the pack's phoneme table. Unknown symbols are dropped with a
//! warning and counted; they never abort the call.

use std::sync::Arc;

use tracing::warn;

use crate::front::token::{Stress, Token};
use crate::pack::lang::NormRule;
use crate::pack::phoneme::PhonemeDef;
use crate::pack::PackSet;

pub const PRIMARY_STRESS: char = '\u{02C8}'; // ˈ
pub const SECONDARY_STRESS: char = '\u{02CC}'; // ˌ
pub const LENGTH_MARK: char = '\u{02D0}'; // ː
pub const TIE_BAR: char = '\u{0361}'; // ◌͡◌

const TONE_LETTERS: [char; 5] = ['\u{02E5}', '\u{02E6}', '\u{02E7}', '\u{02E8}', '\u{02E9}'];

/// The phoneme key used for inserted post-stop aspiration.
const ASPIRATION_KEY: &str = "h";

#[derive(Debug, Default)]
pub struct TokenizeResult {
    pub tokens: Vec<Token>,
    pub unknown_symbols: usize,
}

/// Runs normalization and the scanner over `ipa`.
pub fn tokenize(pack: &PackSet, ipa: &str) -> TokenizeResult {
    let normalized = normalize(pack, ipa);
    scan(pack, &normalized)
}

/// Applies the pack's ordered replacement rules.
pub fn normalize(pack: &PackSet, input: &str) -> String {
    let mut text = input.to_owned();
    for rule in &pack.lang.normalization_rules {
        if rule.from.is_empty() {
            continue;
        }
        text = apply_rule(pack, &text, rule);
    }
    text
}

fn is_boundary(c: char) -> bool {
    c.is_whitespace() || matches!(c, '.' | ',' | '?' | '!')
}

fn apply_rule(pack: &PackSet, text: &str, rule: &NormRule) -> String {
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < text.len() {
        if text[i..].starts_with(&rule.from) && guard_allows(pack, text, i, i + rule.from.len(), rule)
        {
            out.push_str(&rule.to);
            i += rule.from.len();
        } else {
            let c = text[i..].chars().next().unwrap();
            out.push(c);
            i += c.len_utf8();
        }
    }
    out
}

fn guard_allows(pack: &PackSet, text: &str, start: usize, end: usize, rule: &NormRule) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();

    if rule.word_initial && !before.is_none_or(is_boundary) {
        return false;
    }
    if rule.word_final && !after.is_none_or(is_boundary) {
        return false;
    }
    if let Some(class) = &rule.after_class {
        match before {
            Some(c) if pack.lang.class_contains(class, &c.to_string()) => {}
            _ => return false,
        }
    }
    if let Some(class) = &rule.before_class {
        match after {
            Some(c) if pack.lang.class_contains(class, &c.to_string()) => {}
            _ => return false,
        }
    }
    true
}

fn scan(pack: &PackSet, text: &str) -> TokenizeResult {
    let chars: Vec<char> = text.chars().collect();
    let mut result = TokenizeResult::default();
    let mut pending_stress = Stress::None;
    let mut new_word = true;
    // Index into `result.tokens` of the current syllable's first token.
    let mut syllable_start_idx: Option<usize> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == PRIMARY_STRESS {
            pending_stress = Stress::Primary;
            i += 1;
            continue;
        }
        if c == SECONDARY_STRESS {
            pending_stress = Stress::Secondary;
            i += 1;
            continue;
        }
        if c.is_whitespace() {
            new_word = true;
            i += 1;
            continue;
        }
        if matches!(c, '.' | ',' | '?' | '!') {
            if let Some(last) = result.tokens.last_mut() {
                last.clause_end = true;
            }
            new_word = true;
            i += 1;
            continue;
        }
        if TONE_LETTERS.contains(&c) {
            i += attach_tone_run(pack, &chars[i..], &mut result);
            continue;
        }

        // Resolve the symbol, preferring tied-pair and length-marked keys.
        let next = chars.get(i + 1).copied();
        let mut def: Option<Arc<PhonemeDef>> = None;
        let mut consumed = 1;
        let mut lengthened = false;
        let mut tied_to = false;

        if next == Some(TIE_BAR) {
            if i + 2 < chars.len() {
                let key: String = chars[i..i + 3].iter().collect();
                if let Some(d) = pack.phoneme(&key) {
                    def = Some(Arc::clone(d));
                    consumed = 3;
                } else {
                    // Unknown affricate: fall back to the first component as
                    // a stop-release pair; the scanner revisits the second
                    // component and flags it tied-from.
                    tied_to = true;
                    consumed = 2;
                }
            } else {
                consumed = 2;
            }
        } else if next == Some(LENGTH_MARK) {
            lengthened = true;
            consumed = 2;
            let key: String = chars[i..i + 2].iter().collect();
            if let Some(d) = pack.phoneme(&key) {
                def = Some(Arc::clone(d));
            }
        }

        if def.is_none() {
            def = pack.phoneme(&c.to_string()).cloned();
        }
        let Some(def) = def else {
            warn!(symbol = %c, "dropping unknown IPA symbol");
            result.unknown_symbols += 1;
            i += consumed;
            continue;
        };

        let tied_from = i > 0 && chars[i - 1] == TIE_BAR;

        let mut token = Token::for_def(Arc::clone(&def));
        token.lengthened = lengthened;
        token.tied_to = tied_to;
        token.tied_from = tied_from;

        let stress = std::mem::take(&mut pending_stress);
        let last_real = result.tokens.iter().rposition(|t| !t.is_silence_or_missing());

        // A consonant directly before a vowel opens the vowel's syllable; a
        // primary stress right after a vowel opens a new one on this token.
        if let Some(idx) = last_real {
            if token.is_vowel() && result.tokens[idx].is_consonant() {
                result.tokens[idx].syllable_start = true;
                syllable_start_idx = Some(idx);
            } else if stress == Stress::Primary && result.tokens[idx].is_vowel() {
                token.syllable_start = true;
            }
        }

        // Aspiration between a voiceless stop and a following voiced
        // continuant.
        if pack.lang.post_stop_aspiration_enabled {
            let after_voiceless_stop = last_real.is_some_and(|idx| {
                let t = &result.tokens[idx];
                t.is_stop_like() && !t.is_voiced() && !t.post_stop_aspiration
            });
            let def_flags = &def.flags;
            if after_voiceless_stop
                && def_flags.is_voiced
                && !def_flags.is_stop
                && !def_flags.is_affricate
            {
                if let Some(h) = pack.phoneme(ASPIRATION_KEY) {
                    let mut asp = Token::for_def(Arc::clone(h));
                    asp.post_stop_aspiration = true;
                    result.tokens.push(asp);
                }
            }
        }

        if new_word {
            new_word = false;
            token.word_start = true;
            token.syllable_start = true;
        }

        result.tokens.push(token);
        let this_idx = result.tokens.len() - 1;
        if result.tokens[this_idx].syllable_start {
            syllable_start_idx = Some(this_idx);
        }
        if stress != Stress::None {
            let idx = syllable_start_idx.unwrap_or(this_idx);
            result.tokens[idx].stress = stress;
        }

        i += consumed;
    }

    result
}

/// Consumes a run of tone letters and attaches the contour to the most
/// recent vowel token. Returns the number of scalars consumed.
fn attach_tone_run(pack: &PackSet, run: &[char], result: &mut TokenizeResult) -> usize {
    let len = run.iter().take_while(|c| TONE_LETTERS.contains(c)).count();
    let first = run[0].to_string();
    let last = run[len - 1].to_string();
    let tones = &pack.lang.tones;
    match (tones.get(&first), tones.get(&last)) {
        (Some(start), Some(end)) => {
            if let Some(vowel) = result.tokens.iter_mut().rev().find(|t| t.is_vowel()) {
                vowel.tone = Some([start[0], end[1]]);
            }
        }
        _ => {
            warn!(symbols = %run[..len].iter().collect::<String>(), "dropping unmapped tone letters");
            result.unknown_symbols += len;
        }
    }
    len
}
