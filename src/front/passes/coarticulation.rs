//! Coarticulation pass: locus-based F2 shaping, velar pinch, and formant
//! fill for copy-adjacent tokens.

use crate::fields::FieldId;
use crate::front::passes::PassContext;
use crate::front::token::Token;

/// Consonant place of articulation, derived from the phoneme key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Place {
    Labial,
    Alveolar,
    Velar,
}

/// Maps an IPA key to its place of articulation, for the consonants the
/// locus model covers.
pub fn place_of_articulation(key: &str) -> Option<Place> {
    match key {
        "p" | "b" | "m" | "f" | "v" | "w" | "\u{028D}" => Some(Place::Labial),
        "t" | "d" | "n" | "s" | "z" | "l" | "r" | "\u{027E}" | "\u{0279}" | "\u{026C}"
        | "\u{026E}" => Some(Place::Alveolar),
        "k" | "g" | "\u{014B}" | "x" | "\u{0263}" => Some(Place::Velar),
        _ => None,
    }
}

struct VowelHit {
    index: usize,
    /// 0 = immediately adjacent, ignoring transparent tokens.
    consonants_away: usize,
}

fn hit_weight(hit: &Option<VowelHit>) -> f64 {
    match hit {
        Some(h) => 1.0 / (h.consonants_away as f64 + 1.0),
        None => 0.0,
    }
}

/// Inserted aspiration mirrors its neighbor's formants, so it is invisible
/// to the vowel search.
fn is_transparent(t: &Token) -> bool {
    t.post_stop_aspiration || t.def.as_ref().is_some_and(|d| d.copy_adjacent)
}

fn find_vowel_left(tokens: &[Token], i: usize, cross_word: bool, max_cons: usize) -> Option<VowelHit> {
    let mut cons = 0usize;
    for j in (0..i).rev() {
        let prev = &tokens[j];
        // Silence breaks coarticulation context.
        if prev.is_silence_or_missing() {
            return None;
        }
        if prev.is_vowel_like() {
            return Some(VowelHit {
                index: j,
                consonants_away: cons,
            });
        }
        if !is_transparent(prev) {
            cons += 1;
            if cons > max_cons {
                return None;
            }
        }
        if !cross_word && prev.word_start {
            return None;
        }
    }
    None
}

fn find_vowel_right(tokens: &[Token], i: usize, cross_word: bool, max_cons: usize) -> Option<VowelHit> {
    let mut cons = 0usize;
    for (j, next) in tokens.iter().enumerate().skip(i + 1) {
        if next.is_silence_or_missing() {
            return None;
        }
        if !cross_word && next.word_start {
            return None;
        }
        if next.is_vowel_like() {
            return Some(VowelHit {
                index: j,
                consonants_away: cons,
            });
        }
        if !is_transparent(next) {
            cons += 1;
            if cons > max_cons {
                return None;
            }
        }
    }
    None
}

/// Interpolates the token's formant toward `locus` by `strength`.
fn apply_locus_shift(
    tokens: &mut [Token],
    i: usize,
    field: FieldId,
    locus: f64,
    strength: f64,
    adjacent_vowel: Option<usize>,
) {
    let mut current = tokens[i].field(field);
    if current <= 0.0 {
        // Stops often carry only burst formants; seed the transition from
        // the adjacent vowel, or from the locus itself.
        if let Some(v) = adjacent_vowel {
            current = tokens[v].field(field);
        }
        if current <= 0.0 {
            current = locus;
        }
    }
    let shifted = current + (locus - current) * strength;
    tokens[i].set_field(field, shifted);
}

/// Velar pinch: before a front vowel, F2 and F3 converge toward the vowel.
/// This is what makes /ki/ sound different from /ku/. Returns false when the
/// vowel is a back vowel; the caller falls back to plain locus shaping.
fn apply_velar_pinch(
    ctx: &PassContext,
    tokens: &mut [Token],
    i: usize,
    vowel: usize,
    strength: f64,
) -> bool {
    let lang = &ctx.pack.lang;
    let strength = strength.clamp(0.0, 1.0);
    if strength <= 0.0 {
        return true;
    }

    let mut vowel_f2 = tokens[vowel].field(FieldId::Cf2);
    if vowel_f2 <= 0.0 {
        vowel_f2 = tokens[vowel].field(FieldId::Pf2);
    }
    if vowel_f2 < lang.coarticulation_velar_pinch_threshold {
        return false;
    }

    let pinch_f2 = vowel_f2 * lang.coarticulation_velar_pinch_f2_scale;
    let pinch_f3 = lang.coarticulation_velar_pinch_f3;

    let mut blend = |field: FieldId, target: f64| {
        let mut cur = tokens[i].field(field);
        if cur <= 0.0 {
            cur = target;
        }
        tokens[i].set_field(field, cur + (target - cur) * strength);
    };

    blend(FieldId::Cf2, pinch_f2);
    blend(FieldId::Pf2, pinch_f2);
    if pinch_f3 > 0.0 {
        blend(FieldId::Cf3, pinch_f3);
        blend(FieldId::Pf3, pinch_f3);
    }
    true
}

/// Fills unset formant fields of copy-adjacent tokens (h, inserted
/// aspiration) from the following real token, or the preceding one at the
/// end of an utterance.
fn fill_copy_adjacent(tokens: &mut [Token]) {
    for i in 0..tokens.len() {
        if !tokens[i].def.as_ref().is_some_and(|d| d.copy_adjacent) {
            continue;
        }
        let next = (i + 1 < tokens.len() && !tokens[i + 1].is_silence_or_missing())
            .then_some(i + 1);
        let adjacent = next.or_else(|| {
            (i > 0 && !tokens[i - 1].is_silence_or_missing()).then_some(i - 1)
        });
        let Some(a) = adjacent else { continue };
        for field in FieldId::all() {
            if !tokens[i].has_field(field) && tokens[a].has_field(field) {
                let v = tokens[a].field(field);
                tokens[i].set_field(field, v);
            }
        }
    }
}

pub fn run(ctx: &PassContext, tokens: &mut Vec<Token>) -> Result<(), String> {
    fill_copy_adjacent(tokens);

    let lang = &ctx.pack.lang;
    if !lang.coarticulation_enabled {
        return Ok(());
    }
    let strength = lang.coarticulation_strength.clamp(0.0, 1.0);
    if strength <= 0.0 {
        return Ok(());
    }
    let extent = lang.coarticulation_transition_extent.clamp(0.0, 1.0);
    let max_cons = (lang.coarticulation_adjacency_max_consonants.round() as i64).clamp(0, 6) as usize;
    let cross_word = lang.coarticulation_cross_word_enabled;

    for i in 0..tokens.len() {
        if tokens[i].is_silence_or_missing() || !tokens[i].is_consonant() {
            continue;
        }
        let key = tokens[i].def.as_ref().map(|d| d.key.clone()).unwrap_or_default();
        let Some(place) = place_of_articulation(&key) else {
            continue;
        };
        let locus_f2 = match place {
            Place::Labial => lang.coarticulation_labial_f2_locus,
            Place::Alveolar => lang.coarticulation_alveolar_f2_locus,
            Place::Velar => lang.coarticulation_velar_f2_locus,
        };

        let left = find_vowel_left(tokens, i, cross_word, max_cons);
        let right = find_vowel_right(tokens, i, cross_word, max_cons);

        let mut w = 1.0;
        if lang.coarticulation_graduated {
            w = hit_weight(&left).max(hit_weight(&right));
            if w <= 0.0 {
                // No vowel context nearby; leave the consonant alone.
                continue;
            }
        }
        let eff_strength = strength * w.clamp(0.0, 1.0);

        // Nearest vowel, biased to the right (anticipatory) on ties.
        let adjacent_vowel = match (&left, &right) {
            (Some(l), Some(r)) => {
                if r.consonants_away <= l.consonants_away {
                    Some(r.index)
                } else {
                    Some(l.index)
                }
            }
            (None, Some(r)) => Some(r.index),
            (Some(l), None) => Some(l.index),
            (None, None) => None,
        };

        let pinch_vowel = right
            .as_ref()
            .filter(|r| r.consonants_away == 0)
            .map(|r| r.index);
        let pinched = match pinch_vowel {
            Some(v) if place == Place::Velar && lang.coarticulation_velar_pinch_enabled => {
                apply_velar_pinch(ctx, tokens, i, v, eff_strength)
            }
            _ => false,
        };
        if !pinched {
            apply_locus_shift(tokens, i, FieldId::Cf2, locus_f2, eff_strength, adjacent_vowel);
            apply_locus_shift(tokens, i, FieldId::Pf2, locus_f2, eff_strength, adjacent_vowel);
        }

        // Longer fade into the consonant for a smoother transition; keep
        // word-initial consonants crisper.
        if lang.coarticulation_fade_into_consonants && extent > 0.0 && tokens[i].duration_ms > 0.0 {
            let mut min_fade = tokens[i].duration_ms * extent;
            if lang.coarticulation_graduated {
                min_fade *= w.clamp(0.0, 1.0);
            }
            if tokens[i].word_start {
                min_fade *= lang.coarticulation_word_initial_fade_scale;
            }
            if tokens[i].fade_ms < min_fade {
                tokens[i].fade_ms = min_fade;
            }
            tokens[i].clamp_fade_to_duration();
        }
    }

    Ok(())
}
