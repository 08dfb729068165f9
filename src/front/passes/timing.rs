//! Timing pass: base durations, inserted gaps, stress and length scaling.

use crate::front::passes::coarticulation::place_of_articulation;
use crate::front::passes::PassContext;
use crate::front::token::{Stress, Token};
use crate::pack::lang::StopClosureMode;

// Diphthong components relative to the vowel base duration.
const TIED_TO_VOWEL_SCALE: f64 = 0.8;
const TIED_FROM_VOWEL_SCALE: f64 = 0.45;
// Unstressed vowels before a liquid/nasal coda in the same word.
const UNSTRESSED_CODA_VOWEL_SCALE: f64 = 0.85;
// Voiced consonants without a more specific class run short.
const VOICED_CONSONANT_SCALE: f64 = 0.5;
// Fade used for abrupt onsets (stops, taps, trills).
const CRISP_FADE_MS: f64 = 0.001;

pub fn run(ctx: &PassContext, tokens: &mut Vec<Token>) -> Result<(), String> {
    insert_gaps(ctx, tokens);
    assign_durations(ctx, tokens);
    Ok(())
}

/// Inserts pre-stop closure gaps, cluster gaps and vowel hiatus gaps.
fn insert_gaps(ctx: &PassContext, tokens: &mut Vec<Token>) {
    let lang = &ctx.pack.lang;
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len() + 4);

    for token in tokens.drain(..) {
        let prev_real = out.iter().rev().find(|t| !t.is_silence_or_missing());
        let prev_is_silence = out.last().is_some_and(|t| t.silence);

        if token.is_stop_like() && !token.post_stop_aspiration && !prev_is_silence {
            let wanted = match lang.stop_closure_mode {
                StopClosureMode::Always => prev_real.is_some(),
                StopClosureMode::AfterVowel => prev_real.is_some_and(Token::is_vowel_like),
                StopClosureMode::Never => false,
            };
            if wanted {
                let mut gap = Token::silence();
                gap.pre_stop_gap = true;
                out.push(gap);
            }
        } else if let Some(prev) = prev_real {
            if !prev_is_silence {
                // Two obstruents at the same place of articulation get a
                // short release gap so they don't smear together.
                let same_place_cluster = is_obstruent(prev)
                    && is_obstruent(&token)
                    && place_matches(prev, &token);
                if same_place_cluster {
                    let mut gap = Token::silence();
                    gap.cluster_gap = true;
                    out.push(gap);
                } else if prev.is_vowel() && token.is_vowel() && token.word_start {
                    // Vowel hiatus across a word boundary.
                    let mut gap = Token::silence();
                    gap.vowel_hiatus_gap = true;
                    out.push(gap);
                }
            }
        }

        out.push(token);
    }

    *tokens = out;
}

fn is_obstruent(t: &Token) -> bool {
    t.is_stop_like() || t.is_fricative_like()
}

fn place_matches(a: &Token, b: &Token) -> bool {
    let pa = a.def.as_ref().and_then(|d| place_of_articulation(&d.key));
    let pb = b.def.as_ref().and_then(|d| place_of_articulation(&d.key));
    matches!((pa, pb), (Some(x), Some(y)) if x == y)
}

fn assign_durations(ctx: &PassContext, tokens: &mut [Token]) {
    let lang = &ctx.pack.lang;
    let speed = ctx.speed();
    let mut syllable_stress = Stress::None;
    let len = tokens.len();

    for i in 0..len {
        if tokens[i].syllable_start {
            syllable_stress = tokens[i].stress;
        }

        let prev = if i > 0 { Some(tokens[i - 1].clone()) } else { None };
        let next = tokens.get(i + 1).cloned();
        let t = &mut tokens[i];

        let mut duration;
        let mut fade = lang.default_fade_ms;

        if t.silence {
            duration = if t.pre_stop_gap {
                lang.pre_stop_gap_ms
            } else if t.cluster_gap {
                lang.cluster_gap_ms
            } else if t.vowel_hiatus_gap {
                lang.vowel_hiatus_gap_ms
            } else {
                lang.default_duration_ms
            };
            fade = CRISP_FADE_MS;
        } else if t.post_stop_aspiration {
            duration = lang.post_stop_aspiration_ms;
        } else if t.def.as_ref().is_some_and(|d| d.flags.is_trill) {
            duration = lang.trill_duration_ms;
            fade = CRISP_FADE_MS;
        } else if t.def.as_ref().is_some_and(|d| d.flags.is_tap) {
            duration = lang.tap_duration_ms;
            fade = CRISP_FADE_MS;
        } else if t.def.as_ref().is_some_and(|d| d.flags.is_stop) {
            duration = lang.stop_duration_ms;
            fade = CRISP_FADE_MS;
        } else if t.def.as_ref().is_some_and(|d| d.flags.is_affricate) {
            duration = lang.affricate_duration_ms;
            fade = CRISP_FADE_MS;
        } else if t.is_vowel() {
            duration = lang.vowel_duration_ms;
            if t.tied_to {
                duration *= TIED_TO_VOWEL_SCALE;
            } else if t.tied_from {
                duration *= TIED_FROM_VOWEL_SCALE;
            } else if syllable_stress == Stress::None
                && !t.syllable_start
                && next.as_ref().is_some_and(|n| {
                    !n.word_start
                        && n.def
                            .as_ref()
                            .is_some_and(|d| d.flags.is_liquid || d.flags.is_nasal)
                })
            {
                // Unstressed vowels running into a liquid or nasal coda are
                // clipped short.
                duration *= UNSTRESSED_CODA_VOWEL_SCALE;
            }
            if prev.as_ref().is_some_and(|p| {
                p.def
                    .as_ref()
                    .is_some_and(|d| d.flags.is_liquid || d.flags.is_semivowel)
            }) {
                fade = lang.liquid_into_vowel_fade_ms;
            }
        } else if t.def.as_ref().is_some_and(|d| d.flags.is_nasal) {
            duration = lang.nasal_duration_ms;
        } else if t.def.as_ref().is_some_and(|d| d.flags.is_liquid) {
            duration = lang.liquid_duration_ms;
            fade = lang.default_fade_ms * 1.2;
        } else if t.def.as_ref().is_some_and(|d| d.flags.is_semivowel) {
            duration = lang.semivowel_duration_ms;
            fade = lang.default_fade_ms * 1.2;
        } else if !t.is_voiced() {
            duration = lang.unvoiced_duration_ms;
        } else {
            duration = lang.default_duration_ms * VOICED_CONSONANT_SCALE;
        }

        // Stress stretches the whole syllable; the length mark stretches the
        // marked token; speed compresses everything.
        if !t.silence {
            match syllable_stress {
                Stress::Primary => duration *= lang.primary_stress_duration_scale,
                Stress::Secondary => duration *= lang.secondary_stress_duration_scale,
                Stress::None => {}
            }
        }
        if t.lengthened {
            duration *= lang.length_mark_multiplier;
        }

        duration /= speed;
        fade /= speed;

        if t.is_vowel() && duration < lang.min_vowel_duration_ms {
            duration = lang.min_vowel_duration_ms;
        }

        t.duration_ms = duration;
        t.fade_ms = fade;
        t.clamp_fade_to_duration();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::front::tokenizer::tokenize;
    use crate::pack::PackSet;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    static SCRATCH_COUNTER: AtomicU32 = AtomicU32::new(0);

    pub(crate) fn test_pack(lang_yaml: &str) -> Arc<PackSet> {
        let n = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir: PathBuf = std::env::temp_dir().join(format!(
            "klatt-tts-timing-test-{}-{n}",
            std::process::id()
        ));
        std::fs::create_dir_all(dir.join("lang")).unwrap();
        std::fs::write(
            dir.join("phonemes.yaml"),
            concat!(
                "phonemes:\n",
                "  a:\n    _isVowel: true\n    _isVoiced: true\n    cf1: 700\n    cf2: 1200\n    cb1: 90\n    cb2: 100\n    voiceAmplitude: 1\n",
                "  i:\n    _isVowel: true\n    _isVoiced: true\n    cf1: 300\n    cf2: 2200\n    cb1: 60\n    cb2: 100\n    voiceAmplitude: 1\n",
                "  k:\n    _isStop: true\n    pf2: 1800\n    pa2: 0.6\n    fricationAmplitude: 0.6\n",
                "  t:\n    _isStop: true\n    pf2: 1700\n    pa2: 0.5\n    fricationAmplitude: 0.6\n",
                "  s:\n    fricationAmplitude: 0.8\n    pf5: 5000\n    pa5: 0.7\n",
                "  h:\n    _isVoiced: false\n    _copyAdjacent: true\n    voiceAmplitude: 0\n    aspirationAmplitude: 1\n",
                "  n:\n    _isNasal: true\n    _isVoiced: true\n    cf1: 300\n    voiceAmplitude: 1\n",
            ),
        )
        .unwrap();
        std::fs::write(dir.join("lang").join("default.yaml"), lang_yaml).unwrap();
        PackSet::load(&dir, "default").unwrap()
    }

    fn ctx(pack: &PackSet) -> PassContext {
        PassContext {
            pack,
            speed: 1.0,
            base_pitch: 100.0,
            inflection: 0.5,
            clause_type: '.',
        }
    }

    #[test]
    fn vowel_gets_base_duration() {
        let pack = test_pack("settings:\n  vowelDurationMs: 130\n  postStopAspirationEnabled: false\n");
        let mut tokens = tokenize(&pack, "a").tokens;
        run(&ctx(&pack), &mut tokens).unwrap();
        assert_eq!(tokens.len(), 1);
        assert!((tokens[0].duration_ms - 130.0).abs() < 1e-9);
        assert!(tokens[0].fade_ms <= tokens[0].duration_ms);
    }

    #[test]
    fn speed_divides_durations() {
        let pack = test_pack("settings:\n  vowelDurationMs: 130\n  minVowelDurationMs: 1\n  postStopAspirationEnabled: false\n");
        let mut tokens = tokenize(&pack, "a").tokens;
        let c = PassContext { speed: 2.0, ..ctx(&pack) };
        run(&c, &mut tokens).unwrap();
        assert!((tokens[0].duration_ms - 65.0).abs() < 1e-9);
    }

    #[test]
    fn length_mark_multiplies() {
        let pack = test_pack("settings:\n  vowelDurationMs: 130\n  lengthMarkMultiplier: 1.8\n  postStopAspirationEnabled: false\n");
        let mut tokens = tokenize(&pack, "a\u{02D0}").tokens;
        run(&ctx(&pack), &mut tokens).unwrap();
        assert_eq!(tokens.len(), 1);
        assert!((tokens[0].duration_ms - 234.0).abs() < 1e-9);
    }

    #[test]
    fn pre_stop_gap_inserted_before_stop() {
        let pack = test_pack("settings:\n  preStopGapMs: 41\n  postStopAspirationEnabled: false\n");
        let mut tokens = tokenize(&pack, "ata").tokens;
        run(&ctx(&pack), &mut tokens).unwrap();
        // a, gap, t, a
        assert_eq!(tokens.len(), 4);
        assert!(tokens[1].silence && tokens[1].pre_stop_gap);
        assert!((tokens[1].duration_ms - 41.0).abs() < 1e-9);
    }

    #[test]
    fn no_gap_when_mode_never() {
        let pack = test_pack("settings:\n  stopClosureMode: never\n  postStopAspirationEnabled: false\n");
        let mut tokens = tokenize(&pack, "ata").tokens;
        run(&ctx(&pack), &mut tokens).unwrap();
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn word_initial_stop_has_no_gap() {
        let pack = test_pack("settings:\n  postStopAspirationEnabled: false\n");
        let mut tokens = tokenize(&pack, "ta").tokens;
        run(&ctx(&pack), &mut tokens).unwrap();
        // No preceding phoneme: nothing to close from.
        assert_eq!(tokens.len(), 2);
        assert!(!tokens[0].silence);
    }

    #[test]
    fn cluster_gap_between_same_place_obstruents() {
        let pack = test_pack("settings:\n  stopClosureMode: never\n  clusterGapMs: 25\n  postStopAspirationEnabled: false\n");
        // t and s are both alveolar obstruents.
        let mut tokens = tokenize(&pack, "tsa").tokens;
        run(&ctx(&pack), &mut tokens).unwrap();
        assert_eq!(tokens.len(), 4);
        assert!(tokens[1].cluster_gap);
    }

    #[test]
    fn vowel_hiatus_gap_across_word_boundary() {
        let pack = test_pack("settings:\n  vowelHiatusGapMs: 30\n  postStopAspirationEnabled: false\n");
        let mut tokens = tokenize(&pack, "a a").tokens;
        run(&ctx(&pack), &mut tokens).unwrap();
        assert_eq!(tokens.len(), 3);
        assert!(tokens[1].vowel_hiatus_gap);
        assert!((tokens[1].duration_ms - 30.0).abs() < 1e-9);
    }

    #[test]
    fn stress_scales_syllable_duration() {
        let pack = test_pack("settings:\n  vowelDurationMs: 100\n  primaryStressDurationScale: 1.25\n  postStopAspirationEnabled: false\n");
        let mut stressed = tokenize(&pack, "\u{02C8}a").tokens;
        run(&ctx(&pack), &mut stressed).unwrap();
        let mut plain = tokenize(&pack, "a").tokens;
        run(&ctx(&pack), &mut plain).unwrap();
        assert!(stressed[0].duration_ms > plain[0].duration_ms);
        assert!((stressed[0].duration_ms - 125.0).abs() < 1e-9);
    }

    #[test]
    fn min_vowel_duration_floor() {
        let pack = test_pack("settings:\n  vowelDurationMs: 100\n  minVowelDurationMs: 18\n  postStopAspirationEnabled: false\n");
        let mut tokens = tokenize(&pack, "a").tokens;
        let c = PassContext { speed: 20.0, ..ctx(&pack) };
        run(&c, &mut tokens).unwrap();
        assert!((tokens[0].duration_ms - 18.0).abs() < 1e-9);
    }
}
