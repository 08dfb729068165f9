//! Intonation pass: clause contours, stress boosts and tone overlays.
//!
//! The clause contour splits the utterance into pre-head (before the first
//! primary stress), head (stepped pitch peaks on stressed syllables),
//! nucleus (the last stressed syllable) and tail. Each region gets a linear
//! pitch path distributed over its voiced duration; tokens carry the result
//! as `voicePitch`/`endVoicePitch` overrides. Utterances with no primary
//! stress treat their final syllable as the nucleus so that clause type
//! still shapes the ending.

use std::ops::Range;

use crate::fields::FieldId;
use crate::front::passes::PassContext;
use crate::front::token::{Stress, Token};
use crate::pack::lang::IntonationContour;

/// Maps a contour percentage onto a pitch in Hz around the base pitch.
fn pitch_from_percent(base_pitch: f64, inflection: f64, percent: f64) -> f64 {
    base_pitch * 2f64.powf(((percent - 50.0) / 50.0) * inflection)
}

/// Applies a linear pitch path over `range`, distributing progress across
/// the voiced duration of the covered tokens.
fn apply_pitch_path(
    tokens: &mut [Token],
    range: Range<usize>,
    base_pitch: f64,
    inflection: f64,
    start_percent: f64,
    end_percent: f64,
) {
    let start_pitch = pitch_from_percent(base_pitch, inflection, start_percent);
    let end_pitch = pitch_from_percent(base_pitch, inflection, end_percent);
    let voiced_duration: f64 = tokens[range.clone()]
        .iter()
        .filter(|t| t.is_voiced())
        .map(|t| t.duration_ms)
        .sum();
    let pitch_delta = end_pitch - start_pitch;

    let mut cur_duration = 0.0;
    let mut cur_pitch = start_pitch;
    for t in &mut tokens[range] {
        t.set_field(FieldId::VoicePitch, cur_pitch);
        if t.is_voiced() && voiced_duration > 0.0 {
            cur_duration += t.duration_ms;
            cur_pitch = start_pitch + pitch_delta * (cur_duration / voiced_duration);
        }
        t.set_field(FieldId::EndVoicePitch, cur_pitch);
    }
}

pub fn run(ctx: &PassContext, tokens: &mut Vec<Token>) -> Result<(), String> {
    if tokens.is_empty() {
        return Ok(());
    }
    let lang = &ctx.pack.lang;
    let contour = lang.contour(ctx.clause_type);
    let base = ctx.base_pitch;
    let infl = ctx.inflection;
    let len = tokens.len();

    // Pre-head runs up to the first primary-stressed syllable.
    let mut pre_head_end = tokens
        .iter()
        .position(|t| t.syllable_start && t.stress == Stress::Primary)
        .unwrap_or(len);

    // Nucleus is the last primary-stressed syllable; unstressed syllable
    // starts after it begin the tail.
    let mut nucleus_start = len;
    let mut nucleus_end = len;
    let mut tail_start = len;
    let tail_end = len;

    if pre_head_end < len {
        for idx in (pre_head_end..len).rev() {
            if tokens[idx].syllable_start {
                if tokens[idx].stress == Stress::Primary {
                    nucleus_start = idx;
                    break;
                }
                nucleus_end = idx;
                tail_start = idx;
            }
        }
    } else if let Some(last_syllable) = tokens.iter().rposition(|t| t.syllable_start) {
        // No stress anywhere: the final syllable carries the clause melody.
        nucleus_start = last_syllable;
        nucleus_end = len;
        pre_head_end = nucleus_start;
    }

    if pre_head_end > 0 {
        apply_pitch_path(
            tokens,
            0..pre_head_end,
            base,
            infl,
            contour.pre_head_start,
            contour.pre_head_end,
        );
    }

    let has_tail = tail_end > tail_start;
    if has_tail {
        apply_pitch_path(
            tokens,
            tail_start..tail_end,
            base,
            infl,
            contour.tail_start,
            contour.tail_end,
        );
    }

    if nucleus_end > nucleus_start {
        let (start_pct, end_pct) = if has_tail {
            (contour.nucleus_start, contour.nucleus_end)
        } else {
            (contour.nucleus0_start, contour.nucleus0_end)
        };
        apply_pitch_path(tokens, nucleus_start..nucleus_end, base, infl, start_pct, end_pct);
    }

    if pre_head_end < nucleus_start && nucleus_start < len {
        run_head(
            &contour,
            tokens,
            pre_head_end..nucleus_start + 1,
            base,
            infl,
        );
    }

    apply_stress_boost(lang.stress_amplitude_boost, tokens);

    if lang.tonal {
        for t in tokens.iter_mut() {
            if let Some([start, end]) = t.tone {
                t.set_field(FieldId::VoicePitch, pitch_from_percent(base, infl, start));
                t.set_field(FieldId::EndVoicePitch, pitch_from_percent(base, infl, end));
            }
        }
    }

    Ok(())
}

/// The head: each stressed syllable gets a pitch peak stepping down the
/// contour's `head_steps` ladder (cycling its tail when the utterance is
/// long), with unstressed runs bridged slightly below the preceding peak.
fn run_head(
    contour: &IntonationContour,
    tokens: &mut [Token],
    range: Range<usize>,
    base: f64,
    infl: f64,
) {
    let head_start_pitch = contour.head_start;
    let head_end_pitch = contour.head_end;
    let steps = if contour.head_steps.is_empty() {
        vec![50.0]
    } else {
        contour.head_steps.clone()
    };
    let extend_from = contour.head_extend_from.min(steps.len() - 1);
    let mut step_index = 0usize;
    let mut next_step = move || {
        let v = steps[step_index];
        step_index += 1;
        if step_index >= steps.len() {
            step_index = extend_from;
        }
        v
    };

    let mut last_stress_start: Option<usize> = None;
    let mut last_unstressed_run_start: Option<usize> = None;
    let mut stress_end_pitch = head_end_pitch;

    for index in range {
        if index >= tokens.len() {
            break;
        }
        let is_syllable_start = tokens[index].syllable_start;
        let is_stressed = tokens[index].stress == Stress::Primary;
        if !is_syllable_start {
            continue;
        }

        if let Some(start) = last_stress_start.take() {
            let step_pct = next_step();
            let stress_start =
                head_end_pitch + ((head_start_pitch - head_end_pitch) / 100.0) * step_pct;
            stress_end_pitch = stress_start + contour.head_stress_end_delta;
            apply_pitch_path(tokens, start..index, base, infl, stress_start, stress_end_pitch);
        }

        if is_stressed {
            if let Some(start) = last_unstressed_run_start.take() {
                apply_pitch_path(
                    tokens,
                    start..index,
                    base,
                    infl,
                    stress_end_pitch + contour.head_unstressed_run_start_delta,
                    stress_end_pitch + contour.head_unstressed_run_end_delta,
                );
            }
            last_stress_start = Some(index);
        } else if last_unstressed_run_start.is_none() {
            last_unstressed_run_start = Some(index);
        }
    }
}

/// Primary-stressed syllables speak slightly louder.
fn apply_stress_boost(boost: f64, tokens: &mut [Token]) {
    if boost <= 1.0 {
        return;
    }
    let mut in_stressed_syllable = false;
    for t in tokens.iter_mut() {
        if t.syllable_start {
            in_stressed_syllable = t.stress == Stress::Primary;
        }
        if in_stressed_syllable && !t.silence {
            let amp = t.field(FieldId::VoiceAmplitude);
            if amp > 0.0 {
                t.set_field(FieldId::VoiceAmplitude, amp * boost);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front::passes::timing;
    use crate::front::passes::timing::tests::test_pack;
    use crate::front::tokenizer::tokenize;
    use crate::pack::PackSet;

    fn ctx<'a>(pack: &'a PackSet, clause_type: char) -> PassContext<'a> {
        PassContext {
            pack,
            speed: 1.0,
            base_pitch: 100.0,
            inflection: 0.5,
            clause_type,
        }
    }

    const CONTOURS: &str = concat!(
        "intonation:\n",
        "  \".\":\n",
        "    preHeadStart: 46\n    preHeadEnd: 57\n    headExtendFrom: 4\n",
        "    headStart: 80\n    headEnd: 50\n",
        "    headSteps: [100, 75, 50, 25, 0, 63, 38, 13, 0]\n",
        "    headStressEndDelta: -16\n",
        "    headUnstressedRunStartDelta: -8\n    headUnstressedRunEndDelta: -5\n",
        "    nucleus0Start: 64\n    nucleus0End: 8\n",
        "    nucleusStart: 70\n    nucleusEnd: 18\n",
        "    tailStart: 24\n    tailEnd: 8\n",
        "  \"?\":\n",
        "    preHeadStart: 45\n    preHeadEnd: 56\n    headExtendFrom: 3\n",
        "    headStart: 75\n    headEnd: 43\n",
        "    headSteps: [100, 75, 50, 20, 60, 35, 11, 0]\n",
        "    headStressEndDelta: -16\n",
        "    headUnstressedRunStartDelta: -7\n    headUnstressedRunEndDelta: 0\n",
        "    nucleus0Start: 34\n    nucleus0End: 68\n",
        "    nucleusStart: 86\n    nucleusEnd: 21\n",
        "    tailStart: 34\n    tailEnd: 68\n",
    );

    fn lang_yaml(extra: &str) -> String {
        format!(
            "settings:\n  postStopAspirationEnabled: false\n  stopClosureMode: never\n{extra}\n{CONTOURS}"
        )
    }

    fn pitched(pack: &PackSet, ipa: &str, clause: char) -> Vec<Token> {
        let mut tokens = tokenize(pack, ipa).tokens;
        timing::run(&ctx(pack, clause), &mut tokens).unwrap();
        run(&ctx(pack, clause), &mut tokens).unwrap();
        tokens
    }

    #[test]
    fn every_vowel_gets_a_pitch() {
        let pack = test_pack(&lang_yaml(""));
        let tokens = pitched(&pack, "\u{02C8}na na", '.');
        for t in tokens.iter().filter(|t| t.is_vowel()) {
            assert!(t.fields.has(FieldId::VoicePitch));
            assert!(t.field(FieldId::VoicePitch) > 0.0);
        }
    }

    #[test]
    fn question_raises_the_final_pitch() {
        let pack = test_pack(&lang_yaml(""));
        let falling = pitched(&pack, "ha", '.');
        let rising = pitched(&pack, "ha", '?');
        let f = falling.last().unwrap().field(FieldId::EndVoicePitch);
        let r = rising.last().unwrap().field(FieldId::EndVoicePitch);
        assert!(r > f, "expected ? ({r}) > . ({f})");
    }

    #[test]
    fn statement_pitch_falls_over_the_nucleus() {
        let pack = test_pack(&lang_yaml(""));
        let tokens = pitched(&pack, "\u{02C8}na", '.');
        let vowel = tokens.iter().find(|t| t.is_vowel()).unwrap();
        assert!(vowel.field(FieldId::EndVoicePitch) < vowel.field(FieldId::VoicePitch));
    }

    #[test]
    fn stressed_syllable_gets_amplitude_boost() {
        let pack = test_pack(&lang_yaml("  stressAmplitudeBoost: 1.2"));
        let tokens = pitched(&pack, "\u{02C8}na na", '.');
        let stressed_vowel = tokens.iter().find(|t| t.is_vowel()).unwrap();
        let plain_vowel = tokens.iter().filter(|t| t.is_vowel()).next_back().unwrap();
        assert!(
            stressed_vowel.field(FieldId::VoiceAmplitude)
                > plain_vowel.field(FieldId::VoiceAmplitude)
        );
    }

    #[test]
    fn tone_overlay_overrides_clause_pitch() {
        let pack = test_pack(&format!(
            "settings:\n  tonal: true\n  postStopAspirationEnabled: false\n  stopClosureMode: never\ntones:\n  \"\u{02E5}\": [90, 90]\n  \"\u{02E9}\": [10, 10]\n{CONTOURS}"
        ));
        let tokens = pitched(&pack, "na\u{02E5}\u{02E9}", '.');
        let vowel = tokens.iter().find(|t| t.is_vowel()).unwrap();
        // Falling tone: start well above base, end well below.
        assert!(vowel.field(FieldId::VoicePitch) > 100.0);
        assert!(vowel.field(FieldId::EndVoicePitch) < 100.0);
    }

    #[test]
    fn pitch_percent_mapping_is_exponential_around_base() {
        let mid = pitch_from_percent(100.0, 0.5, 50.0);
        assert!((mid - 100.0).abs() < 1e-12);
        let top = pitch_from_percent(100.0, 0.5, 100.0);
        let bottom = pitch_from_percent(100.0, 0.5, 0.0);
        assert!((top - 100.0 * 2f64.powf(0.5)).abs() < 1e-9);
        assert!((bottom - 100.0 * 2f64.powf(-0.5)).abs() < 1e-9);
    }
}
