//! Boundary smoothing pass: category-specific minimum fades at segment
//! transitions.
//!
//! The fade belongs to the incoming token, so each token's fade is raised
//! based on the nearest preceding real phoneme. Inserted micro-gaps and
//! short silences are looked through; a real pause resets adjacency.

use crate::front::passes::PassContext;
use crate::front::token::Token;

fn find_prev_real(tokens: &[Token], idx_before: usize, max_skip_silence_ms: f64) -> Option<usize> {
    for j in (0..=idx_before).rev() {
        let t = &tokens[j];
        if !t.is_silence_or_missing() {
            return Some(j);
        }
        if t.silence && !t.is_micro_gap() && t.duration_ms > max_skip_silence_ms {
            return None;
        }
    }
    None
}

pub fn run(ctx: &PassContext, tokens: &mut Vec<Token>) -> Result<(), String> {
    let lang = &ctx.pack.lang;
    if !lang.boundary_smoothing_enabled || tokens.len() < 2 {
        return Ok(());
    }

    // Fade minimums are specified at speed 1.0, like the other timing knobs.
    let sp = ctx.speed();
    let v2s = lang.boundary_smoothing_vowel_to_stop_fade_ms.max(0.0) / sp;
    let s2v = lang.boundary_smoothing_stop_to_vowel_fade_ms.max(0.0) / sp;
    let v2f = lang.boundary_smoothing_vowel_to_fric_fade_ms.max(0.0) / sp;
    let max_skip = lang.boundary_smoothing_max_skip_silence_ms;

    for i in 1..tokens.len() {
        if tokens[i].is_silence_or_missing() {
            continue;
        }
        let Some(prev_idx) = find_prev_real(tokens, i - 1, max_skip) else {
            continue;
        };

        let (prev_vowel, prev_stop) = {
            let prev = &tokens[prev_idx];
            (prev.is_vowel_like(), prev.is_stop_like())
        };
        let cur = &mut tokens[i];

        let min_fade = if prev_vowel && cur.is_stop_like() {
            v2s
        } else if prev_stop && cur.is_vowel_like() {
            s2v
        } else if prev_vowel && cur.is_fricative_like() {
            v2f
        } else {
            continue;
        };

        if min_fade > 0.0 && cur.fade_ms < min_fade {
            cur.fade_ms = min_fade;
        }
        cur.clamp_fade_to_duration();
    }

    Ok(())
}
