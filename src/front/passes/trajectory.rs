//! Trajectory limiting pass: caps how fast the low formants may move
//! between consecutive tokens by lengthening the incoming crossfade.

use crate::fields::FieldId;
use crate::front::passes::PassContext;
use crate::front::token::Token;

/// Formants subject to the slope limit.
const LIMITED_FORMANTS: [FieldId; 3] = [FieldId::Cf1, FieldId::Cf2, FieldId::Cf3];

pub fn run(ctx: &PassContext, tokens: &mut Vec<Token>) -> Result<(), String> {
    let lang = &ctx.pack.lang;
    if !lang.trajectory_limit_enabled {
        return Ok(());
    }
    let max_slope = lang.trajectory_limit_max_slope_hz_per_ms;
    if max_slope <= 0.0 {
        return Err("trajectoryLimitMaxSlopeHzPerMs must be positive".to_owned());
    }

    let mut prev_real: Option<usize> = None;
    for i in 0..tokens.len() {
        if tokens[i].is_silence_or_missing() {
            // A pause absorbs any transition; no slope to limit across it.
            prev_real = None;
            continue;
        }
        if let Some(p) = prev_real {
            let mut needed_fade: f64 = 0.0;
            for field in LIMITED_FORMANTS {
                if !tokens[p].has_field(field) || !tokens[i].has_field(field) {
                    continue;
                }
                let delta = (tokens[i].field(field) - tokens[p].field(field)).abs();
                needed_fade = needed_fade.max(delta / max_slope);
            }
            let cur = &mut tokens[i];
            if needed_fade > cur.fade_ms {
                cur.fade_ms = needed_fade;
            }
            cur.clamp_fade_to_duration();
        }
        prev_real = Some(i);
    }

    Ok(())
}
