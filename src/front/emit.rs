//! Frame emission: tokens out of the pipeline become queued frames.

use crate::fields::{FieldId, Frame};
use crate::front::token::Token;

/// Gains applied when neither the token nor its phoneme supplies them.
const DEFAULT_PRE_FORMANT_GAIN: f64 = 1.0;
const DEFAULT_OUTPUT_GAIN: f64 = 2.0;

/// Receives one emitted frame: `(frame, min_duration_ms, fade_ms, user_index)`.
/// A `None` frame denotes silence.
pub type FrameSink<'a> = dyn FnMut(Option<&Frame>, f64, f64, i32) + 'a;

/// Builds the final frame for a token: overrides win over the phoneme def,
/// and the output gains get their defaults when absent.
pub fn frame_for_token(token: &Token) -> Option<Frame> {
    let def = token.def.as_ref()?;
    let mut frame = token.fields.overlaid_on(&def.fields);
    if !frame.has(FieldId::PreFormantGain) {
        frame.set(FieldId::PreFormantGain, DEFAULT_PRE_FORMANT_GAIN);
    }
    if !frame.has(FieldId::OutputGain) {
        frame.set(FieldId::OutputGain, DEFAULT_OUTPUT_GAIN);
    }
    Some(frame)
}

/// Walks the token vector and hands each token to the sink as a frame, with
/// `user_index_base + index` as its progress tag. Returns the number of
/// frames emitted.
pub fn emit_frames(tokens: &[Token], user_index_base: i32, sink: &mut FrameSink) -> usize {
    for (i, token) in tokens.iter().enumerate() {
        let user_index = user_index_base.wrapping_add(i as i32);
        match frame_for_token(token) {
            Some(frame) if !token.silence => {
                sink(Some(&frame), token.duration_ms, token.fade_ms, user_index);
            }
            _ => {
                sink(None, token.duration_ms, token.fade_ms, user_index);
            }
        }
    }
    tokens.len()
}
