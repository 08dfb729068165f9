//! The fixed-order transformation pipeline.
//!
//! Each pass is a pure function over the token vector: it reads the pack and
//! the call context, mutates token fields, durations and fades, and reports
//! failure with a string reason. Passes share no state beyond the tokens, so
//! each is testable in isolation. The order is fixed: timing, coarticulation,
//! boundary smoothing, trajectory limiting, intonation.

pub mod boundary;
pub mod coarticulation;
pub mod intonation;
pub mod timing;
pub mod trajectory;

use tracing::error;

use crate::error::{Error, Result};
use crate::front::token::Token;
use crate::pack::PackSet;

/// Per-call context shared read-only by every pass.
pub struct PassContext<'a> {
    pub pack: &'a PackSet,
    /// Positive speed multiplier; callers map non-positive input to 1.0.
    pub speed: f64,
    pub base_pitch: f64,
    pub inflection: f64,
    pub clause_type: char,
}

impl PassContext<'_> {
    /// Speed, guarded against zero and negatives.
    pub fn speed(&self) -> f64 {
        if self.speed > 0.0 {
            self.speed
        } else {
            1.0
        }
    }
}

type PassFn = fn(&PassContext, &mut Vec<Token>) -> std::result::Result<(), String>;

const PASSES: [(&str, PassFn); 5] = [
    ("timing", timing::run),
    ("coarticulation", coarticulation::run),
    ("boundary-smoothing", boundary::run),
    ("trajectory-limit", trajectory::run),
    ("intonation", intonation::run),
];

/// Runs every pass in order; the first failure aborts the call.
pub fn run_pipeline(ctx: &PassContext, tokens: &mut Vec<Token>) -> Result<()> {
    for (name, pass) in PASSES {
        if let Err(reason) = pass(ctx, tokens) {
            error!(pass = name, %reason, "frontend pass failed");
            return Err(Error::PassFailure { pass: name, reason });
        }
    }
    Ok(())
}
