//! Crossfade interpolation between queued frames.
//!
//! The interpolator owns the "effective parameter vector" the renderer reads
//! every sample. When a new frame arrives it is faded in field-by-field over
//! its fade budget, starting from whatever the effective vector was at that
//! moment, so retargeting mid-fade never jumps. A silence frame fades the
//! three source amplitudes to zero and freezes everything else, which keeps
//! formant state sensible across pauses.

use crate::fields::{FieldId, Frame, FIELD_COUNT};

/// Effective per-sample parameters, as produced by [`FrameInterpolator::step`].
#[derive(Debug, Clone, Copy)]
pub struct EffectiveFrame {
    pub values: [f64; FIELD_COUNT],
    /// True when the active frame is a silence frame.
    pub silence: bool,
}

impl EffectiveFrame {
    pub fn value(&self, id: FieldId) -> f64 {
        self.values[id.index()]
    }
}

struct ActiveFrame {
    values: [f64; FIELD_COUNT],
    silence: bool,
    min_samples: u32,
    elapsed: u32,
    fade_total: u32,
    fade_pos: u32,
}

/// Holds the current effective vector and fades incoming frames into it.
pub struct FrameInterpolator {
    effective: [f64; FIELD_COUNT],
    fade_start: [f64; FIELD_COUNT],
    active: Option<ActiveFrame>,
}

const AMPLITUDE_FIELDS: [FieldId; 3] = [
    FieldId::VoiceAmplitude,
    FieldId::AspirationAmplitude,
    FieldId::FricationAmplitude,
];

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

impl FrameInterpolator {
    pub fn new() -> Self {
        FrameInterpolator {
            effective: [0.0; FIELD_COUNT],
            fade_start: [0.0; FIELD_COUNT],
            active: None,
        }
    }

    /// True once any frame has been pushed.
    pub fn has_frame(&self) -> bool {
        self.active.is_some()
    }

    /// True when the active frame has been rendered for at least its minimum
    /// duration and the next queued frame may take over.
    pub fn ready_for_next(&self) -> bool {
        match &self.active {
            Some(a) => a.elapsed >= a.min_samples,
            None => true,
        }
    }

    /// True when there is nothing to render: no frame yet, or a silence
    /// frame whose fade-out has completed.
    pub fn is_quiescent(&self) -> bool {
        match &self.active {
            None => true,
            Some(a) => a.silence && a.fade_pos >= a.fade_total,
        }
    }

    /// Installs `frame` as the active frame, fading from the current
    /// effective vector over `fade_samples`. `None` denotes silence.
    pub fn push_frame(&mut self, frame: Option<&Frame>, min_samples: u32, fade_samples: u32) {
        self.fade_start = self.effective;
        let fade_total = fade_samples.min(min_samples);
        match frame {
            Some(f) => {
                self.active = Some(ActiveFrame {
                    values: f.values,
                    silence: false,
                    min_samples,
                    elapsed: 0,
                    fade_total,
                    fade_pos: 0,
                });
            }
            None => {
                // Silence: hold the previous field values, fade amplitudes out.
                let mut values = self.effective;
                for id in AMPLITUDE_FIELDS {
                    values[id.index()] = 0.0;
                }
                self.active = Some(ActiveFrame {
                    values,
                    silence: true,
                    min_samples,
                    elapsed: 0,
                    fade_total,
                    fade_pos: 0,
                });
            }
        }
    }

    /// Advances one sample and returns the effective parameter vector.
    pub fn step(&mut self) -> EffectiveFrame {
        let Some(active) = &mut self.active else {
            return EffectiveFrame {
                values: self.effective,
                silence: true,
            };
        };

        active.elapsed = active.elapsed.saturating_add(1);

        // Target vector for this sample: the frame's own values, with the
        // pitch glide toward endVoicePitch applied across the minimum
        // duration.
        let mut target = active.values;
        if !active.silence && active.min_samples > 0 {
            let end_pitch = target[FieldId::EndVoicePitch.index()];
            if end_pitch > 0.0 {
                let start_pitch = active.values[FieldId::VoicePitch.index()];
                let t = (active.elapsed as f64 / active.min_samples as f64).min(1.0);
                target[FieldId::VoicePitch.index()] = lerp(start_pitch, end_pitch, t);
            }
        }

        if active.fade_pos < active.fade_total {
            active.fade_pos += 1;
            let t = active.fade_pos as f64 / active.fade_total as f64;
            for i in 0..FIELD_COUNT {
                self.effective[i] = lerp(self.fade_start[i], target[i], t);
            }
        } else {
            self.effective = target;
        }

        EffectiveFrame {
            values: self.effective,
            silence: active.silence,
        }
    }
}

impl Default for FrameInterpolator {
    fn default() -> Self {
        FrameInterpolator::new()
    }
}
