//! Glottal source generation.
//!
//! The voice generator keeps a cycle position in [0, 1) advanced by the
//! (vibrato-modulated) pitch each sample and shapes a glottal flow pulse over
//! the open part of the cycle. The emitted signal is the flow plus its first
//! difference, which stands in for the lip radiation characteristic, with
//! turbulence noise gated into the open phase.

use std::f64::consts::PI;

use crate::dsp::interp::EffectiveFrame;
use crate::dsp::noise::NoiseSource;
use crate::fields::FieldId;

/// Phase accumulator that wraps modulo 1.
#[derive(Debug, Clone, Default)]
struct FrequencyGenerator {
    cycle_pos: f64,
}

impl FrequencyGenerator {
    /// Advances by `frequency / sample_rate` and returns the new position.
    fn step(&mut self, frequency: f64, sample_rate: f64) -> f64 {
        self.cycle_pos = (self.cycle_pos + frequency / sample_rate).rem_euclid(1.0);
        self.cycle_pos
    }

    fn reset(&mut self) {
        self.cycle_pos = 0.0;
    }
}

/// Flow pulse amplification, and the scale the turbulence gate divides by.
const FLOW_SCALE: f64 = 1.6;

/// Nominal position of the flow peak within the open phase.
const FLOW_PEAK_POS: f64 = 0.9;

/// Open-quotient threshold used when the frame supplies none.
const DEFAULT_OPEN_QUOTIENT: f64 = 0.4;

/// Produces the glottal waveform from per-frame pitch, vibrato, open
/// quotient and turbulence parameters.
///
/// The open quotient is the fraction of the cycle the glottis is *closed*:
/// the glottis opens once the cycle position passes it. Values are clamped
/// to [0.10, 0.95]; a value of 0 selects the engine default of 0.4.
#[derive(Debug)]
pub struct VoiceGenerator {
    sample_rate: f64,
    pitch_gen: FrequencyGenerator,
    vibrato_gen: FrequencyGenerator,
    turbulence_noise: NoiseSource,
    glottis_open: bool,
    last_flow: f64,
    // One-pole DC blocker state.
    last_in: f64,
    last_out: f64,
}

/// Pole of the DC blocking filter on the voiced path.
const DC_POLE: f64 = 0.9995;

impl VoiceGenerator {
    pub fn new(sample_rate: usize, noise_seed: u64) -> Self {
        VoiceGenerator {
            sample_rate: sample_rate as f64,
            pitch_gen: FrequencyGenerator::default(),
            vibrato_gen: FrequencyGenerator::default(),
            turbulence_noise: NoiseSource::new(noise_seed),
            glottis_open: false,
            last_flow: 0.0,
            last_in: 0.0,
            last_out: 0.0,
        }
    }

    /// Computes one sample of the unscaled voiced source.
    ///
    /// The caller applies `voiceAmplitude`; the turbulence mixed in here is
    /// already scaled by `voiceTurbulenceAmplitude` and gated to the open
    /// phase.
    pub fn step(&mut self, f: &EffectiveFrame) -> f64 {
        let vibrato_pos = self.vibrato_gen.step(f.value(FieldId::VibratoSpeed), self.sample_rate);
        let vibrato =
            1.0 + f.value(FieldId::VibratoPitchOffset) * (2.0 * PI * vibrato_pos).sin();
        let pitch = (f.value(FieldId::VoicePitch) * vibrato).max(0.0);
        let cycle_pos = self.pitch_gen.step(pitch, self.sample_rate);

        let mut open_quotient = f.value(FieldId::GlottalOpenQuotient);
        if open_quotient <= 0.0 {
            open_quotient = DEFAULT_OPEN_QUOTIENT;
        }
        let open_quotient = open_quotient.clamp(0.10, 0.95);

        self.glottis_open = pitch > 0.0 && cycle_pos >= open_quotient;

        let mut flow = 0.0;
        if self.glottis_open {
            let open_len = (1.0 - open_quotient).max(0.0001);
            let dt = pitch / self.sample_rate;
            let phase = ((cycle_pos - open_quotient) / (open_len - dt).max(0.0001)).clamp(0.0, 1.0);

            // Pull the peak forward so the closed phase keeps at least a
            // couple of samples; an instantaneous closure aliases badly.
            let mut peak_pos = FLOW_PEAK_POS;
            if pitch > 0.0 {
                let period_samples = self.sample_rate / pitch;
                let min_close_frac = (2.0 / (period_samples * open_len)).min(0.5);
                peak_pos = peak_pos.min(1.0 - min_close_frac).max(0.5);
            }

            flow = if phase < peak_pos {
                0.5 * (1.0 - (phase * PI / peak_pos).cos())
            } else {
                0.5 * (1.0 + ((phase - peak_pos) * PI / (1.0 - peak_pos)).cos())
            };
            flow *= FLOW_SCALE;
        }

        let dflow = flow - self.last_flow;
        self.last_flow = flow;
        let voiced_src = flow + dflow;

        let mut turbulence =
            self.turbulence_noise.step() * 0.1 * f.value(FieldId::VoiceTurbulenceAmplitude);
        if self.glottis_open {
            turbulence *= (flow / FLOW_SCALE).clamp(0.0, 1.0);
        } else {
            turbulence = 0.0;
        }

        let x = voiced_src + turbulence;
        let y = x - self.last_in + DC_POLE * self.last_out;
        self.last_in = x;
        self.last_out = y;
        y
    }

    pub fn reset(&mut self, noise_seed: u64) {
        self.pitch_gen.reset();
        self.vibrato_gen.reset();
        self.turbulence_noise.reset(noise_seed);
        self.glottis_open = false;
        self.last_flow = 0.0;
        self.last_in = 0.0;
        self.last_out = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FIELD_COUNT;

    fn voiced_frame(pitch: f64) -> EffectiveFrame {
        let mut f = EffectiveFrame {
            values: [0.0; FIELD_COUNT],
            silence: false,
        };
        f.values[FieldId::VoicePitch.index()] = pitch;
        f.values[FieldId::VoiceAmplitude.index()] = 1.0;
        f.values[FieldId::GlottalOpenQuotient.index()] = 0.4;
        f
    }

    #[test]
    fn zero_pitch_produces_silence() {
        let mut vg = VoiceGenerator::new(22050, 3);
        let f = voiced_frame(0.0);
        for _ in 0..2000 {
            let y = vg.step(&f);
            assert!(y.abs() < 1e-9, "expected silence, got {y}");
        }
    }

    #[test]
    fn output_is_periodic_at_the_requested_pitch() {
        let sr = 22050usize;
        let pitch = 100.0;
        let mut vg = VoiceGenerator::new(sr, 3);
        let f = voiced_frame(pitch);
        let n = sr; // one second
        let samples: Vec<f64> = (0..n).map(|_| vg.step(&f)).collect();
        // Count upward crossings of a threshold in the second half; one per
        // glottal cycle.
        let half = &samples[n / 2..];
        let peak = half.iter().cloned().fold(0.0_f64, |m, v| m.max(v.abs()));
        let thresh = peak * 0.5;
        let mut crossings = 0;
        for w in half.windows(2) {
            if w[0] < thresh && w[1] >= thresh {
                crossings += 1;
            }
        }
        let expected = pitch / 2.0; // half a second worth of cycles
        assert!(
            (crossings as f64 - expected).abs() <= 2.0,
            "counted {crossings} cycles, expected ~{expected}"
        );
    }

    #[test]
    fn output_has_no_dc_offset() {
        let mut vg = VoiceGenerator::new(22050, 3);
        let f = voiced_frame(120.0);
        let mut sum = 0.0;
        let n = 44100;
        for _ in 0..n {
            sum += vg.step(&f);
        }
        assert!((sum / n as f64).abs() < 0.01);
    }

    #[test]
    fn deterministic_for_equal_seeds() {
        let mut a = VoiceGenerator::new(22050, 9);
        let mut b = VoiceGenerator::new(22050, 9);
        let mut f = voiced_frame(110.0);
        f.values[FieldId::VoiceTurbulenceAmplitude.index()] = 0.8;
        for _ in 0..5000 {
            assert_eq!(a.step(&f), b.step(&f));
        }
    }
}
