//! The per-sample Klatt rendering loop.
//!
//! One tick: advance the frame queue/interpolator, generate the voiced and
//! noise sources, run the cascade bank (with the nasal pole/zero block after
//! F1), run the parallel bank over the frication source, mix, scale and clip
//! to 16-bit. The loop never allocates, never takes a lock and never fails;
//! malformed frames render as silence.

use crate::dsp::filter::{AntiResonator, Resonator};
use crate::dsp::interp::{EffectiveFrame, FrameInterpolator};
use crate::dsp::noise::NoiseSource;
use crate::dsp::queue::FrameConsumer;
use crate::dsp::voice::VoiceGenerator;
use crate::fields::{FieldId, MAX_ORAL_FORMANTS};

/// Scale from internal float samples to i16. Pack gains are tuned against
/// this value.
const OUTPUT_SCALE: f64 = 4000.0;

/// Attenuation applied to the frication noise source before the parallel
/// bank, so pack frication amplitudes stay in the same 0..1 range as the
/// voiced amplitudes.
const FRICATION_SCALE: f64 = 0.175;

// Distinct seeds keep the three noise paths uncorrelated.
const TURBULENCE_SEED: u64 = 0;
const ASPIRATION_SEED: u64 = 1;
const FRICATION_SEED: u64 = 2;

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Renders queued frames into signed 16-bit mono samples.
pub struct KlattRenderer {
    consumer: FrameConsumer,
    interp: FrameInterpolator,
    voice: VoiceGenerator,
    aspiration_noise: NoiseSource,
    frication_noise: NoiseSource,
    cascade: [Resonator; MAX_ORAL_FORMANTS],
    nasal_zero: AntiResonator,
    nasal_pole: Resonator,
    parallel: [Resonator; MAX_ORAL_FORMANTS],
    current_user_index: i32,
    current_marked: bool,
}

impl KlattRenderer {
    pub fn new(sample_rate: usize, consumer: FrameConsumer) -> Self {
        KlattRenderer {
            consumer,
            interp: FrameInterpolator::new(),
            voice: VoiceGenerator::new(sample_rate, TURBULENCE_SEED),
            aspiration_noise: NoiseSource::new(ASPIRATION_SEED),
            frication_noise: NoiseSource::new(FRICATION_SEED),
            cascade: std::array::from_fn(|_| Resonator::new(sample_rate)),
            nasal_zero: AntiResonator::new(sample_rate),
            nasal_pole: Resonator::new(sample_rate),
            parallel: std::array::from_fn(|_| Resonator::new(sample_rate)),
            current_user_index: -1,
            current_marked: true,
        }
    }

    /// Fills `out` completely and returns the number of samples written.
    /// When the queue runs dry the tail is zeros (or the held frame's decay).
    pub fn render(&mut self, out: &mut [i16]) -> usize {
        for slot in out.iter_mut() {
            *slot = self.next_sample();
        }
        out.len()
    }

    fn next_sample(&mut self) -> i16 {
        self.advance_queue();

        let e = self.interp.step();
        if !self.interp.has_frame() || self.interp.is_quiescent() {
            return 0;
        }

        let voice_amp = e.value(FieldId::VoiceAmplitude).max(0.0);
        let asp_amp = e.value(FieldId::AspirationAmplitude).max(0.0);
        let fric_amp = e.value(FieldId::FricationAmplitude).max(0.0);

        // Keep source state advancing through quiet stretches so timing does
        // not depend on how silence was reached.
        let v = self.voice.step(&e);
        let asp = self.aspiration_noise.step();
        let fric = self.frication_noise.step();

        if voice_amp == 0.0 && asp_amp == 0.0 && fric_amp == 0.0 {
            return 0;
        }

        let cascade_out = self.run_cascade(&e, v * voice_amp + asp * asp_amp);
        let parallel_out = self.run_parallel(&e, fric * FRICATION_SCALE * fric_amp);

        let mixed = (cascade_out + parallel_out)
            * e.value(FieldId::PreFormantGain)
            * e.value(FieldId::OutputGain);

        clip_i16(mixed * OUTPUT_SCALE)
    }

    fn run_cascade(&mut self, e: &EffectiveFrame, input: f64) -> f64 {
        // Headroom for the resonant gain of the bank.
        let input = input / 2.0;
        self.cascade[0].set_parameters(e.value(FieldId::Cf1), e.value(FieldId::Cb1));
        let mut s = self.cascade[0].step(input);

        // Nasal branch after F1: antiresonator notch, then the nasal pole,
        // blended in by caNP.
        let ca_np = e.value(FieldId::CaNP).clamp(0.0, 1.0);
        if ca_np > 0.0 {
            self.nasal_zero
                .set_parameters(e.value(FieldId::CfN0), e.value(FieldId::CbN0));
            self.nasal_pole
                .set_parameters(e.value(FieldId::CfNP), e.value(FieldId::CbNP));
            let n0 = self.nasal_zero.step(s);
            s = lerp(s, self.nasal_pole.step(n0), ca_np);
        }

        for n in 2..=MAX_ORAL_FORMANTS {
            let freq = e.value(FieldId::cascade_freq(n));
            let bw = e.value(FieldId::cascade_bw(n));
            self.cascade[n - 1].set_parameters(freq, bw);
            s = self.cascade[n - 1].step(s);
        }
        s
    }

    fn run_parallel(&mut self, e: &EffectiveFrame, input: f64) -> f64 {
        let input = input / 2.0;
        let mut sum = 0.0;
        for n in 1..=MAX_ORAL_FORMANTS {
            let freq = e.value(FieldId::parallel_freq(n));
            let bw = e.value(FieldId::parallel_bw(n));
            let amp = e.value(FieldId::parallel_amp(n));
            self.parallel[n - 1].set_parameters(freq, bw);
            sum += (self.parallel[n - 1].step(input) - input) * amp;
        }
        lerp(sum, input, e.value(FieldId::ParallelBypass).clamp(0.0, 1.0))
    }

    fn advance_queue(&mut self) {
        if self.interp.has_frame() && !self.interp.ready_for_next() {
            return;
        }
        if self.interp.has_frame() && !self.current_marked {
            // The active frame has now played for its minimum duration.
            if self.current_user_index >= 0 {
                self.consumer.mark_rendered(self.current_user_index);
            }
            self.current_marked = true;
        }
        if let Some(queued) = self.consumer.pop() {
            // Malformed frames become silence rather than poisoning the
            // filter state with NaN.
            let frame = queued.frame.filter(|f| f.is_well_formed());
            self.interp
                .push_frame(frame.as_ref(), queued.min_samples.max(1), queued.fade_samples);
            self.current_user_index = queued.user_index;
            self.current_marked = false;
        }
    }
}

fn clip_i16(x: f64) -> i16 {
    // Round to nearest, ties away from zero, then saturate.
    let r = x.round();
    if r >= i16::MAX as f64 {
        i16::MAX
    } else if r <= i16::MIN as f64 {
        i16::MIN
    } else {
        r as i16
    }
}
