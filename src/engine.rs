//! The DSP-side handle.
//!
//! An [`Engine`] owns one frame queue and one renderer. `queue_frame` is the
//! producer side and may be called from the host thread; `synthesize` is the
//! consumer side and is expected to be driven from a single audio thread.
//! The renderer sits behind a mutex that only the audio thread ever takes,
//! so the hot path never contends.

use parking_lot::Mutex;

use crate::dsp::queue::{frame_queue, FrameProducer, QueuedFrame};
use crate::dsp::renderer::KlattRenderer;
use crate::fields::Frame;

/// A complete synthesizer instance: frame queue in, PCM out.
pub struct Engine {
    sample_rate: usize,
    producer: FrameProducer,
    renderer: Mutex<KlattRenderer>,
}

impl Engine {
    /// Creates an engine rendering at `sample_rate` Hz with room for
    /// `max_queued_frames` pending frames.
    pub fn new(sample_rate: usize, max_queued_frames: usize) -> Engine {
        let (producer, consumer) = frame_queue(max_queued_frames);
        Engine {
            sample_rate,
            producer,
            renderer: Mutex::new(KlattRenderer::new(sample_rate, consumer)),
        }
    }

    pub fn sample_rate(&self) -> usize {
        self.sample_rate
    }

    /// Enqueues a frame (`None` = silence) to be held for at least
    /// `min_duration_ms`, crossfaded in over `fade_ms`.
    ///
    /// Returns false when the queue is full or the durations are invalid;
    /// the frame is dropped in that case.
    pub fn queue_frame(
        &self,
        frame: Option<Frame>,
        min_duration_ms: f64,
        fade_ms: f64,
        user_index: i32,
    ) -> bool {
        if !min_duration_ms.is_finite() || !fade_ms.is_finite() {
            return false;
        }
        if min_duration_ms < 0.0 || fade_ms < 0.0 {
            return false;
        }
        let min_samples = self.ms_to_samples(min_duration_ms);
        let fade_samples = self.ms_to_samples(fade_ms).min(min_samples);
        self.producer.push(QueuedFrame {
            frame,
            min_samples,
            fade_samples,
            user_index,
        })
    }

    /// Renders into `out` and returns the number of samples written (always
    /// `out.len()`; an exhausted queue renders zeros).
    pub fn synthesize(&self, out: &mut [i16]) -> usize {
        self.renderer.lock().render(out)
    }

    /// User index of the most recently fully rendered frame, or -1 before
    /// any indexed frame completed.
    pub fn last_index(&self) -> i32 {
        self.producer.last_index()
    }

    fn ms_to_samples(&self, ms: f64) -> u32 {
        let samples = ms * self.sample_rate as f64 / 1000.0;
        if samples >= u32::MAX as f64 {
            u32::MAX
        } else {
            samples.round() as u32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldId;

    fn vowel() -> Frame {
        let mut f = Frame::new();
        f.set(FieldId::VoicePitch, 110.0);
        f.set(FieldId::VoiceAmplitude, 1.0);
        f.set(FieldId::Cf1, 700.0);
        f.set(FieldId::Cb1, 90.0);
        f.set(FieldId::Cf2, 1200.0);
        f.set(FieldId::Cb2, 100.0);
        f.set(FieldId::PreFormantGain, 1.0);
        f.set(FieldId::OutputGain, 2.0);
        f
    }

    #[test]
    fn rejects_negative_durations() {
        let e = Engine::new(22050, 8);
        assert!(!e.queue_frame(Some(vowel()), -1.0, 0.0, 0));
        assert!(!e.queue_frame(Some(vowel()), 10.0, -1.0, 0));
        assert!(!e.queue_frame(Some(vowel()), f64::NAN, 0.0, 0));
    }

    #[test]
    fn fade_is_clamped_to_min_duration() {
        let e = Engine::new(22050, 8);
        // fade 100ms > min 10ms: accepted, fade clamped internally.
        assert!(e.queue_frame(Some(vowel()), 10.0, 100.0, 0));
    }

    #[test]
    fn renders_queued_frame_and_reports_index() {
        let e = Engine::new(22050, 8);
        assert!(e.queue_frame(Some(vowel()), 50.0, 5.0, 3));
        // 50 ms at 22050 Hz is 1103 samples (rounded).
        let mut out = vec![0i16; 1200];
        assert_eq!(e.synthesize(&mut out), 1200);
        assert!(out.iter().any(|&s| s != 0));
        assert_eq!(e.last_index(), 3);
    }

    #[test]
    fn queue_capacity_is_honored() {
        let e = Engine::new(22050, 2);
        assert!(e.queue_frame(None, 10.0, 0.0, 0));
        assert!(e.queue_frame(None, 10.0, 0.0, 1));
        assert!(!e.queue_frame(None, 10.0, 0.0, 2));
    }
}
