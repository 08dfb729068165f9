//! The phonetic frontend: IPA strings in, timed parameter frames out.
//!
//! A [`Synthesizer`] handle owns a pack directory and the currently merged
//! [`PackSet`]. `queue_ipa` runs the tokenizer and the pass pipeline on the
//! caller's thread and hands the resulting frames to a sink, typically the
//! engine's frame queue or an FFI callback. The handle's mutable state sits
//! behind one producer-side lock; the render path never touches it.

pub mod emit;
pub mod passes;
pub mod token;
pub mod tokenizer;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::error::Result;
use crate::fields::Frame;
use crate::front::passes::{run_pipeline, PassContext};
use crate::pack::PackSet;

/// Per-call prosody parameters.
#[derive(Debug, Clone, Copy)]
pub struct SpeechParams {
    /// Rate multiplier; non-positive values are treated as 1.0.
    pub speed: f64,
    /// Base pitch in Hz.
    pub base_pitch: f64,
    /// Pitch range around the base, 0 = monotone.
    pub inflection: f64,
    /// One of `.`, `?`, `!`, `,`.
    pub clause_type: char,
    /// Progress tag of the first emitted frame; later frames count up.
    pub user_index_base: i32,
}

impl Default for SpeechParams {
    fn default() -> Self {
        SpeechParams {
            speed: 1.0,
            base_pitch: 100.0,
            inflection: 0.5,
            clause_type: '.',
            user_index_base: 0,
        }
    }
}

/// What a `queue_ipa` call produced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    pub frames_emitted: usize,
    /// IPA symbols dropped because no phoneme definition matched.
    pub unknown_symbols: usize,
}

struct FrontendState {
    pack: Option<Arc<PackSet>>,
    last_error: String,
    stream_has_speech: bool,
}

/// The frontend handle.
pub struct Synthesizer {
    pack_dir: PathBuf,
    state: Mutex<FrontendState>,
}

impl Synthesizer {
    pub fn new(pack_dir: impl Into<PathBuf>) -> Synthesizer {
        Synthesizer {
            pack_dir: pack_dir.into(),
            state: Mutex::new(FrontendState {
                pack: None,
                last_error: String::new(),
                stream_has_speech: false,
            }),
        }
    }

    pub fn pack_dir(&self) -> &Path {
        &self.pack_dir
    }

    /// Loads and installs the merged pack for `lang_tag`. A language change
    /// also resets the inter-segment gap state.
    pub fn set_language(&self, lang_tag: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.last_error.clear();
        match PackSet::load(&self.pack_dir, lang_tag) {
            Ok(pack) => {
                state.pack = Some(pack);
                state.stream_has_speech = false;
                Ok(())
            }
            Err(e) => {
                state.last_error = e.to_string();
                Err(e)
            }
        }
    }

    /// The currently installed pack, loading `default` on first use.
    pub fn pack(&self) -> Result<Arc<PackSet>> {
        let mut state = self.state.lock();
        if let Some(pack) = &state.pack {
            return Ok(Arc::clone(pack));
        }
        let pack = PackSet::load(&self.pack_dir, "default").map_err(|e| {
            state.last_error = e.to_string();
            e
        })?;
        state.pack = Some(Arc::clone(&pack));
        Ok(pack)
    }

    /// Converts `ipa` to frames and hands them to `sink` in order,
    /// synchronously. An empty or fully-unknown input emits nothing and is
    /// not an error.
    pub fn queue_ipa(
        &self,
        ipa: &str,
        params: SpeechParams,
        mut sink: impl FnMut(Option<&Frame>, f64, f64, i32),
    ) -> Result<QueueStats> {
        let pack = self.pack()?;

        let speed = if params.speed > 0.0 { params.speed } else { 1.0 };
        let result = tokenizer::tokenize(&pack, ipa);
        if result.unknown_symbols > 0 {
            warn!(
                count = result.unknown_symbols,
                "dropped unknown IPA symbols"
            );
        }
        let mut tokens = result.tokens;
        if tokens.is_empty() {
            return Ok(QueueStats {
                frames_emitted: 0,
                unknown_symbols: result.unknown_symbols,
            });
        }

        let ctx = PassContext {
            pack: &pack,
            speed,
            base_pitch: params.base_pitch,
            inflection: params.inflection,
            clause_type: params.clause_type,
        };
        if let Err(e) = run_pipeline(&ctx, &mut tokens) {
            self.state.lock().last_error = e.to_string();
            return Err(e);
        }

        // A short silence between consecutive calls keeps separate chunks
        // (label, role, value...) from running into each other.
        {
            let mut state = self.state.lock();
            let gap = pack.lang.segment_boundary_gap_ms;
            if state.stream_has_speech && gap > 0.0 {
                let fade = pack.lang.segment_boundary_fade_ms.max(0.0) / speed;
                sink(None, gap / speed, fade, -1);
            }
            state.stream_has_speech = true;
            state.last_error.clear();
        }

        let frames_emitted = emit::emit_frames(&tokens, params.user_index_base, &mut sink);
        Ok(QueueStats {
            frames_emitted,
            unknown_symbols: result.unknown_symbols,
        })
    }

    /// The message of the most recent failed call, or empty.
    pub fn last_error(&self) -> String {
        self.state.lock().last_error.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};

    static SCRATCH_COUNTER: AtomicU32 = AtomicU32::new(0);

    fn pack_dir(default_yaml: &str) -> PathBuf {
        let n = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!(
            "klatt-tts-front-test-{}-{n}",
            std::process::id()
        ));
        std::fs::create_dir_all(dir.join("lang")).unwrap();
        std::fs::write(
            dir.join("phonemes.yaml"),
            concat!(
                "phonemes:\n",
                "  a:\n    _isVowel: true\n    _isVoiced: true\n    cf1: 700\n    cf2: 1200\n    cb1: 90\n    cb2: 100\n    voiceAmplitude: 1\n",
            ),
        )
        .unwrap();
        std::fs::write(dir.join("lang").join("default.yaml"), default_yaml).unwrap();
        dir
    }

    #[test]
    fn empty_input_emits_nothing_without_error() {
        let synth = Synthesizer::new(pack_dir("settings: {}\n"));
        let mut count = 0usize;
        let stats = synth
            .queue_ipa("", SpeechParams::default(), |_, _, _, _| count += 1)
            .unwrap();
        assert_eq!(stats.frames_emitted, 0);
        assert_eq!(count, 0);
        assert!(synth.last_error().is_empty());
    }

    #[test]
    fn unknown_language_is_surfaced() {
        let synth = Synthesizer::new(pack_dir("settings: {}\n"));
        let err = synth.set_language("zz").unwrap_err();
        assert!(matches!(err, Error::UnknownLanguage(_)));
        assert!(synth.last_error().contains("zz"));
    }

    #[test]
    fn segment_gap_inserted_between_calls_only() {
        let synth = Synthesizer::new(pack_dir(
            "settings:\n  segmentBoundaryGapMs: 20\n  segmentBoundaryFadeMs: 5\n",
        ));
        let mut frames: Vec<(bool, f64, i32)> = Vec::new();
        let mut sink = |f: Option<&Frame>, d: f64, _fd: f64, i: i32| {
            frames.push((f.is_some(), d, i));
        };
        synth.queue_ipa("a", SpeechParams::default(), &mut sink).unwrap();
        synth.queue_ipa("a", SpeechParams::default(), &mut sink).unwrap();
        // call 1: one vowel frame; call 2: gap then vowel frame.
        assert_eq!(frames.len(), 3);
        assert!(frames[0].0);
        assert!(!frames[1].0);
        assert!((frames[1].1 - 20.0).abs() < 1e-9);
        assert_eq!(frames[1].2, -1);
        assert!(frames[2].0);
    }

    #[test]
    fn language_switch_resets_the_gap_state() {
        let synth = Synthesizer::new(pack_dir(
            "settings:\n  segmentBoundaryGapMs: 20\n",
        ));
        let mut count_silence = 0usize;
        let mut sink = |f: Option<&Frame>, _d: f64, _fd: f64, _i: i32| {
            if f.is_none() {
                count_silence += 1;
            }
        };
        synth.queue_ipa("a", SpeechParams::default(), &mut sink).unwrap();
        synth.set_language("default").unwrap();
        synth.queue_ipa("a", SpeechParams::default(), &mut sink).unwrap();
        assert_eq!(count_silence, 0);
    }

    #[test]
    fn unknown_symbol_count_is_reported() {
        let synth = Synthesizer::new(pack_dir("settings: {}\n"));
        let stats = synth
            .queue_ipa("a\u{03B2}", SpeechParams::default(), |_, _, _, _| {})
            .unwrap();
        assert_eq!(stats.unknown_symbols, 1);
        assert_eq!(stats.frames_emitted, 1);
    }

    #[test]
    fn user_index_base_offsets_frames() {
        let synth = Synthesizer::new(pack_dir("settings: {}\n"));
        let mut indices = Vec::new();
        synth
            .queue_ipa(
                "a a",
                SpeechParams {
                    user_index_base: 40,
                    ..SpeechParams::default()
                },
                |_, _, _, i| indices.push(i),
            )
            .unwrap();
        // a, hiatus gap, a
        assert_eq!(indices, vec![40, 41, 42]);
    }
}
