//! Klatt formant speech synthesis with an IPA frontend.
//!
//! Two halves, joined by a frame queue:
//!
//! - The **frontend** ([`Synthesizer`]) turns IPA phoneme strings into timed
//!   Klatt parameter frames: normalization and tokenization, then a fixed
//!   pipeline of timing, coarticulation, boundary-smoothing,
//!   trajectory-limiting and intonation passes, all driven by layered YAML
//!   language packs.
//! - The **engine** ([`Engine`]) renders queued frames sample-by-sample:
//!   a glottal source with vibrato and turbulence, aspiration and frication
//!   noise, cascade and parallel resonator banks, and crossfade
//!   interpolation between frames. Output is signed 16-bit mono PCM.
//!
//! Both halves are also exported with C linkage (see [`ffi`]) so a host
//! such as a screen reader can drive them through a shared library.
//! The render path never allocates, locks against the producer, or fails;
//! given the same pack and inputs the PCM output is bit-identical between
//! runs.
//!
//! ```no_run
//! use klatt_tts::{Engine, SpeechParams, Synthesizer};
//!
//! let engine = Engine::new(22050, 128);
//! let synth = Synthesizer::new("packs");
//! synth.set_language("en")?;
//! synth.queue_ipa("həˈloʊ", SpeechParams::default(), |frame, min_ms, fade_ms, index| {
//!     engine.queue_frame(frame.copied(), min_ms, fade_ms, index);
//! })?;
//! let mut samples = vec![0i16; 22050];
//! engine.synthesize(&mut samples);
//! # Ok::<(), klatt_tts::Error>(())
//! ```

#![deny(unsafe_code, rustdoc::broken_intra_doc_links)]
#![warn(clippy::all)]

pub mod dsp;
mod engine;
mod error;
pub mod ffi;
pub mod fields;
pub mod front;
pub mod pack;

pub use engine::Engine;
pub use error::{Error, Result};
pub use fields::{FieldId, Frame, FIELD_COUNT, MAX_ORAL_FORMANTS};
pub use front::{QueueStats, SpeechParams, Synthesizer};
pub use pack::{bundled_pack_dir, PackSet};
