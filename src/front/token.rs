//! The in-pipeline token type.

use std::sync::Arc;

use crate::fields::{FieldId, Frame};
use crate::pack::phoneme::PhonemeDef;

/// Lexical stress level of the syllable a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stress {
    #[default]
    None,
    Primary,
    Secondary,
}

/// One phoneme instance (or inserted silence) flowing through the pass
/// pipeline. Tokens are created by the tokenizer, mutated in place by the
/// passes, and consumed by the emitter.
#[derive(Debug, Clone, Default)]
pub struct Token {
    /// The phoneme definition, or `None` for silence tokens.
    pub def: Option<Arc<PhonemeDef>>,
    pub silence: bool,

    pub word_start: bool,
    pub syllable_start: bool,
    /// Set on the token preceding a clause punctuation mark.
    pub clause_end: bool,
    pub stress: Stress,

    pub duration_ms: f64,
    pub fade_ms: f64,

    /// Sparse field overrides; set-mask bits win over the phoneme def.
    pub fields: Frame,

    // Markers for inserted micro-segments.
    pub pre_stop_gap: bool,
    pub cluster_gap: bool,
    pub vowel_hiatus_gap: bool,
    pub post_stop_aspiration: bool,

    // Length and tie bookkeeping from the tokenizer.
    pub lengthened: bool,
    pub tied_to: bool,
    pub tied_from: bool,

    /// Tone contour (start, end) in pitch percent, for tonal packs.
    pub tone: Option<[f64; 2]>,
}

impl Token {
    pub fn silence() -> Token {
        Token {
            silence: true,
            ..Token::default()
        }
    }

    pub fn for_def(def: Arc<PhonemeDef>) -> Token {
        Token {
            def: Some(def),
            ..Token::default()
        }
    }

    pub fn is_silence_or_missing(&self) -> bool {
        self.silence || self.def.is_none()
    }

    /// True for silences inserted by the pipeline rather than spoken pauses.
    pub fn is_micro_gap(&self) -> bool {
        self.pre_stop_gap || self.cluster_gap || self.vowel_hiatus_gap
    }

    pub fn is_vowel(&self) -> bool {
        self.def.as_ref().is_some_and(|d| d.flags.is_vowel)
    }

    pub fn is_vowel_like(&self) -> bool {
        self.def.as_ref().is_some_and(|d| d.is_vowel_like())
    }

    pub fn is_consonant(&self) -> bool {
        self.def.as_ref().is_some_and(|d| !d.flags.is_vowel)
    }

    pub fn is_stop_like(&self) -> bool {
        // Inserted aspiration is part of the stop release for boundary rules.
        if self.post_stop_aspiration {
            return true;
        }
        self.def.as_ref().is_some_and(|d| d.is_stop_like())
    }

    pub fn is_voiced(&self) -> bool {
        self.def.as_ref().is_some_and(|d| d.flags.is_voiced)
    }

    pub fn is_fricative_like(&self) -> bool {
        if self.silence {
            return false;
        }
        self.field(FieldId::FricationAmplitude) > 0.0
    }

    /// The token's effective field value: override if set, else the phoneme
    /// def's value, else 0.0.
    pub fn field(&self, id: FieldId) -> f64 {
        if let Some(v) = self.fields.get(id) {
            return v;
        }
        match &self.def {
            Some(def) if def.fields.has(id) => def.field(id),
            _ => 0.0,
        }
    }

    /// True when either the override or the def supplies the field.
    pub fn has_field(&self, id: FieldId) -> bool {
        self.fields.has(id) || self.def.as_ref().is_some_and(|d| d.fields.has(id))
    }

    /// Sets an override; the emitter will prefer it over the def.
    pub fn set_field(&mut self, id: FieldId, value: f64) {
        self.fields.set(id, value);
    }

    /// Fade may never exceed duration, and neither may be negative.
    pub fn clamp_fade_to_duration(&mut self) {
        if self.duration_ms < 0.0 {
            self.duration_ms = 0.0;
        }
        if self.fade_ms < 0.0 {
            self.fade_ms = 0.0;
        }
        if self.fade_ms > self.duration_ms {
            self.fade_ms = self.duration_ms;
        }
    }
}
