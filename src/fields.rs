//! Frame parameters addressed by a dense field enum.
//!
//! A [`Frame`] is the unit of communication between the frontend and the DSP
//! engine: one value per [`FieldId`] plus a set-mask recording which values
//! were explicitly supplied. The mask is what makes "token override vs
//! phoneme default vs previous frame" cheap to resolve, and lets the renderer
//! detect changed resonator parameters with a couple of integer compares.

/// Identifies one scalar parameter of a synthesis frame.
///
/// The discriminant is the index into [`Frame::values`] and the bit position
/// in the set-mask. The FFI frame struct lays its fields out in exactly this
/// order, so the enum order is part of the ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum FieldId {
    VoicePitch,
    VibratoPitchOffset,
    VibratoSpeed,
    VoiceTurbulenceAmplitude,
    GlottalOpenQuotient,
    VoiceAmplitude,
    AspirationAmplitude,
    Cf1,
    Cf2,
    Cf3,
    Cf4,
    Cf5,
    Cf6,
    CfN0,
    CfNP,
    Cb1,
    Cb2,
    Cb3,
    Cb4,
    Cb5,
    Cb6,
    CbN0,
    CbNP,
    CaNP,
    FricationAmplitude,
    Pf1,
    Pf2,
    Pf3,
    Pf4,
    Pf5,
    Pf6,
    Pb1,
    Pb2,
    Pb3,
    Pb4,
    Pb5,
    Pb6,
    Pa1,
    Pa2,
    Pa3,
    Pa4,
    Pa5,
    Pa6,
    ParallelBypass,
    PreFormantGain,
    OutputGain,
    EndVoicePitch,
}

/// Number of frame fields. Must stay <= 64 so the set-mask fits in a `u64`.
pub const FIELD_COUNT: usize = 47;

/// Number of oral formants in each resonator bank.
pub const MAX_ORAL_FORMANTS: usize = 6;

const FIELDS: [FieldId; FIELD_COUNT] = [
    FieldId::VoicePitch,
    FieldId::VibratoPitchOffset,
    FieldId::VibratoSpeed,
    FieldId::VoiceTurbulenceAmplitude,
    FieldId::GlottalOpenQuotient,
    FieldId::VoiceAmplitude,
    FieldId::AspirationAmplitude,
    FieldId::Cf1,
    FieldId::Cf2,
    FieldId::Cf3,
    FieldId::Cf4,
    FieldId::Cf5,
    FieldId::Cf6,
    FieldId::CfN0,
    FieldId::CfNP,
    FieldId::Cb1,
    FieldId::Cb2,
    FieldId::Cb3,
    FieldId::Cb4,
    FieldId::Cb5,
    FieldId::Cb6,
    FieldId::CbN0,
    FieldId::CbNP,
    FieldId::CaNP,
    FieldId::FricationAmplitude,
    FieldId::Pf1,
    FieldId::Pf2,
    FieldId::Pf3,
    FieldId::Pf4,
    FieldId::Pf5,
    FieldId::Pf6,
    FieldId::Pb1,
    FieldId::Pb2,
    FieldId::Pb3,
    FieldId::Pb4,
    FieldId::Pb5,
    FieldId::Pb6,
    FieldId::Pa1,
    FieldId::Pa2,
    FieldId::Pa3,
    FieldId::Pa4,
    FieldId::Pa5,
    FieldId::Pa6,
    FieldId::ParallelBypass,
    FieldId::PreFormantGain,
    FieldId::OutputGain,
    FieldId::EndVoicePitch,
];

const FIELD_NAMES: [&str; FIELD_COUNT] = [
    "voicePitch",
    "vibratoPitchOffset",
    "vibratoSpeed",
    "voiceTurbulenceAmplitude",
    "glottalOpenQuotient",
    "voiceAmplitude",
    "aspirationAmplitude",
    "cf1",
    "cf2",
    "cf3",
    "cf4",
    "cf5",
    "cf6",
    "cfN0",
    "cfNP",
    "cb1",
    "cb2",
    "cb3",
    "cb4",
    "cb5",
    "cb6",
    "cbN0",
    "cbNP",
    "caNP",
    "fricationAmplitude",
    "pf1",
    "pf2",
    "pf3",
    "pf4",
    "pf5",
    "pf6",
    "pb1",
    "pb2",
    "pb3",
    "pb4",
    "pb5",
    "pb6",
    "pa1",
    "pa2",
    "pa3",
    "pa4",
    "pa5",
    "pa6",
    "parallelBypass",
    "preFormantGain",
    "outputGain",
    "endVoicePitch",
];

impl FieldId {
    /// All fields, in frame order.
    pub fn all() -> impl Iterator<Item = FieldId> {
        FIELDS.iter().copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> Option<FieldId> {
        FIELDS.get(i).copied()
    }

    /// The field name as it appears in pack files and the FFI struct.
    pub fn name(self) -> &'static str {
        FIELD_NAMES[self.index()]
    }

    pub fn from_name(name: &str) -> Option<FieldId> {
        FIELD_NAMES
            .iter()
            .position(|n| *n == name)
            .and_then(FieldId::from_index)
    }

    /// Cascade formant frequency for formant `n` (1-based).
    pub fn cascade_freq(n: usize) -> FieldId {
        debug_assert!((1..=MAX_ORAL_FORMANTS).contains(&n));
        FieldId::from_index(FieldId::Cf1.index() + n - 1).unwrap()
    }

    /// Cascade formant bandwidth for formant `n` (1-based).
    pub fn cascade_bw(n: usize) -> FieldId {
        debug_assert!((1..=MAX_ORAL_FORMANTS).contains(&n));
        FieldId::from_index(FieldId::Cb1.index() + n - 1).unwrap()
    }

    /// Parallel formant frequency for formant `n` (1-based).
    pub fn parallel_freq(n: usize) -> FieldId {
        debug_assert!((1..=MAX_ORAL_FORMANTS).contains(&n));
        FieldId::from_index(FieldId::Pf1.index() + n - 1).unwrap()
    }

    /// Parallel formant bandwidth for formant `n` (1-based).
    pub fn parallel_bw(n: usize) -> FieldId {
        debug_assert!((1..=MAX_ORAL_FORMANTS).contains(&n));
        FieldId::from_index(FieldId::Pb1.index() + n - 1).unwrap()
    }

    /// Parallel formant amplitude for formant `n` (1-based).
    pub fn parallel_amp(n: usize) -> FieldId {
        debug_assert!((1..=MAX_ORAL_FORMANTS).contains(&n));
        FieldId::from_index(FieldId::Pa1.index() + n - 1).unwrap()
    }
}

/// A dense vector of Klatt parameters plus a set-mask.
///
/// Unset fields read as 0.0 through [`Frame::value`]; the mask tells callers
/// whether that zero was supplied or is a fallback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub values: [f64; FIELD_COUNT],
    pub set: u64,
}

impl Default for Frame {
    fn default() -> Self {
        Frame {
            values: [0.0; FIELD_COUNT],
            set: 0,
        }
    }
}

impl Frame {
    pub fn new() -> Self {
        Frame::default()
    }

    pub fn has(&self, id: FieldId) -> bool {
        self.set & (1u64 << id.index()) != 0
    }

    /// The field value, or 0.0 when unset.
    pub fn value(&self, id: FieldId) -> f64 {
        self.values[id.index()]
    }

    /// The field value only if it was explicitly supplied.
    pub fn get(&self, id: FieldId) -> Option<f64> {
        if self.has(id) {
            Some(self.values[id.index()])
        } else {
            None
        }
    }

    pub fn set(&mut self, id: FieldId, value: f64) {
        self.values[id.index()] = value;
        self.set |= 1u64 << id.index();
    }

    pub fn clear(&mut self, id: FieldId) {
        self.values[id.index()] = 0.0;
        self.set &= !(1u64 << id.index());
    }

    /// Builds a frame with every field of `self` kept where set, and every
    /// unset field filled from `under` where `under` has it.
    pub fn overlaid_on(&self, under: &Frame) -> Frame {
        let mut out = *under;
        for id in FieldId::all() {
            if self.has(id) {
                out.set(id, self.value(id));
            }
        }
        out
    }

    /// True when every supplied field is finite and within its legal range.
    ///
    /// The engine substitutes silence for frames that fail this check rather
    /// than propagating NaN into the filter state.
    pub fn is_well_formed(&self) -> bool {
        for id in FieldId::all() {
            if !self.has(id) {
                continue;
            }
            let v = self.value(id);
            if !v.is_finite() {
                return false;
            }
            // Frequencies and bandwidths must not be negative.
            let idx = id.index();
            let is_freq_or_bw = (FieldId::Cf1.index()..=FieldId::CbNP.index()).contains(&idx)
                || (FieldId::Pf1.index()..=FieldId::Pb6.index()).contains(&idx);
            if is_freq_or_bw && v < 0.0 {
                return false;
            }
        }
        if self.value(FieldId::VoiceAmplitude) > 0.0 && self.has(FieldId::VoicePitch) {
            if self.value(FieldId::VoicePitch) <= 0.0 {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_count_matches_enum() {
        assert_eq!(FieldId::EndVoicePitch.index(), FIELD_COUNT - 1);
        assert_eq!(FieldId::all().count(), FIELD_COUNT);
    }

    #[test]
    fn names_round_trip() {
        for id in FieldId::all() {
            assert_eq!(FieldId::from_name(id.name()), Some(id));
        }
        assert_eq!(FieldId::from_name("cf3"), Some(FieldId::Cf3));
        assert_eq!(FieldId::from_name("nonsense"), None);
    }

    #[test]
    fn formant_accessors() {
        assert_eq!(FieldId::cascade_freq(1), FieldId::Cf1);
        assert_eq!(FieldId::cascade_freq(6), FieldId::Cf6);
        assert_eq!(FieldId::parallel_amp(3), FieldId::Pa3);
    }

    #[test]
    fn set_mask_tracks_explicit_values() {
        let mut f = Frame::new();
        assert!(!f.has(FieldId::Cf1));
        assert_eq!(f.get(FieldId::Cf1), None);
        f.set(FieldId::Cf1, 700.0);
        assert!(f.has(FieldId::Cf1));
        assert_eq!(f.get(FieldId::Cf1), Some(700.0));
        f.clear(FieldId::Cf1);
        assert!(!f.has(FieldId::Cf1));
    }

    #[test]
    fn overlay_prefers_explicit_fields() {
        let mut def = Frame::new();
        def.set(FieldId::Cf1, 500.0);
        def.set(FieldId::Cf2, 1500.0);
        let mut tok = Frame::new();
        tok.set(FieldId::Cf2, 1800.0);
        let merged = tok.overlaid_on(&def);
        assert_eq!(merged.value(FieldId::Cf1), 500.0);
        assert_eq!(merged.value(FieldId::Cf2), 1800.0);
    }

    #[test]
    fn well_formed_rejects_nan_and_negative_freq() {
        let mut f = Frame::new();
        f.set(FieldId::Cf1, 700.0);
        assert!(f.is_well_formed());
        f.set(FieldId::Cf2, f64::NAN);
        assert!(!f.is_well_formed());
        let mut g = Frame::new();
        g.set(FieldId::Cb1, -10.0);
        assert!(!g.is_well_formed());
        let mut h = Frame::new();
        h.set(FieldId::VoiceAmplitude, 1.0);
        h.set(FieldId::VoicePitch, 0.0);
        assert!(!h.is_well_formed());
    }
}
