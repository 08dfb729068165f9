//! Phoneme definitions.

use crate::fields::{FieldId, Frame};
use crate::pack::schema::RawPhoneme;

/// Manner-of-articulation flags carried by every phoneme definition.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PhonemeFlags {
    pub is_vowel: bool,
    pub is_voiced: bool,
    pub is_stop: bool,
    pub is_nasal: bool,
    pub is_liquid: bool,
    pub is_semivowel: bool,
    pub is_tap: bool,
    pub is_trill: bool,
    pub is_affricate: bool,
}

/// A phoneme as it exists after pack merging: flags plus a default field
/// vector with a set-mask for the fields the pack actually supplies.
#[derive(Debug, Clone)]
pub struct PhonemeDef {
    /// The IPA key, e.g. `a`, `ʃ` or the tied pair `t͡ʃ`.
    pub key: String,
    pub flags: PhonemeFlags,
    /// Unset formant fields are filled from the adjacent token in the
    /// pipeline (used by `h` and inserted aspiration).
    pub copy_adjacent: bool,
    pub fields: Frame,
    /// Field names present in the pack but not known to the engine; kept for
    /// diagnostics.
    pub unknown_fields: Vec<String>,
}

impl PhonemeDef {
    pub fn from_raw(key: &str, raw: &RawPhoneme) -> PhonemeDef {
        let mut fields = Frame::new();
        let mut unknown_fields = Vec::new();
        for (name, value) in &raw.fields {
            match FieldId::from_name(name) {
                Some(id) => fields.set(id, *value),
                None => unknown_fields.push(name.clone()),
            }
        }
        PhonemeDef {
            key: key.to_owned(),
            flags: PhonemeFlags {
                is_vowel: raw.is_vowel.unwrap_or(false),
                is_voiced: raw.is_voiced.unwrap_or(false),
                is_stop: raw.is_stop.unwrap_or(false),
                is_nasal: raw.is_nasal.unwrap_or(false),
                is_liquid: raw.is_liquid.unwrap_or(false),
                is_semivowel: raw.is_semivowel.unwrap_or(false),
                is_tap: raw.is_tap.unwrap_or(false),
                is_trill: raw.is_trill.unwrap_or(false),
                is_affricate: raw.is_affricate.unwrap_or(false),
            },
            copy_adjacent: raw.copy_adjacent.unwrap_or(false),
            fields,
            unknown_fields,
        }
    }

    /// The def's field value if supplied, else 0.0.
    pub fn field(&self, id: FieldId) -> f64 {
        self.fields.value(id)
    }

    /// Vowels and semivowels both anchor coarticulation.
    pub fn is_vowel_like(&self) -> bool {
        self.flags.is_vowel || self.flags.is_semivowel
    }

    /// Stops and affricates share closure/burst behavior.
    pub fn is_stop_like(&self) -> bool {
        self.flags.is_stop || self.flags.is_affricate
    }

    /// Fricative-ness is represented by a non-zero frication amplitude.
    pub fn is_fricative_like(&self) -> bool {
        self.field(FieldId::FricationAmplitude) > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_maps_fields_and_flags() {
        let raw: RawPhoneme = serde_yaml::from_str(
            "_isVowel: true\n_isVoiced: true\ncf1: 700\ncb1: 90\nbogusField: 3\n",
        )
        .unwrap();
        let def = PhonemeDef::from_raw("a", &raw);
        assert!(def.flags.is_vowel);
        assert!(def.flags.is_voiced);
        assert!(!def.flags.is_stop);
        assert_eq!(def.field(FieldId::Cf1), 700.0);
        assert!(def.fields.has(FieldId::Cb1));
        assert!(!def.fields.has(FieldId::Cf2));
        assert_eq!(def.unknown_fields, vec!["bogusField".to_owned()]);
    }

    #[test]
    fn fricative_like_follows_frication_amplitude() {
        let raw: RawPhoneme = serde_yaml::from_str("fricationAmplitude: 0.8\n").unwrap();
        let def = PhonemeDef::from_raw("s", &raw);
        assert!(def.is_fricative_like());
        let silent: RawPhoneme = serde_yaml::from_str("cf1: 500\n").unwrap();
        assert!(!PhonemeDef::from_raw("a", &silent).is_fricative_like());
    }
}
