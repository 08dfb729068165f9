//! Raw serde document types for pack files.
//!
//! These mirror the YAML layout one-to-one and stay `Option`-heavy so that a
//! language layer can override a single value without restating the rest.
//! The typed, defaulted forms live in [`crate::pack::lang`] and
//! [`crate::pack::phoneme`]; conversion happens after all layers are merged.

use std::collections::BTreeMap;

use serde::Deserialize;

/// `phonemes.yaml`, and the optional `phonemes:` override section of a
/// language file.
#[derive(Debug, Default, Deserialize)]
pub struct PhonemeDoc {
    #[serde(default)]
    pub phonemes: BTreeMap<String, RawPhoneme>,
}

/// One phoneme entry: underscore-prefixed flags plus free-form numeric
/// synthesis fields collected by name.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RawPhoneme {
    #[serde(rename = "_isVowel")]
    pub is_vowel: Option<bool>,
    #[serde(rename = "_isVoiced")]
    pub is_voiced: Option<bool>,
    #[serde(rename = "_isStop")]
    pub is_stop: Option<bool>,
    #[serde(rename = "_isNasal")]
    pub is_nasal: Option<bool>,
    #[serde(rename = "_isLiquid")]
    pub is_liquid: Option<bool>,
    #[serde(rename = "_isSemivowel")]
    pub is_semivowel: Option<bool>,
    #[serde(rename = "_isTap")]
    pub is_tap: Option<bool>,
    #[serde(rename = "_isTrill")]
    pub is_trill: Option<bool>,
    #[serde(rename = "_isAfricate")]
    pub is_affricate: Option<bool>,
    #[serde(rename = "_copyAdjacent")]
    pub copy_adjacent: Option<bool>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, f64>,
}

impl RawPhoneme {
    /// Overlays `other` on top of `self`: explicit flags and fields of
    /// `other` win, everything else is kept.
    pub fn merged_with(&self, other: &RawPhoneme) -> RawPhoneme {
        let mut out = self.clone();
        macro_rules! take {
            ($field:ident) => {
                if other.$field.is_some() {
                    out.$field = other.$field;
                }
            };
        }
        take!(is_vowel);
        take!(is_voiced);
        take!(is_stop);
        take!(is_nasal);
        take!(is_liquid);
        take!(is_semivowel);
        take!(is_tap);
        take!(is_trill);
        take!(is_affricate);
        take!(copy_adjacent);
        for (k, v) in &other.fields {
            out.fields.insert(k.clone(), *v);
        }
        out
    }
}

/// A `lang/<tag>.yaml` document.
#[derive(Debug, Default, Deserialize)]
pub struct LangDoc {
    #[serde(default)]
    pub settings: RawSettings,
    #[serde(default)]
    pub normalization: RawNormalization,
    #[serde(default)]
    pub intonation: BTreeMap<String, RawContour>,
    #[serde(default)]
    pub tones: BTreeMap<String, [f64; 2]>,
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    #[serde(default)]
    pub phonemes: BTreeMap<String, RawPhoneme>,
}

/// The flat scalar `settings:` mapping. Every knob is optional; absent keys
/// fall through to the previous layer and finally to built-in defaults.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSettings {
    // Segmentation and closure behavior.
    pub stop_closure_mode: Option<String>,
    pub post_stop_aspiration_enabled: Option<bool>,
    pub tonal: Option<bool>,
    pub segment_boundary_gap_ms: Option<f64>,
    pub segment_boundary_fade_ms: Option<f64>,

    // Base durations per phoneme class.
    pub default_duration_ms: Option<f64>,
    pub default_fade_ms: Option<f64>,
    pub vowel_duration_ms: Option<f64>,
    pub stop_duration_ms: Option<f64>,
    pub affricate_duration_ms: Option<f64>,
    pub tap_duration_ms: Option<f64>,
    pub trill_duration_ms: Option<f64>,
    pub nasal_duration_ms: Option<f64>,
    pub liquid_duration_ms: Option<f64>,
    pub semivowel_duration_ms: Option<f64>,
    pub unvoiced_duration_ms: Option<f64>,
    pub liquid_into_vowel_fade_ms: Option<f64>,
    pub min_vowel_duration_ms: Option<f64>,

    // Inserted micro-gaps.
    pub pre_stop_gap_ms: Option<f64>,
    pub post_stop_aspiration_ms: Option<f64>,
    pub cluster_gap_ms: Option<f64>,
    pub vowel_hiatus_gap_ms: Option<f64>,

    // Stress and length.
    pub length_mark_multiplier: Option<f64>,
    pub primary_stress_duration_scale: Option<f64>,
    pub secondary_stress_duration_scale: Option<f64>,
    pub stress_amplitude_boost: Option<f64>,

    // Boundary smoothing.
    pub boundary_smoothing_enabled: Option<bool>,
    pub boundary_smoothing_vowel_to_stop_fade_ms: Option<f64>,
    pub boundary_smoothing_stop_to_vowel_fade_ms: Option<f64>,
    pub boundary_smoothing_vowel_to_fric_fade_ms: Option<f64>,
    pub boundary_smoothing_max_skip_silence_ms: Option<f64>,

    // Coarticulation.
    pub coarticulation_enabled: Option<bool>,
    pub coarticulation_strength: Option<f64>,
    pub coarticulation_transition_extent: Option<f64>,
    pub coarticulation_adjacency_max_consonants: Option<f64>,
    pub coarticulation_graduated: Option<bool>,
    pub coarticulation_cross_word_enabled: Option<bool>,
    pub coarticulation_labial_f2_locus: Option<f64>,
    pub coarticulation_alveolar_f2_locus: Option<f64>,
    pub coarticulation_velar_f2_locus: Option<f64>,
    pub coarticulation_velar_pinch_enabled: Option<bool>,
    pub coarticulation_velar_pinch_threshold: Option<f64>,
    pub coarticulation_velar_pinch_f2_scale: Option<f64>,
    pub coarticulation_velar_pinch_f3: Option<f64>,
    pub coarticulation_fade_into_consonants: Option<bool>,
    pub coarticulation_word_initial_fade_scale: Option<f64>,

    // Trajectory limiting.
    pub trajectory_limit_enabled: Option<bool>,
    pub trajectory_limit_max_slope_hz_per_ms: Option<f64>,
}

impl RawSettings {
    pub fn merged_with(&self, other: &RawSettings) -> RawSettings {
        macro_rules! overlay {
            ($($field:ident),+ $(,)?) => {
                RawSettings {
                    $($field: other.$field.clone().or_else(|| self.$field.clone()),)+
                }
            };
        }
        overlay!(
            stop_closure_mode,
            post_stop_aspiration_enabled,
            tonal,
            segment_boundary_gap_ms,
            segment_boundary_fade_ms,
            default_duration_ms,
            default_fade_ms,
            vowel_duration_ms,
            stop_duration_ms,
            affricate_duration_ms,
            tap_duration_ms,
            trill_duration_ms,
            nasal_duration_ms,
            liquid_duration_ms,
            semivowel_duration_ms,
            unvoiced_duration_ms,
            liquid_into_vowel_fade_ms,
            min_vowel_duration_ms,
            pre_stop_gap_ms,
            post_stop_aspiration_ms,
            cluster_gap_ms,
            vowel_hiatus_gap_ms,
            length_mark_multiplier,
            primary_stress_duration_scale,
            secondary_stress_duration_scale,
            stress_amplitude_boost,
            boundary_smoothing_enabled,
            boundary_smoothing_vowel_to_stop_fade_ms,
            boundary_smoothing_stop_to_vowel_fade_ms,
            boundary_smoothing_vowel_to_fric_fade_ms,
            boundary_smoothing_max_skip_silence_ms,
            coarticulation_enabled,
            coarticulation_strength,
            coarticulation_transition_extent,
            coarticulation_adjacency_max_consonants,
            coarticulation_graduated,
            coarticulation_cross_word_enabled,
            coarticulation_labial_f2_locus,
            coarticulation_alveolar_f2_locus,
            coarticulation_velar_f2_locus,
            coarticulation_velar_pinch_enabled,
            coarticulation_velar_pinch_threshold,
            coarticulation_velar_pinch_f2_scale,
            coarticulation_velar_pinch_f3,
            coarticulation_fade_into_consonants,
            coarticulation_word_initial_fade_scale,
            trajectory_limit_enabled,
            trajectory_limit_max_slope_hz_per_ms,
        )
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct RawNormalization {
    #[serde(default)]
    pub classes: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub replacements: Vec<RawReplacement>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawReplacement {
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub when: Option<RawGuard>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGuard {
    pub before_class: Option<String>,
    pub after_class: Option<String>,
    #[serde(default)]
    pub word_initial: bool,
    #[serde(default)]
    pub word_final: bool,
}

/// One clause-type intonation contour. Pitch values are percentages mapped
/// onto the inflection range around the base pitch.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawContour {
    pub pre_head_start: f64,
    pub pre_head_end: f64,
    pub head_extend_from: usize,
    pub head_start: f64,
    pub head_end: f64,
    pub head_steps: Vec<f64>,
    pub head_stress_end_delta: f64,
    pub head_unstressed_run_start_delta: f64,
    pub head_unstressed_run_end_delta: f64,
    pub nucleus0_start: f64,
    pub nucleus0_end: f64,
    pub nucleus_start: f64,
    pub nucleus_end: f64,
    pub tail_start: f64,
    pub tail_end: f64,
}
