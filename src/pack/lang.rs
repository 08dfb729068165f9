//! The typed, fully-defaulted language pack.
//!
//! Built from the merged raw layers; every knob has a value from here on so
//! the passes never deal with `Option`.

use std::collections::BTreeMap;

use crate::pack::schema::{RawContour, RawGuard, RawNormalization, RawReplacement, RawSettings};

/// When to insert a closure gap before a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopClosureMode {
    #[default]
    Always,
    AfterVowel,
    Never,
}

impl StopClosureMode {
    fn parse(s: &str) -> StopClosureMode {
        match s {
            "afterVowel" => StopClosureMode::AfterVowel,
            "never" => StopClosureMode::Never,
            _ => StopClosureMode::Always,
        }
    }
}

/// One ordered normalization replacement with optional context guards.
#[derive(Debug, Clone)]
pub struct NormRule {
    pub from: String,
    pub to: String,
    pub before_class: Option<String>,
    pub after_class: Option<String>,
    pub word_initial: bool,
    pub word_final: bool,
}

impl NormRule {
    fn from_raw(raw: &RawReplacement) -> NormRule {
        let guard = raw.when.clone().unwrap_or_else(RawGuard::default);
        NormRule {
            from: raw.from.clone(),
            to: raw.to.clone(),
            before_class: guard.before_class,
            after_class: guard.after_class,
            word_initial: guard.word_initial,
            word_final: guard.word_final,
        }
    }
}

/// Intonation contour for one clause type, in pitch percentages.
#[derive(Debug, Clone)]
pub struct IntonationContour {
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

impl IntonationContour {
    fn from_raw(raw: &RawContour) -> IntonationContour {
        IntonationContour {
            pre_head_start: raw.pre_head_start,
            pre_head_end: raw.pre_head_end,
            head_extend_from: raw.head_extend_from,
            head_start: raw.head_start,
            head_end: raw.head_end,
            head_steps: raw.head_steps.clone(),
            head_stress_end_delta: raw.head_stress_end_delta,
            head_unstressed_run_start_delta: raw.head_unstressed_run_start_delta,
            head_unstressed_run_end_delta: raw.head_unstressed_run_end_delta,
            nucleus0_start: raw.nucleus0_start,
            nucleus0_end: raw.nucleus0_end,
            nucleus_start: raw.nucleus_start,
            nucleus_end: raw.nucleus_end,
            tail_start: raw.tail_start,
            tail_end: raw.tail_end,
        }
    }

    /// A flat fallback used when a pack ships no contour for a clause type.
    fn flat() -> IntonationContour {
        IntonationContour {
            pre_head_start: 50.0,
            pre_head_end: 50.0,
            head_extend_from: 0,
            head_start: 50.0,
            head_end: 50.0,
            head_steps: vec![50.0],
            head_stress_end_delta: 0.0,
            head_unstressed_run_start_delta: 0.0,
            head_unstressed_run_end_delta: 0.0,
            nucleus0_start: 50.0,
            nucleus0_end: 50.0,
            nucleus_start: 50.0,
            nucleus_end: 50.0,
            tail_start: 50.0,
            tail_end: 50.0,
        }
    }
}

/// The merged, immutable language pack.
#[derive(Debug, Clone)]
pub struct LanguagePack {
    pub stop_closure_mode: StopClosureMode,
    pub post_stop_aspiration_enabled: bool,
    pub tonal: bool,
    pub segment_boundary_gap_ms: f64,
    pub segment_boundary_fade_ms: f64,

    pub default_duration_ms: f64,
    pub default_fade_ms: f64,
    pub vowel_duration_ms: f64,
    pub stop_duration_ms: f64,
    pub affricate_duration_ms: f64,
    pub tap_duration_ms: f64,
    pub trill_duration_ms: f64,
    pub nasal_duration_ms: f64,
    pub liquid_duration_ms: f64,
    pub semivowel_duration_ms: f64,
    pub unvoiced_duration_ms: f64,
    pub liquid_into_vowel_fade_ms: f64,
    pub min_vowel_duration_ms: f64,

    pub pre_stop_gap_ms: f64,
    pub post_stop_aspiration_ms: f64,
    pub cluster_gap_ms: f64,
    pub vowel_hiatus_gap_ms: f64,

    pub length_mark_multiplier: f64,
    pub primary_stress_duration_scale: f64,
    pub secondary_stress_duration_scale: f64,
    pub stress_amplitude_boost: f64,

    pub boundary_smoothing_enabled: bool,
    pub boundary_smoothing_vowel_to_stop_fade_ms: f64,
    pub boundary_smoothing_stop_to_vowel_fade_ms: f64,
    pub boundary_smoothing_vowel_to_fric_fade_ms: f64,
    pub boundary_smoothing_max_skip_silence_ms: f64,

    pub coarticulation_enabled: bool,
    pub coarticulation_strength: f64,
    pub coarticulation_transition_extent: f64,
    pub coarticulation_adjacency_max_consonants: f64,
    pub coarticulation_graduated: bool,
    pub coarticulation_cross_word_enabled: bool,
    pub coarticulation_labial_f2_locus: f64,
    pub coarticulation_alveolar_f2_locus: f64,
    pub coarticulation_velar_f2_locus: f64,
    pub coarticulation_velar_pinch_enabled: bool,
    pub coarticulation_velar_pinch_threshold: f64,
    pub coarticulation_velar_pinch_f2_scale: f64,
    pub coarticulation_velar_pinch_f3: f64,
    pub coarticulation_fade_into_consonants: bool,
    pub coarticulation_word_initial_fade_scale: f64,

    pub trajectory_limit_enabled: bool,
    pub trajectory_limit_max_slope_hz_per_ms: f64,

    pub normalization_classes: BTreeMap<String, Vec<String>>,
    pub normalization_rules: Vec<NormRule>,
    pub intonation: BTreeMap<char, IntonationContour>,
    pub tones: BTreeMap<String, [f64; 2]>,
    pub aliases: BTreeMap<String, String>,
}

impl LanguagePack {
    /// Builds the typed pack from fully merged raw sections, filling every
    /// absent setting with its built-in default.
    pub fn from_merged(
        settings: &RawSettings,
        normalization: &RawNormalization,
        intonation: &BTreeMap<String, RawContour>,
        tones: &BTreeMap<String, [f64; 2]>,
        aliases: &BTreeMap<String, String>,
    ) -> LanguagePack {
        let s = settings;
        LanguagePack {
            stop_closure_mode: s
                .stop_closure_mode
                .as_deref()
                .map(StopClosureMode::parse)
                .unwrap_or_default(),
            post_stop_aspiration_enabled: s.post_stop_aspiration_enabled.unwrap_or(true),
            tonal: s.tonal.unwrap_or(false),
            segment_boundary_gap_ms: s.segment_boundary_gap_ms.unwrap_or(0.0),
            segment_boundary_fade_ms: s.segment_boundary_fade_ms.unwrap_or(0.0),

            default_duration_ms: s.default_duration_ms.unwrap_or(60.0),
            default_fade_ms: s.default_fade_ms.unwrap_or(10.0),
            vowel_duration_ms: s.vowel_duration_ms.unwrap_or(130.0),
            stop_duration_ms: s.stop_duration_ms.unwrap_or(25.0),
            affricate_duration_ms: s.affricate_duration_ms.unwrap_or(70.0),
            tap_duration_ms: s.tap_duration_ms.unwrap_or(20.0),
            trill_duration_ms: s.trill_duration_ms.unwrap_or(45.0),
            nasal_duration_ms: s.nasal_duration_ms.unwrap_or(60.0),
            liquid_duration_ms: s.liquid_duration_ms.unwrap_or(60.0),
            semivowel_duration_ms: s.semivowel_duration_ms.unwrap_or(60.0),
            unvoiced_duration_ms: s.unvoiced_duration_ms.unwrap_or(90.0),
            liquid_into_vowel_fade_ms: s.liquid_into_vowel_fade_ms.unwrap_or(25.0),
            min_vowel_duration_ms: s.min_vowel_duration_ms.unwrap_or(18.0),

            pre_stop_gap_ms: s.pre_stop_gap_ms.unwrap_or(41.0),
            post_stop_aspiration_ms: s.post_stop_aspiration_ms.unwrap_or(20.0),
            cluster_gap_ms: s.cluster_gap_ms.unwrap_or(25.0),
            vowel_hiatus_gap_ms: s.vowel_hiatus_gap_ms.unwrap_or(30.0),

            length_mark_multiplier: s.length_mark_multiplier.unwrap_or(1.8),
            primary_stress_duration_scale: s.primary_stress_duration_scale.unwrap_or(1.25),
            secondary_stress_duration_scale: s.secondary_stress_duration_scale.unwrap_or(1.07),
            stress_amplitude_boost: s.stress_amplitude_boost.unwrap_or(1.12),

            boundary_smoothing_enabled: s.boundary_smoothing_enabled.unwrap_or(true),
            boundary_smoothing_vowel_to_stop_fade_ms: s
                .boundary_smoothing_vowel_to_stop_fade_ms
                .unwrap_or(15.0),
            boundary_smoothing_stop_to_vowel_fade_ms: s
                .boundary_smoothing_stop_to_vowel_fade_ms
                .unwrap_or(20.0),
            boundary_smoothing_vowel_to_fric_fade_ms: s
                .boundary_smoothing_vowel_to_fric_fade_ms
                .unwrap_or(12.0),
            boundary_smoothing_max_skip_silence_ms: s
                .boundary_smoothing_max_skip_silence_ms
                .unwrap_or(60.0),

            coarticulation_enabled: s.coarticulation_enabled.unwrap_or(true),
            coarticulation_strength: s.coarticulation_strength.unwrap_or(0.5),
            coarticulation_transition_extent: s.coarticulation_transition_extent.unwrap_or(0.5),
            coarticulation_adjacency_max_consonants: s
                .coarticulation_adjacency_max_consonants
                .unwrap_or(2.0),
            coarticulation_graduated: s.coarticulation_graduated.unwrap_or(true),
            coarticulation_cross_word_enabled: s.coarticulation_cross_word_enabled.unwrap_or(false),
            coarticulation_labial_f2_locus: s.coarticulation_labial_f2_locus.unwrap_or(900.0),
            coarticulation_alveolar_f2_locus: s.coarticulation_alveolar_f2_locus.unwrap_or(1700.0),
            coarticulation_velar_f2_locus: s.coarticulation_velar_f2_locus.unwrap_or(2300.0),
            coarticulation_velar_pinch_enabled: s
                .coarticulation_velar_pinch_enabled
                .unwrap_or(true),
            coarticulation_velar_pinch_threshold: s
                .coarticulation_velar_pinch_threshold
                .unwrap_or(1500.0),
            coarticulation_velar_pinch_f2_scale: s
                .coarticulation_velar_pinch_f2_scale
                .unwrap_or(0.95),
            coarticulation_velar_pinch_f3: s.coarticulation_velar_pinch_f3.unwrap_or(2500.0),
            coarticulation_fade_into_consonants: s
                .coarticulation_fade_into_consonants
                .unwrap_or(true),
            coarticulation_word_initial_fade_scale: s
                .coarticulation_word_initial_fade_scale
                .unwrap_or(0.5),

            trajectory_limit_enabled: s.trajectory_limit_enabled.unwrap_or(true),
            trajectory_limit_max_slope_hz_per_ms: s
                .trajectory_limit_max_slope_hz_per_ms
                .unwrap_or(40.0),

            normalization_classes: normalization.classes.clone(),
            normalization_rules: normalization.replacements.iter().map(NormRule::from_raw).collect(),
            intonation: intonation
                .iter()
                .filter_map(|(k, v)| {
                    k.chars().next().map(|c| (c, IntonationContour::from_raw(v)))
                })
                .collect(),
            tones: tones.clone(),
            aliases: aliases.clone(),
        }
    }

    /// The contour for a clause type, falling back to `.` and then flat.
    pub fn contour(&self, clause_type: char) -> IntonationContour {
        self.intonation
            .get(&clause_type)
            .or_else(|| self.intonation.get(&'.'))
            .cloned()
            .unwrap_or_else(IntonationContour::flat)
    }

    /// True when `symbol` belongs to the named normalization class.
    pub fn class_contains(&self, class: &str, symbol: &str) -> bool {
        self.normalization_classes
            .get(class)
            .map(|syms| syms.iter().any(|s| s == symbol))
            .unwrap_or(false)
    }
}
