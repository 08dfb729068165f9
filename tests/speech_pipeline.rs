//! End-to-end frontend scenarios against the bundled reference pack.

use klatt_tts::{bundled_pack_dir, Engine, FieldId, Frame, SpeechParams, Synthesizer};

const SAMPLE_RATE: usize = 22050;

#[derive(Debug, Clone)]
struct Emitted {
    frame: Option<Frame>,
    duration_ms: f64,
    fade_ms: f64,
    user_index: i32,
}

fn collect(synth: &Synthesizer, ipa: &str, params: SpeechParams) -> Vec<Emitted> {
    let mut frames = Vec::new();
    synth
        .queue_ipa(ipa, params, |frame, duration_ms, fade_ms, user_index| {
            frames.push(Emitted {
                frame: frame.copied(),
                duration_ms,
                fade_ms,
                user_index,
            });
        })
        .unwrap();
    frames
}

fn en_synth() -> Synthesizer {
    let synth = Synthesizer::new(bundled_pack_dir());
    synth.set_language("en").unwrap();
    synth
}

#[test]
fn scenario_silence_only() {
    let synth = en_synth();
    let frames = collect(&synth, "", SpeechParams::default());
    assert!(frames.is_empty());
    assert!(synth.last_error().is_empty());

    let engine = Engine::new(SAMPLE_RATE, 64);
    let mut out = vec![3i16; 2048];
    assert_eq!(engine.synthesize(&mut out), 2048);
    assert!(out.iter().all(|&s| s == 0));
}

#[test]
fn scenario_single_vowel() {
    let synth = en_synth();
    let frames = collect(&synth, "a", SpeechParams::default());
    assert_eq!(frames.len(), 1);
    let e = &frames[0];
    let f = e.frame.as_ref().expect("vowel frame must not be silence");
    assert!((e.duration_ms - 130.0).abs() < 1.0, "duration {}", e.duration_ms);
    assert!(e.fade_ms <= e.duration_ms);
    assert!((f.value(FieldId::Cf1) - 700.0).abs() < 30.0);
    assert!((f.value(FieldId::Cf2) - 1220.0).abs() < 60.0);
}

#[test]
fn scenario_velar_pinch_on_ki() {
    let synth = en_synth();
    let frames = collect(&synth, "ki", SpeechParams::default());
    let k = frames[0].frame.as_ref().expect("k frame");
    // i's F2 is 2250; the pinch target is 2250 * 0.95 = 2137.5. The default
    // velar burst F2 is 1800, so at least 30% of the distance is ~101 Hz.
    let pf2 = k.value(FieldId::Pf2);
    assert!(pf2 >= 1800.0 + 0.3 * (2137.5 - 1800.0), "pf2 = {pf2}");
    let cf2 = k.value(FieldId::Cf2);
    assert!(cf2 > 1800.0, "cf2 = {cf2}");
}

#[test]
fn scenario_inter_segment_gap() {
    let synth = en_synth();
    let first = collect(&synth, "a", SpeechParams::default());
    assert!(
        first.iter().all(|e| e.frame.is_some()),
        "no gap before the first call"
    );
    let second = collect(&synth, "a", SpeechParams::default());
    assert!(second[0].frame.is_none(), "expected a leading silence frame");
    assert!(
        (second[0].duration_ms - 20.0).abs() < 1.0,
        "gap duration {}",
        second[0].duration_ms
    );
    assert_eq!(second[0].user_index, -1);
    assert!(second[1].frame.is_some());
}

#[test]
fn scenario_length_mark() {
    let synth = en_synth();
    let frames = collect(&synth, "aː", SpeechParams::default());
    assert_eq!(frames.len(), 1);
    assert!(
        (frames[0].duration_ms - 130.0 * 1.8).abs() < 1.0,
        "duration {}",
        frames[0].duration_ms
    );
}

#[test]
fn scenario_clause_pitch() {
    let falling = {
        let synth = en_synth();
        let params = SpeechParams {
            clause_type: '.',
            ..SpeechParams::default()
        };
        collect(&synth, "ha", params)
    };
    let rising = {
        let synth = en_synth();
        let params = SpeechParams {
            clause_type: '?',
            ..SpeechParams::default()
        };
        collect(&synth, "ha", params)
    };
    let last_voiced = |frames: &[Emitted]| -> f64 {
        frames
            .iter()
            .rev()
            .filter_map(|e| e.frame.as_ref())
            .find(|f| f.value(FieldId::VoiceAmplitude) > 0.0)
            .map(|f| f.value(FieldId::EndVoicePitch))
            .unwrap()
    };
    let f = last_voiced(&falling);
    let r = last_voiced(&rising);
    assert!(r > f, "question must end higher: ? = {r}, . = {f}");
}

#[test]
fn total_duration_scales_with_speed() {
    let total = |speed: f64| -> f64 {
        let synth = en_synth();
        let params = SpeechParams {
            speed,
            ..SpeechParams::default()
        };
        collect(&synth, "masa", params)
            .iter()
            .map(|e| e.duration_ms)
            .sum()
    };
    let at_1 = total(1.0);
    let at_2 = total(2.0);
    let tolerance = 8.0; // one token may sit on a duration floor
    assert!(
        (at_1 / 2.0 - at_2).abs() < tolerance,
        "speed 1: {at_1}, speed 2: {at_2}"
    );
}

#[test]
fn emitted_fields_are_finite_and_fades_bounded() {
    let synth = en_synth();
    let frames = collect(&synth, "ˈmaski tula, ˈd͡ʒasa", SpeechParams::default());
    assert!(!frames.is_empty());
    for e in &frames {
        assert!(e.duration_ms >= 0.0);
        assert!(e.fade_ms >= 0.0);
        assert!(e.fade_ms <= e.duration_ms + 1e-9);
        if let Some(f) = &e.frame {
            for id in FieldId::all() {
                assert!(f.value(id).is_finite(), "{} not finite", id.name());
            }
            if f.value(FieldId::VoiceAmplitude) > 0.0 {
                assert!(f.value(FieldId::VoicePitch) > 0.0);
            }
        }
    }
}

#[test]
fn user_indices_count_up_from_base() {
    let synth = en_synth();
    let frames = collect(
        &synth,
        "ka",
        SpeechParams {
            user_index_base: 7,
            ..SpeechParams::default()
        },
    );
    let indices: Vec<i32> = frames.iter().map(|e| e.user_index).collect();
    for (a, b) in indices.iter().zip(indices.iter().skip(1)) {
        assert_eq!(b - a, 1);
    }
    assert_eq!(indices[0], 7);
}

#[test]
fn set_language_is_idempotent_for_rendered_audio() {
    let render = |relabel: bool| -> Vec<i16> {
        let synth = Synthesizer::new(bundled_pack_dir());
        synth.set_language("en").unwrap();
        if relabel {
            synth.set_language("en").unwrap();
        }
        let engine = Engine::new(SAMPLE_RATE, 256);
        synth
            .queue_ipa("ˈkasa", SpeechParams::default(), |f, d, fd, i| {
                engine.queue_frame(f.copied(), d, fd, i);
            })
            .unwrap();
        let mut out = vec![0i16; SAMPLE_RATE];
        engine.synthesize(&mut out);
        out
    };
    assert_eq!(render(false), render(true));
}

#[test]
fn full_pipeline_is_deterministic() {
    let render = || -> Vec<i16> {
        let synth = en_synth();
        let engine = Engine::new(SAMPLE_RATE, 256);
        synth
            .queue_ipa(
                "həˈloʊ ˈwɜɹld",
                SpeechParams {
                    base_pitch: 110.0,
                    ..SpeechParams::default()
                },
                |f, d, fd, i| {
                    engine.queue_frame(f.copied(), d, fd, i);
                },
            )
            .unwrap();
        let mut out = vec![0i16; SAMPLE_RATE * 2];
        engine.synthesize(&mut out);
        out
    };
    let a = render();
    assert_eq!(a, render());
    let energy: i64 = a.iter().map(|&s| (s as i64).abs()).sum();
    assert!(energy > 0, "speech rendered as silence");
}

#[test]
fn unknown_symbols_do_not_abort() {
    let synth = en_synth();
    let mut count = 0usize;
    let stats = synth
        .queue_ipa("β", SpeechParams::default(), |_, _, _, _| count += 1)
        .unwrap();
    // β is aliased to b in the default pack, so it actually resolves; a
    // genuinely unknown symbol is dropped.
    assert_eq!(stats.unknown_symbols, 0);
    assert!(count > 0);

    let synth = en_synth();
    let stats = synth
        .queue_ipa("a\u{2603}a", SpeechParams::default(), |_, _, _, _| {})
        .unwrap();
    assert_eq!(stats.unknown_symbols, 1);
    assert!(synth.last_error().is_empty());
}
