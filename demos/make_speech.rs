use hound::{SampleFormat, WavSpec, WavWriter};
use klatt_tts::{bundled_pack_dir, Engine, SpeechParams, Synthesizer};

const SAMPLE_RATE: usize = 22050;

fn main() {
    let engine = Engine::new(SAMPLE_RATE, 256);
    let synth = Synthesizer::new(bundled_pack_dir());
    if let Err(e) = synth.set_language("en") {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let params = SpeechParams {
        speed: 1.0,
        base_pitch: 110.0,
        inflection: 0.5,
        clause_type: '.',
        user_index_base: 0,
    };
    let stats = synth
        .queue_ipa("həˈloʊ ˈwɜɹld", params, |frame, min_ms, fade_ms, index| {
            engine.queue_frame(frame.copied(), min_ms, fade_ms, index);
        })
        .unwrap_or_else(|e| {
            eprintln!("Error: {e}");
            std::process::exit(1);
        });
    println!(
        "queued {} frames ({} unknown symbols)",
        stats.frames_emitted, stats.unknown_symbols
    );

    let mut wav = WavWriter::create(
        "out.wav",
        WavSpec {
            channels: 1,
            sample_rate: SAMPLE_RATE as u32,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        },
    )
    .unwrap();

    // Render two seconds; the queue drains into silence at the end.
    let mut buf = vec![0i16; SAMPLE_RATE / 10];
    for _ in 0..20 {
        engine.synthesize(&mut buf);
        for &s in &buf {
            wav.write_sample(s).unwrap();
        }
    }
    wav.finalize().unwrap();
    println!("wrote out.wav, last index {}", engine.last_index());
}
