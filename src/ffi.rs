//! C-linkage API for the engine and the frontend.
//!
//! Everything here is panic-free: bodies are wrapped in `catch_unwind` and
//! report failure through return codes, never across the boundary. All
//! functions tolerate null handles. Samples are signed 16-bit little-endian
//! mono.

#![allow(unsafe_code)]

use std::ffi::{c_char, c_int, c_uint, c_void, CStr, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};

use parking_lot::Mutex;

use crate::engine::Engine;
use crate::fields::{Frame, FIELD_COUNT};
use crate::front::{SpeechParams, Synthesizer};

/// The frame struct as it crosses the FFI boundary: 47 consecutive doubles
/// in [`crate::fields::FieldId`] order.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CFrame {
    pub voice_pitch: f64,
    pub vibrato_pitch_offset: f64,
    pub vibrato_speed: f64,
    pub voice_turbulence_amplitude: f64,
    pub glottal_open_quotient: f64,
    pub voice_amplitude: f64,
    pub aspiration_amplitude: f64,
    pub cf1: f64,
    pub cf2: f64,
    pub cf3: f64,
    pub cf4: f64,
    pub cf5: f64,
    pub cf6: f64,
    pub cf_n0: f64,
    pub cf_np: f64,
    pub cb1: f64,
    pub cb2: f64,
    pub cb3: f64,
    pub cb4: f64,
    pub cb5: f64,
    pub cb6: f64,
    pub cb_n0: f64,
    pub cb_np: f64,
    pub ca_np: f64,
    pub frication_amplitude: f64,
    pub pf1: f64,
    pub pf2: f64,
    pub pf3: f64,
    pub pf4: f64,
    pub pf5: f64,
    pub pf6: f64,
    pub pb1: f64,
    pub pb2: f64,
    pub pb3: f64,
    pub pb4: f64,
    pub pb5: f64,
    pub pb6: f64,
    pub pa1: f64,
    pub pa2: f64,
    pub pa3: f64,
    pub pa4: f64,
    pub pa5: f64,
    pub pa6: f64,
    pub parallel_bypass: f64,
    pub pre_formant_gain: f64,
    pub output_gain: f64,
    pub end_voice_pitch: f64,
}

impl CFrame {
    fn as_values(&self) -> [f64; FIELD_COUNT] {
        [
            self.voice_pitch,
            self.vibrato_pitch_offset,
            self.vibrato_speed,
            self.voice_turbulence_amplitude,
            self.glottal_open_quotient,
            self.voice_amplitude,
            self.aspiration_amplitude,
            self.cf1,
            self.cf2,
            self.cf3,
            self.cf4,
            self.cf5,
            self.cf6,
            self.cf_n0,
            self.cf_np,
            self.cb1,
            self.cb2,
            self.cb3,
            self.cb4,
            self.cb5,
            self.cb6,
            self.cb_n0,
            self.cb_np,
            self.ca_np,
            self.frication_amplitude,
            self.pf1,
            self.pf2,
            self.pf3,
            self.pf4,
            self.pf5,
            self.pf6,
            self.pb1,
            self.pb2,
            self.pb3,
            self.pb4,
            self.pb5,
            self.pb6,
            self.pa1,
            self.pa2,
            self.pa3,
            self.pa4,
            self.pa5,
            self.pa6,
            self.parallel_bypass,
            self.pre_formant_gain,
            self.output_gain,
            self.end_voice_pitch,
        ]
    }

    fn to_frame(self) -> Frame {
        Frame {
            values: self.as_values(),
            set: (1u64 << FIELD_COUNT) - 1,
        }
    }

    fn from_frame(frame: &Frame) -> CFrame {
        let v = &frame.values;
        CFrame {
            voice_pitch: v[0],
            vibrato_pitch_offset: v[1],
            vibrato_speed: v[2],
            voice_turbulence_amplitude: v[3],
            glottal_open_quotient: v[4],
            voice_amplitude: v[5],
            aspiration_amplitude: v[6],
            cf1: v[7],
            cf2: v[8],
            cf3: v[9],
            cf4: v[10],
            cf5: v[11],
            cf6: v[12],
            cf_n0: v[13],
            cf_np: v[14],
            cb1: v[15],
            cb2: v[16],
            cb3: v[17],
            cb4: v[18],
            cb5: v[19],
            cb6: v[20],
            cb_n0: v[21],
            cb_np: v[22],
            ca_np: v[23],
            frication_amplitude: v[24],
            pf1: v[25],
            pf2: v[26],
            pf3: v[27],
            pf4: v[28],
            pf5: v[29],
            pf6: v[30],
            pb1: v[31],
            pb2: v[32],
            pb3: v[33],
            pb4: v[34],
            pb5: v[35],
            pb6: v[36],
            pa1: v[37],
            pa2: v[38],
            pa3: v[39],
            pa4: v[40],
            pa5: v[41],
            pa6: v[42],
            parallel_bypass: v[43],
            pre_formant_gain: v[44],
            output_gain: v[45],
            end_voice_pitch: v[46],
        }
    }
}

//--- Engine API ---------------------------------------------------------------

/// Creates an engine handle, or null on failure. `sample_rate` must be
/// positive; `max_queued_frames` of 0 selects a default of 128.
#[no_mangle]
pub extern "C" fn klatt_tts_initialize(sample_rate: c_int, max_queued_frames: c_uint) -> *mut Engine {
    catch_unwind(|| {
        if sample_rate <= 0 {
            return std::ptr::null_mut();
        }
        let capacity = if max_queued_frames == 0 {
            128
        } else {
            max_queued_frames as usize
        };
        Box::into_raw(Box::new(Engine::new(sample_rate as usize, capacity)))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Destroys an engine handle. Null is ignored.
#[no_mangle]
pub extern "C" fn klatt_tts_terminate(handle: *mut Engine) {
    if handle.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| unsafe {
        drop(Box::from_raw(handle));
    }));
}

/// Enqueues a frame (null = silence). Returns 1 on success, 0 on failure.
///
/// # Safety
/// `handle` must be a live engine handle; `frame` must be null or point to a
/// valid `CFrame`.
#[no_mangle]
pub unsafe extern "C" fn klatt_tts_queue_frame(
    handle: *mut Engine,
    frame: *const CFrame,
    min_duration_ms: f64,
    fade_ms: f64,
    user_index: c_int,
) -> c_int {
    if handle.is_null() {
        return 0;
    }
    catch_unwind(AssertUnwindSafe(|| {
        let engine = unsafe { &*handle };
        let frame = if frame.is_null() {
            None
        } else {
            Some(unsafe { *frame }.to_frame())
        };
        engine.queue_frame(frame, min_duration_ms, fade_ms, user_index) as c_int
    }))
    .unwrap_or(0)
}

/// Renders `num_samples` samples into `out`. Returns the number written, or
/// -1 on invalid arguments. Never fails mid-stream; an empty queue renders
/// zeros.
///
/// # Safety
/// `out` must point to at least `num_samples` writable i16 slots.
#[no_mangle]
pub unsafe extern "C" fn klatt_tts_synthesize(
    handle: *mut Engine,
    out: *mut i16,
    num_samples: c_uint,
) -> c_int {
    if handle.is_null() || out.is_null() {
        return -1;
    }
    catch_unwind(AssertUnwindSafe(|| {
        let engine = unsafe { &*handle };
        let buf = unsafe { std::slice::from_raw_parts_mut(out, num_samples as usize) };
        engine.synthesize(buf) as c_int
    }))
    .unwrap_or(-1)
}

/// User index of the most recently fully rendered frame, or -1.
#[no_mangle]
pub extern "C" fn klatt_tts_get_last_index(handle: *mut Engine) -> c_int {
    if handle.is_null() {
        return -1;
    }
    catch_unwind(AssertUnwindSafe(|| {
        let engine = unsafe { &*handle };
        engine.last_index()
    }))
    .unwrap_or(-1)
}

//--- Frontend API -------------------------------------------------------------

/// Receives one emitted frame during `klatt_tts_frontend_queue_ipa`.
/// A null frame denotes silence.
pub type FrameCallback = Option<
    extern "C" fn(
        user_data: *mut c_void,
        frame: *const CFrame,
        min_duration_ms: f64,
        fade_ms: f64,
        user_index: c_int,
    ),
>;

/// A frontend handle: the synthesizer plus stable storage for the last
/// error string.
pub struct Frontend {
    synth: Synthesizer,
    last_error: Mutex<CString>,
}

impl Frontend {
    fn stash_error(&self, message: &str) {
        let c = CString::new(message.replace('\0', " ")).unwrap_or_default();
        *self.last_error.lock() = c;
    }
}

/// Creates a frontend handle for the pack directory, or null on failure.
/// The pack itself is loaded lazily on the first language or queue call.
#[no_mangle]
pub extern "C" fn klatt_tts_frontend_create(pack_dir_utf8: *const c_char) -> *mut Frontend {
    catch_unwind(|| {
        if pack_dir_utf8.is_null() {
            return std::ptr::null_mut();
        }
        let dir = match unsafe { CStr::from_ptr(pack_dir_utf8) }.to_str() {
            Ok(s) => s.to_owned(),
            Err(_) => return std::ptr::null_mut(),
        };
        Box::into_raw(Box::new(Frontend {
            synth: Synthesizer::new(dir),
            last_error: Mutex::new(CString::default()),
        }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Destroys a frontend handle. Null is ignored.
#[no_mangle]
pub extern "C" fn klatt_tts_frontend_destroy(handle: *mut Frontend) {
    if handle.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| unsafe {
        drop(Box::from_raw(handle));
    }));
}

/// Merges and installs the packs for `lang_tag_utf8`. Returns 1 on success.
#[no_mangle]
pub extern "C" fn klatt_tts_frontend_set_language(
    handle: *mut Frontend,
    lang_tag_utf8: *const c_char,
) -> c_int {
    if handle.is_null() {
        return 0;
    }
    catch_unwind(AssertUnwindSafe(|| {
        let fe = unsafe { &*handle };
        let tag = if lang_tag_utf8.is_null() {
            ""
        } else {
            match unsafe { CStr::from_ptr(lang_tag_utf8) }.to_str() {
                Ok(s) => s,
                Err(_) => {
                    fe.stash_error("language tag is not valid UTF-8");
                    return 0;
                }
            }
        };
        match fe.synth.set_language(tag) {
            Ok(()) => 1,
            Err(e) => {
                fe.stash_error(&e.to_string());
                0
            }
        }
    }))
    .unwrap_or(0)
}

/// Converts an IPA string to frames, invoking `cb` synchronously for each.
/// Returns 1 on success, 0 on failure (see `get_last_error`).
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub extern "C" fn klatt_tts_frontend_queue_ipa(
    handle: *mut Frontend,
    ipa_utf8: *const c_char,
    speed: f64,
    base_pitch: f64,
    inflection: f64,
    clause_type: c_char,
    user_index_base: c_int,
    cb: FrameCallback,
    user_data: *mut c_void,
) -> c_int {
    if handle.is_null() {
        return 0;
    }
    catch_unwind(AssertUnwindSafe(|| {
        let fe = unsafe { &*handle };
        let ipa = if ipa_utf8.is_null() {
            ""
        } else {
            match unsafe { CStr::from_ptr(ipa_utf8) }.to_str() {
                Ok(s) => s,
                Err(_) => {
                    fe.stash_error("IPA input is not valid UTF-8");
                    return 0;
                }
            }
        };
        let clause = match u8::try_from(clause_type) {
            Ok(b) if b.is_ascii() && b != 0 => b as char,
            _ => '.',
        };
        let params = SpeechParams {
            speed,
            base_pitch,
            inflection,
            clause_type: clause,
            user_index_base,
        };
        let result = fe.synth.queue_ipa(ipa, params, |frame, min_ms, fade_ms, index| {
            if let Some(cb) = cb {
                match frame {
                    Some(f) => {
                        let cframe = CFrame::from_frame(f);
                        cb(user_data, &cframe, min_ms, fade_ms, index);
                    }
                    None => cb(user_data, std::ptr::null(), min_ms, fade_ms, index),
                }
            }
        });
        match result {
            Ok(_) => {
                fe.stash_error("");
                1
            }
            Err(e) => {
                fe.stash_error(&e.to_string());
                0
            }
        }
    }))
    .unwrap_or(0)
}

/// The last error message, valid until the next call on this handle.
/// Returns an empty string when the previous call succeeded.
#[no_mangle]
pub extern "C" fn klatt_tts_frontend_get_last_error(handle: *mut Frontend) -> *const c_char {
    static EMPTY: &[u8] = b"\0";
    if handle.is_null() {
        return EMPTY.as_ptr().cast();
    }
    catch_unwind(AssertUnwindSafe(|| {
        let fe = unsafe { &*handle };
        fe.last_error.lock().as_ptr()
    }))
    .unwrap_or(EMPTY.as_ptr().cast())
}
