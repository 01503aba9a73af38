//! FFI bindings for Broadjump
//!
//! This module provides C-compatible functions for calling Broadjump from other languages.
//! All functions use C strings (null-terminated) and return allocated memory that
//! must be freed by the caller using `broadjump_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::{DetectorConfig, JumpConfig};
use crate::pipeline::{frames_to_csv, JumpProcessor};
use crate::schema::FrameAdapter;
use crate::types::{FrameSample, TickOutput};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Serialize a tick, or record why there is none
fn tick_to_cstr(tick: Option<TickOutput>) -> *mut c_char {
    let Some(tick) = tick else {
        set_last_error("Frame dropped: timestamp missing or not after the previous frame");
        return ptr::null_mut();
    };
    match serde_json::to_string(&tick) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Detect jumps in an NDJSON frame stream and return the results CSV.
///
/// # Safety
/// - `ndjson` must be a valid null-terminated C string.
/// - `config_json` may be NULL for the default configuration.
/// - Returns a newly allocated string that must be freed with `broadjump_free_string`.
/// - Returns NULL when no jump was detected (`broadjump_last_error` is then NULL)
///   or on error (call `broadjump_last_error` to get the message).
#[no_mangle]
pub unsafe extern "C" fn broadjump_frames_to_csv(
    ndjson: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let ndjson_str = match cstr_to_string(ndjson) {
        Some(s) => s,
        None => {
            set_last_error("Invalid NDJSON string pointer");
            return ptr::null_mut();
        }
    };

    let config = if config_json.is_null() {
        JumpConfig::default()
    } else {
        let parsed = cstr_to_string(config_json)
            .ok_or_else(|| "Invalid config string pointer".to_string())
            .and_then(|json| JumpConfig::from_json(&json).map_err(|e| e.to_string()));
        match parsed {
            Ok(config) => config,
            Err(msg) => {
                set_last_error(&msg);
                return ptr::null_mut();
            }
        }
    };

    match frames_to_csv(&ndjson_str, &config) {
        Ok(Some(csv)) => string_to_cstr(&csv),
        Ok(None) => ptr::null_mut(),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to a JumpProcessor
pub struct JumpProcessorHandle {
    processor: JumpProcessor,
}

/// Create a new JumpProcessor with the given detector settings.
///
/// # Safety
/// - Returns a pointer to a newly allocated JumpProcessor.
/// - Must be freed with `broadjump_processor_free`.
/// - Returns NULL when the settings are invalid; call `broadjump_last_error`.
#[no_mangle]
pub unsafe extern "C" fn broadjump_processor_new(
    y_threshold: f64,
    smooth_window: u32,
) -> *mut JumpProcessorHandle {
    clear_last_error();

    let config = JumpConfig {
        detector: DetectorConfig::new(y_threshold, smooth_window as usize),
        ..Default::default()
    };

    match JumpProcessor::new(config) {
        Ok(processor) => Box::into_raw(Box::new(JumpProcessorHandle { processor })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Create a new JumpProcessor from a JSON configuration.
///
/// # Safety
/// - `config_json` must be a valid null-terminated C string.
/// - Must be freed with `broadjump_processor_free`.
/// - Returns NULL on error; call `broadjump_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn broadjump_processor_new_with_config(
    config_json: *const c_char,
) -> *mut JumpProcessorHandle {
    clear_last_error();

    let json_str = match cstr_to_string(config_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid config string pointer");
            return ptr::null_mut();
        }
    };

    let processor = JumpConfig::from_json(&json_str).and_then(JumpProcessor::new);
    match processor {
        Ok(processor) => Box::into_raw(Box::new(JumpProcessorHandle { processor })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a JumpProcessor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `broadjump_processor_new*`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn broadjump_processor_free(processor: *mut JumpProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Feed one pre-computed sample and return the tick as JSON.
///
/// `vertical` and `horizontal` are ignored when `has_signal` is false. A NaN
/// or infinite value is handled like `has_signal == false`.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `broadjump_processor_new*`.
/// - Returns a newly allocated string that must be freed with `broadjump_free_string`.
/// - Returns NULL when the sample was dropped; call `broadjump_last_error`.
#[no_mangle]
pub unsafe extern "C" fn broadjump_processor_push_sample(
    processor: *mut JumpProcessorHandle,
    timestamp: f64,
    has_signal: bool,
    vertical: f64,
    horizontal: f64,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &mut *processor;

    let sample = if has_signal {
        FrameSample::detected(timestamp, vertical, horizontal)
    } else {
        FrameSample::missing(timestamp)
    };

    tick_to_cstr(handle.processor.process_sample(&sample))
}

/// Feed one pose.frame.v1 record and return the tick as JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `broadjump_processor_new*`.
/// - `frame_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `broadjump_free_string`.
/// - Returns NULL on error or when the frame was dropped; call `broadjump_last_error`.
#[no_mangle]
pub unsafe extern "C" fn broadjump_processor_process_frame(
    processor: *mut JumpProcessorHandle,
    frame_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &mut *processor;

    let json_str = match cstr_to_string(frame_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid frame string pointer");
            return ptr::null_mut();
        }
    };

    let frame = match FrameAdapter::parse_line(&json_str) {
        Ok(frame) => frame,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    match frame.validate() {
        Err(e) if !e.is_recoverable() => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
        _ => {}
    }

    tick_to_cstr(handle.processor.process_frame(&frame))
}

/// Return the CSV of the jumps detected so far.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `broadjump_processor_new*`.
/// - Returns a newly allocated string that must be freed with `broadjump_free_string`.
/// - Returns NULL when no jump has been detected yet.
#[no_mangle]
pub unsafe extern "C" fn broadjump_processor_events_csv(
    processor: *mut JumpProcessorHandle,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &*processor;

    match handle.processor.events_csv() {
        Some(csv) => string_to_cstr(&csv),
        None => ptr::null_mut(),
    }
}

/// Return the session report as JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `broadjump_processor_new*`.
/// - Returns a newly allocated string that must be freed with `broadjump_free_string`.
/// - Returns NULL on error; call `broadjump_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn broadjump_processor_report(
    processor: *mut JumpProcessorHandle,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &*processor;

    match handle.processor.report_json() {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Broadjump functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Broadjump function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn broadjump_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Broadjump function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn broadjump_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the Broadjump library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn broadjump_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
