//! C-ABI wrapper around `xfer-core`.
//!
//! # Overview
//! Lets C callers plug in their own transfer engine through a function
//! table (`XferEngineVTable`) and drive it with the core request machinery:
//! declarative options, header editing, multipart fields, synchronous
//! `perform`, and stepped asynchronous transfers on a process-wide tokio
//! runtime.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Setters return an `XferErrorCode`; transfers return a heap-allocated
//!   `XferResult` envelope that owns the response.
//! - The C caller owns all returned pointers and must call the matching
//!   `xfer_*_free` function to release them. Borrowed pointers (such as the
//!   body from `xfer_response_body`) live as long as their owner.

pub mod engine;
pub mod types;

#[cfg(test)]
mod fake;

use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use once_cell::sync::OnceCell;
use tokio::runtime::Runtime;
use xfer_core::{
    ClientConfig, DoubleInfo, IntInfo, PostField, Request, RequestOption, StringInfo,
};

pub use engine::{FfiEngine, XferEngineVTable, XferFormField, XferSinkFn};
use types::*;

/// Called once when an async transfer finishes, from a runtime thread.
///
/// Receives ownership of both the result and the request handle.
pub type XferCompletionFn =
    extern "C" fn(user_data: *mut c_void, result: *mut XferResult, request: *mut FfiRequest);

static RUNTIME: OnceCell<Runtime> = OnceCell::new();

fn runtime() -> Option<&'static Runtime> {
    RUNTIME
        .get_or_try_init(|| {
            tokio::runtime::Builder::new_multi_thread()
                .thread_name("xfer-ffi")
                .build()
        })
        .map_err(|err| tracing::error!(error = %err, "failed to start transfer runtime"))
        .ok()
}

/// Read a borrowed C string. `None` for null or invalid UTF-8.
fn read_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .ok()
        .map(str::to_string)
}

/// Run `f` against the request behind `req`.
///
/// Handles hold engine state that is not `UnwindSafe`; a request that
/// panicked mid-update is still freed normally.
fn with_request(
    req: *mut FfiRequest,
    f: impl FnOnce(&mut Request<FfiEngine>) -> XferErrorCode,
) -> XferErrorCode {
    if req.is_null() {
        return XferErrorCode::NullArg;
    }
    catch_unwind(AssertUnwindSafe(|| f(unsafe { &mut (*req).inner })))
        .unwrap_or(XferErrorCode::Panic)
}

fn push_option(request: &mut Request<FfiEngine>, option: Option<RequestOption>) -> XferErrorCode {
    match option {
        Some(option) => {
            request.add_option(option);
            XferErrorCode::Ok
        }
        None => XferErrorCode::InvalidArg,
    }
}

// ---------------------------------------------------------------------------
// Request lifecycle
// ---------------------------------------------------------------------------

/// Create a request for `url`, taking ownership of the C engine.
///
/// Returns null if `url` is null or not UTF-8; the engine is disposed in
/// that case too. The caller must free the returned pointer with
/// `xfer_request_free`.
///
/// Every function in `vtable` must be valid for `vtable.ctx`, and the
/// context must tolerate being used from another thread.
#[unsafe(no_mangle)]
pub extern "C" fn xfer_request_new(
    url: *const c_char,
    vtable: XferEngineVTable,
) -> *mut FfiRequest {
    catch_unwind(|| {
        let Some(url) = read_str(url) else {
            (vtable.dispose)(vtable.ctx);
            return std::ptr::null_mut();
        };
        let engine = unsafe { FfiEngine::new(vtable) };
        let request = Request::new(url, engine);
        tracing::debug!(request = %request.id(), "ffi request created");
        Box::into_raw(Box::new(FfiRequest { inner: request }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a request and dispose its engine. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn xfer_request_free(req: *mut FfiRequest) {
    if !req.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(req) });
        }));
    }
}

/// Reset the engine and drop every option. A non-null `url` becomes the
/// first option of the fresh list.
#[unsafe(no_mangle)]
pub extern "C" fn xfer_request_reset(req: *mut FfiRequest, url: *const c_char) -> XferErrorCode {
    with_request(req, |request| {
        let options = match (url.is_null(), read_str(url)) {
            (true, _) => Vec::new(),
            (false, Some(url)) => vec![RequestOption::Url(url)],
            (false, None) => return XferErrorCode::InvalidArg,
        };
        request.reset(options);
        XferErrorCode::Ok
    })
}

/// Put options read from `XFER_*` environment variables ahead of the
/// request's own options, so explicitly set options still win.
#[unsafe(no_mangle)]
pub extern "C" fn xfer_request_apply_env_config(req: *mut FfiRequest) -> XferErrorCode {
    with_request(req, |request| match ClientConfig::from_env() {
        Ok(config) => {
            let mut options = config.options();
            options.extend(request.options().iter().cloned());
            request.reset(options);
            XferErrorCode::Ok
        }
        Err(err) => {
            tracing::warn!(error = %err, "ignoring invalid environment config");
            XferErrorCode::InvalidArg
        }
    })
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Set a string option; `option` is an `XferStrOption` id.
#[unsafe(no_mangle)]
pub extern "C" fn xfer_request_set_str(
    req: *mut FfiRequest,
    option: u32,
    value: *const c_char,
) -> XferErrorCode {
    with_request(req, |request| {
        if value.is_null() {
            return XferErrorCode::NullArg;
        }
        let option = XferStrOption::from_raw(option)
            .zip(read_str(value))
            .map(|(option, value)| option.to_request_option(value));
        push_option(request, option)
    })
}

/// Set an integer option; `option` is an `XferLongOption` id.
#[unsafe(no_mangle)]
pub extern "C" fn xfer_request_set_long(
    req: *mut FfiRequest,
    option: u32,
    value: i64,
) -> XferErrorCode {
    with_request(req, |request| {
        let option =
            XferLongOption::from_raw(option).and_then(|option| option.to_request_option(value));
        push_option(request, option)
    })
}

/// Set a flag option; `option` is an `XferBoolOption` id.
#[unsafe(no_mangle)]
pub extern "C" fn xfer_request_set_bool(
    req: *mut FfiRequest,
    option: u32,
    value: bool,
) -> XferErrorCode {
    with_request(req, |request| match XferBoolOption::from_raw(option) {
        Some(option) => {
            if let Some(option) = option.to_request_option(value) {
                request.add_option(option);
            }
            XferErrorCode::Ok
        }
        None => XferErrorCode::InvalidArg,
    })
}

/// Set a list option; `option` is an `XferListOption` id.
#[unsafe(no_mangle)]
pub extern "C" fn xfer_request_set_list(
    req: *mut FfiRequest,
    option: u32,
    items: *const *const c_char,
    len: usize,
) -> XferErrorCode {
    with_request(req, |request| {
        if items.is_null() && len > 0 {
            return XferErrorCode::NullArg;
        }
        let raw = if len == 0 {
            &[][..]
        } else {
            unsafe { std::slice::from_raw_parts(items, len) }
        };
        let Some(items) = raw.iter().map(|p| read_str(*p)).collect::<Option<Vec<_>>>() else {
            return XferErrorCode::InvalidArg;
        };
        let option = XferListOption::from_raw(option).map(|option| option.to_request_option(items));
        push_option(request, option)
    })
}

// ---------------------------------------------------------------------------
// Headers and body
// ---------------------------------------------------------------------------

/// Append a header line. Duplicates are sent as-is.
#[unsafe(no_mangle)]
pub extern "C" fn xfer_request_add_header(
    req: *mut FfiRequest,
    name: *const c_char,
    value: *const c_char,
) -> XferErrorCode {
    with_request(req, |request| {
        if name.is_null() || value.is_null() {
            return XferErrorCode::NullArg;
        }
        match (read_str(name), read_str(value)) {
            (Some(name), Some(value)) => {
                request.add_header(name, value);
                XferErrorCode::Ok
            }
            _ => XferErrorCode::InvalidArg,
        }
    })
}

/// Set a header, dropping earlier lines with the same name.
#[unsafe(no_mangle)]
pub extern "C" fn xfer_request_replace_header(
    req: *mut FfiRequest,
    name: *const c_char,
    value: *const c_char,
) -> XferErrorCode {
    with_request(req, |request| {
        if name.is_null() || value.is_null() {
            return XferErrorCode::NullArg;
        }
        match (read_str(name), read_str(value)) {
            (Some(name), Some(value)) => {
                request.replace_header(name, value);
                XferErrorCode::Ok
            }
            _ => XferErrorCode::InvalidArg,
        }
    })
}

/// Suppress a header, including one the engine would add itself.
#[unsafe(no_mangle)]
pub extern "C" fn xfer_request_remove_header(
    req: *mut FfiRequest,
    name: *const c_char,
) -> XferErrorCode {
    with_request(req, |request| {
        if name.is_null() {
            return XferErrorCode::NullArg;
        }
        match read_str(name) {
            Some(name) => {
                request.remove_header(name);
                XferErrorCode::Ok
            }
            None => XferErrorCode::InvalidArg,
        }
    })
}

/// Add a multipart form field. Exactly one of `value` and `path` must be
/// non-null; `mime_type` may be null.
#[unsafe(no_mangle)]
pub extern "C" fn xfer_request_add_post_field(
    req: *mut FfiRequest,
    name: *const c_char,
    value: *const c_char,
    path: *const c_char,
    mime_type: *const c_char,
) -> XferErrorCode {
    with_request(req, |request| {
        if name.is_null() {
            return XferErrorCode::NullArg;
        }
        let Some(name) = read_str(name) else {
            return XferErrorCode::InvalidArg;
        };
        let field = match (value.is_null(), path.is_null()) {
            (false, true) => read_str(value).map(|v| PostField::value(name, v)),
            (true, false) => read_str(path).map(|p| PostField::file(name, p)),
            _ => None,
        };
        let field = match (field, mime_type.is_null()) {
            (Some(field), true) => Some(field),
            (Some(field), false) => read_str(mime_type).map(|mime| field.with_mime_type(mime)),
            (None, _) => None,
        };
        push_option(request, field.map(RequestOption::PostField))
    })
}

/// Set a raw request body. `data` may be null when `len` is 0.
#[unsafe(no_mangle)]
pub extern "C" fn xfer_request_set_post_data(
    req: *mut FfiRequest,
    data: *const u8,
    len: usize,
) -> XferErrorCode {
    with_request(req, |request| {
        if data.is_null() && len > 0 {
            return XferErrorCode::NullArg;
        }
        let bytes = if len == 0 {
            Vec::new()
        } else {
            unsafe { std::slice::from_raw_parts(data, len) }.to_vec()
        };
        request.add_option(RequestOption::PostData(bytes));
        XferErrorCode::Ok
    })
}

// ---------------------------------------------------------------------------
// Transfers
// ---------------------------------------------------------------------------

/// Run the transfer to completion on the calling thread.
///
/// The caller must free the returned pointer with `xfer_free_result`.
#[unsafe(no_mangle)]
pub extern "C" fn xfer_request_perform(req: *mut FfiRequest) -> *mut XferResult {
    if req.is_null() {
        return XferResult::null_arg("req");
    }
    catch_unwind(AssertUnwindSafe(|| {
        let request = unsafe { &mut (*req).inner };
        XferResult::from_outcome(request.perform())
    }))
    .unwrap_or_else(|_| XferResult::panic("panic in xfer_request_perform"))
}

struct UserData(*mut c_void);

// Handed back to the caller's completion untouched.
unsafe impl Send for UserData {}

impl UserData {
    fn get(&self) -> *mut c_void {
        self.0
    }
}

/// Run the transfer one step at a time on the shared runtime.
///
/// On `Ok` the request handle is consumed and `callback` is called exactly
/// once, from a runtime thread, with the result and the request handle
/// back. On any other code the caller keeps the request.
#[unsafe(no_mangle)]
pub extern "C" fn xfer_request_perform_async(
    req: *mut FfiRequest,
    callback: Option<XferCompletionFn>,
    user_data: *mut c_void,
) -> XferErrorCode {
    let Some(callback) = callback else {
        return XferErrorCode::NullArg;
    };
    if req.is_null() {
        return XferErrorCode::NullArg;
    }
    let user_data = UserData(user_data);
    catch_unwind(AssertUnwindSafe(move || {
        let Some(runtime) = runtime() else {
            return XferErrorCode::Runtime;
        };
        let request = unsafe { Box::from_raw(req) }.inner;
        tracing::debug!(request = %request.id(), "ffi async transfer scheduled");
        request.perform_async(runtime.handle().clone(), move |confirmation| {
            let (outcome, request) = confirmation.into_parts();
            let result = XferResult::from_outcome(outcome);
            let request = Box::into_raw(Box::new(FfiRequest { inner: request }));
            callback(user_data.get(), result, request);
        });
        XferErrorCode::Ok
    }))
    .unwrap_or(XferErrorCode::Panic)
}

// ---------------------------------------------------------------------------
// Response getters
// ---------------------------------------------------------------------------

/// Detach the response from a result so it outlives `xfer_free_result`.
///
/// Returns null if there is none. Free it with `xfer_response_free`.
#[unsafe(no_mangle)]
pub extern "C" fn xfer_result_take_response(result: *mut XferResult) -> *mut FfiResponse {
    if result.is_null() {
        return std::ptr::null_mut();
    }
    let result = unsafe { &mut *result };
    std::mem::replace(&mut result.response, std::ptr::null_mut())
}

/// HTTP status code, 0 if none was received or `resp` is null.
#[unsafe(no_mangle)]
pub extern "C" fn xfer_response_code(resp: *const FfiResponse) -> i64 {
    if resp.is_null() {
        return 0;
    }
    catch_unwind(|| unsafe { &*resp }.inner.response_code()).unwrap_or(0)
}

/// First value of header `name`, or null. Free with `xfer_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn xfer_response_header(
    resp: *const FfiResponse,
    name: *const c_char,
) -> *mut c_char {
    if resp.is_null() {
        return std::ptr::null_mut();
    }
    catch_unwind(|| {
        let Some(name) = read_str(name) else {
            return std::ptr::null_mut();
        };
        match unsafe { &*resp }.inner.header(name) {
            Some(value) => into_c_string(value),
            None => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Number of parsed response headers.
#[unsafe(no_mangle)]
pub extern "C" fn xfer_response_header_count(resp: *const FfiResponse) -> usize {
    if resp.is_null() {
        return 0;
    }
    catch_unwind(|| unsafe { &*resp }.inner.headers().len()).unwrap_or(0)
}

/// Header at `index` in arrival order.
///
/// On success writes newly allocated strings to `name_out` and `value_out`
/// (free both with `xfer_free_string`) and returns true.
#[unsafe(no_mangle)]
pub extern "C" fn xfer_response_header_at(
    resp: *const FfiResponse,
    index: usize,
    name_out: *mut *mut c_char,
    value_out: *mut *mut c_char,
) -> bool {
    if resp.is_null() || name_out.is_null() || value_out.is_null() {
        return false;
    }
    catch_unwind(|| {
        let Some((name, value)) = unsafe { &*resp }.inner.headers().get(index) else {
            return false;
        };
        unsafe {
            *name_out = into_c_string(name.standard_name());
            *value_out = into_c_string(value);
        }
        true
    })
    .unwrap_or(false)
}

/// Borrowed body bytes, valid until the response is freed. Writes the
/// length to `len_out` when it is non-null.
#[unsafe(no_mangle)]
pub extern "C" fn xfer_response_body(resp: *const FfiResponse, len_out: *mut usize) -> *const u8 {
    if resp.is_null() {
        return std::ptr::null();
    }
    catch_unwind(|| {
        let body = unsafe { &*resp }.inner.body_bytes();
        if !len_out.is_null() {
            unsafe { *len_out = body.len() };
        }
        body.as_ptr()
    })
    .unwrap_or(std::ptr::null())
}

/// The body as a JSON object string; `{}` when the body is not a JSON
/// object. Free with `xfer_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn xfer_response_body_json(resp: *const FfiResponse) -> *mut c_char {
    if resp.is_null() {
        return std::ptr::null_mut();
    }
    catch_unwind(|| {
        let json = serde_json::Value::Object(unsafe { &*resp }.inner.body_json());
        into_c_string(&json.to_string())
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Integer transfer info; `key` is an `IntInfo` id.
#[unsafe(no_mangle)]
pub extern "C" fn xfer_response_info_long(
    resp: *const FfiResponse,
    key: u32,
    out: *mut i64,
) -> bool {
    if resp.is_null() || out.is_null() {
        return false;
    }
    catch_unwind(|| {
        let value = IntInfo::from_id(key).and_then(|key| unsafe { &*resp }.inner.info_int(key));
        match value {
            Some(value) => {
                unsafe { *out = value };
                true
            }
            None => false,
        }
    })
    .unwrap_or(false)
}

/// Floating-point transfer info; `key` is a `DoubleInfo` id.
#[unsafe(no_mangle)]
pub extern "C" fn xfer_response_info_double(
    resp: *const FfiResponse,
    key: u32,
    out: *mut f64,
) -> bool {
    if resp.is_null() || out.is_null() {
        return false;
    }
    catch_unwind(|| {
        let value =
            DoubleInfo::from_id(key).and_then(|key| unsafe { &*resp }.inner.info_f64(key));
        match value {
            Some(value) => {
                unsafe { *out = value };
                true
            }
            None => false,
        }
    })
    .unwrap_or(false)
}

/// String transfer info; `key` is a `StringInfo` id. Null when absent.
/// Free with `xfer_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn xfer_response_info_str(resp: *const FfiResponse, key: u32) -> *mut c_char {
    if resp.is_null() {
        return std::ptr::null_mut();
    }
    catch_unwind(|| {
        match StringInfo::from_id(key).and_then(|key| unsafe { &*resp }.inner.info_str(key)) {
            Some(value) => into_c_string(value),
            None => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free a response. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn xfer_response_free(resp: *mut FfiResponse) {
    if !resp.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(resp) });
        });
    }
}

/// Free a result, its message and any response still attached.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn xfer_free_result(result: *mut XferResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        if !result.error_message.is_null() {
            drop(unsafe { CString::from_raw(result.error_message) });
        }
        if !result.response.is_null() {
            drop(unsafe { Box::from_raw(result.response) });
        }
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn xfer_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { CString::from_raw(s) });
        });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
