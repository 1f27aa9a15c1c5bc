//! Transfer engines implemented in C.
//!
//! # Design
//! A C engine is a context pointer plus a table of function pointers
//! (`XferEngineVTable`). Byte callbacks cannot carry a Rust reference across
//! the boundary, so each `FfiEngine` registers a chunk queue under an opaque
//! `u64` token and hands the C side two plain `extern "C"` sink functions
//! together with that token. Chunks queued while a C step runs are forwarded
//! to the Rust sink, in arrival order, as soon as the step returns.

use std::collections::{HashMap, VecDeque};
use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::panic::catch_unwind;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use once_cell::sync::OnceCell;
use xfer_core::option::PostPayload;
use xfer_core::{
    code, EngineCode, EngineOption, InfoKey, InfoValue, OptionValue, PostField, StepStatus,
    TransferEngine, TransferSink,
};

/// Receives one header line or body chunk from a C engine.
pub type XferSinkFn = extern "C" fn(token: u64, data: *const u8, len: usize);

/// One multipart field handed to `set_form`. Exactly one of `value` and
/// `path` is non-null; `mime_type` may be null.
#[repr(C)]
pub struct XferFormField {
    pub name: *const c_char,
    pub value: *const c_char,
    pub path: *const c_char,
    pub mime_type: *const c_char,
}

/// Function table of a C transfer engine.
///
/// Option keys are `EngineOption` discriminants; info keys are the
/// discriminants of `StringInfo`, `IntInfo` and `DoubleInfo`. Every function
/// returning `i32` returns 0 on success. Strings passed in are only valid for
/// the duration of the call; strings returned by `info_str` and `strerror`
/// are borrowed and only read until the next call on the same context.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct XferEngineVTable {
    pub ctx: *mut c_void,
    pub set_long: extern "C" fn(ctx: *mut c_void, option: u32, value: i64) -> i32,
    pub set_str: extern "C" fn(ctx: *mut c_void, option: u32, value: *const c_char) -> i32,
    pub set_bytes:
        extern "C" fn(ctx: *mut c_void, option: u32, data: *const u8, len: usize) -> i32,
    pub set_list: extern "C" fn(
        ctx: *mut c_void,
        option: u32,
        items: *const *const c_char,
        len: usize,
    ) -> i32,
    pub set_form: extern "C" fn(
        ctx: *mut c_void,
        option: u32,
        fields: *const XferFormField,
        len: usize,
    ) -> i32,
    pub register_sinks:
        extern "C" fn(ctx: *mut c_void, header: XferSinkFn, body: XferSinkFn, token: u64),
    /// One bounded unit of work; sets `*done` once the transfer is complete.
    pub step: extern "C" fn(ctx: *mut c_void, done: *mut bool) -> i32,
    pub perform: extern "C" fn(ctx: *mut c_void) -> i32,
    pub info_long: extern "C" fn(ctx: *mut c_void, key: u32, out: *mut i64) -> bool,
    pub info_double: extern "C" fn(ctx: *mut c_void, key: u32, out: *mut f64) -> bool,
    pub info_str: extern "C" fn(ctx: *mut c_void, key: u32) -> *const c_char,
    pub strerror: extern "C" fn(ctx: *mut c_void, code: i32) -> *const c_char,
    pub reset: extern "C" fn(ctx: *mut c_void),
    pub dispose: extern "C" fn(ctx: *mut c_void),
}

// ---------------------------------------------------------------------------
// Chunk registry
// ---------------------------------------------------------------------------

enum Chunk {
    Header(Vec<u8>),
    Body(Vec<u8>),
}

type ChunkQueue = Arc<Mutex<VecDeque<Chunk>>>;

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);
static SINKS: OnceCell<Mutex<HashMap<u64, ChunkQueue>>> = OnceCell::new();

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn sinks() -> &'static Mutex<HashMap<u64, ChunkQueue>> {
    SINKS.get_or_init(|| Mutex::new(HashMap::new()))
}

fn register_queue() -> (u64, ChunkQueue) {
    let token = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
    let queue = ChunkQueue::default();
    lock(sinks()).insert(token, Arc::clone(&queue));
    (token, queue)
}

fn unregister_queue(token: u64) {
    lock(sinks()).remove(&token);
}

fn enqueue(token: u64, data: *const u8, len: usize, wrap: fn(Vec<u8>) -> Chunk) {
    let bytes = if data.is_null() || len == 0 {
        Vec::new()
    } else {
        unsafe { std::slice::from_raw_parts(data, len) }.to_vec()
    };
    let queue = lock(sinks()).get(&token).cloned();
    match queue {
        Some(queue) => lock(&queue).push_back(wrap(bytes)),
        None => tracing::warn!(token, "chunk for unknown transfer token dropped"),
    }
}

extern "C" fn header_sink(token: u64, data: *const u8, len: usize) {
    let _ = catch_unwind(|| enqueue(token, data, len, Chunk::Header));
}

extern "C" fn body_sink(token: u64, data: *const u8, len: usize) {
    let _ = catch_unwind(|| enqueue(token, data, len, Chunk::Body));
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// A `TransferEngine` backed by an `XferEngineVTable`.
///
/// Owns the C context: `dispose` is called when the engine is dropped.
pub struct FfiEngine {
    vtable: XferEngineVTable,
    token: u64,
    queue: ChunkQueue,
}

// The vtable contract requires the context to be usable from any thread, one
// call at a time; `TransferEngine` methods take `&mut self` or are only
// called between steps.
unsafe impl Send for FfiEngine {}

impl FfiEngine {
    /// Take ownership of a C engine.
    ///
    /// # Safety
    /// Every function pointer in `vtable` must be valid for `vtable.ctx`,
    /// and the context must tolerate being moved between threads.
    pub unsafe fn new(vtable: XferEngineVTable) -> Self {
        let (token, queue) = register_queue();
        (vtable.register_sinks)(vtable.ctx, header_sink, body_sink, token);
        FfiEngine {
            vtable,
            token,
            queue,
        }
    }

    fn drain(&self, sink: &mut dyn TransferSink) {
        let chunks: Vec<Chunk> = lock(&self.queue).drain(..).collect();
        for chunk in chunks {
            match chunk {
                Chunk::Header(line) => sink.header_chunk(&line),
                Chunk::Body(bytes) => sink.body_chunk(&bytes),
            }
        }
    }

    fn set_form(&mut self, option: EngineOption, fields: &[PostField]) -> EngineCode {
        let Some(owned) = fields.iter().map(OwnedField::new).collect::<Option<Vec<_>>>() else {
            return code::BAD_FUNCTION_ARGUMENT;
        };
        let raw: Vec<XferFormField> = owned.iter().map(OwnedField::as_raw).collect();
        (self.vtable.set_form)(self.vtable.ctx, option as u32, raw.as_ptr(), raw.len())
    }
}

/// C strings backing one `XferFormField` for the duration of a call.
struct OwnedField {
    name: CString,
    value: Option<CString>,
    path: Option<CString>,
    mime_type: Option<CString>,
}

impl OwnedField {
    fn new(field: &PostField) -> Option<Self> {
        let (value, path) = match &field.payload {
            PostPayload::Value(value) => (Some(c_string(value)?), None),
            PostPayload::File(path) => (None, Some(c_string(&path.to_string_lossy())?)),
        };
        let mime_type = match &field.mime_type {
            Some(mime) => Some(c_string(mime)?),
            None => None,
        };
        Some(OwnedField {
            name: c_string(&field.name)?,
            value,
            path,
            mime_type,
        })
    }

    fn as_raw(&self) -> XferFormField {
        XferFormField {
            name: self.name.as_ptr(),
            value: ptr_or_null(&self.value),
            path: ptr_or_null(&self.path),
            mime_type: ptr_or_null(&self.mime_type),
        }
    }
}

fn c_string(s: &str) -> Option<CString> {
    CString::new(s).ok()
}

fn ptr_or_null(s: &Option<CString>) -> *const c_char {
    s.as_ref().map_or(std::ptr::null(), |s| s.as_ptr())
}

impl TransferEngine for FfiEngine {
    fn set_option(&mut self, option: EngineOption, value: OptionValue) -> EngineCode {
        let ctx = self.vtable.ctx;
        let key = option as u32;
        match value {
            OptionValue::Long(v) => (self.vtable.set_long)(ctx, key, v),
            OptionValue::Str(s) => match c_string(&s) {
                Some(s) => (self.vtable.set_str)(ctx, key, s.as_ptr()),
                None => code::BAD_FUNCTION_ARGUMENT,
            },
            OptionValue::Bytes(bytes) => (self.vtable.set_bytes)(ctx, key, bytes.as_ptr(), bytes.len()),
            OptionValue::List(items) => {
                let Some(owned) = items.iter().map(|s| c_string(s)).collect::<Option<Vec<_>>>()
                else {
                    return code::BAD_FUNCTION_ARGUMENT;
                };
                let ptrs: Vec<*const c_char> = owned.iter().map(|s| s.as_ptr()).collect();
                (self.vtable.set_list)(ctx, key, ptrs.as_ptr(), ptrs.len())
            }
            OptionValue::Form(fields) => self.set_form(option, &fields),
        }
    }

    fn step(&mut self, sink: &mut dyn TransferSink) -> StepStatus {
        let mut done = false;
        let rc = (self.vtable.step)(self.vtable.ctx, &mut done);
        self.drain(sink);
        match (rc, done) {
            (code::OK, true) => StepStatus::Done,
            (code::OK, false) => StepStatus::Pending,
            (rc, _) => StepStatus::Error(rc),
        }
    }

    fn run_to_completion(&mut self, sink: &mut dyn TransferSink) -> EngineCode {
        let rc = (self.vtable.perform)(self.vtable.ctx);
        self.drain(sink);
        rc
    }

    fn info(&self, key: InfoKey) -> Option<InfoValue> {
        let ctx = self.vtable.ctx;
        match key {
            InfoKey::Int(k) => {
                let mut out = 0i64;
                (self.vtable.info_long)(ctx, k as u32, &mut out).then_some(InfoValue::Int(out))
            }
            InfoKey::Double(k) => {
                let mut out = 0f64;
                (self.vtable.info_double)(ctx, k as u32, &mut out).then_some(InfoValue::Double(out))
            }
            InfoKey::Str(k) => {
                let ptr = (self.vtable.info_str)(ctx, k as u32);
                if ptr.is_null() {
                    return None;
                }
                let s = unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned();
                Some(InfoValue::Str(s))
            }
        }
    }

    fn describe_error(&self, rc: EngineCode) -> String {
        let ptr = (self.vtable.strerror)(self.vtable.ctx, rc);
        if ptr.is_null() {
            return code::describe(rc).to_string();
        }
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }

    /// The C side forgets its sinks on reset, so they are registered again.
    fn reset(&mut self) {
        (self.vtable.reset)(self.vtable.ctx);
        lock(&self.queue).clear();
        (self.vtable.register_sinks)(self.vtable.ctx, header_sink, body_sink, self.token);
    }
}

impl Drop for FfiEngine {
    fn drop(&mut self) {
        unregister_queue(self.token);
        (self.vtable.dispose)(self.vtable.ctx);
    }
}
