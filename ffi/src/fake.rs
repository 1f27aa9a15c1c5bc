//! A C-style engine written in Rust, driven only through its vtable.
//!
//! The first step emits a status line, one `Content-Type` header and the
//! blank line; each further step emits one body chunk. Options are recorded
//! as `(key, rendered value)` pairs in a shared list.

use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use xfer_core::{DoubleInfo, EngineOption, IntInfo, StringInfo};

use crate::engine::{XferEngineVTable, XferFormField, XferSinkFn};

pub(crate) struct FakeEngine {
    pub options: Arc<Mutex<Vec<(u32, String)>>>,
    status: i64,
    body: Vec<Vec<u8>>,
    fail: i32,
    reject: Option<(u32, i32)>,
    disposed: Option<Arc<AtomicUsize>>,

    sinks: Option<(XferSinkFn, XferSinkFn, u64)>,
    steps: usize,
    delivered: usize,
    url: Option<CString>,
}

impl FakeEngine {
    pub fn new(status: i64) -> Self {
        FakeEngine {
            options: Arc::default(),
            status,
            body: Vec::new(),
            fail: 0,
            reject: None,
            disposed: None,
            sinks: None,
            steps: 0,
            delivered: 0,
            url: None,
        }
    }

    pub fn with_body(mut self, chunks: &[&str]) -> Self {
        self.body = chunks.iter().map(|c| c.as_bytes().to_vec()).collect();
        self
    }

    pub fn failing(mut self, code: i32) -> Self {
        self.fail = code;
        self
    }

    pub fn rejecting(mut self, option: EngineOption, code: i32) -> Self {
        self.reject = Some((option as u32, code));
        self
    }

    pub fn counting_disposal(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.disposed = Some(counter);
        self
    }

    fn record(&mut self, option: u32, value: String) -> i32 {
        if let Some((rejected, code)) = self.reject {
            if rejected == option {
                return code;
            }
        }
        if option == EngineOption::Url as u32 {
            self.url = CString::new(value.clone()).ok();
        }
        // A new option after a finished transfer starts the next one.
        self.steps = 0;
        self.delivered = 0;
        self.options.lock().unwrap().push((option, value));
        0
    }

    fn emit_header(&self, line: &str) {
        if let Some((header, _, token)) = self.sinks {
            header(token, line.as_ptr(), line.len());
        }
    }
}

fn fake<'a>(ctx: *mut c_void) -> &'a mut FakeEngine {
    unsafe { &mut *(ctx as *mut FakeEngine) }
}

fn text(ptr: *const c_char) -> String {
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

extern "C" fn set_long(ctx: *mut c_void, option: u32, value: i64) -> i32 {
    fake(ctx).record(option, value.to_string())
}

extern "C" fn set_str(ctx: *mut c_void, option: u32, value: *const c_char) -> i32 {
    fake(ctx).record(option, text(value))
}

extern "C" fn set_bytes(ctx: *mut c_void, option: u32, data: *const u8, len: usize) -> i32 {
    let bytes = unsafe { std::slice::from_raw_parts(data, len) };
    fake(ctx).record(option, String::from_utf8_lossy(bytes).into_owned())
}

extern "C" fn set_list(
    ctx: *mut c_void,
    option: u32,
    items: *const *const c_char,
    len: usize,
) -> i32 {
    let items = unsafe { std::slice::from_raw_parts(items, len) };
    let joined = items.iter().map(|p| text(*p)).collect::<Vec<_>>().join("|");
    fake(ctx).record(option, joined)
}

extern "C" fn set_form(
    ctx: *mut c_void,
    option: u32,
    fields: *const XferFormField,
    len: usize,
) -> i32 {
    let fields = unsafe { std::slice::from_raw_parts(fields, len) };
    let rendered = fields
        .iter()
        .map(|f| {
            let mut out = text(f.name);
            if !f.value.is_null() {
                out.push('=');
                out.push_str(&text(f.value));
            }
            if !f.path.is_null() {
                out.push('@');
                out.push_str(&text(f.path));
            }
            if !f.mime_type.is_null() {
                out.push(';');
                out.push_str(&text(f.mime_type));
            }
            out
        })
        .collect::<Vec<_>>()
        .join("|");
    fake(ctx).record(option, rendered)
}

extern "C" fn register_sinks(ctx: *mut c_void, header: XferSinkFn, body: XferSinkFn, token: u64) {
    fake(ctx).sinks = Some((header, body, token));
}

extern "C" fn step(ctx: *mut c_void, done: *mut bool) -> i32 {
    let engine = fake(ctx);
    let index = engine.steps;
    engine.steps += 1;

    if index == 0 {
        engine.emit_header(&format!("HTTP/1.1 {} Fake\r\n", engine.status));
        engine.emit_header("Content-Type: text/plain\r\n");
        engine.emit_header("\r\n");
    } else if let Some(chunk) = engine.body.get(index - 1) {
        if let Some((_, body, token)) = engine.sinks {
            body(token, chunk.as_ptr(), chunk.len());
        }
        engine.delivered += chunk.len();
    }

    if index >= engine.body.len() {
        unsafe { *done = true };
        return engine.fail;
    }
    0
}

extern "C" fn perform(ctx: *mut c_void) -> i32 {
    loop {
        let mut done = false;
        let rc = step(ctx, &mut done);
        if rc != 0 || done {
            return rc;
        }
    }
}

extern "C" fn info_long(ctx: *mut c_void, key: u32, out: *mut i64) -> bool {
    let engine = fake(ctx);
    if key == IntInfo::ResponseCode as u32 && engine.steps > 0 {
        unsafe { *out = engine.status };
        return true;
    }
    false
}

extern "C" fn info_double(ctx: *mut c_void, key: u32, out: *mut f64) -> bool {
    let engine = fake(ctx);
    if key == DoubleInfo::SizeDownload as u32 && engine.steps > 0 {
        unsafe { *out = engine.delivered as f64 };
        return true;
    }
    false
}

extern "C" fn info_str(ctx: *mut c_void, key: u32) -> *const c_char {
    let engine = fake(ctx);
    match (&engine.url, key == StringInfo::Url as u32) {
        (Some(url), true) => url.as_ptr(),
        _ => std::ptr::null(),
    }
}

extern "C" fn strerror(_ctx: *mut c_void, _code: i32) -> *const c_char {
    c"fake engine failure".as_ptr()
}

/// Forgets options, progress and sinks.
extern "C" fn reset(ctx: *mut c_void) {
    let engine = fake(ctx);
    engine.options.lock().unwrap().clear();
    engine.sinks = None;
    engine.steps = 0;
    engine.delivered = 0;
    engine.url = None;
}

extern "C" fn dispose(ctx: *mut c_void) {
    let engine = unsafe { Box::from_raw(ctx as *mut FakeEngine) };
    if let Some(counter) = &engine.disposed {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) fn fake_vtable(engine: FakeEngine) -> XferEngineVTable {
    XferEngineVTable {
        ctx: Box::into_raw(Box::new(engine)) as *mut c_void,
        set_long,
        set_str,
        set_bytes,
        set_list,
        set_form,
        register_sinks,
        step,
        perform,
        info_long,
        info_double,
        info_str,
        strerror,
        reset,
        dispose,
    }
}
