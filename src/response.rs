//! Response stand-in
//!
//! Every recognised response method is present on [`MockResponse`] as a
//! recording [`Stub`]. Methods that return the response in a real
//! framework return `&MockResponse` here, so handlers can chain calls:
//!
//! ```no_run
//! use handler_mocks::MockResponse;
//!
//! let res = MockResponse::default();
//! res.status(404).send("Not found");
//! ```

use std::{fmt, sync::{Arc, Mutex, MutexGuard}};
use serde_json::{Map, Value};
use smallvec::smallvec;
use crate::{
    stub::{Args, IntoArgs, Stub},
    utils::sync::lock
};

/// Plain data fields of a response stand-in
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseData {
    /// Values scoped to the current request
    pub locals: Map<String, Value>,
    /// Whether headers have already been sent
    pub headers_sent: bool,
    /// Whether the response has finished
    pub finished: bool,
    /// Whether `end` has been called on the underlying stream
    pub writable_ended: bool,
    /// Whether all data has been flushed
    pub writable_finished: bool,
}

macro_rules! response_methods {
    ($( $(#[$doc:meta])* $variant:ident => $name:literal, $chainable:literal; )*) => {
        /// Stubbed response methods
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ResponseMethod {
            $( $(#[$doc])* $variant, )*
        }

        impl ResponseMethod {
            /// All stubbed response methods
            pub const ALL: [ResponseMethod; Self::COUNT] = [
                $( ResponseMethod::$variant, )*
            ];

            /// Method name as used in failure messages
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( ResponseMethod::$variant => $name, )*
                }
            }

            /// Returns `true` if the method returns the response itself
            pub fn is_chainable(&self) -> bool {
                match self {
                    $( ResponseMethod::$variant => $chainable, )*
                }
            }
        }
    };
}

response_methods! {
    /// `cork()`
    Cork => "cork", false;
    /// `flush_headers()`
    FlushHeaders => "flush_headers", false;
    /// `get_header(name)`
    GetHeader => "get_header", false;
    /// `get_header_names()`
    GetHeaderNames => "get_header_names", false;
    /// `get_headers()`
    GetHeaders => "get_headers", false;
    /// `has_header(name)`
    HasHeader => "has_header", false;
    /// `remove_header(name)`
    RemoveHeader => "remove_header", false;
    /// `set_timeout(msecs)`
    SetTimeout => "set_timeout", true;
    /// `uncork()`
    Uncork => "uncork", false;
    /// `write(chunk)`
    Write => "write", false;
    /// `write_continue()`
    WriteContinue => "write_continue", false;
    /// `write_head(status, headers)`
    WriteHead => "write_head", true;
    /// `write_processing()`
    WriteProcessing => "write_processing", false;
    /// `append(field, value)`
    Append => "append", true;
    /// `attachment(filename)`
    Attachment => "attachment", true;
    /// `cookie(name, value, options)`
    Cookie => "cookie", true;
    /// `clear_cookie(name, options)`
    ClearCookie => "clear_cookie", true;
    /// `download(path, filename, options)`
    Download => "download", true;
    /// `end(chunk)`
    End => "end", true;
    /// `format(object)`
    Format => "format", true;
    /// `get(field)`
    Get => "get", false;
    /// `json(body)`
    Json => "json", true;
    /// `jsonp(body)`
    Jsonp => "jsonp", true;
    /// `links(links)`
    Links => "links", true;
    /// `location(path)`
    Location => "location", true;
    /// `redirect(status, path)`
    Redirect => "redirect", true;
    /// `render(view, locals)`
    Render => "render", true;
    /// `send(body)`
    Send => "send", true;
    /// `send_file(path, options)`
    SendFile => "send_file", true;
    /// `send_status(status)`
    SendStatus => "send_status", true;
    /// `set(field, value)`
    Set => "set", true;
    /// `set_header(name, value)`
    SetHeader => "set_header", true;
    /// `header(field, value)`
    Header => "header", true;
    /// `status(code)`
    Status => "status", true;
    /// `content_type(type)`
    Type => "content_type", true;
    /// `vary(field)`
    Vary => "vary", true;
}

impl ResponseMethod {
    /// Number of stubbed response methods
    pub const COUNT: usize = 36;
}

impl fmt::Display for ResponseMethod {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations that finish handling of a request
///
/// Exactly one of them is expected per handler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalAction {
    /// `res.redirect(..)`
    Redirect,
    /// `res.send(..)`
    Send,
    /// `res.send_status(..)`
    SendStatus,
    /// `res.send_file(..)`
    SendFile,
    /// `res.download(..)`
    Download,
    /// `res.render(..)`
    Render,
    /// `res.end(..)`
    End,
    /// `res.json(..)`
    Json,
    /// `res.jsonp(..)`
    Jsonp,
    /// `next(..)`
    Next,
}

impl TerminalAction {
    /// The fixed catalog of terminal actions, in the order they are checked
    pub const ALL: [TerminalAction; 10] = [
        TerminalAction::Redirect,
        TerminalAction::Send,
        TerminalAction::SendStatus,
        TerminalAction::SendFile,
        TerminalAction::Download,
        TerminalAction::Render,
        TerminalAction::End,
        TerminalAction::Json,
        TerminalAction::Jsonp,
        TerminalAction::Next,
    ];

    /// The response method behind this action; `None` for the continuation
    pub fn response_method(&self) -> Option<ResponseMethod> {
        match self {
            TerminalAction::Redirect => Some(ResponseMethod::Redirect),
            TerminalAction::Send => Some(ResponseMethod::Send),
            TerminalAction::SendStatus => Some(ResponseMethod::SendStatus),
            TerminalAction::SendFile => Some(ResponseMethod::SendFile),
            TerminalAction::Download => Some(ResponseMethod::Download),
            TerminalAction::Render => Some(ResponseMethod::Render),
            TerminalAction::End => Some(ResponseMethod::End),
            TerminalAction::Json => Some(ResponseMethod::Json),
            TerminalAction::Jsonp => Some(ResponseMethod::Jsonp),
            TerminalAction::Next => None,
        }
    }

    /// Action name as used in failure messages
    pub fn as_str(&self) -> &'static str {
        match self.response_method() {
            Some(method) => method.as_str(),
            None => "next",
        }
    }
}

impl fmt::Display for TerminalAction {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Override parameters for a response stand-in
///
/// # Example
/// ```no_run
/// use handler_mocks::{ResponseOptions, response::ResponseMethod};
///
/// let options = ResponseOptions::new()
///     .local("user", "admin")
///     .returns(ResponseMethod::GetHeader, "text/html");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResponseOptions {
    data: ResponseData,
    returns: Vec<(ResponseMethod, Value)>,
}

impl ResponseOptions {
    /// Creates options that leave every field at its default
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value to `locals`
    pub fn local(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.locals.insert(key.into(), value.into());
        self
    }

    /// Replaces `locals`
    pub fn locals(mut self, locals: Map<String, Value>) -> Self {
        self.data.locals = locals;
        self
    }

    /// Marks headers as already sent
    ///
    /// Default: `false`
    pub fn headers_sent(mut self, sent: bool) -> Self {
        self.data.headers_sent = sent;
        self
    }

    /// Marks the response as finished
    ///
    /// Default: `false`
    pub fn finished(mut self, finished: bool) -> Self {
        self.data.finished = finished;
        self.data.writable_ended = finished;
        self.data.writable_finished = finished;
        self
    }

    /// Presets the value returned by a non-chainable stubbed method
    pub fn returns(mut self, method: ResponseMethod, value: impl Into<Value>) -> Self {
        self.returns.push((method, value.into()));
        self
    }
}

/// Response stand-in passed to the handler under test
///
/// Clones share the same data and stubs.
#[derive(Clone)]
pub struct MockResponse {
    inner: Arc<ResponseInner>
}

struct ResponseInner {
    data: Mutex<ResponseData>,
    stubs: [Stub; ResponseMethod::COUNT],
}

impl fmt::Debug for MockResponse {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MockResponse(..)")
    }
}

impl Default for MockResponse {
    #[inline]
    fn default() -> Self {
        Self::new(ResponseOptions::default())
    }
}

impl MockResponse {
    /// Creates a response stand-in from the override parameters
    pub fn new(options: ResponseOptions) -> Self {
        let stubs: [Stub; ResponseMethod::COUNT] = ResponseMethod::ALL
            .map(|method| Stub::new(method.as_str()));
        for (method, value) in options.returns {
            stubs[method as usize].returns(value);
        }
        Self {
            inner: Arc::new(ResponseInner {
                data: Mutex::new(options.data),
                stubs,
            })
        }
    }

    /// Locks the plain data fields for reading or modification
    #[inline]
    pub fn data(&self) -> MutexGuard<'_, ResponseData> {
        lock(&self.inner.data)
    }

    /// Returns the stub of the given method
    #[inline]
    pub fn stub(&self, method: ResponseMethod) -> &Stub {
        &self.inner.stubs[method as usize]
    }

    /// Returns `true` if both values refer to the same stand-in
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// A value from `locals`
    #[inline]
    pub fn local(&self, key: &str) -> Option<Value> {
        self.data().locals.get(key).cloned()
    }

    /// Sets a value in `locals`
    #[inline]
    pub fn set_local(&self, key: impl Into<String>, value: impl Into<Value>) -> &Self {
        self.data().locals.insert(key.into(), value.into());
        self
    }

    #[inline]
    fn record(&self, method: ResponseMethod, args: Args) -> Value {
        self.stub(method).call(args)
    }

    #[inline]
    fn chain(&self, method: ResponseMethod, args: Args) -> &Self {
        self.stub(method).call(args);
        self
    }

    /// Records `cork()`
    pub fn cork(&self) {
        self.record(ResponseMethod::Cork, Args::new());
    }

    /// Records `flush_headers()`
    pub fn flush_headers(&self) {
        self.record(ResponseMethod::FlushHeaders, Args::new());
    }

    /// Records `get_header(name)` and returns the configured value
    pub fn get_header(&self, name: &str) -> Value {
        self.record(ResponseMethod::GetHeader, name.into_args())
    }

    /// Records `get_header_names()` and returns the configured value
    pub fn get_header_names(&self) -> Value {
        self.record(ResponseMethod::GetHeaderNames, Args::new())
    }

    /// Records `get_headers()` and returns the configured value
    pub fn get_headers(&self) -> Value {
        self.record(ResponseMethod::GetHeaders, Args::new())
    }

    /// Records `has_header(name)`; `false` unless configured otherwise
    pub fn has_header(&self, name: &str) -> bool {
        self.record(ResponseMethod::HasHeader, name.into_args())
            .as_bool()
            .unwrap_or(false)
    }

    /// Records `remove_header(name)`
    pub fn remove_header(&self, name: &str) {
        self.record(ResponseMethod::RemoveHeader, name.into_args());
    }

    /// Records `set_timeout(msecs)`
    pub fn set_timeout(&self, msecs: u64) -> &Self {
        self.chain(ResponseMethod::SetTimeout, msecs.into_args())
    }

    /// Records `uncork()`
    pub fn uncork(&self) {
        self.record(ResponseMethod::Uncork, Args::new());
    }

    /// Records `write(chunk)` and returns the configured value
    pub fn write(&self, chunk: impl IntoArgs) -> Value {
        self.record(ResponseMethod::Write, chunk.into_args())
    }

    /// Records `write_continue()`
    pub fn write_continue(&self) {
        self.record(ResponseMethod::WriteContinue, Args::new());
    }

    /// Records `write_head(status, headers)`
    pub fn write_head(&self, args: impl IntoArgs) -> &Self {
        self.chain(ResponseMethod::WriteHead, args.into_args())
    }

    /// Records `write_processing()`
    pub fn write_processing(&self) {
        self.record(ResponseMethod::WriteProcessing, Args::new());
    }

    /// Records `append(field, value)`
    pub fn append(&self, field: impl Into<String>, value: impl Into<Value>) -> &Self {
        self.chain(ResponseMethod::Append, smallvec![Value::String(field.into()), value.into()])
    }

    /// Records `attachment(filename)`
    pub fn attachment(&self, args: impl IntoArgs) -> &Self {
        self.chain(ResponseMethod::Attachment, args.into_args())
    }

    /// Records `cookie(name, value, options)`
    pub fn cookie(&self, args: impl IntoArgs) -> &Self {
        self.chain(ResponseMethod::Cookie, args.into_args())
    }

    /// Records `clear_cookie(name, options)`
    pub fn clear_cookie(&self, args: impl IntoArgs) -> &Self {
        self.chain(ResponseMethod::ClearCookie, args.into_args())
    }

    /// Records `download(path, filename, options)`
    pub fn download(&self, args: impl IntoArgs) -> &Self {
        self.chain(ResponseMethod::Download, args.into_args())
    }

    /// Records `end(chunk)`
    pub fn end(&self, args: impl IntoArgs) -> &Self {
        self.chain(ResponseMethod::End, args.into_args())
    }

    /// Records `format(object)`
    pub fn format(&self, object: impl Into<Value>) -> &Self {
        self.chain(ResponseMethod::Format, smallvec![object.into()])
    }

    /// Records `get(field)` and returns the configured value
    pub fn get(&self, field: &str) -> Value {
        self.record(ResponseMethod::Get, field.into_args())
    }

    /// Records `json(body)`
    pub fn json(&self, body: impl Into<Value>) -> &Self {
        self.chain(ResponseMethod::Json, smallvec![body.into()])
    }

    /// Records `jsonp(body)`
    pub fn jsonp(&self, body: impl Into<Value>) -> &Self {
        self.chain(ResponseMethod::Jsonp, smallvec![body.into()])
    }

    /// Records `links(links)`
    pub fn links(&self, links: impl Into<Value>) -> &Self {
        self.chain(ResponseMethod::Links, smallvec![links.into()])
    }

    /// Records `location(path)`
    pub fn location(&self, path: impl Into<String>) -> &Self {
        self.chain(ResponseMethod::Location, smallvec![Value::String(path.into())])
    }

    /// Records `redirect(path)` or `redirect(status, path)`
    pub fn redirect(&self, args: impl IntoArgs) -> &Self {
        self.chain(ResponseMethod::Redirect, args.into_args())
    }

    /// Records `render(view, locals)`
    pub fn render(&self, args: impl IntoArgs) -> &Self {
        self.chain(ResponseMethod::Render, args.into_args())
    }

    /// Records `send(body)`; pass `()` to send without a body
    pub fn send(&self, args: impl IntoArgs) -> &Self {
        self.chain(ResponseMethod::Send, args.into_args())
    }

    /// Records `send_file(path, options)`
    pub fn send_file(&self, args: impl IntoArgs) -> &Self {
        self.chain(ResponseMethod::SendFile, args.into_args())
    }

    /// Records `send_status(status)`
    pub fn send_status(&self, status: u16) -> &Self {
        self.chain(ResponseMethod::SendStatus, status.into_args())
    }

    /// Records `set(field, value)`
    pub fn set(&self, field: impl Into<String>, value: impl Into<Value>) -> &Self {
        self.chain(ResponseMethod::Set, smallvec![Value::String(field.into()), value.into()])
    }

    /// Records `set_header(name, value)`
    pub fn set_header(&self, name: impl Into<String>, value: impl Into<Value>) -> &Self {
        self.chain(ResponseMethod::SetHeader, smallvec![Value::String(name.into()), value.into()])
    }

    /// Records `header(field, value)`
    pub fn header(&self, field: impl Into<String>, value: impl Into<Value>) -> &Self {
        self.chain(ResponseMethod::Header, smallvec![Value::String(field.into()), value.into()])
    }

    /// Records `status(code)`
    pub fn status(&self, code: u16) -> &Self {
        self.chain(ResponseMethod::Status, code.into_args())
    }

    /// Records `content_type(type)`
    pub fn content_type(&self, content_type: impl Into<String>) -> &Self {
        self.chain(ResponseMethod::Type, smallvec![Value::String(content_type.into())])
    }

    /// Records `vary(field)`
    pub fn vary(&self, field: impl Into<String>) -> &Self {
        self.chain(ResponseMethod::Vary, smallvec![Value::String(field.into())])
    }
}
