//! Request stand-in
//!
//! [`MockRequest`] carries the plain data a handler reads from a request
//! (route parameters, query, body, session, cookies, headers) together with
//! recording stubs for the content negotiation and header query methods.
//!
//! The data is seeded with [`RequestOptions`] and remains mutable afterwards:
//!
//! ```no_run
//! use handler_mocks::{Mocks, RequestOptions, ResponseOptions};
//! use serde_json::json;
//!
//! let mocks = Mocks::create(
//!     RequestOptions::new().param("name", "Carsten"),
//!     ResponseOptions::new()
//! );
//! mocks.req.data().query.insert("value".into(), json!("ok"));
//! ```

use std::{fmt, sync::{Arc, Mutex, MutexGuard}};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use crate::{
    error::Result,
    stub::{Args, IntoArgs, Stub},
    utils::sync::lock
};

/// Plain data fields of a request stand-in
#[derive(Debug, Clone, PartialEq)]
pub struct RequestData {
    /// HTTP method
    pub method: String,
    /// Original request URL including the query string
    pub url: String,
    /// Path part of the URL
    pub path: String,
    /// Route parameters
    pub params: Map<String, Value>,
    /// Query string parameters
    pub query: Map<String, Value>,
    /// Parsed request body
    pub body: Value,
    /// Session data
    pub session: Map<String, Value>,
    /// Cookies sent by the client
    pub cookies: Map<String, Value>,
    /// Signed cookies sent by the client
    pub signed_cookies: Map<String, Value>,
    /// Request headers, keyed by lowercase name
    pub headers: IndexMap<String, String>,
    /// Any other fields handlers attach to a request, e.g. `user`
    pub extra: Map<String, Value>,
}

impl Default for RequestData {
    fn default() -> Self {
        Self {
            method: String::from("GET"),
            url: String::from("/"),
            path: String::from("/"),
            params: Map::new(),
            query: Map::new(),
            body: Value::Object(Map::new()),
            session: Map::new(),
            cookies: Map::new(),
            signed_cookies: Map::new(),
            headers: IndexMap::new(),
            extra: Map::new(),
        }
    }
}

/// Stubbed request methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestMethod {
    /// `accepts(types)`
    Accepts,
    /// `accepts_charsets(charsets)`
    AcceptsCharsets,
    /// `accepts_encodings(encodings)`
    AcceptsEncodings,
    /// `accepts_languages(languages)`
    AcceptsLanguages,
    /// `get(name)`
    Get,
    /// `header(name)`
    Header,
    /// `is(type)`
    Is,
}

impl RequestMethod {
    /// Number of stubbed request methods
    pub const COUNT: usize = 7;

    /// All stubbed request methods
    pub const ALL: [RequestMethod; Self::COUNT] = [
        RequestMethod::Accepts,
        RequestMethod::AcceptsCharsets,
        RequestMethod::AcceptsEncodings,
        RequestMethod::AcceptsLanguages,
        RequestMethod::Get,
        RequestMethod::Header,
        RequestMethod::Is,
    ];

    /// Method name as used in failure messages
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMethod::Accepts => "accepts",
            RequestMethod::AcceptsCharsets => "accepts_charsets",
            RequestMethod::AcceptsEncodings => "accepts_encodings",
            RequestMethod::AcceptsLanguages => "accepts_languages",
            RequestMethod::Get => "get",
            RequestMethod::Header => "header",
            RequestMethod::Is => "is",
        }
    }
}

impl fmt::Display for RequestMethod {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Override parameters for a request stand-in
///
/// # Example
/// ```no_run
/// use handler_mocks::{RequestOptions, request::RequestMethod};
/// use serde_json::json;
///
/// let options = RequestOptions::new()
///     .method("POST")
///     .url("/users?active=true")
///     .param("id", "42")
///     .body(json!({ "name": "Carsten" }))
///     .header("Content-Type", "application/json")
///     .returns(RequestMethod::Accepts, "json");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    data: RequestData,
    returns: Vec<(RequestMethod, Value)>,
}

impl RequestOptions {
    /// Creates options that leave every field at its default
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP method
    ///
    /// Default: `GET`
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.data.method = method.into();
        self
    }

    /// Sets the request URL; the query string, if any, is merged into `query`
    ///
    /// The query string is decoded leniently: empty segments are skipped,
    /// a key without `=` gets an empty value and invalid UTF-8 escapes are
    /// replaced with `U+FFFD`. A query string that still fails to decode
    /// is ignored, leaving `query` as it was. Use [`RequestOptions::query`]
    /// to set values that must not go through URL decoding.
    ///
    /// Default: `/`
    pub fn url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        let (path, query) = match url.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (url.as_str(), None),
        };
        self.data.path = path.to_string();
        if let Some(query) = query {
            let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
                .unwrap_or_default();
            for (key, value) in pairs {
                self.data.query.insert(key, Value::String(value));
            }
        }
        self.data.url = url;
        self
    }

    /// Adds a route parameter
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.params.insert(name.into(), value.into());
        self
    }

    /// Replaces all route parameters
    pub fn params(mut self, params: Map<String, Value>) -> Self {
        self.data.params = params;
        self
    }

    /// Adds a query string parameter
    pub fn query_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.query.insert(name.into(), value.into());
        self
    }

    /// Replaces all query string parameters
    pub fn query(mut self, query: Map<String, Value>) -> Self {
        self.data.query = query;
        self
    }

    /// Sets the parsed request body
    ///
    /// Default: `{}`
    pub fn body(mut self, body: impl Into<Value>) -> Self {
        self.data.body = body.into();
        self
    }

    /// Adds a session entry
    pub fn session(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.session.insert(key.into(), value.into());
        self
    }

    /// Adds a cookie
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.cookies.insert(name.into(), value.into());
        self
    }

    /// Adds a signed cookie
    pub fn signed_cookie(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.signed_cookies.insert(name.into(), value.into());
        self
    }

    /// Adds a request header; names are case-insensitive
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.data.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Adds a handler-specific field, such as an authenticated `user`
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.extra.insert(key.into(), value.into());
        self
    }

    /// Presets the value returned by a stubbed method
    pub fn returns(mut self, method: RequestMethod, value: impl Into<Value>) -> Self {
        self.returns.push((method, value.into()));
        self
    }
}

/// Request stand-in passed to the handler under test
///
/// Clones share the same data and stubs.
#[derive(Clone)]
pub struct MockRequest {
    inner: Arc<RequestInner>
}

struct RequestInner {
    data: Mutex<RequestData>,
    stubs: [Stub; RequestMethod::COUNT],
}

impl fmt::Debug for MockRequest {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MockRequest(..)")
    }
}

impl Default for MockRequest {
    #[inline]
    fn default() -> Self {
        Self::new(RequestOptions::default())
    }
}

impl MockRequest {
    /// Creates a request stand-in from the override parameters
    pub fn new(options: RequestOptions) -> Self {
        let stubs: [Stub; RequestMethod::COUNT] = RequestMethod::ALL
            .map(|method| Stub::new(method.as_str()));
        for (method, value) in options.returns {
            stubs[method as usize].returns(value);
        }
        Self {
            inner: Arc::new(RequestInner {
                data: Mutex::new(options.data),
                stubs,
            })
        }
    }

    /// Locks the plain data fields for reading or modification
    #[inline]
    pub fn data(&self) -> MutexGuard<'_, RequestData> {
        lock(&self.inner.data)
    }

    /// Returns the stub of the given method
    #[inline]
    pub fn stub(&self, method: RequestMethod) -> &Stub {
        &self.inner.stubs[method as usize]
    }

    /// Returns `true` if both values refer to the same stand-in
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// HTTP method
    #[inline]
    pub fn method(&self) -> String {
        self.data().method.clone()
    }

    /// Path part of the URL
    #[inline]
    pub fn path(&self) -> String {
        self.data().path.clone()
    }

    /// A route parameter
    #[inline]
    pub fn param(&self, name: &str) -> Option<Value> {
        self.data().params.get(name).cloned()
    }

    /// All route parameters
    #[inline]
    pub fn params(&self) -> Map<String, Value> {
        self.data().params.clone()
    }

    /// A query string parameter
    #[inline]
    pub fn query_value(&self, name: &str) -> Option<Value> {
        self.data().query.get(name).cloned()
    }

    /// All query string parameters
    #[inline]
    pub fn query(&self) -> Map<String, Value> {
        self.data().query.clone()
    }

    /// Parsed request body
    #[inline]
    pub fn body(&self) -> Value {
        self.data().body.clone()
    }

    /// Deserializes the request body into `T`
    ///
    /// # Example
    /// ```no_run
    /// use handler_mocks::{MockRequest, RequestOptions};
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct User { name: String }
    ///
    /// let req = MockRequest::new(RequestOptions::new().body(serde_json::json!({ "name": "Carsten" })));
    /// let user: User = req.body_as().unwrap();
    /// assert_eq!(user.name, "Carsten");
    /// ```
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T> {
        let body = self.body();
        Ok(serde_json::from_value(body)?)
    }

    /// Deserializes the route parameters into `T`
    pub fn params_as<T: DeserializeOwned>(&self) -> Result<T> {
        let params = Value::Object(self.params());
        Ok(serde_json::from_value(params)?)
    }

    /// Deserializes the query string parameters into `T`
    pub fn query_as<T: DeserializeOwned>(&self) -> Result<T> {
        let query = Value::Object(self.query());
        Ok(serde_json::from_value(query)?)
    }

    /// A session entry
    #[inline]
    pub fn session_value(&self, key: &str) -> Option<Value> {
        self.data().session.get(key).cloned()
    }

    /// A cookie
    #[inline]
    pub fn cookie(&self, name: &str) -> Option<Value> {
        self.data().cookies.get(name).cloned()
    }

    /// A handler-specific field
    #[inline]
    pub fn extra(&self, key: &str) -> Option<Value> {
        self.data().extra.get(key).cloned()
    }

    /// Sets a handler-specific field, as a handler attaching e.g. `user` would
    #[inline]
    pub fn set_extra(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.data().extra.insert(key.into(), value.into());
    }

    /// Records a call of `accepts(types)`
    pub fn accepts(&self, types: impl IntoArgs) -> Value {
        self.stub(RequestMethod::Accepts).call(types.into_args())
    }

    /// Records a call of `accepts_charsets(charsets)`
    pub fn accepts_charsets(&self, charsets: impl IntoArgs) -> Value {
        self.stub(RequestMethod::AcceptsCharsets).call(charsets.into_args())
    }

    /// Records a call of `accepts_encodings(encodings)`
    pub fn accepts_encodings(&self, encodings: impl IntoArgs) -> Value {
        self.stub(RequestMethod::AcceptsEncodings).call(encodings.into_args())
    }

    /// Records a call of `accepts_languages(languages)`
    pub fn accepts_languages(&self, languages: impl IntoArgs) -> Value {
        self.stub(RequestMethod::AcceptsLanguages).call(languages.into_args())
    }

    /// Records a call of `get(name)`
    ///
    /// Returns the configured value, or the seeded header if none was configured.
    pub fn get(&self, name: &str) -> Value {
        self.header_lookup(RequestMethod::Get, name)
    }

    /// Records a call of `header(name)`, an alias of [`get`](Self::get)
    pub fn header(&self, name: &str) -> Value {
        self.header_lookup(RequestMethod::Header, name)
    }

    /// Records a call of `is(type)`
    pub fn is(&self, content_type: impl IntoArgs) -> Value {
        self.stub(RequestMethod::Is).call(content_type.into_args())
    }

    fn header_lookup(&self, method: RequestMethod, name: &str) -> Value {
        let args: Args = smallvec::smallvec![Value::from(name)];
        match self.stub(method).call(args) {
            Value::Null => self.data()
                .headers
                .get(&name.to_ascii_lowercase())
                .map_or(Value::Null, |value| Value::String(value.clone())),
            configured => configured,
        }
    }
}
