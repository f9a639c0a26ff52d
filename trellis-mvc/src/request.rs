//! 请求抽象
//!
//! 宿主环境把收到的请求转换成 [`WebRequest`]，核心只读取方法、路径、请求头、参数、上传部件和请求体

use crate::constants::CONTENT_TYPE_FORM;
use crate::error::Exception;
use crate::multipart::Part;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, Uri};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// 会话
#[derive(Debug)]
pub struct Session {
    id: String,
    attributes: RwLock<HashMap<String, serde_json::Value>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            attributes: RwLock::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn attribute(&self, name: &str) -> Option<serde_json::Value> {
        self.attributes.read().get(name).cloned()
    }

    pub fn set_attribute(&self, name: impl Into<String>, value: serde_json::Value) {
        self.attributes.write().insert(name.into(), value);
    }

    pub fn remove_attribute(&self, name: &str) -> Option<serde_json::Value> {
        self.attributes.write().remove(name)
    }
}

/// HTTP 请求
#[derive(Debug)]
pub struct WebRequest {
    method: Method,
    uri: Uri,
    context_path: String,
    headers: HeaderMap,
    parameters: HashMap<String, Vec<String>>,
    parts: Vec<Part>,
    body: Mutex<Option<Bytes>>,
    attributes: RwLock<HashMap<String, serde_json::Value>>,
    session: Mutex<Option<Arc<Session>>>,
}

impl WebRequest {
    pub fn builder() -> WebRequestBuilder {
        WebRequestBuilder::default()
    }

    /// 从 `http::Request` 构建
    ///
    /// 查询参数与 `application/x-www-form-urlencoded` 请求体都会解析为请求参数
    pub fn from_http(request: http::Request<Bytes>) -> Self {
        let (head, body) = request.into_parts();
        let mut builder = WebRequest::builder().method(head.method).uri(head.uri);
        builder.headers = head.headers;
        builder.body(body).build()
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    /// 去掉部署前缀后的请求路径，路由匹配使用这个值
    pub fn request_url(&self) -> &str {
        let path = self.uri.path();
        if self.context_path.is_empty() {
            return path;
        }
        match path.strip_prefix(self.context_path.as_str()) {
            Some("") => "/",
            Some(rest) if rest.starts_with('/') => rest,
            _ => path,
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// 参数的第一个值
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// 参数的全部值
    pub fn parameter_values(&self, name: &str) -> &[String] {
        self.parameters
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameters.keys().map(String::as_str)
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// 指定字段名的全部上传部件
    pub fn parts_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Part> + 'a {
        self.parts.iter().filter(move |p| p.name() == name)
    }

    /// 读取请求体，请求体只能读取一次
    pub fn take_body(&self) -> Result<Bytes, Exception> {
        self.body
            .lock()
            .take()
            .ok_or_else(|| Exception::illegal_state("request body has already been read"))
    }

    pub fn attribute(&self, name: &str) -> Option<serde_json::Value> {
        self.attributes.read().get(name).cloned()
    }

    pub fn set_attribute(&self, name: impl Into<String>, value: serde_json::Value) {
        self.attributes.write().insert(name.into(), value);
    }

    /// 获取会话，不存在时创建
    pub fn session(&self) -> Arc<Session> {
        Arc::clone(self.session.lock().get_or_insert_with(|| Arc::new(Session::new())))
    }
}

/// [`WebRequest`] 构建器
#[derive(Debug, Default)]
pub struct WebRequestBuilder {
    method: Method,
    uri: Uri,
    context_path: String,
    headers: HeaderMap,
    parameters: Vec<(String, String)>,
    parts: Vec<Part>,
    body: Bytes,
    session: Option<Arc<Session>>,
}

impl WebRequestBuilder {
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn uri(mut self, uri: Uri) -> Self {
        self.uri = uri;
        self
    }

    /// 解析失败时保留原来的 URI
    pub fn path(mut self, path: &str) -> Self {
        match path.parse() {
            Ok(uri) => self.uri = uri,
            Err(e) => tracing::warn!(path, error = %e, "Ignoring unparsable request uri"),
        }
        self
    }

    pub fn context_path(mut self, context_path: impl Into<String>) -> Self {
        self.context_path = context_path.into().trim_end_matches('/').to_string();
        self
    }

    pub fn header(mut self, name: HeaderName, value: &str) -> Self {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.append(name, value);
            }
            Err(e) => tracing::warn!(header = %name, error = %e, "Ignoring invalid header value"),
        }
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((name.into(), value.into()));
        self
    }

    pub fn part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn session(mut self, session: Arc<Session>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn build(self) -> WebRequest {
        let mut parameters: HashMap<String, Vec<String>> = HashMap::new();

        if let Some(query) = self.uri.query() {
            for (k, v) in url::form_urlencoded::parse(query.as_bytes()) {
                parameters.entry(k.into_owned()).or_default().push(v.into_owned());
            }
        }

        let is_form = self
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with(CONTENT_TYPE_FORM));
        if is_form {
            for (k, v) in url::form_urlencoded::parse(&self.body) {
                parameters.entry(k.into_owned()).or_default().push(v.into_owned());
            }
        }

        for (k, v) in self.parameters {
            parameters.entry(k).or_default().push(v);
        }

        WebRequest {
            method: self.method,
            uri: self.uri,
            context_path: self.context_path,
            headers: self.headers,
            parameters,
            parts: self.parts,
            body: Mutex::new(Some(self.body)),
            attributes: RwLock::new(HashMap::new()),
            session: Mutex::new(self.session),
        }
    }
}
