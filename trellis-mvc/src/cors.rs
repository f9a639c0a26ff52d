//! 跨域处理
//!
//! 带 `Origin` 头的请求视为跨域请求；`OPTIONS` 且带 `Access-Control-Request-Method` 的是预检请求。
//! 预检请求完全由这里应答，不会进入任何处理器或拦截器。

use crate::constants::{
    CORS_ALLOWED_HEADERS, CORS_ALLOWED_METHODS, CORS_ALLOWED_ORIGINS, CORS_ALLOW_CREDENTIALS,
    CORS_MAX_AGE, CORS_REJECTED_BODY, CONTENT_TYPE_PLAIN,
};
use crate::error::{MvcError, MvcResult};
use crate::request::WebRequest;
use crate::response::WebResponse;
use http::{header, Method, StatusCode};
use trellis_core::Environment;

/// 通配值
pub const ALL: &str = "*";

/// 全局跨域配置，启动期可变，请求期只读
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsConfiguration {
    allowed_origins: Vec<String>,
    allowed_methods: Vec<String>,
    allowed_headers: Vec<String>,
    allow_credentials: bool,
    max_age: u64,
}

impl Default for CorsConfiguration {
    fn default() -> Self {
        let mut config = Self::empty();
        config.apply_default_configuration();
        config
    }
}

impl CorsConfiguration {
    /// 不允许任何跨域请求的空配置
    pub fn empty() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allowed_methods: Vec::new(),
            allowed_headers: Vec::new(),
            allow_credentials: false,
            max_age: 3600,
        }
    }

    /// 默认配置叠加 `trellis.mvc.cors.*`，出现的列表键整体替换默认值
    pub fn from_environment(env: &Environment) -> Self {
        let mut config = Self::default();
        if let Some(origins) = env.get_string_array(CORS_ALLOWED_ORIGINS) {
            config.allowed_origins = origins;
        }
        if let Some(methods) = env.get_string_array(CORS_ALLOWED_METHODS) {
            config.allowed_methods = methods.iter().map(|m| m.to_uppercase()).collect();
        }
        if let Some(headers) = env.get_string_array(CORS_ALLOWED_HEADERS) {
            config.allowed_headers = headers;
        }
        if let Some(credentials) = env.get_bool(CORS_ALLOW_CREDENTIALS) {
            config.allow_credentials = credentials;
        }
        if let Some(max_age) = env.get_i64(CORS_MAX_AGE).filter(|age| *age >= 0) {
            config.max_age = max_age as u64;
        }
        config
    }

    pub fn apply_default_configuration(&mut self) {
        self.allowed_origins(&[ALL])
            .allow_credentials(false)
            .allowed_methods(&[
                Method::OPTIONS,
                Method::GET,
                Method::POST,
                Method::DELETE,
                Method::PUT,
            ])
            .allowed_headers(&[ALL]);
    }

    /// 清空默认配置，之后只允许显式添加的值
    pub fn clear_default_configuration(&mut self) -> &mut Self {
        self.allowed_origins.clear();
        self.allowed_methods.clear();
        self.allowed_headers.clear();
        self.allow_credentials = false;
        self
    }

    pub fn allowed_origins(&mut self, origins: &[&str]) -> &mut Self {
        merge(&mut self.allowed_origins, origins.iter().map(|o| o.to_string()));
        self
    }

    pub fn allowed_methods(&mut self, methods: &[Method]) -> &mut Self {
        merge(&mut self.allowed_methods, methods.iter().map(|m| m.as_str().to_string()));
        self
    }

    pub fn allowed_headers(&mut self, headers: &[&str]) -> &mut Self {
        merge(&mut self.allowed_headers, headers.iter().map(|h| h.to_string()));
        self
    }

    pub fn allow_credentials(&mut self, allow: bool) -> &mut Self {
        self.allow_credentials = allow;
        self
    }

    pub fn max_age(&mut self, seconds: u64) -> &mut Self {
        self.max_age = seconds;
        self
    }

    pub fn get_allowed_origins(&self) -> &[String] {
        &self.allowed_origins
    }

    pub fn get_allowed_methods(&self) -> &[String] {
        &self.allowed_methods
    }

    pub fn get_allowed_headers(&self) -> &[String] {
        &self.allowed_headers
    }

    pub fn get_allow_credentials(&self) -> bool {
        self.allow_credentials
    }

    pub fn get_max_age(&self) -> u64 {
        self.max_age
    }

    /// 通配来源不能与携带凭据同时开启
    pub fn validate(&self) -> MvcResult<()> {
        if self.allow_credentials && self.allowed_origins.iter().any(|o| o == ALL) {
            return Err(MvcError::configuration(
                "When allow-credentials is true, allowed-origins cannot contain \"*\"; list the origins explicitly",
            ));
        }
        Ok(())
    }

    /// 检查请求来源，返回应写入 `Access-Control-Allow-Origin` 的值；不允许时返回 `None`
    ///
    /// 比较时忽略末尾的 `/` 与大小写
    pub fn check_origin(&self, origin: &str) -> Option<String> {
        if origin.trim().is_empty() {
            return None;
        }
        if self.allowed_origins.iter().any(|o| o == ALL) {
            return Some(ALL.to_string());
        }
        let candidate = origin.strip_suffix('/').unwrap_or(origin);
        self.allowed_origins
            .iter()
            .any(|allowed| candidate.eq_ignore_ascii_case(allowed))
            .then(|| origin.to_string())
    }

    /// 处理跨域请求，写好响应头；拒绝时写 403 并返回 `false`
    pub fn process(&self, request: &WebRequest, response: &mut WebResponse) -> bool {
        let origin = request.header(header::ORIGIN.as_str()).unwrap_or_default();
        let Some(allow_origin) = self.check_origin(origin) else {
            tracing::debug!(origin = origin, path = request.path(), "Rejected CORS request");
            reject(response);
            return false;
        };

        let mut headers = vec![
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin),
            (
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                self.allow_credentials.to_string(),
            ),
        ];
        if is_preflight_request(request) {
            headers.push((header::ACCESS_CONTROL_MAX_AGE, self.max_age.to_string()));
            headers.push((
                header::ACCESS_CONTROL_ALLOW_METHODS,
                self.allowed_methods.join(", "),
            ));
            headers.push((
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                self.allowed_headers.join(", "),
            ));
        }

        for (name, value) in headers {
            if let Err(e) = response.set_header(name, &value) {
                tracing::warn!(error = %e, "Failed to write CORS header");
            }
        }
        true
    }
}

fn merge(target: &mut Vec<String>, values: impl Iterator<Item = String>) {
    for value in values {
        if !target.contains(&value) {
            target.push(value);
        }
    }
}

fn reject(response: &mut WebResponse) {
    response.set_status(StatusCode::FORBIDDEN);
    if let Err(e) = response.set_content_type(CONTENT_TYPE_PLAIN) {
        tracing::warn!(error = %e, "Failed to write CORS rejection content type");
    }
    response.write_str(CORS_REJECTED_BODY);
}

/// 带 `Origin` 头即视为跨域请求
pub fn is_cors_request(request: &WebRequest) -> bool {
    request.header(header::ORIGIN.as_str()).is_some()
}

pub fn is_preflight_request(request: &WebRequest) -> bool {
    request.method() == Method::OPTIONS
        && is_cors_request(request)
        && request
            .header(header::ACCESS_CONTROL_REQUEST_METHOD.as_str())
            .is_some()
}
