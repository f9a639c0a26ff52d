//! 响应抽象

use crate::error::{Exception, ILLEGAL_ARGUMENT};
use bytes::{Bytes, BytesMut};
use http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use parking_lot::Mutex;
use std::sync::Arc;

/// 请求处理期间共享的响应句柄
pub type SharedResponse = Arc<Mutex<WebResponse>>;

/// HTTP 响应
#[derive(Debug, Default)]
pub struct WebResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: BytesMut,
    forwarded_to: Option<String>,
}

impl WebResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// 设置响应头，覆盖同名的旧值
    pub fn set_header(&mut self, name: HeaderName, value: &str) -> Result<(), Exception> {
        let value = HeaderValue::from_str(value).map_err(|e| {
            Exception::from_error(&ILLEGAL_ARGUMENT, &e)
        })?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// 按名称设置响应头，名称来自用户配置
    pub fn set_raw_header(&mut self, name: &str, value: &str) -> Result<(), Exception> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Exception::from_error(&ILLEGAL_ARGUMENT, &e))?;
        self.set_header(name, value)
    }

    pub fn set_content_type(&mut self, content_type: &str) -> Result<(), Exception> {
        self.set_header(header::CONTENT_TYPE, content_type)
    }

    pub fn write(&mut self, data: &[u8]) {
        self.body.extend_from_slice(data);
    }

    pub fn write_str(&mut self, text: &str) {
        self.write(text.as_bytes());
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// 响应体按 UTF-8 解码，主要用于日志与测试
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// 重定向
    pub fn send_redirect(&mut self, location: &str) -> Result<(), Exception> {
        self.set_header(header::LOCATION, location)?;
        self.status = StatusCode::FOUND;
        Ok(())
    }

    /// 记录服务端转发目标，由宿主环境完成转发
    pub fn forward(&mut self, target: impl Into<String>) {
        self.forwarded_to = Some(target.into());
    }

    pub fn forwarded_to(&self) -> Option<&str> {
        self.forwarded_to.as_deref()
    }

    pub fn into_http(self) -> http::Response<Bytes> {
        let mut response = http::Response::new(self.body.freeze());
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_and_convert() {
        let mut response = WebResponse::new();
        response.set_status(StatusCode::CREATED);
        response.set_content_type("text/plain").unwrap();
        response.write_str("hello ");
        response.write(b"world");

        let http = response.into_http();
        assert_eq!(http.status(), StatusCode::CREATED);
        assert_eq!(http.headers()[header::CONTENT_TYPE], "text/plain");
        assert_eq!(http.body().as_ref(), b"hello world");
    }

    #[test]
    fn test_invalid_header_value_is_an_exception() {
        let mut response = WebResponse::new();
        let err = response.set_header(header::LOCATION, "bad\nvalue").unwrap_err();
        assert!(err.is_instance_of(&ILLEGAL_ARGUMENT));
    }

    #[test]
    fn test_redirect() {
        let mut response = WebResponse::new();
        response.send_redirect("/login").unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.header("location"), Some("/login"));
    }
}
