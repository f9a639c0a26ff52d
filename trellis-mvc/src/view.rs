//! 视图结果
//!
//! 处理器的返回值统一成 [`ViewResult`]，每个请求恰好渲染一次

use crate::constants::{
    CONTENT_TYPE_HTML, CONTENT_TYPE_JSON, CONTENT_TYPE_OCTET_STREAM, CONTENT_TYPE_PLAIN,
};
use crate::context::RequestContext;
use crate::error::{Exception, MvcResult, ILLEGAL_ARGUMENT, IO_EXCEPTION};
use crate::response::WebResponse;
use bytes::Bytes;
use http::header;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// 文件下载的数据来源
#[derive(Debug, Clone)]
pub enum FileSource {
    Bytes(Bytes),
    Path(PathBuf),
}

/// 处理结果
#[derive(Debug)]
pub enum ViewResult {
    /// 不写响应体
    Void,
    Plain(String),
    Html(String),
    Json(serde_json::Value),
    /// 302 重定向，参数追加到查询串
    Redirect {
        url: String,
        params: Vec<(String, String)>,
    },
    /// 服务端转发，模型写入请求属性
    Forward {
        url: String,
        model: serde_json::Map<String, serde_json::Value>,
    },
    Stream {
        data: Bytes,
        headers: Vec<(String, String)>,
    },
    File {
        source: FileSource,
        filename: String,
        headers: Vec<(String, String)>,
    },
}

impl ViewResult {
    pub fn is_void(&self) -> bool {
        matches!(self, ViewResult::Void)
    }

    /// 写入当前请求的响应
    pub fn render(self, ctx: &RequestContext) -> MvcResult<()> {
        match self {
            ViewResult::Void => {}
            ViewResult::Plain(text) => write_text(&mut ctx.response(), CONTENT_TYPE_PLAIN, &text)?,
            ViewResult::Html(html) => write_text(&mut ctx.response(), CONTENT_TYPE_HTML, &html)?,
            ViewResult::Json(value) => {
                let text = serde_json::to_string(&value)
                    .map_err(|e| Exception::from_error(&ILLEGAL_ARGUMENT, &e))?;
                write_text(&mut ctx.response(), CONTENT_TYPE_JSON, &text)?;
            }
            ViewResult::Redirect { url, params } => {
                let location = append_query(&url, &params);
                tracing::debug!(location = %location, "Redirecting");
                ctx.response().send_redirect(&location)?;
            }
            ViewResult::Forward { url, model } => {
                let request = ctx.request();
                for (name, value) in model {
                    request.set_attribute(name, value);
                }
                tracing::debug!(target_url = %url, "Forwarding");
                ctx.response().forward(url);
            }
            ViewResult::Stream { data, headers } => {
                let mut response = ctx.response();
                response.set_content_type(CONTENT_TYPE_OCTET_STREAM)?;
                for (name, value) in &headers {
                    response.set_raw_header(name, value)?;
                }
                response.write(&data);
            }
            ViewResult::File {
                source,
                filename,
                headers,
            } => {
                let data = match source {
                    FileSource::Bytes(data) => data,
                    FileSource::Path(path) => Bytes::from(
                        std::fs::read(&path).map_err(|e| Exception::from_error(&IO_EXCEPTION, &e))?,
                    ),
                };
                let mut response = ctx.response();
                response.set_content_type(content_type_for(&filename))?;
                response.set_header(
                    header::CONTENT_DISPOSITION,
                    &format!("attachment; filename={}", encode(&filename)),
                )?;
                for (name, value) in &headers {
                    response.set_raw_header(name, value)?;
                }
                response.write(&data);
            }
        }
        Ok(())
    }
}

fn write_text(response: &mut WebResponse, content_type: &str, text: &str) -> Result<(), Exception> {
    response.set_content_type(content_type)?;
    response.write_str(text);
    Ok(())
}

fn encode(text: &str) -> String {
    url::form_urlencoded::byte_serialize(text.as_bytes()).collect()
}

fn append_query(url: &str, params: &[(String, String)]) -> String {
    if params.is_empty() {
        return url.to_string();
    }
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", url, separator, query)
}

/// 按扩展名推断内容类型
pub fn content_type_for(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("txt") => "text/plain",
        Some("html") | Some("htm") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("csv") => "text/csv",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("gz") => "application/gzip",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("webp") => "image/webp",
        Some("mp4") => "video/mp4",
        Some("mp3") => "audio/mpeg",
        Some("doc") => "application/msword",
        Some("xls") => "application/vnd.ms-excel",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => CONTENT_TYPE_OCTET_STREAM,
    }
}

// ==================== 构造函数 ====================

pub fn plain(text: impl Into<String>) -> ViewResult {
    ViewResult::Plain(text.into())
}

pub fn html(html: impl Into<String>) -> ViewResult {
    ViewResult::Html(html.into())
}

/// 序列化为 JSON
pub fn json<T: Serialize>(value: &T) -> MvcResult<ViewResult> {
    let value = serde_json::to_value(value).map_err(|e| Exception::from_error(&ILLEGAL_ARGUMENT, &e))?;
    Ok(ViewResult::Json(value))
}

pub fn redirect(url: impl Into<String>) -> ViewResult {
    ViewResult::Redirect {
        url: url.into(),
        params: Vec::new(),
    }
}

pub fn redirect_with<K, V>(url: impl Into<String>, params: impl IntoIterator<Item = (K, V)>) -> ViewResult
where
    K: Into<String>,
    V: Into<String>,
{
    ViewResult::Redirect {
        url: url.into(),
        params: params.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
    }
}

pub fn forward(url: impl Into<String>) -> ViewResult {
    ViewResult::Forward {
        url: url.into(),
        model: serde_json::Map::new(),
    }
}

/// 带模型的转发，模型必须序列化为 JSON 对象
pub fn forward_with<T: Serialize>(url: impl Into<String>, model: &T) -> MvcResult<ViewResult> {
    match serde_json::to_value(model).map_err(|e| Exception::from_error(&ILLEGAL_ARGUMENT, &e))? {
        serde_json::Value::Object(model) => Ok(ViewResult::Forward {
            url: url.into(),
            model,
        }),
        other => Err(Exception::illegal_argument(format!(
            "forward model must be an object, got {}",
            other
        ))
        .into()),
    }
}

pub fn stream(data: impl Into<Bytes>) -> ViewResult {
    ViewResult::Stream {
        data: data.into(),
        headers: Vec::new(),
    }
}

pub fn file(path: impl Into<PathBuf>) -> ViewResult {
    let path = path.into();
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    ViewResult::File {
        source: FileSource::Path(path),
        filename,
        headers: Vec::new(),
    }
}

pub fn file_bytes(data: impl Into<Bytes>, filename: impl Into<String>) -> ViewResult {
    ViewResult::File {
        source: FileSource::Bytes(data.into()),
        filename: filename.into(),
        headers: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use http::StatusCode;

    #[test]
    fn test_render_text_and_json() {
        let ctx = testing::request_context(testing::get("/"));
        json(&serde_json::json!({ "a": 1 })).unwrap().render(&ctx).unwrap();
        let response = ctx.take_response();
        assert_eq!(response.header("content-type"), Some(CONTENT_TYPE_JSON));
        assert_eq!(response.body_text(), r#"{"a":1}"#);

        let ctx = testing::request_context(testing::get("/"));
        html("<b>hi</b>").render(&ctx).unwrap();
        assert_eq!(ctx.take_response().header("content-type"), Some(CONTENT_TYPE_HTML));
    }

    #[test]
    fn test_redirect_appends_encoded_params() {
        let ctx = testing::request_context(testing::get("/"));
        redirect_with("/login?x=1", [("next", "/a b")]).render(&ctx).unwrap();
        let response = ctx.take_response();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.header("location"), Some("/login?x=1&next=%2Fa+b"));
    }

    #[test]
    fn test_forward_sets_model_attributes() {
        let ctx = testing::request_context(testing::get("/"));
        forward_with("/page", &serde_json::json!({ "user": "tom" }))
            .unwrap()
            .render(&ctx)
            .unwrap();
        assert_eq!(ctx.request().attribute("user"), Some(serde_json::json!("tom")));
        assert_eq!(ctx.take_response().forwarded_to(), Some("/page"));
        assert!(forward_with("/page", &3).is_err());
    }

    #[test]
    fn test_file_download_headers() {
        let ctx = testing::request_context(testing::get("/"));
        file_bytes(vec![1u8, 2, 3], "report 1.pdf").render(&ctx).unwrap();
        let response = ctx.take_response();
        assert_eq!(response.header("content-type"), Some("application/pdf"));
        assert_eq!(
            response.header("content-disposition"),
            Some("attachment; filename=report+1.pdf")
        );
        assert_eq!(response.body(), &[1, 2, 3]);
    }

    #[test]
    fn test_missing_file_is_io_exception() {
        let ctx = testing::request_context(testing::get("/"));
        let err = file("/definitely/not/here.bin").render(&ctx).unwrap_err();
        assert!(err.as_exception().is_some_and(|e| e.is_instance_of(&IO_EXCEPTION)));
    }
}
