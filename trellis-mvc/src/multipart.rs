//! 上传部件
//!
//! 宿主环境负责解析 multipart 请求，核心只把各个部件统一暴露为 [`Part`] 和 [`MultipartFile`]

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue};
use std::path::Path;

/// multipart 请求中的一个部件
#[derive(Debug, Clone, Default)]
pub struct Part {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    headers: HeaderMap,
    data: Bytes,
}

impl Part {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            ..Default::default()
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// 表单字段名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 客户端提交的文件名
    pub fn submitted_filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn bytes(&self) -> &Bytes {
        &self.data
    }
}

/// 上传文件
#[derive(Debug, Clone, Default)]
pub struct MultipartFile {
    part: Part,
}

impl MultipartFile {
    pub fn new(part: Part) -> Self {
        Self { part }
    }

    /// 表单字段名
    pub fn name(&self) -> &str {
        self.part.name()
    }

    /// 原始文件名（如果提供）
    pub fn original_filename(&self) -> Option<&str> {
        self.part.submitted_filename()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.part.content_type()
    }

    /// 判断是否为空文件
    pub fn is_empty(&self) -> bool {
        self.part.data.is_empty()
    }

    /// 获取文件大小（字节）
    pub fn size(&self) -> usize {
        self.part.size()
    }

    pub fn bytes(&self) -> &Bytes {
        self.part.bytes()
    }

    /// 获取文件扩展名
    pub fn extension(&self) -> Option<&str> {
        self.original_filename()
            .and_then(|name| name.rfind('.').map(|pos| &name[pos + 1..]))
    }

    /// 将文件数据保存到指定路径
    pub fn transfer_to(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        std::fs::write(path, &self.part.data)
    }

    pub fn into_part(self) -> Part {
        self.part
    }
}

impl From<Part> for MultipartFile {
    fn from(part: Part) -> Self {
        Self::new(part)
    }
}
