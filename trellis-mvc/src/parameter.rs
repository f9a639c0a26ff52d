//! 方法参数描述
//!
//! [`Param`] 是注册处理器时声明的形参元数据，绑定到具体方法后成为 [`MethodParameter`]。
//! `MethodParameter` 的相等性只由 {所属类, 方法, 位置} 决定，它是"参数 → 解析器"缓存的键。
//! 方法由注册时分配的 [`MethodId`] 标识，同一个类里重名的方法互不干扰。

use crate::bean::{Bean, BeanType};
use crate::error::ExceptionClass;
use crate::types::{Reflect, TypeDescriptor};
use crate::value::Value;
use serde::de::DeserializeOwned;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_METHOD_ID: AtomicU64 = AtomicU64::new(1);

/// 处理器方法的标识，每次注册分配一个新值
///
/// `MethodId::NONE` 留给 bean 属性，属性由 {bean 类型, 属性名} 唯一确定。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodId(u64);

impl MethodId {
    pub const NONE: MethodId = MethodId(0);

    pub fn next() -> Self {
        MethodId(NEXT_METHOD_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// 请求体反序列化函数
#[derive(Clone, Copy)]
pub struct BodyReader(fn(&[u8]) -> Result<Value, serde_json::Error>);

impl BodyReader {
    pub fn json<T: DeserializeOwned + Send + 'static>() -> Self {
        BodyReader(read_json::<T>)
    }

    pub fn read(&self, body: &[u8]) -> Result<Value, serde_json::Error> {
        (self.0)(body)
    }
}

impl fmt::Debug for BodyReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BodyReader")
    }
}

fn read_json<T: DeserializeOwned + Send + 'static>(body: &[u8]) -> Result<Value, serde_json::Error> {
    serde_json::from_slice::<T>(body).map(Value::object)
}

/// 请求参数元数据：参数名覆盖与默认值
#[derive(Debug, Clone, Default)]
pub struct RequestParam {
    pub name: Option<String>,
    pub default_value: Option<String>,
}

/// 声明的形参
#[derive(Debug, Clone)]
pub struct Param {
    name: String,
    ty: TypeDescriptor,
    request_param: Option<RequestParam>,
    path_variable: Option<String>,
    body: Option<BodyReader>,
}

impl Param {
    pub fn with_type(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            ty,
            request_param: None,
            path_variable: None,
            body: None,
        }
    }

    /// 按 Rust 类型声明形参
    pub fn of<T: Reflect>(name: impl Into<String>) -> Self {
        Self::with_type(name, T::type_descriptor())
    }

    /// 路径变量参数，变量名与参数名相同
    pub fn path_variable<T: Reflect>(name: impl Into<String>) -> Self {
        let name = name.into();
        let mut param = Self::of::<T>(name.clone());
        param.path_variable = Some(name);
        param
    }

    /// 请求体参数
    pub fn request_body<T: DeserializeOwned + Send + 'static>(name: impl Into<String>) -> Self {
        let mut param = Self::with_type(name, TypeDescriptor::Object(std::any::type_name::<T>()));
        param.body = Some(BodyReader::json::<T>());
        param
    }

    /// bean 参数
    pub fn bean<T: Bean>(name: impl Into<String>) -> Self {
        Self::with_type(name, TypeDescriptor::Bean(BeanType::of::<T>()))
    }

    /// 异常参数，只在异常处理方法中可解析
    pub fn exception(name: impl Into<String>, class: &'static ExceptionClass) -> Self {
        Self::with_type(name, TypeDescriptor::Exception(class))
    }

    /// 覆盖请求参数名
    pub fn named(mut self, request_name: impl Into<String>) -> Self {
        self.request_param.get_or_insert_with(Default::default).name = Some(request_name.into());
        self
    }

    /// 请求中没有值时使用的默认值，与请求数据走同一个转换流程
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.request_param.get_or_insert_with(Default::default).default_value = Some(value.into());
        self
    }

    /// 覆盖路径变量名
    pub fn variable(mut self, variable: impl Into<String>) -> Self {
        self.path_variable = Some(variable.into());
        self
    }
}

/// 绑定到具体方法的形参
#[derive(Debug, Clone)]
pub struct MethodParameter {
    containing_class: &'static str,
    method: &'static str,
    method_id: MethodId,
    index: usize,
    route_pattern: Option<Arc<str>>,
    param: Param,
}

impl MethodParameter {
    pub fn bind(
        param: Param,
        containing_class: &'static str,
        method: &'static str,
        index: usize,
        route_pattern: Option<Arc<str>>,
    ) -> Self {
        Self {
            containing_class,
            method,
            method_id: MethodId::NONE,
            index,
            route_pattern,
            param,
        }
    }

    /// 绑定到某次注册的方法
    pub fn in_method(mut self, method_id: MethodId) -> Self {
        self.method_id = method_id;
        self
    }

    /// bean 属性对应的形参；`qualified_name` 是带前缀的属性名
    pub fn for_property(
        bean_type: &'static str,
        property: &'static str,
        qualified_name: String,
        ty: TypeDescriptor,
    ) -> Self {
        Self::bind(Param::with_type(qualified_name, ty), bean_type, property, 0, None)
    }

    pub fn containing_class(&self) -> &'static str {
        self.containing_class
    }

    pub fn method(&self) -> &'static str {
        self.method
    }

    pub fn method_id(&self) -> MethodId {
        self.method_id
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// 解析后的参数名：声明了请求参数名时使用该名称
    pub fn name(&self) -> &str {
        self.param
            .request_param
            .as_ref()
            .and_then(|rp| rp.name.as_deref())
            .unwrap_or(&self.param.name)
    }

    pub fn declared_name(&self) -> &str {
        &self.param.name
    }

    pub fn type_descriptor(&self) -> &TypeDescriptor {
        &self.param.ty
    }

    pub fn default_value(&self) -> Option<&str> {
        self.param
            .request_param
            .as_ref()
            .and_then(|rp| rp.default_value.as_deref())
    }

    pub fn path_variable(&self) -> Option<&str> {
        self.param.path_variable.as_deref()
    }

    pub fn body_reader(&self) -> Option<BodyReader> {
        self.param.body
    }

    /// 所属处理器方法的完整路由模式
    pub fn route_pattern(&self) -> Option<&str> {
        self.route_pattern.as_deref()
    }
}

impl PartialEq for MethodParameter {
    fn eq(&self, other: &Self) -> bool {
        self.containing_class == other.containing_class
            && self.method == other.method
            && self.method_id == other.method_id
            && self.index == other.index
    }
}

impl Eq for MethodParameter {}

impl Hash for MethodParameter {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.containing_class.hash(state);
        self.method.hash(state);
        self.method_id.hash(state);
        self.index.hash(state);
    }
}

impl fmt::Display for MethodParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parameter '{}' ({}) at index {} of {}::{}",
            self.name(),
            self.param.ty,
            self.index,
            self.containing_class,
            self.method
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(p: &MethodParameter) -> u64 {
        let mut hasher = DefaultHasher::new();
        p.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_identity_ignores_name() {
        let a = MethodParameter::bind(Param::of::<i32>("age"), "UserController", "list", 0, None);
        let b = MethodParameter::bind(
            Param::of::<String>("renamed").named("other"),
            "UserController",
            "list",
            0,
            None,
        );
        let c = MethodParameter::bind(Param::of::<i32>("age"), "UserController", "list", 1, None);

        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_ne!(a, c);
    }

    #[test]
    fn test_same_name_in_different_registrations() {
        let a = MethodParameter::bind(Param::of::<i32>("id"), "ReportController", "show", 0, None)
            .in_method(MethodId::next());
        let b = MethodParameter::bind(Param::of::<i32>("id"), "ReportController", "show", 0, None)
            .in_method(MethodId::next());

        assert_ne!(a.method_id(), b.method_id());
        assert_ne!(a, b);
        assert_eq!(a.clone(), a);
    }

    #[test]
    fn test_request_param_metadata() {
        let p = MethodParameter::bind(
            Param::of::<i32>("page_no").named("pageNo").default_value("1"),
            "C",
            "m",
            0,
            None,
        );
        assert_eq!(p.name(), "pageNo");
        assert_eq!(p.declared_name(), "page_no");
        assert_eq!(p.default_value(), Some("1"));
    }

    #[test]
    fn test_body_reader_deserializes() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Login {
            user: String,
        }

        let p = Param::request_body::<Login>("login");
        let reader = p.body.unwrap();
        let value = reader.read(br#"{"user":"tom"}"#).unwrap();
        assert_eq!(value.downcast::<Login>().unwrap(), Login { user: "tom".into() });
        assert!(reader.read(b"not json").is_err());
    }
}
