//! 处理器
//!
//! 两种形态：
//! - [`Handler::Class`]：每次请求实例化的处理器类，实例化推迟到适配器
//! - [`Handler::Method`]：处理器类加上一个具体方法，最常见的形态

use crate::context::RequestContext;
use crate::error::{ExceptionClass, MvcError, MvcResult};
use crate::parameter::MethodParameter;
use crate::properties::ConfigurationProperties;
use crate::value::Arguments;
use crate::view::ViewResult;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 每次请求新建的处理器实例
pub type HandlerInstance = Box<dyn Any + Send>;

pub(crate) type ObjectFactory =
    Arc<dyn Fn(&ConfigurationProperties) -> HandlerInstance + Send + Sync>;
pub(crate) type RequestHandlerFactory =
    Arc<dyn Fn(&ConfigurationProperties) -> Box<dyn HttpRequestHandler> + Send + Sync>;

/// 处理器方法的类型擦除调用入口
pub type MethodInvoker =
    Arc<dyn Fn(&mut (dyn Any + Send), Arguments) -> MvcResult<HandlerReturn> + Send + Sync>;

/// 直接处理请求的回调式处理器，自行写响应
pub trait HttpRequestHandler: Send + Sync {
    fn process_request(&self, ctx: &RequestContext) -> MvcResult<()>;
}

pub(crate) enum Instantiator {
    Object(ObjectFactory),
    RequestHandler(RequestHandlerFactory),
}

/// 处理器类
pub struct HandlerClass {
    type_name: &'static str,
    base_path: String,
    instantiator: Instantiator,
}

impl HandlerClass {
    pub(crate) fn new(type_name: &'static str, base_path: String, instantiator: Instantiator) -> Self {
        Self {
            type_name,
            base_path,
            instantiator,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// 类级别的路由前缀，未声明时为空
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn is_request_handler(&self) -> bool {
        matches!(self.instantiator, Instantiator::RequestHandler(_))
    }

    /// 新建一个普通实例；回调式处理器返回 `None`
    pub fn new_instance(&self, properties: &ConfigurationProperties) -> Option<HandlerInstance> {
        match &self.instantiator {
            Instantiator::Object(factory) => Some(factory(properties)),
            Instantiator::RequestHandler(_) => None,
        }
    }

    /// 新建一个回调式处理器；普通类返回 `None`
    pub fn new_request_handler(
        &self,
        properties: &ConfigurationProperties,
    ) -> Option<Box<dyn HttpRequestHandler>> {
        match &self.instantiator {
            Instantiator::RequestHandler(factory) => Some(factory(properties)),
            Instantiator::Object(_) => None,
        }
    }
}

impl fmt::Debug for HandlerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerClass")
            .field("type_name", &self.type_name)
            .field("base_path", &self.base_path)
            .field("request_handler", &self.is_request_handler())
            .finish()
    }
}

/// 处理器方法
pub struct HandlerMethod {
    class: Arc<HandlerClass>,
    name: &'static str,
    pattern: Option<Arc<str>>,
    parameters: Vec<MethodParameter>,
    invoker: MethodInvoker,
}

impl HandlerMethod {
    pub(crate) fn new(
        class: Arc<HandlerClass>,
        name: &'static str,
        pattern: Option<Arc<str>>,
        parameters: Vec<MethodParameter>,
        invoker: MethodInvoker,
    ) -> Self {
        Self {
            class,
            name,
            pattern,
            parameters,
            invoker,
        }
    }

    pub fn class(&self) -> &Arc<HandlerClass> {
        &self.class
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 组合后的完整路由模式（类前缀 + 方法模式）
    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    pub fn parameters(&self) -> &[MethodParameter] {
        &self.parameters
    }

    /// 在实例上调用方法
    pub fn invoke(&self, instance: &mut (dyn Any + Send), args: Arguments) -> MvcResult<HandlerReturn> {
        (self.invoker)(instance, args)
    }

    /// 新建实例并调用
    pub fn invoke_fresh(
        &self,
        properties: &ConfigurationProperties,
        args: Arguments,
    ) -> MvcResult<HandlerReturn> {
        let mut instance = self.class.new_instance(properties).ok_or_else(|| {
            MvcError::configuration(format!(
                "{} is a request handler and has no invocable methods",
                self.class.type_name()
            ))
        })?;
        self.invoke(instance.as_mut(), args)
    }
}

impl fmt::Debug for HandlerMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerMethod")
            .field("class", &self.class.type_name())
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .field("parameters", &self.parameters.len())
            .finish()
    }
}

impl fmt::Display for HandlerMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.class.type_name(), self.name)
    }
}

/// 映射结果
#[derive(Debug, Clone)]
pub enum Handler {
    Method(Arc<HandlerMethod>),
    Class(Arc<HandlerClass>),
}

impl Handler {
    pub fn class(&self) -> &Arc<HandlerClass> {
        match self {
            Handler::Method(method) => method.class(),
            Handler::Class(class) => class,
        }
    }
}

impl fmt::Display for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Method(method) => method.fmt(f),
            Handler::Class(class) => f.write_str(class.type_name()),
        }
    }
}

/// 异常处理方法的声明方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionHandlerKind {
    /// 单一异常类型，方法唯一的参数就是异常
    Single,
    /// 多个异常类型，参数按普通处理器方法解析
    Multiple,
}

/// 异常处理方法
#[derive(Debug, Clone)]
pub struct ExceptionHandlerMethod {
    method: Arc<HandlerMethod>,
    exception_types: Vec<&'static ExceptionClass>,
    kind: ExceptionHandlerKind,
}

impl ExceptionHandlerMethod {
    pub(crate) fn new(
        method: Arc<HandlerMethod>,
        exception_types: Vec<&'static ExceptionClass>,
        kind: ExceptionHandlerKind,
    ) -> Self {
        Self {
            method,
            exception_types,
            kind,
        }
    }

    pub fn method(&self) -> &Arc<HandlerMethod> {
        &self.method
    }

    pub fn exception_types(&self) -> &[&'static ExceptionClass] {
        &self.exception_types
    }

    pub fn kind(&self) -> ExceptionHandlerKind {
        self.kind
    }
}

/// 处理器方法的返回值
#[derive(Debug)]
pub enum HandlerReturn {
    /// 无返回值
    Void,
    /// 视图结果，原样使用
    View(ViewResult),
    /// 其它值的字符串形式，作为纯文本输出
    Value(String),
}

impl HandlerReturn {
    pub fn into_view(self) -> ViewResult {
        match self {
            HandlerReturn::Void => ViewResult::Void,
            HandlerReturn::View(view) => view,
            HandlerReturn::Value(text) => ViewResult::Plain(text),
        }
    }
}

/// 可以作为处理器方法返回值的类型
pub trait IntoHandlerReturn {
    fn into_handler_return(self) -> HandlerReturn;
}

impl IntoHandlerReturn for HandlerReturn {
    fn into_handler_return(self) -> HandlerReturn {
        self
    }
}

impl IntoHandlerReturn for () {
    fn into_handler_return(self) -> HandlerReturn {
        HandlerReturn::Void
    }
}

impl IntoHandlerReturn for ViewResult {
    fn into_handler_return(self) -> HandlerReturn {
        HandlerReturn::View(self)
    }
}

impl<T: IntoHandlerReturn> IntoHandlerReturn for Option<T> {
    fn into_handler_return(self) -> HandlerReturn {
        match self {
            Some(value) => value.into_handler_return(),
            None => HandlerReturn::Void,
        }
    }
}

impl IntoHandlerReturn for &str {
    fn into_handler_return(self) -> HandlerReturn {
        HandlerReturn::Value(self.to_string())
    }
}

macro_rules! display_return {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoHandlerReturn for $ty {
                fn into_handler_return(self) -> HandlerReturn {
                    HandlerReturn::Value(self.to_string())
                }
            }
        )*
    };
}

display_return!(
    String,
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    usize,
    f32,
    f64,
    serde_json::Value,
    chrono::NaiveDate,
    chrono::NaiveDateTime,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_value_adaptation() {
        assert!(matches!(().into_handler_return().into_view(), ViewResult::Void));
        assert!(matches!(None::<i32>.into_handler_return().into_view(), ViewResult::Void));
        assert!(matches!(
            ViewResult::Html("<p/>".into()).into_handler_return().into_view(),
            ViewResult::Html(ref h) if h == "<p/>"
        ));
        assert!(matches!(42.into_handler_return().into_view(), ViewResult::Plain(ref s) if s == "42"));
        assert!(matches!(
            Some("ok").into_handler_return().into_view(),
            ViewResult::Plain(ref s) if s == "ok"
        ));
    }
}
