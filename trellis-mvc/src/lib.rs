//! # Trellis MVC
//!
//! 同步的请求分发与参数绑定引擎
//!
//! ## 核心组件
//!
//! - **路径匹配** - Ant 风格模式、路径变量提取、按具体程度排序
//! - **处理器映射** - 路由表加有界缓存，类名约定映射兜底
//! - **执行链** - 拦截器前置逻辑顺序执行，后置逻辑对称逆序
//! - **参数解析** - 有序的解析器链，标量、文件、请求体、路径变量和嵌套 bean
//! - **处理器适配** - 调用处理器并把返回值统一为视图结果
//! - **异常解析** - 按异常类型选出最具体的异常处理方法
//! - **跨域** - 预检请求由引擎直接应答
//!
//! 引擎不提供 HTTP 传输，请求与响应由宿主环境构造并交给 [`DispatcherHandler`]。
//!
//! ```rust,ignore
//! let context = MvcContext::builder()
//!     .environment(&env)
//!     .scan(ScanResult::from_inventory())
//!     .build()?;
//! let dispatcher = DispatcherHandler::new(context);
//! let response = dispatcher.service_http(request)?;
//! ```

pub mod adapter;
pub mod application;
pub mod argument;
pub mod bean;
pub mod chain;
pub mod configurer;
pub mod constants;
pub mod context;
pub mod controller;
pub mod convert;
pub mod cors;
pub mod discovery;
pub mod dispatcher;
pub mod error;
pub mod exception;
pub mod handler;
pub mod interceptor;
pub mod mapping;
pub mod multipart;
pub mod parameter;
pub mod path;
pub mod properties;
pub mod request;
pub mod response;
pub mod types;
pub mod value;
pub mod view;

#[cfg(test)]
mod testing;

// 重新导出常用类型
pub use adapter::{HandlerAdapter, HttpRequestHandlerAdapter, RequestMappingHandlerAdapter};
pub use application::{MvcContext, MvcContextBuilder};
pub use argument::{ArgumentResolverComposite, MethodArgumentResolver};
pub use bean::{Bean, BeanDescriptor, BeanType};
pub use chain::{ChainState, HandlerExecutionChain};
pub use configurer::MvcConfigurer;
pub use context::RequestContext;
pub use controller::{get_all_classes, ClassDefinition, ClassDefinitionBuilder, ClassRegistration};
pub use convert::{ConverterRegistry, TypeConverter};
pub use cors::CorsConfiguration;
pub use discovery::{get_all_extensions, Extension, ExtensionRegistration, ScanResult};
pub use dispatcher::DispatcherHandler;
pub use error::{Exception, ExceptionClass, MvcError, MvcResult};
pub use exception::HandlerExceptionResolver;
pub use handler::{Handler, HandlerReturn, HttpRequestHandler, IntoHandlerReturn};
pub use interceptor::{HandlerInterceptor, InterceptorRegistry};
pub use mapping::HandlerMapping;
pub use multipart::{MultipartFile, Part};
pub use parameter::{MethodParameter, Param};
pub use path::{AntPathMatcher, EqualPathMatcher, PathMatcher};
pub use properties::{ConfigurationProperties, MvcProperties};
pub use request::{Session, WebRequest};
pub use response::WebResponse;
pub use types::{Reflect, ScalarType, TypeDescriptor};
pub use value::{Arguments, FromValue, Value};
pub use view::ViewResult;

// 导出 inventory，供登记宏使用
pub use inventory;

/// Prelude 模块，包含常用的 traits 和类型
pub mod prelude {
    pub use crate::bean::{Bean, BeanDescriptor};
    pub use crate::configurer::MvcConfigurer;
    pub use crate::context::RequestContext;
    pub use crate::controller::ClassDefinition;
    pub use crate::discovery::{Extension, ScanResult};
    pub use crate::dispatcher::DispatcherHandler;
    pub use crate::error::{
        Exception, ExceptionClass, MvcError, MvcResult, ARITHMETIC, EXCEPTION, ILLEGAL_ARGUMENT,
        ILLEGAL_STATE, RUNTIME_EXCEPTION,
    };
    pub use crate::handler::{Handler, HttpRequestHandler};
    pub use crate::interceptor::HandlerInterceptor;
    pub use crate::multipart::{MultipartFile, Part};
    pub use crate::parameter::Param;
    pub use crate::application::MvcContext;
    pub use crate::request::WebRequest;
    pub use crate::response::WebResponse;
    pub use crate::value::Arguments;
    pub use crate::view::{self, ViewResult};
    pub use crate::{register_class, register_extension};
}
