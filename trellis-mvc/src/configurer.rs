//! 引擎配置器
//!
//! 应用最多提供一个 [`MvcConfigurer`]，在组件列表冻结之前调整它们

use crate::adapter::HandlerAdapter;
use crate::argument::MethodArgumentResolver;
use crate::convert::ConverterRegistry;
use crate::cors::CorsConfiguration;
use crate::exception::HandlerExceptionResolver;
use crate::interceptor::HandlerInterceptor;
use crate::mapping::HandlerMapping;
use crate::path::PathMatcher;
use std::sync::Arc;

/// 引擎配置器
///
/// 每个钩子收到的列表已经是"自定义在前、内置在后"的最终顺序，
/// 可以增删、重排或替换其中的组件。默认实现什么都不做。
pub trait MvcConfigurer: Send + Sync {
    fn name(&self) -> &str;

    fn configure_converters(&self, _converters: &mut ConverterRegistry) {}

    fn configure_path_matcher(&self, _matcher: &mut Arc<dyn PathMatcher>) {}

    fn configure_argument_resolvers(&self, _resolvers: &mut Vec<Arc<dyn MethodArgumentResolver>>) {}

    fn configure_handler_mappings(&self, _mappings: &mut Vec<Arc<dyn HandlerMapping>>) {}

    fn configure_handler_adapters(&self, _adapters: &mut Vec<Arc<dyn HandlerAdapter>>) {}

    fn configure_exception_resolvers(&self, _resolvers: &mut Vec<Arc<dyn HandlerExceptionResolver>>) {}

    fn configure_interceptors(&self, _interceptors: &mut Vec<Arc<dyn HandlerInterceptor>>) {}

    /// 收到的配置已经应用了默认值，需要时先调用 `clear_default_configuration`
    fn configure_cors(&self, _cors: &mut CorsConfiguration) {}
}
