//! 处理器映射
//!
//! 映射按顺序扫描，第一个返回执行链的映射胜出；自定义映射排在内置映射之前。

mod name_convention;
mod request_mapping;

pub use name_convention::NameConventionHandlerMapping;
pub use request_mapping::RequestMappingHandlerMapping;

use crate::chain::HandlerExecutionChain;
use crate::constants::LOWEST_PRIORITY;
use crate::context::RequestContext;
use crate::error::MvcResult;
use crate::interceptor::HandlerInterceptor;
use std::sync::Arc;

/// 处理器映射
pub trait HandlerMapping: Send + Sync {
    fn name(&self) -> &str;

    fn priority(&self) -> i32 {
        LOWEST_PRIORITY
    }

    /// 找到处理请求的执行链，找不到返回 `None`
    fn get_handler(&self, ctx: &RequestContext) -> MvcResult<Option<HandlerExecutionChain>>;
}

/// 适用于当前请求路径的拦截器
pub fn interceptors_for(ctx: &RequestContext) -> Vec<Arc<dyn HandlerInterceptor>> {
    let application = ctx.application();
    application
        .interceptors()
        .applicable(application.path_matcher().as_ref(), ctx.request_url())
}
