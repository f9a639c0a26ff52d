//! 处理器适配器
//!
//! 每个适配器只会调用一种形态的处理器，并把返回值规整为 [`ViewResult`]

use crate::constants::LOWEST_PRIORITY;
use crate::context::RequestContext;
use crate::error::{MvcError, MvcResult};
use crate::handler::Handler;
use crate::view::ViewResult;

/// 处理器适配器
pub trait HandlerAdapter: Send + Sync {
    fn name(&self) -> &str;

    fn priority(&self) -> i32 {
        LOWEST_PRIORITY
    }

    fn supports(&self, handler: &Handler) -> bool;

    fn handle(&self, ctx: &RequestContext, handler: &Handler) -> MvcResult<ViewResult>;
}

/// 调用处理器方法：新建实例，逐个解析参数，再规整返回值
#[derive(Debug, Default)]
pub struct RequestMappingHandlerAdapter;

impl HandlerAdapter for RequestMappingHandlerAdapter {
    fn name(&self) -> &str {
        "RequestMappingHandlerAdapter"
    }

    fn supports(&self, handler: &Handler) -> bool {
        matches!(handler, Handler::Method(_))
    }

    fn handle(&self, ctx: &RequestContext, handler: &Handler) -> MvcResult<ViewResult> {
        let Handler::Method(method) = handler else {
            return Err(MvcError::configuration(format!(
                "{} cannot handle {}",
                self.name(),
                handler
            )));
        };
        let application = ctx.application();
        let args = application
            .argument_resolvers()
            .resolve_arguments(method.parameters(), ctx)?;
        tracing::debug!(handler = %method, arguments = args.len(), "Invoking handler method");
        let result = method.invoke_fresh(application.configuration_properties(), args)?;
        Ok(result.into_view())
    }
}

/// 调用回调式处理器，处理器自己写响应，结果总是 [`ViewResult::Void`]
#[derive(Debug, Default)]
pub struct HttpRequestHandlerAdapter;

impl HandlerAdapter for HttpRequestHandlerAdapter {
    fn name(&self) -> &str {
        "HttpRequestHandlerAdapter"
    }

    fn supports(&self, handler: &Handler) -> bool {
        matches!(handler, Handler::Class(class) if class.is_request_handler())
    }

    fn handle(&self, ctx: &RequestContext, handler: &Handler) -> MvcResult<ViewResult> {
        let request_handler = handler
            .class()
            .new_request_handler(ctx.application().configuration_properties())
            .ok_or_else(|| {
                MvcError::configuration(format!("{} is not a request handler", handler))
            })?;
        request_handler.process_request(ctx)?;
        Ok(ViewResult::Void)
    }
}
