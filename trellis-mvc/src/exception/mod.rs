//! 异常解析
//!
//! 解析器按顺序尝试，返回 `None` 表示交给下一个；解析器自身出错等同于返回 `None`，
//! 原始异常始终是权威的。所有解析器都不处理时，原始异常原样向上传播。

mod handler_method;

pub use handler_method::{ExceptionHandlerExceptionResolver, ExceptionHandlersExceptionResolver};

use crate::constants::{LOWEST_PRIORITY, MAX_CAUSE_DEPTH};
use crate::context::RequestContext;
use crate::error::{Exception, MvcResult};
use crate::handler::Handler;
use crate::view::ViewResult;

/// 处理器异常解析器
pub trait HandlerExceptionResolver: Send + Sync {
    fn name(&self) -> &str;

    fn priority(&self) -> i32 {
        LOWEST_PRIORITY
    }

    /// 把异常转换为视图结果，不处理时返回 `None`
    fn resolve_exception(
        &self,
        ctx: &RequestContext,
        handler: &Handler,
        exception: &Exception,
    ) -> MvcResult<Option<ViewResult>>;
}

/// 只记录日志，从不处理异常
#[derive(Debug, Default)]
pub struct LogHandlerExceptionResolver;

impl HandlerExceptionResolver for LogHandlerExceptionResolver {
    fn name(&self) -> &str {
        "LogHandlerExceptionResolver"
    }

    fn resolve_exception(
        &self,
        ctx: &RequestContext,
        handler: &Handler,
        exception: &Exception,
    ) -> MvcResult<Option<ViewResult>> {
        tracing::warn!(
            path = ctx.request_url(),
            handler = %handler,
            class = exception.class().name(),
            error = %exception,
            "Handler raised an exception"
        );

        let mut current = exception;
        for _ in 0..MAX_CAUSE_DEPTH {
            match current.cause() {
                Some(cause) if cause.id() != current.id() => {
                    tracing::debug!(class = cause.class().name(), error = %cause, "Caused by");
                    current = cause;
                }
                _ => break,
            }
        }
        Ok(None)
    }
}
