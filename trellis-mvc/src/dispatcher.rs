//! 请求分发
//!
//! [`DispatcherHandler`] 是请求进入引擎的唯一入口：
//!
//! 1. 跨域检查，拒绝的请求和预检请求到此为止
//! 2. 依次询问处理器映射，得到执行链；找不到时交给默认处理器
//! 3. 拦截器前置逻辑，找到支持处理器的适配器并调用
//! 4. 拦截器后置逻辑，处理器出错时同样执行
//! 5. 异常交给异常解析器链，得到的视图结果与正常结果一样渲染
//!
//! 请求上下文在入口创建，离开入口时无论以何种方式都会被清理。

use crate::adapter::HandlerAdapter;
use crate::application::MvcContext;
use crate::chain::HandlerExecutionChain;
use crate::context::RequestContext;
use crate::cors::{is_cors_request, is_preflight_request};
use crate::error::{Exception, MvcError, MvcResult};
use crate::handler::Handler;
use crate::request::WebRequest;
use crate::response::WebResponse;
use crate::view::ViewResult;
use bytes::Bytes;
use http::StatusCode;
use std::sync::Arc;

/// 前端分发器
#[derive(Debug, Clone)]
pub struct DispatcherHandler {
    context: Arc<MvcContext>,
}

impl DispatcherHandler {
    pub fn new(context: Arc<MvcContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &Arc<MvcContext> {
        &self.context
    }

    /// 处理 `http` 请求
    pub fn service_http(&self, request: http::Request<Bytes>) -> MvcResult<http::Response<Bytes>> {
        self.service(WebRequest::from_http(request))
            .map(WebResponse::into_http)
    }

    /// 处理一个请求
    ///
    /// 没有异常解析器处理的异常和非异常错误原样返回，由宿主负责兜底响应
    pub fn service(&self, request: WebRequest) -> MvcResult<WebResponse> {
        let ctx = RequestContext::open(Arc::clone(&self.context), request);
        let span = tracing::info_span!(
            "request",
            request_id = %ctx.id(),
            method = %ctx.request().method(),
            path = ctx.request_url(),
        );
        let _enter = span.enter();

        match self.dispatch(&ctx) {
            Ok(()) => {
                let response = ctx.take_response();
                tracing::debug!(status = response.status().as_u16(), "Request completed");
                Ok(response)
            }
            Err(e) => {
                tracing::error!(error = %e, recoverable = e.is_recoverable(), "Request failed");
                Err(e)
            }
        }
    }

    fn dispatch(&self, ctx: &RequestContext) -> MvcResult<()> {
        let request = ctx.request();
        if is_cors_request(request) {
            let allowed = self.context.cors().process(request, &mut ctx.response());
            if !allowed || is_preflight_request(request) {
                return Ok(());
            }
        }

        let Some(mut chain) = self.get_handler(ctx)? else {
            return self.no_handler_found(ctx);
        };

        let view = match self.execute(ctx, &mut chain) {
            Ok(Some(view)) => view,
            // 拦截器终止了请求，响应由它负责
            Ok(None) => return Ok(()),
            Err(MvcError::Exception(exception)) => {
                self.process_exception(ctx, chain.handler(), exception)?
            }
            Err(e) => return Err(e),
        };
        view.render(ctx)
    }

    /// 第一个返回执行链的映射胜出
    fn get_handler(&self, ctx: &RequestContext) -> MvcResult<Option<HandlerExecutionChain>> {
        for mapping in self.context.handler_mappings() {
            if let Some(chain) = mapping.get_handler(ctx)? {
                tracing::debug!(mapping = mapping.name(), handler = %chain.handler(), "Handler found");
                return Ok(Some(chain));
            }
        }
        Ok(None)
    }

    fn get_handler_adapter(&self, handler: &Handler) -> MvcResult<&Arc<dyn HandlerAdapter>> {
        self.context
            .handler_adapters()
            .iter()
            .find(|adapter| adapter.supports(handler))
            .ok_or_else(|| {
                MvcError::configuration(format!("No handler adapter supports handler {}", handler))
            })
    }

    /// 执行前置逻辑、处理器和后置逻辑；后置逻辑在任何情况下都会执行
    fn execute(
        &self,
        ctx: &RequestContext,
        chain: &mut HandlerExecutionChain,
    ) -> MvcResult<Option<ViewResult>> {
        let result = self.invoke(ctx, chain);
        let post = chain.apply_post_handle(ctx);
        let view = result?;
        post?;
        Ok(view)
    }

    fn invoke(
        &self,
        ctx: &RequestContext,
        chain: &mut HandlerExecutionChain,
    ) -> MvcResult<Option<ViewResult>> {
        if !chain.apply_pre_handle(ctx)? {
            return Ok(None);
        }
        let adapter = self.get_handler_adapter(chain.handler())?;
        adapter.handle(ctx, chain.handler()).map(Some)
    }

    /// 依次尝试异常解析器；解析器自身出错时跳过它，都不处理时原异常返回
    fn process_exception(
        &self,
        ctx: &RequestContext,
        handler: &Handler,
        exception: Exception,
    ) -> MvcResult<ViewResult> {
        for resolver in self.context.exception_resolvers() {
            match resolver.resolve_exception(ctx, handler, &exception) {
                Ok(Some(view)) => {
                    tracing::debug!(
                        resolver = resolver.name(),
                        exception = %exception,
                        "Exception resolved"
                    );
                    return Ok(view);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(resolver = resolver.name(), error = %e, "Exception resolver failed");
                }
            }
        }

        tracing::error!(
            handler = %handler,
            class = exception.class().name(),
            exception = %exception,
            "Unresolved exception"
        );
        Err(MvcError::Exception(exception))
    }

    /// 交给宿主提供的默认处理器，没有时返回 404
    fn no_handler_found(&self, ctx: &RequestContext) -> MvcResult<()> {
        let name = &self.context.properties().default_handler;
        match self.context.default_handler(name) {
            Some(handler) => {
                tracing::debug!(default_handler = %name, "No handler found, using default handler");
                handler.process_request(ctx)
            }
            None => {
                tracing::debug!("No handler found");
                ctx.response().set_status(StatusCode::NOT_FOUND);
                Ok(())
            }
        }
    }
}
