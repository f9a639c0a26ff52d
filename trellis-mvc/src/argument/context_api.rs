use super::MethodArgumentResolver;
use crate::context::RequestContext;
use crate::error::{Exception, MvcResult};
use crate::parameter::MethodParameter;
use crate::types::TypeDescriptor;
use crate::value::Value;
use std::sync::Arc;

/// 请求、响应、会话和应用上下文，取自请求上下文而不是请求数据
#[derive(Debug, Default)]
pub struct ContextApiArgumentResolver;

impl MethodArgumentResolver for ContextApiArgumentResolver {
    fn name(&self) -> &str {
        "ContextApiArgumentResolver"
    }

    fn supports(&self, parameter: &MethodParameter) -> bool {
        matches!(
            parameter.type_descriptor(),
            TypeDescriptor::Request
                | TypeDescriptor::Response
                | TypeDescriptor::Session
                | TypeDescriptor::Application
        )
    }

    fn resolve_argument(&self, parameter: &MethodParameter, ctx: &RequestContext) -> MvcResult<Value> {
        match parameter.type_descriptor() {
            TypeDescriptor::Request => Ok(Value::Request(ctx.request_handle())),
            TypeDescriptor::Response => Ok(Value::Response(ctx.response_handle())),
            TypeDescriptor::Session => Ok(Value::Session(ctx.session())),
            TypeDescriptor::Application => Ok(Value::Application(Arc::clone(ctx.application()))),
            other => Err(Exception::illegal_argument(format!("{} is not a context type", other)).into()),
        }
    }
}
