use super::MethodArgumentResolver;
use crate::context::RequestContext;
use crate::error::{Exception, MvcResult, MESSAGE_NOT_READABLE};
use crate::parameter::MethodParameter;
use crate::value::Value;

/// 请求体反序列化，只处理显式声明为请求体的参数
///
/// 请求体只能读取一次，同一个方法里第二个请求体参数会得到 `IllegalStateException`
#[derive(Debug, Default)]
pub struct RequestBodyArgumentResolver;

impl MethodArgumentResolver for RequestBodyArgumentResolver {
    fn name(&self) -> &str {
        "RequestBodyArgumentResolver"
    }

    fn supports(&self, parameter: &MethodParameter) -> bool {
        parameter.body_reader().is_some()
    }

    fn resolve_argument(&self, parameter: &MethodParameter, ctx: &RequestContext) -> MvcResult<Value> {
        let reader = parameter.body_reader().ok_or_else(|| {
            Exception::illegal_argument(format!("{} is not a request body parameter", parameter))
        })?;
        let body = ctx.request().take_body()?;
        reader.read(&body).map_err(|e| {
            tracing::debug!(parameter = %parameter, error = %e, "Failed to read request body");
            Exception::from_error(&MESSAGE_NOT_READABLE, &e).into()
        })
    }
}
