use super::common::convert_scalar;
use super::MethodArgumentResolver;
use crate::context::RequestContext;
use crate::error::MvcResult;
use crate::parameter::MethodParameter;
use crate::types::TypeDescriptor;
use crate::value::Value;

/// 路径变量，只支持标量
///
/// 变量值按方法的完整路由模式从请求路径中提取
#[derive(Debug, Default)]
pub struct PathVariableArgumentResolver;

impl MethodArgumentResolver for PathVariableArgumentResolver {
    fn name(&self) -> &str {
        "PathVariableArgumentResolver"
    }

    fn supports(&self, parameter: &MethodParameter) -> bool {
        parameter.path_variable().is_some()
            && matches!(parameter.type_descriptor(), TypeDescriptor::Scalar { .. })
    }

    fn resolve_argument(&self, parameter: &MethodParameter, ctx: &RequestContext) -> MvcResult<Value> {
        let value = match (parameter.route_pattern(), parameter.path_variable()) {
            (Some(pattern), Some(variable)) => {
                let mut variables = ctx
                    .application()
                    .path_matcher()
                    .extract_path_variables(pattern, ctx.request_url())?;
                variables.remove(variable)
            }
            _ => None,
        };
        convert_scalar(parameter.type_descriptor(), value.as_deref(), parameter, ctx)
    }
}
