use super::MethodArgumentResolver;
use crate::context::RequestContext;
use crate::error::{Exception, MvcResult};
use crate::parameter::MethodParameter;
use crate::types::TypeDescriptor;
use crate::value::Value;

/// 把正在处理的异常注入给异常处理方法
///
/// 只在解析异常处理方法的参数时使用，排在其它解析器之前
#[derive(Debug, Clone)]
pub struct ExceptionArgumentResolver {
    exception: Exception,
}

impl ExceptionArgumentResolver {
    pub fn new(exception: Exception) -> Self {
        Self { exception }
    }
}

impl MethodArgumentResolver for ExceptionArgumentResolver {
    fn name(&self) -> &str {
        "ExceptionArgumentResolver"
    }

    fn supports(&self, parameter: &MethodParameter) -> bool {
        match parameter.type_descriptor() {
            TypeDescriptor::Exception(class) => class.is_assignable_from(self.exception.class()),
            _ => false,
        }
    }

    fn resolve_argument(&self, _parameter: &MethodParameter, _ctx: &RequestContext) -> MvcResult<Value> {
        Ok(Value::Exception(self.exception.clone()))
    }
}
