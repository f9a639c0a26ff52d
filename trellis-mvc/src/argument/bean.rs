//! bean 参数解析
//!
//! 用默认构造创建实例，逐个属性委托给其它解析器；属性本身是 bean 时递归，
//! 属性名带上外层属性名作为前缀：`dept.manager.title`。

use super::{ArgumentResolverComposite, MethodArgumentResolver, ResolverRegistry};
use crate::bean::BeanType;
use crate::context::RequestContext;
use crate::error::{Exception, MvcError, MvcResult, UNSUPPORTED_PARAMETER};
use crate::parameter::MethodParameter;
use crate::types::TypeDescriptor;
use crate::value::Value;
use once_cell::sync::OnceCell;
use std::any::Any;
use std::sync::{Arc, Weak};

/// 兜底的 bean 解析器，必须排在所有内置解析器之后
pub struct BeanArgumentResolver {
    registry: Weak<ResolverRegistry>,
    delegates: OnceCell<ArgumentResolverComposite>,
}

impl BeanArgumentResolver {
    pub fn new(registry: &Arc<ResolverRegistry>) -> Self {
        Self {
            registry: Arc::downgrade(registry),
            delegates: OnceCell::new(),
        }
    }

    /// 除自身以外的全部解析器，首次使用时构建
    fn delegates(&self) -> MvcResult<&ArgumentResolverComposite> {
        self.delegates.get_or_try_init(|| {
            let registry = self
                .registry
                .upgrade()
                .ok_or_else(|| MvcError::fatal("Argument resolver registry has been dropped"))?;
            let resolvers = registry.get().ok_or_else(|| {
                MvcError::configuration("Argument resolvers are not registered yet")
            })?;
            let me = self as *const Self as *const ();
            let others = resolvers
                .iter()
                .filter(|resolver| Arc::as_ptr(resolver) as *const () != me)
                .cloned()
                .collect();
            Ok(ArgumentResolverComposite::new(others))
        })
    }

    fn populate(
        &self,
        bean_type: BeanType,
        ctx: &RequestContext,
        prefix: &mut Vec<&'static str>,
        visited: &mut Vec<&'static str>,
    ) -> MvcResult<Box<dyn Any + Send>> {
        if visited.contains(&bean_type.type_name()) {
            return Err(Exception::illegal_state(format!(
                "Cyclic bean property path '{}' through {}",
                prefix.join("."),
                bean_type.type_name()
            ))
            .into());
        }
        visited.push(bean_type.type_name());

        let descriptor = bean_type.descriptor();
        let delegates = self.delegates()?;
        let mut instance = descriptor.instantiate();

        for property in descriptor.properties() {
            let parameter = MethodParameter::for_property(
                descriptor.type_name(),
                property.name(),
                qualify(prefix, property.name()),
                property.type_descriptor().clone(),
            );

            let value = if delegates.supports(&parameter) {
                delegates.resolve_argument(&parameter, ctx)?
            } else if let TypeDescriptor::Bean(nested) = property.type_descriptor() {
                prefix.push(property.name());
                let nested = self.populate(*nested, ctx, prefix, visited);
                prefix.pop();
                Value::Object(nested?)
            } else {
                return Err(Exception::new(
                    &UNSUPPORTED_PARAMETER,
                    format!("No resolver supports bean property {}", parameter),
                )
                .into());
            };

            tracing::trace!(property = parameter.name(), value = ?value, "Bound bean property");
            property.set(instance.as_mut(), value)?;
        }

        visited.pop();
        Ok(instance)
    }
}

fn qualify(prefix: &[&str], name: &str) -> String {
    if prefix.is_empty() {
        return name.to_string();
    }
    format!("{}.{}", prefix.join("."), name)
}

impl MethodArgumentResolver for BeanArgumentResolver {
    fn name(&self) -> &str {
        "BeanArgumentResolver"
    }

    /// 只认领其它解析器都不支持的 bean 类型
    fn supports(&self, parameter: &MethodParameter) -> bool {
        if !matches!(parameter.type_descriptor(), TypeDescriptor::Bean(_)) {
            return false;
        }
        match self.delegates() {
            Ok(delegates) => !delegates.supports(parameter),
            Err(e) => {
                tracing::warn!(error = %e, "Bean argument resolver is not ready");
                false
            }
        }
    }

    fn resolve_argument(&self, parameter: &MethodParameter, ctx: &RequestContext) -> MvcResult<Value> {
        let TypeDescriptor::Bean(bean_type) = parameter.type_descriptor() else {
            return Err(Exception::illegal_argument(format!("{} is not a bean parameter", parameter)).into());
        };
        let mut prefix = Vec::new();
        let mut visited = Vec::new();
        self.populate(*bean_type, ctx, &mut prefix, &mut visited)
            .map(Value::Object)
    }
}

impl std::fmt::Debug for BeanArgumentResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeanArgumentResolver")
            .field("initialized", &self.delegates.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualify() {
        assert_eq!(qualify(&[], "title"), "title");
        assert_eq!(qualify(&["dept", "manager"], "title"), "dept.manager.title");
    }
}
