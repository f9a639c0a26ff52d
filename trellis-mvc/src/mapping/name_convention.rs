use super::{interceptors_for, HandlerMapping};
use crate::chain::HandlerExecutionChain;
use crate::context::RequestContext;
use crate::controller::ClassDefinition;
use crate::error::MvcResult;
use crate::handler::{Handler, HandlerClass};
use std::collections::HashMap;
use std::sync::Arc;

/// 按类名约定映射：`UserController` 对应 `/user`
///
/// 只处理既没有路由方法也没有异常处理方法的类，声明了路由的类交给 [`RequestMappingHandlerMapping`]
///
/// [`RequestMappingHandlerMapping`]: super::RequestMappingHandlerMapping
pub struct NameConventionHandlerMapping {
    handlers: HashMap<String, Arc<HandlerClass>>,
}

impl NameConventionHandlerMapping {
    pub fn new(classes: &[ClassDefinition], suffix: &str) -> Self {
        let handlers: HashMap<String, Arc<HandlerClass>> = classes
            .iter()
            .filter(|definition| {
                definition.handler_methods().is_empty() && definition.exception_handlers().is_empty()
            })
            .filter_map(|definition| {
                let simple_name = simple_name(definition.type_name());
                let stem = simple_name.strip_suffix(suffix)?;
                Some((format!("/{}", stem).to_lowercase(), Arc::clone(definition.class())))
            })
            .collect();

        for (url, class) in &handlers {
            tracing::debug!(path = %url, handler = class.type_name(), "Registered name convention handler");
        }
        Self { handlers }
    }

    pub fn urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        urls.sort_unstable();
        urls
    }
}

/// 去掉模块路径后的类型名
fn simple_name(type_name: &str) -> &str {
    type_name.rsplit("::").next().unwrap_or(type_name)
}

impl HandlerMapping for NameConventionHandlerMapping {
    fn name(&self) -> &str {
        "NameConventionHandlerMapping"
    }

    fn get_handler(&self, ctx: &RequestContext) -> MvcResult<Option<HandlerExecutionChain>> {
        Ok(self.handlers.get(ctx.request_url()).map(|class| {
            HandlerExecutionChain::with_interceptors(
                Handler::Class(Arc::clone(class)),
                interceptors_for(ctx),
            )
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::EchoHandler;

    #[test]
    fn test_urls_from_class_names() {
        let classes = vec![
            ClassDefinition::request_handler::<EchoHandler>("app::web::EchoController"),
            ClassDefinition::request_handler::<EchoHandler>("EchoService"),
            ClassDefinition::builder::<()>("RoutedController")
                .route("index", "/routed", vec![], |_, _| Ok(()))
                .build(),
        ];
        let mapping = NameConventionHandlerMapping::new(&classes, "Controller");
        assert_eq!(mapping.urls(), ["/echo"]);
    }
}
