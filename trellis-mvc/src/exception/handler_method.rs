use super::HandlerExceptionResolver;
use crate::argument::ExceptionArgumentResolver;
use crate::context::RequestContext;
use crate::controller::ClassDefinition;
use crate::error::{Exception, ExceptionClass, MvcResult};
use crate::handler::{ExceptionHandlerKind, ExceptionHandlerMethod, Handler, HandlerMethod};
use crate::value::{Arguments, Value};
use crate::view::ViewResult;
use std::sync::Arc;

fn collect(classes: &[ClassDefinition], kind: ExceptionHandlerKind) -> Vec<ExceptionHandlerMethod> {
    classes
        .iter()
        .flat_map(|definition| definition.exception_handlers())
        .filter(|handler| handler.kind() == kind)
        .cloned()
        .collect()
}

/// 调用异常处理方法；调用本身失败时视为不处理
fn invoke(
    ctx: &RequestContext,
    method: &HandlerMethod,
    args: MvcResult<Arguments>,
) -> Option<ViewResult> {
    let result = args.and_then(|args| {
        method.invoke_fresh(ctx.application().configuration_properties(), args)
    });
    match result {
        Ok(result) => {
            tracing::debug!(handler = %method, "Exception resolved by exception handler");
            Some(result.into_view())
        }
        Err(e) => {
            tracing::warn!(handler = %method, error = %e, "Exception handler failed");
            None
        }
    }
}

/// 单一异常类型的处理方法
///
/// 按异常类型的继承深度降序排好，线性查找第一个匹配即是最具体的；
/// 处理方法收到的是根异常
pub struct ExceptionHandlerExceptionResolver {
    handlers: Vec<ExceptionHandlerMethod>,
}

impl ExceptionHandlerExceptionResolver {
    pub fn new(classes: &[ClassDefinition]) -> Self {
        Self::from_handlers(collect(classes, ExceptionHandlerKind::Single))
    }

    pub fn from_handlers(mut handlers: Vec<ExceptionHandlerMethod>) -> Self {
        handlers.sort_by_key(|handler| {
            std::cmp::Reverse(declared_type(handler).map_or(0, ExceptionClass::depth))
        });
        tracing::info!(handlers = handlers.len(), "Exception handler methods registered");
        Self { handlers }
    }

    /// 与异常类型匹配的第一个处理方法
    pub fn find_handler(&self, exception: &Exception) -> Option<&Arc<HandlerMethod>> {
        self.handlers
            .iter()
            .find(|handler| {
                declared_type(handler).is_some_and(|c| c.is_assignable_from(exception.class()))
            })
            .map(ExceptionHandlerMethod::method)
    }
}

fn declared_type(handler: &ExceptionHandlerMethod) -> Option<&'static ExceptionClass> {
    handler.exception_types().first().copied()
}

impl HandlerExceptionResolver for ExceptionHandlerExceptionResolver {
    fn name(&self) -> &str {
        "ExceptionHandlerExceptionResolver"
    }

    fn resolve_exception(
        &self,
        ctx: &RequestContext,
        _handler: &Handler,
        exception: &Exception,
    ) -> MvcResult<Option<ViewResult>> {
        let raised = exception.root_cause();
        let Some(method) = self.find_handler(raised) else {
            return Ok(None);
        };
        let args = Arguments::new(vec![Value::Exception(raised.clone())]);
        Ok(invoke(ctx, method, Ok(args)))
    }
}

/// 声明多个异常类型的处理方法
///
/// 最具体的匹配要遍历所有方法的所有类型，保留目前为止最具体的那个。
/// `parameterized` 时参数按普通处理器方法解析，异常本身作为可注入的参数；
/// 否则方法唯一的参数就是异常
pub struct ExceptionHandlersExceptionResolver {
    handlers: Vec<ExceptionHandlerMethod>,
    parameterized: bool,
}

impl ExceptionHandlersExceptionResolver {
    pub fn new(classes: &[ClassDefinition], parameterized: bool) -> Self {
        Self::from_handlers(collect(classes, ExceptionHandlerKind::Multiple), parameterized)
    }

    pub fn from_handlers(handlers: Vec<ExceptionHandlerMethod>, parameterized: bool) -> Self {
        tracing::info!(
            handlers = handlers.len(),
            parameterized = parameterized,
            "Multi-type exception handler methods registered"
        );
        Self {
            handlers,
            parameterized,
        }
    }

    pub fn find_handler(&self, exception: &Exception) -> Option<&Arc<HandlerMethod>> {
        let mut best: Option<(&'static ExceptionClass, &ExceptionHandlerMethod)> = None;
        for handler in &self.handlers {
            for &declared in handler.exception_types() {
                if !declared.is_assignable_from(exception.class()) {
                    continue;
                }
                match best {
                    Some((current, _)) if !current.is_assignable_from(declared) => {}
                    _ => best = Some((declared, handler)),
                }
            }
        }
        best.map(|(_, handler)| handler.method())
    }
}

impl HandlerExceptionResolver for ExceptionHandlersExceptionResolver {
    fn name(&self) -> &str {
        if self.parameterized {
            "ParameterizedExceptionHandlersExceptionResolver"
        } else {
            "ExceptionHandlersExceptionResolver"
        }
    }

    fn resolve_exception(
        &self,
        ctx: &RequestContext,
        _handler: &Handler,
        exception: &Exception,
    ) -> MvcResult<Option<ViewResult>> {
        let raised = exception.root_cause();
        let Some(method) = self.find_handler(raised) else {
            return Ok(None);
        };
        let args = if self.parameterized {
            let first = ExceptionArgumentResolver::new(raised.clone());
            ctx.application()
                .argument_resolvers()
                .resolve_arguments_with(method.parameters(), ctx, &first)
        } else {
            Ok(Arguments::new(vec![Value::Exception(raised.clone())]))
        };
        Ok(invoke(ctx, method, args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{
        ExceptionClass, ARITHMETIC, ILLEGAL_ARGUMENT, ILLEGAL_STATE, RUNTIME_EXCEPTION,
    };
    use crate::parameter::Param;
    use crate::testing;

    static NUMBER_FORMAT: ExceptionClass =
        ExceptionClass::new("NumberFormatException", Some(&ILLEGAL_ARGUMENT));

    #[derive(Default)]
    struct Advice;

    fn advice() -> ClassDefinition {
        ClassDefinition::builder::<Advice>("Advice")
            .exception_handler("on_runtime", &RUNTIME_EXCEPTION, |_, _| Ok("runtime"))
            .exception_handler("on_arithmetic", &ARITHMETIC, |_, _| Ok("arithmetic"))
            .exception_handler("on_argument", &ILLEGAL_ARGUMENT, |_, ex| {
                Err::<String, _>(ex.into())
            })
            .exception_handlers(
                "on_many",
                &[&RUNTIME_EXCEPTION, &ILLEGAL_STATE],
                vec![Param::exception("ex", &RUNTIME_EXCEPTION), Param::of::<Option<String>>("q")],
                |_, mut args| {
                    let ex = args.take::<Exception>(0)?;
                    Ok(format!("many:{}:{:?}", ex.class().name(), args.take::<Option<String>>(1)?))
                },
            )
            .exception_handlers("on_argument_family", &[&ILLEGAL_ARGUMENT], vec![], |_, _| {
                Ok("argument family")
            })
            .build()
    }

    fn plain(view: Option<ViewResult>) -> Option<String> {
        match view {
            Some(ViewResult::Plain(text)) => Some(text),
            _ => None,
        }
    }

    #[test]
    fn test_most_specific_single_handler() {
        let resolver = ExceptionHandlerExceptionResolver::new(&[advice()]);
        let ctx = testing::request_context(testing::get("/x"));
        let handler = testing::dummy_handler();

        let view = resolver
            .resolve_exception(&ctx, &handler, &Exception::arithmetic("/ by zero"))
            .unwrap();
        assert_eq!(plain(view).as_deref(), Some("arithmetic"));

        let view = resolver
            .resolve_exception(&ctx, &handler, &Exception::illegal_state("bad state"))
            .unwrap();
        assert_eq!(plain(view).as_deref(), Some("runtime"));
    }

    #[test]
    fn test_root_cause_is_matched() {
        let resolver = ExceptionHandlerExceptionResolver::new(&[advice()]);
        let ctx = testing::request_context(testing::get("/x"));
        let wrapped = Exception::new(&crate::error::EXCEPTION, "wrapper")
            .with_cause(Exception::arithmetic("/ by zero"));
        let view = resolver
            .resolve_exception(&ctx, &testing::dummy_handler(), &wrapped)
            .unwrap();
        assert_eq!(plain(view).as_deref(), Some("arithmetic"));
    }

    #[test]
    fn test_failing_handler_means_not_handled() {
        let resolver = ExceptionHandlerExceptionResolver::new(&[advice()]);
        let ctx = testing::request_context(testing::get("/x"));
        let view = resolver
            .resolve_exception(&ctx, &testing::dummy_handler(), &Exception::new(&NUMBER_FORMAT, "x"))
            .unwrap();
        assert!(view.is_none());
    }

    #[test]
    fn test_running_best_across_handlers() {
        let resolver = ExceptionHandlersExceptionResolver::new(&[advice()], true);
        let found = resolver
            .find_handler(&Exception::new(&NUMBER_FORMAT, "x"))
            .map(|m| m.name());
        assert_eq!(found, Some("on_argument_family"));

        let found = resolver
            .find_handler(&Exception::illegal_state("x"))
            .map(|m| m.name());
        assert_eq!(found, Some("on_many"));
        assert!(resolver.find_handler(&Exception::new(&crate::error::IO_EXCEPTION, "io")).is_none());
    }

    #[test]
    fn test_parameterized_handler_receives_exception_and_request_data() {
        let resolver = ExceptionHandlersExceptionResolver::new(&[advice()], true);
        let request = crate::request::WebRequest::builder().path("/x").param("q", "v").build();
        let ctx = testing::request_context(request);
        let view = resolver
            .resolve_exception(&ctx, &testing::dummy_handler(), &Exception::illegal_state("s"))
            .unwrap();
        assert_eq!(
            plain(view).as_deref(),
            Some("many:IllegalStateException:Some(\"v\")")
        );
    }
}
