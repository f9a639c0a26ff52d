//! 处理器类注册
//!
//! 路由模式、异常处理方法、参数名与默认值都在注册时用 [`ClassDefinitionBuilder`] 显式声明：
//!
//! ```ignore
//! ClassDefinition::builder::<UserController>("UserController")
//!     .request_mapping("/users")
//!     .route("list", "/list/{no}", vec![Param::path_variable::<i32>("no")], |c, mut args| {
//!         c.list(args.take(0)?)
//!     })
//!     .exception_handler("on_error", &RUNTIME_EXCEPTION, |c, ex| c.on_error(ex))
//!     .build()
//! ```

use crate::error::{Exception, ExceptionClass, MvcError, MvcResult};
use crate::handler::{
    ExceptionHandlerKind, ExceptionHandlerMethod, HandlerClass, HandlerInstance, HandlerMethod,
    HttpRequestHandler, Instantiator, IntoHandlerReturn, MethodInvoker, ObjectFactory,
};
use crate::parameter::{MethodId, MethodParameter, Param};
use crate::properties::ConfigurationProperties;
use crate::value::Arguments;
use std::any::{type_name, Any};
use std::marker::PhantomData;
use std::sync::Arc;

/// 一个已发现的处理器类
#[derive(Debug, Clone)]
pub struct ClassDefinition {
    class: Arc<HandlerClass>,
    handler_methods: Vec<Arc<HandlerMethod>>,
    exception_handlers: Vec<ExceptionHandlerMethod>,
}

impl ClassDefinition {
    /// 普通处理器类，默认用 `Default` 创建实例
    pub fn builder<C: Default + Send + 'static>(type_name: &'static str) -> ClassDefinitionBuilder<C> {
        ClassDefinitionBuilder {
            type_name,
            base_path: String::new(),
            factory: Arc::new(|_: &ConfigurationProperties| -> HandlerInstance { Box::new(C::default()) }),
            methods: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// 回调式处理器类
    pub fn request_handler<H: HttpRequestHandler + Default + 'static>(type_name: &'static str) -> Self {
        Self::request_handler_with(type_name, |_| H::default())
    }

    /// 回调式处理器类，实例由工厂创建
    pub fn request_handler_with<H, F>(type_name: &'static str, factory: F) -> Self
    where
        H: HttpRequestHandler + 'static,
        F: Fn(&ConfigurationProperties) -> H + Send + Sync + 'static,
    {
        let factory = Arc::new(move |props: &ConfigurationProperties| -> Box<dyn HttpRequestHandler> {
            Box::new(factory(props))
        });
        Self {
            class: Arc::new(HandlerClass::new(
                type_name,
                String::new(),
                Instantiator::RequestHandler(factory),
            )),
            handler_methods: Vec::new(),
            exception_handlers: Vec::new(),
        }
    }

    pub fn class(&self) -> &Arc<HandlerClass> {
        &self.class
    }

    pub fn type_name(&self) -> &'static str {
        self.class.type_name()
    }

    /// 带路由模式的方法
    pub fn handler_methods(&self) -> &[Arc<HandlerMethod>] {
        &self.handler_methods
    }

    pub fn exception_handlers(&self) -> &[ExceptionHandlerMethod] {
        &self.exception_handlers
    }
}

enum MethodKind {
    Route(String),
    ExceptionHandler(Vec<&'static ExceptionClass>, ExceptionHandlerKind),
}

struct PendingMethod {
    name: &'static str,
    kind: MethodKind,
    params: Vec<Param>,
    invoker: MethodInvoker,
}

/// [`ClassDefinition`] 构建器
pub struct ClassDefinitionBuilder<C> {
    type_name: &'static str,
    base_path: String,
    factory: ObjectFactory,
    methods: Vec<PendingMethod>,
    _marker: PhantomData<fn() -> C>,
}

impl<C: Send + 'static> ClassDefinitionBuilder<C> {
    /// 类级别的路由前缀，与方法的模式直接拼接
    pub fn request_mapping(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// 自定义实例工厂，可以读取配置属性
    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&ConfigurationProperties) -> C + Send + Sync + 'static,
    {
        self.factory = Arc::new(move |props: &ConfigurationProperties| -> HandlerInstance {
            Box::new(factory(props))
        });
        self
    }

    /// 路由方法
    pub fn route<R, F>(mut self, name: &'static str, pattern: &str, params: Vec<Param>, f: F) -> Self
    where
        R: IntoHandlerReturn,
        F: Fn(&mut C, Arguments) -> MvcResult<R> + Send + Sync + 'static,
    {
        self.methods.push(PendingMethod {
            name,
            kind: MethodKind::Route(pattern.to_string()),
            params,
            invoker: invoker::<C, R, F>(name, f),
        });
        self
    }

    /// 只处理一种异常的方法，唯一的参数就是异常
    pub fn exception_handler<R, F>(mut self, name: &'static str, class: &'static ExceptionClass, f: F) -> Self
    where
        R: IntoHandlerReturn,
        F: Fn(&mut C, Exception) -> MvcResult<R> + Send + Sync + 'static,
    {
        self.methods.push(PendingMethod {
            name,
            kind: MethodKind::ExceptionHandler(vec![class], ExceptionHandlerKind::Single),
            params: vec![Param::exception("exception", class)],
            invoker: invoker::<C, R, _>(name, move |target: &mut C, mut args: Arguments| {
                let exception = args.take::<Exception>(0)?;
                f(target, exception)
            }),
        });
        self
    }

    /// 处理多种异常的方法，参数按普通处理器方法解析，异常本身可以作为参数注入
    pub fn exception_handlers<R, F>(
        mut self,
        name: &'static str,
        classes: &[&'static ExceptionClass],
        params: Vec<Param>,
        f: F,
    ) -> Self
    where
        R: IntoHandlerReturn,
        F: Fn(&mut C, Arguments) -> MvcResult<R> + Send + Sync + 'static,
    {
        self.methods.push(PendingMethod {
            name,
            kind: MethodKind::ExceptionHandler(classes.to_vec(), ExceptionHandlerKind::Multiple),
            params,
            invoker: invoker::<C, R, F>(name, f),
        });
        self
    }

    pub fn build(self) -> ClassDefinition {
        let class = Arc::new(HandlerClass::new(
            self.type_name,
            self.base_path,
            Instantiator::Object(self.factory),
        ));

        let mut handler_methods = Vec::new();
        let mut exception_handlers = Vec::new();
        for pending in self.methods {
            let pattern: Option<Arc<str>> = match &pending.kind {
                MethodKind::Route(pattern) => Some(format!("{}{}", class.base_path(), pattern).into()),
                MethodKind::ExceptionHandler(..) => None,
            };
            let method_id = MethodId::next();
            let parameters = pending
                .params
                .into_iter()
                .enumerate()
                .map(|(i, param)| {
                    MethodParameter::bind(param, class.type_name(), pending.name, i, pattern.clone())
                        .in_method(method_id)
                })
                .collect();
            let method = Arc::new(HandlerMethod::new(
                Arc::clone(&class),
                pending.name,
                pattern,
                parameters,
                pending.invoker,
            ));
            match pending.kind {
                MethodKind::Route(_) => handler_methods.push(method),
                MethodKind::ExceptionHandler(types, kind) => {
                    exception_handlers.push(ExceptionHandlerMethod::new(method, types, kind))
                }
            }
        }

        ClassDefinition {
            class,
            handler_methods,
            exception_handlers,
        }
    }
}

fn invoker<C, R, F>(name: &'static str, f: F) -> MethodInvoker
where
    C: Send + 'static,
    R: IntoHandlerReturn,
    F: Fn(&mut C, Arguments) -> MvcResult<R> + Send + Sync + 'static,
{
    Arc::new(move |instance: &mut (dyn Any + Send), args: Arguments| {
        let target = instance.downcast_mut::<C>().ok_or_else(|| {
            MvcError::configuration(format!(
                "Handler instance for method '{}' is not a {}",
                name,
                type_name::<C>()
            ))
        })?;
        f(target, args).map(IntoHandlerReturn::into_handler_return)
    })
}

/// 处理器类注册信息
///
/// 用于自动发现处理器类
pub struct ClassRegistration {
    /// 类型名称
    pub type_name: &'static str,

    /// 构建类定义的函数
    pub define: fn() -> ClassDefinition,
}

impl ClassRegistration {
    pub const fn new(type_name: &'static str, define: fn() -> ClassDefinition) -> Self {
        Self { type_name, define }
    }
}

inventory::collect!(ClassRegistration);

/// 获取所有注册的处理器类
pub fn get_all_classes() -> impl Iterator<Item = &'static ClassRegistration> {
    inventory::iter::<ClassRegistration>.into_iter()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ILLEGAL_STATE;
    use crate::handler::HandlerReturn;
    use crate::value::Value;

    #[derive(Default)]
    struct Greeter {
        greeting: String,
    }

    fn greeter() -> ClassDefinition {
        ClassDefinition::builder::<Greeter>("GreeterController")
            .request_mapping("/greet")
            .factory(|_| Greeter {
                greeting: "hello".into(),
            })
            .route("hi", "/{name}", vec![Param::path_variable::<String>("name")], |g, mut args| {
                Ok(format!("{} {}", g.greeting, args.take::<String>(0)?))
            })
            .exception_handler("on_state", &ILLEGAL_STATE, |_, ex| Ok(ex.message().to_string()))
            .build()
    }

    #[test]
    fn test_patterns_are_composed_literally() {
        let definition = greeter();
        assert_eq!(definition.type_name(), "GreeterController");
        let method = &definition.handler_methods()[0];
        assert_eq!(method.pattern(), Some("/greet/{name}"));
        assert_eq!(method.parameters()[0].route_pattern(), Some("/greet/{name}"));
        assert_eq!(method.to_string(), "GreeterController::hi");
    }

    #[test]
    fn test_invoke_fresh_instance() {
        let definition = greeter();
        let method = &definition.handler_methods()[0];
        let result = method
            .invoke_fresh(
                &ConfigurationProperties::new(),
                Arguments::new(vec![Value::String("ann".into())]),
            )
            .unwrap();
        assert!(matches!(result, HandlerReturn::Value(ref s) if s == "hello ann"));
    }

    #[test]
    fn test_exception_handler_registration() {
        let definition = greeter();
        let handler = &definition.exception_handlers()[0];
        assert_eq!(handler.kind(), ExceptionHandlerKind::Single);
        assert_eq!(handler.exception_types()[0].name(), "IllegalStateException");
        assert_eq!(handler.method().pattern(), None);

        let result = handler
            .method()
            .invoke_fresh(
                &ConfigurationProperties::new(),
                Arguments::new(vec![Value::Exception(Exception::illegal_state("boom"))]),
            )
            .unwrap();
        assert!(matches!(result, HandlerReturn::Value(ref s) if s == "boom"));
    }

    #[test]
    fn test_wrong_instance_type_is_configuration_error() {
        let definition = greeter();
        let mut wrong: Box<dyn Any + Send> = Box::new(42u8);
        let err = definition.handler_methods()[0]
            .invoke(wrong.as_mut(), Arguments::default())
            .unwrap_err();
        assert!(matches!(err, MvcError::Configuration(_)));
    }
}
