//! 参数解析
//!
//! 内置解析器的顺序是有意义的：
//! 1. 上下文对象（请求、响应、会话、应用上下文）
//! 2. 上传文件
//! 3. 请求体
//! 4. 路径变量
//! 5. 按名称绑定的标量、数组、列表
//! 6. bean，兜底，只认领其它解析器都不支持的参数
//!
//! [`ArgumentResolverComposite`] 缓存"参数 → 解析器"的对应关系，缓存只增不减。

mod bean;
mod body;
mod common;
mod context_api;
mod exception;
mod path_variable;

pub use bean::BeanArgumentResolver;
pub use body::RequestBodyArgumentResolver;
pub use common::{
    CommonTypeArgumentResolver, MultipartFileArgumentResolver, MultipartSource,
    SimpleTypeArgumentResolver, SimpleTypeSource, ValueSource,
};
pub use context_api::ContextApiArgumentResolver;
pub use exception::ExceptionArgumentResolver;
pub use path_variable::PathVariableArgumentResolver;

use crate::constants::LOWEST_PRIORITY;
use crate::context::RequestContext;
use crate::error::{Exception, MvcError, MvcResult, UNSUPPORTED_PARAMETER};
use crate::parameter::MethodParameter;
use crate::value::{Arguments, Value};
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// 方法参数解析器
pub trait MethodArgumentResolver: Send + Sync {
    fn name(&self) -> &str;

    /// 自定义解析器之间的顺序，值越小越靠前
    fn priority(&self) -> i32 {
        LOWEST_PRIORITY
    }

    /// 是否认领这个参数
    fn supports(&self, parameter: &MethodParameter) -> bool;

    /// 从请求中解析参数值
    fn resolve_argument(&self, parameter: &MethodParameter, ctx: &RequestContext) -> MvcResult<Value>;
}

/// 有序的解析器集合
pub struct ArgumentResolverComposite {
    resolvers: Vec<Arc<dyn MethodArgumentResolver>>,
    cache: DashMap<MethodParameter, usize>,
}

impl ArgumentResolverComposite {
    pub fn new(resolvers: Vec<Arc<dyn MethodArgumentResolver>>) -> Self {
        Self {
            resolvers,
            cache: DashMap::new(),
        }
    }

    pub fn resolvers(&self) -> &[Arc<dyn MethodArgumentResolver>] {
        &self.resolvers
    }

    /// 第一个认领参数的解析器
    pub fn get_resolver(&self, parameter: &MethodParameter) -> Option<&Arc<dyn MethodArgumentResolver>> {
        if let Some(index) = self.cache.get(parameter).map(|entry| *entry) {
            return self.resolvers.get(index);
        }

        let (index, resolver) = self
            .resolvers
            .iter()
            .enumerate()
            .find(|(_, resolver)| resolver.supports(parameter))?;
        tracing::trace!(
            parameter = %parameter,
            resolver = resolver.name(),
            "Cached argument resolver"
        );
        self.cache.insert(parameter.clone(), index);
        Some(resolver)
    }

    pub fn supports(&self, parameter: &MethodParameter) -> bool {
        self.get_resolver(parameter).is_some()
    }

    /// 解析单个参数；没有解析器认领时返回 `UnsupportedParameterException`
    pub fn resolve_argument(&self, parameter: &MethodParameter, ctx: &RequestContext) -> MvcResult<Value> {
        match self.get_resolver(parameter) {
            Some(resolver) => resolver.resolve_argument(parameter, ctx),
            None => Err(unsupported(parameter)),
        }
    }

    /// 按顺序解析方法的全部参数
    pub fn resolve_arguments(
        &self,
        parameters: &[MethodParameter],
        ctx: &RequestContext,
    ) -> MvcResult<Arguments> {
        self.check_supported(parameters, None)?;
        parameters
            .iter()
            .map(|parameter| self.resolve_argument(parameter, ctx))
            .collect::<MvcResult<Vec<_>>>()
            .map(Arguments::new)
    }

    /// 解析全部参数，`first` 先于集合中的解析器被询问，不参与缓存
    pub fn resolve_arguments_with(
        &self,
        parameters: &[MethodParameter],
        ctx: &RequestContext,
        first: &dyn MethodArgumentResolver,
    ) -> MvcResult<Arguments> {
        self.check_supported(parameters, Some(first))?;
        parameters
            .iter()
            .map(|parameter| {
                if first.supports(parameter) {
                    first.resolve_argument(parameter, ctx)
                } else {
                    self.resolve_argument(parameter, ctx)
                }
            })
            .collect::<MvcResult<Vec<_>>>()
            .map(Arguments::new)
    }

    /// 在解析任何参数之前确认每个参数都有解析器
    fn check_supported(
        &self,
        parameters: &[MethodParameter],
        first: Option<&dyn MethodArgumentResolver>,
    ) -> MvcResult<()> {
        let missing = parameters.iter().find(|parameter| {
            !first.is_some_and(|resolver| resolver.supports(parameter)) && !self.supports(parameter)
        });
        match missing {
            Some(parameter) => Err(unsupported(parameter)),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for ArgumentResolverComposite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.resolvers.iter().map(|r| r.name()).collect();
        f.debug_struct("ArgumentResolverComposite")
            .field("resolvers", &names)
            .field("cached", &self.cache.len())
            .finish()
    }
}

fn unsupported(parameter: &MethodParameter) -> MvcError {
    Exception::new(
        &UNSUPPORTED_PARAMETER,
        format!(
            "Unsupported parameter type [{}], parameter name [{}], method [{}], class [{}]",
            parameter.type_descriptor(),
            parameter.name(),
            parameter.method(),
            parameter.containing_class()
        ),
    )
    .into()
}

/// 完整解析器列表的共享句柄，应用上下文组装完解析器后填充一次
///
/// 需要回调整个解析链的解析器（比如 bean 解析器）通过它拿到列表
#[derive(Default)]
pub struct ResolverRegistry {
    resolvers: OnceCell<Vec<Arc<dyn MethodArgumentResolver>>>,
}

impl ResolverRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, resolvers: Vec<Arc<dyn MethodArgumentResolver>>) -> MvcResult<()> {
        self.resolvers
            .set(resolvers)
            .map_err(|_| MvcError::configuration("Argument resolvers have already been registered"))
    }

    pub fn get(&self) -> Option<&[Arc<dyn MethodArgumentResolver>]> {
        self.resolvers.get().map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ILLEGAL_ARGUMENT, MISSING_VALUE};
    use crate::multipart::{MultipartFile, Part};
    use crate::parameter::Param;
    use crate::request::WebRequest;
    use crate::testing::{self, Department, Employee};
    use crate::types::TypeDescriptor;
    use http::Method;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn bind(params: Vec<Param>) -> Vec<MethodParameter> {
        bind_route(params, None)
    }

    fn bind_route(params: Vec<Param>, pattern: Option<&str>) -> Vec<MethodParameter> {
        params
            .into_iter()
            .enumerate()
            .map(|(i, p)| MethodParameter::bind(p, "TestController", "handle", i, pattern.map(Arc::from)))
            .collect()
    }

    fn resolve(request: WebRequest, params: Vec<Param>) -> MvcResult<Arguments> {
        let ctx = testing::request_context(request);
        let parameters = bind(params);
        ctx.application().argument_resolvers().resolve_arguments(&parameters, &ctx)
    }

    fn exception_of(result: MvcResult<Arguments>) -> Exception {
        match result {
            Err(MvcError::Exception(e)) => e,
            other => panic!("expected an exception, got {:?}", other.map(|a| a.len())),
        }
    }

    #[test]
    fn test_primitive_without_value_fails_and_default_applies() {
        let err = exception_of(resolve(testing::get("/x"), vec![Param::of::<i32>("size")]));
        assert!(err.is_instance_of(&MISSING_VALUE));

        let mut args = resolve(
            testing::get("/x"),
            vec![Param::of::<i32>("size").default_value("5")],
        )
        .unwrap();
        assert_eq!(args.take::<i32>(0).unwrap(), 5);
    }

    #[test]
    fn test_nullable_scalar_and_empty_list() {
        let mut args = resolve(
            testing::get("/x"),
            vec![Param::of::<Option<i32>>("page"), Param::of::<Vec<i64>>("ids")],
        )
        .unwrap();
        assert_eq!(args.take::<Option<i32>>(0).unwrap(), None);
        assert!(args.take::<Vec<i64>>(1).unwrap().is_empty());
    }

    #[test]
    fn test_array_and_list_from_repeated_parameters() {
        let request = WebRequest::builder()
            .path("/x")
            .param("ids", "1")
            .param("ids", "2")
            .param("tags", "a")
            .param("tags", "b")
            .build();
        let mut args = resolve(
            request,
            vec![Param::of::<Box<[u32]>>("ids"), Param::of::<Vec<String>>("tags")],
        )
        .unwrap();
        assert_eq!(&*args.take::<Box<[u32]>>(0).unwrap(), &[1, 2]);
        assert_eq!(args.take::<Vec<String>>(1).unwrap(), ["a", "b"]);
    }

    #[test]
    fn test_named_parameter_and_conversion_failure() {
        let request = WebRequest::builder().path("/x").param("p", "abc").build();
        let err = exception_of(resolve(request, vec![Param::of::<i32>("page").named("p")]));
        assert!(err.is_instance_of(&crate::error::INVALID_VALUE));
    }

    #[test]
    fn test_unsupported_parameter_fails_before_resolution() {
        let err = exception_of(resolve(
            testing::get("/x"),
            vec![
                Param::of::<i32>("size"),
                Param::with_type("opaque", TypeDescriptor::Object("Opaque")),
            ],
        ));
        assert!(err.is_instance_of(&UNSUPPORTED_PARAMETER));
        assert!(err.message().contains("opaque"));
        assert!(err.message().contains("TestController"));
    }

    #[test]
    fn test_context_objects_and_files() {
        let request = WebRequest::builder()
            .method(Method::POST)
            .path("/upload")
            .part(Part::new("file", "hello").with_filename("a.txt"))
            .part(Part::new("docs", "1"))
            .part(Part::new("docs", "2"))
            .build();
        let mut args = resolve(
            request,
            vec![
                Param::of::<Arc<WebRequest>>("request"),
                Param::of::<MultipartFile>("file"),
                Param::of::<Vec<Part>>("docs"),
                Param::of::<Option<MultipartFile>>("missing"),
            ],
        )
        .unwrap();
        assert_eq!(args.take::<Arc<WebRequest>>(0).unwrap().path(), "/upload");
        let file = args.take::<MultipartFile>(1).unwrap();
        assert_eq!(file.original_filename(), Some("a.txt"));
        assert_eq!(args.take::<Vec<Part>>(2).unwrap().len(), 2);
        assert!(args.take::<Option<MultipartFile>>(3).unwrap().is_none());
    }

    #[test]
    fn test_request_body() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Login {
            user: String,
        }

        let request = WebRequest::builder()
            .method(Method::POST)
            .path("/login")
            .body(r#"{"user":"ann"}"#)
            .build();
        let mut args = resolve(request, vec![Param::request_body::<Login>("login")]).unwrap();
        assert_eq!(
            args.take_object::<Login>(0).unwrap(),
            Login { user: "ann".into() }
        );

        let request = WebRequest::builder().method(Method::POST).path("/login").body("{").build();
        let err = exception_of(resolve(request, vec![Param::request_body::<Login>("login")]));
        assert!(err.is_instance_of(&crate::error::MESSAGE_NOT_READABLE));
    }

    #[test]
    fn test_path_variables() {
        let ctx = testing::request_context(testing::get("/list/2/5"));
        let parameters = bind_route(
            vec![
                Param::path_variable::<i32>("no"),
                Param::path_variable::<u8>("count").variable("size"),
                Param::path_variable::<Option<String>>("absent"),
            ],
            Some("/list/{no}/{size}"),
        );
        let mut args = ctx
            .application()
            .argument_resolvers()
            .resolve_arguments(&parameters, &ctx)
            .unwrap();
        assert_eq!(args.take::<i32>(0).unwrap(), 2);
        assert_eq!(args.take::<u8>(1).unwrap(), 5);
        assert_eq!(args.take::<Option<String>>(2).unwrap(), None);
    }

    #[test]
    fn test_nested_bean_binding() {
        let request = WebRequest::builder()
            .path("/employees")
            .param("name", "ann")
            .param("age", "30")
            .param("dept.name", "rnd")
            .param("dept.manager.title", "director")
            .build();
        let mut args = resolve(request, vec![Param::bean::<Employee>("employee")]).unwrap();
        let employee = args.take_object::<Employee>(0).unwrap();
        assert_eq!(employee.name, "ann");
        assert_eq!(employee.age, Some(30));
        assert_eq!(employee.dept.name, "rnd");
        assert_eq!(employee.dept.manager.title, "director");
    }

    #[test]
    fn test_cyclic_bean_is_rejected() {
        let err = exception_of(resolve(
            testing::get("/x"),
            vec![Param::bean::<testing::Node>("node")],
        ));
        assert!(err.is_instance_of(&crate::error::ILLEGAL_STATE));
    }

    #[test]
    fn test_bean_resolver_only_claims_beans() {
        let ctx = testing::request_context(testing::get("/x"));
        let composite = ctx.application().argument_resolvers();
        let scalar = bind(vec![Param::of::<i32>("a")]).remove(0);
        let bean = bind(vec![Param::bean::<Department>("d")]).remove(0);
        assert_eq!(composite.get_resolver(&scalar).unwrap().name(), "SimpleTypeArgumentResolver");
        assert_eq!(composite.get_resolver(&bean).unwrap().name(), "BeanArgumentResolver");
    }

    struct Counting {
        calls: AtomicUsize,
    }

    impl MethodArgumentResolver for Counting {
        fn name(&self) -> &str {
            "Counting"
        }

        fn supports(&self, parameter: &MethodParameter) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            parameter.declared_name() == "counted"
        }

        fn resolve_argument(&self, _: &MethodParameter, _: &RequestContext) -> MvcResult<Value> {
            Ok(Value::I32(7))
        }
    }

    #[test]
    fn test_cache_is_keyed_by_position_not_name() {
        let counting = Arc::new(Counting {
            calls: AtomicUsize::new(0),
        });
        let composite = ArgumentResolverComposite::new(vec![counting.clone()]);
        let first = MethodParameter::bind(Param::of::<i32>("counted"), "C", "m", 0, None);
        let renamed = MethodParameter::bind(Param::of::<i32>("other"), "C", "m", 0, None);

        assert!(composite.supports(&first));
        assert!(composite.supports(&renamed));
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_exception_resolver_consulted_first() {
        let ctx = testing::request_context(testing::get("/x"));
        let thrown = Exception::illegal_argument("bad");
        let first = ExceptionArgumentResolver::new(thrown.clone());
        let parameters = bind(vec![
            Param::exception("ex", &ILLEGAL_ARGUMENT),
            Param::of::<Option<String>>("q"),
        ]);
        let mut args = ctx
            .application()
            .argument_resolvers()
            .resolve_arguments_with(&parameters, &ctx, &first)
            .unwrap();
        assert_eq!(args.take::<Exception>(0).unwrap().id(), thrown.id());
        assert_eq!(args.take::<Option<String>>(1).unwrap(), None);
    }
}
