//! 应用上下文
//!
//! [`MvcContext`] 在进程启动时构建一次，之后只读，以 `Arc` 句柄传给每个请求。
//! 组件的初始化顺序就是 [`MvcContextBuilder::build`] 里的顺序：
//!
//! 1. 配置器
//! 2. 路径匹配器与类型转换器
//! 3. 参数解析器（适配器和异常解析器都依赖它）
//! 4. 处理器映射
//! 5. 处理器适配器
//! 6. 异常解析器
//! 7. 拦截器
//! 8. 跨域配置
//!
//! 同一类扩展中，自定义组件按优先级稳定排序后排在内置组件之前。

use crate::adapter::{HandlerAdapter, HttpRequestHandlerAdapter, RequestMappingHandlerAdapter};
use crate::argument::{
    ArgumentResolverComposite, BeanArgumentResolver, ContextApiArgumentResolver,
    MethodArgumentResolver, MultipartFileArgumentResolver, PathVariableArgumentResolver,
    RequestBodyArgumentResolver, ResolverRegistry, SimpleTypeArgumentResolver,
};
use crate::configurer::MvcConfigurer;
use crate::controller::ClassDefinition;
use crate::convert::ConverterRegistry;
use crate::cors::CorsConfiguration;
use crate::discovery::{Extension, ScanResult};
use crate::error::{MvcError, MvcResult};
use crate::exception::{
    ExceptionHandlerExceptionResolver, ExceptionHandlersExceptionResolver,
    HandlerExceptionResolver, LogHandlerExceptionResolver,
};
use crate::handler::HttpRequestHandler;
use crate::interceptor::{HandlerInterceptor, InterceptorRegistry};
use crate::mapping::{HandlerMapping, NameConventionHandlerMapping, RequestMappingHandlerMapping};
use crate::path::{AntPathMatcher, PathMatcher};
use crate::properties::{ConfigurationProperties, MvcProperties};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use trellis_core::Environment;

/// 应用上下文
pub struct MvcContext {
    properties: MvcProperties,
    configuration_properties: ConfigurationProperties,
    classes: Vec<ClassDefinition>,
    converters: ConverterRegistry,
    path_matcher: Arc<dyn PathMatcher>,
    argument_resolvers: ArgumentResolverComposite,
    // 持有注册表，bean 解析器只保留弱引用
    _resolver_registry: Arc<ResolverRegistry>,
    handler_mappings: Vec<Arc<dyn HandlerMapping>>,
    handler_adapters: Vec<Arc<dyn HandlerAdapter>>,
    exception_resolvers: Vec<Arc<dyn HandlerExceptionResolver>>,
    interceptors: InterceptorRegistry,
    cors: CorsConfiguration,
    default_handlers: HashMap<String, Arc<dyn HttpRequestHandler>>,
    active_requests: AtomicUsize,
}

impl MvcContext {
    pub fn builder() -> MvcContextBuilder {
        MvcContextBuilder::default()
    }

    pub fn properties(&self) -> &MvcProperties {
        &self.properties
    }

    pub fn configuration_properties(&self) -> &ConfigurationProperties {
        &self.configuration_properties
    }

    pub fn classes(&self) -> &[ClassDefinition] {
        &self.classes
    }

    pub fn converters(&self) -> &ConverterRegistry {
        &self.converters
    }

    pub fn path_matcher(&self) -> &Arc<dyn PathMatcher> {
        &self.path_matcher
    }

    pub fn argument_resolvers(&self) -> &ArgumentResolverComposite {
        &self.argument_resolvers
    }

    pub fn handler_mappings(&self) -> &[Arc<dyn HandlerMapping>] {
        &self.handler_mappings
    }

    pub fn handler_adapters(&self) -> &[Arc<dyn HandlerAdapter>] {
        &self.handler_adapters
    }

    pub fn exception_resolvers(&self) -> &[Arc<dyn HandlerExceptionResolver>] {
        &self.exception_resolvers
    }

    pub fn interceptors(&self) -> &InterceptorRegistry {
        &self.interceptors
    }

    pub fn cors(&self) -> &CorsConfiguration {
        &self.cors
    }

    /// 宿主提供的默认处理器
    pub fn default_handler(&self, name: &str) -> Option<&Arc<dyn HttpRequestHandler>> {
        self.default_handlers.get(name)
    }

    /// 正在处理的请求数
    pub fn active_requests(&self) -> usize {
        self.active_requests.load(Ordering::Acquire)
    }

    pub(crate) fn request_started(&self) {
        self.active_requests.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn request_finished(&self) {
        self.active_requests.fetch_sub(1, Ordering::AcqRel);
    }
}

impl fmt::Debug for MvcContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MvcContext")
            .field("classes", &self.classes.len())
            .field("path_matcher", &self.path_matcher.name())
            .field("argument_resolvers", &names(self.argument_resolvers.resolvers(), |r| r.name()))
            .field("handler_mappings", &names(&self.handler_mappings, |m| m.name()))
            .field("handler_adapters", &names(&self.handler_adapters, |a| a.name()))
            .field("exception_resolvers", &names(&self.exception_resolvers, |r| r.name()))
            .field("interceptors", &self.interceptors.names())
            .field("active_requests", &self.active_requests())
            .finish()
    }
}

fn names<T: ?Sized>(items: &[Arc<T>], name: impl Fn(&T) -> &str) -> Vec<String> {
    items.iter().map(|item| name(&**item).to_string()).collect()
}

/// 按扩展类别拆分后的自定义组件
#[derive(Default)]
struct CustomExtensions {
    mappings: Vec<Arc<dyn HandlerMapping>>,
    adapters: Vec<Arc<dyn HandlerAdapter>>,
    argument_resolvers: Vec<Arc<dyn MethodArgumentResolver>>,
    exception_resolvers: Vec<Arc<dyn HandlerExceptionResolver>>,
    interceptors: Vec<Arc<dyn HandlerInterceptor>>,
    configurers: Vec<Arc<dyn MvcConfigurer>>,
}

impl CustomExtensions {
    fn split(extensions: Vec<Extension>) -> Self {
        let mut custom = Self::default();
        for extension in extensions {
            tracing::info!(
                name = extension.name(),
                kind = extension.kind(),
                "Auto-registered extension"
            );
            match extension {
                Extension::HandlerMapping(e) => custom.mappings.push(e),
                Extension::HandlerAdapter(e) => custom.adapters.push(e),
                Extension::ArgumentResolver(e) => custom.argument_resolvers.push(e),
                Extension::ExceptionResolver(e) => custom.exception_resolvers.push(e),
                Extension::Interceptor(e) => custom.interceptors.push(e),
                Extension::Configurer(e) => custom.configurers.push(e),
            }
        }
        custom.mappings.sort_by_key(|e| e.priority());
        custom.adapters.sort_by_key(|e| e.priority());
        custom.argument_resolvers.sort_by_key(|e| e.priority());
        custom.exception_resolvers.sort_by_key(|e| e.priority());
        custom
    }

    /// 至多一个配置器
    fn configurer(&mut self) -> MvcResult<Option<Arc<dyn MvcConfigurer>>> {
        if self.configurers.len() > 1 {
            let names: Vec<&str> = self.configurers.iter().map(|c| c.name()).collect();
            return Err(MvcError::configuration(format!(
                "At most one MvcConfigurer is allowed, found {}: {}",
                names.len(),
                names.join(", ")
            )));
        }
        Ok(self.configurers.pop())
    }
}

/// [`MvcContext`] 构建器
#[derive(Default)]
pub struct MvcContextBuilder {
    scan: ScanResult,
    properties: MvcProperties,
    configuration_properties: ConfigurationProperties,
    default_handlers: HashMap<String, Arc<dyn HttpRequestHandler>>,
}

impl MvcContextBuilder {
    /// 使用一次扫描的结果，替换之前追加的类和扩展
    pub fn scan(mut self, scan: ScanResult) -> Self {
        self.scan = scan;
        self
    }

    pub fn class(mut self, definition: ClassDefinition) -> Self {
        self.scan = self.scan.with_class(definition);
        self
    }

    pub fn extension(mut self, extension: Extension) -> Self {
        self.scan = self.scan.with_extension(extension);
        self
    }

    pub fn properties(mut self, properties: MvcProperties) -> Self {
        self.properties = properties;
        self
    }

    /// 从 Environment 读取引擎配置
    pub fn environment(mut self, env: &Environment) -> Self {
        self.properties = MvcProperties::from_environment(env);
        self
    }

    pub fn configuration_properties(mut self, properties: ConfigurationProperties) -> Self {
        self.configuration_properties = properties;
        self
    }

    /// 注册宿主提供的默认处理器
    pub fn default_handler(
        mut self,
        name: impl Into<String>,
        handler: impl HttpRequestHandler + 'static,
    ) -> Self {
        self.default_handlers.insert(name.into(), Arc::new(handler));
        self
    }

    pub fn build(self) -> MvcResult<Arc<MvcContext>> {
        let MvcContextBuilder {
            scan,
            properties,
            configuration_properties,
            default_handlers,
        } = self;
        let (classes, extensions) = scan.into_parts();
        let mut custom = CustomExtensions::split(extensions);
        let configurer = custom.configurer()?;
        if let Some(configurer) = &configurer {
            tracing::info!(configurer = configurer.name(), "Applying MVC configurer");
        }

        let mut converters = ConverterRegistry::with_defaults();
        let mut path_matcher: Arc<dyn PathMatcher> = Arc::new(AntPathMatcher::new());
        if let Some(configurer) = &configurer {
            configurer.configure_converters(&mut converters);
            configurer.configure_path_matcher(&mut path_matcher);
        }

        // 参数解析器
        let resolver_registry = ResolverRegistry::new();
        let mut argument_resolvers = std::mem::take(&mut custom.argument_resolvers);
        argument_resolvers.extend(default_argument_resolvers(&resolver_registry));
        if let Some(configurer) = &configurer {
            configurer.configure_argument_resolvers(&mut argument_resolvers);
        }
        resolver_registry.set(argument_resolvers.clone())?;
        let argument_resolvers = ArgumentResolverComposite::new(argument_resolvers);

        // 处理器映射
        let mut handler_mappings = std::mem::take(&mut custom.mappings);
        handler_mappings.push(Arc::new(RequestMappingHandlerMapping::new(
            &classes,
            properties.route_cache_capacity,
        )?));
        handler_mappings.push(Arc::new(NameConventionHandlerMapping::new(
            &classes,
            &properties.name_convention_suffix,
        )));
        if let Some(configurer) = &configurer {
            configurer.configure_handler_mappings(&mut handler_mappings);
        }

        // 处理器适配器
        let mut handler_adapters = std::mem::take(&mut custom.adapters);
        handler_adapters.push(Arc::new(RequestMappingHandlerAdapter));
        handler_adapters.push(Arc::new(HttpRequestHandlerAdapter));
        if let Some(configurer) = &configurer {
            configurer.configure_handler_adapters(&mut handler_adapters);
        }

        // 异常解析器
        let mut exception_resolvers = std::mem::take(&mut custom.exception_resolvers);
        exception_resolvers.push(Arc::new(LogHandlerExceptionResolver));
        exception_resolvers.push(Arc::new(ExceptionHandlerExceptionResolver::new(&classes)));
        exception_resolvers.push(Arc::new(ExceptionHandlersExceptionResolver::new(&classes, true)));
        if let Some(configurer) = &configurer {
            configurer.configure_exception_resolvers(&mut exception_resolvers);
        }

        // 拦截器
        let mut interceptors = std::mem::take(&mut custom.interceptors);
        if let Some(configurer) = &configurer {
            configurer.configure_interceptors(&mut interceptors);
        }
        let interceptors = InterceptorRegistry::new(interceptors);

        // 跨域
        let mut cors = properties.cors.clone();
        if let Some(configurer) = &configurer {
            configurer.configure_cors(&mut cors);
        }
        cors.validate()?;

        let context = MvcContext {
            properties,
            configuration_properties,
            classes,
            converters,
            path_matcher,
            argument_resolvers,
            _resolver_registry: resolver_registry,
            handler_mappings,
            handler_adapters,
            exception_resolvers,
            interceptors,
            cors,
            default_handlers,
            active_requests: AtomicUsize::new(0),
        };
        tracing::info!(
            classes = context.classes.len(),
            argument_resolvers = context.argument_resolvers.resolvers().len(),
            handler_mappings = context.handler_mappings.len(),
            handler_adapters = context.handler_adapters.len(),
            exception_resolvers = context.exception_resolvers.len(),
            interceptors = context.interceptors.len(),
            "MVC context initialized"
        );
        Ok(Arc::new(context))
    }
}

/// 内置参数解析器，顺序决定了谁先认领参数，bean 解析器必须在最后
fn default_argument_resolvers(
    registry: &Arc<ResolverRegistry>,
) -> Vec<Arc<dyn MethodArgumentResolver>> {
    vec![
        Arc::new(ContextApiArgumentResolver),
        Arc::new(MultipartFileArgumentResolver::default()),
        Arc::new(RequestBodyArgumentResolver),
        Arc::new(PathVariableArgumentResolver),
        Arc::new(SimpleTypeArgumentResolver::default()),
        Arc::new(BeanArgumentResolver::new(registry)),
    ]
}
