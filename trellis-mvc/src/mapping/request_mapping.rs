use super::{interceptors_for, HandlerMapping};
use crate::chain::HandlerExecutionChain;
use crate::context::RequestContext;
use crate::controller::ClassDefinition;
use crate::error::{MvcError, MvcResult};
use crate::handler::{Handler, HandlerMethod};
use crate::interceptor::HandlerInterceptor;
use crate::path::PathMatcher;
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// 已解析的路由
#[derive(Clone)]
struct CachedRoute {
    handler: Arc<HandlerMethod>,
    interceptors: Vec<Arc<dyn HandlerInterceptor>>,
}

/// 按路由模式映射处理器方法
///
/// 路由表在启动时建立，之后只读；请求路径到路由的解析结果（包括"没有匹配"）进入有界缓存
pub struct RequestMappingHandlerMapping {
    handlers: HashMap<String, Arc<HandlerMethod>>,
    cache: Mutex<LruCache<String, Option<CachedRoute>>>,
}

impl RequestMappingHandlerMapping {
    /// 收集所有路由方法；两个方法的完整模式相同时返回配置错误
    pub fn new(classes: &[ClassDefinition], cache_capacity: usize) -> MvcResult<Self> {
        let mut handlers: HashMap<String, Arc<HandlerMethod>> = HashMap::new();
        for definition in classes {
            for method in definition.handler_methods() {
                let Some(pattern) = method.pattern() else {
                    continue;
                };
                if let Some(existing) = handlers.get(pattern) {
                    return Err(MvcError::configuration(format!(
                        "Duplicate route pattern '{}' declared by {} and {}",
                        pattern, existing, method
                    )));
                }
                tracing::debug!(pattern = pattern, handler = %method, "Registered route");
                handlers.insert(pattern.to_string(), Arc::clone(method));
            }
        }

        tracing::info!(routes = handlers.len(), "Request mapping routes registered");
        let capacity = NonZeroUsize::new(cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Ok(Self {
            handlers,
            cache: Mutex::new(LruCache::new(capacity)),
        })
    }

    pub fn patterns(&self) -> Vec<&str> {
        let mut patterns: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        patterns.sort_unstable();
        patterns
    }

    /// 按具体程度排序后逐个尝试，返回第一个匹配的处理器
    pub fn lookup(&self, matcher: &dyn PathMatcher, url: &str) -> Option<Arc<HandlerMethod>> {
        let mut patterns = self.patterns();
        let comparator = matcher.pattern_comparator(url);
        patterns.sort_by(|a, b| comparator(a, b));
        patterns
            .into_iter()
            .find(|pattern| matcher.is_match(pattern, url))
            .and_then(|pattern| self.handlers.get(pattern).cloned())
    }

    pub fn cached_routes(&self) -> usize {
        self.cache.lock().len()
    }
}

impl HandlerMapping for RequestMappingHandlerMapping {
    fn name(&self) -> &str {
        "RequestMappingHandlerMapping"
    }

    fn get_handler(&self, ctx: &RequestContext) -> MvcResult<Option<HandlerExecutionChain>> {
        let url = ctx.request_url();
        let cached = self.cache.lock().get(url).cloned();

        let route = match cached {
            Some(route) => {
                tracing::trace!(path = url, "Route cache hit");
                route
            }
            None => {
                let route = self
                    .lookup(ctx.application().path_matcher().as_ref(), url)
                    .map(|handler| CachedRoute {
                        handler,
                        interceptors: interceptors_for(ctx),
                    });
                tracing::debug!(
                    path = url,
                    handler = ?route.as_ref().map(|r| r.handler.to_string()),
                    "Route resolved"
                );
                self.cache.lock().put(url.to_string(), route.clone());
                route
            }
        };

        Ok(route.map(|route| {
            HandlerExecutionChain::with_interceptors(Handler::Method(route.handler), route.interceptors)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::AntPathMatcher;
    use crate::testing;

    fn definition(type_name: &'static str, patterns: &[&'static str]) -> ClassDefinition {
        patterns
            .iter()
            .fold(ClassDefinition::builder::<()>(type_name), |builder, &pattern| {
                builder.route(pattern, pattern, vec![], |_, _| Ok(()))
            })
            .build()
    }

    #[test]
    fn test_duplicate_route_is_configuration_error() {
        let result = RequestMappingHandlerMapping::new(
            &[definition("A", &["/x"]), definition("B", &["/x"])],
            100,
        );
        assert!(matches!(result, Err(MvcError::Configuration(ref m)) if m.contains("/x")));
    }

    #[test]
    fn test_most_specific_pattern_wins() {
        let mapping = RequestMappingHandlerMapping::new(
            &[definition("A", &["/**", "/a/**", "/a/*", "/a/b"])],
            100,
        )
        .unwrap();
        let matcher = AntPathMatcher::new();

        let name = |url: &str| mapping.lookup(&matcher, url).map(|m| m.name());
        assert_eq!(name("/a/b"), Some("/a/b"));
        assert_eq!(name("/a/c"), Some("/a/*"));
        assert_eq!(name("/a/c/d"), Some("/a/**"));
        assert_eq!(name("/z"), Some("/**"));
    }

    #[test]
    fn test_misses_are_cached() {
        let application = testing::application_with(vec![definition("A", &["/a"])]);
        let mapping = RequestMappingHandlerMapping::new(&[definition("A", &["/a"])], 2).unwrap();

        for url in ["/a", "/missing", "/missing"] {
            let ctx = testing::request_context_in(&application, testing::get(url));
            let chain = mapping.get_handler(&ctx).unwrap();
            assert_eq!(chain.is_some(), url == "/a");
        }
        assert_eq!(mapping.cached_routes(), 2);

        let ctx = testing::request_context_in(&application, testing::get("/other"));
        assert!(mapping.get_handler(&ctx).unwrap().is_none());
        assert_eq!(mapping.cached_routes(), 2);
    }
}
