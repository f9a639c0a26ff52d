//! 处理器拦截器
//!
//! 前置逻辑按优先级顺序执行，后置逻辑逆序执行；具体的执行次序由 [`HandlerExecutionChain`] 保证。
//!
//! [`HandlerExecutionChain`]: crate::chain::HandlerExecutionChain

use crate::constants::LOWEST_PRIORITY;
use crate::context::RequestContext;
use crate::error::MvcResult;
use crate::handler::Handler;
use crate::path::PathMatcher;
use std::sync::Arc;

/// 处理器拦截器
pub trait HandlerInterceptor: Send + Sync {
    fn name(&self) -> &str;

    /// 值越小越先执行，未指定时排在最后
    fn priority(&self) -> i32 {
        LOWEST_PRIORITY
    }

    /// 处理器执行前调用，返回 `false` 终止后续流程
    ///
    /// 终止时由拦截器自己负责写响应
    fn pre_handle(&self, _ctx: &RequestContext, _handler: &Handler) -> MvcResult<bool> {
        Ok(true)
    }

    /// 前置逻辑成功的拦截器，无论处理器是否出错都会调用
    fn post_handle(&self, _ctx: &RequestContext, _handler: &Handler) -> MvcResult<()> {
        Ok(())
    }

    /// 拦截的路径，空列表表示拦截所有路径
    fn path_patterns(&self) -> Vec<&str> {
        vec!["/**"]
    }

    /// 排除的路径，与拦截路径同时匹配时以排除为准
    fn exclude_patterns(&self) -> Vec<&str> {
        vec![]
    }
}

/// 拦截器及其路径规则
struct InterceptorWrapper {
    interceptor: Arc<dyn HandlerInterceptor>,
    include_patterns: Vec<String>,
    exclude_patterns: Vec<String>,
}

impl InterceptorWrapper {
    fn new(interceptor: Arc<dyn HandlerInterceptor>) -> Self {
        let include_patterns = owned(interceptor.path_patterns());
        let exclude_patterns = owned(interceptor.exclude_patterns());
        Self {
            interceptor,
            include_patterns,
            exclude_patterns,
        }
    }

    fn should_apply(&self, matcher: &dyn PathMatcher, path: &str) -> bool {
        let included = self.include_patterns.is_empty()
            || self
                .include_patterns
                .iter()
                .any(|pattern| matcher.is_match(pattern, path));
        let excluded = self
            .exclude_patterns
            .iter()
            .any(|pattern| matcher.is_match(pattern, path));
        included && !excluded
    }
}

fn owned(patterns: Vec<&str>) -> Vec<String> {
    patterns.into_iter().map(str::to_string).collect()
}

/// 拦截器注册表，启动后只读
pub struct InterceptorRegistry {
    interceptors: Vec<InterceptorWrapper>,
}

impl InterceptorRegistry {
    /// 按优先级稳定排序，优先级相同的保持注册顺序
    pub fn new(interceptors: Vec<Arc<dyn HandlerInterceptor>>) -> Self {
        let mut interceptors: Vec<InterceptorWrapper> =
            interceptors.into_iter().map(InterceptorWrapper::new).collect();
        interceptors.sort_by_key(|w| w.interceptor.priority());
        Self { interceptors }
    }

    /// 适用于请求路径的拦截器，按执行顺序排列
    pub fn applicable(
        &self,
        matcher: &dyn PathMatcher,
        path: &str,
    ) -> Vec<Arc<dyn HandlerInterceptor>> {
        self.interceptors
            .iter()
            .filter(|w| w.should_apply(matcher, path))
            .map(|w| Arc::clone(&w.interceptor))
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.interceptors.iter().map(|w| w.interceptor.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}

impl Default for InterceptorRegistry {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::AntPathMatcher;

    struct Scoped {
        name: &'static str,
        priority: i32,
        include: Vec<&'static str>,
        exclude: Vec<&'static str>,
    }

    impl HandlerInterceptor for Scoped {
        fn name(&self) -> &str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn path_patterns(&self) -> Vec<&str> {
            self.include.clone()
        }

        fn exclude_patterns(&self) -> Vec<&str> {
            self.exclude.clone()
        }
    }

    fn scoped(
        name: &'static str,
        priority: i32,
        include: Vec<&'static str>,
        exclude: Vec<&'static str>,
    ) -> Arc<dyn HandlerInterceptor> {
        Arc::new(Scoped {
            name,
            priority,
            include,
            exclude,
        })
    }

    #[test]
    fn test_priority_order_is_stable() {
        let registry = InterceptorRegistry::new(vec![
            scoped("late", LOWEST_PRIORITY, vec![], vec![]),
            scoped("second", 10, vec![], vec![]),
            scoped("first", 1, vec![], vec![]),
            scoped("later", LOWEST_PRIORITY, vec![], vec![]),
        ]);
        assert_eq!(registry.names(), ["first", "second", "late", "later"]);
    }

    #[test]
    fn test_include_and_exclude_patterns() {
        let matcher = AntPathMatcher::new();
        let registry = InterceptorRegistry::new(vec![
            scoped("all", 1, vec![], vec![]),
            scoped("api", 2, vec!["/api/**"], vec![]),
            scoped("not-login", 3, vec!["/api/**"], vec!["/api/login"]),
        ]);

        let names = |path: &str| -> Vec<String> {
            registry
                .applicable(&matcher, path)
                .iter()
                .map(|i| i.name().to_string())
                .collect()
        };

        assert_eq!(names("/api/users"), ["all", "api", "not-login"]);
        assert_eq!(names("/api/login"), ["all", "api"]);
        assert_eq!(names("/home"), ["all"]);
    }
}
