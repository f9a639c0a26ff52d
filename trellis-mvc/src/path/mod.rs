//! 路径匹配
//!
//! [`PathMatcher`] 是路由映射、拦截器过滤和路径变量解析共用的匹配契约

mod ant;

pub use ant::{AntPathMatcher, AntPatternComparator};

use crate::error::Exception;
use std::cmp::Ordering;
use std::collections::HashMap;

/// 模式比较器：对同一个请求路径，把更具体的模式排在前面
pub type PatternComparator<'a> = Box<dyn Fn(&str, &str) -> Ordering + 'a>;

/// 路径匹配器
pub trait PathMatcher: Send + Sync {
    /// 匹配器名称，用于日志
    fn name(&self) -> &str;

    /// 路径是否匹配模式
    fn is_match(&self, pattern: &str, path: &str) -> bool;

    /// 从路径中提取模式声明的变量
    ///
    /// 模式与路径不匹配时返回 `IllegalArgumentException`
    fn extract_path_variables(
        &self,
        pattern: &str,
        path: &str,
    ) -> Result<HashMap<String, String>, Exception> {
        if self.is_match(pattern, path) {
            Ok(HashMap::new())
        } else {
            Err(Exception::illegal_argument(format!(
                "Path '{}' does not match pattern '{}'",
                path, pattern
            )))
        }
    }

    /// 针对指定路径的模式比较器，默认不区分具体程度
    fn pattern_comparator<'a>(&'a self, _path: &'a str) -> PatternComparator<'a> {
        Box::new(|_, _| Ordering::Equal)
    }
}

/// 字面量相等匹配
#[derive(Debug, Clone, Default)]
pub struct EqualPathMatcher {
    ignore_case: bool,
}

impl EqualPathMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignore_case() -> Self {
        Self { ignore_case: true }
    }
}

impl PathMatcher for EqualPathMatcher {
    fn name(&self) -> &str {
        "EqualPathMatcher"
    }

    fn is_match(&self, pattern: &str, path: &str) -> bool {
        if self.ignore_case {
            pattern.eq_ignore_ascii_case(path)
        } else {
            pattern == path
        }
    }
}
