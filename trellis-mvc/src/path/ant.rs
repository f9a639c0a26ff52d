//! Ant 风格路径匹配
//!
//! - `?` 匹配一个字符，不匹配分隔符
//! - `*` 匹配一个段内的零个或多个字符
//! - `**` 匹配零个或多个完整的段
//! - `{name}` 路径变量，匹配时视为 `*`

use super::{PathMatcher, PatternComparator};
use crate::error::{Exception, UNSUPPORTED_OPERATION};
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::cmp::{Ordering, Reverse};
use std::collections::HashMap;

static PATH_VARIABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[^/{}]*\}").expect("path variable regex is valid"));

/// Ant 风格路径匹配器
#[derive(Debug, Clone)]
pub struct AntPathMatcher {
    separator: char,
    case_sensitive: bool,
    match_start: bool,
}

impl Default for AntPathMatcher {
    fn default() -> Self {
        Self {
            separator: '/',
            case_sensitive: true,
            match_start: false,
        }
    }
}

impl AntPathMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// 开启后，路径只要能作为模式的前缀即视为匹配
    pub fn match_start(mut self, match_start: bool) -> Self {
        self.match_start = match_start;
        self
    }

    fn normalize(pattern: &str) -> Cow<'_, str> {
        PATH_VARIABLE.replace_all(pattern, "*")
    }

    fn char_eq(&self, a: char, b: char) -> bool {
        if self.case_sensitive {
            a == b
        } else {
            a.to_lowercase().eq(b.to_lowercase())
        }
    }

    fn match_chars(&self, pattern: &[char], path: &[char]) -> bool {
        let Some((&first, rest)) = pattern.split_first() else {
            return path.is_empty();
        };

        if path.is_empty() && first == self.separator {
            if self.match_start {
                return true;
            }
            // "/*" 不匹配空路径
            if rest == ['*'] {
                return false;
            }
            return self.match_chars(rest, path);
        }

        if first == '*' {
            if rest.first() == Some(&'*') {
                return self.match_segments(&rest[1..], path);
            }
            if self.match_chars(rest, path) {
                return true;
            }
            return match path.split_first() {
                Some((&c, tail)) if c != self.separator => self.match_chars(pattern, tail),
                _ => false,
            };
        }

        match path.split_first() {
            Some((&c, tail)) => {
                let head_matches = if first == '?' {
                    c != self.separator
                } else {
                    self.char_eq(first, c)
                };
                head_matches && self.match_chars(rest, tail)
            }
            None => false,
        }
    }

    /// `**` 之后的匹配：要么不占用任何段，要么吞掉一个完整的段再继续
    fn match_segments(&self, rest: &[char], path: &[char]) -> bool {
        let after = match rest.split_first() {
            Some((&c, tail)) if c == self.separator => tail,
            _ => rest,
        };
        if self.match_chars(after, path) {
            return true;
        }
        if path.is_empty() {
            return false;
        }
        let remaining = match path.iter().position(|&c| c == self.separator) {
            Some(i) => &path[i + 1..],
            None => &path[path.len()..],
        };
        self.match_segments(rest, remaining)
    }

    fn tokenize<'s>(&self, value: &'s str) -> Vec<&'s str> {
        value.split(self.separator).filter(|s| !s.is_empty()).collect()
    }
}

impl PathMatcher for AntPathMatcher {
    fn name(&self) -> &str {
        "AntPathMatcher"
    }

    fn is_match(&self, pattern: &str, path: &str) -> bool {
        let pattern: Vec<char> = Self::normalize(pattern).chars().collect();
        let path: Vec<char> = path.chars().collect();
        self.match_chars(&pattern, &path)
    }

    fn extract_path_variables(
        &self,
        pattern: &str,
        path: &str,
    ) -> Result<HashMap<String, String>, Exception> {
        if let (Some(variable), Some(double)) = (PATH_VARIABLE.find(pattern), pattern.find("**")) {
            if double < variable.start() {
                return Err(Exception::new(
                    &UNSUPPORTED_OPERATION,
                    format!("'**' may not precede a path variable in pattern '{}'", pattern),
                ));
            }
        }

        if !self.is_match(pattern, path) {
            return Err(Exception::illegal_argument(format!(
                "Path '{}' does not match pattern '{}'",
                path, pattern
            )));
        }

        let variables = self
            .tokenize(pattern)
            .into_iter()
            .zip(self.tokenize(path))
            .filter(|(segment, _)| {
                segment.len() > 2 && segment.starts_with('{') && segment.ends_with('}')
            })
            .map(|(segment, value)| (segment[1..segment.len() - 1].to_string(), value.to_string()))
            .collect();

        Ok(variables)
    }

    fn pattern_comparator<'a>(&'a self, path: &'a str) -> PatternComparator<'a> {
        let comparator = AntPatternComparator::new(path);
        Box::new(move |a, b| comparator.compare(a, b))
    }
}

/// 模式具体程度比较
///
/// 排序规则（越靠前越具体）：
/// 1. 与请求路径完全相同的模式
/// 2. 非前缀模式：通配符与变量越少、字面长度越长越靠前
/// 3. 以 `/**` 结尾的前缀模式：越长越靠前
/// 4. `/**`
#[derive(Debug, Clone)]
pub struct AntPatternComparator<'p> {
    path: &'p str,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct SpecificityKey {
    catch_all: bool,
    not_exact: bool,
    prefix: bool,
    wildcards: usize,
    length: Reverse<usize>,
    single_wildcards: usize,
    variables: usize,
}

impl<'p> AntPatternComparator<'p> {
    pub fn new(path: &'p str) -> Self {
        Self { path }
    }

    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        self.key(a).cmp(&self.key(b))
    }

    fn key(&self, pattern: &str) -> SpecificityKey {
        let catch_all = pattern == "/**";
        let prefix = !catch_all && pattern.ends_with("/**");

        let variables = PATH_VARIABLE.find_iter(pattern).count();
        let stripped = PATH_VARIABLE.replace_all(pattern, "#");
        let doubles = stripped.matches("**").count();
        let singles = stripped.matches('*').count() - doubles * 2;
        let length = stripped.chars().count();

        // 前缀模式之间只比较长度
        let (wildcards, single_wildcards, variables) = if prefix {
            (0, 0, 0)
        } else {
            (variables + singles + doubles * 2, singles, variables)
        };

        SpecificityKey {
            catch_all,
            not_exact: pattern != self.path,
            prefix,
            wildcards,
            length: Reverse(length),
            single_wildcards,
            variables,
        }
    }
}
