//! 错误模型
//!
//! [`MvcError`] 区分三类失败：可恢复的 [`Exception`]、致命的配置错误、绕过异常解析链的非异常失败。
//! [`Exception`] 携带一个静态的 [`ExceptionClass`]，类之间通过 parent 形成继承层次，
//! 异常处理器按"最具体类型"匹配即依赖这一层次。

use crate::constants::MAX_CAUSE_DEPTH;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// 异常类型
///
/// 应用自定义异常类型时声明为 `static`，并指定父类型：
///
/// ```rust,ignore
/// static ORDER_NOT_FOUND: ExceptionClass =
///     ExceptionClass::new("OrderNotFoundException", Some(&RUNTIME_EXCEPTION));
/// ```
#[derive(Debug)]
pub struct ExceptionClass {
    name: &'static str,
    parent: Option<&'static ExceptionClass>,
}

impl ExceptionClass {
    pub const fn new(name: &'static str, parent: Option<&'static ExceptionClass>) -> Self {
        Self { name, parent }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parent(&self) -> Option<&'static ExceptionClass> {
        self.parent
    }

    /// `other` 是否为本类型或其子类型
    pub fn is_assignable_from(&self, other: &ExceptionClass) -> bool {
        let mut current = Some(other);
        while let Some(class) = current {
            if class == self {
                return true;
            }
            current = class.parent;
        }
        false
    }

    /// 继承深度，根类型为 0
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent;
        while let Some(class) = current {
            depth += 1;
            current = class.parent;
        }
        depth
    }
}

impl PartialEq for ExceptionClass {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other) || self.name == other.name
    }
}

impl Eq for ExceptionClass {}

impl fmt::Display for ExceptionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// ==================== 内置异常类型 ====================

pub static EXCEPTION: ExceptionClass = ExceptionClass::new("Exception", None);
pub static RUNTIME_EXCEPTION: ExceptionClass =
    ExceptionClass::new("RuntimeException", Some(&EXCEPTION));
pub static IO_EXCEPTION: ExceptionClass = ExceptionClass::new("IOException", Some(&EXCEPTION));
pub static ILLEGAL_ARGUMENT: ExceptionClass =
    ExceptionClass::new("IllegalArgumentException", Some(&RUNTIME_EXCEPTION));
pub static ILLEGAL_STATE: ExceptionClass =
    ExceptionClass::new("IllegalStateException", Some(&RUNTIME_EXCEPTION));
pub static ARITHMETIC: ExceptionClass =
    ExceptionClass::new("ArithmeticException", Some(&RUNTIME_EXCEPTION));
pub static UNSUPPORTED_OPERATION: ExceptionClass =
    ExceptionClass::new("UnsupportedOperationException", Some(&RUNTIME_EXCEPTION));

/// 没有任何参数解析器支持的参数
pub static UNSUPPORTED_PARAMETER: ExceptionClass =
    ExceptionClass::new("UnsupportedParameterException", Some(&ILLEGAL_ARGUMENT));
/// 目标类型没有注册转换器
pub static UNSUPPORTED_CONVERSION: ExceptionClass =
    ExceptionClass::new("UnsupportedConversionException", Some(&UNSUPPORTED_OPERATION));
/// 转换器无法解析原始值
pub static INVALID_VALUE: ExceptionClass =
    ExceptionClass::new("InvalidValueException", Some(&ILLEGAL_ARGUMENT));
/// 不可为空的参数没有取到值
pub static MISSING_VALUE: ExceptionClass =
    ExceptionClass::new("MissingValueException", Some(&ILLEGAL_ARGUMENT));
/// 请求体无法反序列化
pub static MESSAGE_NOT_READABLE: ExceptionClass =
    ExceptionClass::new("MessageNotReadableException", Some(&RUNTIME_EXCEPTION));

/// 可恢复的异常
///
/// `id` 在创建时生成，克隆后保持不变，用于判断异常是否被原样传播
#[derive(Debug, Clone)]
pub struct Exception {
    id: Uuid,
    class: &'static ExceptionClass,
    message: String,
    cause: Option<Arc<Exception>>,
}

impl Exception {
    pub fn new(class: &'static ExceptionClass, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            class,
            message: message.into(),
            cause: None,
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(&RUNTIME_EXCEPTION, message)
    }

    pub fn illegal_argument(message: impl Into<String>) -> Self {
        Self::new(&ILLEGAL_ARGUMENT, message)
    }

    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::new(&ILLEGAL_STATE, message)
    }

    pub fn arithmetic(message: impl Into<String>) -> Self {
        Self::new(&ARITHMETIC, message)
    }

    /// 把任意错误包装为异常，错误的 source 链转换为 cause 链
    pub fn from_error(
        class: &'static ExceptionClass,
        error: &(dyn std::error::Error + 'static),
    ) -> Self {
        let mut exception = Self::new(class, error.to_string());
        if let Some(source) = error.source() {
            exception.cause = Some(Arc::new(Self::from_error(&EXCEPTION, source)));
        }
        exception
    }

    pub fn with_cause(mut self, cause: Exception) -> Self {
        self.cause = Some(Arc::new(cause));
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn class(&self) -> &'static ExceptionClass {
        self.class
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&Exception> {
        self.cause.as_deref()
    }

    pub fn is_instance_of(&self, class: &ExceptionClass) -> bool {
        class.is_assignable_from(self.class)
    }

    /// 根异常：cause 链最内层的异常
    ///
    /// 遇到自引用的 cause 或超过 [`MAX_CAUSE_DEPTH`] 层时停止
    pub fn root_cause(&self) -> &Exception {
        let mut current = self;
        for _ in 0..MAX_CAUSE_DEPTH {
            match current.cause.as_deref() {
                Some(cause) if cause.id != current.id => current = cause,
                _ => break,
            }
        }
        current
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            f.write_str(self.class.name)
        } else {
            write!(f, "{}: {}", self.class.name, self.message)
        }
    }
}

impl std::error::Error for Exception {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|c| c as &(dyn std::error::Error + 'static))
    }
}

/// MVC 错误
#[derive(Debug, Error)]
pub enum MvcError {
    /// 可恢复的异常，交给异常解析链处理
    #[error(transparent)]
    Exception(#[from] Exception),

    /// 配置错误：重复路由、缺少处理器适配器、多个配置器等
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 非异常失败，不会交给异常解析链
    #[error("Fatal error: {0}")]
    Fatal(String),
}

impl MvcError {
    pub fn configuration(message: impl Into<String>) -> Self {
        MvcError::Configuration(message.into())
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        MvcError::Fatal(message.into())
    }

    /// 是否可以交给异常解析链
    pub fn is_recoverable(&self) -> bool {
        matches!(self, MvcError::Exception(_))
    }

    pub fn as_exception(&self) -> Option<&Exception> {
        match self {
            MvcError::Exception(e) => Some(e),
            _ => None,
        }
    }
}

pub type MvcResult<T> = std::result::Result<T, MvcError>;

#[cfg(test)]
mod tests {
    use super::*;

    static ORDER_NOT_FOUND: ExceptionClass =
        ExceptionClass::new("OrderNotFoundException", Some(&ILLEGAL_STATE));

    #[test]
    fn test_assignable_follows_parent_chain() {
        assert!(RUNTIME_EXCEPTION.is_assignable_from(&ORDER_NOT_FOUND));
        assert!(EXCEPTION.is_assignable_from(&ARITHMETIC));
        assert!(ARITHMETIC.is_assignable_from(&ARITHMETIC));
        assert!(!ARITHMETIC.is_assignable_from(&RUNTIME_EXCEPTION));
        assert!(!IO_EXCEPTION.is_assignable_from(&ILLEGAL_STATE));
    }

    #[test]
    fn test_depth() {
        assert_eq!(EXCEPTION.depth(), 0);
        assert_eq!(RUNTIME_EXCEPTION.depth(), 1);
        assert_eq!(ORDER_NOT_FOUND.depth(), 3);
    }

    #[test]
    fn test_root_cause_unwraps_chain() {
        let root = Exception::arithmetic("/ by zero");
        let root_id = root.id();
        let wrapped = Exception::runtime("outer")
            .with_cause(Exception::illegal_state("middle").with_cause(root));

        assert_eq!(wrapped.root_cause().id(), root_id);
        assert_eq!(wrapped.root_cause().class(), &ARITHMETIC);
    }

    #[test]
    fn test_root_cause_stops_at_depth_cap() {
        let mut exception = Exception::runtime("0");
        for i in 1..(MAX_CAUSE_DEPTH + 10) {
            exception = Exception::runtime(i.to_string()).with_cause(exception);
        }
        let depth_reached = exception.root_cause().message().parse::<usize>().unwrap();
        assert_eq!(depth_reached, 9);
    }

    #[test]
    fn test_clone_keeps_identity() {
        let e = Exception::illegal_argument("bad");
        assert_eq!(e.clone().id(), e.id());
        assert_ne!(Exception::illegal_argument("bad").id(), e.id());
    }

    #[test]
    fn test_display_and_source() {
        use std::error::Error;
        let e = Exception::runtime("outer").with_cause(Exception::arithmetic("inner"));
        assert_eq!(e.to_string(), "RuntimeException: outer");
        assert_eq!(e.source().unwrap().to_string(), "ArithmeticException: inner");
    }

    #[test]
    fn test_only_exceptions_are_recoverable() {
        assert!(MvcError::from(Exception::runtime("x")).is_recoverable());
        assert!(!MvcError::configuration("dup").is_recoverable());
        assert!(!MvcError::fatal("oom").is_recoverable());
    }
}
