//! 类型转换
//!
//! 请求参数、路径变量和默认值都是字符串，由 [`ConverterRegistry`] 转换为目标标量类型。
//! 注册表在启动时填充，请求处理期间只读。

use crate::error::{Exception, EXCEPTION, INVALID_VALUE, UNSUPPORTED_CONVERSION};
use crate::types::ScalarType;
use crate::value::Value;
use anyhow::bail;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 字符串到目标类型的转换器
pub trait TypeConverter: Send + Sync {
    fn convert(&self, raw: &str) -> anyhow::Result<Value>;
}

impl<F> TypeConverter for F
where
    F: Fn(&str) -> anyhow::Result<Value> + Send + Sync,
{
    fn convert(&self, raw: &str) -> anyhow::Result<Value> {
        self(raw)
    }
}

/// 转换器注册表
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    converters: HashMap<ScalarType, Arc<dyn TypeConverter>>,
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<String> = self.converters.keys().map(|t| t.to_string()).collect();
        types.sort();
        f.debug_struct("ConverterRegistry").field("types", &types).finish()
    }
}

impl ConverterRegistry {
    /// 空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 包含全部内置转换器的注册表
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register(ScalarType::Bool, parse_bool);
        registry.register(ScalarType::Char, parse_char);
        registry.register(ScalarType::I8, parsed(Value::I8));
        registry.register(ScalarType::I16, parsed(Value::I16));
        registry.register(ScalarType::I32, parsed(Value::I32));
        registry.register(ScalarType::I64, parsed(Value::I64));
        registry.register(ScalarType::U8, parsed(Value::U8));
        registry.register(ScalarType::U16, parsed(Value::U16));
        registry.register(ScalarType::U32, parsed(Value::U32));
        registry.register(ScalarType::U64, parsed(Value::U64));
        registry.register(ScalarType::F32, parsed(Value::F32));
        registry.register(ScalarType::F64, parsed(Value::F64));
        registry.register(ScalarType::String, parsed(Value::String));
        registry.register(ScalarType::Date, parse_date);
        registry.register(ScalarType::Time, parse_time);
        registry.register(ScalarType::DateTime, parse_date_time);

        registry
    }

    /// 注册（或替换）转换器
    pub fn register(&mut self, ty: ScalarType, converter: impl TypeConverter + 'static) {
        self.converters.insert(ty, Arc::new(converter));
    }

    pub fn contains(&self, ty: ScalarType) -> bool {
        self.converters.contains_key(&ty)
    }

    /// 转换原始字符串
    ///
    /// 未注册的类型返回 `UnsupportedConversionException`，转换器自身失败返回 `InvalidValueException`
    pub fn convert(&self, ty: ScalarType, raw: &str) -> Result<Value, Exception> {
        let converter = self.converters.get(&ty).ok_or_else(|| {
            Exception::new(
                &UNSUPPORTED_CONVERSION,
                format!("No converter registered for type {}", ty),
            )
        })?;

        converter.convert(raw).map_err(|e| {
            tracing::debug!(target_type = %ty, raw, error = %e, "Conversion failed");
            Exception::new(
                &INVALID_VALUE,
                format!("Cannot convert '{}' to {}", raw, ty),
            )
            .with_cause(Exception::from_error(&EXCEPTION, &*e))
        })
    }
}

/// 基于 `FromStr` 的转换器
fn parsed<T>(wrap: fn(T) -> Value) -> impl Fn(&str) -> anyhow::Result<Value> + Send + Sync
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    move |raw: &str| Ok(wrap(raw.parse::<T>()?))
}

fn parse_date(raw: &str) -> anyhow::Result<Value> {
    Ok(Value::Date(NaiveDate::parse_from_str(raw, DATE_FORMAT)?))
}

fn parse_time(raw: &str) -> anyhow::Result<Value> {
    Ok(Value::Time(NaiveTime::parse_from_str(raw, TIME_FORMAT)?))
}

fn parse_date_time(raw: &str) -> anyhow::Result<Value> {
    Ok(Value::DateTime(NaiveDateTime::parse_from_str(raw, DATE_TIME_FORMAT)?))
}

fn parse_bool(raw: &str) -> anyhow::Result<Value> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(Value::Bool(true)),
        "false" | "no" | "0" | "off" => Ok(Value::Bool(false)),
        other => bail!("'{}' is not a boolean", other),
    }
}

fn parse_char(raw: &str) -> anyhow::Result<Value> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(Value::Char(c)),
        _ => bail!("expected exactly one character, got {} characters", raw.chars().count()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_conversions() {
        let registry = ConverterRegistry::with_defaults();

        assert!(matches!(registry.convert(ScalarType::I32, "42"), Ok(Value::I32(42))));
        assert!(matches!(registry.convert(ScalarType::Bool, "Yes"), Ok(Value::Bool(true))));
        assert!(matches!(registry.convert(ScalarType::Char, "x"), Ok(Value::Char('x'))));
        assert!(matches!(registry.convert(ScalarType::F64, "1.5"), Ok(Value::F64(v)) if v == 1.5));

        match registry.convert(ScalarType::Date, "2024-02-29").unwrap() {
            Value::Date(d) => assert_eq!(d, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()),
            other => panic!("unexpected {:?}", other),
        }
        match registry.convert(ScalarType::DateTime, "2024-01-02 03:04:05").unwrap() {
            Value::DateTime(dt) => assert_eq!(dt.to_string(), "2024-01-02 03:04:05"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_malformed_value_is_invalid_value() {
        let registry = ConverterRegistry::with_defaults();
        let err = registry.convert(ScalarType::I32, "abc").unwrap_err();
        assert!(err.is_instance_of(&INVALID_VALUE));
        assert!(err.cause().is_some());

        let err = registry.convert(ScalarType::Char, "xy").unwrap_err();
        assert!(err.is_instance_of(&INVALID_VALUE));
    }

    #[test]
    fn test_unregistered_type_is_unsupported_conversion() {
        let registry = ConverterRegistry::with_defaults();
        let err = registry
            .convert(ScalarType::Custom("Money"), "12.30")
            .unwrap_err();
        assert!(err.is_instance_of(&UNSUPPORTED_CONVERSION));
        assert!(!err.is_instance_of(&INVALID_VALUE));
    }

    #[test]
    fn test_custom_converter() {
        let mut registry = ConverterRegistry::with_defaults();
        registry.register(ScalarType::Custom("Cents"), |raw: &str| -> anyhow::Result<Value> {
            let amount: f64 = raw.parse()?;
            Ok(Value::object((amount * 100.0).round() as i64))
        });

        let value = registry.convert(ScalarType::Custom("Cents"), "12.30").unwrap();
        assert_eq!(value.downcast::<i64>().unwrap(), 1230);
    }
}
