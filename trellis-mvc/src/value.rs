//! 参数值
//!
//! 参数解析器产出 [`Value`]，处理器通过 [`Arguments`] 按位置取出强类型参数

use crate::application::MvcContext;
use crate::error::{Exception, ILLEGAL_ARGUMENT, MISSING_VALUE};
use crate::multipart::{MultipartFile, Part};
use crate::request::{Session, WebRequest};
use crate::response::SharedResponse;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 解析后的参数值
pub enum Value {
    Null,
    Bool(bool),
    Char(char),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Array(Vec<Value>),
    List(Vec<Value>),
    Part(Part),
    File(MultipartFile),
    Request(Arc<WebRequest>),
    Response(SharedResponse),
    Session(Arc<Session>),
    Application(Arc<MvcContext>),
    Exception(Exception),
    /// bean、请求体反序列化结果、自定义转换结果
    Object(Box<dyn Any + Send>),
}

impl Value {
    pub fn object<T: Any + Send>(value: T) -> Self {
        Value::Object(Box::new(value))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// 变体名称，用于错误信息
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Char(_) => "char",
            Value::I8(_) => "i8",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U8(_) => "u8",
            Value::U16(_) => "u16",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::String(_) => "String",
            Value::Date(_) => "NaiveDate",
            Value::Time(_) => "NaiveTime",
            Value::DateTime(_) => "NaiveDateTime",
            Value::Array(_) => "array",
            Value::List(_) => "list",
            Value::Part(_) => "Part",
            Value::File(_) => "MultipartFile",
            Value::Request(_) => "WebRequest",
            Value::Response(_) => "WebResponse",
            Value::Session(_) => "Session",
            Value::Application(_) => "MvcContext",
            Value::Exception(_) => "Exception",
            Value::Object(_) => "object",
        }
    }

    /// 取出 [`Value::Object`] 中的具体类型
    pub fn downcast<T: Any>(self) -> Result<T, Exception> {
        match self {
            Value::Object(boxed) => boxed.downcast::<T>().map(|b| *b).map_err(|_| {
                Exception::illegal_argument(format!(
                    "object value is not a {}",
                    std::any::type_name::<T>()
                ))
            }),
            other => Err(mismatch(std::any::type_name::<T>(), &other)),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(v) => write!(f, "Bool({})", v),
            Value::Char(v) => write!(f, "Char({:?})", v),
            Value::I8(v) => write!(f, "I8({})", v),
            Value::I16(v) => write!(f, "I16({})", v),
            Value::I32(v) => write!(f, "I32({})", v),
            Value::I64(v) => write!(f, "I64({})", v),
            Value::U8(v) => write!(f, "U8({})", v),
            Value::U16(v) => write!(f, "U16({})", v),
            Value::U32(v) => write!(f, "U32({})", v),
            Value::U64(v) => write!(f, "U64({})", v),
            Value::F32(v) => write!(f, "F32({})", v),
            Value::F64(v) => write!(f, "F64({})", v),
            Value::String(v) => write!(f, "String({:?})", v),
            Value::Date(v) => write!(f, "Date({})", v),
            Value::Time(v) => write!(f, "Time({})", v),
            Value::DateTime(v) => write!(f, "DateTime({})", v),
            Value::Array(v) => f.debug_tuple("Array").field(v).finish(),
            Value::List(v) => f.debug_tuple("List").field(v).finish(),
            Value::Part(p) => write!(f, "Part({})", p.name()),
            Value::File(file) => write!(f, "File({})", file.name()),
            Value::Exception(e) => write!(f, "Exception({})", e),
            other => write!(f, "{}(..)", other.kind()),
        }
    }
}

fn mismatch(expected: &str, actual: &Value) -> Exception {
    if actual.is_null() {
        Exception::new(&MISSING_VALUE, format!("expected {} but no value was resolved", expected))
    } else {
        Exception::new(
            &ILLEGAL_ARGUMENT,
            format!("expected {} but got {}", expected, actual.kind()),
        )
    }
}

/// 从 [`Value`] 取出强类型值
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, Exception>;
}

macro_rules! from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, Exception> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(mismatch(stringify!($ty), &other)),
                    }
                }
            }
        )*
    };
}

from_value! {
    bool => Bool,
    char => Char,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => DateTime,
    Part => Part,
    MultipartFile => File,
    Arc<WebRequest> => Request,
    SharedResponse => Response,
    Arc<Session> => Session,
    Arc<MvcContext> => Application,
    Exception => Exception,
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, Exception> {
        Ok(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, Exception> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, Exception> {
        match value {
            Value::Array(items) | Value::List(items) => {
                items.into_iter().map(T::from_value).collect()
            }
            other => Err(mismatch("Vec", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Box<[T]> {
    fn from_value(value: Value) -> Result<Self, Exception> {
        Vec::<T>::from_value(value).map(Vec::into_boxed_slice)
    }
}

/// 处理器方法的实参列表
#[derive(Debug, Default)]
pub struct Arguments {
    values: Vec<Option<Value>>,
}

impl Arguments {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values: values.into_iter().map(Some).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index).and_then(Option::as_ref)
    }

    fn take_value(&mut self, index: usize) -> Result<Value, Exception> {
        self.values
            .get_mut(index)
            .and_then(Option::take)
            .ok_or_else(|| {
                Exception::illegal_argument(format!("argument {} is absent or already taken", index))
            })
    }

    /// 按位置取出参数
    pub fn take<T: FromValue>(&mut self, index: usize) -> Result<T, Exception> {
        T::from_value(self.take_value(index)?)
    }

    /// 按位置取出 bean 或请求体对象
    pub fn take_object<T: Any>(&mut self, index: usize) -> Result<T, Exception> {
        self.take_value(index)?.downcast()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_typed_arguments() {
        let mut args = Arguments::new(vec![
            Value::I32(5),
            Value::Null,
            Value::List(vec![Value::String("a".into()), Value::String("b".into())]),
            Value::object(vec![1u8, 2]),
        ]);

        assert_eq!(args.take::<i32>(0).unwrap(), 5);
        assert_eq!(args.take::<Option<i64>>(1).unwrap(), None);
        assert_eq!(args.take::<Vec<String>>(2).unwrap(), vec!["a", "b"]);
        assert_eq!(args.take_object::<Vec<u8>>(3).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_take_twice_fails() {
        let mut args = Arguments::new(vec![Value::Bool(true)]);
        assert!(args.take::<bool>(0).unwrap());
        assert!(args.take::<bool>(0).is_err());
        assert!(args.take::<bool>(7).is_err());
    }

    #[test]
    fn test_null_into_non_optional_is_missing_value() {
        let err = i32::from_value(Value::Null).unwrap_err();
        assert!(err.is_instance_of(&MISSING_VALUE));

        let err = i32::from_value(Value::String("5".into())).unwrap_err();
        assert!(err.is_instance_of(&ILLEGAL_ARGUMENT));
        assert!(!err.is_instance_of(&MISSING_VALUE));
    }

    #[test]
    fn test_downcast_wrong_type() {
        assert!(Value::object(1u8).downcast::<String>().is_err());
    }
}
