//! 参数类型描述
//!
//! 处理器方法的形参类型在注册时用 [`TypeDescriptor`] 描述，参数解析器按描述选择数据来源与转换方式

use crate::application::MvcContext;
use crate::bean::BeanType;
use crate::error::ExceptionClass;
use crate::multipart::{MultipartFile, Part};
use crate::request::{Session, WebRequest};
use crate::response::SharedResponse;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;
use std::sync::Arc;

/// 可由字符串转换得到的标量类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    String,
    Date,
    Time,
    DateTime,
    /// 应用自行注册转换器的类型
    Custom(&'static str),
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarType::Bool => "bool",
            ScalarType::Char => "char",
            ScalarType::I8 => "i8",
            ScalarType::I16 => "i16",
            ScalarType::I32 => "i32",
            ScalarType::I64 => "i64",
            ScalarType::U8 => "u8",
            ScalarType::U16 => "u16",
            ScalarType::U32 => "u32",
            ScalarType::U64 => "u64",
            ScalarType::F32 => "f32",
            ScalarType::F64 => "f64",
            ScalarType::String => "String",
            ScalarType::Date => "NaiveDate",
            ScalarType::Time => "NaiveTime",
            ScalarType::DateTime => "NaiveDateTime",
            ScalarType::Custom(name) => name,
        };
        f.write_str(name)
    }
}

/// 形参类型
#[derive(Debug, Clone)]
pub enum TypeDescriptor {
    /// 标量；`nullable = false` 的参数没有取到值时报错
    Scalar { ty: ScalarType, nullable: bool },
    Array(Box<TypeDescriptor>),
    List(Box<TypeDescriptor>),
    File,
    Part,
    Request,
    Response,
    Session,
    Application,
    Exception(&'static ExceptionClass),
    Bean(BeanType),
    /// 只能由请求体反序列化得到的类型
    Object(&'static str),
}

impl TypeDescriptor {
    pub fn scalar(ty: ScalarType) -> Self {
        TypeDescriptor::Scalar {
            ty,
            nullable: false,
        }
    }

    pub fn nullable(ty: ScalarType) -> Self {
        TypeDescriptor::Scalar { ty, nullable: true }
    }

    pub fn array_of(component: TypeDescriptor) -> Self {
        TypeDescriptor::Array(Box::new(component))
    }

    pub fn list_of(element: TypeDescriptor) -> Self {
        TypeDescriptor::List(Box::new(element))
    }

    /// 容器的元素类型，非容器返回自身
    pub fn element(&self) -> &TypeDescriptor {
        match self {
            TypeDescriptor::Array(inner) | TypeDescriptor::List(inner) => inner,
            other => other,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, TypeDescriptor::Array(_) | TypeDescriptor::List(_))
    }

    pub fn name(&self) -> String {
        match self {
            TypeDescriptor::Scalar { ty, nullable: false } => ty.to_string(),
            TypeDescriptor::Scalar { ty, nullable: true } => format!("Option<{}>", ty),
            TypeDescriptor::Array(inner) => format!("[{}]", inner.name()),
            TypeDescriptor::List(inner) => format!("Vec<{}>", inner.name()),
            TypeDescriptor::File => "MultipartFile".to_string(),
            TypeDescriptor::Part => "Part".to_string(),
            TypeDescriptor::Request => "WebRequest".to_string(),
            TypeDescriptor::Response => "WebResponse".to_string(),
            TypeDescriptor::Session => "Session".to_string(),
            TypeDescriptor::Application => "MvcContext".to_string(),
            TypeDescriptor::Exception(class) => class.name().to_string(),
            TypeDescriptor::Bean(bean) => bean.type_name().to_string(),
            TypeDescriptor::Object(name) => name.to_string(),
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Rust 类型到 [`TypeDescriptor`] 的映射，供 `Param::of::<T>()` 使用
pub trait Reflect {
    fn type_descriptor() -> TypeDescriptor;
}

macro_rules! reflect_scalar {
    ($($ty:ty => $scalar:ident),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn type_descriptor() -> TypeDescriptor {
                    TypeDescriptor::scalar(ScalarType::$scalar)
                }
            }

            impl Reflect for Option<$ty> {
                fn type_descriptor() -> TypeDescriptor {
                    TypeDescriptor::nullable(ScalarType::$scalar)
                }
            }
        )*
    };
}

reflect_scalar! {
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
}

macro_rules! reflect_fixed {
    ($($ty:ty => $descriptor:ident),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn type_descriptor() -> TypeDescriptor {
                    TypeDescriptor::$descriptor
                }
            }
        )*
    };
}

reflect_fixed! {
    MultipartFile => File,
    Option<MultipartFile> => File,
    Part => Part,
    Option<Part> => Part,
    Arc<WebRequest> => Request,
    SharedResponse => Response,
    Arc<Session> => Session,
    Arc<MvcContext> => Application,
}

impl<T: Reflect> Reflect for Vec<T> {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::list_of(T::type_descriptor())
    }
}

impl<T: Reflect> Reflect for Box<[T]> {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::array_of(T::type_descriptor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflect_scalars_and_containers() {
        assert!(matches!(
            i32::type_descriptor(),
            TypeDescriptor::Scalar { ty: ScalarType::I32, nullable: false }
        ));
        assert!(matches!(
            Option::<String>::type_descriptor(),
            TypeDescriptor::Scalar { ty: ScalarType::String, nullable: true }
        ));
        assert_eq!(Vec::<i64>::type_descriptor().name(), "Vec<i64>");
        assert_eq!(<Box<[Option<u8>]>>::type_descriptor().name(), "[Option<u8>]");
        assert!(matches!(
            Vec::<MultipartFile>::type_descriptor().element(),
            TypeDescriptor::File
        ));
    }
}
