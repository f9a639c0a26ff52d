//! Bean 描述
//!
//! 没有被其它参数解析器认领的复合参数按 bean 绑定：先用默认构造创建实例，
//! 再逐个属性解析并通过 setter 写入。属性元数据由 [`BeanDescriptor`] 显式声明。

use crate::error::Exception;
use crate::types::{Reflect, TypeDescriptor};
use crate::value::{FromValue, Value};
use std::any::{type_name, Any};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// 属性 setter，实例以 `dyn Any` 传入
pub type PropertySetter =
    Arc<dyn Fn(&mut (dyn Any + Send), Value) -> Result<(), Exception> + Send + Sync>;

/// 可写属性
pub struct PropertyDescriptor {
    name: &'static str,
    ty: TypeDescriptor,
    setter: PropertySetter,
}

impl PropertyDescriptor {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_descriptor(&self) -> &TypeDescriptor {
        &self.ty
    }

    pub fn set(&self, target: &mut (dyn Any + Send), value: Value) -> Result<(), Exception> {
        (self.setter)(target, value)
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .finish()
    }
}

/// bean 类型的元数据
pub struct BeanDescriptor {
    type_name: &'static str,
    create: fn() -> Box<dyn Any + Send>,
    properties: Vec<PropertyDescriptor>,
}

impl BeanDescriptor {
    pub fn builder<T: Default + Send + 'static>() -> BeanDescriptorBuilder<T> {
        BeanDescriptorBuilder {
            properties: Vec::new(),
            _marker: PhantomData,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    /// 默认构造一个新实例
    pub fn instantiate(&self) -> Box<dyn Any + Send> {
        (self.create)()
    }
}

impl fmt::Debug for BeanDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDescriptor")
            .field("type_name", &self.type_name)
            .field("properties", &self.properties)
            .finish()
    }
}

/// 参与 bean 绑定的类型
///
/// ```rust,ignore
/// #[derive(Default)]
/// struct Employee { name: String, dept: Department }
///
/// impl Bean for Employee {
///     fn bean_descriptor() -> Arc<BeanDescriptor> {
///         BeanDescriptor::builder::<Employee>()
///             .property("name", |e, v: String| e.name = v)
///             .nested("dept", |e, v: Department| e.dept = v)
///             .build()
///     }
/// }
/// ```
pub trait Bean: Default + Send + 'static {
    fn bean_descriptor() -> Arc<BeanDescriptor>;
}

/// 延迟解析的 bean 类型引用，允许 bean 之间相互嵌套
#[derive(Clone, Copy)]
pub struct BeanType {
    type_name: &'static str,
    descriptor: fn() -> Arc<BeanDescriptor>,
}

impl BeanType {
    pub fn of<T: Bean>() -> Self {
        Self {
            type_name: type_name::<T>(),
            descriptor: T::bean_descriptor,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn descriptor(&self) -> Arc<BeanDescriptor> {
        (self.descriptor)()
    }
}

impl fmt::Debug for BeanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BeanType({})", self.type_name)
    }
}

/// [`BeanDescriptor`] 构建器
pub struct BeanDescriptorBuilder<T> {
    properties: Vec<PropertyDescriptor>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Default + Send + 'static> BeanDescriptorBuilder<T> {
    /// 标量、数组、列表或上传文件属性
    pub fn property<V>(mut self, name: &'static str, set: fn(&mut T, V)) -> Self
    where
        V: Reflect + FromValue + 'static,
    {
        self.properties.push(PropertyDescriptor {
            name,
            ty: V::type_descriptor(),
            setter: setter(move |target: &mut T, value| {
                set(target, V::from_value(value)?);
                Ok(())
            }),
        });
        self
    }

    /// 嵌套 bean 属性，按 `外层.内层` 的名称绑定
    pub fn nested<B: Bean>(mut self, name: &'static str, set: fn(&mut T, B)) -> Self {
        self.properties.push(PropertyDescriptor {
            name,
            ty: TypeDescriptor::Bean(BeanType::of::<B>()),
            setter: setter(move |target: &mut T, value: Value| {
                set(target, value.downcast::<B>()?);
                Ok(())
            }),
        });
        self
    }

    pub fn build(self) -> Arc<BeanDescriptor> {
        Arc::new(BeanDescriptor {
            type_name: type_name::<T>(),
            create: || -> Box<dyn Any + Send> { Box::new(T::default()) },
            properties: self.properties,
        })
    }
}

fn setter<T, F>(apply: F) -> PropertySetter
where
    T: Send + 'static,
    F: Fn(&mut T, Value) -> Result<(), Exception> + Send + Sync + 'static,
{
    Arc::new(move |target: &mut (dyn Any + Send), value| {
        let target = target.downcast_mut::<T>().ok_or_else(|| {
            Exception::illegal_state(format!("bean instance is not a {}", type_name::<T>()))
        })?;
        apply(target, value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Manager {
        title: String,
    }

    impl Bean for Manager {
        fn bean_descriptor() -> Arc<BeanDescriptor> {
            BeanDescriptor::builder::<Manager>()
                .property("title", |m, v: String| m.title = v)
                .build()
        }
    }

    #[test]
    fn test_setter_writes_through_any() {
        let descriptor = Manager::bean_descriptor();
        let mut instance = descriptor.instantiate();
        descriptor.properties()[0]
            .set(instance.as_mut(), Value::String("CTO".into()))
            .unwrap();

        let manager = instance.downcast::<Manager>().unwrap();
        assert_eq!(manager.title, "CTO");
    }

    #[test]
    fn test_setter_rejects_wrong_value() {
        let descriptor = Manager::bean_descriptor();
        let mut instance = descriptor.instantiate();
        let err = descriptor.properties()[0]
            .set(instance.as_mut(), Value::I32(1))
            .unwrap_err();
        assert!(err.is_instance_of(&crate::error::ILLEGAL_ARGUMENT));
    }

    #[test]
    fn test_bean_type_is_lazy() {
        let ty = BeanType::of::<Manager>();
        assert!(ty.type_name().ends_with("Manager"));
        assert_eq!(ty.descriptor().properties().len(), 1);
    }
}
