//! 标量、数组、列表参数的公共模板
//!
//! 三种形态：
//! - 标量：只用数据源的第一个值，没有值时才考虑默认值与 null
//! - 数组、列表：数据源的每个值逐个解析；数据源为空时得到空容器，不会是 null 也不会报错

use super::MethodArgumentResolver;
use crate::context::RequestContext;
use crate::error::{Exception, MvcResult, MISSING_VALUE};
use crate::multipart::{MultipartFile, Part};
use crate::parameter::MethodParameter;
use crate::types::TypeDescriptor;
use crate::value::Value;

/// 参数值的数据源
pub trait ValueSource: Send + Sync {
    /// 数据源给出的原始值
    type Raw;

    const NAME: &'static str;

    /// 元素类型是否由这个数据源负责
    fn supports_element(&self, ty: &TypeDescriptor) -> bool;

    /// 参数对应的全部原始值，可能为空
    fn source(&self, parameter: &MethodParameter, ctx: &RequestContext) -> Vec<Self::Raw>;

    /// 把一个原始值（或者没有值）解析为元素类型的值
    fn resolve_scalar(
        &self,
        ty: &TypeDescriptor,
        raw: Option<Self::Raw>,
        parameter: &MethodParameter,
        ctx: &RequestContext,
    ) -> MvcResult<Value>;
}

/// 基于数据源的通用解析器
#[derive(Debug, Default)]
pub struct CommonTypeArgumentResolver<S> {
    source: S,
}

impl<S: ValueSource> CommonTypeArgumentResolver<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S: ValueSource> MethodArgumentResolver for CommonTypeArgumentResolver<S> {
    fn name(&self) -> &str {
        S::NAME
    }

    fn supports(&self, parameter: &MethodParameter) -> bool {
        match parameter.type_descriptor() {
            TypeDescriptor::Array(inner) | TypeDescriptor::List(inner) => {
                !inner.is_container() && self.source.supports_element(inner)
            }
            ty => self.source.supports_element(ty),
        }
    }

    fn resolve_argument(&self, parameter: &MethodParameter, ctx: &RequestContext) -> MvcResult<Value> {
        let raws = self.source.source(parameter, ctx);
        match parameter.type_descriptor() {
            TypeDescriptor::Array(inner) => self
                .resolve_all(inner, raws, parameter, ctx)
                .map(Value::Array),
            TypeDescriptor::List(inner) => self
                .resolve_all(inner, raws, parameter, ctx)
                .map(Value::List),
            ty => self
                .source
                .resolve_scalar(ty, raws.into_iter().next(), parameter, ctx),
        }
    }
}

impl<S: ValueSource> CommonTypeArgumentResolver<S> {
    fn resolve_all(
        &self,
        element: &TypeDescriptor,
        raws: Vec<S::Raw>,
        parameter: &MethodParameter,
        ctx: &RequestContext,
    ) -> MvcResult<Vec<Value>> {
        raws.into_iter()
            .map(|raw| self.source.resolve_scalar(element, Some(raw), parameter, ctx))
            .collect()
    }
}

/// 查询参数与表单参数
#[derive(Debug, Default)]
pub struct SimpleTypeSource;

impl ValueSource for SimpleTypeSource {
    type Raw = String;

    const NAME: &'static str = "SimpleTypeArgumentResolver";

    fn supports_element(&self, ty: &TypeDescriptor) -> bool {
        matches!(ty, TypeDescriptor::Scalar { .. })
    }

    fn source(&self, parameter: &MethodParameter, ctx: &RequestContext) -> Vec<String> {
        ctx.request().parameter_values(parameter.name()).to_vec()
    }

    fn resolve_scalar(
        &self,
        ty: &TypeDescriptor,
        raw: Option<String>,
        parameter: &MethodParameter,
        ctx: &RequestContext,
    ) -> MvcResult<Value> {
        convert_scalar(ty, raw.as_deref().or(parameter.default_value()), parameter, ctx)
    }
}

/// 把字符串转换为标量；没有值的非空类型报 `MissingValueException`
pub(crate) fn convert_scalar(
    ty: &TypeDescriptor,
    raw: Option<&str>,
    parameter: &MethodParameter,
    ctx: &RequestContext,
) -> MvcResult<Value> {
    let TypeDescriptor::Scalar { ty: scalar, nullable } = ty else {
        return Err(Exception::illegal_state(format!("{} is not a scalar type", ty)).into());
    };
    match raw {
        Some(raw) => Ok(ctx.application().converters().convert(*scalar, raw)?),
        None if *nullable => Ok(Value::Null),
        None => Err(Exception::new(
            &MISSING_VALUE,
            format!(
                "Parameter '{}' has no value and no default; null cannot be assigned to {}",
                parameter.name(),
                scalar
            ),
        )
        .into()),
    }
}

/// 上传的文件
#[derive(Debug, Default)]
pub struct MultipartSource;

impl ValueSource for MultipartSource {
    type Raw = Part;

    const NAME: &'static str = "MultipartFileArgumentResolver";

    fn supports_element(&self, ty: &TypeDescriptor) -> bool {
        matches!(ty, TypeDescriptor::File | TypeDescriptor::Part)
    }

    fn source(&self, parameter: &MethodParameter, ctx: &RequestContext) -> Vec<Part> {
        ctx.request().parts_named(parameter.name()).cloned().collect()
    }

    fn resolve_scalar(
        &self,
        ty: &TypeDescriptor,
        raw: Option<Part>,
        _parameter: &MethodParameter,
        _ctx: &RequestContext,
    ) -> MvcResult<Value> {
        Ok(match (raw, ty) {
            (None, _) => Value::Null,
            (Some(part), TypeDescriptor::File) => Value::File(MultipartFile::from(part)),
            (Some(part), _) => Value::Part(part),
        })
    }
}

pub type SimpleTypeArgumentResolver = CommonTypeArgumentResolver<SimpleTypeSource>;
pub type MultipartFileArgumentResolver = CommonTypeArgumentResolver<MultipartSource>;
