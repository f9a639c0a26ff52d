//! 配置属性
//!
//! - [`MvcProperties`]：引擎自身的配置，从 `Environment` 读取
//! - [`ConfigurationProperties`]：按类型索引的应用配置对象，交给处理器工厂使用

use crate::constants::{
    DEFAULT_HANDLER_NAME, DEFAULT_NAME_CONVENTION_SUFFIX, DEFAULT_ROUTE_CACHE_CAPACITY,
    MVC_DEFAULT_HANDLER, MVC_NAME_CONVENTION_SUFFIX, MVC_ROUTE_CACHE_CAPACITY,
};
use crate::cors::CorsConfiguration;
use serde::de::DeserializeOwned;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use trellis_core::{CoreResult, Environment};

/// MVC 引擎配置
#[derive(Debug, Clone)]
pub struct MvcProperties {
    /// 路由缓存容量
    pub route_cache_capacity: usize,

    /// 未匹配请求转发到的默认处理器名称
    pub default_handler: String,

    /// 命名约定映射识别的类名后缀
    pub name_convention_suffix: String,

    /// 跨域配置
    pub cors: CorsConfiguration,
}

impl Default for MvcProperties {
    fn default() -> Self {
        Self {
            route_cache_capacity: DEFAULT_ROUTE_CACHE_CAPACITY,
            default_handler: DEFAULT_HANDLER_NAME.to_string(),
            name_convention_suffix: DEFAULT_NAME_CONVENTION_SUFFIX.to_string(),
            cors: CorsConfiguration::default(),
        }
    }
}

impl MvcProperties {
    /// 从 Environment 加载配置
    pub fn from_environment(env: &Environment) -> Self {
        Self {
            route_cache_capacity: env
                .get_i64(MVC_ROUTE_CACHE_CAPACITY)
                .filter(|capacity| *capacity > 0)
                .map(|capacity| capacity as usize)
                .unwrap_or(DEFAULT_ROUTE_CACHE_CAPACITY),
            default_handler: env
                .get_string(MVC_DEFAULT_HANDLER)
                .unwrap_or_else(|| DEFAULT_HANDLER_NAME.to_string()),
            name_convention_suffix: env
                .get_string(MVC_NAME_CONVENTION_SUFFIX)
                .unwrap_or_else(|| DEFAULT_NAME_CONVENTION_SUFFIX.to_string()),
            cors: CorsConfiguration::from_environment(env),
        }
    }
}

/// 按类型索引的配置对象
#[derive(Default, Clone)]
pub struct ConfigurationProperties {
    entries: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ConfigurationProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一个配置对象，同类型的旧值被替换
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) {
        self.entries.insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// 从 Environment 按前缀绑定并注册
    pub fn bind<T>(&mut self, env: &Environment, prefix: &str) -> CoreResult<()>
    where
        T: DeserializeOwned + Any + Send + Sync,
    {
        let value: T = env.bind(prefix)?;
        tracing::debug!(
            prefix = prefix,
            type_name = std::any::type_name::<T>(),
            "Bound configuration properties"
        );
        self.insert(value);
        Ok(())
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.entries
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|value| value.downcast::<T>().ok())
    }

    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ConfigurationProperties {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurationProperties")
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use trellis_core::{ConfigValue, MapPropertySource};

    #[derive(Debug, Deserialize, PartialEq)]
    struct UploadProperties {
        max_size: i64,
        dir: String,
    }

    #[test]
    fn test_mvc_properties_defaults_and_overrides() {
        let defaults = MvcProperties::from_environment(&Environment::new());
        assert_eq!(defaults.route_cache_capacity, 100);
        assert_eq!(defaults.default_handler, "default");
        assert_eq!(defaults.name_convention_suffix, "Controller");

        let env = Environment::new().with_property_source(
            MapPropertySource::new("test")
                .with_property(MVC_ROUTE_CACHE_CAPACITY, ConfigValue::Int(8))
                .with_property(MVC_DEFAULT_HANDLER, ConfigValue::String("static".into())),
        );
        let props = MvcProperties::from_environment(&env);
        assert_eq!(props.route_cache_capacity, 8);
        assert_eq!(props.default_handler, "static");
    }

    #[test]
    fn test_configuration_properties_by_type() {
        let env = Environment::new().with_property_source(
            MapPropertySource::new("test")
                .with_property("app.upload.max-size", ConfigValue::Int(1024))
                .with_property("app.upload.dir", ConfigValue::String("/tmp".into())),
        );
        let mut props = ConfigurationProperties::new();
        props.bind::<UploadProperties>(&env, "app.upload").unwrap();

        let upload = props.get::<UploadProperties>().unwrap();
        assert_eq!(upload.max_size, 1024);
        assert_eq!(upload.dir, "/tmp");
        assert!(props.get::<String>().is_none());
    }
}
