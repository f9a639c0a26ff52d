// trellis-core: Trellis 的基础设施
//
// 提供：
// - 分层配置（Environment + PropertySource）与前缀绑定
// - 基于 tracing 的日志初始化
// - 核心错误类型

pub mod config;
pub mod error;
pub mod logging;

pub use config::{
    ConfigValue, Environment, EnvironmentPropertySource, MapPropertySource, PropertySource,
    TomlPropertySource,
};
pub use error::{CoreError, CoreResult};
pub use logging::{LogFormat, LogLevel, LoggingConfig};

/// Prelude 模块，包含常用的类型
pub mod prelude {
    pub use crate::config::{
        ConfigValue, Environment, EnvironmentPropertySource, MapPropertySource, PropertySource,
        TomlPropertySource,
    };
    pub use crate::error::{CoreError, CoreResult};
    pub use crate::logging::{LogFormat, LogLevel, LoggingConfig};
}
