use thiserror::Error;

/// 核心错误类型
///
/// 配置解析、配置绑定、日志初始化失败时返回
#[derive(Debug, Error)]
pub enum CoreError {
    /// 配置文件读取或解析失败
    #[error("Failed to load configuration '{source_name}': {message}")]
    ConfigLoad {
        source_name: String,
        message: String,
    },

    /// 配置前缀绑定到类型失败
    #[error("Failed to bind configuration prefix '{prefix}': {source}")]
    Binding {
        prefix: String,
        #[source]
        source: serde_json::Error,
    },

    /// 日志系统初始化失败
    #[error("Logging initialization failed: {0}")]
    LoggingInitFailed(String),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
