//! 框架配置常量定义
//!
//! 配置键、默认值与内置组件名

// ==================== MVC 配置 ====================

/// 路由缓存容量
pub const MVC_ROUTE_CACHE_CAPACITY: &str = "trellis.mvc.route-cache-capacity";

/// 未命中任何处理器时转发到的默认处理器名
pub const MVC_DEFAULT_HANDLER: &str = "trellis.mvc.default-handler";

/// 名称约定映射的类名后缀
pub const MVC_NAME_CONVENTION_SUFFIX: &str = "trellis.mvc.name-convention-suffix";

// ==================== CORS 配置 ====================

/// CORS 配置前缀
pub const MVC_CORS_PREFIX: &str = "trellis.mvc.cors";

pub const CORS_ALLOWED_ORIGINS: &str = "trellis.mvc.cors.allowed-origins";
pub const CORS_ALLOWED_METHODS: &str = "trellis.mvc.cors.allowed-methods";
pub const CORS_ALLOWED_HEADERS: &str = "trellis.mvc.cors.allowed-headers";
pub const CORS_ALLOW_CREDENTIALS: &str = "trellis.mvc.cors.allow-credentials";
pub const CORS_MAX_AGE: &str = "trellis.mvc.cors.max-age";

// ==================== 默认值 ====================

pub const DEFAULT_ROUTE_CACHE_CAPACITY: usize = 100;
pub const DEFAULT_HANDLER_NAME: &str = "default";
pub const DEFAULT_NAME_CONVENTION_SUFFIX: &str = "Controller";

/// 未声明优先级的扩展排在最后
pub const LOWEST_PRIORITY: i32 = i32::MAX;

/// 异常 cause 链的最大展开深度
pub const MAX_CAUSE_DEPTH: usize = 64;

// ==================== 内容类型 ====================

pub const CONTENT_TYPE_PLAIN: &str = "text/plain;charset=UTF-8";
pub const CONTENT_TYPE_HTML: &str = "text/html;charset=UTF-8";
pub const CONTENT_TYPE_JSON: &str = "application/json;charset=UTF-8";
pub const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";

/// CORS 拒绝时的固定响应体
pub const CORS_REJECTED_BODY: &str = "Invalid CORS request";
