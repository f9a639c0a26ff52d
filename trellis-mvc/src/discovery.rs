//! 组件发现
//!
//! 处理器类和扩展组件通过 `inventory` 在编译期登记，启动时一次性收集到 [`ScanResult`]。
//! 也可以不经过 inventory，直接在构建器上追加。
//!
//! ```rust,ignore
//! fn user_controller() -> ClassDefinition {
//!     ClassDefinition::builder::<UserController>("UserController")
//!         .request_mapping("/users")
//!         .route("get", "/{id}", vec![Param::path_variable::<i64>("id")], UserController::get)
//!         .build()
//! }
//!
//! trellis_mvc::register_class!("UserController", user_controller);
//! trellis_mvc::register_extension!("AuthInterceptor", || {
//!     Extension::Interceptor(Arc::new(AuthInterceptor))
//! });
//! ```

use crate::adapter::HandlerAdapter;
use crate::argument::MethodArgumentResolver;
use crate::configurer::MvcConfigurer;
use crate::controller::{get_all_classes, ClassDefinition};
use crate::exception::HandlerExceptionResolver;
use crate::interceptor::HandlerInterceptor;
use crate::mapping::HandlerMapping;
use std::fmt;
use std::sync::Arc;

/// 扩展组件
#[derive(Clone)]
pub enum Extension {
    HandlerMapping(Arc<dyn HandlerMapping>),
    HandlerAdapter(Arc<dyn HandlerAdapter>),
    ArgumentResolver(Arc<dyn MethodArgumentResolver>),
    ExceptionResolver(Arc<dyn HandlerExceptionResolver>),
    Interceptor(Arc<dyn HandlerInterceptor>),
    Configurer(Arc<dyn MvcConfigurer>),
}

impl Extension {
    /// 扩展的能力类别
    pub fn kind(&self) -> &'static str {
        match self {
            Extension::HandlerMapping(_) => "handler mapping",
            Extension::HandlerAdapter(_) => "handler adapter",
            Extension::ArgumentResolver(_) => "argument resolver",
            Extension::ExceptionResolver(_) => "exception resolver",
            Extension::Interceptor(_) => "interceptor",
            Extension::Configurer(_) => "configurer",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Extension::HandlerMapping(e) => e.name(),
            Extension::HandlerAdapter(e) => e.name(),
            Extension::ArgumentResolver(e) => e.name(),
            Extension::ExceptionResolver(e) => e.name(),
            Extension::Interceptor(e) => e.name(),
            Extension::Configurer(e) => e.name(),
        }
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Extension({}: {})", self.kind(), self.name())
    }
}

/// 扩展组件注册信息
pub struct ExtensionRegistration {
    pub name: &'static str,
    pub create: fn() -> Extension,
}

impl ExtensionRegistration {
    pub const fn new(name: &'static str, create: fn() -> Extension) -> Self {
        Self { name, create }
    }
}

inventory::collect!(ExtensionRegistration);

/// 获取所有注册的扩展组件
pub fn get_all_extensions() -> impl Iterator<Item = &'static ExtensionRegistration> {
    inventory::iter::<ExtensionRegistration>.into_iter()
}

/// 登记处理器类
#[macro_export]
macro_rules! register_class {
    ($type_name:expr, $define:path) => {
        $crate::inventory::submit! {
            $crate::ClassRegistration::new($type_name, $define)
        }
    };
}

/// 登记扩展组件
#[macro_export]
macro_rules! register_extension {
    ($name:expr, $create:expr) => {
        $crate::inventory::submit! {
            $crate::ExtensionRegistration::new($name, $create)
        }
    };
}

/// 发现的处理器类和扩展组件，保持发现顺序
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    classes: Vec<ClassDefinition>,
    extensions: Vec<Extension>,
}

impl ScanResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// 收集 inventory 中登记的全部组件
    pub fn from_inventory() -> Self {
        tracing::info!("Discovering handler classes and extensions from inventory...");

        let mut scan = Self::new();
        for registration in get_all_classes() {
            tracing::debug!(class = registration.type_name, "Discovered handler class");
            scan.classes.push((registration.define)());
        }
        for registration in get_all_extensions() {
            let extension = (registration.create)();
            tracing::debug!(
                name = registration.name,
                kind = extension.kind(),
                "Discovered extension"
            );
            scan.extensions.push(extension);
        }

        tracing::info!(
            classes = scan.classes.len(),
            extensions = scan.extensions.len(),
            "Discovery completed"
        );
        scan
    }

    pub fn with_class(mut self, definition: ClassDefinition) -> Self {
        self.classes.push(definition);
        self
    }

    pub fn with_extension(mut self, extension: Extension) -> Self {
        self.extensions.push(extension);
        self
    }

    pub fn classes(&self) -> &[ClassDefinition] {
        &self.classes
    }

    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    /// 合并另一次扫描的结果，追加在后面
    pub fn merge(mut self, other: ScanResult) -> Self {
        self.classes.extend(other.classes);
        self.extensions.extend(other.extensions);
        self
    }

    pub(crate) fn into_parts(self) -> (Vec<ClassDefinition>, Vec<Extension>) {
        (self.classes, self.extensions)
    }
}
