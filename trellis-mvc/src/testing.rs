//! 测试夹具

use crate::application::MvcContext;
use crate::bean::{Bean, BeanDescriptor};
use crate::context::RequestContext;
use crate::controller::ClassDefinition;
use crate::error::{Exception, MvcResult};
use crate::handler::{Handler, HttpRequestHandler};
use crate::interceptor::HandlerInterceptor;
use crate::request::WebRequest;
use parking_lot::Mutex;
use std::sync::Arc;

/// 记录调用顺序
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, call: impl Into<String>) {
        self.0.lock().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

/// 把前置、后置调用写入 [`CallLog`] 的拦截器
pub struct RecordingInterceptor {
    name: String,
    log: CallLog,
    allow: bool,
    post_error: Option<Exception>,
}

impl RecordingInterceptor {
    pub fn new(name: impl Into<String>, log: CallLog) -> Self {
        Self {
            name: name.into(),
            log,
            allow: true,
            post_error: None,
        }
    }

    pub fn allow(mut self, allow: bool) -> Self {
        self.allow = allow;
        self
    }

    pub fn fail_post(mut self, error: Exception) -> Self {
        self.post_error = Some(error);
        self
    }
}

impl HandlerInterceptor for RecordingInterceptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn pre_handle(&self, _ctx: &RequestContext, _handler: &Handler) -> MvcResult<bool> {
        self.log.push(format!("{}.pre", self.name));
        Ok(self.allow)
    }

    fn post_handle(&self, _ctx: &RequestContext, _handler: &Handler) -> MvcResult<()> {
        self.log.push(format!("{}.post", self.name));
        match &self.post_error {
            Some(error) => Err(error.clone().into()),
            None => Ok(()),
        }
    }
}

/// 把请求路径写回响应
#[derive(Debug, Default)]
pub struct EchoHandler;

impl HttpRequestHandler for EchoHandler {
    fn process_request(&self, ctx: &RequestContext) -> MvcResult<()> {
        ctx.response().write_str(&format!("echo {}", ctx.request_url()));
        Ok(())
    }
}

pub fn dummy_handler() -> Handler {
    Handler::Class(Arc::clone(
        ClassDefinition::request_handler::<EchoHandler>("EchoController").class(),
    ))
}

pub fn get(path: &str) -> WebRequest {
    WebRequest::builder().path(path).build()
}

pub fn application() -> Arc<MvcContext> {
    application_with(Vec::new())
}

pub fn application_with(classes: Vec<ClassDefinition>) -> Arc<MvcContext> {
    classes
        .into_iter()
        .fold(MvcContext::builder(), |builder, class| builder.class(class))
        .build()
        .expect("test application context")
}

pub fn request_context(request: WebRequest) -> RequestContext {
    RequestContext::open(application(), request)
}

pub fn request_context_in(application: &Arc<MvcContext>, request: WebRequest) -> RequestContext {
    RequestContext::open(Arc::clone(application), request)
}

// ==================== bean ====================

#[derive(Debug, Default)]
pub struct Employee {
    pub name: String,
    pub age: Option<i32>,
    pub dept: Department,
}

impl Bean for Employee {
    fn bean_descriptor() -> Arc<BeanDescriptor> {
        BeanDescriptor::builder::<Employee>()
            .property("name", |e, v: String| e.name = v)
            .property("age", |e, v: Option<i32>| e.age = v)
            .nested("dept", |e, v: Department| e.dept = v)
            .build()
    }
}

#[derive(Debug, Default)]
pub struct Department {
    pub name: String,
    pub manager: Manager,
}

impl Bean for Department {
    fn bean_descriptor() -> Arc<BeanDescriptor> {
        BeanDescriptor::builder::<Department>()
            .property("name", |d, v: String| d.name = v)
            .nested("manager", |d, v: Manager| d.manager = v)
            .build()
    }
}

#[derive(Debug, Default)]
pub struct Manager {
    pub title: String,
}

impl Bean for Manager {
    fn bean_descriptor() -> Arc<BeanDescriptor> {
        BeanDescriptor::builder::<Manager>()
            .property("title", |m, v: String| m.title = v)
            .build()
    }
}

/// 自引用的 bean
#[derive(Debug, Default)]
pub struct Node {
    pub label: Option<String>,
    pub next: Option<Box<Node>>,
}

impl Bean for Node {
    fn bean_descriptor() -> Arc<BeanDescriptor> {
        BeanDescriptor::builder::<Node>()
            .property("label", |n, v: Option<String>| n.label = v)
            .nested("next", |n, v: Node| n.next = Some(Box::new(v)))
            .build()
    }
}
