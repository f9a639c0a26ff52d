//! 请求作用域上下文
//!
//! 每个请求在入口处创建一个 [`RequestContext`]，并作为参数显式传递给处理链上的所有组件。
//! 上下文在 drop 时清理，正常返回、异常返回和 panic 展开都会经过这里。

use crate::application::MvcContext;
use crate::request::{Session, WebRequest};
use crate::response::{SharedResponse, WebResponse};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use uuid::Uuid;

pub struct RequestContext {
    id: Uuid,
    request: Arc<WebRequest>,
    response: SharedResponse,
    application: Arc<MvcContext>,
}

impl RequestContext {
    /// 为一次请求建立上下文
    pub fn open(application: Arc<MvcContext>, request: WebRequest) -> Self {
        application.request_started();
        let id = Uuid::new_v4();
        tracing::trace!(request_id = %id, "Request context established");
        Self {
            id,
            request: Arc::new(request),
            response: Arc::new(Mutex::new(WebResponse::new())),
            application,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn request(&self) -> &WebRequest {
        &self.request
    }

    pub fn request_handle(&self) -> Arc<WebRequest> {
        Arc::clone(&self.request)
    }

    /// 去掉部署前缀后的请求路径
    pub fn request_url(&self) -> &str {
        self.request.request_url()
    }

    /// 锁定响应，持有期间不要再调用其它会写响应的组件
    pub fn response(&self) -> MutexGuard<'_, WebResponse> {
        self.response.lock()
    }

    pub fn response_handle(&self) -> SharedResponse {
        Arc::clone(&self.response)
    }

    pub fn session(&self) -> Arc<Session> {
        self.request.session()
    }

    pub fn application(&self) -> &Arc<MvcContext> {
        &self.application
    }

    /// 取出已写好的响应
    pub fn take_response(&self) -> WebResponse {
        std::mem::take(&mut *self.response.lock())
    }
}

impl Drop for RequestContext {
    fn drop(&mut self) {
        self.application.request_finished();
        tracing::trace!(request_id = %self.id, "Request context cleared");
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("id", &self.id)
            .field("method", self.request.method())
            .field("path", &self.request.path())
            .finish()
    }
}
