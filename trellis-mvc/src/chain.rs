//! 处理器执行链
//!
//! 处理器加上适用于它的拦截器。`interceptor_index` 记录最后一个前置逻辑成功的拦截器，
//! 后置逻辑从这里逆序回到第一个，保证已进入的拦截器都能对称退出。

use crate::context::RequestContext;
use crate::error::MvcResult;
use crate::handler::Handler;
use crate::interceptor::HandlerInterceptor;
use std::fmt;
use std::sync::Arc;

/// 执行链所处的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    NotStarted,
    PreHandling,
    /// 某个拦截器的前置逻辑返回了 `false`
    ShortCircuited,
    Handling,
    PostHandling,
    Done,
}

pub struct HandlerExecutionChain {
    handler: Handler,
    interceptors: Vec<Arc<dyn HandlerInterceptor>>,
    interceptor_index: Option<usize>,
    state: ChainState,
}

impl HandlerExecutionChain {
    pub fn new(handler: Handler) -> Self {
        Self::with_interceptors(handler, Vec::new())
    }

    pub fn with_interceptors(handler: Handler, interceptors: Vec<Arc<dyn HandlerInterceptor>>) -> Self {
        Self {
            handler,
            interceptors,
            interceptor_index: None,
            state: ChainState::NotStarted,
        }
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub fn interceptors(&self) -> &[Arc<dyn HandlerInterceptor>] {
        &self.interceptors
    }

    pub fn add_interceptor(&mut self, interceptor: Arc<dyn HandlerInterceptor>) {
        self.interceptors.push(interceptor);
    }

    pub fn state(&self) -> ChainState {
        self.state
    }

    /// 最后一个前置逻辑成功的拦截器下标
    pub fn interceptor_index(&self) -> Option<usize> {
        self.interceptor_index
    }

    /// 按顺序执行前置逻辑
    ///
    /// 第一个返回 `false` 的拦截器之后的前置逻辑不再执行；拦截器出错时错误原样返回，
    /// 已成功的拦截器仍由 [`apply_post_handle`](Self::apply_post_handle) 收尾
    pub fn apply_pre_handle(&mut self, ctx: &RequestContext) -> MvcResult<bool> {
        self.state = ChainState::PreHandling;
        for (i, interceptor) in self.interceptors.iter().enumerate() {
            if !interceptor.pre_handle(ctx, &self.handler)? {
                tracing::debug!(
                    interceptor = interceptor.name(),
                    handler = %self.handler,
                    "Request terminated by interceptor"
                );
                self.state = ChainState::ShortCircuited;
                return Ok(false);
            }
            self.interceptor_index = Some(i);
        }
        self.state = ChainState::Handling;
        Ok(true)
    }

    /// 逆序执行后置逻辑，每个请求只生效一次
    ///
    /// 某个拦截器出错不影响其余拦截器，返回遇到的第一个错误
    pub fn apply_post_handle(&mut self, ctx: &RequestContext) -> MvcResult<()> {
        if self.state == ChainState::Done {
            return Ok(());
        }
        self.state = ChainState::PostHandling;

        let mut first_error = None;
        if let Some(last) = self.interceptor_index {
            for interceptor in self.interceptors[..=last].iter().rev() {
                if let Err(e) = interceptor.post_handle(ctx, &self.handler) {
                    tracing::warn!(
                        interceptor = interceptor.name(),
                        error = %e,
                        "Interceptor post_handle failed"
                    );
                    first_error.get_or_insert(e);
                }
            }
        }

        self.state = ChainState::Done;
        first_error.map_or(Ok(()), Err)
    }
}

impl fmt::Debug for HandlerExecutionChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.interceptors.iter().map(|i| i.name()).collect();
        f.debug_struct("HandlerExecutionChain")
            .field("handler", &self.handler.to_string())
            .field("interceptors", &names)
            .field("interceptor_index", &self.interceptor_index)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Exception, MvcError};
    use crate::testing::{self, CallLog, RecordingInterceptor};

    fn chain_of(log: &CallLog, verdicts: &[bool]) -> HandlerExecutionChain {
        let interceptors = verdicts
            .iter()
            .enumerate()
            .map(|(i, allow)| {
                Arc::new(RecordingInterceptor::new(format!("I{}", i + 1), log.clone()).allow(*allow))
                    as Arc<dyn HandlerInterceptor>
            })
            .collect();
        HandlerExecutionChain::with_interceptors(testing::dummy_handler(), interceptors)
    }

    #[test]
    fn test_short_circuit_unwinds_only_completed_interceptors() {
        let log = CallLog::default();
        let ctx = testing::request_context(testing::get("/x"));
        let mut chain = chain_of(&log, &[true, false, true]);

        assert!(!chain.apply_pre_handle(&ctx).unwrap());
        assert_eq!(chain.state(), ChainState::ShortCircuited);
        assert_eq!(chain.interceptor_index(), Some(0));

        chain.apply_post_handle(&ctx).unwrap();
        assert_eq!(log.calls(), ["I1.pre", "I2.pre", "I1.post"]);
        assert_eq!(chain.state(), ChainState::Done);
    }

    #[test]
    fn test_full_pass_runs_post_in_reverse() {
        let log = CallLog::default();
        let ctx = testing::request_context(testing::get("/x"));
        let mut chain = chain_of(&log, &[true, true]);

        assert!(chain.apply_pre_handle(&ctx).unwrap());
        assert_eq!(chain.state(), ChainState::Handling);
        chain.apply_post_handle(&ctx).unwrap();
        chain.apply_post_handle(&ctx).unwrap();
        assert_eq!(log.calls(), ["I1.pre", "I2.pre", "I2.post", "I1.post"]);
    }

    #[test]
    fn test_first_interceptor_refusing_runs_no_post() {
        let log = CallLog::default();
        let ctx = testing::request_context(testing::get("/x"));
        let mut chain = chain_of(&log, &[false, true]);

        assert!(!chain.apply_pre_handle(&ctx).unwrap());
        assert_eq!(chain.interceptor_index(), None);
        chain.apply_post_handle(&ctx).unwrap();
        assert_eq!(log.calls(), ["I1.pre"]);
    }

    #[test]
    fn test_post_handle_error_does_not_stop_unwind() {
        let log = CallLog::default();
        let ctx = testing::request_context(testing::get("/x"));
        let failing = RecordingInterceptor::new("I2", log.clone())
            .fail_post(Exception::illegal_state("post failed"));
        let mut chain = HandlerExecutionChain::with_interceptors(
            testing::dummy_handler(),
            vec![
                Arc::new(RecordingInterceptor::new("I1", log.clone())),
                Arc::new(failing),
            ],
        );

        chain.apply_pre_handle(&ctx).unwrap();
        let err = chain.apply_post_handle(&ctx).unwrap_err();
        assert!(matches!(err, MvcError::Exception(ref e) if e.message() == "post failed"));
        assert_eq!(log.calls(), ["I1.pre", "I2.pre", "I2.post", "I1.post"]);
    }
}
