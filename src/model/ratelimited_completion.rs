use std::sync::Arc;

use governor::DefaultDirectRateLimiter;
use rig::completion::{CompletionError, CompletionModel, CompletionRequest, CompletionResponse};
use tracing::{Instrument, debug_span, info_span};

/// Completion model that waits on a shared quota before every request
#[derive(Clone)]
pub struct RateLimitedCompletionModel<M: CompletionModel> {
    model: M,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl<M> RateLimitedCompletionModel<M>
where
    M: CompletionModel,
{
    pub fn new(model: M, limiter: DefaultDirectRateLimiter) -> Self {
        Self {
            model,
            limiter: Arc::new(limiter),
        }
    }
}

impl<M: CompletionModel> CompletionModel for RateLimitedCompletionModel<M> {
    type Response = M::Response;

    async fn completion(
        &self,
        completion_request: CompletionRequest,
    ) -> Result<CompletionResponse<Self::Response>, CompletionError> {
        self.limiter.until_ready().instrument(debug_span!("limiter")).await;
        self.model
            .completion(completion_request)
            .instrument(info_span!("completion"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;
    use std::time::Duration;

    use governor::{Quota, RateLimiter};

    use super::*;
    use crate::model::mock_model::MockCompletionModel;

    #[tokio::test]
    async fn test_requests_pass_through_the_limiter() {
        let mock = MockCompletionModel::new();
        mock.push_text("first").await;
        mock.push_text("second").await;

        let limiter = RateLimiter::direct(Quota::per_second(NonZeroU32::new(100).unwrap()));
        let model = RateLimitedCompletionModel::new(mock.clone(), limiter);

        for expected in ["first", "second"] {
            let response = tokio::time::timeout(
                Duration::from_secs(5),
                model.completion_request("hello").send(),
            )
            .await
            .unwrap()
            .unwrap();
            assert_eq!(response.raw_response, expected);
        }
        assert_eq!(mock.calls(), 2);
    }
}
