//! Per-operation deadline and cancellation
//!
//! Every chained operation runs inside an [`OpContext`]. When an option does
//! not carry one, the chain's context factory supplies it; the stock factory
//! returns [`OpContext::background`].

use crate::error::{ChainError, Result};
use bollard::errors::Error as DockerError;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Deadline and cancellation carried by one operation
#[derive(Debug, Clone)]
pub struct OpContext {
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl Default for OpContext {
    fn default() -> Self {
        Self::background()
    }
}

impl OpContext {
    /// No deadline, never cancelled
    #[must_use]
    pub fn background() -> Self {
        Self {
            timeout: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Context whose operation fails with [`ChainError::DeadlineExceeded`] after `timeout`
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            cancel: CancellationToken::new(),
        }
    }

    /// Attach an externally owned cancellation token
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Replace the deadline
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Drive `fut` to completion unless the token fires or the deadline passes first.
    ///
    /// Dropping the future on either early exit also drops any engine stream it owns.
    pub(crate) async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let bounded = async {
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, fut)
                    .await
                    .map_err(|_| ChainError::DeadlineExceeded(limit))?,
                None => fut.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ChainError::Cancelled),
            res = bounded => res,
        }
    }

    /// Tie an engine stream to this context for callers that poll it later.
    ///
    /// The deadline counts from the moment of binding. Cancellation or an
    /// expired deadline yields one final `Err` and ends the stream.
    pub(crate) fn bind_stream<T>(
        &self,
        inner: BoxStream<'static, std::result::Result<T, DockerError>>,
    ) -> BoxStream<'static, Result<T>>
    where
        T: Send + 'static,
    {
        let deadline = self.timeout.map(|limit| (Instant::now() + limit, limit));
        let state = Some((inner, self.cancel.clone()));

        stream::unfold(state, move |state| async move {
            let (mut inner, cancel) = state?;
            let next = async {
                match deadline {
                    Some((at, limit)) => tokio::time::timeout_at(at, inner.next())
                        .await
                        .map_err(|_| ChainError::DeadlineExceeded(limit)),
                    None => Ok(inner.next().await),
                }
            };
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(ChainError::Cancelled),
                res = next => res,
            };

            match outcome {
                Ok(Some(item)) => Some((item.map_err(ChainError::from), Some((inner, cancel)))),
                Ok(None) => None,
                Err(err) => Some((Err(err), None)),
            }
        })
        .boxed()
    }
}
