//! The operation chain accumulator
//!
//! A [`DockerChain`] threads one sticky error through a sequence of engine
//! operations. Each operation returns the chain again, so calls read as one
//! pipeline:
//!
//! ```rust,ignore
//! use dockchain_core::DockerChain;
//!
//! let mut chain = DockerChain::local();
//! chain
//!     .image_pull("docker.io/library/alpine").await
//!     .container_create_with_callback("alpine", None, None).await
//!     .container_start().await
//!     .container_wait().await
//!     .container_logs(|logs| {
//!         print!("{}", logs?);
//!         Ok(())
//!     }).await
//!     .container_remove().await;
//! chain.error()?;
//! ```
//!
//! Once an operation fails, every later call returns immediately without
//! touching the engine. [`DockerChain::error`] hands the failure back, clears
//! it, and releases the connection so the chain can be reused.

use bollard::Docker;
use bollard::container::Config;
use bollard::errors::Error as DockerError;
use bollard::models::{ContainerCreateResponse, ImageSummary};
use futures::StreamExt;
use futures::stream::BoxStream;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, trace, warn};

use crate::config::EngineProfile;
use crate::context::OpContext;
use crate::engine::{Engine, ImagePullRequest};
use crate::error::{ChainError, Result};
use crate::options::{
    ApiOption, ContainerCreateOption, ContainerCreateParams, ContainerLogsOption,
    ContainerLogsParams, ContainerRemoveOption, ContainerRemoveParams, ContainerStartOption,
    ContainerStartParams, ContainerWaitOption, ContainerWaitParams, ImageListOption,
    ImageListParams, ImagePullOption, ResponseHandler, respond,
};
use crate::types::ContainerLogs;

/// Fixed limit for the liveness check made when a connection is first acquired
pub const PING_TIMEOUT: Duration = Duration::from_secs(3);

/// Produces a connected engine handle
pub type EngineFactory<E> = Box<dyn Fn() -> Result<E> + Send + Sync>;

/// Produces the context used when an option carries none
pub type ContextFactory = Box<dyn Fn() -> OpContext + Send + Sync>;

/// Chainable Docker operations sharing one connection and one sticky error
pub struct DockerChain<E: Engine = Docker> {
    factory: EngineFactory<E>,
    context_factory: ContextFactory,
    engine: Option<E>,
    err: Option<ChainError>,
    last_container_id: String,
}

impl DockerChain<Docker> {
    /// Chain connecting to the local daemon (`DOCKER_HOST` or the platform default socket)
    pub fn local() -> Self {
        Self::new(connect_local)
    }

    /// Chain connecting with a configured profile
    pub fn from_profile(profile: EngineProfile) -> Self {
        Self::new(move || profile.connect())
    }
}

/// Factory used by [`DockerChain::local`]
pub fn connect_local() -> Result<Docker> {
    Docker::connect_with_local_defaults().map_err(|e| ChainError::Connect(e.into()))
}

impl<E: Engine> DockerChain<E> {
    /// Chain that obtains its engine from `factory` on first use
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<E> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            context_factory: Box::new(OpContext::background),
            engine: None,
            err: None,
            last_container_id: String::new(),
        }
    }

    /// Replace the factory used for options without a context
    pub fn set_context_factory<F>(&mut self, factory: F) -> &mut Self
    where
        F: Fn() -> OpContext + Send + Sync + 'static,
    {
        self.context_factory = Box::new(factory);
        self
    }

    /// Start over with a new connection factory.
    ///
    /// Any held connection is released and any pending error and recorded
    /// container ID are discarded.
    pub fn reinit<F>(&mut self, factory: F) -> &mut Self
    where
        F: Fn() -> Result<E> + Send + Sync + 'static,
    {
        if let Some(err) = self.err.take() {
            warn!(error = %err, "discarding unretrieved chain error on reinit");
        }
        self.release();
        self.last_container_id.clear();
        self.factory = Box::new(factory);
        self
    }

    /// True while a sticky error is held
    pub fn has_failed(&self) -> bool {
        self.err.is_some()
    }

    /// The sticky error, without clearing it
    pub fn peek_error(&self) -> Option<&ChainError> {
        self.err.as_ref()
    }

    /// ID of the container created most recently in this chain, empty if none
    pub fn last_container_id(&self) -> &str {
        &self.last_container_id
    }

    /// True while an engine connection is held
    pub fn is_connected(&self) -> bool {
        self.engine.is_some()
    }

    /// Release the connection and hand back the sticky error, clearing it
    pub fn error(&mut self) -> Result<()> {
        self.release();
        match self.err.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn release(&mut self) {
        if self.engine.take().is_some() {
            debug!("Released docker engine connection");
        }
    }

    /// Make sure an engine is connected and alive; false if the chain must short-circuit
    async fn connect(&mut self) -> bool {
        if self.err.is_some() {
            trace!("Skipping operation, chain already failed");
            return false;
        }
        if self.engine.is_some() {
            return true;
        }

        debug!("Acquiring docker engine connection");
        let mut engine = match (self.factory)() {
            Ok(engine) => engine,
            Err(err) => {
                self.err = Some(err);
                return false;
            }
        };

        match tokio::time::timeout(PING_TIMEOUT, engine.ping()).await {
            Ok(Ok(())) => {
                debug!("Docker engine is reachable");
            }
            Ok(Err(err)) => {
                self.err = Some(ChainError::Ping(err.into()));
                return false;
            }
            Err(_) => {
                self.err = Some(ChainError::PingTimeout(PING_TIMEOUT));
                return false;
            }
        }

        // Older daemons reject the client's default API version
        match tokio::time::timeout(PING_TIMEOUT, engine.negotiate_version()).await {
            Ok(Ok(())) => trace!("Negotiated docker API version"),
            Ok(Err(err)) => warn!(error = %err, "API version negotiation failed, keeping client default"),
            Err(_) => warn!("API version negotiation timed out, keeping client default"),
        }
        self.engine = Some(engine);
        true
    }

    fn resolve_container_id(&self, explicit: Option<String>) -> Option<String> {
        explicit.filter(|id| !id.is_empty()).or_else(|| {
            (!self.last_container_id.is_empty()).then(|| self.last_container_id.clone())
        })
    }

    /// Pull an image, e.g. `docker.io/library/alpine` or `alpine:3.20`
    pub async fn image_pull(&mut self, image: &str) -> &mut Self {
        self.image_pull_with_option(image, None).await
    }

    /// Pull an image; the handler sees every progress message
    pub async fn image_pull_with_option(
        &mut self,
        image: &str,
        option: Option<ImagePullOption>,
    ) -> &mut Self {
        let option = ApiOption::check(option, &*self.context_factory);
        if !self.connect().await {
            return self;
        }
        let Some(engine) = self.engine.as_ref() else {
            return self;
        };

        let mut request = ImagePullRequest::from_reference(image, option.params.tag.as_deref());
        request.platform = option.params.platform.unwrap_or_default();
        info!(image = %request.from_image, tag = %request.tag, "Pulling image");

        let stream = engine.pull_image(request);
        let raw = option.context.run(drain(stream)).await;
        respond(option.handler, raw, &mut self.err);
        self
    }

    /// Images matching the given option; the handler sees the summaries
    pub async fn image_list_with_option(&mut self, option: Option<ImageListOption>) -> &mut Self {
        let option = ApiOption::check(option, &*self.context_factory);
        if !self.connect().await {
            return self;
        }
        let Some(engine) = self.engine.as_ref() else {
            return self;
        };

        debug!(reference = ?option.params.reference, "Listing images");
        let list_options = option.params.into_options();
        let raw = option
            .context
            .run(async { Ok(engine.list_images(list_options).await?) })
            .await;
        respond(option.handler, raw, &mut self.err);
        self
    }

    /// All images. A failure is also left as the chain's sticky error.
    pub async fn image_list(&mut self) -> Result<Vec<ImageSummary>> {
        self.image_list_matching(ImageListParams::new()).await
    }

    /// Images matching `name` (`REPOSITORY[:TAG]`). A failure is also left as the sticky error.
    pub async fn image_get_by_name(&mut self, name: &str) -> Result<Vec<ImageSummary>> {
        self.image_list_matching(ImageListParams::new().with_reference(name))
            .await
    }

    async fn image_list_matching(&mut self, params: ImageListParams) -> Result<Vec<ImageSummary>> {
        let (handler, rx) = capture();
        let option = ImageListOption::new(params);
        self.image_list_with_option(Some(ApiOption {
            response_handler: Some(handler),
            ..option
        }))
        .await;
        self.captured(rx)
    }

    /// Create a container from `image`; its ID becomes the chain's default target.
    /// A failure is also left as the sticky error.
    pub async fn container_create(
        &mut self,
        image: &str,
        config: Option<Config<String>>,
    ) -> Result<ContainerCreateResponse> {
        let (handler, rx) = capture();
        self.container_create_with_callback(image, config, Some(handler))
            .await;
        self.captured(rx)
    }

    /// Create a container from `image` with an optional config and handler
    pub async fn container_create_with_callback(
        &mut self,
        image: &str,
        config: Option<Config<String>>,
        handler: Option<ResponseHandler<ContainerCreateResponse>>,
    ) -> &mut Self {
        let params = ContainerCreateParams::from_config(image, config.unwrap_or_default());
        self.container_create_with_option(Some(ApiOption {
            response_handler: handler,
            ..ContainerCreateOption::new(params)
        }))
        .await
    }

    /// Create a container; on success its ID becomes the chain's default target
    pub async fn container_create_with_option(
        &mut self,
        option: Option<ContainerCreateOption>,
    ) -> &mut Self {
        let option = ApiOption::check(option, &*self.context_factory);
        if !self.connect().await {
            return self;
        }
        let Some(engine) = self.engine.as_ref() else {
            return self;
        };

        let (create_options, config) = option.params.into_request();
        info!(image = ?config.image, name = ?create_options.as_ref().map(|o| &o.name), "Creating container");
        let raw = option
            .context
            .run(async { Ok(engine.create_container(create_options, config).await?) })
            .await;

        let created_id = raw.as_ref().ok().map(|created| created.id.clone());
        respond(option.handler, raw, &mut self.err);
        if self.err.is_none()
            && let Some(id) = created_id
        {
            debug!(container = %id, "Recorded created container");
            self.last_container_id = id;
        }
        self
    }

    /// Start the container created last in this chain
    pub async fn container_start(&mut self) -> &mut Self {
        self.container_start_with_option(None).await
    }

    /// Start the container with this ID
    pub async fn container_start_with_id(&mut self, id: &str) -> &mut Self {
        self.container_start_with_option(Some(ContainerStartOption::new(
            ContainerStartParams::new(id),
        )))
        .await
    }

    /// Start a container; the handler sees `true` once it started
    pub async fn container_start_with_option(
        &mut self,
        option: Option<ContainerStartOption>,
    ) -> &mut Self {
        let option = ApiOption::check(option, &*self.context_factory);
        if !self.connect().await {
            return self;
        }
        let Some(id) = self.resolve_container_id(option.params.id) else {
            self.err = Some(ChainError::MissingContainerId { operation: "start" });
            return self;
        };
        let Some(engine) = self.engine.as_ref() else {
            return self;
        };

        info!(container = %id, "Starting container");
        let raw = option
            .context
            .run(async { Ok(engine.start_container(&id).await?) })
            .await
            .map(|()| true);
        respond(option.handler, raw, &mut self.err);
        self
    }

    /// Wait for the container created last in this chain to stop running
    pub async fn container_wait(&mut self) -> &mut Self {
        self.container_wait_with_option(None).await
    }

    /// Wait for the container with this ID to stop running
    pub async fn container_wait_by_id(&mut self, id: &str) -> &mut Self {
        self.container_wait_with_option(Some(ContainerWaitOption::new(
            ContainerWaitParams::new().with_id(id),
        )))
        .await
    }

    /// Wait on a container.
    ///
    /// With a handler, the wait stream goes to the handler unpolled and this
    /// call does not block; the stream still ends with `Cancelled` or
    /// `DeadlineExceeded` when the option's context fires. Without one, the
    /// first status or error the engine sends becomes the outcome.
    pub async fn container_wait_with_option(
        &mut self,
        option: Option<ContainerWaitOption>,
    ) -> &mut Self {
        let option = ApiOption::check(option, &*self.context_factory);
        if !self.connect().await {
            return self;
        }
        let Some(id) = self.resolve_container_id(option.params.id) else {
            self.err = Some(ChainError::MissingContainerId { operation: "wait" });
            return self;
        };
        let Some(engine) = self.engine.as_ref() else {
            return self;
        };

        let condition = option.params.condition.unwrap_or_default();
        info!(container = %id, %condition, "Waiting for container");
        let stream = option
            .context
            .bind_stream(engine.wait_container(&id, condition));

        match option.handler {
            Some(handler) => {
                self.err = handler(Ok(stream)).err();
            }
            None => {
                if let Err(err) = first_outcome(stream).await {
                    self.err = Some(err);
                }
            }
        }
        self
    }

    /// Fetch stdout and stderr of the container created last in this chain
    pub async fn container_logs<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnOnce(Result<ContainerLogs>) -> Result<()> + Send + 'static,
    {
        self.container_logs_with_option(Some(
            ContainerLogsOption::new(ContainerLogsParams::new()).with_handler(handler),
        ))
        .await
    }

    /// Fetch stdout and stderr of the container with this ID
    pub async fn container_logs_with_container_id<F>(&mut self, id: &str, handler: F) -> &mut Self
    where
        F: FnOnce(Result<ContainerLogs>) -> Result<()> + Send + 'static,
    {
        self.container_logs_with_option(Some(
            ContainerLogsOption::new(ContainerLogsParams::new().with_id(id)).with_handler(handler),
        ))
        .await
    }

    /// Fetch container logs; the stream is read to the end before the handler runs
    pub async fn container_logs_with_option(
        &mut self,
        option: Option<ContainerLogsOption>,
    ) -> &mut Self {
        let option = ApiOption::check(option, &*self.context_factory);
        if !self.connect().await {
            return self;
        }
        let Some(id) = self.resolve_container_id(option.params.id.clone()) else {
            self.err = Some(ChainError::MissingContainerId { operation: "logs" });
            return self;
        };
        let Some(engine) = self.engine.as_ref() else {
            return self;
        };

        debug!(container = %id, tail = %option.params.tail, "Fetching container logs");
        let stream = engine.logs(&id, option.params.to_options());
        let raw = option
            .context
            .run(drain(stream))
            .await
            .map(ContainerLogs::new);
        respond(option.handler, raw, &mut self.err);
        self
    }

    /// Remove the container created last in this chain
    pub async fn container_remove(&mut self) -> &mut Self {
        self.container_remove_with_option(None).await
    }

    /// Remove the container with this ID
    pub async fn container_remove_with_container_id(&mut self, id: &str) -> &mut Self {
        self.container_remove_with_option(Some(ContainerRemoveOption::new(
            ContainerRemoveParams::new().with_id(id),
        )))
        .await
    }

    /// Remove a container; the handler sees `true` once it is gone
    pub async fn container_remove_with_option(
        &mut self,
        option: Option<ContainerRemoveOption>,
    ) -> &mut Self {
        let option = ApiOption::check(option, &*self.context_factory);
        if !self.connect().await {
            return self;
        }
        let Some(id) = self.resolve_container_id(option.params.id.clone()) else {
            self.err = Some(ChainError::MissingContainerId { operation: "remove" });
            return self;
        };
        let Some(engine) = self.engine.as_ref() else {
            return self;
        };

        info!(container = %id, force = option.params.force, "Removing container");
        let remove_options = option.params.to_options();
        let raw = option
            .context
            .run(async { Ok(engine.remove_container(&id, remove_options).await?) })
            .await
            .map(|()| true);
        respond(option.handler, raw, &mut self.err);
        self
    }

    fn captured<T>(&self, mut rx: oneshot::Receiver<Result<T>>) -> Result<T> {
        match rx.try_recv() {
            Ok(res) => res,
            Err(_) => Err(self
                .err
                .clone()
                .unwrap_or_else(|| ChainError::handler("operation produced no response"))),
        }
    }
}

/// Handler that forwards the raw outcome to a receiver and keeps its error
fn capture<T: Send + 'static>() -> (ResponseHandler<T>, oneshot::Receiver<Result<T>>) {
    let (tx, rx) = oneshot::channel();
    let handler: ResponseHandler<T> = Box::new(move |res: Result<T>| {
        let verdict = match &res {
            Ok(_) => Ok(()),
            Err(err) => Err(err.clone()),
        };
        let _ = tx.send(res);
        verdict
    });
    (handler, rx)
}

/// Read a stream to its end, keeping items and the first error
async fn drain<T>(mut stream: BoxStream<'static, std::result::Result<T, DockerError>>) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut first_err = None;
    while let Some(item) = stream.next().await {
        match item {
            Ok(item) => items.push(item),
            Err(err) => {
                trace!(error = %err, "Stream reported an error");
                first_err.get_or_insert(err);
            }
        }
    }
    match first_err {
        Some(err) => Err(err.into()),
        None => Ok(items),
    }
}

async fn first_outcome<T>(mut stream: BoxStream<'static, Result<T>>) -> Result<()> {
    match stream.next().await {
        Some(Err(err)) => Err(err),
        Some(Ok(_)) | None => Ok(()),
    }
}
