//! The seam between the chain and the Docker Engine client
//!
//! [`Engine`] lists exactly the daemon calls a chain consumes. It is
//! implemented for [`bollard::Docker`]; tests swap in a mock.

use async_trait::async_trait;
use bollard::Docker;
use bollard::container::{
    Config, CreateContainerOptions, LogOutput, LogsOptions, RemoveContainerOptions,
    StartContainerOptions, WaitContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::image::{CreateImageOptions, ListImagesOptions};
use bollard::models::{
    ContainerCreateResponse, ContainerWaitExitError, ContainerWaitResponse, CreateImageInfo,
    ImageSummary,
};
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};

use crate::types::WaitCondition;

/// Progress messages of an image pull
pub type ImagePullStream = BoxStream<'static, Result<CreateImageInfo, DockerError>>;
/// Outcome of a container wait as the engine reports it; normally a single item
pub type EngineWaitStream = BoxStream<'static, Result<ContainerWaitResponse, DockerError>>;
/// Wait outcome bound to its operation's deadline and cancellation token
pub type WaitStream = BoxStream<'static, crate::error::Result<ContainerWaitResponse>>;
/// Demultiplexed log frames
pub type LogStream = BoxStream<'static, Result<LogOutput, DockerError>>;

/// Image pull request as sent to the engine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImagePullRequest {
    pub from_image: String,
    pub tag: String,
    pub platform: String,
}

impl ImagePullRequest {
    /// Split `reference` into repository and tag.
    ///
    /// An explicit `tag` wins over one embedded in the reference; a reference
    /// without tag or digest pulls `latest`, never every tag.
    #[must_use]
    pub fn from_reference(reference: &str, tag: Option<&str>) -> Self {
        let (repository, embedded) = split_reference(reference);
        let tag = tag
            .filter(|t| !t.is_empty())
            .or(embedded)
            .unwrap_or("latest");
        Self {
            from_image: repository.to_string(),
            tag: tag.to_string(),
            platform: String::new(),
        }
    }
}

fn split_reference(reference: &str) -> (&str, Option<&str>) {
    if let Some((repository, digest)) = reference.split_once('@') {
        return (repository, Some(digest));
    }
    // A colon before the last slash belongs to a registry port, not a tag
    let name_start = reference.rfind('/').map_or(0, |i| i + 1);
    match reference[name_start..].rfind(':') {
        Some(i) => {
            let split = name_start + i;
            (&reference[..split], Some(&reference[split + 1..]))
        }
        None => (reference, None),
    }
}

/// Docker Engine operations used by a chain
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Engine: Send + Sync {
    /// Liveness check against the daemon; the chain bounds it with its own timeout
    fn ping(&self) -> BoxFuture<'static, Result<(), DockerError>>;

    /// Settle on the highest API version both sides speak
    async fn negotiate_version(&mut self) -> Result<(), DockerError>;

    fn pull_image(&self, request: ImagePullRequest) -> ImagePullStream;

    async fn list_images(
        &self,
        options: ListImagesOptions<String>,
    ) -> Result<Vec<ImageSummary>, DockerError>;

    async fn create_container(
        &self,
        options: Option<CreateContainerOptions<String>>,
        config: Config<String>,
    ) -> Result<ContainerCreateResponse, DockerError>;

    async fn start_container(&self, id: &str) -> Result<(), DockerError>;

    /// Exit statuses arrive as `Ok` items whatever the exit code
    fn wait_container(&self, id: &str, condition: WaitCondition) -> EngineWaitStream;

    fn logs(&self, id: &str, options: LogsOptions<String>) -> LogStream;

    async fn remove_container(
        &self,
        id: &str,
        options: RemoveContainerOptions,
    ) -> Result<(), DockerError>;
}

#[async_trait]
impl Engine for Docker {
    fn ping(&self) -> BoxFuture<'static, Result<(), DockerError>> {
        let docker = self.clone();
        async move { Docker::ping(&docker).await.map(|_| ()) }.boxed()
    }

    async fn negotiate_version(&mut self) -> Result<(), DockerError> {
        let negotiated = Docker::negotiate_version(self.clone()).await?;
        *self = negotiated;
        Ok(())
    }

    fn pull_image(&self, request: ImagePullRequest) -> ImagePullStream {
        let options = CreateImageOptions {
            from_image: request.from_image,
            tag: request.tag,
            platform: request.platform,
            ..Default::default()
        };
        Box::pin(Docker::create_image(self, Some(options), None, None))
    }

    async fn list_images(
        &self,
        options: ListImagesOptions<String>,
    ) -> Result<Vec<ImageSummary>, DockerError> {
        Docker::list_images(self, Some(options)).await
    }

    async fn create_container(
        &self,
        options: Option<CreateContainerOptions<String>>,
        config: Config<String>,
    ) -> Result<ContainerCreateResponse, DockerError> {
        Docker::create_container(self, options, config).await
    }

    async fn start_container(&self, id: &str) -> Result<(), DockerError> {
        Docker::start_container(self, id, None::<StartContainerOptions<String>>).await
    }

    fn wait_container(&self, id: &str, condition: WaitCondition) -> EngineWaitStream {
        let options = WaitContainerOptions {
            condition: condition.as_str().to_string(),
        };
        // bollard reports non-zero exit codes as errors; the engine API reports them as statuses
        Docker::wait_container(self, id, Some(options))
            .map(|item| match item {
                Err(DockerError::DockerContainerWaitError { error, code }) => {
                    Ok(ContainerWaitResponse {
                        status_code: code,
                        error: (!error.is_empty()).then_some(ContainerWaitExitError {
                            message: Some(error),
                        }),
                    })
                }
                other => other,
            })
            .boxed()
    }

    fn logs(&self, id: &str, options: LogsOptions<String>) -> LogStream {
        Docker::logs(self, id, Some(options)).boxed()
    }

    async fn remove_container(
        &self,
        id: &str,
        options: RemoveContainerOptions,
    ) -> Result<(), DockerError> {
        Docker::remove_container(self, id, Some(options)).await
    }
}
