//! Per-operation options
//!
//! Every chained operation takes an optional [`ApiOption`]: operation
//! parameters, an optional [`OpContext`], and an optional response handler.
//! The handler receives the raw outcome of the engine call and returns the
//! error the chain should hold from then on, so it can turn success into
//! failure or suppress a failure entirely.
//!
//! # Example
//!
//! ```rust
//! use dockchain_core::options::{ContainerRemoveOption, ContainerRemoveParams};
//!
//! let option = ContainerRemoveOption::new(ContainerRemoveParams::new().with_force(true))
//!     .with_handler(|removed| {
//!         // a missing container counts as removed
//!         match removed {
//!             Err(e) if e.is_not_found() => Ok(()),
//!             other => other.map(|_| ()),
//!         }
//!     });
//! assert!(option.params.force);
//! ```

use bollard::container::{
    Config, CreateContainerOptions, LogsOptions, NetworkingConfig, RemoveContainerOptions,
};
use bollard::image::ListImagesOptions;
use bollard::models::{ContainerCreateResponse, CreateImageInfo, HostConfig, ImageSummary};
use std::collections::HashMap;
use std::fmt;

use crate::context::OpContext;
use crate::engine::WaitStream;
use crate::error::{ChainError, Result};
use crate::types::{ContainerLogs, WaitCondition};

/// Callback turning an operation's raw outcome into the chain's error
pub type ResponseHandler<T> = Box<dyn FnOnce(Result<T>) -> Result<()> + Send>;

/// Options for one chained operation
///
/// `P` is the parameter struct, `T` the value the response handler sees.
pub struct ApiOption<P, T> {
    pub params: P,
    pub context: Option<OpContext>,
    pub response_handler: Option<ResponseHandler<T>>,
}

/// Image pull: handler sees every progress message the engine sent
pub type ImagePullOption = ApiOption<ImagePullParams, Vec<CreateImageInfo>>;
/// Image list
pub type ImageListOption = ApiOption<ImageListParams, Vec<ImageSummary>>;
/// Container create
pub type ContainerCreateOption = ApiOption<ContainerCreateParams, ContainerCreateResponse>;
/// Container start: handler sees `true` once the container started
pub type ContainerStartOption = ApiOption<ContainerStartParams, bool>;
/// Container wait: handler gets the unpolled wait stream, bound to the option's context
pub type ContainerWaitOption = ApiOption<ContainerWaitParams, WaitStream>;
/// Container logs
pub type ContainerLogsOption = ApiOption<ContainerLogsParams, ContainerLogs>;
/// Container remove: handler sees `true` once the container is gone
pub type ContainerRemoveOption = ApiOption<ContainerRemoveParams, bool>;

impl<P: Default, T> Default for ApiOption<P, T> {
    fn default() -> Self {
        Self::new(P::default())
    }
}

impl<P: fmt::Debug, T> fmt::Debug for ApiOption<P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiOption")
            .field("params", &self.params)
            .field("context", &self.context)
            .field("response_handler", &self.response_handler.is_some())
            .finish()
    }
}

impl<P, T> ApiOption<P, T> {
    #[must_use]
    pub fn new(params: P) -> Self {
        Self {
            params,
            context: None,
            response_handler: None,
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: OpContext) -> Self {
        self.context = Some(context);
        self
    }

    #[must_use]
    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: FnOnce(Result<T>) -> Result<()> + Send + 'static,
    {
        self.response_handler = Some(Box::new(handler));
        self
    }
}

impl<P: Default, T> ApiOption<P, T> {
    /// Fill in what the caller left out: default params, and a context from `context_factory`
    pub(crate) fn check(
        option: Option<Self>,
        context_factory: &(dyn Fn() -> OpContext + Send + Sync),
    ) -> Checked<P, T> {
        let option = option.unwrap_or_default();
        Checked {
            params: option.params,
            context: option.context.unwrap_or_else(context_factory),
            handler: option.response_handler,
        }
    }
}

/// An option after normalization
pub(crate) struct Checked<P, T> {
    pub params: P,
    pub context: OpContext,
    pub handler: Option<ResponseHandler<T>>,
}

/// Route a raw outcome into the sticky error.
///
/// A raw error is adopted only if none is held yet; a handler, when present,
/// has the last word and may clear the error again.
pub(crate) fn respond<T>(
    handler: Option<ResponseHandler<T>>,
    raw: Result<T>,
    sticky: &mut Option<ChainError>,
) {
    if sticky.is_none()
        && let Err(e) = &raw
    {
        *sticky = Some(e.clone());
    }
    if let Some(handler) = handler {
        *sticky = handler(raw).err();
    }
}

/// Parameters for pulling an image
#[derive(Debug, Clone, Default)]
pub struct ImagePullParams {
    /// Overrides a tag embedded in the image reference
    pub tag: Option<String>,
    /// e.g. `linux/arm64`
    pub platform: Option<String>,
}

impl ImagePullParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    #[must_use]
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }
}

/// Parameters for listing images
#[derive(Debug, Clone, Default)]
pub struct ImageListParams {
    /// Include intermediate images
    pub all: bool,
    /// Only images matching this `REPOSITORY[:TAG]` reference
    pub reference: Option<String>,
    /// Raw engine filters, merged with `reference`
    pub filters: HashMap<String, Vec<String>>,
    /// Include digest information
    pub digests: bool,
}

impl ImageListParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    #[must_use]
    pub fn with_all(mut self, all: bool) -> Self {
        self.all = all;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.entry(key.into()).or_default().push(value.into());
        self
    }

    /// Convert to the engine's list options
    #[must_use]
    pub fn into_options(self) -> ListImagesOptions<String> {
        let mut filters = self.filters;
        if let Some(reference) = self.reference {
            filters
                .entry("reference".to_string())
                .or_default()
                .push(reference);
        }
        ListImagesOptions {
            all: self.all,
            filters,
            digests: self.digests,
        }
    }
}

/// Parameters for creating a container
///
/// The engine takes one combined config; `host_config` and
/// `networking_config` are folded into `config` when set.
#[derive(Debug, Clone, Default)]
pub struct ContainerCreateParams {
    pub config: Config<String>,
    pub host_config: Option<HostConfig>,
    pub networking_config: Option<NetworkingConfig<String>>,
    pub platform: Option<String>,
    pub name: Option<String>,
}

impl ContainerCreateParams {
    /// Params for running `image` with an otherwise default config
    #[must_use]
    pub fn new(image: impl Into<String>) -> Self {
        Self::from_config(image, Config::default())
    }

    /// Params for running `image` with `config`; the image always wins over `config.image`
    #[must_use]
    pub fn from_config(image: impl Into<String>, mut config: Config<String>) -> Self {
        config.image = Some(image.into());
        Self {
            config,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_cmd<I, S>(mut self, cmd: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.cmd = Some(cmd.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    #[must_use]
    pub fn with_host_config(mut self, host_config: HostConfig) -> Self {
        self.host_config = Some(host_config);
        self
    }

    #[must_use]
    pub fn with_networking_config(mut self, networking_config: NetworkingConfig<String>) -> Self {
        self.networking_config = Some(networking_config);
        self
    }

    /// Convert to the engine's create options and config
    #[must_use]
    pub fn into_request(self) -> (Option<CreateContainerOptions<String>>, Config<String>) {
        let mut config = self.config;
        if let Some(host_config) = self.host_config {
            config.host_config = Some(host_config);
        }
        if let Some(networking_config) = self.networking_config {
            config.networking_config = Some(networking_config);
        }

        let options = match (self.name, self.platform) {
            (None, None) => None,
            (name, platform) => Some(CreateContainerOptions {
                name: name.unwrap_or_default(),
                platform,
            }),
        };
        (options, config)
    }
}

/// Parameters for starting a container
#[derive(Debug, Clone, Default)]
pub struct ContainerStartParams {
    /// Falls back to the chain's last created container
    pub id: Option<String>,
}

impl ContainerStartParams {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
        }
    }
}

/// Parameters for waiting on a container
#[derive(Debug, Clone, Default)]
pub struct ContainerWaitParams {
    /// Falls back to the chain's last created container
    pub id: Option<String>,
    /// Defaults to [`WaitCondition::NotRunning`]
    pub condition: Option<WaitCondition>,
}

impl ContainerWaitParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_condition(mut self, condition: WaitCondition) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// Parameters for fetching container logs
#[derive(Debug, Clone)]
pub struct ContainerLogsParams {
    /// Falls back to the chain's last created container
    pub id: Option<String>,
    pub stdout: bool,
    pub stderr: bool,
    pub timestamps: bool,
    /// Only frames newer than this unix timestamp
    pub since: i64,
    /// Number of trailing lines, or `all`
    pub tail: String,
}

impl Default for ContainerLogsParams {
    fn default() -> Self {
        Self {
            id: None,
            stdout: true,
            stderr: true,
            timestamps: false,
            since: 0,
            tail: "all".to_string(),
        }
    }
}

impl ContainerLogsParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_streams(mut self, stdout: bool, stderr: bool) -> Self {
        self.stdout = stdout;
        self.stderr = stderr;
        self
    }

    #[must_use]
    pub fn with_timestamps(mut self, timestamps: bool) -> Self {
        self.timestamps = timestamps;
        self
    }

    #[must_use]
    pub fn with_tail(mut self, tail: impl Into<String>) -> Self {
        self.tail = tail.into();
        self
    }

    /// Convert to the engine's log options; never follows
    #[must_use]
    pub fn to_options(&self) -> LogsOptions<String> {
        LogsOptions {
            follow: false,
            stdout: self.stdout,
            stderr: self.stderr,
            since: self.since,
            until: 0,
            timestamps: self.timestamps,
            tail: self.tail.clone(),
        }
    }
}

/// Parameters for removing a container
#[derive(Debug, Clone, Default)]
pub struct ContainerRemoveParams {
    /// Falls back to the chain's last created container
    pub id: Option<String>,
    /// Kill the container first if it is running
    pub force: bool,
    /// Also remove anonymous volumes
    pub remove_volumes: bool,
}

impl ContainerRemoveParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    #[must_use]
    pub fn with_volumes(mut self, remove_volumes: bool) -> Self {
        self.remove_volumes = remove_volumes;
        self
    }

    #[must_use]
    pub fn to_options(&self) -> RemoveContainerOptions {
        RemoveContainerOptions {
            v: self.remove_volumes,
            force: self.force,
            link: false,
        }
    }
}
