//! Engine configuration.

use crate::scope::DEFAULT_MAX_BREADCRUMBS;
use crate::transport::Transport;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration handed to [`crate::init`].
///
/// The engine takes ownership of the options, including the transport, when
/// they are passed to `init`.
#[derive(Debug)]
pub struct Options {
    /// Project DSN envelopes are addressed to.
    pub dsn: Option<String>,

    /// Directory the engine keeps its own run state in.
    pub database_path: PathBuf,

    /// Whether the engine logs its lifecycle at info level.
    pub debug: bool,

    /// Release name attached to events.
    pub release: Option<String>,

    /// Environment name attached to events.
    pub environment: Option<String>,

    /// Distribution attached to events.
    pub dist: Option<String>,

    /// Maximum number of breadcrumbs kept on the scope.
    pub max_breadcrumbs: usize,

    /// Whether the engine tracks sessions on its own.
    pub auto_session_tracking: bool,

    /// How long `close` waits for queued envelopes before tearing down.
    pub shutdown_timeout: Duration,

    /// Where completed envelopes are delivered.
    pub transport: Option<Transport>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            dsn: None,
            database_path: PathBuf::from(".sentry-native"),
            debug: false,
            release: None,
            environment: None,
            dist: None,
            max_breadcrumbs: DEFAULT_MAX_BREADCRUMBS,
            auto_session_tracking: true,
            shutdown_timeout: Duration::from_secs(2),
            transport: None,
        }
    }
}

impl Options {
    /// Creates options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the DSN.
    #[must_use]
    pub fn dsn(mut self, dsn: impl Into<String>) -> Self {
        self.dsn = Some(dsn.into());
        self
    }

    /// Sets the database path.
    #[must_use]
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    /// Sets debug logging.
    #[must_use]
    pub const fn debug(mut self, value: bool) -> Self {
        self.debug = value;
        self
    }

    /// Sets the release.
    #[must_use]
    pub fn release(mut self, release: impl Into<String>) -> Self {
        self.release = Some(release.into());
        self
    }

    /// Sets the environment.
    #[must_use]
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Sets the dist.
    #[must_use]
    pub fn dist(mut self, dist: impl Into<String>) -> Self {
        self.dist = Some(dist.into());
        self
    }

    /// Sets the breadcrumb capacity.
    #[must_use]
    pub const fn max_breadcrumbs(mut self, max: usize) -> Self {
        self.max_breadcrumbs = max;
        self
    }

    /// Sets automatic session tracking.
    #[must_use]
    pub const fn auto_session_tracking(mut self, value: bool) -> Self {
        self.auto_session_tracking = value;
        self
    }

    /// Sets the transport.
    #[must_use]
    pub fn transport(mut self, transport: Transport) -> Self {
        self.transport = Some(transport);
        self
    }
}
