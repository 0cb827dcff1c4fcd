use crate::config::ServerConfig;
use crate::server::auth::Credentials;
use metrics_exporter_prometheus::PrometheusHandle;
use remotephoto_core::{Broker, DirectorySource, ShowController};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Event broker feeding every `/listen` stream
    pub broker: Broker,

    /// Show state, mutated by master commands
    pub show: Arc<ShowController>,

    /// Master credentials
    pub credentials: Arc<Credentials>,

    /// Prometheus handle for rendering `/metrics`
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    /// Build the broker and show controller. The show starts empty;
    /// call `show.reset()` to load the photos.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: ServerConfig, metrics_handle: PrometheusHandle) -> Self {
        let broker = Broker::new(config.broker_config());
        let source = Arc::new(DirectorySource::new(config.photo_dir.clone()));
        let show = Arc::new(ShowController::new(source, broker.clone(), config.step_mode));
        let credentials = Arc::new(Credentials::from_config(&config.auth));

        Self {
            config: Arc::new(config),
            broker,
            show,
            credentials,
            metrics_handle,
        }
    }
}
