// ABOUTME: Lazily (re)connecting handle to the container engine.
// ABOUTME: Verifies liveness on every use and drops the client when the engine stops answering.

use super::error::{ConnectionFailure, EngineError};
use super::throttle::LogThrottle;
use super::traits::{Engine, EngineConnector};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Owns the engine client and classifies reachability.
pub struct EngineConnection {
    connector: Arc<dyn EngineConnector>,
    client: Mutex<Option<Arc<dyn Engine>>>,
    throttle: LogThrottle<ConnectionFailure>,
}

impl EngineConnection {
    pub fn new(connector: Arc<dyn EngineConnector>) -> Self {
        Self::with_log_window(connector, super::throttle::DEFAULT_LOG_WINDOW)
    }

    /// Like [`EngineConnection::new`] with a custom window between repeated failure logs.
    pub fn with_log_window(connector: Arc<dyn EngineConnector>, window: Duration) -> Self {
        Self {
            connector,
            client: Mutex::new(None),
            throttle: LogThrottle::new(window),
        }
    }

    /// A client that answered a liveness query just now.
    ///
    /// The client is built on first use or after a failure. If the liveness
    /// query fails the cached client is discarded so the next call rebuilds it.
    pub async fn client(&self) -> Result<Arc<dyn Engine>, EngineError> {
        let cached = self.client.lock().clone();
        let (client, fresh) = match cached {
            Some(client) => (client, false),
            None => match self.connector.connect() {
                Ok(client) => (client, true),
                Err(e) => {
                    self.log_failure(ConnectionFailure::Create, &e);
                    return Err(EngineError::Connection(e.to_string()));
                }
            },
        };

        if let Err(e) = client.version().await {
            self.log_failure(ConnectionFailure::Query, &e);
            *self.client.lock() = None;
            return Err(EngineError::Connection(e.to_string()));
        }

        if fresh {
            info!("connection to engine (re)established");
            *self.client.lock() = Some(client.clone());
        }
        Ok(client)
    }

    /// Whether the engine answers right now.
    pub async fn is_reachable(&self) -> bool {
        self.client().await.is_ok()
    }

    fn log_failure(&self, class: ConnectionFailure, error: &EngineError) {
        if let Some(suppressed) = self.throttle.admit(class) {
            if suppressed > 0 {
                warn!(%error, suppressed, "{} (repeated)", class.describe());
            } else {
                warn!(%error, "{}", class.describe());
            }
        }
    }
}
