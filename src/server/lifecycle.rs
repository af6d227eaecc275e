// Lifecycle module
// Owns the HTTP server state machine: initialize once, bind with
// port-in-use retry, serve until shut down

use super::connection::accept_loop;
use super::listener::create_listener;
use super::service::HttpApp;
use crate::core::Core;
use crate::error::BindError;
use crate::logger;
use crate::routing::build_routes;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Uninitialized,
    Initialized,
    Listening,
}

/// Per-call overrides of the `http.*` settings.
#[derive(Debug, Clone, Default)]
pub struct HttpOptions {
    pub port: Option<u16>,
    pub host: Option<String>,
    pub enabled: Option<bool>,
}

impl HttpOptions {
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    #[must_use]
    pub fn host(mut self, host: &str) -> Self {
        self.host = Some(host.to_string());
        self
    }

    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }
}

/// The HTTP server of one microservice.
///
/// `uninitialized -> initialized` happens once in [`HttpModule::initialize`];
/// `initialized -> listening` on the first successful bind. A port that is
/// already taken keeps the module `initialized` while it moves on to the
/// next port.
#[derive(Debug)]
pub struct HttpModule {
    state: ServerState,
    host: String,
    port: u16,
    retry_delay: Duration,
    max_port_retries: Option<u32>,
    occupied_ports: Vec<u16>,
    local_addr: Option<SocketAddr>,
    task: Option<JoinHandle<()>>,
}

impl Default for HttpModule {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpModule {
    pub const fn new() -> Self {
        Self {
            state: ServerState::Uninitialized,
            host: String::new(),
            port: 0,
            retry_delay: Duration::ZERO,
            max_port_retries: None,
            occupied_ports: Vec::new(),
            local_addr: None,
            task: None,
        }
    }

    /// Record the effective host and port. Repeated calls are no-ops.
    pub fn initialize(&mut self, core: &Core, options: &HttpOptions) {
        if self.state != ServerState::Uninitialized {
            logger::log_debug("[Aeri][HTTP] Already initialized");
            return;
        }

        let http = &core.config().http;
        self.host = options.host.clone().unwrap_or_else(|| http.host.clone());
        self.port = options.port.unwrap_or(http.port);
        self.retry_delay = Duration::from_millis(http.retry_delay_ms);
        self.max_port_retries = http.max_port_retries;
        self.state = ServerState::Initialized;
    }

    /// Bind and start serving the routes built from `core`'s logic.
    ///
    /// Does nothing unless the module was initialized and is not already
    /// listening. A port in use is retried on `port + 1` after
    /// `http.retry_delay_ms`, without limit unless `http.max_port_retries`
    /// is set. Any other bind error is returned immediately.
    pub async fn start(&mut self, core: Arc<Core>) -> Result<(), BindError> {
        match self.state {
            ServerState::Uninitialized => {
                logger::log_warning("[Aeri] HTTP not initialized. Cannot start server.");
                return Ok(());
            }
            ServerState::Listening => return Ok(()),
            ServerState::Initialized => {}
        }

        let routes = build_routes(core.logic());
        let listener = self.bind_with_retry().await?;
        let addr = listener.local_addr()?;
        logger::log_server_listening(&addr);

        let app = Arc::new(HttpApp::new(core, routes));
        self.task = Some(tokio::spawn(accept_loop(listener, app)));
        self.local_addr = Some(addr);
        self.state = ServerState::Listening;
        Ok(())
    }

    async fn bind_with_retry(&mut self) -> Result<TcpListener, BindError> {
        let first = self.port;
        let mut attempts: u32 = 0;

        loop {
            let addr = self.resolve().await?;
            match create_listener(addr) {
                Ok(listener) => return Ok(listener),
                Err(e) if e.kind() == ErrorKind::AddrInUse => {
                    attempts = attempts.saturating_add(1);
                    if self.max_port_retries.is_some_and(|max| attempts > max) {
                        let err = BindError::RetryLimit { first, attempts };
                        logger::log_start_failed(&err);
                        return Err(err);
                    }
                    let Some(next) = self.port.checked_add(1) else {
                        let err = BindError::PortExhausted(self.port);
                        logger::log_start_failed(&err);
                        return Err(err);
                    };

                    logger::log_port_in_use(self.port, next);
                    self.occupied_ports.push(self.port);
                    tokio::time::sleep(self.retry_delay).await;
                    self.port = next;
                }
                Err(e) => {
                    logger::log_start_failed(&e);
                    return Err(BindError::Io(e));
                }
            }
        }
    }

    async fn resolve(&self) -> Result<SocketAddr, BindError> {
        let invalid = || BindError::InvalidAddress(format!("{}:{}", self.host, self.port));
        let mut addrs = tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|e| {
                logger::log_start_failed(&e);
                invalid()
            })?;
        addrs.next().ok_or_else(invalid)
    }

    pub const fn state(&self) -> ServerState {
        self.state
    }

    pub fn is_started(&self) -> bool {
        self.state == ServerState::Listening
    }

    /// Port the next bind attempt will use (the bound one once listening)
    pub const fn port(&self) -> u16 {
        self.port
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub const fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Ports found in use, in the order they were tried
    pub fn occupied_ports(&self) -> &[u16] {
        &self.occupied_ports
    }

    /// Stop accepting connections. In-flight requests are not cancelled.
    pub fn shutdown(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            logger::log_info("[Aeri][HTTP] Server stopped");
        }
        self.local_addr = None;
        if self.state == ServerState::Listening {
            self.state = ServerState::Initialized;
        }
    }

    /// Wait for the accept loop to end
    pub async fn wait(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    logger::log_error(&format!("[Aeri][HTTP] Server task failed: {e}"));
                }
            }
        }
    }
}
