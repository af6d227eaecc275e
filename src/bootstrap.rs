//! Bootstrap: configuration, modules, logic and the HTTP server wired up in
//! one call.

use crate::config::{self, DEFAULT_CONFIG_FILE};
use crate::core::Core;
use crate::error::BootstrapError;
use crate::logger;
use crate::logic::{discover_logic, load_sources, HandlerSet, LogicBlock, LogicSource};
use crate::server::{HttpModule, HttpOptions};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

/// Setup step run against the mutable `Core` before logic is loaded.
pub type Module = Box<dyn FnOnce(&mut Core) -> Result<(), BootstrapError> + Send>;

/// Inputs to [`bootstrap`].
///
/// With no `logic`, logic files are discovered under `root` (the current
/// directory when unset) and bound to `handlers`. With no `config`, settings
/// are loaded from `aeri.toml` and `AERI__*` environment variables.
#[derive(Default)]
pub struct BootstrapOptions {
    pub logic: Option<Vec<LogicSource>>,
    pub config: Option<::config::Config>,
    pub http: HttpOptions,
    pub modules: Vec<Module>,
    pub handlers: HandlerSet,
    pub root: Option<PathBuf>,
}

impl BootstrapOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn logic(mut self, block: LogicBlock) -> Self {
        self.logic
            .get_or_insert_with(Vec::new)
            .push(LogicSource::Inline(block));
        self
    }

    #[must_use]
    pub fn logic_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.logic
            .get_or_insert_with(Vec::new)
            .push(LogicSource::File(path.into()));
        self
    }

    #[must_use]
    pub fn config(mut self, settings: ::config::Config) -> Self {
        self.config = Some(settings);
        self
    }

    #[must_use]
    pub fn http(mut self, options: HttpOptions) -> Self {
        self.http = options;
        self
    }

    #[must_use]
    pub fn module<F>(mut self, module: F) -> Self
    where
        F: FnOnce(&mut Core) -> Result<(), BootstrapError> + Send + 'static,
    {
        self.modules.push(Box::new(module));
        self
    }

    #[must_use]
    pub fn handlers(mut self, handlers: HandlerSet) -> Self {
        self.handlers = handlers;
        self
    }

    #[must_use]
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }
}

/// A running microservice.
pub struct App {
    core: Arc<Core>,
    http: Option<HttpModule>,
}

impl App {
    pub fn core(&self) -> &Arc<Core> {
        &self.core
    }

    /// `None` when HTTP is disabled or no route was declared
    pub fn http(&self) -> Option<&HttpModule> {
        self.http.as_ref()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.http.as_ref().and_then(HttpModule::local_addr)
    }

    pub fn shutdown(&mut self) {
        if let Some(http) = self.http.as_mut() {
            http.shutdown();
        }
    }

    /// Serve until the server task ends
    pub async fn wait(&mut self) {
        if let Some(http) = self.http.as_mut() {
            http.wait().await;
        }
    }
}

/// Build the core, run modules, load logic and start the HTTP server when
/// at least one block declares routes.
pub async fn bootstrap(options: BootstrapOptions) -> Result<App, BootstrapError> {
    let BootstrapOptions {
        logic,
        config: settings,
        http: http_options,
        modules,
        handlers,
        root,
    } = options;

    let settings = match settings {
        Some(settings) => settings,
        None => config::load_from(DEFAULT_CONFIG_FILE)?,
    };
    let mut core = Core::new(settings)?;

    if let Err(e) = logger::init(&core.config().logging) {
        logger::log_warning(&format!("[Aeri] Failed to open log file: {e}"));
    }

    let enabled = http_options.enabled.unwrap_or(core.config().http.enabled);
    let mut http = enabled.then(|| {
        let mut module = HttpModule::new();
        module.initialize(&core, &http_options);
        module
    });

    for module in modules {
        module(&mut core)?;
    }

    let blocks = match logic {
        Some(sources) => load_sources(sources, &handlers),
        None => {
            let root = root
                .or_else(|| std::env::current_dir().ok())
                .unwrap_or_else(|| PathBuf::from("."));
            discover_logic(&root, &handlers)
        }
    };
    for block in blocks {
        core.add_logic(block);
    }

    let core = Arc::new(core);
    if let Some(module) = http.as_mut() {
        if core.has_http_routes() {
            module.start(Arc::clone(&core)).await?;
        } else {
            logger::log_info(
                "[Aeri][HTTP] No HTTP routes found in logic, skipping HTTP server startup.",
            );
        }
    }

    logger::log_info("[Aeri] Microservice started!");
    Ok(App { core, http })
}
