//! Logic discovery: builds logic blocks from declarative files plus a set of
//! compiled handlers bound by name.
//!
//! Looked up under a root directory, in this order:
//! - `logic.toml`, `logic.json`
//! - every `*.toml` / `*.json` file in `logic/`, sorted by file name
//!
//! A source that fails to load is logged and skipped.

use super::block::{
    is_reserved, LogicBlock, LogicValue, EVENTS_KEY, HTTP_KEY, HTTP_KEY_ALT, JOB_KEY, RPC_KEY,
};
use super::route_config::HttpRouteConfig;
use crate::error::LogicLoadError;
use crate::handler::{IntoHandler, WorkerHandler};
use crate::logger;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

const ROOT_CANDIDATES: [&str; 2] = ["logic.toml", "logic.json"];
const LOGIC_DIR: &str = "logic";

/// Compiled handlers that file-declared routes can refer to by name.
#[derive(Debug, Clone, Default)]
pub struct HandlerSet {
    entries: Vec<(String, LogicValue)>,
}

impl HandlerSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn handler<Args>(mut self, name: &str, handler: impl IntoHandler<Args>) -> Self {
        self.push(name, LogicValue::Handler(handler.into_handler()));
        self
    }

    #[must_use]
    pub fn worker(mut self, name: &str, handler: WorkerHandler) -> Self {
        self.push(name, LogicValue::Worker(handler));
        self
    }

    fn push(&mut self, name: &str, value: LogicValue) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Where a logic block comes from.
#[derive(Debug, Clone)]
pub enum LogicSource {
    Inline(LogicBlock),
    File(PathBuf),
}

impl From<LogicBlock> for LogicSource {
    fn from(block: LogicBlock) -> Self {
        Self::Inline(block)
    }
}

impl From<PathBuf> for LogicSource {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

/// Scan `root` for logic files and load each one.
pub fn discover_logic(root: &Path, handlers: &HandlerSet) -> Vec<LogicBlock> {
    let files = candidate_files(root);
    if files.is_empty() {
        logger::log_warning(
            "[Aeri] No business logic found. Create a logic.toml or logic.json file or put logic files inside the logic/ folder.",
        );
        return Vec::new();
    }
    load_sources(files.into_iter().map(LogicSource::File), handlers)
}

/// Resolve explicit sources in order, skipping the ones that fail.
pub fn load_sources(
    sources: impl IntoIterator<Item = LogicSource>,
    handlers: &HandlerSet,
) -> Vec<LogicBlock> {
    let mut blocks = Vec::new();
    for source in sources {
        match source {
            LogicSource::Inline(block) => {
                logger::log_info("[Aeri] Loaded inline logic object");
                blocks.push(block);
            }
            LogicSource::File(path) => match load_logic_file(&path, handlers) {
                Ok(block) => {
                    logger::log_info(&format!("[Aeri] Loaded logic from {}", path.display()));
                    blocks.push(block);
                }
                Err(e) => {
                    logger::log_warning(&format!("[Aeri] Could not load logic file: {e}"));
                }
            },
        }
    }
    blocks
}

/// Files to load under `root`, in load order
pub fn candidate_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = ROOT_CANDIDATES
        .iter()
        .map(|name| root.join(name))
        .filter(|path| path.is_file())
        .collect();

    let dir = root.join(LOGIC_DIR);
    if let Ok(read_dir) = fs::read_dir(&dir) {
        let mut nested: Vec<PathBuf> = read_dir
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_logic_file(path))
            .collect();
        nested.sort();
        files.extend(nested);
    }
    files
}

fn is_logic_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("toml" | "json")
    )
}

/// Load one file into a block bound to `handlers`.
pub fn load_logic_file(path: &Path, handlers: &HandlerSet) -> Result<LogicBlock, LogicLoadError> {
    let content = fs::read_to_string(path).map_err(|source| LogicLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let parsed: Value = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&content).map_err(|e| parse_error(path, e))?,
        _ => toml::from_str(&content).map_err(|e| parse_error(path, e))?,
    };

    let Value::Object(document) = parsed else {
        return Err(shape_error(path, "top level must be a table/object"));
    };

    let label = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("logic")
        .to_string();
    let mut block = LogicBlock::named(label);

    for (key, value) in &document {
        if !is_reserved(key) {
            block.insert(key, LogicValue::Data(value.clone()));
        }
    }
    for (name, value) in &handlers.entries {
        block.insert(name, value.clone());
    }

    for key in [HTTP_KEY, HTTP_KEY_ALT] {
        if let Some(routes) = document.get(key) {
            apply_routes(&mut block, path, key, routes)?;
        }
    }
    if let Some(names) = document.get(RPC_KEY) {
        block = block.rpc(string_list(path, RPC_KEY, names)?);
    }
    if let Some(names) = document.get(JOB_KEY) {
        block = block.jobs(string_list(path, JOB_KEY, names)?);
    }
    if let Some(events) = document.get(EVENTS_KEY) {
        block = apply_events(block, path, events)?;
    }

    Ok(block)
}

fn apply_routes(
    block: &mut LogicBlock,
    path: &Path,
    key: &str,
    routes: &Value,
) -> Result<(), LogicLoadError> {
    let Value::Object(routes) = routes else {
        return Err(shape_error(path, &format!("{key} must be a table of routes")));
    };
    for (name, config) in routes {
        let config: HttpRouteConfig = serde_json::from_value(config.clone())
            .map_err(|e| shape_error(path, &format!("{key}.{name}: {e}")))?;
        block.set_route(name, config);
    }
    Ok(())
}

fn apply_events(
    mut block: LogicBlock,
    path: &Path,
    events: &Value,
) -> Result<LogicBlock, LogicLoadError> {
    let Value::Object(events) = events else {
        return Err(shape_error(path, "_events must be a table"));
    };
    for (event, handlers) in events {
        let names = string_list(path, &format!("{EVENTS_KEY}.{event}"), handlers)?;
        block = block.event(event, names);
    }
    Ok(block)
}

fn string_list(path: &Path, key: &str, value: &Value) -> Result<Vec<String>, LogicLoadError> {
    let list = value
        .as_array()
        .ok_or_else(|| shape_error(path, &format!("{key} must be a list of names")))?;
    list.iter()
        .map(|item| {
            item.as_str()
                .map(ToString::to_string)
                .ok_or_else(|| shape_error(path, &format!("{key} must only contain strings")))
        })
        .collect()
}

fn parse_error(path: &Path, err: impl std::fmt::Display) -> LogicLoadError {
    LogicLoadError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

fn shape_error(path: &Path, message: &str) -> LogicLoadError {
    LogicLoadError::Shape {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;
    use serde_json::json;

    fn handlers() -> HandlerSet {
        HandlerSet::new()
            .handler("hello", Handler::sync(|| json!({"message": "hi"})))
            .handler("bye", Handler::sync(|| json!({"message": "bye"})))
    }

    #[test]
    fn test_load_toml_preserves_route_order() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("logic.toml");
        fs::write(
            &file,
            r#"
version = "1"
_rpc = ["hello"]

[_http.hello]
method = "get"
path = "/hello"

[_http.bye]

[_events]
"user.left" = ["bye"]
"#,
        )
        .unwrap();

        let block = load_logic_file(&file, &handlers()).unwrap();
        let routes = block.http_routes().unwrap();
        assert_eq!(routes[0].0, "hello");
        assert_eq!(routes[0].1.path.as_deref(), Some("/hello"));
        assert_eq!(routes[1].0, "bye");
        assert_eq!(routes[1].1.path, None);
        assert!(block.http_handler("hello").is_some());
        assert!(matches!(block.get("version"), Some(LogicValue::Data(v)) if v == "1"));
        assert_eq!(block.rpc_names().unwrap(), ["hello".to_string()]);
        assert_eq!(block.events().unwrap()[0].0, "user.left");
        assert_eq!(block.label(), Some("logic"));
    }

    #[test]
    fn test_load_json_with_alt_key() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("greetings.json");
        fs::write(&file, r#"{"@http": {"hello": {"method": "post"}}}"#).unwrap();

        let block = load_logic_file(&file, &handlers()).unwrap();
        let routes = block.http_routes().unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].1.method.as_deref(), Some("post"));
    }

    #[test]
    fn test_handlers_shadow_file_data() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("logic.json");
        fs::write(&file, r#"{"hello": "not a function"}"#).unwrap();

        let block = load_logic_file(&file, &handlers()).unwrap();
        assert!(block.http_handler("hello").is_some());
    }

    #[test]
    fn test_shape_errors() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bad.json");
        fs::write(&file, r#"{"_http": ["hello"]}"#).unwrap();
        assert!(matches!(
            load_logic_file(&file, &handlers()),
            Err(LogicLoadError::Shape { .. })
        ));

        fs::write(&file, "[1, 2]").unwrap();
        assert!(matches!(
            load_logic_file(&file, &handlers()),
            Err(LogicLoadError::Shape { .. })
        ));
    }

    #[test]
    fn test_discover_order_and_skip_broken() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join(LOGIC_DIR)).unwrap();
        fs::write(root.join("logic.json"), r#"{"_http": {"hello": {}}}"#).unwrap();
        fs::write(root.join("logic/b.toml"), "[_http.bye]\n").unwrap();
        fs::write(root.join("logic/a.toml"), "[_http.hello]\npath = \"/a\"\n").unwrap();
        fs::write(root.join("logic/broken.toml"), "[[[").unwrap();
        fs::write(root.join("logic/notes.txt"), "ignored").unwrap();

        let files = candidate_files(root);
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["logic.json", "a.toml", "b.toml", "broken.toml"]);

        let blocks = discover_logic(root, &handlers());
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[1].label(), Some("a"));
    }

    #[test]
    fn test_discover_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_logic(dir.path(), &handlers()).is_empty());
    }

    #[test]
    fn test_load_sources_skips_missing_file() {
        let blocks = load_sources(
            vec![
                LogicSource::File(PathBuf::from("/nonexistent/logic.toml")),
                LogicSource::from(LogicBlock::named("inline")),
            ],
            &HandlerSet::new(),
        );
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].label(), Some("inline"));
    }
}
