use std::collections::HashMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use anyhow::{Context, Result};
use toml::Value;
use log::{debug, info};
use crate::flow::FlowControlConfig;
use crate::queue::{BlockingQueue, BoundedQueue, ElasticQueue, QueueResult, ShutdownSignal};

/// Configuration storage - section_name -> key -> value
pub type Configuration = HashMap<String, HashMap<String, String>>;

/// Which queue implementation backs a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    Bounded,
    Elastic,
}

impl FromStr for QueueKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bounded" | "fixed" => Ok(QueueKind::Bounded),
            "elastic" | "dynamic" => Ok(QueueKind::Elastic),
            _ => Err(format!("Invalid queue kind: {}. Valid options: bounded, elastic", s)),
        }
    }
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueKind::Bounded => write!(f, "bounded"),
            QueueKind::Elastic => write!(f, "elastic"),
        }
    }
}

/// `[queue]` section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSettings {
    pub kind: QueueKind,
    /// Fixed capacity, or initial capacity for an elastic queue
    pub capacity: i64,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            kind: QueueKind::Bounded,
            capacity: 5,
        }
    }
}

impl QueueSettings {
    /// Build the configured queue observing `signal`
    pub fn build<T: Send + 'static>(
        &self,
        signal: ShutdownSignal,
    ) -> QueueResult<Arc<dyn BlockingQueue<T>>> {
        let queue: Arc<dyn BlockingQueue<T>> = match self.kind {
            QueueKind::Bounded => Arc::new(BoundedQueue::with_shutdown(self.capacity, signal)?),
            QueueKind::Elastic => Arc::new(ElasticQueue::with_shutdown(self.capacity, signal)?),
        };
        Ok(queue)
    }
}

/// `[server]` section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub address: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8888".to_string(),
        }
    }
}

/// `[demo]` section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoSettings {
    pub producers: usize,
    pub consumers: usize,
    pub items_per_producer: usize,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            producers: 2,
            consumers: 2,
            items_per_producer: 20,
        }
    }
}

/// Configuration manager
pub struct ConfigManager {
    config: Configuration,
    config_file_path: Option<PathBuf>,
    selected_section: Option<String>,
}

impl ConfigManager {
    /// Create a new ConfigManager from a Configuration (primarily for testing)
    pub fn from_config(config: Configuration) -> Self {
        Self {
            config,
            config_file_path: None,
            selected_section: None,
        }
    }

    /// Load configuration using discovery hierarchy
    pub fn load() -> Result<Self> {
        debug!("Starting configuration discovery");

        for path in discover_config_files() {
            debug!("Attempting to load config from: {}", path.display());
            if path.exists() {
                return Self::load_from_file(path);
            }
        }

        info!("No configuration file found, using defaults");
        Ok(Self::from_config(Configuration::new()))
    }

    /// Load configuration from explicit file path
    pub fn load_from_file(path: PathBuf) -> Result<Self> {
        debug!("Loading configuration from file: {}", path.display());

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = parse_toml_config(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        info!("Loaded configuration from: {}", path.display());
        Ok(Self {
            config,
            config_file_path: Some(path),
            selected_section: None,
        })
    }

    /// File the configuration came from, if any
    pub fn config_file_path(&self) -> Option<&PathBuf> {
        self.config_file_path.as_ref()
    }

    /// Get value from configuration with section fallback
    pub fn get_value(&self, section: &str, key: &str) -> Option<&String> {
        // Priority: selected_section -> specified section -> base
        if let Some(selected) = &self.selected_section {
            if let Some(value) = self.config.get(selected).and_then(|s| s.get(key)) {
                return Some(value);
            }
        }

        if let Some(value) = self.config.get(section).and_then(|s| s.get(key)) {
            return Some(value);
        }

        self.config.get("base").and_then(|s| s.get(key))
    }

    /// Select configuration section for --config-name
    pub fn select_section(&mut self, section: String) {
        debug!("Selecting configuration section: {}", section);
        self.selected_section = Some(section);
    }

    /// Get boolean value with type conversion
    pub fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>> {
        match self.get_value(section, key) {
            Some(value) => match value.to_lowercase().as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                _ => Err(anyhow::anyhow!("Invalid boolean value for {}.{}: {}", section, key, value)),
            },
            None => Ok(None),
        }
    }

    /// Get any value parseable with `FromStr`
    pub fn get_parsed<T>(&self, section: &str, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.get_value(section, key) {
            Some(value) => value
                .parse::<T>()
                .map(Some)
                .map_err(|e| anyhow::anyhow!("Invalid value for {}.{}: {} ({})", section, key, value, e)),
            None => Ok(None),
        }
    }

    /// Get log level value with type conversion
    pub fn get_log_level(&self, section: &str, key: &str) -> Result<Option<log::LevelFilter>> {
        match self.get_value(section, key) {
            Some(value) => Ok(Some(crate::logging::parse_log_level(value)?)),
            None => Ok(None),
        }
    }

    /// Get path value with type conversion
    pub fn get_path(&self, section: &str, key: &str) -> Option<PathBuf> {
        self.get_value(section, key).map(PathBuf::from)
    }

    /// Queue kind and capacity
    pub fn get_queue_config(&self) -> Result<QueueSettings> {
        let mut settings = QueueSettings::default();

        if let Some(kind) = self.get_parsed::<QueueKind>("queue", "kind")? {
            settings.kind = kind;
        }
        if let Some(capacity) = self.get_parsed::<i64>("queue", "capacity")? {
            settings.capacity = capacity;
        }

        if settings.capacity < 1 {
            return Err(anyhow::anyhow!("Invalid queue.capacity: {} (must be at least 1)", settings.capacity));
        }
        Ok(settings)
    }

    /// Producer/consumer timing policy
    pub fn get_flow_config(&self) -> Result<FlowControlConfig> {
        let mut config = FlowControlConfig::default();

        if let Some(value) = self.get_parsed::<u64>("flow", "probe-interval-ms")? {
            config.probe_interval_ms = value;
        }
        if let Some(value) = self.get_parsed::<u64>("flow", "probe-window-ms")? {
            config.probe_window_ms = value;
        }
        if let Some(value) = self.get_parsed::<u64>("flow", "wait-slice-ms")? {
            config.wait_slice_ms = value;
        }
        if let Some(value) = self.get_parsed::<u64>("flow", "status-interval-ms")? {
            config.status_interval_ms = value;
        }
        if let Some(value) = self.get_bool("flow", "drain-on-shutdown")? {
            config.drain_on_shutdown = value;
        }

        config.validate()
            .map_err(|e| anyhow::anyhow!("Flow configuration validation failed: {}", e))?;
        Ok(config)
    }

    /// Address the queue server listens on and the client connects to
    pub fn get_server_config(&self) -> Result<ServerSettings> {
        let mut settings = ServerSettings::default();
        if let Some(address) = self.get_value("server", "address") {
            settings.address = address.clone();
        }
        Ok(settings)
    }

    /// Worker counts for the demo pipeline
    pub fn get_demo_config(&self) -> Result<DemoSettings> {
        let mut settings = DemoSettings::default();

        if let Some(value) = self.get_parsed::<usize>("demo", "producers")? {
            settings.producers = value;
        }
        if let Some(value) = self.get_parsed::<usize>("demo", "consumers")? {
            settings.consumers = value;
        }
        if let Some(value) = self.get_parsed::<usize>("demo", "items-per-producer")? {
            settings.items_per_producer = value;
        }

        if settings.consumers == 0 {
            return Err(anyhow::anyhow!("Invalid demo.consumers: at least one consumer is required"));
        }
        Ok(settings)
    }
}

/// Discover configuration files in order of precedence
fn discover_config_files() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // 1. Environment variable $FLOWQ_CONFIG
    if let Ok(env_path) = env::var("FLOWQ_CONFIG") {
        paths.push(PathBuf::from(env_path));
    }

    // 2. XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("flowq").join("config.toml"));
    }

    // 3. Home directory
    if let Some(home_dir) = dirs::home_dir() {
        paths.push(home_dir.join(".flowq.toml"));
    }

    // 4. Project local
    paths.push(PathBuf::from("./.flowq.toml"));

    debug!("Config discovery paths: {:?}", paths);
    paths
}

/// Parse TOML content to string-based configuration
fn parse_toml_config(content: &str) -> Result<Configuration> {
    let table: toml::Table = content.parse()
        .context("Failed to parse TOML content")?;

    let mut config = Configuration::new();
    flatten_toml_table(&table, String::new(), &mut config);

    debug!("Parsed configuration: {:?}", config);
    Ok(config)
}

/// Recursively flatten TOML tables into section.subsection format
fn flatten_toml_table(table: &toml::Table, prefix: String, config: &mut Configuration) {
    for (key, value) in table {
        let section_name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            Value::Table(subtable) if subtable.values().any(|v| matches!(v, Value::Table(_))) => {
                flatten_toml_table(subtable, section_name, config);
            }
            Value::Table(subtable) => {
                let section_map = subtable
                    .iter()
                    .map(|(subkey, subvalue)| (subkey.clone(), toml_value_to_string(subvalue)))
                    .collect();
                config.insert(section_name, section_map);
            }
            _ => {
                // top-level keys land in [base]
                config
                    .entry("base".to_string())
                    .or_default()
                    .insert(key.clone(), toml_value_to_string(value));
            }
        }
    }
}

/// Convert TOML Value to string representation
fn toml_value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Datetime(d) => d.to_string(),
        Value::Array(_) | Value::Table(_) => value.to_string(),
    }
}
