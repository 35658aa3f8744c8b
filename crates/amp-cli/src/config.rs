use crate::cli::EngineArgs;
use crate::error::{CliError, Result};
use maxent_amp::core::models::layer::Layer;
use maxent_amp::engine::config::{Config, ConfigBuilder, OptionKey};
use maxent_amp::engine::runner::ProcessEngine;
use maxent_amp::service::{MaxEntService, ServiceOptions};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const DEFAULT_JAVA: &str = "java";

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialWorkspaceConfig {
    path: Option<PathBuf>,
    layers: Option<Vec<PathBuf>>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialEngineConfig {
    java: Option<PathBuf>,
    jar: Option<PathBuf>,
    #[serde(rename = "timeout-secs")]
    timeout_secs: Option<u64>,
    #[serde(rename = "keep-temp-files")]
    keep_temp_files: Option<bool>,
}

/// The configuration file as written, every field optional.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialRunConfig {
    workspace: Option<PartialWorkspaceConfig>,
    engine: Option<PartialEngineConfig>,
    #[serde(default)]
    options: BTreeMap<String, toml::Value>,
}

/// Fully resolved settings for one command.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub workspace: PathBuf,
    pub layers: Vec<Layer>,
    pub java: PathBuf,
    pub jar: PathBuf,
    pub service_options: ServiceOptions,
    pub engine_options: BTreeMap<OptionKey, String>,
}

impl RunSettings {
    pub fn service(&self) -> MaxEntService {
        let engine = ProcessEngine::maxent_jar(self.java.clone(), &self.jar);
        MaxEntService::with_options(engine, self.service_options.clone())
    }

    /// The engine options and layers as a library configuration rooted at the workspace.
    pub fn engine_config(&self) -> Result<Config> {
        let mut builder = ConfigBuilder::new(&self.workspace)?;
        for (key, value) in &self.engine_options {
            builder = builder.add_option(*key, value.as_str())?;
        }
        Ok(builder.add_layers(&self.layers).build())
    }
}

impl PartialRunConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Reads the file named by `--config`, or starts empty.
    pub fn load(args: &EngineArgs) -> Result<Self> {
        match &args.config {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn merge_with_cli(mut self, args: &EngineArgs) -> Result<RunSettings> {
        self.apply_set_values(&args.set_values)?;

        let ws_config = self.workspace.take().unwrap_or_default();
        let engine_config = self.engine.take().unwrap_or_default();

        let workspace = args.workspace.clone().or(ws_config.path).ok_or_else(|| {
            CliError::Config(
                "A workspace directory is required either in the config file (`workspace.path`) or via --workspace.".to_string(),
            )
        })?;

        let layers: Vec<Layer> = if args.layers.is_empty() {
            ws_config.layers.unwrap_or_default()
        } else {
            args.layers.clone()
        }
        .into_iter()
        .map(Layer::from)
        .collect();

        let java = args
            .java
            .clone()
            .or(engine_config.java)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_JAVA));
        let jar = args.jar.clone().or(engine_config.jar).ok_or_else(|| {
            CliError::Config(
                "The engine jar is required either in the config file (`engine.jar`) or via --jar.".to_string(),
            )
        })?;

        let mut service_options = ServiceOptions::default();
        match args.timeout_secs.or(engine_config.timeout_secs) {
            Some(0) => service_options.engine_timeout = None,
            Some(secs) => service_options.engine_timeout = Some(Duration::from_secs(secs)),
            None => {}
        }
        service_options.keep_temp_files =
            args.keep_temp_files || engine_config.keep_temp_files.unwrap_or(false);

        let mut engine_options = BTreeMap::new();
        for (name, value) in &self.options {
            let key: OptionKey = name.parse()?;
            engine_options.insert(key, option_value(name, value)?);
        }

        Ok(RunSettings {
            workspace,
            layers,
            java,
            jar,
            service_options,
            engine_options,
        })
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };

            match key {
                "workspace.path" => {
                    self.workspace.get_or_insert_with(Default::default).path =
                        Some(PathBuf::from(value_str));
                }
                "engine.java" => {
                    self.engine.get_or_insert_with(Default::default).java =
                        Some(PathBuf::from(value_str));
                }
                "engine.jar" => {
                    self.engine.get_or_insert_with(Default::default).jar =
                        Some(PathBuf::from(value_str));
                }
                "engine.timeout-secs" => {
                    self.engine.get_or_insert_with(Default::default).timeout_secs =
                        Some(value_str.parse().map_err(|_| {
                            CliError::Config(format!(
                                "Invalid integer value for {}: {}",
                                key, value_str
                            ))
                        })?);
                }
                "engine.keep-temp-files" => {
                    self.engine.get_or_insert_with(Default::default).keep_temp_files =
                        Some(value_str.parse().map_err(|_| {
                            CliError::Config(format!(
                                "Invalid boolean value for {}: {}",
                                key, value_str
                            ))
                        })?);
                }
                _ => match key.strip_prefix("options.") {
                    Some(name) if !name.is_empty() => {
                        self.options
                            .insert(name.to_string(), toml::Value::String(value_str.to_string()));
                    }
                    _ => {
                        return Err(CliError::Config(format!(
                            "Unsupported configuration key for --set: '{}'",
                            key
                        )));
                    }
                },
            }
        }
        Ok(())
    }
}

fn option_value(name: &str, value: &toml::Value) -> Result<String> {
    match value {
        toml::Value::String(s) => Ok(s.clone()),
        toml::Value::Integer(i) => Ok(i.to_string()),
        toml::Value::Float(f) => Ok(f.to_string()),
        toml::Value::Boolean(b) => Ok(b.to_string()),
        other => Err(CliError::Config(format!(
            "Unsupported value for engine option '{}': {}",
            name, other
        ))),
    }
}
