use crate::core::models::layer::Layer;
use crate::core::workspace::{Workspace, WorkspaceError};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    InvalidWorkspace(#[from] WorkspaceError),
}

/// How the engine interprets an option's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// `true`/`false`; may be set without a value.
    Flag,
    Integer,
    Number,
    Path,
    Choice(&'static [&'static str]),
}

/// Command-line options understood by the modeling engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OptionKey {
    SamplesFile,
    EnvironmentalLayers,
    OutputDirectory,
    ProjectionLayers,
    TestSamplesFile,
    RandomSeed,
    RandomTestPoints,
    Replicates,
    MaximumIterations,
    MaximumBackground,
    BetaMultiplier,
    ConvergenceThreshold,
    OutputFormat,
    JackKnife,
    ResponseCurves,
    Pictures,
    AutoRun,
    Visible,
    Warnings,
    AskOverwrite,
}

impl OptionKey {
    pub const ALL: [OptionKey; 20] = [
        OptionKey::SamplesFile,
        OptionKey::EnvironmentalLayers,
        OptionKey::OutputDirectory,
        OptionKey::ProjectionLayers,
        OptionKey::TestSamplesFile,
        OptionKey::RandomSeed,
        OptionKey::RandomTestPoints,
        OptionKey::Replicates,
        OptionKey::MaximumIterations,
        OptionKey::MaximumBackground,
        OptionKey::BetaMultiplier,
        OptionKey::ConvergenceThreshold,
        OptionKey::OutputFormat,
        OptionKey::JackKnife,
        OptionKey::ResponseCurves,
        OptionKey::Pictures,
        OptionKey::AutoRun,
        OptionKey::Visible,
        OptionKey::Warnings,
        OptionKey::AskOverwrite,
    ];

    /// The name the engine expects on its command line.
    pub fn name(self) -> &'static str {
        match self {
            OptionKey::SamplesFile => "samplesfile",
            OptionKey::EnvironmentalLayers => "environmentallayers",
            OptionKey::OutputDirectory => "outputdirectory",
            OptionKey::ProjectionLayers => "projectionlayers",
            OptionKey::TestSamplesFile => "testsamplesfile",
            OptionKey::RandomSeed => "randomseed",
            OptionKey::RandomTestPoints => "randomtestpoints",
            OptionKey::Replicates => "replicates",
            OptionKey::MaximumIterations => "maximumiterations",
            OptionKey::MaximumBackground => "maximumbackground",
            OptionKey::BetaMultiplier => "betamultiplier",
            OptionKey::ConvergenceThreshold => "convergencethreshold",
            OptionKey::OutputFormat => "outputformat",
            OptionKey::JackKnife => "jackknife",
            OptionKey::ResponseCurves => "responsecurves",
            OptionKey::Pictures => "pictures",
            OptionKey::AutoRun => "autorun",
            OptionKey::Visible => "visible",
            OptionKey::Warnings => "warnings",
            OptionKey::AskOverwrite => "askoverwrite",
        }
    }

    pub fn kind(self) -> OptionKind {
        match self {
            OptionKey::SamplesFile
            | OptionKey::EnvironmentalLayers
            | OptionKey::OutputDirectory
            | OptionKey::ProjectionLayers
            | OptionKey::TestSamplesFile => OptionKind::Path,
            OptionKey::RandomSeed
            | OptionKey::RandomTestPoints
            | OptionKey::Replicates
            | OptionKey::MaximumIterations
            | OptionKey::MaximumBackground => OptionKind::Integer,
            OptionKey::BetaMultiplier | OptionKey::ConvergenceThreshold => OptionKind::Number,
            OptionKey::OutputFormat => OptionKind::Choice(&["logistic", "cumulative", "raw"]),
            OptionKey::JackKnife
            | OptionKey::ResponseCurves
            | OptionKey::Pictures
            | OptionKey::AutoRun
            | OptionKey::Visible
            | OptionKey::Warnings
            | OptionKey::AskOverwrite => OptionKind::Flag,
        }
    }

    fn validate(self, value: &str) -> Result<(), ConfigError> {
        let invalid = |expected: &str| {
            ConfigError::InvalidArgument(format!(
                "Option '{}' expects {}, got '{}'",
                self.name(),
                expected,
                value
            ))
        };
        match self.kind() {
            OptionKind::Flag => match value {
                "true" | "false" => Ok(()),
                _ => Err(invalid("'true' or 'false'")),
            },
            OptionKind::Integer => value
                .parse::<i64>()
                .map(|_| ())
                .map_err(|_| invalid("an integer")),
            OptionKind::Number => value
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(|_| ())
                .ok_or_else(|| invalid("a finite number")),
            OptionKind::Path if value.trim().is_empty() => Err(invalid("a non-empty path")),
            OptionKind::Path => Ok(()),
            OptionKind::Choice(choices) if choices.iter().any(|c| *c == value) => Ok(()),
            OptionKind::Choice(choices) => Err(invalid(&format!("one of {choices:?}"))),
        }
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OptionKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        OptionKey::ALL
            .into_iter()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| ConfigError::InvalidArgument(format!("Unknown engine option '{s}'")))
    }
}

/// An immutable snapshot of one engine invocation's settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    workspace_dir: PathBuf,
    options: BTreeMap<OptionKey, String>,
    layers: Vec<Layer>,
}

impl Config {
    pub fn workspace_dir(&self) -> &Path {
        &self.workspace_dir
    }

    pub fn option(&self, key: OptionKey) -> Option<&str> {
        self.options.get(&key).map(String::as_str)
    }

    pub fn options(&self) -> &BTreeMap<OptionKey, String> {
        &self.options
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Renders the options as `name=value` tokens in key order. Flags set to `true` are
    /// rendered as the bare name.
    pub fn command_line(&self) -> Vec<String> {
        self.options
            .iter()
            .map(|(key, value)| match (key.kind(), value.as_str()) {
                (OptionKind::Flag, "true") => key.name().to_string(),
                _ => format!("{}={}", key.name(), value),
            })
            .collect()
    }
}

/// Builds a [`Config`] rooted at a validated workspace directory.
///
/// Adding an option that is already present replaces its value.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    workspace: Workspace,
    options: BTreeMap<OptionKey, String>,
    layers: Vec<Layer>,
}

impl ConfigBuilder {
    pub fn new(workspace_dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Ok(Self::with_workspace(Workspace::open(workspace_dir)?))
    }

    pub fn with_workspace(workspace: Workspace) -> Self {
        Self {
            workspace,
            options: BTreeMap::new(),
            layers: Vec::new(),
        }
    }

    /// Starts a new builder from an existing configuration, re-validating its workspace.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let mut builder = Self::new(&config.workspace_dir)?;
        builder.options = config.options.clone();
        builder.layers = config.layers.clone();
        Ok(builder)
    }

    pub fn add_option<'a>(
        mut self,
        key: impl Into<Option<OptionKey>>,
        value: impl Into<Option<&'a str>>,
    ) -> Result<Self, ConfigError> {
        let key = key
            .into()
            .ok_or_else(|| ConfigError::InvalidArgument("Option key was null".to_string()))?;
        let value = value.into().ok_or_else(|| {
            ConfigError::InvalidArgument(format!("Value for option '{key}' was null"))
        })?;
        key.validate(value)?;
        self.options.insert(key, value.to_string());
        Ok(self)
    }

    /// Sets a flag-style option to `true`.
    pub fn add_flag(self, key: impl Into<Option<OptionKey>>) -> Result<Self, ConfigError> {
        let key = key
            .into()
            .ok_or_else(|| ConfigError::InvalidArgument("Option key was null".to_string()))?;
        if key.kind() != OptionKind::Flag {
            return Err(ConfigError::InvalidArgument(format!(
                "Option '{key}' requires a value"
            )));
        }
        self.add_option(key, "true")
    }

    /// Adds an option by its command-line name. A missing value sets a flag.
    pub fn add_named_option(self, name: &str, value: Option<&str>) -> Result<Self, ConfigError> {
        let key: OptionKey = name.parse()?;
        match value {
            Some(value) => self.add_option(key, value),
            None => self.add_flag(key),
        }
    }

    /// Sets `key` only when no value is present yet.
    pub fn default_option(self, key: OptionKey, value: &str) -> Result<Self, ConfigError> {
        if self.options.contains_key(&key) {
            Ok(self)
        } else {
            self.add_option(key, value)
        }
    }

    pub fn add_layers<'a>(mut self, layers: impl IntoIterator<Item = &'a Layer>) -> Self {
        self.layers.extend(layers.into_iter().cloned());
        self
    }

    pub fn get_option(&self, key: OptionKey) -> Option<&str> {
        self.options.get(&key).map(String::as_str)
    }

    pub fn options(&self) -> &BTreeMap<OptionKey, String> {
        &self.options
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn build(&self) -> Config {
        Config {
            workspace_dir: self.workspace.path().to_path_buf(),
            options: self.options.clone(),
            layers: self.layers.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn builder() -> ConfigBuilder {
        ConfigBuilder::new(".").unwrap()
    }

    #[test]
    fn builder_accepts_current_directory() {
        assert!(ConfigBuilder::new(".").is_ok());
    }

    #[test]
    fn builder_rejects_bogus_workspace() {
        let result = ConfigBuilder::new("BOGUS PATH");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidWorkspace(WorkspaceError::Missing { .. }))
        ));
    }

    #[test]
    fn added_option_can_be_read_back() {
        let b = builder()
            .add_option(OptionKey::RandomSeed, "20")
            .unwrap()
            .add_flag(OptionKey::JackKnife)
            .unwrap();
        assert_eq!(b.get_option(OptionKey::RandomSeed), Some("20"));
        assert_eq!(b.get_option(OptionKey::JackKnife), Some("true"));
        assert_eq!(b.get_option(OptionKey::Replicates), None);
    }

    #[test]
    fn null_key_is_rejected() {
        assert!(matches!(
            builder().add_option(None, "20"),
            Err(ConfigError::InvalidArgument(_))
        ));
        assert!(matches!(
            builder().add_option(None, ""),
            Err(ConfigError::InvalidArgument(_))
        ));
        assert!(matches!(
            builder().add_option(None, None),
            Err(ConfigError::InvalidArgument(_))
        ));
        assert!(matches!(
            builder().add_flag(None),
            Err(ConfigError::InvalidArgument(_))
        ));
    }

    #[test]
    fn null_value_is_rejected() {
        assert!(matches!(
            builder().add_option(OptionKey::JackKnife, None),
            Err(ConfigError::InvalidArgument(_))
        ));
        assert!(matches!(
            builder().add_option(OptionKey::RandomSeed, None),
            Err(ConfigError::InvalidArgument(_))
        ));
    }

    #[test]
    fn re_adding_a_key_overwrites_the_previous_value() {
        let b = builder()
            .add_option(OptionKey::RandomSeed, "20")
            .unwrap()
            .add_option(OptionKey::RandomSeed, "7")
            .unwrap();
        assert_eq!(b.get_option(OptionKey::RandomSeed), Some("7"));
        assert_eq!(b.options().len(), 1);
    }

    #[test]
    fn values_are_checked_against_the_option_kind() {
        assert!(builder().add_option(OptionKey::RandomSeed, "twenty").is_err());
        assert!(builder().add_option(OptionKey::BetaMultiplier, "NaN").is_err());
        assert!(builder().add_option(OptionKey::BetaMultiplier, "1.5").is_ok());
        assert!(builder().add_option(OptionKey::OutputFormat, "raw").is_ok());
        assert!(builder().add_option(OptionKey::OutputFormat, "pretty").is_err());
        assert!(builder().add_option(OptionKey::JackKnife, "yes").is_err());
        assert!(builder().add_option(OptionKey::SamplesFile, " ").is_err());
    }

    #[test]
    fn flag_form_is_refused_for_valued_options() {
        assert!(matches!(
            builder().add_flag(OptionKey::SamplesFile),
            Err(ConfigError::InvalidArgument(_))
        ));
    }

    #[test]
    fn named_options_are_parsed_case_insensitively() {
        let b = builder()
            .add_named_option("RandomSeed", Some("3"))
            .unwrap()
            .add_named_option("responsecurves", None)
            .unwrap();
        assert_eq!(b.get_option(OptionKey::RandomSeed), Some("3"));
        assert_eq!(b.get_option(OptionKey::ResponseCurves), Some("true"));
        assert!(builder().add_named_option("nosuchoption", Some("1")).is_err());
    }

    #[test]
    fn layers_keep_insertion_order() {
        let a = Layer::new("/x/foo.grd");
        let b = Layer::new("/y/bar.grd");
        let config = builder().add_layers([&a]).add_layers([&b]).build();
        assert_eq!(config.layers(), [a, b]);
    }

    #[test]
    fn command_line_renders_flags_bare_and_values_as_assignments() {
        let config = builder()
            .add_option(OptionKey::SamplesFile, "/ws/samples.csv")
            .unwrap()
            .add_flag(OptionKey::JackKnife)
            .unwrap()
            .add_option(OptionKey::Warnings, "false")
            .unwrap()
            .build();
        assert_eq!(
            config.command_line(),
            ["samplesfile=/ws/samples.csv", "jackknife", "warnings=false"]
        );
    }

    #[test]
    fn default_option_does_not_replace_an_existing_value() {
        let b = builder()
            .add_option(OptionKey::OutputDirectory, "/out")
            .unwrap()
            .default_option(OptionKey::OutputDirectory, "/elsewhere")
            .unwrap()
            .default_option(OptionKey::MaximumIterations, "500")
            .unwrap();
        assert_eq!(b.get_option(OptionKey::OutputDirectory), Some("/out"));
        assert_eq!(b.get_option(OptionKey::MaximumIterations), Some("500"));
    }

    #[test]
    fn from_config_preserves_options_and_layers() {
        let dir = tempdir().unwrap();
        let layer = Layer::new("/grids/bio1.asc");
        let original = ConfigBuilder::new(dir.path())
            .unwrap()
            .add_option(OptionKey::Replicates, "5")
            .unwrap()
            .add_layers([&layer])
            .build();

        let copy = ConfigBuilder::from_config(&original).unwrap().build();
        assert_eq!(copy, original);
        assert_eq!(copy.workspace_dir(), dir.path());
    }
}
