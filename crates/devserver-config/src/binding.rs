use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::record::{MaxModuleInstances, ThreadsafeOverride};

/// Stable name of every launch option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OptionKey {
    ManifestPaths,
    Host,
    Port,
    AdminHost,
    AdminPort,
    AuthDomain,
    StoragePath,
    LogLevel,
    MaxModuleInstances,
    UseMtimeFileWatcher,
    ThreadsafeOverride,
    StartupScriptPath,
    StartupArgs,
    ExtraRuntimeFlags,
    CustomEntrypoint,
    RuntimeId,
    AllowSkippedFiles,
    ApiPort,
    AutomaticRestart,
    DevServerLogLevel,
    SkipSdkUpdateCheck,
    DefaultStorageBucket,
}

const PROPERTY_PREFIXES: [&str; 2] = ["app.devserver.", "devserver."];

impl OptionKey {
    pub const ALL: [OptionKey; 22] = [
        OptionKey::ManifestPaths,
        OptionKey::Host,
        OptionKey::Port,
        OptionKey::AdminHost,
        OptionKey::AdminPort,
        OptionKey::AuthDomain,
        OptionKey::StoragePath,
        OptionKey::LogLevel,
        OptionKey::MaxModuleInstances,
        OptionKey::UseMtimeFileWatcher,
        OptionKey::ThreadsafeOverride,
        OptionKey::StartupScriptPath,
        OptionKey::StartupArgs,
        OptionKey::ExtraRuntimeFlags,
        OptionKey::CustomEntrypoint,
        OptionKey::RuntimeId,
        OptionKey::AllowSkippedFiles,
        OptionKey::ApiPort,
        OptionKey::AutomaticRestart,
        OptionKey::DevServerLogLevel,
        OptionKey::SkipSdkUpdateCheck,
        OptionKey::DefaultStorageBucket,
    ];

    pub fn name(self) -> &'static str {
        match self {
            OptionKey::ManifestPaths => "manifestPaths",
            OptionKey::Host => "host",
            OptionKey::Port => "port",
            OptionKey::AdminHost => "adminHost",
            OptionKey::AdminPort => "adminPort",
            OptionKey::AuthDomain => "authDomain",
            OptionKey::StoragePath => "storagePath",
            OptionKey::LogLevel => "logLevel",
            OptionKey::MaxModuleInstances => "maxModuleInstances",
            OptionKey::UseMtimeFileWatcher => "useMtimeFileWatcher",
            OptionKey::ThreadsafeOverride => "threadsafeOverride",
            OptionKey::StartupScriptPath => "startupScriptPath",
            OptionKey::StartupArgs => "startupArgs",
            OptionKey::ExtraRuntimeFlags => "extraRuntimeFlags",
            OptionKey::CustomEntrypoint => "customEntrypoint",
            OptionKey::RuntimeId => "runtimeId",
            OptionKey::AllowSkippedFiles => "allowSkippedFiles",
            OptionKey::ApiPort => "apiPort",
            OptionKey::AutomaticRestart => "automaticRestart",
            OptionKey::DevServerLogLevel => "devServerLogLevel",
            OptionKey::SkipSdkUpdateCheck => "skipSdkUpdateCheck",
            OptionKey::DefaultStorageBucket => "defaultStorageBucket",
        }
    }

    /// Names the App Engine plugin used for the same option.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            OptionKey::ManifestPaths => &["appYamls"],
            OptionKey::StartupScriptPath => &["pythonStartupScript"],
            OptionKey::StartupArgs => &["pythonStartupArgs"],
            OptionKey::ExtraRuntimeFlags => &["jvmFlags"],
            OptionKey::RuntimeId => &["runtime"],
            OptionKey::DevServerLogLevel => &["devAppserverLogLevel"],
            OptionKey::DefaultStorageBucket => &["defaultGcsBucketName"],
            _ => &[],
        }
    }

    /// Accepts `name`, `devserver.name` and `app.devserver.name`, for the
    /// stable name and every alias.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let bare = PROPERTY_PREFIXES
            .iter()
            .find_map(|prefix| raw.strip_prefix(*prefix))
            .unwrap_or(raw);

        Self::ALL
            .into_iter()
            .find(|key| key.name() == bare || key.aliases().contains(&bare))
    }

    /// `APP_DEVSERVER_ADMIN_PORT` for `adminPort`.
    pub fn env_var(self) -> String {
        let mut out = String::from("APP_DEVSERVER_");
        for ch in self.name().chars() {
            if ch.is_ascii_uppercase() {
                out.push('_');
            }
            out.push(ch.to_ascii_uppercase());
        }
        out
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
        Self::parse(s).ok_or_else(|| ConfigError::UnknownOption(s.to_string()))
    }
}

/// A raw option value as the binding source supplied it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Text(String),
    Integer(i64),
    Bool(bool),
    List(Vec<String>),
    /// Paths straight from the OS, kept as-is even when they are not UTF-8.
    Paths(Vec<PathBuf>),
}

impl OptionValue {
    fn kind(&self) -> String {
        match self {
            OptionValue::Text(value) => format!("text {value:?}"),
            OptionValue::Integer(value) => format!("integer {value}"),
            OptionValue::Bool(value) => format!("boolean {value}"),
            OptionValue::List(values) => format!("list of {} values", values.len()),
            OptionValue::Paths(paths) => format!("list of {} paths", paths.len()),
        }
    }

    pub(crate) fn into_text(self, option: &'static str) -> Result<String, ConfigError> {
        match self {
            OptionValue::Text(value) => Ok(value),
            OptionValue::Integer(value) => Ok(value.to_string()),
            OptionValue::Bool(value) => Ok(value.to_string()),
            other => Err(ConfigError::invalid(option, "a string", other.kind())),
        }
    }

    pub(crate) fn into_port(self, option: &'static str) -> Result<u16, ConfigError> {
        match self {
            OptionValue::Integer(value) => u16::try_from(value)
                .map_err(|_| ConfigError::invalid(option, "a port number", value)),
            OptionValue::Text(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::invalid(option, "a port number", format!("{value:?}"))),
            other => Err(ConfigError::invalid(option, "a port number", other.kind())),
        }
    }

    pub(crate) fn into_bool(self, option: &'static str) -> Result<bool, ConfigError> {
        match self {
            OptionValue::Bool(value) => Ok(value),
            OptionValue::Text(value) => parse_bool(&value)
                .ok_or_else(|| ConfigError::invalid(option, "true or false", format!("{value:?}"))),
            other => Err(ConfigError::invalid(option, "true or false", other.kind())),
        }
    }

    pub(crate) fn into_list(self, option: &'static str) -> Result<Vec<String>, ConfigError> {
        match self {
            OptionValue::List(values) => Ok(values),
            OptionValue::Text(value) => Ok(vec![value]),
            other => Err(ConfigError::invalid(option, "a list of strings", other.kind())),
        }
    }

    pub(crate) fn into_paths(self, option: &'static str) -> Result<Vec<PathBuf>, ConfigError> {
        match self {
            OptionValue::Paths(paths) => Ok(paths),
            OptionValue::List(values) => Ok(values.into_iter().map(PathBuf::from).collect()),
            OptionValue::Text(value) => Ok(vec![PathBuf::from(value)]),
            other => Err(ConfigError::invalid(option, "a list of paths", other.kind())),
        }
    }

    pub(crate) fn into_max_instances(
        self,
        option: &'static str,
    ) -> Result<MaxModuleInstances, ConfigError> {
        match self {
            OptionValue::Integer(value) => u32::try_from(value)
                .map(MaxModuleInstances::Count)
                .map_err(|_| ConfigError::invalid(option, "an instance count", value)),
            OptionValue::Text(value) => Ok(MaxModuleInstances::parse(&value)),
            other => Err(ConfigError::invalid(
                option,
                "a count or module:count list",
                other.kind(),
            )),
        }
    }

    pub(crate) fn into_threadsafe(
        self,
        option: &'static str,
    ) -> Result<ThreadsafeOverride, ConfigError> {
        match self {
            OptionValue::Bool(value) => Ok(ThreadsafeOverride::All(value)),
            OptionValue::Text(value) => Ok(ThreadsafeOverride::parse(&value)),
            other => Err(ConfigError::invalid(
                option,
                "a boolean or module:bool list",
                other.kind(),
            )),
        }
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Text(value)
    }
}

impl From<u16> for OptionValue {
    fn from(value: u16) -> Self {
        OptionValue::Integer(i64::from(value))
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(values: Vec<String>) -> Self {
        OptionValue::List(values)
    }
}

impl From<Vec<PathBuf>> for OptionValue {
    fn from(paths: Vec<PathBuf>) -> Self {
        OptionValue::Paths(paths)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}
