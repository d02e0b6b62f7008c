use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::binding::{OptionKey, OptionValue};
use crate::error::ConfigError;

/// Instance cap for the dev server: one number for every module, or a
/// `module:count` list such as `default:5,backend:3` forwarded as written.
///
/// Only a plain decimal becomes `Count`; any other text, including one with
/// surrounding spaces, is kept as supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MaxModuleInstances {
    Count(u32),
    PerModule(String),
}

impl MaxModuleInstances {
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<u32>() {
            Ok(count) if count.to_string() == raw => Self::Count(count),
            _ => Self::PerModule(raw.to_string()),
        }
    }
}

impl fmt::Display for MaxModuleInstances {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(count) => write!(f, "{count}"),
            Self::PerModule(raw) => f.write_str(raw),
        }
    }
}

/// Threadsafe override: a single flag for all modules, or a
/// `module:bool` list such as `default:False,backend:True`.
///
/// Only the exact words `true` and `false` become `All`; other spellings
/// such as `True` are kept as supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ThreadsafeOverride {
    All(bool),
    PerModule(String),
}

impl ThreadsafeOverride {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "true" => Self::All(true),
            "false" => Self::All(false),
            _ => Self::PerModule(raw.to_string()),
        }
    }
}

impl fmt::Display for ThreadsafeOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All(value) => write!(f, "{value}"),
            Self::PerModule(raw) => f.write_str(raw),
        }
    }
}

/// Read-only view of every launch setting.
///
/// Accessors return exactly what was stored. Absent values stay absent;
/// defaults belong to whoever binds the options or to the launcher.
pub trait RunConfiguration {
    fn manifest_paths(&self) -> &[PathBuf];
    fn host(&self) -> Option<&str>;
    fn port(&self) -> Option<u16>;
    fn admin_host(&self) -> Option<&str>;
    fn admin_port(&self) -> Option<u16>;
    fn auth_domain(&self) -> Option<&str>;
    fn storage_path(&self) -> Option<&str>;
    fn log_level(&self) -> Option<&str>;
    fn max_module_instances(&self) -> Option<&MaxModuleInstances>;
    fn use_mtime_file_watcher(&self) -> Option<bool>;
    fn threadsafe_override(&self) -> Option<&ThreadsafeOverride>;
    fn startup_script_path(&self) -> Option<&str>;
    fn startup_args(&self) -> Option<&str>;
    fn extra_runtime_flags(&self) -> &[String];
    fn custom_entrypoint(&self) -> Option<&str>;
    fn runtime_id(&self) -> Option<&str>;
    fn allow_skipped_files(&self) -> Option<bool>;
    fn api_port(&self) -> Option<u16>;
    fn automatic_restart(&self) -> Option<bool>;
    fn dev_server_log_level(&self) -> Option<&str>;
    fn skip_sdk_update_check(&self) -> Option<bool>;
    fn default_storage_bucket(&self) -> Option<&str>;
}

/// Settings for one dev server launch. Built once, never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchConfiguration {
    manifest_paths: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    admin_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    admin_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    auth_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    storage_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_module_instances: Option<MaxModuleInstances>,
    #[serde(skip_serializing_if = "Option::is_none")]
    use_mtime_file_watcher: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    threadsafe_override: Option<ThreadsafeOverride>,
    #[serde(skip_serializing_if = "Option::is_none")]
    startup_script_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    startup_args: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    extra_runtime_flags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_entrypoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    runtime_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    allow_skipped_files: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    automatic_restart: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dev_server_log_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    skip_sdk_update_check: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_storage_bucket: Option<String>,
}

impl LaunchConfiguration {
    pub fn builder() -> LaunchConfigurationBuilder {
        LaunchConfigurationBuilder::default()
    }

    /// Binds named options into a configuration. Names may be given in any
    /// form [`OptionKey::parse`] accepts; a later duplicate wins.
    pub fn from_options<I, K>(options: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, OptionValue)>,
        K: AsRef<str>,
    {
        let mut builder = Self::builder();
        for (name, value) in options {
            let name = name.as_ref();
            let key = OptionKey::parse(name)
                .ok_or_else(|| ConfigError::UnknownOption(name.to_string()))?;
            builder.set(key, value)?;
        }
        builder.build()
    }
}

impl RunConfiguration for LaunchConfiguration {
    fn manifest_paths(&self) -> &[PathBuf] {
        &self.manifest_paths
    }

    fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    fn port(&self) -> Option<u16> {
        self.port
    }

    fn admin_host(&self) -> Option<&str> {
        self.admin_host.as_deref()
    }

    fn admin_port(&self) -> Option<u16> {
        self.admin_port
    }

    fn auth_domain(&self) -> Option<&str> {
        self.auth_domain.as_deref()
    }

    fn storage_path(&self) -> Option<&str> {
        self.storage_path.as_deref()
    }

    fn log_level(&self) -> Option<&str> {
        self.log_level.as_deref()
    }

    fn max_module_instances(&self) -> Option<&MaxModuleInstances> {
        self.max_module_instances.as_ref()
    }

    fn use_mtime_file_watcher(&self) -> Option<bool> {
        self.use_mtime_file_watcher
    }

    fn threadsafe_override(&self) -> Option<&ThreadsafeOverride> {
        self.threadsafe_override.as_ref()
    }

    fn startup_script_path(&self) -> Option<&str> {
        self.startup_script_path.as_deref()
    }

    fn startup_args(&self) -> Option<&str> {
        self.startup_args.as_deref()
    }

    fn extra_runtime_flags(&self) -> &[String] {
        &self.extra_runtime_flags
    }

    fn custom_entrypoint(&self) -> Option<&str> {
        self.custom_entrypoint.as_deref()
    }

    fn runtime_id(&self) -> Option<&str> {
        self.runtime_id.as_deref()
    }

    fn allow_skipped_files(&self) -> Option<bool> {
        self.allow_skipped_files
    }

    fn api_port(&self) -> Option<u16> {
        self.api_port
    }

    fn automatic_restart(&self) -> Option<bool> {
        self.automatic_restart
    }

    fn dev_server_log_level(&self) -> Option<&str> {
        self.dev_server_log_level.as_deref()
    }

    fn skip_sdk_update_check(&self) -> Option<bool> {
        self.skip_sdk_update_check
    }

    fn default_storage_bucket(&self) -> Option<&str> {
        self.default_storage_bucket.as_deref()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LaunchConfigurationBuilder {
    inner: LaunchConfiguration,
}

impl LaunchConfigurationBuilder {
    pub fn manifest_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.inner.manifest_paths.push(path.into());
        self
    }

    pub fn host(mut self, value: impl Into<String>) -> Self {
        self.inner.host = Some(value.into());
        self
    }

    pub fn port(mut self, value: u16) -> Self {
        self.inner.port = Some(value);
        self
    }

    pub fn admin_host(mut self, value: impl Into<String>) -> Self {
        self.inner.admin_host = Some(value.into());
        self
    }

    pub fn admin_port(mut self, value: u16) -> Self {
        self.inner.admin_port = Some(value);
        self
    }

    pub fn auth_domain(mut self, value: impl Into<String>) -> Self {
        self.inner.auth_domain = Some(value.into());
        self
    }

    pub fn storage_path(mut self, value: impl Into<String>) -> Self {
        self.inner.storage_path = Some(value.into());
        self
    }

    pub fn log_level(mut self, value: impl Into<String>) -> Self {
        self.inner.log_level = Some(value.into());
        self
    }

    pub fn max_module_instances(mut self, value: MaxModuleInstances) -> Self {
        self.inner.max_module_instances = Some(value);
        self
    }

    pub fn use_mtime_file_watcher(mut self, value: bool) -> Self {
        self.inner.use_mtime_file_watcher = Some(value);
        self
    }

    pub fn threadsafe_override(mut self, value: ThreadsafeOverride) -> Self {
        self.inner.threadsafe_override = Some(value);
        self
    }

    pub fn startup_script_path(mut self, value: impl Into<String>) -> Self {
        self.inner.startup_script_path = Some(value.into());
        self
    }

    pub fn startup_args(mut self, value: impl Into<String>) -> Self {
        self.inner.startup_args = Some(value.into());
        self
    }

    /// Appends one runtime flag; repeated calls keep their order.
    pub fn extra_runtime_flag(mut self, flag: impl Into<String>) -> Self {
        self.inner.extra_runtime_flags.push(flag.into());
        self
    }

    pub fn custom_entrypoint(mut self, value: impl Into<String>) -> Self {
        self.inner.custom_entrypoint = Some(value.into());
        self
    }

    pub fn runtime_id(mut self, value: impl Into<String>) -> Self {
        self.inner.runtime_id = Some(value.into());
        self
    }

    pub fn allow_skipped_files(mut self, value: bool) -> Self {
        self.inner.allow_skipped_files = Some(value);
        self
    }

    pub fn api_port(mut self, value: u16) -> Self {
        self.inner.api_port = Some(value);
        self
    }

    pub fn automatic_restart(mut self, value: bool) -> Self {
        self.inner.automatic_restart = Some(value);
        self
    }

    pub fn dev_server_log_level(mut self, value: impl Into<String>) -> Self {
        self.inner.dev_server_log_level = Some(value.into());
        self
    }

    pub fn skip_sdk_update_check(mut self, value: bool) -> Self {
        self.inner.skip_sdk_update_check = Some(value);
        self
    }

    pub fn default_storage_bucket(mut self, value: impl Into<String>) -> Self {
        self.inner.default_storage_bucket = Some(value.into());
        self
    }

    /// Applies one bound option. List options replace the previous list
    /// rather than appending to it, so a higher-precedence source overrides.
    pub fn set(&mut self, key: OptionKey, value: OptionValue) -> Result<(), ConfigError> {
        let name = key.name();
        let cfg = &mut self.inner;
        match key {
            OptionKey::ManifestPaths => cfg.manifest_paths = value.into_paths(name)?,
            OptionKey::Host => cfg.host = Some(value.into_text(name)?),
            OptionKey::Port => cfg.port = Some(value.into_port(name)?),
            OptionKey::AdminHost => cfg.admin_host = Some(value.into_text(name)?),
            OptionKey::AdminPort => cfg.admin_port = Some(value.into_port(name)?),
            OptionKey::AuthDomain => cfg.auth_domain = Some(value.into_text(name)?),
            OptionKey::StoragePath => cfg.storage_path = Some(value.into_text(name)?),
            OptionKey::LogLevel => cfg.log_level = Some(value.into_text(name)?),
            OptionKey::MaxModuleInstances => {
                cfg.max_module_instances = Some(value.into_max_instances(name)?);
            }
            OptionKey::UseMtimeFileWatcher => {
                cfg.use_mtime_file_watcher = Some(value.into_bool(name)?);
            }
            OptionKey::ThreadsafeOverride => {
                cfg.threadsafe_override = Some(value.into_threadsafe(name)?);
            }
            OptionKey::StartupScriptPath => {
                cfg.startup_script_path = Some(value.into_text(name)?);
            }
            OptionKey::StartupArgs => cfg.startup_args = Some(value.into_text(name)?),
            OptionKey::ExtraRuntimeFlags => cfg.extra_runtime_flags = value.into_list(name)?,
            OptionKey::CustomEntrypoint => cfg.custom_entrypoint = Some(value.into_text(name)?),
            OptionKey::RuntimeId => cfg.runtime_id = Some(value.into_text(name)?),
            OptionKey::AllowSkippedFiles => {
                cfg.allow_skipped_files = Some(value.into_bool(name)?);
            }
            OptionKey::ApiPort => cfg.api_port = Some(value.into_port(name)?),
            OptionKey::AutomaticRestart => cfg.automatic_restart = Some(value.into_bool(name)?),
            OptionKey::DevServerLogLevel => {
                cfg.dev_server_log_level = Some(value.into_text(name)?);
            }
            OptionKey::SkipSdkUpdateCheck => {
                cfg.skip_sdk_update_check = Some(value.into_bool(name)?);
            }
            OptionKey::DefaultStorageBucket => {
                cfg.default_storage_bucket = Some(value.into_text(name)?);
            }
        }
        Ok(())
    }

    pub fn build(self) -> Result<LaunchConfiguration, ConfigError> {
        if self.inner.manifest_paths.is_empty() {
            return Err(ConfigError::Missing(OptionKey::ManifestPaths.name()));
        }
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_fields_read_back_absent() {
        let config = LaunchConfiguration::builder()
            .manifest_path("target/app")
            .build()
            .expect("build config");

        assert_eq!(config.manifest_paths(), &[PathBuf::from("target/app")]);
        assert_eq!(config.host(), None);
        assert_eq!(config.port(), None);
        assert_eq!(config.admin_host(), None);
        assert_eq!(config.admin_port(), None);
        assert_eq!(config.api_port(), None);
        assert_eq!(config.auth_domain(), None);
        assert_eq!(config.storage_path(), None);
        assert_eq!(config.log_level(), None);
        assert_eq!(config.dev_server_log_level(), None);
        assert_eq!(config.max_module_instances(), None);
        assert_eq!(config.threadsafe_override(), None);
        assert_eq!(config.use_mtime_file_watcher(), None);
        assert_eq!(config.allow_skipped_files(), None);
        assert_eq!(config.automatic_restart(), None);
        assert_eq!(config.skip_sdk_update_check(), None);
        assert_eq!(config.startup_script_path(), None);
        assert_eq!(config.startup_args(), None);
        assert_eq!(config.custom_entrypoint(), None);
        assert_eq!(config.runtime_id(), None);
        assert_eq!(config.default_storage_bucket(), None);
        assert!(config.extra_runtime_flags().is_empty());
    }

    #[test]
    fn supplied_values_read_back_unchanged() {
        let config = LaunchConfiguration::from_options([
            ("appYamls", OptionValue::List(vec!["a/app.yaml".into(), "b".into()])),
            ("host", OptionValue::Text("0.0.0.0".into())),
            ("port", OptionValue::Integer(8085)),
            ("adminPort", OptionValue::Integer(8001)),
            ("authDomain", OptionValue::Text("example.com".into())),
            ("maxModuleInstances", OptionValue::Text("default:5,backend:3".into())),
            ("threadsafeOverride", OptionValue::Bool(false)),
            ("automaticRestart", OptionValue::Bool(true)),
            ("defaultGcsBucketName", OptionValue::Text("bucket".into())),
            ("jvmFlags", OptionValue::List(vec!["-Xmx1024m".into(), "-Xms256m".into()])),
        ])
        .expect("bind options");

        assert_eq!(
            config.manifest_paths(),
            &[PathBuf::from("a/app.yaml"), PathBuf::from("b")]
        );
        assert_eq!(config.host(), Some("0.0.0.0"));
        assert_eq!(config.port(), Some(8085));
        assert_eq!(config.admin_port(), Some(8001));
        assert_eq!(config.auth_domain(), Some("example.com"));
        assert_eq!(
            config.max_module_instances(),
            Some(&MaxModuleInstances::PerModule("default:5,backend:3".into()))
        );
        assert_eq!(config.threadsafe_override(), Some(&ThreadsafeOverride::All(false)));
        assert_eq!(config.automatic_restart(), Some(true));
        assert_eq!(config.default_storage_bucket(), Some("bucket"));
        assert_eq!(config.extra_runtime_flags(), &["-Xmx1024m", "-Xms256m"]);
        assert_eq!(config.admin_host(), None);
    }

    #[test]
    fn missing_manifest_paths_is_a_configuration_error() {
        let err = LaunchConfiguration::from_options([("port", OptionValue::Integer(8080))])
            .expect_err("manifest paths are required");
        assert!(matches!(err, ConfigError::Missing("manifestPaths")));
    }

    #[test]
    fn later_list_option_replaces_earlier_one() {
        let config = LaunchConfiguration::from_options([
            ("manifestPaths", OptionValue::Text("first".into())),
            ("jvmFlags", OptionValue::List(vec!["-Da=1".into()])),
            ("app.devserver.appYamls", OptionValue::Text("second".into())),
            ("devserver.jvmFlags", OptionValue::List(vec!["-Db=2".into(), "-Dc=3".into()])),
        ])
        .expect("bind options");

        assert_eq!(config.manifest_paths(), &[PathBuf::from("second")]);
        assert_eq!(config.extra_runtime_flags(), &["-Db=2", "-Dc=3"]);
    }

    #[test]
    fn unknown_option_is_rejected_before_building() {
        let err = LaunchConfiguration::from_options([
            ("appYamls", OptionValue::Text("app".into())),
            ("hostname", OptionValue::Text("localhost".into())),
        ])
        .expect_err("unknown option");
        assert!(matches!(err, ConfigError::UnknownOption(name) if name == "hostname"));
    }

    #[test]
    fn fluent_setters_cover_every_field() {
        let config = LaunchConfiguration::builder()
            .manifest_path("target/app")
            .host("0.0.0.0")
            .port(8080)
            .admin_host("127.0.0.1")
            .admin_port(8000)
            .auth_domain("example.com")
            .storage_path("/tmp/storage")
            .log_level("debug")
            .max_module_instances(MaxModuleInstances::Count(2))
            .use_mtime_file_watcher(true)
            .threadsafe_override(ThreadsafeOverride::All(false))
            .startup_script_path("startup.py")
            .startup_args("--verbose")
            .extra_runtime_flag("-Xmx512m")
            .custom_entrypoint("gunicorn -b :{port} main:app")
            .runtime_id("java7")
            .allow_skipped_files(false)
            .api_port(8001)
            .automatic_restart(true)
            .dev_server_log_level("warning")
            .skip_sdk_update_check(true)
            .default_storage_bucket("bucket")
            .build()
            .expect("build config");

        assert_eq!(config.admin_host(), Some("127.0.0.1"));
        assert_eq!(config.auth_domain(), Some("example.com"));
        assert_eq!(config.storage_path(), Some("/tmp/storage"));
        assert_eq!(config.use_mtime_file_watcher(), Some(true));
        assert_eq!(config.startup_script_path(), Some("startup.py"));
        assert_eq!(config.startup_args(), Some("--verbose"));
        assert_eq!(config.custom_entrypoint(), Some("gunicorn -b :{port} main:app"));
        assert_eq!(config.runtime_id(), Some("java7"));
        assert_eq!(config.allow_skipped_files(), Some(false));
        assert_eq!(config.api_port(), Some(8001));
        assert_eq!(config.dev_server_log_level(), Some("warning"));
        assert_eq!(config.skip_sdk_update_check(), Some(true));
        assert_eq!(config.default_storage_bucket(), Some("bucket"));
    }

    #[test]
    fn composite_text_reads_back_as_supplied() {
        let config = LaunchConfiguration::from_options([
            ("appYamls", OptionValue::from("app")),
            ("threadsafeOverride", OptionValue::from("True")),
            ("maxModuleInstances", OptionValue::from(" 4")),
        ])
        .expect("bind options");

        let threadsafe = config.threadsafe_override().map(ToString::to_string);
        let max = config.max_module_instances().map(ToString::to_string);
        assert_eq!(threadsafe.as_deref(), Some("True"));
        assert_eq!(max.as_deref(), Some(" 4"));
    }

    #[test]
    fn composite_values_render_verbatim() {
        assert_eq!(MaxModuleInstances::parse("4"), MaxModuleInstances::Count(4));
        assert_eq!(MaxModuleInstances::parse("04").to_string(), "04");
        assert_eq!(MaxModuleInstances::parse("default:5").to_string(), "default:5");
        assert_eq!(ThreadsafeOverride::parse("false"), ThreadsafeOverride::All(false));
        assert_eq!(
            ThreadsafeOverride::parse("default:False,backend:True").to_string(),
            "default:False,backend:True"
        );
        assert_eq!(ThreadsafeOverride::All(false).to_string(), "false");
    }
}
