use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::Args;
use devserver_config::file::{CONFIG_FILE_NAME, load_devserver_options};
use devserver_config::{ConfigError, LaunchConfiguration, OptionKey, OptionValue};
use tracing::debug;

const DEFAULT_BUILD_DIR: &str = "target";
const FALLBACK_FINAL_NAME: &str = "app";

/// Launch settings. Each one can also come from an `APP_DEVSERVER_*`
/// variable or from the `[devserver]` table of `appengine.toml`; flags win
/// over variables, variables over the file.
#[derive(Args, Debug)]
pub struct LaunchArgs {
    /// Project directory holding appengine.toml and the build output
    #[arg(long, default_value = ".")]
    pub project_dir: PathBuf,

    /// Config file to read instead of <project-dir>/appengine.toml
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Build output directory used for the default manifest path
    #[arg(long, default_value = DEFAULT_BUILD_DIR)]
    pub build_dir: PathBuf,

    /// Build artifact name under the build dir (default: project directory name)
    #[arg(long)]
    pub final_name: Option<String>,

    /// app.yaml files, directories of them, or exploded WAR directories
    #[arg(value_name = "MANIFEST", env = "APP_DEVSERVER_MANIFEST_PATHS")]
    pub manifest_paths: Vec<PathBuf>,

    /// Host name application modules bind to
    #[arg(long, env = "APP_DEVSERVER_HOST")]
    pub host: Option<String>,

    /// Lowest port application modules bind to
    #[arg(long, env = "APP_DEVSERVER_PORT")]
    pub port: Option<u16>,

    /// Host name the admin server binds to
    #[arg(long, env = "APP_DEVSERVER_ADMIN_HOST")]
    pub admin_host: Option<String>,

    /// Port the admin server binds to
    #[arg(long, env = "APP_DEVSERVER_ADMIN_PORT")]
    pub admin_port: Option<u16>,

    /// Port the API server binds to
    #[arg(long, env = "APP_DEVSERVER_API_PORT")]
    pub api_port: Option<u16>,

    /// Authorization domain
    #[arg(long, env = "APP_DEVSERVER_AUTH_DOMAIN")]
    pub auth_domain: Option<String>,

    /// Directory for datastore, blobstore and other local data
    #[arg(long, env = "APP_DEVSERVER_STORAGE_PATH")]
    pub storage_path: Option<String>,

    /// Lowest application log level shown (debug, info, warning, critical, error)
    #[arg(long, env = "APP_DEVSERVER_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Lowest dev server log level shown
    #[arg(long, env = "APP_DEVSERVER_DEV_SERVER_LOG_LEVEL")]
    pub dev_server_log_level: Option<String>,

    /// Instance cap: a number, or module:count pairs like default:5,backend:3
    #[arg(long, env = "APP_DEVSERVER_MAX_MODULE_INSTANCES")]
    pub max_module_instances: Option<String>,

    /// Threadsafe override: true/false, or module:bool pairs like default:False
    #[arg(long, env = "APP_DEVSERVER_THREADSAFE_OVERRIDE")]
    pub threadsafe_override: Option<String>,

    /// Poll file mtimes to detect source changes
    #[arg(long, env = "APP_DEVSERVER_USE_MTIME_FILE_WATCHER", value_name = "BOOL")]
    pub use_mtime_file_watcher: Option<bool>,

    /// Let the app read files matched by skip_files or static handlers
    #[arg(long, env = "APP_DEVSERVER_ALLOW_SKIPPED_FILES", value_name = "BOOL")]
    pub allow_skipped_files: Option<bool>,

    /// Restart instances when their files change
    #[arg(long, env = "APP_DEVSERVER_AUTOMATIC_RESTART", value_name = "BOOL")]
    pub automatic_restart: Option<bool>,

    /// Skip the SDK update check
    #[arg(long, env = "APP_DEVSERVER_SKIP_SDK_UPDATE_CHECK", value_name = "BOOL")]
    pub skip_sdk_update_check: Option<bool>,

    /// Script run when a new runtime instance starts
    #[arg(long, env = "APP_DEVSERVER_STARTUP_SCRIPT_PATH")]
    pub startup_script_path: Option<String>,

    /// Arguments made available to the startup script
    #[arg(long, env = "APP_DEVSERVER_STARTUP_ARGS")]
    pub startup_args: Option<String>,

    /// Flag passed to the runtime when an instance starts (repeatable)
    #[arg(
        long = "jvm-flag",
        value_name = "FLAG",
        env = "APP_DEVSERVER_EXTRA_RUNTIME_FLAGS",
        allow_hyphen_values = true
    )]
    pub extra_runtime_flags: Vec<String>,

    /// Entrypoint for custom runtime modules; {port} is replaced with the port
    #[arg(long, env = "APP_DEVSERVER_CUSTOM_ENTRYPOINT")]
    pub custom_entrypoint: Option<String>,

    /// Default runtime for modules
    #[arg(long = "runtime", env = "APP_DEVSERVER_RUNTIME_ID")]
    pub runtime_id: Option<String>,

    /// Default Cloud Storage bucket name
    #[arg(long, env = "APP_DEVSERVER_DEFAULT_STORAGE_BUCKET")]
    pub default_storage_bucket: Option<String>,
}

impl LaunchArgs {
    /// Options given on the command line or through the environment.
    pub fn explicit_options(&self) -> Vec<(OptionKey, OptionValue)> {
        let mut out = Vec::new();
        if !self.manifest_paths.is_empty() {
            let paths = OptionValue::Paths(self.manifest_paths.clone());
            out.push((OptionKey::ManifestPaths, paths));
        }
        if !self.extra_runtime_flags.is_empty() {
            let flags = OptionValue::List(self.extra_runtime_flags.clone());
            out.push((OptionKey::ExtraRuntimeFlags, flags));
        }

        let text = [
            (OptionKey::Host, &self.host),
            (OptionKey::AdminHost, &self.admin_host),
            (OptionKey::AuthDomain, &self.auth_domain),
            (OptionKey::StoragePath, &self.storage_path),
            (OptionKey::LogLevel, &self.log_level),
            (OptionKey::DevServerLogLevel, &self.dev_server_log_level),
            (OptionKey::MaxModuleInstances, &self.max_module_instances),
            (OptionKey::ThreadsafeOverride, &self.threadsafe_override),
            (OptionKey::StartupScriptPath, &self.startup_script_path),
            (OptionKey::StartupArgs, &self.startup_args),
            (OptionKey::CustomEntrypoint, &self.custom_entrypoint),
            (OptionKey::RuntimeId, &self.runtime_id),
            (OptionKey::DefaultStorageBucket, &self.default_storage_bucket),
        ];
        for (key, value) in text {
            if let Some(value) = value {
                out.push((key, OptionValue::Text(value.clone())));
            }
        }

        let ports = [
            (OptionKey::Port, self.port),
            (OptionKey::AdminPort, self.admin_port),
            (OptionKey::ApiPort, self.api_port),
        ];
        for (key, value) in ports {
            if let Some(value) = value {
                out.push((key, OptionValue::from(value)));
            }
        }

        let flags = [
            (OptionKey::UseMtimeFileWatcher, self.use_mtime_file_watcher),
            (OptionKey::AllowSkippedFiles, self.allow_skipped_files),
            (OptionKey::AutomaticRestart, self.automatic_restart),
            (OptionKey::SkipSdkUpdateCheck, self.skip_sdk_update_check),
        ];
        for (key, value) in flags {
            if let Some(value) = value {
                out.push((key, OptionValue::Bool(value)));
            }
        }
        out
    }

    /// `<project-dir>/<build-dir>/<final-name>`.
    pub fn default_manifest_path(&self) -> PathBuf {
        let final_name = normalize_optional(self.final_name.clone())
            .or_else(|| project_name(&self.project_dir))
            .unwrap_or_else(|| FALLBACK_FINAL_NAME.to_string());
        self.project_dir.join(&self.build_dir).join(final_name)
    }

    fn config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config {
            // Named explicitly, so a missing file is an error, not a skip.
            return Some(path.clone());
        }
        let path = self.project_dir.join(CONFIG_FILE_NAME);
        path.is_file().then_some(path)
    }
}

/// Layers defaults, the config file and explicit options, in that order,
/// into one configuration.
pub fn resolve_configuration(args: &LaunchArgs) -> Result<LaunchConfiguration, ConfigError> {
    let mut options: BTreeMap<OptionKey, OptionValue> = BTreeMap::new();
    options.insert(
        OptionKey::ManifestPaths,
        OptionValue::Paths(vec![args.default_manifest_path()]),
    );

    if let Some(path) = args.config_file() {
        debug!(path = %path.display(), "reading devserver options");
        options.extend(load_devserver_options(&path)?);
    }
    options.extend(args.explicit_options());

    let mut builder = LaunchConfiguration::builder();
    for (key, value) in options {
        builder.set(key, value)?;
    }
    builder.build()
}

fn project_name(dir: &Path) -> Option<String> {
    let absolute = std::path::absolute(dir).ok()?;
    absolute
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|val| {
        let trimmed = val.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}
