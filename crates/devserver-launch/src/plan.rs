use std::ffi::OsString;
use std::path::{Path, PathBuf};

use devserver_config::RunConfiguration;
use serde::{Serialize, Serializer};

/// Command line for one dev server process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DevServerPlan {
    pub program: String,
    #[serde(serialize_with = "display_args")]
    pub argv: Vec<OsString>, // script first, then flags, then manifest paths
}

impl DevServerPlan {
    pub fn new(program: impl Into<String>, script: &Path, config: &impl RunConfiguration) -> Self {
        let mut argv = vec![script.as_os_str().to_os_string()];
        argv.extend(dev_appserver_args(config));
        Self {
            program: program.into(),
            argv,
        }
    }
}

/// Renders the dev_appserver flags for every present setting, followed by
/// the manifest paths. Absent settings produce no flag at all. Manifest
/// paths are passed as the OS gave them, even when they are not UTF-8.
pub fn dev_appserver_args(config: &impl RunConfiguration) -> Vec<OsString> {
    let mut args = Vec::new();

    push_flag(&mut args, "host", config.host());
    push_flag(&mut args, "port", config.port());
    push_flag(&mut args, "admin_host", config.admin_host());
    push_flag(&mut args, "admin_port", config.admin_port());
    push_flag(&mut args, "auth_domain", config.auth_domain());
    push_flag(&mut args, "storage_path", config.storage_path());
    push_flag(&mut args, "log_level", config.log_level());
    push_flag(&mut args, "max_module_instances", config.max_module_instances());
    push_flag(&mut args, "use_mtime_file_watcher", config.use_mtime_file_watcher());
    push_flag(&mut args, "threadsafe_override", config.threadsafe_override());
    push_flag(&mut args, "python_startup_script", config.startup_script_path());
    push_flag(&mut args, "python_startup_args", config.startup_args());
    for flag in config.extra_runtime_flags() {
        args.push(format!("--jvm_flag={flag}").into());
    }
    push_flag(&mut args, "custom_entrypoint", config.custom_entrypoint());
    push_flag(&mut args, "runtime", config.runtime_id());
    push_flag(&mut args, "allow_skipped_files", config.allow_skipped_files());
    push_flag(&mut args, "api_port", config.api_port());
    push_flag(&mut args, "automatic_restart", config.automatic_restart());
    push_flag(&mut args, "dev_appserver_log_level", config.dev_server_log_level());
    push_flag(&mut args, "skip_sdk_update_check", config.skip_sdk_update_check());
    push_flag(&mut args, "default_gcs_bucket_name", config.default_storage_bucket());

    args.extend(
        config
            .manifest_paths()
            .iter()
            .map(|path| path.as_os_str().to_os_string()),
    );
    args
}

fn push_flag<T: std::fmt::Display>(args: &mut Vec<OsString>, name: &str, value: Option<T>) {
    if let Some(value) = value {
        args.push(format!("--{name}={value}").into());
    }
}

fn display_args<S: Serializer>(args: &[OsString], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(args.iter().map(|arg| arg.to_string_lossy()))
}

pub fn missing_manifest_paths(config: &impl RunConfiguration) -> Vec<PathBuf> {
    config
        .manifest_paths()
        .iter()
        .filter(|path| !path.exists())
        .cloned()
        .collect()
}
