use std::path::PathBuf;

use devserver_config::{
    LaunchConfiguration, MaxModuleInstances, OptionValue, RunConfiguration, ThreadsafeOverride,
};
use tracing::{debug, info, warn};

use crate::errors::RunError;
use crate::launcher::DevServerLauncher;

/// Carries one set of launch settings to a launcher.
///
/// Values pass through untouched; checking them is the launcher's job.
/// `execute` consumes the adapter, so each instance launches at most once.
pub struct RunAdapter<L> {
    config: LaunchConfiguration,
    launcher: L,
}

impl<L: DevServerLauncher> RunAdapter<L> {
    pub fn new(config: LaunchConfiguration, launcher: L) -> Self {
        Self { config, launcher }
    }

    /// Binds named options first, so a malformed option fails before the
    /// launcher is ever involved.
    pub fn from_options<I, K>(options: I, launcher: L) -> Result<Self, RunError>
    where
        I: IntoIterator<Item = (K, OptionValue)>,
        K: AsRef<str>,
    {
        let config = LaunchConfiguration::from_options(options)?;
        Ok(Self::new(config, launcher))
    }

    pub fn configuration(&self) -> &LaunchConfiguration {
        &self.config
    }

    pub async fn execute(self) -> Result<(), RunError> {
        info!(
            manifests = self.config.manifest_paths().len(),
            "launching dev server"
        );
        debug!(config = ?self.config, "dev server configuration");

        match self.launcher.run(&self.config).await {
            Ok(()) => {
                info!("dev server finished");
                Ok(())
            }
            Err(err) => {
                warn!("dev server launch failed: {err}");
                Err(RunError::from(err))
            }
        }
    }
}

impl<L> RunConfiguration for RunAdapter<L> {
    fn manifest_paths(&self) -> &[PathBuf] {
        self.config.manifest_paths()
    }

    fn host(&self) -> Option<&str> {
        self.config.host()
    }

    fn port(&self) -> Option<u16> {
        self.config.port()
    }

    fn admin_host(&self) -> Option<&str> {
        self.config.admin_host()
    }

    fn admin_port(&self) -> Option<u16> {
        self.config.admin_port()
    }

    fn auth_domain(&self) -> Option<&str> {
        self.config.auth_domain()
    }

    fn storage_path(&self) -> Option<&str> {
        self.config.storage_path()
    }

    fn log_level(&self) -> Option<&str> {
        self.config.log_level()
    }

    fn max_module_instances(&self) -> Option<&MaxModuleInstances> {
        self.config.max_module_instances()
    }

    fn use_mtime_file_watcher(&self) -> Option<bool> {
        self.config.use_mtime_file_watcher()
    }

    fn threadsafe_override(&self) -> Option<&ThreadsafeOverride> {
        self.config.threadsafe_override()
    }

    fn startup_script_path(&self) -> Option<&str> {
        self.config.startup_script_path()
    }

    fn startup_args(&self) -> Option<&str> {
        self.config.startup_args()
    }

    fn extra_runtime_flags(&self) -> &[String] {
        self.config.extra_runtime_flags()
    }

    fn custom_entrypoint(&self) -> Option<&str> {
        self.config.custom_entrypoint()
    }

    fn runtime_id(&self) -> Option<&str> {
        self.config.runtime_id()
    }

    fn allow_skipped_files(&self) -> Option<bool> {
        self.config.allow_skipped_files()
    }

    fn api_port(&self) -> Option<u16> {
        self.config.api_port()
    }

    fn automatic_restart(&self) -> Option<bool> {
        self.config.automatic_restart()
    }

    fn dev_server_log_level(&self) -> Option<&str> {
        self.config.dev_server_log_level()
    }

    fn skip_sdk_update_check(&self) -> Option<bool> {
        self.config.skip_sdk_update_check()
    }

    fn default_storage_bucket(&self) -> Option<&str> {
        self.config.default_storage_bucket()
    }
}
