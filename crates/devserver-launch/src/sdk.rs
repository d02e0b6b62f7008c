use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::errors::LaunchError;

const SDK_HOME_ENV: &str = "CLOUDSDK_HOME";
const SDK_DIR_NAME: &str = "google-cloud-sdk";
const DEV_APPSERVER_SCRIPT: &str = "dev_appserver.py";

#[cfg(windows)]
const GCLOUD_BIN: &str = "gcloud.cmd";
#[cfg(not(windows))]
const GCLOUD_BIN: &str = "gcloud";

/// An installed Cloud SDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudSdk {
    root: PathBuf,
}

impl CloudSdk {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves the SDK from an explicit path, then `CLOUDSDK_HOME`, then
    /// the `gcloud` on `PATH`, then `~/google-cloud-sdk`.
    pub fn locate(explicit: Option<&Path>) -> Result<Self, LaunchError> {
        let candidates = candidate_roots(
            explicit,
            std::env::var_os(SDK_HOME_ENV),
            std::env::var_os("PATH"),
            dirs::home_dir(),
        );
        first_installed(&candidates).ok_or_else(|| {
            LaunchError::MissingDependency(format!(
                "Cloud SDK with {DEV_APPSERVER_SCRIPT} not found (searched {})",
                describe(&candidates)
            ))
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dev_appserver_script(&self) -> PathBuf {
        self.root.join("bin").join(DEV_APPSERVER_SCRIPT)
    }

    pub fn is_installed(&self) -> bool {
        self.dev_appserver_script().is_file()
    }
}

fn candidate_roots(
    explicit: Option<&Path>,
    sdk_home: Option<OsString>,
    path_var: Option<OsString>,
    home: Option<PathBuf>,
) -> Vec<PathBuf> {
    // An explicit path is the only candidate; falling back would hide a typo.
    if let Some(path) = explicit {
        return vec![path.to_path_buf()];
    }

    let mut out = Vec::new();
    if let Some(value) = sdk_home.filter(|value| !value.is_empty()) {
        out.push(PathBuf::from(value));
    }
    if let Some(path_var) = path_var {
        for dir in std::env::split_paths(&path_var) {
            if dir.join(GCLOUD_BIN).is_file() {
                // <sdk>/bin/gcloud
                if let Some(root) = dir.parent() {
                    out.push(root.to_path_buf());
                }
            }
        }
    }
    if let Some(home) = home {
        out.push(home.join(SDK_DIR_NAME));
    }
    out
}

fn first_installed(candidates: &[PathBuf]) -> Option<CloudSdk> {
    candidates
        .iter()
        .map(CloudSdk::new)
        .find(CloudSdk::is_installed)
}

fn describe(candidates: &[PathBuf]) -> String {
    if candidates.is_empty() {
        return "no candidate locations".to_string();
    }
    candidates
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
