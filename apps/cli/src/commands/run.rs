use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use devserver_config::LaunchConfiguration;
use devserver_launch::{CloudSdkDevServer, RunAdapter, RunError};

use crate::config::{LaunchArgs, resolve_configuration};

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    launch: LaunchArgs,

    /// Cloud SDK install directory (default: CLOUDSDK_HOME, gcloud on PATH, ~/google-cloud-sdk)
    #[arg(long, value_name = "PATH")]
    cloud_sdk_path: Option<PathBuf>,

    /// Python interpreter for dev_appserver.py (default: CLOUDSDK_PYTHON or python)
    #[arg(long)]
    python: Option<String>,

    /// Print the dev_appserver command line as JSON instead of starting it
    #[arg(long)]
    dry_run: bool,
}

pub async fn run(args: RunArgs) -> Result<()> {
    let config = resolve_configuration(&args.launch).map_err(RunError::from)?;

    let mut launcher = CloudSdkDevServer::new(args.cloud_sdk_path);
    if let Some(python) = args.python {
        launcher = launcher.with_python(python);
    }

    if args.dry_run {
        println!("{}", render_plan(&launcher, &config)?);
        return Ok(());
    }

    RunAdapter::new(config, launcher).execute().await?;
    Ok(())
}

fn render_plan(launcher: &CloudSdkDevServer, config: &LaunchConfiguration) -> Result<String> {
    let plan = launcher.plan(config).map_err(RunError::from)?;
    serde_json::to_string_pretty(&plan).context("Failed to serialize launch plan")
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!("devserver-cli-run-{prefix}-{nanos}"))
    }

    #[test]
    fn dry_run_renders_the_plan_without_starting_it() {
        let dir = unique_temp_dir("dry");
        let bin = dir.join("bin");
        let marker = dir.join("ran");
        std::fs::create_dir_all(&bin).expect("create bin dir");
        std::fs::write(
            bin.join("dev_appserver.py"),
            format!("touch '{}'\n", marker.display()),
        )
        .expect("write script");
        let config = LaunchConfiguration::builder()
            .manifest_path(&dir)
            .port(8085)
            .build()
            .expect("build config");
        let launcher = CloudSdkDevServer::new(Some(dir.clone())).with_python("sh");

        let rendered = render_plan(&launcher, &config).expect("render plan");
        let json: serde_json::Value = serde_json::from_str(&rendered).expect("plan is json");

        assert_eq!(json["program"], "sh");
        assert_eq!(json["argv"][1], "--port=8085");
        assert_eq!(json["argv"][2], dir.display().to_string());
        assert!(!marker.exists());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn dry_run_still_rejects_a_missing_manifest() {
        let dir = unique_temp_dir("dry-missing");
        std::fs::create_dir_all(dir.join("bin")).expect("create bin dir");
        std::fs::write(dir.join("bin").join("dev_appserver.py"), "exit 0\n").expect("write script");
        let config = LaunchConfiguration::builder()
            .manifest_path(dir.join("no-such-app"))
            .build()
            .expect("build config");
        let launcher = CloudSdkDevServer::new(Some(dir.clone()));

        let err = render_plan(&launcher, &config).expect_err("manifest missing");
        let run_err = err.downcast_ref::<RunError>().expect("run error");
        assert_eq!(run_err.exit_code(), 1);
        let _ = std::fs::remove_dir_all(dir);
    }
}
