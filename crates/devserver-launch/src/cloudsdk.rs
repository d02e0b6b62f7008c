use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use devserver_config::LaunchConfiguration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::errors::LaunchError;
use crate::launcher::DevServerLauncher;
use crate::plan::{DevServerPlan, missing_manifest_paths};
use crate::sdk::CloudSdk;

const PYTHON_ENV: &str = "CLOUDSDK_PYTHON";
const DEFAULT_PYTHON: &str = "python";

/// Runs `dev_appserver.py` from a Cloud SDK and waits for it to exit.
#[derive(Debug, Clone, Default)]
pub struct CloudSdkDevServer {
    sdk_path: Option<PathBuf>,
    python: Option<String>,
}

impl CloudSdkDevServer {
    pub fn new(sdk_path: Option<PathBuf>) -> Self {
        Self {
            sdk_path,
            ..Self::default()
        }
    }

    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = Some(python.into());
        self
    }

    /// The command line `run` would start, without starting it.
    pub fn plan(&self, config: &LaunchConfiguration) -> Result<DevServerPlan, LaunchError> {
        let sdk = CloudSdk::locate(self.sdk_path.as_deref())?;
        let missing = missing_manifest_paths(config);
        if let Some(path) = missing.first() {
            return Err(LaunchError::Rejected(format!(
                "app.yaml or application directory not found: {}",
                path.display()
            )));
        }
        Ok(DevServerPlan::new(
            self.python_program(),
            &sdk.dev_appserver_script(),
            config,
        ))
    }

    fn python_program(&self) -> String {
        self.python
            .clone()
            .or_else(|| std::env::var(PYTHON_ENV).ok().filter(|value| !value.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_PYTHON.to_string())
    }
}

#[async_trait]
impl DevServerLauncher for CloudSdkDevServer {
    async fn run(&self, config: &LaunchConfiguration) -> Result<(), LaunchError> {
        let plan = self.plan(config)?;

        info!(program = %plan.program, args = ?plan.argv, "starting dev_appserver");
        let (child, pumps) = spawn_dev_server(&plan)?;
        supervise(child, pumps, ctrl_c()).await
    }
}

/// Resolves on Ctrl-C. If the handler can't be installed it never resolves,
/// leaving the dev server to run until it exits.
async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for Ctrl-C: {err}");
        std::future::pending::<()>().await;
    }
}

async fn supervise(
    mut child: Child,
    pumps: Vec<JoinHandle<()>>,
    shutdown: impl Future<Output = ()>,
) -> Result<(), LaunchError> {
    let pid = child.id().unwrap_or_default();
    info!(pid, "dev_appserver running, press Ctrl-C to stop");

    let status = tokio::select! {
        status = child.wait() => status?,
        () = shutdown => {
            info!(pid, "stopping dev_appserver");
            child.kill().await?;
            drain(pumps).await;
            return Ok(());
        }
    };
    drain(pumps).await;

    if status.success() {
        info!("dev_appserver exited cleanly");
        Ok(())
    } else {
        Err(LaunchError::Exited {
            code: status.code(),
        })
    }
}

fn spawn_dev_server(plan: &DevServerPlan) -> Result<(Child, Vec<JoinHandle<()>>), LaunchError> {
    let mut cmd = Command::new(&plan.program);
    cmd.args(&plan.argv);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|err| match err.kind() {
        ErrorKind::NotFound => LaunchError::MissingDependency(format!(
            "{} not found (set {PYTHON_ENV} to choose an interpreter)",
            plan.program
        )),
        _ => LaunchError::Io(err),
    })?;

    let mut pumps = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        pumps.push(tokio::spawn(pump_lines(stdout, "stdout")));
    }
    if let Some(stderr) = child.stderr.take() {
        pumps.push(tokio::spawn(pump_lines(stderr, "stderr")));
    }
    Ok((child, pumps))
}

async fn pump_lines<R>(reader: R, stream: &'static str)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        info!(target: "dev_appserver", stream, "{line}");
    }
}

async fn drain(pumps: Vec<JoinHandle<()>>) {
    for pump in pumps {
        let _ = pump.await;
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

    fn unique_temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!("devserver-launch-run-{prefix}-{nanos}"))
    }

    /// An SDK whose dev_appserver.py is a shell script, run through `sh`.
    fn fake_sdk(root: &Path, body: &str) {
        let bin = root.join("bin");
        std::fs::create_dir_all(&bin).expect("create bin dir");
        std::fs::write(bin.join("dev_appserver.py"), body).expect("write script");
    }

    fn config_for(manifest: &Path) -> LaunchConfiguration {
        LaunchConfiguration::builder()
            .manifest_path(manifest)
            .host("0.0.0.0")
            .port(8085)
            .extra_runtime_flag("-Xmx512m")
            .build()
            .expect("build config")
    }

    #[tokio::test]
    async fn runs_the_script_with_rendered_flags() {
        let dir = unique_temp_dir("args");
        let out = dir.join("args.txt");
        fake_sdk(&dir, &format!("echo \"$@\" > '{}'\necho started\n", out.display()));
        let launcher = CloudSdkDevServer::new(Some(dir.clone())).with_python("sh");

        launcher.run(&config_for(&dir)).await.expect("dev server runs");

        let recorded = std::fs::read_to_string(&out).expect("read recorded args");
        assert_eq!(
            recorded.trim(),
            format!("--host=0.0.0.0 --port=8085 --jvm_flag=-Xmx512m {}", dir.display())
        );
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn non_zero_exit_is_reported_with_its_code() {
        let dir = unique_temp_dir("exit");
        fake_sdk(&dir, "echo 'bad flag' >&2\nexit 3\n");
        let launcher = CloudSdkDevServer::new(Some(dir.clone())).with_python("sh");

        let err = launcher.run(&config_for(&dir)).await.expect_err("script fails");
        assert!(matches!(err, LaunchError::Exited { code: Some(3) }));
        assert!(err.is_user_fixable());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn missing_manifest_is_rejected_before_spawning() {
        let dir = unique_temp_dir("manifest");
        let marker = dir.join("ran");
        fake_sdk(&dir, &format!("touch '{}'\n", marker.display()));
        let launcher = CloudSdkDevServer::new(Some(dir.clone())).with_python("sh");

        let err = launcher
            .run(&config_for(&dir.join("no-such-app")))
            .await
            .expect_err("manifest missing");
        assert!(matches!(err, LaunchError::Rejected(_)));
        assert!(err.to_string().contains("no-such-app"));
        assert!(!marker.exists());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn missing_interpreter_is_a_missing_dependency() {
        let dir = unique_temp_dir("python");
        fake_sdk(&dir, "exit 0\n");
        let launcher = CloudSdkDevServer::new(Some(dir.clone()))
            .with_python("devserver-launch-no-such-python");

        let err = launcher.run(&config_for(&dir)).await.expect_err("no interpreter");
        assert!(matches!(err, LaunchError::MissingDependency(_)));
        assert!(!err.is_user_fixable());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn plan_uses_the_sdk_script_without_running_it() {
        let dir = unique_temp_dir("plan");
        let marker = dir.join("ran");
        fake_sdk(&dir, &format!("touch '{}'\n", marker.display()));
        let launcher = CloudSdkDevServer::new(Some(dir.clone())).with_python("python2");

        let plan = launcher.plan(&config_for(&dir)).expect("plan");
        assert_eq!(plan.program, "python2");
        assert_eq!(
            plan.argv[0],
            dir.join("bin").join("dev_appserver.py").into_os_string()
        );
        assert_eq!(plan.argv.last(), Some(&dir.clone().into_os_string()));
        assert!(!marker.exists());
        let _ = std::fs::remove_dir_all(dir);
    }

    fn long_running() -> (Child, Vec<JoinHandle<()>>) {
        let plan = DevServerPlan {
            program: "sh".to_string(),
            argv: vec!["-c".into(), "echo up; exec sleep 30".into()],
        };
        spawn_dev_server(&plan).expect("spawn sh")
    }

    #[tokio::test]
    async fn shutdown_kills_the_dev_server_and_succeeds() {
        let (child, pumps) = long_running();
        let started = Instant::now();

        supervise(child, pumps, async {}).await.expect("stopped cleanly");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn pending_shutdown_waits_for_the_exit_status() {
        let plan = DevServerPlan {
            program: "sh".to_string(),
            argv: vec!["-c".into(), "exit 4".into()],
        };
        let (child, pumps) = spawn_dev_server(&plan).expect("spawn sh");

        let err = supervise(child, pumps, std::future::pending())
            .await
            .expect_err("non-zero exit");
        assert!(matches!(err, LaunchError::Exited { code: Some(4) }));
    }
}
