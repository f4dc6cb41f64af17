// Start the local services (indradb, the k8s api mock, the mocknet server)
// before the operation loop begins. Every service is described by a typed
// LaunchSpec and started without going through a shell.

use std::fmt;

use tokio::process::Command;

use crate::cli::CtlConfig;
use crate::errors::CtlError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    None,     // the services are managed elsewhere
    Terminal, // one gnome-terminal window per service
    Docker,   // one host-network container per service
}

impl Default for LaunchMode {
    fn default() -> Self {
        LaunchMode::None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
}

impl LaunchSpec {
    fn new<S: Into<String>>(name: S, program: S) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
        }
    }

    fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    pub async fn spawn(&self) -> Result<Option<u32>, CtlError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        let child = cmd.spawn()?;
        Ok(child.id())
    }
}

impl fmt::Display for LaunchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in self.args.iter() {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

fn bin_path(dir: &str, bin: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), bin)
}

fn mocknet_server_args(config: &CtlConfig, bin_dir: &str) -> Vec<String> {
    vec![
        bin_path(bin_dir, "mocknet_server"),
        "--warp-addr".to_string(),
        config.mocknet_addr(),
        "--indradb-addr".to_string(),
        config.indradb_addr(),
        "--cluster-config".to_string(),
        config.config_file.clone(),
    ]
}

fn terminal(name: &str, command: Vec<String>) -> LaunchSpec {
    LaunchSpec::new(name, "gnome-terminal").arg("--").args(command)
}

// docker run --net=host --privileged -itd [-v ...] --name <name> <image> <command...>
fn container(name: &str, image: &str, volumes: &[(&str, &str)], command: Vec<String>) -> LaunchSpec {
    let mut spec = LaunchSpec::new(name, "docker")
        .arg("run")
        .arg("--net=host")
        .arg("--privileged");
    for (host, guest) in volumes.iter() {
        spec = spec.arg("-v").arg(format!("{}:{}", host, guest));
    }
    spec.arg("-itd")
        .arg("--name")
        .arg(name)
        .arg(image)
        .args(command)
}

/// The ordered list of services to start for the given configuration.
pub fn launch_plan(config: &CtlConfig) -> Vec<LaunchSpec> {
    match config.launch {
        LaunchMode::None => Vec::new(),
        LaunchMode::Terminal => vec![
            terminal(
                "indradb-server",
                vec![bin_path(&config.indradb_dir, "indradb-server")],
            ),
            terminal(
                "api-mockserver",
                vec![bin_path(&config.mocknet_dir, "api_mockserver")],
            ),
            terminal("mocknet-server", mocknet_server_args(config, &config.mocknet_dir)),
        ],
        LaunchMode::Docker => vec![
            container(
                "indradb-server",
                &config.image,
                &[("/tmp", "/tmp"), (config.indradb_dir.as_str(), "/workspace")],
                vec![
                    "/workspace/indradb-server".to_string(),
                    "-a".to_string(),
                    config.indradb_addr(),
                    "rocksdb".to_string(),
                    "/tmp/mocknet".to_string(),
                ],
            ),
            container(
                "mocknet-server",
                &config.image,
                &[(config.mocknet_dir.as_str(), "/workspace")],
                mocknet_server_args(config, "/workspace"),
            ),
            container(
                "server-check",
                &config.image,
                &[(config.mocknet_dir.as_str(), "/workspace")],
                vec![
                    "/workspace/server_check".to_string(),
                    "--warp-addr".to_string(),
                    config.server_check_addr(),
                ],
            ),
        ],
    }
}

/// Start every service of the plan. A failing service does not prevent the
/// remaining ones from being started; the failures are returned to the caller.
pub async fn launch_all(plan: &[LaunchSpec]) -> Vec<(String, CtlError)> {
    let mut failures = Vec::new();
    for spec in plan.iter() {
        match spec.spawn().await {
            Ok(pid) => tracing::info!(service = %spec.name, ?pid, command = %spec, "service launched"),
            Err(e) => {
                tracing::warn!(service = %spec.name, command = %spec, error = %e, "fail to launch service");
                failures.push((spec.name.clone(), e));
            }
        }
    }
    failures
}
