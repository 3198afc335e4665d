use {
    crate::{
        architecture::Architecture,
        artifacts::{ArtifactBuilder, RemoteHost},
        command::CommandRunner,
        docker::DockerConfig,
        BUILD, PACKAGE, ROCKET, WRITING,
    },
    console::Emoji,
    log::*,
    std::{
        collections::BTreeSet,
        error::Error,
        fs,
        path::{Path, PathBuf},
        time::Instant,
    },
    strum::IntoEnumIterator,
    strum_macros::{Display, EnumIter, IntoStaticStr},
};

/// Release steps in the order they always execute.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter, IntoStaticStr,
)]
pub enum ReleaseStep {
    #[strum(serialize = "cli")]
    Cli,
    #[strum(serialize = "packages")]
    Packages,
    #[strum(serialize = "daemon")]
    Daemon,
    #[strum(serialize = "docker-image")]
    DockerImage,
    #[strum(serialize = "docker-manifest")]
    DockerManifest,
    #[strum(serialize = "latest-manifest")]
    LatestManifest,
}

impl ReleaseStep {
    /// Short command-line flag selecting this step.
    pub fn flag(&self) -> char {
        match self {
            ReleaseStep::Cli => 'c',
            ReleaseStep::Packages => 'p',
            ReleaseStep::Daemon => 'm',
            ReleaseStep::DockerImage => 'd',
            ReleaseStep::DockerManifest => 'n',
            ReleaseStep::LatestManifest => 'l',
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ReleaseStep::Cli => "Build CLI binaries",
            ReleaseStep::Packages => "Build install packages",
            ReleaseStep::Daemon => "Build daemon binaries",
            ReleaseStep::DockerImage => "Build and push Docker image",
            ReleaseStep::DockerManifest => "Build and push Docker manifest",
            ReleaseStep::LatestManifest => "Tag Docker manifest as latest (not part of -a)",
        }
    }

    /// Whether `-a` selects this step.
    pub fn in_all(&self) -> bool {
        !matches!(self, ReleaseStep::LatestManifest)
    }

    fn emoji(&self) -> &'static Emoji<'static, 'static> {
        match self {
            ReleaseStep::Cli | ReleaseStep::Daemon => &BUILD,
            ReleaseStep::Packages => &PACKAGE,
            ReleaseStep::DockerImage => &ROCKET,
            ReleaseStep::DockerManifest | ReleaseStep::LatestManifest => &WRITING,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepSelection {
    steps: BTreeSet<ReleaseStep>,
}

impl StepSelection {
    pub fn all() -> Self {
        Self {
            steps: ReleaseStep::iter().filter(ReleaseStep::in_all).collect(),
        }
    }

    pub fn select(&mut self, step: ReleaseStep) {
        self.steps.insert(step);
    }

    pub fn with(mut self, step: ReleaseStep) -> Self {
        self.select(step);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Selected steps in execution order.
    pub fn steps(&self) -> impl Iterator<Item = ReleaseStep> + '_ {
        self.steps.iter().copied()
    }
}

impl FromIterator<ReleaseStep> for StepSelection {
    fn from_iter<I: IntoIterator<Item = ReleaseStep>>(iter: I) -> Self {
        Self {
            steps: iter.into_iter().collect(),
        }
    }
}

pub struct ReleaseConfig {
    pub version: String,
    pub architecture: Architecture,
    pub root_path: PathBuf,
    pub docker: DockerConfig,
    pub remote: Option<RemoteHost>,
}

/// Longest tag the Docker registry accepts.
const MAX_VERSION_LEN: usize = 128;

impl ReleaseConfig {
    /// Fails unless `version` is a valid Docker tag, which also keeps it a
    /// single plain path component under `build/`.
    pub fn new(
        version: &str,
        architecture: Architecture,
        root_path: PathBuf,
        docker: DockerConfig,
        remote: Option<RemoteHost>,
    ) -> Result<Self, Box<dyn Error>> {
        validate_version(version)?;
        Ok(Self {
            version: version.to_string(),
            architecture,
            root_path,
            docker,
            remote,
        })
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root_path.join("build").join(&self.version)
    }
}

/// `[A-Za-z0-9_.-]`, not starting with `.` or `-`, at most 128 characters.
pub fn validate_version(version: &str) -> Result<(), Box<dyn Error>> {
    let valid = !version.is_empty()
        && version.len() <= MAX_VERSION_LEN
        && !version.starts_with(['.', '-'])
        && version
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if !valid {
        return Err(format!(
            "Invalid version '{version}': expected [A-Za-z0-9_.-], not starting with '.' or '-', \
             at most {MAX_VERSION_LEN} characters"
        )
        .into());
    }
    Ok(())
}

pub struct Release<'a> {
    config: ReleaseConfig,
    runner: &'a dyn CommandRunner,
}

impl<'a> Release<'a> {
    pub fn new(config: ReleaseConfig, runner: &'a dyn CommandRunner) -> Self {
        Self { config, runner }
    }

    /// Creates `build/<version>` and clears anything left from a previous run.
    pub fn prepare_output_dir(&self) -> Result<PathBuf, Box<dyn Error>> {
        let output_dir = self.config.output_dir();
        if output_dir.exists() {
            fs::remove_dir_all(&output_dir).map_err(|err| {
                format!("Failed to clear {}: {err}", output_dir.display())
            })?;
        }
        fs::create_dir_all(&output_dir)?;
        Ok(output_dir)
    }

    /// Runs every selected step in order, stopping at the first failure.
    pub fn run(&self, selection: &StepSelection) -> Result<(), Box<dyn Error>> {
        if selection.is_empty() {
            warn!("No release steps selected");
            return Ok(());
        }

        let output_dir = self.prepare_output_dir()?;
        let start_time = Instant::now();
        for step in selection.steps() {
            info!("{}{}...", step.emoji(), step.description());
            self.execute(step, &output_dir)
                .map_err(|err| format!("{} failed: {err}", step.description()))?;
            info!("{step} done");
        }

        info!(
            "Release {} ({}) finished in {:.3?}",
            self.config.version,
            self.config.architecture,
            start_time.elapsed()
        );
        Ok(())
    }

    fn execute(&self, step: ReleaseStep, output_dir: &Path) -> Result<(), Box<dyn Error>> {
        let config = &self.config;
        let artifacts = ArtifactBuilder::new(&config.root_path, output_dir, self.runner);
        match step {
            ReleaseStep::Cli => artifacts.build_cli(),
            ReleaseStep::Packages => artifacts.build_install_packages(),
            ReleaseStep::Daemon => {
                artifacts.build_daemon(config.architecture, config.remote.as_ref())
            }
            ReleaseStep::DockerImage => config.docker.build_image(
                self.runner,
                &config.root_path,
                &config.version,
                config.architecture,
            ),
            ReleaseStep::DockerManifest => {
                config
                    .docker
                    .build_manifest(self.runner, &config.version, &config.version)
            }
            ReleaseStep::LatestManifest => {
                config
                    .docker
                    .build_manifest(self.runner, &config.version, "latest")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            artifacts::{
                daemon_binary_name, package_archive_name, BUILD_SCRIPT, CLI_BINARIES, CLI_DIR,
                DAEMON_DIR, INSTALL_DIR, INSTALL_SCRIPT,
            },
            boxed_error,
            command::Invocation,
        },
        std::cell::RefCell,
        tempfile::TempDir,
    };

    /// Fakes every external tool and fails when the invocation's description
    /// starts with `fail_on`.
    #[derive(Default)]
    struct ScriptedRunner {
        log: RefCell<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, invocation: &Invocation, description: &str) -> Result<(), Box<dyn Error>> {
            self.log.borrow_mut().push(invocation.to_string());
            if let Some(prefix) = self.fail_on {
                if description.starts_with(prefix) {
                    return Err(boxed_error!(format!("{description}: exit status: 2")));
                }
            }

            let dir = invocation.get_current_dir();
            match (invocation.program(), dir) {
                (BUILD_SCRIPT, Some(dir)) if dir.ends_with(CLI_DIR) => {
                    for name in CLI_BINARIES {
                        fs::write(dir.join(name), name).unwrap();
                    }
                }
                (BUILD_SCRIPT, Some(dir)) => {
                    for arch in Architecture::iter() {
                        fs::write(dir.join(daemon_binary_name(arch)), "daemon").unwrap();
                    }
                }
                ("tar", Some(dir)) => {
                    fs::write(dir.join(&invocation.get_args()[1]), "archive").unwrap();
                }
                _ => {}
            }
            Ok(())
        }
    }

    fn repo() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join(CLI_DIR)).unwrap();
        fs::create_dir_all(root.join(DAEMON_DIR)).unwrap();
        for arch in Architecture::iter() {
            fs::create_dir_all(root.join(INSTALL_DIR).join(format!("{arch}/rp-smartnode-install")))
                .unwrap();
        }
        fs::write(root.join(INSTALL_DIR).join(INSTALL_SCRIPT), "").unwrap();
        temp
    }

    fn config(root: &Path) -> ReleaseConfig {
        ReleaseConfig::new(
            "v1.0.0",
            Architecture::Amd64,
            root.to_path_buf(),
            DockerConfig::default().with_manifest_store(root.join("manifests")),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_validate_version() {
        for version in ["v1.0.0", "1.2.3-rc1", "latest_build", "V9"] {
            assert!(validate_version(version).is_ok(), "{version}");
        }
        let too_long = "v".repeat(MAX_VERSION_LEN + 1);
        for version in ["", "..", ".", "a/b", "-x", ".hidden", "v1 0", "../v1", too_long.as_str()] {
            assert!(validate_version(version).is_err(), "{version}");
        }
        assert!(validate_version(&"v".repeat(MAX_VERSION_LEN)).is_ok());
    }

    #[test]
    fn test_invalid_version_leaves_repository_alone() {
        let temp = repo();
        fs::create_dir_all(temp.path().join("build")).unwrap();
        fs::write(temp.path().join("precious.txt"), "keep").unwrap();

        for version in ["..", "a/b", "-x"] {
            let result = ReleaseConfig::new(
                version,
                Architecture::Amd64,
                temp.path().to_path_buf(),
                DockerConfig::default(),
                None,
            );
            assert!(result.is_err(), "{version}");
        }
        assert!(temp.path().join("precious.txt").is_file());
        assert!(temp.path().join(CLI_DIR).is_dir());
        assert!(temp.path().join("build").is_dir());
    }

    #[test]
    fn test_all_selects_core_steps_in_order() {
        let steps: Vec<ReleaseStep> = StepSelection::all().steps().collect();
        assert_eq!(
            steps,
            vec![
                ReleaseStep::Cli,
                ReleaseStep::Packages,
                ReleaseStep::Daemon,
                ReleaseStep::DockerImage,
                ReleaseStep::DockerManifest,
            ]
        );
    }

    #[test]
    fn test_selection_order_ignores_insert_order() {
        let selection: StepSelection = [
            ReleaseStep::DockerManifest,
            ReleaseStep::Cli,
            ReleaseStep::DockerImage,
        ]
        .into_iter()
        .collect();
        let steps: Vec<ReleaseStep> = selection.steps().collect();
        assert_eq!(
            steps,
            vec![
                ReleaseStep::Cli,
                ReleaseStep::DockerImage,
                ReleaseStep::DockerManifest
            ]
        );
    }

    #[test]
    fn test_flags_are_unique() {
        let flags: BTreeSet<char> = ReleaseStep::iter().map(|step| step.flag()).collect();
        assert_eq!(flags.len(), ReleaseStep::iter().count());
        assert!(!flags.contains(&'a') && !flags.contains(&'v'));
    }

    #[test]
    fn test_run_all_steps() {
        let temp = repo();
        let runner = ScriptedRunner::default();
        let release = Release::new(config(temp.path()), &runner);
        release.run(&StepSelection::all()).unwrap();

        let output = temp.path().join("build/v1.0.0");
        for name in CLI_BINARIES {
            assert!(output.join(name).is_file(), "{name}");
        }
        assert!(output.join(package_archive_name(Architecture::Arm64)).is_file());
        assert!(output.join(daemon_binary_name(Architecture::Amd64)).is_file());

        let log = runner.log.borrow();
        assert_eq!(log[0], BUILD_SCRIPT);
        assert_eq!(
            log.last().unwrap(),
            "docker manifest push --purge rocketpool/smartnode:v1.0.0"
        );
        assert!(log.iter().all(|line| !line.contains(":latest")));
    }

    #[test]
    fn test_failure_stops_later_steps() {
        let temp = repo();
        let runner = ScriptedRunner {
            fail_on: Some("Creating amd64 install package"),
            ..Default::default()
        };
        let release = Release::new(config(temp.path()), &runner);
        let err = release.run(&StepSelection::all()).unwrap_err();
        assert!(err.to_string().starts_with("Build install packages failed"));

        let log = runner.log.borrow();
        assert!(log.iter().all(|line| !line.starts_with("docker")));
        assert!(log.iter().all(|line| !line.contains("arm64")));

        let output = temp.path().join("build/v1.0.0");
        assert!(output.join(CLI_BINARIES[0]).is_file());
        assert!(!output.join(daemon_binary_name(Architecture::Amd64)).exists());
        assert!(!output.join(INSTALL_SCRIPT).exists());
    }

    #[test]
    fn test_failed_image_push_skips_manifest() {
        let temp = repo();
        let runner = ScriptedRunner {
            fail_on: Some("Pushing rocketpool/smartnode:v1.0.0-amd64"),
            ..Default::default()
        };
        let selection = StepSelection::default()
            .with(ReleaseStep::DockerImage)
            .with(ReleaseStep::DockerManifest);
        let err = Release::new(config(temp.path()), &runner)
            .run(&selection)
            .unwrap_err();
        assert!(err.to_string().contains("Build and push Docker image failed"));
        assert_eq!(runner.log.borrow().len(), 2);
    }

    #[test]
    fn test_output_dir_is_cleared() {
        let temp = repo();
        let output = temp.path().join("build/v1.0.0");
        fs::create_dir_all(output.join("nested")).unwrap();
        fs::write(output.join("old-artifact"), "").unwrap();

        let runner = ScriptedRunner::default();
        Release::new(config(temp.path()), &runner)
            .run(&StepSelection::default().with(ReleaseStep::DockerImage))
            .unwrap();
        assert!(output.is_dir());
        assert_eq!(fs::read_dir(&output).unwrap().count(), 0);
    }

    #[test]
    fn test_empty_selection_touches_nothing() {
        let temp = repo();
        let runner = ScriptedRunner::default();
        Release::new(config(temp.path()), &runner)
            .run(&StepSelection::default())
            .unwrap();
        assert!(!temp.path().join("build").exists());
        assert!(runner.log.borrow().is_empty());
    }
}
