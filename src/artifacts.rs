//! Release artifacts produced from the sibling source trees: CLI binaries,
//! installer packages and the daemon binary.

use {
    crate::{
        architecture::Architecture,
        boxed_error, check_directory,
        command::{CommandRunner, Invocation},
        relocate, TRUCK,
    },
    log::*,
    std::{
        error::Error,
        fs,
        path::{Path, PathBuf},
    },
    strum::IntoEnumIterator,
};

pub const CLI_DIR: &str = "rocketpool-cli";
pub const INSTALL_DIR: &str = "install";
pub const DAEMON_DIR: &str = "rocketpool";
pub const BUILD_SCRIPT: &str = "./build.sh";
pub const INSTALL_SCRIPT: &str = "install.sh";

/// Binaries the CLI build script leaves in the CLI directory.
pub const CLI_BINARIES: [&str; 5] = [
    "rocketpool-cli-darwin-amd64",
    "rocketpool-cli-darwin-arm64",
    "rocketpool-cli-linux-amd64",
    "rocketpool-cli-linux-arm64",
    "rocketpool-cli-windows-amd64.exe",
];

pub fn package_archive_name(architecture: Architecture) -> String {
    format!("smartnode-install-{architecture}.tar.xz")
}

pub fn daemon_binary_name(architecture: Architecture) -> String {
    format!("rocketpool-daemon-linux-{architecture}")
}

/// Where a pre-built arm64 daemon can be fetched from with `scp`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteHost {
    pub user: String,
    pub host: String,
    pub path: String,
}

impl RemoteHost {
    /// Returns `None` unless user, host and path are all set and non-empty.
    pub fn from_parts(
        user: Option<&str>,
        host: Option<&str>,
        path: Option<&str>,
    ) -> Option<Self> {
        match (user, host, path) {
            (Some(user), Some(host), Some(path))
                if !user.is_empty() && !host.is_empty() && !path.is_empty() =>
            {
                Some(Self {
                    user: user.to_string(),
                    host: host.to_string(),
                    path: path.trim_end_matches('/').to_string(),
                })
            }
            _ => None,
        }
    }

    pub fn source(&self, file_name: &str) -> String {
        format!("{}@{}:{}/{}", self.user, self.host, self.path, file_name)
    }
}

pub struct ArtifactBuilder<'a> {
    root_path: &'a Path,
    output_dir: &'a Path,
    runner: &'a dyn CommandRunner,
}

impl<'a> ArtifactBuilder<'a> {
    pub fn new(root_path: &'a Path, output_dir: &'a Path, runner: &'a dyn CommandRunner) -> Self {
        Self {
            root_path,
            output_dir,
            runner,
        }
    }

    pub fn build_cli(&self) -> Result<(), Box<dyn Error>> {
        let cli_dir = self.root_path.join(CLI_DIR);
        check_directory(&cli_dir, "CLI source")?;

        let build = Invocation::new(BUILD_SCRIPT).current_dir(&cli_dir);
        self.runner.run(&build, "Building CLI binaries")?;

        // verify everything first so a partial build moves nothing
        let binaries: Vec<PathBuf> = CLI_BINARIES.iter().map(|name| cli_dir.join(name)).collect();
        if let Some(missing) = binaries.iter().find(|binary| !binary.is_file()) {
            return Err(boxed_error!(format!(
                "CLI build did not produce {}",
                missing.display()
            )));
        }
        for binary in &binaries {
            relocate(binary, self.output_dir)?;
        }
        info!("{TRUCK}Moved {} CLI binaries", binaries.len());
        Ok(())
    }

    pub fn build_install_packages(&self) -> Result<(), Box<dyn Error>> {
        let install_dir = self.root_path.join(INSTALL_DIR);
        check_directory(&install_dir, "Installer source")?;

        for architecture in Architecture::iter() {
            let archive_name = package_archive_name(architecture);
            let archive = install_dir.join(&archive_name);
            if archive.exists() {
                debug!("Removing stale {}", archive.display());
                fs::remove_file(&archive)?;
            }

            let tree = format!("{architecture}/rp-smartnode-install");
            check_directory(&install_dir.join(&tree), "Installer tree")?;
            let tar = Invocation::new("tar")
                .args(["cfJ", archive_name.as_str(), tree.as_str()])
                .current_dir(&install_dir);
            self.runner
                .run(&tar, &format!("Creating {architecture} install package"))?;

            if !archive.is_file() {
                return Err(boxed_error!(format!(
                    "tar did not produce {}",
                    archive.display()
                )));
            }
            relocate(&archive, self.output_dir)?;
        }

        let script = install_dir.join(INSTALL_SCRIPT);
        fs::copy(&script, self.output_dir.join(INSTALL_SCRIPT))
            .map_err(|err| format!("Failed to copy {}: {err}", script.display()))?;
        info!("Install packages ready");
        Ok(())
    }

    pub fn build_daemon(
        &self,
        architecture: Architecture,
        remote: Option<&RemoteHost>,
    ) -> Result<(), Box<dyn Error>> {
        let daemon_dir = self.root_path.join(DAEMON_DIR);
        check_directory(&daemon_dir, "Daemon source")?;

        match remote {
            Some(remote) => {
                let source = remote.source(&daemon_binary_name(Architecture::Arm64));
                let scp = Invocation::new("scp")
                    .arg(source)
                    .arg(self.output_dir.display().to_string());
                self.runner
                    .run(&scp, "Copying arm64 daemon from the remote build host")?;
            }
            None => warn!(
                "Remote build host not configured, skipping the pre-built arm64 daemon"
            ),
        }

        let build = Invocation::new(BUILD_SCRIPT).current_dir(&daemon_dir);
        self.runner
            .run(&build, &format!("Building {architecture} daemon"))?;

        let binary = daemon_dir.join(daemon_binary_name(architecture));
        if !binary.is_file() {
            return Err(boxed_error!(format!(
                "Daemon build did not produce {}",
                binary.display()
            )));
        }
        relocate(&binary, self.output_dir)?;
        Ok(())
    }
}
