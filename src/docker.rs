use {
    crate::{
        architecture::Architecture,
        command::{CommandRunner, Invocation},
    },
    log::*,
    std::{
        error::Error,
        fs, io,
        path::{Path, PathBuf},
    },
    strum::IntoEnumIterator,
};

pub const DEFAULT_NAMESPACE: &str = "rocketpool";
pub const DEFAULT_IMAGE_NAME: &str = "smartnode";
pub const DEFAULT_DOCKERFILE: &str = "docker/rocketpool-dockerfile";

pub struct DockerConfig {
    pub namespace: String,
    pub image_name: String,
    pub dockerfile: PathBuf,
    // local manifest store, usually ~/.docker/manifests
    manifest_store: Option<PathBuf>,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_NAMESPACE.to_string(),
            DEFAULT_IMAGE_NAME.to_string(),
            PathBuf::from(DEFAULT_DOCKERFILE),
        )
    }
}

impl DockerConfig {
    pub fn new(namespace: String, image_name: String, dockerfile: PathBuf) -> Self {
        DockerConfig {
            namespace,
            image_name,
            dockerfile,
            manifest_store: dirs::home_dir().map(|home| home.join(".docker/manifests")),
        }
    }

    pub fn with_manifest_store(mut self, manifest_store: PathBuf) -> Self {
        self.manifest_store = Some(manifest_store);
        self
    }

    /// `<namespace>/<image>:<tag>`
    pub fn image_reference(&self, tag: &str) -> String {
        format!("{}/{}:{}", self.namespace, self.image_name, tag)
    }

    pub fn arch_image(&self, version: &str, architecture: Architecture) -> String {
        self.image_reference(&format!("{version}-{architecture}"))
    }

    pub fn build_image(
        &self,
        runner: &dyn CommandRunner,
        context_path: &Path,
        version: &str,
        architecture: Architecture,
    ) -> Result<(), Box<dyn Error>> {
        let image = self.arch_image(version, architecture);
        let build = Invocation::new("docker")
            .args(["build", "-t", image.as_str(), "-f"])
            .arg(self.dockerfile.display().to_string())
            .arg(".")
            .current_dir(context_path);
        runner.run(&build, &format!("Building Docker image {image}"))?;
        info!("{image} image build complete");

        let push = Invocation::new("docker").args(["push", image.as_str()]);
        runner.run(&push, &format!("Pushing {image}"))?;
        info!("Pushed {image}");
        Ok(())
    }

    /// Creates a multi-arch manifest `tag` over the per-arch images of
    /// `version` and pushes it, replacing any remote manifest of that name.
    pub fn build_manifest(
        &self,
        runner: &dyn CommandRunner,
        version: &str,
        tag: &str,
    ) -> Result<(), Box<dyn Error>> {
        self.remove_local_manifest(tag)?;

        let manifest = self.image_reference(tag);
        let mut create = Invocation::new("docker").args(["manifest", "create", manifest.as_str()]);
        for architecture in Architecture::iter() {
            create = create
                .arg("--amend")
                .arg(self.arch_image(version, architecture));
        }
        runner.run(&create, &format!("Creating Docker manifest {manifest}"))?;

        let push =
            Invocation::new("docker").args(["manifest", "push", "--purge", manifest.as_str()]);
        runner.run(&push, &format!("Pushing Docker manifest {manifest}"))?;
        info!("Pushed manifest {manifest}");
        Ok(())
    }

    fn local_manifest_path(&self, tag: &str) -> Option<PathBuf> {
        self.manifest_store.as_ref().map(|store| {
            store.join(format!(
                "docker.io_{}_{}-{}",
                self.namespace.replace('/', "_"),
                self.image_name,
                tag
            ))
        })
    }

    fn remove_local_manifest(&self, tag: &str) -> Result<(), Box<dyn Error>> {
        let Some(path) = self.local_manifest_path(tag) else {
            warn!("No home directory, not clearing local manifest for {tag}");
            return Ok(());
        };

        let removed = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        match removed {
            Ok(()) => {
                debug!("Removed stale manifest {}", path.display());
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(format!(
                "Failed to remove stale manifest {}: {err}",
                path.display()
            )
            .into()),
        }
    }
}
