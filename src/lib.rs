use {
    console::Emoji,
    indicatif::{ProgressBar, ProgressStyle},
    log::*,
    std::{
        error::Error,
        fs,
        path::{Path, PathBuf},
        time::Duration,
    },
};

#[macro_export]
macro_rules! boxed_error {
    ($message:expr) => {
        Box::<dyn std::error::Error>::from($message)
    };
}

pub mod architecture;
pub mod artifacts;
pub mod command;
pub mod docker;
pub mod release;
pub mod validator_client;

/// Version tag baked into the validator graffiti.
pub const VERSION_TAG: &str = concat!("v", env!("CARGO_PKG_VERSION"));

pub static BUILD: Emoji = Emoji("👷 ", "");
pub static PACKAGE: Emoji = Emoji("📦 ", "");
pub static ROCKET: Emoji = Emoji("🚀 ", "");
pub static TRUCK: Emoji = Emoji("🚚 ", "");
pub static WRITING: Emoji = Emoji("🖊️ ", "");

/// Creates a new process bar for processing that will take an unknown amount of time
pub fn new_spinner_progress_bar() -> ProgressBar {
    let progress_bar = ProgressBar::new(42);
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    progress_bar.set_style(style);
    progress_bar.enable_steady_tick(Duration::from_millis(100));
    progress_bar
}

pub fn check_directory(path: &Path, description: &str) -> Result<(), Box<dyn Error>> {
    if !path.exists() {
        return Err(boxed_error!(format!(
            "{description}: {} does not exist",
            path.display()
        )));
    }
    if !path.is_dir() {
        return Err(boxed_error!(format!(
            "{description}: {} is not a directory",
            path.display()
        )));
    }
    Ok(())
}

/// Moves `source` into `target_dir`, keeping its file name and replacing any
/// file of the same name already there.
pub fn relocate(source: &Path, target_dir: &Path) -> Result<PathBuf, Box<dyn Error>> {
    let file_name = source
        .file_name()
        .ok_or_else(|| format!("{} has no file name", source.display()))?;
    let target = target_dir.join(file_name);
    if target.exists() {
        fs::remove_file(&target)?;
    }

    // rename fails across filesystems, fall back to copy + remove
    if let Err(err) = fs::rename(source, &target) {
        debug!("rename {} failed ({err}), copying", source.display());
        fs::copy(source, &target).map_err(|err| {
            format!(
                "Failed to move {} to {}: {err}",
                source.display(),
                target.display()
            )
        })?;
        fs::remove_file(source)?;
    }
    trace!("moved {} -> {}", source.display(), target.display());
    Ok(target)
}
