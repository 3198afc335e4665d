use {
    crate::{boxed_error, new_spinner_progress_bar},
    log::*,
    std::{
        error::Error,
        fmt::{self, Display},
        path::{Path, PathBuf},
        process::{Command, Stdio},
        time::Instant,
    },
};

/// A single external command: program, arguments and working directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec![],
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        command
    }
}

impl Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Runs external commands on behalf of the release steps.
pub trait CommandRunner {
    /// Runs `invocation` to completion. Any non-zero exit is an error carrying
    /// `description`.
    fn run(&self, invocation: &Invocation, description: &str) -> Result<(), Box<dyn Error>>;
}

/// Spawns real processes and blocks until they exit.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation, description: &str) -> Result<(), Box<dyn Error>> {
        info!("command: {invocation}");
        let start_time = Instant::now();

        let progress_bar = new_spinner_progress_bar();
        progress_bar.set_message(format!("{description}..."));
        let output = invocation.to_command().stdin(Stdio::null()).output();
        progress_bar.finish_and_clear();

        let output = output
            .map_err(|err| format!("{description}: failed to run `{invocation}`: {err}"))?;
        if !output.stdout.is_empty() {
            debug!("{}", String::from_utf8_lossy(&output.stdout).trim_end());
        }
        if !output.status.success() {
            error!("`{invocation}` exited with {}", output.status);
            return Err(boxed_error!(format!(
                "{description}: `{invocation}` exited with {}\n{}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim_end()
            )));
        }

        debug!("{description} took {:.3?}", start_time.elapsed());
        Ok(())
    }
}
