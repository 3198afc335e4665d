use {
    clap::{command, error::ErrorKind, Arg, ArgMatches, Command},
    console::style,
    log::*,
    smartnode_tools::{
        architecture::Architecture,
        artifacts::RemoteHost,
        check_directory,
        command::SystemRunner,
        docker::{DockerConfig, DEFAULT_DOCKERFILE, DEFAULT_IMAGE_NAME, DEFAULT_NAMESPACE},
        release::{validate_version, Release, ReleaseConfig, ReleaseStep, StepSelection},
    },
    std::{error::Error, ffi::OsString, path::PathBuf, process::exit},
    strum::IntoEnumIterator,
};

fn build_command() -> Command<'static> {
    let mut command = command!()
        .about("Builds and publishes the release artifacts for a given version")
        .arg(Arg::new("all").short('a').help("Build all of the artifacts"));

    for step in ReleaseStep::iter() {
        let id: &'static str = step.into();
        command = command.arg(Arg::new(id).short(step.flag()).help(step.description()));
    }

    command
        .arg(
            Arg::new("release_version")
                .short('v')
                .long("release-version")
                .takes_value(true)
                .value_name("VERSION")
                .help("The version number to build (e.g. v1.0.0)"),
        )
        .arg(
            Arg::new("root")
                .long("root")
                .takes_value(true)
                .env("SMARTNODE_ROOT")
                .default_value(".")
                .help("Repository root holding the CLI, installer and daemon sources"),
        )
        .arg(
            Arg::new("docker_namespace")
                .long("docker-namespace")
                .takes_value(true)
                .default_value(DEFAULT_NAMESPACE)
                .help("Docker Hub namespace the images are pushed to"),
        )
        .arg(
            Arg::new("image_name")
                .long("image-name")
                .takes_value(true)
                .default_value(DEFAULT_IMAGE_NAME)
                .help("Docker image name"),
        )
        .arg(
            Arg::new("dockerfile")
                .long("dockerfile")
                .takes_value(true)
                .default_value(DEFAULT_DOCKERFILE)
                .help("Dockerfile path, relative to the repository root"),
        )
        // arm64 daemon build host
        .arg(
            Arg::new("remote_user")
                .long("remote-user")
                .takes_value(true)
                .env("ARM64_BUILD_USER")
                .help("User on the arm64 build host"),
        )
        .arg(
            Arg::new("remote_host")
                .long("remote-host")
                .takes_value(true)
                .env("ARM64_BUILD_HOST")
                .help("arm64 build host to copy the pre-built daemon from"),
        )
        .arg(
            Arg::new("remote_path")
                .long("remote-path")
                .takes_value(true)
                .env("ARM64_BUILD_PATH")
                .help("Directory on the arm64 build host holding the daemon binary"),
        )
        .arg(
            Arg::new("machine")
                .long("machine")
                .takes_value(true)
                .env("RELEASE_MACHINE_TYPE")
                .hide(true)
                .help("Machine type to use instead of `uname -m`"),
        )
}

enum ParsedArgs {
    Matches(ArgMatches),
    /// Help, version or an incomplete invocation: print usage, exit 0.
    Usage(Option<clap::Error>),
    Failed(clap::Error),
}

fn parse_args<I, T>(command: &Command<'static>, args: I) -> ParsedArgs
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match command.clone().try_get_matches_from(args) {
        Ok(matches) => ParsedArgs::Matches(matches),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ParsedArgs::Usage(Some(err)),
            // `-v` given without a value
            ErrorKind::EmptyValue => ParsedArgs::Usage(None),
            _ => ParsedArgs::Failed(err),
        },
    }
}

fn print_usage(mut command: Command<'static>) -> ! {
    if let Err(err) = command.print_help() {
        error!("Failed to print usage: {err}");
    }
    println!();
    exit(0);
}

fn fail(err: impl std::fmt::Display) -> ! {
    let message = err.to_string();
    eprintln!(
        "{}",
        style(format!("**ERROR** {}", message.trim_end())).red().bold()
    );
    exit(1);
}

fn step_selection(matches: &ArgMatches) -> StepSelection {
    let mut selection = if matches.is_present("all") {
        StepSelection::all()
    } else {
        StepSelection::default()
    };
    for step in ReleaseStep::iter() {
        let id: &'static str = step.into();
        if matches.is_present(id) {
            selection.select(step);
        }
    }
    selection
}

fn run(matches: &ArgMatches, version: &str) -> Result<(), Box<dyn Error>> {
    let architecture = match matches.value_of("machine") {
        Some(machine) => Architecture::from_machine(machine)?,
        None => Architecture::detect()?,
    };
    info!("Building release {version} for {architecture}");

    // unwraps are safe here, these all carry default values
    let root_path = PathBuf::from(matches.value_of("root").unwrap());
    check_directory(&root_path, "Repository root")?;

    let docker = DockerConfig::new(
        matches.value_of("docker_namespace").unwrap().to_string(),
        matches.value_of("image_name").unwrap().to_string(),
        PathBuf::from(matches.value_of("dockerfile").unwrap()),
    );
    let remote = RemoteHost::from_parts(
        matches.value_of("remote_user"),
        matches.value_of("remote_host"),
        matches.value_of("remote_path"),
    );

    let config = ReleaseConfig::new(version, architecture, root_path, docker, remote)?;
    let runner = SystemRunner;
    Release::new(config, &runner).run(&step_selection(matches))
}

fn main() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "INFO");
    }
    env_logger::init();

    let command = build_command();
    let matches = match parse_args(&command, std::env::args_os()) {
        ParsedArgs::Matches(matches) => matches,
        ParsedArgs::Usage(Some(err)) => {
            if let Err(print_err) = err.print() {
                error!("Failed to print usage: {print_err}");
            }
            exit(0);
        }
        ParsedArgs::Usage(None) => print_usage(command),
        ParsedArgs::Failed(err) => fail(err),
    };

    // missing version is a usage request, not a failure
    let version = match matches.value_of("release_version") {
        Some(version) if !version.trim().is_empty() => version.trim().to_string(),
        _ => print_usage(command),
    };
    if let Err(err) = validate_version(&version) {
        fail(err);
    }

    if let Err(err) = run(&matches, &version) {
        fail(err);
    }
}
