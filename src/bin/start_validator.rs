use {
    clap::{command, Arg, ArgMatches},
    console::style,
    log::*,
    smartnode_tools::{
        validator_client::{LaunchConfig, DEFAULT_NETWORK, DEFAULT_VALIDATORS_DIR},
        ROCKET,
    },
    std::{error::Error, path::PathBuf, process::exit},
};

fn parse_matches() -> ArgMatches {
    command!()
        .about("Starts the configured validator client against the given beacon node")
        .arg(
            Arg::new("client")
                .long("client")
                .takes_value(true)
                .env("CLIENT")
                .help("Validator client to run: lighthouse or prysm"),
        )
        .arg(
            Arg::new("beacon_node")
                .long("beacon-node")
                .takes_value(true)
                .env("ETH2_PROVIDER")
                .help("Beacon node endpoint the validator connects to"),
        )
        .arg(
            Arg::new("graffiti_suffix")
                .long("graffiti-suffix")
                .takes_value(true)
                .env("CUSTOM_GRAFFITI")
                .help("Text appended to the graffiti in parentheses"),
        )
        .arg(
            Arg::new("network")
                .long("network")
                .takes_value(true)
                .env("ETH2_NETWORK")
                .default_value(DEFAULT_NETWORK)
                .help("Eth2 network name passed to the client"),
        )
        .arg(
            Arg::new("validators_dir")
                .long("validators-dir")
                .takes_value(true)
                .env("VALIDATORS_DIR")
                .default_value(DEFAULT_VALIDATORS_DIR)
                .help("Root directory of the validator keys and client data"),
        )
        .arg(
            Arg::new("dry_run")
                .long("dry-run")
                .help("Print the validator command instead of running it"),
        )
        .get_matches()
}

fn launch_config(matches: &ArgMatches) -> Result<LaunchConfig, Box<dyn Error>> {
    let mut config = LaunchConfig::new(
        matches.value_of("client").unwrap_or_default(),
        matches.value_of("beacon_node"),
        matches.value_of("graffiti_suffix"),
    )?;
    // unwraps are safe here, both carry default values
    config.network = matches.value_of("network").unwrap().to_string();
    config.validators_dir = PathBuf::from(matches.value_of("validators_dir").unwrap());
    Ok(config)
}

#[cfg(unix)]
fn exec(config: &LaunchConfig) -> Result<(), Box<dyn Error>> {
    use std::os::unix::process::CommandExt;

    let invocation = config.invocation();
    // only returns if the process image could not be replaced
    let err = invocation.to_command().exec();
    Err(format!("Failed to exec `{invocation}`: {err}").into())
}

#[cfg(not(unix))]
fn exec(config: &LaunchConfig) -> Result<(), Box<dyn Error>> {
    let invocation = config.invocation();
    let status = invocation
        .to_command()
        .status()
        .map_err(|err| format!("Failed to run `{invocation}`: {err}"))?;
    exit(status.code().unwrap_or(1));
}

fn main() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "INFO");
    }
    env_logger::init();

    let matches = parse_matches();
    let result = launch_config(&matches).and_then(|config| {
        info!(
            "{ROCKET}Starting {} validator with graffiti {:?}",
            config.client,
            config.graffiti()
        );
        if matches.is_present("dry_run") {
            println!("{}", config.invocation());
            return Ok(());
        }
        exec(&config)
    });

    if let Err(err) = result {
        eprintln!("{}", style(format!("**ERROR** {err}")).red().bold());
        exit(1);
    }
}
