use {
    crate::{boxed_error, command::Invocation, VERSION_TAG},
    std::{error::Error, path::PathBuf, str::FromStr},
    strum_macros::{Display, EnumString, VariantNames},
};

pub const DEFAULT_NETWORK: &str = "prater";
pub const DEFAULT_VALIDATORS_DIR: &str = "/validators";

const LIGHTHOUSE_BINARY: &str = "/usr/local/bin/lighthouse";
const PRYSM_BINARY: &str = "/app/cmd/validator/validator";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, VariantNames)]
#[strum(serialize_all = "lowercase")]
pub enum ValidatorClient {
    Lighthouse,
    Prysm,
}

/// `RP <version>` with an optional ` (<suffix>)`; blank suffixes are ignored.
pub fn graffiti(suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) if !suffix.is_empty() => format!("RP {VERSION_TAG} ({suffix})"),
        _ => format!("RP {VERSION_TAG}"),
    }
}

#[derive(Clone, Debug)]
pub struct LaunchConfig {
    pub client: ValidatorClient,
    pub beacon_endpoint: String,
    pub graffiti_suffix: Option<String>,
    pub network: String,
    pub validators_dir: PathBuf,
}

impl LaunchConfig {
    /// Validates the raw selector and endpoint. An unknown client is an
    /// error rather than a silent no-op.
    pub fn new(
        client: &str,
        beacon_endpoint: Option<&str>,
        graffiti_suffix: Option<&str>,
    ) -> Result<Self, Box<dyn Error>> {
        let client = ValidatorClient::from_str(client).map_err(|_| {
            format!("Unsupported validator client '{client}', expected lighthouse or prysm")
        })?;
        let beacon_endpoint = match beacon_endpoint {
            Some(endpoint) if !endpoint.is_empty() => endpoint.to_string(),
            _ => return Err(boxed_error!("No beacon node endpoint provided")),
        };

        Ok(Self {
            client,
            beacon_endpoint,
            graffiti_suffix: graffiti_suffix
                .filter(|suffix| !suffix.is_empty())
                .map(str::to_string),
            network: DEFAULT_NETWORK.to_string(),
            validators_dir: PathBuf::from(DEFAULT_VALIDATORS_DIR),
        })
    }

    pub fn graffiti(&self) -> String {
        graffiti(self.graffiti_suffix.as_deref())
    }

    /// The single process this config launches.
    pub fn invocation(&self) -> Invocation {
        let graffiti = self.graffiti();
        match self.client {
            ValidatorClient::Lighthouse => Invocation::new(LIGHTHOUSE_BINARY)
                .args(["validator", "--network", self.network.as_str()])
                .arg("--datadir")
                .arg(self.validators_dir.join("lighthouse").display().to_string())
                .arg("--init-slashing-protection")
                .args(["--beacon-node", self.beacon_endpoint.as_str()])
                .args(["--graffiti", graffiti.as_str()]),
            ValidatorClient::Prysm => {
                let wallet_dir = self.validators_dir.join("prysm-non-hd");
                Invocation::new(PRYSM_BINARY)
                    .arg("--accept-terms-of-use")
                    .arg(format!("--{}", self.network))
                    .arg("--wallet-dir")
                    .arg(wallet_dir.display().to_string())
                    .arg("--wallet-password-file")
                    .arg(wallet_dir.join("direct/accounts/secret").display().to_string())
                    .args(["--beacon-rpc-provider", self.beacon_endpoint.as_str()])
                    .args(["--graffiti", graffiti.as_str()])
            }
        }
    }
}
