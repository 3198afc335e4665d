use {
    crate::boxed_error,
    log::*,
    std::{error::Error, process::Command},
    strum_macros::{Display, EnumIter, EnumString},
};

/// CPU architecture the release artifacts and Docker images are tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Architecture {
    Amd64,
    Arm64,
}

impl Architecture {
    /// Maps a machine type as reported by `uname -m`.
    pub fn from_machine(machine: &str) -> Result<Self, Box<dyn Error>> {
        match machine {
            "x86_64" => Ok(Architecture::Amd64),
            "aarch64" => Ok(Architecture::Arm64),
            _ => Err(boxed_error!(format!(
                "CPU architecture {machine} is not supported"
            ))),
        }
    }

    pub fn detect() -> Result<Self, Box<dyn Error>> {
        let output = Command::new("uname")
            .arg("-m")
            .output()
            .map_err(|err| format!("Failed to run uname: {err}"))?;
        if !output.status.success() {
            return Err(boxed_error!(format!(
                "uname exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let machine = String::from_utf8_lossy(&output.stdout);
        let architecture = Self::from_machine(machine.trim())?;
        debug!("machine type {} -> {architecture}", machine.trim());
        Ok(architecture)
    }
}

#[cfg(test)]
mod tests {
    use {super::*, std::str::FromStr};

    #[test]
    fn test_from_machine() {
        assert_eq!(
            Architecture::from_machine("x86_64").unwrap(),
            Architecture::Amd64
        );
        assert_eq!(
            Architecture::from_machine("aarch64").unwrap(),
            Architecture::Arm64
        );
    }

    #[test]
    fn test_unsupported_machine() {
        for machine in ["armv7l", "i686", "arm64", "riscv64", ""] {
            let err = Architecture::from_machine(machine).unwrap_err();
            assert!(err.to_string().contains("not supported"), "{machine}");
        }
    }

    #[test]
    fn test_display_and_parse() {
        assert_eq!(Architecture::Amd64.to_string(), "amd64");
        assert_eq!(Architecture::Arm64.to_string(), "arm64");
        assert_eq!(
            Architecture::from_str("arm64").unwrap(),
            Architecture::Arm64
        );
        assert!(Architecture::from_str("x86_64").is_err());
    }
}
