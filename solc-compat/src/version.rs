use std::{fmt::Display, str::FromStr, sync::LazyLock};

use derive_more::derive::{From, Into};
use regex::Regex;
use serde::{Deserialize, Serialize};

static TRIPLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+)\.([0-9]+)\.([0-9]+)").unwrap());

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("malformed compiler version {0:?}")]
    Malformed(String),
}

/// Version reported by an installed compiler binary.
///
/// Pre-release and build metadata are kept for display of the full version but
/// never take part in matching: only the `major.minor.patch` triple does.
#[derive(From, Into, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompilerVersion(semver::Version);

impl CompilerVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self(semver::Version::new(major, minor, patch))
    }

    pub fn parse(s: &str) -> Result<Self, Error> {
        semver::Version::parse(s.trim())
            .map(Self)
            .map_err(|_| Error::Malformed(s.to_owned()))
    }

    /// Picks the version out of `solc --version` output, e.g.
    /// `Version: 0.8.11+commit.d7f03943.Linux.g++`.
    pub fn from_solc_output(output: &str) -> Result<Self, Error> {
        let Some(caps) = TRIPLE.captures(output) else {
            return Err(Error::Malformed(output.trim().to_owned()));
        };
        let component = |i: usize| -> Result<u64, Error> {
            caps[i]
                .parse()
                .map_err(|_| Error::Malformed(output.trim().to_owned()))
        };
        Ok(Self::new(component(1)?, component(2)?, component(3)?))
    }

    pub fn major(&self) -> u64 {
        self.0.major
    }

    pub fn minor(&self) -> u64 {
        self.0.minor
    }

    pub fn patch(&self) -> u64 {
        self.0.patch
    }

    pub fn triple(&self) -> Triple {
        Triple(self.0.major, self.0.minor, self.0.patch)
    }
}

impl FromStr for CompilerVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Always the bare triple, which is also the artifact file-name convention and
/// the value recorded in `ContractInfo::compiler_version`.
impl Display for CompilerVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.0.major, self.0.minor, self.0.patch)
    }
}

/// `major.minor.patch` with lexicographic ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Triple(pub u64, pub u64, pub u64);

impl Display for Triple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.0, self.1, self.2)
    }
}

/// Returns the `Version: ...` line of `solc --version` output, or the whole
/// trimmed output when there is no such line.
pub fn full_version_line(output: &str) -> String {
    output
        .lines()
        .find_map(|l| l.trim().strip_prefix("Version:"))
        .map(|v| v.trim().to_owned())
        .unwrap_or_else(|| output.trim().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOLC_OUTPUT: &str = "solc, the solidity compiler commandline interface\n\
                               Version: 0.8.11+commit.d7f03943.Linux.g++\n";

    #[test]
    fn parses_triple() {
        let v = CompilerVersion::parse("0.8.11").unwrap();
        assert_eq!(v.triple(), Triple(0, 8, 11));
        assert_eq!(v.to_string(), "0.8.11");
    }

    #[test]
    fn display_drops_build_metadata() {
        let v = CompilerVersion::parse("0.8.11+commit.d7f03943").unwrap();
        assert_eq!(v.to_string(), "0.8.11");
    }

    #[test]
    fn rejects_partial_and_garbage() {
        for s in ["0.8", "", "v0.8.11", "zero.eight.eleven", "0.8.11.1"] {
            assert_eq!(
                CompilerVersion::parse(s),
                Err(Error::Malformed(s.to_owned())),
                "{s}"
            );
        }
    }

    #[test]
    fn reads_solc_version_output() {
        let v = CompilerVersion::from_solc_output(SOLC_OUTPUT).unwrap();
        assert_eq!(v, CompilerVersion::new(0, 8, 11));
        assert_eq!(
            full_version_line(SOLC_OUTPUT),
            "0.8.11+commit.d7f03943.Linux.g++"
        );
    }

    #[test]
    fn solc_output_without_version() {
        assert!(matches!(
            CompilerVersion::from_solc_output("solc: command failed"),
            Err(Error::Malformed(_))
        ));
    }

    #[test]
    fn triples_order_numerically() {
        assert!(Triple(0, 4, 24) < Triple(0, 4, 25));
        assert!(Triple(0, 4, 99) < Triple(0, 5, 0));
        assert!(Triple(0, 10, 0) > Triple(0, 9, 9));
    }
}
