//! Stored compiler output, one file per compiler version.
//!
//! An artifact for version `X.Y.Z` lives at `<base_dir>/version_X.Y.Z.json`
//! and holds a serialized [`Contracts`] set whose entries all record
//! `X.Y.Z` as their compiler version.

use std::{
    io,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use regex::Regex;
use tracing::debug;

use crate::{contract::Contracts, version::CompilerVersion};

static VERSION_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"version_([0-9]+\.[0-9]+\.[0-9]+)").unwrap());

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no stored artifact for compiler {version} at {}", .path.display())]
    NotFound {
        version: CompilerVersion,
        path: PathBuf,
    },
    #[error("error accessing artifact {}: {error}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
    #[error("malformed artifact {}: {error}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        error: serde_json::Error,
    },
    #[error("artifact {} holds {contract} compiled by {found}, expected {expected}", .path.display())]
    VersionMismatch {
        path: PathBuf,
        contract: String,
        expected: String,
        found: String,
    },
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    pub base_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn path_for(&self, version: &CompilerVersion) -> PathBuf {
        self.base_dir.join(format!("version_{}.json", version))
    }

    pub fn load(&self, version: &CompilerVersion) -> Result<Contracts, Error> {
        let path = self.path_for(version);
        debug!(path = %path.display(), %version, "loading artifact");

        let contents = match std::fs::read(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::NotFound {
                    version: version.clone(),
                    path,
                })
            }
            Err(error) => return Err(Error::Io { path, error }),
        };
        let contracts: Contracts = match serde_json::from_slice(&contents) {
            Ok(contracts) => contracts,
            Err(error) => return Err(Error::Json { path, error }),
        };

        let expected = version.to_string();
        if let Some((name, c)) = contracts
            .iter()
            .find(|(_, c)| c.info.compiler_version != expected)
        {
            return Err(Error::VersionMismatch {
                contract: name.clone(),
                found: c.info.compiler_version.clone(),
                path,
                expected,
            });
        }
        Ok(contracts)
    }

    /// Writes `contracts` as the artifact for `version`, replacing any
    /// previous one.
    pub fn store(&self, version: &CompilerVersion, contracts: &Contracts) -> Result<PathBuf, Error> {
        let path = self.path_for(version);
        let io_error = |error| Error::Io {
            path: path.clone(),
            error,
        };

        std::fs::create_dir_all(&self.base_dir).map_err(io_error)?;
        let mut json = serde_json::to_string_pretty(contracts).map_err(|error| Error::Json {
            path: path.clone(),
            error,
        })?;
        json.push('\n');
        std::fs::write(&path, json).map_err(io_error)?;
        debug!(path = %path.display(), %version, "stored artifact");
        Ok(path)
    }
}

/// Reads the target compiler version from a `version_<X.Y.Z>` file name.
pub fn target_version_from_path(path: &Path) -> Option<CompilerVersion> {
    let name = path.file_name()?.to_str()?;
    let caps = VERSION_TAG.captures(name)?;
    CompilerVersion::parse(&caps[1]).ok()
}

#[cfg(test)]
mod tests {
    use crate::contract::{Contract, ContractInfo};

    use super::*;

    fn contracts(version: &str) -> Contracts {
        Contracts::from([(
            "<stdin>:test".to_owned(),
            Contract {
                code: "0x6080".to_owned(),
                runtime_code: "0x6081".to_owned(),
                hashes: Default::default(),
                info: ContractInfo {
                    source: "contract test {}".to_owned(),
                    language: "Solidity".to_owned(),
                    language_version: version.to_owned(),
                    compiler_version: version.to_owned(),
                    abi_definition: serde_json::json!([]),
                    ..Default::default()
                },
            },
        )])
    }

    #[test]
    fn stores_and_loads() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let version = CompilerVersion::new(0, 4, 24);

        let path = store.store(&version, &contracts("0.4.24")).unwrap();
        assert_eq!(path, dir.path().join("version_0.4.24.json"));
        assert_eq!(store.load(&version).unwrap(), contracts("0.4.24"));
    }

    #[test]
    fn missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let err = store.load(&CompilerVersion::new(0, 5, 0)).unwrap_err();
        assert!(
            matches!(&err, Error::NotFound { version, .. } if version.to_string() == "0.5.0"),
            "{err}"
        );
    }

    #[test]
    fn rejects_artifact_from_other_version() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let version = CompilerVersion::new(0, 4, 24);
        std::fs::write(
            store.path_for(&version),
            serde_json::to_vec(&contracts("0.4.25")).unwrap(),
        )
        .unwrap();

        assert!(matches!(
            store.load(&version),
            Err(Error::VersionMismatch { found, .. }) if found == "0.4.25"
        ));
    }

    #[test]
    fn rejects_corrupt_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let version = CompilerVersion::new(0, 4, 24);
        std::fs::write(store.path_for(&version), "{\"test\": ").unwrap();

        assert!(matches!(store.load(&version), Err(Error::Json { .. })));
    }

    #[test]
    fn version_from_file_name() {
        let v = |p: &str| target_version_from_path(Path::new(p));
        assert_eq!(
            v("contracts/compiler/version_0.4.24.sol"),
            Some(CompilerVersion::new(0, 4, 24))
        );
        assert_eq!(v("version_0.8.11.sol"), Some(CompilerVersion::new(0, 8, 11)));
        assert_eq!(v("contracts/version_0.8.sol"), None);
        assert_eq!(v("version_0.4.24/token.sol"), None);
        assert_eq!(v("token.sol"), None);
    }
}
