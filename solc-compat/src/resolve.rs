//! Compile with the installed compiler when it fits the source's pragmas,
//! otherwise load the stored artifact for the version the source needs.
//!
//! Once live compilation starts its outcome is final: a compiler error is
//! returned as is and never replaced by a stored artifact.

use std::{
    io,
    path::{Path, PathBuf},
};

use itertools::Itertools;
use tracing::{debug, info, warn};

use crate::{
    artifact::{self, ArtifactStore},
    constraint::{self, VersionConstraint},
    contract::Contracts,
    matcher,
    pragma::extract_versions,
    solc::{self, Solidity, DEFAULT_SOLC},
    version::{self, CompilerVersion},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("error reading {}: {error}", .path.display())]
    ReadSource {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
    #[error(transparent)]
    MalformedVersion(version::Error),
    #[error(transparent)]
    InvalidConstraint(#[from] constraint::Error),
    #[error(transparent)]
    Probe(solc::Error),
    #[error(transparent)]
    Compilation(solc::Error),
    #[error(transparent)]
    Artifact(#[from] artifact::Error),
    #[error("cannot tell which compiler version {0} needs: use a version_<X.Y.Z> file name or an exact version pragma")]
    UnknownTargetVersion(String),
}

#[derive(Debug, Clone)]
pub struct Options {
    /// Compiler binary, looked up on the search path unless it has a
    /// directory component.
    pub solc: PathBuf,
    /// Where stored artifacts live. Defaults to the source file's directory,
    /// or the working directory for in-memory sources.
    pub artifact_dir: Option<PathBuf>,
    /// Fail on unreadable pragmas or compiler versions instead of falling
    /// back to a stored artifact.
    pub strict: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            solc: PathBuf::from(DEFAULT_SOLC),
            artifact_dir: None,
            strict: false,
        }
    }
}

/// Outcome of probing for an installed compiler.
#[derive(Debug, Clone)]
pub enum Probed {
    Missing,
    Malformed(version::Error),
    Found(Solidity),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadReason {
    NotInstalled,
    UnusableVersion,
    InvalidConstraint,
    Unsatisfied { installed: CompilerVersion },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision<'a> {
    Compile(&'a Solidity),
    Load(LoadReason),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Compiled(Contracts),
    Loaded(Contracts),
}

impl Resolution {
    pub fn contracts(&self) -> &Contracts {
        match self {
            Resolution::Compiled(c) | Resolution::Loaded(c) => c,
        }
    }

    pub fn into_contracts(self) -> Contracts {
        match self {
            Resolution::Compiled(c) | Resolution::Loaded(c) => c,
        }
    }

    pub fn is_compiled(&self) -> bool {
        matches!(self, Resolution::Compiled(_))
    }
}

/// Chooses between live compilation and a stored artifact.
///
/// A source without version pragmas accepts any installed compiler, so such
/// sources are always compiled live when a compiler is present.
pub fn decide<'a>(
    probed: &'a Probed,
    constraints: &[String],
    strict: bool,
) -> Result<Decision<'a>, Error> {
    let solidity = match probed {
        Probed::Missing => return Ok(Decision::Load(LoadReason::NotInstalled)),
        Probed::Malformed(e) if strict => return Err(Error::MalformedVersion(e.clone())),
        Probed::Malformed(e) => {
            warn!(error = %e, "installed compiler reports an unusable version");
            return Ok(Decision::Load(LoadReason::UnusableVersion));
        }
        Probed::Found(solidity) => solidity,
    };
    let installed = &solidity.version;

    if constraints.is_empty() {
        info!(%installed, "source has no version pragma, accepting installed compiler");
        return Ok(Decision::Compile(solidity));
    }

    let constraints = match matcher::parse_all(constraints) {
        Ok(c) => c,
        Err(e) if strict => return Err(e.into()),
        Err(e) => {
            warn!(error = %e, "unreadable version pragma");
            return Ok(Decision::Load(LoadReason::InvalidConstraint));
        }
    };

    if matcher::satisfies_all(installed, &constraints) {
        Ok(Decision::Compile(solidity))
    } else {
        Ok(Decision::Load(LoadReason::Unsatisfied {
            installed: installed.clone(),
        }))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Resolver {
    options: Options,
}

impl Resolver {
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Resolves the source at `path`. The fallback version comes from a
    /// `version_<X.Y.Z>` file name when there is one.
    pub fn resolve_path(&self, path: &Path) -> Result<Resolution, Error> {
        let source = std::fs::read_to_string(path).map_err(|error| Error::ReadSource {
            path: path.to_owned(),
            error,
        })?;
        let artifact_dir = match &self.options.artifact_dir {
            Some(dir) => dir.clone(),
            None => path.parent().map(Path::to_owned).unwrap_or_default(),
        };
        let label = path.display().to_string();
        self.resolve(
            &source,
            artifact::target_version_from_path(path),
            &artifact_dir,
            &label,
        )
    }

    pub fn resolve_source(
        &self,
        source: &str,
        target: Option<&CompilerVersion>,
    ) -> Result<Resolution, Error> {
        let artifact_dir = self.options.artifact_dir.clone().unwrap_or_default();
        self.resolve(source, target.cloned(), &artifact_dir, "<stdin>")
    }

    pub fn probe(&self) -> Result<Probed, Error> {
        match Solidity::probe(&self.options.solc) {
            Ok(solidity) => Ok(Probed::Found(solidity)),
            Err(solc::Error::NotInstalled { path }) => {
                debug!(path = %path.display(), "no compiler installed");
                Ok(Probed::Missing)
            }
            Err(solc::Error::Version { error, .. }) => Ok(Probed::Malformed(error)),
            Err(e) => Err(Error::Probe(e)),
        }
    }

    fn resolve(
        &self,
        source: &str,
        target: Option<CompilerVersion>,
        artifact_dir: &Path,
        label: &str,
    ) -> Result<Resolution, Error> {
        let probed = self.probe()?;
        let constraints = match probed {
            Probed::Missing => vec![],
            _ => extract_versions(source),
        };
        debug!(source = label, ?constraints, "resolving compiler");

        match decide(&probed, &constraints, self.options.strict)? {
            Decision::Compile(solidity) => {
                info!(source = label, version = %solidity.version, "compiling with installed compiler");
                solidity
                    .compile_source(source)
                    .map(Resolution::Compiled)
                    .map_err(Error::Compilation)
            }
            Decision::Load(reason) => {
                let Some(version) = target.or_else(|| pinned_version(source)) else {
                    return Err(Error::UnknownTargetVersion(label.to_owned()));
                };
                info!(source = label, %version, ?reason, "loading stored artifact");
                let contracts = ArtifactStore::new(artifact_dir).load(&version)?;
                Ok(Resolution::Loaded(contracts))
            }
        }
    }
}

/// The version named by the source's exact pragmas, when they all agree.
fn pinned_version(source: &str) -> Option<CompilerVersion> {
    extract_versions(source)
        .iter()
        .filter_map(|c| VersionConstraint::parse(c).ok()?.exact_pin())
        .all_equal_value()
        .ok()
}

/// Compiles `path` with `solc` when it satisfies the file's pragmas, else
/// loads the stored artifact named after the file's `version_<X.Y.Z>` tag.
pub fn resolve_and_compile(
    solc: impl AsRef<Path>,
    path: impl AsRef<Path>,
) -> Result<Resolution, Error> {
    Resolver::new(Options {
        solc: solc.as_ref().to_owned(),
        ..Options::default()
    })
    .resolve_path(path.as_ref())
}
