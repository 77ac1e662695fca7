use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    process::{Command, ExitStatus, Output, Stdio},
};

use tracing::debug;

use crate::{
    combined::{self, Provenance},
    contract::Contracts,
    version::{self, CompilerVersion, Triple},
};

pub const DEFAULT_SOLC: &str = "solc";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("compiler {} is not installed", .path.display())]
    NotInstalled { path: PathBuf },
    #[error("failed to run {}: {error}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
    #[error("error reading {}: {error}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
    #[error("{} --version exited with {status}:\n{diagnostics}", .path.display())]
    Probe {
        path: PathBuf,
        status: ExitStatus,
        diagnostics: String,
    },
    #[error("compiler {} reports an unusable version: {error}", .path.display())]
    Version {
        path: PathBuf,
        #[source]
        error: version::Error,
    },
    #[error("solc: {status}\n{diagnostics}")]
    Compilation {
        status: ExitStatus,
        diagnostics: String,
    },
    #[error(transparent)]
    Output(#[from] combined::Error),
}

/// An installed compiler binary together with the version it reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solidity {
    pub path: PathBuf,
    pub version: CompilerVersion,
    pub full_version: String,
}

impl Solidity {
    /// Runs `<path> --version`. An empty path means `solc` on the search path.
    pub fn probe(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = compiler_path(path.as_ref());
        let output = Command::new(&path)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| spawn_error(&path, e))?;
        if !output.status.success() {
            return Err(Error::Probe {
                path,
                status: output.status,
                diagnostics: diagnostics(&output),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let version = match CompilerVersion::from_solc_output(&stdout) {
            Ok(v) => v,
            Err(error) => return Err(Error::Version { path, error }),
        };
        debug!(path = %path.display(), %version, "found compiler");
        Ok(Self {
            full_version: version::full_version_line(&stdout),
            path,
            version,
        })
    }

    pub fn args(&self) -> Vec<String> {
        let mut selection = "bin,bin-runtime,srcmap,srcmap-runtime,abi,userdoc,devdoc".to_owned();
        if self.version.triple() > Triple(0, 4, 6) {
            selection.push_str(",metadata,hashes");
        }
        vec![
            "--combined-json".to_owned(),
            selection,
            "--optimize".to_owned(),
            "--allow-paths".to_owned(),
            "., ./, ../".to_owned(),
        ]
    }

    /// Compiles `source` fed through standard input.
    pub fn compile_source(&self, source: &str) -> Result<Contracts, Error> {
        let args = self.args();
        debug!(path = %self.path.display(), version = %self.version, "compiling source from stdin");

        let mut child = Command::new(&self.path)
            .args(&args)
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(&self.path, e))?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(source.as_bytes()) {
                // The compiler quit early; its exit status explains why.
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
                r => r.map_err(|error| Error::Io {
                    path: self.path.clone(),
                    error,
                })?,
            }
        }

        let output = child.wait_with_output().map_err(|error| Error::Io {
            path: self.path.clone(),
            error,
        })?;
        self.finish(output, source, &args)
    }

    /// Compiles the given files. The recorded source is their concatenation.
    pub fn compile_files(&self, files: &[PathBuf]) -> Result<Contracts, Error> {
        let source = files
            .iter()
            .map(|path| {
                std::fs::read_to_string(path).map_err(|error| Error::Read {
                    path: path.clone(),
                    error,
                })
            })
            .collect::<Result<Vec<_>, _>>()?
            .concat();

        let args = self.args();
        debug!(path = %self.path.display(), version = %self.version, ?files, "compiling files");
        let output = Command::new(&self.path)
            .args(&args)
            .arg("--")
            .args(files)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| spawn_error(&self.path, e))?;
        self.finish(output, &source, &args)
    }

    fn finish(&self, output: Output, source: &str, args: &[String]) -> Result<Contracts, Error> {
        if !output.status.success() {
            return Err(Error::Compilation {
                status: output.status,
                diagnostics: diagnostics(&output),
            });
        }

        let version = self.version.to_string();
        let options = args.join(" ");
        Ok(combined::parse(
            &output.stdout,
            Provenance {
                source,
                language_version: &version,
                compiler_version: &version,
                compiler_options: &options,
            },
        )?)
    }
}

fn compiler_path(path: &Path) -> PathBuf {
    if path.as_os_str().is_empty() {
        PathBuf::from(DEFAULT_SOLC)
    } else {
        path.to_owned()
    }
}

fn spawn_error(path: &Path, error: io::Error) -> Error {
    if error.kind() == io::ErrorKind::NotFound {
        Error::NotInstalled {
            path: path.to_owned(),
        }
    } else {
        Error::Io {
            path: path.to_owned(),
            error,
        }
    }
}

fn diagnostics(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if stderr.trim().is_empty() {
        String::from_utf8_lossy(&output.stdout).trim().to_owned()
    } else {
        stderr.trim().to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solidity(version: CompilerVersion) -> Solidity {
        Solidity {
            path: PathBuf::from(DEFAULT_SOLC),
            full_version: version.to_string(),
            version,
        }
    }

    #[test]
    fn old_compilers_get_no_metadata() {
        let args = solidity(CompilerVersion::new(0, 4, 6)).args();
        assert_eq!(args[0], "--combined-json");
        assert_eq!(
            args[1],
            "bin,bin-runtime,srcmap,srcmap-runtime,abi,userdoc,devdoc"
        );
    }

    #[test]
    fn newer_compilers_get_metadata_and_hashes() {
        for version in [
            CompilerVersion::new(0, 4, 7),
            CompilerVersion::new(0, 8, 11),
        ] {
            let args = solidity(version).args();
            assert!(args[1].ends_with(",metadata,hashes"));
            assert_eq!(&args[2..], ["--optimize", "--allow-paths", "., ./, ../"]);
        }
    }

    #[test]
    fn empty_path_means_solc() {
        assert_eq!(compiler_path(Path::new("")), PathBuf::from("solc"));
        assert_eq!(
            compiler_path(Path::new("/opt/solc-0.8.11")),
            PathBuf::from("/opt/solc-0.8.11")
        );
    }

    #[test]
    fn missing_binary_is_not_installed() {
        let err = Solidity::probe("/nonexistent/bin/solc").unwrap_err();
        assert!(matches!(err, Error::NotInstalled { .. }), "{err}");
    }
}
