use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use solc_compat::{
    artifact::ArtifactStore,
    extract_versions, matcher,
    resolve::{self, Resolution, Resolver},
    solc::Solidity,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile with the installed compiler, or load the stored artifact.
    Compile {
        path: PathBuf,
        #[arg(long, env = "SOLC", default_value = "solc")]
        solc: PathBuf,
        #[arg(long)]
        artifact_dir: Option<PathBuf>,
        /// Fail on unreadable pragmas instead of loading an artifact.
        #[arg(long)]
        strict: bool,
    },
    /// Print the version pragmas declared by a source file.
    Versions { path: PathBuf },
    /// Report whether a compiler can build a source file.
    Check {
        path: PathBuf,
        #[arg(long, env = "SOLC", default_value = "solc")]
        solc: PathBuf,
        /// Check against this version instead of probing the compiler.
        #[arg(long)]
        installed: Option<String>,
    },
    /// Compile live and store the result as the artifact for that compiler.
    Snapshot {
        path: PathBuf,
        #[arg(long, env = "SOLC", default_value = "solc")]
        solc: PathBuf,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

fn read_source(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn compile(
    path: PathBuf,
    solc: PathBuf,
    artifact_dir: Option<PathBuf>,
    strict: bool,
) -> anyhow::Result<ExitCode> {
    let resolver = Resolver::new(resolve::Options {
        solc,
        artifact_dir,
        strict,
    });
    let resolution = resolver.resolve_path(&path)?;
    match &resolution {
        Resolution::Compiled(_) => info!("compiled {} live", path.display()),
        Resolution::Loaded(_) => info!("loaded stored artifact for {}", path.display()),
    }
    println!(
        "{}",
        serde_json::to_string_pretty(resolution.contracts())?
    );
    Ok(ExitCode::SUCCESS)
}

fn versions(path: PathBuf) -> anyhow::Result<ExitCode> {
    let source = read_source(&path)?;
    println!("{}", serde_json::to_string(&extract_versions(&source))?);
    Ok(ExitCode::SUCCESS)
}

fn check(path: PathBuf, solc: PathBuf, installed: Option<String>) -> anyhow::Result<ExitCode> {
    let source = read_source(&path)?;
    let installed = match installed {
        Some(v) => v,
        None => Solidity::probe(&solc)
            .context("Failed to probe compiler")?
            .version
            .to_string(),
    };

    let constraints = extract_versions(&source);
    let ok = matcher::can_compile(&installed, &constraints)?;
    println!(
        "{}",
        serde_json::json!({
            "installed": installed,
            "constraints": constraints,
            "compatible": ok,
        })
    );
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn snapshot(path: PathBuf, solc: PathBuf, out_dir: Option<PathBuf>) -> anyhow::Result<ExitCode> {
    let source = read_source(&path)?;
    let solidity = Solidity::probe(&solc).context("Failed to probe compiler")?;
    let contracts = solidity.compile_source(&source)?;

    let out_dir = match out_dir {
        Some(dir) => dir,
        None => path.parent().map(PathBuf::from).unwrap_or_default(),
    };
    let written = ArtifactStore::new(out_dir)
        .store(&solidity.version, &contracts)
        .context("Failed to write artifact")?;
    info!("wrote {}", written.display());
    println!("{}", written.display());
    Ok(ExitCode::SUCCESS)
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Compile {
            path,
            solc,
            artifact_dir,
            strict,
        } => compile(path, solc, artifact_dir, strict),
        Commands::Versions { path } => versions(path),
        Commands::Check {
            path,
            solc,
            installed,
        } => check(path, solc, installed),
        Commands::Snapshot {
            path,
            solc,
            out_dir,
        } => snapshot(path, solc, out_dir),
    }
}
