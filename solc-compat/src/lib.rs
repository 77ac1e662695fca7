pub mod artifact;
pub mod combined;
pub mod constraint;
pub mod contract;
pub mod matcher;
pub mod pragma;
pub mod resolve;
pub mod solc;
pub mod version;

pub use contract::{Contract, ContractInfo, Contracts};
pub use matcher::can_compile;
pub use pragma::extract_versions;
pub use resolve::{resolve_and_compile, Resolution, Resolver};
pub use version::CompilerVersion;
