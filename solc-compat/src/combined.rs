//! Reader for `solc --combined-json` output.
//!
//! Compilers before 0.8 encode `abi`, `userdoc` and `devdoc` as JSON strings
//! nested inside the JSON document; later ones emit them as plain values. Both
//! layouts normalize to the same `ContractInfo`.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::contract::{Contract, ContractInfo, Contracts};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed compiler output: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed {field} for contract {contract}: {error}")]
    Embedded {
        contract: String,
        field: &'static str,
        error: serde_json::Error,
    },
}

/// What the caller knows about the compilation that produced the output.
#[derive(Debug, Clone, Copy)]
pub struct Provenance<'a> {
    pub source: &'a str,
    pub language_version: &'a str,
    pub compiler_version: &'a str,
    pub compiler_options: &'a str,
}

#[derive(Deserialize)]
struct Output {
    contracts: BTreeMap<String, RawContract>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawContract {
    bin: String,
    #[serde(rename = "bin-runtime")]
    bin_runtime: String,
    srcmap: String,
    #[serde(rename = "srcmap-runtime")]
    srcmap_runtime: String,
    abi: Value,
    userdoc: Value,
    devdoc: Value,
    metadata: String,
    hashes: BTreeMap<String, String>,
}

pub fn parse(output: &[u8], provenance: Provenance) -> Result<Contracts, Error> {
    let output: Output = serde_json::from_slice(output)?;

    output
        .contracts
        .into_iter()
        .map(|(name, raw)| {
            let info = ContractInfo {
                source: provenance.source.to_owned(),
                language: "Solidity".to_owned(),
                language_version: provenance.language_version.to_owned(),
                compiler_version: provenance.compiler_version.to_owned(),
                compiler_options: provenance.compiler_options.to_owned(),
                src_map: raw.srcmap,
                src_map_runtime: raw.srcmap_runtime,
                abi_definition: embedded(&name, "abi", raw.abi)?,
                user_doc: embedded(&name, "userdoc", raw.userdoc)?,
                developer_doc: embedded(&name, "devdoc", raw.devdoc)?,
                metadata: raw.metadata,
            };
            let contract = Contract {
                code: format!("0x{}", raw.bin),
                runtime_code: format!("0x{}", raw.bin_runtime),
                hashes: raw.hashes,
                info,
            };
            Ok((name, contract))
        })
        .collect()
}

fn embedded(contract: &str, field: &'static str, value: Value) -> Result<Value, Error> {
    match value {
        Value::String(s) if s.is_empty() => Ok(Value::Null),
        Value::String(s) => serde_json::from_str(&s).map_err(|error| Error::Embedded {
            contract: contract.to_owned(),
            field,
            error,
        }),
        v => Ok(v),
    }
}
