use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Compiled contracts keyed by name, e.g. `test` or `<stdin>:test`.
///
/// Ordered so that serializing the same set twice gives identical bytes.
pub type Contracts = BTreeMap<String, Contract>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub code: String,
    #[serde(default)]
    pub runtime_code: String,
    /// Function signature to 4-byte selector, e.g. `multiply(uint256)` to
    /// `c6888fa1`. Empty for compilers that cannot report it.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub hashes: BTreeMap<String, String>,
    pub info: ContractInfo,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContractInfo {
    pub source: String,
    pub language: String,
    pub language_version: String,
    pub compiler_version: String,
    pub compiler_options: String,
    pub src_map: String,
    pub src_map_runtime: String,
    pub abi_definition: serde_json::Value,
    pub user_doc: serde_json::Value,
    pub developer_doc: serde_json::Value,
    pub metadata: String,
}
