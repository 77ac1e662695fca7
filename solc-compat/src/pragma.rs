use std::sync::LazyLock;

use regex::Regex;

static PRAGMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bpragma\s+solidity\s+([^;]*);").unwrap());

/// Returns the constraint of every `pragma solidity <constraint>;` statement,
/// in source order and without deduplication.
///
/// Everything from `//` to the end of a line is ignored, so commented-out
/// pragmas are skipped while pragmas with a trailing comment are kept.
pub fn extract_versions(source: &str) -> Vec<String> {
    source
        .lines()
        .map(|line| line.split_once("//").map_or(line, |(code, _)| code))
        .flat_map(|code| PRAGMA.captures_iter(code))
        .map(|caps| caps[1].trim().to_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_in_order() {
        let cases: &[(&str, &[&str])] = &[
            ("pragma solidity ^0.4.24;\n", &["^0.4.24"]),
            ("pragma solidity 0.4.24;\n", &["0.4.24"]),
            (
                "pragma solidity 0.4.24;\npragma solidity 0.4.25;\n",
                &["0.4.24", "0.4.25"],
            ),
            ("pragma solidity 0.4.24;\n//pragma solidity 0.4.25;\n", &["0.4.24"]),
            ("//pragma solidity 0.4.24;\npragma solidity 0.4.25;\n", &["0.4.25"]),
            ("  // pragma solidity 0.4.24;\n", &[]),
            ("pragma solidity ^0.4.24; // compiles on 0.4.x\n", &["^0.4.24"]),
            ("pragma solidity >=0.4.0  <0.9.0 ;\n", &[">=0.4.0  <0.9.0"]),
            ("pragma\tsolidity\t^0.8.0;", &["^0.8.0"]),
        ];
        for (source, expected) in cases {
            assert_eq!(extract_versions(source), *expected, "{source:?}");
        }
    }

    #[test]
    fn keeps_duplicates() {
        let source = "pragma solidity 0.4.24;\npragma solidity 0.4.24;\n";
        assert_eq!(extract_versions(source), vec!["0.4.24", "0.4.24"]);
    }

    #[test]
    fn no_pragma() {
        assert!(extract_versions("").is_empty());
        assert!(extract_versions("contract test {}\n").is_empty());
        assert!(extract_versions("pragma experimental ABIEncoderV2;\n").is_empty());
        assert!(extract_versions("pragma solidity 0.4.24\n").is_empty());
    }

    #[test]
    fn ignores_identifiers_containing_pragma() {
        assert!(extract_versions("uint notpragma solidity = 1;").is_empty());
    }
}
