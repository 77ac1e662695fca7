use crate::{
    constraint::{self, VersionConstraint},
    version::{self, CompilerVersion},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    MalformedVersion(#[from] version::Error),
    #[error(transparent)]
    InvalidConstraint(#[from] constraint::Error),
}

/// Reports whether a compiler reporting `installed` satisfies every one of
/// `constraints`. An unsatisfied constraint is `Ok(false)`, not an error.
pub fn can_compile<S: AsRef<str>>(installed: &str, constraints: &[S]) -> Result<bool, Error> {
    let installed = CompilerVersion::parse(installed)?;
    let constraints = parse_all(constraints)?;
    Ok(satisfies_all(&installed, &constraints))
}

pub fn parse_all<S: AsRef<str>>(
    constraints: &[S],
) -> Result<Vec<VersionConstraint>, constraint::Error> {
    constraints
        .iter()
        .map(|c| VersionConstraint::parse(c.as_ref()))
        .collect()
}

pub fn satisfies_all(installed: &CompilerVersion, constraints: &[VersionConstraint]) -> bool {
    constraints.iter().all(|c| c.matches(installed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solc_can_compile() {
        let cases = [
            ("^0.8.11", true),
            ("^0.4.24", false),
            ("^0.5.6", false),
            ("0.5.6", false),
        ];
        for (constraint, expected) in cases {
            assert_eq!(
                can_compile("0.8.11", &[constraint]).unwrap(),
                expected,
                "{constraint}"
            );
        }
    }

    #[test]
    fn every_pragma_must_hold() {
        assert!(can_compile("0.8.11", &[">=0.4.0", "<0.9.0"]).unwrap());
        assert!(!can_compile("0.8.11", &["^0.8.0", "0.8.10"]).unwrap());
        assert!(!can_compile("0.4.24", &["0.4.24", "0.4.25"]).unwrap());
    }

    #[test]
    fn no_constraints_is_compatible() {
        let none: &[&str] = &[];
        assert!(can_compile("0.8.11", none).unwrap());
    }

    #[test]
    fn malformed_installed_version() {
        assert!(matches!(
            can_compile("0.8", &["^0.8.0"]),
            Err(Error::MalformedVersion(_))
        ));
    }

    #[test]
    fn invalid_constraint() {
        assert!(matches!(
            can_compile("0.8.11", &["^0.8.0", "latest"]),
            Err(Error::InvalidConstraint(_))
        ));
    }

    #[test]
    fn accepts_owned_strings() {
        let constraints = vec!["^0.8.11".to_owned()];
        assert!(can_compile("0.8.12", &constraints).unwrap());
    }
}
