//! Version-range grammar used by `pragma solidity` statements.
//!
//! The accepted language is the npm-style range syntax Solidity uses:
//! comparators (`=`, `^`, `~`, `>`, `>=`, `<`, `<=`) applied to possibly
//! partial versions, whitespace-separated conjunctions, hyphen ranges and
//! `||` alternatives. A bare version is an exact pin, not a caret range.

use std::{fmt::Display, str::FromStr};

use itertools::Itertools;
use pest::{iterators::Pair, Parser};
use pest_derive::Parser;

use crate::version::{CompilerVersion, Triple};

#[derive(Parser)]
#[grammar = "constraint/constraint.pest"]
struct ConstraintParser;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid version constraint {constraint:?}:\n{error}")]
    Syntax {
        constraint: String,
        error: Box<pest::error::Error<Rule>>,
    },
    #[error("invalid version constraint {constraint:?}: {component} is out of range")]
    Overflow {
        constraint: String,
        component: String,
    },
}

/// A version with trailing components possibly missing or wildcarded.
///
/// Once a component is absent, every component after it is absent too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialVersion {
    pub major: Option<u64>,
    pub minor: Option<u64>,
    pub patch: Option<u64>,
}

impl PartialVersion {
    pub fn full(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major: Some(major),
            minor: Some(minor),
            patch: Some(patch),
        }
    }

    fn is_full(&self) -> bool {
        self.patch.is_some()
    }

    fn floor(&self) -> Triple {
        Triple(
            self.major.unwrap_or(0),
            self.minor.unwrap_or(0),
            self.patch.unwrap_or(0),
        )
    }

    /// First version past everything this partial version covers, or `None`
    /// when it covers everything.
    fn ceiling(&self) -> Option<Triple> {
        match (self.major, self.minor, self.patch) {
            (None, _, _) => None,
            (Some(major), None, _) => Some(Triple(major + 1, 0, 0)),
            (Some(major), Some(minor), None) => Some(Triple(major, minor + 1, 0)),
            (Some(major), Some(minor), Some(patch)) => Some(Triple(major, minor, patch + 1)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Any,
    ExactPin(PartialVersion),
    CaretRange(PartialVersion),
    TildeRange(PartialVersion),
    Greater(PartialVersion),
    GreaterEq(PartialVersion),
    Less(PartialVersion),
    LessEq(PartialVersion),
}

impl Comparator {
    pub fn matches(&self, v: Triple) -> bool {
        match *self {
            Comparator::Any => true,
            Comparator::ExactPin(p) => within(v, p.floor(), p.ceiling()),
            Comparator::CaretRange(p) => {
                let upper = match (p.major, p.minor, p.patch) {
                    (None, _, _) => None,
                    (Some(0), Some(0), Some(patch)) => Some(Triple(0, 0, patch + 1)),
                    (Some(0), Some(minor), _) => Some(Triple(0, minor + 1, 0)),
                    (Some(major), _, _) => Some(Triple(major + 1, 0, 0)),
                };
                within(v, p.floor(), upper)
            }
            Comparator::TildeRange(p) => {
                let upper = match (p.major, p.minor) {
                    (None, _) => None,
                    (Some(major), None) => Some(Triple(major + 1, 0, 0)),
                    (Some(major), Some(minor)) => Some(Triple(major, minor + 1, 0)),
                };
                within(v, p.floor(), upper)
            }
            Comparator::Greater(p) if p.is_full() => v > p.floor(),
            Comparator::Greater(p) => p.ceiling().is_some_and(|c| v >= c),
            Comparator::GreaterEq(p) => v >= p.floor(),
            Comparator::Less(p) => p.major.is_some() && v < p.floor(),
            Comparator::LessEq(p) if p.is_full() => v <= p.floor(),
            Comparator::LessEq(p) => p.ceiling().map_or(true, |c| v < c),
        }
    }
}

fn within(v: Triple, lower: Triple, upper: Option<Triple>) -> bool {
    v >= lower && upper.map_or(true, |u| v < u)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Range {
    Conjunction(Vec<Comparator>),
    Hyphen {
        lower: PartialVersion,
        upper: PartialVersion,
    },
}

impl Range {
    pub fn matches(&self, v: Triple) -> bool {
        match self {
            Range::Conjunction(comparators) => comparators.iter().all(|c| c.matches(v)),
            Range::Hyphen { lower, upper } => {
                v >= lower.floor()
                    && if upper.is_full() {
                        v <= upper.floor()
                    } else {
                        upper.ceiling().map_or(true, |c| v < c)
                    }
            }
        }
    }
}

/// One parsed `pragma solidity` constraint: a disjunction of ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConstraint {
    text: String,
    ranges: Vec<Range>,
}

impl VersionConstraint {
    pub fn parse(text: &str) -> Result<Self, Error> {
        let parsed = ConstraintParser::parse(Rule::constraint, text.trim()).map_err(|e| {
            Error::Syntax {
                constraint: text.to_owned(),
                error: Box::new(e),
            }
        })?;

        let factory = Factory(text);
        let mut ranges = vec![];
        for pair in parsed.flat_map(|p| p.into_inner()) {
            match pair.as_rule() {
                Rule::range => ranges.push(factory.range(pair)?),
                Rule::EOI => {}
                r => panic!("invalid constraint item: {:?}", r),
            }
        }

        Ok(Self {
            text: text.trim().to_owned(),
            ranges,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    pub fn matches(&self, version: &CompilerVersion) -> bool {
        let v = version.triple();
        self.ranges.iter().any(|r| r.matches(v))
    }

    /// The pinned version if this constraint admits exactly one version.
    pub fn exact_pin(&self) -> Option<CompilerVersion> {
        match self.ranges.as_slice() {
            [Range::Conjunction(comparators)] => match comparators.as_slice() {
                [Comparator::ExactPin(PartialVersion {
                    major: Some(major),
                    minor: Some(minor),
                    patch: Some(patch),
                })] => Some(CompilerVersion::new(*major, *minor, *patch)),
                _ => None,
            },
            _ => None,
        }
    }
}

impl FromStr for VersionConstraint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for VersionConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

struct Factory<'t>(&'t str);

impl Factory<'_> {
    fn range(&self, p: Pair<Rule>) -> Result<Range, Error> {
        assert_eq!(p.as_rule(), Rule::range);
        let inner = p.into_inner().exactly_one().unwrap();
        match inner.as_rule() {
            Rule::hyphen => {
                let (lower, upper) = inner.into_inner().collect_tuple().unwrap();
                Ok(Range::Hyphen {
                    lower: self.partial(lower)?,
                    upper: self.partial(upper)?,
                })
            }
            Rule::conjunction => Ok(Range::Conjunction(
                inner
                    .into_inner()
                    .map(|c| self.comparator(c))
                    .collect::<Result<_, _>>()?,
            )),
            r => panic!("invalid range: {:?}", r),
        }
    }

    fn comparator(&self, p: Pair<Rule>) -> Result<Comparator, Error> {
        assert_eq!(p.as_rule(), Rule::comparator);
        let pairs = p.into_inner().collect_vec();
        let (op, version) = match pairs.as_slice() {
            [version] => ("", self.partial(version.clone())?),
            [op, version] => (op.as_str(), self.partial(version.clone())?),
            _ => panic!("invalid comparator: {:?}", pairs),
        };

        if version.major.is_none() && !matches!(op, ">" | "<") {
            return Ok(Comparator::Any);
        }
        Ok(match op {
            "" | "=" => Comparator::ExactPin(version),
            "^" => Comparator::CaretRange(version),
            "~" => Comparator::TildeRange(version),
            ">" => Comparator::Greater(version),
            ">=" => Comparator::GreaterEq(version),
            "<" => Comparator::Less(version),
            "<=" => Comparator::LessEq(version),
            op => panic!("invalid operator: {}", op),
        })
    }

    fn partial(&self, p: Pair<Rule>) -> Result<PartialVersion, Error> {
        assert_eq!(p.as_rule(), Rule::partial);
        let mut components = [None; 3];
        for (slot, part) in components.iter_mut().zip(p.into_inner()) {
            match part.as_rule() {
                Rule::number => {
                    // Upper bounds bump a component by one, so it must stay below u64::MAX.
                    let n = part
                        .as_str()
                        .parse::<u64>()
                        .ok()
                        .filter(|&n| n < u64::MAX)
                        .ok_or_else(|| Error::Overflow {
                            constraint: self.0.to_owned(),
                            component: part.as_str().to_owned(),
                        })?;
                    *slot = Some(n);
                }
                Rule::wildcard => break,
                r => panic!("invalid version component: {:?}", r),
            }
        }
        let [major, minor, patch] = components;
        Ok(PartialVersion {
            major,
            minor: major.and(minor),
            patch: major.and(minor).and(patch),
        })
    }
}
