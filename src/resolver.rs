//! The compatibility and parser-rule resolution engine.
//!
//! A resolution answers two questions for a model: which engine versions can
//! run its architecture on a device, and how each of those engines should
//! parse the model's tool-calling and reasoning output. The work is split
//! into stages, leaves first:
//!
//! - [`matcher`] tests one parser rule's pattern against a model identifier,
//! - [`selector`] orders an engine's rules and picks the first match,
//! - [`lookup`] finds candidate engine versions from compatibility records,
//! - [`merge`] layers model, architecture-class and rule overrides,
//! - [`facade`] runs the stages above against a single store snapshot.
//!
//! "Not found" at any stage shrinks the result; it is never an error. The
//! only hard failure is a store that cannot be read.

pub(crate) mod facade;
pub(crate) mod lookup;
pub(crate) mod matcher;
pub(crate) mod merge;
pub(crate) mod selector;

use thiserror::Error;

use crate::store;

pub(crate) use self::facade::{CompatibilityCheck, LatestEngineVersion, ResolveRequest, Resolver};
pub(crate) use self::lookup::CandidateMode;
pub(crate) use self::matcher::PatternCache;
pub(crate) use self::merge::{ParserSource, ResolvedCompatibility};
pub(crate) use self::selector::{Evaluation, Verdict};

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("catalog store unavailable: {0}")]
    StoreUnavailable(#[from] store::Error),
}

/// The outcome of [`Resolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Resolution {
    /// One merged answer per compatible engine version.
    Compatible(Vec<ResolvedCompatibility>),
    NotCompatible,
}

impl Resolution {
    pub(crate) fn is_compatible(&self) -> bool {
        matches!(self, Resolution::Compatible(_))
    }

    pub(crate) fn into_vec(self) -> Vec<ResolvedCompatibility> {
        match self {
            Resolution::Compatible(resolved) => resolved,
            Resolution::NotCompatible => Vec::new(),
        }
    }
}

impl From<Vec<ResolvedCompatibility>> for Resolution {
    fn from(resolved: Vec<ResolvedCompatibility>) -> Self {
        if resolved.is_empty() {
            Resolution::NotCompatible
        } else {
            Resolution::Compatible(resolved)
        }
    }
}
