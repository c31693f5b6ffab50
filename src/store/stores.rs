//! Concrete store kinds, along with their identifiers

use serde::{Deserialize, Serialize};

/// The `StoreIdentifier` names a kind of backing store. It is used to select
/// a store from the configuration and to label diagnostics.
///
/// The `to_string` and `FromStr` are part of the config format and should remain stable.
#[derive(
    Debug,
    PartialEq,
    Eq,
    Hash,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub(crate) enum StoreIdentifier {
    /// A catalog loaded once and held in memory.
    Memory,
    /// A catalog document on disk, re-read for every snapshot.
    File,
    /// A catalog document served over HTTP, fetched for every snapshot.
    Http,
}
