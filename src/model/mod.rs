//! Core data model types: the recursive part tree and message envelopes.

pub mod message;
pub mod part;

use serde::{Deserialize, Deserializer};

/// Deserialize a field that may be `null` on the wire as its default value.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
