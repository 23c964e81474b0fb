//! Finality providers and their voting power

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Finality provider identifier (hex-encoded BTC public key)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FinalityProviderId(String);

impl FinalityProviderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FinalityProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FinalityProviderId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for FinalityProviderId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// De-duplicated set of finality providers
///
/// Iteration order is sorted; correctness never depends on it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProviderSet {
    providers: BTreeSet<FinalityProviderId>,
}

impl ProviderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the provider was already present
    pub fn insert(&mut self, id: FinalityProviderId) -> bool {
        self.providers.insert(id)
    }

    pub fn contains(&self, id: &FinalityProviderId) -> bool {
        self.providers.contains(id)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FinalityProviderId> {
        self.providers.iter()
    }
}

impl FromIterator<FinalityProviderId> for ProviderSet {
    fn from_iter<I: IntoIterator<Item = FinalityProviderId>>(iter: I) -> Self {
        Self {
            providers: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ProviderSet {
    type Item = FinalityProviderId;
    type IntoIter = std::collections::btree_set::IntoIter<FinalityProviderId>;

    fn into_iter(self) -> Self::IntoIter {
        self.providers.into_iter()
    }
}

/// Active stake (satoshis) per provider at one Bitcoin height
///
/// Every queried provider has an entry, zero when it has no active stake.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PowerMap {
    power: HashMap<FinalityProviderId, u64>,
}

impl PowerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for every provider in the set, all zero
    pub fn zeroed(providers: &ProviderSet) -> Self {
        providers.iter().cloned().map(|id| (id, 0)).collect()
    }

    pub fn insert(&mut self, id: FinalityProviderId, power: u64) {
        self.power.insert(id, power);
    }

    pub fn get(&self, id: &FinalityProviderId) -> Option<u64> {
        self.power.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.power.len()
    }

    pub fn is_empty(&self) -> bool {
        self.power.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FinalityProviderId, u64)> {
        self.power.iter().map(|(id, power)| (id, *power))
    }

    /// Sum over all providers
    pub fn total_power(&self) -> u64 {
        self.power
            .values()
            .fold(0u64, |acc, power| acc.saturating_add(*power))
    }

    /// Sum over the voters that appear in this map
    ///
    /// Voters listed twice count once. Voters absent from the map are ignored.
    pub fn voted_power<'a, I>(&self, voters: I) -> u64
    where
        I: IntoIterator<Item = &'a FinalityProviderId>,
    {
        let unique: BTreeSet<&FinalityProviderId> = voters.into_iter().collect();
        unique
            .into_iter()
            .filter_map(|id| self.power.get(id))
            .fold(0u64, |acc, power| acc.saturating_add(*power))
    }
}

impl FromIterator<(FinalityProviderId, u64)> for PowerMap {
    fn from_iter<I: IntoIterator<Item = (FinalityProviderId, u64)>>(iter: I) -> Self {
        Self {
            power: iter.into_iter().collect(),
        }
    }
}
