use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Risk score assumed for protocols the catalog does not know about
pub const DEFAULT_RISK_SCORE: u8 = 5;

/// Snapshot of one protocol's catalog metadata
///
/// Immutable per evaluation; supplied by the external catalog collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolInfo {
    pub id: String,
    pub name: String,
    pub blockchain: String,
    pub category: String,
    #[serde(default)]
    pub tvl: f64,
    /// Annual percentage yield, in percent
    #[serde(default)]
    pub apy: f64,
    /// Risk score on a 1-10 scale
    pub risk_score: u8,
    #[serde(rename = "auditFlag", default)]
    pub audited: bool,
}

/// Insertion-ordered protocol lookup
///
/// Positions reference protocols either by id or by free-form name, so the
/// catalog resolves both: id match first, then a trimmed, case-insensitive
/// name match. Iteration follows insertion order, which callers rely on for
/// first-seen-wins tie-breaking when scanning candidates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<ProtocolInfo>", into = "Vec<ProtocolInfo>")]
pub struct ProtocolCatalog {
    entries: Vec<ProtocolInfo>,
    by_id: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
}

impl ProtocolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a protocol, replacing any existing entry with the same
    /// normalized name (upsert-by-name, matching the ingestion collaborator)
    pub fn insert(&mut self, protocol: ProtocolInfo) {
        let key = normalize(&protocol.name);
        match self.by_name.get(&key) {
            Some(&idx) => {
                self.by_id.remove(&self.entries[idx].id);
                self.by_id.insert(protocol.id.clone(), idx);
                self.entries[idx] = protocol;
            }
            None => {
                let idx = self.entries.len();
                self.by_id.insert(protocol.id.clone(), idx);
                self.by_name.insert(key, idx);
                self.entries.push(protocol);
            }
        }
    }

    /// Resolve a position's protocol reference: exact id first, then
    /// trimmed case-insensitive name
    pub fn resolve(&self, protocol_ref: &str) -> Option<&ProtocolInfo> {
        self.by_id
            .get(protocol_ref)
            .or_else(|| self.by_name.get(&normalize(protocol_ref)))
            .map(|&idx| &self.entries[idx])
    }

    pub fn get_by_id(&self, id: &str) -> Option<&ProtocolInfo> {
        self.by_id.get(id).map(|&idx| &self.entries[idx])
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &ProtocolInfo> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<ProtocolInfo>> for ProtocolCatalog {
    fn from(protocols: Vec<ProtocolInfo>) -> Self {
        let mut catalog = Self::new();
        for protocol in protocols {
            catalog.insert(protocol);
        }
        catalog
    }
}

impl From<ProtocolCatalog> for Vec<ProtocolInfo> {
    fn from(catalog: ProtocolCatalog) -> Self {
        catalog.entries
    }
}

impl FromIterator<ProtocolInfo> for ProtocolCatalog {
    fn from_iter<I: IntoIterator<Item = ProtocolInfo>>(iter: I) -> Self {
        iter.into_iter().collect::<Vec<_>>().into()
    }
}

/// Normalization applied at the name-lookup boundary
fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}
