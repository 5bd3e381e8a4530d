use crate::error::StoreError;
use crate::models::{School, Tier};
use crate::services::store::SchoolStore;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;

/// Catalog held in memory, grouped by tier.
///
/// Backs the service when `store.kind = "file"` and serves as the store in tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tiers: BTreeMap<Tier, Vec<School>>,
}

impl InMemoryStore {
    pub fn new(schools: impl IntoIterator<Item = School>) -> Self {
        let mut tiers: BTreeMap<Tier, Vec<School>> = BTreeMap::new();
        for school in schools {
            tiers.entry(school.tier).or_default().push(school);
        }
        Self { tiers }
    }

    /// Load a JSON array of catalog rows
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Connection(format!("failed to read {}: {}", path.display(), e)))?;
        let schools: Vec<School> = serde_json::from_str(&raw)
            .map_err(|e| StoreError::Decode(format!("failed to parse {}: {}", path.display(), e)))?;

        tracing::info!(path = %path.display(), schools = schools.len(), "Loaded school catalog");
        Ok(Self::new(schools))
    }

    pub fn len(&self) -> usize {
        self.tiers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SchoolStore for InMemoryStore {
    async fn fetch_tier(&self, tier: Tier) -> Result<Vec<School>, StoreError> {
        Ok(self.tiers.get(&tier).cloned().unwrap_or_default())
    }

    async fn fetch_by_names(&self, names: &[String]) -> Result<Vec<School>, StoreError> {
        Ok(self
            .tiers
            .values()
            .flatten()
            .filter(|school| names.iter().any(|name| name == &school.school_name))
            .cloned()
            .collect())
    }

    async fn health(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_groups_by_tier() {
        let store = InMemoryStore::new(vec![
            School::new("A", Tier::Power4D1),
            School::new("B", Tier::NonD1),
            School::new("C", Tier::NonD1),
        ]);

        assert_eq!(store.len(), 3);
        assert_eq!(store.fetch_tier(Tier::NonD1).await.unwrap().len(), 2);
        assert!(store.fetch_tier(Tier::NonP4D1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_by_names_ignores_unknown() {
        let store = InMemoryStore::new(vec![School::new("A", Tier::Power4D1), School::new("B", Tier::NonD1)]);
        let found = store
            .fetch_by_names(&["B".to_string(), "Nowhere".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].school_name, "B");
    }
}
