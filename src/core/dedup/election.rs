//! Champion election over staged facts
//!
//! Facts are grouped by `(resolved code, trimmed lowercase value)`. Within a
//! group the member with the longest `raw_text` becomes the champion; on a
//! tie the member that came first in the input wins. Input order is the
//! store's insertion order, so "first" means "first inserted".

use crate::core::registry::CodeRegistry;
use crate::domain::{FactId, StagedFact};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Grouping key shared by duplicate facts
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DedupKey {
    /// Resolved registry code, or the normalized marker name when unresolved
    pub code: String,
    /// Trimmed, lowercased value
    pub value: String,
}

impl DedupKey {
    /// Builds the key for one fact
    pub fn for_fact(registry: &CodeRegistry, fact: &StagedFact) -> Self {
        let code = registry
            .resolve(&fact.marker_name)
            .map(|entry| entry.code.clone())
            .unwrap_or_else(|| format!("unresolved:{}", fact.marker_name.trim().to_lowercase()));

        Self {
            code,
            value: normalize_value(&fact.marker_value),
        }
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.code, self.value)
    }
}

/// One champion and the facts it represents
#[derive(Debug, Clone)]
pub struct DedupGroup {
    pub key: DedupKey,
    pub champion: StagedFact,
    /// Non-champion members in input order
    pub duplicates: Vec<StagedFact>,
}

impl DedupGroup {
    /// Ids of the non-champion members
    pub fn duplicate_ids(&self) -> Vec<FactId> {
        self.duplicates.iter().map(|f| f.id).collect()
    }

    /// Champion plus duplicates
    pub fn member_count(&self) -> usize {
        1 + self.duplicates.len()
    }
}

/// Result of one deduplication pass
#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    /// Groups ordered by the first occurrence of their key in the input
    pub groups: Vec<DedupGroup>,
}

impl DedupOutcome {
    /// Champions in group order
    pub fn champions(&self) -> Vec<&StagedFact> {
        self.groups.iter().map(|g| &g.champion).collect()
    }

    /// Map from champion id to its duplicate ids
    pub fn duplicates_by_champion(&self) -> HashMap<FactId, Vec<FactId>> {
        self.groups
            .iter()
            .map(|g| (g.champion.id, g.duplicate_ids()))
            .collect()
    }

    /// Number of champions
    pub fn champion_count(&self) -> usize {
        self.groups.len()
    }

    /// Number of non-champion members over all groups
    pub fn duplicate_count(&self) -> usize {
        self.groups.iter().map(|g| g.duplicates.len()).sum()
    }

    /// Every fact id covered by the outcome
    pub fn all_ids(&self) -> Vec<FactId> {
        self.groups
            .iter()
            .flat_map(|g| std::iter::once(g.champion.id).chain(g.duplicates.iter().map(|d| d.id)))
            .collect()
    }
}

/// Groups facts and elects one champion per group
///
/// Callers are expected to pass prescreened facts (non-empty value,
/// resolvable marker). Unresolvable markers still group deterministically by
/// their normalized name so the function is total.
///
/// # Examples
///
/// ```
/// use factsync::core::dedup::deduplicate;
/// use factsync::core::registry::CodeRegistry;
///
/// let registry = CodeRegistry::builtin();
/// let outcome = deduplicate(&registry, Vec::new());
/// assert_eq!(outcome.champion_count(), 0);
/// ```
pub fn deduplicate(registry: &CodeRegistry, facts: Vec<StagedFact>) -> DedupOutcome {
    let mut order: Vec<DedupKey> = Vec::new();
    let mut members: HashMap<DedupKey, Vec<StagedFact>> = HashMap::new();

    for fact in facts {
        let key = DedupKey::for_fact(registry, &fact);
        match members.get_mut(&key) {
            Some(group) => group.push(fact),
            None => {
                order.push(key.clone());
                members.insert(key, vec![fact]);
            }
        }
    }

    let groups = order
        .into_iter()
        .filter_map(|key| {
            let group = members.remove(&key)?;
            Some(elect(key, group))
        })
        .collect::<Vec<_>>();

    let outcome = DedupOutcome { groups };
    tracing::debug!(
        champions = outcome.champion_count(),
        duplicates = outcome.duplicate_count(),
        "Deduplication complete"
    );
    outcome
}

fn elect(key: DedupKey, mut group: Vec<StagedFact>) -> DedupGroup {
    let mut best = 0;
    let mut best_len = group[0].raw_text_len();
    for (idx, fact) in group.iter().enumerate().skip(1) {
        let len = fact.raw_text_len();
        if len > best_len {
            best = idx;
            best_len = len;
        }
    }

    let champion = group.remove(best);
    DedupGroup {
        key,
        champion,
        duplicates: group,
    }
}

/// Trimmed lowercase form used for value comparison
pub fn normalize_value(value: &str) -> String {
    value.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewFact, SessionId};
    use chrono::Utc;
    use fake::faker::lorem::en::Sentence;
    use fake::Fake;

    fn fact(id: i64, marker: &str, value: &str, raw_text: &str) -> StagedFact {
        let new = NewFact::new(SessionId::new("s").unwrap(), marker, value, raw_text).unwrap();
        StagedFact::from_new(FactId::new(id), new, Utc::now())
    }

    #[test]
    fn test_longest_raw_text_wins() {
        let registry = CodeRegistry::builtin();
        let facts = vec![
            fact(1, "ER", "positive", &"x".repeat(12)),
            fact(2, "ER Status", "Positive", &"y".repeat(40)),
        ];

        let outcome = deduplicate(&registry, facts);
        assert_eq!(outcome.champion_count(), 1);
        assert_eq!(outcome.groups[0].champion.id, FactId::new(2));
        assert_eq!(outcome.groups[0].duplicate_ids(), vec![FactId::new(1)]);
    }

    #[test]
    fn test_tie_goes_to_first_inserted() {
        let registry = CodeRegistry::builtin();
        let facts = vec![
            fact(7, "Temp", "38.5", "Temp: 38.5"),
            fact(8, "temperature", " 38.5 ", "temp: 38.5"),
            fact(9, "TEMP", "38.5", "TEMP  38.5"),
        ];

        let outcome = deduplicate(&registry, facts);
        assert_eq!(outcome.champion_count(), 1);
        assert_eq!(outcome.groups[0].champion.id, FactId::new(7));
        assert_eq!(
            outcome.groups[0].duplicate_ids(),
            vec![FactId::new(8), FactId::new(9)]
        );
    }

    #[test]
    fn test_distinct_values_stay_separate() {
        let registry = CodeRegistry::builtin();
        let facts = vec![
            fact(1, "ER", "positive", "ER positive"),
            fact(2, "PR", "positive", "PR positive"),
            fact(3, "ER", "negative", "ER negative"),
        ];

        let outcome = deduplicate(&registry, facts);
        let ids: Vec<_> = outcome.champions().iter().map(|f| f.id.value()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(outcome.duplicate_count(), 0);
    }

    #[test]
    fn test_champion_order_follows_first_occurrence() {
        let registry = CodeRegistry::builtin();
        let facts = vec![
            fact(1, "HER2", "negative", "short"),
            fact(2, "Temp", "37", "Temp 37"),
            fact(3, "HER2", "negative", "HER2 is negative by IHC"),
        ];

        let outcome = deduplicate(&registry, facts);
        let ids: Vec<_> = outcome.champions().iter().map(|f| f.id.value()).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn test_partition_invariant_holds_for_generated_input() {
        let registry = CodeRegistry::builtin();
        let markers = ["ER", "PR", "HER2", "Temp", "Tobacco"];
        let values = ["positive", "Negative", " 37.2 ", "never"];

        let facts: Vec<StagedFact> = (0..60)
            .map(|i| {
                let raw: String = Sentence(2..10).fake();
                fact(
                    i as i64,
                    markers[i % markers.len()],
                    values[(i / 3) % values.len()],
                    &raw,
                )
            })
            .collect();
        let input_len = facts.len();

        let outcome = deduplicate(&registry, facts);
        assert_eq!(
            outcome.champion_count() + outcome.duplicate_count(),
            input_len
        );

        let mut keys: Vec<_> = outcome.groups.iter().map(|g| g.key.clone()).collect();
        let before = keys.len();
        keys.sort_by(|a, b| a.to_string().cmp(&b.to_string()));
        keys.dedup();
        assert_eq!(keys.len(), before);

        for group in &outcome.groups {
            for dup in &group.duplicates {
                assert!(group.champion.raw_text_len() >= dup.raw_text_len());
            }
        }
    }

    #[test]
    fn test_duplicates_by_champion_map() {
        let registry = CodeRegistry::builtin();
        let facts = vec![
            fact(1, "ER", "positive", "ER positive (long excerpt)"),
            fact(2, "ER", "positive", "ER pos"),
        ];
        let map = deduplicate(&registry, facts).duplicates_by_champion();
        assert_eq!(map.get(&FactId::new(1)), Some(&vec![FactId::new(2)]));
    }
}
