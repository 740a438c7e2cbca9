//! Production plans: planned piece counts per size

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Key used when a product has no size dimension
pub const TOTAL_KEY: &str = "total";

/// Mapping from size label to planned piece count, e.g. `{"s": 10, "m": 15}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductionPlan(BTreeMap<String, u32>);

impl ProductionPlan {
    pub fn new(sizes: BTreeMap<String, u32>) -> Self {
        Self(sizes)
    }

    /// Plan for a product without sizes
    pub fn total(pieces: u32) -> Self {
        let mut sizes = BTreeMap::new();
        sizes.insert(TOTAL_KEY.to_string(), pieces);
        Self(sizes)
    }

    /// Use the size breakdown when one was supplied, otherwise a single total
    pub fn from_breakdown(breakdown: Option<BTreeMap<String, u32>>, quantity: u32) -> Self {
        match breakdown {
            Some(sizes) if !sizes.is_empty() => Self(sizes),
            _ => Self::total(quantity),
        }
    }

    /// Sum of planned pieces across every size
    pub fn total_pieces(&self) -> u64 {
        self.0.values().map(|&n| u64::from(n)).sum()
    }

    /// Planned count for a size label. Exact match first, then a case-folded match;
    /// 0 when the plan does not mention the size.
    pub fn pieces_for_size(&self, label: &str) -> u64 {
        if let Some(&n) = self.0.get(label) {
            return u64::from(n);
        }
        self.0
            .iter()
            .find(|(size, _)| size.eq_ignore_ascii_case(label))
            .map(|(_, &n)| u64::from(n))
            .unwrap_or(0)
    }

    pub fn sizes(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(k, &v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, u32>> for ProductionPlan {
    fn from(sizes: BTreeMap<String, u32>) -> Self {
        Self(sizes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(entries: &[(&str, u32)]) -> ProductionPlan {
        ProductionPlan::new(entries.iter().map(|(k, v)| (k.to_string(), *v)).collect())
    }

    #[test]
    fn exact_match_wins_over_case_folded() {
        let p = plan(&[("S", 4), ("s", 10)]);
        assert_eq!(p.pieces_for_size("S"), 4);
        assert_eq!(p.pieces_for_size("s"), 10);
    }

    #[test]
    fn case_folded_match_and_missing_size() {
        let p = plan(&[("s", 10), ("m", 15)]);
        assert_eq!(p.pieces_for_size("S"), 10);
        assert_eq!(p.pieces_for_size("XL"), 0);
        assert_eq!(p.total_pieces(), 25);
    }

    #[test]
    fn empty_breakdown_falls_back_to_total() {
        let p = ProductionPlan::from_breakdown(Some(BTreeMap::new()), 12);
        assert_eq!(p, ProductionPlan::total(12));
        assert_eq!(p.total_pieces(), 12);
    }

    #[test]
    fn deserializes_from_plain_object() {
        let p: ProductionPlan = serde_json::from_str(r#"{"s":10,"m":15}"#).unwrap();
        assert_eq!(p.pieces_for_size("m"), 15);
    }
}
