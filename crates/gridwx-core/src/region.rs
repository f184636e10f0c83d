//! Canonical grid regions and the lookup tables that resolve raw codes to them.
//!
//! The load feed names regions by subsystem code (`N`, `NE`, `SE`, `S`) or by
//! subsystem name; weather stations only carry a two-letter state code. Both
//! resolve to the same [`Region`], which is the join key for the whole pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// State code recorded for station files whose state field is unusable.
pub const UNKNOWN_STATE: &str = "UNKNOWN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Region {
    North,
    Northeast,
    SoutheastMidwest,
    South,
    /// Tracked bucket for weather that cannot be placed. Never joins.
    Unknown,
}

const STATE_REGIONS: &[(&str, Region)] = &[
    ("AC", Region::North),
    ("AP", Region::North),
    ("AM", Region::North),
    ("PA", Region::North),
    ("RO", Region::North),
    ("RR", Region::North),
    ("TO", Region::North),
    ("AL", Region::Northeast),
    ("BA", Region::Northeast),
    ("CE", Region::Northeast),
    ("MA", Region::Northeast),
    ("PB", Region::Northeast),
    ("PE", Region::Northeast),
    ("PI", Region::Northeast),
    ("RN", Region::Northeast),
    ("SE", Region::Northeast),
    ("ES", Region::SoutheastMidwest),
    ("MG", Region::SoutheastMidwest),
    ("RJ", Region::SoutheastMidwest),
    ("SP", Region::SoutheastMidwest),
    ("DF", Region::SoutheastMidwest),
    ("GO", Region::SoutheastMidwest),
    ("MT", Region::SoutheastMidwest),
    ("MS", Region::SoutheastMidwest),
    ("PR", Region::South),
    ("RS", Region::South),
    ("SC", Region::South),
];

const SUBSYSTEM_REGIONS: &[(&str, Region)] = &[
    ("N", Region::North),
    ("NORTE", Region::North),
    ("NE", Region::Northeast),
    ("NORDESTE", Region::Northeast),
    ("SE", Region::SoutheastMidwest),
    ("SE/CO", Region::SoutheastMidwest),
    ("SUDESTE", Region::SoutheastMidwest),
    ("SUDESTE/CENTRO-OESTE", Region::SoutheastMidwest),
    ("S", Region::South),
    ("SUL", Region::South),
];

impl Region {
    /// The four regions that can appear in merged output, in sort order.
    pub const CANONICAL: [Region; 4] = [
        Region::North,
        Region::Northeast,
        Region::SoutheastMidwest,
        Region::South,
    ];

    /// Label persisted in output tables.
    pub fn label(self) -> &'static str {
        match self {
            Region::North => "Norte",
            Region::Northeast => "Nordeste",
            Region::SoutheastMidwest => "Sudeste/Centro-Oeste",
            Region::South => "Sul",
            Region::Unknown => "Unknown",
        }
    }

    /// Inverse of [`Region::label`].
    pub fn from_label(label: &str) -> Option<Region> {
        let label = label.trim();
        Region::CANONICAL
            .into_iter()
            .chain(std::iter::once(Region::Unknown))
            .find(|region| region.label().eq_ignore_ascii_case(label))
    }

    pub fn is_canonical(self) -> bool {
        !matches!(self, Region::Unknown)
    }

    /// Resolve a two-letter state code; anything unmapped is `Unknown`.
    pub fn from_state(state: &str) -> Region {
        let state = state.trim();
        STATE_REGIONS
            .iter()
            .find(|(code, _)| code.eq_ignore_ascii_case(state))
            .map(|(_, region)| *region)
            .unwrap_or(Region::Unknown)
    }

    /// Resolve a load-feed subsystem code or name.
    ///
    /// Returns `None` for codes outside the four interconnected subsystems so
    /// the row can be dropped as incomplete instead of landing in `Unknown`.
    pub fn from_subsystem(code: &str) -> Option<Region> {
        let code = code.trim();
        if code.is_empty() {
            return None;
        }
        SUBSYSTEM_REGIONS
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(code))
            .map(|(_, region)| *region)
            .or_else(|| Region::from_label(code).filter(|r| r.is_canonical()))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_state_maps_to_a_canonical_region() {
        assert_eq!(STATE_REGIONS.len(), 27);
        for (code, region) in STATE_REGIONS {
            assert_eq!(Region::from_state(code), *region);
            assert!(region.is_canonical());
        }
    }

    #[test]
    fn state_lookup_is_case_insensitive() {
        assert_eq!(Region::from_state("mg"), Region::SoutheastMidwest);
        assert_eq!(Region::from_state(" rs "), Region::South);
    }

    #[test]
    fn unmapped_state_is_unknown() {
        assert_eq!(Region::from_state("XX"), Region::Unknown);
        assert_eq!(Region::from_state(UNKNOWN_STATE), Region::Unknown);
        assert_eq!(Region::from_state(""), Region::Unknown);
    }

    #[test]
    fn subsystem_codes_and_names_resolve() {
        assert_eq!(Region::from_subsystem("N"), Some(Region::North));
        assert_eq!(Region::from_subsystem("ne"), Some(Region::Northeast));
        assert_eq!(
            Region::from_subsystem("SUDESTE"),
            Some(Region::SoutheastMidwest)
        );
        assert_eq!(Region::from_subsystem("Sul"), Some(Region::South));
        assert_eq!(
            Region::from_subsystem("Sudeste/Centro-Oeste"),
            Some(Region::SoutheastMidwest)
        );
    }

    #[test]
    fn unmapped_subsystem_is_none() {
        assert_eq!(Region::from_subsystem("SIN"), None);
        assert_eq!(Region::from_subsystem(""), None);
        assert_eq!(Region::from_subsystem("Unknown"), None);
    }

    #[test]
    fn labels_round_trip() {
        for region in Region::CANONICAL {
            assert_eq!(Region::from_label(region.label()), Some(region));
        }
        assert_eq!(Region::from_label("Unknown"), Some(Region::Unknown));
        assert_eq!(Region::from_label("Centro"), None);
    }

    #[test]
    fn ordering_follows_declaration() {
        let mut regions = vec![Region::South, Region::Unknown, Region::North];
        regions.sort();
        assert_eq!(regions, vec![Region::North, Region::South, Region::Unknown]);
    }
}
