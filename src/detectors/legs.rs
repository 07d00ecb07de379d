//! Multi-leg linkage
//!
//! Pairs contracts within one ticker whose volumes match closely enough to
//! look like legs of a single structured order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::OptionQuote;

use super::LegConfig;

/// Shape of a linked pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpreadStructure {
    /// Same right and expiry, different strikes
    Vertical,
    /// Same right and strike, different expiries
    Calendar,
    /// Opposite rights, same expiry (risk reversal, straddle, strangle)
    Combo,
}

impl SpreadStructure {
    pub fn label(&self) -> &'static str {
        match self {
            SpreadStructure::Vertical => "Vertical",
            SpreadStructure::Calendar => "Calendar",
            SpreadStructure::Combo => "Combo",
        }
    }

    fn between(a: &OptionQuote, b: &OptionQuote) -> Option<Self> {
        let same_strike = (a.strike - b.strike).abs() < 1e-6;
        let same_expiry = a.expiry == b.expiry;

        if a.right == b.right {
            match (same_expiry, same_strike) {
                (true, false) => Some(SpreadStructure::Vertical),
                (false, true) => Some(SpreadStructure::Calendar),
                _ => None,
            }
        } else if same_expiry {
            Some(SpreadStructure::Combo)
        } else {
            None
        }
    }
}

/// Evidence that a contract traded as one leg of a structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegLink {
    /// Contract symbol of the other leg
    pub partner: String,
    pub structure: SpreadStructure,
    /// Smaller volume over larger volume, in (0, 1]
    pub volume_ratio: f64,
}

/// Link matching legs within a single ticker's chain
///
/// Each contract joins at most one pair. Candidates are visited in
/// descending volume order and paired with the closest-volume unlinked
/// contract that forms a recognised structure.
pub fn link_legs(quotes: &[OptionQuote], config: &LegConfig) -> HashMap<String, LegLink> {
    let mut candidates: Vec<(String, &OptionQuote)> = quotes
        .iter()
        .filter(|q| q.volume >= config.min_leg_volume.max(1))
        .map(|q| (q.contract_symbol(), q))
        .collect();

    candidates.sort_by(|a, b| b.1.volume.cmp(&a.1.volume).then_with(|| a.0.cmp(&b.0)));

    let mut links: HashMap<String, LegLink> = HashMap::new();

    for i in 0..candidates.len() {
        let (ref sym_a, a) = candidates[i];
        if links.contains_key(sym_a) {
            continue;
        }

        for (sym_b, b) in candidates.iter().skip(i + 1) {
            let ratio = b.volume as f64 / a.volume as f64;
            if 1.0 - ratio > config.volume_tolerance {
                break; // sorted descending: every later leg is further away
            }
            if links.contains_key(sym_b) || sym_a == sym_b {
                continue;
            }

            if let Some(structure) = SpreadStructure::between(a, b) {
                links.insert(
                    sym_a.clone(),
                    LegLink {
                        partner: sym_b.clone(),
                        structure,
                        volume_ratio: ratio,
                    },
                );
                links.insert(
                    sym_b.clone(),
                    LegLink {
                        partner: sym_a.clone(),
                        structure,
                        volume_ratio: ratio,
                    },
                );
                break;
            }
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::option::tests::sample_quote;
    use crate::core::OptionRight;
    use chrono::NaiveDate;

    fn leg(right: OptionRight, strike: f64, volume: u64) -> OptionQuote {
        let mut q = sample_quote(right, strike);
        q.volume = volume;
        q
    }

    #[test]
    fn test_vertical_linked() {
        let quotes = vec![
            leg(OptionRight::Call, 150.0, 5_000),
            leg(OptionRight::Call, 160.0, 4_900),
            leg(OptionRight::Call, 170.0, 300),
        ];
        let links = link_legs(&quotes, &LegConfig::default());

        assert_eq!(links.len(), 2);
        let a = &links[&quotes[0].contract_symbol()];
        assert_eq!(a.structure, SpreadStructure::Vertical);
        assert_eq!(a.partner, quotes[1].contract_symbol());
        assert!((a.volume_ratio - 0.98).abs() < 1e-12);
    }

    #[test]
    fn test_combo_and_calendar() {
        let mut far = leg(OptionRight::Put, 140.0, 2_000);
        far.expiry = NaiveDate::from_ymd_opt(2024, 7, 19).unwrap();

        let quotes = vec![
            leg(OptionRight::Call, 150.0, 8_000),
            leg(OptionRight::Put, 130.0, 8_000),
            leg(OptionRight::Put, 140.0, 2_000),
            far,
        ];
        let links = link_legs(&quotes, &LegConfig::default());

        assert_eq!(links[&quotes[0].contract_symbol()].structure, SpreadStructure::Combo);
        assert_eq!(links[&quotes[2].contract_symbol()].structure, SpreadStructure::Calendar);
    }

    #[test]
    fn test_volume_mismatch_not_linked() {
        let quotes = vec![
            leg(OptionRight::Call, 150.0, 5_000),
            leg(OptionRight::Call, 160.0, 4_000),
        ];
        assert!(link_legs(&quotes, &LegConfig::default()).is_empty());
    }

    #[test]
    fn test_small_legs_ignored() {
        let quotes = vec![
            leg(OptionRight::Call, 150.0, 50),
            leg(OptionRight::Call, 160.0, 50),
        ];
        assert!(link_legs(&quotes, &LegConfig::default()).is_empty());
    }
}
