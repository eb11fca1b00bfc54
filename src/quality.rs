//! Quality tiers and caller hints.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical quality tiers, best first.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quality {
    /// Original source ("原画").
    OD,
    UHD,
    HD,
    SD,
    LD,
    /// Blu-ray tier, offered by some platforms as an alias of the source.
    BD,
}

impl Quality {
    pub const ALL: [Quality; 6] = [
        Quality::OD,
        Quality::UHD,
        Quality::HD,
        Quality::SD,
        Quality::LD,
        Quality::BD,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Quality::OD => "OD",
            Quality::UHD => "UHD",
            Quality::HD => "HD",
            Quality::SD => "SD",
            Quality::LD => "LD",
            Quality::BD => "BD",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Quality {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Quality::ALL
            .into_iter()
            .find(|q| q.label() == upper)
            .ok_or(())
    }
}

/// What the caller asked for: nothing, a label, or an index into the
/// platform's own ordered list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum QualityHint {
    #[default]
    Default,
    Label(String),
    Index(usize),
}

impl QualityHint {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => QualityHint::Default,
            Some(s) if s.bytes().all(|b| b.is_ascii_digit()) => {
                // Absurdly long digit strings overflow; treat them as out of range.
                s.parse::<usize>()
                    .map_or(QualityHint::Index(usize::MAX), QualityHint::Index)
            }
            Some(s) => QualityHint::Label(s.to_string()),
        }
    }

    /// Resolve against a platform's ordered tier list.
    ///
    /// Unknown labels, labels the platform does not offer, and out-of-range
    /// indices all yield the platform default (`tiers[0]`).
    pub fn resolve(&self, tiers: &[Quality]) -> Quality {
        let default = tiers.first().copied().unwrap_or(Quality::OD);
        match self {
            QualityHint::Default => default,
            QualityHint::Index(i) => tiers.get(*i).copied().unwrap_or(default),
            QualityHint::Label(label) => label
                .parse::<Quality>()
                .ok()
                .filter(|q| tiers.contains(q))
                .unwrap_or(default),
        }
    }
}

impl From<Option<&str>> for QualityHint {
    fn from(raw: Option<&str>) -> Self {
        QualityHint::parse(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIVE: [Quality; 5] = [
        Quality::OD,
        Quality::UHD,
        Quality::HD,
        Quality::SD,
        Quality::LD,
    ];

    #[test]
    fn numeric_hint_matches_label() {
        let by_index = QualityHint::parse(Some("2")).resolve(&FIVE);
        let by_label = QualityHint::parse(Some("HD")).resolve(&FIVE);
        assert_eq!(by_index, Quality::HD);
        assert_eq!(by_index, by_label);
    }

    #[test]
    fn labels_are_case_insensitive() {
        assert_eq!(QualityHint::parse(Some(" uhd ")).resolve(&FIVE), Quality::UHD);
    }

    #[test]
    fn out_of_range_index_falls_back_to_default() {
        assert_eq!(QualityHint::parse(Some("5")).resolve(&FIVE), Quality::OD);
        assert_eq!(
            QualityHint::parse(Some("99999999999999999999999")).resolve(&FIVE),
            Quality::OD
        );
    }

    #[test]
    fn unknown_or_unoffered_label_falls_back_to_default() {
        assert_eq!(QualityHint::parse(Some("4K")).resolve(&FIVE), Quality::OD);
        assert_eq!(QualityHint::parse(Some("BD")).resolve(&FIVE), Quality::OD);

        let with_bd = [Quality::OD, Quality::BD, Quality::UHD];
        assert_eq!(QualityHint::parse(Some("bd")).resolve(&with_bd), Quality::BD);
    }

    #[test]
    fn empty_hint_is_default() {
        assert_eq!(QualityHint::parse(None), QualityHint::Default);
        assert_eq!(QualityHint::parse(Some("")), QualityHint::Default);
        assert_eq!(QualityHint::Default.resolve(&FIVE), Quality::OD);
    }
}
