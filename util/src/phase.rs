use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Course milestones a submission can target, in course order.
///
/// `Quality` is a sentinel used for quality-only checks; it sorts after every
/// numbered phase and is never graded for credit.
/// Serialized by variant name (e.g. "Phase3", "Quality").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub enum Phase {
    Phase0,
    Phase1,
    Phase3,
    Phase4,
    Phase5,
    Phase6,
    Quality,
}

impl Phase {
    pub const ALL: [Phase; 7] = [
        Phase::Phase0,
        Phase::Phase1,
        Phase::Phase3,
        Phase::Phase4,
        Phase::Phase5,
        Phase::Phase6,
        Phase::Quality,
    ];

    /// Whether submissions for this phase earn credit and take part in commit verification.
    pub fn is_graded(self) -> bool {
        match self {
            Phase::Phase0
            | Phase::Phase1
            | Phase::Phase3
            | Phase::Phase4
            | Phase::Phase5
            | Phase::Phase6 => true,
            Phase::Quality => false,
        }
    }

    /// Human-readable name, e.g. "Phase 3".
    pub fn display_name(self) -> &'static str {
        match self {
            Phase::Phase0 => "Phase 0",
            Phase::Phase1 => "Phase 1",
            Phase::Phase3 => "Phase 3",
            Phase::Phase4 => "Phase 4",
            Phase::Phase5 => "Phase 5",
            Phase::Phase6 => "Phase 6",
            Phase::Quality => "Quality",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Accepts the variant name (any case), the bare phase number, or "phase N".
impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let normalized = normalized.strip_prefix("phase").unwrap_or(&normalized);
        match normalized {
            "0" => Ok(Phase::Phase0),
            "1" => Ok(Phase::Phase1),
            "3" => Ok(Phase::Phase3),
            "4" => Ok(Phase::Phase4),
            "5" => Ok(Phase::Phase5),
            "6" => Ok(Phase::Phase6),
            "quality" => Ok(Phase::Quality),
            _ => Err(format!("Unknown phase '{s}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Phases sort in course order with Quality last.
    #[test]
    fn test_phase_ordering() {
        let mut phases = vec![Phase::Quality, Phase::Phase4, Phase::Phase0, Phase::Phase6];
        phases.sort();
        assert_eq!(
            phases,
            vec![Phase::Phase0, Phase::Phase4, Phase::Phase6, Phase::Quality]
        );
        assert!(Phase::Phase1 < Phase::Phase3);
    }

    /// Only the quality sentinel is ungraded.
    #[test]
    fn test_is_graded() {
        let ungraded: Vec<Phase> = Phase::ALL.into_iter().filter(|p| !p.is_graded()).collect();
        assert_eq!(ungraded, vec![Phase::Quality]);
    }

    #[test]
    fn test_from_str_aliases() {
        assert_eq!("3".parse::<Phase>().unwrap(), Phase::Phase3);
        assert_eq!("Phase6".parse::<Phase>().unwrap(), Phase::Phase6);
        assert_eq!("phase 1".parse::<Phase>().unwrap(), Phase::Phase1);
        assert_eq!("QUALITY".parse::<Phase>().unwrap(), Phase::Quality);
        assert!("2".parse::<Phase>().is_err());
    }

    #[test]
    fn test_serde_uses_variant_names() {
        assert_eq!(serde_json::to_string(&Phase::Phase5).unwrap(), "\"Phase5\"");
        let p: Phase = serde_json::from_str("\"Quality\"").unwrap();
        assert_eq!(p, Phase::Quality);
    }
}
