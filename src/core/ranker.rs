use crate::models::{grade_value, ScoredSchool, Tier, TierClassification};
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};

/// Alignment of `tier` with the classification whose top prediction is `primary`.
///
/// The primary tier scores 3. When the primary is the middle tier, the
/// neighbour holding more of the remaining probability mass scores 2 and the
/// other 1. A lone neighbour of an edge tier scores 2.
pub fn tier_alignment(classification: &TierClassification, primary: Tier, tier: Tier) -> u8 {
    if tier == primary {
        return 3;
    }
    if !primary.neighbours().contains(&tier) {
        return 0;
    }
    match primary {
        Tier::NonP4D1 => {
            let toward_p4 = classification.p4_probability();
            let toward_non_d1 = 1.0 - classification.d1_probability();
            let p4_leads = toward_p4 >= toward_non_d1;
            match (tier, p4_leads) {
                (Tier::Power4D1, true) | (Tier::NonD1, false) => 2,
                _ => 1,
            }
        }
        _ => 2,
    }
}

/// Default ordering: more optional matches, then better tier alignment, then
/// better overall grade. Stable, so equal schools keep catalog order.
pub fn rank(schools: &mut [ScoredSchool]) {
    schools.sort_by_key(|s| {
        (
            Reverse(s.match_count()),
            Reverse(s.tier_alignment),
            Reverse(s.school.quality()),
        )
    });
}

/// Client-selectable sort applied after ranking and truncation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[serde(alias = "playing_time_score")]
    FitPercentile,
    AcademicGrade,
    #[serde(alias = "nice_to_have_count")]
    MatchCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Re-sort by a client key. Schools without a value for the key sort last in
/// either direction.
pub fn resort(schools: &mut [ScoredSchool], key: SortKey, order: SortOrder) {
    let value = |s: &ScoredSchool| -> Option<f64> {
        match key {
            SortKey::FitPercentile => s.fit_percentile,
            SortKey::AcademicGrade => s.school.academics_grade.map(|g| grade_value(Some(g)) as f64),
            SortKey::MatchCount => Some(s.match_count() as f64),
        }
    };

    schools.sort_by(|a, b| match (value(a), value(b)) {
        (Some(x), Some(y)) => {
            let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
            match order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
