//! Per-preference comparators used to explain optional preferences.
//!
//! Each comparator yields at most one outcome for a (school, preference) pair
//! and abstains when the school lacks the attribute it needs.

use crate::models::{Grade, MatchOutcome, PartyScene, PreferenceName, PreferenceSet, Region, School, SizeCategory};
use num_format::{Locale, ToFormattedString};
use serde_json::Value;

/// SAT points within which a school average counts as a match
pub const SAT_MATCH_WINDOW: u16 = 100;
/// SAT points within which a match is described as "close"
pub const SAT_CLOSE_WINDOW: u16 = 50;
/// ACT points within which a school average counts as a match
pub const ACT_MATCH_WINDOW: u8 = 2;
/// ACT points within which a match is described as "close"
pub const ACT_CLOSE_WINDOW: u8 = 1;

/// Compares one optional preference against one school.
pub trait Comparator: Send + Sync {
    fn preference(&self) -> PreferenceName;

    /// `None` when the preference is unset or the school lacks the attribute
    fn compare(&self, preferences: &PreferenceSet, school: &School) -> Option<MatchOutcome>;
}

/// Approximate SAT total for an ACT composite (concordance midpoint)
pub fn act_to_sat(act: u8) -> Option<u16> {
    const TABLE: [u16; 36] = [
        270, 310, 350, 390, 430, 470, 510, 550, 590, 630, 670, 710, 750, 790, 850, 910, 950, 990, 1030, 1060, 1090,
        1120, 1150, 1180, 1210, 1240, 1270, 1310, 1340, 1370, 1400, 1430, 1460, 1500, 1570, 1600,
    ];
    match act {
        1..=36 => Some(TABLE[act as usize - 1]),
        _ => None,
    }
}

/// Approximate ACT composite for an SAT total, from the lower bound of each SAT band
pub fn sat_to_act(sat: u16) -> u8 {
    const BANDS: [(u16, u8); 35] = [
        (1570, 36), (1530, 35), (1490, 34), (1450, 33), (1420, 32), (1390, 31), (1350, 30),
        (1320, 29), (1290, 28), (1250, 27), (1220, 26), (1190, 25), (1150, 24), (1120, 23),
        (1090, 22), (1060, 21), (1030, 20), (990, 19), (960, 18), (920, 17), (880, 16),
        (830, 15), (780, 14), (730, 13), (690, 12), (650, 11), (620, 10), (590, 9),
        (560, 8), (530, 7), (500, 6), (470, 5), (440, 4), (410, 3), (400, 2),
    ];
    BANDS
        .iter()
        .find(|(lower, _)| sat >= *lower)
        .map(|(_, act)| *act)
        .unwrap_or(1)
}

fn string_list<T: AsRef<str>>(items: impl IntoIterator<Item = T>) -> Value {
    Value::from(items.into_iter().map(|s| s.as_ref().to_string()).collect::<Vec<_>>())
}

fn joined<T: AsRef<str>>(items: impl IntoIterator<Item = T>) -> String {
    items.into_iter().map(|s| s.as_ref().to_string()).collect::<Vec<_>>().join(", ")
}

/// Set membership on the school's state
pub struct PreferredStates;

impl Comparator for PreferredStates {
    fn preference(&self) -> PreferenceName {
        PreferenceName::PreferredStates
    }

    fn compare(&self, preferences: &PreferenceSet, school: &School) -> Option<MatchOutcome> {
        let states = preferences.preferred_states();
        let state = school.school_state.as_deref()?.trim();
        if states.is_empty() || state.is_empty() {
            return None;
        }

        let user_value = string_list(states);
        if states.iter().any(|s| s.eq_ignore_ascii_case(state)) {
            Some(MatchOutcome::matched(
                self.preference(),
                user_value,
                state,
                format!("Located in preferred state: {}", state),
            ))
        } else {
            Some(MatchOutcome::missed(
                self.preference(),
                user_value,
                state,
                format!("Located in {}, not in your preferred states: {}", state, joined(states)),
            ))
        }
    }
}

/// Set membership on the school's region; derives the region from the
/// state when the catalog row has none
pub struct PreferredRegions;

impl Comparator for PreferredRegions {
    fn preference(&self) -> PreferenceName {
        PreferenceName::PreferredRegions
    }

    fn compare(&self, preferences: &PreferenceSet, school: &School) -> Option<MatchOutcome> {
        let regions = preferences.preferred_regions();
        if regions.is_empty() {
            return None;
        }
        let user_value = string_list(regions.iter().map(Region::as_str));
        let wanted = joined(regions.iter().map(Region::as_str));

        match (school.school_region, school.school_state.as_deref()) {
            (Some(region), _) if regions.contains(&region) => Some(MatchOutcome::matched(
                self.preference(),
                user_value,
                region.as_str(),
                format!("Located in preferred region: {}", region),
            )),
            (Some(region), _) => Some(MatchOutcome::missed(
                self.preference(),
                user_value,
                region.as_str(),
                format!("Located in {} region, not in your preferred regions: {}", region, wanted),
            )),
            (None, Some(state)) => match regions.iter().find(|r| r.contains_state(state)) {
                Some(region) => Some(MatchOutcome::matched(
                    self.preference(),
                    user_value,
                    state,
                    format!("Located in preferred region: {} ({})", region, state),
                )),
                None => Some(MatchOutcome::missed(
                    self.preference(),
                    user_value,
                    state,
                    format!("Located in {}, outside your preferred regions: {}", state, wanted),
                )),
            },
            (None, None) => None,
        }
    }
}

/// Standardized test the applicant reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestScale {
    Sat,
    Act,
}

/// Numeric tolerance window around the school's average test score, with
/// cross-scale conversion when the school only reports the other test
pub struct TestScoreWindow {
    scale: TestScale,
}

impl TestScoreWindow {
    pub fn sat() -> Self {
        Self { scale: TestScale::Sat }
    }

    pub fn act() -> Self {
        Self { scale: TestScale::Act }
    }

    /// (applicant score, school average, match window, close window, label)
    fn resolve(&self, preferences: &PreferenceSet, school: &School) -> Option<(u16, u16, u16, u16, &'static str)> {
        match self.scale {
            TestScale::Sat => {
                let user = preferences.sat()?;
                let avg = match school.sat_average() {
                    Some(avg) => avg,
                    None => act_to_sat(school.act_average()?)?,
                };
                Some((user, avg, SAT_MATCH_WINDOW, SAT_CLOSE_WINDOW, "SAT"))
            }
            TestScale::Act => {
                let user = preferences.act()?;
                let avg = match school.act_average() {
                    Some(avg) => avg,
                    None => sat_to_act(school.sat_average()?),
                };
                Some((
                    user as u16,
                    avg as u16,
                    ACT_MATCH_WINDOW as u16,
                    ACT_CLOSE_WINDOW as u16,
                    "ACT",
                ))
            }
        }
    }
}

impl Comparator for TestScoreWindow {
    fn preference(&self) -> PreferenceName {
        match self.scale {
            TestScale::Sat => PreferenceName::Sat,
            TestScale::Act => PreferenceName::Act,
        }
    }

    fn compare(&self, preferences: &PreferenceSet, school: &School) -> Option<MatchOutcome> {
        let (user, avg, window, close, label) = self.resolve(preferences, school)?;
        let difference = user.abs_diff(avg);

        if difference <= window {
            let description = if difference <= close {
                format!("{} ({}) close to school average ({})", label, user, avg)
            } else {
                format!("{} ({}) within range of school average ({})", label, user, avg)
            };
            Some(MatchOutcome::matched(self.preference(), user, avg, description))
        } else {
            let reason = if user > avg {
                format!(
                    "{} ({}) is significantly higher than school average ({}) - you may be overqualified",
                    label, user, avg
                )
            } else {
                format!(
                    "{} ({}) is significantly lower than school average ({}) - you may be underqualified",
                    label, user, avg
                )
            };
            Some(MatchOutcome::missed(self.preference(), user, avg, reason))
        }
    }
}

/// Ordinal minimum on one of the school's letter grades
pub struct GradeMinimum {
    preference: PreferenceName,
    label: &'static str,
    minimum: fn(&PreferenceSet) -> Option<Grade>,
    grade: fn(&School) -> Option<Grade>,
}

impl GradeMinimum {
    pub fn academics() -> Self {
        Self {
            preference: PreferenceName::MinAcademicRating,
            label: "Academic rating",
            minimum: PreferenceSet::min_academic_rating,
            grade: |school| school.academics_grade,
        }
    }

    pub fn student_satisfaction() -> Self {
        Self {
            preference: PreferenceName::MinStudentSatisfactionRating,
            label: "Student satisfaction rating",
            minimum: PreferenceSet::min_student_satisfaction_rating,
            grade: |school| school.student_life_grade,
        }
    }

    pub fn athletics() -> Self {
        Self {
            preference: PreferenceName::MinAthleticsRating,
            label: "Athletics rating",
            minimum: PreferenceSet::min_athletics_rating,
            grade: |school| school.athletics_grade,
        }
    }
}

impl Comparator for GradeMinimum {
    fn preference(&self) -> PreferenceName {
        self.preference
    }

    fn compare(&self, preferences: &PreferenceSet, school: &School) -> Option<MatchOutcome> {
        let minimum = (self.minimum)(preferences)?;
        let grade = (self.grade)(school)?;

        if grade >= minimum {
            Some(MatchOutcome::matched(
                self.preference,
                minimum.as_str(),
                grade.as_str(),
                format!("{} {} meets minimum {}", self.label, grade, minimum),
            ))
        } else {
            Some(MatchOutcome::missed(
                self.preference,
                minimum.as_str(),
                grade.as_str(),
                format!("{} {} is below your minimum requirement of {}", self.label, grade, minimum),
            ))
        }
    }
}

/// Derived bucket comparison on enrollment
pub struct SchoolSize;

impl Comparator for SchoolSize {
    fn preference(&self) -> PreferenceName {
        PreferenceName::PreferredSchoolSize
    }

    fn compare(&self, preferences: &PreferenceSet, school: &School) -> Option<MatchOutcome> {
        let sizes = preferences.preferred_school_size();
        let enrollment = school.undergrad_enrollment?;
        if sizes.is_empty() {
            return None;
        }

        let size = SizeCategory::from_enrollment(enrollment);
        let school_value = format!("{} ({} students)", size, enrollment.to_formatted_string(&Locale::en));
        let user_value = string_list(sizes.iter().map(SizeCategory::as_str));

        if sizes.contains(&size) {
            Some(MatchOutcome::matched(
                self.preference(),
                user_value,
                school_value.clone(),
                format!("School size matches preference: {}", school_value),
            ))
        } else {
            Some(MatchOutcome::missed(
                self.preference(),
                user_value,
                school_value.clone(),
                format!(
                    "School size is {}, not in your preferred sizes: {}",
                    school_value,
                    joined(sizes.iter().map(SizeCategory::as_str))
                ),
            ))
        }
    }
}

/// Derived bucket comparison on the party-scene grade
pub struct PartySceneFit;

impl Comparator for PartySceneFit {
    fn preference(&self) -> PreferenceName {
        PreferenceName::PartyScenePreference
    }

    fn compare(&self, preferences: &PreferenceSet, school: &School) -> Option<MatchOutcome> {
        let scenes = preferences.party_scene_preference();
        let grade = school.party_scene_grade?;
        if scenes.is_empty() {
            return None;
        }

        let scene = PartyScene::from_grade(grade);
        let user_value = string_list(scenes.iter().map(PartyScene::as_str));

        if scenes.contains(&scene) {
            Some(MatchOutcome::matched(
                self.preference(),
                user_value,
                grade.as_str(),
                format!("Party scene matches preferences: {} ({})", scene, grade),
            ))
        } else {
            Some(MatchOutcome::missed(
                self.preference(),
                user_value,
                grade.as_str(),
                format!(
                    "Party scene ({}) doesn't match your preferences: {}",
                    grade,
                    joined(scenes.iter().map(PartyScene::as_str))
                ),
            ))
        }
    }
}

/// Applicable tuition over the budget. Only ever explains a miss; being
/// within budget adds nothing to the match count.
pub struct Budget;

impl Comparator for Budget {
    fn preference(&self) -> PreferenceName {
        PreferenceName::MaxBudget
    }

    fn compare(&self, preferences: &PreferenceSet, school: &School) -> Option<MatchOutcome> {
        let budget = preferences.max_budget()?;
        let home = preferences.home_state();
        let tuition = school.applicable_tuition(home)?;
        if tuition <= budget {
            return None;
        }

        let kind = if school.is_in_state(home) { "In-state" } else { "Out-of-state" };
        Some(MatchOutcome::missed(
            self.preference(),
            budget,
            tuition,
            format!(
                "{} tuition ${} exceeds your budget of ${}",
                kind,
                tuition.to_formatted_string(&Locale::en),
                budget.to_formatted_string(&Locale::en)
            ),
        ))
    }
}

/// Admission rate under the applicant's floor. Miss-only, like [`Budget`].
pub struct AdmitRateFloor;

impl Comparator for AdmitRateFloor {
    fn preference(&self) -> PreferenceName {
        PreferenceName::AdmitRateFloor
    }

    fn compare(&self, preferences: &PreferenceSet, school: &School) -> Option<MatchOutcome> {
        let floor = preferences.admit_rate_floor()?;
        let rate = school.admission_rate? * 100.0;
        if rate >= floor {
            return None;
        }

        Some(MatchOutcome::missed(
            self.preference(),
            floor,
            format!("{:.1}%", rate),
            format!("Admission rate {:.1}% is below your minimum of {}%", rate, floor),
        ))
    }
}

/// One comparator per scoreable preference
pub fn default_comparators() -> Vec<Box<dyn Comparator>> {
    vec![
        Box::new(PreferredStates),
        Box::new(PreferredRegions),
        Box::new(Budget),
        Box::new(GradeMinimum::academics()),
        Box::new(GradeMinimum::student_satisfaction()),
        Box::new(AdmitRateFloor),
        Box::new(TestScoreWindow::sat()),
        Box::new(TestScoreWindow::act()),
        Box::new(GradeMinimum::athletics()),
        Box::new(SchoolSize),
        Box::new(PartySceneFit),
    ]
}
