use crate::core::classifier::PreferencePartition;
use crate::models::{
    FilterReport, FilterStage, Grade, PartyScene, PreferenceName, PreferenceSet, Region, School, SizeCategory, Tier,
};

/// SAT window a school's average must fall in for a must-have SAT
pub const SAT_TOLERANCE: u16 = 100;
/// ACT window a school's average must fall in for a must-have ACT
pub const ACT_TOLERANCE: u8 = 2;

/// School state is one of the preferred states
#[inline]
pub fn in_preferred_states(school: &School, states: &[String]) -> bool {
    school
        .school_state
        .as_deref()
        .map(|state| states.iter().any(|s| s.eq_ignore_ascii_case(state.trim())))
        .unwrap_or(false)
}

/// School region (or, without one, its state) lies in a preferred region
#[inline]
pub fn in_preferred_regions(school: &School, regions: &[Region]) -> bool {
    match (school.school_region, school.school_state.as_deref()) {
        (Some(region), _) => regions.contains(&region),
        (None, Some(state)) => regions.iter().any(|r| r.contains_state(state)),
        (None, None) => false,
    }
}

/// Applicable tuition is known and within budget
#[inline]
pub fn within_budget(school: &School, home_state: &str, budget: u32) -> bool {
    school
        .applicable_tuition(home_state)
        .map(|tuition| tuition <= budget)
        .unwrap_or(false)
}

/// Grade is known and at least `minimum`
#[inline]
pub fn meets_grade(grade: Option<Grade>, minimum: Grade) -> bool {
    grade.map(|g| g >= minimum).unwrap_or(false)
}

/// Admission rate is known and at least `floor_percent`
#[inline]
pub fn meets_admit_floor(school: &School, floor_percent: f64) -> bool {
    school
        .admission_rate
        .map(|rate| rate >= floor_percent / 100.0)
        .unwrap_or(false)
}

/// Applicant SAT within tolerance of the school average. Schools that do not
/// report an average SAT are not judged on it.
#[inline]
pub fn sat_competitive(school: &School, sat: u16) -> bool {
    school
        .sat_average()
        .map(|avg| avg.abs_diff(sat) <= SAT_TOLERANCE)
        .unwrap_or(true)
}

/// ACT counterpart of [`sat_competitive`]
#[inline]
pub fn act_competitive(school: &School, act: u8) -> bool {
    school
        .act_average()
        .map(|avg| avg.abs_diff(act) <= ACT_TOLERANCE)
        .unwrap_or(true)
}

/// Enrollment bucket is preferred; unknown enrollment passes
#[inline]
pub fn size_matches(school: &School, sizes: &[SizeCategory]) -> bool {
    school.size_category().map(|size| sizes.contains(&size)).unwrap_or(true)
}

/// Party-scene bucket is preferred; unknown party grade passes
#[inline]
pub fn party_matches(school: &School, scenes: &[PartyScene]) -> bool {
    school.party_scene().map(|scene| scenes.contains(&scene)).unwrap_or(true)
}

/// Evaluate one must-have preference against one school
pub fn passes_preference(school: &School, preferences: &PreferenceSet, name: PreferenceName) -> bool {
    match name {
        // Rejected as a must-have when the preference set is built
        PreferenceName::HomeState => true,
        PreferenceName::PreferredStates => in_preferred_states(school, preferences.preferred_states()),
        PreferenceName::PreferredRegions => in_preferred_regions(school, preferences.preferred_regions()),
        PreferenceName::MaxBudget => preferences
            .max_budget()
            .map(|budget| within_budget(school, preferences.home_state(), budget))
            .unwrap_or(true),
        PreferenceName::MinAcademicRating => preferences
            .min_academic_rating()
            .map(|min| meets_grade(school.academics_grade, min))
            .unwrap_or(true),
        PreferenceName::MinStudentSatisfactionRating => preferences
            .min_student_satisfaction_rating()
            .map(|min| meets_grade(school.student_life_grade, min))
            .unwrap_or(true),
        PreferenceName::AdmitRateFloor => preferences
            .admit_rate_floor()
            .map(|floor| meets_admit_floor(school, floor))
            .unwrap_or(true),
        PreferenceName::Sat => preferences.sat().map(|sat| sat_competitive(school, sat)).unwrap_or(true),
        PreferenceName::Act => preferences.act().map(|act| act_competitive(school, act)).unwrap_or(true),
        PreferenceName::MinAthleticsRating => preferences
            .min_athletics_rating()
            .map(|min| meets_grade(school.athletics_grade, min))
            .unwrap_or(true),
        PreferenceName::PreferredSchoolSize => size_matches(school, preferences.preferred_school_size()),
        PreferenceName::PartyScenePreference => party_matches(school, preferences.party_scene_preference()),
    }
}

/// Whether a school survives `stage` given the stage's mandatory preferences.
///
/// The geographic stage accepts a school matching any of its mandatory
/// preferences (state list or region list); every other stage requires all.
pub fn passes_stage(school: &School, preferences: &PreferenceSet, stage: FilterStage, mandatory: &[PreferenceName]) -> bool {
    match stage {
        FilterStage::Geographic => mandatory.iter().any(|name| passes_preference(school, preferences, *name)),
        _ => mandatory.iter().all(|name| passes_preference(school, preferences, *name)),
    }
}

/// Run a single stage. A stage with no mandatory preference is a recorded no-op.
pub fn run_stage(
    stage: FilterStage,
    schools: Vec<School>,
    preferences: &PreferenceSet,
    partition: &PreferencePartition,
    tier: Tier,
) -> (Vec<School>, FilterReport) {
    let mandatory: Vec<PreferenceName> = partition.mandatory_among(stage.preferences()).collect();
    let before = schools.len();

    if mandatory.is_empty() {
        let report = FilterReport {
            stage,
            tier,
            applied: false,
            removed: 0,
            remaining: before,
            skip_reason: Some(format!("no must-have preferences for the {} stage", stage.as_str())),
        };
        return (schools, report);
    }

    let survivors: Vec<School> = schools
        .into_iter()
        .filter(|school| passes_stage(school, preferences, stage, &mandatory))
        .collect();

    let report = FilterReport {
        stage,
        tier,
        applied: true,
        removed: before - survivors.len(),
        remaining: survivors.len(),
        skip_reason: None,
    };

    tracing::debug!(
        stage = stage.as_str(),
        tier = %tier,
        removed = report.removed,
        remaining = report.remaining,
        "Hard filter stage applied"
    );

    (survivors, report)
}

/// Apply all five stages in order (geographic, financial, academic, athletic,
/// demographic) to one tier's pool.
pub fn apply_hard_filters(
    schools: &[School],
    preferences: &PreferenceSet,
    partition: &PreferencePartition,
    tier: Tier,
) -> (Vec<School>, Vec<FilterReport>) {
    let mut current = schools.to_vec();
    let mut reports = Vec::with_capacity(FilterStage::ORDER.len());

    for stage in FilterStage::ORDER {
        let (next, report) = run_stage(stage, current, preferences, partition, tier);
        current = next;
        reports.push(report);
    }

    (current, reports)
}
