// Unit tests for Recruit Match

use recruit_match::core::{
    classify,
    comparators::{act_to_sat, sat_to_act, Comparator, GradeMinimum, PreferredStates, TestScoreWindow},
    filters::{apply_hard_filters, in_preferred_regions, within_budget},
    rank, tier_alignment, MatchScorer, TierSelector,
};
use recruit_match::models::{
    FilterStage, Grade, MatchOutcome, PartyScene, PreferenceName, PreferenceSet, Region, School, ScoredSchool,
    SizeCategory, Tier, TierClassification,
};

fn create_school(name: &str, state: &str) -> School {
    let mut school = School::new(name, Tier::NonP4D1);
    school.school_state = Some(state.to_string());
    school.in_state_tuition = Some(11_000);
    school.out_of_state_tuition = Some(29_000);
    school.avg_sat = Some(1280);
    school.undergrad_enrollment = Some(3_400);
    school.academics_grade = Some(Grade::AMinus);
    school.student_life_grade = Some(Grade::B);
    school.athletics_grade = Some(Grade::BPlus);
    school.party_scene_grade = Some(Grade::C);
    school.admission_rate = Some(0.48);
    school
}

#[test]
fn test_preferences_normalize_and_validate() {
    let prefs = PreferenceSet::builder(" tx ")
        .preferred_states(["ca", "CA", "or"])
        .build()
        .unwrap();
    assert_eq!(prefs.home_state(), "TX");
    assert_eq!(prefs.preferred_states(), &["CA".to_string(), "OR".to_string()]);

    assert!(PreferenceSet::builder("CA").sat(1700).build().is_err());
    assert!(PreferenceSet::builder("CA").act(0).build().is_err());
    assert!(PreferenceSet::builder("CA")
        .must_have(PreferenceName::MaxBudget)
        .build()
        .is_err());
}

#[test]
fn test_preference_names_round_trip_wire_form() {
    for name in PreferenceName::ALL {
        let parsed: PreferenceName = name.as_str().parse().unwrap();
        assert_eq!(parsed, name);
    }
    assert_eq!("home_state".parse::<PreferenceName>().unwrap(), PreferenceName::HomeState);
    assert!("mascot".parse::<PreferenceName>().is_err());
}

#[test]
fn test_region_prefers_catalog_region() {
    let mut school = create_school("Ambiguous", "TX");
    assert!(!in_preferred_regions(&school, &[Region::West]));
    school.school_region = Some(Region::West);
    assert!(in_preferred_regions(&school, &[Region::West]));
}

#[test]
fn test_budget_depends_on_residency() {
    let school = create_school("State U", "OR");
    assert!(within_budget(&school, "OR", 15_000));
    assert!(!within_budget(&school, "WA", 15_000));
}

#[test]
fn test_every_stage_reported_in_order() {
    let prefs = PreferenceSet::builder("CA")
        .min_athletics_rating(Grade::A)
        .must_have(PreferenceName::MinAthleticsRating)
        .build()
        .unwrap();
    let partition = classify(&prefs);

    let (kept, reports) = apply_hard_filters(&[create_school("Grinders", "CA")], &prefs, &partition, Tier::NonP4D1);
    assert!(kept.is_empty());

    let stages: Vec<FilterStage> = reports.iter().map(|r| r.stage).collect();
    assert_eq!(stages, FilterStage::ORDER.to_vec());
    let athletic = &reports[3];
    assert!(athletic.applied);
    assert_eq!(athletic.removed, 1);
    assert!(reports.iter().filter(|r| r.stage != FilterStage::Athletic).all(|r| !r.applied));
}

#[test]
fn test_demographic_stage_requires_all_mandatory() {
    let prefs = PreferenceSet::builder("CA")
        .preferred_school_size([SizeCategory::Small])
        .party_scene_preference([PartyScene::Moderate])
        .must_haves([PreferenceName::PreferredSchoolSize, PreferenceName::PartyScenePreference])
        .build()
        .unwrap();
    let partition = classify(&prefs);

    let (kept, _) = apply_hard_filters(&[create_school("Quiet Campus", "CA")], &prefs, &partition, Tier::NonP4D1);
    assert!(kept.is_empty(), "medium enrollment with a quiet party scene");
}

#[test]
fn test_concordance_is_roughly_inverse() {
    for act in 10..=36u8 {
        let sat = act_to_sat(act).unwrap();
        let back = sat_to_act(sat);
        assert!(back.abs_diff(act) <= 1, "act {} -> sat {} -> act {}", act, sat, back);
    }
}

#[test]
fn test_comparator_descriptions() {
    let school = create_school("Test College", "NV");
    let prefs = PreferenceSet::builder("CA")
        .preferred_states(["CA", "OR"])
        .sat(1290)
        .min_student_satisfaction_rating(Grade::B)
        .build()
        .unwrap();

    match PreferredStates.compare(&prefs, &school).unwrap() {
        MatchOutcome::Miss(miss) => {
            assert_eq!(miss.reason, "Located in NV, not in your preferred states: CA, OR");
        }
        MatchOutcome::Match(_) => panic!("NV is not preferred"),
    }

    match TestScoreWindow::sat().compare(&prefs, &school).unwrap() {
        MatchOutcome::Match(hit) => assert_eq!(hit.description, "SAT (1290) close to school average (1280)"),
        MatchOutcome::Miss(_) => panic!("10 points apart"),
    }

    match GradeMinimum::student_satisfaction().compare(&prefs, &school).unwrap() {
        MatchOutcome::Match(hit) => assert_eq!(hit.description, "Student satisfaction rating B meets minimum B"),
        MatchOutcome::Miss(_) => panic!("equal grades meet the minimum"),
    }
}

#[test]
fn test_scorer_never_matches_and_misses_same_preference() {
    let school = create_school("Test College", "CA");
    let prefs = PreferenceSet::builder("CA")
        .preferred_states(["CA"])
        .preferred_regions([Region::Northeast])
        .max_budget(10_000)
        .sat(1400)
        .act(30)
        .min_academic_rating(Grade::B)
        .admit_rate_floor(30.0)
        .preferred_school_size([SizeCategory::Small])
        .build()
        .unwrap();
    let partition = classify(&prefs);

    let scored = MatchScorer::with_defaults().score(school, &prefs, &partition.optional);
    for hit in &scored.matches {
        assert!(scored.misses.iter().all(|miss| miss.preference != hit.preference));
    }
    // ACT is judged against the converted SAT average; a met admit floor is silent
    assert_eq!(scored.matches.len() + scored.misses.len(), 7);
    assert!(scored.misses.iter().any(|miss| miss.preference == PreferenceName::MaxBudget));
    assert!(scored.matches.iter().all(|hit| hit.preference != PreferenceName::AdmitRateFloor));
}

#[test]
fn test_plan_and_alignment_agree_on_neighbour_order() {
    let classification = TierClassification::from_probabilities(0.6, Some(0.2)).unwrap();
    let primary = classification.primary_tier();
    assert_eq!(primary, Tier::NonP4D1);

    let plan = TierSelector::default().plan(&classification, primary, 100);
    assert_eq!(plan.limit(Tier::NonD1), Some(40));
    assert_eq!(plan.limit(Tier::Power4D1), Some(20));

    assert_eq!(tier_alignment(&classification, primary, Tier::NonD1), 2);
    assert_eq!(tier_alignment(&classification, primary, Tier::Power4D1), 1);
}

#[test]
fn test_rank_prefers_matches_over_alignment() {
    let mut overlap = ScoredSchool::new(School::new("Overlap", Tier::NonD1));
    overlap.tier_alignment = 1;
    overlap.record(MatchOutcome::matched(PreferenceName::Sat, 1200, 1210, "close"));

    let mut primary = ScoredSchool::new(School::new("Primary", Tier::NonP4D1));
    primary.tier_alignment = 3;

    let mut schools = vec![primary, overlap];
    rank(&mut schools);
    assert_eq!(schools[0].name(), "Overlap");
}
