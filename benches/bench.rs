// Criterion benchmarks for Recruit Match

use criterion::{black_box, criterion_group, criterion_main, Criterion, BenchmarkId};
use recruit_match::core::{classify, filters::apply_hard_filters, MatchPipeline, MatchScorer, PipelineConfig};
use recruit_match::models::{Grade, PreferenceName, PreferenceSet, Region, School, SizeCategory, Tier, TierClassification};
use recruit_match::services::{GuardConfig, InMemoryStore, RateLimitConfig, ResourceGuard, SchoolRepository};
use std::sync::Arc;

const STATES: [&str; 8] = ["CA", "TX", "NY", "OR", "FL", "OH", "MA", "CO"];
const GRADES: [Grade; 5] = [Grade::APlus, Grade::AMinus, Grade::BPlus, Grade::B, Grade::C];

fn create_school(id: usize, tier: Tier) -> School {
    let mut school = School::new(format!("School {}", id), tier);
    school.school_state = Some(STATES[id % STATES.len()].to_string());
    school.in_state_tuition = Some(8_000 + (id % 20) as u32 * 1_000);
    school.out_of_state_tuition = Some(20_000 + (id % 30) as u32 * 1_500);
    school.avg_sat = Some(1000 + (id % 50) as u16 * 10);
    school.admission_rate = Some(0.1 + (id % 9) as f64 * 0.1);
    school.undergrad_enrollment = Some(1_000 + (id % 40) as u32 * 1_000);
    school.overall_grade = Some(GRADES[id % GRADES.len()]);
    school.academics_grade = Some(GRADES[(id + 1) % GRADES.len()]);
    school.party_scene_grade = Some(GRADES[(id + 2) % GRADES.len()]);
    school
}

fn create_catalog(per_tier: usize) -> Vec<School> {
    Tier::ALL
        .iter()
        .enumerate()
        .flat_map(|(t, tier)| (0..per_tier).map(move |i| create_school(t * per_tier + i, *tier)))
        .collect()
}

fn create_preferences() -> PreferenceSet {
    PreferenceSet::builder("CA")
        .preferred_regions([Region::West])
        .max_budget(35_000)
        .min_academic_rating(Grade::B)
        .sat(1250)
        .preferred_school_size([SizeCategory::Medium, SizeCategory::Large])
        .must_haves([PreferenceName::MaxBudget, PreferenceName::MinAcademicRating])
        .build()
        .expect("valid preferences")
}

fn bench_hard_filters(c: &mut Criterion) {
    let preferences = create_preferences();
    let partition = classify(&preferences);
    let schools: Vec<School> = (0..500).map(|i| create_school(i, Tier::NonP4D1)).collect();

    c.bench_function("hard_filters_500_schools", |b| {
        b.iter(|| apply_hard_filters(black_box(&schools), &preferences, &partition, Tier::NonP4D1));
    });
}

fn bench_scoring(c: &mut Criterion) {
    let preferences = create_preferences();
    let partition = classify(&preferences);
    let scorer = MatchScorer::with_defaults();
    let school = create_school(7, Tier::NonP4D1);

    c.bench_function("score_single_school", |b| {
        b.iter(|| scorer.score(black_box(school.clone()), &preferences, &partition.optional));
    });
}

fn bench_pipeline(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let preferences = create_preferences();
    let classification = TierClassification::from_probabilities(0.75, Some(0.35)).expect("valid classification");

    let mut group = c.benchmark_group("pipeline");

    for per_tier in [20, 100, 500].iter() {
        let store = Arc::new(InMemoryStore::new(create_catalog(*per_tier)));
        let guard = ResourceGuard::new(GuardConfig {
            rate_limit: RateLimitConfig::default().with_requests_per_second(0.0),
            ..GuardConfig::default()
        });
        let repository = Arc::new(SchoolRepository::uncached(store, Arc::new(guard)));
        let pipeline = MatchPipeline::new(repository, PipelineConfig::default());

        group.bench_with_input(BenchmarkId::new("find_matches", per_tier), per_tier, |b, _| {
            b.iter(|| {
                runtime.block_on(pipeline.find_matches(black_box(&preferences), &classification, black_box(50)))
            });
        });

        group.bench_with_input(BenchmarkId::new("count", per_tier), per_tier, |b, _| {
            b.iter(|| runtime.block_on(pipeline.count(black_box(&preferences), &classification)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_hard_filters, bench_scoring, bench_pipeline);

criterion_main!(benches);
