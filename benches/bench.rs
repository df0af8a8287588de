// Criterion benchmarks for StudyBuddy matching

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use studybuddy_match::core::{calculate_match_score, haversine_distance, Matcher};
use studybuddy_match::models::{GeoPoint, InteractionHistory, ScoringWeights, UserProfile};

const SCHOOLS: [&str; 4] = ["HUST", "NEU", "VNU", "FTU"];
const AREAS: [&str; 3] = ["Hanoi", "Danang", "Saigon"];
const TAGS: [&str; 6] = ["math", "physics", "chess", "music", "coding", "history"];

fn create_candidate(id: usize) -> UserProfile {
    let mut profile = UserProfile::new(
        format!("user_{}", id),
        SCHOOLS[id % SCHOOLS.len()],
        AREAS[id % AREAS.len()],
        18 + (id % 8) as u8,
    );
    profile.is_premium = id % 7 == 0;
    profile.interests = (0..(id % 4)).map(|i| TAGS[(id + i) % TAGS.len()].to_string()).collect();
    let offset = (id as f64 * 0.001) % 0.5;
    profile.last_location = Some(GeoPoint::new(21.0285 + offset, 105.8542 + offset));
    profile
}

fn create_requester() -> UserProfile {
    let mut profile = UserProfile::new("requester", "HUST", "Hanoi", 20);
    profile.interests = vec!["math".to_string(), "chess".to_string()];
    profile.last_location = Some(GeoPoint::new(21.0285, 105.8542));
    profile
}

fn bench_haversine_distance(c: &mut Criterion) {
    c.bench_function("haversine_distance", |b| {
        b.iter(|| {
            haversine_distance(
                black_box(21.0285),
                black_box(105.8542),
                black_box(21.0500),
                black_box(105.8000),
            )
        });
    });
}

fn bench_scoring(c: &mut Criterion) {
    let weights = ScoringWeights::default();
    let requester = create_requester();
    let candidate = create_candidate(3);

    c.bench_function("calculate_match_score", |b| {
        b.iter(|| calculate_match_score(black_box(&requester), black_box(&candidate), &weights));
    });
}

fn bench_ranking(c: &mut Criterion) {
    let matcher = Matcher::with_default_weights();
    let requester = create_requester();

    let mut history = InteractionHistory::default();
    for i in (0..1000).step_by(13) {
        history.liked.insert(format!("user_{}", i));
    }
    for i in (5..1000).step_by(17) {
        history.liked_by_pending.insert(format!("user_{}", i));
    }

    let mut group = c.benchmark_group("ranking");

    for candidate_count in [10, 100, 500, 1000].iter() {
        let pool: Vec<UserProfile> = (0..*candidate_count).map(create_candidate).collect();

        group.bench_with_input(
            BenchmarkId::new("rank", candidate_count),
            candidate_count,
            |b, _| {
                b.iter(|| {
                    matcher.rank(
                        black_box(&requester),
                        black_box(&history),
                        black_box(pool.clone()),
                        black_box(20),
                    )
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_haversine_distance, bench_scoring, bench_ranking);

criterion_main!(benches);
