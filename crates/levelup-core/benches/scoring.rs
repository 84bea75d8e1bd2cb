use criterion::{black_box, criterion_group, criterion_main, Criterion};

use levelup_core::model::{PlayerState, Question, QuizOption, Tier};
use levelup_core::scoring::{score_percentage, AnswerTiming, ScoreAccumulator};

fn make_question(explicit_flags: bool, option_count: usize) -> Question {
    Question {
        id: 1,
        level: Tier::Basic,
        title: "Bench".into(),
        description: String::new(),
        options: (0..option_count)
            .map(|i| QuizOption {
                text: format!("Option {i}"),
                outcome: String::new(),
                experience: (i as i32 * 7) % 25 - 5,
                is_correct: explicit_flags.then_some(i % 3 == 0),
                tool: (i == 0).then(|| "Bench Tool".to_string()),
            })
            .collect(),
    }
}

fn bench_correctness(c: &mut Criterion) {
    let mut group = c.benchmark_group("correct_options");

    group.bench_function("max_experience,4_options", |b| {
        let q = make_question(false, 4);
        b.iter(|| black_box(&q).correct_option_indices())
    });

    group.bench_function("explicit_flags,4_options", |b| {
        let q = make_question(true, 4);
        b.iter(|| black_box(&q).correct_option_indices())
    });

    group.bench_function("max_experience,32_options", |b| {
        let q = make_question(false, 32);
        b.iter(|| black_box(&q).correct_option_indices())
    });

    group.finish();
}

fn bench_accumulate(c: &mut Criterion) {
    let mut group = c.benchmark_group("accumulate");
    let question = make_question(false, 4);

    group.bench_function("full_quiz", |b| {
        b.iter(|| {
            let mut acc = ScoreAccumulator::new(PlayerState::new("bench"), 15, 300);
            for n in 0..15 {
                let _ = acc.record_answer(
                    black_box(&question),
                    n % 4,
                    AnswerTiming {
                        time_spent: Some(3),
                        timed_out: n % 5 == 4,
                    },
                );
            }
            acc.score_percentage()
        })
    });

    group.bench_function("score_percentage", |b| {
        b.iter(|| score_percentage(black_box(11), black_box(15)))
    });

    group.finish();
}

criterion_group!(benches, bench_correctness, bench_accumulate);
criterion_main!(benches);
