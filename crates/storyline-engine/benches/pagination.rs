use criterion::{Criterion, black_box, criterion_group, criterion_main};
use storyline_engine::{Template, paginate, summarize};
mod common;

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    group.sample_size(20);

    let template = Template::default();
    for scenes in [10, 100] {
        let doc = common::generate_screenplay(scenes);
        group.bench_function(format!("apply_{scenes}_scenes"), |b| {
            b.iter(|| {
                let plan = template.apply(black_box(&doc));
                black_box(plan);
            });
        });
    }

    group.finish();
}

fn bench_pagination(c: &mut Criterion) {
    let mut group = c.benchmark_group("pagination");
    group.sample_size(20);

    let template = Template::default();
    for scenes in [10, 100] {
        let doc = common::generate_screenplay(scenes);
        group.bench_function(format!("paginate_{scenes}_scenes"), |b| {
            b.iter(|| {
                let table = paginate(black_box(&doc), &template);
                black_box(table);
            });
        });
    }

    let doc = common::generate_screenplay(100);
    group.bench_function("summarize_100_scenes", |b| {
        b.iter(|| {
            let counts = summarize(black_box(&doc));
            black_box(counts);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_layout, bench_pagination);
criterion_main!(benches);
