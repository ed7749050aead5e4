use criterion::{Criterion, black_box, criterion_group, criterion_main};
use storyline_engine::{Codec, Format, ImportOptions, Template};
mod common;

fn bench_import(c: &mut Criterion) {
    let mut group = c.benchmark_group("import");
    group.sample_size(20);

    let options = ImportOptions::default();
    let fountain = common::generate_fountain(100);
    let codec = Codec::for_format(Format::Fountain);
    group.bench_function("fountain_100_scenes", |b| {
        b.iter(|| {
            let doc = codec.import(black_box(fountain.as_bytes()), &options).unwrap();
            black_box(doc);
        });
    });

    let doc = common::generate_screenplay(100);
    let template = Template::default();
    for format in [Format::PlainText, Format::Docx, Format::Rtf] {
        let codec = Codec::for_format(format);
        let bytes = codec.export(&doc, &template).unwrap();
        group.bench_function(format!("{format}_100_scenes"), |b| {
            b.iter(|| {
                let doc = codec.import(black_box(&bytes), &options).unwrap();
                black_box(doc);
            });
        });
    }

    group.finish();
}

fn bench_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("export");
    group.sample_size(20);

    let doc = common::generate_screenplay(100);
    let template = Template::default();
    for format in [Format::Fountain, Format::PlainText, Format::FinalDraft, Format::Odt] {
        let codec = Codec::for_format(format);
        group.bench_function(format!("{format}_100_scenes"), |b| {
            b.iter(|| {
                let bytes = codec.export(black_box(&doc), &template).unwrap();
                black_box(bytes);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_import, bench_export);
criterion_main!(benches);
