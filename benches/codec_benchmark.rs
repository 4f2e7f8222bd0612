use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sheetcodec::{
    read_delimited_bytes, read_spreadsheet_bytes, write_delimited, write_spreadsheet, Delimiter,
    Record, RecordSet, SheetReadOptions, WriteOptions,
};

fn sample(size: usize) -> RecordSet {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    (0..size)
        .map(|i| {
            Record::new()
                .with("id", format!("ORD-{:06}", i))
                .with("name", format!("Name_{}", i))
                .with("amount", i as f64 * 1.5)
                .with("paid", i % 2 == 0)
                .with("placed", start + chrono::Duration::days((i % 365) as i64))
        })
        .collect()
}

fn benchmark_write_spreadsheet(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_spreadsheet");
    let options = WriteOptions::default();

    for size in [100, 1000, 10000].iter() {
        let records = sample(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &records, |b, records| {
            b.iter(|| black_box(write_spreadsheet(records, &options).unwrap()));
        });
    }

    group.finish();
}

fn benchmark_write_delimited(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_delimited");
    let options = WriteOptions::default();

    for size in [100, 1000, 10000].iter() {
        let records = sample(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &records, |b, records| {
            b.iter(|| black_box(write_delimited(records, Delimiter::Comma, &options).unwrap()));
        });
    }

    group.finish();
}

fn benchmark_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("read");
    let options = WriteOptions::default();
    let records = sample(10000);

    let xlsx = write_spreadsheet(&records, &options)
        .unwrap()
        .into_bytes()
        .unwrap();
    let csv = write_delimited(&records, Delimiter::Comma, &options)
        .unwrap()
        .into_bytes()
        .unwrap();

    group.bench_function("spreadsheet_10000_rows", |b| {
        b.iter(|| black_box(read_spreadsheet_bytes(&xlsx, &SheetReadOptions::default()).unwrap()));
    });
    group.bench_function("delimited_10000_rows", |b| {
        b.iter(|| black_box(read_delimited_bytes(&csv, ",").unwrap()));
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_write_spreadsheet,
    benchmark_write_delimited,
    benchmark_read
);
criterion_main!(benches);
