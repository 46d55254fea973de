use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndbson::{
    from_slice, to_vec, CodecOptions, NativeValue, NdArray, Record, RecordArray,
};

fn sample_record() -> NativeValue {
    let mut rec = Record::new();
    rec.insert("name", NativeValue::from("sensor"));
    rec.insert("gain", NativeValue::from(0.75));
    rec.insert("active", NativeValue::from(true));
    rec.insert("channels", NativeValue::from(vec![1i32, 2, 3, 4]));
    NativeValue::Record(rec)
}

fn matrix_value(rows: usize, cols: usize) -> NativeValue {
    let data: Vec<f64> = (0..rows * cols).map(|i| i as f64 * 0.5).collect();
    let mut rec = Record::new();
    if let Ok(m) = NdArray::matrix(rows, cols, data) {
        rec.insert("m", NativeValue::Array(m));
    }
    NativeValue::Record(rec)
}

fn record_array_value(n: usize) -> NativeValue {
    let records: Vec<Record> = (0..n)
        .map(|i| {
            let mut r = Record::new();
            r.insert("id", NativeValue::from(i as i32));
            r.insert("score", NativeValue::from(i as f64 / 3.0));
            r.insert("label", NativeValue::from(format!("item{}", i)));
            r
        })
        .collect();
    let mut rec = Record::new();
    if let Ok(arr) = RecordArray::from_records(records) {
        rec.insert("items", NativeValue::RecordArray(arr));
    }
    NativeValue::Record(rec)
}

fn benchmark_encode_simple(c: &mut Criterion) {
    let value = sample_record();
    c.bench_function("encode_simple_record", |b| {
        b.iter(|| to_vec(black_box(&value)))
    });
}

fn benchmark_decode_simple(c: &mut Criterion) {
    let bytes = to_vec(&sample_record()).unwrap();
    c.bench_function("decode_simple_record", |b| {
        b.iter(|| from_slice(black_box(&bytes)))
    });
}

fn benchmark_matrices(c: &mut Criterion) {
    let mut group = c.benchmark_group("matrix");

    for size in [4, 16, 64].iter() {
        let value = matrix_value(*size, *size);
        let bytes = to_vec(&value).unwrap();

        group.bench_with_input(BenchmarkId::new("encode", size), &value, |b, value| {
            b.iter(|| to_vec(black_box(value)))
        });
        group.bench_with_input(BenchmarkId::new("decode", size), &bytes, |b, bytes| {
            b.iter(|| from_slice(black_box(bytes)))
        });
    }

    group.finish();
}

fn benchmark_record_arrays(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_array");

    for size in [10, 100, 1000].iter() {
        let value = record_array_value(*size);
        let bytes = to_vec(&value).unwrap();

        group.bench_with_input(BenchmarkId::new("encode", size), &value, |b, value| {
            b.iter(|| to_vec(black_box(value)))
        });
        group.bench_with_input(BenchmarkId::new("decode", size), &bytes, |b, bytes| {
            b.iter(|| from_slice(black_box(bytes)))
        });
    }

    group.finish();
}

fn benchmark_three_dimensional(c: &mut Criterion) {
    let data: Vec<f64> = (0..8 * 8 * 8).map(f64::from).collect();
    let mut rec = Record::new();
    rec.insert("cube", NativeValue::Array(NdArray::new(vec![8, 8, 8], data).unwrap()));
    let value = NativeValue::Record(rec);
    let bytes = to_vec(&value).unwrap();

    c.bench_function("roundtrip_cube", |b| {
        b.iter(|| {
            let encoded = to_vec(black_box(&value)).unwrap();
            let _decoded = from_slice(black_box(&encoded)).unwrap();
        })
    });
    c.bench_function("decode_cube", |b| b.iter(|| from_slice(black_box(&bytes))));
}

fn benchmark_query_mode(c: &mut Criterion) {
    let mut query = Record::new();
    query.insert(
        "age",
        NativeValue::from(vec![
            NativeValue::from("$gt"),
            NativeValue::from(5.0),
            NativeValue::from("$lt"),
            NativeValue::from(10.0),
        ]),
    );
    let value = NativeValue::Record(query);
    let options = CodecOptions::query();

    c.bench_function("encode_query", |b| {
        b.iter(|| ndbson::to_vec_with_options(black_box(&value), &options))
    });
}

criterion_group!(
    benches,
    benchmark_encode_simple,
    benchmark_decode_simple,
    benchmark_matrices,
    benchmark_record_arrays,
    benchmark_three_dimensional,
    benchmark_query_mode
);
criterion_main!(benches);
