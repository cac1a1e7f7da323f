use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use movilo_mocap_core::parse_marker_file;

fn marker_table(markers: usize, frames: usize) -> String {
    let mut out = String::from("Time");
    for m in 0..markers {
        out.push_str(&format!("\tM{m}\t\t"));
    }
    out.push('\n');
    for f in 0..frames {
        let t = f as f64 / 100.0;
        out.push_str(&format!("{t:.6}"));
        for m in 0..markers {
            let b = m as f64;
            out.push_str(&format!("\t{:.5}\t{:.5}\t{:.5}", b + t, b - t, 1.0 + t));
        }
        out.push('\n');
    }
    out
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_marker_file");
    for &(markers, frames) in &[(10usize, 500usize), (40, 2_000)] {
        let text = marker_table(markers, frames);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{markers}x{frames}")),
            &text,
            |b, text| {
                b.iter(|| parse_marker_file(black_box(text.as_bytes()), "bench.tsv"));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_parse);
criterion_main!(benches);
