//! Criterion benchmarks for boot-protocol report construction.
//!
//! Building a report is two byte stores into a stack array; this bench exists
//! to catch accidental regressions (heap allocation, serde detours) on the
//! per-keystroke path.
//!
//! Run with:
//! ```bash
//! cargo bench --package hidkb-core --bench report_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hidkb_core::keymap::hid::{MOD_LEFT_SHIFT, MOD_NONE};
use hidkb_core::report::InputReport;

fn bench_report_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("report");

    group.bench_function("key_down", |b| {
        b.iter(|| InputReport::key_down(black_box(0x0B), black_box(MOD_LEFT_SHIFT)))
    });

    group.bench_function("key_up", |b| b.iter(InputReport::key_up));

    // A full down/up pair per character, as the typing loop emits it.
    group.bench_function("down_up_pair", |b| {
        b.iter(|| {
            let down = InputReport::key_down(black_box(0x04), black_box(MOD_NONE));
            let up = InputReport::key_up();
            (down, up)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_report_build);
criterion_main!(benches);
