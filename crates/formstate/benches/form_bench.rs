//! Benchmarks for control updates and form-wide operations.
//!
//! Run with: cargo bench -p formstate --bench form_bench
//!
//! Performance budgets:
//! - Single `set_value` with three validators: < 2µs
//! - `commit_all` on a 256-field form: < 200µs
//! - `recompute_all` on a 256-field form: < 200µs

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use formstate::validation::Validator;
use formstate::{FieldControl, Form, FormField, UpdatePolicy};
use std::hint::black_box;

// =============================================================================
// Helper Functions
// =============================================================================

fn validators() -> Vec<Validator<String>> {
    vec![
        Validator::required(),
        Validator::email(),
        Validator::max_length(64),
    ]
}

fn wide_form(fields: usize) -> Form<Vec<FormField<String>>> {
    Form::new(
        (0..fields)
            .map(|i| {
                FormField::with_policy(format!("user{i}@example.com"), validators(), UpdatePolicy::ALWAYS)
            })
            .collect(),
    )
}

// =============================================================================
// Control Benchmarks
// =============================================================================

fn bench_control(c: &mut Criterion) {
    let mut group = c.benchmark_group("control");

    group.bench_function("set_value_validated", |b| {
        let mut control =
            FieldControl::with_policy(String::new(), validators(), UpdatePolicy::ON_CHANGE);
        let mut flip = false;
        b.iter(|| {
            flip = !flip;
            let value = if flip { "mario@example.com" } else { "not an email" };
            control.set_value(black_box(value.to_string()));
            black_box(control.is_valid())
        });
    });

    group.bench_function("stage_and_commit", |b| {
        let mut control =
            FieldControl::with_policy(String::new(), validators(), UpdatePolicy::ON_CHANGE);
        let mut n = 0_u64;
        b.iter(|| {
            n += 1;
            control.set_pending_value(format!("user{n}@example.com"));
            black_box(control.commit())
        });
    });

    group.finish();
}

// =============================================================================
// Form Benchmarks
// =============================================================================

fn bench_form(c: &mut Criterion) {
    let mut group = c.benchmark_group("form");

    for fields in [16_usize, 64, 256] {
        group.throughput(Throughput::Elements(fields as u64));

        group.bench_with_input(BenchmarkId::new("commit_all", fields), &fields, |b, &n| {
            let mut form = wide_form(n);
            let mut round = 0_u64;
            b.iter(|| {
                round += 1;
                form.edit(|fields| {
                    for (i, field) in fields.iter_mut().enumerate() {
                        field
                            .control_mut()
                            .set_pending_value(format!("user{i}.{round}@example.com"));
                    }
                });
                black_box(form.commit_all())
            });
        });

        group.bench_with_input(BenchmarkId::new("recompute_all", fields), &fields, |b, &n| {
            let mut form = wide_form(n);
            b.iter(|| {
                form.recompute_all();
                black_box(form.is_valid())
            });
        });

        group.bench_with_input(BenchmarkId::new("single_edit", fields), &fields, |b, &n| {
            let mut form = wide_form(n);
            let mut flip = false;
            b.iter(|| {
                flip = !flip;
                let value = if flip { String::new() } else { "mario@example.com".to_string() };
                form.fields_mut()[n / 2].set(value);
                black_box(form.is_valid())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_control, bench_form);
criterion_main!(benches);
