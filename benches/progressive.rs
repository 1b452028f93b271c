use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rust_decimal::Decimal;
use tempfile::tempdir;
use virement_core::balances::InMemoryBalances;
use virement_core::form::{OperationField, RequestForm};
use virement_core::ledger::{BudgetRequest, TransferItem};
use virement_core::progressive::{compute_progressive_balances, compute_sequence_steps};
use virement_core::utils::persistence::{load_request_from_file, save_request_to_file};
use virement_core::workflow::ApprovalPolicy;

const ACCOUNTS: usize = 40;

fn account(idx: usize) -> String {
    format!("Account {:02}", idx % ACCOUNTS)
}

fn build_sample_request(rows: usize) -> BudgetRequest {
    let mut request = BudgetRequest::intra("Benchmark");
    for idx in 0..rows {
        let amount = Decimal::from(50 + (idx % 100) as i64);
        request.add_item(TransferItem::new(account(idx), account(idx + 7), amount));
    }
    request
}

fn build_balances() -> InMemoryBalances {
    let mut balances = InMemoryBalances::new();
    for idx in 0..ACCOUNTS {
        balances.insert("Benchmark", account(idx), Decimal::from(10_000));
    }
    balances
}

fn bench_calculator(c: &mut Criterion) {
    let request = build_sample_request(black_box(1_000));
    let operations = request.operations();

    c.bench_function("progressive_balances_last_row_1k", |b| {
        b.iter(|| {
            let balances = compute_progressive_balances(&operations, operations.len() - 1, None);
            black_box(balances);
        })
    });

    c.bench_function("sequence_steps_1k", |b| {
        b.iter(|| {
            let report = compute_sequence_steps(&operations);
            black_box(report);
        })
    });
}

fn bench_form_edit(c: &mut Criterion) {
    let request = build_sample_request(black_box(200));

    c.bench_function("form_edit_first_row_200", |b| {
        b.iter_batched(
            || RequestForm::new(request.clone(), build_balances(), ApprovalPolicy::default()),
            |mut form| {
                let view = form
                    .set_operation_field(0, OperationField::Amount(Some(Decimal::from(75))))
                    .expect("edit row");
                black_box(view);
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_request_io(c: &mut Criterion) {
    let request = build_sample_request(black_box(1_000));
    let dir = tempdir().expect("tempdir");
    let file_path = dir.path().join("request.json");

    c.bench_function("request_save_1k", |b| {
        b.iter(|| {
            save_request_to_file(&request, &file_path).expect("save request");
        })
    });

    save_request_to_file(&request, &file_path).expect("seed");

    c.bench_function("request_load_1k", |b| {
        b.iter(|| {
            let loaded = load_request_from_file(&file_path).expect("load request");
            black_box(loaded);
        })
    });
}

criterion_group!(benches, bench_calculator, bench_form_edit, bench_request_io);
criterion_main!(benches);
