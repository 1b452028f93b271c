use rust_decimal_macros::dec;
use virement_core::{
    balances::InMemoryBalances,
    errors::VirementError,
    form::{OperationField, RequestForm},
    ledger::{BudgetRequest, VirementType},
    progressive::ProgressionSide,
    workflow::ApprovalPolicy,
};

fn balances() -> InMemoryBalances {
    InMemoryBalances::new()
        .with("OPS", "Travel", dec!(1000))
        .with("OPS", "Fuel", dec!(400))
        .with("OPS", "Stationery", dec!(50))
        .with("CAPEX", "Vehicles", dec!(9000))
}

fn fill_row(
    form: &mut RequestForm<InMemoryBalances>,
    row: usize,
    from: &str,
    to: &str,
    amount: rust_decimal::Decimal,
) {
    form.set_operation_field(row, OperationField::FromAccount(Some(from.into())))
        .unwrap();
    form.set_operation_field(row, OperationField::ToAccount(Some(to.into())))
        .unwrap();
    form.set_operation_field(row, OperationField::Amount(Some(amount)))
        .unwrap();
}

fn two_row_form() -> RequestForm<InMemoryBalances> {
    let mut form = RequestForm::new(
        BudgetRequest::intra("OPS"),
        balances(),
        ApprovalPolicy::default(),
    );
    form.add_operation();
    fill_row(&mut form, 0, "Travel", "Fuel", dec!(100));
    form.add_operation();
    fill_row(&mut form, 1, "Fuel", "Stationery", dec!(450));
    form
}

#[test]
fn rows_project_balances_through_earlier_rows() {
    let mut form = two_row_form();
    let view = form.view();

    let first = &view.rows[0];
    assert_eq!(first.position, 1);
    assert_eq!(first.from_available, Some(dec!(1000)));
    assert_eq!(first.from_remaining, Some(dec!(900)));
    assert_eq!(first.to_available, Some(dec!(400)));
    assert_eq!(first.to_new_amount, Some(dec!(500)));

    let second = &view.rows[1];
    assert_eq!(second.from_available, Some(dec!(500)));
    assert_eq!(second.from_remaining, Some(dec!(50)));
    assert_eq!(second.to_available, Some(dec!(50)));
    assert_eq!(second.to_new_amount, Some(dec!(500)));

    assert_eq!(view.total_amount, dec!(550));
    assert!(view.summary.all_complete());
    assert!(view.changed_rows.is_empty());
}

#[test]
fn editing_an_early_row_republishes_later_rows() {
    let mut form = two_row_form();
    let view = form
        .set_operation_field(0, OperationField::Amount(Some(dec!(200))))
        .unwrap();
    assert_eq!(view.changed_rows, vec![0, 1]);
    assert_eq!(view.rows[1].from_available, Some(dec!(600)));
}

#[test]
fn editing_the_last_row_leaves_earlier_rows_alone() {
    let mut form = two_row_form();
    let view = form
        .set_operation_field(1, OperationField::Amount(Some(dec!(10))))
        .unwrap();
    assert_eq!(view.changed_rows, vec![1]);
}

#[test]
fn pickers_show_projected_balances() {
    let mut form = two_row_form();

    let from_options = form.account_options(1, ProgressionSide::From, None);
    let listed: Vec<(&str, rust_decimal::Decimal)> = from_options
        .iter()
        .map(|option| (option.account.as_str(), option.projected_balance))
        .collect();
    assert_eq!(
        listed,
        vec![
            ("Fuel", dec!(500)),
            ("Stationery", dec!(50)),
            ("Travel", dec!(900)),
        ]
    );

    let to_options = form.account_options(1, ProgressionSide::To, None);
    assert!(to_options.iter().all(|option| option.account != "Fuel"));
    assert_eq!(to_options.len(), 2);
}

#[test]
fn intra_budget_rows_refuse_the_same_account_twice() {
    let mut form = two_row_form();
    let err = form
        .set_operation_field(1, OperationField::ToAccount(Some("Fuel".into())))
        .unwrap_err();
    assert!(matches!(err, VirementError::InvalidInput(_)));
    assert_eq!(form.request().items[1].to_account.as_deref(), Some("Stationery"));
}

#[test]
fn removing_a_row_shifts_the_remaining_rows() {
    let mut form = two_row_form();
    let view = form.remove_operation(0).unwrap();
    assert_eq!(view.rows.len(), 1);
    assert_eq!(view.rows[0].position, 1);
    assert_eq!(view.rows[0].from_available, Some(dec!(400)));
    assert!(matches!(
        form.remove_operation(5),
        Err(VirementError::RowOutOfRange { row: 5, len: 1 })
    ));
}

#[test]
fn inter_budget_rows_wait_for_a_target_budget() {
    let mut form = RequestForm::new(
        BudgetRequest::intra("OPS"),
        balances(),
        ApprovalPolicy::default(),
    );
    form.set_virement_type(VirementType::InterBudget);
    form.add_operation();
    fill_row(&mut form, 0, "Travel", "Vehicles", dec!(300));

    let view = form.view();
    assert!(!view.rows[0].complete);
    assert_eq!(view.rows[0].to_available, None);

    let view = form.set_target_budget(Some("CAPEX".into()));
    assert!(view.rows[0].complete);
    assert_eq!(view.rows[0].to_available, Some(dec!(9000)));
    assert_eq!(view.rows[0].to_new_amount, Some(dec!(9300)));
    assert_eq!(view.changed_rows, vec![0]);
}

#[test]
fn large_totals_flag_external_approval() {
    let mut form = RequestForm::new(
        BudgetRequest::intra("OPS"),
        balances(),
        ApprovalPolicy::new(dec!(500)),
    );
    form.add_operation();
    fill_row(&mut form, 0, "Travel", "Fuel", dec!(500));
    assert!(!form.view().requires_external_approval);

    let view = form
        .set_operation_field(0, OperationField::Amount(Some(dec!(500.01))))
        .unwrap();
    assert!(view.requires_external_approval);
}

#[test]
fn an_earlier_row_can_drain_a_later_rows_budget() {
    let mut form = two_row_form();
    let view = form.view();
    assert_eq!(view.rows[1].shortfall, Some(dec!(0)));
    assert!(view.insufficient_rows.is_empty());

    // Row 3 draws on the 450 row 2 pays into Stationery.
    form.add_operation();
    fill_row(&mut form, 2, "Stationery", "Travel", dec!(520));
    let view = form.view();
    assert_eq!(view.rows[2].from_available, Some(dec!(500)));
    assert_eq!(view.rows[2].shortfall, Some(dec!(20)));
    assert_eq!(view.insufficient_rows, vec![2]);

    let view = form
        .set_operation_field(1, OperationField::Amount(Some(dec!(10))))
        .unwrap();
    assert_eq!(view.changed_rows, vec![1, 2]);
    assert_eq!(view.rows[2].from_available, Some(dec!(60)));
    assert_eq!(view.rows[2].shortfall, Some(dec!(460)));
    assert_eq!(view.insufficient_rows, vec![2]);

    let view = form
        .set_operation_field(2, OperationField::Amount(Some(dec!(60))))
        .unwrap();
    assert!(view.insufficient_rows.is_empty());
}

#[test]
fn picker_search_narrows_projected_options() {
    let mut form = two_row_form();
    let options = form.account_options(1, ProgressionSide::From, Some("tra"));
    let listed: Vec<(&str, rust_decimal::Decimal)> = options
        .iter()
        .map(|option| (option.account.as_str(), option.projected_balance))
        .collect();
    assert_eq!(listed, vec![("Travel", dec!(900))]);
    assert!(form
        .account_options(1, ProgressionSide::To, Some("fuel"))
        .is_empty());
}
