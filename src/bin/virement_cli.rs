use std::{env, path::PathBuf, process};

use colored::Colorize;
use dialoguer::Confirm;

use virement_core::{
    balances::{BalanceCache, InMemoryBalances},
    config::{Config, ConfigManager},
    currency::{format_amount, format_delta, format_progression, LocaleConfig},
    form::RequestForm,
    init,
    ledger::BudgetRequest,
    progressive::{ProgressionSide, SequenceReport},
    utils::{build_info, persistence},
    validation::collect_issues,
    workflow::{approval_notice, apply_transition, ApprovalGate, WorkflowState},
};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() {
    init();

    if let Err(err) = run() {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn run() -> CliResult<()> {
    let mut args = env::args().skip(1);
    let command = args.next().unwrap_or_else(|| usage_exit());

    match command.as_str() {
        "summary" => {
            let request = load_request(args.next())?;
            let config = ConfigManager::new()?.load()?;
            let balances_path = args.next().map(PathBuf::from).or(config.balances_file.clone());
            print_summary(&request, &config, balances_path)?;
        }
        "balances" => {
            let request = load_request(args.next())?;
            let row: usize = args
                .next()
                .unwrap_or_else(|| usage_exit())
                .parse()
                .map_err(|_| "row must be a positive number")?;
            if row == 0 {
                return Err("rows are numbered from 1".into());
            }
            let deltas = request.progressive_balances_for_row(row - 1, None);
            println!("{}", serde_json::to_string_pretty(&deltas)?);
        }
        "validate" => {
            let request = load_request(args.next())?;
            let issues = collect_issues(&request);
            if issues.is_empty() {
                println!("Request is valid.");
            } else {
                for issue in &issues {
                    println!("- {issue}");
                }
                process::exit(1);
            }
        }
        "transition" => {
            let path = args.next().map(PathBuf::from).unwrap_or_else(|| usage_exit());
            let target = parse_state(&args.next().unwrap_or_else(|| usage_exit()))?;
            let assume_yes = args.any(|arg| arg == "--yes");
            let config = ConfigManager::new()?.load()?;
            let gate = ApprovalGate::new(config.approval_policy(), config.locale.clone());

            let mut request = persistence::load_request_from_file(&path)?;
            let before = request.workflow_state;
            let state = apply_transition(&gate, &mut request, target, |pending| {
                assume_yes
                    || Confirm::new()
                        .with_prompt(pending.prompt())
                        .default(false)
                        .interact()
                        .unwrap_or(false)
            })?;
            if state == before {
                println!("Transition cancelled; request remains {state}.");
            } else {
                persistence::save_request_to_file(&request, &path)?;
                println!("Request is now {state}.");
            }
        }
        "version" => {
            println!("{}", build_info::current().describe());
        }
        _ => usage_exit(),
    }

    Ok(())
}

fn load_request(path: Option<String>) -> CliResult<BudgetRequest> {
    let path = path.map(PathBuf::from).unwrap_or_else(|| usage_exit());
    Ok(persistence::load_request_from_file(&path)?)
}

fn parse_state(raw: &str) -> CliResult<WorkflowState> {
    let state = match raw.to_ascii_lowercase().as_str() {
        "draft" => WorkflowState::Draft,
        "pending" => WorkflowState::PendingApproval,
        "external" => WorkflowState::ExternalApproval,
        "approved" | "approve" => WorkflowState::Approved,
        "rejected" | "reject" => WorkflowState::Rejected,
        "cancelled" | "cancel" => WorkflowState::Cancelled,
        other => return Err(format!("unknown workflow state `{other}`").into()),
    };
    Ok(state)
}

fn print_summary(
    request: &BudgetRequest,
    config: &Config,
    balances_path: Option<PathBuf>,
) -> CliResult<()> {
    let locale = &config.locale;
    let report = request.sequence_report();

    println!(
        "{} request on {}{}",
        request.virement_type,
        request.budget,
        request
            .target_budget
            .as_deref()
            .map(|target| format!(" → {target}"))
            .unwrap_or_default()
    );
    if report.steps.is_empty() {
        println!("No complete transfers yet.");
    }

    print_sequence(&report, locale);
    print_impact(&report, locale);

    println!();
    println!("Total amount:       {}", format_amount(report.summary.total_amount, locale));
    println!(
        "Complete transfers: {}/{}",
        report.summary.complete_transfers, report.summary.total_transfers
    );
    println!("Affected accounts:  {}", report.summary.affected_accounts);

    if let Some(path) = balances_path {
        let balances = InMemoryBalances::load_from_file(&path)?;
        let mut cache = BalanceCache::new(&balances);
        println!();
        println!("{}", "Projected balances".bold());
        for (key, delta) in report.balances.iter() {
            let original = cache.original(key);
            println!(
                "  {key}: {} → {}",
                format_amount(original, locale),
                format_amount(cache.projected(key, &report.balances), locale)
            );
            tracing::debug!(%key, %delta, "projected balance");
        }
        print_shortfalls(request, &balances, config);
    }

    if let Some(notice) = approval_notice(&config.approval_policy(), request, locale) {
        println!();
        println!("{}", notice.message.yellow());
    }
    Ok(())
}

fn print_shortfalls(request: &BudgetRequest, balances: &InMemoryBalances, config: &Config) {
    let locale = &config.locale;
    let mut form = RequestForm::new(request.clone(), balances, config.approval_policy());
    let view = form.view();
    for index in &view.insufficient_rows {
        let row = &view.rows[*index];
        let (Some(account), Some(available), Some(amount), Some(shortfall)) = (
            row.from_account.as_deref(),
            row.from_available,
            row.amount,
            row.shortfall,
        ) else {
            continue;
        };
        let message = format!(
            "Transfer {}: {}|{} has {} for {}, budget increase of {} required",
            row.position,
            account.trim(),
            request.source_ledger(),
            format_amount(available, locale),
            format_amount(amount, locale),
            format_amount(shortfall, locale)
        );
        println!("{}", message.yellow());
    }
}

fn print_sequence(report: &SequenceReport, locale: &LocaleConfig) {
    if report.steps.is_empty() {
        return;
    }
    println!();
    println!("{}", "Transfer Sequence".bold());
    for step in &report.steps {
        println!("Transfer {}: {}", step.position, format_amount(step.amount, locale));
        println!(
            "  {} {}  {}",
            "FROM:".red(),
            step.source,
            format_progression(
                step.source_before,
                step.source_after,
                step.amount,
                ProgressionSide::From,
                locale
            )
        );
        println!(
            "  {} {}  {}",
            "TO:".green(),
            step.destination,
            format_progression(
                step.destination_before,
                step.destination_after,
                step.amount,
                ProgressionSide::To,
                locale
            )
        );
    }
}

fn print_impact(report: &SequenceReport, locale: &LocaleConfig) {
    if report.progressions.is_empty() {
        return;
    }
    println!();
    println!("{}", "Account Impact Summary".bold());
    for progression in &report.progressions {
        println!("{}  {}", progression.key, format_delta(progression.final_delta, locale));
        for entry in &progression.entries {
            println!(
                "    Transfer {}: {}",
                entry.position,
                format_delta(entry.change, locale)
            );
        }
    }
}

fn usage_exit() -> ! {
    eprintln!(
        "Usage: virement_cli <command>\n\
         Commands:\n  \
         summary <request.json> [balances.json]\n  \
         balances <request.json> <row>\n  \
         validate <request.json>\n  \
         transition <request.json> <draft|pending|external|approved|rejected|cancelled> [--yes]\n  \
         version"
    );
    process::exit(1);
}
