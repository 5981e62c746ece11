use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use aws_config::SdkConfig;
use aws_sdk_costexplorer::types::Granularity;
use chrono::Utc;
use clap::Args;
use tracing::{info, warn};

use crate::aws::{cost_explorer, credentials};
use crate::constants::{DISCOVERY_WINDOW_DAYS, NEGLIGIBLE_COST};
use crate::core::aggregate::{self, DeltaRow, PctChange, Report};
use crate::core::sweep::OrgAccount;
use crate::dates::DateRange;
use crate::error::CostError;
use crate::report::{csv, table};

const SERVICE_WIDTH: usize = 40;
const AMOUNT_WIDTH: usize = 12;

#[derive(Debug, Clone, Args)]
pub struct CompareCommand {
    #[arg(value_name = "PERIOD1", help = "First date range (dd-mm-yy to dd-mm-yy)")]
    pub period1: String,

    #[arg(value_name = "PERIOD2", help = "Second date range (dd-mm-yy to dd-mm-yy)")]
    pub period2: String,

    #[arg(
        short = 'o',
        long,
        default_value = "cost_comparison.csv",
        help = "Output CSV file"
    )]
    pub output: PathBuf,
}

impl CompareCommand {
    pub async fn execute(self, profile: Option<&str>) -> Result<()> {
        // Date parsing happens before any network call.
        let range1 = DateRange::parse(&self.period1)?;
        let range2 = DateRange::parse(&self.period2)?;

        let config = credentials::resolve(profile).await;

        let label1 = range1.label();
        let label2 = range2.label();
        println!("Period 1: {}", range1.describe());
        println!("Period 2: {}", range2.describe());
        println!();

        println!("Discovering linked accounts...");
        let discovery =
            DateRange::last_days(DISCOVERY_WINDOW_DAYS, Utc::now().date_naive());
        let accounts = cost_explorer::linked_accounts(&config, &discovery)
            .await
            .context("Failed to discover linked accounts")?;
        println!("Found {} linked accounts\n", accounts.len());

        let mut csv_rows: Vec<Vec<String>> = Vec::new();
        let mut skipped: Vec<(OrgAccount, String)> = Vec::new();

        // Overall comparison across all accounts.
        println!("Fetching overall costs across all accounts...");
        let overall1 = service_report(&config, &range1, None).await?;
        let overall2 = service_report(&config, &range2, None).await?;
        let overall = aggregate::compare(&overall1, &overall2);

        print_comparison_table(&overall, "OVERALL - ALL ACCOUNTS", &label1, &label2);
        push_csv_rows(&mut csv_rows, "ALL", "ALL ACCOUNTS", &overall);

        // Per-account comparison; one inaccessible account never aborts
        // the run.
        for account in &accounts {
            let account_label = account.display_name();
            info!(
                "Fetching costs for account {} ({})",
                account_label, account.id
            );

            let per_account = async {
                let before = service_report(&config, &range1, Some(&account.id)).await?;
                let after = service_report(&config, &range2, Some(&account.id)).await?;
                Ok::<_, CostError>((before, after))
            }
            .await;

            let (before, after) = match per_account {
                Ok(reports) => reports,
                Err(err) if err.is_account_skippable() => {
                    warn!("Skipping account {}: {err}", account.id);
                    skipped.push((account.clone(), err.to_string()));
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            if before.is_empty() && after.is_empty() {
                info!("No costs found for {account_label}, skipping");
                continue;
            }

            let rows = aggregate::compare(&before, &after);
            let material = rows
                .iter()
                .any(|r| r.baseline >= NEGLIGIBLE_COST || r.comparison >= NEGLIGIBLE_COST);
            if !material {
                continue;
            }

            print_comparison_table(
                &rows,
                &format!("{account_label} ({})", account.id),
                &label1,
                &label2,
            );
            push_csv_rows(
                &mut csv_rows,
                &account.id,
                account.name.as_deref().unwrap_or(""),
                &rows,
            );
        }

        println!("\nWriting CSV to {}...", self.output.display());
        csv::write_rows(
            &self.output,
            &[
                "account_id",
                "account_name",
                "service",
                "currency",
                "period1_cost",
                "period2_cost",
                "difference",
                "pct_change",
            ],
            csv_rows,
        )?;
        println!("CSV saved to {}", self.output.display());

        if !skipped.is_empty() {
            println!("\nSkipped accounts ({}):", skipped.len());
            for (account, reason) in &skipped {
                println!("  {} ({}): {}", account.id, account.display_name(), reason);
            }
        }

        Ok(())
    }
}

async fn service_report(
    config: &SdkConfig,
    range: &DateRange,
    account_id: Option<&str>,
) -> Result<Report, CostError> {
    let records = cost_explorer::cost_and_usage(
        config,
        range,
        Granularity::Monthly,
        &["SERVICE"],
        account_id,
    )
    .await?;

    let mut report = Report::new();
    for record in records {
        report.fold(record);
    }
    Ok(report)
}

fn print_comparison_table(rows: &[DeltaRow], title: &str, label1: &str, label2: &str) {
    let width = SERVICE_WIDTH + 4 * (AMOUNT_WIDTH + 1) + 2;

    println!();
    println!("{}", "=".repeat(width));
    println!(" {title}");
    println!("{}", "=".repeat(width));
    println!(
        "{:<SERVICE_WIDTH$} {:>AMOUNT_WIDTH$} {:>AMOUNT_WIDTH$} {:>AMOUNT_WIDTH$} {:>AMOUNT_WIDTH$}",
        "SERVICE", label1, label2, "DIFF", "CHANGE"
    );
    println!("{}", "-".repeat(width));

    for row in rows {
        // Skip negligible costs.
        if row.baseline < NEGLIGIBLE_COST && row.comparison < NEGLIGIBLE_COST {
            continue;
        }
        println!(
            "{:<SERVICE_WIDTH$} {:>AMOUNT_WIDTH$} {:>AMOUNT_WIDTH$} {:>AMOUNT_WIDTH$} {:>AMOUNT_WIDTH$}",
            table::truncate(&service_label(row), SERVICE_WIDTH),
            table::money_in(row.baseline, &row.currency),
            table::money_in(row.comparison, &row.currency),
            table::signed_money(row.diff),
            row.pct.label()
        );
    }

    println!("{}", "-".repeat(width));
    // Totals are per currency; mixed-currency organizations get one total
    // row per currency rather than a silently blended sum.
    let mut totals: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
    for row in rows {
        let entry = totals.entry(row.currency.as_str()).or_insert((0.0, 0.0));
        entry.0 += row.baseline;
        entry.1 += row.comparison;
    }
    for (currency, (before, after)) in &totals {
        let label = if totals.len() > 1 {
            format!("TOTAL ({currency})")
        } else {
            "TOTAL".to_string()
        };
        println!(
            "{:<SERVICE_WIDTH$} {:>AMOUNT_WIDTH$} {:>AMOUNT_WIDTH$} {:>AMOUNT_WIDTH$} {:>AMOUNT_WIDTH$}",
            label,
            table::money_in(*before, currency),
            table::money_in(*after, currency),
            table::signed_money(after - before),
            PctChange::compute(*before, *after).label()
        );
    }
    println!("{}", "=".repeat(width));
}

fn service_label(row: &DeltaRow) -> String {
    row.group.first().cloned().unwrap_or_default()
}

fn push_csv_rows(
    csv_rows: &mut Vec<Vec<String>>,
    account_id: &str,
    account_name: &str,
    rows: &[DeltaRow],
) {
    let mut totals: BTreeMap<String, (f64, f64)> = BTreeMap::new();

    for row in rows {
        let entry = totals.entry(row.currency.clone()).or_insert((0.0, 0.0));
        entry.0 += row.baseline;
        entry.1 += row.comparison;

        if row.baseline < NEGLIGIBLE_COST && row.comparison < NEGLIGIBLE_COST {
            continue;
        }
        csv_rows.push(vec![
            account_id.to_string(),
            account_name.to_string(),
            service_label(row),
            row.currency.clone(),
            format!("{:.2}", row.baseline),
            format!("{:.2}", row.comparison),
            format!("{:.2}", row.diff),
            row.pct.label(),
        ]);
    }

    for (currency, (before, after)) in totals {
        csv_rows.push(vec![
            account_id.to_string(),
            account_name.to_string(),
            "TOTAL".to_string(),
            currency,
            format!("{before:.2}"),
            format!("{after:.2}"),
            format!("{:.2}", after - before),
            PctChange::compute(before, after).label(),
        ]);
    }
}
