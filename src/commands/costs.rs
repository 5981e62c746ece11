use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use anyhow::{Context, Result};
use aws_sdk_costexplorer::types::Granularity;
use chrono::Utc;
use clap::Args;
use tracing::info;

use crate::aws::{cost_explorer, credentials};
use crate::constants::COST_WINDOW_DAYS;
use crate::core::aggregate::{CostRecord, FinalizeOptions, Report, ReportRow};
use crate::dates::DateRange;
use crate::report::{csv, table};

const NAME_WIDTH: usize = 20;
const ID_WIDTH: usize = 14;
const TOTAL_WIDTH: usize = 10;
const SVC_WIDTH: usize = 12;

#[derive(Debug, Clone, Args)]
pub struct CostsCommand {
    #[arg(
        long,
        default_value_t = 1.0,
        help = "Minimum account cost to include"
    )]
    pub min_cost: f64,

    #[arg(
        long,
        default_value_t = 0,
        help = "Limit to top N services (0 = show all)"
    )]
    pub top_services: usize,

    #[arg(
        short = 'o',
        long,
        default_value = "account_service_costs.csv",
        help = "CSV output file"
    )]
    pub output: PathBuf,
}

impl CostsCommand {
    pub async fn execute(self, profile: Option<&str>) -> Result<()> {
        let config = credentials::resolve(profile).await;
        let range = DateRange::last_days(COST_WINDOW_DAYS, Utc::now().date_naive());

        println!("Fetching cost data...");
        let names: HashMap<String, Option<String>> =
            cost_explorer::linked_accounts(&config, &range)
                .await
                .context("Failed to discover linked accounts")?
                .into_iter()
                .map(|a| (a.id, a.name))
                .collect();

        let records = cost_explorer::cost_and_usage(
            &config,
            &range,
            Granularity::Monthly,
            &["LINKED_ACCOUNT", "SERVICE"],
            None,
        )
        .await
        .context("Failed to fetch cost matrix")?;

        // Fold the same record stream three ways: the account x service
        // matrix and the two marginal totals.
        let mut matrix = Report::new();
        let mut account_totals = Report::new();
        let mut service_totals = Report::new();
        for record in records {
            let account = record.group.first().cloned().unwrap_or_default();
            let service = record.group.get(1).cloned().unwrap_or_default();
            account_totals.fold(CostRecord::new(
                [account.clone()],
                record.amount,
                &record.currency,
            ));
            service_totals.fold(CostRecord::new(
                [service],
                record.amount,
                &record.currency,
            ));
            matrix.fold(record);
        }

        let accounts = account_totals.finalize(FinalizeOptions {
            min_amount: Some(self.min_cost),
            top_n: None,
        });
        let services = service_totals.finalize(FinalizeOptions {
            min_amount: None,
            top_n: (self.top_services > 0).then_some(self.top_services),
        });

        if accounts.is_empty() {
            println!("No accounts found with costs above minimum threshold.");
            return Ok(());
        }

        if matrix.currencies().len() > 1 {
            println!(
                "Note: multiple billing currencies present; rows are reported per currency."
            );
        }

        let service_names: Vec<String> =
            services.iter().map(|row| row.group[0].clone()).collect();

        self.print_matrix(&accounts, &service_names, &matrix, &service_totals, &names);
        info!("Writing CSV to {}", self.output.display());
        self.write_csv(&accounts, &service_names, &matrix, &names)?;
        println!("\nCSV written to: {}", self.output.display());

        Ok(())
    }

    fn print_matrix(
        &self,
        accounts: &[ReportRow],
        service_names: &[String],
        matrix: &Report,
        service_totals: &Report,
        names: &HashMap<String, Option<String>>,
    ) {
        let svc_label = if self.top_services > 0 {
            format!("top {}", self.top_services)
        } else {
            format!("all {}", service_names.len())
        };
        println!(
            "\nCost breakdown by account and service (30 days, {svc_label} services):\n"
        );

        let mut header = format!(
            "{:<NAME_WIDTH$}  {:<ID_WIDTH$}  {:>TOTAL_WIDTH$}",
            "Account", "ID", "Total"
        );
        for svc in service_names {
            header.push_str(&format!("  {:>SVC_WIDTH$}", table::truncate(svc, SVC_WIDTH)));
        }
        let separator = "-".repeat(header.len());
        println!("{header}");
        println!("{separator}");

        for account in accounts {
            let id = &account.group[0];
            let display = names
                .get(id)
                .and_then(|n| n.as_deref())
                .unwrap_or("(no name)");
            let name = table::truncate(display, NAME_WIDTH);
            let mut row = format!(
                "{:<NAME_WIDTH$}  {:<ID_WIDTH$}  {:>TOTAL_WIDTH$}",
                name,
                id,
                table::money_in(account.amount, &account.currency)
            );
            for svc in service_names {
                let cell = matrix
                    .amount(&[id.as_str(), svc.as_str()], &account.currency)
                    .filter(|amount| *amount >= 1.0)
                    .map(|amount| table::money_in(amount, &account.currency))
                    .unwrap_or_else(|| "-".to_string());
                row.push_str(&format!("  {cell:>SVC_WIDTH$}"));
            }
            println!("{row}");
        }

        println!("{separator}");
        // Footer totals stay per currency, like the rows above them.
        let grand = footer_cell(
            accounts
                .iter()
                .map(|account| (account.currency.clone(), account.amount)),
        );
        let mut footer = format!(
            "{:<NAME_WIDTH$}  {:<ID_WIDTH$}  {:>TOTAL_WIDTH$}",
            "TOTAL", "", grand
        );
        for svc in service_names {
            let cell = footer_cell(service_totals.amounts_for(std::slice::from_ref(svc)));
            footer.push_str(&format!("  {cell:>SVC_WIDTH$}"));
        }
        println!("{footer}");
    }

    fn write_csv(
        &self,
        accounts: &[ReportRow],
        service_names: &[String],
        matrix: &Report,
        names: &HashMap<String, Option<String>>,
    ) -> Result<()> {
        let mut header: Vec<&str> = vec!["Account", "Account ID", "Currency", "Total"];
        header.extend(service_names.iter().map(String::as_str));

        let mut rows = Vec::with_capacity(accounts.len());
        for account in accounts {
            let id = &account.group[0];
            let name = names
                .get(id)
                .and_then(|n| n.clone())
                .unwrap_or_default();
            let mut row = vec![
                name,
                id.clone(),
                account.currency.clone(),
                format!("{:.2}", account.amount),
            ];
            for svc in service_names {
                let amount = matrix
                    .amount(&[id.as_str(), svc.as_str()], &account.currency)
                    .unwrap_or(0.0);
                row.push(format!("{amount:.2}"));
            }
            rows.push(row);
        }

        csv::write_rows(&self.output, &header, rows)
    }
}

/// Sum footer amounts per currency and render them side by side, so a
/// mixed-currency organization never gets a blended `$` total.
fn footer_cell<I>(pairs: I) -> String
where
    I: IntoIterator<Item = (String, f64)>,
{
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for (currency, amount) in pairs {
        *totals.entry(currency).or_insert(0.0) += amount;
    }

    if totals.is_empty() {
        return table::money(0.0);
    }
    totals
        .iter()
        .map(|(currency, amount)| table::money_in(*amount, currency))
        .collect::<Vec<_>>()
        .join(" + ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_footer_cell_single_currency() {
        let cell = footer_cell(vec![
            ("USD".to_string(), 10.0),
            ("USD".to_string(), 2.5),
        ]);
        assert_eq!(cell, "$12.50");
    }

    #[test]
    fn test_footer_cell_keeps_currencies_apart() {
        // EUR and USD never blend into one figure.
        let cell = footer_cell(vec![
            ("USD".to_string(), 10.0),
            ("EUR".to_string(), 5.0),
            ("USD".to_string(), 2.5),
        ]);
        assert_eq!(cell, "5.00 EUR + $12.50");
    }

    #[test]
    fn test_footer_cell_empty() {
        assert_eq!(footer_cell(Vec::<(String, f64)>::new()), "$0.00");
    }

    #[test]
    fn test_footer_matches_report_totals() {
        let mut report = Report::new();
        report.fold(CostRecord::new(["Amazon EC2"], 100.0, "USD"));
        report.fold(CostRecord::new(["Amazon EC2"], 80.0, "EUR"));
        report.fold(CostRecord::new(["Amazon EC2"], 25.0, "USD"));

        let cell = footer_cell(report.amounts_for(&["Amazon EC2".to_string()]));
        assert_eq!(cell, "80.00 EUR + $125.00");
    }
}
