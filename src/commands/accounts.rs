use anyhow::{Context, Result};
use aws_sdk_costexplorer::types::Granularity;
use chrono::Utc;
use clap::Args;
use tracing::info;

use crate::aws::{cost_explorer, credentials};
use crate::constants::COST_WINDOW_DAYS;
use crate::core::aggregate::Report;
use crate::dates::DateRange;
use crate::report::table;

#[derive(Debug, Clone, Args)]
pub struct AccountsCommand {}

struct AccountRow {
    id: String,
    name: String,
    amount: f64,
    currency: Option<String>,
}

impl AccountsCommand {
    pub async fn execute(self, profile: Option<&str>) -> Result<()> {
        let config = credentials::resolve(profile).await;
        let range = DateRange::last_days(COST_WINDOW_DAYS, Utc::now().date_naive());

        info!("Discovering linked accounts...");
        let accounts = cost_explorer::linked_accounts(&config, &range)
            .await
            .context("Failed to discover linked accounts")?;

        info!("Fetching 30-day spend by linked account...");
        let records = cost_explorer::cost_and_usage(
            &config,
            &range,
            Granularity::Monthly,
            &["LINKED_ACCOUNT"],
            None,
        )
        .await
        .context("Failed to fetch costs by linked account")?;

        let mut report = Report::new();
        for record in records {
            report.fold(record);
        }

        // One row per (account, currency); accounts with no recorded cost
        // still appear, with a dash instead of a fabricated zero.
        let mut rows: Vec<AccountRow> = Vec::new();
        for account in &accounts {
            let amounts = report.amounts_for(std::slice::from_ref(&account.id));
            if amounts.is_empty() {
                rows.push(AccountRow {
                    id: account.id.clone(),
                    name: account.display_name().to_string(),
                    amount: 0.0,
                    currency: None,
                });
            } else {
                for (currency, amount) in amounts {
                    rows.push(AccountRow {
                        id: account.id.clone(),
                        name: account.display_name().to_string(),
                        amount,
                        currency: Some(currency),
                    });
                }
            }
        }
        rows.sort_by(|a, b| {
            b.amount
                .partial_cmp(&a.amount)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let totals = report.totals_by_currency();
        let total_label = if totals.is_empty() {
            table::money(0.0)
        } else {
            totals
                .iter()
                .map(|(currency, amount)| table::money_in(*amount, currency))
                .collect::<Vec<_>>()
                .join(" + ")
        };

        println!(
            "Found {} linked accounts (30-day total: {}):\n",
            accounts.len(),
            total_label
        );
        println!("  {:<14}  {:>14}  Name", "Account ID", "Cost (30d)");
        println!("  {}  {}  {}", "-".repeat(14), "-".repeat(14), "-".repeat(24));
        for row in &rows {
            let cost = match &row.currency {
                Some(currency) => table::money_in(row.amount, currency),
                None => "-".to_string(),
            };
            println!("  {:<14}  {:>14}  {}", row.id, cost, row.name);
        }

        Ok(())
    }
}
