use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use aws_config::SdkConfig;
use chrono::{DateTime, Utc};
use clap::Args;
use tracing::{debug, info, warn};

use crate::aws::{credentials, inventory, organizations, sts};
use crate::config::RunConfig;
use crate::constants::{
    DEFAULT_AUDIT_REGIONS, DEFAULT_ROLE_NAME, INGESTION_CHECK_GROUPS, LOG_INGEST_PRICE_PER_GB,
    LOG_METRIC_WINDOW_DAYS, NAT_METRIC_WINDOW_DAYS, TOP_LOG_GROUPS,
};
use crate::core::sweep::{self, OrgAccount, SweepOutcome};
use crate::core::waste::{self, gib};
use crate::error::CostError;
use crate::report::{csv, table};

#[derive(Debug, Clone, Args)]
pub struct AuditCommand {
    #[arg(
        long,
        default_value = DEFAULT_ROLE_NAME,
        help = "Comma-separated role names to try in member accounts"
    )]
    pub role_names: String,

    #[arg(
        long,
        default_value = DEFAULT_AUDIT_REGIONS,
        help = "Comma-separated regions to scan"
    )]
    pub regions: String,

    #[arg(
        long,
        help = "Comma-separated local profiles audited as additional accounts"
    )]
    pub profiles: Option<String>,

    #[arg(long, help = "Only audit this account id")]
    pub account_id: Option<String>,

    #[arg(long, help = "Only audit accounts whose name contains this substring")]
    pub account_name: Option<String>,

    #[arg(short = 'o', long, help = "Optional CSV export of all findings")]
    pub output: Option<PathBuf>,
}

/// Waste categories flagged by the audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Category {
    UnattachedVolume,
    OldSnapshot,
    UnboundedRetention,
    LogIngestion,
    NatThroughput,
}

impl Category {
    fn label(self) -> &'static str {
        match self {
            Category::UnattachedVolume => "unattached-volume",
            Category::OldSnapshot => "old-snapshot",
            Category::UnboundedRetention => "log-retention-forever",
            Category::LogIngestion => "log-ingestion",
            Category::NatThroughput => "nat-throughput",
        }
    }
}

/// One flagged resource, whole within one page fetch.
#[derive(Debug, Clone)]
struct Finding {
    region: String,
    category: Category,
    resource: String,
    detail: String,
    monthly_cost: Option<f64>,
}

impl AuditCommand {
    pub async fn execute(self, profile: Option<&str>) -> Result<()> {
        let run = RunConfig::new(
            profile.map(str::to_owned),
            Some(self.regions.as_str()),
            Some(self.role_names.as_str()),
            self.profiles.as_deref(),
        )?;

        let base = credentials::resolve(run.profile.as_deref()).await;
        let caller_id = credentials::caller_account_id(&base)
            .await
            .context("Failed to resolve calling identity")?;

        println!("Fetching account list from the organization...");
        let mut accounts = organizations::list_active_accounts(&base)
            .await
            .context("Failed to list organization accounts")?;

        // Extra local profiles become additional audit targets reached
        // with their own credentials instead of role assumption.
        let mut profile_configs: HashMap<String, SdkConfig> = HashMap::new();
        for extra in &run.extra_profiles {
            let config = credentials::resolve(Some(extra)).await;
            match credentials::caller_account_id(&config).await {
                Ok(id) => {
                    accounts.push(OrgAccount::new(&id, Some(format!("profile:{extra}"))));
                    profile_configs.insert(id, config);
                }
                Err(err) => warn!("Ignoring profile '{extra}': {err}"),
            }
        }

        let accounts = sweep::filter_accounts(
            sweep::dedup_accounts(accounts),
            self.account_id.as_deref(),
            self.account_name.as_deref(),
        );
        println!(
            "Auditing {} accounts across regions: {}\n",
            accounts.len(),
            run.regions.join(", ")
        );

        let regions = run.regions.clone();
        let role_names = run.role_names.clone();
        let outcome: SweepOutcome<Vec<Finding>> =
            sweep::sweep_accounts(&accounts, |account| {
                let base = base.clone();
                let caller_id = caller_id.clone();
                let account = account.clone();
                let regions = regions.clone();
                let role_names = role_names.clone();
                let profile_config = profile_configs.get(&account.id).cloned();
                async move {
                    let scoped = if account.id == caller_id {
                        base.clone()
                    } else if let Some(config) = profile_config {
                        config
                    } else {
                        let creds = sts::assume_role(&base, &account.id, &role_names).await?;
                        sts::scoped_config(&base, &creds)
                    };

                    // Opt-in regions the account never enabled would fail
                    // every describe call; drop them up front.
                    let enabled = match inventory::enabled_regions(&scoped).await {
                        Ok(set) => Some(set),
                        Err(err) if err.is_account_skippable() => {
                            warn!(
                                "Could not list enabled regions for {}: {err}",
                                account.id
                            );
                            None
                        }
                        Err(err) => return Err(err),
                    };

                    let mut findings = Vec::new();
                    for region in &regions {
                        if enabled.as_ref().is_some_and(|e| !e.contains(region)) {
                            debug!(
                                "Region {} not enabled in account {}, skipping",
                                region, account.id
                            );
                            continue;
                        }
                        match scan_region(&scoped, region, Utc::now()).await {
                            Ok(mut region_findings) => findings.append(&mut region_findings),
                            Err(err) if err.is_account_skippable() => {
                                // A broken region should not hide findings
                                // from the account's other regions.
                                warn!(
                                    "Error scanning {} in account {}: {err}",
                                    region, account.id
                                );
                            }
                            Err(err) => return Err(err),
                        }
                    }
                    Ok(findings)
                }
            })
            .await?;

        print_findings(&outcome);
        print_summary(&outcome);

        if let Some(output) = &self.output {
            write_csv(output, &outcome)?;
            println!("\nCSV written to: {}", output.display());
        }

        Ok(())
    }
}

async fn scan_region(
    config: &SdkConfig,
    region: &str,
    now: DateTime<Utc>,
) -> Result<Vec<Finding>, CostError> {
    let mut findings = Vec::new();

    let volumes = inventory::unattached_volumes(config, region).await?;
    for volume in volumes.iter().filter(|v| waste::is_unattached(v)) {
        findings.push(Finding {
            region: region.to_string(),
            category: Category::UnattachedVolume,
            resource: volume.id.clone(),
            detail: format!("{} GB {}", volume.size_gib, volume.volume_type),
            monthly_cost: Some(waste::volume_monthly_cost(volume)),
        });
    }

    let snapshots = inventory::owned_snapshots(config, region).await?;
    for snapshot in snapshots.iter().filter(|s| waste::is_old_snapshot(s, now)) {
        let age_days = (now - snapshot.started).num_days();
        findings.push(Finding {
            region: region.to_string(),
            category: Category::OldSnapshot,
            resource: snapshot.id.clone(),
            detail: format!("{} days old, {} GB", age_days, snapshot.size_gib),
            monthly_cost: None,
        });
    }

    let mut groups = inventory::log_groups(config, region).await?;
    groups.sort_by(|a, b| b.stored_bytes.cmp(&a.stored_bytes));

    for group in groups
        .iter()
        .take(TOP_LOG_GROUPS)
        .filter(|g| waste::has_unbounded_retention(g))
    {
        findings.push(Finding {
            region: region.to_string(),
            category: Category::UnboundedRetention,
            resource: group.name.clone(),
            detail: format!("{:.2} GB stored, retention Forever", gib(group.stored_bytes as f64)),
            monthly_cost: None,
        });
    }

    // Ingestion drives log costs more than storage; check the largest
    // groups only to keep the metric call count sane.
    for group in groups.iter().take(INGESTION_CHECK_GROUPS) {
        let ingested = inventory::metric_sum(
            config,
            region,
            "AWS/Logs",
            "IncomingBytes",
            "LogGroupName",
            &group.name,
            LOG_METRIC_WINDOW_DAYS,
        )
        .await?;
        let ingested_gib = gib(ingested);
        if ingested_gib > 1.0 {
            findings.push(Finding {
                region: region.to_string(),
                category: Category::LogIngestion,
                resource: group.name.clone(),
                detail: format!(
                    "{ingested_gib:.2} GB ingested in {LOG_METRIC_WINDOW_DAYS} days"
                ),
                monthly_cost: Some(ingested_gib * LOG_INGEST_PRICE_PER_GB),
            });
        }
    }

    let nats =
        inventory::nat_gateways_with_throughput(config, region, NAT_METRIC_WINDOW_DAYS).await?;
    for nat in nats.iter().filter(|n| waste::is_noisy_nat(n)) {
        findings.push(Finding {
            region: region.to_string(),
            category: Category::NatThroughput,
            resource: nat.id.clone(),
            detail: format!(
                "{:.2} GB processed in {NAT_METRIC_WINDOW_DAYS} days",
                gib(nat.processed_bytes)
            ),
            monthly_cost: Some(waste::nat_processing_cost(nat)),
        });
    }

    info!("Scanned {}: {} findings", region, findings.len());
    Ok(findings)
}

fn print_findings(outcome: &SweepOutcome<Vec<Finding>>) {
    for (account, findings) in &outcome.collected {
        println!("Account {} ({})", account.id, account.display_name());
        if findings.is_empty() {
            println!("  No waste found.");
            continue;
        }
        for finding in findings {
            let cost = finding
                .monthly_cost
                .map(|c| format!(" (~{}/mo)", table::money(c)))
                .unwrap_or_default();
            println!(
                "  [{}] {} {} | {}{}",
                finding.category.label(),
                finding.region,
                finding.resource,
                finding.detail,
                cost
            );
        }
    }
}

fn print_summary(outcome: &SweepOutcome<Vec<Finding>>) {
    // Finalized only after the full sweep: totals per account/category.
    let mut summary: BTreeMap<(String, Category), (usize, f64)> = BTreeMap::new();
    for (account, findings) in &outcome.collected {
        for finding in findings {
            let entry = summary
                .entry((account.id.clone(), finding.category))
                .or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += finding.monthly_cost.unwrap_or(0.0);
        }
    }

    println!("\nWaste summary:");
    if summary.is_empty() {
        println!("  Nothing flagged.");
    } else {
        println!(
            "  {:<14}  {:<22}  {:>6}  {:>14}",
            "Account", "Category", "Items", "Est. monthly"
        );
        for ((account_id, category), (count, cost)) in &summary {
            let estimate = if *cost > 0.0 {
                table::money(*cost)
            } else {
                "-".to_string()
            };
            println!(
                "  {:<14}  {:<22}  {:>6}  {:>14}",
                account_id,
                category.label(),
                count,
                estimate
            );
        }
    }

    if !outcome.skipped.is_empty() {
        println!("\nSkipped accounts ({}):", outcome.skipped.len());
        for skip in &outcome.skipped {
            println!(
                "  {} ({}): {}",
                skip.account.id,
                skip.account.display_name(),
                skip.reason
            );
        }
    }
}

fn write_csv(path: &Path, outcome: &SweepOutcome<Vec<Finding>>) -> Result<()> {
    let mut rows = Vec::new();
    for (account, findings) in &outcome.collected {
        for finding in findings {
            rows.push(vec![
                account.id.clone(),
                account.display_name().to_string(),
                finding.region.clone(),
                finding.category.label().to_string(),
                finding.resource.clone(),
                finding.detail.clone(),
                finding
                    .monthly_cost
                    .map(|c| format!("{c:.2}"))
                    .unwrap_or_default(),
            ]);
        }
    }

    csv::write_rows(
        path,
        &[
            "account_id",
            "account_name",
            "region",
            "category",
            "resource",
            "detail",
            "est_monthly_cost",
        ],
        rows,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_outcome() -> SweepOutcome<Vec<Finding>> {
        SweepOutcome {
            collected: vec![
                (
                    OrgAccount::new("111111111111", Some("alpha".into())),
                    vec![
                        Finding {
                            region: "us-east-1".into(),
                            category: Category::UnattachedVolume,
                            resource: "vol-0abc".into(),
                            detail: "100 GB gp3".into(),
                            monthly_cost: Some(8.0),
                        },
                        Finding {
                            region: "us-west-2".into(),
                            category: Category::OldSnapshot,
                            resource: "snap-0abc".into(),
                            detail: "90 days old, 50 GB".into(),
                            monthly_cost: None,
                        },
                    ],
                ),
                (OrgAccount::new("222222222222", None), vec![]),
            ],
            skipped: vec![],
        }
    }

    #[test]
    fn test_category_labels_are_stable() {
        assert_eq!(Category::UnattachedVolume.label(), "unattached-volume");
        assert_eq!(Category::OldSnapshot.label(), "old-snapshot");
        assert_eq!(
            Category::UnboundedRetention.label(),
            "log-retention-forever"
        );
        assert_eq!(Category::LogIngestion.label(), "log-ingestion");
        assert_eq!(Category::NatThroughput.label(), "nat-throughput");
    }

    #[test]
    fn test_csv_export_one_row_per_finding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("waste.csv");

        write_csv(&path, &sample_outcome()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "account_id,account_name,region,category,resource,detail,est_monthly_cost"
        );
        assert_eq!(
            lines[1],
            "111111111111,alpha,us-east-1,unattached-volume,vol-0abc,100 GB gp3,8.00"
        );
        // Findings without an estimate leave the cost column empty.
        assert_eq!(
            lines[2],
            "111111111111,alpha,us-west-2,old-snapshot,snap-0abc,\"90 days old, 50 GB\","
        );
    }
}
