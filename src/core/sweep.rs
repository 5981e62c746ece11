use std::collections::HashSet;
use std::future::Future;

use tracing::{info, warn};

use crate::error::CostError;

/// An organization member account discovered once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgAccount {
    pub id: String,
    pub name: Option<String>,
}

impl OrgAccount {
    pub fn new(id: impl Into<String>, name: Option<String>) -> Self {
        Self {
            id: id.into(),
            name,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("(no name)")
    }
}

/// An account left out of an organization-wide run, with the reason, so
/// operators can tell the audit was partial.
#[derive(Debug, Clone)]
pub struct SkippedAccount {
    pub account: OrgAccount,
    pub reason: String,
}

/// Result of visiting every account: per-account payloads in visit order
/// plus the accounts that had to be skipped.
#[derive(Debug)]
pub struct SweepOutcome<T> {
    pub collected: Vec<(OrgAccount, T)>,
    pub skipped: Vec<SkippedAccount>,
}

/// Visit accounts one at a time, sequentially. Skippable failures
/// (access denied, exhausted throttling, malformed pages) drop only that
/// account; authentication and input errors abort the whole run.
pub async fn sweep_accounts<T, F, Fut>(
    accounts: &[OrgAccount],
    mut visit: F,
) -> Result<SweepOutcome<T>, CostError>
where
    F: FnMut(&OrgAccount) -> Fut,
    Fut: Future<Output = Result<T, CostError>>,
{
    let mut collected = Vec::new();
    let mut skipped = Vec::new();

    for account in accounts {
        info!(
            "Processing account {} ({})",
            account.id,
            account.display_name()
        );
        match visit(account).await {
            Ok(payload) => collected.push((account.clone(), payload)),
            Err(err) if err.is_account_skippable() => {
                warn!("Skipping account {}: {err}", account.id);
                skipped.push(SkippedAccount {
                    account: account.clone(),
                    reason: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
    }

    Ok(SweepOutcome { collected, skipped })
}

/// Drop duplicate account ids, keeping the first occurrence.
pub fn dedup_accounts(accounts: Vec<OrgAccount>) -> Vec<OrgAccount> {
    let mut seen = HashSet::new();
    accounts
        .into_iter()
        .filter(|a| seen.insert(a.id.clone()))
        .collect()
}

/// Apply the CLI account filters: exact id match and case-insensitive
/// name substring match.
pub fn filter_accounts(
    accounts: Vec<OrgAccount>,
    id: Option<&str>,
    name: Option<&str>,
) -> Vec<OrgAccount> {
    accounts
        .into_iter()
        .filter(|a| id.is_none_or(|id| a.id == id))
        .filter(|a| {
            name.is_none_or(|name| {
                a.name
                    .as_deref()
                    .unwrap_or("")
                    .to_lowercase()
                    .contains(&name.to_lowercase())
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accounts() -> Vec<OrgAccount> {
        vec![
            OrgAccount::new("111111111111", Some("alpha".into())),
            OrgAccount::new("222222222222", Some("bravo".into())),
            OrgAccount::new("333333333333", Some("charlie".into())),
        ]
    }

    #[tokio::test]
    async fn test_access_denied_skips_only_that_account() {
        let accounts = accounts();
        let outcome = sweep_accounts(&accounts, |account| {
            let id = account.id.clone();
            async move {
                if id == "222222222222" {
                    Err(CostError::AccessDenied("role missing".into()))
                } else {
                    Ok(format!("report-{id}"))
                }
            }
        })
        .await
        .unwrap();

        let visited: Vec<&str> = outcome
            .collected
            .iter()
            .map(|(a, _)| a.id.as_str())
            .collect();
        assert_eq!(visited, vec!["111111111111", "333333333333"]);

        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].account.id, "222222222222");
        assert!(outcome.skipped[0].reason.contains("role missing"));
    }

    #[tokio::test]
    async fn test_fatal_error_aborts_run() {
        let accounts = accounts();
        let err = sweep_accounts(&accounts, |account| {
            let id = account.id.clone();
            async move {
                if id == "222222222222" {
                    Err(CostError::Authentication("base credentials gone".into()))
                } else {
                    Ok(())
                }
            }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, CostError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_all_accounts_visited_in_order() {
        let accounts = accounts();
        let outcome = sweep_accounts(&accounts, |account| {
            let id = account.id.clone();
            async move { Ok::<_, CostError>(id) }
        })
        .await
        .unwrap();

        assert!(outcome.skipped.is_empty());
        let order: Vec<&str> = outcome.collected.iter().map(|(_, p)| p.as_str()).collect();
        assert_eq!(
            order,
            vec!["111111111111", "222222222222", "333333333333"]
        );
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let deduped = dedup_accounts(vec![
            OrgAccount::new("111", Some("first".into())),
            OrgAccount::new("222", None),
            OrgAccount::new("111", Some("duplicate".into())),
        ]);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].name.as_deref(), Some("first"));
    }

    #[test]
    fn test_filter_by_id_and_name() {
        let by_id = filter_accounts(accounts(), Some("222222222222"), None);
        assert_eq!(by_id.len(), 1);
        assert_eq!(by_id[0].id, "222222222222");

        let by_name = filter_accounts(accounts(), None, Some("CHAR"));
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].name.as_deref(), Some("charlie"));

        let none = filter_accounts(accounts(), Some("999"), None);
        assert!(none.is_empty());
    }
}
