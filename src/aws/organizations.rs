use aws_config::SdkConfig;
use aws_sdk_organizations::types::AccountStatus;
use tracing::warn;

use crate::core::pagination::{Page, RetryPolicy, collect_pages};
use crate::core::sweep::OrgAccount;
use crate::error::{self, CostError};

/// List the organization's ACTIVE member accounts. Suspended or closed
/// accounts are skipped with a warning, not an error.
pub async fn list_active_accounts(config: &SdkConfig) -> Result<Vec<OrgAccount>, CostError> {
    let client = aws_sdk_organizations::Client::new(config);

    collect_pages(
        |token| {
            let client = client.clone();
            async move {
                let response = client
                    .list_accounts()
                    .set_next_token(token)
                    .send()
                    .await
                    .map_err(|e| error::from_sdk("ListAccounts", e))?;

                let mut items = Vec::new();
                for account in response.accounts() {
                    let id = account.id().ok_or_else(|| {
                        CostError::MalformedResponse("ListAccounts entry had no id".into())
                    })?;

                    match account.status() {
                        Some(AccountStatus::Active) => {
                            items.push(OrgAccount::new(id, account.name().map(str::to_owned)));
                        }
                        status => {
                            warn!("Skipping non-active account {} (status {:?})", id, status);
                        }
                    }
                }

                Ok(Page::new(
                    items,
                    response.next_token().map(str::to_owned),
                ))
            }
        },
        RetryPolicy::default(),
    )
    .await
}
