use std::time::SystemTime;

use aws_config::SdkConfig;
use aws_credential_types::provider::SharedCredentialsProvider;
use chrono::Utc;
use tracing::{debug, info};

use super::Credentials;
use crate::constants::SESSION_NAME_PREFIX;
use crate::error::{self, CostError};

/// Assume a role in a member account, trying each candidate role name in
/// order; the first that succeeds wins. All candidates failing is an
/// access-denied outcome for the account, never fatal to the run.
pub async fn assume_role(
    base: &SdkConfig,
    account_id: &str,
    role_names: &[String],
) -> Result<Credentials, CostError> {
    let client = aws_sdk_sts::Client::new(base);
    let session_name = format!("{}-{}", SESSION_NAME_PREFIX, Utc::now().timestamp());

    let mut last_error: Option<CostError> = None;

    for role_name in role_names {
        let role_arn = format!("arn:aws:iam::{account_id}:role/{role_name}");
        debug!("Attempting AssumeRole: {}", role_arn);

        match client
            .assume_role()
            .role_arn(&role_arn)
            .role_session_name(&session_name)
            .send()
            .await
        {
            Ok(response) => {
                let creds = response.credentials().ok_or_else(|| {
                    CostError::MalformedResponse("AssumeRole returned no credentials".into())
                })?;

                info!("Assumed {} in account {}", role_name, account_id);
                return Ok(Credentials {
                    access_key_id: creds.access_key_id().to_string(),
                    secret_access_key: creds.secret_access_key().to_string(),
                    session_token: creds.session_token().to_string(),
                    expiration: *creds.expiration(),
                });
            }
            Err(err) => {
                debug!("AssumeRole failed for {}: trying next candidate", role_arn);
                last_error = Some(error::from_sdk("AssumeRole", err));
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        CostError::AccessDenied(format!("no role could be assumed in account {account_id}"))
    }))
}

/// Build an SDK config scoped to one account from its temporary
/// credentials. The credentials live only as long as the returned config;
/// nothing is persisted.
pub fn scoped_config(base: &SdkConfig, creds: &Credentials) -> SdkConfig {
    let expiry = SystemTime::try_from(creds.expiration).ok();
    let provider = aws_credential_types::Credentials::new(
        creds.access_key_id.clone(),
        creds.secret_access_key.clone(),
        Some(creds.session_token.clone()),
        expiry,
        "costwatch-assume-role",
    );

    base.to_builder()
        .credentials_provider(SharedCredentialsProvider::new(provider))
        .build()
}
