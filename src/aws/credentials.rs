use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_sts::Client as StsClient;
use tracing::{debug, info};

use crate::constants::DEFAULT_AWS_REGION;
use crate::error::{self, CostError};

/// Resolve ambient credentials through the SDK's default chain: the
/// explicit profile when given, otherwise environment variables, the
/// default profile, then an instance/task role. One-shot and local;
/// rejection surfaces only when a call is later made with the result.
pub async fn resolve(profile: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(profile) = profile {
        debug!("Using AWS profile: {}", profile);
        loader = loader.profile_name(profile);
    }

    let config = loader.load().await;
    match config.region() {
        Some(region) => {
            debug!("Using region: {}", region);
            config
        }
        None => {
            info!(
                "No region configured, using default {} for cost APIs",
                DEFAULT_AWS_REGION
            );
            let mut loader = aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(DEFAULT_AWS_REGION));
            if let Some(profile) = profile {
                loader = loader.profile_name(profile);
            }
            loader.load().await
        }
    }
}

/// The account id of the calling identity. Also the first remote call on
/// freshly resolved credentials, so chain failures surface here as
/// authentication errors.
pub async fn caller_account_id(config: &SdkConfig) -> Result<String, CostError> {
    let client = StsClient::new(config);

    let identity = client.get_caller_identity().send().await.map_err(|e| {
        let classified = error::from_sdk("GetCallerIdentity", e);
        CostError::Authentication(classified.to_string())
    })?;

    identity
        .account()
        .map(str::to_owned)
        .ok_or_else(|| CostError::MalformedResponse("GetCallerIdentity had no account id".into()))
}
