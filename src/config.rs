use crate::constants::{DEFAULT_AUDIT_REGIONS, DEFAULT_ROLE_NAME};
use crate::error::CostError;

/// Run-wide settings built once at startup from CLI arguments and passed
/// explicitly through the pipeline. Nothing reads ambient globals mid-run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub profile: Option<String>,
    pub regions: Vec<String>,
    pub role_names: Vec<String>,
    pub extra_profiles: Vec<String>,
}

impl RunConfig {
    pub fn new(
        profile: Option<String>,
        regions: Option<&str>,
        role_names: Option<&str>,
        extra_profiles: Option<&str>,
    ) -> Result<Self, CostError> {
        let regions = split_csv(regions.unwrap_or(DEFAULT_AUDIT_REGIONS));
        if regions.is_empty() {
            return Err(CostError::InvalidInput(
                "at least one region is required".into(),
            ));
        }

        let role_names = split_csv(role_names.unwrap_or(DEFAULT_ROLE_NAME));
        if role_names.is_empty() {
            return Err(CostError::InvalidInput(
                "at least one role name is required".into(),
            ));
        }

        Ok(Self {
            profile,
            regions,
            role_names,
            extra_profiles: extra_profiles.map(split_csv).unwrap_or_default(),
        })
    }
}

/// Split a comma-separated list, trimming entries and dropping empties.
pub fn split_csv(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_csv_trims_and_drops_empties() {
        assert_eq!(
            split_csv("us-east-1, us-west-2 ,,  eu-west-1"),
            vec!["us-east-1", "us-west-2", "eu-west-1"]
        );
        assert!(split_csv("").is_empty());
        assert!(split_csv(" , ,").is_empty());
    }

    #[test]
    fn test_defaults() {
        let config = RunConfig::new(None, None, None, None).unwrap();
        assert_eq!(config.regions, vec!["us-east-1", "us-west-2"]);
        assert_eq!(config.role_names, vec![DEFAULT_ROLE_NAME]);
        assert!(config.profile.is_none());
        assert!(config.extra_profiles.is_empty());
    }

    #[test]
    fn test_explicit_values() {
        let config = RunConfig::new(
            Some("prod".into()),
            Some("eu-central-1"),
            Some("Audit,OrganizationAccountAccessRole"),
            Some("dev,staging"),
        )
        .unwrap();
        assert_eq!(config.profile.as_deref(), Some("prod"));
        assert_eq!(config.regions, vec!["eu-central-1"]);
        assert_eq!(
            config.role_names,
            vec!["Audit", "OrganizationAccountAccessRole"]
        );
        assert_eq!(config.extra_profiles, vec!["dev", "staging"]);
    }

    #[test]
    fn test_empty_lists_rejected() {
        let err = RunConfig::new(None, Some(" , "), None, None).unwrap_err();
        assert!(matches!(err, CostError::InvalidInput(_)));

        let err = RunConfig::new(None, None, Some(""), None).unwrap_err();
        assert!(matches!(err, CostError::InvalidInput(_)));
    }
}
