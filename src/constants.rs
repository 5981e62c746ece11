/// Default AWS region for Cost Explorer and STS when none is configured
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Default role tried in member accounts during organization-wide audits
pub const DEFAULT_ROLE_NAME: &str = "OrganizationAccountAccessRole";

/// Default regions scanned by the waste audit
pub const DEFAULT_AUDIT_REGIONS: &str = "us-east-1,us-west-2";

/// Prefix for STS role session names
pub const SESSION_NAME_PREFIX: &str = "costwatch";

/// Cost window used by the accounts and costs reports
pub const COST_WINDOW_DAYS: i64 = 30;

/// Lookback window for linked-account discovery in the comparison report
pub const DISCOVERY_WINDOW_DAYS: i64 = 90;

/// Snapshots strictly older than this are flagged as waste
pub const SNAPSHOT_AGE_DAYS: i64 = 30;

/// Window for NAT gateway throughput metrics
pub const NAT_METRIC_WINDOW_DAYS: i64 = 7;

/// NAT gateways processing more than this many GiB in the window are flagged
pub const NAT_NOISE_THRESHOLD_GIB: f64 = 10.0;

/// How many log groups (largest first) the audit shows per region
pub const TOP_LOG_GROUPS: usize = 10;

/// How many of the largest log groups get an ingestion-volume check
pub const INGESTION_CHECK_GROUPS: usize = 5;

/// Window for log-group ingestion metrics
pub const LOG_METRIC_WINDOW_DAYS: i64 = 30;

/// Ballpark gp2/gp3 storage price used for waste estimates
pub const EBS_PRICE_PER_GB_MONTH: f64 = 0.08;

/// Ballpark log ingestion price used for estimates
pub const LOG_INGEST_PRICE_PER_GB: f64 = 0.50;

/// Ballpark NAT gateway data processing price used for estimates
pub const NAT_PRICE_PER_GB: f64 = 0.045;

/// Costs below this are treated as negligible in comparison output
pub const NEGLIGIBLE_COST: f64 = 0.01;
