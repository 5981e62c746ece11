use chrono::{DateTime, Duration, Utc};

use crate::constants::{
    EBS_PRICE_PER_GB_MONTH, NAT_NOISE_THRESHOLD_GIB, NAT_PRICE_PER_GB, SNAPSHOT_AGE_DAYS,
};

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// EBS volume descriptor, one per inventory page entry.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeRecord {
    pub id: String,
    pub region: String,
    pub size_gib: i64,
    pub volume_type: String,
    pub created: Option<DateTime<Utc>>,
    pub attachment_count: usize,
}

/// EBS snapshot descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRecord {
    pub id: String,
    pub region: String,
    pub size_gib: i64,
    pub started: DateTime<Utc>,
    pub description: String,
}

/// CloudWatch log group descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct LogGroupRecord {
    pub name: String,
    pub region: String,
    pub stored_bytes: i64,
    pub retention_days: Option<i32>,
}

/// NAT gateway plus its processed-bytes metric over the audit window.
#[derive(Debug, Clone, PartialEq)]
pub struct NatGatewayRecord {
    pub id: String,
    pub region: String,
    pub processed_bytes: f64,
}

/// A volume is waste when nothing is attached to it.
pub fn is_unattached(volume: &VolumeRecord) -> bool {
    volume.attachment_count == 0
}

/// A snapshot is old when strictly more than the threshold has elapsed.
/// Exactly 30 days old is not flagged; 30 days and one second is.
pub fn is_old_snapshot(snapshot: &SnapshotRecord, now: DateTime<Utc>) -> bool {
    now - snapshot.started > Duration::days(SNAPSHOT_AGE_DAYS)
}

/// Absent retention means "Never expire": the group grows forever.
pub fn has_unbounded_retention(group: &LogGroupRecord) -> bool {
    group.retention_days.is_none()
}

/// A NAT gateway is worth surfacing once its window throughput clears the
/// noise threshold.
pub fn is_noisy_nat(nat: &NatGatewayRecord) -> bool {
    gib(nat.processed_bytes) > NAT_NOISE_THRESHOLD_GIB
}

pub fn gib(bytes: f64) -> f64 {
    bytes / BYTES_PER_GIB
}

/// Ballpark monthly cost of keeping an unattached volume around.
pub fn volume_monthly_cost(volume: &VolumeRecord) -> f64 {
    volume.size_gib as f64 * EBS_PRICE_PER_GB_MONTH
}

/// Ballpark data-processing cost of a NAT gateway over the audit window.
pub fn nat_processing_cost(nat: &NatGatewayRecord) -> f64 {
    gib(nat.processed_bytes) * NAT_PRICE_PER_GB
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume(attachment_count: usize) -> VolumeRecord {
        VolumeRecord {
            id: "vol-0abc".into(),
            region: "us-east-1".into(),
            size_gib: 100,
            volume_type: "gp3".into(),
            created: None,
            attachment_count,
        }
    }

    fn snapshot(started: DateTime<Utc>) -> SnapshotRecord {
        SnapshotRecord {
            id: "snap-0abc".into(),
            region: "us-east-1".into(),
            size_gib: 50,
            started,
            description: String::new(),
        }
    }

    #[test]
    fn test_unattached_volume() {
        assert!(is_unattached(&volume(0)));
        assert!(!is_unattached(&volume(1)));
    }

    #[test]
    fn test_snapshot_age_boundary_is_exclusive() {
        let now = DateTime::from_timestamp(1_735_689_600, 0).unwrap();

        // Exactly 30 days old: not flagged.
        let exactly = snapshot(now - Duration::days(30));
        assert!(!is_old_snapshot(&exactly, now));

        // 30 days and one second: flagged.
        let just_over = snapshot(now - Duration::days(30) - Duration::seconds(1));
        assert!(is_old_snapshot(&just_over, now));

        // Fresh snapshot: not flagged.
        let fresh = snapshot(now - Duration::days(1));
        assert!(!is_old_snapshot(&fresh, now));
    }

    #[test]
    fn test_retention_predicate() {
        let mut group = LogGroupRecord {
            name: "/aws/lambda/app".into(),
            region: "us-east-1".into(),
            stored_bytes: 1_000_000,
            retention_days: None,
        };
        assert!(has_unbounded_retention(&group));

        group.retention_days = Some(14);
        assert!(!has_unbounded_retention(&group));
    }

    #[test]
    fn test_nat_noise_threshold() {
        let quiet = NatGatewayRecord {
            id: "nat-0abc".into(),
            region: "us-east-1".into(),
            processed_bytes: 10.0 * BYTES_PER_GIB,
        };
        // Exactly at the threshold counts as quiet.
        assert!(!is_noisy_nat(&quiet));

        let noisy = NatGatewayRecord {
            processed_bytes: 10.5 * BYTES_PER_GIB,
            ..quiet.clone()
        };
        assert!(is_noisy_nat(&noisy));
    }

    #[test]
    fn test_cost_estimates() {
        let vol = volume(0);
        assert!((volume_monthly_cost(&vol) - 8.0).abs() < 1e-9);

        let nat = NatGatewayRecord {
            id: "nat-0abc".into(),
            region: "us-east-1".into(),
            processed_bytes: 100.0 * BYTES_PER_GIB,
        };
        assert!((nat_processing_cost(&nat) - 4.5).abs() < 1e-9);
    }
}
