use std::collections::HashSet;

use aws_config::{Region, SdkConfig};
use chrono::{Duration, Utc};
use tracing::debug;

use crate::core::pagination::{Page, RetryPolicy, collect_pages};
use crate::core::waste::{LogGroupRecord, NatGatewayRecord, SnapshotRecord, VolumeRecord};
use crate::dates;
use crate::error::{self, CostError};

fn region_of(region: &str) -> Region {
    Region::new(region.to_string())
}

/// Regions enabled for the account. Opt-in regions appear only once the
/// account has opted in, so scans can skip regions that would fail.
pub async fn enabled_regions(config: &SdkConfig) -> Result<HashSet<String>, CostError> {
    let client = aws_sdk_ec2::Client::new(config);
    let response = client
        .describe_regions()
        .send()
        .await
        .map_err(|e| error::from_sdk("DescribeRegions", e))?;

    Ok(response
        .regions()
        .iter()
        .filter_map(|r| r.region_name().map(str::to_owned))
        .collect())
}

/// Unattached (status `available`) EBS volumes in one region.
pub async fn unattached_volumes(
    config: &SdkConfig,
    region: &str,
) -> Result<Vec<VolumeRecord>, CostError> {
    let conf = aws_sdk_ec2::config::Builder::from(config)
        .region(region_of(region))
        .build();
    let client = aws_sdk_ec2::Client::from_conf(conf);
    let region = region.to_string();

    collect_pages(
        |token| {
            let client = client.clone();
            let region = region.clone();
            async move {
                let response = client
                    .describe_volumes()
                    .filters(
                        aws_sdk_ec2::types::Filter::builder()
                            .name("status")
                            .values("available")
                            .build(),
                    )
                    .set_next_token(token)
                    .send()
                    .await
                    .map_err(|e| error::from_sdk("DescribeVolumes", e))?;

                let mut items = Vec::new();
                for volume in response.volumes() {
                    let id = volume.volume_id().ok_or_else(|| {
                        CostError::MalformedResponse("volume entry had no id".into())
                    })?;
                    items.push(VolumeRecord {
                        id: id.to_string(),
                        region: region.clone(),
                        size_gib: i64::from(volume.size().unwrap_or(0)),
                        volume_type: volume
                            .volume_type()
                            .map(|t| t.as_str().to_string())
                            .unwrap_or_default(),
                        created: volume.create_time().and_then(dates::from_smithy),
                        attachment_count: volume.attachments().len(),
                    });
                }

                Ok(Page::new(items, response.next_token().map(str::to_owned)))
            }
        },
        RetryPolicy::default(),
    )
    .await
}

/// Snapshots owned by the account in one region.
pub async fn owned_snapshots(
    config: &SdkConfig,
    region: &str,
) -> Result<Vec<SnapshotRecord>, CostError> {
    let conf = aws_sdk_ec2::config::Builder::from(config)
        .region(region_of(region))
        .build();
    let client = aws_sdk_ec2::Client::from_conf(conf);
    let region = region.to_string();

    collect_pages(
        |token| {
            let client = client.clone();
            let region = region.clone();
            async move {
                let response = client
                    .describe_snapshots()
                    .owner_ids("self")
                    .set_next_token(token)
                    .send()
                    .await
                    .map_err(|e| error::from_sdk("DescribeSnapshots", e))?;

                let mut items = Vec::new();
                for snapshot in response.snapshots() {
                    let id = snapshot.snapshot_id().ok_or_else(|| {
                        CostError::MalformedResponse("snapshot entry had no id".into())
                    })?;
                    let started = snapshot
                        .start_time()
                        .and_then(dates::from_smithy)
                        .ok_or_else(|| {
                            CostError::MalformedResponse(format!(
                                "snapshot {id} had no start time"
                            ))
                        })?;
                    items.push(SnapshotRecord {
                        id: id.to_string(),
                        region: region.clone(),
                        size_gib: i64::from(snapshot.volume_size().unwrap_or(0)),
                        started,
                        description: snapshot.description().unwrap_or_default().to_string(),
                    });
                }

                Ok(Page::new(items, response.next_token().map(str::to_owned)))
            }
        },
        RetryPolicy::default(),
    )
    .await
}

/// Ids of NAT gateways in the `available` state in one region. Throughput
/// is attached separately via `metric_sum`.
pub async fn active_nat_gateway_ids(
    config: &SdkConfig,
    region: &str,
) -> Result<Vec<String>, CostError> {
    let conf = aws_sdk_ec2::config::Builder::from(config)
        .region(region_of(region))
        .build();
    let client = aws_sdk_ec2::Client::from_conf(conf);

    collect_pages(
        |token| {
            let client = client.clone();
            async move {
                let response = client
                    .describe_nat_gateways()
                    .set_next_token(token)
                    .send()
                    .await
                    .map_err(|e| error::from_sdk("DescribeNatGateways", e))?;

                let items = response
                    .nat_gateways()
                    .iter()
                    .filter(|nat| {
                        matches!(
                            nat.state(),
                            Some(aws_sdk_ec2::types::NatGatewayState::Available)
                        )
                    })
                    .filter_map(|nat| nat.nat_gateway_id().map(str::to_owned))
                    .collect();

                Ok(Page::new(items, response.next_token().map(str::to_owned)))
            }
        },
        RetryPolicy::default(),
    )
    .await
}

/// NAT gateways in one region together with their processed bytes over the
/// metric window.
pub async fn nat_gateways_with_throughput(
    config: &SdkConfig,
    region: &str,
    window_days: i64,
) -> Result<Vec<NatGatewayRecord>, CostError> {
    let ids = active_nat_gateway_ids(config, region).await?;

    let mut records = Vec::with_capacity(ids.len());
    for id in ids {
        let processed_bytes = metric_sum(
            config,
            region,
            "AWS/NATGateway",
            "BytesProcessed",
            "NatGatewayId",
            &id,
            window_days,
        )
        .await?;
        records.push(NatGatewayRecord {
            id,
            region: region.to_string(),
            processed_bytes,
        });
    }

    Ok(records)
}

/// All CloudWatch log groups in one region.
pub async fn log_groups(
    config: &SdkConfig,
    region: &str,
) -> Result<Vec<LogGroupRecord>, CostError> {
    let conf = aws_sdk_cloudwatchlogs::config::Builder::from(config)
        .region(region_of(region))
        .build();
    let client = aws_sdk_cloudwatchlogs::Client::from_conf(conf);
    let region = region.to_string();

    collect_pages(
        |token| {
            let client = client.clone();
            let region = region.clone();
            async move {
                let response = client
                    .describe_log_groups()
                    .set_next_token(token)
                    .send()
                    .await
                    .map_err(|e| error::from_sdk("DescribeLogGroups", e))?;

                let items = response
                    .log_groups()
                    .iter()
                    .filter_map(|group| {
                        Some(LogGroupRecord {
                            name: group.log_group_name()?.to_string(),
                            region: region.clone(),
                            stored_bytes: group.stored_bytes().unwrap_or(0),
                            retention_days: group.retention_in_days(),
                        })
                    })
                    .collect();

                Ok(Page::new(items, response.next_token().map(str::to_owned)))
            }
        },
        RetryPolicy::default(),
    )
    .await
}

/// Summed value of one CloudWatch metric over a trailing window, as a
/// single datapoint. Missing datapoints mean zero activity.
pub async fn metric_sum(
    config: &SdkConfig,
    region: &str,
    namespace: &str,
    metric_name: &str,
    dimension_name: &str,
    dimension_value: &str,
    window_days: i64,
) -> Result<f64, CostError> {
    let conf = aws_sdk_cloudwatch::config::Builder::from(config)
        .region(region_of(region))
        .build();
    let client = aws_sdk_cloudwatch::Client::from_conf(conf);

    let end = Utc::now();
    let start = end - Duration::days(window_days);

    let dimension = aws_sdk_cloudwatch::types::Dimension::builder()
        .name(dimension_name)
        .value(dimension_value)
        .build();

    let response = client
        .get_metric_statistics()
        .namespace(namespace)
        .metric_name(metric_name)
        .dimensions(dimension)
        .start_time(dates::to_smithy(start))
        .end_time(dates::to_smithy(end))
        .period((window_days * 86_400) as i32)
        .statistics(aws_sdk_cloudwatch::types::Statistic::Sum)
        .send()
        .await
        .map_err(|e| error::from_sdk("GetMetricStatistics", e))?;

    let sum = response
        .datapoints()
        .first()
        .and_then(|datapoint| datapoint.sum())
        .unwrap_or(0.0);

    debug!(
        "{}/{} for {}={}: {} over {} days",
        namespace, metric_name, dimension_name, dimension_value, sum, window_days
    );
    Ok(sum)
}
