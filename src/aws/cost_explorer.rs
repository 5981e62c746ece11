use aws_config::SdkConfig;
use aws_sdk_costexplorer::Client;
use aws_sdk_costexplorer::types::{
    DateInterval, Dimension, DimensionValues, Expression, Granularity, Group, GroupDefinition,
    GroupDefinitionType,
};

use crate::core::aggregate::CostRecord;
use crate::core::pagination::{Page, RetryPolicy, collect_pages};
use crate::core::sweep::{OrgAccount, dedup_accounts};
use crate::dates::DateRange;
use crate::error::{self, CostError};

const METRIC: &str = "UnblendedCost";

/// Discover linked accounts from Cost Explorer's LINKED_ACCOUNT dimension,
/// id-deduplicated, in provider order. The account display name rides in
/// the dimension's `description` attribute.
pub async fn linked_accounts(
    config: &SdkConfig,
    range: &DateRange,
) -> Result<Vec<OrgAccount>, CostError> {
    let client = Client::new(config);
    let interval = interval(range)?;

    let accounts = collect_pages(
        |token| {
            let client = client.clone();
            let interval = interval.clone();
            async move {
                let response = client
                    .get_dimension_values()
                    .time_period(interval)
                    .dimension(Dimension::LinkedAccount)
                    .set_next_page_token(token)
                    .send()
                    .await
                    .map_err(|e| error::from_sdk("GetDimensionValues", e))?;

                let items = response
                    .dimension_values()
                    .iter()
                    .filter_map(|value| {
                        let id = value.value()?;
                        let name = value
                            .attributes()
                            .and_then(|attrs| attrs.get("description"))
                            .cloned();
                        Some(OrgAccount::new(id, name))
                    })
                    .collect();

                Ok(Page::new(
                    items,
                    response.next_page_token().map(str::to_owned),
                ))
            }
        },
        RetryPolicy::default(),
    )
    .await?;

    Ok(dedup_accounts(accounts))
}

/// Query costs for a period, grouped by the given dimensions (e.g.
/// `["SERVICE"]` or `["LINKED_ACCOUNT", "SERVICE"]`), optionally filtered
/// to one linked account. Every record keeps the currency its amount was
/// reported in; a missing or unparseable amount is a malformed response.
pub async fn cost_and_usage(
    config: &SdkConfig,
    range: &DateRange,
    granularity: Granularity,
    group_by: &[&str],
    account_filter: Option<&str>,
) -> Result<Vec<CostRecord>, CostError> {
    let client = Client::new(config);
    let interval = interval(range)?;

    let groups: Vec<GroupDefinition> = group_by
        .iter()
        .map(|key| {
            GroupDefinition::builder()
                .r#type(GroupDefinitionType::Dimension)
                .key(*key)
                .build()
        })
        .collect();

    let filter = account_filter.map(|account_id| {
        Expression::builder()
            .dimensions(
                DimensionValues::builder()
                    .key(Dimension::LinkedAccount)
                    .values(account_id)
                    .build(),
            )
            .build()
    });

    collect_pages(
        |token| {
            let client = client.clone();
            let interval = interval.clone();
            let granularity = granularity.clone();
            let groups = groups.clone();
            let filter = filter.clone();
            async move {
                let response = client
                    .get_cost_and_usage()
                    .time_period(interval)
                    .granularity(granularity)
                    .metrics(METRIC)
                    .set_group_by(Some(groups))
                    .set_filter(filter)
                    .set_next_page_token(token)
                    .send()
                    .await
                    .map_err(|e| error::from_sdk("GetCostAndUsage", e))?;

                let mut items = Vec::new();
                for result in response.results_by_time() {
                    for group in result.groups() {
                        items.push(record_from_group(group)?);
                    }
                }

                Ok(Page::new(
                    items,
                    response.next_page_token().map(str::to_owned),
                ))
            }
        },
        RetryPolicy::default(),
    )
    .await
}

fn record_from_group(group: &Group) -> Result<CostRecord, CostError> {
    let metric = group
        .metrics()
        .and_then(|metrics| metrics.get(METRIC))
        .ok_or_else(|| {
            CostError::MalformedResponse(format!("cost group missing {METRIC} metric"))
        })?;

    let raw = metric
        .amount()
        .ok_or_else(|| CostError::MalformedResponse("cost metric missing amount".into()))?;
    let amount: f64 = raw
        .parse()
        .map_err(|_| CostError::MalformedResponse(format!("unparseable cost amount '{raw}'")))?;

    // Cost Explorer always tags amounts with a unit; linked accounts can
    // bill in different currencies, so it travels with the record.
    let currency = metric
        .unit()
        .ok_or_else(|| CostError::MalformedResponse("cost metric missing currency unit".into()))?;

    Ok(CostRecord {
        group: group.keys().to_vec(),
        amount,
        currency: currency.to_string(),
    })
}

fn interval(range: &DateRange) -> Result<DateInterval, CostError> {
    DateInterval::builder()
        .start(range.start_ymd())
        .end(range.end_ymd())
        .build()
        .map_err(|e| CostError::InvalidInput(format!("invalid time period: {e}")))
}
