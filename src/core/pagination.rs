use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::CostError;

/// One page of a provider list/query response.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_token: Option<String>) -> Self {
        Self { items, next_token }
    }

    /// Final page with no continuation.
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }
}

/// Bounded exponential backoff for throttled page fetches. A value rather
/// than constants so tests can zero the delay.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn no_delay() -> Self {
        Self {
            base_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Drive a paginated API to completion, following continuation tokens
/// until the provider stops returning one.
///
/// `fetch` is called with the current token (None on the first call) and
/// must return one page. Each token is consumed exactly once; throttling
/// errors are retried in place with backoff so a retry never advances the
/// token. Any other error aborts the enumeration.
pub async fn collect_pages<T, F, Fut>(mut fetch: F, retry: RetryPolicy) -> Result<Vec<T>, CostError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, CostError>>,
{
    let mut items = Vec::new();
    let mut token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = fetch_page(&mut fetch, token.take(), retry).await?;
        pages += 1;
        items.extend(page.items);

        match page.next_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }

    debug!("Collected {} items across {} pages", items.len(), pages);
    Ok(items)
}

async fn fetch_page<T, F, Fut>(
    fetch: &mut F,
    token: Option<String>,
    retry: RetryPolicy,
) -> Result<Page<T>, CostError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, CostError>>,
{
    let mut attempt = 1;
    loop {
        match fetch(token.clone()).await {
            Ok(page) => return Ok(page),
            Err(err) if err.is_throttle() && attempt < retry.max_attempts => {
                let delay = retry.delay(attempt);
                warn!(
                    "Throttled (attempt {attempt}/{}), backing off {delay:?}",
                    retry.max_attempts
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(CostError::Throttled(detail)) => {
                return Err(CostError::Throttled(format!(
                    "{detail} (gave up after {attempt} attempts)"
                )));
            }
            Err(err) => return Err(err),
        }
    }
}
