use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// One cost observation: an arbitrary grouping key tuple (account, service,
/// region, date bucket... whatever the report groups by), an amount, and
/// the currency the amount is denominated in.
#[derive(Debug, Clone, PartialEq)]
pub struct CostRecord {
    pub group: Vec<String>,
    pub amount: f64,
    pub currency: String,
}

impl CostRecord {
    pub fn new<I, S>(group: I, amount: f64, currency: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            group: group.into_iter().map(Into::into).collect(),
            amount,
            currency: currency.to_string(),
        }
    }
}

/// Accumulation key. The currency is part of the key so amounts in
/// different currencies are never summed together.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReportKey {
    pub group: Vec<String>,
    pub currency: String,
}

/// Running totals keyed by (grouping tuple, currency). Built by folding
/// records one at a time; filtered views are produced only by `finalize`,
/// never during folding.
#[derive(Debug, Clone, Default)]
pub struct Report {
    totals: BTreeMap<ReportKey, f64>,
}

/// Finalize-time filters. Applied over fully accumulated totals.
#[derive(Debug, Clone, Copy, Default)]
pub struct FinalizeOptions {
    pub min_amount: Option<f64>,
    pub top_n: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub group: Vec<String>,
    pub currency: String,
    pub amount: f64,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one record into the running totals. Commutative and
    /// associative, so fold order never changes the finalized result.
    pub fn fold(&mut self, record: CostRecord) {
        let key = ReportKey {
            group: record.group,
            currency: record.currency,
        };
        *self.totals.entry(key).or_insert(0.0) += record.amount;
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    /// Accumulated amount for an exact (group, currency) key.
    pub fn amount(&self, group: &[&str], currency: &str) -> Option<f64> {
        let key = ReportKey {
            group: group.iter().map(|s| s.to_string()).collect(),
            currency: currency.to_string(),
        };
        self.totals.get(&key).copied()
    }

    /// All (currency, amount) pairs recorded under a grouping tuple.
    /// Usually one entry; more than one means mixed currencies.
    pub fn amounts_for(&self, group: &[String]) -> Vec<(String, f64)> {
        self.totals
            .iter()
            .filter(|(key, _)| key.group == group)
            .map(|(key, amount)| (key.currency.clone(), *amount))
            .collect()
    }

    /// Grand totals per currency across every key.
    pub fn totals_by_currency(&self) -> BTreeMap<String, f64> {
        let mut out = BTreeMap::new();
        for (key, amount) in &self.totals {
            *out.entry(key.currency.clone()).or_insert(0.0) += amount;
        }
        out
    }

    pub fn currencies(&self) -> BTreeSet<String> {
        self.totals
            .keys()
            .map(|key| key.currency.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ReportKey, f64)> {
        self.totals.iter().map(|(key, amount)| (key, *amount))
    }

    /// Produce the rendered view: rows sorted by amount descending, with
    /// the minimum threshold and top-N cut applied last, over the complete
    /// totals.
    pub fn finalize(&self, options: FinalizeOptions) -> Vec<ReportRow> {
        let mut rows: Vec<ReportRow> = self
            .totals
            .iter()
            .map(|(key, amount)| ReportRow {
                group: key.group.clone(),
                currency: key.currency.clone(),
                amount: *amount,
            })
            .collect();

        rows.sort_by(|a, b| {
            b.amount
                .partial_cmp(&a.amount)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.group.cmp(&b.group))
        });

        if let Some(min) = options.min_amount {
            rows.retain(|row| row.amount >= min);
        }
        if let Some(n) = options.top_n {
            rows.truncate(n);
        }

        rows
    }
}

/// Percentage delta between two period totals for one key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PctChange {
    /// Both periods zero.
    Unchanged,
    /// Baseline zero, comparison non-zero: the ratio is undefined.
    Undefined,
    Pct(f64),
}

impl PctChange {
    pub fn compute(baseline: f64, comparison: f64) -> Self {
        if baseline != 0.0 {
            PctChange::Pct((comparison - baseline) / baseline * 100.0)
        } else if comparison != 0.0 {
            PctChange::Undefined
        } else {
            PctChange::Unchanged
        }
    }

    pub fn label(&self) -> String {
        match self {
            PctChange::Unchanged => "+0.0%".to_string(),
            PctChange::Undefined => "NEW".to_string(),
            PctChange::Pct(pct) => format!("{pct:+.1}%"),
        }
    }
}

/// Per-key comparison between two independently accumulated reports.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaRow {
    pub group: Vec<String>,
    pub currency: String,
    pub baseline: f64,
    pub comparison: f64,
    pub diff: f64,
    pub pct: PctChange,
}

/// Compare two fully folded reports key by key. Keys carry the currency,
/// so amounts in different currencies land in distinct rows. Sorted by
/// absolute difference, largest changes first.
pub fn compare(baseline: &Report, comparison: &Report) -> Vec<DeltaRow> {
    let keys: BTreeSet<&ReportKey> = baseline
        .totals
        .keys()
        .chain(comparison.totals.keys())
        .collect();

    let mut rows: Vec<DeltaRow> = keys
        .into_iter()
        .map(|key| {
            let before = baseline.totals.get(key).copied().unwrap_or(0.0);
            let after = comparison.totals.get(key).copied().unwrap_or(0.0);
            DeltaRow {
                group: key.group.clone(),
                currency: key.currency.clone(),
                baseline: before,
                comparison: after,
                diff: after - before,
                pct: PctChange::compute(before, after),
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.diff
            .abs()
            .partial_cmp(&a.diff.abs())
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.group.cmp(&b.group))
    });

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd(group: &[&str], amount: f64) -> CostRecord {
        CostRecord::new(group.iter().copied(), amount, "USD")
    }

    #[test]
    fn test_fold_accumulates_by_key() {
        let mut report = Report::new();
        report.fold(usd(&["111", "Amazon EC2"], 10.0));
        report.fold(usd(&["111", "Amazon EC2"], 5.5));
        report.fold(usd(&["111", "Amazon S3"], 2.0));

        assert_eq!(report.amount(&["111", "Amazon EC2"], "USD"), Some(15.5));
        assert_eq!(report.amount(&["111", "Amazon S3"], "USD"), Some(2.0));
        assert_eq!(report.len(), 2);
    }

    #[test]
    fn test_fold_order_independence() {
        let records = vec![
            usd(&["a"], 1.25),
            usd(&["b"], 10.0),
            usd(&["a"], 3.75),
            usd(&["c"], 0.5),
            usd(&["b"], 0.25),
        ];

        let mut forward = Report::new();
        for r in records.clone() {
            forward.fold(r);
        }

        let mut reverse = Report::new();
        for r in records.into_iter().rev() {
            reverse.fold(r);
        }

        assert_eq!(
            forward.finalize(FinalizeOptions::default()),
            reverse.finalize(FinalizeOptions::default())
        );
    }

    #[test]
    fn test_arbitrary_group_key_shapes() {
        let mut report = Report::new();
        report.fold(usd(&["111"], 1.0));
        report.fold(usd(&["111", "Amazon EC2", "us-east-1"], 2.0));

        assert_eq!(report.amount(&["111"], "USD"), Some(1.0));
        assert_eq!(
            report.amount(&["111", "Amazon EC2", "us-east-1"], "USD"),
            Some(2.0)
        );
    }

    #[test]
    fn test_mixed_currencies_never_summed() {
        let mut report = Report::new();
        report.fold(CostRecord::new(["111", "Amazon EC2"], 100.0, "USD"));
        report.fold(CostRecord::new(["111", "Amazon EC2"], 80.0, "EUR"));

        assert_eq!(report.amount(&["111", "Amazon EC2"], "USD"), Some(100.0));
        assert_eq!(report.amount(&["111", "Amazon EC2"], "EUR"), Some(80.0));
        assert_eq!(report.len(), 2);

        let pairs = report.amounts_for(&["111".to_string(), "Amazon EC2".to_string()]);
        assert_eq!(
            pairs,
            vec![("EUR".to_string(), 80.0), ("USD".to_string(), 100.0)]
        );
    }

    #[test]
    fn test_finalize_sorts_descending() {
        let mut report = Report::new();
        report.fold(usd(&["small"], 1.0));
        report.fold(usd(&["large"], 100.0));
        report.fold(usd(&["medium"], 10.0));

        let rows = report.finalize(FinalizeOptions::default());
        let names: Vec<&str> = rows.iter().map(|r| r.group[0].as_str()).collect();
        assert_eq!(names, vec!["large", "medium", "small"]);
    }

    #[test]
    fn test_threshold_applies_to_complete_totals() {
        // Two records for the same key, each individually below the
        // threshold; only their full sum clears it. Filtering during
        // folding would have dropped the key and understated the report.
        let mut report = Report::new();
        report.fold(usd(&["111"], 60.0));
        report.fold(usd(&["111"], 60.0));
        report.fold(usd(&["222"], 40.0));

        let rows = report.finalize(FinalizeOptions {
            min_amount: Some(100.0),
            top_n: None,
        });
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].group, vec!["111"]);
        assert_eq!(rows[0].amount, 120.0);
    }

    #[test]
    fn test_top_n_after_full_accumulation() {
        let mut report = Report::new();
        for (name, amount) in [("a", 5.0), ("b", 50.0), ("c", 20.0), ("d", 1.0)] {
            report.fold(usd(&[name], amount));
        }

        let rows = report.finalize(FinalizeOptions {
            min_amount: None,
            top_n: Some(2),
        });
        let names: Vec<&str> = rows.iter().map(|r| r.group[0].as_str()).collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn test_totals_by_currency() {
        let mut report = Report::new();
        report.fold(CostRecord::new(["a"], 10.0, "USD"));
        report.fold(CostRecord::new(["b"], 20.0, "USD"));
        report.fold(CostRecord::new(["c"], 5.0, "EUR"));

        let totals = report.totals_by_currency();
        assert_eq!(totals.get("USD"), Some(&30.0));
        assert_eq!(totals.get("EUR"), Some(&5.0));
    }

    #[test]
    fn test_pct_change_both_zero_is_no_change() {
        assert_eq!(PctChange::compute(0.0, 0.0), PctChange::Unchanged);
        assert_eq!(PctChange::Unchanged.label(), "+0.0%");
    }

    #[test]
    fn test_pct_change_zero_baseline_is_undefined() {
        assert_eq!(PctChange::compute(0.0, 42.0), PctChange::Undefined);
        assert_eq!(PctChange::Undefined.label(), "NEW");
    }

    #[test]
    fn test_pct_change_regular() {
        match PctChange::compute(1000.0, 1200.0) {
            PctChange::Pct(pct) => assert!((pct - 20.0).abs() < 1e-9),
            other => panic!("expected Pct, got {other:?}"),
        }
        assert_eq!(PctChange::compute(1000.0, 1200.0).label(), "+20.0%");
        assert_eq!(PctChange::compute(200.0, 100.0).label(), "-50.0%");
    }

    #[test]
    fn test_compare_periods() {
        // December baseline $1,000; January comparison $1,200.
        let mut baseline = Report::new();
        baseline.fold(usd(&["Amazon EC2"], 600.0));
        baseline.fold(usd(&["Amazon S3"], 400.0));

        let mut comparison = Report::new();
        comparison.fold(usd(&["Amazon EC2"], 900.0));
        comparison.fold(usd(&["Amazon S3"], 300.0));

        let rows = compare(&baseline, &comparison);
        assert_eq!(rows.len(), 2);

        // Sorted by |diff| descending: EC2 (+300) before S3 (-100).
        assert_eq!(rows[0].group, vec!["Amazon EC2"]);
        assert_eq!(rows[0].diff, 300.0);
        assert_eq!(rows[0].pct.label(), "+50.0%");
        assert_eq!(rows[1].group, vec!["Amazon S3"]);
        assert_eq!(rows[1].diff, -100.0);

        let total_before: f64 = rows.iter().map(|r| r.baseline).sum();
        let total_after: f64 = rows.iter().map(|r| r.comparison).sum();
        assert_eq!(total_before, 1000.0);
        assert_eq!(total_after, 1200.0);
        assert_eq!(
            PctChange::compute(total_before, total_after).label(),
            "+20.0%"
        );
    }

    #[test]
    fn test_compare_key_only_in_one_period() {
        let mut baseline = Report::new();
        baseline.fold(usd(&["Amazon SQS"], 50.0));

        let mut comparison = Report::new();
        comparison.fold(usd(&["AWS Lambda"], 10.0));

        let rows = compare(&baseline, &comparison);
        assert_eq!(rows.len(), 2);

        let removed = rows.iter().find(|r| r.group[0] == "Amazon SQS").unwrap();
        assert_eq!(removed.comparison, 0.0);
        assert_eq!(removed.pct.label(), "-100.0%");

        let added = rows.iter().find(|r| r.group[0] == "AWS Lambda").unwrap();
        assert_eq!(added.baseline, 0.0);
        assert_eq!(added.pct, PctChange::Undefined);
    }

    #[test]
    fn test_compare_keeps_currencies_apart() {
        let mut baseline = Report::new();
        baseline.fold(CostRecord::new(["Amazon EC2"], 100.0, "USD"));

        let mut comparison = Report::new();
        comparison.fold(CostRecord::new(["Amazon EC2"], 100.0, "EUR"));

        let rows = compare(&baseline, &comparison);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.baseline == 0.0 || r.comparison == 0.0));
    }
}
