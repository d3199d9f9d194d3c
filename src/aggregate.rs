//! Rolling time-window aggregation
//!
//! Counts and averages timestamped items over trailing windows that end at a
//! reference instant. Window arithmetic happens in a fixed reference offset
//! and a month is a fixed 30 days, so "1 month" means `[now - 30d, now]`.
//! Both bounds are inclusive and windows nest: an item inside the 1-month
//! window is also counted in the 2-month window.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use std::collections::BTreeMap;

use crate::harvester::config::DAYS_PER_MONTH;
use crate::VideoDetail;

/// A trailing window definition
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowSpec {
    /// Window length in days
    pub length_days: i64,
    /// Label used in column names ("1m", "45d")
    pub label: String,
}

impl WindowSpec {
    /// Window of `months` fixed 30-day months
    pub fn months(months: u32) -> Self {
        Self::days(i64::from(months) * DAYS_PER_MONTH)
    }

    /// Window of `days` days
    pub fn days(days: i64) -> Self {
        Self {
            length_days: days,
            label: window_label(days),
        }
    }
}

/// Column label for a window length
///
/// Whole multiples of 30 days read as months.
pub fn window_label(days: i64) -> String {
    if days > 0 && days % DAYS_PER_MONTH == 0 {
        format!("{}m", days / DAYS_PER_MONTH)
    } else {
        format!("{days}d")
    }
}

/// Start of a window ending at `end`
///
/// Lengths that reach past the representable range start at the earliest
/// instant chrono can hold, so the window takes every dated item.
fn window_start(end: DateTime<FixedOffset>, length_days: i64) -> DateTime<FixedOffset> {
    Duration::try_days(length_days)
        .and_then(|length| end.checked_sub_signed(length))
        .unwrap_or_else(|| DateTime::<Utc>::MIN_UTC.with_timezone(&end.timezone()))
}

/// Item that can be placed on the timeline
pub trait TimedItem {
    /// Publish instant; items without one are skipped
    fn timestamp(&self) -> Option<DateTime<Utc>>;

    /// Numeric field value; `None` when the item does not carry the field
    fn field(&self, name: &str) -> Option<f64>;
}

impl TimedItem for VideoDetail {
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    fn field(&self, name: &str) -> Option<f64> {
        self.metric(name).map(|v| v as f64)
    }
}

/// Running mean; 0.0 when nothing was added
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeanAccumulator {
    sum: f64,
    count: usize,
}

impl MeanAccumulator {
    /// Add one observation
    pub fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    /// Observations added
    pub fn count(&self) -> usize {
        self.count
    }

    /// Arithmetic mean, or 0.0 for an empty accumulator
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

impl FromIterator<f64> for MeanAccumulator {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut acc = Self::default();
        for value in iter {
            acc.add(value);
        }
        acc
    }
}

/// Result for one window
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationWindow {
    /// Window length in days
    pub length_days: i64,
    /// Column label
    pub label: String,
    /// Items inside the window
    pub count: usize,
    /// Mean per configured field; 0.0 when no item in the window carried it
    pub field_means: BTreeMap<String, f64>,
}

impl AggregationWindow {
    /// Mean of `field`, 0.0 when the field was not configured
    pub fn mean(&self, field: &str) -> f64 {
        self.field_means.get(field).copied().unwrap_or(0.0)
    }
}

struct WindowState {
    spec: WindowSpec,
    start: DateTime<FixedOffset>,
    count: usize,
    fields: BTreeMap<String, MeanAccumulator>,
}

/// Aggregates items into nested trailing windows
pub struct TimeWindowAggregator {
    reference_now: DateTime<FixedOffset>,
    windows: Vec<WindowState>,
    skipped: usize,
}

impl TimeWindowAggregator {
    /// Create an aggregator whose windows end at `now`, seen in `offset`
    pub fn new(
        now: DateTime<Utc>,
        offset: FixedOffset,
        windows: &[WindowSpec],
        fields: &[&str],
    ) -> Self {
        let reference_now = now.with_timezone(&offset);
        let windows = windows
            .iter()
            .map(|spec| WindowState {
                spec: spec.clone(),
                start: window_start(reference_now, spec.length_days),
                count: 0,
                fields: fields
                    .iter()
                    .map(|f| (f.to_string(), MeanAccumulator::default()))
                    .collect(),
            })
            .collect();

        Self {
            reference_now,
            windows,
            skipped: 0,
        }
    }

    /// End of every window
    pub fn reference_now(&self) -> DateTime<FixedOffset> {
        self.reference_now
    }

    /// Items that carried no timestamp
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Add one item to every window that contains it
    ///
    /// Returns `true` when at least one window took the item.
    pub fn push<I: TimedItem + ?Sized>(&mut self, item: &I) -> bool {
        let Some(published) = item.timestamp() else {
            self.skipped += 1;
            return false;
        };
        let published = published.with_timezone(&self.reference_now.timezone());

        let mut taken = false;
        for window in &mut self.windows {
            if published < window.start || published > self.reference_now {
                continue;
            }
            taken = true;
            window.count += 1;
            for (name, acc) in window.fields.iter_mut() {
                if let Some(value) = item.field(name) {
                    acc.add(value);
                }
            }
        }
        taken
    }

    /// Add every item of `items`
    pub fn extend<'a, I, It>(&mut self, items: It)
    where
        I: TimedItem + 'a,
        It: IntoIterator<Item = &'a I>,
    {
        for item in items {
            self.push(item);
        }
    }

    /// Final per-window results, in configuration order
    pub fn finish(self) -> Vec<AggregationWindow> {
        self.windows
            .into_iter()
            .map(|w| AggregationWindow {
                length_days: w.spec.length_days,
                label: w.spec.label,
                count: w.count,
                field_means: w
                    .fields
                    .into_iter()
                    .map(|(name, acc)| (name, acc.mean()))
                    .collect(),
            })
            .collect()
    }
}

/// Aggregate `items` in one call
pub fn aggregate<I: TimedItem>(
    items: &[I],
    now: DateTime<Utc>,
    offset: FixedOffset,
    windows: &[WindowSpec],
    fields: &[&str],
) -> Vec<AggregationWindow> {
    let mut aggregator = TimeWindowAggregator::new(now, offset, windows, fields);
    aggregator.extend(items);
    aggregator.finish()
}
