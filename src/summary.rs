use std::collections::BTreeMap;

use serde::Serialize;

use crate::data::derive::UrgencyCategory;
use crate::data::filter::View;
use crate::data::model::Record;

// ---------------------------------------------------------------------------
// DistributionStats
// ---------------------------------------------------------------------------

/// Statistical summary of a group of present values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; `None` for a single value.
    pub std_dev: Option<f64>,
    pub min: f64,
    pub max: f64,
}

impl DistributionStats {
    /// `None` when there are no values.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut values: Vec<f64> = values.into_iter().collect();
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);

        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let mid = count / 2;
        let median = if count % 2 == 0 {
            (values[mid - 1] + values[mid]) / 2.0
        } else {
            values[mid]
        };
        let std_dev = (count > 1).then(|| {
            let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (count - 1) as f64).sqrt()
        });

        Some(DistributionStats {
            count,
            mean,
            median,
            std_dev,
            min: values[0],
            max: values[count - 1],
        })
    }
}

// ---------------------------------------------------------------------------
// KPIs
// ---------------------------------------------------------------------------

/// Headline indicators. Each is `None` when its column is not in the
/// dataset or nothing is left to measure.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Kpis {
    /// Median years to 50 % obsolescence.
    pub median_half_life: Option<f64>,
    /// Percentage of matched rows in the Critical urgency bucket.
    pub critical_share_pct: Option<f64>,
    pub mean_reskilling_months: Option<f64>,
    /// Percentage of matched rows whose viability ratio is at least 1.
    pub viable_share_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrgencyCount {
    pub category: UrgencyCategory,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryViability {
    pub skill_category: String,
    pub mean_viability_ratio: Option<f64>,
    pub mean_reskilling_months: Option<f64>,
    pub mean_half_life: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearTrend {
    pub year: i64,
    pub half_life: DistributionStats,
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Everything computed from one filtered view. Absent values are omitted
/// from every statistic, never read as zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub matched: usize,
    pub total: usize,
    pub kpis: Kpis,
    /// Count per urgency bucket, most urgent first. Empty when the dataset
    /// has no urgency column.
    pub urgency_distribution: Vec<UrgencyCount>,
    pub viability_by_category: Vec<CategoryViability>,
    pub half_life_trend: Vec<YearTrend>,
    /// Pearson correlation of AI adoption and skill depreciation.
    pub adoption_depreciation_correlation: Option<f64>,
}

impl Summary {
    pub fn from_view(view: &View<'_>) -> Self {
        Summary {
            matched: view.matched_count(),
            total: view.total_count(),
            kpis: kpis(view),
            urgency_distribution: urgency_distribution(view),
            viability_by_category: viability_by_category(view),
            half_life_trend: half_life_trend(view),
            adoption_depreciation_correlation: adoption_depreciation_correlation(view),
        }
    }
}

pub fn kpis(view: &View<'_>) -> Kpis {
    let known = *view.dataset().known();
    let rows = view.matched_count();

    let share = |column: Option<usize>, pred: &dyn Fn(&Record) -> bool| {
        column?;
        if rows == 0 {
            return None;
        }
        let hits = view.records().filter(|r| pred(r)).count();
        Some(hits as f64 * 100.0 / rows as f64)
    };

    Kpis {
        median_half_life: DistributionStats::from_values(
            view.records().filter_map(|r| r.decimal(known.years_to_obsolescence)),
        )
        .map(|s| s.median),
        critical_share_pct: share(known.urgency_category, &|r: &Record| {
            r.urgency(&known) == Some(UrgencyCategory::Critical)
        }),
        mean_reskilling_months: mean(
            view.records().filter_map(|r| r.decimal(known.reskilling_time_months)),
        ),
        viable_share_pct: share(known.viability_ratio, &|r: &Record| {
            r.decimal(known.viability_ratio).is_some_and(|v| v >= 1.0)
        }),
    }
}

pub fn urgency_distribution(view: &View<'_>) -> Vec<UrgencyCount> {
    let known = view.dataset().known();
    if known.urgency_category.is_none() {
        return Vec::new();
    }
    let mut counts = [0usize; 4];
    for category in view.records().filter_map(|r| r.urgency(known)) {
        counts[category as usize] += 1;
    }
    UrgencyCategory::ALL
        .into_iter()
        .zip(counts)
        .map(|(category, count)| UrgencyCount { category, count })
        .collect()
}

/// Per skill category means, sorted by category.
pub fn viability_by_category(view: &View<'_>) -> Vec<CategoryViability> {
    let known = view.dataset().known();
    if known.viability_ratio.is_none() || known.skill_category.is_none() {
        return Vec::new();
    }

    let mut groups: BTreeMap<String, Vec<&Record>> = BTreeMap::new();
    for record in view.records() {
        if let Some(category) = record.present(known.skill_category) {
            groups.entry(category.to_string()).or_default().push(record);
        }
    }

    groups
        .into_iter()
        .map(|(skill_category, records)| {
            let mean_of = |col: Option<usize>| mean(records.iter().filter_map(|r| r.decimal(col)));
            CategoryViability {
                skill_category,
                mean_viability_ratio: mean_of(known.viability_ratio),
                mean_reskilling_months: mean_of(known.reskilling_time_months),
                mean_half_life: mean_of(known.years_to_obsolescence),
            }
        })
        .collect()
}

/// Half-life distribution per year, ascending. Years without any present
/// half-life value are left out.
pub fn half_life_trend(view: &View<'_>) -> Vec<YearTrend> {
    let known = view.dataset().known();
    if known.year.is_none() || known.years_to_obsolescence.is_none() {
        return Vec::new();
    }

    let mut by_year: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for record in view.records() {
        if let (Some(year), Some(years)) = (
            record.integer(known.year),
            record.decimal(known.years_to_obsolescence),
        ) {
            by_year.entry(year).or_default().push(years);
        }
    }

    by_year
        .into_iter()
        .filter_map(|(year, values)| {
            DistributionStats::from_values(values).map(|half_life| YearTrend { year, half_life })
        })
        .collect()
}

pub fn adoption_depreciation_correlation(view: &View<'_>) -> Option<f64> {
    let known = view.dataset().known();
    let pairs: Vec<(f64, f64)> = view
        .records()
        .filter_map(|r| {
            Some((
                r.decimal(known.ai_adoption_rate)?,
                r.decimal(known.skill_depreciation_rate)?,
            ))
        })
        .collect();
    pearson(&pairs)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for &(x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x * var_y).sqrt())
}
