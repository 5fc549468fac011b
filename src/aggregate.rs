use crate::filter::FilteredView;
use crate::models::{round2, Record, Schema};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Count, mean and extrema of the score. Statistics are `None` when the view is empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub count: usize,
    pub mean: Option<f64>,
    pub max: Option<f64>,
    pub min: Option<f64>,
}

impl ScoreSummary {
    /// Same summary with every statistic rounded to two decimals.
    pub fn rounded(&self) -> Self {
        Self {
            count: self.count,
            mean: self.mean.map(round2),
            max: self.max.map(round2),
            min: self.min.map(round2),
        }
    }
}

/// Record count for one value of a categorical column. `key` is `None` for missing values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    pub key: Option<String>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMean {
    pub key: String,
    pub mean: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubCategoryMean {
    pub name: String,
    pub mean: Option<f64>,
}

/// Per-topic means plus the strongest and weakest topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubCategoryInsight {
    pub means: Vec<SubCategoryMean>,
    pub strength: Option<SubCategoryMean>,
    pub weakness: Option<SubCategoryMean>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedParticipant {
    pub rank: usize,
    pub name: Option<String>,
    pub grade: Option<String>,
    pub school: Option<String>,
    pub city: Option<String>,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationStrength {
    StrongPositive,
    WeakPositive,
    StrongNegative,
    WeakNegative,
}

impl CorrelationStrength {
    /// Everything in (-0.3, 0] lands in `WeakNegative`, zero included.
    pub fn from_coefficient(coefficient: f64) -> Self {
        if coefficient > 0.3 {
            CorrelationStrength::StrongPositive
        } else if coefficient > 0.0 {
            CorrelationStrength::WeakPositive
        } else if coefficient < -0.3 {
            CorrelationStrength::StrongNegative
        } else {
            CorrelationStrength::WeakNegative
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CorrelationStrength::StrongPositive => "strong positive",
            CorrelationStrength::WeakPositive => "weak positive",
            CorrelationStrength::StrongNegative => "strong negative",
            CorrelationStrength::WeakNegative => "weak negative",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationCorrelation {
    pub sample_size: usize,
    /// `None` with fewer than two samples or when either side has no variance.
    pub coefficient: Option<f64>,
    pub strength: Option<CorrelationStrength>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Box-plot statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spread {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSpread {
    pub key: Option<String>,
    pub spread: Spread,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResults {
    pub summary: ScoreSummary,
    pub gender_counts: Vec<GroupCount>,
    pub grade_counts: Vec<GroupCount>,
    pub province_counts: Vec<GroupCount>,
    pub city_counts: Vec<GroupCount>,
    pub category_means: Vec<GroupMean>,
    pub province_means: Vec<GroupMean>,
    pub top_schools: Vec<GroupMean>,
    pub subcategories: Option<SubCategoryInsight>,
    pub top_participants: Vec<RankedParticipant>,
    pub correlation: Option<DurationCorrelation>,
    pub histogram: Vec<HistogramBin>,
    pub spread: Option<Spread>,
    pub spread_by_gender: Vec<GroupSpread>,
    pub spread_by_grade: Vec<GroupSpread>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateSettings {
    pub top_k: usize,
    pub top_schools: usize,
    pub histogram_bins: usize,
}

impl Default for AggregateSettings {
    fn default() -> Self {
        Self {
            top_k: 10,
            top_schools: 10,
            histogram_bins: 10,
        }
    }
}

pub struct Aggregator<'s> {
    pub schema: &'s Schema,
    pub settings: AggregateSettings,
}

impl<'s> Aggregator<'s> {
    pub fn new(schema: &'s Schema, settings: AggregateSettings) -> Self {
        Self { schema, settings }
    }

    pub fn aggregate(&self, view: &FilteredView<'_>) -> AggregateResults {
        let records = view.records();
        debug!(records = records.len(), "aggregating filtered view");

        let mut top_schools = mean_by(records, |r| r.school.as_deref());
        top_schools.truncate(self.settings.top_schools);

        let subcategories = if self.schema.subcategories.is_empty() {
            None
        } else {
            Some(subcategory_insight(records, self.schema))
        };

        let correlation = if self.schema.has_duration {
            Some(duration_correlation(records))
        } else {
            None
        };

        let scores: Vec<f64> = records.iter().map(|r| r.score).collect();

        AggregateResults {
            summary: score_summary(records),
            gender_counts: count_by(records, |r| r.gender.as_deref()),
            grade_counts: count_by(records, |r| r.grade.as_deref()),
            province_counts: count_by(records, |r| r.province.as_deref()),
            city_counts: count_by(records, |r| r.city.as_deref()),
            category_means: mean_by(records, |r| r.category.as_deref()),
            province_means: mean_by(records, |r| r.province.as_deref()),
            top_schools,
            subcategories,
            top_participants: top_participants(records, self.settings.top_k),
            correlation,
            histogram: histogram(&scores, self.settings.histogram_bins),
            spread: spread(&scores),
            spread_by_gender: spread_by(records, |r| r.gender.as_deref()),
            spread_by_grade: spread_by(records, |r| r.grade.as_deref()),
        }
    }
}

pub fn score_summary(records: &[&Record]) -> ScoreSummary {
    let count = records.len();
    if count == 0 {
        return ScoreSummary {
            count,
            mean: None,
            max: None,
            min: None,
        };
    }

    let sum: f64 = records.iter().map(|r| r.score).sum();
    let max = records.iter().map(|r| r.score).fold(f64::NEG_INFINITY, f64::max);
    let min = records.iter().map(|r| r.score).fold(f64::INFINITY, f64::min);

    ScoreSummary {
        count,
        mean: Some(sum / count as f64),
        max: Some(max),
        min: Some(min),
    }
}

/// Count records per value of `key`, keeping a bucket for missing values.
/// Largest groups first; ties by key with the missing bucket last.
pub fn count_by<F>(records: &[&Record], key: F) -> Vec<GroupCount>
where
    F: Fn(&Record) -> Option<&str>,
{
    let mut counts: HashMap<Option<&str>, usize> = HashMap::new();
    for &record in records {
        *counts.entry(key(record)).or_insert(0) += 1;
    }

    let mut groups: Vec<GroupCount> = counts
        .into_iter()
        .map(|(key, count)| GroupCount {
            key: key.map(str::to_string),
            count,
        })
        .collect();

    groups.sort_by(|a, b| {
        b.count.cmp(&a.count).then_with(|| match (&a.key, &b.key) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
    });
    groups
}

/// Mean score per value of `key`, highest mean first. Records with a missing key are skipped.
pub fn mean_by<F>(records: &[&Record], key: F) -> Vec<GroupMean>
where
    F: Fn(&Record) -> Option<&str>,
{
    let mut totals: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for &record in records {
        if let Some(value) = key(record) {
            let entry = totals.entry(value).or_insert((0.0, 0));
            entry.0 += record.score;
            entry.1 += 1;
        }
    }

    let mut groups: Vec<GroupMean> = totals
        .into_iter()
        .map(|(key, (sum, count))| GroupMean {
            key: key.to_string(),
            mean: sum / count as f64,
            count,
        })
        .collect();

    // Stable sort keeps keys ascending among equal means
    groups.sort_by(|a, b| b.mean.total_cmp(&a.mean));
    groups
}

pub fn subcategory_insight(records: &[&Record], schema: &Schema) -> SubCategoryInsight {
    let means: Vec<SubCategoryMean> = schema
        .subcategories
        .iter()
        .enumerate()
        .map(|(index, column)| {
            let values: Vec<f64> = records
                .iter()
                .filter_map(|r| r.subscores.get(index).copied().flatten())
                .collect();
            SubCategoryMean {
                name: column.name.clone(),
                mean: mean(&values),
            }
        })
        .collect();

    let defined: Vec<(&str, f64)> = means
        .iter()
        .filter_map(|m| m.mean.map(|value| (m.name.as_str(), value)))
        .collect();

    // Equal means resolve to the lexicographically smallest column name
    let strength = defined
        .iter()
        .min_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)))
        .map(|(name, value)| SubCategoryMean {
            name: name.to_string(),
            mean: Some(*value),
        });
    let weakness = defined
        .iter()
        .min_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)))
        .map(|(name, value)| SubCategoryMean {
            name: name.to_string(),
            mean: Some(*value),
        });

    SubCategoryInsight {
        means,
        strength,
        weakness,
    }
}

/// The `k` highest scores. Equal scores keep their dataset order.
pub fn top_participants(records: &[&Record], k: usize) -> Vec<RankedParticipant> {
    let mut ranked: Vec<&Record> = records.to_vec();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

    ranked
        .into_iter()
        .take(k)
        .enumerate()
        .map(|(index, record)| RankedParticipant {
            rank: index + 1,
            name: record.name.clone(),
            grade: record.grade.clone(),
            school: record.school.clone(),
            city: record.city.clone(),
            score: record.score,
        })
        .collect()
}

pub fn duration_correlation(records: &[&Record]) -> DurationCorrelation {
    let pairs: Vec<(f64, f64)> = records
        .iter()
        .filter_map(|r| r.duration_minutes.map(|d| (d, r.score)))
        .collect();

    let coefficient = pearson(&pairs);
    DurationCorrelation {
        sample_size: pairs.len(),
        coefficient,
        strength: coefficient.map(CorrelationStrength::from_coefficient),
    }
}

pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut variance_x = 0.0;
    let mut variance_y = 0.0;
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        covariance += dx * dy;
        variance_x += dx * dx;
        variance_y += dy * dy;
    }

    let denominator = (variance_x * variance_y).sqrt();
    if denominator == 0.0 {
        return None;
    }
    Some(covariance / denominator)
}

/// Equal-width bins spanning the observed range.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if min == max {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: values.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut result: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lower: min + width * i as f64,
            upper: if i + 1 == bins { max } else { min + width * (i + 1) as f64 },
            count: 0,
        })
        .collect();

    for value in values {
        let slot = (((value - min) / width).floor() as usize).min(bins - 1);
        result[slot].count += 1;
    }
    result
}

pub fn spread(values: &[f64]) -> Option<Spread> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    Some(Spread {
        min: sorted[0],
        q1: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q3: quantile(&sorted, 0.75),
        max: sorted[sorted.len() - 1],
    })
}

pub fn spread_by<F>(records: &[&Record], key: F) -> Vec<GroupSpread>
where
    F: Fn(&Record) -> Option<&str>,
{
    // Option<&str> orders None first; move it to the end
    let mut groups: BTreeMap<Option<&str>, Vec<f64>> = BTreeMap::new();
    for &record in records {
        groups.entry(key(record)).or_default().push(record.score);
    }

    let mut result: Vec<GroupSpread> = groups
        .into_iter()
        .filter_map(|(key, scores)| {
            spread(&scores).map(|spread| GroupSpread {
                key: key.map(str::to_string),
                spread,
            })
        })
        .collect();
    if result.first().map(|g| g.key.is_none()).unwrap_or(false) {
        result.rotate_left(1);
    }
    result
}

/// Linear interpolation between closest ranks over sorted values.
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let position = p * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
