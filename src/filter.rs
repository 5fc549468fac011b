use crate::models::{Dataset, Record};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// The four filterable attributes of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Province,
    City,
    Category,
    Grade,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Province,
        Dimension::City,
        Dimension::Category,
        Dimension::Grade,
    ];

    pub fn value_of(self, record: &Record) -> Option<&str> {
        match self {
            Dimension::Province => record.province.as_deref(),
            Dimension::City => record.city.as_deref(),
            Dimension::Category => record.category.as_deref(),
            Dimension::Grade => record.grade.as_deref(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Dimension::Province => "Province",
            Dimension::City => "City",
            Dimension::Category => "Category",
            Dimension::Grade => "Grade",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Selected values per dimension. An empty set places no constraint on that dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub province: BTreeSet<String>,
    pub city: BTreeSet<String>,
    pub category: BTreeSet<String>,
    pub grade: BTreeSet<String>,
}

impl FilterSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, dimension: Dimension) -> &BTreeSet<String> {
        match dimension {
            Dimension::Province => &self.province,
            Dimension::City => &self.city,
            Dimension::Category => &self.category,
            Dimension::Grade => &self.grade,
        }
    }

    pub fn get_mut(&mut self, dimension: Dimension) -> &mut BTreeSet<String> {
        match dimension {
            Dimension::Province => &mut self.province,
            Dimension::City => &mut self.city,
            Dimension::Category => &mut self.category,
            Dimension::Grade => &mut self.grade,
        }
    }

    /// Builder-style helper: add values for one dimension.
    pub fn with<I, S>(mut self, dimension: Dimension, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.get_mut(dimension).extend(values.into_iter().map(Into::into));
        self
    }

    pub fn is_empty(&self) -> bool {
        Dimension::ALL.iter().all(|d| self.get(*d).is_empty())
    }

    /// "Province: A, B | Category: X" for the active dimensions, `None` when nothing is selected.
    pub fn describe(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        let parts: Vec<String> = Dimension::ALL
            .iter()
            .filter(|d| !self.get(**d).is_empty())
            .map(|d| {
                let values: Vec<&str> = self.get(*d).iter().map(String::as_str).collect();
                format!("{}: {}", d.label(), values.join(", "))
            })
            .collect();
        Some(parts.join(" | "))
    }

    fn matches(&self, dimension: Dimension, record: &Record) -> bool {
        let selected = self.get(dimension);
        if selected.is_empty() {
            return true;
        }
        // A missing value never matches an explicit selection
        dimension
            .value_of(record)
            .map(|value| selected.contains(value))
            .unwrap_or(false)
    }
}

/// Records of a dataset that satisfy a selection, borrowed in dataset order.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    records: Vec<&'a Record>,
}

impl<'a> FilteredView<'a> {
    pub fn records(&self) -> &[&'a Record] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Record> + '_ {
        self.records.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub fn apply_filters<'a>(dataset: &'a Dataset, selection: &FilterSelection) -> FilteredView<'a> {
    apply_filters_in_order(dataset, selection, &Dimension::ALL)
}

/// Apply the per-dimension filters one after another in the given order.
/// Dimensions absent from `order` are not applied.
pub fn apply_filters_in_order<'a>(
    dataset: &'a Dataset,
    selection: &FilterSelection,
    order: &[Dimension],
) -> FilteredView<'a> {
    let mut records: Vec<&'a Record> = dataset.records.iter().collect();
    for dimension in order {
        if selection.get(*dimension).is_empty() {
            continue;
        }
        records.retain(|record| selection.matches(*dimension, record));
    }
    FilteredView { records }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(province: &str, city: &str, category: &str, grade: &str, score: f64) -> Record {
        let opt = |s: &str| if s.is_empty() { None } else { Some(s.to_string()) };
        Record {
            name: Some(format!("{}-{}", city, score)),
            grade: opt(grade),
            gender: Some("P".to_string()),
            province: opt(province),
            city: opt(city),
            school: Some("SD 1".to_string()),
            category: opt(category),
            score,
            duration_minutes: None,
            subscores: Vec::new(),
        }
    }

    fn dataset() -> Dataset {
        Dataset {
            schema: Default::default(),
            records: vec![
                record("A", "X", "Siaga", "1", 80.0),
                record("A", "Y", "Penggalang", "7", 60.0),
                record("B", "Z", "Siaga", "2", 90.0),
                record("", "Z", "Penegak", "10", 40.0),
                record("B", "W", "", "8", 55.0),
            ],
        }
    }

    #[test]
    fn empty_selection_is_identity() {
        let data = dataset();
        let view = apply_filters(&data, &FilterSelection::new());
        assert_eq!(view.len(), data.len());
        for (a, b) in view.iter().zip(data.records.iter()) {
            assert!(std::ptr::eq(a, b));
        }
    }

    #[test]
    fn or_within_and_across_dimensions() {
        let data = dataset();
        let selection = FilterSelection::new()
            .with(Dimension::Province, ["A", "B"])
            .with(Dimension::Category, ["Siaga"]);
        let view = apply_filters(&data, &selection);
        let scores: Vec<f64> = view.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![80.0, 90.0]);
    }

    #[test]
    fn missing_values_never_match_a_selection() {
        let data = dataset();
        let view = apply_filters(&data, &FilterSelection::new().with(Dimension::Category, ["Siaga", "Penegak"]));
        assert!(view.iter().all(|r| r.category.is_some()));
        assert_eq!(view.len(), 3);
    }

    #[test]
    fn filter_order_does_not_matter() {
        let data = dataset();
        let selection = FilterSelection::new()
            .with(Dimension::Province, ["A", "B"])
            .with(Dimension::City, ["X", "Z", "W"])
            .with(Dimension::Grade, ["1", "2", "8"]);
        let canonical: Vec<*const Record> = apply_filters(&data, &selection)
            .iter()
            .map(|r| r as *const Record)
            .collect();

        let orders = [
            [Dimension::Grade, Dimension::Category, Dimension::City, Dimension::Province],
            [Dimension::City, Dimension::Province, Dimension::Grade, Dimension::Category],
            [Dimension::Category, Dimension::Grade, Dimension::Province, Dimension::City],
        ];
        for order in orders {
            let other: Vec<*const Record> = apply_filters_in_order(&data, &selection, &order)
                .iter()
                .map(|r| r as *const Record)
                .collect();
            assert_eq!(canonical, other);
        }
    }

    #[test]
    fn selection_matching_nothing_is_empty() {
        let data = dataset();
        let view = apply_filters(&data, &FilterSelection::new().with(Dimension::City, ["Nowhere"]));
        assert!(view.is_empty());
    }

    #[test]
    fn describe_lists_active_dimensions() {
        assert_eq!(FilterSelection::new().describe(), None);
        let selection = FilterSelection::new()
            .with(Dimension::Province, ["B", "A"])
            .with(Dimension::Grade, ["7"]);
        assert_eq!(selection.describe().unwrap(), "Province: A, B | Grade: 7");
    }
}
