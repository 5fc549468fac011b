//! Lookup tables that drive the cascading filters: which grades belong to a category
//! and which cities belong to a province.

use crate::error::Notice;
use crate::filter::{Dimension, FilterSelection};
use crate::models::Dataset;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OptionIndex {
    pub category_to_grades: BTreeMap<String, BTreeSet<String>>,
    pub province_to_cities: BTreeMap<String, BTreeSet<String>>,
    /// Distinct non-missing values of every dimension.
    pub values: BTreeMap<Dimension, BTreeSet<String>>,
}

impl OptionIndex {
    pub fn build(dataset: &Dataset) -> Self {
        let mut index = OptionIndex::default();
        for dimension in Dimension::ALL {
            index.values.insert(dimension, BTreeSet::new());
        }

        for record in &dataset.records {
            for dimension in Dimension::ALL {
                if let Some(value) = dimension.value_of(record) {
                    index
                        .values
                        .entry(dimension)
                        .or_default()
                        .insert(value.to_string());
                }
            }

            // Pairs with a missing side are left out of the mappings
            if let (Some(category), Some(grade)) = (&record.category, &record.grade) {
                index
                    .category_to_grades
                    .entry(category.clone())
                    .or_default()
                    .insert(grade.clone());
            }
            if let (Some(province), Some(city)) = (&record.province, &record.city) {
                index
                    .province_to_cities
                    .entry(province.clone())
                    .or_default()
                    .insert(city.clone());
            }
        }

        index
    }

    /// Every distinct value of a dimension, sorted.
    pub fn all_values(&self, dimension: Dimension) -> Vec<String> {
        self.values
            .get(&dimension)
            .map(|values| values.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Values the user may pick for `dimension` given what is already selected.
    /// Cities narrow to the selected provinces and grades to the selected categories.
    pub fn offerable(&self, dimension: Dimension, selection: &FilterSelection) -> Vec<String> {
        let narrowed = match dimension {
            Dimension::City => Self::narrow(&self.province_to_cities, &selection.province),
            Dimension::Grade => Self::narrow(&self.category_to_grades, &selection.category),
            Dimension::Province | Dimension::Category => None,
        };
        match narrowed {
            Some(values) => values.into_iter().collect(),
            None => self.all_values(dimension),
        }
    }

    /// Copy of `selection` with city and grade values that cannot be offered removed.
    pub fn cascade(&self, selection: &FilterSelection) -> FilterSelection {
        let mut cascaded = selection.clone();
        for dimension in [Dimension::City, Dimension::Grade] {
            let allowed: BTreeSet<String> = self.offerable(dimension, selection).into_iter().collect();
            cascaded.get_mut(dimension).retain(|value| allowed.contains(value));
        }
        cascaded
    }

    /// Notices for every requested city or grade that `cascade` would drop.
    pub fn ignored(&self, requested: &FilterSelection) -> Vec<Notice> {
        let cascaded = self.cascade(requested);
        [Dimension::City, Dimension::Grade]
            .into_iter()
            .flat_map(|dimension| {
                requested
                    .get(dimension)
                    .difference(cascaded.get(dimension))
                    .map(move |value| Notice::IgnoredFilterValue {
                        dimension: dimension.to_string(),
                        value: value.clone(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn narrow(
        mapping: &BTreeMap<String, BTreeSet<String>>,
        keys: &BTreeSet<String>,
    ) -> Option<BTreeSet<String>> {
        if keys.is_empty() {
            return None;
        }
        Some(
            keys.iter()
                .filter_map(|key| mapping.get(key))
                .flat_map(|values| values.iter().cloned())
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;

    fn record(province: Option<&str>, city: Option<&str>, category: Option<&str>, grade: Option<&str>) -> Record {
        Record {
            name: None,
            grade: grade.map(str::to_string),
            gender: None,
            province: province.map(str::to_string),
            city: city.map(str::to_string),
            school: None,
            category: category.map(str::to_string),
            score: 50.0,
            duration_minutes: None,
            subscores: Vec::new(),
        }
    }

    fn dataset() -> Dataset {
        Dataset {
            schema: Default::default(),
            records: vec![
                record(Some("Jawa Barat"), Some("Bandung"), Some("Siaga"), Some("1")),
                record(Some("Jawa Barat"), Some("Bogor"), Some("Siaga"), Some("2")),
                record(Some("Jawa Barat"), Some("Bandung"), Some("Penggalang"), Some("7")),
                record(Some("Bali"), Some("Denpasar"), Some("Penggalang"), Some("8")),
                record(None, Some("Depok"), Some("Penegak"), None),
                record(Some("Bali"), None, None, Some("10")),
            ],
        }
    }

    #[test]
    fn mappings_hold_exactly_the_observed_pairs() {
        let index = OptionIndex::build(&dataset());
        let cities: Vec<_> = index.province_to_cities["Jawa Barat"].iter().cloned().collect();
        assert_eq!(cities, vec!["Bandung", "Bogor"]);
        let bali: Vec<_> = index.province_to_cities["Bali"].iter().cloned().collect();
        assert_eq!(bali, vec!["Denpasar"]);
        assert_eq!(index.province_to_cities.len(), 2);
        assert!(!index.category_to_grades.contains_key("Penegak"));
        assert_eq!(index.category_to_grades["Siaga"].len(), 2);
    }

    #[test]
    fn missing_values_are_left_out_of_value_lists() {
        let index = OptionIndex::build(&dataset());
        assert_eq!(index.all_values(Dimension::Province), vec!["Bali", "Jawa Barat"]);
        assert_eq!(
            index.all_values(Dimension::City),
            vec!["Bandung", "Bogor", "Denpasar", "Depok"]
        );
    }

    #[test]
    fn cities_narrow_to_selected_provinces() {
        let index = OptionIndex::build(&dataset());
        let selection = FilterSelection::new().with(Dimension::Province, ["Bali"]);
        assert_eq!(index.offerable(Dimension::City, &selection), vec!["Denpasar"]);
        assert_eq!(index.offerable(Dimension::City, &FilterSelection::new()).len(), 4);
        // provinces themselves are never narrowed
        assert_eq!(index.offerable(Dimension::Province, &selection).len(), 2);
    }

    #[test]
    fn unknown_province_offers_no_cities() {
        let index = OptionIndex::build(&dataset());
        let selection = FilterSelection::new().with(Dimension::Province, ["Papua"]);
        assert!(index.offerable(Dimension::City, &selection).is_empty());
    }

    #[test]
    fn cascade_drops_impossible_values() {
        let index = OptionIndex::build(&dataset());
        let selection = FilterSelection::new()
            .with(Dimension::Province, ["Bali"])
            .with(Dimension::City, ["Denpasar", "Bandung"])
            .with(Dimension::Category, ["Siaga"])
            .with(Dimension::Grade, ["1", "8"]);
        let cascaded = index.cascade(&selection);
        assert_eq!(cascaded.city.iter().collect::<Vec<_>>(), vec!["Denpasar"]);
        assert_eq!(cascaded.grade.iter().collect::<Vec<_>>(), vec!["1"]);
        assert_eq!(cascaded.province, selection.province);
    }

    #[test]
    fn dropped_values_are_reported() {
        let index = OptionIndex::build(&dataset());
        let selection = FilterSelection::new()
            .with(Dimension::Province, ["Bali"])
            .with(Dimension::City, ["Bandung"]);
        assert_eq!(
            index.ignored(&selection),
            vec![Notice::IgnoredFilterValue {
                dimension: "City".to_string(),
                value: "Bandung".to_string(),
            }]
        );
        assert!(index.ignored(&FilterSelection::new().with(Dimension::City, ["Bandung"])).is_empty());
    }
}
