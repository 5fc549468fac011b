use crate::aggregate::{AggregateResults, AggregateSettings, Aggregator};
use crate::error::{LoadError, Notice};
use crate::filter::{apply_filters, FilterSelection, FilteredView};
use crate::loader::DatasetLoader;
use crate::models::{Config, Dataset};
use crate::options::OptionIndex;
use std::sync::Arc;
use tracing::{info, warn};

/// Filter `dataset` by `selection` and aggregate what remains.
pub fn recompute(
    dataset: &Dataset,
    selection: &FilterSelection,
    settings: AggregateSettings,
) -> AggregateResults {
    let view = apply_filters(dataset, selection);
    Aggregator::new(&dataset.schema, settings).aggregate(&view)
}

/// Loaded state shared by every recomputation: the dataset, its option index and
/// any notices about optional columns. Nothing here changes after `open`.
pub struct Dashboard {
    dataset: Arc<Dataset>,
    options: OptionIndex,
    notices: Vec<Notice>,
    settings: AggregateSettings,
}

impl Dashboard {
    pub fn open(config: &Config) -> Result<Self, LoadError> {
        let loader = DatasetLoader::new(&config.data_file, config.columns.clone(), &config.subcategory_pattern)
            .with_delimiter(config.delimiter)?;
        let dataset = loader.load()?;
        let notices = loader.notices(&dataset.schema);
        Ok(Self::new(dataset, notices, settings_from(config)))
    }

    pub fn new(dataset: Arc<Dataset>, notices: Vec<Notice>, settings: AggregateSettings) -> Self {
        let options = OptionIndex::build(&dataset);
        for notice in &notices {
            warn!(%notice, "optional feature disabled");
        }
        info!(
            provinces = options.province_to_cities.len(),
            categories = options.category_to_grades.len(),
            "option index built"
        );
        Self {
            dataset,
            options,
            notices,
            settings,
        }
    }

    pub fn options(&self) -> &OptionIndex {
        &self.options
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn view(&self, selection: &FilterSelection) -> FilteredView<'_> {
        apply_filters(&self.dataset, selection)
    }

    pub fn recompute(&self, selection: &FilterSelection) -> AggregateResults {
        recompute(&self.dataset, selection, self.settings)
    }
}

pub fn settings_from(config: &Config) -> AggregateSettings {
    let top_schools = config.clamped_top_schools();
    if top_schools != config.top_schools {
        warn!(
            requested = config.top_schools,
            used = top_schools,
            "top_schools outside supported range, clamped"
        );
    }
    AggregateSettings {
        top_k: config.top_k,
        top_schools,
        histogram_bins: config.histogram_bins,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Dimension;
    use crate::models::Record;

    fn record(province: &str, city: &str, score: f64) -> Record {
        Record {
            name: Some(format!("{}-{}", city, score)),
            grade: Some("7".to_string()),
            gender: Some("L".to_string()),
            province: Some(province.to_string()),
            city: Some(city.to_string()),
            school: Some(format!("SMP {}", city)),
            category: Some("Penggalang".to_string()),
            score,
            duration_minutes: None,
            subscores: Vec::new(),
        }
    }

    fn dashboard() -> Dashboard {
        let dataset = Dataset {
            schema: Default::default(),
            records: vec![record("A", "X", 80.0), record("A", "Y", 60.0), record("B", "Z", 90.0)],
        };
        Dashboard::new(Arc::new(dataset), Vec::new(), AggregateSettings::default())
    }

    #[test]
    fn province_selection_scenario() {
        let dashboard = dashboard();
        let results = dashboard.recompute(&FilterSelection::new().with(Dimension::Province, ["A"]));
        assert_eq!(results.summary.count, 2);
        assert_eq!(results.summary.mean, Some(70.0));
        assert_eq!(results.summary.max, Some(80.0));
        assert_eq!(results.summary.min, Some(60.0));
        assert_eq!(results.province_means.len(), 1);
    }

    #[test]
    fn selection_matching_nothing_yields_no_data() {
        let dashboard = dashboard();
        let results = dashboard.recompute(&FilterSelection::new().with(Dimension::Province, ["Papua"]));
        assert_eq!(results.summary.count, 0);
        assert_eq!(results.summary.mean, None);
        assert_eq!(results.summary.max, None);
        assert_eq!(results.summary.min, None);
        assert!(results.gender_counts.is_empty());
        assert!(results.grade_counts.is_empty());
        assert!(results.province_counts.is_empty());
        assert!(results.city_counts.is_empty());
        assert!(results.category_means.is_empty());
        assert!(results.top_schools.is_empty());
        assert!(results.top_participants.is_empty());
        assert!(results.subcategories.is_none());
        assert!(results.correlation.is_none());
    }

    #[test]
    fn group_counts_add_up_to_view_size() {
        let dashboard = dashboard();
        let results = dashboard.recompute(&FilterSelection::new());
        for groups in [
            &results.gender_counts,
            &results.grade_counts,
            &results.province_counts,
            &results.city_counts,
        ] {
            assert_eq!(groups.iter().map(|g| g.count).sum::<usize>(), results.summary.count);
        }
    }

    #[test]
    fn top_schools_respect_configured_range() {
        let mut config = Config::default();
        config.top_schools = 1;
        assert_eq!(settings_from(&config).top_schools, 5);
    }
}
