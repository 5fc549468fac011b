use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_TOP_SCHOOLS: usize = 5;
pub const MAX_TOP_SCHOOLS: usize = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_file: String,
    pub output_directory: Option<String>,
    pub delimiter: char,
    pub top_k: usize,
    pub top_schools: usize,
    pub histogram_bins: usize,
    // Columns whose header matches this pattern hold per-topic sub-scores
    pub subcategory_pattern: String,
    pub columns: ColumnNames,
}

/// Header names of the input table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub name: String,
    pub grade: String,
    pub gender: String,
    pub province: String,
    pub city: String,
    pub school: String,
    pub category: String,
    pub score: String,
    pub duration: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_file: "files/dashboard_bebras.csv".to_string(),
            output_directory: None,
            delimiter: ',',
            top_k: 10,
            top_schools: 10,
            histogram_bins: 10,
            subcategory_pattern: "^S[ _]".to_string(),
            columns: ColumnNames::default(),
        }
    }
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            name: "Nama".to_string(),
            grade: "Kelas".to_string(),
            gender: "JenisKelamin".to_string(),
            province: "Provinsi".to_string(),
            city: "SekolahKotaKabupaten".to_string(),
            school: "SekolahNama".to_string(),
            category: "Kategori".to_string(),
            score: "Nilai".to_string(),
            duration: "DurasiMenit".to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file(file_path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(file_path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, file_path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(file_path, content)?;
        Ok(())
    }

    /// Number of schools to rank, forced into the range the dashboard supports.
    pub fn clamped_top_schools(&self) -> usize {
        self.top_schools.clamp(MIN_TOP_SCHOOLS, MAX_TOP_SCHOOLS)
    }
}

/// One participant's result row. Categorical fields are `None` when the cell was empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub name: Option<String>,
    pub grade: Option<String>,
    pub gender: Option<String>,
    pub province: Option<String>,
    pub city: Option<String>,
    pub school: Option<String>,
    pub category: Option<String>,
    pub score: f64,
    pub duration_minutes: Option<f64>,
    /// Indexed like `Schema::subcategories`.
    pub subscores: Vec<Option<f64>>,
}

/// A column holding one topic's sub-score, resolved from the header at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubCategoryColumn {
    pub name: String,
    pub position: usize,
}

/// Which optional parts of the table were found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub has_duration: bool,
    pub subcategories: Vec<SubCategoryColumn>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub schema: Schema,
    pub records: Vec<Record>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{0}` is not a finite number")]
pub struct NotANumber(pub String);

/// Parse a numeric cell, accepting a decimal comma. Blank cells yield `Ok(None)`.
/// `NaN` and infinities are rejected.
pub fn parse_number(raw: &str) -> Result<Option<f64>, NotANumber> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.replace(',', ".").parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(NotANumber(trimmed.to_string())),
    }
}

/// Trim a categorical cell; blank cells are treated as missing.
pub fn normalize_category(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Round to two decimal places for display.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
