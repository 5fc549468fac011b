use crate::error::{LoadError, Notice};
use crate::models::{
    normalize_category, parse_number, ColumnNames, Dataset, Record, Schema, SubCategoryColumn,
};
use csv::{ReaderBuilder, StringRecord};
use regex::Regex;
use std::cell::OnceCell;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Header positions of the required columns.
struct ColumnPositions {
    name: usize,
    grade: usize,
    gender: usize,
    province: usize,
    city: usize,
    school: usize,
    category: usize,
    score: usize,
    duration: Option<usize>,
}

/// Reads the results table once and hands out the same immutable dataset afterwards.
pub struct DatasetLoader {
    path: PathBuf,
    delimiter: u8,
    columns: ColumnNames,
    subcategory_pattern: String,
    cache: OnceCell<Arc<Dataset>>,
}

impl DatasetLoader {
    pub fn new(path: impl Into<PathBuf>, columns: ColumnNames, subcategory_pattern: &str) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
            columns,
            subcategory_pattern: subcategory_pattern.to_string(),
            cache: OnceCell::new(),
        }
    }

    /// csv only supports single-byte delimiters.
    pub fn with_delimiter(mut self, delimiter: char) -> Result<Self, LoadError> {
        if !delimiter.is_ascii() {
            return Err(LoadError::InvalidDelimiter(delimiter));
        }
        self.delimiter = delimiter as u8;
        Ok(self)
    }

    /// Load the dataset. The first call reads the file; later calls return the cached handle.
    /// A failed read is not cached, so a later call tries again.
    pub fn load(&self) -> Result<Arc<Dataset>, LoadError> {
        if let Some(dataset) = self.cache.get() {
            debug!(path = %self.path.display(), "returning cached dataset");
            return Ok(Arc::clone(dataset));
        }

        let dataset = Arc::new(self.read_file()?);
        info!(
            path = %self.path.display(),
            records = dataset.len(),
            subcategories = dataset.schema.subcategories.len(),
            duration = dataset.schema.has_duration,
            "dataset loaded"
        );
        Ok(Arc::clone(self.cache.get_or_init(|| dataset)))
    }

    /// Notices for optional columns that the loaded schema lacks.
    pub fn notices(&self, schema: &Schema) -> Vec<Notice> {
        schema_notices(schema, &self.columns, &self.subcategory_pattern)
    }

    fn read_file(&self) -> Result<Dataset, LoadError> {
        // The handle is dropped when this scope ends, on success or error.
        let file = File::open(&self.path).map_err(|source| LoadError::Io {
            path: self.path.clone(),
            source,
        })?;
        parse_dataset(file, self.delimiter, &self.columns, &self.subcategory_pattern)
    }
}

/// Parse a delimited table from any reader into a dataset.
pub fn parse_dataset<R: Read>(
    reader: R,
    delimiter: u8,
    columns: &ColumnNames,
    subcategory_pattern: &str,
) -> Result<Dataset, LoadError> {
    let pattern = Regex::new(subcategory_pattern).map_err(|source| LoadError::InvalidPattern {
        pattern: subcategory_pattern.to_string(),
        source,
    })?;

    let mut csv_reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let (positions, schema) = resolve_schema(&headers, columns, &pattern)?;

    let mut records = Vec::new();
    for (index, row) in csv_reader.records().enumerate() {
        let row = row?;
        records.push(parse_record(&row, index + 1, &positions, &schema, columns)?);
    }

    Ok(Dataset { schema, records })
}

fn resolve_schema(
    headers: &StringRecord,
    columns: &ColumnNames,
    pattern: &Regex,
) -> Result<(ColumnPositions, Schema), LoadError> {
    let find = |name: &str| headers.iter().position(|h| h == name);
    let require = |name: &str| find(name).ok_or_else(|| LoadError::MissingColumn(name.to_string()));

    let positions = ColumnPositions {
        name: require(&columns.name)?,
        grade: require(&columns.grade)?,
        gender: require(&columns.gender)?,
        province: require(&columns.province)?,
        city: require(&columns.city)?,
        school: require(&columns.school)?,
        category: require(&columns.category)?,
        score: require(&columns.score)?,
        duration: find(&columns.duration),
    };

    let known = [
        positions.name,
        positions.grade,
        positions.gender,
        positions.province,
        positions.city,
        positions.school,
        positions.category,
        positions.score,
    ];

    let subcategories: Vec<SubCategoryColumn> = headers
        .iter()
        .enumerate()
        .filter(|(position, header)| {
            !known.contains(position)
                && Some(*position) != positions.duration
                && pattern.is_match(header)
        })
        .map(|(position, header)| SubCategoryColumn {
            name: header.to_string(),
            position,
        })
        .collect();

    let schema = Schema {
        has_duration: positions.duration.is_some(),
        subcategories,
    };
    Ok((positions, schema))
}

fn parse_record(
    row: &StringRecord,
    row_number: usize,
    positions: &ColumnPositions,
    schema: &Schema,
    columns: &ColumnNames,
) -> Result<Record, LoadError> {
    let text = |position: usize| normalize_category(row.get(position).unwrap_or(""));
    let number = |position: usize, column: &str| -> Result<Option<f64>, LoadError> {
        let raw = row.get(position).unwrap_or("");
        parse_number(raw).map_err(|_| LoadError::InvalidNumber {
            row: row_number,
            column: column.to_string(),
            value: raw.to_string(),
        })
    };

    let score = number(positions.score, &columns.score)?.ok_or_else(|| LoadError::InvalidNumber {
        row: row_number,
        column: columns.score.clone(),
        value: String::new(),
    })?;

    let duration_minutes = match positions.duration {
        Some(position) => number(position, &columns.duration)?,
        None => None,
    };

    let subscores = schema
        .subcategories
        .iter()
        .map(|column| number(column.position, &column.name))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Record {
        name: text(positions.name),
        grade: text(positions.grade),
        gender: text(positions.gender),
        province: text(positions.province),
        city: text(positions.city),
        school: text(positions.school),
        category: text(positions.category),
        score,
        duration_minutes,
        subscores,
    })
}

pub fn schema_notices(schema: &Schema, columns: &ColumnNames, subcategory_pattern: &str) -> Vec<Notice> {
    let mut notices = Vec::new();
    if !schema.has_duration {
        notices.push(Notice::MissingOptionalColumn {
            column: columns.duration.clone(),
            feature: "duration/score correlation".to_string(),
        });
    }
    if schema.subcategories.is_empty() {
        notices.push(Notice::MissingOptionalColumn {
            column: subcategory_pattern.to_string(),
            feature: "sub-category strengths and weaknesses".to_string(),
        });
    }
    notices
}
