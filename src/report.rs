use crate::aggregate::{AggregateResults, GroupCount, GroupMean};
use crate::error::Notice;
use crate::filter::{Dimension, FilterSelection, FilteredView};
use crate::options::OptionIndex;
use anyhow::{Context, Result};
use csv::Writer;
use std::fs;
use std::path::Path;
use tracing::info;

pub const NO_DATA: &str = "no data";
const MISSING: &str = "(missing)";

/// Two-decimal display of a statistic, or the "no data" marker.
pub fn format_stat(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => NO_DATA.to_string(),
    }
}

fn key_or_missing(key: &Option<String>) -> &str {
    key.as_deref().unwrap_or(MISSING)
}

fn push_counts(content: &mut String, title: &str, groups: &[GroupCount]) {
    content.push_str(&format!("{}:\n", title));
    if groups.is_empty() {
        content.push_str(&format!("   {}\n", NO_DATA));
    }
    for group in groups {
        content.push_str(&format!("   {:<30} {}\n", key_or_missing(&group.key), group.count));
    }
    content.push('\n');
}

fn push_means(content: &mut String, title: &str, groups: &[GroupMean]) {
    content.push_str(&format!("{}:\n", title));
    if groups.is_empty() {
        content.push_str(&format!("   {}\n", NO_DATA));
    }
    for (i, group) in groups.iter().enumerate() {
        content.push_str(&format!(
            "   {:>2}. {:<30} {:>7.2} ({} participants)\n",
            i + 1,
            group.key,
            group.mean,
            group.count,
        ));
    }
    content.push('\n');
}

pub fn render_summary(results: &AggregateResults, selection: &FilterSelection, notices: &[Notice]) -> String {
    let mut content = String::new();
    content.push_str("Bebras Challenge Results\n");
    content.push_str("========================\n\n");

    match selection.describe() {
        Some(active) => {
            content.push_str(&format!("Active filters: {}\n\n", active));
        }
        None => content.push_str("Showing all data.\n\n"),
    }

    let summary = &results.summary;
    content.push_str(&format!("Participants:  {}\n", summary.count));
    content.push_str(&format!("Mean score:    {}\n", format_stat(summary.mean)));
    content.push_str(&format!("Highest score: {}\n", format_stat(summary.max)));
    content.push_str(&format!("Lowest score:  {}\n\n", format_stat(summary.min)));

    if let Some(spread) = &results.spread {
        content.push_str(&format!(
            "Score spread: min {:.2} | Q1 {:.2} | median {:.2} | Q3 {:.2} | max {:.2}\n\n",
            spread.min,
            spread.q1,
            spread.median,
            spread.q3,
            spread.max,
        ));
    }

    if !results.histogram.is_empty() {
        content.push_str("Score distribution:\n");
        for bin in &results.histogram {
            content.push_str(&format!(
                "   {:>7.2} - {:<7.2} {:>5} {}\n",
                bin.lower,
                bin.upper,
                bin.count,
                "#".repeat(bin.count.min(50)),
            ));
        }
        content.push('\n');
    }

    push_counts(&mut content, "By gender", &results.gender_counts);
    push_counts(&mut content, "By grade", &results.grade_counts);
    push_counts(&mut content, "By province", &results.province_counts);
    push_counts(&mut content, "By city/regency", &results.city_counts);

    push_means(&mut content, "Mean score per category", &results.category_means);
    push_means(&mut content, "Mean score per province", &results.province_means);
    push_means(
        &mut content,
        &format!("Top {} schools by mean score", results.top_schools.len()),
        &results.top_schools,
    );

    if let Some(insight) = &results.subcategories {
        content.push_str("Mean score per question topic:\n");
        for topic in &insight.means {
            content.push_str(&format!("   {:<30} {}\n", topic.name, format_stat(topic.mean)));
        }
        if let Some(strength) = &insight.strength {
            content.push_str(&format!("   Strongest: {} ({})\n", strength.name, format_stat(strength.mean)));
        }
        if let Some(weakness) = &insight.weakness {
            content.push_str(&format!("   Weakest:   {} ({})\n", weakness.name, format_stat(weakness.mean)));
        }
        content.push('\n');
    }

    if let Some(correlation) = &results.correlation {
        let label = correlation.strength.map(|s| s.label()).unwrap_or(NO_DATA);
        content.push_str(&format!(
            "Duration vs score correlation: {} ({}, n = {})\n\n",
            format_stat(correlation.coefficient),
            label,
            correlation.sample_size,
        ));
    }

    content.push_str(&format!("Top {} participants:\n", results.top_participants.len()));
    if results.top_participants.is_empty() {
        content.push_str(&format!("   {}\n", NO_DATA));
    }
    for participant in &results.top_participants {
        content.push_str(&format!(
            "   {:>2}. {:<25} {:<5} {:<30} {:<20} {:>7.2}\n",
            participant.rank,
            key_or_missing(&participant.name),
            key_or_missing(&participant.grade),
            key_or_missing(&participant.school),
            key_or_missing(&participant.city),
            participant.score,
        ));
    }

    if !notices.is_empty() {
        content.push_str("\nNotices:\n");
        for notice in notices {
            content.push_str(&format!("   ! {}\n", notice));
        }
    }

    content
}

/// Values a user could pick per dimension, with cities and grades narrowed by the selection.
pub fn render_options(index: &OptionIndex, selection: &FilterSelection) -> String {
    let mut content = String::new();
    for dimension in Dimension::ALL {
        let values = index.offerable(dimension, selection);
        content.push_str(&format!("{} ({}):\n", dimension, values.len()));
        for value in values {
            content.push_str(&format!("   {}\n", value));
        }
    }
    content
}

pub fn write_reports(
    results: &AggregateResults,
    view: &FilteredView<'_>,
    selection: &FilterSelection,
    notices: &[Notice],
    output_dir: &Path,
) -> Result<()> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    fs::write(output_dir.join("summary.txt"), render_summary(results, selection, notices))?;
    write_top_participants(results, output_dir)?;
    write_school_means(results, output_dir)?;
    write_filtered_records(view, output_dir)?;

    let json = serde_json::to_string_pretty(results)?;
    fs::write(output_dir.join("results.json"), json)?;

    info!(directory = %output_dir.display(), "reports written");
    Ok(())
}

fn write_top_participants(results: &AggregateResults, output_dir: &Path) -> Result<()> {
    let mut writer = Writer::from_path(output_dir.join("top_participants.csv"))?;
    writer.write_record(["Rank", "Name", "Grade", "School", "City/Regency", "Score"])?;
    for participant in &results.top_participants {
        writer.write_record([
            participant.rank.to_string().as_str(),
            participant.name.as_deref().unwrap_or(""),
            participant.grade.as_deref().unwrap_or(""),
            participant.school.as_deref().unwrap_or(""),
            participant.city.as_deref().unwrap_or(""),
            format!("{:.2}", participant.score).as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_school_means(results: &AggregateResults, output_dir: &Path) -> Result<()> {
    let mut writer = Writer::from_path(output_dir.join("school_means.csv"))?;
    writer.write_record(["School", "Mean Score", "Participants"])?;
    for school in &results.top_schools {
        writer.write_record([
            school.key.as_str(),
            format!("{:.2}", school.mean).as_str(),
            school.count.to_string().as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_filtered_records(view: &FilteredView<'_>, output_dir: &Path) -> Result<()> {
    let mut writer = Writer::from_path(output_dir.join("filtered_records.csv"))?;
    writer.write_record(["Name", "Grade", "School", "City/Regency", "Score"])?;
    for record in view.iter() {
        writer.write_record([
            record.name.as_deref().unwrap_or(""),
            record.grade.as_deref().unwrap_or(""),
            record.school.as_deref().unwrap_or(""),
            record.city.as_deref().unwrap_or(""),
            record.score.to_string().as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::AggregateSettings;
    use crate::dashboard::recompute;
    use crate::models::Dataset;

    #[test]
    fn empty_statistics_show_no_data() {
        assert_eq!(format_stat(None), "no data");
        assert_eq!(format_stat(Some(70.0)), "70.00");
        assert_eq!(format_stat(Some(10.333)), "10.33");
    }

    #[test]
    fn summary_of_empty_dataset_mentions_no_data() {
        let results = recompute(&Dataset::default(), &FilterSelection::new(), AggregateSettings::default());
        let text = render_summary(&results, &FilterSelection::new(), &[]);
        assert!(text.contains("Showing all data."));
        assert!(text.contains("Mean score:    no data"));
        assert!(!text.contains("Notices"));
    }

    #[test]
    fn ignored_filter_values_appear_in_summary() {
        let results = recompute(&Dataset::default(), &FilterSelection::new(), AggregateSettings::default());
        let notices = vec![Notice::IgnoredFilterValue {
            dimension: "City".to_string(),
            value: "Bandung".to_string(),
        }];
        let text = render_summary(&results, &FilterSelection::new(), &notices);
        assert!(text.contains("Notices:"));
        assert!(text.contains("City `Bandung` is not offered under the current selection, ignored"));
    }
}
