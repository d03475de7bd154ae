//! CSV report output

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::info;
use url::Url;

use crate::aggregate::ImageRecord;
use crate::error::Result;

/// Column headers of the image report
pub const REPORT_HEADERS: [&str; 11] = [
    "Image_url",
    "Alt_text",
    "Title",
    "Longdesc",
    "Aria_label",
    "Aria_describedby",
    "Count",
    "Source_URLs",
    "Size (KB)",
    "Date",
    "Suggestions",
];

/// Identifier of a scan input used in report names
///
/// URLs map to their host, file paths to their stem.
pub fn input_id(input: &str) -> String {
    let raw = Url::parse(input)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .or_else(|| {
            Path::new(input)
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "scan".to_string());

    raw.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

/// `{input-id}_{scan-type}_{sample-size}_images_{YYYY-MM-DD}.csv`
pub fn report_file_name(input: &str, scan_type: &str, sample_size: usize, date: NaiveDate) -> String {
    format!(
        "{}_{}_{}_images_{}.csv",
        input_id(input),
        scan_type,
        sample_size,
        date.format("%Y-%m-%d")
    )
}

/// Full path of the report inside `output_dir`
pub fn report_path(
    output_dir: &Path,
    input: &str,
    scan_type: &str,
    sample_size: usize,
    date: NaiveDate,
) -> PathBuf {
    output_dir.join(report_file_name(input, scan_type, sample_size, date))
}

fn report_row(record: &ImageRecord, date: &str) -> [String; 11] {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    [
        record.image_url.clone(),
        text(&record.alt_text),
        text(&record.title),
        text(&record.longdesc),
        text(&record.aria_label),
        text(&record.aria_describedby_text),
        record.count.to_string(),
        record
            .source_urls
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", "),
        format!("{:.2}", record.size_kb),
        date.to_string(),
        record.suggestions.join("; "),
    ]
}

/// Write the image report to `path`
pub fn write_report<'a>(
    path: &Path,
    records: impl IntoIterator<Item = &'a ImageRecord>,
    date: NaiveDate,
) -> Result<usize> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(REPORT_HEADERS)?;

    let date = date.format("%Y-%m-%d").to_string();
    let mut rows = 0;
    for record in records {
        writer.write_record(report_row(record, &date))?;
        rows += 1;
    }
    writer.flush()?;

    info!("Data saved to {}", path.display());
    Ok(rows)
}
