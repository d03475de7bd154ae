//! Alt text generation over an image report CSV
//!
//! Every row of the input is copied to the output with one extra column
//! holding the generated text, or an error message for that row.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use csv::StringRecord;
use tracing::{info, instrument, warn};

use super::error::GenerationError;
use super::prompt::build_prompt;
use super::{GenerationRequest, TextGenerator};
use crate::progress::{ProgressEvent, ProgressSender, report};

/// Column appended to the output
pub const GENERATED_COLUMN: &str = "Generated Alt Text";

/// Row value when the image URL is missing
pub const MISSING_IMAGE_URL: &str = "Error: Missing image URL";

/// Instructions used when the user gives none
pub const DEFAULT_INSTRUCTIONS: &str = "Provide meaningful, concise alternative text for images, \
adhering to accessibility standards (WCAG 1.1.1).";

/// The columns of a report row that feed the prompt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlInputRow {
    /// `Image_url`
    pub image_url: Option<String>,

    /// `Alt_text`
    pub alt_text: Option<String>,

    /// `Title`
    pub title: Option<String>,

    /// `Source_URLs`
    pub source_urls: Option<String>,
}

impl CrawlInputRow {
    /// Read the named columns of a record, treating blank cells as missing
    pub fn from_record(headers: &StringRecord, record: &StringRecord) -> Self {
        let field = |name: &str| {
            headers
                .iter()
                .position(|header| header.trim() == name)
                .and_then(|index| record.get(index))
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        Self {
            image_url: field("Image_url"),
            alt_text: field("Alt_text"),
            title: field("Title"),
            source_urls: field("Source_URLs"),
        }
    }
}

/// Counts from one batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationSummary {
    /// Rows read
    pub rows: usize,

    /// Rows that received generated text
    pub generated: usize,

    /// Rows that received an error message
    pub failed: usize,
}

/// `{stem}_with_alt_text_{YYYYmmdd_HHMMSS}.csv` next to the input
pub fn output_path(input: &Path, timestamp: NaiveDateTime) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "images".to_string());
    input.with_file_name(format!(
        "{}_with_alt_text_{}.csv",
        stem,
        timestamp.format("%Y%m%d_%H%M%S")
    ))
}

/// Generate alt text for every row of `input` and write the result to `output`
#[instrument(skip(generator, instructions, progress))]
pub async fn generate_csv<G: TextGenerator>(
    input: &Path,
    output: &Path,
    generator: &G,
    instructions: &str,
    progress: Option<&ProgressSender>,
) -> Result<GenerationSummary, GenerationError> {
    info!("Loading CSV file from: {}", input.display());
    let mut reader = csv::Reader::from_path(input)?;
    let headers = reader.headers()?.clone();
    let records = reader.records().collect::<Result<Vec<_>, _>>()?;
    info!("Processing {} rows", records.len());

    let existing_column = headers.iter().position(|header| header == GENERATED_COLUMN);
    let mut output_headers = headers.clone();
    if existing_column.is_none() {
        output_headers.push_field(GENERATED_COLUMN);
    }

    let mut writer = csv::Writer::from_path(output)?;
    writer.write_record(&output_headers)?;

    report(
        progress,
        ProgressEvent::Started {
            stage: "Generating alt text",
            total: records.len() as u64,
        },
    )
    .await;

    let mut summary = GenerationSummary {
        rows: records.len(),
        ..GenerationSummary::default()
    };

    for (index, record) in records.iter().enumerate() {
        let row = CrawlInputRow::from_record(&headers, record);
        let generated = match row.image_url.as_deref() {
            None => {
                warn!("Row {} is missing an Image URL. Skipping.", index + 1);
                summary.failed += 1;
                MISSING_IMAGE_URL.to_string()
            }
            Some(image_url) => {
                let request = GenerationRequest {
                    image_url: image_url.to_string(),
                    prompt: build_prompt(&row, instructions),
                };
                match generator.generate(&request).await {
                    Ok(text) => {
                        summary.generated += 1;
                        text
                    }
                    Err(e) => {
                        warn!("Error generating alt text for {}: {}", image_url, e);
                        summary.failed += 1;
                        format!("Error generating alt text: {}", e)
                    }
                }
            }
        };

        let mut out = record.clone();
        match existing_column {
            Some(column) => {
                out = out
                    .iter()
                    .enumerate()
                    .map(|(i, value)| if i == column { generated.as_str() } else { value })
                    .collect();
            }
            None => out.push_field(&generated),
        }
        writer.write_record(&out)?;

        report(
            progress,
            ProgressEvent::PageProcessed(row.image_url.unwrap_or_default()),
        )
        .await;
    }

    writer.flush()?;
    report(
        progress,
        ProgressEvent::Finished {
            stage: "Generating alt text",
        },
    )
    .await;
    info!("Processed CSV saved to: {}", output.display());
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::tempdir;

    /// Echoes the image URL, failing for URLs containing "broken"
    struct EchoGenerator;

    impl TextGenerator for EchoGenerator {
        async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
            if request.image_url.contains("broken") {
                Err(GenerationError::InvalidResponse("model offline".to_string()))
            } else {
                Ok(format!("text for {}", request.image_url))
            }
        }
    }

    #[test]
    fn test_output_path() {
        let timestamp = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(13, 4, 5)
            .unwrap();
        assert_eq!(
            output_path(Path::new("/tmp/reports/site_images.csv"), timestamp),
            PathBuf::from("/tmp/reports/site_images_with_alt_text_20240501_130405.csv")
        );
    }

    #[test]
    fn test_row_from_record() {
        let headers = StringRecord::from(vec!["Image_url", "Alt_text", "Title", "Count"]);
        let record = StringRecord::from(vec!["https://example.com/a.png", "  ", "Logo", "2"]);

        let row = CrawlInputRow::from_record(&headers, &record);
        assert_eq!(row.image_url.as_deref(), Some("https://example.com/a.png"));
        assert_eq!(row.alt_text, None);
        assert_eq!(row.title.as_deref(), Some("Logo"));
        assert_eq!(row.source_urls, None);
    }

    #[tokio::test]
    async fn test_generate_csv_appends_column() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("images.csv");
        let output = dir.path().join("out.csv");
        fs::write(
            &input,
            "Image_url,Alt_text,Count\n\
             https://example.com/a.png,,1\n\
             ,missing,1\n\
             https://example.com/broken.png,x,3\n",
        )
        .unwrap();

        let summary = generate_csv(&input, &output, &EchoGenerator, DEFAULT_INSTRUCTIONS, None)
            .await
            .unwrap();

        assert_eq!(
            summary,
            GenerationSummary {
                rows: 3,
                generated: 1,
                failed: 2
            }
        );

        let mut reader = csv::Reader::from_path(&output).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.get(3), Some(GENERATED_COLUMN));

        let rows: Vec<StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(&rows[0][3], "text for https://example.com/a.png");
        assert_eq!(&rows[0][2], "1");
        assert_eq!(&rows[1][3], MISSING_IMAGE_URL);
        assert_eq!(
            &rows[2][3],
            "Error generating alt text: Invalid response: model offline"
        );
    }

    #[tokio::test]
    async fn test_existing_generated_column_is_replaced() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("images.csv");
        let output = dir.path().join("out.csv");
        fs::write(
            &input,
            "Image_url,Generated Alt Text\nhttps://example.com/a.png,old\n",
        )
        .unwrap();

        generate_csv(&input, &output, &EchoGenerator, "", None)
            .await
            .unwrap();

        let contents = fs::read_to_string(&output).unwrap();
        assert_eq!(
            contents,
            "Image_url,Generated Alt Text\nhttps://example.com/a.png,text for https://example.com/a.png\n"
        );
    }
}
