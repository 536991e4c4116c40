use std::path::Path;

use super::parser::CsvJobRow;

/// Column layout of the downloadable error report.
pub const REPORT_HEADER: [&str; 10] = [
    "Row",
    "Title",
    "Company",
    "Category",
    "Description",
    "Salary",
    "Location",
    "Requirements",
    "Benefits",
    "Error",
];

/// A rejected row paired with its 1-based position and the rejection reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRow {
    pub row_number: u64,
    pub row: CsvJobRow,
    pub reason: String,
}

/// In-memory accumulation of rejected rows, flushed to a CSV file at run end.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    rows: Vec<FailedRow>,
}

impl ErrorCollector {
    pub fn push(&mut self, row_number: u64, row: CsvJobRow, reason: impl Into<String>) {
        self.rows.push(FailedRow {
            row_number,
            row,
            reason: reason.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[FailedRow] {
        &self.rows
    }

    /// Serializes the collection with `csv::Writer` so embedded commas and
    /// quotes stay intact when the report is re-parsed.
    pub fn write_report(&self, path: &Path) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(REPORT_HEADER)?;

        for failed in &self.rows {
            let row = &failed.row;
            writer.write_record([
                failed.row_number.to_string().as_str(),
                row.title.as_deref().unwrap_or(""),
                row.company.as_deref().unwrap_or(""),
                row.category.as_deref().unwrap_or(""),
                row.description.as_deref().unwrap_or(""),
                row.salary.as_deref().unwrap_or(""),
                row.location.as_deref().unwrap_or(""),
                row.requirements.as_deref().unwrap_or(""),
                row.benefits.as_deref().unwrap_or(""),
                failed.reason.as_str(),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_report_path(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!(
            "jobwire-report-test-{tag}-{}.csv",
            std::process::id()
        ))
    }

    #[test]
    fn report_preserves_row_numbers_and_reasons() {
        let mut collector = ErrorCollector::default();
        collector.push(
            2,
            CsvJobRow {
                title: Some("Chef".to_string()),
                ..CsvJobRow::default()
            },
            "Missing required fields",
        );
        assert_eq!(collector.len(), 1);
        assert!(!collector.is_empty());

        let path = unique_report_path("rows");
        collector.write_report(&path).expect("report writes");

        let content = std::fs::read_to_string(&path).expect("report readable");
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some(REPORT_HEADER.join(",").as_str()));
        let data = lines.next().expect("one data row");
        assert!(data.starts_with("2,Chef,"));
        assert!(data.ends_with("Missing required fields"));
        assert_eq!(lines.next(), None);

        std::fs::remove_file(&path).expect("cleanup");
    }

    #[test]
    fn report_quotes_fields_containing_commas() {
        let mut collector = ErrorCollector::default();
        collector.push(
            1,
            CsvJobRow {
                title: Some("Chef, Head of Kitchen".to_string()),
                company: Some("Bistro".to_string()),
                ..CsvJobRow::default()
            },
            "Missing required fields",
        );

        let path = unique_report_path("quoting");
        collector.write_report(&path).expect("report writes");

        // Re-parse with a CSV reader: the quoted comma must survive intact.
        let mut reader = csv::Reader::from_path(&path).expect("report re-parses");
        let records: Vec<csv::StringRecord> = reader
            .records()
            .collect::<Result<_, _>>()
            .expect("all records parse");
        assert_eq!(records.len(), collector.len());
        assert_eq!(records[0].get(1), Some("Chef, Head of Kitchen"));

        std::fs::remove_file(&path).expect("cleanup");
    }
}
