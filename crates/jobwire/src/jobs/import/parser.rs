use serde::{Deserialize, Deserializer};
use std::io::Read;

/// One data line of the upload, keyed by the exact header names the board
/// publishes in its CSV template. Blank cells collapse to `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CsvJobRow {
    #[serde(rename = "Title", default, deserialize_with = "empty_string_as_none")]
    pub title: Option<String>,
    #[serde(rename = "Company", default, deserialize_with = "empty_string_as_none")]
    pub company: Option<String>,
    #[serde(rename = "Category", default, deserialize_with = "empty_string_as_none")]
    pub category: Option<String>,
    #[serde(
        rename = "Description",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub description: Option<String>,
    #[serde(rename = "Salary", default, deserialize_with = "empty_string_as_none")]
    pub salary: Option<String>,
    #[serde(rename = "Location", default, deserialize_with = "empty_string_as_none")]
    pub location: Option<String>,
    #[serde(
        rename = "Requirements",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub requirements: Option<String>,
    #[serde(rename = "Benefits", default, deserialize_with = "empty_string_as_none")]
    pub benefits: Option<String>,
}

fn reader_for<R: Read>(reader: R) -> csv::Reader<R> {
    // Strict reading: ragged rows abort the whole run. Fully empty lines are
    // skipped by the csv crate itself.
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
}

/// Streams the input once purely to count data rows. The stream cannot be
/// rewound; processing requires a fresh reader.
pub fn count_rows<R: Read>(reader: R) -> Result<u64, csv::Error> {
    let mut csv_reader = reader_for(reader);
    let mut total = 0u64;
    for record in csv_reader.records() {
        record?;
        total += 1;
    }
    Ok(total)
}

/// Lazy single-pass sequence of parsed rows.
pub fn rows<R: Read>(reader: R) -> impl Iterator<Item = Result<CsvJobRow, csv::Error>> {
    reader_for(reader).into_deserialize::<CsvJobRow>()
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HEADER: &str = "Title,Company,Category,Description,Salary,Location,Requirements,Benefits";

    #[test]
    fn parses_rows_with_trimmed_values() {
        let csv = format!("{HEADER}\n  Chef , Bistro ,Food,,45000, Paris ,a; b,\n");
        let row = rows(Cursor::new(csv))
            .next()
            .expect("one row")
            .expect("row parses");

        assert_eq!(row.title.as_deref(), Some("Chef"));
        assert_eq!(row.company.as_deref(), Some("Bistro"));
        assert_eq!(row.salary.as_deref(), Some("45000"));
        assert_eq!(row.location.as_deref(), Some("Paris"));
        assert_eq!(row.requirements.as_deref(), Some("a; b"));
        assert_eq!(row.description, None);
        assert_eq!(row.benefits, None);
    }

    #[test]
    fn count_skips_fully_empty_lines() {
        let csv = format!("{HEADER}\nChef,Bistro,,,,Paris,,\n\nCook,Diner,,,,Lyon,,\n");
        assert_eq!(count_rows(Cursor::new(csv)).expect("counts"), 2);
    }

    #[test]
    fn header_only_input_counts_zero() {
        let csv = format!("{HEADER}\n");
        assert_eq!(count_rows(Cursor::new(csv)).expect("counts"), 0);
        assert!(rows(Cursor::new(format!("{HEADER}\n"))).next().is_none());
    }

    #[test]
    fn ragged_row_surfaces_stream_error() {
        let csv = format!("{HEADER}\nChef,Bistro\n");
        let error = count_rows(Cursor::new(csv));
        assert!(error.is_err());

        let csv = format!("{HEADER}\nChef,Bistro\n");
        let first = rows(Cursor::new(csv)).next().expect("item yielded");
        assert!(first.is_err());
    }

    #[test]
    fn missing_optional_columns_default_to_none() {
        let csv = "Title,Company,Location\nChef,Bistro,Paris\n";
        let row = rows(Cursor::new(csv))
            .next()
            .expect("one row")
            .expect("row parses");
        assert_eq!(row.title.as_deref(), Some("Chef"));
        assert_eq!(row.category, None);
        assert_eq!(row.requirements, None);
    }
}
