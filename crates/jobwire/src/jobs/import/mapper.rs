use super::parser::CsvJobRow;
use crate::jobs::domain::JobDraft;

/// Rejection raised for a row missing any of Title, Company, or Location.
/// The message is what lands in the error report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Missing required fields")]
pub struct RowValidationError;

/// Pure transform from a parsed CSV row to a job posting payload.
///
/// Title, Company, and Location are mandatory. Category and Description
/// default to empty strings, Salary stays optional, and the two list columns
/// split on `;` with per-item trimming.
pub fn map_row(row: &CsvJobRow) -> Result<JobDraft, RowValidationError> {
    let (Some(title), Some(company), Some(location)) =
        (row.title.as_deref(), row.company.as_deref(), row.location.as_deref())
    else {
        return Err(RowValidationError);
    };

    Ok(JobDraft {
        title: title.to_string(),
        company: company.to_string(),
        category: row.category.clone().unwrap_or_default(),
        description: row.description.clone().unwrap_or_default(),
        salary: row.salary.clone(),
        location: location.to_string(),
        requirements: split_list(row.requirements.as_deref()),
        benefits: split_list(row.benefits.as_deref()),
    })
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(';')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}
