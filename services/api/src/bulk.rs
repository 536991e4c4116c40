use crate::infra::InMemoryJobBoardRepository;
use clap::Args;
use jobwire::config::AppConfig;
use jobwire::error::AppError;
use jobwire::jobs::domain::{UserId, UserRole};
use jobwire::jobs::import::BulkJobImporter;
use jobwire::jobs::repository::{JobBoardRepository, JobQuery};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// CSV file to import
    #[arg(long)]
    pub(crate) file: PathBuf,
    /// User id recorded as the uploader and poster of the imported jobs
    #[arg(long, default_value_t = 1)]
    pub(crate) uploader: u64,
    /// Override the staging directory for temp files and error reports
    #[arg(long)]
    pub(crate) temp_dir: Option<PathBuf>,
}

/// Runs the full pipeline synchronously against the in-memory store and
/// prints the outcome, mirroring what the upload endpoint does in the
/// background.
pub(crate) fn run_import(args: ImportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;

    let contents = std::fs::read(&args.file)?;
    let filename = args
        .file
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload.csv");

    let repository = Arc::new(InMemoryJobBoardRepository::default());
    let temp_dir = args.temp_dir.unwrap_or(config.import.temp_dir);
    let importer = BulkJobImporter::new(repository.clone(), temp_dir);

    let uploader = UserId(args.uploader);
    let pending = importer.begin(uploader, filename, &contents)?;
    println!(
        "Import {} started for {} ({} bytes)",
        pending.history_id.0,
        filename,
        contents.len()
    );

    let summary = importer.run(pending);
    println!(
        "Import {} {}: {} rows, {} imported, {} rejected",
        summary.history_id.0,
        summary.status.label(),
        summary.total,
        summary.success,
        summary.errors
    );
    if let Some(report) = &summary.error_file {
        println!("Error report written to {}", report.display());
    }

    let page = repository.list_jobs(JobQuery {
        posted_by: Some(uploader),
        page: 1,
        limit: summary.success.max(1),
        ..JobQuery::default()
    })?;
    if !page.jobs.is_empty() {
        println!("Imported postings (as {}):", UserRole::Employer.label());
        for job in page.jobs {
            println!(
                "- {} at {} ({})",
                job.posting.title, job.posting.company, job.posting.location
            );
        }
    }

    Ok(())
}
