mod bulk;
mod cli;
mod infra;
mod routes;
mod server;

use jobwire::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
