mod cli;
mod infra;
mod routes;
mod server;

use travel_expense::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
