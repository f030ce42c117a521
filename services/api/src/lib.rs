mod cli;
mod infra;
mod routes;
mod server;

pub use cli::ServeArgs;
pub use infra::StatusState;
pub use routes::status_router;
pub use server::serve;

use citation_core::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
