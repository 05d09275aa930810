mod cli;
pub mod error;

use error::AppError;

pub fn run() -> Result<(), AppError> {
    cli::run()
}
