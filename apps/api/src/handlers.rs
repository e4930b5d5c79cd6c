pub mod assignments;
pub mod authorization;
pub mod health;
pub mod lifecycle;
pub mod org;
pub mod security;

use std::str::FromStr;

use orgauth_core::AppError;

/// Parses a path or body identifier.
fn parse_id<T>(value: &str) -> Result<T, AppError>
where
    T: FromStr<Err = AppError>,
{
    T::from_str(value)
}
