mod cents;
mod helpers;

pub mod op;
mod secret;

pub use cents::{Cents, CentsConversionError, CURRENCY_CODE};
pub use helpers::{env_flag, parse_boolean_flag};
pub use secret::Secret;
