//! Small, pure helpers used by the engine APIs.
mod business_day;
mod messages;
mod phone;
mod signature;

pub use business_day::{business_day, month_period, FeedWindow};
pub use messages::compose_delivery_message;
pub use phone::normalize_phone;
pub use signature::{calculate_hmac, verify_hmac};

use rand::{distributions::Alphanumeric, Rng};

const API_KEY_LENGTH: usize = 40;

/// Generates a random alphanumeric API key, prefixed with `cmd_` so that leaked keys are easy to spot.
pub fn generate_api_key() -> String {
    let key: String = rand::thread_rng().sample_iter(&Alphanumeric).take(API_KEY_LENGTH).map(char::from).collect();
    format!("cmd_{key}")
}
