/// Normalizes a customer phone number to the international, digits-only format expected by the messaging API.
///
/// All non-digit characters and any leading trunk zeros are dropped. A number of 10 or 11 digits is taken to be a
/// local number (area code + subscriber) and gets `country_code` prepended. Anything else is assumed to already carry
/// a country code and is returned as-is, so normalizing twice gives the same result.
///
/// Returns `None` if the input contains no digits at all.
pub fn normalize_phone(raw: &str, country_code: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return None;
    }
    match digits.len() {
        10 | 11 => Some(format!("{country_code}{digits}")),
        _ => Some(digits.to_string()),
    }
}
