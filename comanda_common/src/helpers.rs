use std::env;

/// Interprets the usual spellings of a yes/no setting (`1/0`, `true/false`, `yes/no`, `on/off`, in any case).
/// Missing or unrecognised values give `default`.
pub fn parse_boolean_flag<S: AsRef<str>>(value: Option<S>, default: bool) -> bool {
    let Some(value) = value else {
        return default;
    };
    match value.as_ref().trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Reads the boolean setting `name` from the environment.
pub fn env_flag(name: &str, default: bool) -> bool {
    parse_boolean_flag(env::var(name).ok(), default)
}
