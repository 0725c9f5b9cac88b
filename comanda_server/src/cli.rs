use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Secrets are left out on purpose
    const DISPLAY_ENVS: [&str; 14] = [
        "RUST_LOG",
        "COMANDA_HOST",
        "COMANDA_PORT",
        "COMANDA_DATABASE_URL",
        "COMANDA_SESSION_TTL_HOURS",
        "COMANDA_TIMEZONE",
        "COMANDA_DEFAULT_COUNTRY_CODE",
        "COMANDA_FEED_INTERVAL_SECS",
        "COMANDA_FEED_MAX_ORDERS",
        "COMANDA_USE_X_FORWARDED_FOR",
        "COMANDA_USE_FORWARDED",
        "WHATSAPP_GRAPH_URL",
        "WHATSAPP_API_VERSION",
        "WHATSAPP_PHONE_NUMBER_ID",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
