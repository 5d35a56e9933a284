use std::str::FromStr;
use tracing::Level;

/// Parse a level name such as "info" or "DEBUG", falling back to INFO.
pub fn parse_level(level: &str) -> Level {
    Level::from_str(level.trim()).unwrap_or(Level::INFO)
}

/// Install the global fmt subscriber. `log` records (actix-web's request
/// logger included) are bridged into it.
pub fn init_logging(level: &str) -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_max_level(parse_level(level))
        .with_target(true)
        .try_init()
        .map_err(|e| format!("Failed to install tracing subscriber: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level(" WARN "), Level::WARN);
        assert_eq!(parse_level("verbose"), Level::INFO);
    }
}
