//! Terminal color constants for CLI output.

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";
pub const RED: &str = "\x1b[31m";

/// Green "yes" or dim "no".
pub fn yes_no(value: bool) -> String {
    if value {
        format!("{}yes{}", GREEN, RESET)
    } else {
        format!("{}no{}", DIM, RESET)
    }
}
