//! Pretty-printing messages to the console

use colored::Colorize;

use crate::error::Error;

/// Pretty-print an error or warning to the console, colored by severity.
pub fn diagnostic(err: &Error) {
    if err.is_warning() {
        eprintln!("{}", err.to_string().yellow());
    } else {
        eprintln!("{}", err.to_string().red().bold());
    }
}

/// Pretty-print a top-level failure (not tied to a source line) to the console.
pub fn error(message: impl AsRef<str>) {
    let title = "error:".red().bold();
    eprintln!("{} {}", title, message.as_ref());
}

/// Pretty-print informational status to the console.
pub fn info(message: impl AsRef<str>) {
    println!("{}", message.as_ref().green());
}

/// Print a source-line notice that doesn't count toward the error or
/// warning totals — acknowledgements and defaulted-value notices.
pub fn warn_note(file: &str, line: u32, message: &str) {
    eprintln!("{}", format!("{}:{}: note: {}", file, line, message).yellow());
}
