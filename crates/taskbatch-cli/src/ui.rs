//! UI helpers for CLI display.

use console::style;

use taskbatch_orchestration::interfaces::TaskStatus;

/// Check if color output is disabled via `NO_COLOR` env var.
#[must_use]
pub fn is_color_disabled() -> bool {
    std::env::var("NO_COLOR").is_ok()
}

/// A styled header line.
#[must_use]
pub fn header(text: &str) -> String {
    let plain = format!("=== {text} ===");
    if is_color_disabled() {
        plain
    } else {
        style(plain).bold().cyan().to_string()
    }
}

/// Bracketed status tag, coloured by outcome.
#[must_use]
pub fn status_tag(status: &TaskStatus) -> String {
    let plain = format!("[{}]", status.label());
    if is_color_disabled() {
        return plain;
    }
    let styled = style(plain).bold();
    let coloured = match status {
        TaskStatus::Completed { .. } => styled.green(),
        TaskStatus::Failed { .. } => styled.red(),
        TaskStatus::TimedOut { .. } => styled.yellow(),
    };
    coloured.to_string()
}

/// Print an error message to stderr.
pub fn print_error(text: &str) {
    if is_color_disabled() {
        eprintln!("[ERROR] {text}");
    } else {
        eprintln!("{} {text}", style("[ERROR]").red().bold());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_contains_text() {
        assert!(header("Power").contains("=== Power ==="));
    }

    #[test]
    fn status_tags_contain_label() {
        assert!(status_tag(&TaskStatus::Completed { value: 1.0 }).contains("[OK]"));
        assert!(status_tag(&TaskStatus::Failed {
            error: "x".into()
        })
        .contains("[FAILED]"));
        assert!(status_tag(&TaskStatus::TimedOut { stopped: true }).contains("[TIMED OUT]"));
    }

    #[test]
    fn print_error_does_not_panic() {
        print_error("Something went wrong");
        print_error("");
    }
}
