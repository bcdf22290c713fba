//! End-of-run statistics
//!
//! Printed to stderr so they never mix with tool output on stdout.

use crate::walker::WalkResult;
use console::style;
use humansize::{format_size, BINARY};

/// Format a number with thousands separators
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Render the summary block
pub fn render_summary(tool: &str, result: &WalkResult) -> String {
    let mut lines = Vec::new();

    let title = if result.completed {
        format!("{} complete", tool)
    } else {
        format!("{} interrupted", tool)
    };
    lines.push(String::new());
    lines.push(if result.completed {
        style(title).green().bold().to_string()
    } else {
        style(title).yellow().bold().to_string()
    });
    lines.push(style("─".repeat(50)).dim().to_string());
    lines.push(format!("  {} {}", style("Workers:").bold(), result.workers));
    lines.push(format!(
        "  {} {}",
        style("Files:").bold(),
        format_number(result.files_processed)
    ));
    lines.push(format!(
        "  {} {}",
        style("Read:").bold(),
        format_size(result.bytes_read, BINARY)
    ));
    if result.matches > 0 {
        lines.push(format!(
            "  {} {}",
            style("Matches:").bold(),
            format_number(result.matches)
        ));
    }
    lines.push(format!(
        "  {} {:.2}s ({:.0} files/sec)",
        style("Duration:").bold(),
        result.duration.as_secs_f64(),
        result.files_per_second()
    ));
    lines.push(format!(
        "  {} {}",
        style("Queue full waits:").bold(),
        format_number(result.backpressure_events)
    ));
    let errors = result.files_failed + result.walk_errors;
    if errors > 0 {
        lines.push(format!(
            "  {} {}",
            style("Errors:").yellow().bold(),
            format_number(errors)
        ));
    }
    lines.push(String::new());

    lines.join("\n")
}

/// Print a summary of the run to stderr
pub fn print_summary(tool: &str, result: &WalkResult) {
    eprintln!("{}", render_summary(tool, result));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_number(1234567890), "1,234,567,890");
    }

    #[test]
    fn test_summary_mentions_errors_only_when_present() {
        console::set_colors_enabled(false);

        let mut result = WalkResult {
            files_queued: 3,
            files_processed: 3,
            files_failed: 0,
            walk_errors: 0,
            bytes_read: 2048,
            matches: 1200,
            backpressure_events: 0,
            workers: 2,
            duration: Duration::from_secs(1),
            completed: true,
        };

        let text = render_summary("fauxgrep", &result);
        assert!(text.contains("fauxgrep complete"));
        assert!(text.contains("Matches: 1,200"));
        assert!(text.contains("Read: 2 KiB"));
        assert!(!text.contains("Errors:"));

        result.files_failed = 1;
        result.completed = false;
        let text = render_summary("fauxgrep", &result);
        assert!(text.contains("fauxgrep interrupted"));
        assert!(text.contains("Errors: 1"));
    }
}
