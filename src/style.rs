//! Terminal styling utilities
//!
//! Consistent colors for the banner, summary and per-session lines.
//! Uses crossterm for cross-platform terminal colors.

use crate::swarm::{SwarmEvent, SwarmStats};
use crossterm::style::{StyledContent, Stylize};

/// Session state colors
/// - active: Green
/// - connecting: Yellow
/// - disconnected: Dim
/// - failed: Red
pub fn state_style(state: &str) -> StyledContent<String> {
    match state.to_lowercase().as_str() {
        "active" => state.to_string().green(),
        "connecting" => state.to_string().yellow(),
        "disconnected" => state.to_string().dark_grey(),
        "failed" => state.to_string().red(),
        _ => state.to_string().white(),
    }
}

/// Count styling
/// - Zero: Dim
/// - Positive: Green for successes, red for failures
pub fn count_ok(n: usize) -> StyledContent<String> {
    if n == 0 {
        n.to_string().dark_grey()
    } else {
        n.to_string().green()
    }
}

pub fn count_failed(n: usize) -> StyledContent<String> {
    if n == 0 {
        n.to_string().dark_grey()
    } else {
        n.to_string().red()
    }
}

/// Section headers
pub fn header(text: &str) -> StyledContent<String> {
    text.to_string().bold()
}

/// Dim/muted text
pub fn dim(text: &str) -> StyledContent<String> {
    text.to_string().dark_grey()
}

/// Success text
pub fn success(text: &str) -> StyledContent<String> {
    text.to_string().green()
}

/// Warning text
pub fn warning(text: &str) -> StyledContent<String> {
    text.to_string().yellow()
}

/// Error text
pub fn error(text: &str) -> StyledContent<String> {
    text.to_string().red()
}

/// Bot identity styling
pub fn identity(name: &str) -> StyledContent<String> {
    name.to_string().cyan()
}

/// Server address styling
pub fn endpoint(addr: &str) -> StyledContent<String> {
    addr.to_string().blue()
}

/// Startup banner
pub fn banner() -> String {
    format!(
        "{}\n{}",
        header("botswarm"),
        dim("bot swarm load generator (Ctrl+C to stop)")
    )
}

/// Ramp-up summary block
pub fn summary(stats: &SwarmStats) -> String {
    let mut lines = vec![
        header("Ramp-up complete").to_string(),
        format!("  Elapsed:    {:.2}s", stats.elapsed.as_secs_f64()),
        format!("  Successful: {}", count_ok(stats.succeeded_initial)),
        format!("  Failed:     {}", count_failed(stats.failed_initial)),
    ];
    if stats.failed_initial > 0 {
        lines.push(
            dim(&format!(
                "              ({} timed out, {} errored)",
                stats.failed_timeout, stats.failed_error
            ))
            .to_string(),
        );
    }
    lines.join("\n")
}

/// One line per lifecycle event worth showing after the ramp
///
/// Action events are left to the log.
pub fn event_line(event: &SwarmEvent) -> Option<String> {
    match event {
        SwarmEvent::Disconnected { identity: id, reason } => Some(format!(
            "{} {} {}",
            warning("⚠"),
            identity(id),
            dim(&format!("disconnected: {}", reason))
        )),
        SwarmEvent::Reconnecting { identity: id, delay } => Some(format!(
            "{} {} {}",
            dim("↻"),
            identity(id),
            dim(&format!("reconnecting in {}ms", delay.as_millis()))
        )),
        SwarmEvent::Reconnected { identity: id, .. } => Some(format!(
            "{} {} {}",
            success("✓"),
            identity(id),
            state_style("active")
        )),
        SwarmEvent::ReconnectFailed { identity: id, error: e } => Some(format!(
            "{} {} {}",
            error("✗"),
            identity(id),
            dim(&format!("reconnect failed: {}", e))
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_state_colors() {
        // Just ensure they don't panic
        let _ = state_style("active");
        let _ = state_style("connecting");
        let _ = state_style("disconnected");
        let _ = state_style("failed");
    }

    #[test]
    fn test_summary_mentions_counts() {
        let mut stats = SwarmStats::new(3);
        stats.record_success();
        stats.finish(Duration::from_millis(1250));

        let text = summary(&stats);
        assert!(text.contains("1.25s"));
        assert!(text.contains("Successful"));
        assert!(!text.contains("timed out"));
    }

    #[test]
    fn test_event_lines() {
        let line = event_line(&SwarmEvent::Reconnecting {
            identity: "Abc12345".into(),
            delay: Duration::from_millis(1500),
        });
        assert!(line.unwrap().contains("1500ms"));

        let none = event_line(&SwarmEvent::SessionActive {
            identity: "Abc12345".into(),
        });
        assert!(none.is_none());
    }
}
