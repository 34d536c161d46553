/*!
 * Lifeline CLI Style System
 *
 * Themed text, tables and messages for the command line.
 */

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use console::{style, StyledObject};
use lifeline_sentinel::{CycleResult, MonitorStats, SubsystemEndpoint, TaskOutcome};

// ============================================================================
// THEME COLORS
// ============================================================================

/// Brand colors for consistent styling
pub struct Theme;

impl Theme {
    /// Primary accent color (cyan/blue)
    pub fn primary<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).cyan()
    }

    /// Success color (green)
    pub fn success<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).green()
    }

    /// Warning color (yellow)
    pub fn warning<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).yellow()
    }

    /// Error color (red)
    pub fn error<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).red()
    }

    /// Muted/secondary text (dim)
    pub fn muted<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).dim()
    }

    /// Header style (bold cyan)
    pub fn header<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).cyan().bold()
    }
}

// ============================================================================
// ICONS
// ============================================================================

/// Unicode icons for visual feedback
pub struct Icons;

impl Icons {
    pub const SUCCESS: &'static str = "✓";
    pub const ERROR: &'static str = "✗";
    pub const WARNING: &'static str = "⚠";
    pub const INFO: &'static str = "ℹ";
    pub const PENDING: &'static str = "○";
    pub const SHIELD: &'static str = "🛡";
    pub const SATELLITE: &'static str = "🛰";
}

/// Draw a section header with a line
pub fn section_header(title: &str) {
    let line_len = 50 - title.len().min(40);
    println!(
        "\n{} {}",
        Theme::header(title),
        Theme::muted("─".repeat(line_len))
    );
}

// ============================================================================
// TABLES
// ============================================================================

/// Create a table with the standard preset
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn header_cells(titles: &[&str]) -> Vec<Cell> {
    titles
        .iter()
        .map(|t| Cell::new(t).fg(Color::Cyan).add_attribute(Attribute::Bold))
        .collect()
}

/// Subsystem roster with the full URL each call goes to
pub fn roster_table(base_url: &str, roster: &[SubsystemEndpoint]) -> Table {
    let mut table = create_table();
    table.set_header(header_cells(&["Subsystem", "Endpoint"]));

    let base = base_url.trim_end_matches('/');
    for endpoint in roster {
        table.add_row(vec![
            Cell::new(&endpoint.id),
            Cell::new(format!("{}{}", base, endpoint.path)).fg(Color::DarkGrey),
        ]);
    }

    table
}

/// Per-task outcome of one cycle
pub fn cycle_table(result: &CycleResult) -> Table {
    let mut table = create_table();
    table.set_header(header_cells(&["Subsystem", "Outcome", "Time", "Details"]));

    for task in &result.tasks {
        let (outcome, details) = match task.outcome {
            TaskOutcome::Success { .. } => (
                Cell::new(format!("{} Success", Icons::SUCCESS)).fg(Color::Green),
                String::new(),
            ),
            TaskOutcome::Failure { ref reason } => (
                Cell::new(format!("{} Failed", Icons::ERROR)).fg(Color::Red),
                reason.clone(),
            ),
            TaskOutcome::Pending => (
                Cell::new(format!("{} Pending", Icons::PENDING)).fg(Color::Yellow),
                String::new(),
            ),
        };

        table.add_row(vec![
            Cell::new(&task.id),
            outcome,
            Cell::new(format!("{}ms", task.duration_ms)),
            Cell::new(details).fg(Color::DarkGrey),
        ]);
    }

    table
}

/// Monitor policy and counters
pub fn monitor_table(stats: &MonitorStats) -> Table {
    let mut table = create_table();
    table.set_header(header_cells(&["Setting", "Value"]));

    let rows = [
        ("Status", format!("{:?}", stats.status)),
        ("Threshold", stats.threshold.to_string()),
        ("Min consecutive", stats.min_consecutive_below.to_string()),
        ("Sample interval", format!("{}s", stats.sample_interval_secs)),
        ("Samples taken", stats.samples_taken.to_string()),
        ("Triggers fired", stats.triggers_fired.to_string()),
    ];
    for (name, value) in rows {
        table.add_row(vec![Cell::new(name), Cell::new(value)]);
    }

    table
}

// ============================================================================
// MESSAGES
// ============================================================================

/// Print a styled error message with an optional hint
pub fn print_error(message: &str, suggestion: Option<&str>) {
    eprintln!(
        "\n{} {}",
        Theme::error(format!("{} Error:", Icons::ERROR)),
        message
    );

    if let Some(hint) = suggestion {
        eprintln!("  {} {}", Theme::muted("hint:"), hint);
    }
}

/// Print a styled warning message
pub fn print_warning(message: &str) {
    eprintln!(
        "{} {}",
        Theme::warning(Icons::WARNING.to_string()),
        Theme::warning(message)
    );
}

/// Print a styled success message
pub fn print_success(message: &str) {
    println!(
        "{} {}",
        Theme::success(Icons::SUCCESS.to_string()),
        Theme::success(message)
    );
}

/// Print a styled info message
pub fn print_info(message: &str) {
    println!("{} {}", Theme::primary(Icons::INFO.to_string()), message);
}
