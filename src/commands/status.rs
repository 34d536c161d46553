/*!
 * Lifeline Status Command - shows the configured roster and policies
 */

use crate::cli_style::{monitor_table, roster_table, section_header, Icons, Theme};
use crate::error::Result;
use crate::service::Lifeline;

/// Print the service status as tables, or as JSON
pub fn run_status(lifeline: &Lifeline, json: bool) -> Result<()> {
    let status = lifeline.status();

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    let config = lifeline.config();

    section_header(&format!("{} Subsystems", Icons::SATELLITE));
    println!(
        "{}",
        roster_table(&config.orchestrator.base_url, lifeline.orchestrator().roster())
    );
    println!(
        "  {} {}ms per call",
        Theme::muted("timeout:"),
        config.orchestrator.call_timeout_ms
    );

    section_header(&format!("{} Crisis Monitor", Icons::SHIELD));
    match status.monitor {
        Some(ref stats) => println!("{}", monitor_table(stats)),
        None => println!(
            "  {}",
            Theme::muted("disabled (set monitor.probe_url to enable)")
        ),
    }

    section_header("Schedule");
    println!(
        "  cycle every {}s, status every {}s",
        config.scheduler.cycle_interval_secs, config.scheduler.status_poll_interval_secs
    );
    println!("  {}", status.orchestrator.summary());

    Ok(())
}
