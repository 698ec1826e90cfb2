//! Console rendering of run results

use std::path::Path;

use anyhow::Result;
use owo_colors::OwoColorize;
use serde::Serialize;

use winupd_common::{UpdateSearchResult, WorkflowOutcome};

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_outcome(outcome: &WorkflowOutcome, log_path: &Path) {
    match outcome {
        WorkflowOutcome::NotElevated => {
            println!(
                "{} Administrator rights are required. Re-run from an elevated prompt.",
                "✗".red()
            );
        }
        WorkflowOutcome::NoApplicableUpdates => {
            println!("{} No applicable updates.", "✓".green());
        }
        WorkflowOutcome::AllSkipped { skipped } => {
            println!("{} All {} updates were skipped:", "•".yellow(), skipped.len());
            for s in skipped {
                println!("    {} ({})", s.title, s.reason.as_str().dimmed());
            }
        }
        WorkflowOutcome::NothingDownloaded { selected } => {
            println!(
                "{} None of the {} selected updates could be downloaded.",
                "⚠".yellow(),
                selected
            );
        }
        WorkflowOutcome::ProviderFailed { stage, message } => {
            println!("{} Update {} failed: {}", "✗".red(), stage, message);
        }
        WorkflowOutcome::Completed(summary) => {
            println!(
                "{} Installation {} ({} updates, {} failed)",
                if summary.failed_count() == 0 {
                    "✓".green().to_string()
                } else {
                    "⚠".yellow().to_string()
                },
                summary.result_code,
                summary.items.len(),
                summary.failed_count()
            );
            for item in &summary.items {
                let result = if item.result.is_success() {
                    item.result.as_str().green().to_string()
                } else {
                    item.result.as_str().red().to_string()
                };
                println!("    {} - {}", item.title, result);
            }
            for s in &summary.skipped {
                println!("    {} - skipped, {}", s.title, s.reason.as_str().dimmed());
            }
            if summary.reboot_required {
                println!("{}", "A reboot is required to finish installation.".bold());
            } else if summary.reboot_may_be_required {
                println!("A reboot may be requested by one or more updates.");
            }
        }
    }
    println!("Log: {}", log_path.display().dimmed());
}

pub fn print_search(found: &UpdateSearchResult) {
    if found.is_empty() {
        println!("No applicable updates.");
        return;
    }
    println!("{} applicable updates:", found.len());
    for item in found.items() {
        let mut notes = Vec::new();
        if item.requires_user_input {
            notes.push("needs user input");
        }
        if !item.eula_accepted {
            notes.push("license not accepted");
        }
        if item.reboot_behavior.may_reboot() {
            notes.push("may reboot");
        }
        if item.downloaded {
            notes.push("downloaded");
        }
        if notes.is_empty() {
            println!("  {}", item.title);
        } else {
            println!("  {} [{}]", item.title, notes.join(", ").dimmed());
        }
    }
}

/// Subject and body of the mail sent for `outcome`
pub fn notification_text(
    outcome: &WorkflowOutcome,
    host: &str,
    log_path: &Path,
) -> (String, String) {
    match outcome {
        WorkflowOutcome::ProviderFailed { stage, message } => (
            format!("Windows Update {} failed on {}", stage, host),
            format!(
                "The update run on {} stopped during {}.\n\nError: {}\n\nLog: {}\n",
                host,
                stage,
                message,
                log_path.display()
            ),
        ),
        WorkflowOutcome::Completed(summary) => {
            let mut body = format!(
                "Installation {} on {}.\nReboot required: {}\n\n",
                summary.result_code,
                host,
                if summary.reboot_required { "yes" } else { "no" }
            );
            for item in &summary.items {
                body.push_str(&format!("{}: {}\n", item.title, item.result));
            }
            body.push_str(&format!("\nLog: {}\n", log_path.display()));
            (
                format!(
                    "Windows Update on {}: {} installed, {} failed",
                    host,
                    summary.items.len() - summary.failed_count(),
                    summary.failed_count()
                ),
                body,
            )
        }
        other => (
            format!("Windows Update on {}: {}", host, other.label()),
            format!("Log: {}\n", log_path.display()),
        ),
    }
}
