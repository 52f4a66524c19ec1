use owo_colors::OwoColorize;
use readlater_core::SavedItem;

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!("\n{} {} {}", "ReadLater".bold().bright_blue(), "v".dimmed(), VERSION.dimmed());
    eprintln!("{}", "Save web pages to read later\n".dimmed());
}

/// Print a styled step message
pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

/// Print an info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message.bright_red());
}

/// Print a `label: value` detail line under a step
pub fn print_detail(label: &str, value: &str) {
    eprintln!("  {} {}", format!("{label}:").dimmed(), value.bright_white());
}

/// One list row: id, read marker, title, tags and URL
pub fn format_item(item: &SavedItem) -> String {
    let marker = if item.is_read { "[x]" } else { "[ ]" };
    let tags = item.tags.iter().map(|t| format!("#{t}")).collect::<Vec<_>>().join(" ");
    let title = if item.title.is_empty() { item.url.as_str() } else { item.title.as_str() };

    let mut line = format!("{}  {}  {}", item.id, marker, title);
    if !tags.is_empty() {
        line.push_str("  ");
        line.push_str(&tags);
    }
    line.push_str("  ");
    line.push_str(&item.url);
    line
}

/// Format file size for display
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
