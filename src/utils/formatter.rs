// Formatters - sizes, durations, permission bits

use std::time::Duration;

/// Format a byte count for display, with a space between number and unit
///
/// # Examples
/// ```
/// use zipworker::utils::formatter::format_file_size;
///
/// assert_eq!(format_file_size(0), "0 B");
/// assert_eq!(format_file_size(512), "512 B");
/// assert_eq!(format_file_size(1536), "1.5 KB");
/// assert_eq!(format_file_size(1_048_576), "1.0 MB");
/// ```
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes == 0 {
        "0 B".to_string()
    } else if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        let kb = bytes as f64 / KB as f64;
        format!("{:.1} KB", kb)
    } else if bytes < GB {
        let mb = bytes as f64 / MB as f64;
        format!("{:.1} MB", mb)
    } else {
        let gb = bytes as f64 / GB as f64;
        format!("{:.1} GB", gb)
    }
}

/// Format a job duration
///
/// Sub-second durations print in milliseconds, longer ones as `[Hh ][Mm ]S.mmms`.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use zipworker::utils::formatter::format_elapsed;
///
/// assert_eq!(format_elapsed(Duration::from_millis(250)), "250 ms");
/// assert_eq!(format_elapsed(Duration::from_millis(61_500)), "1m 1.500s");
/// ```
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_ms = elapsed.as_millis();
    if total_ms < 1000 {
        return format!("{} ms", total_ms);
    }
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let seconds = (total_ms / 1000) % 60;
    let millis = total_ms % 1000;
    if hours > 0 {
        format!("{}h {}m {}.{:03}s", hours, minutes, seconds, millis)
    } else if minutes > 0 {
        format!("{}m {}.{:03}s", minutes, seconds, millis)
    } else {
        format!("{}.{:03}s", seconds, millis)
    }
}

/// Singular or plural form depending on the count
///
/// # Examples
/// ```
/// use zipworker::utils::formatter::pluralize;
///
/// assert_eq!(pluralize(1, "file", "files"), "1 file");
/// assert_eq!(pluralize(3, "file", "files"), "3 files");
/// ```
pub fn pluralize(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

/// Render archive permission bits as `rwxr-xr-x`, or `-` when the entry carries none
pub fn format_mode(mode: Option<u32>) -> String {
    match mode {
        None => "-".to_string(),
        Some(mode) => {
            let user = triplet(mode, 0o100, 0o200, 0o400);
            let group = triplet(mode, 0o010, 0o020, 0o040);
            let other = triplet(mode, 0o001, 0o002, 0o004);
            format!("{}{}{}", user, group, other)
        }
    }
}

fn triplet(mode: u32, exec: u32, write: u32, read: u32) -> String {
    let r = if mode & read != 0 { "r" } else { "-" };
    let w = if mode & write != 0 { "w" } else { "-" };
    let x = if mode & exec != 0 { "x" } else { "-" };
    format!("{}{}{}", r, w, x)
}
