//! Progress formatting - pure string builders for the reporter
//!
//! Kept free of terminal state so the downloader can build a frame
//! outside the reporter's lock.

use crossterm::style::Stylize;

/// Format a progress bar using ▓ (filled) and ░ (empty).
pub fn format_progress_bar(current: u64, total: u64, width: usize) -> String {
    let filled = if total > 0 {
        ((current as f64 / total as f64) * width as f64).round() as usize
    } else {
        0
    };
    let filled = filled.min(width);
    let empty = width.saturating_sub(filled);
    format!("{}{}", "▓".repeat(filled), "░".repeat(empty))
}

/// Format bytes as human readable
pub fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    const GIB: u64 = MIB * 1024;

    if bytes >= GIB {
        format!("{:.1} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// One frame of download progress for a reporter line.
///
/// `index`/`total` are the request position, rendered as `[2/3]` so
/// interleaved completion stays attributable to the right package.
pub fn format_download_line(
    pkg: &str,
    index: usize,
    total: usize,
    current: u64,
    total_bytes: u64,
) -> String {
    let counter = format!("[{}/{}]", index + 1, total);
    if total_bytes > 0 {
        let pct = (current * 100 / total_bytes).min(100);
        let bar = format_progress_bar(current, total_bytes, 24);
        format!(
            "{} Downloading {} {} {:>3}% {}/{}",
            counter.cyan(),
            pkg.cyan(),
            bar,
            pct,
            format_size(current),
            format_size(total_bytes),
        )
    } else {
        format!(
            "{} Downloading {} {}",
            counter.cyan(),
            pkg.cyan(),
            format_size(current),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar_format() {
        // 50% should be half filled
        let bar = format_progress_bar(50, 100, 10);
        assert_eq!(bar.chars().filter(|c| *c == '▓').count(), 5);
        assert_eq!(bar.chars().filter(|c| *c == '░').count(), 5);

        // 100% should be all filled
        let bar = format_progress_bar(100, 100, 10);
        assert_eq!(bar.chars().filter(|c| *c == '▓').count(), 10);
        assert_eq!(bar.chars().filter(|c| *c == '░').count(), 0);

        // 0% should be all empty
        let bar = format_progress_bar(0, 100, 10);
        assert_eq!(bar.chars().filter(|c| *c == '▓').count(), 0);
        assert_eq!(bar.chars().filter(|c| *c == '░').count(), 10);

        // unknown total renders empty, never panics
        let bar = format_progress_bar(50, 0, 10);
        assert_eq!(bar.chars().filter(|c| *c == '░').count(), 10);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1024), "1.0 KiB");
        assert_eq!(format_size(1024 * 1024), "1.0 MiB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GiB");
    }

    #[test]
    fn test_download_line() {
        let line = format_download_line("ripgrep", 1, 3, 512, 1024);
        assert!(line.contains("[2/3]"));
        assert!(line.contains("ripgrep"));
        assert!(line.contains("50%"));
        assert!(line.contains("▓"));
        assert!(line.contains("░"));

        // unknown content length falls back to byte count only
        let line = format_download_line("ripgrep", 0, 1, 2048, 0);
        assert!(line.contains("2.0 KiB"));
        assert!(!line.contains('%'));
    }
}
