//! Traffic logging for tool-server calls
//!
//! Logs tool-call requests/responses to switchboard.log under the user's
//! config directory. Content is truncated to avoid leaking private data.

use std::io::Write;
use std::path::PathBuf;

/// Maximum characters to log for content (to protect privacy)
const MAX_CONTENT_LOG_CHARS: usize = 200;

/// Truncate a string for logging, adding ellipsis if truncated
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let mut end = max_len;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... ({} chars total)", &s[..end], s.len())
    }
}

/// Log a tool call request (truncated summary only)
pub fn log_tool_request(tool_name: &str, args: &serde_json::Value) {
    let json = serde_json::to_string(args).unwrap_or_else(|_| "<serialization error>".to_string());
    let summary = truncate_for_log(&json, MAX_CONTENT_LOG_CHARS);
    log_traffic("TOOL", "REQUEST", &format!("[{}] {}", tool_name, summary));
}

/// Log a tool call response (truncated summary only)
pub fn log_tool_response(tool_name: &str, result: &str) {
    let summary = truncate_for_log(result, MAX_CONTENT_LOG_CHARS);
    log_traffic("TOOL", "RESPONSE", &format!("[{}] {}", tool_name, summary));
}

/// Log a tool call error
pub fn log_tool_error(tool_name: &str, error: &str) {
    log_traffic("TOOL", "ERROR", &format!("[{}] {}", tool_name, error));
}

fn log_file_path() -> Option<PathBuf> {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".switchboard").join("switchboard.log"))
}

/// Internal function to write to the log file
fn log_traffic(category: &str, event_type: &str, message: &str) {
    if let Some(log_path) = log_file_path() {
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(mut file) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
        {
            let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            let _ = writeln!(
                file,
                "[{}] [TRAFFIC] [{}] [{}] {}",
                timestamp, category, event_type, message
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_content_passes_through() {
        assert_eq!(truncate_for_log("hello", 10), "hello");
    }

    #[test]
    fn long_content_is_truncated_with_length() {
        let long = "x".repeat(300);
        let logged = truncate_for_log(&long, 10);
        assert!(logged.starts_with("xxxxxxxxxx..."));
        assert!(logged.contains("300 chars total"));
    }
}
