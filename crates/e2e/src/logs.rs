//! Capturing and replaying the running app's log terminals

/// Installed into the admin page once the app is cloned.
///
/// Keeps the page scrolled to the bottom so every terminal renders, and
/// redirects each log terminal's write handler into `window._logs`.
pub const LOG_HOOK_SCRIPT: &str = r#"() => {
    setInterval(function () {
        var scrollingElement = (document.scrollingElement || document.body);
        scrollingElement.scrollTop = scrollingElement.scrollHeight;
    }, 200);

    if (!window._logs) {
        window._logs = [];
    }

    if (window.logTerminals) {
        Object.entries(window.logTerminals).forEach(
            ([key, value]) => {
                window.logTerminals[key]._onLightningWritelnHandler = function (data) {
                    window._logs = window._logs.concat([data]);
                }
            }
        );
    }
}"#;

/// Reads the accumulated entries back.
pub const FETCH_LOGS_SCRIPT: &str = "() => window._logs || []";

/// Terminal reset sequence the app prefixes its log lines with.
const RESET_MARKER: &str = "[0m";

/// Distinct entries in first-seen order.
pub fn dedup_logs<S: AsRef<str>>(entries: &[S]) -> Vec<&str> {
    let mut seen: Vec<&str> = Vec::with_capacity(entries.len());
    for entry in entries {
        let entry = entry.as_ref();
        if !seen.contains(&entry) {
            seen.push(entry);
        }
    }
    seen
}

/// Text after the last reset marker, or the whole line if there is none.
pub fn strip_reset_prefix(line: &str) -> &str {
    line.rsplit(RESET_MARKER).next().unwrap_or(line)
}

/// Print each distinct entry once, returning how many lines were printed.
pub fn print_logs<S: AsRef<str>>(entries: &[S]) -> usize {
    let distinct = dedup_logs(entries);
    for entry in &distinct {
        println!("{}", strip_reset_prefix(entry));
    }
    distinct.len()
}
