//! Heuristic diagnostics: remediation hints derived from captured stderr.
//!
//! Each rule is an independent pattern test. All rules are evaluated in table
//! order and every match contributes its suggestion.

use std::sync::LazyLock;

use regex::Regex;
use sr_io::process::ExitInfo;

/// A `{pattern, suggestion}` pair, optionally restricted to one extension.
#[derive(Debug)]
pub struct DiagnosticRule {
    pattern: Regex,
    extension: Option<&'static str>,
    suggestion: &'static str,
}

impl DiagnosticRule {
    fn new(pattern: &str, extension: Option<&'static str>, suggestion: &'static str) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("diagnostic patterns are valid regexes"),
            extension,
            suggestion,
        }
    }

    fn applies(&self, stderr: &str, extension: Option<&str>) -> bool {
        let extension_matches = match self.extension {
            Some(wanted) => extension.is_some_and(|ext| ext.eq_ignore_ascii_case(wanted)),
            None => true,
        };
        extension_matches && self.pattern.is_match(stderr)
    }

    pub fn suggestion(&self) -> &'static str {
        self.suggestion
    }
}

static RULES: LazyLock<Vec<DiagnosticRule>> = LazyLock::new(|| {
    vec![
        DiagnosticRule::new(
            r"(?i)command not found|not found",
            None,
            "Install missing dependency or check PATH.",
        ),
        DiagnosticRule::new(
            r"(?i)permission denied",
            None,
            "Make the script executable or run with proper permissions.",
        ),
        DiagnosticRule::new(
            r"(?i)syntax",
            None,
            "Check for syntax errors; run a linter or fix indentation.",
        ),
        DiagnosticRule::new(
            r"(?i)module\s*not\s*found|no module named",
            Some("py"),
            "Install required Python packages with pip.",
        ),
    ]
});

/// The rule table, in evaluation order.
pub fn rules() -> &'static [DiagnosticRule] {
    &RULES
}

/// Suggestions from the pattern rules alone.
///
/// `extension` is the script's extension without the dot.
pub fn classify(stderr: &str, extension: Option<&str>) -> Vec<String> {
    rules()
        .iter()
        .filter(|rule| rule.applies(stderr, extension))
        .map(|rule| String::from(rule.suggestion))
        .collect()
}

/// Suggestions for a finished run: nothing on a clean exit, otherwise the
/// pattern rules followed by a note about the terminating signal.
pub fn suggestions_for(stderr: &str, extension: Option<&str>, exit: &ExitInfo) -> Vec<String> {
    if exit.success() {
        return Vec::new();
    }
    let mut suggestions = classify(stderr, extension);
    if let Some(signal) = exit.signal {
        suggestions.push(signal_suggestion(signal));
    }
    suggestions
}

fn signal_suggestion(signal: i32) -> String {
    match signal_name(signal) {
        Some(name) => format!("Process stopped (signal {signal}, {name})."),
        None => format!("Process stopped (signal {signal})."),
    }
}

// Numbers shared by Linux and macOS.
fn signal_name(signal: i32) -> Option<&'static str> {
    match signal {
        1 => Some("SIGHUP"),
        2 => Some("SIGINT"),
        3 => Some("SIGQUIT"),
        6 => Some("SIGABRT"),
        9 => Some("SIGKILL"),
        11 => Some("SIGSEGV"),
        13 => Some("SIGPIPE"),
        15 => Some("SIGTERM"),
        _ => None,
    }
}
