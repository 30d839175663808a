//! Toolchain resolution: from a script's file name to the command line that runs it.
//!
//! Every language runs in single-file script mode; there is no project or
//! build-system detection.

use std::path::Path;

use crate::item::ScriptItem;

/// Interpreter or compiler invocation associated with a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Toolchain {
    Python,
    Bash,
    Node,
    TsNode,
    Ruby,
    Php,
    Go,
    Java,
    Kotlin,
    Swift,
    PowerShell,
    Perl,
    Rustc,
    /// Fallback: the file is treated as a shell script.
    Shell,
}

impl Toolchain {
    /// Pick the toolchain for an extension, with or without the leading dot.
    ///
    /// Matching is case-insensitive and unknown extensions fall back to
    /// [`Toolchain::Shell`].
    pub fn from_extension(extension: &str) -> Self {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        match extension.as_str() {
            "py" => Toolchain::Python,
            "sh" => Toolchain::Bash,
            "js" => Toolchain::Node,
            "ts" => Toolchain::TsNode,
            "rb" => Toolchain::Ruby,
            "php" => Toolchain::Php,
            "go" => Toolchain::Go,
            "java" => Toolchain::Java,
            "kt" => Toolchain::Kotlin,
            "swift" => Toolchain::Swift,
            "ps1" => Toolchain::PowerShell,
            "pl" => Toolchain::Perl,
            "rs" => Toolchain::Rustc,
            _ => Toolchain::Shell,
        }
    }

    /// Pick the toolchain from a display name such as `hello.py`.
    pub fn from_name(name: &str) -> Self {
        extension_of(name).map_or(Toolchain::Shell, Toolchain::from_extension)
    }

    /// Main program the command line invokes.
    pub fn program(self) -> &'static str {
        match self {
            Toolchain::Python => "python3",
            Toolchain::Bash | Toolchain::Shell => "bash",
            Toolchain::Node => "node",
            Toolchain::TsNode => "npx",
            Toolchain::Ruby => "ruby",
            Toolchain::Php => "php",
            Toolchain::Go => "go",
            Toolchain::Java => "javac",
            Toolchain::Kotlin => "kotlinc",
            Toolchain::Swift => "swift",
            Toolchain::PowerShell => "pwsh",
            Toolchain::Perl => "perl",
            Toolchain::Rustc => "rustc",
        }
    }

    /// Shell command line that executes `file_path` with this toolchain.
    pub fn command_line(self, file_path: &Path) -> String {
        let file = shell_quote(&file_path.to_string_lossy());
        match self {
            Toolchain::Python => format!("python3 {file}"),
            Toolchain::Bash | Toolchain::Shell => format!("bash {file}"),
            Toolchain::Node => format!("node {file}"),
            Toolchain::TsNode => format!("npx ts-node --transpile-only {file}"),
            Toolchain::Ruby => format!("ruby {file}"),
            Toolchain::Php => format!("php {file}"),
            Toolchain::Go => format!("go run {file}"),
            Toolchain::Java => {
                let (dir, file_name, stem) = split_path(file_path);
                format!(
                    "cd {} && javac {} && java {}",
                    shell_quote(&dir),
                    shell_quote(&file_name),
                    shell_quote(&stem)
                )
            }
            Toolchain::Kotlin => {
                let (dir, file_name, stem) = split_path(file_path);
                let jar = shell_quote(&format!("{stem}.jar"));
                format!(
                    "cd {} && kotlinc {} -include-runtime -d {jar} && java -jar {jar}",
                    shell_quote(&dir),
                    shell_quote(&file_name),
                )
            }
            Toolchain::Swift => format!("swift {file}"),
            Toolchain::PowerShell => format!("pwsh -File {file}"),
            Toolchain::Perl => format!("perl {file}"),
            Toolchain::Rustc => {
                let binary = shell_quote(&format!("{}.out", file_path.to_string_lossy()));
                format!("rustc {file} -o {binary} && {binary}")
            }
        }
    }
}

/// Resolve the command line for a script item. Never fails.
pub fn resolve_command(item: &ScriptItem) -> String {
    Toolchain::from_name(&item.name).command_line(&item.file_path)
}

/// Extension of a display name, without the dot.
pub fn extension_of(name: &str) -> Option<&str> {
    name.rsplit_once('.')
        .map(|(_, extension)| extension)
        .filter(|extension| !extension.is_empty() && !extension.contains(['/', '\\']))
}

fn split_path(file_path: &Path) -> (String, String, String) {
    let dir = match file_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_string_lossy().into_owned(),
        _ => String::from("."),
    };
    let file_name = file_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = file_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    (dir, file_name, stem)
}

/// Single-quote `raw` for a POSIX shell.
pub(crate) fn shell_quote(raw: &str) -> String {
    if raw.is_empty() {
        return String::from("''");
    }
    format!("'{}'", raw.replace('\'', "'\\''"))
}
