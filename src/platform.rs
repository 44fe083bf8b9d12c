//! CI platform integration (GitHub Actions).
//!
//! Inputs arrive as `INPUT_<NAME>` environment variables and take precedence
//! over flags and plain environment variables. The `pdf_path` output is
//! appended to the file named by `$GITHUB_OUTPUT`; failures are surfaced with
//! the `::error::` workflow command.

use crate::config::RawConfig;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Name of the output the conversion publishes.
pub const OUTPUT_NAME: &str = "pdf_path";

/// `true` when running inside a GitHub Actions job.
pub fn is_github_actions(lookup: impl Fn(&str) -> Option<String>) -> bool {
    lookup("GITHUB_ACTIONS").as_deref() == Some("true")
}

/// Environment variable carrying the platform input `name`.
///
/// GitHub upper-cases input names and replaces spaces with underscores;
/// hyphens are kept.
pub fn input_var(name: &str) -> String {
    format!("INPUT_{}", name.replace(' ', "_").to_ascii_uppercase())
}

/// Read every known input from the platform. Both the `snake_case` and
/// `kebab-case` spellings are accepted, snake case first.
pub fn platform_inputs(lookup: impl Fn(&str) -> Option<String>) -> RawConfig {
    RawConfig::from_lookup(|name| {
        lookup(&input_var(name))
            .filter(|v| !v.is_empty())
            .or_else(|| lookup(&input_var(&name.replace('_', "-"))))
    })
}

/// Publish the output path: append `pdf_path=<path>` to `$GITHUB_OUTPUT`
/// when set, otherwise print the same line to stdout.
pub fn report_output(pdf_path: &Path, lookup: impl Fn(&str) -> Option<String>) -> std::io::Result<()> {
    let line = format!("{}={}", OUTPUT_NAME, pdf_path.display());
    match lookup("GITHUB_OUTPUT").filter(|p| !p.is_empty()) {
        Some(file) => {
            debug!("Writing {} to {}", OUTPUT_NAME, file);
            let mut f = std::fs::OpenOptions::new().create(true).append(true).open(file)?;
            writeln!(f, "{line}")
        }
        None => {
            println!("{line}");
            Ok(())
        }
    }
}

/// The `::error::` workflow command for `message`.
pub fn error_command(message: &str) -> String {
    format!("::error::{}", escape_data(message))
}

/// Escape a workflow-command payload (`%`, CR and LF).
fn escape_data(s: &str) -> String {
    s.replace('%', "%25").replace('\r', "%0D").replace('\n', "%0A")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn detects_actions_runner() {
        assert!(is_github_actions(env(&[("GITHUB_ACTIONS", "true")])));
        assert!(!is_github_actions(env(&[("GITHUB_ACTIONS", "1")])));
        assert!(!is_github_actions(env(&[])));
    }

    #[test]
    fn reads_inputs_in_both_spellings() {
        let raw = platform_inputs(env(&[
            ("INPUT_SOURCE", "index.html"),
            ("INPUT_WAIT_FOR", "#app"),
            ("INPUT_PRINT-BACKGROUND", "false"),
            ("INPUT_FORMAT", ""),
        ]));
        assert_eq!(raw.source.as_deref(), Some("index.html"));
        assert_eq!(raw.wait_for.as_deref(), Some("#app"));
        assert_eq!(raw.print_background.as_deref(), Some("false"));
        assert_eq!(raw.format, None);
    }

    #[test]
    fn platform_beats_flags_beats_env() {
        let env_layer = RawConfig::from_lookup(|n| (n == "format").then(|| "Letter".to_string()));
        let cli_layer = RawConfig::from_lookup(|n| (n == "format" || n == "scale").then(|| "A3".to_string()));
        let platform = platform_inputs(env(&[("INPUT_FORMAT", "A5")]));

        let merged = env_layer.overlay(cli_layer).overlay(platform);
        assert_eq!(merged.format.as_deref(), Some("A5"));
        assert_eq!(merged.scale.as_deref(), Some("A3"));
    }

    #[test]
    fn output_is_appended_to_github_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("out.txt");
        std::fs::write(&file, "existing=1\n").unwrap();
        let path = file.to_str().unwrap().to_string();

        report_output(Path::new("dist/report.pdf"), env(&[("GITHUB_OUTPUT", path.as_str())])).unwrap();

        let contents = std::fs::read_to_string(&file).unwrap();
        assert_eq!(contents, "existing=1\npdf_path=dist/report.pdf\n");
    }

    #[test]
    fn error_command_escapes_newlines() {
        assert_eq!(error_command("a\nb 100%"), "::error::a%0Ab 100%25");
    }
}
