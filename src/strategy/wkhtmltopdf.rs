//! External converter: the `wkhtmltopdf` binary, when it is installed.
//!
//! The request is translated into command-line flags. Header and footer
//! markup and the custom stylesheet go through temporary files that are
//! removed when the attempt ends. The converter writes to a staged file
//! beside the destination, which is validated and renamed into place only
//! after a zero exit status.
//!
//! `wkhtmltopdf` cannot wait for a selector. When `wait_for` is set the
//! JavaScript delay is raised to the full timeout so client-side rendering
//! has the same budget it would get in a browser.

use super::{bounded, persist_staged, stage_output, stage_temp, Availability, Strategy};
use crate::config::RenderRequest;
use crate::error::StrategyError;
use crate::locate::ExecutableLocator;
use crate::pipeline::input::{LoadedSource, Source};
use async_trait::async_trait;
use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, info, warn};
use url::Url;

/// Program name looked up on the search path.
pub const PROGRAM: &str = "wkhtmltopdf";

/// JavaScript delay used when no selector wait was requested.
pub const DEFAULT_JS_DELAY_MS: u64 = 200;

/// Time allowed for the converter on top of the navigation timeout.
const RUN_ALLOWANCE: Duration = Duration::from_secs(15);

/// Strategy C.
pub struct WkhtmltopdfStrategy {
    locator: Arc<dyn ExecutableLocator>,
}

impl WkhtmltopdfStrategy {
    pub fn new(locator: Arc<dyn ExecutableLocator>) -> Self {
        Self { locator }
    }
}

#[async_trait]
impl Strategy for WkhtmltopdfStrategy {
    fn name(&self) -> &'static str {
        PROGRAM
    }

    fn availability(&self) -> Availability {
        match self.locator.locate_program(PROGRAM) {
            Some(_) => Availability::Available,
            None => Availability::Unavailable(format!("{PROGRAM} not found on PATH")),
        }
    }

    async fn attempt(&self, source: &LoadedSource, request: &RenderRequest) -> Result<(), StrategyError> {
        let exe = self
            .locator
            .locate_program(PROGRAM)
            .ok_or_else(|| StrategyError::Unavailable {
                reason: format!("{PROGRAM} not found on PATH"),
            })?;

        let assets = Assets::stage(source, request)?;
        let staged = stage_output(&request.output)?;
        let args = build_args(request, &assets.inputs(source), staged.path());
        debug!("Running {} with {} arguments", exe.display(), args.len());

        let mut command = Command::new(&exe);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let limit = request.timeout + Duration::from_millis(js_delay_ms(request)) + RUN_ALLOWANCE;
        let output = bounded(limit, "running wkhtmltopdf", command.output())
            .await?
            .map_err(|e| StrategyError::Process {
                code: None,
                stderr: format!("failed to start {}: {e}", exe.display()),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
            warn!("{}: {}", PROGRAM, line.trim());
        }

        if !output.status.success() {
            return Err(StrategyError::Process {
                code: output.status.code(),
                stderr: last_lines(&stderr, 5),
            });
        }

        persist_staged(staged, &request.output)?;
        info!("{} wrote {}", PROGRAM, request.output.display());
        Ok(())
    }
}

/// Temporary files backing one invocation. Dropped (and deleted) with the
/// attempt.
struct Assets {
    page: Option<NamedTempFile>,
    header: Option<NamedTempFile>,
    footer: Option<NamedTempFile>,
    stylesheet: Option<NamedTempFile>,
}

impl Assets {
    fn stage(source: &LoadedSource, request: &RenderRequest) -> Result<Self, StrategyError> {
        let page = match &source.source {
            Source::InlineHtml(markup) => Some(stage_temp(markup, ".html")?),
            _ => None,
        };
        let header = match &request.header_template {
            Some(markup) => Some(stage_temp(&html_document(markup), ".html")?),
            None => None,
        };
        let footer = match &request.footer_template {
            Some(markup) => Some(stage_temp(&html_document(markup), ".html")?),
            None => None,
        };
        let stylesheet = match &request.custom_css {
            Some(css) => Some(stage_temp(css, ".css")?),
            None => None,
        };
        Ok(Assets { page, header, footer, stylesheet })
    }

    fn inputs<'a>(&'a self, source: &'a LoadedSource) -> Inputs<'a> {
        let page: &OsStr = match (&source.source, &self.page) {
            (Source::Url(url), _) => OsStr::new(url.as_str()),
            (Source::File(path), _) => path.as_os_str(),
            (Source::InlineHtml(_), Some(file)) => file.path().as_os_str(),
            (Source::InlineHtml(_), None) => OsStr::new("-"),
        };
        Inputs {
            page,
            url: source.url(),
            header: self.header.as_ref().map(NamedTempFile::path),
            footer: self.footer.as_ref().map(NamedTempFile::path),
            stylesheet: self.stylesheet.as_ref().map(NamedTempFile::path),
        }
    }
}

/// Everything the argument list refers to besides the request itself.
struct Inputs<'a> {
    page: &'a OsStr,
    url: Option<&'a Url>,
    header: Option<&'a Path>,
    footer: Option<&'a Path>,
    stylesheet: Option<&'a Path>,
}

fn build_args(request: &RenderRequest, inputs: &Inputs<'_>, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["--quiet".into(), "--enable-local-file-access".into()];

    push(&mut args, &["--page-size", request.format.name()]);
    push(&mut args, &["--orientation", &request.orientation.to_string()]);

    let m = request.margin;
    for (name, mm) in [
        ("--margin-top", m.top),
        ("--margin-right", m.right),
        ("--margin-bottom", m.bottom),
        ("--margin-left", m.left),
    ] {
        push(&mut args, &[name, &format!("{mm}mm")]);
    }

    push(&mut args, &["--zoom", &request.scale.to_string()]);
    push(
        &mut args,
        &[if request.print_background { "--background" } else { "--no-background" }],
    );

    for (name, path) in [
        ("--header-html", inputs.header),
        ("--footer-html", inputs.footer),
        ("--user-style-sheet", inputs.stylesheet),
    ] {
        if let Some(path) = path {
            args.push(name.into());
            args.push(path.as_os_str().to_os_string());
        }
    }

    if let Some(ua) = &request.user_agent {
        push(&mut args, &["--custom-header", "User-Agent", ua, "--custom-header-propagation"]);
    }
    if inputs.url.is_some() {
        for cookie in &request.cookies {
            push(&mut args, &["--cookie", &cookie.name, &cookie.value]);
        }
    }
    push(&mut args, &["--javascript-delay", &js_delay_ms(request).to_string()]);

    args.push(inputs.page.to_os_string());
    args.push(output.as_os_str().to_os_string());
    args
}

fn push(args: &mut Vec<OsString>, items: &[&str]) {
    args.extend(items.iter().map(OsString::from));
}

fn js_delay_ms(request: &RenderRequest) -> u64 {
    if request.wait_for.is_some() {
        request.timeout.as_millis() as u64
    } else {
        DEFAULT_JS_DELAY_MS
    }
}

/// `wkhtmltopdf` only loads header/footer files that are complete documents.
fn html_document(markup: &str) -> String {
    if markup.to_ascii_lowercase().contains("<html") {
        markup.to_string()
    } else {
        format!("<!DOCTYPE html><html><head><meta charset=\"utf-8\"></head><body>{markup}</body></html>")
    }
}

fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}
