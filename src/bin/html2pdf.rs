//! html2pdf CLI — convert HTML files, URLs and inline markup to PDF.
//!
//! Usage:
//!   html2pdf <SOURCE> --output <PATH> [OPTIONS]
//!
//! Run `html2pdf --help` for full option list.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_html2pdf::platform::{error_command, is_github_actions, platform_inputs, report_output};
use edgequake_html2pdf::{Availability, FallbackPipeline, PipelineObserver, RawConfig, SystemLocator};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ─────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

// ── Spinner observer ────────────────────────────────────────────────────────

/// Spinner naming the renderer in flight, with one line per finished attempt.
struct SpinnerObserver {
    bar: ProgressBar,
    started: Mutex<Option<Instant>>,
}

impl SpinnerObserver {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.enable_steady_tick(Duration::from_millis(80));
        Self {
            bar,
            started: Mutex::new(None),
        }
    }

    fn elapsed(&self) -> String {
        let secs = self
            .started
            .lock()
            .ok()
            .and_then(|g| *g)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        dim(&format!("{secs:.1}s"))
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl PipelineObserver for SpinnerObserver {
    fn on_pipeline_start(&self, total: usize) {
        self.bar.set_prefix("html2pdf");
        self.bar.set_message(format!("{total} renderers in the chain"));
    }

    fn on_attempt_start(&self, strategy: &str, index: usize, total: usize) {
        if let Ok(mut started) = self.started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_prefix(format!("[{index}/{total}]"));
        self.bar.set_message(format!("rendering with {}", cyan(strategy)));
    }

    fn on_attempt_skipped(&self, strategy: &str, reason: &str) {
        self.bar.println(format!("  {} {:<16} {}", dim("–"), strategy, dim(reason)));
    }

    fn on_attempt_failed(&self, strategy: &str, error: &str) {
        // Keep one line per attempt; the full message is in the logs.
        let first = error.lines().next().unwrap_or(error);
        let msg = if first.chars().count() > 80 {
            format!("{}\u{2026}", first.chars().take(79).collect::<String>())
        } else {
            first.to_string()
        };
        self.bar
            .println(format!("  {} {:<16} {}  {}", red("✗"), strategy, red(&msg), self.elapsed()));
    }

    fn on_success(&self, strategy: &str, pdf_path: &Path) {
        self.bar.println(format!(
            "  {} {:<16} {}  {}",
            green("✓"),
            strategy,
            pdf_path.display(),
            self.elapsed()
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Render a local file
  html2pdf report.html --output dist/report.pdf

  # Render a URL once the app has rendered
  html2pdf https://example.com --output page.pdf --wait-for '#app[data-ready]'

  # Inline markup, landscape Letter with 20mm margins
  html2pdf '<h1>Invoice</h1>' --output invoice.pdf --format Letter \
           --orientation landscape --margin 20

  # Check which renderers can run on this machine
  html2pdf --check

RENDERERS (tried in order, first success wins):
  chromium         Chromium over the DevTools protocol (chromiumoxide)
  headless-chrome  second, independent Chromium launcher (headless_chrome)
  wkhtmltopdf      external converter, used when installed
  synthetic        text-only PDF, always succeeds

ENVIRONMENT VARIABLES:
  SOURCE, OUTPUT, WAIT_FOR, FORMAT, MARGIN, ORIENTATION, HEADER_TEMPLATE,
  FOOTER_TEMPLATE, TIMEOUT, SCALE, CUSTOM_CSS, COOKIES, USER_AGENT,
  PRINT_BACKGROUND, DEADLINE   fallbacks for the matching flags
  CHROME_PATH                  browser executable to use
  RUST_LOG                     log filter (overrides --verbose/--quiet)

GITHUB ACTIONS:
  When GITHUB_ACTIONS=true, INPUT_<NAME> variables override flags and the
  output path is appended to $GITHUB_OUTPUT as `pdf_path`.
"#;

/// Convert HTML files, URLs and inline markup to PDF.
#[derive(Parser, Debug)]
#[command(
    name = "html2pdf",
    version,
    about = "Convert HTML files, URLs and inline markup to PDF",
    long_about = "Convert HTML to PDF with a degrading renderer chain: headless Chromium first, \
then a second Chromium launcher, then wkhtmltopdf, and finally a text-only PDF that always succeeds.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// File path, http(s) URL, or inline HTML markup.
    #[arg(env = "SOURCE")]
    source: Option<String>,

    /// Destination PDF path (parent directories are created).
    #[arg(short, long, env = "OUTPUT")]
    output: Option<String>,

    /// CSS selector to wait for before printing.
    #[arg(long, alias = "wait_for", env = "WAIT_FOR")]
    wait_for: Option<String>,

    /// Paper format: A0–A6, Letter, Legal, Tabloid, Ledger [default: A4].
    #[arg(long, env = "FORMAT")]
    format: Option<String>,

    /// Margins in mm: "all" or "top,right,bottom,left" [default: 10,10,10,10].
    #[arg(long, env = "MARGIN")]
    margin: Option<String>,

    /// portrait or landscape [default: portrait].
    #[arg(long, env = "ORIENTATION")]
    orientation: Option<String>,

    /// HTML template for the page header.
    #[arg(long, alias = "header_template", env = "HEADER_TEMPLATE")]
    header_template: Option<String>,

    /// HTML template for the page footer.
    #[arg(long, alias = "footer_template", env = "FOOTER_TEMPLATE")]
    footer_template: Option<String>,

    /// Navigation timeout in milliseconds [default: 30000].
    #[arg(long, env = "TIMEOUT")]
    timeout: Option<String>,

    /// Render scale, > 0 [default: 1].
    #[arg(long, env = "SCALE")]
    scale: Option<String>,

    /// Extra CSS injected before printing.
    #[arg(long, alias = "custom_css", env = "CUSTOM_CSS")]
    custom_css: Option<String>,

    /// Cookies as a JSON array of {"name", "value", "domain"?, "path"?}.
    #[arg(long, env = "COOKIES")]
    cookies: Option<String>,

    /// User-Agent header for page loads.
    #[arg(long, alias = "user_agent", env = "USER_AGENT")]
    user_agent: Option<String>,

    /// Print CSS backgrounds: true or false [default: true].
    #[arg(long, alias = "print_background", env = "PRINT_BACKGROUND")]
    print_background: Option<String>,

    /// Hard limit per renderer attempt, in milliseconds [default: timeout + 30000].
    #[arg(long, env = "DEADLINE")]
    deadline: Option<String>,

    /// Report renderer availability and the discovered browser, then exit.
    #[arg(long)]
    check: bool,

    /// Print the conversion report as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Verbose logging (debug level).
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,

    /// Disable the progress spinner.
    #[arg(long)]
    no_progress: bool,
}

impl Cli {
    /// Flags and their `env` fallbacks as one config layer.
    fn raw_config(&self) -> RawConfig {
        RawConfig {
            source: self.source.clone(),
            output: self.output.clone(),
            wait_for: self.wait_for.clone(),
            format: self.format.clone(),
            margin: self.margin.clone(),
            orientation: self.orientation.clone(),
            header_template: self.header_template.clone(),
            footer_template: self.footer_template.clone(),
            timeout: self.timeout.clone(),
            scale: self.scale.clone(),
            custom_css: self.custom_css.clone(),
            cookies: self.cookies.clone(),
            user_agent: self.user_agent.clone(),
            print_background: self.print_background.clone(),
            deadline: self.deadline.clone(),
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let on_actions = is_github_actions(env_var);

    if let Err(e) = run(cli).await {
        if on_actions {
            println!("{}", error_command(&format!("{e:#}")));
        }
        eprintln!("{} {e:#}", red("✘"));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // ── Logging setup ──────────────────────────────────────────────────────
    // The spinner owns the terminal while it runs, so logs drop to errors
    // unless --verbose or RUST_LOG asks for more.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.check;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    if cli.check {
        print_check();
        return Ok(());
    }

    // ── Configuration: env < flags < platform inputs ───────────────────────
    let mut raw = cli.raw_config();
    if is_github_actions(env_var) {
        raw = raw.overlay(platform_inputs(env_var));
    }

    let source = raw.source().context("No source to convert")?.to_string();
    let request = raw.normalize().context("Invalid options")?;

    // ── Conversion ─────────────────────────────────────────────────────────
    let spinner = show_progress.then(|| Arc::new(SpinnerObserver::new()));
    let mut builder = FallbackPipeline::standard_builder(Arc::new(SystemLocator));
    if let Some(ref s) = spinner {
        builder = builder.observer(Arc::clone(s) as Arc<dyn PipelineObserver>);
    }
    let pipeline = builder.build();

    let result = pipeline.convert(&source, &request).await;
    if let Some(ref s) = spinner {
        s.finish();
    }
    let report = result.context("Conversion failed")?;

    if publishes_output(cli.json, env_var) {
        report_output(&report.pdf_path, env_var)
            .with_context(|| format!("Failed to publish output path {}", report.pdf_path.display()))?;
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    }

    if !cli.quiet {
        eprintln!(
            "{}  {}  via {}  {}ms",
            if report.degraded() { cyan("⚠") } else { green("✔") },
            bold(&report.pdf_path.display().to_string()),
            report.strategy,
            report.total_duration_ms,
        );
        if report.degraded() {
            eprintln!(
                "   {}",
                dim("higher-fidelity renderers failed; run with --verbose for details")
            );
        }
    }

    Ok(())
}

/// Whether to publish `pdf_path`. With `--json` stdout carries only the
/// report, so the plain `pdf_path=` line is dropped unless it goes to
/// `$GITHUB_OUTPUT`.
fn publishes_output(json: bool, lookup: impl Fn(&str) -> Option<String>) -> bool {
    !json || lookup("GITHUB_OUTPUT").is_some_and(|p| !p.is_empty())
}

/// `--check`: availability of every renderer plus the browser discovery result.
fn print_check() {
    let pipeline = FallbackPipeline::standard(Arc::new(SystemLocator));
    for status in pipeline.probe() {
        match status.availability {
            Availability::Available => println!("  {} {}", green("✓"), status.name),
            Availability::Unavailable(reason) => {
                println!("  {} {:<16} {}", red("✗"), status.name, dim(&reason))
            }
        }
    }

    match chrome_locate::find_chrome() {
        Ok(found) => println!(
            "\n  browser: {}  {}",
            bold(&found.path.display().to_string()),
            dim(&format!("({})", found.origin))
        ),
        Err(e) => println!("\n  browser: {}", red(&e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn snake_case_spellings_are_accepted() {
        let cli = Cli::try_parse_from([
            "html2pdf",
            "<p>x</p>",
            "--output=o.pdf",
            "--wait_for=#app",
            "--header_template=<b>h</b>",
            "--footer_template=<b>f</b>",
            "--custom_css=body{}",
            "--user_agent=bot/1",
            "--print_background=false",
        ])
        .unwrap();

        assert_eq!(cli.wait_for.as_deref(), Some("#app"));
        assert_eq!(cli.header_template.as_deref(), Some("<b>h</b>"));
        assert_eq!(cli.footer_template.as_deref(), Some("<b>f</b>"));
        assert_eq!(cli.custom_css.as_deref(), Some("body{}"));
        assert_eq!(cli.user_agent.as_deref(), Some("bot/1"));
        assert_eq!(cli.print_background.as_deref(), Some("false"));
    }

    #[test]
    fn kebab_case_spellings_still_work() {
        let cli = Cli::try_parse_from([
            "html2pdf",
            "page.html",
            "-o",
            "o.pdf",
            "--wait-for",
            "#ready",
            "--user-agent",
            "bot/2",
        ])
        .unwrap();

        let raw = cli.raw_config();
        assert_eq!(raw.wait_for.as_deref(), Some("#ready"));
        assert_eq!(raw.user_agent.as_deref(), Some("bot/2"));
        assert_eq!(raw.source.as_deref(), Some("page.html"));
    }

    #[test]
    fn json_mode_keeps_stdout_for_the_report() {
        assert!(publishes_output(false, no_env));
        assert!(!publishes_output(true, no_env));
        assert!(!publishes_output(true, |k| (k == "GITHUB_OUTPUT").then(String::new)));
        assert!(publishes_output(true, |k| (k == "GITHUB_OUTPUT").then(|| "/tmp/out".to_string())));
    }
}
