//! Configuration types for HTML-to-PDF conversion.
//!
//! Two layers:
//!
//! * [`RawConfig`] — every option as an optional string, exactly as it
//!   arrived from a CI platform input, a `--name=value` flag, or an
//!   environment variable. Layers are merged with [`RawConfig::overlay`].
//! * [`RenderRequest`] — the normalised, validated, immutable value object
//!   every renderer consumes. Built by [`RawConfig::normalize`] or, for
//!   library callers, by [`RenderRequest::builder`].
//!
//! # Design choice: normalise once
//! Renderers never see raw strings. Parsing margins, cookies and numbers in
//! one place means a malformed option aborts the run *before* a browser is
//! launched, and every strategy in the fallback chain sees the same values.

use crate::error::Html2PdfError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Default navigation timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default margin option string (millimetres, top,right,bottom,left).
pub const DEFAULT_MARGIN: &str = "10,10,10,10";

/// Extra time an attempt may take beyond the navigation timeout before the
/// orchestrator abandons it.
pub const DEADLINE_GRACE: Duration = Duration::from_secs(30);

// ── Raw, layered input ───────────────────────────────────────────────────

/// Unvalidated options, one optional string per input name.
///
/// Empty strings are treated as "not set" everywhere, because CI platforms
/// materialise undeclared inputs as empty values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawConfig {
    pub source: Option<String>,
    pub output: Option<String>,
    pub wait_for: Option<String>,
    pub format: Option<String>,
    pub margin: Option<String>,
    pub orientation: Option<String>,
    pub header_template: Option<String>,
    pub footer_template: Option<String>,
    pub timeout: Option<String>,
    pub scale: Option<String>,
    pub custom_css: Option<String>,
    pub cookies: Option<String>,
    pub user_agent: Option<String>,
    pub print_background: Option<String>,
    pub deadline: Option<String>,
}

/// Every input name, in declaration order. Environment variables and CI
/// inputs are derived from these by upper-casing.
pub const INPUT_NAMES: &[&str] = &[
    "source",
    "output",
    "wait_for",
    "format",
    "margin",
    "orientation",
    "header_template",
    "footer_template",
    "timeout",
    "scale",
    "custom_css",
    "cookies",
    "user_agent",
    "print_background",
    "deadline",
];

impl RawConfig {
    /// Build a config by asking `lookup` for each input name.
    ///
    /// `lookup` receives the lower-case input name (e.g. `"wait_for"`) and
    /// decides how to map it to its backing store (env var, CI input, …).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut raw = RawConfig::default();
        for &name in INPUT_NAMES {
            if let Some(value) = lookup(name) {
                raw.set(name, value);
            }
        }
        raw
    }

    /// Set an input by name. Unknown names are ignored.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = non_empty(Some(value.into()));
        let slot = match name {
            "source" => &mut self.source,
            "output" => &mut self.output,
            "wait_for" => &mut self.wait_for,
            "format" => &mut self.format,
            "margin" => &mut self.margin,
            "orientation" => &mut self.orientation,
            "header_template" => &mut self.header_template,
            "footer_template" => &mut self.footer_template,
            "timeout" => &mut self.timeout,
            "scale" => &mut self.scale,
            "custom_css" => &mut self.custom_css,
            "cookies" => &mut self.cookies,
            "user_agent" => &mut self.user_agent,
            "print_background" => &mut self.print_background,
            "deadline" => &mut self.deadline,
            _ => return,
        };
        *slot = value;
    }

    /// Layer `higher` on top of `self`: every value set in `higher` wins.
    pub fn overlay(self, higher: RawConfig) -> RawConfig {
        fn pick(high: Option<String>, low: Option<String>) -> Option<String> {
            non_empty(high).or_else(|| non_empty(low))
        }
        RawConfig {
            source: pick(higher.source, self.source),
            output: pick(higher.output, self.output),
            wait_for: pick(higher.wait_for, self.wait_for),
            format: pick(higher.format, self.format),
            margin: pick(higher.margin, self.margin),
            orientation: pick(higher.orientation, self.orientation),
            header_template: pick(higher.header_template, self.header_template),
            footer_template: pick(higher.footer_template, self.footer_template),
            timeout: pick(higher.timeout, self.timeout),
            scale: pick(higher.scale, self.scale),
            custom_css: pick(higher.custom_css, self.custom_css),
            cookies: pick(higher.cookies, self.cookies),
            user_agent: pick(higher.user_agent, self.user_agent),
            print_background: pick(higher.print_background, self.print_background),
            deadline: pick(higher.deadline, self.deadline),
        }
    }

    /// The required `source` input.
    pub fn source(&self) -> Result<&str, Html2PdfError> {
        self.source
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(Html2PdfError::MissingInput { name: "source", env: "SOURCE" })
    }

    /// Validate and convert into a [`RenderRequest`].
    ///
    /// Fails only on a missing `output` or a malformed margin. Cookies, the
    /// timeout and the scale degrade to their defaults with a warning.
    pub fn normalize(&self) -> Result<RenderRequest, Html2PdfError> {
        let output = non_empty(self.output.clone())
            .ok_or(Html2PdfError::MissingInput { name: "output", env: "OUTPUT" })?;

        let margin = parse_margin(self.margin.as_deref().unwrap_or(DEFAULT_MARGIN))?;

        let timeout_ms = match self.timeout.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_TIMEOUT_MS,
            Some(s) => s.parse::<u64>().unwrap_or_else(|_| {
                warn!("Invalid timeout '{}', using default {}ms", s, DEFAULT_TIMEOUT_MS);
                DEFAULT_TIMEOUT_MS
            }),
        };

        let scale = match self.scale.as_deref().map(str::trim) {
            None | Some("") => 1.0,
            Some(s) => match s.parse::<f64>() {
                Ok(v) if v.is_finite() && v > 0.0 => v,
                _ => {
                    warn!("Invalid scale '{}', using default 1.0", s);
                    1.0
                }
            },
        };

        let deadline = match self.deadline.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(s) => match s.parse::<u64>() {
                Ok(ms) if ms > 0 => Some(Duration::from_millis(ms)),
                _ => {
                    warn!("Invalid deadline '{}', deriving it from the timeout", s);
                    None
                }
            },
        };

        let orientation = match self.orientation.as_deref() {
            None => Orientation::Portrait,
            Some(s) => s.parse().unwrap_or_else(|_| {
                warn!("Unknown orientation '{}', using portrait", s);
                Orientation::Portrait
            }),
        };

        Ok(RenderRequest {
            output: PathBuf::from(output),
            format: self.format.as_deref().map(PaperFormat::parse).unwrap_or_default(),
            margin,
            orientation,
            header_template: non_empty(self.header_template.clone()),
            footer_template: non_empty(self.footer_template.clone()),
            timeout: Duration::from_millis(timeout_ms),
            scale,
            custom_css: non_empty(self.custom_css.clone()),
            cookies: self.cookies.as_deref().map(parse_cookies).unwrap_or_default(),
            user_agent: non_empty(self.user_agent.clone()),
            print_background: self.print_background.as_deref() != Some("false"),
            wait_for: non_empty(self.wait_for.clone()),
            deadline,
        })
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.is_empty())
}

// ── Normalised request ───────────────────────────────────────────────────

/// The validated set of PDF-generation options.
///
/// Built via [`RenderRequest::builder()`] or [`RawConfig::normalize`].
/// Immutable once built: every strategy in the fallback chain reads the same
/// value, which is what makes each attempt independently retriable.
///
/// # Example
/// ```rust
/// use edgequake_html2pdf::{Orientation, RenderRequest};
///
/// let request = RenderRequest::builder("out/report.pdf")
///     .orientation(Orientation::Landscape)
///     .timeout_ms(10_000)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Destination file. Only the winning strategy ever writes here.
    pub output: PathBuf,

    /// Paper size. Default: A4.
    pub format: PaperFormat,

    /// Page margins in millimetres. Default: 10 mm on every side.
    pub margin: Margin,

    /// Default: portrait.
    pub orientation: Orientation,

    /// Markup printed at the top of every page (Chromium template syntax:
    /// `<span class="pageNumber"></span>` etc.).
    pub header_template: Option<String>,

    /// Markup printed at the bottom of every page.
    pub footer_template: Option<String>,

    /// Navigation and selector-wait timeout. Default: 30 s.
    pub timeout: Duration,

    /// Rendering scale. Strictly positive. Default: 1.0.
    pub scale: f64,

    /// Stylesheet injected into the page before printing.
    pub custom_css: Option<String>,

    /// Cookies applied before navigating to URL sources.
    pub cookies: Vec<Cookie>,

    /// User-Agent header override.
    pub user_agent: Option<String>,

    /// Print CSS backgrounds. Default: true.
    pub print_background: bool,

    /// CSS selector that must appear before printing (client-rendered pages).
    pub wait_for: Option<String>,

    /// Hard limit for a single strategy attempt. `None` derives it from
    /// `timeout` (see [`RenderRequest::attempt_deadline`]).
    pub deadline: Option<Duration>,
}

impl RenderRequest {
    /// Create a new builder writing to `output`.
    pub fn builder(output: impl Into<PathBuf>) -> RenderRequestBuilder {
        RenderRequestBuilder {
            request: RenderRequest {
                output: output.into(),
                format: PaperFormat::default(),
                margin: Margin::uniform(10),
                orientation: Orientation::Portrait,
                header_template: None,
                footer_template: None,
                timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
                scale: 1.0,
                custom_css: None,
                cookies: Vec::new(),
                user_agent: None,
                print_background: true,
                wait_for: None,
                deadline: None,
            },
        }
    }

    /// The longest a single strategy attempt may run before the orchestrator
    /// abandons it and moves on.
    pub fn attempt_deadline(&self) -> Duration {
        self.deadline.unwrap_or(self.timeout + DEADLINE_GRACE)
    }

    /// Time a strategy may spend on one blocking step (launch, page load,
    /// selector wait, fetch): the navigation timeout, capped at three
    /// quarters of the attempt deadline so the rest of the attempt still
    /// fits when `deadline` is shorter than `timeout`.
    pub fn load_budget(&self) -> Duration {
        self.timeout.min(self.attempt_deadline() * 3 / 4)
    }

    /// Paper width and height in millimetres, after applying orientation.
    pub fn page_size_mm(&self) -> (f64, f64) {
        let (w, h) = self.format.dimensions_mm();
        match self.orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }

    /// Whether a header or footer template was supplied.
    pub fn has_header_footer(&self) -> bool {
        self.header_template.is_some() || self.footer_template.is_some()
    }
}

/// Builder for [`RenderRequest`].
#[derive(Debug)]
pub struct RenderRequestBuilder {
    request: RenderRequest,
}

impl RenderRequestBuilder {
    pub fn format(mut self, format: PaperFormat) -> Self {
        self.request.format = format;
        self
    }

    pub fn margin(mut self, margin: Margin) -> Self {
        self.request.margin = margin;
        self
    }

    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.request.orientation = orientation;
        self
    }

    pub fn header_template(mut self, markup: impl Into<String>) -> Self {
        self.request.header_template = Some(markup.into());
        self
    }

    pub fn footer_template(mut self, markup: impl Into<String>) -> Self {
        self.request.footer_template = Some(markup.into());
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.request.timeout = Duration::from_millis(ms);
        self
    }

    pub fn scale(mut self, scale: f64) -> Self {
        self.request.scale = scale;
        self
    }

    pub fn custom_css(mut self, css: impl Into<String>) -> Self {
        self.request.custom_css = Some(css.into());
        self
    }

    pub fn cookie(mut self, cookie: Cookie) -> Self {
        self.request.cookies.push(cookie);
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.request.user_agent = Some(ua.into());
        self
    }

    pub fn print_background(mut self, v: bool) -> Self {
        self.request.print_background = v;
        self
    }

    pub fn wait_for(mut self, selector: impl Into<String>) -> Self {
        self.request.wait_for = Some(selector.into());
        self
    }

    pub fn deadline_ms(mut self, ms: u64) -> Self {
        self.request.deadline = Some(Duration::from_millis(ms.max(1)));
        self
    }

    /// Build the request, validating constraints.
    pub fn build(self) -> Result<RenderRequest, Html2PdfError> {
        let r = &self.request;
        if !(r.scale.is_finite() && r.scale > 0.0) {
            return Err(Html2PdfError::InvalidConfig(format!(
                "Scale must be a positive number, got {}",
                r.scale
            )));
        }
        if r.output.as_os_str().is_empty() {
            return Err(Html2PdfError::MissingInput { name: "output", env: "OUTPUT" });
        }
        Ok(self.request)
    }
}

// ── Value types ──────────────────────────────────────────────────────────

/// Page margins in whole millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Margin {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl Margin {
    /// The same margin on all four sides.
    pub fn uniform(mm: u32) -> Self {
        Self { top: mm, right: mm, bottom: mm, left: mm }
    }
}

/// Parse a margin option: exactly 1 or 4 comma-separated non-negative integers.
///
/// One value applies to every side; four values map positionally to
/// top, right, bottom, left.
pub fn parse_margin(s: &str) -> Result<Margin, Html2PdfError> {
    let values = s
        .split(',')
        .map(|part| {
            part.trim().parse::<u32>().map_err(|_| {
                Html2PdfError::InvalidConfig(format!(
                    "Margin '{}' must contain non-negative integers (got '{}')",
                    s,
                    part.trim()
                ))
            })
        })
        .collect::<Result<Vec<u32>, _>>()?;

    match values.as_slice() {
        [all] => Ok(Margin::uniform(*all)),
        [top, right, bottom, left] => Ok(Margin {
            top: *top,
            right: *right,
            bottom: *bottom,
            left: *left,
        }),
        other => Err(Html2PdfError::InvalidConfig(format!(
            "Margin '{}' must have 1 or 4 comma-separated values, got {}",
            s,
            other.len()
        ))),
    }
}

/// Page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl std::str::FromStr for Orientation {
    type Err = Html2PdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "portrait" => Ok(Orientation::Portrait),
            "landscape" => Ok(Orientation::Landscape),
            other => Err(Html2PdfError::InvalidConfig(format!(
                "Orientation must be 'portrait' or 'landscape', got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Portrait => f.write_str("Portrait"),
            Orientation::Landscape => f.write_str("Landscape"),
        }
    }
}

/// Named paper sizes. Unknown names are kept verbatim in [`PaperFormat::Other`]
/// and handed to renderers that understand them (the CLI converter does).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaperFormat {
    A0,
    A1,
    A2,
    A3,
    #[default]
    A4,
    A5,
    A6,
    Letter,
    Legal,
    Tabloid,
    Ledger,
    Other(String),
}

impl PaperFormat {
    /// Case-insensitive parse; never fails.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "a0" => PaperFormat::A0,
            "a1" => PaperFormat::A1,
            "a2" => PaperFormat::A2,
            "a3" => PaperFormat::A3,
            "" | "a4" => PaperFormat::A4,
            "a5" => PaperFormat::A5,
            "a6" => PaperFormat::A6,
            "letter" => PaperFormat::Letter,
            "legal" => PaperFormat::Legal,
            "tabloid" => PaperFormat::Tabloid,
            "ledger" => PaperFormat::Ledger,
            _ => PaperFormat::Other(s.trim().to_string()),
        }
    }

    /// Portrait width and height in millimetres.
    ///
    /// [`PaperFormat::Other`] has no known geometry; renderers that need
    /// numbers use A4.
    pub fn dimensions_mm(&self) -> (f64, f64) {
        match self {
            PaperFormat::A0 => (841.0, 1189.0),
            PaperFormat::A1 => (594.0, 841.0),
            PaperFormat::A2 => (420.0, 594.0),
            PaperFormat::A3 => (297.0, 420.0),
            PaperFormat::A4 | PaperFormat::Other(_) => (210.0, 297.0),
            PaperFormat::A5 => (148.0, 210.0),
            PaperFormat::A6 => (105.0, 148.0),
            PaperFormat::Letter => (215.9, 279.4),
            PaperFormat::Legal => (215.9, 355.6),
            PaperFormat::Tabloid => (279.4, 431.8),
            PaperFormat::Ledger => (431.8, 279.4),
        }
    }

    /// The name as renderers expect it (`A4`, `Letter`, or the raw string).
    pub fn name(&self) -> &str {
        match self {
            PaperFormat::A0 => "A0",
            PaperFormat::A1 => "A1",
            PaperFormat::A2 => "A2",
            PaperFormat::A3 => "A3",
            PaperFormat::A4 => "A4",
            PaperFormat::A5 => "A5",
            PaperFormat::A6 => "A6",
            PaperFormat::Letter => "Letter",
            PaperFormat::Legal => "Legal",
            PaperFormat::Tabloid => "Tabloid",
            PaperFormat::Ledger => "Ledger",
            PaperFormat::Other(s) => s,
        }
    }
}

/// A cookie to set before loading a URL source.
///
/// `domain` and `path` default to the source URL's host and `/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
        }
    }

    /// Fill in `domain` and `path` from the URL being loaded.
    pub fn scoped_to(&self, url: &url::Url) -> Cookie {
        Cookie {
            name: self.name.clone(),
            value: self.value.clone(),
            domain: self
                .domain
                .clone()
                .or_else(|| url.host_str().map(str::to_string)),
            path: self.path.clone().or_else(|| Some("/".to_string())),
        }
    }
}

/// Parse the cookies option (a JSON array of `{name, value, domain?, path?}`).
///
/// Cookies are best-effort: malformed JSON is logged and yields an empty set
/// instead of aborting the run.
pub fn parse_cookies(s: &str) -> Vec<Cookie> {
    if s.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Vec<Cookie>>(s) {
        Ok(cookies) => cookies,
        Err(e) => {
            warn!("Ignoring invalid cookies JSON: {}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_with_output() -> RawConfig {
        RawConfig {
            output: Some("out.pdf".into()),
            ..Default::default()
        }
    }

    #[test]
    fn margin_single_value_broadcasts() {
        assert_eq!(parse_margin("10").unwrap(), Margin::uniform(10));
    }

    #[test]
    fn margin_four_values_are_positional() {
        let m = parse_margin("20,15,20,15").unwrap();
        assert_eq!(m, Margin { top: 20, right: 15, bottom: 20, left: 15 });
        let m = parse_margin(" 1, 2 ,3,4 ").unwrap();
        assert_eq!(m, Margin { top: 1, right: 2, bottom: 3, left: 4 });
    }

    #[test]
    fn margin_rejects_wrong_arity_and_garbage() {
        assert!(matches!(parse_margin("1,2,3"), Err(Html2PdfError::InvalidConfig(_))));
        assert!(matches!(parse_margin("1,2"), Err(Html2PdfError::InvalidConfig(_))));
        assert!(matches!(parse_margin("1,2,3,4,5"), Err(Html2PdfError::InvalidConfig(_))));
        assert!(matches!(parse_margin("ten"), Err(Html2PdfError::InvalidConfig(_))));
        assert!(matches!(parse_margin("-5"), Err(Html2PdfError::InvalidConfig(_))));
        assert!(matches!(parse_margin(""), Err(Html2PdfError::InvalidConfig(_))));
    }

    #[test]
    fn invalid_cookie_json_degrades_to_empty() {
        assert!(parse_cookies("not json").is_empty());
        assert!(parse_cookies(r#"{"name":"a","value":"b"}"#).is_empty());

        let raw = RawConfig {
            cookies: Some("not json".into()),
            ..raw_with_output()
        };
        let request = raw.normalize().expect("bad cookies must not abort");
        assert!(request.cookies.is_empty());
    }

    #[test]
    fn cookie_json_is_parsed_in_order() {
        let cookies = parse_cookies(
            r#"[{"name":"session","value":"abc","domain":"example.com"},{"name":"theme","value":"dark","path":"/app"}]"#,
        );
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0].name, "session");
        assert_eq!(cookies[0].domain.as_deref(), Some("example.com"));
        assert_eq!(cookies[1].path.as_deref(), Some("/app"));
        assert_eq!(cookies[1].domain, None);
    }

    #[test]
    fn cookie_defaults_come_from_url() {
        let url = url::Url::parse("https://docs.example.org/guide/intro").unwrap();
        let scoped = Cookie::new("k", "v").scoped_to(&url);
        assert_eq!(scoped.domain.as_deref(), Some("docs.example.org"));
        assert_eq!(scoped.path.as_deref(), Some("/"));

        let explicit = Cookie {
            domain: Some(".example.org".into()),
            path: Some("/guide".into()),
            ..Cookie::new("k", "v")
        };
        let scoped = explicit.scoped_to(&url);
        assert_eq!(scoped.domain.as_deref(), Some(".example.org"));
        assert_eq!(scoped.path.as_deref(), Some("/guide"));
    }

    #[test]
    fn defaults_are_documented_values() {
        let r = raw_with_output().normalize().unwrap();
        assert_eq!(r.format, PaperFormat::A4);
        assert_eq!(r.margin, Margin::uniform(10));
        assert_eq!(r.orientation, Orientation::Portrait);
        assert_eq!(r.timeout, Duration::from_millis(30_000));
        assert_eq!(r.scale, 1.0);
        assert!(r.print_background);
        assert!(r.cookies.is_empty());
        assert_eq!(r.wait_for, None);
        assert_eq!(r.attempt_deadline(), Duration::from_millis(30_000) + DEADLINE_GRACE);
        assert_eq!(r.load_budget(), r.timeout);
    }

    #[test]
    fn short_deadline_caps_the_load_budget() {
        let r = RenderRequest::builder("x.pdf").timeout_ms(3_000).deadline_ms(500).build().unwrap();
        assert_eq!(r.load_budget(), Duration::from_millis(375));

        let r = RenderRequest::builder("x.pdf").timeout_ms(3_000).deadline_ms(60_000).build().unwrap();
        assert_eq!(r.load_budget(), Duration::from_millis(3_000));
    }

    #[test]
    fn bad_numbers_fall_back_to_defaults() {
        let raw = RawConfig {
            timeout: Some("soon".into()),
            scale: Some("big".into()),
            ..raw_with_output()
        };
        let r = raw.normalize().unwrap();
        assert_eq!(r.timeout, Duration::from_millis(DEFAULT_TIMEOUT_MS));
        assert_eq!(r.scale, 1.0);

        let raw = RawConfig {
            scale: Some("-2".into()),
            ..raw_with_output()
        };
        assert_eq!(raw.normalize().unwrap().scale, 1.0);
    }

    #[test]
    fn print_background_only_disabled_by_literal_false() {
        for (value, expected) in [("false", false), ("False", true), ("0", true), ("no", true), ("true", true)] {
            let raw = RawConfig {
                print_background: Some(value.into()),
                ..raw_with_output()
            };
            assert_eq!(raw.normalize().unwrap().print_background, expected, "value {value:?}");
        }
    }

    #[test]
    fn bad_margin_is_fatal() {
        let raw = RawConfig {
            margin: Some("1,2,3".into()),
            ..raw_with_output()
        };
        assert!(matches!(raw.normalize(), Err(Html2PdfError::InvalidConfig(_))));
    }

    #[test]
    fn missing_required_inputs() {
        assert!(matches!(
            RawConfig::default().normalize(),
            Err(Html2PdfError::MissingInput { name: "output", .. })
        ));
        assert!(matches!(
            RawConfig::default().source(),
            Err(Html2PdfError::MissingInput { name: "source", .. })
        ));
    }

    #[test]
    fn overlay_prefers_higher_layer_and_skips_empty() {
        let env = RawConfig {
            format: Some("Letter".into()),
            timeout: Some("1000".into()),
            ..Default::default()
        };
        let cli = RawConfig {
            format: Some("A3".into()),
            scale: Some("".into()),
            ..Default::default()
        };
        let merged = env.overlay(cli);
        assert_eq!(merged.format.as_deref(), Some("A3"));
        assert_eq!(merged.timeout.as_deref(), Some("1000"));
        assert_eq!(merged.scale, None);
    }

    #[test]
    fn from_lookup_maps_every_name() {
        let raw = RawConfig::from_lookup(|name| match name {
            "wait_for" => Some("#ready".into()),
            "print_background" => Some("false".into()),
            "user_agent" => Some(String::new()),
            _ => None,
        });
        assert_eq!(raw.wait_for.as_deref(), Some("#ready"));
        assert_eq!(raw.print_background.as_deref(), Some("false"));
        assert_eq!(raw.user_agent, None);
    }

    #[test]
    fn paper_format_parse_and_passthrough() {
        assert_eq!(PaperFormat::parse("letter"), PaperFormat::Letter);
        assert_eq!(PaperFormat::parse(" A3 "), PaperFormat::A3);
        let other = PaperFormat::parse("B5");
        assert_eq!(other, PaperFormat::Other("B5".into()));
        assert_eq!(other.name(), "B5");
        assert_eq!(other.dimensions_mm(), PaperFormat::A4.dimensions_mm());
    }

    #[test]
    fn landscape_swaps_page_size() {
        let r = RenderRequest::builder("x.pdf")
            .orientation(Orientation::Landscape)
            .build()
            .unwrap();
        assert_eq!(r.page_size_mm(), (297.0, 210.0));
    }

    #[test]
    fn builder_rejects_non_positive_scale() {
        assert!(RenderRequest::builder("x.pdf").scale(0.0).build().is_err());
        assert!(RenderRequest::builder("x.pdf").scale(f64::NAN).build().is_err());
        assert!(RenderRequest::builder("").build().is_err());
    }

    #[test]
    fn orientation_parse_is_case_insensitive() {
        assert_eq!("LANDSCAPE".parse::<Orientation>().unwrap(), Orientation::Landscape);
        assert!("sideways".parse::<Orientation>().is_err());
    }
}
