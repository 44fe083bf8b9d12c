//! Second browser attempt: `headless_chrome`, a separate and fully blocking
//! CDP implementation with its own process launcher.
//!
//! It covers the same options as [`super::chromium`] but shares none of its
//! code paths, so an environment quirk that breaks one launcher (sandbox
//! flags, websocket handshake, missing shared library on a code path) may
//! leave the other working. The whole attempt runs on the blocking pool.
//!
//! A browser path from the locator is passed through when there is one;
//! otherwise `headless_chrome` runs its own discovery.
//!
//! A blocking thread cannot be aborted, so the attempt shares a
//! [`CancelFlag`] with it. The flag is raised when the async side stops
//! waiting (its own limit, or the pipeline dropping the attempt) and the
//! thread checks it between protocol steps, dropping the browser (which
//! kills the process) at the first checkpoint it reaches. Each step is
//! itself bounded by the request's load budget.

use super::{bounded, chromium_templates, mm_to_inches, stage_temp, style_injection_script, write_pdf, Strategy};
use crate::config::{Cookie, Orientation, RenderRequest};
use crate::error::StrategyError;
use crate::locate::ExecutableLocator;
use crate::pipeline::input::LoadedSource;
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Network::CookieParam;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Time allowed for process start-up on top of the navigation timeout.
const LAUNCH_ALLOWANCE: Duration = Duration::from_secs(20);

/// Raised once nobody waits for the blocking render any more.
#[derive(Clone, Default)]
struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Err once cancelled, naming the step that was not started.
    fn checkpoint(&self, stage: &str, request: &RenderRequest) -> Result<(), StrategyError> {
        if self.is_cancelled() {
            debug!("headless_chrome render abandoned before {stage}");
            return Err(StrategyError::Timeout {
                stage: stage.to_string(),
                after_ms: request.attempt_deadline().as_millis() as u64,
            });
        }
        Ok(())
    }
}

/// Cancels its flag on drop, however the attempt future ends.
struct CancelOnDrop(CancelFlag);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Strategy B.
pub struct HeadlessChromeStrategy {
    locator: Arc<dyn ExecutableLocator>,
}

impl HeadlessChromeStrategy {
    pub fn new(locator: Arc<dyn ExecutableLocator>) -> Self {
        Self { locator }
    }
}

#[async_trait]
impl Strategy for HeadlessChromeStrategy {
    fn name(&self) -> &'static str {
        "headless-chrome"
    }

    async fn attempt(&self, source: &LoadedSource, request: &RenderRequest) -> Result<(), StrategyError> {
        let exe = self.locator.locate_browser();
        match &exe {
            Some(path) => debug!("Using located browser {}", path.display()),
            None => debug!("No located browser; deferring to headless_chrome discovery"),
        }

        let cancel = CancelFlag::default();
        let _guard = CancelOnDrop(cancel.clone());
        let source = source.clone();
        let job_request = request.clone();
        let handle = tokio::task::spawn_blocking(move || render_blocking(exe, &source, &job_request, &cancel));

        let limit = (request.timeout + LAUNCH_ALLOWANCE).min(request.attempt_deadline());
        let bytes = bounded(limit, "rendering", handle)
            .await?
            .map_err(|e| StrategyError::Render { detail: format!("render task panicked: {e}") })??;
        info!("headless_chrome produced {} bytes", bytes.len());
        write_pdf(&request.output, &bytes)
    }
}

fn render_blocking(
    exe: Option<PathBuf>,
    source: &LoadedSource,
    request: &RenderRequest,
    cancel: &CancelFlag,
) -> Result<Vec<u8>, StrategyError> {
    let budget = request.load_budget();
    cancel.checkpoint("launching", request)?;

    let profile = tempfile::Builder::new()
        .prefix("html2pdf-headless-")
        .tempdir()
        .map_err(StrategyError::io)?;

    let options = LaunchOptions::default_builder()
        .path(exe)
        .headless(true)
        .sandbox(false)
        .user_data_dir(Some(profile.path().to_path_buf()))
        .idle_browser_timeout(budget + LAUNCH_ALLOWANCE)
        .args(vec![
            OsStr::new("--disable-gpu"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new("--hide-scrollbars"),
        ])
        .build()
        .map_err(|e| StrategyError::Launch { detail: e.to_string() })?;

    let browser = Browser::new(options).map_err(|e| StrategyError::Launch { detail: e.to_string() })?;
    cancel.checkpoint("opening a tab", request)?;
    let tab = browser
        .new_tab()
        .map_err(|e| StrategyError::Launch { detail: e.to_string() })?;
    tab.set_default_timeout(budget);

    if let Some(ua) = &request.user_agent {
        tab.set_user_agent(ua, None, None)
            .map_err(|e| classify("setting user agent", e, budget))?;
    }

    // Inline markup has to be navigable; the file lives until this returns.
    let mut _staged = None;
    let target = match source.navigable_url() {
        Some(url) => url,
        None => {
            let markup = source.markup.as_deref().unwrap_or_default();
            let file = stage_temp(markup, ".html")?;
            let url = Url::from_file_path(file.path()).map_err(|_| StrategyError::Io {
                detail: format!("cannot build file URL for {}", file.path().display()),
            })?;
            _staged = Some(file);
            url
        }
    };

    if let Some(url) = source.url() {
        let cookies = cookie_params(&request.cookies, url)?;
        if !cookies.is_empty() {
            debug!("Setting {} cookies for {}", cookies.len(), url);
            tab.set_cookies(cookies)
                .map_err(|e| classify("setting cookies", e, budget))?;
        }
    }

    cancel.checkpoint("navigating", request)?;
    tab.navigate_to(target.as_str())
        .and_then(|t| t.wait_until_navigated())
        .map_err(|e| classify("navigating", e, budget))?;
    cancel.checkpoint("styling", request)?;

    if let Some(css) = &request.custom_css {
        tab.evaluate(&style_injection_script(css), false)
            .map_err(|e| StrategyError::Render { detail: format!("injecting CSS: {e}") })?;
    }

    if let Some(selector) = &request.wait_for {
        tab.wait_for_element_with_custom_timeout(selector, budget)
            .map_err(|e| classify(&format!("waiting for selector '{selector}'"), e, budget))?;
    }

    cancel.checkpoint("printing", request)?;

    tab.print_to_pdf(Some(pdf_options(request)))
        .map_err(|e| StrategyError::Render { detail: e.to_string() })
}

/// Split library errors into timeouts and navigation failures.
fn classify(stage: &str, e: anyhow::Error, timeout: Duration) -> StrategyError {
    let is_timeout = e.downcast_ref::<headless_chrome::util::Timeout>().is_some()
        || e.to_string().to_ascii_lowercase().contains("timed out");
    if is_timeout {
        StrategyError::Timeout {
            stage: stage.to_string(),
            after_ms: timeout.as_millis() as u64,
        }
    } else {
        StrategyError::Navigation {
            detail: format!("{stage}: {e}"),
        }
    }
}

fn cookie_params(cookies: &[Cookie], url: &Url) -> Result<Vec<CookieParam>, StrategyError> {
    cookies
        .iter()
        .map(|c| {
            let value = serde_json::to_value(c.scoped_to(url)).map_err(StrategyError::io)?;
            serde_json::from_value(value).map_err(|e| StrategyError::Navigation {
                detail: format!("cookie '{}': {e}", c.name),
            })
        })
        .collect()
}

pub(crate) fn pdf_options(request: &RenderRequest) -> PrintToPdfOptions {
    let (width_mm, height_mm) = request.format.dimensions_mm();
    let templates = chromium_templates(request);
    let margin = request.margin;
    PrintToPdfOptions {
        landscape: Some(request.orientation == Orientation::Landscape),
        display_header_footer: Some(templates.is_some()),
        print_background: Some(request.print_background),
        scale: Some(request.scale),
        paper_width: Some(width_mm / 25.4),
        paper_height: Some(height_mm / 25.4),
        margin_top: Some(mm_to_inches(margin.top)),
        margin_bottom: Some(mm_to_inches(margin.bottom)),
        margin_left: Some(mm_to_inches(margin.left)),
        margin_right: Some(mm_to_inches(margin.right)),
        header_template: templates.as_ref().map(|(header, _)| header.clone()),
        footer_template: templates.map(|(_, footer)| footer),
        prefer_css_page_size: Some(false),
        ..Default::default()
    }
}
