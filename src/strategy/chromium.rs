//! Full-fidelity rendering: Chromium driven over CDP by `chromiumoxide`.
//!
//! Every attempt launches its own browser with a throwaway profile directory
//! and tears it down before returning, success or not. The page is prepared
//! in this order: user agent, cookies (URL sources only), load, custom CSS,
//! optional selector wait, then `Page.printToPDF`.

use super::{bounded, chromium_templates, mm_to_inches, style_injection_script, write_pdf, Strategy};
use crate::config::{Cookie, Orientation, RenderRequest};
use crate::error::StrategyError;
use crate::locate::ExecutableLocator;
use crate::pipeline::input::LoadedSource;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, SetUserAgentOverrideParams};
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::Page;
use futures::StreamExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

/// Interval between selector probes while waiting for `wait_for`.
const SELECTOR_POLL: Duration = Duration::from_millis(100);

/// Chromium flags for a disposable, container-friendly headless instance.
const BROWSER_ARGS: &[&str] = &[
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--hide-scrollbars",
    "--mute-audio",
];

/// Strategy A.
pub struct ChromiumStrategy {
    locator: Arc<dyn ExecutableLocator>,
}

impl ChromiumStrategy {
    pub fn new(locator: Arc<dyn ExecutableLocator>) -> Self {
        Self { locator }
    }
}

#[async_trait]
impl Strategy for ChromiumStrategy {
    fn name(&self) -> &'static str {
        "chromium"
    }

    async fn attempt(&self, source: &LoadedSource, request: &RenderRequest) -> Result<(), StrategyError> {
        let exe = self.locator.locate_browser().ok_or_else(|| StrategyError::BrowserNotFound {
            detail: "set CHROME_PATH or install Chrome/Chromium".to_string(),
        })?;
        debug!("Launching {}", exe.display());

        let profile = tempfile::Builder::new()
            .prefix("html2pdf-chromium-")
            .tempdir()
            .map_err(StrategyError::io)?;

        let config = BrowserConfig::builder()
            .chrome_executable(&exe)
            .user_data_dir(profile.path())
            .no_sandbox()
            .request_timeout(request.timeout + Duration::from_secs(5))
            .args(BROWSER_ARGS.iter().copied())
            .build()
            .map_err(|detail| StrategyError::Launch { detail })?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| StrategyError::Launch { detail: e.to_string() })?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let result = render(&browser, source, request).await;

        // Teardown runs on every path; failures here don't change the outcome.
        if let Err(e) = browser.close().await {
            debug!("Closing browser: {}", e);
        }
        if let Err(e) = browser.wait().await {
            debug!("Waiting for browser exit: {}", e);
        }
        handler_task.abort();
        let _ = handler_task.await;

        let bytes = result?;
        info!("Chromium produced {} bytes", bytes.len());
        write_pdf(&request.output, &bytes)
    }
}

async fn render(browser: &Browser, source: &LoadedSource, request: &RenderRequest) -> Result<Vec<u8>, StrategyError> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| StrategyError::Launch { detail: e.to_string() })?;

    if let Some(ua) = &request.user_agent {
        page.set_user_agent(SetUserAgentOverrideParams::new(ua.clone()))
            .await
            .map_err(navigation)?;
    }

    let timeout = request.load_budget();
    match source.url() {
        Some(url) => {
            let cookies = cookie_params(&request.cookies, url)?;
            if !cookies.is_empty() {
                debug!("Setting {} cookies for {}", cookies.len(), url);
                page.set_cookies(cookies).await.map_err(navigation)?;
            }
            bounded(timeout, "navigating", page.goto(url.as_str()))
                .await?
                .map_err(navigation)?;
        }
        None => {
            let markup = source.markup.as_deref().unwrap_or_default();
            bounded(timeout, "loading content", page.set_content(markup))
                .await?
                .map_err(navigation)?;
        }
    }

    if let Some(css) = &request.custom_css {
        page.evaluate(style_injection_script(css))
            .await
            .map_err(|e| StrategyError::Render { detail: format!("injecting CSS: {e}") })?;
    }

    if let Some(selector) = &request.wait_for {
        wait_for_selector(&page, selector, timeout).await?;
    }

    page.pdf(pdf_params(request))
        .await
        .map_err(|e| StrategyError::Render { detail: e.to_string() })
}

async fn wait_for_selector(page: &Page, selector: &str, timeout: Duration) -> Result<(), StrategyError> {
    let started = Instant::now();
    loop {
        if page.find_element(selector).await.is_ok() {
            debug!("Selector '{}' present after {:?}", selector, started.elapsed());
            return Ok(());
        }
        if started.elapsed() >= timeout {
            return Err(StrategyError::Timeout {
                stage: format!("waiting for selector '{selector}'"),
                after_ms: timeout.as_millis() as u64,
            });
        }
        tokio::time::sleep(SELECTOR_POLL).await;
    }
}

fn navigation(e: chromiumoxide::error::CdpError) -> StrategyError {
    StrategyError::Navigation { detail: e.to_string() }
}

/// CDP cookie parameters, scoped to `url` where domain/path are unset.
fn cookie_params(cookies: &[Cookie], url: &Url) -> Result<Vec<CookieParam>, StrategyError> {
    cookies
        .iter()
        .map(|c| {
            let c = c.scoped_to(url);
            let mut builder = CookieParam::builder().name(c.name).value(c.value);
            if let Some(domain) = c.domain {
                builder = builder.domain(domain);
            }
            if let Some(path) = c.path {
                builder = builder.path(path);
            }
            builder
                .build()
                .map_err(|detail| StrategyError::Navigation { detail: format!("cookie: {detail}") })
        })
        .collect()
}

/// Print options. Paper size is given in portrait; Chromium swaps it for
/// landscape itself.
pub(crate) fn pdf_params(request: &RenderRequest) -> PrintToPdfParams {
    let (width_mm, height_mm) = request.format.dimensions_mm();
    let templates = chromium_templates(request);
    let margin = request.margin;
    PrintToPdfParams {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Margin, PaperFormat};
    use crate::locate::StaticLocator;
    use crate::strategy::EMPTY_TEMPLATE;

    #[test]
    fn print_params_follow_request() {
        let request = RenderRequest::builder("x.pdf")
            .format(PaperFormat::Letter)
            .orientation(Orientation::Landscape)
            .margin(Margin { top: 254, right: 0, bottom: 127, left: 0 })
            .scale(0.8)
            .print_background(false)
            .header_template("<div class=\"title\"></div>")
            .build()
            .unwrap();
        let p = pdf_params(&request);
        assert_eq!(p.landscape, Some(true));
        assert_eq!(p.print_background, Some(false));
        assert_eq!(p.scale, Some(0.8));
        assert!((p.paper_width.unwrap() - 8.5).abs() < 1e-9);
        assert!((p.paper_height.unwrap() - 11.0).abs() < 1e-9);
        assert!((p.margin_top.unwrap() - 10.0).abs() < 1e-9);
        assert!((p.margin_bottom.unwrap() - 5.0).abs() < 1e-9);
        assert_eq!(p.display_header_footer, Some(true));
        assert_eq!(p.footer_template.as_deref(), Some(EMPTY_TEMPLATE));
    }

    #[test]
    fn no_templates_means_no_header_footer() {
        let p = pdf_params(&RenderRequest::builder("x.pdf").build().unwrap());
        assert_eq!(p.display_header_footer, Some(false));
        assert!(p.header_template.is_none());
        assert!(p.footer_template.is_none());
    }

    #[test]
    fn cookies_default_to_source_host() {
        let url = Url::parse("https://app.example.com/dashboard").unwrap();
        let params = cookie_params(&[Cookie::new("session", "abc")], &url).unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name, "session");
        assert_eq!(params[0].domain.as_deref(), Some("app.example.com"));
        assert_eq!(params[0].path.as_deref(), Some("/"));
    }

    #[tokio::test]
    async fn missing_browser_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("a.pdf");
        let strategy = ChromiumStrategy::new(Arc::new(StaticLocator::empty()));
        let src = LoadedSource::from_input("<p>x</p>").unwrap();
        let request = RenderRequest::builder(&out).build().unwrap();

        let err = strategy.attempt(&src, &request).await.unwrap_err();
        assert!(matches!(err, StrategyError::BrowserNotFound { .. }));
        assert!(!out.exists());
    }
}
