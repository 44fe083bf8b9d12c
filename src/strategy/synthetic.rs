//! Last-resort renderer: a text-only PDF written in-process.
//!
//! No browser, no external program, no network requirement. The document
//! carries a fixed title, a notice that full rendering was unavailable, the
//! source it came from, and a short plain-text preview of the page. Page
//! size and margins still follow the request.
//!
//! Text uses the built-in Helvetica font, so anything outside printable
//! ASCII is shown as `?`.

use super::{write_pdf, Strategy};
use crate::config::RenderRequest;
use crate::error::StrategyError;
use crate::pipeline::input::{fetch_text, LoadedSource, Source};
use crate::pipeline::text::{html_to_text, truncate_chars, wrap_words};
use async_trait::async_trait;
use pdf_writer::{Content, Finish, Name, Pdf, Rect, Ref, Str, TextStr};
use tracing::{debug, info};

/// Document title printed on the first page.
pub const TITLE: &str = "HTML to PDF Conversion";

const NOTICE: &str = "Full rendering was unavailable; this is a text-only preview of the source.";

/// Characters of extracted text kept in the preview.
pub const PREVIEW_CHARS: usize = 300;

/// Wrap width for preview lines, in characters.
pub const WRAP_WIDTH: usize = 80;

const TITLE_SIZE: f32 = 18.0;
const BODY_SIZE: f32 = 11.0;
const NOTE_SIZE: f32 = 9.0;
const LINE_SPACING: f32 = 1.35;
const PT_PER_MM: f32 = 72.0 / 25.4;

/// The in-process fallback. Always available.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyntheticPdfStrategy;

#[async_trait]
impl Strategy for SyntheticPdfStrategy {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    async fn attempt(&self, source: &LoadedSource, request: &RenderRequest) -> Result<(), StrategyError> {
        let text = preview_text(source, request).await;
        let lines = compose(source, &text);
        let bytes = build_pdf(&lines, request);
        info!("Synthetic PDF: {} lines, {} bytes", lines.len(), bytes.len());
        write_pdf(&request.output, &bytes)
    }
}

/// Plain text for the preview, truncated.
async fn preview_text(source: &LoadedSource, request: &RenderRequest) -> String {
    let text = match (&source.source, &source.markup) {
        (Source::Url(url), _) => {
            // Bounded by the load budget, not the raw timeout: this strategy
            // must finish inside the attempt deadline.
            match fetch_text(url, request.load_budget(), request.user_agent.as_deref()).await {
                Some(body) => html_to_text(&body),
                None => {
                    debug!("Could not fetch {}; previewing the URL itself", url);
                    url.to_string()
                }
            }
        }
        (_, Some(markup)) => html_to_text(markup),
        (_, None) => String::new(),
    };
    if text.is_empty() {
        "(no text content)".to_string()
    } else {
        truncate_chars(&text, PREVIEW_CHARS)
    }
}

/// A line of text and the font size to set it in.
#[derive(Debug, Clone, PartialEq)]
struct Line {
    size: f32,
    text: String,
}

impl Line {
    fn new(size: f32, text: impl Into<String>) -> Self {
        Line { size, text: text.into() }
    }

    fn advance(&self) -> f32 {
        self.size * LINE_SPACING
    }
}

fn compose(source: &LoadedSource, text: &str) -> Vec<Line> {
    let origin = match &source.source {
        Source::File(path) => format!("Source: {}", path.display()),
        Source::Url(url) => format!("Source: {}", url),
        Source::InlineHtml(_) => "Source: inline markup".to_string(),
    };

    let mut lines = vec![Line::new(TITLE_SIZE, TITLE), Line::new(NOTE_SIZE, NOTICE)];
    lines.extend(
        wrap_words(&origin, WRAP_WIDTH)
            .into_iter()
            .map(|l| Line::new(NOTE_SIZE, l)),
    );
    lines.push(Line::new(BODY_SIZE, ""));
    lines.extend(
        wrap_words(text, WRAP_WIDTH)
            .into_iter()
            .map(|l| Line::new(BODY_SIZE, l)),
    );
    lines
}

/// Split lines into pages that fit between the top and bottom margins.
/// Every page holds at least one line, however small the printable area.
fn paginate(lines: &[Line], usable_height: f32) -> Vec<&[Line]> {
    let mut pages = Vec::new();
    let mut start = 0;
    let mut used = 0.0f32;
    for (i, line) in lines.iter().enumerate() {
        if i > start && used + line.advance() > usable_height {
            pages.push(&lines[start..i]);
            start = i;
            used = 0.0;
        }
        used += line.advance();
    }
    if start < lines.len() || pages.is_empty() {
        pages.push(&lines[start..]);
    }
    pages
}

/// Map text to the bytes Helvetica can show with its standard encoding.
fn pdf_text(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| if (' '..='~').contains(&c) { c as u8 } else { b'?' })
        .collect()
}

fn build_pdf(lines: &[Line], request: &RenderRequest) -> Vec<u8> {
    let (width_mm, height_mm) = request.page_size_mm();
    let width = width_mm as f32 * PT_PER_MM;
    let height = height_mm as f32 * PT_PER_MM;
    let margin = request.margin;
    let left = margin.left as f32 * PT_PER_MM;
    let top = margin.top as f32 * PT_PER_MM;
    let bottom = margin.bottom as f32 * PT_PER_MM;
    let usable = (height - top - bottom).max(0.0);

    let pages = paginate(lines, usable);

    let catalog_id = Ref::new(1);
    let tree_id = Ref::new(2);
    let font_id = Ref::new(3);
    let info_id = Ref::new(4);
    let font_name = Name(b"F1");
    let first_page = 5;

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(tree_id);
    pdf.document_info(info_id)
        .title(TextStr(TITLE))
        .producer(TextStr(concat!("edgequake-html2pdf ", env!("CARGO_PKG_VERSION"))));
    pdf.type1_font(font_id).base_font(Name(b"Helvetica"));

    let page_ids: Vec<Ref> = (0..pages.len())
        .map(|i| Ref::new(first_page + 2 * i as i32))
        .collect();
    pdf.pages(tree_id)
        .kids(page_ids.iter().copied())
        .count(page_ids.len() as i32);

    for (page_lines, &page_id) in pages.iter().zip(&page_ids) {
        let content_id = Ref::new(page_id.get() + 1);

        let mut page = pdf.page(page_id);
        page.media_box(Rect::new(0.0, 0.0, width, height));
        page.parent(tree_id);
        page.contents(content_id);
        page.resources().fonts().pair(font_name, font_id);
        page.finish();

        let mut content = Content::new();
        content.begin_text();
        let mut y = height - top;
        let mut first = true;
        for line in page_lines.iter() {
            let step = line.advance();
            if first {
                y -= line.size;
                content.next_line(left, y);
                first = false;
            } else {
                content.next_line(0.0, -step);
            }
            if !line.text.is_empty() {
                content.set_font(font_name, line.size);
                content.show(Str(&pdf_text(&line.text)));
            }
        }
        content.end_text();
        pdf.stream(content_id, &content.finish());
    }

    pdf.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Margin, PaperFormat};

    fn lines(n: usize) -> Vec<Line> {
        (0..n).map(|i| Line::new(10.0, format!("line {i}"))).collect()
    }

    #[test]
    fn pagination_respects_usable_height() {
        let all = lines(10);
        // 13.5pt per line → 3 lines fit in 45pt.
        let pages = paginate(&all, 45.0);
        assert_eq!(pages.iter().map(|p| p.len()).collect::<Vec<_>>(), vec![3, 3, 3, 1]);
    }

    #[test]
    fn pagination_always_makes_progress() {
        let all = lines(3);
        let pages = paginate(&all, 0.0);
        assert_eq!(pages.len(), 3);
        assert!(paginate(&[], 100.0).len() == 1);
    }

    #[test]
    fn non_ascii_becomes_placeholder() {
        assert_eq!(pdf_text("café ok"), b"caf? ok".to_vec());
        assert_eq!(pdf_text("(a\\b)"), b"(a\\b)".to_vec());
    }

    #[test]
    fn composed_document_has_title_and_preview() {
        let src = LoadedSource::from_input("<html><body><h1>Hi</h1></body></html>").unwrap();
        let composed = compose(&src, "Hi");
        assert_eq!(composed[0].text, TITLE);
        assert!(composed.iter().any(|l| l.text == "Source: inline markup"));
        assert_eq!(composed.last().unwrap().text, "Hi");
    }

    #[tokio::test]
    async fn writes_valid_pdf_for_inline_markup() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out/report.pdf");
        let request = RenderRequest::builder(&out).build().unwrap();
        let src = LoadedSource::from_input("<html><body><h1>Hello there</h1></body></html>").unwrap();

        SyntheticPdfStrategy.attempt(&src, &request).await.unwrap();

        let bytes = std::fs::read(&out).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("Hello there"));
        assert!(text.contains("/Helvetica"));
        assert!(text.contains("/MediaBox"));
    }

    #[tokio::test]
    async fn small_pages_with_large_margins_split_into_several_pages() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("tiny.pdf");
        let request = RenderRequest::builder(&out)
            .format(PaperFormat::A6)
            .margin(Margin { top: 60, right: 10, bottom: 60, left: 10 })
            .build()
            .unwrap();
        let body = format!("<p>{}</p>", "word ".repeat(80));
        let src = LoadedSource::from_input(&body).unwrap();

        SyntheticPdfStrategy.attempt(&src, &request).await.unwrap();

        let text = String::from_utf8_lossy(&std::fs::read(&out).unwrap()).into_owned();
        let count = text.split("/Count ").nth(1).unwrap();
        let count: i32 = count.chars().take_while(|c| c.is_ascii_digit()).collect::<String>().parse().unwrap();
        assert!(count > 1, "expected several pages, got {count}");
    }

    /// Serve `body` as `text/html` to the first connection, returning the
    /// page URL.
    async fn serve_once(body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            let _ = stream.shutdown().await;
        });
        format!("http://{addr}/page")
    }

    #[tokio::test]
    async fn url_source_previews_fetched_text() {
        let url = serve_once("<html><body><h1>Hi</h1><script>var x = 1;</script></body></html>").await;
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("url.pdf");
        let request = RenderRequest::builder(&out).timeout_ms(5_000).build().unwrap();
        let src = LoadedSource::from_input(&url).unwrap();

        SyntheticPdfStrategy.attempt(&src, &request).await.unwrap();

        let bytes = std::fs::read(&out).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("(Hi)"), "fetched text missing from preview");
        assert!(!text.contains("var x"));
        assert!(text.contains(&format!("Source: {url}")));
    }

    #[tokio::test]
    async fn unreachable_url_previews_the_url_itself() {
        // Bind then release a port so the connection is refused.
        let addr = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        let url = format!("http://{addr}/gone");
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("gone.pdf");
        let request = RenderRequest::builder(&out).timeout_ms(2_000).build().unwrap();
        let src = LoadedSource::from_input(&url).unwrap();

        SyntheticPdfStrategy.attempt(&src, &request).await.unwrap();

        let bytes = std::fs::read(&out).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains(&format!("({url})")), "URL text missing from preview");
    }
}
