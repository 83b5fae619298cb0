use anyhow::{anyhow, Result};
use chardet::{charset2encoding, detect};
use encoding_rs::Encoding;
use encoding_rs_io::DecodeReaderBytesBuilder;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Node, Selector};
use std::io::Read;
use std::panic::{self, AssertUnwindSafe};
use unicode_normalization::UnicodeNormalization;

static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("static selector"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));
static LINE_BREAKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n+").expect("static regex"));

/// Subtrees whose text is never narrative content.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "caption", "center", "dd", "div", "dl",
    "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5",
    "h6", "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "tbody",
    "tfoot", "thead", "tr", "ul",
];

/// Elements separated from their siblings by a space rather than a line break.
const CELL_ELEMENTS: &[&str] = &["td", "th"];

/// Outcome of extracting one raw document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub text: String,
    /// Set when the document could not be read; `text` is empty in that case.
    pub warning: Option<String>,
}

impl Extraction {
    pub fn is_failure(&self) -> bool {
        self.warning.is_some()
    }

    fn failed(warning: String) -> Self {
        Self {
            text: String::new(),
            warning: Some(warning),
        }
    }
}

enum Step<N> {
    Enter(N),
    Break(char),
}

/// Decodes and extracts one raw document. Never fails: problems are
/// reported through [`Extraction::warning`].
pub fn extract_document(raw: &[u8]) -> Extraction {
    let markup = match decode_bytes(raw) {
        Ok(markup) => markup,
        Err(e) => return Extraction::failed(format!("Failed to decode document: {}", e)),
    };

    match panic::catch_unwind(AssertUnwindSafe(|| extract_text(&markup))) {
        Ok(text) => Extraction { text, warning: None },
        Err(_) => Extraction::failed("Markup parser aborted".to_string()),
    }
}

/// Converts markup into normalized body text, one line per block element.
pub fn extract_text(markup: &str) -> String {
    if markup.trim().is_empty() {
        return String::new();
    }

    let document = Html::parse_document(markup);
    if let Some(first) = document.errors.first() {
        log::debug!(
            "Recovered from {} markup errors (first: {})",
            document.errors.len(),
            first
        );
    }

    let Some(body) = document.select(&BODY).next() else {
        return String::new();
    };

    let mut raw = String::new();
    let mut stack = vec![Step::Enter(*body)];
    while let Some(step) = stack.pop() {
        match step {
            Step::Break(separator) => raw.push(separator),
            Step::Enter(node) => match node.value() {
                Node::Text(text) => raw.push_str(&WHITESPACE.replace_all(text, " ")),
                Node::Element(element) => {
                    let name = element.name();
                    if SKIPPED_ELEMENTS.contains(&name) {
                        continue;
                    }
                    let separator = if BLOCK_ELEMENTS.contains(&name) {
                        Some('\n')
                    } else if CELL_ELEMENTS.contains(&name) {
                        Some(' ')
                    } else {
                        None
                    };
                    if let Some(separator) = separator {
                        raw.push(separator);
                        stack.push(Step::Break(separator));
                    }
                    let children: Vec<_> = node.children().collect();
                    stack.extend(children.into_iter().rev().map(Step::Enter));
                }
                _ => {}
            },
        }
    }

    normalize_whitespace(&raw)
}

/// NFKC-normalizes `text`, collapses whitespace inside each line and drops
/// blank lines.
pub fn normalize_whitespace(text: &str) -> String {
    let text = text.nfkc().collect::<String>();
    LINE_BREAKS
        .split(&text)
        .map(|line| WHITESPACE.replace_all(line, " ").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Decodes document bytes, sniffing the charset when they are not UTF-8.
pub fn decode_bytes(raw: &[u8]) -> Result<String> {
    if let Ok(text) = std::str::from_utf8(raw) {
        return Ok(text.trim_start_matches('\u{feff}').to_string());
    }

    let charset = detect(raw).0;
    log::debug!("Detected character encoding: {}", charset);
    let encoding = Encoding::for_label(charset2encoding(&charset).as_bytes())
        .ok_or_else(|| anyhow!("Unsupported character encoding: '{}'", charset))?;

    let mut reader = DecodeReaderBytesBuilder::new()
        .encoding(Some(encoding))
        .build(raw);
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(extract_text(""), "");
        assert_eq!(extract_text("  \n\t "), "");
        assert_eq!(extract_document(b""), Extraction::default());
    }

    #[test]
    fn test_scripts_and_styles_are_dropped() {
        let html = r#"<html><head><style>p { color: red }</style></head>
            <body><script>var revenue = 1;</script><p>Net revenue</p>
            <style>.x{}</style><noscript>enable js</noscript></body></html>"#;
        assert_eq!(extract_text(html), "Net revenue");
    }

    #[test]
    fn test_only_body_text_is_kept() {
        let html = "<html><head><title>Form 10-Q</title></head><body>Body text</body></html>";
        assert_eq!(extract_text(html), "Body text");
    }

    #[test]
    fn test_blocks_become_lines() {
        let html = "<body><p>Revenue</p><p>grew</p><div><span>by</span> <b>5</b>%</div></body>";
        assert_eq!(extract_text(html), "Revenue\ngrew\nby 5%");

        let inline = "<body><p>Rev<b>enue</b></p></body>";
        assert_eq!(extract_text(inline), "Revenue");

        let table = "<body><table><tr><td>Assets</td><td>100</td></tr></table></body>";
        assert_eq!(extract_text(table), "Assets 100");
    }

    #[test]
    fn test_whitespace_and_entities_are_normalized() {
        let html = "<body>\n  Total&nbsp;&nbsp;assets\n\n\t<br/>increased&amp;held  </body>";
        assert_eq!(extract_text(html), "Total assets\nincreased&held");

        let wrapped = "<body><p>Net income\n    rose</p>\n\n<p>  </p><p>again</p></body>";
        assert_eq!(extract_text(wrapped), "Net income rose\nagain");
    }

    #[test]
    fn test_malformed_markup_is_best_effort() {
        let html = "<html><body><div><p>Unclosed <b>bold text <table><tr><td>cell";
        let text = extract_text(html);
        assert_eq!(text.lines().collect::<Vec<_>>(), vec!["Unclosed bold text", "cell"]);

        let extraction = extract_document(html.as_bytes());
        assert!(!extraction.is_failure());
        assert_eq!(extraction.text, text);
    }

    #[test]
    fn test_plain_text_without_markup() {
        assert_eq!(extract_text("just plain\ntext"), "just plain text");
    }

    #[test]
    fn test_byte_order_mark_is_stripped() {
        let raw = "\u{feff}<body><p>Hello</p></body>".as_bytes();
        assert_eq!(extract_document(raw).text, "Hello");
    }

    #[test]
    fn test_latin1_input_is_decoded() {
        let mut raw = b"<html><body><p>Quarterly revenue for the caf".to_vec();
        raw.push(0xE9);
        raw.extend_from_slice(b" segment increased during the period</p></body></html>");
        let extraction = extract_document(&raw);
        assert!(!extraction.is_failure());
        assert_eq!(
            extraction.text,
            "Quarterly revenue for the caf\u{e9} segment increased during the period"
        );
    }
}
