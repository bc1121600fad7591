pub mod coordinator;
pub mod general;
pub mod glassdoor;
pub mod indeed;
pub mod linkedin;

use scraper::ElementRef;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// What a single board is asked for.
#[derive(Debug, Clone)]
pub struct JobQuery {
    pub role: String,
    pub location: String,
    pub limit: usize,
}

/// Text content of an element with markup dropped and whitespace collapsed.
/// Entity decoding happens once, in the HTML parser.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use scraper::{Html, Selector};

    use super::*;

    fn text_of(html: &str) -> String {
        let document = Html::parse_document(html);
        let selector = Selector::parse("div").unwrap();
        element_text(document.select(&selector).next().unwrap())
    }

    #[test]
    fn element_text_flattens_markup() {
        let html = "<div class=\"snippet\">Build <b>scalable</b> systems &amp; APIs</div>";
        assert_eq!(text_of(html), "Build scalable systems & APIs");
    }

    #[test]
    fn escaped_entities_decode_exactly_once() {
        let html = "<div>Tools &amp;lt;b&amp;gt; &amp; more</div>";
        assert_eq!(text_of(html), "Tools &lt;b&gt; & more");
    }
}
