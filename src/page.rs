//! Element lookup on the page that carries the reminder date and time.
use scraper::{ElementRef, Html};
use std::path::Path;

use crate::datetime::RawDateTimeInput;

/// Anything that can report the text content of an element by id.
pub trait PageSource: Send + Sync {
    /// `None` when no element has this id.
    fn element_text(&self, id: &str) -> Option<String>;
}

#[derive(Debug, Clone)]
pub struct HtmlPage {
    html: String,
}

impl HtmlPage {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        Ok(Self::new(std::fs::read_to_string(path)?))
    }
}

impl PageSource for HtmlPage {
    fn element_text(&self, id: &str) -> Option<String> {
        let doc = Html::parse_document(&self.html);
        let found = doc
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().id() == Some(id))?;
        let text = found.text().collect::<String>();
        Some(text.split_whitespace().collect::<Vec<_>>().join(" "))
    }
}

/// Which element failed to yield text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingElement(pub String);

/// Read the date and time element texts. Only an absent element is an error
/// here; empty text is passed on and rejected when the input is resolved.
pub fn read_input(
    page: &dyn PageSource,
    date_id: &str,
    time_id: &str,
) -> Result<RawDateTimeInput, MissingElement> {
    let fetch = |id: &str| {
        page.element_text(id)
            .ok_or_else(|| MissingElement(id.to_string()))
    };
    let date_part = fetch(date_id)?;
    let time_part = fetch(time_id)?;
    Ok(RawDateTimeInput::new(date_part, time_part))
}
