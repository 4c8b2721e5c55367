use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::{is_heading, text_of};

pub const DESCRIPTION_NOT_FOUND: &str = "Description not found";

static HEADING_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4, h5, h6").unwrap());
static HEADING_OR_P_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4, h5, h6, p").unwrap());
static HEADING_OR_TABLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4, h5, h6, table").unwrap());
static MAIN_P_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("main p, #main p, article p").unwrap());
static TD_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());

/// Description text of an ability page, or [`DESCRIPTION_NOT_FOUND`].
pub fn extract_description(html: &str) -> String {
    let doc = Html::parse_document(html);
    effect_paragraphs(&doc)
        .or_else(|| first_paragraph_after_effect(&doc))
        .or_else(|| first_main_paragraph(&doc))
        .or_else(|| game_description(&doc))
        .unwrap_or_else(|| DESCRIPTION_NOT_FOUND.to_string())
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

/// First heading whose leading word is "Effect" ("Effect", "Effect in battle"),
/// so "Type effectiveness" or "Side effects" don't qualify.
fn effect_heading(doc: &Html) -> Option<ElementRef<'_>> {
    doc.select(&HEADING_SEL).find(|h| {
        let text = text_of(*h).to_lowercase();
        text.split(|c: char| !c.is_alphanumeric())
            .find(|w| !w.is_empty())
            == Some("effect")
    })
}

/// Sibling `<p>`s between the "Effect" heading and the next heading.
fn effect_paragraphs(doc: &Html) -> Option<String> {
    let heading = effect_heading(doc)?;
    let paragraphs: Vec<String> = heading
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .take_while(|el| !is_heading(el))
        .filter(|el| el.value().name() == "p")
        .map(text_of)
        .filter(|t| !t.is_empty())
        .collect();
    non_empty(paragraphs.join(" "))
}

/// First `<p>` anywhere after the "Effect" heading in document order.
fn first_paragraph_after_effect(doc: &Html) -> Option<String> {
    let heading = effect_heading(doc)?;
    doc.select(&HEADING_OR_P_SEL)
        .skip_while(|el| el.id() != heading.id())
        .filter(|el| el.value().name() == "p")
        .map(text_of)
        .find(|t| !t.is_empty())
}

fn first_main_paragraph(doc: &Html) -> Option<String> {
    doc.select(&MAIN_P_SEL).map(text_of).find(|t| !t.is_empty())
}

/// First cell of the table under a "Game descriptions" heading.
fn game_description(doc: &Html) -> Option<String> {
    let mut armed = false;
    for el in doc.select(&HEADING_OR_TABLE_SEL) {
        if is_heading(&el) {
            armed = text_of(el).to_lowercase().contains("game descriptions");
        } else if armed {
            return el.select(&TD_SEL).next().map(text_of).and_then(non_empty);
        }
    }
    None
}
