use std::collections::HashSet;
use std::sync::LazyLock;

use reqwest::Url;
use scraper::{Html, Selector};

use super::{absolute, text_of};

static ROW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table#pokedex > tbody > tr").unwrap());
static LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td:nth-child(2) > a").unwrap());
static HINT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td:nth-child(2) small.text-muted").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub struct ListingEntry {
    pub url: String,
    /// Regional/alternate form label shown under the name, e.g. "Alolan Raichu".
    pub form_hint: Option<String>,
}

/// One entry per listing row that links to a detail page.
pub fn parse_listing(html: &str, base: &Url) -> Vec<ListingEntry> {
    let doc = Html::parse_document(html);
    doc.select(&ROW_SEL)
        .filter_map(|row| {
            let href = row.select(&LINK_SEL).next()?.value().attr("href")?;
            let form_hint = row
                .select(&HINT_SEL)
                .next()
                .map(text_of)
                .filter(|s| !s.is_empty());
            Some(ListingEntry {
                url: absolute(base, href),
                form_hint,
            })
        })
        .collect()
}

/// Drop repeat requests for the same URL; the first row wins.
pub fn dedup(entries: Vec<ListingEntry>) -> Vec<ListingEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|e| seen.insert(e.url.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Vec<ListingEntry> {
        let html = std::fs::read_to_string("tests/fixtures/pokedex_all.html").unwrap();
        let base = Url::parse("https://pokemondb.net/pokedex/all").unwrap();
        parse_listing(&html, &base)
    }

    #[test]
    fn rows_with_links() {
        let entries = fixture();
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0].url, "https://pokemondb.net/pokedex/bulbasaur");
        assert_eq!(entries[0].form_hint, None);
        assert_eq!(entries[4].form_hint.as_deref(), Some("Alolan Raichu"));
    }

    #[test]
    fn dedup_keeps_first_form() {
        let entries = dedup(fixture());
        assert_eq!(entries.len(), 4);
        let raichu = entries.iter().find(|e| e.url.ends_with("/raichu")).unwrap();
        assert_eq!(raichu.form_hint, None);
    }
}
