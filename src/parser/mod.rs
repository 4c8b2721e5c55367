pub mod ability;
pub mod effectiveness;
pub mod evolution;
pub mod listing;
pub mod vitals;

use std::collections::HashMap;
use std::sync::LazyLock;

use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use crate::records::SpeciesRecord;

static H1_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());
static TAB_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a.sv-tabs-tab").unwrap());

/// Detail page → species record. Ability descriptions are filled in later by
/// the crawler.
pub fn parse_species(html: &str, page_url: &Url, form_hint: Option<&str>) -> SpeciesRecord {
    let doc = Html::parse_document(html);
    let nome = doc.select(&H1_SEL).next().map(text_of).filter(|s| !s.is_empty());

    let vitals = vitals::select_table(&doc, form_hint)
        .map(|t| vitals::read_table(t, page_url))
        .unwrap_or_default();

    let proximas_evolucoes = nome
        .as_deref()
        .map(|n| evolution::extract_evolutions(&doc, n, page_url))
        .unwrap_or_default();

    SpeciesRecord {
        numero: vitals.numero,
        url: page_url.to_string(),
        nome,
        tamanho: vitals.tamanho,
        peso: vitals.peso,
        tipos: vitals.tipos.join(","),
        habilidades: vitals.habilidades,
        proximas_evolucoes,
        efetividade: effectiveness::extract_effectiveness(&doc, form_hint),
    }
}

/// Whitespace-collapsed text content of an element.
pub(crate) fn text_of(el: ElementRef) -> String {
    normalize_ws(&el.text().collect::<String>())
}

pub(crate) fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn has_class(el: &ElementRef, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}

pub(crate) fn is_heading(el: &ElementRef) -> bool {
    matches!(el.value().name(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

/// Lowercased, hyphens as spaces, whitespace collapsed.
pub(crate) fn normalize_label(s: &str) -> String {
    normalize_ws(&s.to_lowercase().replace('-', " "))
}

/// Tab labels keyed by the id of the panel each tab opens.
pub(crate) fn tab_labels(doc: &Html) -> HashMap<String, String> {
    doc.select(&TAB_SEL)
        .filter_map(|a| {
            let target = a.value().attr("href")?.trim_start_matches('#');
            Some((target.to_string(), text_of(a)))
        })
        .collect()
}

/// Nearest enclosing `sv-tabs-panel` of an element.
pub(crate) fn enclosing_panel<'a>(el: ElementRef<'a>) -> Option<ElementRef<'a>> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| has_class(a, "sv-tabs-panel"))
}

/// Resolve `href` against the page URL, keeping it verbatim if it won't join.
pub(crate) fn absolute(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_url(slug: &str) -> Url {
        Url::parse(&format!("https://pokemondb.net/pokedex/{slug}")).unwrap()
    }

    #[test]
    fn bulbasaur_fixture() {
        let html = std::fs::read_to_string("tests/fixtures/bulbasaur.html").unwrap();
        let rec = parse_species(&html, &page_url("bulbasaur"), None);
        assert_eq!(rec.numero.as_deref(), Some("0001"));
        assert_eq!(rec.nome.as_deref(), Some("Bulbasaur"));
        assert_eq!(rec.tipos, "Grass,Poison");
        assert_eq!(rec.tamanho.as_deref(), Some("0.7 m (2′04″)"));
        assert_eq!(rec.peso.as_deref(), Some("6.9 kg (15.2 lbs)"));
        let names: Vec<_> = rec.habilidades.iter().map(|a| a.nome.as_str()).collect();
        assert_eq!(names, ["Overgrow", "Chlorophyll"]);
        assert_eq!(rec.habilidades[0].url, "https://pokemondb.net/ability/overgrow");
        assert!(rec.habilidades.iter().all(|a| a.descricao.is_none()));
        let evo: Vec<_> = rec.proximas_evolucoes.iter().filter_map(|e| e.nome.as_deref()).collect();
        assert_eq!(evo, ["Ivysaur", "Venusaur"]);
        assert_eq!(rec.efetividade.get("Fire").map(String::as_str), Some("2"));
        assert_eq!(rec.efetividade.len(), 6);
    }

    #[test]
    fn raichu_alolan_form() {
        let html = std::fs::read_to_string("tests/fixtures/raichu.html").unwrap();
        let base = parse_species(&html, &page_url("raichu"), None);
        assert_eq!(base.tipos, "Electric");
        assert_eq!(base.tamanho.as_deref(), Some("0.8 m (2′07″)"));

        let alolan = parse_species(&html, &page_url("raichu"), Some("Alolan Raichu"));
        assert_eq!(alolan.numero.as_deref(), Some("0026"));
        assert_eq!(alolan.tipos, "Electric,Psychic");
        assert_eq!(alolan.tamanho.as_deref(), Some("0.7 m (2′04″)"));
        assert_eq!(alolan.habilidades[0].nome, "Surge Surfer");
        // Raichu is the last stage
        assert!(alolan.proximas_evolucoes.is_empty());

        assert_eq!(base.efetividade["Ground"], "2");
        assert_eq!(base.efetividade["Psychic"], "1");
        assert_eq!(alolan.efetividade["Psychic"], "½");
        assert_eq!(alolan.efetividade["Ghost"], "2");
    }

    #[test]
    fn empty_page_degrades() {
        let rec = parse_species("<html><body></body></html>", &page_url("x"), None);
        assert_eq!(rec.numero, None);
        assert_eq!(rec.nome, None);
        assert!(rec.tipos.is_empty());
        assert!(rec.efetividade.is_empty());
        assert_eq!(rec.url, "https://pokemondb.net/pokedex/x");
    }

    #[test]
    fn absolute_urls() {
        let base = page_url("bulbasaur");
        assert_eq!(absolute(&base, "/ability/overgrow"), "https://pokemondb.net/ability/overgrow");
        assert_eq!(absolute(&base, "https://example.com/a"), "https://example.com/a");
    }
}
