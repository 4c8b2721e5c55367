//! "Pokédex data" vitals tables.
//!
//! Pages with regional forms carry one table per form, each inside a tab panel.
//! A table's label is its tab label (if any) plus the nearest heading above it.

use std::sync::LazyLock;

use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use super::{absolute, enclosing_panel, normalize_label, tab_labels, text_of};
use crate::records::AbilityLink;

static HEADING_OR_TABLE_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("h1, h2, h3, h4, h5, h6, table.vitals-table").unwrap()
});
static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static TH_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").unwrap());
static TD_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static STRONG_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("strong").unwrap());
static A_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());

/// Labels tried, in order, when the listing row has no form hint.
const DEFAULT_LABELS: &[&str] = &["base", "pokédex data", ""];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vitals {
    pub numero: Option<String>,
    pub tipos: Vec<String>,
    pub tamanho: Option<String>,
    pub peso: Option<String>,
    pub habilidades: Vec<AbilityLink>,
}

fn labelled_tables(doc: &Html) -> Vec<(String, ElementRef<'_>)> {
    let tab_labels = tab_labels(doc);

    let mut heading = String::new();
    let mut tables = Vec::new();
    for el in doc.select(&HEADING_OR_TABLE_SEL) {
        if el.value().name() != "table" {
            heading = text_of(el);
            continue;
        }
        let tab = enclosing_panel(el)
            .and_then(|panel| panel.value().id())
            .and_then(|id| tab_labels.get(id));
        let label = match tab {
            Some(tab) => format!("{tab} {heading}"),
            None => heading.clone(),
        };
        tables.push((normalize_label(&label), el));
    }
    tables
}

/// Pick the vitals table for a form hint, falling back to the first table.
pub fn select_table<'a>(doc: &'a Html, form_hint: Option<&str>) -> Option<ElementRef<'a>> {
    let tables = labelled_tables(doc);
    let hint = form_hint.map(normalize_label).filter(|h| !h.is_empty());

    let found = match hint {
        Some(h) => tables.iter().find(|(label, _)| label.contains(&h)),
        None => DEFAULT_LABELS.iter().find_map(|want| {
            tables.iter().find(|(label, _)| {
                if want.is_empty() {
                    label.is_empty()
                } else {
                    label.contains(*want)
                }
            })
        }),
    };

    found.or(tables.first()).map(|(_, t)| *t)
}

pub fn read_table(table: ElementRef, page_url: &Url) -> Vitals {
    let mut v = Vitals::default();
    for row in table.select(&ROW_SEL) {
        let (Some(th), Some(td)) = (row.select(&TH_SEL).next(), row.select(&TD_SEL).next()) else {
            continue;
        };
        let label = text_of(th);
        let value = Some(text_of(td)).filter(|s| !s.is_empty());

        if label.contains("National") {
            v.numero = td
                .select(&STRONG_SEL)
                .next()
                .map(text_of)
                .filter(|s| !s.is_empty())
                .or(value);
        } else if label == "Type" {
            v.tipos = td
                .select(&A_SEL)
                .map(text_of)
                .filter(|s| !s.is_empty())
                .collect();
        } else if label == "Height" {
            v.tamanho = value;
        } else if label == "Weight" {
            v.peso = value;
        } else if label == "Abilities" {
            v.habilidades = td
                .select(&A_SEL)
                .filter_map(|a| {
                    Some(AbilityLink {
                        url: absolute(page_url, a.value().attr("href")?),
                        nome: text_of(a),
                        descricao: None,
                    })
                })
                .collect();
        }
    }
    v
}
