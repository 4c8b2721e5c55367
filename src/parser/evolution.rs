use std::collections::HashSet;
use std::sync::LazyLock;

use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use super::{absolute, has_class, text_of};
use crate::records::EvolutionStep;

static LIST_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.infocard-list-evo").unwrap());
static NAME_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a.ent-name").unwrap());
static SMALL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("small").unwrap());
static TYPE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("small a.itype").unwrap());

/// Steps after `current` in the page's evolution chains.
///
/// Branching chains are expanded into one path per branch; a species inside
/// a branch only sees the rest of its own branch.
pub fn extract_evolutions(doc: &Html, current: &str, page_url: &Url) -> Vec<EvolutionStep> {
    let current = current.trim().to_lowercase();
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for list in doc.select(&LIST_SEL).filter(is_top_level) {
        for path in walk(list, page_url) {
            let Some(pos) = path.iter().position(|s| {
                s.nome
                    .as_deref()
                    .is_some_and(|n| n.trim().to_lowercase() == current)
            }) else {
                continue;
            };
            for step in &path[pos + 1..] {
                if seen.insert((step.nome.clone(), step.url.clone())) {
                    out.push(step.clone());
                }
            }
        }
    }
    out
}

fn is_top_level(list: &ElementRef) -> bool {
    !list
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| has_class(&a, "infocard-list-evo"))
}

/// Every linear path through one chain, walking card/arrow siblings.
fn walk(list: ElementRef, page_url: &Url) -> Vec<Vec<EvolutionStep>> {
    let mut paths: Vec<Vec<EvolutionStep>> = vec![Vec::new()];
    let mut pending: Option<String> = None;

    for child in list.children().filter_map(ElementRef::wrap) {
        if has_class(&child, "infocard-arrow") {
            pending = child
                .select(&SMALL_SEL)
                .next()
                .map(|s| condition_text(&text_of(s)))
                .filter(|s| !s.is_empty());
        } else if has_class(&child, "infocard-evo-split") {
            let branches: Vec<_> = child
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|c| has_class(c, "infocard-list-evo"))
                .flat_map(|branch| walk(branch, page_url))
                .collect();
            if branches.is_empty() {
                continue;
            }
            paths = paths
                .iter()
                .flat_map(|p| {
                    branches.iter().map(move |b| {
                        let mut joined = p.clone();
                        joined.extend(b.iter().cloned());
                        joined
                    })
                })
                .collect();
        } else if has_class(&child, "infocard") {
            let step = read_card(child, pending.take(), page_url);
            for p in &mut paths {
                p.push(step.clone());
            }
        }
    }
    paths
}

fn read_card(card: ElementRef, level_item: Option<String>, page_url: &Url) -> EvolutionStep {
    let name = card.select(&NAME_SEL).next();
    EvolutionStep {
        numero: card
            .select(&SMALL_SEL)
            .next()
            .map(text_of)
            .filter(|s| !s.is_empty()),
        nome: name.map(text_of).filter(|s| !s.is_empty()),
        url: name
            .and_then(|a| a.value().attr("href"))
            .map(|href| absolute(page_url, href)),
        tipos: card.select(&TYPE_SEL).map(text_of).collect(),
        level_item,
    }
}

/// `"(Level 16)"` → `"Level 16"`.
fn condition_text(s: &str) -> String {
    s.trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .trim()
        .to_string()
}
