//! Type-defense tables: attacking type → multiplier text.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::{enclosing_panel, is_heading, normalize_label, tab_labels, text_of};

static POKEDEX_TABLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.type-table-pokedex").unwrap());
static ANY_TYPE_TABLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"table[class*="type-table"]"#).unwrap());
static HEADING_OR_TABLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4, h5, h6, table").unwrap());
static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static TH_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").unwrap());
static TD_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static A_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static IMG_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());

const HEADING_MARKERS: &[&str] = &["type defenses", "damage taken"];
const BLANK_MULTIPLIER: &str = "1";

/// Multipliers for the form named by `form_hint`, or the first form shown.
pub fn extract_effectiveness(doc: &Html, form_hint: Option<&str>) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for table in find_tables(doc, form_hint) {
        for (ty, mult) in read_table(table) {
            out.entry(ty).or_insert(mult);
        }
    }
    out
}

fn find_tables<'a>(doc: &'a Html, form_hint: Option<&str>) -> Vec<ElementRef<'a>> {
    let by_class: Vec<_> = doc.select(&POKEDEX_TABLE_SEL).collect();
    if !by_class.is_empty() {
        return form_tables(doc, by_class, form_hint);
    }
    if let Some(t) = table_after_heading(doc) {
        return vec![t];
    }
    doc.select(&ANY_TYPE_TABLE_SEL).take(1).collect()
}

/// Group tables by their enclosing tab panel and keep one group: the panel
/// whose tab label matches the hint, else the first group on the page.
fn form_tables<'a>(
    doc: &'a Html,
    tables: Vec<ElementRef<'a>>,
    form_hint: Option<&str>,
) -> Vec<ElementRef<'a>> {
    let labels = tab_labels(doc);
    let mut groups: Vec<(Option<&str>, String, Vec<ElementRef<'a>>)> = Vec::new();
    for table in tables {
        let panel_id = enclosing_panel(table).and_then(|p| p.value().id());
        match groups.iter_mut().find(|(id, _, _)| *id == panel_id) {
            Some((_, _, group)) => group.push(table),
            None => {
                let label = panel_id
                    .and_then(|id| labels.get(id))
                    .map(|l| normalize_label(l))
                    .unwrap_or_default();
                groups.push((panel_id, label, vec![table]));
            }
        }
    }

    let hint = form_hint.map(normalize_label).filter(|h| !h.is_empty());
    let pick = hint
        .and_then(|h| {
            groups
                .iter()
                .position(|(_, label, _)| !label.is_empty() && label.contains(&h))
        })
        .unwrap_or(0);
    if pick < groups.len() {
        groups.swap_remove(pick).2
    } else {
        Vec::new()
    }
}

fn table_after_heading(doc: &Html) -> Option<ElementRef<'_>> {
    let mut armed = false;
    for el in doc.select(&HEADING_OR_TABLE_SEL) {
        if is_heading(&el) {
            let text = text_of(el).to_lowercase();
            armed = HEADING_MARKERS.iter().any(|m| text.contains(m));
        } else if armed {
            return Some(el);
        }
    }
    None
}

fn read_table(table: ElementRef) -> Vec<(String, String)> {
    let rows: Vec<_> = table.select(&ROW_SEL).collect();
    let Some(header) = rows.iter().find(|r| r.select(&TH_SEL).next().is_some()) else {
        return Vec::new();
    };
    let Some(values) = rows.iter().find(|r| r.select(&TD_SEL).next().is_some()) else {
        return Vec::new();
    };

    let types = header.select(&TH_SEL).map(type_name);
    let mults = values.select(&TD_SEL).map(|td| {
        let t = text_of(td);
        if t.is_empty() {
            BLANK_MULTIPLIER.to_string()
        } else {
            t
        }
    });

    types
        .zip(mults)
        .filter_map(|(ty, m)| Some((ty?, m)))
        .collect()
}

/// Link text, else a `title` attribute, else image alt; minus a trailing "type".
fn type_name(th: ElementRef) -> Option<String> {
    let link = th.select(&A_SEL).next();
    let name = link
        .map(text_of)
        .filter(|s| !s.is_empty())
        .or_else(|| {
            link.and_then(|a| a.value().attr("title"))
                .or_else(|| th.value().attr("title"))
                .map(str::to_string)
        })
        .or_else(|| {
            th.select(&IMG_SEL)
                .next()
                .and_then(|img| img.value().attr("alt"))
                .map(str::to_string)
        })?;
    let name = strip_type_suffix(name.trim());
    (!name.is_empty()).then(|| name.to_string())
}

fn strip_type_suffix(s: &str) -> &str {
    let cut = s.len().checked_sub(4).filter(|i| s.is_char_boundary(*i));
    match cut {
        Some(i) if s[i..].eq_ignore_ascii_case("type") => s[..i].trim_end(),
        _ => s,
    }
}
