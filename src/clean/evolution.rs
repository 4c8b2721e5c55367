//! Evolution columns: structured records first, token heuristics second.
//!
//! Upstream rows sometimes carry the level in `numero` and the dex number in
//! `level`, so both parsers look at both fields.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::text::{join_multi, split_multi, to_str};
use crate::literal;

static DEX_HASH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#\s*(\d{1,4})").unwrap());
static DEX_BARE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{1,4})\b").unwrap());
static LEVEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[Ll]evel\D*(\d+)").unwrap());
static LEVEL_BARE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{1,3})\b").unwrap());
static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://").unwrap());
static LETTER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z]").unwrap());

const MAX_DEX: i64 = 2000;
const MAX_LEVEL: i64 = 100;
const MISSING: &str = "None";

/// The five parallel evolution columns of the cleaned CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct EvolutionColumns {
    pub numero: String,
    pub level: String,
    pub item: String,
    pub nome: String,
    pub url: String,
}

impl EvolutionColumns {
    fn missing() -> Self {
        EvolutionColumns {
            numero: MISSING.into(),
            level: MISSING.into(),
            item: MISSING.into(),
            nome: MISSING.into(),
            url: MISSING.into(),
        }
    }
}

#[derive(Default)]
struct Collected {
    numeros: Vec<String>,
    levels: Vec<String>,
    items: Vec<String>,
    nomes: Vec<String>,
    urls: Vec<String>,
}

impl Collected {
    fn push(
        &mut self,
        dex: Option<i64>,
        level: Option<i64>,
        item: Option<String>,
        nome: Option<String>,
        url: Option<String>,
    ) {
        self.numeros.push(or_missing(dex.map(|n| n.to_string())));
        self.levels.push(or_missing(level.map(|n| n.to_string())));
        self.items.push(or_missing(item));
        self.nomes.push(or_missing(nome));
        self.urls.push(or_missing(url));
    }

    fn finish(self) -> Option<EvolutionColumns> {
        if self.numeros.is_empty() {
            return None;
        }
        Some(EvolutionColumns {
            numero: join_multi(&self.numeros),
            level: join_multi(&self.levels),
            item: join_multi(&self.items),
            nome: join_multi(&self.nomes),
            url: join_multi(&self.urls),
        })
    }
}

fn or_missing(v: Option<String>) -> String {
    v.unwrap_or_else(|| MISSING.to_string())
}

/// Dex number, preferring `#NNNN`. Text mentioning a level never yields a
/// bare-number dex.
pub fn extract_dex_id(v: Option<&str>) -> Option<i64> {
    let s = to_str(v)?;
    let in_range = |n: i64| (1..=MAX_DEX).contains(&n).then_some(n);
    if let Some(caps) = DEX_HASH_RE.captures(&s) {
        return caps[1].parse().ok().and_then(in_range);
    }
    if s.to_lowercase().contains("level") {
        return None;
    }
    let caps = DEX_BARE_RE.captures(&s)?;
    caps[1].parse().ok().and_then(in_range)
}

/// Evolution level from `Level <n>`, or a bare number when the text has no
/// `#` and no URL.
pub fn extract_level(v: Option<&str>) -> Option<i64> {
    let s = to_str(v)?;
    let in_range = |n: i64| (1..=MAX_LEVEL).contains(&n).then_some(n);
    if let Some(caps) = LEVEL_RE.captures(&s) {
        return caps[1].parse().ok().and_then(in_range);
    }
    if s.contains('#') || s.to_lowercase().contains("http") {
        return None;
    }
    let caps = LEVEL_BARE_RE.captures(&s)?;
    caps[1].parse().ok().and_then(in_range)
}

fn field(record: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    record.get(key).and_then(literal::scalar_text)
}

fn from_records(items: &[Value]) -> Option<EvolutionColumns> {
    let mut out = Collected::default();
    for record in items.iter().filter_map(Value::as_object) {
        let raw_num = field(record, "numero");
        let raw_lvl = field(record, "level").or_else(|| field(record, "level_item"));

        let dex = extract_dex_id(raw_num.as_deref()).or_else(|| extract_dex_id(raw_lvl.as_deref()));
        let level = extract_level(raw_lvl.as_deref()).or_else(|| extract_level(raw_num.as_deref()));

        // crawler rows carry non-level conditions ("use Thunder Stone") in level_item
        let item = to_str(field(record, "item").as_deref()).or_else(|| {
            let cond = to_str(field(record, "level_item").as_deref())?;
            extract_level(Some(&cond)).is_none().then_some(cond)
        });
        let nome = to_str(field(record, "nome").as_deref());
        let url = to_str(field(record, "url").as_deref());

        if dex.is_none() && level.is_none() && item.is_none() && nome.is_none() && url.is_none() {
            continue;
        }
        out.push(dex, level, item, nome, url);
    }
    out.finish()
}

fn from_tokens(s: &str) -> Option<EvolutionColumns> {
    let mut out = Collected::default();
    for part in split_multi(s) {
        let lower = part.to_lowercase();
        let is_url = URL_RE.is_match(&part);
        let is_item = lower.contains("stone") || lower.contains("item");
        let is_name = !is_url && !is_item && !lower.contains("level") && LETTER_RE.is_match(&part);
        out.push(
            extract_dex_id(Some(&part)),
            extract_level(Some(&part)),
            is_item.then(|| part.clone()),
            is_name.then(|| part.clone()),
            is_url.then(|| part.clone()),
        );
    }
    out.finish()
}

/// Flatten an evolution cell into the five parallel columns.
pub fn clean_evolutions(cell: Option<&str>) -> EvolutionColumns {
    let Some(s) = to_str(cell) else {
        return EvolutionColumns::missing();
    };
    literal::parse_list(&s)
        .and_then(|items| from_records(&items))
        .or_else(|| from_tokens(&s))
        .unwrap_or_else(EvolutionColumns::missing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dex_id() {
        assert_eq!(extract_dex_id(Some("#0026")), Some(26));
        assert_eq!(extract_dex_id(Some("# 133")), Some(133));
        assert_eq!(extract_dex_id(Some("0026")), Some(26));
        assert_eq!(extract_dex_id(Some("(Level 16)")), None);
        assert_eq!(extract_dex_id(Some("#0000")), None);
        assert_eq!(extract_dex_id(Some("#2001")), None);
        assert_eq!(extract_dex_id(None), None);
    }

    #[test]
    fn level() {
        assert_eq!(extract_level(Some("(Level 16)")), Some(16));
        assert_eq!(extract_level(Some("level 36")), Some(36));
        assert_eq!(extract_level(Some("32")), Some(32));
        assert_eq!(extract_level(Some("#0026")), None);
        assert_eq!(extract_level(Some("https://pokemondb.net/pokedex/ivysaur")), None);
        assert_eq!(extract_level(Some("Level 101")), None);
        assert_eq!(extract_level(Some("use Thunder Stone")), None);
    }

    #[test]
    fn swapped_fields_are_corrected() {
        let cols = clean_evolutions(Some(r##"[{"numero": "(Level 16)", "level": "#0026"}]"##));
        assert_eq!(cols.numero, "26");
        assert_eq!(cols.level, "16");
        assert_eq!(cols.item, "None");
    }

    #[test]
    fn crawler_records() {
        let cell = r##"[
            {"numero": "#0002", "nome": "Ivysaur", "url": "https://pokemondb.net/pokedex/ivysaur", "tipos": ["Grass", "Poison"], "level_item": "Level 16"},
            {"numero": "#0003", "nome": "Venusaur", "url": "https://pokemondb.net/pokedex/venusaur", "tipos": ["Grass", "Poison"], "level_item": "Level 32"}
        ]"##;
        let cols = clean_evolutions(Some(cell));
        assert_eq!(cols.numero, "2; 3");
        assert_eq!(cols.level, "16; 32");
        assert_eq!(cols.item, "None; None");
        assert_eq!(cols.nome, "Ivysaur; Venusaur");
        assert_eq!(
            cols.url,
            "https://pokemondb.net/pokedex/ivysaur; https://pokemondb.net/pokedex/venusaur"
        );
    }

    #[test]
    fn item_condition_from_level_item() {
        let cell = "[{'numero': '#0026', 'nome': 'Raichu', 'url': None, 'level_item': 'use Thunder Stone'}]";
        let cols = clean_evolutions(Some(cell));
        assert_eq!(cols.numero, "26");
        assert_eq!(cols.level, "None");
        assert_eq!(cols.item, "use Thunder Stone");
        assert_eq!(cols.url, "None");
    }

    #[test]
    fn non_record_entries_and_empty_records_skipped() {
        let cols = clean_evolutions(Some(r#"["junk", {}, {"nome": "Gloom"}]"#));
        assert_eq!(cols.nome, "Gloom");
        assert_eq!(cols.numero, "None");
    }

    #[test]
    fn token_fallback() {
        let cols = clean_evolutions(Some(
            "Pikachu | Thunder Stone | https://pokemondb.net/pokedex/raichu | Level 22",
        ));
        assert_eq!(cols.nome, "Pikachu; None; None; None");
        assert_eq!(cols.item, "None; Thunder Stone; None; None");
        assert_eq!(cols.url, "None; None; https://pokemondb.net/pokedex/raichu; None");
        assert_eq!(cols.level, "None; None; None; 22");
    }

    #[test]
    fn deeply_nested_cell_on_small_stack() {
        let cols = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(|| clean_evolutions(Some(&"[".repeat(200_000))))
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(cols.numero, "None");
        assert_eq!(cols.nome, "None");
    }

    #[test]
    fn semicolon_fallback_and_empty() {
        let cols = clean_evolutions(Some("#0005; 16"));
        assert_eq!(cols.numero, "5; 16");
        assert_eq!(cols.level, "None; 16");

        assert_eq!(clean_evolutions(None), EvolutionColumns::missing());
        assert_eq!(clean_evolutions(Some("none")), EvolutionColumns::missing());
        assert_eq!(clean_evolutions(Some("[]")).numero, "None");
    }
}
