use serde_json::Value;

use super::text::{join_multi, to_str};
use crate::literal;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AbilityColumns {
    pub nomes: Option<String>,
    pub urls: Option<String>,
    pub descricoes: Option<String>,
}

/// Flatten a list of `{nome, url, descricao}` records into three
/// semicolon-joined columns. Entries that are not records are skipped.
pub fn clean_abilities(cell: Option<&str>) -> AbilityColumns {
    let Some(items) = to_str(cell).and_then(|s| literal::parse_list(&s)) else {
        return AbilityColumns::default();
    };

    let records: Vec<_> = items.iter().filter_map(Value::as_object).collect();
    if records.is_empty() {
        return AbilityColumns::default();
    }

    let column = |key: &str| {
        join_multi(records.iter().map(|r| {
            r.get(key)
                .and_then(literal::scalar_text)
                .and_then(|s| to_str(Some(&s)))
                .unwrap_or_else(|| "None".to_string())
        }))
    };

    AbilityColumns {
        nomes: Some(column("nome")),
        urls: Some(column("url")),
        descricoes: Some(column("descricao")),
    }
}
