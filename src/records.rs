use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AbilityLink {
    pub url: String,
    pub nome: String,
    pub descricao: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvolutionStep {
    pub numero: Option<String>,
    pub nome: Option<String>,
    pub url: Option<String>,
    pub tipos: Vec<String>,
    pub level_item: Option<String>,
}

/// One crawled species page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeciesRecord {
    pub numero: Option<String>,
    pub url: String,
    pub nome: Option<String>,
    pub tamanho: Option<String>,
    pub peso: Option<String>,
    pub tipos: String,
    pub habilidades: Vec<AbilityLink>,
    pub proximas_evolucoes: Vec<EvolutionStep>,
    pub efetividade: BTreeMap<String, String>,
}

/// Flat CSV shape of a [`SpeciesRecord`]; nested fields travel as JSON text.
///
/// Every column is optional on the read side so the cleaner tolerates
/// hand-edited or partial files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRow {
    #[serde(default)]
    pub numero: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub nome: Option<String>,
    #[serde(default)]
    pub tamanho: Option<String>,
    #[serde(default)]
    pub peso: Option<String>,
    #[serde(default)]
    pub tipos: Option<String>,
    #[serde(default)]
    pub habilidades: Option<String>,
    #[serde(default)]
    pub proximas_evolucoes: Option<String>,
    #[serde(default)]
    pub efetividade: Option<String>,
}

pub const RAW_COLUMNS: [&str; 9] = [
    "numero",
    "url",
    "nome",
    "tamanho",
    "peso",
    "tipos",
    "habilidades",
    "proximas_evolucoes",
    "efetividade",
];

impl From<&SpeciesRecord> for RawRow {
    fn from(r: &SpeciesRecord) -> Self {
        RawRow {
            numero: r.numero.clone(),
            url: Some(r.url.clone()),
            nome: r.nome.clone(),
            tamanho: r.tamanho.clone(),
            peso: r.peso.clone(),
            tipos: Some(r.tipos.clone()),
            habilidades: serde_json::to_string(&r.habilidades).ok(),
            proximas_evolucoes: serde_json::to_string(&r.proximas_evolucoes).ok(),
            efetividade: serde_json::to_string(&r.efetividade).ok(),
        }
    }
}

/// Output of the cleaner, in the fixed column order of the cleaned CSV.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanedRow {
    pub numero: Option<i64>,
    pub url: Option<String>,
    pub nome: Option<String>,
    pub tipos: String,
    #[serde(rename = "Peso_kg")]
    pub peso_kg: Option<f64>,
    pub altura_cm: Option<f64>,
    pub efetividade_dict: String,
    pub habilidades_nomes: Option<String>,
    pub habilidades_urls: Option<String>,
    pub habilidades_descricoes: Option<String>,
    pub numero_evol: String,
    pub level_evol: String,
    pub item_evol: String,
    pub nome_evol: String,
    pub url_evol: String,
}

pub const CLEANED_COLUMNS: [&str; 15] = [
    "numero",
    "url",
    "nome",
    "tipos",
    "Peso_kg",
    "altura_cm",
    "efetividade_dict",
    "habilidades_nomes",
    "habilidades_urls",
    "habilidades_descricoes",
    "numero_evol",
    "level_evol",
    "item_evol",
    "nome_evol",
    "url_evol",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_row_carries_nested_fields_as_json() {
        let rec = SpeciesRecord {
            numero: Some("0001".into()),
            url: "https://pokemondb.net/pokedex/bulbasaur".into(),
            nome: Some("Bulbasaur".into()),
            tipos: "Grass,Poison".into(),
            habilidades: vec![AbilityLink {
                url: "https://pokemondb.net/ability/overgrow".into(),
                nome: "Overgrow".into(),
                descricao: Some("Powers up Grass-type moves.".into()),
            }],
            efetividade: BTreeMap::from([("Fire".to_string(), "2".to_string())]),
            ..Default::default()
        };
        let row = RawRow::from(&rec);
        assert_eq!(row.proximas_evolucoes.as_deref(), Some("[]"));
        assert_eq!(row.efetividade.as_deref(), Some(r#"{"Fire":"2"}"#));
        let abilities: Vec<AbilityLink> =
            serde_json::from_str(row.habilidades.as_deref().unwrap()).unwrap();
        assert_eq!(abilities, rec.habilidades);
    }

    #[test]
    fn raw_header_matches_columns() {
        let mut w = csv::Writer::from_writer(Vec::new());
        w.serialize(RawRow::default()).unwrap();
        let out = String::from_utf8(w.into_inner().unwrap()).unwrap();
        assert_eq!(out.lines().next().unwrap(), RAW_COLUMNS.join(","));
    }

    #[test]
    fn cleaned_header_order() {
        let mut w = csv::Writer::from_writer(Vec::new());
        w.serialize(CleanedRow::default()).unwrap();
        let out = String::from_utf8(w.into_inner().unwrap()).unwrap();
        let header = out.lines().next().unwrap();
        assert_eq!(header, CLEANED_COLUMNS.join(","));
    }
}
