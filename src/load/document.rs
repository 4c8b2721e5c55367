use std::collections::BTreeMap;

use serde::Serialize;

use super::coerce::{split_cell, to_int, to_level, to_null};

/// Persisted species document. `None` fields are left out of the JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpeciesDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numero: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nome: Option<String>,
    pub tipos: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peso_kg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altura_cm: Option<f64>,
    pub efetividade: BTreeMap<String, f64>,
    pub habilidades: Vec<Ability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evolucao: Option<Evolution>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Ability {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nome: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descricao: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Evolution {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numero: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nome: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condicao: Option<Condition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Condition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
}

impl Evolution {
    fn from_parts(
        numero: Option<i64>,
        level: Option<i64>,
        item: Option<String>,
        nome: Option<String>,
        url: Option<String>,
    ) -> Option<Self> {
        let condicao = (level.is_some() || item.is_some()).then_some(Condition { level, item });
        let evo = Evolution {
            numero,
            nome,
            url,
            condicao,
        };
        (evo != Evolution::default()).then_some(evo)
    }
}

/// Zip the three ability columns by position, up to the longest one.
pub fn build_habilidades(
    nomes: Option<&str>,
    urls: Option<&str>,
    descricoes: Option<&str>,
) -> Vec<Ability> {
    let nomes = split_cell(nomes);
    let urls = split_cell(urls);
    let descricoes = split_cell(descricoes);
    let len = nomes.len().max(urls.len()).max(descricoes.len());

    let at = |col: &[Option<String>], i: usize| col.get(i).cloned().flatten();
    (0..len)
        .map(|i| Ability {
            nome: at(&nomes, i),
            url: at(&urls, i),
            descricao: at(&descricoes, i),
        })
        .filter(|a| *a != Ability::default())
        .collect()
}

/// The five evolution cells of one cleaned row.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvolutionCells<'a> {
    pub numero: Option<&'a str>,
    pub level: Option<&'a str>,
    pub item: Option<&'a str>,
    pub nome: Option<&'a str>,
    pub url: Option<&'a str>,
}

/// Pick the single next evolution stored with a species.
///
/// Columns of equal length are read as aligned entries and the first entry
/// with any value wins. Otherwise each column contributes its own first
/// usable value.
pub fn build_evolucao(cells: EvolutionCells) -> Option<Evolution> {
    let numeros = split_cell(cells.numero);
    let levels = split_cell(cells.level);
    let items = split_cell(cells.item);
    let nomes = split_cell(cells.nome);
    let urls = split_cell(cells.url);

    let len = numeros.len();
    let aligned = [&levels, &items, &nomes, &urls]
        .iter()
        .all(|c| c.len() == len);

    if aligned {
        return (0..len).find_map(|i| {
            Evolution::from_parts(
                to_int(numeros[i].as_deref()),
                to_level(levels[i].as_deref()),
                to_null(items[i].as_deref()),
                to_null(nomes[i].as_deref()),
                to_null(urls[i].as_deref()),
            )
        });
    }

    fn first<T>(col: &[Option<String>], parse: impl Fn(Option<&str>) -> Option<T>) -> Option<T> {
        col.iter().find_map(|v| parse(v.as_deref()))
    }
    Evolution::from_parts(
        first(&numeros, to_int),
        first(&levels, to_level),
        first(&items, to_null),
        first(&nomes, to_null),
        first(&urls, to_null),
    )
}
