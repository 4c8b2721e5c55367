pub mod abilities;
pub mod effectiveness;
pub mod evolution;
pub mod measures;
pub mod text;

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::records::{CleanedRow, RawRow};
use text::{to_int_safe, to_str};

pub struct CleanStats {
    pub read: usize,
    pub duplicates: usize,
    pub dropped: usize,
    pub written: usize,
}

/// Read the crawl CSV, clean it, and write the cleaned CSV.
pub fn clean_file(input: &Path, output: &Path) -> Result<CleanStats> {
    let rows = read_raw(input)?;
    let read = rows.len();
    info!("Read {} raw rows from {}", read, input.display());

    let (rows, duplicates) = dedup_by_numero(rows);
    let before_drop = rows.len();
    let rows: Vec<RawRow> = rows.into_iter().filter(|r| !is_blank(r)).collect();
    let dropped = before_drop - rows.len();

    let cleaned = clean_rows(&rows);
    write_cleaned(output, &cleaned)?;
    info!("Wrote {} cleaned rows to {}", cleaned.len(), output.display());

    Ok(CleanStats {
        read,
        duplicates,
        dropped,
        written: cleaned.len(),
    })
}

pub fn read_raw(path: &Path) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut rows = Vec::new();
    for (i, rec) in reader.deserialize::<RawRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => debug!("Skipping unreadable row {}: {}", i + 1, e),
        }
    }
    Ok(rows)
}

pub fn write_cleaned(path: &Path, rows: &[CleanedRow]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Coerce `numero` to its first integer and keep the first row per number.
/// Rows without a number are kept as-is.
pub fn dedup_by_numero(rows: Vec<RawRow>) -> (Vec<RawRow>, usize) {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(rows.len());
    let mut duplicates = 0;
    for mut row in rows {
        let numero = to_int_safe(row.numero.as_deref());
        row.numero = numero.map(|n| n.to_string());
        match numero {
            Some(n) if !seen.insert(n) => duplicates += 1,
            _ => kept.push(row),
        }
    }
    (kept, duplicates)
}

/// True when every column except the rich ones is null.
fn is_blank(row: &RawRow) -> bool {
    [
        &row.numero,
        &row.url,
        &row.nome,
        &row.tamanho,
        &row.peso,
        &row.tipos,
    ]
    .iter()
    .all(|v| to_str(v.as_deref()).is_none())
}

pub fn clean_rows(rows: &[RawRow]) -> Vec<CleanedRow> {
    rows.par_iter().map(clean_row).collect()
}

pub fn clean_row(row: &RawRow) -> CleanedRow {
    let abilities = abilities::clean_abilities(row.habilidades.as_deref());
    let evolution = evolution::clean_evolutions(row.proximas_evolucoes.as_deref());

    CleanedRow {
        numero: to_int_safe(row.numero.as_deref()),
        url: to_str(row.url.as_deref()),
        nome: to_str(row.nome.as_deref()),
        tipos: normalize_types(row.tipos.as_deref()),
        peso_kg: measures::weight_kg(row.peso.as_deref()),
        altura_cm: measures::height_cm(row.tamanho.as_deref()),
        efetividade_dict: effectiveness::clean_effectiveness(row.efetividade.as_deref()),
        habilidades_nomes: abilities.nomes,
        habilidades_urls: abilities.urls,
        habilidades_descricoes: abilities.descricoes,
        numero_evol: evolution.numero,
        level_evol: evolution.level,
        item_evol: evolution.item,
        nome_evol: evolution.nome,
        url_evol: evolution.url,
    }
}

/// `"Grass ,Poison,"` → `"Grass, Poison"`.
pub fn normalize_types(v: Option<&str>) -> String {
    let Some(s) = to_str(v) else {
        return String::new();
    };
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(numero: &str, nome: &str) -> RawRow {
        RawRow {
            numero: Some(numero.into()),
            nome: Some(nome.into()),
            ..Default::default()
        }
    }

    #[test]
    fn dedup_keeps_first_seen() {
        let rows = vec![raw("0025", "Pikachu"), raw("#25", "Pikachu (Partner)"), raw("26", "Raichu")];
        let (kept, dups) = dedup_by_numero(rows);
        assert_eq!(dups, 1);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].nome.as_deref(), Some("Pikachu"));
        assert_eq!(kept[0].numero.as_deref(), Some("25"));
    }

    #[test]
    fn dedup_leaves_unnumbered_rows() {
        let rows = vec![raw("", "MissingNo"), raw("?", "Glitch")];
        let (kept, dups) = dedup_by_numero(rows);
        assert_eq!(dups, 0);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn blank_rows_ignore_rich_columns() {
        let row = RawRow {
            habilidades: Some("[{'nome': 'x'}]".into()),
            efetividade: Some("{'Fire': '2'}".into()),
            proximas_evolucoes: Some("[]".into()),
            tipos: Some(" ".into()),
            ..Default::default()
        };
        assert!(is_blank(&row));
        assert!(!is_blank(&raw("1", "Bulbasaur")));
    }

    #[test]
    fn types_normalized() {
        assert_eq!(normalize_types(Some("Grass ,Poison,")), "Grass, Poison");
        assert_eq!(normalize_types(Some("nan")), "");
    }

    #[test]
    fn cleans_fixture_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("clean.csv");
        let stats = clean_file(Path::new("tests/fixtures/saida.csv"), &out).unwrap();
        assert_eq!(stats.read, 5);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.written, 3);

        let mut reader = csv::Reader::from_path(&out).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, crate::records::CLEANED_COLUMNS);
        let rows: Vec<CleanedRow> = reader.deserialize().collect::<Result<_, _>>().unwrap();

        let bulbasaur = &rows[0];
        assert_eq!(bulbasaur.numero, Some(1));
        assert_eq!(bulbasaur.tipos, "Grass, Poison");
        assert_eq!(bulbasaur.peso_kg, Some(6.9));
        assert_eq!(bulbasaur.altura_cm, Some(70.0));
        assert_eq!(bulbasaur.habilidades_nomes.as_deref(), Some("Overgrow; Chlorophyll"));
        assert_eq!(bulbasaur.numero_evol, "2; 3");
        assert_eq!(bulbasaur.level_evol, "16; 32");

        let pikachu = &rows[1];
        assert_eq!(pikachu.nome.as_deref(), Some("Pikachu"));
        assert_eq!(pikachu.numero_evol, "26");
        assert_eq!(pikachu.item_evol, "use Thunder Stone");
        assert!(pikachu.efetividade_dict.contains(r#""Flying":0.5"#));

        let legacy = &rows[2];
        assert_eq!(legacy.numero, Some(133));
        assert_eq!(legacy.numero_evol, "26");
        assert_eq!(legacy.level_evol, "16");
        assert_eq!(legacy.habilidades_descricoes.as_deref(), Some("None"));
    }
}
