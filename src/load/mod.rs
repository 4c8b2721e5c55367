pub mod coerce;
pub mod document;

use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use serde::Deserialize;
use tracing::{info, warn};

use crate::db::{self, UpsertOutcome};
use crate::records::CLEANED_COLUMNS;
use coerce::{parse_effectiveness, parse_tipos, to_float, to_int, to_null};
use document::{build_evolucao, build_habilidades, EvolutionCells, SpeciesDocument};

const CHUNK_SIZE: usize = 500;

/// A cleaned-CSV row read back as plain text; typing happens per column.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoadRow {
    pub numero: Option<String>,
    pub url: Option<String>,
    pub nome: Option<String>,
    pub tipos: Option<String>,
    #[serde(rename = "Peso_kg", alias = "peso_kg")]
    pub peso_kg: Option<String>,
    pub altura_cm: Option<String>,
    pub efetividade_dict: Option<String>,
    pub habilidades_nomes: Option<String>,
    pub habilidades_urls: Option<String>,
    pub habilidades_descricoes: Option<String>,
    pub numero_evol: Option<String>,
    pub level_evol: Option<String>,
    pub item_evol: Option<String>,
    pub nome_evol: Option<String>,
    pub url_evol: Option<String>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub inserted: usize,
    pub modified: usize,
    pub unchanged: usize,
    pub failed: usize,
}

pub fn build_document(row: &LoadRow) -> SpeciesDocument {
    SpeciesDocument {
        numero: to_int(row.numero.as_deref()),
        url: to_null(row.url.as_deref()),
        nome: to_null(row.nome.as_deref()),
        tipos: parse_tipos(row.tipos.as_deref()),
        peso_kg: to_float(row.peso_kg.as_deref()),
        altura_cm: to_float(row.altura_cm.as_deref()),
        efetividade: parse_effectiveness(row.efetividade_dict.as_deref()),
        habilidades: build_habilidades(
            row.habilidades_nomes.as_deref(),
            row.habilidades_urls.as_deref(),
            row.habilidades_descricoes.as_deref(),
        ),
        evolucao: build_evolucao(EvolutionCells {
            numero: row.numero_evol.as_deref(),
            level: row.level_evol.as_deref(),
            item: row.item_evol.as_deref(),
            nome: row.nome_evol.as_deref(),
            url: row.url_evol.as_deref(),
        }),
    }
}

/// Read the cleaned CSV into documents. Unreadable rows are counted, not fatal.
pub fn read_documents(path: &Path) -> Result<(Vec<SpeciesDocument>, usize)> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let headers = reader.headers()?.clone();
    for col in CLEANED_COLUMNS {
        if !headers.iter().any(|h| h == col) {
            warn!("Column {} missing from {}", col, path.display());
        }
    }

    let mut docs = Vec::new();
    let mut failed = 0;
    for (i, rec) in reader.deserialize::<LoadRow>().enumerate() {
        match rec {
            Ok(row) => docs.push(build_document(&row)),
            Err(e) => {
                warn!("Skipping unreadable row {}: {}", i + 1, e);
                failed += 1;
            }
        }
    }
    Ok((docs, failed))
}

/// Load the cleaned CSV into the store.
///
/// Without `append` the collection is cleared first. Upserts are committed
/// in chunks, so an interrupted load leaves the chunks already written.
pub fn load_file(conn: &Connection, path: &Path, append: bool) -> Result<LoadStats> {
    let (docs, failed) = read_documents(path)?;
    info!("Read {} documents from {}", docs.len(), path.display());

    if !append {
        let removed = db::clear(conn).context("Failed to clear collection")?;
        info!("Cleared {} existing documents", removed);
    }

    let mut stats = LoadStats {
        failed,
        ..Default::default()
    };

    let pb = ProgressBar::new(docs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec})")?
            .progress_chars("=> "),
    );

    for chunk in docs.chunks(CHUNK_SIZE) {
        let tx = conn.unchecked_transaction()?;
        for doc in chunk {
            let outcome = serde_json::to_value(doc)
                .map_err(anyhow::Error::from)
                .and_then(|value| db::upsert(&tx, &value));
            match outcome {
                Ok(UpsertOutcome::Inserted) => stats.inserted += 1,
                Ok(UpsertOutcome::Modified) => stats.modified += 1,
                Ok(UpsertOutcome::Unchanged) => stats.unchanged += 1,
                Err(e) => {
                    warn!(
                        "Upsert failed for {}: {:#}",
                        doc.nome.as_deref().unwrap_or("<unnamed>"),
                        e
                    );
                    stats.failed += 1;
                }
            }
        }
        tx.commit()?;
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    info!(
        "Loaded: {} inserted, {} modified, {} unchanged, {} failed",
        stats.inserted, stats.modified, stats.unchanged, stats.failed
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mem() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        conn
    }

    fn fixture() -> &'static Path {
        Path::new("tests/fixtures/pokedex_clean.csv")
    }

    #[test]
    fn loads_fixture() {
        let conn = mem();
        let stats = load_file(&conn, fixture(), false).unwrap();
        assert_eq!(
            stats,
            LoadStats {
                inserted: 5,
                ..Default::default()
            }
        );

        let squirtle = db::fetch_by_numero(&conn, 7).unwrap().unwrap();
        assert_eq!(squirtle["tipos"], serde_json::json!(["Water"]));
        assert_eq!(squirtle["altura_cm"], 50.0);
        assert_eq!(squirtle["efetividade"]["Electric"], 2.0);
        assert_eq!(squirtle["habilidades"][1]["nome"], "Rain Dish");
        assert!(squirtle["habilidades"][1].get("descricao").is_none());
        assert_eq!(squirtle["evolucao"]["numero"], 8);
        assert_eq!(squirtle["evolucao"]["nome"], "Wartortle");
        assert_eq!(squirtle["evolucao"]["condicao"]["level"], 16);

        let pikachu = db::fetch_by_numero(&conn, 25).unwrap().unwrap();
        assert_eq!(pikachu["peso_kg"], 6.0);
        assert_eq!(pikachu["efetividade"]["Flying"], 0.5);
        assert_eq!(pikachu["habilidades"].as_array().unwrap().len(), 2);
        assert_eq!(pikachu["evolucao"]["condicao"]["item"], "use Thunder Stone");
        assert!(pikachu["evolucao"].get("url").is_none());
    }

    #[test]
    fn overflowing_numero_is_stored_as_null() {
        let conn = mem();
        load_file(&conn, fixture(), false).unwrap();
        let (numero, doc): (Option<i64>, String) = conn
            .query_row(
                "SELECT numero, doc FROM pokemons WHERE nome = 'MissingNo'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(numero, None);
        let doc: serde_json::Value = serde_json::from_str(&doc).unwrap();
        assert!(doc.get("numero").is_none());
        assert!(doc.get("url").is_none());
        assert!(doc.get("evolucao").is_none());
    }

    #[test]
    fn reload_is_idempotent() {
        let conn = mem();
        load_file(&conn, fixture(), false).unwrap();
        let first = db::fetch_by_numero(&conn, 8).unwrap();
        let count = db::get_stats(&conn).unwrap().total;

        let again = load_file(&conn, fixture(), false).unwrap();
        assert_eq!(again.inserted, 5);
        assert_eq!(db::get_stats(&conn).unwrap().total, count);
        assert_eq!(db::fetch_by_numero(&conn, 8).unwrap(), first);

        let appended = load_file(&conn, fixture(), true).unwrap();
        assert_eq!(
            appended,
            LoadStats {
                unchanged: 5,
                ..Default::default()
            }
        );
        assert_eq!(db::get_stats(&conn).unwrap().total, count);
    }

    #[test]
    fn queries_over_loaded_fixture() {
        let conn = mem();
        load_file(&conn, fixture(), false).unwrap();
        assert_eq!(db::count_with_min_types(&conn, 2).unwrap(), 1);
        let late = db::evolving_after_level(&conn, "Water", 30).unwrap();
        let nums: Vec<_> = late.iter().map(|r| r.numero).collect();
        assert_eq!(nums, [Some(8), Some(116)]);
    }

    #[test]
    fn missing_columns_still_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.csv");
        std::fs::write(&path, "numero,nome\n1,Bulbasaur\n").unwrap();
        let conn = mem();
        let stats = load_file(&conn, &path, false).unwrap();
        assert_eq!(stats.inserted, 1);
        let doc = db::fetch_by_numero(&conn, 1).unwrap().unwrap();
        assert_eq!(doc["nome"], "Bulbasaur");
        assert_eq!(doc["tipos"], serde_json::json!([]));
    }

    #[test]
    fn cleaner_output_loads() {
        let dir = tempfile::tempdir().unwrap();
        let cleaned = dir.path().join("clean.csv");
        crate::clean::clean_file(Path::new("tests/fixtures/saida.csv"), &cleaned).unwrap();

        let conn = mem();
        let stats = load_file(&conn, &cleaned, false).unwrap();
        assert_eq!(stats.inserted, 3);

        let bulbasaur = db::fetch_by_numero(&conn, 1).unwrap().unwrap();
        assert_eq!(bulbasaur["tipos"], serde_json::json!(["Grass", "Poison"]));
        assert_eq!(bulbasaur["peso_kg"], 6.9);
        assert_eq!(bulbasaur["efetividade"]["Grass"], 0.25);
        assert_eq!(bulbasaur["evolucao"]["nome"], "Ivysaur");
        assert_eq!(bulbasaur["evolucao"]["condicao"]["level"], 16);

        let eevee = db::fetch_by_numero(&conn, 133).unwrap().unwrap();
        assert_eq!(eevee["evolucao"]["numero"], 26);
        assert_eq!(eevee["evolucao"]["condicao"]["level"], 16);
        assert_eq!(eevee["habilidades"][0]["nome"], "Run Away");
    }
}
