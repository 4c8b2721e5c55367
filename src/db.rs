use std::path::Path;

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS pokemons (
            id         INTEGER PRIMARY KEY,
            numero     INTEGER UNIQUE,
            nome       TEXT,
            doc        TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_pokemons_nome ON pokemons(nome);
        ",
    )?;
    Ok(())
}

/// Delete every document; returns how many were removed.
pub fn clear(conn: &Connection) -> Result<usize> {
    Ok(conn.execute("DELETE FROM pokemons", [])?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Modified,
    Unchanged,
}

/// Upsert keyed by `numero`, else by `nome` among unnumbered documents.
///
/// On a match the new top-level keys overwrite the stored ones and other
/// stored keys survive.
pub fn upsert(conn: &Connection, doc: &Value) -> Result<UpsertOutcome> {
    let Some(doc) = doc.as_object() else {
        bail!("document is not a JSON object");
    };
    let numero = doc.get("numero").and_then(Value::as_i64);
    let nome = doc.get("nome").and_then(Value::as_str);

    let existing: Option<(i64, String)> = match numero {
        Some(n) => conn
            .query_row(
                "SELECT id, doc FROM pokemons WHERE numero = ?1",
                [n],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?,
        None => conn
            .query_row(
                "SELECT id, doc FROM pokemons WHERE numero IS NULL AND nome IS ?1",
                [nome],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?,
    };

    let Some((id, stored)) = existing else {
        conn.execute(
            "INSERT INTO pokemons (numero, nome, doc) VALUES (?1, ?2, ?3)",
            params![numero, nome, serde_json::to_string(doc)?],
        )?;
        return Ok(UpsertOutcome::Inserted);
    };

    let before: Map<String, Value> = serde_json::from_str(&stored)
        .with_context(|| format!("Stored document {} is not valid JSON", id))?;
    let mut merged = before.clone();
    for (k, v) in doc {
        merged.insert(k.clone(), v.clone());
    }
    if merged == before {
        return Ok(UpsertOutcome::Unchanged);
    }

    conn.execute(
        "UPDATE pokemons SET numero = ?1, nome = ?2, doc = ?3, updated_at = datetime('now')
         WHERE id = ?4",
        params![
            merged.get("numero").and_then(Value::as_i64),
            merged.get("nome").and_then(Value::as_str),
            serde_json::to_string(&merged)?,
            id,
        ],
    )?;
    Ok(UpsertOutcome::Modified)
}

pub fn fetch_by_numero(conn: &Connection, numero: i64) -> Result<Option<Value>> {
    let doc: Option<String> = conn
        .query_row("SELECT doc FROM pokemons WHERE numero = ?1", [numero], |row| row.get(0))
        .optional()?;
    doc.map(|d| serde_json::from_str(&d).context("Stored document is not valid JSON"))
        .transpose()
}

// ── Queries ──

/// Species with at least `min` entries in `tipos`.
pub fn count_with_min_types(conn: &Connection, min: usize) -> Result<usize> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM pokemons
         WHERE json_type(doc, '$.tipos') = 'array'
           AND json_array_length(doc, '$.tipos') >= ?1",
        [min as i64],
        |row| row.get(0),
    )?;
    Ok(n as usize)
}

pub struct LateEvolver {
    pub numero: Option<i64>,
    pub nome: Option<String>,
    pub level: i64,
    pub evolves_to: Option<String>,
}

/// Names a type is stored under; water species may carry the Portuguese name.
fn type_aliases(tipo: &str) -> [String; 2] {
    match tipo.trim().to_lowercase().as_str() {
        "water" | "água" | "agua" => ["Water".to_string(), "Água".to_string()],
        _ => [tipo.trim().to_string(), tipo.trim().to_string()],
    }
}

/// Species of type `tipo` whose next evolution needs a level in
/// `(min_level, 100]`, ordered by number.
pub fn evolving_after_level(
    conn: &Connection,
    tipo: &str,
    min_level: i64,
) -> Result<Vec<LateEvolver>> {
    let [a, b] = type_aliases(tipo);
    let mut stmt = conn.prepare(
        "SELECT numero, nome,
                json_extract(doc, '$.evolucao.condicao.level'),
                json_extract(doc, '$.evolucao.nome')
         FROM pokemons
         WHERE json_type(doc, '$.evolucao.condicao.level') = 'integer'
           AND json_extract(doc, '$.evolucao.condicao.level') > ?1
           AND json_extract(doc, '$.evolucao.condicao.level') <= 100
           AND EXISTS (
               SELECT 1 FROM json_each(doc, '$.tipos') t
               WHERE lower(t.value) IN (lower(?2), lower(?3))
           )
         ORDER BY numero",
    )?;
    let rows = stmt
        .query_map(params![min_level, a, b], |row| {
            Ok(LateEvolver {
                numero: row.get(0)?,
                nome: row.get(1)?,
                level: row.get(2)?,
                evolves_to: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub total: usize,
    pub numbered: usize,
    pub with_evolution: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let (total, numbered, with_evolution): (i64, i64, i64) = conn.query_row(
        "SELECT COUNT(*),
                COUNT(numero),
                COALESCE(SUM(json_type(doc, '$.evolucao') = 'object'), 0)
         FROM pokemons",
        [],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;
    Ok(Stats {
        total: total as usize,
        numbered: numbered as usize,
        with_evolution: with_evolution as usize,
    })
}
