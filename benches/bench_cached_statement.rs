//! Criterion comparison of single-row SELECT latency for raw `rusqlite` vs. a
//! model lookup through the per-table statement cache. Both variants read the
//! same seeded file so we measure mapping overhead, not storage effects.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use rusqlite::{Connection, Row, params};
use sql_model::prelude::*;
use std::fs;
use std::hint::black_box;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

sql_model::model! {
    #[derive(Debug, Default, Clone)]
    struct BenchRow in "test" {
        id: i64 => "id" as ID,
        name: String => "name" as NAME,
        score: f64 => "score" as SCORE,
        active: bool => "active" as ACTIVE,
    }
}

impl BenchRow {
    fn from_rusqlite(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            score: row.get(2)?,
            active: row.get(3)?,
        })
    }
}

/// Holds the on-disk database path plus a deterministic id workload.
struct Dataset {
    path: String,
    ids: Vec<i64>,
}

static DATASET: LazyLock<Dataset> = LazyLock::new(|| {
    let row_count = lookup_row_count();
    let path = PathBuf::from("benchmark_sql_model_lookup.db");
    prepare_sqlite_dataset(&path, row_count).expect("failed to prepare SQLite dataset");

    let mut ids: Vec<i64> = (1..=row_count as i64).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(1_234_567_890);
    ids.shuffle(&mut rng);

    Dataset {
        path: path.to_string_lossy().into_owned(),
        ids,
    }
});

fn lookup_row_count() -> usize {
    std::env::var("BENCH_ROWS")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(1000)
}

fn prepare_sqlite_dataset(path: &Path, row_count: usize) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        fs::remove_file(path)?;
    }

    let conn = Connection::open(path)?;
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        CREATE TABLE test (
            id      INTEGER PRIMARY KEY,
            name    TEXT NOT NULL,
            score   REAL NOT NULL,
            active  INTEGER NOT NULL
        );
        ",
    )?;

    let transaction = conn.unchecked_transaction()?;
    {
        let mut insert = transaction.prepare("INSERT INTO test (id, name, score, active) VALUES (?1, ?2, ?3, ?4)")?;
        for id in 1..=row_count as i64 {
            insert.execute(params![id, format!("name-{id}"), id as f64 * 0.5, id % 2 == 0])?;
        }
    }
    transaction.commit()?;
    Ok(())
}

fn bench_single_row_lookup(c: &mut Criterion) {
    let dataset = &*DATASET;
    let mut group = c.benchmark_group("single_row_lookup");
    group.throughput(Throughput::Elements(dataset.ids.len() as u64));

    let connection = Connection::open(&dataset.path).expect("open sqlite connection");
    group.bench_function(BenchmarkId::new("rusqlite", dataset.ids.len()), |b| {
        b.iter(|| {
            let mut stmt = connection
                .prepare_cached("SELECT id, name, score, active FROM test WHERE id = ?1")
                .expect("prepare select statement");
            for &id in &dataset.ids {
                let row = stmt
                    .query_row([id], |row| BenchRow::from_rusqlite(row))
                    .expect("query row");
                black_box(row);
            }
        });
    });

    let db = Db::sqlite_builder(dataset.path.clone()).build().expect("open db");
    group.bench_function(BenchmarkId::new("sql_model", dataset.ids.len()), |b| {
        b.iter(|| {
            for &id in &dataset.ids {
                let mut row = BenchRow {
                    id,
                    ..BenchRow::default()
                };
                db.one(&mut row, BenchRow::FIELDS_ALL, BenchRow::ID)
                    .expect("model lookup");
                black_box(row);
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_single_row_lookup);
criterion_main!(benches);
