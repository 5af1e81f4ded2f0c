use std::collections::HashMap;

use anyhow::Context;
use sqlx::{PgPool, Row};

use crate::tables::{read_csv_rows, Cell, MemoryTables};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn cell_to_json(cell: &Cell) -> serde_json::Value {
    match cell {
        Cell::Empty => serde_json::Value::Null,
        Cell::Bool(flag) => serde_json::Value::Bool(*flag),
        Cell::Number(number) => serde_json::Number::from_f64(*number)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Cell::Text(text) => serde_json::Value::String(text.clone()),
    }
}

/// Replaces every stored row of `table` with the rows of a CSV file, header included.
pub async fn import_csv(
    pool: &PgPool,
    table: &str,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    let rows = read_csv_rows(csv_path)
        .with_context(|| format!("failed to read {}", csv_path.display()))?;

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM support_intel.sheet_rows WHERE table_name = $1")
        .bind(table)
        .execute(&mut *tx)
        .await?;

    for (index, row) in rows.iter().enumerate() {
        let cells = serde_json::Value::Array(row.iter().map(cell_to_json).collect());
        sqlx::query(
            r#"
            INSERT INTO support_intel.sheet_rows (table_name, row_number, cells)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(table)
        .bind(i32::try_from(index + 1).context("too many rows for one table")?)
        .bind(cells)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(rows.len())
}

/// Reads the named tables into an in-memory snapshot for one request.
///
/// Tables with no stored rows are absent from the snapshot, so the pipeline
/// reports them as missing.
pub async fn load_snapshot(pool: &PgPool, tables: &[&str]) -> anyhow::Result<MemoryTables> {
    let names: Vec<String> = tables.iter().map(|name| name.to_string()).collect();
    let records = sqlx::query(
        r#"
        SELECT table_name, row_number, cells
        FROM support_intel.sheet_rows
        WHERE table_name = ANY($1)
        ORDER BY table_name, row_number
        "#,
    )
    .bind(&names)
    .fetch_all(pool)
    .await
    .context("failed to read sheet rows")?;

    let mut grouped: HashMap<String, Vec<Vec<Cell>>> = HashMap::new();
    for record in records {
        let table: String = record.get("table_name");
        let row_number: i32 = record.get("row_number");
        let cells: serde_json::Value = record.get("cells");

        let row = match cells {
            serde_json::Value::Array(values) => values.into_iter().map(Cell::from).collect(),
            other => vec![Cell::from(other)],
        };

        // Keep sheet row positions even when a row number is missing.
        let rows = grouped.entry(table).or_default();
        let position = usize::try_from(row_number.max(1) - 1).unwrap_or(0);
        if rows.len() <= position {
            rows.resize(position + 1, Vec::new());
        }
        rows[position] = row;
    }

    Ok(grouped
        .into_iter()
        .fold(MemoryTables::new(), |snapshot, (table, rows)| {
            snapshot.with_table(table, rows)
        }))
}
