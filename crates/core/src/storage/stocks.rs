use crate::directory::StockDirectory;
use crate::domain::stock::StockRecord;
use crate::storage::like_pattern;
use anyhow::Context;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct PgStockDirectory {
    pool: sqlx::PgPool,
}

impl PgStockDirectory {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

fn into_records(rows: Vec<(String, String)>) -> Vec<StockRecord> {
    rows.into_iter()
        .map(|(symbol, company_name)| StockRecord {
            symbol,
            company_name,
        })
        .collect()
}

#[async_trait::async_trait]
impl StockDirectory for PgStockDirectory {
    async fn find_by_symbol_exact(&self, symbol: &str) -> anyhow::Result<Option<StockRecord>> {
        let row = sqlx::query_as::<_, (String, String)>(
            "SELECT symbol, company_name FROM stocks \
             WHERE LOWER(symbol) = LOWER($1) \
             LIMIT 1",
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("select stock by symbol failed (symbol={symbol})"))?;

        Ok(row.map(|(symbol, company_name)| StockRecord {
            symbol,
            company_name,
        }))
    }

    async fn find_by_name_substring(
        &self,
        fragment: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<StockRecord>> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT symbol, company_name FROM stocks \
             WHERE LOWER(company_name) LIKE LOWER($1) ESCAPE '\\' \
             ORDER BY symbol ASC \
             LIMIT $2",
        )
        .bind(like_pattern(fragment))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("search stocks by company name failed")?;

        Ok(into_records(rows))
    }

    async fn find_by_name_or_symbol_substring(
        &self,
        fragment: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<StockRecord>> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT symbol, company_name FROM stocks \
             WHERE LOWER(symbol) LIKE LOWER($1) ESCAPE '\\' \
                OR LOWER(company_name) LIKE LOWER($1) ESCAPE '\\' \
             ORDER BY symbol ASC \
             LIMIT $2",
        )
        .bind(like_pattern(fragment))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("search stocks by symbol or company name failed")?;

        Ok(into_records(rows))
    }
}

/// One row per (trimmed) symbol, the last occurrence winning. A single `INSERT .. ON CONFLICT`
/// statement cannot touch the same key twice.
fn dedupe_by_symbol(records: &[StockRecord]) -> Vec<StockRecord> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(records.len());
    let mut out: Vec<StockRecord> = Vec::with_capacity(records.len());
    for record in records {
        match index.get(record.symbol.trim()) {
            Some(&pos) => out[pos] = record.clone(),
            None => {
                index.insert(record.symbol.trim(), out.len());
                out.push(record.clone());
            }
        }
    }

    let collapsed = records.len() - out.len();
    if collapsed > 0 {
        tracing::warn!(collapsed, "collapsed duplicate stock symbols; last row wins");
    }
    out
}

/// Bulk insert-or-update of directory rows in one transaction. Returns rows affected.
pub async fn upsert_stocks(pool: &sqlx::PgPool, records: &[StockRecord]) -> anyhow::Result<u64> {
    anyhow::ensure!(!records.is_empty(), "records must be non-empty");

    let records = dedupe_by_symbol(records);
    let mut tx = pool.begin().await.context("begin transaction failed")?;

    let mut affected: u64 = 0;
    for (batch_idx, chunk) in records.chunks(500).enumerate() {
        let mut qb = sqlx::QueryBuilder::new("INSERT INTO stocks (symbol, company_name) ");
        qb.push_values(chunk, |mut b, record| {
            b.push_bind(record.symbol.trim())
                .push_bind(record.company_name.trim());
        });
        qb.push(" ON CONFLICT (symbol) DO UPDATE SET company_name = EXCLUDED.company_name");

        let res = qb
            .build()
            .persistent(false)
            .execute(&mut *tx)
            .await
            .context("batch upsert stocks failed")?;
        affected += res.rows_affected();

        tracing::debug!(batch_idx, batch_size = chunk.len(), "stocks batch upsert");
    }

    tx.commit().await.context("commit transaction failed")?;
    Ok(affected)
}
