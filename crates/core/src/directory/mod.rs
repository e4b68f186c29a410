//! Resolves free-text stock queries against the local directory.

use crate::domain::stock::StockRecord;
use crate::error::{BotError, Result};
use std::sync::Arc;

pub const MAX_RESULTS: usize = 10;

/// Read-only lookups against the stock directory. All comparisons are case-insensitive.
#[async_trait::async_trait]
pub trait StockDirectory: Send + Sync {
    async fn find_by_symbol_exact(&self, symbol: &str) -> anyhow::Result<Option<StockRecord>>;

    async fn find_by_name_substring(
        &self,
        fragment: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<StockRecord>>;

    async fn find_by_name_or_symbol_substring(
        &self,
        fragment: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<StockRecord>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    NotFound,
    Resolved(StockRecord),
    Ambiguous(Vec<StockRecord>),
}

impl From<Vec<StockRecord>> for Resolution {
    fn from(mut records: Vec<StockRecord>) -> Self {
        match records.len() {
            0 => Resolution::NotFound,
            1 => Resolution::Resolved(records.remove(0)),
            _ => Resolution::Ambiguous(records),
        }
    }
}

#[derive(Clone)]
pub struct StockMatcher {
    directory: Arc<dyn StockDirectory>,
}

impl StockMatcher {
    pub fn new(directory: Arc<dyn StockDirectory>) -> Self {
        Self { directory }
    }

    /// Multi-word queries are company-name searches. A single token is tried as an exact symbol
    /// first and only falls back to the fuzzy symbol-or-name search when that misses.
    pub async fn resolve(&self, query: &str) -> Result<Vec<StockRecord>> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let mut records = if query.split_whitespace().nth(1).is_some() {
            self.directory
                .find_by_name_substring(&query, MAX_RESULTS)
                .await
                .map_err(BotError::Persistence)?
        } else {
            let exact = self
                .directory
                .find_by_symbol_exact(&query)
                .await
                .map_err(BotError::Persistence)?;
            if let Some(record) = exact {
                tracing::debug!(%query, symbol = %record.symbol, "exact symbol match");
                return Ok(vec![record]);
            }

            self.directory
                .find_by_name_or_symbol_substring(&query, MAX_RESULTS)
                .await
                .map_err(BotError::Persistence)?
        };

        records.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        records.truncate(MAX_RESULTS);
        tracing::debug!(%query, matches = records.len(), "directory search");
        Ok(records)
    }

    pub async fn resolve_one(&self, query: &str) -> Result<Resolution> {
        self.resolve(query).await.map(Resolution::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DirectoryCall, MemoryDirectory};

    fn directory() -> Arc<MemoryDirectory> {
        Arc::new(MemoryDirectory::with_records([
            ("HUL", "Hindustan Unilever Limited"),
            ("HULC", "HUL Consulting"),
            ("RELIANCE", "Reliance Industries Limited"),
            ("RELINFRA", "Reliance Infrastructure Limited"),
            ("TCS", "Tata Consultancy Services Limited"),
            ("TATAMOTORS", "Tata Motors Limited"),
        ]))
    }

    #[tokio::test]
    async fn exact_symbol_short_circuits() {
        let dir = directory();
        let matcher = StockMatcher::new(dir.clone());

        let got = matcher.resolve("HUL").await.unwrap();
        assert_eq!(got, vec![StockRecord::new("HUL", "Hindustan Unilever Limited")]);
        assert_eq!(dir.calls(), vec![DirectoryCall::SymbolExact("hul".into())]);
    }

    #[tokio::test]
    async fn whitespace_query_searches_company_names_only() {
        let dir = directory();
        let matcher = StockMatcher::new(dir.clone());

        let got = matcher.resolve("Reliance Industries").await.unwrap();
        assert_eq!(
            got,
            vec![StockRecord::new("RELIANCE", "Reliance Industries Limited")]
        );
        assert_eq!(
            dir.calls(),
            vec![DirectoryCall::NameSubstring("reliance industries".into())]
        );
    }

    #[tokio::test]
    async fn single_token_falls_back_to_fuzzy_and_sorts() {
        let dir = directory();
        let matcher = StockMatcher::new(dir.clone());

        let got = matcher.resolve("tata").await.unwrap();
        let symbols: Vec<_> = got.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["TATAMOTORS", "TCS"]);
        assert_eq!(
            dir.calls(),
            vec![
                DirectoryCall::SymbolExact("tata".into()),
                DirectoryCall::NameOrSymbolSubstring("tata".into()),
            ]
        );
    }

    #[tokio::test]
    async fn fuzzy_matches_symbol_fragments_too() {
        let matcher = StockMatcher::new(directory());
        let got = matcher.resolve("relin").await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].symbol, "RELINFRA");
    }

    #[tokio::test]
    async fn empty_query_does_not_touch_store() {
        let dir = directory();
        let matcher = StockMatcher::new(dir.clone());
        assert!(matcher.resolve("   ").await.unwrap().is_empty());
        assert!(dir.calls().is_empty());
    }

    #[tokio::test]
    async fn results_are_capped() {
        let records: Vec<_> = (0..25)
            .map(|i| (format!("ACME{i:02}"), format!("Acme Holding {i}")))
            .collect();
        let matcher = StockMatcher::new(Arc::new(MemoryDirectory::with_records(records)));
        let got = matcher.resolve("acme").await.unwrap();
        assert_eq!(got.len(), MAX_RESULTS);
    }

    #[tokio::test]
    async fn store_failure_is_persistence_error() {
        let dir = directory();
        dir.fail_with("connection refused");
        let matcher = StockMatcher::new(dir);
        let err = matcher.resolve("HUL").await.unwrap_err();
        assert!(matches!(err, BotError::Persistence(_)));
    }

    #[test]
    fn resolution_from_cardinality() {
        assert_eq!(Resolution::from(Vec::new()), Resolution::NotFound);
        let one = StockRecord::new("TCS", "Tata Consultancy Services Limited");
        assert_eq!(
            Resolution::from(vec![one.clone()]),
            Resolution::Resolved(one.clone())
        );
        assert!(matches!(
            Resolution::from(vec![one.clone(), one]),
            Resolution::Ambiguous(v) if v.len() == 2
        ));
    }
}
