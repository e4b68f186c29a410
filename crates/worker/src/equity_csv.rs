use anyhow::Context;
use std::io::Read;
use stockbot_core::domain::stock::StockRecord;

/// Reads `symbol,company_name` rows (NSE `EQUITY_L.csv` shape). A leading header row is
/// skipped, extra columns are ignored and rows without a symbol are dropped.
pub fn parse_equity_csv<R: Read>(reader: R) -> anyhow::Result<Vec<StockRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut out = Vec::new();
    let mut skipped: usize = 0;
    for (idx, row) in rdr.records().enumerate() {
        let row = row.with_context(|| format!("invalid CSV row {}", idx + 1))?;
        let symbol = row.get(0).unwrap_or_default();
        let company_name = row.get(1).unwrap_or_default();

        if idx == 0 && symbol.eq_ignore_ascii_case("symbol") {
            continue;
        }
        if symbol.is_empty() || company_name.is_empty() {
            skipped += 1;
            continue;
        }
        out.push(StockRecord::new(symbol, company_name));
    }

    if skipped > 0 {
        tracing::warn!(skipped, "skipped CSV rows without symbol or company name");
    }
    Ok(out)
}
