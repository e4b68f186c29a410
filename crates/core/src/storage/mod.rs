use anyhow::Context;

pub mod stocks;
pub mod users;

pub use stocks::PgStockDirectory;
pub use users::PgUserStore;

pub async fn migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("sqlx migrations failed")?;
    Ok(())
}

/// `%fragment%` with LIKE metacharacters escaped (pair with `ESCAPE '\'`).
pub(crate) fn like_pattern(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len() + 2);
    out.push('%');
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("hul"), "%hul%");
        assert_eq!(like_pattern("50%_x"), "%50\\%\\_x%");
    }
}
