use std::path::Path;

use anyhow::{Context, Result};

/// Write a delimited export: one header row, one row per aggregation key.
pub fn write_rows<P, R, C>(path: P, header: &[&str], rows: R) -> Result<()>
where
    P: AsRef<Path>,
    R: IntoIterator<Item = Vec<C>>,
    C: AsRef<[u8]>,
{
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;

    writer
        .write_record(header)
        .context("Failed to write CSV header")?;

    for row in rows {
        writer
            .write_record(row.iter().map(AsRef::as_ref))
            .context("Failed to write CSV row")?;
    }

    writer
        .flush()
        .with_context(|| format!("Failed to flush CSV file: {}", path.display()))?;
    Ok(())
}
