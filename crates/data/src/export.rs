use rust_decimal::Decimal;
use std::io::Write;
use std::path::Path;
use tadash_core::IndicatorTable;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub const BASE_HEADERS: [&str; 6] = ["Date", "Open", "High", "Low", "Close", "Volume"];

fn field(value: Option<Decimal>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Serialize a table as CSV: one row per date, the bar fields followed by
/// every derived column in table order. Undefined values are empty fields.
pub fn write_table_csv<W: Write>(table: &IndicatorTable, writer: W) -> Result<(), ExportError> {
    let mut csv = csv::Writer::from_writer(writer);

    let header: Vec<&str> = BASE_HEADERS
        .iter()
        .copied()
        .chain(table.columns().iter().map(|c| c.name.as_str()))
        .collect();
    csv.write_record(&header)?;

    for (row, bar) in table.bars().iter().enumerate() {
        let mut record = vec![
            bar.date.format("%Y-%m-%d").to_string(),
            field(bar.open),
            field(bar.high),
            field(bar.low),
            bar.close.to_string(),
            field(bar.volume),
        ];
        record.extend(table.row_values(row).into_iter().map(field));
        csv.write_record(&record)?;
    }

    csv.flush()?;
    Ok(())
}

pub fn table_to_csv_bytes(table: &IndicatorTable) -> Result<Vec<u8>, ExportError> {
    let mut buffer = Vec::new();
    write_table_csv(table, &mut buffer)?;
    Ok(buffer)
}

pub fn write_table_csv_file(table: &IndicatorTable, path: &Path) -> Result<(), ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_table_csv(table, std::io::BufWriter::new(file))?;
    tracing::info!(ticker = %table.ticker, path = %path.display(), rows = table.len(), "Exported CSV");
    Ok(())
}
