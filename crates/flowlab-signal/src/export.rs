//! CSV export of the aligned table.

use crate::series::AlignedSeries;
use flowlab_core::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Column labels for the exported table. The time column is always
/// written first as `time_s`.
#[derive(Debug, Clone)]
pub struct CsvColumns {
    pub external: String,
    pub measurement: String,
}

impl Default for CsvColumns {
    fn default() -> Self {
        Self {
            external: "conductance_ms".into(),
            measurement: "deflection_px".into(),
        }
    }
}

/// Write the aligned table as CSV. An empty table still produces a
/// file with the header row.
pub fn write_csv<P: AsRef<Path>>(
    path: P,
    series: &AlignedSeries,
    columns: &CsvColumns,
) -> Result<()> {
    let path = path.as_ref();
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "time_s,{},{}", columns.external, columns.measurement)?;
    for row in &series.rows {
        writeln!(out, "{:.6},{:.6},{:.6}", row.time_s, row.external, row.measurement)?;
    }
    out.flush()?;
    info!("Wrote {} rows to {}", series.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::AlignedRow;

    fn table() -> AlignedSeries {
        AlignedSeries {
            rows: vec![
                AlignedRow {
                    time_s: 0.0,
                    external: 1.0,
                    measurement: 12.0,
                },
                AlignedRow {
                    time_s: 0.5,
                    external: 1.25,
                    measurement: 13.0,
                },
            ],
        }
    }

    #[test]
    fn test_write_csv_rows_and_header() {
        let path = std::env::temp_dir().join("flowlab_export_test.csv");
        write_csv(&path, &table(), &CsvColumns::default()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "time_s,conductance_ms,deflection_px");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("0.000000,1.000000,"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_write_csv_empty_table_has_header() {
        let path = std::env::temp_dir().join("flowlab_export_empty.csv");
        let empty = AlignedSeries { rows: vec![] };
        let columns = CsvColumns {
            external: "sensor".into(),
            measurement: "speed_um_s".into(),
        };
        write_csv(&path, &empty, &columns).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim(), "time_s,sensor,speed_um_s");
        std::fs::remove_file(&path).ok();
    }
}
