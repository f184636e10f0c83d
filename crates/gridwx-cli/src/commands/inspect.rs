use std::io::{self, Write};
use std::path::Path;

use anyhow::Result;
use tabwriter::TabWriter;

use gridwx_ts::summary::TableSummary;
use gridwx_ts::{read_features, summarize};

pub fn handle(table: &Path, top: usize) -> Result<()> {
    let rows = read_features(table)?;
    let summary = summarize(&rows, top);
    print_summary(table, &summary)
}

fn opt(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.precision$}"))
}

fn print_summary(table: &Path, summary: &TableSummary) -> Result<()> {
    println!("Table: {}", table.display());
    match (summary.first_date, summary.last_date) {
        (Some(first), Some(last)) => println!("Rows : {} ({first} .. {last})", summary.rows),
        _ => println!("Rows : {}", summary.rows),
    }
    println!();

    let mut writer = TabWriter::new(io::stdout());
    writeln!(
        writer,
        "REGION\tROWS\tLOAD MEAN\tLOAD STD\tLOAD MIN\tLOAD MAX\tTEMP MEAN\tANOMALIES\tRATE %\tCORR LOAD/TEMP"
    )?;
    for region in &summary.regions {
        writeln!(
            writer,
            "{}\t{}\t{:.1}\t{}\t{:.1}\t{:.1}\t{:.2}\t{}\t{:.2}\t{}",
            region.region,
            region.rows,
            region.load_mean,
            opt(region.load_std, 1),
            region.load_min,
            region.load_max,
            region.temp_mean,
            region.anomalies,
            region.anomaly_rate_pct,
            opt(region.load_temp_corr, 3),
        )?;
    }
    writer.flush()?;

    if summary.top_zscores.is_empty() {
        return Ok(());
    }
    println!();
    println!("Top {} days by load Z-score:", summary.top_zscores.len());
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "DATE\tREGION\tLOAD MW\tZSCORE\tANOMALY")?;
    for row in &summary.top_zscores {
        writeln!(
            writer,
            "{}\t{}\t{:.1}\t{:.3}\t{}",
            row.base.date,
            row.base.region,
            row.base.load_mw,
            row.load_zscore,
            if row.is_anomaly { "yes" } else { "no" }
        )?;
    }
    writer.flush()?;
    Ok(())
}
