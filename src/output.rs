//! # CSV Output
//!
//! Writes summary tables as UTF-8 CSV files with a leading byte-order mark,
//! so spreadsheet tools open them with the right encoding. Existing files of
//! the same name are overwritten without warning.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;
use polars::prelude::*;

use crate::error::Result;

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// Output path for one summary kind: `{name}_{kind}.csv`.
pub fn summary_path(output_dir: &Path, name: &str, kind: &str) -> PathBuf {
    output_dir.join(format!("{}_{}.csv", name, kind))
}

/// Writes a table to the given path as BOM-prefixed UTF-8 CSV.
pub fn write_csv_with_bom(df: &DataFrame, path: &Path) -> Result<()> {
    debug!("writing {} rows to {:?}", df.height(), path);
    let mut file = File::create(path)?;
    file.write_all(UTF8_BOM)?;

    let mut df = df.clone();
    CsvWriter::new(file).include_header(true).finish(&mut df)?;
    Ok(())
}
