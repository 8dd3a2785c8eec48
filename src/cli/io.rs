use crate::seqfile::{detect_format, SeqFormat};
use anyhow::{Context, Result};
use std::fs::create_dir_all;
use std::path::Path;

/// Detect the format of `path`, failing with a readable message.
pub fn check_input(path: &Path) -> Result<SeqFormat> {
    if !path.is_file() {
        anyhow::bail!("input file {:?} does not exist", path);
    }
    let format = detect_format(path).with_context(|| format!("reading {:?}", path))?;
    Ok(format)
}

pub fn create_output_dir(dir: &Path) -> Result<()> {
    create_dir_all(dir).context("Cannot create output_dir")
}
