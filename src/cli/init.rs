use anyhow::Result;
use std::path::Path;

use crate::config::Settings;

pub fn write_default_config(path: &Path) -> Result<()> {
    Settings::write_default_config(path)
}
