//! Get-dataset command - locate the newest audit export.

use std::path::PathBuf;

use rbac_allowlist::Allowlist;

use super::Context;

pub fn run(
    context: &Context,
    dir: Option<PathBuf>,
    prefix: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = context.load_config()?;
    if let Some(dir) = dir {
        config = config.with_dataset_dir(dir);
    }
    if let Some(prefix) = prefix {
        config = config.with_filename_pattern(prefix);
    }

    let path = Allowlist::new(config).get_dataset()?;
    println!("{}", path.display());
    Ok(())
}
