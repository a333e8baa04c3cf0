use std::fs::File;
use std::path::Path;

use thiserror::Error;

use crate::SolverParams;

#[derive(Error, Debug)]
pub enum LoadConfigError {
    #[error("IO")]
    IO(#[from] std::io::Error),
    #[error("Parse")]
    Parse(#[from] ron::error::SpannedError),
}

/// Read contact solver parameters from a RON file.
///
/// Fields missing from the file keep their default values.
pub fn load_solver_params(
    path: impl AsRef<Path>,
) -> std::result::Result<SolverParams, LoadConfigError> {
    let f = File::open(path.as_ref())?;
    Ok(ron::de::from_reader(f)?)
}
