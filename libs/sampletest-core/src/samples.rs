//! Sample discovery: pair `<id>.in*` input files with a sibling `.ans` or
//! `.out` answer, sorted lexicographically by id. The rest of the crate
//! treats the result purely as an ordered sequence.

use std::path::{Path, PathBuf};

use crate::error::CoreError;

/// One input/answer pair. The answer is absent for ad hoc runs where no
/// correctness check is possible; the driver then only shows the output.
#[derive(Debug, Clone)]
pub struct Sample {
    pub id: String,
    pub input: PathBuf,
    pub answer: Option<PathBuf>,
}

/// List a sample directory.
///
/// A missing directory or a directory without any `.in*` file is the
/// recoverable `SamplesNotFound` condition; every other I/O failure
/// propagates as-is.
pub fn discover(dir: &Path) -> Result<Vec<Sample>, CoreError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CoreError::SamplesNotFound(dir.to_path_buf()));
        }
        Err(e) => return Err(CoreError::Io(e)),
    };

    let mut samples = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if !ext.starts_with("in") || !path.is_file() {
            continue;
        }
        let Some(id) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };

        let answer = ["ans", "out"]
            .iter()
            .map(|answer_ext| path.with_extension(answer_ext))
            .find(|candidate| candidate.is_file());

        samples.push(Sample {
            id,
            input: path,
            answer,
        });
    }

    if samples.is_empty() {
        return Err(CoreError::SamplesNotFound(dir.to_path_buf()));
    }

    samples.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(samples)
}
