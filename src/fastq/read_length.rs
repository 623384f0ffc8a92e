// src/fastq/read_length.rs

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use globset::{Glob, GlobMatcher};

use crate::fs::FileSystem;

/// Number of reads sampled from the head of the first FASTQ file.
pub const READ_LENGTH_SAMPLE_SIZE: usize = 100;

/// Returned when the sampled mean falls outside every bucket.
pub const DEFAULT_READ_LENGTH: u32 = 150;

fn matcher(pattern: &str) -> Result<GlobMatcher> {
    Ok(Glob::new(pattern)
        .with_context(|| format!("invalid FASTQ glob {pattern}"))?
        .compile_matcher())
}

/// First FASTQ file in `dir` by name.
///
/// Gzipped files (`*.f*q.gz`) are preferred; plain `*.f*q` files are only
/// considered when no gzipped file exists.
pub fn find_first_fastq(fs: &dyn FileSystem, dir: &Path) -> Result<Option<PathBuf>> {
    let mut entries = fs
        .read_dir(dir)
        .with_context(|| format!("failed to list FASTQ directory {}", dir.display()))?;
    entries.sort();

    for pattern in ["*.f*q.gz", "*.f*q"] {
        let m = matcher(pattern)?;
        let found = entries.iter().find(|p| {
            p.file_name().is_some_and(|name| m.is_match(Path::new(name))) && fs.is_file(p)
        });
        if let Some(path) = found {
            return Ok(Some(path.clone()));
        }
    }

    Ok(None)
}

/// Sequence lines of the first `n` complete four-line records.
///
/// A trailing partial record is dropped.
pub fn read_first_n_sequences<R: Read>(reader: R, n: usize) -> Result<Vec<String>> {
    let mut lines = BufReader::new(reader).lines();
    let mut seqs = Vec::with_capacity(n);

    while seqs.len() < n {
        let mut record = Vec::with_capacity(4);
        for _ in 0..4 {
            match lines.next() {
                Some(line) => record.push(line.context("failed to read FASTQ line")?),
                None => break,
            }
        }
        if record.len() < 4 {
            break;
        }
        seqs.push(record.swap_remove(1));
    }

    Ok(seqs)
}

pub fn mean_length(seqs: &[String]) -> Option<f64> {
    if seqs.is_empty() {
        return None;
    }
    let total: usize = seqs.iter().map(|s| s.trim_end().len()).sum();
    Some(total as f64 / seqs.len() as f64)
}

/// Round a mean read length up to a nominal sequencing read length.
///
/// Bounds are exclusive: a mean of exactly 100 or 150 falls through to the
/// default. A 250 bucket is not produced because its range would overlap the
/// 200 bucket.
pub fn bucket_read_length(mean: f64) -> u32 {
    if mean > 50.0 && mean < 100.0 {
        100
    } else if mean > 100.0 && mean < 150.0 {
        150
    } else if mean > 150.0 && mean < 200.0 {
        200
    } else {
        DEFAULT_READ_LENGTH
    }
}

/// Estimate the nominal read length of the FASTQ files in `dir`.
///
/// Returns `Ok(None)` when the directory holds no FASTQ file at all.
pub fn sample_read_length(fs: &dyn FileSystem, dir: &Path) -> Result<Option<u32>> {
    let Some(path) = find_first_fastq(fs, dir)? else {
        return Ok(None);
    };

    let reader = fs.open_read(&path)?;
    let sampled = if path.extension().is_some_and(|ext| ext == "gz") {
        read_first_n_sequences(MultiGzDecoder::new(reader), READ_LENGTH_SAMPLE_SIZE)
    } else {
        read_first_n_sequences(reader, READ_LENGTH_SAMPLE_SIZE)
    };
    let seqs = sampled.with_context(|| format!("failed to sample reads from {}", path.display()))?;

    Ok(Some(
        mean_length(&seqs).map_or(DEFAULT_READ_LENGTH, bucket_read_length),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn fastq(read_len: usize, reads: usize) -> String {
        let mut out = String::new();
        for i in 0..reads {
            out.push_str(&format!(
                "@read{i}\n{}\n+\n{}\n",
                "A".repeat(read_len),
                "I".repeat(read_len)
            ));
        }
        out
    }

    #[test]
    fn buckets_use_exclusive_bounds() {
        assert_eq!(bucket_read_length(75.0), 100);
        assert_eq!(bucket_read_length(100.0), DEFAULT_READ_LENGTH);
        assert_eq!(bucket_read_length(149.5), 150);
        assert_eq!(bucket_read_length(151.0), 200);
        assert_eq!(bucket_read_length(251.0), DEFAULT_READ_LENGTH);
        assert_eq!(bucket_read_length(30.0), DEFAULT_READ_LENGTH);
    }

    #[test]
    fn only_complete_records_are_sampled() {
        let mut data = fastq(10, 2);
        data.push_str("@partial\nACGT\n");
        let seqs = read_first_n_sequences(data.as_bytes(), 10).unwrap();
        assert_eq!(seqs.len(), 2);
    }

    #[test]
    fn sampling_stops_after_n_records() {
        let data = fastq(10, 300);
        let seqs = read_first_n_sequences(data.as_bytes(), READ_LENGTH_SAMPLE_SIZE).unwrap();
        assert_eq!(seqs.len(), READ_LENGTH_SAMPLE_SIZE);
    }

    #[test]
    fn plain_fastq_is_used_when_no_gzip_exists() {
        let fs = MockFileSystem::new();
        fs.add_file("/fq/run/S1_R2.fastq", fastq(76, 5));
        fs.add_file("/fq/run/S1_R1.fastq", fastq(76, 5));
        fs.add_file("/fq/run/notes.txt", "x");

        let first = find_first_fastq(&fs, Path::new("/fq/run")).unwrap();
        assert_eq!(first, Some(PathBuf::from("/fq/run/S1_R1.fastq")));
        assert_eq!(
            sample_read_length(&fs, Path::new("/fq/run")).unwrap(),
            Some(100)
        );
    }

    #[test]
    fn no_fastq_yields_none() {
        let fs = MockFileSystem::new();
        fs.add_file("/fq/run/symlinks_complete.json", "{}");
        assert_eq!(sample_read_length(&fs, Path::new("/fq/run")).unwrap(), None);
    }
}
