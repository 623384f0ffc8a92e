// src/fastq/mod.rs

//! FASTQ helpers used when a pipeline asks for a read-length estimate.

pub mod read_length;

pub use read_length::{
    bucket_read_length, find_first_fastq, mean_length, read_first_n_sequences,
    sample_read_length, DEFAULT_READ_LENGTH, READ_LENGTH_SAMPLE_SIZE,
};
