//! Name and nonce generation for jobs and recipes.

use chrono::{DateTime, Utc};

/// Generate a batch job name: `<prefix>-<YYYYMMDDhhmmss>`.
pub fn batch_job_name(prefix: &str, at: DateTime<Utc>) -> String {
    format!("{}-{}", prefix, at.format("%Y%m%d%H%M%S"))
}

/// Generate a single-processor job name: `job-<8-hex-nonce>`.
pub fn single_job_name() -> String {
    format!("job-{}", nanoid::nanoid!(8, &HEX_ALPHABET))
}

/// Generate a unique output filename: `output_<32-hex>.bin`.
pub fn unique_output_filename() -> String {
    format!("output_{}.bin", nanoid::nanoid!(32, &HEX_ALPHABET))
}

const HEX_ALPHABET: [char; 16] =
    ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f'];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_name_is_formatted() {
        let at = DateTime::parse_from_rfc3339("2026-07-31T12:00:00Z").unwrap().to_utc();
        assert_eq!(batch_job_name("archive", at), "archive-20260731120000");
    }

    #[test]
    fn single_job_names_are_unique_and_well_formed() {
        let a = single_job_name();
        let b = single_job_name();
        assert_ne!(a, b);
        assert!(a.starts_with("job-"));
        assert_eq!(a.len(), "job-".len() + 8);
    }

    #[test]
    fn output_filenames_are_unique() {
        let a = unique_output_filename();
        let b = unique_output_filename();
        assert_ne!(a, b);
        assert!(a.starts_with("output_"));
        assert!(a.ends_with(".bin"));
    }
}
