//! Job Builder: pure, deterministic rendering of a
//! `JobManifest` from a recipe, a worklist, and injected time/id sources.
//! Never touches the cluster, the catalog, or wall-clock time directly.
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod archive;
mod converter;
mod single;

pub use archive::{render_archive_batch, ArchiveWorkItem, BatchOptions};
pub use converter::{render_converter_batch, ConverterWorkItem};
pub use single::{render_single_processor, SingleOptions};

const DEFAULT_PARALLELISM: u32 = 4;
const BATCH_BACKOFF_LIMIT: i32 = 3;
const SINGLE_BACKOFF_LIMIT: i32 = 0;
const TTL_AFTER_FINISHED_S: i32 = 2 * 60 * 60;

/// Clamp a caller-specified parallelism cap to `[1, worklist_len]`, default
/// to `DEFAULT_PARALLELISM` when unspecified.
fn effective_parallelism(requested: Option<u32>, worklist_len: usize) -> i32 {
    let cap = requested.unwrap_or(DEFAULT_PARALLELISM).max(1);
    cap.min(worklist_len.max(1) as u32) as i32
}

/// Single-quote `value` for embedding in a POSIX shell command, escaping any
/// embedded single quotes so the result is always one shell word regardless
/// of what `value` contains.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Render a batch of per-item shell scripts as one driver script that runs
/// them with real bounded concurrency: each item body is written verbatim
/// into a quoted heredoc (so it is never re-interpreted by the shell that
/// assembles the driver), then `xargs -P` fans the resulting files out to at
/// most `parallelism` workers at a time.
fn render_batch_script(item_scripts: &[String], parallelism: i32) -> String {
    let mut out = String::from("set -e\ntmp_dir=$(mktemp -d)\n");
    for (i, script) in item_scripts.iter().enumerate() {
        out.push_str(&format!("cat > \"$tmp_dir/{i}.sh\" <<'ITEM_EOF_{i}'\n{script}\nITEM_EOF_{i}\n"));
    }
    out.push_str(&format!("ls \"$tmp_dir\" | xargs -P {parallelism} -I{{}} sh \"$tmp_dir/{{}}\"\n"));
    out.push_str("rm -rf \"$tmp_dir\"\n");
    out
}
