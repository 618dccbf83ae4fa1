//! Replays a captured graph event stream, one raw chunk per line, and
//! writes the progress after every chunk as a JSON line.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Parser;
use futures::Stream;
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use trellis_core::config::{DEFAULT_FINISHED_TEXT, RepairStrategy, StreamConfig};
use trellis_core::error::{Result, TrellisError};
use trellis_core::registry::NodeRegistry;
use trellis_progress::observer::{GraphStream, IngestReport};
use trellis_progress::snapshot::ProgressSnapshot;

#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(
    name = "trellis-replay",
    about = "Replay a captured graph event stream and print progress per chunk"
)]
pub struct ReplayArgs {
    /// Node registry document (`.json`, otherwise YAML)
    pub registry: PathBuf,

    /// Captured stream, one raw chunk per line; `-` or absent reads stdin
    pub input: Option<PathBuf>,

    /// How concatenated event objects are repaired: pattern, brace_depth or auto
    #[arg(long, default_value_t = RepairStrategy::default())]
    pub repair: RepairStrategy,

    /// Status text shown once the top-level node ends
    #[arg(long, default_value = DEFAULT_FINISHED_TEXT)]
    pub finished_text: String,
}

impl ReplayArgs {
    /// Arguments for replaying `input` (stdin when `None`) with defaults.
    pub fn new(registry: impl Into<PathBuf>, input: Option<PathBuf>) -> Self {
        Self {
            registry: registry.into(),
            input,
            repair: RepairStrategy::default(),
            finished_text: DEFAULT_FINISHED_TEXT.to_string(),
        }
    }

    pub fn config(&self) -> StreamConfig {
        StreamConfig::new()
            .with_repair(self.repair)
            .with_finished_text(self.finished_text.clone())
    }

    /// The capture file to read, or `None` for stdin.
    pub fn input_path(&self) -> Option<&Path> {
        self.input.as_deref().filter(|p| *p != Path::new("-"))
    }
}

/// Load a node registry, choosing the format by file extension.
pub fn load_registry(path: &Path) -> Result<NodeRegistry> {
    let text = std::fs::read_to_string(path)?;
    let registry = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => NodeRegistry::from_json_str(&text)?,
        _ => NodeRegistry::from_yaml_str(&text)?,
    };
    tracing::info!(path = %path.display(), nodes = registry.len(), "loaded node registry");
    Ok(registry)
}

/// Raw chunks from a line-oriented capture. Blank lines are skipped.
pub fn chunk_stream<R>(reader: R) -> impl Stream<Item = String> + Send
where
    R: AsyncBufRead + Unpin + Send,
{
    async_stream::stream! {
        let mut lines = reader.lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if !line.trim().is_empty() {
                        yield line;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "stopped reading stream capture");
                    break;
                }
            }
        }
    }
}

/// One output line of a replay.
#[derive(Debug, Serialize)]
pub struct ReplayLine<'a> {
    pub chunk: usize,
    #[serde(flatten)]
    pub report: IngestReport,
    pub snapshot: &'a ProgressSnapshot,
}

/// Ingest every chunk of `chunks` and write one JSON line per chunk to `out`.
///
/// Returns the number of chunks replayed.
pub async fn replay<S, W>(
    chunks: S,
    registry: &NodeRegistry,
    config: StreamConfig,
    out: &mut W,
) -> Result<usize>
where
    S: Stream<Item = String>,
    W: Write,
{
    let mut stream = GraphStream::with_config(config);
    let count = stream
        .drive_with(chunks, registry, |chunk, report, snapshot| {
            let line = ReplayLine {
                chunk,
                report,
                snapshot,
            };
            serde_json::to_writer(&mut *out, &line)?;
            writeln!(out)?;
            Ok::<_, TrellisError>(())
        })
        .await?;

    out.flush()?;
    Ok(count)
}

/// Run a replay as described by `args`, writing to `out`.
pub async fn run<W: Write>(args: ReplayArgs, out: &mut W) -> Result<usize> {
    let registry = load_registry(&args.registry)?;
    let config = args.config();
    let count = match args.input_path() {
        Some(path) => {
            let file = tokio::fs::File::open(path).await?;
            let reader = tokio::io::BufReader::new(file);
            replay(chunk_stream(reader), &registry, config, out).await?
        }
        None => {
            let reader = tokio::io::BufReader::new(tokio::io::stdin());
            replay(chunk_stream(reader), &registry, config, out).await?
        }
    };
    tracing::info!(chunks = count, "replay finished");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn args(list: &[&str]) -> std::result::Result<ReplayArgs, clap::Error> {
        ReplayArgs::try_parse_from(std::iter::once("trellis-replay").chain(list.iter().copied()))
    }

    #[test]
    fn parse_registry_only_reads_stdin() {
        let parsed = args(&["nodes.yaml"]).unwrap();
        assert_eq!(parsed, ReplayArgs::new("nodes.yaml", None));
        assert!(parsed.input_path().is_none());
        assert_eq!(parsed.config(), StreamConfig::default());
    }

    #[test]
    fn parse_dash_means_stdin() {
        let parsed = args(&["nodes.yaml", "-"]).unwrap();
        assert_eq!(parsed.input, Some(PathBuf::from("-")));
        assert!(parsed.input_path().is_none());
    }

    #[test]
    fn parse_options() {
        let parsed = args(&[
            "--repair",
            "brace_depth",
            "nodes.json",
            "capture.log",
            "--finished-text",
            "Done",
        ])
        .unwrap();
        assert_eq!(parsed.input_path(), Some(Path::new("capture.log")));
        let config = parsed.config();
        assert_eq!(config.repair, RepairStrategy::BraceDepth);
        assert_eq!(config.finished_text, "Done");
    }

    #[test]
    fn parse_equals_form() {
        let parsed = args(&["--repair=pattern", "n.yaml", "--finished-text=Done"]).unwrap();
        assert_eq!(parsed.repair, RepairStrategy::Pattern);
        assert_eq!(parsed.finished_text, "Done");
    }

    #[test]
    fn parse_help_is_displayed() {
        let err = args(&["--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
        assert!(err.to_string().contains("--repair"));
    }

    #[test]
    fn parse_errors() {
        use clap::error::ErrorKind;

        assert_eq!(args(&[]).unwrap_err().kind(), ErrorKind::MissingRequiredArgument);
        assert_eq!(args(&["a", "b", "c"]).unwrap_err().kind(), ErrorKind::UnknownArgument);
        assert!(args(&["a", "--repair"]).is_err());
        assert_eq!(
            args(&["a", "--repair", "fuzzy"]).unwrap_err().kind(),
            ErrorKind::ValueValidation
        );
        assert_eq!(args(&["a", "--verbose"]).unwrap_err().kind(), ErrorKind::UnknownArgument);
    }

    #[tokio::test]
    async fn chunk_stream_skips_blank_lines() {
        let input: &[u8] = b"{\"a\":1}\n\n  \n{\"b\":2}";
        let chunks: Vec<String> = chunk_stream(input).collect().await;
        assert_eq!(chunks, vec!["{\"a\":1}", "{\"b\":2}"]);
    }
}
