//! Reading markup through the `pandoc` executable.
use std::{
    io::Write,
    path::PathBuf,
    process::{Command, Stdio},
};

use knit_stitch::{Block, Document, Error, Reader};

pub(crate) const PANDOC: &str = "pandoc";

/// Runs `pandoc -f FORMAT -t json` and returns the blocks it produced.
#[derive(Clone, Debug)]
pub(crate) struct PandocReader {
    executable: Option<PathBuf>,
}

impl PandocReader {
    /// Locate `pandoc` with `locate_executable`. A missing executable only
    /// fails the chunks that actually need a reader.
    pub(crate) fn new(locate_executable: impl Fn(&str) -> Option<PathBuf>) -> Self {
        let executable = locate_executable(PANDOC);
        match &executable {
            Some(path) => tracing::debug!(path = %path.display(), "found pandoc"),
            None => tracing::warn!("pandoc not found, markup output cannot be read"),
        }
        Self { executable }
    }

    fn arguments<'a>(format: &'a str, extra_args: &'a [String]) -> Vec<&'a str> {
        let mut arguments = vec!["-f", format, "-t", "json"];
        arguments.extend(extra_args.iter().map(String::as_str));
        arguments
    }
}

impl Reader for PandocReader {
    #[tracing::instrument(skip(self, source), fields(bytes = source.len()))]
    fn read_blocks(&self, source: &str, format: &str, extra_args: &[String]) -> Result<Vec<Block>, Error> {
        let executable = self
            .executable
            .as_ref()
            .ok_or_else(|| Error::Reader(format!("`{PANDOC}` is not on PATH")))?;
        let mut child = Command::new(executable)
            .args(Self::arguments(format, extra_args))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Reader("cannot write to pandoc".to_string()))?;
        let input = source.to_string();
        let writer = std::thread::spawn(move || stdin.write_all(input.as_bytes()));

        let output = child.wait_with_output()?;
        writer
            .join()
            .map_err(|_| Error::Reader("pandoc input thread panicked".to_string()))??;
        if !output.status.success() {
            return Err(Error::Reader(format!(
                "pandoc exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        let document: Document = serde_json::from_slice(&output.stdout)?;
        Ok(document.blocks)
    }
}
