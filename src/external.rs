//! High-fidelity converters backed by external programs.
//!
//! Each converter is probed once when it is constructed; an engine only ever
//! holds converters whose program could be started.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::error::ConverterError;

/// Turns a complete HTML document into `.docx` bytes.
pub trait ExternalConverter: Send + Sync {
    fn name(&self) -> &str;

    fn convert(&self, html: &str) -> Result<Vec<u8>, ConverterError>;
}

fn program_runs(program: &str, probe_arg: &str) -> bool {
    Command::new(program)
        .arg(probe_arg)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn stderr_summary(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    line.trim().chars().take(200).collect()
}

/// `pandoc -f html -t docx -o -`, HTML on stdin.
#[derive(Debug, Clone)]
pub struct PandocConverter {
    program: String,
}

impl PandocConverter {
    pub const NAME: &'static str = "pandoc";

    pub fn detect() -> Option<Self> {
        Self::with_program("pandoc")
    }

    pub fn with_program(program: impl Into<String>) -> Option<Self> {
        let program = program.into();
        program_runs(&program, "--version").then_some(Self { program })
    }
}

impl ExternalConverter for PandocConverter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn convert(&self, html: &str) -> Result<Vec<u8>, ConverterError> {
        let mut child = Command::new(&self.program)
            .args(["-f", "html", "-t", "docx", "-o", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ConverterError::unavailable(Self::NAME, e.to_string()))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ConverterError::failed(Self::NAME, "stdin not captured"))?;
        let input = html.to_string();
        // Written from another thread so a full stdout pipe cannot stall us.
        let writer = std::thread::spawn(move || stdin.write_all(input.as_bytes()));

        let output = child
            .wait_with_output()
            .map_err(|e| ConverterError::failed(Self::NAME, e.to_string()))?;
        match writer.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(ConverterError::failed(Self::NAME, format!("write stdin: {e}"))),
            Err(_) => return Err(ConverterError::failed(Self::NAME, "stdin writer panicked")),
        }

        if !output.status.success() {
            return Err(ConverterError::failed(
                Self::NAME,
                format!("{}: {}", output.status, stderr_summary(&output.stderr)),
            ));
        }
        Ok(output.stdout)
    }
}

/// `soffice --headless --convert-to docx` inside a scratch directory.
#[derive(Debug, Clone)]
pub struct LibreOfficeConverter {
    program: String,
}

impl LibreOfficeConverter {
    pub const NAME: &'static str = "libreoffice";

    pub fn detect() -> Option<Self> {
        Self::with_program("soffice").or_else(|| Self::with_program("libreoffice"))
    }

    pub fn with_program(program: impl Into<String>) -> Option<Self> {
        let program = program.into();
        program_runs(&program, "--version").then_some(Self { program })
    }
}

impl ExternalConverter for LibreOfficeConverter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn convert(&self, html: &str) -> Result<Vec<u8>, ConverterError> {
        let dir = tempfile::tempdir()
            .map_err(|e| ConverterError::failed(Self::NAME, format!("tempdir: {e}")))?;
        let input: PathBuf = dir.path().join("input.html");
        std::fs::write(&input, html)
            .map_err(|e| ConverterError::failed(Self::NAME, format!("write input: {e}")))?;

        let output = Command::new(&self.program)
            .arg("--headless")
            .arg("--convert-to")
            .arg("docx:MS Word 2007 XML")
            .arg("--outdir")
            .arg(dir.path())
            .arg(&input)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ConverterError::unavailable(Self::NAME, e.to_string()))?;

        if !output.status.success() {
            return Err(ConverterError::failed(
                Self::NAME,
                format!("{}: {}", output.status, stderr_summary(&output.stderr)),
            ));
        }

        let produced = dir.path().join("input.docx");
        std::fs::read(&produced).map_err(|e| {
            ConverterError::failed(Self::NAME, format!("read {}: {e}", produced.display()))
        })
    }
}

/// Converters whose programs are installed, highest fidelity first.
pub fn detect_available() -> Vec<Box<dyn ExternalConverter>> {
    let mut out: Vec<Box<dyn ExternalConverter>> = Vec::new();
    if let Some(c) = PandocConverter::detect() {
        out.push(Box::new(c));
    }
    if let Some(c) = LibreOfficeConverter::detect() {
        out.push(Box::new(c));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const MISSING: &str = "docx-engine-test-no-such-program";

    #[test]
    fn missing_programs_are_not_detected() {
        assert!(PandocConverter::with_program(MISSING).is_none());
        assert!(LibreOfficeConverter::with_program(MISSING).is_none());
    }

    #[test]
    fn converting_with_a_vanished_program_reports_unavailable() {
        let pandoc = PandocConverter {
            program: MISSING.to_string(),
        };
        assert!(matches!(
            pandoc.convert("<p>x</p>"),
            Err(ConverterError::Unavailable { .. })
        ));
    }

    #[test]
    fn stderr_summary_takes_first_line() {
        assert_eq!(stderr_summary(b"\n  boom happened \nmore"), "boom happened");
    }
}
