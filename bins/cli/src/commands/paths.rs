//! `encode-path` and `decode-path`: bundle key conversion.

use crate::CliOutput;
use crate::error::{CliError, ExitCode};
use crate::format::{OutputMode, pretty_json_line};
use bundle_sync_domain::{bundle_path, decode_path, encode_path};
use bundle_sync_infra::ErrorEnvelope;
use std::path::Path;

/// Encode `path` as a bundle key.
///
/// Without `root`, `path` is taken as an already relative `/`-separated path.
/// With `root`, relative paths are joined to it and the result must stay inside.
pub fn run_encode_path(
    mode: OutputMode,
    path: &str,
    root: Option<&Path>,
) -> Result<CliOutput, CliError> {
    let encoded = match root {
        Some(root) => bundle_path(root, &root.join(path)).map_err(ErrorEnvelope::from)?,
        None => encode_path(path),
    };
    render(mode, path, &encoded, "encoded")
}

/// Decode a bundle key back to its relative path.
pub fn run_decode_path(mode: OutputMode, encoded: &str) -> Result<CliOutput, CliError> {
    let decoded = decode_path(encoded).map_err(ErrorEnvelope::from)?;
    render(mode, encoded, &decoded, "decoded")
}

fn render(
    mode: OutputMode,
    input: &str,
    output: &str,
    field: &str,
) -> Result<CliOutput, CliError> {
    let stdout = if mode.is_json() {
        let mut payload = serde_json::Map::new();
        payload.insert("input".to_owned(), serde_json::Value::from(input));
        payload.insert(field.to_owned(), serde_json::Value::from(output));
        pretty_json_line(&serde_json::Value::Object(payload))?
    } else {
        format!("{output}\n")
    };
    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{OutputArgs, OutputFormat};

    fn text_mode() -> OutputMode {
        OutputMode::from_args(&OutputArgs {
            output: Some(OutputFormat::Text),
            json: false,
        })
    }

    #[test]
    fn encodes_relative_path() -> Result<(), CliError> {
        let output = run_encode_path(text_mode(), "src/my file.java", None)?;
        assert_eq!(output.stdout, "src/my%20file.java\n");
        Ok(())
    }

    #[test]
    fn encodes_against_root() -> Result<(), CliError> {
        let output = run_encode_path(text_mode(), "sub dir/B.java", Some(Path::new("/repo")))?;
        assert_eq!(output.stdout, "sub%20dir/B.java\n");
        Ok(())
    }

    #[test]
    fn escaping_the_root_is_invalid_input() {
        let error = run_encode_path(text_mode(), "../other.java", Some(Path::new("/repo"))).err();
        assert_eq!(
            error.map(|error| error.exit_code()),
            Some(ExitCode::InvalidInput)
        );
    }

    #[test]
    fn malformed_escape_is_invalid_input() {
        let error = run_decode_path(text_mode(), "src/a%2").err();
        assert_eq!(
            error.map(|error| error.exit_code()),
            Some(ExitCode::InvalidInput)
        );
    }

    #[test]
    fn json_decode_names_the_field() -> Result<(), Box<dyn std::error::Error>> {
        let mode = OutputMode::from_args(&OutputArgs {
            output: None,
            json: true,
        });
        let output = run_decode_path(mode, "sub%20dir/B.java")?;
        let value: serde_json::Value = serde_json::from_str(&output.stdout)?;
        assert_eq!(value["decoded"], "sub dir/B.java");
        assert_eq!(value["input"], "sub%20dir/B.java");
        Ok(())
    }
}
