//! `config print`: show the effective config.

use crate::CliOutput;
use crate::error::{CliError, ExitCode};
use bundle_sync_infra::{ConfigOutputFormat, render_effective_config, validate_env_parsing};
use std::collections::BTreeMap;
use std::path::Path;

pub fn run_config_print(
    env: &BTreeMap<String, String>,
    config_path: Option<&Path>,
    format: ConfigOutputFormat,
) -> Result<CliOutput, CliError> {
    validate_env_parsing(env)?;
    let stdout = render_effective_config(env, config_path, None, format)?;
    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_env_value_is_invalid_input() {
        let env = BTreeMap::from([(
            "BUNDLE_SYNC_RETRY_MAX_ATTEMPTS".to_owned(),
            "many".to_owned(),
        )]);
        let error = run_config_print(&env, None, ConfigOutputFormat::Json).err();
        assert_eq!(
            error.map(|error| error.exit_code()),
            Some(ExitCode::InvalidInput)
        );
    }

    #[test]
    fn missing_config_file_is_io() {
        let missing = Path::new(env!("CARGO_MANIFEST_DIR")).join("missing-config.toml");
        let error = run_config_print(&BTreeMap::new(), Some(&missing), ConfigOutputFormat::Toml)
            .err();
        assert_eq!(error.map(|error| error.exit_code()), Some(ExitCode::Io));
    }
}
