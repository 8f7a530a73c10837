use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::blocks::multi_bank::BankOrientation;
use crate::blocks::sram::{MuxRatio, SramParams};
use crate::error::Result;
use crate::tech::Tech;

fn default_subanks() -> usize {
    1
}

fn default_branch_factors() -> [usize; 2] {
    [1, 1]
}

/// The contents of an `amc.toml` file.
#[derive(Debug, Eq, PartialEq, Clone, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SramConfig {
    /// Overrides the generated macro name.
    #[serde(default)]
    pub name: Option<String>,
    pub word_size: usize,
    #[serde(default)]
    pub words_per_row: MuxRatio,
    pub num_rows: usize,
    #[serde(default = "default_subanks")]
    pub num_subanks: usize,
    /// `[outer, inner]` bank counts.
    #[serde(default = "default_branch_factors")]
    pub branch_factors: [usize; 2],
    #[serde(default)]
    pub bank_orientations: [BankOrientation; 2],
    #[serde(default)]
    pub mask: bool,
    #[serde(default)]
    pub power_gate: bool,
    /// A technology file. Relative paths are resolved against the directory
    /// holding the configuration file.
    #[serde(default)]
    pub tech: Option<PathBuf>,
}

impl SramConfig {
    /// Converts the configuration into validated generator parameters.
    pub fn params(&self) -> Result<SramParams> {
        let params = SramParams {
            name: self.name.as_deref().map(arcstr::ArcStr::from),
            word_size: self.word_size,
            words_per_row: self.words_per_row,
            num_rows: self.num_rows,
            num_subanks: self.num_subanks,
            branch_factors: (self.branch_factors[0], self.branch_factors[1]),
            bank_orientations: (self.bank_orientations[0], self.bank_orientations[1]),
            mask: self.mask,
            power_gate: self.power_gate,
        };
        params.validate()?;
        Ok(params)
    }

    /// Loads the configured technology, or the built-in one.
    pub fn tech(&self) -> Result<Tech> {
        match &self.tech {
            Some(path) => Tech::load(path),
            None => Ok(Tech::default()),
        }
    }
}

pub fn parse_sram_config(path: impl AsRef<Path>) -> Result<SramConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let mut data: SramConfig = toml::from_str(&contents)?;
    if let (Some(tech), Some(dir)) = (&data.tech, path.parent()) {
        if tech.is_relative() {
            data.tech = Some(dir.join(tech));
        }
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::error::Error;

    fn config_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_full_config() {
        let file = config_file(
            r#"
            name = "sram_test"
            word_size = 32
            words_per_row = 2
            num_rows = 128
            num_subanks = 2
            branch_factors = [2, 4]
            bank_orientations = ["V", "H"]
            mask = true
            power_gate = true
            "#,
        );
        let config = parse_sram_config(file.path()).unwrap();
        assert_eq!(config.words_per_row, MuxRatio::M2);
        assert_eq!(config.branch_factors, [2, 4]);
        assert_eq!(
            config.bank_orientations,
            [BankOrientation::V, BankOrientation::H]
        );

        let params = config.params().unwrap();
        assert_eq!(params.name().as_str(), "sram_test");
        assert_eq!(params.addr_size(), 7 + 1 + 1 + 1 + 2);
        assert_eq!(params.total_bits(), 32 * 128 * 2 * 2 * 8);
    }

    #[test]
    fn test_defaults() {
        let file = config_file("word_size = 8\nnum_rows = 16\n");
        let config = parse_sram_config(file.path()).unwrap();
        assert_eq!(config.words_per_row, MuxRatio::M1);
        assert_eq!(config.num_subanks, 1);
        assert_eq!(config.branch_factors, [1, 1]);
        assert!(!config.mask && !config.power_gate);
        assert_eq!(config.tech().unwrap(), Tech::default());
        assert_eq!(config.params().unwrap().name().as_str(), "sram_8x16_w1_b1x1");
    }

    #[test]
    fn test_rejects_bad_values() {
        let file = config_file("word_size = 8\nnum_rows = 16\nwords_per_row = 3\n");
        assert!(matches!(parse_sram_config(file.path()), Err(Error::Toml(_))));

        let file = config_file("word_size = 8\nnum_rows = 16\ncolumns = 3\n");
        assert!(matches!(parse_sram_config(file.path()), Err(Error::Toml(_))));

        let file = config_file("word_size = 8\nnum_rows = 24\n");
        let config = parse_sram_config(file.path()).unwrap();
        assert!(matches!(config.params(), Err(Error::Config { .. })));

        let file = config_file("word_size = 8\nnum_rows = 16\nbranch_factors = [8, 1]\n");
        let config = parse_sram_config(file.path()).unwrap();
        assert!(matches!(config.params(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_relative_tech_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("amc.toml");
        fs::write(&path, "word_size = 8\nnum_rows = 16\ntech = \"tech/custom.toml\"\n").unwrap();
        let config = parse_sram_config(&path).unwrap();
        assert_eq!(config.tech, Some(dir.path().join("tech/custom.toml")));
        assert!(matches!(config.tech(), Err(Error::Io(_))));
    }
}
