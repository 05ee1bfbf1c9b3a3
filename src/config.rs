use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::Deserialize;

use crate::generator::DEFAULT_FILE_PREFIX;

pub const CONFIG_FILE_NAME: &str = "noc-generator.toml";
pub const CONFIG_ENV_VAR: &str = "NOC_GENERATOR_CONFIG";
pub const DEFAULT_TEMPLATE: &str = "NDA-1.docx";
pub const DEFAULT_OUTPUT_DIR: &str = "generated_noc";

const DEFAULT_CONFIG_TOML: &str = r#"# noc-generator settings. Relative paths resolve against this file's directory.

[generator]
# DOCX template containing the "Full Name:", "Job Title:" and "Department:" labels.
template = "NDA-1.docx"

# Where generated documents are written (created when missing).
output_dir = "generated_noc"

# Output files are named <file_prefix><sanitized full name>.docx
file_prefix = "NOC_"
"#;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub generator: GeneratorSection,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct GeneratorSection {
    #[serde(default)]
    pub template: Option<PathBuf>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

/// Settings after merging CLI overrides, the config file and defaults.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub config_path: Option<PathBuf>,
    pub template: PathBuf,
    pub output_dir: PathBuf,
    pub file_prefix: String,
}

/// CLI-level overrides; `None` defers to the config file.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub template: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub file_prefix: Option<String>,
}

impl ResolvedConfig {
    pub fn resolve(overrides: Overrides) -> anyhow::Result<Self> {
        let cfg_file = match overrides.config {
            Some(p) => {
                if !p.exists() {
                    return Err(anyhow!("config file not found: {}", p.display()));
                }
                Some(p)
            }
            None => std::env::var(CONFIG_ENV_VAR)
                .ok()
                .map(PathBuf::from)
                .filter(|p| p.exists())
                .or_else(|| find_default_config(CONFIG_FILE_NAME)),
        };

        let file_cfg = match cfg_file.as_ref() {
            Some(p) => load_config(p)?,
            None => AppConfig::default(),
        };
        Ok(Self::merge(cfg_file, file_cfg, overrides.template, overrides.output_dir, overrides.file_prefix))
    }

    fn merge(
        config_path: Option<PathBuf>,
        file_cfg: AppConfig,
        template: Option<PathBuf>,
        output_dir: Option<PathBuf>,
        file_prefix: Option<String>,
    ) -> Self {
        let config_dir = config_path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf);
        let from_file = |p: Option<PathBuf>| -> Option<PathBuf> {
            let p = p?;
            match config_dir.as_ref() {
                Some(dir) if p.is_relative() => Some(dir.join(p)),
                _ => Some(p),
            }
        };

        let section = file_cfg.generator;
        let template = template
            .or_else(|| from_file(section.template))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATE));
        let output_dir = output_dir
            .or_else(|| from_file(section.output_dir))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
        let file_prefix = file_prefix
            .or(section.file_prefix)
            .unwrap_or_else(|| DEFAULT_FILE_PREFIX.to_string());

        Self {
            config_path,
            template,
            output_dir,
            file_prefix,
        }
    }
}

pub fn find_file_upwards(start_dir: &Path, filename: &str, max_levels: usize) -> Option<PathBuf> {
    let mut dir = start_dir;
    for _ in 0..=max_levels {
        let candidate = dir.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
    None
}

/// Searches upwards from the current directory, then from the executable's
/// directory.
pub fn find_default_config(filename: &str) -> Option<PathBuf> {
    if let Ok(cwd) = std::env::current_dir() {
        if let Some(p) = find_file_upwards(&cwd, filename, 8) {
            return Some(p);
        }
    }
    let exe = std::env::current_exe().ok()?;
    find_file_upwards(exe.parent()?, filename, 4)
}

pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    parse_config(&text).with_context(|| format!("parse config: {}", path.display()))
}

pub fn parse_config(text: &str) -> anyhow::Result<AppConfig> {
    toml::from_str(text).context("parse config toml")
}

/// Writes the default config into `dir`; refuses to overwrite unless `force`.
pub fn init_default_config(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("create dir: {}", dir.display()))?;
    let path = dir.join(CONFIG_FILE_NAME);
    if path.exists() && !force {
        return Err(anyhow!(
            "config already exists: {} (use --force to overwrite)",
            path.display()
        ));
    }
    std::fs::write(&path, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("write config: {}", path.display()))?;
    Ok(path)
}
