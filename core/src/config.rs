//! Execution limits and switches for `ExecContext`.

use anyhow::{Context, Result};
use serde::Deserialize;

pub const DEFAULT_MAX_STACK: usize = 65_536;
pub const DEFAULT_MAX_FRAMES: usize = 4_096;

/// Limits applied by the VM. Exceeding either limit is a fatal halt.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    /// Operand stack capacity, in values.
    pub max_stack: usize,
    /// Maximum call depth.
    pub max_frames: usize,
    /// Emit a `trace!` event for every executed instruction.
    pub trace_ops: bool,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            max_stack: DEFAULT_MAX_STACK,
            max_frames: DEFAULT_MAX_FRAMES,
            trace_ops: false,
        }
    }
}

impl ExecConfig {
    /// Parse a TOML table such as:
    ///
    /// ```toml
    /// max_stack = 1024
    /// trace_ops = true
    /// ```
    ///
    /// Missing keys keep their defaults; zero limits are replaced by the defaults.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let mut cfg: ExecConfig = toml::from_str(input).context("invalid exec config")?;
        if cfg.max_stack == 0 {
            cfg.max_stack = DEFAULT_MAX_STACK;
        }
        if cfg.max_frames == 0 {
            cfg.max_frames = DEFAULT_MAX_FRAMES;
        }
        Ok(cfg)
    }

    pub fn with_max_stack(mut self, max_stack: usize) -> Self {
        self.max_stack = max_stack;
        self
    }

    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = max_frames;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_uses_defaults() {
        assert_eq!(ExecConfig::from_toml_str("").unwrap(), ExecConfig::default());
    }

    #[test]
    fn partial_table_overrides() {
        let cfg = ExecConfig::from_toml_str("max_frames = 16\ntrace_ops = true\nmax_stack = 0").unwrap();
        assert_eq!(cfg.max_frames, 16);
        assert!(cfg.trace_ops);
        assert_eq!(cfg.max_stack, DEFAULT_MAX_STACK);
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(ExecConfig::from_toml_str("max_stack = \"big\"").is_err());
    }
}
