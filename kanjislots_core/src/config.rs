use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SlotError};
use crate::patterns::DetectionRules;
use crate::paytable::Paytable;
use crate::symbols::SymbolCatalog;
use crate::timing::TimingConfig;

/// Everything that shapes a machine. The default is the original 6x4 kanji
/// cabinet: 10 credits a spin, 100 to start, lines of four or more.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    pub width: usize,
    pub height: usize,
    pub spin_cost: u64,
    pub starting_credits: u64,
    pub rules: DetectionRules,
    pub symbols: SymbolCatalog,
    pub paytable: Paytable,
    pub timing: TimingConfig,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            width: 6,
            height: 4,
            spin_cost: 10,
            starting_credits: 100,
            rules: DetectionRules::default(),
            symbols: SymbolCatalog::reference(),
            paytable: Paytable::reference(),
            timing: TimingConfig::normal(),
        }
    }
}

impl MachineConfig {
    pub fn cells(&self) -> usize {
        self.width * self.height
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(SlotError::invalid(format!(
                "board must be at least 1x1, got {}x{}",
                self.width, self.height
            )));
        }
        if self.rules.min_line < 2 {
            return Err(SlotError::invalid("min_line must be at least 2"));
        }
        if self.spin_cost == 0 {
            return Err(SlotError::invalid("spin_cost must be positive"));
        }
        if self.symbols.is_empty() {
            return Err(SlotError::invalid("symbol catalog is empty"));
        }
        self.timing.validate()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| SlotError::invalid(format!("config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SlotError::invalid(format!("reading {}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| SlotError::invalid(e.to_string()))
    }
}
