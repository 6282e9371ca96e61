use proteus_core::TrainingConfig;

/// Linear warm-up of the KL weight
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BetaSchedule {
    pub beta_final: f64,
    pub warmup_epochs: usize,
}

impl BetaSchedule {
    pub fn new(beta_final: f64, warmup_epochs: usize) -> Self {
        Self {
            beta_final,
            warmup_epochs,
        }
    }

    /// KL weight for a 1-based `epoch`
    pub fn beta(&self, epoch: usize) -> f64 {
        if self.warmup_epochs > 0 && epoch <= self.warmup_epochs {
            self.beta_final * epoch as f64 / self.warmup_epochs as f64
        } else {
            self.beta_final
        }
    }
}

impl From<&TrainingConfig> for BetaSchedule {
    fn from(config: &TrainingConfig) -> Self {
        Self::new(config.beta_final, config.beta_warmup_epochs)
    }
}
