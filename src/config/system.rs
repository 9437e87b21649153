//! Runtime configuration of the simulated rank

use crate::config::SCRATCH_CAPACITY_BYTES;
use crate::config_error;
use crate::error::PimResult;

/// Properties of the simulated processing-in-memory rank
#[derive(Debug, Clone)]
pub struct SystemConfig {
    /// Units the rank can grant to one allocation
    pub available_units: usize,

    /// Clock used to convert elapsed time into cycles
    pub clock_hz: u64,

    /// Scratch (WRAM) bytes per unit
    pub scratch_capacity: usize,

    /// Bulk (MRAM) bytes per unit
    pub bulk_capacity: usize,

    /// Run units concurrently on the rayon pool instead of one after another
    pub parallel_units: bool,
}

impl Default for SystemConfig {
    fn default() -> Self {
        SystemConfig {
            available_units: 2560,
            clock_hz: 350_000_000,
            scratch_capacity: SCRATCH_CAPACITY_BYTES,
            bulk_capacity: 64 * 1024 * 1024,
            parallel_units: true,
        }
    }
}

impl SystemConfig {
    /// Create a new system config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of units the rank can grant
    pub fn with_available_units(mut self, available_units: usize) -> Self {
        self.available_units = available_units;
        self
    }

    /// Set the cycle-accounting clock
    pub fn with_clock_hz(mut self, clock_hz: u64) -> Self {
        self.clock_hz = clock_hz;
        self
    }

    /// Set scratch capacity per unit
    pub fn with_scratch_capacity(mut self, scratch_capacity: usize) -> Self {
        self.scratch_capacity = scratch_capacity;
        self
    }

    /// Set bulk capacity per unit
    pub fn with_bulk_capacity(mut self, bulk_capacity: usize) -> Self {
        self.bulk_capacity = bulk_capacity;
        self
    }

    /// Run units concurrently or sequentially
    pub fn with_parallel_units(mut self, parallel_units: bool) -> Self {
        self.parallel_units = parallel_units;
        self
    }

    /// Reject values no launch could work with
    pub fn validate(&self) -> PimResult<()> {
        if self.available_units == 0 {
            return Err(config_error!("rank has no units available"));
        }
        if self.clock_hz == 0 {
            return Err(config_error!("clock frequency must be positive"));
        }
        if self.scratch_capacity == 0 || self.bulk_capacity == 0 {
            return Err(config_error!(
                "memory capacities must be positive (scratch {}, bulk {})",
                self.scratch_capacity,
                self.bulk_capacity
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_config_default() {
        let config = SystemConfig::default();
        assert_eq!(config.available_units, 2560);
        assert_eq!(config.clock_hz, 350_000_000);
        assert_eq!(config.scratch_capacity, 64 * 1024);
        assert_eq!(config.bulk_capacity, 64 * 1024 * 1024);
        assert!(config.parallel_units);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_system_config_builder() {
        let config = SystemConfig::new()
            .with_available_units(4)
            .with_clock_hz(400_000_000)
            .with_scratch_capacity(32 * 1024)
            .with_bulk_capacity(1 << 20)
            .with_parallel_units(false);

        assert_eq!(config.available_units, 4);
        assert_eq!(config.clock_hz, 400_000_000);
        assert_eq!(config.scratch_capacity, 32 * 1024);
        assert_eq!(config.bulk_capacity, 1 << 20);
        assert!(!config.parallel_units);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        assert!(SystemConfig::new().with_available_units(0).validate().is_err());
        assert!(SystemConfig::new().with_clock_hz(0).validate().is_err());
        assert!(SystemConfig::new().with_scratch_capacity(0).validate().is_err());
    }
}
