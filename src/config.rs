//! Configuration for a [`DataBuffer`](crate::data::buffer::DataBuffer).

use serde::{Deserialize, Serialize};

use crate::error::{BufferError, Result};

/// Default number of samples each entry holds at construction.
pub const DEFAULT_CAPACITY: usize = 8192;
/// Default upper limit the buffer may grow to before it starts wrapping.
pub const DEFAULT_MAX_CAPACITY: usize = 16384;

/// Sizing and growth policy of a buffer.
///
/// Every field has a default, so a partial JSON document such as
/// `{"wrap_on_full": true}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Shared array length of every entry when the buffer is created.
    pub initial_capacity: usize,
    /// The buffer grows by 3/2 on overflow until it reaches this length.
    pub max_capacity: usize,
    /// Overwrite the oldest sample instead of growing ("flight recorder").
    pub wrap_on_full: bool,
    /// Name of the variable holding simulation time, see `DataBuffer::time_data`.
    pub time_variable_name: String,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_CAPACITY,
            max_capacity: DEFAULT_MAX_CAPACITY,
            wrap_on_full: false,
            time_variable_name: "t".to_string(),
        }
    }
}

impl BufferConfig {
    pub fn with_capacity(initial_capacity: usize) -> Self {
        Self {
            initial_capacity,
            max_capacity: DEFAULT_MAX_CAPACITY.max(initial_capacity),
            ..Self::default()
        }
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: BufferConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.initial_capacity == 0 {
            return Err(BufferError::InvalidConfig {
                reason: "initial_capacity must be at least 1".to_string(),
            });
        }
        if self.max_capacity < self.initial_capacity {
            return Err(BufferError::InvalidConfig {
                reason: format!(
                    "max_capacity {} is smaller than initial_capacity {}",
                    self.max_capacity, self.initial_capacity
                ),
            });
        }
        Ok(())
    }
}
