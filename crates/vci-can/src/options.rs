use crate::FilterEntry;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BIT_RATE: u32 = 250_000;

/// Options handed to the driver when a session is opened.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DriverOptions {
    pub controller: String,
    #[serde(default = "default_bit_rate")]
    pub bit_rate: u32,
    #[serde(default)]
    pub filters: Vec<FilterEntry>,
}

fn default_bit_rate() -> u32 {
    DEFAULT_BIT_RATE
}

impl DriverOptions {
    pub fn new(controller: impl Into<String>) -> Self {
        Self {
            controller: controller.into(),
            bit_rate: DEFAULT_BIT_RATE,
            filters: Vec::new(),
        }
    }
}
