use anyhow::Context;
use can_device::{CanBusDevice, ConfigurationKey, ConfigurationValue, Filter};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Adapter settings read from a YAML or JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    #[serde(default = "default_device")]
    pub device: String,
    #[serde(default)]
    pub bit_rate: Option<u32>,
    #[serde(default)]
    pub can_fd: bool,
    #[serde(default)]
    pub filters: Vec<Filter>,
}

fn default_device() -> String {
    "mock0".to_string()
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            bit_rate: None,
            can_fd: false,
            filters: Vec::new(),
        }
    }
}

impl AdapterConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading adapter config: {}", path.display()))?;
        let is_json = path.extension().is_some_and(|ext| ext == "json");
        let config = if is_json {
            serde_json::from_str(&raw)
                .with_context(|| format!("parsing json: {}", path.display()))?
        } else {
            serde_yaml::from_str(&raw)
                .with_context(|| format!("parsing yaml: {}", path.display()))?
        };
        Ok(config)
    }

    /// Push every setting through the device's configuration entry point.
    pub fn apply(&self, device: &mut dyn CanBusDevice) -> anyhow::Result<()> {
        if let Some(rate) = self.bit_rate {
            device
                .set_configuration_parameter(
                    ConfigurationKey::BitRate,
                    ConfigurationValue::Integer(rate),
                )
                .context("applying bit_rate")?;
        }
        device
            .set_configuration_parameter(
                ConfigurationKey::CanFd,
                ConfigurationValue::Bool(self.can_fd),
            )
            .context("applying can_fd")?;
        if !self.filters.is_empty() {
            device
                .set_configuration_parameter(
                    ConfigurationKey::RawFilter,
                    ConfigurationValue::Filters(self.filters.clone()),
                )
                .context("applying filters")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use can_device::{DeviceCore, FilterFormat, FilterFrameType};
    use std::sync::Arc;
    use vci_can::{MockHandle, VciCanBackend};

    #[test]
    fn test_parse_yaml() -> anyhow::Result<()> {
        let yaml = r#"
device: "USB-to-CAN CAN-1"
bit_rate: 500000
filters:
  - frame_id: 0x100
    frame_id_mask: 0x7F0
    format: base
  - frame_id: 0x18FF0000
    frame_id_mask: 0x1FFF0000
    format: extended
    type: remote_request
"#;
        let cfg: AdapterConfig = serde_yaml::from_str(yaml)?;
        assert_eq!(cfg.device, "USB-to-CAN CAN-1");
        assert_eq!(cfg.bit_rate, Some(500_000));
        assert!(!cfg.can_fd);
        assert_eq!(cfg.filters.len(), 2);
        assert_eq!(cfg.filters[0].format, FilterFormat::Base);
        assert_eq!(cfg.filters[0].frame_type, FilterFrameType::Data);
        assert_eq!(cfg.filters[1].frame_type, FilterFrameType::RemoteRequest);
        Ok(())
    }

    #[test]
    fn test_apply_to_backend() -> anyhow::Result<()> {
        let cfg: AdapterConfig = serde_json::from_str(
            r#"{"bit_rate": 125000, "filters": [{"frame_id": 1, "frame_id_mask": 255}]}"#,
        )?;
        assert_eq!(cfg.device, "mock0");
        let handle = MockHandle::new();
        let mut backend =
            VciCanBackend::new(&cfg.device, Arc::new(DeviceCore::new()), handle.factory());
        cfg.apply(&mut backend)?;
        assert_eq!(backend.options().bit_rate, 125_000);
        // base-and-extended by default
        assert_eq!(backend.options().filters.len(), 2);
        Ok(())
    }

    #[test]
    fn test_apply_rejects_can_fd() {
        let cfg = AdapterConfig {
            can_fd: true,
            ..Default::default()
        };
        let handle = MockHandle::new();
        let mut backend = VciCanBackend::new("mock0", Arc::new(DeviceCore::new()), handle.factory());
        let err = cfg.apply(&mut backend).unwrap_err();
        assert!(err.to_string().contains("can_fd"));
    }
}
