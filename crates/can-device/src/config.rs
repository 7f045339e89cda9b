use crate::FrameErrors;
use serde::{Deserialize, Serialize};

/// Keys a host may pass to `set_configuration_parameter`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ConfigurationKey {
    RawFilter,
    ErrorFilter,
    Loopback,
    ReceiveOwn,
    BitRate,
    CanFd,
    DataBitRate,
    Protocol,
    /// Backend-specific key outside the shared range.
    User(i32),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ConfigurationValue {
    Bool(bool),
    Integer(u32),
    Text(String),
    Filters(Vec<Filter>),
    ErrorMask(FrameErrors),
}

impl ConfigurationValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Integer(i) => Some(*i != 0),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<u32> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_filters(&self) -> Option<&[Filter]> {
        match self {
            Self::Filters(f) => Some(f),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterFormat {
    Base,
    Extended,
    #[default]
    BaseAndExtended,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterFrameType {
    #[default]
    Data,
    RemoteRequest,
}

/// Abstract acceptance rule; the backend decides how it maps to hardware.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Filter {
    pub frame_id: u32,
    pub frame_id_mask: u32,
    #[serde(default)]
    pub format: FilterFormat,
    #[serde(default, rename = "type")]
    pub frame_type: FilterFrameType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_accessors() {
        assert_eq!(ConfigurationValue::Bool(true).as_bool(), Some(true));
        assert_eq!(ConfigurationValue::Integer(0).as_bool(), Some(false));
        assert_eq!(ConfigurationValue::Integer(500_000).as_integer(), Some(500_000));
        assert_eq!(ConfigurationValue::Text("x".into()).as_integer(), None);
        assert!(ConfigurationValue::Bool(false).as_filters().is_none());
    }

    #[test]
    fn test_filter_defaults() {
        let f = Filter {
            frame_id: 0x100,
            frame_id_mask: 0x7F0,
            format: Default::default(),
            frame_type: Default::default(),
        };
        assert_eq!(f.format, FilterFormat::BaseAndExtended);
        assert_eq!(f.frame_type, FilterFrameType::Data);
    }
}
