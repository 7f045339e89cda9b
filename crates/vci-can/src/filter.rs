use can_device::{Filter, FilterFormat, FilterFrameType};
use serde::{Deserialize, Serialize};

/// Frame format a hardware filter row applies to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatSelector {
    Standard = 0,
    Extended = 1,
}

impl FormatSelector {
    pub fn as_raw(self) -> u32 {
        self as u32
    }
}

/// One acceptance filter row as the VCI driver expects it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct FilterEntry {
    pub format: FormatSelector,
    pub frame_id: u32,
    pub mask: u32,
    pub remote_only: bool,
}

impl FilterEntry {
    /// `[format, id, mask, remote]` as handed to the controller.
    pub fn to_row(&self) -> [u32; 4] {
        [
            self.format.as_raw(),
            self.frame_id,
            self.mask,
            u32::from(self.remote_only),
        ]
    }
}

fn selectors(format: FilterFormat) -> &'static [FormatSelector] {
    match format {
        FilterFormat::Base => &[FormatSelector::Standard],
        FilterFormat::Extended => &[FormatSelector::Extended],
        FilterFormat::BaseAndExtended => &[FormatSelector::Standard, FormatSelector::Extended],
    }
}

/// Expand abstract rules into filter rows and append them to `entries`.
///
/// Existing rows are kept and nothing is deduplicated; ids and masks are
/// passed through as given.
pub fn append_filters(entries: &mut Vec<FilterEntry>, rules: &[Filter]) {
    for rule in rules {
        let remote_only = rule.frame_type == FilterFrameType::RemoteRequest;
        for &format in selectors(rule.format) {
            entries.push(FilterEntry {
                format,
                frame_id: rule.frame_id,
                mask: rule.frame_id_mask,
                remote_only,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: u32, mask: u32, format: FilterFormat, frame_type: FilterFrameType) -> Filter {
        Filter {
            frame_id: id,
            frame_id_mask: mask,
            format,
            frame_type,
        }
    }

    #[test]
    fn test_base_and_extended_expands_to_two_rows() {
        let mut entries = Vec::new();
        append_filters(
            &mut entries,
            &[rule(
                0x123,
                0x7FF,
                FilterFormat::BaseAndExtended,
                FilterFrameType::RemoteRequest,
            )],
        );
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].to_row(), [0, 0x123, 0x7FF, 1]);
        assert_eq!(entries[1].to_row(), [1, 0x123, 0x7FF, 1]);
    }

    #[test]
    fn test_single_format_rules() {
        let mut entries = Vec::new();
        append_filters(
            &mut entries,
            &[
                rule(0x10, 0xF0, FilterFormat::Base, FilterFrameType::Data),
                rule(0x1000, 0, FilterFormat::Extended, FilterFrameType::Data),
            ],
        );
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].format, FormatSelector::Standard);
        assert!(!entries[0].remote_only);
        assert_eq!(entries[1].format, FormatSelector::Extended);
        // zero mask is not interpreted
        assert_eq!(entries[1].mask, 0);
    }

    #[test]
    fn test_translation_is_additive() {
        let a = [rule(1, 0xFF, FilterFormat::Base, FilterFrameType::Data)];
        let b = [
            rule(2, 0xFF, FilterFormat::BaseAndExtended, FilterFrameType::Data),
            rule(1, 0xFF, FilterFormat::Base, FilterFrameType::Data),
        ];

        let mut combined = Vec::new();
        append_filters(&mut combined, &a);
        append_filters(&mut combined, &b);

        let mut only_a = Vec::new();
        append_filters(&mut only_a, &a);
        let mut only_b = Vec::new();
        append_filters(&mut only_b, &b);
        only_a.extend(only_b);

        assert_eq!(combined, only_a);
        assert_eq!(combined.len(), 4);
    }
}
