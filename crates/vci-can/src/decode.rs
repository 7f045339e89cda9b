use can_device::{CanFrame, FrameErrors, FrameType};

// Output order is part of the user-facing text, not bit order.
const SIMPLE_CATEGORIES: [(FrameErrors, &str); 6] = [
    (FrameErrors::TRANSMISSION_TIMEOUT, "TX timout"),
    (
        FrameErrors::MISSING_ACKNOWLEDGMENT,
        "Received no ACK on transmission",
    ),
    (FrameErrors::BUS_OFF, "Bus off"),
    (FrameErrors::BUS, "Bus error"),
    (FrameErrors::CONTROLLER_RESTART, "Controller restarted"),
    (FrameErrors::UNKNOWN, "Unknown error"),
];

/// Describe the error categories of an error frame, one per line.
///
/// Returns an empty string for data and remote frames. Controller,
/// transceiver and protocol-violation details are not decoded.
pub fn interpret_error_frame(frame: &CanFrame) -> String {
    if frame.frame_type != FrameType::Error {
        return String::new();
    }

    let mut lines: Vec<String> = SIMPLE_CATEGORIES
        .iter()
        .filter(|(flag, _)| frame.errors.contains(*flag))
        .map(|(_, text)| (*text).to_string())
        .collect();

    if frame.errors.contains(FrameErrors::LOST_ARBITRATION) {
        lines.push("Lost arbitration:".to_string());
        if let Some(bit) = frame.payload.first() {
            lines.push(format!("{bit:x} bit"));
        }
    }

    lines.join("\n")
}
