use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Kind byte of a raw joystick record
///
/// The Linux joystick driver reports `1` for buttons and `2` for axes, OR-ed
/// with `0x80` for the initial state burst. Everything else is kept as
/// `Unknown` so the router can skip it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RawEventKind {
    Button,
    HatAxis,
    Unknown(u8),
}

const JS_EVENT_BUTTON: u8 = 0x01;
const JS_EVENT_AXIS: u8 = 0x02;
const JS_EVENT_INIT: u8 = 0x80;

impl From<u8> for RawEventKind {
    fn from(code: u8) -> Self {
        match code & !JS_EVENT_INIT {
            JS_EVENT_BUTTON => RawEventKind::Button,
            JS_EVENT_AXIS => RawEventKind::HatAxis,
            _ => RawEventKind::Unknown(code),
        }
    }
}

/// A single sample from the device, as delivered by the driver or injected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    pub timestamp: Duration,
    pub kind: RawEventKind,
    /// Driver-assigned slot (button index or raw axis index)
    pub index: u8,
    pub value: i32,
}

impl RawEvent {
    pub fn button(timestamp: Duration, index: u8, value: i32) -> Self {
        Self {
            timestamp,
            kind: RawEventKind::Button,
            index,
            value,
        }
    }

    pub fn hat_axis(timestamp: Duration, index: u8, value: i32) -> Self {
        Self {
            timestamp,
            kind: RawEventKind::HatAxis,
            index,
            value,
        }
    }
}

/// Which half of a hat an axis reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisRole {
    X,
    Y,
}

/// Names every stream a consumer can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    ButtonChanged,
    ButtonOpened,
    ButtonClosed,
    ButtonLongPress,
    HatAxisChanged,
    HatPanX,
    HatPanY,
    HatPosition,
    HatAngle,
    HatRadius,
    HatCentered,
    HatEdge,
}

impl EventKind {
    pub const ALL: [EventKind; 12] = [
        EventKind::ButtonChanged,
        EventKind::ButtonOpened,
        EventKind::ButtonClosed,
        EventKind::ButtonLongPress,
        EventKind::HatAxisChanged,
        EventKind::HatPanX,
        EventKind::HatPanY,
        EventKind::HatPosition,
        EventKind::HatAngle,
        EventKind::HatRadius,
        EventKind::HatCentered,
        EventKind::HatEdge,
    ];

    /// True for kinds keyed by button number, false for kinds keyed by hat number
    pub fn is_button(&self) -> bool {
        matches!(
            self,
            EventKind::ButtonChanged
                | EventKind::ButtonOpened
                | EventKind::ButtonClosed
                | EventKind::ButtonLongPress
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::ButtonChanged => "button-changed",
            EventKind::ButtonOpened => "button-open",
            EventKind::ButtonClosed => "button-close",
            EventKind::ButtonLongPress => "button-long-press",
            EventKind::HatAxisChanged => "hat-changed",
            EventKind::HatPanX => "hat-pan-x",
            EventKind::HatPanY => "hat-pan-y",
            EventKind::HatPosition => "hat-position",
            EventKind::HatAngle => "hat-angle",
            EventKind::HatRadius => "hat-radius",
            EventKind::HatCentered => "hat-centered",
            EventKind::HatEdge => "hat-edge",
        };
        f.write_str(name)
    }
}

/// Semantically typed event derived from raw samples and stored state
///
/// Every variant carries the driver timestamp of the raw sample that produced
/// it; hat values are normalised to `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DerivedEvent {
    ButtonChanged {
        timestamp: Duration,
        number: u8,
        pressed: bool,
    },
    ButtonOpened {
        timestamp: Duration,
    },
    ButtonClosed {
        timestamp: Duration,
    },
    ButtonLongPress {
        timestamp: Duration,
    },
    HatAxisChanged {
        timestamp: Duration,
        hat: u8,
        role: AxisRole,
        value: f32,
    },
    HatPosition {
        timestamp: Duration,
        x: f32,
        y: f32,
    },
    HatPanX {
        timestamp: Duration,
        v: f32,
    },
    HatPanY {
        timestamp: Duration,
        v: f32,
    },
    /// Angle in radians, `(-π, π]`
    HatAngle {
        timestamp: Duration,
        angle: f32,
    },
    HatRadius {
        timestamp: Duration,
        r: f32,
    },
    HatCentered {
        timestamp: Duration,
    },
    HatEdge {
        timestamp: Duration,
        angle: f32,
    },
}

impl DerivedEvent {
    /// Timestamp of the raw sample this event was derived from
    pub fn moment(&self) -> Duration {
        match *self {
            DerivedEvent::ButtonChanged { timestamp, .. }
            | DerivedEvent::ButtonOpened { timestamp }
            | DerivedEvent::ButtonClosed { timestamp }
            | DerivedEvent::ButtonLongPress { timestamp }
            | DerivedEvent::HatAxisChanged { timestamp, .. }
            | DerivedEvent::HatPosition { timestamp, .. }
            | DerivedEvent::HatPanX { timestamp, .. }
            | DerivedEvent::HatPanY { timestamp, .. }
            | DerivedEvent::HatAngle { timestamp, .. }
            | DerivedEvent::HatRadius { timestamp, .. }
            | DerivedEvent::HatCentered { timestamp }
            | DerivedEvent::HatEdge { timestamp, .. } => timestamp,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            DerivedEvent::ButtonChanged { .. } => EventKind::ButtonChanged,
            DerivedEvent::ButtonOpened { .. } => EventKind::ButtonOpened,
            DerivedEvent::ButtonClosed { .. } => EventKind::ButtonClosed,
            DerivedEvent::ButtonLongPress { .. } => EventKind::ButtonLongPress,
            DerivedEvent::HatAxisChanged { .. } => EventKind::HatAxisChanged,
            DerivedEvent::HatPosition { .. } => EventKind::HatPosition,
            DerivedEvent::HatPanX { .. } => EventKind::HatPanX,
            DerivedEvent::HatPanY { .. } => EventKind::HatPanY,
            DerivedEvent::HatAngle { .. } => EventKind::HatAngle,
            DerivedEvent::HatRadius { .. } => EventKind::HatRadius,
            DerivedEvent::HatCentered { .. } => EventKind::HatCentered,
            DerivedEvent::HatEdge { .. } => EventKind::HatEdge,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_byte_decoding_masks_init_flag() {
        assert_eq!(RawEventKind::from(0x01), RawEventKind::Button);
        assert_eq!(RawEventKind::from(0x81), RawEventKind::Button);
        assert_eq!(RawEventKind::from(0x02), RawEventKind::HatAxis);
        assert_eq!(RawEventKind::from(0x82), RawEventKind::HatAxis);
        assert_eq!(RawEventKind::from(0x04), RawEventKind::Unknown(0x04));
    }

    #[test]
    fn derived_event_reports_kind_and_moment() {
        let t = Duration::from_millis(250);
        let event = DerivedEvent::HatRadius { timestamp: t, r: 1.0 };
        assert_eq!(event.kind(), EventKind::HatRadius);
        assert_eq!(event.moment(), t);

        let event = DerivedEvent::ButtonChanged {
            timestamp: t,
            number: 2,
            pressed: true,
        };
        assert_eq!(event.kind(), EventKind::ButtonChanged);
        assert!(event.kind().is_button());
        assert!(!EventKind::HatEdge.is_button());
    }
}
