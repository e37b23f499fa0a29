//! Derivation of typed events from one raw sample plus the stored prior state
//!
//! Everything in here is pure: the router reads the prior state, calls one of
//! these functions, stores the returned state and delivers the returned
//! events. Hat math always pairs the fresh sample with the partner axis's
//! *stored* value, because the driver reports one axis per record.

use crate::device::event::{AxisRole, DerivedEvent, RawEvent};
use crate::device::state::{ButtonState, HatAxisState};
use std::time::Duration;

/// A derived event together with the button or hat number it is routed by
pub type Routed = (u8, DerivedEvent);

/// Output of one derivation step
#[derive(Debug, Clone, PartialEq)]
pub struct Derivation<S> {
    pub state: S,
    pub events: Vec<Routed>,
}

pub fn derive_button(
    raw: &RawEvent,
    prior: &ButtonState,
    long_press_delay: Duration,
) -> Derivation<ButtonState> {
    let number = prior.number;
    let timestamp = raw.timestamp;
    let pressed = raw.value != 0;

    let mut events = vec![(
        number,
        DerivedEvent::ButtonChanged {
            timestamp,
            number,
            pressed,
        },
    )];

    if pressed {
        events.push((number, DerivedEvent::ButtonClosed { timestamp }));
    } else {
        events.push((number, DerivedEvent::ButtonOpened { timestamp }));
        let held = timestamp.checked_sub(prior.last_time);
        if held.is_some_and(|held| held > long_press_delay) {
            events.push((number, DerivedEvent::ButtonLongPress { timestamp }));
        }
    }

    Derivation {
        state: ButtonState {
            number,
            last_time: timestamp,
            pressed,
        },
        events,
    }
}

/// Scales a raw axis reading into `[-1, 1]`, honouring a reversed axis
pub fn normalise_axis(value: i32, max_axis_value: i32, reversed: bool) -> f32 {
    let v = (value as f32 / max_axis_value as f32).clamp(-1.0, 1.0);
    if reversed {
        -v
    } else {
        v
    }
}

/// Angle of a hat position, `atan2(y, x)`
pub fn hat_angle(x: f32, y: f32) -> f32 {
    y.atan2(x)
}

pub fn hat_radius(x: f32, y: f32) -> f32 {
    (x * x + y * y).sqrt()
}

fn at_edge(v: f32) -> bool {
    v == 1.0 || v == -1.0
}

pub fn derive_hat_axis(
    raw: &RawEvent,
    prior: &HatAxisState,
    partner_value: f32,
    max_axis_value: i32,
) -> Derivation<HatAxisState> {
    let hat = prior.hat;
    let timestamp = raw.timestamp;
    let v = normalise_axis(raw.value, max_axis_value, prior.reversed);
    let (x, y) = match prior.role {
        AxisRole::X => (v, partner_value),
        AxisRole::Y => (partner_value, v),
    };
    let angle = hat_angle(x, y);

    let mut events = Vec::with_capacity(7);
    events.push((
        hat,
        DerivedEvent::HatAxisChanged {
            timestamp,
            hat,
            role: prior.role,
            value: v,
        },
    ));
    events.push(match prior.role {
        AxisRole::X => (hat, DerivedEvent::HatPanX { timestamp, v }),
        AxisRole::Y => (hat, DerivedEvent::HatPanY { timestamp, v }),
    });
    events.push((hat, DerivedEvent::HatPosition { timestamp, x, y }));
    events.push((hat, DerivedEvent::HatAngle { timestamp, angle }));
    events.push((
        hat,
        DerivedEvent::HatRadius {
            timestamp,
            r: hat_radius(x, y),
        },
    ));

    if at_edge(v) && !at_edge(prior.value) {
        events.push((hat, DerivedEvent::HatEdge { timestamp, angle }));
    }

    // both axes must be at rest; the partner's value may be stale
    if v == 0.0 && prior.value != 0.0 && partner_value == 0.0 {
        events.push((hat, DerivedEvent::HatCentered { timestamp }));
    }

    Derivation {
        state: HatAxisState {
            last_time: timestamp,
            value: v,
            ..*prior
        },
        events,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::event::EventKind;
    use std::f32::consts::{FRAC_PI_2, PI};

    const MAX: i32 = 32767;

    fn ms(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    fn kinds(events: &[Routed]) -> Vec<EventKind> {
        events.iter().map(|(_, e)| e.kind()).collect()
    }

    fn axis(role: AxisRole, value: f32) -> HatAxisState {
        HatAxisState {
            hat: 0,
            role,
            reversed: false,
            last_time: Duration::ZERO,
            value,
        }
    }

    fn find(events: &[Routed], kind: EventKind) -> Option<DerivedEvent> {
        events
            .iter()
            .map(|(_, e)| *e)
            .find(|e| e.kind() == kind)
    }

    #[test]
    fn button_changed_reflects_nonzero_value() {
        let prior = ButtonState {
            number: 3,
            ..ButtonState::default()
        };
        for value in [1, 2, -1, 0] {
            let out = derive_button(&RawEvent::button(ms(5), 3, value), &prior, ms(1000));
            assert_eq!(
                out.events[0],
                (
                    3,
                    DerivedEvent::ButtonChanged {
                        timestamp: ms(5),
                        number: 3,
                        pressed: value != 0,
                    }
                )
            );
            assert_eq!(out.state.pressed, value != 0);
            assert_eq!(out.state.last_time, ms(5));
        }
    }

    #[test]
    fn press_emits_close_only() {
        let prior = ButtonState::default();
        let out = derive_button(&RawEvent::button(ms(0), 0, 1), &prior, ms(1000));
        assert_eq!(
            kinds(&out.events),
            vec![EventKind::ButtonChanged, EventKind::ButtonClosed]
        );
    }

    #[test]
    fn long_press_threshold_is_exclusive() {
        let prior = ButtonState {
            number: 1,
            last_time: ms(500),
            pressed: true,
        };

        let below = derive_button(&RawEvent::button(ms(1499), 1, 0), &prior, ms(1000));
        assert_eq!(
            kinds(&below.events),
            vec![EventKind::ButtonChanged, EventKind::ButtonOpened]
        );

        let exact = derive_button(&RawEvent::button(ms(1500), 1, 0), &prior, ms(1000));
        assert!(find(&exact.events, EventKind::ButtonLongPress).is_none());

        let above = derive_button(&RawEvent::button(ms(1501), 1, 0), &prior, ms(1000));
        assert_eq!(
            kinds(&above.events),
            vec![
                EventKind::ButtonChanged,
                EventKind::ButtonOpened,
                EventKind::ButtonLongPress
            ]
        );
    }

    #[test]
    fn normalises_and_reverses() {
        assert_eq!(normalise_axis(MAX, MAX, false), 1.0);
        assert_eq!(normalise_axis(-MAX, MAX, false), -1.0);
        assert_eq!(normalise_axis(-32768, MAX, false), -1.0);
        assert_eq!(normalise_axis(MAX, MAX, true), -1.0);
        assert_eq!(normalise_axis(0, MAX, true), 0.0);
    }

    #[test]
    fn x_axis_combines_with_stored_y() {
        let out = derive_hat_axis(
            &RawEvent::hat_axis(ms(1), 0, MAX),
            &axis(AxisRole::X, 0.0),
            0.0,
            MAX,
        );
        assert_eq!(
            find(&out.events, EventKind::HatPosition),
            Some(DerivedEvent::HatPosition {
                timestamp: ms(1),
                x: 1.0,
                y: 0.0
            })
        );
        assert_eq!(
            find(&out.events, EventKind::HatAngle),
            Some(DerivedEvent::HatAngle {
                timestamp: ms(1),
                angle: 0.0
            })
        );
        assert_eq!(
            find(&out.events, EventKind::HatRadius),
            Some(DerivedEvent::HatRadius {
                timestamp: ms(1),
                r: 1.0
            })
        );
        assert!(find(&out.events, EventKind::HatPanX).is_some());
        assert!(find(&out.events, EventKind::HatPanY).is_none());
        assert_eq!(out.state.value, 1.0);
    }

    #[test]
    fn y_axis_puts_fresh_value_second() {
        let out = derive_hat_axis(
            &RawEvent::hat_axis(ms(1), 1, MAX),
            &axis(AxisRole::Y, 0.0),
            0.0,
            MAX,
        );
        match find(&out.events, EventKind::HatAngle) {
            Some(DerivedEvent::HatAngle { angle, .. }) => {
                assert!((angle - FRAC_PI_2).abs() < 1e-6)
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            find(&out.events, EventKind::HatPosition),
            Some(DerivedEvent::HatPosition {
                timestamp: ms(1),
                x: 0.0,
                y: 1.0
            })
        );
        assert!(find(&out.events, EventKind::HatPanY).is_some());
    }

    #[test]
    fn angle_covers_negative_x_axis() {
        let out = derive_hat_axis(
            &RawEvent::hat_axis(ms(1), 0, -MAX),
            &axis(AxisRole::X, 0.0),
            0.0,
            MAX,
        );
        match find(&out.events, EventKind::HatAngle) {
            Some(DerivedEvent::HatAngle { angle, .. }) => assert_eq!(angle, PI),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn diagonal_radius_uses_partner() {
        let out = derive_hat_axis(
            &RawEvent::hat_axis(ms(1), 1, MAX),
            &axis(AxisRole::Y, 0.0),
            1.0,
            MAX,
        );
        match find(&out.events, EventKind::HatRadius) {
            Some(DerivedEvent::HatRadius { r, .. }) => {
                assert!((r - std::f32::consts::SQRT_2).abs() < 1e-6)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn edge_fires_only_on_entry() {
        let entering = derive_hat_axis(
            &RawEvent::hat_axis(ms(1), 0, MAX),
            &axis(AxisRole::X, 0.5),
            0.0,
            MAX,
        );
        assert_eq!(
            find(&entering.events, EventKind::HatEdge),
            Some(DerivedEvent::HatEdge {
                timestamp: ms(1),
                angle: 0.0
            })
        );

        let repeated = derive_hat_axis(
            &RawEvent::hat_axis(ms(2), 0, MAX),
            &entering.state,
            0.0,
            MAX,
        );
        assert!(find(&repeated.events, EventKind::HatEdge).is_none());

        let flipped = derive_hat_axis(
            &RawEvent::hat_axis(ms(3), 0, -MAX),
            &repeated.state,
            0.0,
            MAX,
        );
        assert!(find(&flipped.events, EventKind::HatEdge).is_none());
    }

    #[test]
    fn centered_needs_both_axes_at_rest() {
        let partner_off_center = derive_hat_axis(
            &RawEvent::hat_axis(ms(1), 0, 0),
            &axis(AxisRole::X, 1.0),
            0.5,
            MAX,
        );
        assert!(find(&partner_off_center.events, EventKind::HatCentered).is_none());

        let both_at_rest = derive_hat_axis(
            &RawEvent::hat_axis(ms(2), 1, 0),
            &axis(AxisRole::Y, 0.5),
            0.0,
            MAX,
        );
        assert_eq!(
            find(&both_at_rest.events, EventKind::HatCentered),
            Some(DerivedEvent::HatCentered { timestamp: ms(2) })
        );

        let already_centered = derive_hat_axis(
            &RawEvent::hat_axis(ms(3), 1, 0),
            &both_at_rest.state,
            0.0,
            MAX,
        );
        assert!(find(&already_centered.events, EventKind::HatCentered).is_none());
    }
}
