//! Last-known button and hat-axis values for one device
//!
//! [`DeviceLayout`] is the capability map handed over by whatever opened the
//! device: which raw indices are buttons, and which pair of raw axis indices
//! forms each hat. [`DeviceState`] holds the values and is mutated only by
//! the router that owns it.

use crate::device::event::AxisRole;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisBinding {
    pub hat: u8,
    pub role: AxisRole,
    pub reversed: bool,
}

/// Capability map of a device, fixed before routing starts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceLayout {
    /// raw button index -> logical button number
    buttons: BTreeMap<u8, u8>,
    /// raw axis index -> hat binding
    axes: BTreeMap<u8, AxisBinding>,
    /// hat number -> (x index, y index)
    hats: BTreeMap<u8, (u8, u8)>,
}

impl DeviceLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Conventional Linux layout: button `i` is number `i`, hat `k` owns axes `2k` and `2k + 1`
    pub fn sequential(buttons: u8, hats: u8) -> Self {
        let mut layout = Self::new();
        for index in 0..buttons {
            layout = layout.with_button(index, index);
        }
        for hat in 0..hats {
            let x_index = hat.saturating_mul(2);
            layout = layout.with_hat(hat, x_index, x_index.saturating_add(1));
        }
        layout
    }

    pub fn with_button(mut self, index: u8, number: u8) -> Self {
        self.buttons.insert(index, number);
        self
    }

    /// Declares a hat by its two raw axis indices
    ///
    /// Re-declaring a hat or reusing an axis index replaces the older binding.
    pub fn with_hat(mut self, hat: u8, x_index: u8, y_index: u8) -> Self {
        if let Some((old_x, old_y)) = self.hats.remove(&hat) {
            self.axes.remove(&old_x);
            self.axes.remove(&old_y);
        }
        for index in [x_index, y_index] {
            if let Some(previous) = self.axes.get(&index).copied() {
                if let Some((other_x, other_y)) = self.hats.remove(&previous.hat) {
                    self.axes.remove(&other_x);
                    self.axes.remove(&other_y);
                }
            }
        }
        self.axes.insert(
            x_index,
            AxisBinding {
                hat,
                role: AxisRole::X,
                reversed: false,
            },
        );
        self.axes.insert(
            y_index,
            AxisBinding {
                hat,
                role: AxisRole::Y,
                reversed: false,
            },
        );
        self.hats.insert(hat, (x_index, y_index));
        self
    }

    /// Flips the sign of an axis that reports inverted values
    pub fn with_reversed_axis(mut self, index: u8) -> Self {
        if let Some(binding) = self.axes.get_mut(&index) {
            binding.reversed = true;
        }
        self
    }

    /// Logical number of a raw button index; undeclared indices map to themselves
    pub fn button_number(&self, index: u8) -> u8 {
        self.buttons.get(&index).copied().unwrap_or(index)
    }

    pub fn axis(&self, index: u8) -> Option<AxisBinding> {
        self.axes.get(&index).copied()
    }

    pub fn hat_axes(&self, hat: u8) -> Option<(u8, u8)> {
        self.hats.get(&hat).copied()
    }

    /// Raw index of the other axis of the same hat
    pub fn partner_of(&self, index: u8) -> Option<u8> {
        let binding = self.axes.get(&index)?;
        let (x_index, y_index) = self.hat_axes(binding.hat)?;
        match binding.role {
            AxisRole::X => Some(y_index),
            AxisRole::Y => Some(x_index),
        }
    }

    pub fn button_exists(&self, number: u8) -> bool {
        self.buttons.values().any(|n| *n == number)
    }

    pub fn hat_exists(&self, hat: u8) -> bool {
        self.hats.contains_key(&hat)
    }

    pub fn buttons(&self) -> impl Iterator<Item = u8> + '_ {
        self.buttons.values().copied()
    }

    pub fn hats(&self) -> impl Iterator<Item = u8> + '_ {
        self.hats.keys().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ButtonState {
    pub number: u8,
    pub last_time: Duration,
    pub pressed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HatAxisState {
    pub hat: u8,
    pub role: AxisRole,
    pub reversed: bool,
    pub last_time: Duration,
    /// Normalised, `[-1, 1]`
    pub value: f32,
}

impl HatAxisState {
    fn at_rest(binding: AxisBinding) -> Self {
        Self {
            hat: binding.hat,
            role: binding.role,
            reversed: binding.reversed,
            last_time: Duration::ZERO,
            value: 0.0,
        }
    }
}

/// Read-only view published after every routed event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceSnapshot {
    pub buttons: HashMap<u8, bool>,
    pub hats: HashMap<u8, (f32, f32)>,
}

impl DeviceSnapshot {
    pub fn button_pressed(&self, number: u8) -> bool {
        self.buttons.get(&number).copied().unwrap_or(false)
    }

    pub fn hat_position(&self, hat: u8) -> Option<(f32, f32)> {
        self.hats.get(&hat).copied()
    }
}

/// State store of one device
#[derive(Debug, Clone)]
pub struct DeviceState {
    layout: DeviceLayout,
    buttons: HashMap<u8, ButtonState>,
    hat_axes: HashMap<u8, HatAxisState>,
}

impl DeviceState {
    pub fn new(layout: DeviceLayout) -> Self {
        let hat_axes = layout
            .axes
            .iter()
            .map(|(index, binding)| (*index, HatAxisState::at_rest(*binding)))
            .collect();
        Self {
            layout,
            buttons: HashMap::new(),
            hat_axes,
        }
    }

    pub fn layout(&self) -> &DeviceLayout {
        &self.layout
    }

    /// Current state of a button, zero-valued if it has never reported
    pub fn button(&self, number: u8) -> ButtonState {
        self.buttons.get(&number).copied().unwrap_or(ButtonState {
            number,
            ..ButtonState::default()
        })
    }

    pub fn set_button(&mut self, state: ButtonState) {
        self.buttons.insert(state.number, state);
    }

    /// Current state of a raw axis; `None` if the layout does not declare it
    pub fn hat_axis(&self, index: u8) -> Option<HatAxisState> {
        self.hat_axes.get(&index).copied()
    }

    /// Only declared axes are stored; anything else is dropped
    pub fn set_hat_axis(&mut self, index: u8, state: HatAxisState) {
        if let Some(slot) = self.hat_axes.get_mut(&index) {
            *slot = state;
        }
    }

    /// Last stored value of the other axis of the same hat
    pub fn partner_value(&self, index: u8) -> f32 {
        self.layout
            .partner_of(index)
            .and_then(|partner| self.hat_axes.get(&partner))
            .map(|axis| axis.value)
            .unwrap_or(0.0)
    }

    pub fn button_pressed(&self, number: u8) -> bool {
        self.button(number).pressed
    }

    pub fn hat_position(&self, hat: u8) -> Option<(f32, f32)> {
        let (x_index, y_index) = self.layout.hat_axes(hat)?;
        let x = self.hat_axes.get(&x_index).map(|a| a.value).unwrap_or(0.0);
        let y = self.hat_axes.get(&y_index).map(|a| a.value).unwrap_or(0.0);
        Some((x, y))
    }

    pub fn snapshot(&self) -> DeviceSnapshot {
        let mut buttons: HashMap<u8, bool> =
            self.layout.buttons().map(|number| (number, false)).collect();
        for (number, state) in &self.buttons {
            buttons.insert(*number, state.pressed);
        }
        let hats = self
            .layout
            .hats()
            .filter_map(|hat| self.hat_position(hat).map(|pos| (hat, pos)))
            .collect();
        DeviceSnapshot { buttons, hats }
    }
}
