//! Parameter panel binding layer.
//!
//! A [`Panel`] is an ordered list of named controls bound to live properties
//! of a host value: bounded numeric sliders and color pickers. The widget
//! toolkit that draws the panel is an external collaborator; it enumerates
//! [`Panel::controls`] to build its UI and routes edits back through
//! [`Panel::set`], which clamps and snaps slider input to the declared range
//! before applying it.

use anyhow::{Result, bail};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ControlValue {
    Number(f32),
    Color([f32; 3]),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ControlKind {
    Slider { min: f32, max: f32, step: f32 },
    Color,
}

pub struct Control<H> {
    name: String,
    kind: ControlKind,
    read: Box<dyn Fn(&H) -> ControlValue>,
    apply: Box<dyn FnMut(&mut H, ControlValue)>,
}

pub struct Panel<H> {
    pub visible: bool,
    controls: Vec<Control<H>>,
}

impl<H> Panel<H> {
    pub fn new() -> Self {
        Self {
            visible: true,
            controls: Vec::new(),
        }
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    /// Register a bounded numeric slider bound to a live property.
    pub fn slider(
        &mut self,
        name: &str,
        min: f32,
        max: f32,
        step: f32,
        read: impl Fn(&H) -> f32 + 'static,
        apply: impl FnMut(&mut H, f32) + 'static,
    ) {
        let mut apply = apply;
        self.controls.push(Control {
            name: name.to_string(),
            kind: ControlKind::Slider { min, max, step },
            read: Box::new(move |host| ControlValue::Number(read(host))),
            apply: Box::new(move |host, value| {
                if let ControlValue::Number(number) = value {
                    apply(host, number);
                }
            }),
        });
    }

    /// Register a color picker bound to a live property.
    pub fn color(
        &mut self,
        name: &str,
        read: impl Fn(&H) -> [f32; 3] + 'static,
        apply: impl FnMut(&mut H, [f32; 3]) + 'static,
    ) {
        let mut apply = apply;
        self.controls.push(Control {
            name: name.to_string(),
            kind: ControlKind::Color,
            read: Box::new(move |host| ControlValue::Color(read(host))),
            apply: Box::new(move |host, value| {
                if let ControlValue::Color(rgb) = value {
                    apply(host, rgb);
                }
            }),
        });
    }

    /// Apply a control edit to the host. Slider values are snapped to the
    /// control's step and clamped into its range first.
    pub fn set(&mut self, host: &mut H, name: &str, value: ControlValue) -> Result<()> {
        let Some(control) = self
            .controls
            .iter_mut()
            .find(|control| control.name == name)
        else {
            bail!("no panel control named {:?}", name);
        };
        let value = match (control.kind, value) {
            (ControlKind::Slider { min, max, step }, ControlValue::Number(number)) => {
                let snapped = if step > 0.0 {
                    (number / step).round() * step
                } else {
                    number
                };
                ControlValue::Number(snapped.clamp(min, max))
            }
            (ControlKind::Color, ControlValue::Color(rgb)) => ControlValue::Color(rgb),
            (kind, value) => {
                bail!("control {:?} ({:?}) cannot accept {:?}", name, kind, value)
            }
        };
        (control.apply)(host, value);
        Ok(())
    }

    /// Read the current value of a control from the host.
    pub fn get(&self, host: &H, name: &str) -> Option<ControlValue> {
        self.controls
            .iter()
            .find(|control| control.name == name)
            .map(|control| (control.read)(host))
    }

    /// Enumerate controls for a widget layer: name and kind, in
    /// registration order.
    pub fn controls(&self) -> impl Iterator<Item = (&str, ControlKind)> {
        self.controls
            .iter()
            .map(|control| (control.name.as_str(), control.kind))
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }
}

impl<H> Default for Panel<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Host {
        height: f32,
        tint: [f32; 3],
    }

    fn panel() -> Panel<Host> {
        let mut panel = Panel::new();
        panel.slider(
            "height",
            -15.0,
            15.0,
            0.01,
            |host: &Host| host.height,
            |host, value| host.height = value,
        );
        panel.color(
            "tint",
            |host: &Host| host.tint,
            |host, value| host.tint = value,
        );
        panel
    }

    #[test]
    fn slider_edits_reach_the_bound_property() {
        let mut host = Host {
            height: 0.0,
            tint: [1.0; 3],
        };
        let mut panel = panel();
        panel
            .set(&mut host, "height", ControlValue::Number(2.5))
            .unwrap();
        assert_eq!(host.height, 2.5);
        assert_eq!(
            panel.get(&host, "height"),
            Some(ControlValue::Number(2.5))
        );
    }

    #[test]
    fn slider_values_clamp_to_the_declared_range() {
        let mut host = Host {
            height: 0.0,
            tint: [1.0; 3],
        };
        let mut panel = panel();
        panel
            .set(&mut host, "height", ControlValue::Number(99.0))
            .unwrap();
        assert_eq!(host.height, 15.0);
        panel
            .set(&mut host, "height", ControlValue::Number(-99.0))
            .unwrap();
        assert_eq!(host.height, -15.0);
    }

    #[test]
    fn slider_values_snap_to_the_step() {
        let mut host = Host {
            height: 0.0,
            tint: [1.0; 3],
        };
        let mut panel = panel();
        panel
            .set(&mut host, "height", ControlValue::Number(1.2345))
            .unwrap();
        assert!((host.height - 1.23).abs() < 1e-6);
    }

    #[test]
    fn color_edits_pass_through() {
        let mut host = Host {
            height: 0.0,
            tint: [1.0; 3],
        };
        let mut panel = panel();
        panel
            .set(&mut host, "tint", ControlValue::Color([0.2, 0.3, 1.0]))
            .unwrap();
        assert_eq!(host.tint, [0.2, 0.3, 1.0]);
    }

    #[test]
    fn unknown_and_mismatched_controls_error() {
        let mut host = Host {
            height: 0.0,
            tint: [1.0; 3],
        };
        let mut panel = panel();
        assert!(
            panel
                .set(&mut host, "missing", ControlValue::Number(1.0))
                .is_err()
        );
        assert!(
            panel
                .set(&mut host, "height", ControlValue::Color([0.0; 3]))
                .is_err()
        );
        assert_eq!(host.height, 0.0);
    }

    #[test]
    fn panels_start_visible_and_can_hide() {
        let mut panel: Panel<Host> = Panel::new();
        assert!(panel.visible);
        panel.hide();
        assert!(!panel.visible);
    }
}
