use super::store::RigHierarchy;
use crate::{ControlSettings, ControlValue, ControlValueKind, TransformKind};

impl RigHierarchy {
    pub fn control_settings(&self, index: usize) -> Option<&ControlSettings> {
        self.control_element(index).map(|control| &control.settings)
    }

    /// Value of a control in its native representation, or `None` for non-controls.
    /// Current and initial values are read back from the local pose.
    pub fn get_control_value(&mut self, index: usize, kind: ControlValueKind) -> Option<ControlValue> {
        let settings = &self.control_element(index)?.settings;
        let (control_type, primary_axis) = (settings.control_type, settings.primary_axis);
        let local_kind = match kind {
            ControlValueKind::Minimum => return Some(settings.minimum_value),
            ControlValueKind::Maximum => return Some(settings.maximum_value),
            ControlValueKind::Current => TransformKind::CurrentLocal,
            ControlValueKind::Initial => TransformKind::InitialLocal,
        };
        let local = self.get_transform(index, local_kind);
        Some(ControlValue::from_transform(&local, control_type, primary_axis))
    }

    /// Current and initial values are clamped to the control's limits and written as its
    /// local pose, children follow. Minimum and maximum values update the settings.
    pub fn set_control_value(
        &mut self,
        index: usize,
        value: ControlValue,
        kind: ControlValueKind,
        setup_undo: bool,
        force: bool,
    ) {
        let Some(control) = self.control_element(index) else {
            return;
        };
        let local_kind = match kind {
            ControlValueKind::Current => TransformKind::CurrentLocal,
            ControlValueKind::Initial => TransformKind::InitialLocal,
            ControlValueKind::Minimum | ControlValueKind::Maximum => {
                let mut settings = control.settings.clone();
                if kind == ControlValueKind::Minimum {
                    settings.minimum_value = value;
                } else {
                    settings.maximum_value = value;
                }
                self.set_control_settings(index, settings, force);
                return;
            }
        };

        let mut value = value;
        control.settings.apply_limits(&mut value);
        let local = value.to_transform(control.settings.primary_axis);
        self.set_transform(index, local, local_kind, true, setup_undo, force);
    }

    pub fn set_control_settings(&mut self, index: usize, settings: ControlSettings, force: bool) {
        let Some(control) = self.control_element_mut(index) else {
            return;
        };
        if !force && control.settings == settings {
            return;
        }
        control.settings = settings.clone();
        self.broadcast(index, None, |key, listener| {
            if let Some(target) = listener.get_index(key) {
                listener.set_control_settings(target, settings.clone(), force);
            }
        });
    }

    pub fn set_control_visibility(&mut self, index: usize, visible: bool) {
        let Some(control) = self.control_element_mut(index) else {
            return;
        };
        if control.settings.gizmo_visible == visible {
            return;
        }
        control.settings.gizmo_visible = visible;
        self.broadcast(index, None, |key, listener| {
            if let Some(target) = listener.get_index(key) {
                listener.set_control_visibility(target, visible);
            }
        });
    }
}
