//! Modes that carry display data only.
//!
//! [`LabelMode`] never intercepts an event. It lets a host (or the `toolmodes` binary)
//! declare selectable modes in configuration and react to the resolved code itself.

use serde::{Deserialize, Serialize};

use crate::code::ModeCode;
use crate::errors::ToolModeError;
use crate::mode::{DisplayDescriptor, InteractionHint, ToolMode};
use crate::registry::ModeRegistry;

/// Configuration entry for one label mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelModeConfig {
    pub code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotkey: Option<String>,
    /// Help line shown while the mode is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LabelMode {
    display: DisplayDescriptor,
    help: Option<String>,
}

impl LabelMode {
    pub fn new(display: DisplayDescriptor) -> Self {
        Self { display, help: None }
    }

    pub fn from_config(config: &LabelModeConfig) -> Self {
        let mut display = DisplayDescriptor::new(config.name.clone());
        display.icon = config.icon.clone();
        display.hotkey = config.hotkey.clone();
        Self {
            display,
            help: config.help.clone(),
        }
    }
}

impl ToolMode for LabelMode {
    /// Per-object properties may rename the mode: `{ "name": "..." }`.
    fn initialize(&mut self, properties: &serde_json::Value) -> Result<(), String> {
        match properties.get("name") {
            None => Ok(()),
            Some(serde_json::Value::String(name)) if !name.trim().is_empty() => {
                self.display.name = name.clone();
                Ok(())
            }
            Some(other) => Err(format!("'name' must be a non-empty string, got {}", other)),
        }
    }

    fn display(&self) -> DisplayDescriptor {
        self.display.clone()
    }

    fn interaction_help(&self) -> Vec<InteractionHint> {
        self.help.iter().map(|h| InteractionHint::new(h.as_str())).collect()
    }
}

/// Register one constructor per configured label mode.
pub fn register_label_modes(
    registry: &mut ModeRegistry,
    configs: &[LabelModeConfig],
    default_domain: &str,
) -> Result<Vec<ModeCode>, ToolModeError> {
    let mut codes = Vec::with_capacity(configs.len());
    for config in configs {
        let code = ModeCode::parse_with_domain(&config.code, default_domain)?;
        let template = LabelMode::from_config(config);
        registry.register_mode_fn(code.clone(), move |_| Box::new(template.clone()))?;
        codes.push(code);
    }
    Ok(codes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(code: &str, name: &str) -> LabelModeConfig {
        LabelModeConfig {
            code: code.into(),
            name: name.into(),
            icon: None,
            hotkey: None,
            help: Some("heldhelp-trim".into()),
        }
    }

    #[test]
    fn registers_each_config_once() {
        let mut reg = ModeRegistry::new();
        let codes = register_label_modes(&mut reg, &[config("trim", "Trim"), config("mod:cut", "Cut")], "game")
            .unwrap();
        assert_eq!(codes[0].to_string(), "game:trim");
        assert_eq!(codes[1].to_string(), "mod:cut");
        assert!(matches!(
            register_label_modes(&mut reg, &[config("trim", "Again")], "game"),
            Err(ToolModeError::DuplicateRegistration(_))
        ));
    }

    #[test]
    fn properties_rename_the_mode() {
        let mut mode = LabelMode::from_config(&config("trim", "Trim"));
        mode.initialize(&serde_json::json!({"name": "Shear"})).unwrap();
        assert_eq!(mode.display().name, "Shear");
        assert!(mode.initialize(&serde_json::json!({"name": 3})).is_err());
        assert_eq!(mode.interaction_help()[0].action, "heldhelp-trim");
    }
}
