//! Object definitions as seen by the tool mode system.
//!
//! The host object model owns the real item/block types; this crate only needs each
//! definition's code, its class and the declarative `toolmodegroup` / `toolmodes`
//! metadata.

use serde::{Deserialize, Serialize};

use crate::code::{AssetCode, GroupCode, ModeCode, ObjectCode};
use crate::errors::ToolModeError;

/// Item-class discriminator. Selections for items and blocks live in separate trees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemClass {
    #[default]
    Item,
    Block,
}

/// One entry of an object's `toolmodes` list: either a bare code string or
/// `{ "name": code, "properties": {...} }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ModeDeclaration {
    Code(String),
    Configured {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        properties: Option<serde_json::Value>,
    },
}

impl ModeDeclaration {
    pub fn name(&self) -> &str {
        match self {
            ModeDeclaration::Code(name) => name,
            ModeDeclaration::Configured { name, .. } => name,
        }
    }

    pub fn properties(&self) -> Option<&serde_json::Value> {
        match self {
            ModeDeclaration::Code(_) => None,
            ModeDeclaration::Configured { properties, .. } => properties.as_ref(),
        }
    }
}

/// Tool mode metadata attached to an object definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModeAttributes {
    #[serde(default, rename = "toolmodegroup", skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, rename = "toolmodes", skip_serializing_if = "Vec::is_empty")]
    pub modes: Vec<ModeDeclaration>,
}

/// An item or block type known to the host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectDefinition {
    pub code: ObjectCode,
    #[serde(default)]
    pub class: ItemClass,
    #[serde(default)]
    pub attributes: ModeAttributes,
}

impl ObjectDefinition {
    pub fn item(code: ObjectCode) -> Self {
        Self {
            code,
            class: ItemClass::Item,
            attributes: ModeAttributes::default(),
        }
    }

    pub fn block(code: ObjectCode) -> Self {
        Self {
            code,
            class: ItemClass::Block,
            attributes: ModeAttributes::default(),
        }
    }

    pub fn with_group(mut self, group: &str) -> Self {
        self.attributes.group = Some(group.to_string());
        self
    }

    pub fn with_mode(mut self, code: &str) -> Self {
        self.attributes
            .modes
            .push(ModeDeclaration::Code(code.to_string()));
        self
    }

    pub fn with_configured_mode(mut self, code: &str, properties: serde_json::Value) -> Self {
        self.attributes.modes.push(ModeDeclaration::Configured {
            name: code.to_string(),
            properties: Some(properties),
        });
        self
    }

    /// Declared group, resolved relative to this object's domain.
    pub fn group_code(&self) -> Result<Option<GroupCode>, ToolModeError> {
        self.attributes
            .group
            .as_deref()
            .map(|g| AssetCode::parse_with_domain(g, self.code.domain()))
            .transpose()
    }

    /// Item-specific mode codes with their configuration, in declaration order.
    pub fn declared_modes(
        &self,
    ) -> Result<Vec<(ModeCode, Option<&serde_json::Value>)>, ToolModeError> {
        self.attributes
            .modes
            .iter()
            .map(|decl| {
                let code = AssetCode::parse_with_domain(decl.name(), self.code.domain())?;
                Ok((code, decl.properties()))
            })
            .collect()
    }

    pub fn declares_modes(&self) -> bool {
        self.attributes.group.is_some() || !self.attributes.modes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_codes_resolve_in_object_domain() {
        let def = ObjectDefinition::item(AssetCode::parse("farming:scythe-copper").unwrap())
            .with_group("item-scythe")
            .with_mode("game:scythe-flatten");
        assert_eq!(
            def.group_code().unwrap().unwrap().to_string(),
            "farming:item-scythe"
        );
        let modes = def.declared_modes().unwrap();
        assert_eq!(modes[0].0.to_string(), "game:scythe-flatten");
    }

    #[test]
    fn parses_both_declaration_shapes() {
        let json = r#"{
            "code": "game:clay-blue",
            "attributes": {
                "toolmodegroup": "item-clay",
                "toolmodes": ["clay-smooth", {"name": "clay-stamp", "properties": {"pattern": "star"}}]
            }
        }"#;
        let def: ObjectDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(def.class, ItemClass::Item);
        let modes = def.declared_modes().unwrap();
        assert_eq!(modes.len(), 2);
        assert!(modes[0].1.is_none());
        assert_eq!(modes[1].1.unwrap()["pattern"], "star");
    }
}
