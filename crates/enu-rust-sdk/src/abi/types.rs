//! ABI document model.
//!
//! An ABI describes a contract's types, structs, and actions. Documents are
//! validated on entry so the encoder can assume a well-formed schema.

use crate::error::{EnuError, EnuResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// One field of an ABI struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbiField {
    /// Field name as it appears in action payloads.
    pub name: String,
    /// ABI type of the field, possibly an alias, array, or optional.
    #[serde(rename = "type")]
    pub type_name: String,
}

/// A struct definition: named fields, optionally inheriting a base struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbiStruct {
    /// Struct name.
    pub name: String,
    /// Base struct whose fields precede this struct's fields, if any.
    #[serde(default)]
    pub base: String,
    /// Ordered field list.
    #[serde(default)]
    pub fields: Vec<AbiField>,
}

/// A type alias: `new_type_name` stands for `type_name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbiTypeAlias {
    /// The alias being introduced.
    pub new_type_name: String,
    /// What it resolves to.
    #[serde(rename = "type")]
    pub type_name: String,
}

/// An action entry mapping an action name to its payload struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbiAction {
    /// Action name.
    pub name: String,
    /// The struct encoding this action's payload.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Ricardian contract text, if the contract ships one.
    #[serde(default)]
    pub ricardian_contract: String,
}

/// A validated contract ABI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Abi {
    /// ABI version string.
    #[serde(default)]
    pub version: String,
    /// Type aliases.
    #[serde(default)]
    pub types: Vec<AbiTypeAlias>,
    /// Struct definitions.
    #[serde(default)]
    pub structs: Vec<AbiStruct>,
    /// Action entries.
    #[serde(default)]
    pub actions: Vec<AbiAction>,
}

impl Abi {
    /// Parses and validates an ABI from a JSON value.
    pub fn from_value(account: &str, value: &Value) -> EnuResult<Self> {
        let abi: Abi = serde_json::from_value(value.clone())
            .map_err(|e| EnuError::invalid_abi(account, e.to_string()))?;
        abi.validate(account)?;
        Ok(abi)
    }

    /// Parses and validates an ABI from raw JSON bytes.
    pub fn from_bytes(account: &str, bytes: &[u8]) -> EnuResult<Self> {
        let abi: Abi = serde_json::from_slice(bytes)
            .map_err(|e| EnuError::invalid_abi(account, e.to_string()))?;
        abi.validate(account)?;
        Ok(abi)
    }

    fn validate(&self, account: &str) -> EnuResult<()> {
        let mut seen = HashSet::new();
        for def in &self.structs {
            if !seen.insert(def.name.as_str()) {
                return Err(EnuError::invalid_abi(
                    account,
                    format!("duplicate struct `{}`", def.name),
                ));
            }
        }
        for alias in &self.types {
            let mut current = alias.type_name.as_str();
            let mut steps = 0;
            while let Some(next) = self.types.iter().find(|t| t.new_type_name == current) {
                current = &next.type_name;
                steps += 1;
                if steps > self.types.len() {
                    return Err(EnuError::invalid_abi(
                        account,
                        format!("type alias cycle at `{}`", alias.new_type_name),
                    ));
                }
            }
        }
        for action in &self.actions {
            let resolved = self.resolve_type(&action.type_name);
            if self.struct_def(resolved).is_none() {
                return Err(EnuError::invalid_abi(
                    account,
                    format!(
                        "action `{}` references unknown type `{}`",
                        action.name, action.type_name
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Follows type aliases until a concrete type name is reached.
    pub fn resolve_type<'a>(&'a self, name: &'a str) -> &'a str {
        let mut current = name;
        // validation rejected cycles, the loop bound is belt and braces
        for _ in 0..=self.types.len() {
            match self.types.iter().find(|t| t.new_type_name == current) {
                Some(alias) => current = &alias.type_name,
                None => break,
            }
        }
        current
    }

    /// Looks up a struct definition by exact name.
    pub fn struct_def(&self, name: &str) -> Option<&AbiStruct> {
        self.structs.iter().find(|s| s.name == name)
    }

    /// Returns the payload struct for an action, if the action exists.
    pub fn action_struct(&self, action: &str) -> Option<&AbiStruct> {
        let entry = self.actions.iter().find(|a| a.name == action)?;
        self.struct_def(self.resolve_type(&entry.type_name))
    }

    /// Returns true if the contract declares the action.
    pub fn has_action(&self, action: &str) -> bool {
        self.actions.iter().any(|a| a.name == action)
    }

    /// Names of all declared actions.
    pub fn action_names(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.name.as_str()).collect()
    }
}
