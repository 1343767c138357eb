//! Schema descriptions: composable rules that validate raw configuration
//! data, coerce it, apply defaults and merge it with an inherited result.
//!
//! Every node follows the same decision order:
//! 1. data present and not null: validate it and build a result tagged
//!    with the current file name;
//! 2. data absent with a parent result: return the parent unchanged;
//! 3. not the final round: return nothing, a later round may provide data;
//! 4. final round: use the default value, or fail with a missing mandatory
//!    option error.
//!
//! An explicit `null` never inherits: it clears the parent value.

mod array;
mod leaf;
mod object;
mod wrappers;

pub use array::{ArrayDescription, SingleOrArrayDescription};
pub use leaf::{
    AnyKind, BooleanKind, ChoiceKind, LeafDescription, LeafKind, NumberKind, StringKind,
    parse_boolean,
};
pub use object::{DictionaryDescription, LiteralDescription};
pub use wrappers::{ConditionalDescription, DefaultValueDescription, OverrideDescription, Predicate};

use crate::error::{ConfinodeError, Expected};
use crate::result::ConfigResult;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// Outcome of a parse: `Ok(None)` means nothing is defined (yet).
pub type ParseResult = Result<Option<Arc<ConfigResult>>, ConfinodeError>;

/// A node of the configuration description.
pub trait ConfigDescription: Send + Sync {
    /// Parse `data` (`None` when the entry is absent) in the given context.
    fn parse(&self, data: Option<&Value>, context: &ParserContext) -> ParseResult;
}

/// Shared handle to a description node.
pub type Description = Arc<dyn ConfigDescription>;

/// Context of one parse call. Child nodes get a derived context.
#[derive(Debug, Clone)]
pub struct ParserContext {
    /// Path of the entry, for error messages (`server.hosts[2]`).
    pub key_name: String,
    pub file_name: PathBuf,
    /// Result merged from previously loaded files.
    pub parent: Option<Arc<ConfigResult>>,
    /// True on the last merge round only.
    pub is_final: bool,
}

impl ParserContext {
    /// Root context for the given file: empty key name, no parent, final round.
    pub fn new(file_name: impl Into<PathBuf>) -> Self {
        Self {
            key_name: String::new(),
            file_name: file_name.into(),
            parent: None,
            is_final: true,
        }
    }

    pub fn with_key_name(mut self, key_name: impl Into<String>) -> Self {
        self.key_name = key_name.into();
        self
    }

    pub fn with_parent(mut self, parent: Option<Arc<ConfigResult>>) -> Self {
        self.parent = parent;
        self
    }

    pub fn with_final(mut self, is_final: bool) -> Self {
        self.is_final = is_final;
        self
    }

    /// Context for an object entry: `prefix.key`, or `key` at the root.
    pub fn for_key(&self, key: &str, parent: Option<Arc<ConfigResult>>) -> Self {
        let key_name = if self.key_name.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.key_name, key)
        };
        Self {
            key_name,
            file_name: self.file_name.clone(),
            parent,
            is_final: self.is_final,
        }
    }

    /// Context for an array element. Elements never inherit individually.
    pub fn for_index(&self, index: usize) -> Self {
        Self {
            key_name: format!("{}[{}]", self.key_name, index),
            file_name: self.file_name.clone(),
            parent: None,
            is_final: self.is_final,
        }
    }

    pub fn without_parent(&self) -> Self {
        Self {
            parent: None,
            ..self.clone()
        }
    }

    pub fn missing_mandatory(&self) -> ConfinodeError {
        ConfinodeError::missing_mandatory(&self.key_name)
    }

    pub fn expected(&self, expected: Expected) -> ConfinodeError {
        ConfinodeError::expected(&self.key_name, &self.file_name, expected)
    }

    /// Direct result holding `value`, tagged with the current file.
    pub(crate) fn direct(&self, value: Value) -> Arc<ConfigResult> {
        Arc::new(ConfigResult::direct(value, Some(&self.file_name)))
    }
}

/// What a node supplies on the final round when no data is given.
#[derive(Clone, Copy)]
pub(crate) enum Fallback<'a> {
    Mandatory,
    Value(&'a Value),
    /// The entry is left undefined.
    Absent,
}

pub(crate) enum Input<'a> {
    /// Non-null data the node has to validate.
    Present(&'a Value),
    /// Absent or null data, already resolved.
    Settled(ParseResult),
}

/// Apply the common rules for absent and null data.
pub(crate) fn settle<'a>(
    data: Option<&'a Value>,
    context: &ParserContext,
    fallback: Fallback<'_>,
) -> Input<'a> {
    match data {
        Some(Value::Null) => {}
        Some(value) => return Input::Present(value),
        None => {
            if let Some(parent) = &context.parent {
                return Input::Settled(Ok(Some(parent.clone())));
            }
        }
    }
    if !context.is_final {
        return Input::Settled(Ok(None));
    }
    Input::Settled(match (data, fallback) {
        (None, Fallback::Value(value)) => Ok(Some(Arc::new(ConfigResult::direct(
            value.clone(),
            None,
        )))),
        (None, Fallback::Absent) => Ok(None),
        _ => Err(context.missing_mandatory()),
    })
}

/// Accept any value unchanged.
pub fn any_item() -> Description {
    Arc::new(LeafDescription::new(AnyKind, None))
}

/// Boolean entry, always defaulted.
pub fn boolean_item(default: bool) -> Description {
    Arc::new(LeafDescription::new(BooleanKind, Some(Value::Bool(default))))
}

pub fn number_item(default: Option<f64>) -> Description {
    Arc::new(LeafDescription::new(
        NumberKind,
        default.map(leaf::number_value),
    ))
}

pub fn string_item(default: Option<&str>) -> Description {
    Arc::new(LeafDescription::new(
        StringKind,
        default.map(|value| Value::String(value.to_string())),
    ))
}

/// Entry restricted to a set of string or number literals.
pub fn choice_item<I, V>(choices: I, default: Option<Value>) -> Description
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    Arc::new(LeafDescription::new(
        ChoiceKind::new(choices.into_iter().map(Into::into).collect()),
        default,
    ))
}

pub fn array(description: Description) -> Description {
    Arc::new(ArrayDescription::new(description))
}

pub fn single_or_array(description: Description) -> Description {
    Arc::new(SingleOrArrayDescription::new(description))
}

pub fn dictionary(description: Description) -> Description {
    Arc::new(DictionaryDescription::new(description))
}

/// Object with fixed fields, in declaration order.
pub fn literal<I, K>(fields: I) -> Description
where
    I: IntoIterator<Item = (K, Description)>,
    K: Into<String>,
{
    Arc::new(LiteralDescription::new(
        fields.into_iter().map(|(key, description)| (key.into(), description)),
    ))
}

pub fn conditional(
    predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
    if_description: Description,
    else_description: Description,
) -> Description {
    Arc::new(ConditionalDescription::new(
        Arc::new(predicate),
        if_description,
        else_description,
    ))
}

pub fn default_value(description: Description, value: Value) -> Description {
    Arc::new(DefaultValueDescription::new(description, Some(value)))
}

/// Entry that stays undefined when no file provides it.
pub fn optional(description: Description) -> Description {
    Arc::new(DefaultValueDescription::new(description, None))
}

/// Entry replacing the inherited value instead of merging with it.
pub fn overriding(description: Description) -> Description {
    Arc::new(OverrideDescription::new(description))
}
