//! Object descriptions: free-form dictionaries and fixed-field literals.

use super::{ConfigDescription, Description, Fallback, Input, ParseResult, ParserContext, settle};
use crate::error::Expected;
use crate::result::ConfigResult;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Object with arbitrary keys sharing one value description. Keys are
/// merged one by one with the inherited dictionary; a `null` value removes
/// the inherited key.
pub struct DictionaryDescription {
    value: Description,
}

impl DictionaryDescription {
    pub fn new(value: Description) -> Self {
        Self { value }
    }

    fn merge(&self, fields: &Map<String, Value>, context: &ParserContext) -> ParseResult {
        let mut children = context
            .parent
            .as_ref()
            .and_then(|parent| parent.entries())
            .unwrap_or_default();
        for (key, value) in fields {
            if value.is_null() {
                children.shift_remove(key);
                continue;
            }
            let inherited = children.get(key).cloned();
            match self.value.parse(Some(value), &context.for_key(key, inherited))? {
                Some(child) => {
                    children.insert(key.clone(), child);
                }
                None => {
                    children.shift_remove(key);
                }
            }
        }
        Ok(Some(Arc::new(ConfigResult::object(children))))
    }
}

impl ConfigDescription for DictionaryDescription {
    fn parse(&self, data: Option<&Value>, context: &ParserContext) -> ParseResult {
        match settle(data, context, Fallback::Mandatory) {
            Input::Present(Value::Object(fields)) => self.merge(fields, context),
            Input::Present(_) => Err(context.expected(Expected::Object)),
            Input::Settled(result) => result,
        }
    }
}

/// Object with a fixed set of fields, each with its own description.
/// Unknown input fields are ignored.
pub struct LiteralDescription {
    fields: Vec<(String, Description)>,
}

impl LiteralDescription {
    pub fn new(fields: impl IntoIterator<Item = (String, Description)>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
        }
    }

    fn merge(&self, data: Option<&Map<String, Value>>, context: &ParserContext) -> ParseResult {
        let inherited = context
            .parent
            .as_ref()
            .and_then(|parent| parent.entries())
            .unwrap_or_default();
        let mut children = IndexMap::new();
        for (key, description) in &self.fields {
            let value = data.and_then(|fields| fields.get(key));
            let child_context = context.for_key(key, inherited.get(key).cloned());
            if let Some(child) = description.parse(value, &child_context)? {
                children.insert(key.clone(), child);
            }
        }
        Ok(Some(Arc::new(ConfigResult::object(children))))
    }
}

impl ConfigDescription for LiteralDescription {
    fn parse(&self, data: Option<&Value>, context: &ParserContext) -> ParseResult {
        // Without data nor parent, the object is built from its fields alone,
        // which lets an object made of optional fields be omitted.
        if data.is_none() && context.parent.is_none() {
            return self.merge(None, context);
        }
        match settle(data, context, Fallback::Mandatory) {
            Input::Present(Value::Object(fields)) => self.merge(Some(fields), context),
            Input::Present(_) => Err(context.expected(Expected::Object)),
            Input::Settled(result) => result,
        }
    }
}
