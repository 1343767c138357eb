//! Array descriptions. Merging concatenates the inherited elements before
//! the new ones.

use super::{ConfigDescription, Description, Fallback, Input, ParseResult, ParserContext, settle};
use crate::error::Expected;
use crate::result::ConfigResult;
use serde_json::Value;
use std::sync::Arc;

pub struct ArrayDescription {
    element: Description,
}

impl ArrayDescription {
    pub fn new(element: Description) -> Self {
        Self { element }
    }

    fn merge(&self, items: &[Value], context: &ParserContext) -> ParseResult {
        let mut children = context
            .parent
            .as_ref()
            .and_then(|parent| parent.elements())
            .unwrap_or_default();
        for (index, item) in items.iter().enumerate() {
            if let Some(child) = self.element.parse(Some(item), &context.for_index(index))? {
                children.push(child);
            }
        }
        Ok(Some(Arc::new(ConfigResult::array(children))))
    }
}

impl ConfigDescription for ArrayDescription {
    fn parse(&self, data: Option<&Value>, context: &ParserContext) -> ParseResult {
        match settle(data, context, Fallback::Mandatory) {
            Input::Present(Value::Array(items)) => self.merge(items, context),
            Input::Present(_) => Err(context.expected(Expected::Array)),
            Input::Settled(result) => result,
        }
    }
}

/// Array that also accepts a single bare element.
pub struct SingleOrArrayDescription {
    inner: ArrayDescription,
}

impl SingleOrArrayDescription {
    pub fn new(element: Description) -> Self {
        Self {
            inner: ArrayDescription::new(element),
        }
    }
}

impl ConfigDescription for SingleOrArrayDescription {
    fn parse(&self, data: Option<&Value>, context: &ParserContext) -> ParseResult {
        match settle(data, context, Fallback::Mandatory) {
            Input::Present(Value::Array(items)) => self.inner.merge(items, context),
            Input::Present(single) => self.inner.merge(std::slice::from_ref(single), context),
            Input::Settled(result) => result,
        }
    }
}
