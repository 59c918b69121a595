//! Stage output validation.
//!
//! Every stage that parses model JSON runs it through an [`OutputShape`]
//! under a [`ValidationPolicy`]. Summaries are always checked strictly;
//! persona strictness is configurable.

use serde_json::Value;

use postforge_shared::{PersonaPolicy, PostforgeError, Result};

/// How much of the shape is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationPolicy {
    /// Every field present with the expected kind.
    Strict,
    /// Any non-empty value.
    Loose,
}

impl From<PersonaPolicy> for ValidationPolicy {
    fn from(policy: PersonaPolicy) -> Self {
        match policy {
            PersonaPolicy::Strict => Self::Strict,
            PersonaPolicy::Loose => Self::Loose,
        }
    }
}

/// Expected JSON kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Non-blank string.
    Text,
    /// Array whose items are all strings.
    TextList,
    /// Finite number.
    Number,
}

/// A required field and the alternative spellings backends use for it.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub kind: FieldKind,
}

impl FieldSpec {
    const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            aliases: &[],
            kind,
        }
    }

    const fn with_aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    fn lookup<'a>(&self, object: &'a serde_json::Map<String, Value>) -> Option<&'a Value> {
        std::iter::once(self.name)
            .chain(self.aliases.iter().copied())
            .find_map(|key| object.get(key))
    }
}

/// The required fields of one stage's output.
#[derive(Debug, Clone, Copy)]
pub struct OutputShape {
    pub stage: &'static str,
    pub fields: &'static [FieldSpec],
}

pub const SUMMARY_SHAPE: OutputShape = OutputShape {
    stage: "summarize",
    fields: &[
        FieldSpec::new("overview", FieldKind::Text),
        FieldSpec::new("keyPoints", FieldKind::TextList)
            .with_aliases(&["key_points", "detailed_key_points"]),
        FieldSpec::new("conclusion", FieldKind::Text),
    ],
};

pub const PERSONA_SHAPE: OutputShape = OutputShape {
    stage: "derive_persona",
    fields: &[
        FieldSpec::new("name", FieldKind::Text),
        FieldSpec::new("age", FieldKind::Number),
        FieldSpec::new("gender", FieldKind::Text),
        FieldSpec::new("interests", FieldKind::TextList),
        FieldSpec::new("behaviors", FieldKind::TextList),
        FieldSpec::new("painPoints", FieldKind::TextList).with_aliases(&["pain_points"]),
        FieldSpec::new("goals", FieldKind::TextList),
        FieldSpec::new("challenges", FieldKind::TextList),
        FieldSpec::new("preferredChannels", FieldKind::TextList)
            .with_aliases(&["preferred_channels"]),
    ],
};

pub const SUBREDDITS_SHAPE: OutputShape = OutputShape {
    stage: "suggest_subreddits",
    fields: &[FieldSpec::new("subreddits", FieldKind::TextList)],
};

impl OutputShape {
    /// Validate `value` under `policy`.
    pub fn check(&self, value: &Value, policy: ValidationPolicy) -> Result<()> {
        match policy {
            ValidationPolicy::Loose => self.check_loose(value),
            ValidationPolicy::Strict => self.check_strict(value),
        }
    }

    /// Same as [`check`](Self::check) but reported against another stage.
    pub fn check_as(
        &self,
        stage: &'static str,
        value: &Value,
        policy: ValidationPolicy,
    ) -> Result<()> {
        OutputShape { stage, ..*self }.check(value, policy)
    }

    fn check_loose(&self, value: &Value) -> Result<()> {
        if is_empty_value(value) {
            return Err(PostforgeError::schema(self.stage, "output is empty"));
        }
        Ok(())
    }

    fn check_strict(&self, value: &Value) -> Result<()> {
        let object = value
            .as_object()
            .ok_or_else(|| PostforgeError::schema(self.stage, "output is not a JSON object"))?;

        for field in self.fields {
            let found = field.lookup(object).ok_or_else(|| {
                PostforgeError::schema(self.stage, format!("missing field `{}`", field.name))
            })?;
            if !kind_matches(found, field.kind) {
                return Err(PostforgeError::schema(
                    self.stage,
                    format!("field `{}` is not {}", field.name, describe(field.kind)),
                ));
            }
        }
        Ok(())
    }
}

fn kind_matches(value: &Value, kind: FieldKind) -> bool {
    match kind {
        FieldKind::Text => value.as_str().is_some_and(|s| !s.trim().is_empty()),
        FieldKind::TextList => value
            .as_array()
            .is_some_and(|items| items.iter().all(Value::is_string)),
        FieldKind::Number => value.as_f64().is_some_and(f64::is_finite),
    }
}

fn describe(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Text => "a non-empty string",
        FieldKind::TextList => "an array of strings",
        FieldKind::Number => "a number",
    }
}

/// Null, blank strings, and empty arrays/objects carry nothing.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
