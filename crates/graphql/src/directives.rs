//! Output directives.
//!
//! A directive is a pure transform over a field's settled value. The
//! dispatcher applies a field's pipeline after its resolver has produced a
//! value and before union discrimination, so directives never see pending
//! values, arguments, the request context or errors.

use std::{collections::HashMap, fmt, sync::Arc};

use serde_json::{Map, Value};

use crate::{descriptor::FieldDescriptor, dispatch::Resolved, error::SchemaError};

pub trait Directive: Send + Sync {
    fn name(&self) -> &str;

    /// Transform a non-null value. `None` means the directive does not apply
    /// to this shape and the value passes through unchanged.
    ///
    /// Must be idempotent: applying it to its own output changes nothing.
    fn transform(&self, value: &Value) -> Option<Value>;
}

type Factory =
    Arc<dyn Fn(&Map<String, Value>) -> Result<Arc<dyn Directive>, String> + Send + Sync>;

/// Directive implementations by name.
#[derive(Clone)]
pub struct DirectiveRegistry {
    factories: HashMap<String, Factory>,
}

impl Default for DirectiveRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for DirectiveRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("DirectiveRegistry")
            .field("directives", &names)
            .finish()
    }
}

impl DirectiveRegistry {
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// `@upper`, `@lower`, `@trim` and `@case(style:)`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register_plain(Case::UPPER);
        registry.register_plain(Case::LOWER);
        registry.register_plain(Trim);
        registry.register("case", |args| {
            let style = args
                .get("style")
                .and_then(Value::as_str)
                .ok_or("missing string argument `style`")?;
            match style {
                "UPPER" => Ok(Arc::new(Case::UPPER) as Arc<dyn Directive>),
                "LOWER" => Ok(Arc::new(Case::LOWER)),
                other => Err(format!("unknown style {other:?}")),
            }
        });
        registry
    }

    /// Register a directive built from its attachment arguments.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&Map<String, Value>) -> Result<Arc<dyn Directive>, String> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    /// Register an argument-less directive under its own name.
    pub fn register_plain<D: Directive + 'static>(&mut self, directive: D) {
        let name = directive.name().to_string();
        let directive: Arc<dyn Directive> = Arc::new(directive);
        self.register(name, move |_| Ok(Arc::clone(&directive)));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Build the pipeline for every directive attached to `field`.
    pub fn instantiate(&self, field: &FieldDescriptor) -> Result<DirectivePipeline, SchemaError> {
        let mut stages = Vec::with_capacity(field.directives.len());
        for attachment in &field.directives {
            let factory =
                self.factories
                    .get(&attachment.name)
                    .ok_or_else(|| SchemaError::UnknownDirective {
                        field: field.coordinate(),
                        directive: attachment.name.clone(),
                    })?;
            let stage = factory(&attachment.arguments).map_err(|message| {
                SchemaError::InvalidDirectiveArguments {
                    field: field.coordinate(),
                    directive: attachment.name.clone(),
                    message,
                }
            })?;
            stages.push(Stage {
                name: attachment.name.clone(),
                directive: stage,
            });
        }
        Ok(DirectivePipeline { stages })
    }
}

/// The ordered directives of one field.
#[derive(Clone, Default)]
pub struct DirectivePipeline {
    stages: Vec<Stage>,
}

/// A directive instance under the name it was attached with.
#[derive(Clone)]
struct Stage {
    name: String,
    directive: Arc<dyn Directive>,
}

impl fmt::Debug for DirectivePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.stages.iter().map(|s| &s.name))
            .finish()
    }
}

impl DirectivePipeline {
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(|s| s.name.as_str())
    }

    /// Run every stage in declaration order. Only plain non-null values are
    /// offered to the stages; null, list and tagged results pass through.
    pub fn apply(&self, resolved: Resolved) -> Resolved {
        match resolved {
            Resolved::Value(value) if !value.is_null() => {
                Resolved::Value(self.stages.iter().fold(value, |value, stage| {
                    stage.directive.transform(&value).unwrap_or(value)
                }))
            },
            other => other,
        }
    }
}

// ── Built-in directives ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaseStyle {
    Upper,
    Lower,
}

#[derive(Debug, Clone, Copy)]
struct Case(CaseStyle);

impl Case {
    const LOWER: Self = Self(CaseStyle::Lower);
    const UPPER: Self = Self(CaseStyle::Upper);
}

impl Directive for Case {
    fn name(&self) -> &str {
        match self.0 {
            CaseStyle::Upper => "upper",
            CaseStyle::Lower => "lower",
        }
    }

    fn transform(&self, value: &Value) -> Option<Value> {
        let s = value.as_str()?;
        Some(Value::String(match self.0 {
            CaseStyle::Upper => s.to_uppercase(),
            CaseStyle::Lower => s.to_lowercase(),
        }))
    }
}

#[derive(Debug, Clone, Copy)]
struct Trim;

impl Directive for Trim {
    fn name(&self) -> &str {
        "trim"
    }

    fn transform(&self, value: &Value) -> Option<Value> {
        Some(Value::String(value.as_str()?.trim().to_string()))
    }
}
