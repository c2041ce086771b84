//! Schema descriptor: the declared types, fields, arguments and directive
//! attachments the engine resolves against.
//!
//! A descriptor is built once with [`SchemaDescriptor::builder`], validated,
//! and then shared read-only (`Arc`) by the dispatcher and the mounted
//! schema. Type references use the familiar `Name`, `[Name]`, `Name!` syntax.

use std::{collections::HashMap, fmt, str::FromStr, sync::Arc};

use serde_json::{Map, Value};

use crate::error::SchemaError;

/// Scalars every schema understands without declaring them.
pub const BUILTIN_SCALARS: &[&str] = &["String", "Int", "Float", "Boolean", "ID", UPLOAD];

/// The file-upload scalar. Arguments of this type are handed to resolvers as
/// pending uploads rather than JSON values.
pub const UPLOAD: &str = "Upload";

// ── Type references ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Named(String),
    NonNull(Box<TypeRef>),
    List(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    #[must_use]
    pub fn non_null(self) -> Self {
        match self {
            Self::NonNull(_) => self,
            other => Self::NonNull(Box::new(other)),
        }
    }

    #[must_use]
    pub fn list(self) -> Self {
        Self::List(Box::new(self))
    }

    /// The named type at the bottom of all wrappers.
    pub fn base_name(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::NonNull(inner) | Self::List(inner) => inner.base_name(),
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }

    /// The type with an outer non-null wrapper removed.
    pub fn nullable(&self) -> &TypeRef {
        match self {
            Self::NonNull(inner) => inner,
            other => other,
        }
    }

    /// Element type if this is a (possibly non-null) list.
    pub fn list_item(&self) -> Option<&TypeRef> {
        match self.nullable() {
            Self::List(inner) => Some(inner),
            _ => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::NonNull(inner) => write!(f, "{inner}!"),
            Self::List(inner) => write!(f, "[{inner}]"),
        }
    }
}

impl FromStr for TypeRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(inner) = s.strip_suffix('!') {
            let inner: TypeRef = inner.parse()?;
            if inner.is_non_null() {
                return Err(format!("double non-null in {s:?}"));
            }
            return Ok(inner.non_null());
        }
        if let Some(rest) = s.strip_prefix('[') {
            let inner = rest
                .strip_suffix(']')
                .ok_or_else(|| format!("unbalanced brackets in {s:?}"))?;
            return Ok(inner.parse::<TypeRef>()?.list());
        }
        let valid = s.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid {
            Ok(Self::named(s))
        } else {
            Err(format!("{s:?} is not a type name"))
        }
    }
}

// ── Fields ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentDescriptor {
    pub name: String,
    pub ty: TypeRef,
}

/// A directive attached to a field, with its literal arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveAttachment {
    pub name: String,
    pub arguments: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub parent_type: String,
    pub name: String,
    pub ty: TypeRef,
    pub arguments: Vec<ArgumentDescriptor>,
    /// Applied in this order.
    pub directives: Vec<DirectiveAttachment>,
    /// Event topic; only meaningful on subscription root fields.
    pub topic: Option<String>,
}

impl FieldDescriptor {
    pub fn argument(&self, name: &str) -> Option<&ArgumentDescriptor> {
        self.arguments.iter().find(|a| a.name == name)
    }

    /// Topic a subscription field listens on; defaults to the field name.
    pub fn topic(&self) -> &str {
        self.topic.as_deref().unwrap_or(&self.name)
    }

    /// `Type.field`, for messages and spans.
    pub fn coordinate(&self) -> String {
        format!("{}.{}", self.parent_type, self.name)
    }
}

// ── Named types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ObjectDescriptor {
    pub name: String,
    pub fields: Vec<Arc<FieldDescriptor>>,
    shape: Vec<String>,
}

impl ObjectDescriptor {
    pub fn field(&self, name: &str) -> Option<&Arc<FieldDescriptor>> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields whose non-null presence identifies a value as this type.
    pub fn shape(&self) -> &[String] {
        &self.shape
    }
}

#[derive(Debug, Clone)]
pub struct UnionDescriptor {
    pub name: String,
    /// Declaration order; discrimination tries members in this order.
    pub members: Vec<String>,
}

impl UnionDescriptor {
    pub fn has_member(&self, name: &str) -> bool {
        self.members.iter().any(|m| m == name)
    }
}

#[derive(Debug, Clone)]
pub struct EnumDescriptor {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Scalar,
    Object,
    Union,
    Enum,
}

// ── Schema ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SchemaDescriptor {
    objects: Vec<ObjectDescriptor>,
    unions: Vec<UnionDescriptor>,
    enums: Vec<EnumDescriptor>,
    kinds: HashMap<String, TypeKind>,
    query: String,
    mutation: Option<String>,
    subscription: Option<String>,
}

impl SchemaDescriptor {
    pub fn builder() -> SchemaDescriptorBuilder {
        SchemaDescriptorBuilder::default()
    }

    pub fn kind_of(&self, name: &str) -> Option<TypeKind> {
        self.kinds.get(name).copied()
    }

    pub fn object(&self, name: &str) -> Option<&ObjectDescriptor> {
        self.objects.iter().find(|o| o.name == name)
    }

    pub fn union(&self, name: &str) -> Option<&UnionDescriptor> {
        self.unions.iter().find(|u| u.name == name)
    }

    pub fn enum_type(&self, name: &str) -> Option<&EnumDescriptor> {
        self.enums.iter().find(|e| e.name == name)
    }

    pub fn field(&self, type_name: &str, field: &str) -> Option<&Arc<FieldDescriptor>> {
        self.object(type_name)?.field(field)
    }

    pub fn objects(&self) -> &[ObjectDescriptor] {
        &self.objects
    }

    pub fn unions(&self) -> &[UnionDescriptor] {
        &self.unions
    }

    pub fn enums(&self) -> &[EnumDescriptor] {
        &self.enums
    }

    pub fn query_type(&self) -> &str {
        &self.query
    }

    pub fn mutation_type(&self) -> Option<&str> {
        self.mutation.as_deref()
    }

    pub fn subscription_type(&self) -> Option<&str> {
        self.subscription.as_deref()
    }

    /// Whether any argument in the schema takes an upload.
    pub fn uses_uploads(&self) -> bool {
        self.objects
            .iter()
            .flat_map(|o| &o.fields)
            .flat_map(|f| &f.arguments)
            .any(|a| a.ty.base_name() == UPLOAD)
    }
}

// ── Builders ────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct SchemaDescriptorBuilder {
    objects: Vec<ObjectBuilder>,
    unions: Vec<UnionDescriptor>,
    enums: Vec<EnumDescriptor>,
    query: Option<String>,
    mutation: Option<String>,
    subscription: Option<String>,
}

impl SchemaDescriptorBuilder {
    #[must_use]
    pub fn object(
        mut self,
        name: impl Into<String>,
        build: impl FnOnce(ObjectBuilder) -> ObjectBuilder,
    ) -> Self {
        self.objects.push(build(ObjectBuilder::new(name.into())));
        self
    }

    #[must_use]
    pub fn union<I, S>(mut self, name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unions.push(UnionDescriptor {
            name: name.into(),
            members: members.into_iter().map(Into::into).collect(),
        });
        self
    }

    #[must_use]
    pub fn enumeration<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enums.push(EnumDescriptor {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    #[must_use]
    pub fn query(mut self, name: impl Into<String>) -> Self {
        self.query = Some(name.into());
        self
    }

    #[must_use]
    pub fn mutation(mut self, name: impl Into<String>) -> Self {
        self.mutation = Some(name.into());
        self
    }

    #[must_use]
    pub fn subscription(mut self, name: impl Into<String>) -> Self {
        self.subscription = Some(name.into());
        self
    }

    /// Resolve type references and validate the declaration.
    pub fn build(self) -> Result<SchemaDescriptor, SchemaError> {
        let mut kinds: HashMap<String, TypeKind> = BUILTIN_SCALARS
            .iter()
            .map(|s| ((*s).to_string(), TypeKind::Scalar))
            .collect();
        let declared = self
            .objects
            .iter()
            .map(|o| (&o.name, TypeKind::Object))
            .chain(self.unions.iter().map(|u| (&u.name, TypeKind::Union)))
            .chain(self.enums.iter().map(|e| (&e.name, TypeKind::Enum)));
        for (name, kind) in declared {
            if kinds.insert(name.clone(), kind).is_some() {
                return Err(SchemaError::DuplicateType(name.clone()));
            }
        }

        let objects = self
            .objects
            .into_iter()
            .map(|o| o.finish(&kinds))
            .collect::<Result<Vec<_>, _>>()?;

        for union in &self.unions {
            if union.members.is_empty() {
                return Err(SchemaError::EmptyUnion(union.name.clone()));
            }
            for member in &union.members {
                if kinds.get(member) != Some(&TypeKind::Object) {
                    return Err(SchemaError::InvalidUnionMember {
                        union: union.name.clone(),
                        member: member.clone(),
                    });
                }
            }
        }

        let query = self.query.ok_or(SchemaError::MissingQueryRoot)?;
        for (role, root) in [
            ("query", Some(&query)),
            ("mutation", self.mutation.as_ref()),
            ("subscription", self.subscription.as_ref()),
        ] {
            if let Some(name) = root
                && kinds.get(name) != Some(&TypeKind::Object)
            {
                return Err(SchemaError::InvalidRoot {
                    role,
                    name: name.clone(),
                });
            }
        }

        Ok(SchemaDescriptor {
            objects,
            unions: self.unions,
            enums: self.enums,
            kinds,
            query,
            mutation: self.mutation,
            subscription: self.subscription,
        })
    }
}

#[derive(Debug)]
pub struct ObjectBuilder {
    name: String,
    fields: Vec<FieldBuilder>,
    shape: Option<Vec<String>>,
}

impl ObjectBuilder {
    fn new(name: String) -> Self {
        Self {
            name,
            fields: Vec::new(),
            shape: None,
        }
    }

    #[must_use]
    pub fn field(self, name: impl Into<String>, ty: &str) -> Self {
        self.field_with(name, ty, |f| f)
    }

    #[must_use]
    pub fn field_with(
        mut self,
        name: impl Into<String>,
        ty: &str,
        build: impl FnOnce(FieldBuilder) -> FieldBuilder,
    ) -> Self {
        self.fields.push(build(FieldBuilder {
            name: name.into(),
            ty: ty.to_string(),
            arguments: Vec::new(),
            directives: Vec::new(),
            topic: None,
        }));
        self
    }

    /// Override the discrimination shape; defaults to the non-null fields.
    #[must_use]
    pub fn shape<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shape = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    fn finish(self, kinds: &HashMap<String, TypeKind>) -> Result<ObjectDescriptor, SchemaError> {
        let mut fields: Vec<Arc<FieldDescriptor>> = Vec::with_capacity(self.fields.len());
        for field in self.fields {
            let field = field.finish(&self.name, kinds)?;
            if fields.iter().any(|f| f.name == field.name) {
                return Err(SchemaError::DuplicateField {
                    type_name: self.name,
                    field: field.name,
                });
            }
            fields.push(Arc::new(field));
        }

        let shape = match self.shape {
            Some(shape) => {
                if let Some(unknown) = shape.iter().find(|s| !fields.iter().any(|f| &f.name == *s)) {
                    return Err(SchemaError::UnknownShapeField {
                        type_name: self.name,
                        field: unknown.clone(),
                    });
                }
                shape
            },
            None => fields
                .iter()
                .filter(|f| f.ty.is_non_null())
                .map(|f| f.name.clone())
                .collect(),
        };

        Ok(ObjectDescriptor {
            name: self.name,
            fields,
            shape,
        })
    }
}

#[derive(Debug)]
pub struct FieldBuilder {
    name: String,
    ty: String,
    arguments: Vec<(String, String)>,
    directives: Vec<DirectiveAttachment>,
    topic: Option<String>,
}

impl FieldBuilder {
    #[must_use]
    pub fn argument(mut self, name: impl Into<String>, ty: &str) -> Self {
        self.arguments.push((name.into(), ty.to_string()));
        self
    }

    /// Attach an argument-less directive.
    #[must_use]
    pub fn directive(self, name: impl Into<String>) -> Self {
        self.directive_with(name, Map::new())
    }

    #[must_use]
    pub fn directive_with(mut self, name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        self.directives.push(DirectiveAttachment {
            name: name.into(),
            arguments,
        });
        self
    }

    #[must_use]
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    fn finish(
        self,
        parent: &str,
        kinds: &HashMap<String, TypeKind>,
    ) -> Result<FieldDescriptor, SchemaError> {
        let location = format!("{parent}.{}", self.name);
        let ty = parse_known(&self.ty, &location, kinds)?;

        let mut arguments = Vec::with_capacity(self.arguments.len());
        for (name, raw) in self.arguments {
            let location = format!("{location}({name})");
            let ty = parse_known(&raw, &location, kinds)?;
            match kinds.get(ty.base_name()) {
                Some(TypeKind::Scalar | TypeKind::Enum) => {},
                _ => {
                    return Err(SchemaError::NotAnInputType {
                        location,
                        name: ty.base_name().to_string(),
                    });
                },
            }
            arguments.push(ArgumentDescriptor { name, ty });
        }

        Ok(FieldDescriptor {
            parent_type: parent.to_string(),
            name: self.name,
            ty,
            arguments,
            directives: self.directives,
            topic: self.topic,
        })
    }
}

fn parse_known(
    raw: &str,
    location: &str,
    kinds: &HashMap<String, TypeKind>,
) -> Result<TypeRef, SchemaError> {
    let ty: TypeRef = raw.parse().map_err(|_| SchemaError::InvalidTypeRef {
        location: location.to_string(),
        raw: raw.to_string(),
    })?;
    if !kinds.contains_key(ty.base_name()) {
        return Err(SchemaError::UnknownType {
            location: location.to_string(),
            name: ty.base_name().to_string(),
        });
    }
    Ok(ty)
}
