//! Parameter declarations and the binding instructions derived from them.
//!
//! A route lists its handler's parameters as [`Param`]s, in the same order as
//! the handler's arguments. At registration each `Param` is turned into an
//! [`ArgumentDescriptor`] once; the dispatcher only ever reads descriptors.
//!
//! ```rust,ignore
//! let params = [
//!     Param::context("addon"),
//!     Param::query("offset").ty(ParamType::Int).default(0),
//!     Param::settings("per_page").ty(ParamType::Int).lookup("items_per_page"),
//! ];
//! ```

use std::sync::Arc;

use kodi_useful_core::{SettingKind, TypeCast, Value};

/// Where a parameter's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    /// Not supplied by the dispatcher; the ambient context or the handler's
    /// own default fills it.
    #[default]
    NotSet,
    /// The inbound query string.
    Query,
    /// The persisted settings store.
    Settings,
}

/// Declared type of a parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    /// Boolean, coerced with the usual on/off spellings.
    Bool,
    /// Signed integer.
    Int,
    /// Floating point number.
    Float,
    /// Raw string, no coercion.
    Str,
    /// JSON literal auto-detection.
    Json,
    /// Repeated query key; every value is coerced as the element type.
    Sequence(Box<ParamType>),
    /// Structured value passed through JSON auto-detection.
    Mapping,
    /// Several alternatives; no automatic coercion.
    Union(Vec<ParamType>),
    /// The absent value; only meaningful inside a union.
    Null,
    /// Marker: inject the ambient execution context.
    Context,
}

impl ParamType {
    /// A sequence of `element`.
    pub fn sequence(element: ParamType) -> Self {
        Self::Sequence(Box::new(element))
    }

    /// `inner` or nothing; collapses to `inner`.
    pub fn optional(inner: ParamType) -> Self {
        Self::union([inner, Self::Null])
    }

    /// Builds a union, dropping `Null` alternatives and duplicates.
    ///
    /// A single remaining alternative collapses to that alternative.
    pub fn union(alternatives: impl IntoIterator<Item = ParamType>) -> Self {
        let mut variants: Vec<ParamType> = Vec::new();
        for alt in alternatives {
            let nested = match alt {
                Self::Union(inner) => inner,
                other => vec![other],
            };
            for variant in nested {
                if variant != Self::Null && !variants.contains(&variant) {
                    variants.push(variant);
                }
            }
        }
        match variants.len() {
            0 => Self::Null,
            1 => variants.remove(0),
            _ => Self::Union(variants),
        }
    }

    /// Returns `true` for types coerced from a single string.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Self::Bool | Self::Int | Self::Float | Self::Str | Self::Json
        )
    }

    /// Returns `true` for sequence and mapping types.
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Sequence(_) | Self::Mapping)
    }

    /// Built-in cast for scalar types; `None` for everything else.
    pub fn scalar_cast(&self) -> Option<TypeCast> {
        match self {
            Self::Bool => Some(TypeCast::boolean()),
            Self::Int => Some(TypeCast::integer()),
            Self::Float => Some(TypeCast::float()),
            Self::Str => Some(TypeCast::string()),
            Self::Json => Some(TypeCast::json()),
            _ => None,
        }
    }

    /// The typed getter used when the parameter is read from settings.
    ///
    /// Everything that is not a number or a boolean is read as a string;
    /// see [`ParamType::setting_cast`] for the types decoded afterwards.
    pub fn setting_kind(&self) -> SettingKind {
        match self {
            Self::Bool => SettingKind::Bool,
            Self::Int => SettingKind::Int,
            Self::Float => SettingKind::Float,
            _ => SettingKind::Str,
        }
    }

    /// Cast applied to the raw string of a setting: JSON, mapping and
    /// sequence settings are stored as JSON text.
    pub fn setting_cast(&self) -> Option<TypeCast> {
        match self {
            Self::Json | Self::Mapping | Self::Sequence(_) => Some(TypeCast::json()),
            _ => None,
        }
    }

    fn normalized(self) -> Self {
        match self {
            Self::Union(alternatives) => Self::union(alternatives),
            Self::Sequence(element) => Self::Sequence(Box::new(element.normalized())),
            other => other,
        }
    }
}

/// Declaration of one handler parameter.
#[derive(Debug, Clone)]
pub struct Param {
    name: String,
    scope: Scope,
    ty: Option<ParamType>,
    default: Option<Value>,
    lookup: Option<String>,
    getter: Option<TypeCast>,
}

impl Param {
    /// A parameter with no binding scope.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: Scope::NotSet,
            ty: None,
            default: None,
            lookup: None,
            getter: None,
        }
    }

    /// A parameter read from the query string.
    pub fn query(name: impl Into<String>) -> Self {
        Self::new(name).scope(Scope::Query)
    }

    /// A parameter read from the settings store.
    pub fn settings(name: impl Into<String>) -> Self {
        Self::new(name).scope(Scope::Settings)
    }

    /// A parameter receiving the ambient execution context.
    pub fn context(name: impl Into<String>) -> Self {
        Self::new(name).ty(ParamType::Context)
    }

    /// Sets the binding scope.
    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Sets the declared type.
    pub fn ty(mut self, ty: ParamType) -> Self {
        self.ty = Some(ty);
        self
    }

    /// Sets the default value, making the parameter optional.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Makes the parameter optional with a `Null` default.
    pub fn optional(self) -> Self {
        self.default(Value::Null)
    }

    /// Reads the value under a different external name.
    pub fn lookup(mut self, name: impl Into<String>) -> Self {
        self.lookup = Some(name.into());
        self
    }

    /// Replaces the type-derived coercion with a custom getter.
    pub fn getter(mut self, getter: TypeCast) -> Self {
        self.getter = Some(getter);
        self
    }

    /// Returns the parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Derives the binding instructions for this parameter.
    pub fn describe(&self) -> ArgumentDescriptor {
        let declared_type = self.ty.clone().map(ParamType::normalized);
        let type_cast = self
            .getter
            .clone()
            .or_else(|| declared_type.as_ref().and_then(ParamType::scalar_cast));
        let element_cast = match &declared_type {
            Some(ParamType::Sequence(element)) => element.scalar_cast(),
            _ => None,
        };
        let name: Arc<str> = Arc::from(self.name.as_str());
        let lookup_name = match &self.lookup {
            Some(lookup) => Arc::from(lookup.as_str()),
            None => Arc::clone(&name),
        };

        ArgumentDescriptor {
            name,
            required: self.default.is_none(),
            default: self.default.clone().unwrap_or(Value::Null),
            declared_type,
            scope: self.scope,
            lookup_name,
            type_cast,
            element_cast,
            getter: self.getter.clone(),
        }
    }
}

/// Binding instructions for one handler parameter, computed once per route.
#[derive(Debug, Clone)]
pub struct ArgumentDescriptor {
    name: Arc<str>,
    required: bool,
    default: Value,
    declared_type: Option<ParamType>,
    scope: Scope,
    lookup_name: Arc<str>,
    type_cast: Option<TypeCast>,
    element_cast: Option<TypeCast>,
    getter: Option<TypeCast>,
}

impl ArgumentDescriptor {
    /// Handler-side parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// `true` iff no default was declared.
    pub fn required(&self) -> bool {
        self.required
    }

    /// The declared default, `Null` when there is none.
    pub fn default_value(&self) -> &Value {
        &self.default
    }

    /// Declared type with `Null` alternatives collapsed out.
    pub fn declared_type(&self) -> Option<&ParamType> {
        self.declared_type.as_ref()
    }

    /// Binding scope.
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// External name used for query and settings lookups.
    pub fn lookup_name(&self) -> &str {
        &self.lookup_name
    }

    /// Coercion applied to a raw string: the custom getter, or the built-in
    /// cast of a scalar declared type.
    pub fn type_cast(&self) -> Option<&TypeCast> {
        self.type_cast.as_ref()
    }

    /// Per-element coercion of a sequence type.
    pub fn element_cast(&self) -> Option<&TypeCast> {
        self.element_cast.as_ref()
    }

    /// The custom getter, if one was declared.
    pub fn getter(&self) -> Option<&TypeCast> {
        self.getter.as_ref()
    }

    /// `true` if the ambient context is injected here.
    pub fn is_context(&self) -> bool {
        self.declared_type == Some(ParamType::Context)
    }

    /// `true` if every occurrence of the key is bound as a list.
    pub fn is_sequence(&self) -> bool {
        matches!(self.declared_type, Some(ParamType::Sequence(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kodi_useful_core::CastError;
    use serde_json::json;

    #[test]
    fn test_union_collapse() {
        assert_eq!(ParamType::optional(ParamType::Int), ParamType::Int);
        assert_eq!(
            ParamType::union([ParamType::Int, ParamType::Null, ParamType::Str]),
            ParamType::Union(vec![ParamType::Int, ParamType::Str])
        );
        assert_eq!(ParamType::union([ParamType::Null]), ParamType::Null);
        assert_eq!(
            ParamType::union([ParamType::optional(ParamType::Bool), ParamType::Bool]),
            ParamType::Bool
        );
    }

    #[test]
    fn test_required_and_default() {
        let required = Param::query("owner_id").ty(ParamType::Int).describe();
        assert!(required.required());
        assert_eq!(required.default_value(), &Value::Null);

        let optional = Param::query("offset").ty(ParamType::Int).default(0).describe();
        assert!(!optional.required());
        assert_eq!(optional.default_value(), &json!(0));

        let nullable = Param::query("q").optional().describe();
        assert!(!nullable.required());
        assert_eq!(nullable.default_value(), &Value::Null);
    }

    #[test]
    fn test_type_cast_derivation() {
        let scalar = Param::query("offset").ty(ParamType::Int).describe();
        assert_eq!(scalar.type_cast().map(TypeCast::name), Some("int"));

        // Optional[int] coerces like int
        let optional = Param::query("offset")
            .ty(ParamType::Union(vec![ParamType::Int, ParamType::Null]))
            .describe();
        assert_eq!(optional.declared_type(), Some(&ParamType::Int));
        assert_eq!(optional.type_cast().map(TypeCast::name), Some("int"));

        let union = Param::query("id")
            .ty(ParamType::union([ParamType::Int, ParamType::Str]))
            .describe();
        assert!(union.type_cast().is_none());

        let container = Param::query("ids")
            .ty(ParamType::sequence(ParamType::Int))
            .describe();
        assert!(container.type_cast().is_none());
        assert_eq!(container.element_cast().map(TypeCast::name), Some("int"));
        assert!(container.is_sequence());

        let untyped = Param::query("anything").describe();
        assert!(untyped.type_cast().is_none());
    }

    #[test]
    fn test_setting_kind_and_cast() {
        assert_eq!(ParamType::Int.setting_kind(), SettingKind::Int);
        assert_eq!(ParamType::Mapping.setting_kind(), SettingKind::Str);
        assert!(ParamType::Str.setting_cast().is_none());
        assert!(ParamType::Int.setting_cast().is_none());

        let cast = ParamType::Mapping.setting_cast().unwrap();
        assert_eq!(cast.cast(r#"{"a": 1}"#).unwrap(), json!({"a": 1}));
        let cast = ParamType::sequence(ParamType::Int).setting_cast().unwrap();
        assert_eq!(cast.cast("[1, 2]").unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_getter_overrides_type() {
        let getter = TypeCast::new("owner", |raw| {
            raw.strip_prefix("id")
                .and_then(|id| id.parse::<i64>().ok())
                .map(Value::from)
                .ok_or_else(|| CastError::invalid(raw, "owner id"))
        });
        let descriptor = Param::query("owner")
            .ty(ParamType::Int)
            .getter(getter)
            .describe();
        let cast = descriptor.type_cast().unwrap();
        assert_eq!(cast.name(), "owner");
        assert_eq!(cast.cast("id42").unwrap(), json!(42));
    }

    #[test]
    fn test_lookup_name_and_context() {
        let descriptor = Param::settings("per_page")
            .lookup("items_per_page")
            .describe();
        assert_eq!(descriptor.name(), "per_page");
        assert_eq!(descriptor.lookup_name(), "items_per_page");
        assert_eq!(descriptor.scope(), Scope::Settings);

        let plain = Param::query("offset").describe();
        assert_eq!(plain.lookup_name(), "offset");

        let ctx = Param::context("addon").describe();
        assert!(ctx.is_context());
        assert_eq!(ctx.scope(), Scope::NotSet);
    }
}
