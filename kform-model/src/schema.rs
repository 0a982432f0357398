use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Field id → value.
pub type Fields = BTreeMap<String, Value>;

/// Validator called with `(value, all_fields, field_schema, is_debouncing)`.
/// Returns `Some(message)` when the value is invalid.
pub type Validator =
    Arc<dyn Fn(&Value, &Fields, &FieldSchema, bool) -> Option<String> + Send + Sync>;

/// Converts raw input into the stored value.
pub type Parser = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Converts a stored value into its display form.
pub type Formatter = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Value interceptor. `None` keeps the incoming value.
pub type ChangeInterceptor = Arc<dyn Fn(&ChangeContext<'_>) -> Option<Value> + Send + Sync>;

/// Computes extra props from the form's external arguments.
pub type PropsFn = Arc<dyn Fn(&Value) -> Map<String, Value> + Send + Sync>;

/// Visibility predicate over the current field values.
pub type VisibleFn = Arc<dyn Fn(&Fields) -> bool + Send + Sync>;

/// Input handed to a field's `on_change` interceptor.
#[derive(Debug)]
pub struct ChangeContext<'a> {
    /// The parsed incoming value.
    pub value: Value,
    /// External arguments the form was rendered with.
    pub args: &'a Value,
    /// All committed field values.
    pub fields: &'a Fields,
}

/// Type tag used when a field declares none.
pub const DEFAULT_FIELD_TYPE: &str = "text";

/// Group used when a field declares none.
pub const DEFAULT_GROUP: &str = "default";

/// Immutable description of one form field.
#[derive(Clone, Default)]
pub struct FieldSchema {
    pub id: String,
    pub title: String,
    /// Selects the input kind and an optional sub-reducer.
    pub field_type: Option<String>,
    pub default_value: Option<Value>,
    /// Evaluated in order; the first message wins.
    pub validate: Vec<Validator>,
    pub parse: Option<Parser>,
    pub format: Option<Formatter>,
    pub on_change: Option<ChangeInterceptor>,
    pub props: Option<PropsFn>,
    pub visible: Option<VisibleFn>,
    /// Debounce window; `None` commits synchronously.
    pub debounce: Option<Duration>,
    pub group: Option<String>,
}

impl FieldSchema {
    /// Creates a plain text field with no validation.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn field_type(mut self, field_type: impl Into<String>) -> Self {
        self.field_type = Some(field_type.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Appends a validator.
    pub fn validate(mut self, validator: Validator) -> Self {
        self.validate.push(validator);
        self
    }

    /// Appends a closure validator.
    pub fn validate_with<F>(self, f: F) -> Self
    where
        F: Fn(&Value, &Fields, &FieldSchema, bool) -> Option<String> + Send + Sync + 'static,
    {
        self.validate(Arc::new(f))
    }

    pub fn parse<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.parse = Some(Arc::new(f));
        self
    }

    pub fn format<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.format = Some(Arc::new(f));
        self
    }

    pub fn on_change<F>(mut self, f: F) -> Self
    where
        F: Fn(&ChangeContext<'_>) -> Option<Value> + Send + Sync + 'static,
    {
        self.on_change = Some(Arc::new(f));
        self
    }

    pub fn props<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Map<String, Value> + Send + Sync + 'static,
    {
        self.props = Some(Arc::new(f));
        self
    }

    pub fn visible<F>(mut self, f: F) -> Self
    where
        F: Fn(&Fields) -> bool + Send + Sync + 'static,
    {
        self.visible = Some(Arc::new(f));
        self
    }

    pub fn debounce(mut self, delay: Duration) -> Self {
        self.debounce = Some(delay);
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// The declared type tag, or `"text"`.
    pub fn type_tag(&self) -> &str {
        self.field_type.as_deref().unwrap_or(DEFAULT_FIELD_TYPE)
    }

    /// The declared group, or `"default"`.
    pub fn group_name(&self) -> &str {
        self.group.as_deref().unwrap_or(DEFAULT_GROUP)
    }

    /// Value used for the initial model: the default value, or `""`.
    pub fn initial_value(&self) -> Value {
        match &self.default_value {
            Some(value) if !value.is_null() => value.clone(),
            _ => Value::String(String::new()),
        }
    }

    /// Evaluates the visibility predicate; fields without one are visible.
    pub fn is_visible(&self, fields: &Fields) -> bool {
        self.visible.as_ref().is_none_or(|visible| visible(fields))
    }

    /// Applies `parse` if present.
    pub fn parse_value(&self, raw: Value) -> Value {
        match &self.parse {
            Some(parse) => parse(raw),
            None => raw,
        }
    }

    /// Applies `format` if present.
    pub fn format_value(&self, value: &Value) -> Value {
        match &self.format {
            Some(format) => format(value),
            None => value.clone(),
        }
    }

    /// Extra props for the given external arguments.
    pub fn extra_props(&self, args: &Value) -> Map<String, Value> {
        self.props.as_ref().map(|props| props(args)).unwrap_or_default()
    }
}

impl fmt::Debug for FieldSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSchema")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("field_type", &self.field_type)
            .field("default_value", &self.default_value)
            .field("validators", &self.validate.len())
            .field("debounce", &self.debounce)
            .field("group", &self.group)
            .finish_non_exhaustive()
    }
}

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// An ordered, id-indexed form schema.
///
/// Every schema gets a process-unique generation number, used as the
/// schema half of derived-data cache keys.
#[derive(Debug, Clone)]
pub struct FormSchema {
    fields: Vec<Arc<FieldSchema>>,
    index: HashMap<String, usize>,
    generation: u64,
}

impl FormSchema {
    /// Indexes `fields`. Field ids must be unique.
    pub fn new(fields: Vec<FieldSchema>) -> Result<Self, crate::SchemaError> {
        let mut index = HashMap::with_capacity(fields.len());
        for (position, field) in fields.iter().enumerate() {
            if index.insert(field.id.clone(), position).is_some() {
                return Err(crate::SchemaError::DuplicateField(field.id.clone()));
            }
        }
        Ok(Self {
            fields: fields.into_iter().map(Arc::new).collect(),
            index,
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
        })
    }

    /// Fields in schema order.
    pub fn fields(&self) -> &[Arc<FieldSchema>] {
        &self.fields
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<FieldSchema>> {
        self.fields.iter()
    }

    /// Looks a field up by id.
    pub fn get(&self, id: &str) -> Option<&Arc<FieldSchema>> {
        self.index.get(id).map(|&position| &self.fields[position])
    }

    /// Schema-order position of a field.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Field ids in schema order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Process-unique identity of this schema.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
