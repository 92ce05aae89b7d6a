use std::fmt;
use std::sync::Arc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use crate::keys::ID_FIELD;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
        .expect("email pattern compiles")
});

/// A user-supplied predicate for [`Check::Custom`].
pub type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// A single constraint a field value must satisfy.
#[derive(Clone)]
pub enum Check {
    IsString,
    IsNotEmpty,
    IsNumber,
    IsInt,
    IsBoolean,
    IsArray,
    IsObject,
    Min(f64),
    Max(f64),
    MinLength(usize),
    MaxLength(usize),
    Matches(Regex),
    IsEmail,
    IsIn(Vec<Value>),
    Custom { name: String, predicate: Predicate },
}

impl Check {
    /// The constraint name reported in validation errors.
    pub fn name(&self) -> &str {
        match self {
            Check::IsString => "isString",
            Check::IsNotEmpty => "isNotEmpty",
            Check::IsNumber => "isNumber",
            Check::IsInt => "isInt",
            Check::IsBoolean => "isBoolean",
            Check::IsArray => "isArray",
            Check::IsObject => "isObject",
            Check::Min(_) => "min",
            Check::Max(_) => "max",
            Check::MinLength(_) => "minLength",
            Check::MaxLength(_) => "maxLength",
            Check::Matches(_) => "matches",
            Check::IsEmail => "isEmail",
            Check::IsIn(_) => "isIn",
            Check::Custom { name, .. } => name,
        }
    }

    /// Whether `value` satisfies the constraint. A missing field is checked as `null`.
    pub fn test(&self, value: &Value) -> bool {
        match self {
            Check::IsString => value.is_string(),
            Check::IsNotEmpty => !matches!(value, Value::Null) && value.as_str() != Some(""),
            Check::IsNumber => value.is_number(),
            Check::IsInt => match value {
                Value::Number(n) => n.is_i64() || n.is_u64() || n.as_f64().map_or(false, |f| f.fract() == 0.0),
                _ => false,
            },
            Check::IsBoolean => value.is_boolean(),
            Check::IsArray => value.is_array(),
            Check::IsObject => value.is_object(),
            Check::Min(min) => value.as_f64().map_or(false, |v| v >= *min),
            Check::Max(max) => value.as_f64().map_or(false, |v| v <= *max),
            Check::MinLength(min) => value.as_str().map_or(false, |s| s.chars().count() >= *min),
            Check::MaxLength(max) => value.as_str().map_or(false, |s| s.chars().count() <= *max),
            Check::Matches(re) => value.as_str().map_or(false, |s| re.is_match(s)),
            Check::IsEmail => value.as_str().map_or(false, |s| EMAIL.is_match(s)),
            Check::IsIn(allowed) => allowed.contains(value),
            Check::Custom { predicate, .. } => predicate(value),
        }
    }

    fn default_message(&self, field: &str) -> String {
        match self {
            Check::IsString => format!("{} must be a string", field),
            Check::IsNotEmpty => format!("{} should not be empty", field),
            Check::IsNumber => format!("{} must be a number conforming to the specified constraints", field),
            Check::IsInt => format!("{} must be an integer number", field),
            Check::IsBoolean => format!("{} must be a boolean value", field),
            Check::IsArray => format!("{} must be an array", field),
            Check::IsObject => format!("{} must be an object", field),
            Check::Min(min) => format!("{} must not be less than {}", field, min),
            Check::Max(max) => format!("{} must not be greater than {}", field, max),
            Check::MinLength(min) => format!("{} must be longer than or equal to {} characters", field, min),
            Check::MaxLength(max) => format!("{} must be shorter than or equal to {} characters", field, max),
            Check::Matches(re) => format!("{} must match {} regular expression", field, re.as_str()),
            Check::IsEmail => format!("{} must be an email", field),
            Check::IsIn(allowed) => {
                let list: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
                format!("{} must be one of the following values: {}", field, list.join(", "))
            }
            Check::Custom { name, .. } => format!("{} failed {}", field, name),
        }
    }
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A constraint bound to a field, with the message reported when it fails.
#[derive(Debug, Clone)]
pub struct Rule {
    pub field: String,
    pub check: Check,
    pub message: String,
    /// Skip the check when the field is missing or `null`, even on inserts.
    pub optional: bool,
}

impl Rule {
    pub fn new(field: impl Into<String>, check: Check) -> Self {
        let field = field.into();
        let message = check.default_message(&field);
        Self { field, check, message, optional: false }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// The ordered validation rules of a record type.
///
/// A schema is a plain description of constraints. Validation reads it and the
/// candidate object side by side and never writes into the schema, so one
/// schema can serve any number of concurrent validations.
///
/// ```
/// use detantic::Schema;
///
/// let schema = Schema::new()
///     .field("name", |f| f.is_string().min_length(2))
///     .field("age", |f| f.is_int().min(0.0).message("age must be positive"));
/// assert_eq!(schema.rules().len(), 6);
/// ```
#[derive(Debug, Clone)]
pub struct Schema {
    rules: Vec<Rule>,
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

impl Schema {
    /// Creates a schema holding the rules every record shares: `id` is a
    /// non-empty string.
    pub fn new() -> Self {
        Self {
            rules: vec![Rule::new(ID_FIELD, Check::IsString), Rule::new(ID_FIELD, Check::IsNotEmpty)],
        }
    }

    /// Adds the rules built by `build` for `field`.
    pub fn field(mut self, field: &str, build: impl FnOnce(FieldRules) -> FieldRules) -> Self {
        let built = build(FieldRules { field: field.to_string(), rules: Vec::new(), optional: false });
        let optional = built.optional;
        self.rules.extend(built.rules.into_iter().map(|rule| if optional { rule.optional() } else { rule }));
        self
    }

    /// Adds a prebuilt rule.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}

/// Builder for the rules of one field. See [`Schema::field`].
pub struct FieldRules {
    field: String,
    rules: Vec<Rule>,
    optional: bool,
}

impl FieldRules {
    fn check(mut self, check: Check) -> Self {
        self.rules.push(Rule::new(self.field.clone(), check));
        self
    }

    /// Lets the field be missing or `null`. The other rules only apply to
    /// values that are present.
    pub fn is_optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn is_string(self) -> Self {
        self.check(Check::IsString)
    }

    pub fn is_not_empty(self) -> Self {
        self.check(Check::IsNotEmpty)
    }

    pub fn is_number(self) -> Self {
        self.check(Check::IsNumber)
    }

    pub fn is_int(self) -> Self {
        self.check(Check::IsInt)
    }

    pub fn is_boolean(self) -> Self {
        self.check(Check::IsBoolean)
    }

    pub fn is_array(self) -> Self {
        self.check(Check::IsArray)
    }

    pub fn is_object(self) -> Self {
        self.check(Check::IsObject)
    }

    pub fn min(self, min: f64) -> Self {
        self.check(Check::Min(min))
    }

    pub fn max(self, max: f64) -> Self {
        self.check(Check::Max(max))
    }

    pub fn min_length(self, min: usize) -> Self {
        self.check(Check::MinLength(min))
    }

    pub fn max_length(self, max: usize) -> Self {
        self.check(Check::MaxLength(max))
    }

    pub fn matches(self, pattern: Regex) -> Self {
        self.check(Check::Matches(pattern))
    }

    pub fn is_email(self) -> Self {
        self.check(Check::IsEmail)
    }

    pub fn is_in(self, allowed: Vec<Value>) -> Self {
        self.check(Check::IsIn(allowed))
    }

    pub fn custom<F>(self, name: &str, message: &str, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        let check = Check::Custom { name: name.to_string(), predicate: Arc::new(predicate) };
        self.check(check).message(message)
    }

    /// Replaces the message of the most recently added rule.
    pub fn message(mut self, message: &str) -> Self {
        if let Some(rule) = self.rules.last_mut() {
            rule.message = message.to_string();
        }
        self
    }
}
