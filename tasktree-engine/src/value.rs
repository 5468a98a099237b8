//! Argument coercion and the pluggable validator registry.
//!
//! Every CLI token passes through its parameter's type tag before anything
//! fingerprints or executes. Core types (`str`, `int`, `float`, `bool`,
//! `path`, `datetime`) coerce inline; surface types (`url`, `hostname`,
//! `email`, `ip*`) dispatch through the [`ValidatorRegistry`] so embedders
//! can swap validation rules without touching the engine.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashMap};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::Path;
use tasktree_graph::TaskGraph;
use tasktree_recipe::{ParamSpec, ParamType, Task};
use url::Url;

/// Argument error types.
#[derive(Debug, thiserror::Error)]
pub enum ArgError {
    /// Value failed type coercion
    #[error("task `{task}`: invalid value `{value}` for parameter `{param}` ({ty}): {message}")]
    Invalid {
        /// Task being invoked
        task: String,
        /// Parameter the value was bound to
        param: String,
        /// Type tag
        ty: &'static str,
        /// The raw value as supplied
        value: String,
        /// Why coercion failed
        message: String,
    },

    /// Required parameter with no value and no default
    #[error("task `{task}`: missing required argument `{param}`")]
    Missing {
        /// Task being invoked
        task: String,
        /// The unbound parameter
        param: String,
    },

    /// Parameter bound twice
    #[error("task `{task}`: argument `{param}` bound more than once")]
    Duplicate {
        /// Task being invoked
        task: String,
        /// The doubly-bound parameter
        param: String,
    },

    /// More positional values than unbound parameters
    #[error("task `{task}` takes {expected} argument(s), got extra `{value}`")]
    Unexpected {
        /// Task being invoked
        task: String,
        /// Number of declared parameters
        expected: usize,
        /// First value with no parameter left to bind
        value: String,
    },
}

/// A coerced argument value in its canonical textual form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgValue {
    /// Parameter name the value is bound to
    pub name: String,
    /// Type tag it was coerced through
    pub ty: ParamType,
    /// Canonical form, substituted into the command and fingerprinted
    pub canonical: String,
}

/// Validation function for a surface type: raw text in, canonical form out.
pub type Validator = fn(&str) -> Result<String, String>;

/// Pluggable validator map for surface types.
pub struct ValidatorRegistry {
    validators: HashMap<ParamType, Validator>,
}

impl ValidatorRegistry {
    /// Registry with the built-in validators for `url`, `hostname`,
    /// `email`, `ip`, `ipv4` and `ipv6`.
    #[must_use]
    pub fn new() -> Self {
        let mut validators: HashMap<ParamType, Validator> = HashMap::new();
        let _ = validators.insert(ParamType::Url, validate_url);
        let _ = validators.insert(ParamType::Hostname, validate_hostname);
        let _ = validators.insert(ParamType::Email, validate_email);
        let _ = validators.insert(ParamType::Ip, validate_ip);
        let _ = validators.insert(ParamType::Ipv4, validate_ipv4);
        let _ = validators.insert(ParamType::Ipv6, validate_ipv6);
        Self { validators }
    }

    /// Replace or add the validator for one type tag.
    pub fn register(&mut self, ty: ParamType, validator: Validator) {
        let _ = self.validators.insert(ty, validator);
    }

    fn validate(&self, ty: ParamType, raw: &str) -> Result<String, String> {
        match self.validators.get(&ty) {
            Some(validator) => validator(raw),
            None => Err(format!("no validator registered for `{ty}`")),
        }
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_url(raw: &str) -> Result<String, String> {
    let url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    if !url.has_host() {
        return Err("URL must have a host".to_string());
    }
    Ok(url.to_string())
}

fn hostname_ok(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 253
        && s.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
                && !label.starts_with('-')
                && !label.ends_with('-')
        })
}

fn validate_hostname(raw: &str) -> Result<String, String> {
    let candidate = raw.trim().to_ascii_lowercase();
    if hostname_ok(&candidate) {
        Ok(candidate)
    } else {
        Err("not an RFC 1123 hostname".to_string())
    }
}

fn validate_email(raw: &str) -> Result<String, String> {
    let candidate = raw.trim();
    match candidate.split_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && !local.contains(char::is_whitespace)
                && hostname_ok(&domain.to_ascii_lowercase()) =>
        {
            Ok(format!("{local}@{}", domain.to_ascii_lowercase()))
        }
        _ => Err("expected local@domain".to_string()),
    }
}

fn validate_ip(raw: &str) -> Result<String, String> {
    raw.trim()
        .parse::<IpAddr>()
        .map(|ip| ip.to_string())
        .map_err(|e| e.to_string())
}

fn validate_ipv4(raw: &str) -> Result<String, String> {
    raw.trim()
        .parse::<Ipv4Addr>()
        .map(|ip| ip.to_string())
        .map_err(|e| e.to_string())
}

fn validate_ipv6(raw: &str) -> Result<String, String> {
    raw.trim()
        .parse::<Ipv6Addr>()
        .map(|ip| ip.to_string())
        .map_err(|e| e.to_string())
}

fn parse_bool(raw: &str) -> Result<String, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok("1".to_string()),
        "false" | "0" | "no" => Ok("0".to_string()),
        _ => Err("expected true|false|1|0|yes|no".to_string()),
    }
}

fn parse_datetime(raw: &str) -> Result<String, String> {
    let raw = raw.trim();
    if let Ok(aware) = DateTime::parse_from_rfc3339(raw) {
        return Ok(aware.to_rfc3339());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(naive.format("%Y-%m-%dT%H:%M:%S").to_string());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.format("%Y-%m-%dT%H:%M:%S").to_string());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date.format("%Y-%m-%d").to_string());
    }
    Err("expected an ISO-8601 datetime".to_string())
}

/// Coerce one raw value through a parameter's type.
pub fn coerce(
    task: &Task,
    spec: &ParamSpec,
    raw: &str,
    registry: &ValidatorRegistry,
) -> Result<ArgValue, ArgError> {
    let canonical = match spec.ty {
        ParamType::Str => Ok(raw.to_string()),
        ParamType::Int => raw
            .trim()
            .parse::<i64>()
            .map(|v| v.to_string())
            .map_err(|e| e.to_string()),
        ParamType::Float => raw
            .trim()
            .parse::<f64>()
            .map(|v| format!("{v}"))
            .map_err(|e| e.to_string()),
        ParamType::Bool => parse_bool(raw),
        ParamType::Path => {
            let path = Path::new(raw);
            let absolute = if path.is_absolute() {
                path.to_path_buf()
            } else {
                task.working_dir.join(path)
            };
            Ok(absolute.to_string_lossy().into_owned())
        }
        ParamType::Datetime => parse_datetime(raw),
        surface => registry.validate(surface, raw),
    }
    .map_err(|message| ArgError::Invalid {
        task: task.qualified_name.clone(),
        param: spec.name.clone(),
        ty: spec.ty.tag(),
        value: raw.to_string(),
        message,
    })?;

    Ok(ArgValue {
        name: spec.name.clone(),
        ty: spec.ty,
        canonical,
    })
}

/// Bind command-line tokens to a task's parameters and coerce them.
///
/// `name=value` tokens naming a declared parameter bind by name; everything
/// else binds positionally, in declared order, to the parameters not bound
/// by name. Unbound parameters fall back to their defaults.
pub fn bind_args(
    task: &Task,
    tokens: &[String],
    registry: &ValidatorRegistry,
) -> Result<Vec<ArgValue>, ArgError> {
    let mut by_name: BTreeMap<&str, &str> = BTreeMap::new();
    let mut positional: Vec<&str> = Vec::new();

    for token in tokens {
        match token.split_once('=') {
            Some((name, value)) if task.parameters.iter().any(|p| p.name == name) => {
                if by_name.insert(name, value).is_some() {
                    return Err(ArgError::Duplicate {
                        task: task.qualified_name.clone(),
                        param: name.to_string(),
                    });
                }
            }
            _ => positional.push(token),
        }
    }

    let unbound: Vec<&ParamSpec> = task
        .parameters
        .iter()
        .filter(|p| !by_name.contains_key(p.name.as_str()))
        .collect();
    if positional.len() > unbound.len() {
        return Err(ArgError::Unexpected {
            task: task.qualified_name.clone(),
            expected: task.parameters.len(),
            value: positional[unbound.len()].to_string(),
        });
    }

    let positional_bound: BTreeMap<&str, &str> = unbound
        .iter()
        .zip(&positional)
        .map(|(spec, value)| (spec.name.as_str(), *value))
        .collect();

    let mut values = Vec::with_capacity(task.parameters.len());
    for spec in &task.parameters {
        let raw = by_name
            .get(spec.name.as_str())
            .or_else(|| positional_bound.get(spec.name.as_str()))
            .copied()
            .or(spec.default.as_deref());

        match raw {
            Some(raw) => values.push(coerce(task, spec, raw, registry)?),
            None => {
                return Err(ArgError::Missing {
                    task: task.qualified_name.clone(),
                    param: spec.name.clone(),
                });
            }
        }
    }

    Ok(values)
}

/// Bind arguments for every task in `order`: the target gets the supplied
/// tokens, every other task its declared defaults.
pub fn bind_all(
    graph: &TaskGraph,
    order: &[String],
    target: &str,
    tokens: &[String],
    registry: &ValidatorRegistry,
) -> Result<BTreeMap<String, Vec<ArgValue>>, ArgError> {
    let mut bound = BTreeMap::new();
    for name in order {
        let Ok(task) = graph.task(name) else { continue };
        let tokens = if name == target { tokens } else { &[][..] };
        let _ = bound.insert(name.clone(), bind_args(task, tokens, registry)?);
    }
    Ok(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn task_with(args: &[&str]) -> Task {
        Task {
            qualified_name: "deploy".to_string(),
            description: None,
            dependencies: Vec::new(),
            explicit_inputs: Vec::new(),
            outputs: Vec::new(),
            working_dir: PathBuf::from("/project"),
            parameters: args.iter().map(|a| ParamSpec::parse(a).unwrap()).collect(),
            command: "true".to_string(),
        }
    }

    fn coerce_one(spec: &str, raw: &str) -> Result<String, ArgError> {
        let task = task_with(&[spec]);
        let registry = ValidatorRegistry::new();
        coerce(&task, &task.parameters[0], raw, &registry).map(|v| v.canonical)
    }

    #[test]
    fn int_and_float_canonicalise() {
        assert_eq!(coerce_one("n:int", " 42 ").unwrap(), "42");
        assert_eq!(coerce_one("n:int", "-7").unwrap(), "-7");
        assert!(coerce_one("n:int", "4.2").is_err());

        assert_eq!(coerce_one("x:float", "1.50").unwrap(), "1.5");
        assert_eq!(coerce_one("x:float", "2").unwrap(), "2");
    }

    #[test]
    fn bool_accepts_all_spellings() {
        for raw in ["true", "TRUE", "1", "yes", "Yes"] {
            assert_eq!(coerce_one("b:bool", raw).unwrap(), "1");
        }
        for raw in ["false", "0", "no", "NO"] {
            assert_eq!(coerce_one("b:bool", raw).unwrap(), "0");
        }
        assert!(coerce_one("b:bool", "maybe").is_err());
    }

    #[test]
    fn path_resolves_against_working_dir() {
        assert_eq!(coerce_one("p:path", "sub/file").unwrap(), "/project/sub/file");
        assert_eq!(coerce_one("p:path", "/abs/file").unwrap(), "/abs/file");
    }

    #[test]
    fn datetime_accepts_iso_8601() {
        assert!(coerce_one("t:datetime", "2024-06-01T12:00:00Z").is_ok());
        assert!(coerce_one("t:datetime", "2024-06-01T12:00:00+02:00").is_ok());
        assert_eq!(
            coerce_one("t:datetime", "2024-06-01 12:00:00").unwrap(),
            "2024-06-01T12:00:00"
        );
        assert_eq!(coerce_one("t:datetime", "2024-06-01").unwrap(), "2024-06-01");
        assert!(coerce_one("t:datetime", "June 1st").is_err());
    }

    #[test]
    fn surface_types_validate_and_canonicalise() {
        assert_eq!(
            coerce_one("u:url", "https://example.com/x").unwrap(),
            "https://example.com/x"
        );
        assert!(coerce_one("u:url", "not a url").is_err());
        assert!(coerce_one("u:url", "file:///no-host").is_err());

        assert_eq!(coerce_one("h:hostname", "A.Example.COM").unwrap(), "a.example.com");
        assert!(coerce_one("h:hostname", "-bad.example").is_err());
        assert!(coerce_one("h:hostname", "a..b").is_err());

        assert_eq!(coerce_one("e:email", "ops@Example.com").unwrap(), "ops@example.com");
        assert!(coerce_one("e:email", "nodomain@").is_err());
        assert!(coerce_one("e:email", "plain").is_err());

        assert_eq!(coerce_one("i:ip", "127.0.0.1").unwrap(), "127.0.0.1");
        assert_eq!(
            coerce_one("i:ip", "2001:0db8:0000:0000:0000:0000:0000:0001").unwrap(),
            "2001:db8::1"
        );
        assert!(coerce_one("i:ipv4", "::1").is_err());
        assert!(coerce_one("i:ipv6", "127.0.0.1").is_err());
    }

    #[test]
    fn registry_entries_can_be_replaced() {
        fn reject_all(_: &str) -> Result<String, String> {
            Err("nope".to_string())
        }

        let task = task_with(&["h:hostname"]);
        let mut registry = ValidatorRegistry::new();
        registry.register(ParamType::Hostname, reject_all);

        let err = coerce(&task, &task.parameters[0], "fine.example.com", &registry).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn positional_binding_in_declared_order() {
        let task = task_with(&["host:hostname", "port:int=22"]);
        let registry = ValidatorRegistry::new();

        let values = bind_args(
            &task,
            &["a.example.com".to_string(), "2222".to_string()],
            &registry,
        )
        .unwrap();
        assert_eq!(values[0].canonical, "a.example.com");
        assert_eq!(values[1].canonical, "2222");
    }

    #[test]
    fn defaults_fill_unbound_parameters() {
        let task = task_with(&["host:hostname", "port:int=22"]);
        let registry = ValidatorRegistry::new();

        let values = bind_args(&task, &["a.example.com".to_string()], &registry).unwrap();
        assert_eq!(values[1].canonical, "22");
    }

    #[test]
    fn named_binding_skips_positional_slots() {
        let task = task_with(&["host:hostname", "port:int"]);
        let registry = ValidatorRegistry::new();

        let values = bind_args(
            &task,
            &["host=a.example.com".to_string(), "8080".to_string()],
            &registry,
        )
        .unwrap();
        assert_eq!(values[0].canonical, "a.example.com");
        assert_eq!(values[1].canonical, "8080");
    }

    #[test]
    fn missing_required_argument_is_an_error() {
        let task = task_with(&["host:hostname"]);
        let registry = ValidatorRegistry::new();

        let err = bind_args(&task, &[], &registry).unwrap_err();
        assert!(matches!(err, ArgError::Missing { .. }));
    }

    #[test]
    fn surplus_and_duplicate_bindings_are_errors() {
        let task = task_with(&["host:hostname"]);
        let registry = ValidatorRegistry::new();

        let err = bind_args(
            &task,
            &["a.example.com".to_string(), "extra".to_string()],
            &registry,
        )
        .unwrap_err();
        assert!(matches!(err, ArgError::Unexpected { .. }));

        let err = bind_args(
            &task,
            &["host=a.example.com".to_string(), "host=b.example.com".to_string()],
            &registry,
        )
        .unwrap_err();
        assert!(matches!(err, ArgError::Duplicate { .. }));
    }

    #[test]
    fn equals_token_not_naming_a_parameter_binds_positionally() {
        let task = task_with(&["msg"]);
        let registry = ValidatorRegistry::new();

        let values = bind_args(&task, &["a=b".to_string()], &registry).unwrap();
        assert_eq!(values[0].canonical, "a=b");
    }
}
