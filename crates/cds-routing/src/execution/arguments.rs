//! Positional arguments handed to annotated methods.

use crate::errors::ArgumentError;
use crate::host::{Next, Request, ServiceHost};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// One resolved argument
#[derive(Clone)]
pub enum Argument {
    /// The host service
    Service(Arc<dyn ServiceHost>),
    /// The incoming request
    Request(Arc<Request>),
    /// The request payload (`data` and `param_obj` parameters)
    Data(Value),
    /// A named payload field, `None` when the field is missing
    Param(Option<Value>),
    /// The bearer token, `None` when absent or malformed
    Jwt(Option<String>),
    /// Entities of an after-phase invocation
    Entities(Option<Value>),
    /// Continuation into the next host handler
    Next(Option<Next>),
    /// Locale of the requesting user
    Locale(Option<String>),
    /// Result of the bound user checker
    User(Option<Value>),
}

impl Argument {
    /// Kind label, matching [`ParamKind::label`](crate::types::ParamKind::label)
    pub fn label(&self) -> &'static str {
        match self {
            Self::Service(_) => "srv",
            Self::Request(_) => "req",
            Self::Data(_) => "data",
            Self::Param(_) => "param",
            Self::Jwt(_) => "jwt",
            Self::Entities(_) => "entities",
            Self::Next(_) => "next",
            Self::Locale(_) => "locale",
            Self::User(_) => "user",
        }
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Service(service) => f.debug_tuple("Service").field(&service.name()).finish(),
            Self::Request(request) => f.debug_tuple("Request").field(request).finish(),
            Self::Data(value) => f.debug_tuple("Data").field(value).finish(),
            Self::Param(value) => f.debug_tuple("Param").field(value).finish(),
            Self::Jwt(token) => f.debug_tuple("Jwt").field(token).finish(),
            Self::Entities(value) => f.debug_tuple("Entities").field(value).finish(),
            Self::Next(next) => f.debug_tuple("Next").field(next).finish(),
            Self::Locale(locale) => f.debug_tuple("Locale").field(locale).finish(),
            Self::User(value) => f.debug_tuple("User").field(value).finish(),
        }
    }
}

/// Arguments in declared parameter order
///
/// The accessors check the argument kind at `index` so handler bodies can
/// propagate a wrong declaration with `?` instead of panicking.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    values: Vec<Argument>,
}

macro_rules! mismatch {
    ($index:expr, $expected:expr, $found:expr) => {
        Err(ArgumentError::Mismatch {
            index: $index,
            expected: $expected,
            found: $found.label(),
        })
    };
}

impl Arguments {
    /// Wrap resolved arguments
    pub fn new(values: Vec<Argument>) -> Self {
        Self { values }
    }

    /// Number of arguments
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no parameters were declared
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate in positional order
    pub fn iter(&self) -> impl Iterator<Item = &Argument> {
        self.values.iter()
    }

    /// Raw argument at `index`
    pub fn get(&self, index: usize) -> Result<&Argument, ArgumentError> {
        self.values.get(index).ok_or(ArgumentError::OutOfRange {
            index,
            len: self.values.len(),
        })
    }

    /// Host service at `index`
    pub fn service(&self, index: usize) -> Result<Arc<dyn ServiceHost>, ArgumentError> {
        match self.get(index)? {
            Argument::Service(service) => Ok(Arc::clone(service)),
            other => mismatch!(index, "srv", other),
        }
    }

    /// Request at `index`
    pub fn request(&self, index: usize) -> Result<Arc<Request>, ArgumentError> {
        match self.get(index)? {
            Argument::Request(request) => Ok(Arc::clone(request)),
            other => mismatch!(index, "req", other),
        }
    }

    /// Raw payload at `index`
    pub fn data(&self, index: usize) -> Result<&Value, ArgumentError> {
        match self.get(index)? {
            Argument::Data(value) => Ok(value),
            other => mismatch!(index, "data", other),
        }
    }

    /// Payload at `index`, decoded
    pub fn data_as<T: DeserializeOwned>(&self, index: usize) -> Result<T, ArgumentError> {
        decode(index, self.data(index)?)
    }

    /// Named payload field at `index`, decoded; `None` when the field is missing or null
    pub fn param<T: DeserializeOwned>(&self, index: usize) -> Result<Option<T>, ArgumentError> {
        match self.get(index)? {
            Argument::Param(value) => decode_present(index, value.as_ref()),
            other => mismatch!(index, "param", other),
        }
    }

    /// Bearer token at `index`
    pub fn jwt(&self, index: usize) -> Result<Option<&str>, ArgumentError> {
        match self.get(index)? {
            Argument::Jwt(token) => Ok(token.as_deref()),
            other => mismatch!(index, "jwt", other),
        }
    }

    /// After-phase entities at `index`
    pub fn entities(&self, index: usize) -> Result<Option<&Value>, ArgumentError> {
        match self.get(index)? {
            Argument::Entities(value) => Ok(value.as_ref()),
            other => mismatch!(index, "entities", other),
        }
    }

    /// Continuation at `index`
    pub fn next(&self, index: usize) -> Result<Option<Next>, ArgumentError> {
        match self.get(index)? {
            Argument::Next(next) => Ok(next.clone()),
            other => mismatch!(index, "next", other),
        }
    }

    /// User locale at `index`
    pub fn locale(&self, index: usize) -> Result<Option<&str>, ArgumentError> {
        match self.get(index)? {
            Argument::Locale(locale) => Ok(locale.as_deref()),
            other => mismatch!(index, "locale", other),
        }
    }

    /// User checker result at `index`, decoded; `None` when the checker found no user
    pub fn user<T: DeserializeOwned>(&self, index: usize) -> Result<Option<T>, ArgumentError> {
        match self.get(index)? {
            Argument::User(value) => decode_present(index, value.as_ref()),
            other => mismatch!(index, "user", other),
        }
    }
}

impl IntoIterator for Arguments {
    type Item = Argument;
    type IntoIter = std::vec::IntoIter<Argument>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

fn decode_present<T: DeserializeOwned>(
    index: usize,
    value: Option<&Value>,
) -> Result<Option<T>, ArgumentError> {
    value
        .filter(|value| !value.is_null())
        .map(|value| decode(index, value))
        .transpose()
}

fn decode<T: DeserializeOwned>(index: usize, value: &Value) -> Result<T, ArgumentError> {
    T::deserialize(value).map_err(|source| ArgumentError::Decode { index, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn sample() -> Arguments {
        Arguments::new(vec![
            Argument::Request(Request::builder("READ").build()),
            Argument::Param(Some(json!("Ann"))),
            Argument::Param(None),
            Argument::Jwt(Some("abc".into())),
        ])
    }

    #[test]
    fn test_typed_access() {
        let args = sample();
        assert_eq!(args.len(), 4);
        assert_eq!(args.request(0).unwrap().event(), "READ");
        assert_eq!(args.param::<String>(1).unwrap().as_deref(), Some("Ann"));
        assert_eq!(args.param::<String>(2).unwrap(), None);
        assert_eq!(args.jwt(3).unwrap(), Some("abc"));
    }

    #[test]
    fn test_kind_mismatch() {
        assert_matches!(
            sample().jwt(0),
            Err(ArgumentError::Mismatch {
                index: 0,
                expected: "jwt",
                found: "req"
            })
        );
    }

    #[test]
    fn test_out_of_range() {
        assert_matches!(
            sample().locale(9),
            Err(ArgumentError::OutOfRange { index: 9, len: 4 })
        );
    }

    #[test]
    fn test_decode_failure() {
        assert_matches!(sample().param::<u32>(1), Err(ArgumentError::Decode { index: 1, .. }));
    }

    #[test]
    fn test_null_is_absent() {
        let args = Arguments::new(vec![
            Argument::Param(Some(Value::Null)),
            Argument::User(Some(Value::Null)),
        ]);
        assert_eq!(args.param::<String>(0).unwrap(), None);
        assert_eq!(args.user::<String>(1).unwrap(), None);
    }
}
