//! Key Generator Module
//!
//! Derives deterministic cache keys from the key-relevant inputs of a call.
//!
//! Each argument is reduced to a `KeyArg` and serialized recursively:
//! null becomes a fixed marker, scalars their string form, sequences a
//! JSON array of serialized elements, and mappings a JSON object with
//! lexicographically sorted keys. Context-only inputs contribute nothing.
//! The prefix, operation name, non-empty positional parts and sorted
//! `name=value` parts are colon-joined and hashed with SHA-256.


use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Serialized form of an absent value.
pub const NULL_MARKER: &str = "None";

// == Key Argument ==
/// A call argument reduced to the shapes that matter for key derivation.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyArg {
    /// Absent value
    Null,
    /// String, number, boolean or the underlying value of an enumeration
    Scalar(String),
    /// Ordered sequence
    Seq(Vec<KeyArg>),
    /// Mapping; entries are always serialized in key order
    Map(BTreeMap<String, KeyArg>),
    /// Execution-context input excluded from the key
    Context,
    /// Anything else, by its display form
    Other(String),
}

impl KeyArg {
    /// Scalar from any displayable value. Use for enumerations by passing
    /// their underlying value.
    pub fn scalar(value: impl fmt::Display) -> Self {
        KeyArg::Scalar(value.to_string())
    }

    /// Fallback for values with no structural mapping.
    pub fn display(value: &impl fmt::Display) -> Self {
        KeyArg::Other(value.to_string())
    }

    // == Serialize ==
    /// Deterministic string form of this argument.
    pub fn serialize(&self) -> String {
        match self {
            KeyArg::Null => NULL_MARKER.to_string(),
            KeyArg::Scalar(s) | KeyArg::Other(s) => s.clone(),
            KeyArg::Seq(items) => Value::Array(
                items
                    .iter()
                    .map(|item| Value::String(item.serialize()))
                    .collect(),
            )
            .to_string(),
            KeyArg::Map(entries) => {
                let mut object = serde_json::Map::new();
                for (name, value) in entries {
                    object.insert(name.clone(), Value::String(value.serialize()));
                }
                Value::Object(object).to_string()
            }
            KeyArg::Context => String::new(),
        }
    }
}

// == Key Part Trait ==
/// Conversion of a Rust value into a `KeyArg`.
///
/// Implement this for domain types. Enumerations should map to their
/// underlying scalar:
///
/// ```ignore
/// impl KeyPart for TaskStatus {
///     fn key_arg(&self) -> KeyArg {
///         KeyArg::scalar(self.as_str())
///     }
/// }
/// ```
pub trait KeyPart {
    fn key_arg(&self) -> KeyArg;
}

impl KeyPart for KeyArg {
    fn key_arg(&self) -> KeyArg {
        self.clone()
    }
}

impl<T: KeyPart + ?Sized> KeyPart for &T {
    fn key_arg(&self) -> KeyArg {
        (**self).key_arg()
    }
}

impl KeyPart for str {
    fn key_arg(&self) -> KeyArg {
        KeyArg::Scalar(self.to_string())
    }
}

impl KeyPart for String {
    fn key_arg(&self) -> KeyArg {
        KeyArg::Scalar(self.clone())
    }
}

macro_rules! scalar_key_part {
    ($($ty:ty),* $(,)?) => {
        $(
            impl KeyPart for $ty {
                fn key_arg(&self) -> KeyArg {
                    KeyArg::Scalar(self.to_string())
                }
            }
        )*
    };
}

scalar_key_part!(bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

impl<T: KeyPart> KeyPart for Option<T> {
    fn key_arg(&self) -> KeyArg {
        match self {
            Some(value) => value.key_arg(),
            None => KeyArg::Null,
        }
    }
}

impl<T: KeyPart> KeyPart for [T] {
    fn key_arg(&self) -> KeyArg {
        KeyArg::Seq(self.iter().map(KeyPart::key_arg).collect())
    }
}

impl<T: KeyPart> KeyPart for Vec<T> {
    fn key_arg(&self) -> KeyArg {
        self.as_slice().key_arg()
    }
}

impl<K: fmt::Display, V: KeyPart> KeyPart for BTreeMap<K, V> {
    fn key_arg(&self) -> KeyArg {
        KeyArg::Map(
            self.iter()
                .map(|(k, v)| (k.to_string(), v.key_arg()))
                .collect(),
        )
    }
}

impl<K: fmt::Display, V: KeyPart, S> KeyPart for HashMap<K, V, S> {
    fn key_arg(&self) -> KeyArg {
        KeyArg::Map(
            self.iter()
                .map(|(k, v)| (k.to_string(), v.key_arg()))
                .collect(),
        )
    }
}

impl KeyPart for Value {
    fn key_arg(&self) -> KeyArg {
        match self {
            Value::Null => KeyArg::Null,
            Value::Bool(b) => KeyArg::scalar(b),
            Value::Number(n) => KeyArg::scalar(n),
            Value::String(s) => KeyArg::Scalar(s.clone()),
            Value::Array(items) => items.key_arg(),
            Value::Object(entries) => KeyArg::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.key_arg()))
                    .collect(),
            ),
        }
    }
}

/// Marks a value as execution context: it is passed along but never
/// contributes to the key.
#[derive(Debug, Clone, Copy)]
pub struct ContextOnly<T>(pub T);

impl<T> KeyPart for ContextOnly<T> {
    fn key_arg(&self) -> KeyArg {
        KeyArg::Context
    }
}

// == Call Arguments ==
/// Key-relevant inputs of one call: ordered positional arguments plus
/// named arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    positional: Vec<KeyArg>,
    named: BTreeMap<String, KeyArg>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    pub fn arg(mut self, value: impl KeyPart) -> Self {
        self.positional.push(value.key_arg());
        self
    }

    /// Sets a named argument; insertion order is irrelevant to the key.
    pub fn named(mut self, name: impl Into<String>, value: impl KeyPart) -> Self {
        self.named.insert(name.into(), value.key_arg());
        self
    }

    pub fn positional(&self) -> &[KeyArg] {
        &self.positional
    }

    pub fn named_args(&self) -> &BTreeMap<String, KeyArg> {
        &self.named
    }
}

/// Extraction of `CallArgs` from an argument bundle.
pub trait KeyArgs {
    fn call_args(&self) -> CallArgs;
}

impl KeyArgs for CallArgs {
    fn call_args(&self) -> CallArgs {
        self.clone()
    }
}

impl KeyArgs for () {
    fn call_args(&self) -> CallArgs {
        CallArgs::new()
    }
}

macro_rules! tuple_key_args {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: KeyPart),+> KeyArgs for ($($name,)+) {
            fn call_args(&self) -> CallArgs {
                CallArgs::new()$(.arg(&self.$idx))+
            }
        }
    };
}

tuple_key_args!(A: 0);
tuple_key_args!(A: 0, B: 1);
tuple_key_args!(A: 0, B: 1, C: 2);
tuple_key_args!(A: 0, B: 1, C: 2, D: 3);
tuple_key_args!(A: 0, B: 1, C: 2, D: 3, E: 4);
tuple_key_args!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);

// == Key Derivation ==
/// Colon-joined pre-hash material for a call.
pub fn key_material(prefix: &str, operation: &str, args: &CallArgs) -> String {
    let mut parts = vec![prefix.to_string(), operation.to_string()];

    for arg in &args.positional {
        let serialized = arg.serialize();
        if !serialized.is_empty() {
            parts.push(serialized);
        }
    }

    for (name, arg) in &args.named {
        let serialized = arg.serialize();
        if !serialized.is_empty() {
            parts.push(format!("{}={}", name, serialized));
        }
    }

    parts.join(":")
}

/// Hex-encoded SHA-256 digest of the call's key material.
pub fn derive_key(prefix: &str, operation: &str, args: &CallArgs) -> String {
    let material = key_material(prefix, operation, args);
    hex::encode(Sha256::digest(material.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy)]
    enum Priority {
        Low,
        High,
    }

    impl KeyPart for Priority {
        fn key_arg(&self) -> KeyArg {
            match self {
                Priority::Low => KeyArg::scalar(1),
                Priority::High => KeyArg::scalar(3),
            }
        }
    }

    struct Session {
        id: u32,
    }

    #[test]
    fn test_scalar_serialization() {
        assert_eq!("abc".key_arg().serialize(), "abc");
        assert_eq!(42u32.key_arg().serialize(), "42");
        assert_eq!((-7i64).key_arg().serialize(), "-7");
        assert_eq!(true.key_arg().serialize(), "true");
        assert_eq!(2.5f64.key_arg().serialize(), "2.5");
    }

    #[test]
    fn test_null_uses_marker() {
        let absent: Option<u32> = None;
        assert_eq!(absent.key_arg().serialize(), NULL_MARKER);
        assert_eq!(Value::Null.key_arg().serialize(), NULL_MARKER);
    }

    #[test]
    fn test_enum_serializes_underlying_scalar() {
        assert_eq!(Priority::High.key_arg().serialize(), "3");
        assert_eq!(Priority::Low.key_arg(), 1.key_arg());
    }

    #[test]
    fn test_sequence_serialization() {
        let items = vec![1, 2, 3];
        assert_eq!(items.key_arg().serialize(), r#"["1","2","3"]"#);

        let nested = vec![vec!["a"], vec![]];
        assert_eq!(nested.key_arg().serialize(), r#"["[\"a\"]","[]"]"#);
    }

    #[test]
    fn test_map_serialization_sorted() {
        let mut map = HashMap::new();
        map.insert("zeta", 1);
        map.insert("alpha", 2);
        map.insert("mid", 3);
        assert_eq!(
            map.key_arg().serialize(),
            r#"{"alpha":"2","mid":"3","zeta":"1"}"#
        );
    }

    #[test]
    fn test_json_value_conversion() {
        let value = serde_json::json!({"b": [1, null], "a": "x"});
        assert_eq!(
            value.key_arg().serialize(),
            r#"{"a":"x","b":"[\"1\",\"None\"]"}"#
        );
    }

    #[test]
    fn test_context_contributes_nothing() {
        let session = Session { id: 9 };
        assert_eq!(ContextOnly(&session).key_arg().serialize(), "");
        assert_eq!(session.id, 9);
    }

    #[test]
    fn test_key_material_layout() {
        let args = CallArgs::new()
            .arg(ContextOnly(()))
            .arg(5)
            .named("skip", 0)
            .named("limit", 100);
        assert_eq!(
            key_material("tasks_by_owner", "get_tasks_by_owner", &args),
            "tasks_by_owner:get_tasks_by_owner:5:limit=100:skip=0"
        );
    }

    #[test]
    fn test_empty_parts_are_skipped() {
        let args = CallArgs::new().arg("").named("ctx", ContextOnly(1));
        assert_eq!(key_material("", "op", &args), ":op");
    }

    #[test]
    fn test_derive_key_is_hex_sha256() {
        let key = derive_key("p", "op", &CallArgs::new());
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(key, hex::encode(Sha256::digest(b"p:op")));
    }

    #[test]
    fn test_named_order_irrelevant() {
        let first = CallArgs::new().named("skip", 0).named("limit", 10);
        let second = CallArgs::new().named("limit", 10).named("skip", 0);
        assert_eq!(derive_key("", "op", &first), derive_key("", "op", &second));
    }

    #[test]
    fn test_context_identity_irrelevant() {
        let a = Session { id: 1 };
        let b = Session { id: 2 };
        let with_a = CallArgs::new().arg(ContextOnly(&a)).arg(7);
        let with_b = CallArgs::new().arg(ContextOnly(&b)).arg(7);
        assert_eq!(derive_key("", "op", &with_a), derive_key("", "op", &with_b));
    }

    #[test]
    fn test_changed_value_changes_key() {
        let base = derive_key("", "op", &(1, "x").call_args());
        assert_ne!(base, derive_key("", "op", &(2, "x").call_args()));
        assert_ne!(base, derive_key("", "op", &(1, "y").call_args()));
        assert_ne!(base, derive_key("other", "op", &(1, "x").call_args()));
        assert_ne!(base, derive_key("", "other", &(1, "x").call_args()));
    }

    #[test]
    fn test_changed_named_value_changes_key() {
        let base = CallArgs::new().arg(1).named("skip", 0).named("limit", 10);
        let changed = CallArgs::new().arg(1).named("skip", 0).named("limit", 20);
        assert_ne!(derive_key("", "op", &base), derive_key("", "op", &changed));

        let renamed = CallArgs::new().arg(1).named("skip", 0).named("max", 10);
        assert_ne!(derive_key("", "op", &base), derive_key("", "op", &renamed));
    }

    #[test]
    fn test_tuple_args_match_builder() {
        let tuple = (3u64, "open", Some(true)).call_args();
        let built = CallArgs::new().arg(3u64).arg("open").arg(Some(true));
        assert_eq!(tuple, built);
        assert_eq!(().call_args(), CallArgs::new());
    }
}
