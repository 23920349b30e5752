//! Stack item implementation for the Neo debugger VM.
//!
//! Values manipulated by the interpreter. Compound items (arrays, structs,
//! maps) are shared by reference so that the DUP-then-mutate idiom emitted
//! by contract compilers behaves correctly; structs are additionally
//! deep-copied when stored into another collection and compare by value.

use crate::error::{VmError, VmResult};
use num_bigint::BigInt;
use num_traits::Zero;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// A host object exposed to scripts through an InteropInterface item.
pub trait InteropInterface: fmt::Debug + Send + Sync {
    /// Gets the type of the interop interface.
    fn interface_type(&self) -> &str;

    /// Allows downcasting to concrete types.
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Shared element storage of an array or struct item.
pub type SharedItems = Arc<Mutex<Vec<StackItem>>>;

/// Shared entry storage of a map item.
pub type SharedEntries = Arc<Mutex<Vec<(StackItem, StackItem)>>>;

/// Represents a value in the Neo VM.
#[derive(Clone)]
pub enum StackItem {
    /// An immutable byte array.
    ByteArray(Vec<u8>),

    /// An unbounded integer.
    Integer(BigInt),

    /// A boolean value.
    Boolean(bool),

    /// An ordered sequence of items.
    Array(SharedItems),

    /// Like an array, but value-copied when stored and compared by value.
    Struct(SharedItems),

    /// An ordered key/value collection.
    Map(SharedEntries),

    /// A host object handle.
    InteropInterface(Arc<dyn InteropInterface>),
}

impl StackItem {
    /// Creates a boolean stack item.
    pub fn from_bool(value: bool) -> Self {
        StackItem::Boolean(value)
    }

    /// Creates an integer stack item.
    pub fn from_int<T: Into<BigInt>>(value: T) -> Self {
        StackItem::Integer(value.into())
    }

    /// Creates a byte array stack item.
    pub fn from_byte_array<T: Into<Vec<u8>>>(value: T) -> Self {
        StackItem::ByteArray(value.into())
    }

    /// Creates an array stack item.
    pub fn from_array(items: Vec<StackItem>) -> Self {
        StackItem::Array(Arc::new(Mutex::new(items)))
    }

    /// Creates a struct stack item.
    pub fn from_struct(items: Vec<StackItem>) -> Self {
        StackItem::Struct(Arc::new(Mutex::new(items)))
    }

    /// Creates an empty map stack item.
    pub fn new_map() -> Self {
        StackItem::Map(Arc::new(Mutex::new(Vec::new())))
    }

    /// Creates an interop interface stack item.
    pub fn from_interface<T: InteropInterface + 'static>(value: T) -> Self {
        StackItem::InteropInterface(Arc::new(value))
    }

    /// Returns a short name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            StackItem::ByteArray(_) => "ByteArray",
            StackItem::Integer(_) => "Integer",
            StackItem::Boolean(_) => "Boolean",
            StackItem::Array(_) => "Array",
            StackItem::Struct(_) => "Struct",
            StackItem::Map(_) => "Map",
            StackItem::InteropInterface(_) => "InteropInterface",
        }
    }

    /// Converts the item to a boolean.
    pub fn as_bool(&self) -> VmResult<bool> {
        match self {
            StackItem::Boolean(b) => Ok(*b),
            StackItem::Integer(i) => Ok(!i.is_zero()),
            StackItem::ByteArray(b) => Ok(b.iter().any(|&byte| byte != 0)),
            StackItem::Array(a) | StackItem::Struct(a) => Ok(!a.lock().is_empty()),
            StackItem::Map(m) => Ok(!m.lock().is_empty()),
            StackItem::InteropInterface(_) => Ok(true),
        }
    }

    /// Converts the item to an unbounded integer.
    ///
    /// Byte arrays are interpreted as signed two's-complement little-endian.
    pub fn as_int(&self) -> VmResult<BigInt> {
        match self {
            StackItem::Integer(i) => Ok(i.clone()),
            StackItem::Boolean(b) => Ok(BigInt::from(*b as u8)),
            StackItem::ByteArray(b) => {
                if b.is_empty() {
                    Ok(BigInt::zero())
                } else {
                    Ok(BigInt::from_signed_bytes_le(b))
                }
            }
            other => Err(VmError::invalid_type(other.type_name(), "Integer")),
        }
    }

    /// Converts the item to a byte array.
    ///
    /// Integers yield the minimal signed two's-complement little-endian
    /// encoding; zero yields the empty array.
    pub fn as_bytes(&self) -> VmResult<Vec<u8>> {
        match self {
            StackItem::ByteArray(b) => Ok(b.clone()),
            StackItem::Boolean(b) => Ok(vec![*b as u8]),
            StackItem::Integer(i) => Ok(int_to_bytes(i)),
            other => Err(VmError::invalid_type(other.type_name(), "ByteArray")),
        }
    }

    /// Returns a snapshot of the elements of an array or struct.
    pub fn as_items(&self) -> VmResult<Vec<StackItem>> {
        match self {
            StackItem::Array(a) | StackItem::Struct(a) => Ok(a.lock().clone()),
            other => Err(VmError::invalid_type(other.type_name(), "Array")),
        }
    }

    /// Returns `true` for array, struct or map items.
    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            StackItem::Array(_) | StackItem::Struct(_) | StackItem::Map(_)
        )
    }

    /// Creates a copy that does not share element storage with `self`.
    ///
    /// Applied to struct values when they are stored into a collection.
    pub fn deep_copy(&self) -> StackItem {
        match self {
            StackItem::Array(a) => StackItem::from_array(deep_copy_items(a)),
            StackItem::Struct(s) => StackItem::from_struct(deep_copy_items(s)),
            StackItem::Map(m) => {
                let entries = m
                    .lock()
                    .iter()
                    .map(|(k, v)| (k.deep_copy(), v.deep_copy()))
                    .collect();
                StackItem::Map(Arc::new(Mutex::new(entries)))
            }
            other => other.clone(),
        }
    }

    /// Equality with Neo semantics: primitives compare by encoded bytes,
    /// arrays and maps by identity, structs by value.
    pub fn equals(&self, other: &StackItem) -> bool {
        match (self, other) {
            (StackItem::Array(a), StackItem::Array(b)) => Arc::ptr_eq(a, b),
            (StackItem::Map(a), StackItem::Map(b)) => Arc::ptr_eq(a, b),
            (StackItem::InteropInterface(a), StackItem::InteropInterface(b)) => Arc::ptr_eq(a, b),
            (StackItem::Struct(a), StackItem::Struct(b)) => {
                if Arc::ptr_eq(a, b) {
                    return true;
                }
                let a = a.lock();
                let b = b.lock();
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
            }
            (a, b) => match (a.as_bytes(), b.as_bytes()) {
                (Ok(a), Ok(b)) => a == b,
                _ => false,
            },
        }
    }
}

fn deep_copy_items(items: &SharedItems) -> Vec<StackItem> {
    items.lock().iter().map(StackItem::deep_copy).collect()
}

/// Encodes an integer as minimal signed two's-complement little-endian bytes.
pub fn int_to_bytes(value: &BigInt) -> Vec<u8> {
    if value.is_zero() {
        Vec::new()
    } else {
        value.to_signed_bytes_le()
    }
}

impl fmt::Debug for StackItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackItem::ByteArray(b) => write!(f, "ByteArray(0x{})", hex::encode(b)),
            StackItem::Integer(i) => write!(f, "Integer({i})"),
            StackItem::Boolean(b) => write!(f, "Boolean({b})"),
            StackItem::Array(a) => write!(f, "Array({:?})", a.lock()),
            StackItem::Struct(s) => write!(f, "Struct({:?})", s.lock()),
            StackItem::Map(m) => write!(f, "Map({:?})", m.lock()),
            StackItem::InteropInterface(i) => {
                write!(f, "InteropInterface({})", i.interface_type())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_byte_round_trip() {
        for value in [0i64, 1, -1, 127, 128, -128, 255, 256, 65535, -65536] {
            let item = StackItem::from_int(value);
            let bytes = item.as_bytes().unwrap();
            let back = StackItem::from_byte_array(bytes).as_int().unwrap();
            assert_eq!(back, BigInt::from(value), "round trip of {value}");
        }
    }

    #[test]
    fn test_zero_is_empty_byte_array() {
        assert!(StackItem::from_int(0).as_bytes().unwrap().is_empty());
        assert_eq!(
            StackItem::from_byte_array(Vec::new()).as_int().unwrap(),
            BigInt::zero()
        );
    }

    #[test]
    fn test_truthiness() {
        assert!(!StackItem::from_int(0).as_bool().unwrap());
        assert!(StackItem::from_int(-3).as_bool().unwrap());
        assert!(!StackItem::from_byte_array(vec![0, 0]).as_bool().unwrap());
        assert!(StackItem::from_byte_array(vec![0, 1]).as_bool().unwrap());
        assert!(!StackItem::from_array(Vec::new()).as_bool().unwrap());
    }

    #[test]
    fn test_array_identity_vs_struct_value() {
        let array = StackItem::from_array(vec![StackItem::from_int(1)]);
        let alias = array.clone();
        assert!(array.equals(&alias));
        assert!(!array.equals(&StackItem::from_array(vec![StackItem::from_int(1)])));

        let a = StackItem::from_struct(vec![StackItem::from_int(1)]);
        let b = StackItem::from_struct(vec![StackItem::from_int(1)]);
        assert!(a.equals(&b));
    }

    #[test]
    fn test_primitive_equality_coerces() {
        assert!(StackItem::from_int(1).equals(&StackItem::from_bool(true)));
        assert!(StackItem::from_byte_array(vec![7]).equals(&StackItem::from_int(7)));
    }

    #[test]
    fn test_array_aliasing() {
        let array = StackItem::from_array(Vec::new());
        let alias = array.clone();
        if let StackItem::Array(items) = &array {
            items.lock().push(StackItem::from_int(42));
        }
        assert_eq!(alias.as_items().unwrap().len(), 1);
    }

    #[test]
    fn test_deep_copy_detaches_storage() {
        let original = StackItem::from_struct(vec![StackItem::from_int(1)]);
        let copy = original.deep_copy();
        if let StackItem::Struct(items) = &original {
            items.lock().push(StackItem::from_int(2));
        }
        assert_eq!(copy.as_items().unwrap().len(), 1);
    }
}
