//! Untyped value graph walked by the normalizer.
//!
//! Pointers, slices and maps share their storage through `Rc<RefCell<_>>`:
//! cloning one of them clones the handle, so two handles observe the same
//! mutations and the graph may contain cycles. Records and arrays own their
//! elements and are copied on clone.
//!
//! Nil pointers, slices and maps carry a [`Type`] so that a nil collection can
//! be replaced by an empty one of the same type. A [`Value::Dynamic`] slot
//! holding `None` is the untyped "no value" and has no type at all.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Storage shared between clones of a reference-typed value.
pub type Shared<T> = Rc<RefCell<T>>;

fn share<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

fn address<T>(shared: &Shared<T>) -> usize {
    Rc::as_ptr(shared) as *const () as usize
}

#[derive(Debug, Clone, PartialEq)]
pub enum Number {
    I64(i64),
    U64(u64),
    F64(f64),
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::I64(i) => write!(f, "{}", i),
            Number::U64(u) => write!(f, "{}", u),
            Number::F64(num) => write!(f, "{}", num),
        }
    }
}

/// Shape of a value node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Ptr,
    Slice,
    Map,
    Dynamic,
    Array,
    Record,
    Scalar,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kind::Ptr => "pointer",
            Kind::Slice => "slice",
            Kind::Map => "map",
            Kind::Dynamic => "dynamic",
            Kind::Array => "array",
            Kind::Record => "record",
            Kind::Scalar => "scalar",
        })
    }
}

/// Static type of a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Bool,
    Int,
    Uint,
    Float,
    String,
    /// A dynamic slot that may hold a value of any type.
    Any,
    Ptr(Box<Type>),
    Slice(Box<Type>),
    Array(Box<Type>, usize),
    Map(Box<Type>, Box<Type>),
    /// A record type, referred to by name so recursive records stay finite.
    Named(String),
}

impl Type {
    pub fn ptr(elem: Type) -> Type {
        Type::Ptr(Box::new(elem))
    }

    pub fn slice(elem: Type) -> Type {
        Type::Slice(Box::new(elem))
    }

    pub fn array(elem: Type, len: usize) -> Type {
        Type::Array(Box::new(elem), len)
    }

    pub fn map(key: Type, value: Type) -> Type {
        Type::Map(Box::new(key), Box::new(value))
    }

    pub fn named(name: impl Into<String>) -> Type {
        Type::Named(name.into())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => f.write_str("bool"),
            Type::Int => f.write_str("int"),
            Type::Uint => f.write_str("uint"),
            Type::Float => f.write_str("float"),
            Type::String => f.write_str("string"),
            Type::Any => f.write_str("any"),
            Type::Ptr(elem) => write!(f, "ptr<{}>", elem),
            Type::Slice(elem) => write!(f, "[{}]", elem),
            Type::Array(elem, len) => write!(f, "[{}; {}]", elem, len),
            Type::Map(key, value) => write!(f, "map<{}, {}>", key, value),
            Type::Named(name) => f.write_str(name),
        }
    }
}

/// Map key. Keys are scalars and totally ordered, so maps iterate and
/// serialize in a stable order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Bool(bool),
    Int(i64),
    Uint(u64),
    String(String),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Bool(b) => write!(f, "{}", b),
            Key::Int(i) => write!(f, "{}", i),
            Key::Uint(u) => write!(f, "{}", u),
            Key::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Key {
    fn from(b: bool) -> Self {
        Key::Bool(b)
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

impl From<i32> for Key {
    fn from(i: i32) -> Self {
        Key::Int(i64::from(i))
    }
}

impl From<u64> for Key {
    fn from(u: u64) -> Self {
        Key::Uint(u)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::String(s.to_owned())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::String(s)
    }
}

/// Optional reference. A nil pointer models a truly optional value and is
/// never allocated by the normalizer.
#[derive(Clone)]
pub struct Ptr {
    elem: Type,
    target: Option<Shared<Value>>,
}

impl Ptr {
    pub fn new(value: Value) -> Self {
        Self {
            elem: value.type_of(),
            target: Some(share(value)),
        }
    }

    pub fn nil(elem: Type) -> Self {
        Self { elem, target: None }
    }

    /// Points at an existing cell, e.g. to close a cycle back to an ancestor.
    pub fn from_shared(elem: Type, target: Shared<Value>) -> Self {
        Self {
            elem,
            target: Some(target),
        }
    }

    pub fn elem(&self) -> &Type {
        &self.elem
    }

    pub fn is_nil(&self) -> bool {
        self.target.is_none()
    }

    pub fn target(&self) -> Option<&Shared<Value>> {
        self.target.as_ref()
    }

    /// Returns true when both pointers refer to the same cell.
    pub fn same_target(&self, other: &Ptr) -> bool {
        match (&self.target, &other.target) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub(crate) fn address(&self) -> Option<usize> {
        self.target.as_ref().map(address)
    }
}

impl fmt::Debug for Ptr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.address() {
            Some(addr) => write!(f, "Ptr<{}>({:#x})", self.elem, addr),
            None => write!(f, "Ptr<{}>(nil)", self.elem),
        }
    }
}

/// Ordered, growable sequence with shared backing storage.
#[derive(Clone)]
pub struct Slice {
    elem: Type,
    items: Option<Shared<Vec<Value>>>,
}

impl Slice {
    pub fn new(elem: Type, items: Vec<Value>) -> Self {
        Self {
            elem,
            items: Some(share(items)),
        }
    }

    pub fn nil(elem: Type) -> Self {
        Self { elem, items: None }
    }

    pub fn elem(&self) -> &Type {
        &self.elem
    }

    pub fn is_nil(&self) -> bool {
        self.items.is_none()
    }

    /// Length of the slice; a nil slice has length zero.
    pub fn len(&self) -> usize {
        self.items.as_ref().map_or(0, |items| items.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn items(&self) -> Option<&Shared<Vec<Value>>> {
        self.items.as_ref()
    }

    /// Returns a handle to the element at `index`.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.items
            .as_ref()
            .and_then(|items| items.borrow().get(index).cloned())
    }

    pub(crate) fn initialize(&mut self) {
        self.items = Some(share(Vec::new()));
    }

    pub(crate) fn address(&self) -> Option<usize> {
        self.items.as_ref().map(address)
    }
}

impl fmt::Debug for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.address() {
            Some(addr) => write!(f, "Slice<{}>(len {}, {:#x})", self.elem, self.len(), addr),
            None => write!(f, "Slice<{}>(nil)", self.elem),
        }
    }
}

/// Associative map with shared storage.
#[derive(Clone)]
pub struct Map {
    key: Type,
    value: Type,
    entries: Option<Shared<BTreeMap<Key, Value>>>,
}

impl Map {
    pub fn new<K, I>(key: Type, value: Type, entries: I) -> Self
    where
        K: Into<Key>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let entries = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self {
            key,
            value,
            entries: Some(share(entries)),
        }
    }

    pub fn nil(key: Type, value: Type) -> Self {
        Self {
            key,
            value,
            entries: None,
        }
    }

    pub fn key_type(&self) -> &Type {
        &self.key
    }

    pub fn value_type(&self) -> &Type {
        &self.value
    }

    pub fn is_nil(&self) -> bool {
        self.entries.is_none()
    }

    pub fn len(&self) -> usize {
        self.entries
            .as_ref()
            .map_or(0, |entries| entries.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> Option<&Shared<BTreeMap<Key, Value>>> {
        self.entries.as_ref()
    }

    pub fn contains_key(&self, key: impl Into<Key>) -> bool {
        let key = key.into();
        self.entries
            .as_ref()
            .is_some_and(|entries| entries.borrow().contains_key(&key))
    }

    /// Returns a handle to the value stored under `key`.
    pub fn get(&self, key: impl Into<Key>) -> Option<Value> {
        let key = key.into();
        self.entries
            .as_ref()
            .and_then(|entries| entries.borrow().get(&key).cloned())
    }

    /// Inserts into a non-nil map. Returns false when the map is nil.
    pub fn insert(&self, key: impl Into<Key>, value: Value) -> bool {
        match &self.entries {
            Some(entries) => {
                entries.borrow_mut().insert(key.into(), value);
                true
            }
            None => false,
        }
    }

    pub(crate) fn initialize(&mut self) {
        self.entries = Some(share(BTreeMap::new()));
    }

    pub(crate) fn address(&self) -> Option<usize> {
        self.entries.as_ref().map(address)
    }
}

impl fmt::Debug for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.address() {
            Some(addr) => write!(
                f,
                "Map<{}, {}>(len {}, {:#x})",
                self.key,
                self.value,
                self.len(),
                addr
            ),
            None => write!(f, "Map<{}, {}>(nil)", self.key, self.value),
        }
    }
}

/// Fixed-size sequence. Arrays are never nil.
#[derive(Debug, Clone)]
pub struct Array {
    elem: Type,
    items: Vec<Value>,
}

impl Array {
    pub fn new(elem: Type, items: Vec<Value>) -> Self {
        Self { elem, items }
    }

    pub fn elem(&self) -> &Type {
        &self.elem
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [Value] {
        &mut self.items
    }
}

/// Whether a record field may be assigned from outside the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Exported,
    Internal,
}

#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    visibility: Visibility,
    embedded: bool,
    value: Value,
}

impl Field {
    pub fn new(name: impl Into<String>, visibility: Visibility, value: Value) -> Self {
        Self {
            name: name.into(),
            visibility,
            embedded: false,
            value,
        }
    }

    pub fn exported(name: impl Into<String>, value: Value) -> Self {
        Self::new(name, Visibility::Exported, value)
    }

    pub fn internal(name: impl Into<String>, value: Value) -> Self {
        Self::new(name, Visibility::Internal, value)
    }

    /// Marks the field as an anonymous (embedded) record. Serialization
    /// flattens its exported fields into the parent.
    pub fn embedded(mut self) -> Self {
        self.embedded = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_exported(&self) -> bool {
        self.visibility == Visibility::Exported
    }

    pub fn is_embedded(&self) -> bool {
        self.embedded
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut Value {
        &mut self.value
    }
}

/// Aggregate of named fields in declaration order.
#[derive(Debug, Clone)]
pub struct Record {
    name: String,
    fields: Vec<Field>,
}

impl Record {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Appends an exported field.
    pub fn field(self, name: impl Into<String>, value: Value) -> Self {
        self.with_field(Field::exported(name, value))
    }

    /// Appends an internal field.
    pub fn internal(self, name: impl Into<String>, value: Value) -> Self {
        self.with_field(Field::internal(name, value))
    }

    /// Embeds `record` as an exported anonymous field named after its type.
    pub fn embed(self, record: Record) -> Self {
        let name = record.name.clone();
        self.with_field(Field::exported(name, Value::Record(record)).embedded())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut [Field] {
        &mut self.fields
    }

    /// Looks a field up by name. Fields of embedded records are promoted, so
    /// they are found when the record itself has no field of that name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        if let Some(field) = self.fields.iter().find(|f| f.name == name) {
            return Some(&field.value);
        }
        self.fields
            .iter()
            .filter(|f| f.embedded)
            .find_map(|f| match &f.value {
                Value::Record(inner) => inner.get(name),
                _ => None,
            })
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields
            .iter_mut()
            .find(|f| f.name == name)
            .map(|f| &mut f.value)
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Ptr(Ptr),
    Slice(Slice),
    Map(Map),
    /// Slot holding a value of any type; `None` is the untyped "no value".
    Dynamic(Option<Box<Value>>),
    Array(Array),
    Record(Record),
    Bool(bool),
    Number(Number),
    String(String),
}

impl Value {
    /// Allocates `value` and returns a pointer to it.
    pub fn ptr(value: Value) -> Value {
        Value::Ptr(Ptr::new(value))
    }

    pub fn nil_ptr(elem: Type) -> Value {
        Value::Ptr(Ptr::nil(elem))
    }

    pub fn slice(elem: Type, items: Vec<Value>) -> Value {
        Value::Slice(Slice::new(elem, items))
    }

    pub fn nil_slice(elem: Type) -> Value {
        Value::Slice(Slice::nil(elem))
    }

    pub fn map<K, I>(key: Type, value: Type, entries: I) -> Value
    where
        K: Into<Key>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Map(Map::new(key, value, entries))
    }

    pub fn nil_map(key: Type, value: Type) -> Value {
        Value::Map(Map::nil(key, value))
    }

    pub fn array(elem: Type, items: Vec<Value>) -> Value {
        Value::Array(Array::new(elem, items))
    }

    /// Wraps `value` in a dynamic slot.
    pub fn dynamic(value: Value) -> Value {
        Value::Dynamic(Some(Box::new(value)))
    }

    pub fn untyped_nil() -> Value {
        Value::Dynamic(None)
    }

    pub fn kind(&self) -> Kind {
        match self {
            Value::Ptr(_) => Kind::Ptr,
            Value::Slice(_) => Kind::Slice,
            Value::Map(_) => Kind::Map,
            Value::Dynamic(_) => Kind::Dynamic,
            Value::Array(_) => Kind::Array,
            Value::Record(_) => Kind::Record,
            Value::Bool(_) | Value::Number(_) | Value::String(_) => Kind::Scalar,
        }
    }

    /// Static type of the value. A dynamic slot reports [`Type::Any`]; use
    /// [`Value::concrete_type`] for the type of what it holds.
    pub fn type_of(&self) -> Type {
        match self {
            Value::Ptr(ptr) => Type::ptr(ptr.elem.clone()),
            Value::Slice(slice) => Type::slice(slice.elem.clone()),
            Value::Map(map) => Type::map(map.key.clone(), map.value.clone()),
            Value::Dynamic(_) => Type::Any,
            Value::Array(array) => Type::array(array.elem.clone(), array.items.len()),
            Value::Record(record) => Type::named(record.name.clone()),
            Value::Bool(_) => Type::Bool,
            Value::Number(Number::I64(_)) => Type::Int,
            Value::Number(Number::U64(_)) => Type::Uint,
            Value::Number(Number::F64(_)) => Type::Float,
            Value::String(_) => Type::String,
        }
    }

    /// Type of the value held by a dynamic slot, or of the value itself.
    /// `None` for the untyped nil.
    pub fn concrete_type(&self) -> Option<Type> {
        match self {
            Value::Dynamic(None) => None,
            Value::Dynamic(Some(inner)) => inner.concrete_type(),
            other => Some(other.type_of()),
        }
    }

    /// True for nil pointers, slices and maps, and for the untyped nil.
    pub fn is_nil(&self) -> bool {
        match self {
            Value::Ptr(ptr) => ptr.is_nil(),
            Value::Slice(slice) => slice.is_nil(),
            Value::Map(map) => map.is_nil(),
            Value::Dynamic(slot) => slot.is_none(),
            _ => false,
        }
    }

    pub fn is_untyped_nil(&self) -> bool {
        matches!(self, Value::Dynamic(None))
    }

    pub fn is_scalar(&self) -> bool {
        self.kind() == Kind::Scalar
    }

    pub fn as_ptr(&self) -> Option<&Ptr> {
        match self {
            Value::Ptr(ptr) => Some(ptr),
            _ => None,
        }
    }

    pub fn as_slice(&self) -> Option<&Slice> {
        match self {
            Value::Slice(slice) => Some(slice),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    /// The value held by a dynamic slot.
    pub fn as_dynamic(&self) -> Option<&Value> {
        match self {
            Value::Dynamic(Some(inner)) => Some(inner),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    /// Identity of the storage behind a non-nil pointer, slice or map.
    pub(crate) fn identity(&self) -> Option<usize> {
        match self {
            Value::Ptr(ptr) => ptr.address(),
            Value::Slice(slice) => slice.address(),
            Value::Map(map) => map.address(),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Number(Number::I64(i))
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Number(Number::I64(i64::from(i)))
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Value::Number(Number::U64(u))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Number(Number::F64(f))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(record)
    }
}

impl From<Ptr> for Value {
    fn from(ptr: Ptr) -> Self {
        Value::Ptr(ptr)
    }
}

impl From<Slice> for Value {
    fn from(slice: Slice) -> Self {
        Value::Slice(slice)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(map)
    }
}

impl From<Array> for Value {
    fn from(array: Array) -> Self {
        Value::Array(array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_reference_storage() {
        let slice = Slice::new(Type::Int, vec![Value::from(1)]);
        let copy = slice.clone();
        assert_eq!(slice.address(), copy.address());

        let record = Record::new("R").field("s", Value::Slice(slice.clone()));
        let copied = record.clone();
        let inner = copied.get("s").and_then(Value::as_slice).map(Slice::address);
        assert_eq!(inner, Some(slice.address()));
    }

    #[test]
    fn nil_values_have_no_identity() {
        assert_eq!(Value::nil_slice(Type::Any).identity(), None);
        assert_eq!(Value::nil_map(Type::String, Type::Any).identity(), None);
        assert_eq!(Value::nil_ptr(Type::Int).identity(), None);
        assert_eq!(Value::untyped_nil().identity(), None);
    }

    #[test]
    fn type_names() {
        let v = Value::nil_map(Type::String, Type::slice(Type::ptr(Type::named("T"))));
        assert_eq!(v.type_of().to_string(), "map<string, [ptr<T>]>");
        assert_eq!(Type::array(Type::Any, 2).to_string(), "[any; 2]");
    }

    #[test]
    fn concrete_type_looks_through_dynamic_slots() {
        let v = Value::dynamic(Value::nil_map(Type::String, Type::Int));
        assert_eq!(v.type_of(), Type::Any);
        assert_eq!(v.concrete_type(), Some(Type::map(Type::String, Type::Int)));
        assert_eq!(Value::untyped_nil().concrete_type(), None);
    }

    #[test]
    fn embedded_fields_are_promoted() {
        let embedded = Record::new("Embedded").field("slice", Value::nil_slice(Type::String));
        let container = Record::new("Container")
            .embed(embedded)
            .field("explicit", Value::nil_slice(Type::Int));
        assert!(container.get("slice").is_some());
        assert!(container.get("explicit").is_some());
        assert!(container.get("missing").is_none());
    }

    #[test]
    fn scalar_accessors() {
        assert!(Value::from(true).is_scalar());
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert_eq!(Value::from("t").as_str(), Some("t"));
        assert_eq!(Value::from(7u64).as_number(), Some(&Number::U64(7)));
        assert_eq!(Value::from(1.5).as_number(), Some(&Number::F64(1.5)));
        assert!(!Value::nil_slice(Type::Int).is_scalar());
        assert_eq!(Value::from("t").as_bool(), None);

        let array = Value::array(Type::Int, vec![Value::from(1), Value::from(2)]);
        assert!(!array.is_scalar());
        assert_eq!(array.as_array().map(Array::len), Some(2));
        assert!(Value::from(1).as_array().is_none());
    }
}
