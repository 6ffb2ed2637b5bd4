//! Typed component properties
//!
//! Each component carries a [`PropertyBag`]: an ordered set of named,
//! tagged values. The tag of an entry is fixed when it is declared, so an
//! assignment with a different tag is rejected and the bag stays unchanged.

use std::fmt;

use serde::{Serialize, Deserialize};

use crate::foundation::math::{Color, Vec2, Vec2i, Vec3, Vec3i, Vec4};

/// Opaque reference to a texture owned by an external renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextureHandle(pub u64);

/// Tagged property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    /// 32-bit signed integer
    Int(i32),
    /// 32-bit float
    Float(f32),
    /// Boolean flag
    Bool(bool),
    /// RGBA color
    Color(Color),
    /// 2D float vector
    Vec2(Vec2),
    /// 2D integer vector
    Vec2i(Vec2i),
    /// 3D float vector
    Vec3(Vec3),
    /// 3D integer vector
    Vec3i(Vec3i),
    /// 4D float vector
    Vec4(Vec4),
    /// Text
    String(String),
    /// Texture reference
    Texture(TextureHandle),
}

/// Tag of a [`PropertyValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)] // mirrors PropertyValue one-to-one
pub enum PropertyType {
    Int,
    Float,
    Bool,
    Color,
    Vec2,
    Vec2i,
    Vec3,
    Vec3i,
    Vec4,
    String,
    Texture,
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl PropertyValue {
    /// Tag of this value
    pub fn kind(&self) -> PropertyType {
        match self {
            Self::Int(_) => PropertyType::Int,
            Self::Float(_) => PropertyType::Float,
            Self::Bool(_) => PropertyType::Bool,
            Self::Color(_) => PropertyType::Color,
            Self::Vec2(_) => PropertyType::Vec2,
            Self::Vec2i(_) => PropertyType::Vec2i,
            Self::Vec3(_) => PropertyType::Vec3,
            Self::Vec3i(_) => PropertyType::Vec3i,
            Self::Vec4(_) => PropertyType::Vec4,
            Self::String(_) => PropertyType::String,
            Self::Texture(_) => PropertyType::Texture,
        }
    }
}

macro_rules! property_conversions {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for PropertyValue {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }

            impl TryFrom<&PropertyValue> for $ty {
                type Error = PropertyType;

                fn try_from(value: &PropertyValue) -> Result<Self, Self::Error> {
                    match value {
                        PropertyValue::$variant(inner) => Ok(inner.clone()),
                        other => Err(other.kind()),
                    }
                }
            }
        )*
    };
}

property_conversions! {
    Int => i32,
    Float => f32,
    Bool => bool,
    Color => Color,
    Vec2 => Vec2,
    Vec2i => Vec2i,
    Vec3 => Vec3,
    Vec3i => Vec3i,
    Vec4 => Vec4,
    String => String,
    Texture => TextureHandle,
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// Property errors
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PropertyError {
    /// No entry with this name was declared
    #[error("unknown property '{0}'")]
    Unknown(String),

    /// The assigned value's tag differs from the declared one
    #[error("property '{name}' is {expected}, got {found}")]
    TypeMismatch {
        /// Property name
        name: String,
        /// Declared tag
        expected: PropertyType,
        /// Tag of the rejected value
        found: PropertyType,
    },

    /// Editor-side write to an entry declared read-only
    #[error("property '{0}' is not editable")]
    NotEditable(String),
}

/// A declared property entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Entry name, unique within its bag
    pub name: String,
    /// Current value
    pub value: PropertyValue,
    /// Whether inspectors may modify the entry
    pub editable: bool,
}

/// Ordered collection of typed properties
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyBag {
    entries: Vec<Property>,
}

impl PropertyBag {
    /// Create an empty bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Self::declare`]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropertyValue>, editable: bool) -> Self {
        self.declare(name, value, editable);
        self
    }

    /// Declare an entry, replacing any previous entry of the same name
    ///
    /// Redeclaring keeps the entry's position in [`Self::names`].
    pub fn declare(&mut self, name: impl Into<String>, value: impl Into<PropertyValue>, editable: bool) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => {
                entry.value = value;
                entry.editable = editable;
            }
            None => self.entries.push(Property { name, value, editable }),
        }
    }

    /// Current value of an entry
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.entry(name).map(|entry| &entry.value)
    }

    /// Current value converted to a concrete type
    ///
    /// Returns `None` when the entry is missing or holds a different tag.
    pub fn get_as<T>(&self, name: &str) -> Option<T>
    where
        T: for<'a> TryFrom<&'a PropertyValue>,
    {
        self.get(name).and_then(|value| T::try_from(value).ok())
    }

    /// Assign a new value to a declared entry
    pub fn set(&mut self, name: &str, value: impl Into<PropertyValue>) -> Result<(), PropertyError> {
        let value = value.into();
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.name == name)
            .ok_or_else(|| PropertyError::Unknown(name.to_string()))?;

        let expected = entry.value.kind();
        let found = value.kind();
        if expected != found {
            return Err(PropertyError::TypeMismatch { name: name.to_string(), expected, found });
        }
        entry.value = value;
        Ok(())
    }

    /// Assign a value on behalf of an inspector; read-only entries are refused
    pub fn edit(&mut self, name: &str, value: impl Into<PropertyValue>) -> Result<(), PropertyError> {
        if !self.is_editable(name).ok_or_else(|| PropertyError::Unknown(name.to_string()))? {
            return Err(PropertyError::NotEditable(name.to_string()));
        }
        self.set(name, value)
    }

    /// Editable flag of an entry
    pub fn is_editable(&self, name: &str) -> Option<bool> {
        self.entry(name).map(|entry| entry.editable)
    }

    /// Declared tag of an entry
    pub fn kind(&self, name: &str) -> Option<PropertyType> {
        self.get(name).map(PropertyValue::kind)
    }

    /// Entry names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    /// All entries in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.entries.iter()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bag has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, name: &str) -> Option<&Property> {
        self.entries.iter().find(|entry| entry.name == name)
    }
}
