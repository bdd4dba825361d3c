//! Dynamically typed trait values.

use crate::base::BitVector;
use crate::simulation::OrgPosition;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Element type of a DataMap field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraitType {
    Double,
    Size,
    Bool,
    String,
    Bits,
    Position,
    Value,
}

impl fmt::Display for TraitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Double => "double",
            Self::Size => "size",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Bits => "bits",
            Self::Position => "position",
            Self::Value => "value",
        };
        f.write_str(name)
    }
}

/// A single stored trait value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TraitValue {
    Double(f64),
    Size(usize),
    Bool(bool),
    String(String),
    Bits(BitVector),
    Position(OrgPosition),
    Value(serde_json::Value),
}

impl TraitValue {
    pub fn trait_type(&self) -> TraitType {
        match self {
            Self::Double(_) => TraitType::Double,
            Self::Size(_) => TraitType::Size,
            Self::Bool(_) => TraitType::Bool,
            Self::String(_) => TraitType::String,
            Self::Bits(_) => TraitType::Bits,
            Self::Position(_) => TraitType::Position,
            Self::Value(_) => TraitType::Value,
        }
    }

    /// Zero value for a type.
    pub fn default_for(trait_type: TraitType) -> Self {
        match trait_type {
            TraitType::Double => Self::Double(0.0),
            TraitType::Size => Self::Size(0),
            TraitType::Bool => Self::Bool(false),
            TraitType::String => Self::String(String::new()),
            TraitType::Bits => Self::Bits(BitVector::default()),
            TraitType::Position => Self::Position(OrgPosition::invalid()),
            TraitType::Value => Self::Value(serde_json::Value::Null),
        }
    }

    /// Numeric view, for summaries.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            Self::Size(v) => Some(*v as f64),
            Self::Bool(v) => Some(f64::from(u8::from(*v))),
            _ => None,
        }
    }
}

impl fmt::Display for TraitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Double(v) => write!(f, "{v}"),
            Self::Size(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::String(v) => f.write_str(v),
            Self::Bits(v) => write!(f, "{v}"),
            Self::Position(v) => write!(f, "{v}"),
            Self::Value(v) => write!(f, "{v}"),
        }
    }
}

/// Rust types that can be stored in a DataMap field.
pub trait TraitData: Clone + Send + Sync + 'static {
    const TYPE: TraitType;

    fn into_value(self) -> TraitValue;
    fn from_value(value: &TraitValue) -> Option<&Self>;
    fn from_value_mut(value: &mut TraitValue) -> Option<&mut Self>;
    fn from_owned(value: TraitValue) -> Option<Self>;
}

macro_rules! impl_trait_data {
    ($ty:ty, $variant:ident) => {
        impl TraitData for $ty {
            const TYPE: TraitType = TraitType::$variant;

            fn into_value(self) -> TraitValue {
                TraitValue::$variant(self)
            }

            fn from_value(value: &TraitValue) -> Option<&Self> {
                match value {
                    TraitValue::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn from_value_mut(value: &mut TraitValue) -> Option<&mut Self> {
                match value {
                    TraitValue::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn from_owned(value: TraitValue) -> Option<Self> {
                match value {
                    TraitValue::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

impl_trait_data!(f64, Double);
impl_trait_data!(usize, Size);
impl_trait_data!(bool, Bool);
impl_trait_data!(String, String);
impl_trait_data!(BitVector, Bits);
impl_trait_data!(OrgPosition, Position);
impl_trait_data!(serde_json::Value, Value);
