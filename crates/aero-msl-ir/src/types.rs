use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Generates a closed, string-named enum with `name()`, `Display`, `FromStr` and serde support.
///
/// The string forms are what the JSON interchange format and the IR dump use.
macro_rules! named_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $str:literal,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis enum $name {
            $($(#[$vmeta])* $variant,)*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)*];

            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $str,)*
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.name())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::error::ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($str => Ok($name::$variant),)*
                    _ => Err($crate::error::ParseError::UnknownName {
                        kind: stringify!($name),
                        name: s.to_owned(),
                    }),
                }
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.name())
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = <String as ::serde::Deserialize>::deserialize(deserializer)?;
                s.parse().map_err(::serde::de::Error::custom)
            }
        }
    };
}

pub(crate) use named_enum;

named_enum! {
    pub enum ShaderStage {
        Vertex => "vertex",
        Fragment => "fragment",
        Compute => "compute",
    }
}

named_enum! {
    /// Base type of a value as declared by an opcode's signature.
    pub enum BaseType {
        Int => "int",
        Uint => "uint",
        Float => "float",
        Bool => "bool",
    }
}

/// A base type paired with a bit width, e.g. `float32` or `uint16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SizedType {
    pub base: BaseType,
    pub bits: u8,
}

impl SizedType {
    pub const fn new(base: BaseType, bits: u8) -> Self {
        Self { base, bits }
    }

    pub const fn float32() -> Self {
        Self::new(BaseType::Float, 32)
    }

    pub const fn uint32() -> Self {
        Self::new(BaseType::Uint, 32)
    }

    pub const fn int32() -> Self {
        Self::new(BaseType::Int, 32)
    }
}

impl fmt::Display for SizedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.base, self.bits)
    }
}

impl FromStr for SizedType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let split = s
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| ParseError::BadSizedType(s.to_owned()))?;
        let (base, bits) = s.split_at(split);
        let base: BaseType = base
            .parse()
            .map_err(|_| ParseError::BadSizedType(s.to_owned()))?;
        let bits: u8 = bits
            .parse()
            .map_err(|_| ParseError::BadSizedType(s.to_owned()))?;
        if !matches!(bits, 1 | 8 | 16 | 32 | 64) {
            return Err(ParseError::BadSizedType(s.to_owned()));
        }
        Ok(Self { base, bits })
    }
}

impl Serialize for SizedType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SizedType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

named_enum! {
    pub enum InterpMode {
        None => "none",
        Smooth => "smooth",
        Flat => "flat",
        NoPerspective => "noperspective",
    }
}

impl Default for InterpMode {
    fn default() -> Self {
        InterpMode::None
    }
}

named_enum! {
    /// Declared relation between the written fragment depth and the rasterized depth.
    pub enum DepthLayout {
        None => "none",
        Any => "any",
        Greater => "greater",
        Less => "less",
        Unchanged => "unchanged",
    }
}

impl Default for DepthLayout {
    fn default() -> Self {
        DepthLayout::None
    }
}

named_enum! {
    pub enum SamplerDim {
        Dim1D => "1d",
        Dim2D => "2d",
        Dim3D => "3d",
        Cube => "cube",
        Buf => "buf",
        Ms => "ms",
    }
}

named_enum! {
    pub enum Scope {
        None => "none",
        Invocation => "invocation",
        Subgroup => "subgroup",
        ShaderCall => "shader_call",
        Workgroup => "workgroup",
        QueueFamily => "queue_family",
        Device => "device",
    }
}

impl Default for Scope {
    fn default() -> Self {
        Scope::None
    }
}

named_enum! {
    pub enum Access {
        None => "none",
        Read => "read",
        Write => "write",
        ReadWrite => "read_write",
    }
}

impl Default for Access {
    fn default() -> Self {
        Access::None
    }
}

named_enum! {
    pub enum AtomicOp {
        Iadd => "iadd",
        Imin => "imin",
        Umin => "umin",
        Imax => "imax",
        Umax => "umax",
        Iand => "iand",
        Ior => "ior",
        Ixor => "ixor",
        Xchg => "xchg",
        Cmpxchg => "cmpxchg",
        Fadd => "fadd",
        Fmin => "fmin",
        Fmax => "fmax",
        Fcmpxchg => "fcmpxchg",
    }
}

impl AtomicOp {
    /// Base type the atomic operates on.
    pub fn value_type(self) -> BaseType {
        match self {
            AtomicOp::Iadd | AtomicOp::Imin | AtomicOp::Imax => BaseType::Int,
            AtomicOp::Fadd | AtomicOp::Fmin | AtomicOp::Fmax | AtomicOp::Fcmpxchg => {
                BaseType::Float
            }
            AtomicOp::Umin
            | AtomicOp::Umax
            | AtomicOp::Iand
            | AtomicOp::Ior
            | AtomicOp::Ixor
            | AtomicOp::Xchg
            | AtomicOp::Cmpxchg => BaseType::Uint,
        }
    }

    pub fn is_swap(self) -> bool {
        matches!(self, AtomicOp::Cmpxchg | AtomicOp::Fcmpxchg)
    }
}

bitflags! {
    /// Memory kinds a barrier orders.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct MemoryModes: u32 {
        const FUNCTION_TEMP = 1 << 0;
        const IMAGE = 1 << 1;
        const SSBO = 1 << 2;
        const SHARED = 1 << 3;
        const GLOBAL = 1 << 4;
    }
}

bitflags! {
    /// Built-in values a shader reads. Bit order is the parameter order of the entry point.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SystemValues: u32 {
        const SUBGROUP_SIZE = 1 << 0;
        const SUBGROUP_INVOCATION = 1 << 1;
        const NUM_SUBGROUPS = 1 << 2;
        const SUBGROUP_ID = 1 << 3;
        const WORKGROUP_ID = 1 << 4;
        const LOCAL_INVOCATION_ID = 1 << 5;
        const GLOBAL_INVOCATION_ID = 1 << 6;
        const NUM_WORKGROUPS = 1 << 7;
        const LOCAL_INVOCATION_INDEX = 1 << 8;
        const VERTEX_ID = 1 << 9;
        const INSTANCE_ID = 1 << 10;
        const BASE_INSTANCE = 1 << 11;
        const FRAG_COORD = 1 << 12;
        const POINT_COORD = 1 << 13;
        const FRONT_FACE = 1 << 14;
        const LAYER_ID = 1 << 15;
        const SAMPLE_ID = 1 << 16;
        const SAMPLE_MASK_IN = 1 << 17;
        const AMPLIFICATION_ID = 1 << 18;
        const FIRST_VERTEX = 1 << 19;
        const HELPER_INVOCATION = 1 << 20;
    }
}

/// Vertex/fragment varying slot numbers.
pub mod varying_slot {
    pub const POS: u32 = 0;
    pub const PSIZ: u32 = 12;
    pub const PRIMITIVE_ID: u32 = 24;
    pub const LAYER: u32 = 25;
    pub const VAR0: u32 = 32;
    pub const VAR_COUNT: u32 = 32;
}

/// Fragment result slot numbers.
pub mod frag_result {
    pub const DEPTH: u32 = 0;
    pub const STENCIL: u32 = 1;
    pub const SAMPLE_MASK: u32 = 2;
    pub const DATA0: u32 = 4;
    pub const DATA_COUNT: u32 = 8;
}

/// A set of I/O slot indices in `0..64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SlotSet(pub u64);

impl SlotSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn contains(self, slot: u32) -> bool {
        slot < 64 && (self.0 >> slot) & 1 != 0
    }

    pub fn insert(&mut self, slot: u32) {
        if slot < 64 {
            self.0 |= 1u64 << slot;
        }
    }

    pub fn remove(&mut self, slot: u32) {
        if slot < 64 {
            self.0 &= !(1u64 << slot);
        }
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates set slots in ascending order.
    pub fn iter(self) -> impl Iterator<Item = u32> {
        let mut bits = self.0;
        std::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            let slot = bits.trailing_zeros();
            bits &= bits - 1;
            Some(slot)
        })
    }
}

impl FromIterator<u32> for SlotSet {
    fn from_iter<T: IntoIterator<Item = u32>>(iter: T) -> Self {
        let mut set = SlotSet::empty();
        for slot in iter {
            set.insert(slot);
        }
        set
    }
}

impl Serialize for SlotSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for SlotSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let slots = Vec::<u32>::deserialize(deserializer)?;
        if let Some(bad) = slots.iter().find(|&&s| s >= 64) {
            return Err(serde::de::Error::custom(format!("slot {bad} out of range")));
        }
        Ok(slots.into_iter().collect())
    }
}
