/*!
 * Object Identifiers
 * Opaque 32-bit resource identifiers with type tag, generation and slot index
 *
 * # Layout
 *
 * ```text
 *  31        24 23                12 11               0
 * +------------+--------------------+------------------+
 * |    type    |       serial       |      index       |
 * +------------+--------------------+------------------+
 * ```
 *
 * Every allocated ID carries a nonzero type tag, so the all-zero value can only
 * ever be the `UNDEFINED` sentinel, even for slot 0 with serial 0.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Bit Layout
// ============================================================================

pub const OBJECT_TYPE_SHIFT: u32 = 24;
pub const OBJECT_SERIAL_SHIFT: u32 = 12;

pub const OBJECT_TYPE_MASK: u32 = 0xFF;
pub const OBJECT_SERIAL_MASK: u32 = 0xFFF;
pub const OBJECT_INDEX_MASK: u32 = 0xFFF;

/// Largest table capacity the codec can address
pub const MAX_TABLE_INDEX: usize = OBJECT_INDEX_MASK as usize + 1;

// ============================================================================
// Object Types
// ============================================================================

/// Resource kinds managed by the registry
///
/// Discriminants are stable and form the type tag of every ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ObjectType {
    Undefined = 0,
    Task = 1,
    Queue = 2,
    CountSem = 3,
    BinSem = 4,
    Mutex = 5,
    /// Files and sockets share the stream table
    Stream = 6,
    Dir = 7,
    TimeBase = 8,
    TimerCb = 9,
    Module = 10,
    FileSys = 11,
    Console = 12,
    CondVar = 13,
    RwLock = 14,
}

impl ObjectType {
    /// Every concrete (allocatable) type, in table order
    pub const ALL: [ObjectType; 14] = [
        ObjectType::Task,
        ObjectType::Queue,
        ObjectType::CountSem,
        ObjectType::BinSem,
        ObjectType::Mutex,
        ObjectType::Stream,
        ObjectType::Dir,
        ObjectType::TimeBase,
        ObjectType::TimerCb,
        ObjectType::Module,
        ObjectType::FileSys,
        ObjectType::Console,
        ObjectType::CondVar,
        ObjectType::RwLock,
    ];

    /// Number of table slots needed to index by type tag (including Undefined)
    pub const TABLE_COUNT: usize = 15;

    /// Decode a raw type tag; unknown tags map to `Undefined`
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        match raw {
            1 => ObjectType::Task,
            2 => ObjectType::Queue,
            3 => ObjectType::CountSem,
            4 => ObjectType::BinSem,
            5 => ObjectType::Mutex,
            6 => ObjectType::Stream,
            7 => ObjectType::Dir,
            8 => ObjectType::TimeBase,
            9 => ObjectType::TimerCb,
            10 => ObjectType::Module,
            11 => ObjectType::FileSys,
            12 => ObjectType::Console,
            13 => ObjectType::CondVar,
            14 => ObjectType::RwLock,
            _ => ObjectType::Undefined,
        }
    }

    #[inline(always)]
    pub const fn as_raw(self) -> u32 {
        self as u32
    }

    #[inline]
    pub const fn is_defined(self) -> bool {
        !matches!(self, ObjectType::Undefined)
    }

    pub const fn name(self) -> &'static str {
        match self {
            ObjectType::Undefined => "undefined",
            ObjectType::Task => "task",
            ObjectType::Queue => "queue",
            ObjectType::CountSem => "countsem",
            ObjectType::BinSem => "binsem",
            ObjectType::Mutex => "mutex",
            ObjectType::Stream => "stream",
            ObjectType::Dir => "dir",
            ObjectType::TimeBase => "timebase",
            ObjectType::TimerCb => "timecb",
            ObjectType::Module => "module",
            ObjectType::FileSys => "filesys",
            ObjectType::Console => "console",
            ObjectType::CondVar => "condvar",
            ObjectType::RwLock => "rwlock",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Object ID
// ============================================================================

/// Opaque resource identifier
///
/// Two IDs are equal iff their raw values are equal. An ID is only meaningful
/// while the registry slot it decodes to still carries the same serial.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct ObjectId(u32);

/// Decoded form of an [`ObjectId`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecodedId {
    pub object_type: ObjectType,
    pub index: usize,
    pub serial: u32,
}

impl ObjectId {
    /// The reserved "no object" value
    pub const UNDEFINED: ObjectId = ObjectId(0);

    /// Published while a slot is mid-creation or mid-deletion. Its type tag
    /// (0xFF) never decodes to a valid type, so it can never validate.
    pub const RESERVED: ObjectId = ObjectId(0xFFFF_FFFF);

    /// Pack a type, slot index and serial into an ID
    ///
    /// Index and serial are truncated to their field widths.
    #[inline]
    pub const fn encode(object_type: ObjectType, index: usize, serial: u32) -> Self {
        ObjectId(
            ((object_type.as_raw() & OBJECT_TYPE_MASK) << OBJECT_TYPE_SHIFT)
                | ((serial & OBJECT_SERIAL_MASK) << OBJECT_SERIAL_SHIFT)
                | (index as u32 & OBJECT_INDEX_MASK),
        )
    }

    /// Unpack an ID; never fails, garbage decodes to garbage that fails
    /// later bounds or serial checks
    #[inline]
    pub const fn decode(self) -> DecodedId {
        DecodedId {
            object_type: self.object_type(),
            index: self.index(),
            serial: (self.0 >> OBJECT_SERIAL_SHIFT) & OBJECT_SERIAL_MASK,
        }
    }

    #[inline(always)]
    pub const fn from_raw(raw: u32) -> Self {
        ObjectId(raw)
    }

    #[inline(always)]
    pub const fn as_raw(self) -> u32 {
        self.0
    }

    #[inline(always)]
    pub const fn is_defined(self) -> bool {
        self.0 != 0
    }

    #[inline]
    pub const fn object_type(self) -> ObjectType {
        ObjectType::from_raw((self.0 >> OBJECT_TYPE_SHIFT) & OBJECT_TYPE_MASK)
    }

    #[inline]
    pub const fn index(self) -> usize {
        (self.0 & OBJECT_INDEX_MASK) as usize
    }

    #[inline]
    pub const fn serial(self) -> u32 {
        (self.0 >> OBJECT_SERIAL_SHIFT) & OBJECT_SERIAL_MASK
    }
}

impl DecodedId {
    /// Re-pack into the original ID
    #[inline]
    pub const fn encode(self) -> ObjectId {
        ObjectId::encode(self.object_type, self.index, self.serial)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_defined() {
            let d = self.decode();
            write!(f, "ObjectId({}:{}#{})", d.object_type, d.index, d.serial)
        } else {
            f.write_str("ObjectId(undefined)")
        }
    }
}

impl From<ObjectId> for u32 {
    #[inline]
    fn from(id: ObjectId) -> u32 {
        id.0
    }
}

/// Advance a slot serial, wrapping within the serial field
#[inline]
pub const fn next_serial(serial: u32) -> u32 {
    serial.wrapping_add(1) & OBJECT_SERIAL_MASK
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_undefined_is_zero() {
        assert_eq!(ObjectId::UNDEFINED.as_raw(), 0);
        assert!(!ObjectId::UNDEFINED.is_defined());
        assert_eq!(ObjectId::UNDEFINED.object_type(), ObjectType::Undefined);
    }

    #[test]
    fn test_slot_zero_serial_zero_is_defined() {
        let id = ObjectId::encode(ObjectType::Task, 0, 0);
        assert!(id.is_defined());
        assert_ne!(id, ObjectId::UNDEFINED);
    }

    #[test]
    fn test_reserved_never_decodes_to_valid_type() {
        assert_eq!(ObjectId::RESERVED.object_type(), ObjectType::Undefined);
    }

    #[test]
    fn test_serial_wraps_within_field() {
        assert_eq!(next_serial(OBJECT_SERIAL_MASK), 0);
        assert_eq!(next_serial(7), 8);
    }

    #[test]
    fn test_unknown_type_tag() {
        let id = ObjectId::from_raw(0x7F00_0001);
        assert_eq!(id.object_type(), ObjectType::Undefined);
    }

    proptest! {
        #[test]
        fn prop_encode_decode_roundtrip(
            t in 0usize..ObjectType::ALL.len(),
            index in 0usize..MAX_TABLE_INDEX,
            serial in 0u32..=OBJECT_SERIAL_MASK,
        ) {
            let object_type = ObjectType::ALL[t];
            let id = ObjectId::encode(object_type, index, serial);
            let decoded = id.decode();
            prop_assert_eq!(decoded.object_type, object_type);
            prop_assert_eq!(decoded.index, index);
            prop_assert_eq!(decoded.serial, serial);
            prop_assert_eq!(decoded.encode(), id);
            prop_assert!(id.is_defined());
        }

        #[test]
        fn prop_distinct_serials_distinct_ids(
            index in 0usize..MAX_TABLE_INDEX,
            serial in 0u32..OBJECT_SERIAL_MASK,
        ) {
            let a = ObjectId::encode(ObjectType::Queue, index, serial);
            let b = ObjectId::encode(ObjectType::Queue, index, next_serial(serial));
            prop_assert_ne!(a, b);
        }
    }
}
