//! Opaque ID newtypes for placement entities.
//!
//! [`BlockId`], [`NetId`], [`PinId`], and [`MacroId`] are thin `u32` wrappers
//! used as dense arena indices into the placement netlist, giving O(1) access
//! to every per-block and per-net cost structure. They are `Copy`, `Hash`,
//! and `Serialize`/`Deserialize`.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }

            /// Returns the ID as a `usize` array index.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for a placeable block in the netlist.
    BlockId
);

define_id!(
    /// Opaque, copyable ID for a net in the netlist.
    NetId
);

define_id!(
    /// Opaque, copyable ID for a pin in the netlist.
    PinId
);

define_id!(
    /// Opaque, copyable ID for a rigid placement macro.
    MacroId
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn block_id_roundtrip() {
        let id = BlockId::from_raw(42);
        assert_eq!(id.as_raw(), 42);
        assert_eq!(id.index(), 42);
    }

    #[test]
    fn net_id_roundtrip() {
        let id = NetId::from_raw(99);
        assert_eq!(id.as_raw(), 99);
    }

    #[test]
    fn id_equality() {
        let a = PinId::from_raw(3);
        let b = PinId::from_raw(3);
        let c = PinId::from_raw(4);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn id_hash_in_set() {
        let mut set = HashSet::new();
        set.insert(NetId::from_raw(1));
        set.insert(NetId::from_raw(2));
        set.insert(NetId::from_raw(1));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn id_serde_roundtrip() {
        let id = MacroId::from_raw(55);
        let json = serde_json::to_string(&id).unwrap();
        let restored: MacroId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, restored);
    }

    #[test]
    fn id_display() {
        assert_eq!(format!("{}", BlockId::from_raw(42)), "42");
    }
}
