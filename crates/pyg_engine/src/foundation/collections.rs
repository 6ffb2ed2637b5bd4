//! Specialized collection types
//!
//! The scene stores GameObjects and components in generational slot maps.
//! A key that outlives its slot never resolves to the slot's next occupant.

pub use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Arena key of a GameObject node
    pub struct ObjectKey;

    /// Arena key of an attached component
    pub struct ComponentKey;
}

/// Arena of GameObject nodes
pub type ObjectArena<T> = SlotMap<ObjectKey, T>;

/// Arena of component slots
pub type ComponentArena<T> = SlotMap<ComponentKey, T>;
