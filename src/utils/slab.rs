/// Stable reference to a slab slot.
///
/// A handle carries the slot's generation at insertion time, so a handle to a
/// removed item never resolves to whatever occupies the slot afterwards.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct Handle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

struct Slot<T> {
    generation: u32,
    item: Option<T>,
}

pub(crate) struct Slab<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
}

// Generations are packed into 31 bits of an event token.
pub(crate) const GENERATION_MASK: u32 = 0x7FFF_FFFF;

impl<T> Slab<T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub(crate) fn insert(&mut self, item: T) -> Handle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.item = Some(item);

            Handle {
                index: index as u32,
                generation: slot.generation,
            }
        } else {
            self.slots.push(Slot {
                generation: 0,
                item: Some(item),
            });

            Handle {
                index: (self.slots.len() - 1) as u32,
                generation: 0,
            }
        }
    }

    pub(crate) fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }

        slot.item.as_mut()
    }

    pub(crate) fn remove(&mut self, handle: Handle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }

        let item = slot.item.take()?;
        slot.generation = (slot.generation + 1) & GENERATION_MASK;
        self.free.push(handle.index as usize);

        Some(item)
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let mut slab = Slab::new();
        let a = slab.insert("a");
        let b = slab.insert("b");

        assert_eq!(slab.get_mut(a), Some(&mut "a"));
        assert_eq!(slab.get_mut(b), Some(&mut "b"));
        assert_eq!(slab.len(), 2);
    }

    #[test]
    fn stale_handle_resolves_to_none() {
        let mut slab = Slab::new();
        let a = slab.insert(1);

        assert_eq!(slab.remove(a), Some(1));
        assert_eq!(slab.get_mut(a), None);
        assert_eq!(slab.remove(a), None);
    }

    #[test]
    fn reused_slot_gets_new_generation() {
        let mut slab = Slab::new();
        let a = slab.insert(1);
        slab.remove(a);

        let b = slab.insert(2);
        assert_eq!(b.index, a.index);
        assert_ne!(b.generation, a.generation);

        // The old handle still cannot see the new occupant.
        assert_eq!(slab.get_mut(a), None);
        assert_eq!(slab.get_mut(b), Some(&mut 2));
    }
}
