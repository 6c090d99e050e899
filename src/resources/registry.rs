//! Entity arena and the live/pending subscription bookkeeping.
//!
//! Entities live in generational slots and are referred to by [`EntityId`].
//! Activation, deactivation and destruction requests are recorded in a small
//! command log and only take effect in [`EntityRegistry::reconcile`], which the
//! frame loop runs once per frame after the update and paint passes. Hooks can
//! therefore add or remove any entity, themselves included, while the loop is
//! iterating a snapshot of the live sequence.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::components::entity::{Entity, EntityId};

/// Requested transition, last write before reconciliation wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Activate,
    Deactivate,
    Destroy,
}

struct Slot {
    generation: u32,
    entity: Option<Box<dyn Entity>>,
    occupied: bool,
    live: bool,
}

/// Owns every entity and decides which of them receive callbacks.
#[derive(Default)]
pub struct EntityRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: Vec<EntityId>,
    order: SmallVec<[EntityId; 16]>,
    pending: FxHashMap<EntityId, Pending>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an entity without activating it.
    pub fn insert(&mut self, entity: Box<dyn Entity>) -> EntityId {
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.entity = Some(entity);
                slot.occupied = true;
                slot.live = false;
                EntityId::new(index, slot.generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    entity: Some(entity),
                    occupied: true,
                    live: false,
                });
                EntityId::new(index, 0)
            }
        };
        log::debug!("registry: inserted {id}");
        id
    }

    /// Store an entity and request its activation.
    pub fn spawn(&mut self, entity: impl Entity + 'static) -> EntityId {
        let id = self.insert(Box::new(entity));
        self.register(id);
        id
    }

    /// Request activation at the next reconcile.
    ///
    /// Ignored for stale ids and for entities already marked for destruction.
    pub fn register(&mut self, id: EntityId) {
        if !self.contains(id) {
            return;
        }
        if self.pending.get(&id) == Some(&Pending::Destroy) {
            return;
        }
        self.record(id, Pending::Activate);
    }

    /// Request deactivation at the next reconcile. The entity is kept.
    pub fn unregister(&mut self, id: EntityId) {
        if !self.contains(id) {
            return;
        }
        if self.pending.get(&id) == Some(&Pending::Destroy) {
            return;
        }
        self.record(id, Pending::Deactivate);
    }

    /// `true` registers, `false` unregisters.
    pub fn set_active(&mut self, id: EntityId, active: bool) {
        if active {
            self.register(id);
        } else {
            self.unregister(id);
        }
    }

    /// Deactivate and drop the entity at the next reconcile. Idempotent.
    pub fn destroy(&mut self, id: EntityId) {
        if self.contains(id) {
            self.record(id, Pending::Destroy);
        }
    }

    fn record(&mut self, id: EntityId, op: Pending) {
        if self.pending.insert(id, op).is_none() {
            self.order.push(id);
        }
    }

    /// Apply every pending request.
    ///
    /// Activations are appended to the live sequence in request order, skipping
    /// entities already live; deactivations and destructions are removed by
    /// identity. The relative order of surviving live entities never changes.
    pub fn reconcile(&mut self) {
        if self.order.is_empty() {
            return;
        }

        let mut removed: SmallVec<[EntityId; 16]> = SmallVec::new();
        for id in std::mem::take(&mut self.order) {
            let Some(op) = self.pending.remove(&id) else {
                continue;
            };
            let Some(slot) = find_slot(&mut self.slots, id) else {
                continue;
            };
            match op {
                Pending::Activate => {
                    if !slot.live {
                        slot.live = true;
                        self.live.push(id);
                    }
                }
                Pending::Deactivate => {
                    if slot.live {
                        slot.live = false;
                        removed.push(id);
                    }
                }
                Pending::Destroy => {
                    if slot.live {
                        removed.push(id);
                    }
                    slot.live = false;
                    slot.occupied = false;
                    slot.entity = None;
                    slot.generation = slot.generation.wrapping_add(1);
                    self.free.push(id.index());
                    log::debug!("registry: destroyed {id}");
                }
            }
        }

        if !removed.is_empty() {
            self.live.retain(|id| !removed.contains(id));
        }
        self.pending.clear();
    }

    /// Owned copy of the live sequence, safe to iterate while hooks mutate the registry.
    pub fn snapshot_live(&self) -> Vec<EntityId> {
        self.live.clone()
    }

    pub fn live(&self) -> &[EntityId] {
        &self.live
    }

    pub fn is_live(&self, id: EntityId) -> bool {
        self.slot(id).is_some_and(|s| s.live)
    }

    /// Whether a request for `id` is waiting for the next reconcile.
    pub fn is_pending(&self, id: EntityId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Whether `id` refers to an entity that has not been destroyed.
    pub fn contains(&self, id: EntityId) -> bool {
        self.slot(id).is_some()
    }

    /// Number of stored entities, live or not.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.occupied).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: EntityId) -> Option<&dyn Entity> {
        self.slot(id)?.entity.as_deref()
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut (dyn Entity + 'static)> {
        self.slot_mut(id)?.entity.as_deref_mut()
    }

    /// Lend the entity out to `f` together with the registry itself.
    ///
    /// The entity is taken out of its slot for the duration of the call, so `f`
    /// may freely call back into the registry. Returns `None` for stale ids or if
    /// the entity is already lent out.
    pub fn with_entity<R>(
        &mut self,
        id: EntityId,
        f: impl FnOnce(&mut dyn Entity, &mut EntityRegistry) -> R,
    ) -> Option<R> {
        let mut entity = self.slot_mut(id)?.entity.take()?;
        let out = f(entity.as_mut(), self);
        if let Some(slot) = self.slot_mut(id) {
            slot.entity = Some(entity);
        }
        Some(out)
    }

    fn slot(&self, id: EntityId) -> Option<&Slot> {
        self.slots
            .get(id.index() as usize)
            .filter(|s| s.occupied && s.generation == id.generation())
    }

    fn slot_mut(&mut self, id: EntityId) -> Option<&mut Slot> {
        find_slot(&mut self.slots, id)
    }
}

fn find_slot(slots: &mut [Slot], id: EntityId) -> Option<&mut Slot> {
    slots
        .get_mut(id.index() as usize)
        .filter(|s| s.occupied && s.generation == id.generation())
}

impl std::fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("stored", &self.len())
            .field("live", &self.live)
            .field("pending", &self.pending)
            .finish()
    }
}
