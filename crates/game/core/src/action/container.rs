//! Live actions of one entity.
//!
//! # Slot rules
//!
//! Every attached action with an exclusive slot owns that slot. Adding an
//! action whose slot is taken removes the occupant first, running its
//! `on_remove` to completion before the newcomer's `init` begins.
//!
//! A paused action may sit in the container without owning its slot (this
//! happens when a restored document carries a paused action whose slot is
//! already taken). Once the slot frees up it reclaims it and resumes.
//!
//! Removed instances go back to a per-kind pool and are reused by the next
//! `add_action` of the same kind.

use std::collections::BTreeMap;

use crate::env::SimContext;
use crate::persist::{Element, PersistError};
use crate::state::EntityId;

use super::{Action, ActionCommand, ActionError, ActionKind, ActionSlot};

/// Identifies one attach of an action. Never reused within a container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionHandle(pub u64);

#[derive(Debug)]
struct Entry {
    handle: ActionHandle,
    action: Box<dyn Action>,
}

#[derive(Debug, Default)]
pub struct ActionContainer {
    owner: EntityId,
    /// Insertion order is update order.
    entries: Vec<Entry>,
    slots: BTreeMap<ActionKind, ActionHandle>,
    pool: BTreeMap<ActionKind, Vec<Box<dyn Action>>>,
    next_handle: u64,
}

fn slot_key(action: &dyn Action) -> Option<ActionKind> {
    match action.slot() {
        ActionSlot::Exclusive(kind) => Some(kind),
        ActionSlot::Unbounded => None,
    }
}

impl ActionContainer {
    pub fn new(owner: EntityId) -> Self {
        Self {
            owner,
            ..Self::default()
        }
    }

    pub fn owner(&self) -> EntityId {
        self.owner
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, handle: ActionHandle) -> bool {
        self.position(handle).is_some()
    }

    pub fn get(&self, handle: ActionHandle) -> Option<&dyn Action> {
        self.position(handle).map(|i| self.entries[i].action.as_ref())
    }

    pub fn get_mut(&mut self, handle: ActionHandle) -> Option<&mut (dyn Action + 'static)> {
        let index = self.position(handle)?;
        Some(self.entries[index].action.as_mut())
    }

    /// First attached action of `kind`.
    pub fn find(&self, kind: ActionKind) -> Option<ActionHandle> {
        self.entries
            .iter()
            .find(|e| e.action.kind() == kind)
            .map(|e| e.handle)
    }

    /// Handles and kinds in update order.
    pub fn iter(&self) -> impl Iterator<Item = (ActionHandle, &dyn Action)> {
        self.entries.iter().map(|e| (e.handle, e.action.as_ref()))
    }

    /// Idle instances of `kind` waiting for reuse.
    pub fn pooled(&self, kind: ActionKind) -> usize {
        self.pool.get(&kind).map_or(0, Vec::len)
    }

    fn position(&self, handle: ActionHandle) -> Option<usize> {
        self.entries.iter().position(|e| e.handle == handle)
    }

    fn instance(&mut self, kind: ActionKind, ctx: &SimContext<'_>) -> Result<Box<dyn Action>, ActionError> {
        match self.pool.get_mut(&kind).and_then(Vec::pop) {
            Some(action) => Ok(action),
            None => ctx.env.registry.create(kind),
        }
    }

    fn evict(&mut self, kind: ActionKind, ctx: &mut SimContext<'_>) {
        if let Some(occupant) = self.slots.get(&kind).copied() {
            tracing::debug!("{} replaces its {}", self.owner, kind);
            self.remove_action(occupant, ctx);
        }
    }

    fn attach(&mut self, action: Box<dyn Action>, claim_slot: bool) -> ActionHandle {
        let handle = ActionHandle(self.next_handle);
        self.next_handle += 1;
        if let Some(kind) = slot_key(action.as_ref()).filter(|_| claim_slot) {
            self.slots.insert(kind, handle);
        }
        self.entries.push(Entry { handle, action });
        handle
    }

    fn detach(&mut self, entry: Entry, ctx: &mut SimContext<'_>) {
        let Entry { handle, mut action } = entry;
        action.on_remove(ctx);
        if let Some(kind) = slot_key(action.as_ref())
            && self.slots.get(&kind) == Some(&handle)
        {
            self.slots.remove(&kind);
        }
        self.pool.entry(action.kind()).or_default().push(action);
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Builds (or reuses) the variant for `command`, inits it against the
    /// owner and attaches it.
    ///
    /// # Errors
    ///
    /// Configuration faults from the registry or `init`, and
    /// [`ActionError::Forbidden`] while the owner may not perform the kind.
    pub fn add_action(
        &mut self,
        command: &ActionCommand,
        ctx: &mut SimContext<'_>,
    ) -> Result<ActionHandle, ActionError> {
        let kind = command.kind();
        let owner = ctx
            .entity(self.owner)
            .ok_or(ActionError::UnknownEntity(self.owner))?;
        if !owner.can_perform(kind) {
            return Err(ActionError::Forbidden {
                kind,
                owner: self.owner,
            });
        }

        let mut action = self.instance(kind, ctx)?;
        if let Some(slot) = slot_key(action.as_ref()) {
            self.evict(slot, ctx);
        }
        if let Err(err) = action.init(self.owner, command, ctx) {
            self.pool.entry(kind).or_default().push(action);
            return Err(err);
        }
        Ok(self.attach(action, true))
    }

    /// Detaches by handle, running `on_remove`. Returns whether it was attached.
    pub fn remove_action(&mut self, handle: ActionHandle, ctx: &mut SimContext<'_>) -> bool {
        let Some(index) = self.position(handle) else {
            return false;
        };
        let entry = self.entries.remove(index);
        self.detach(entry, ctx);
        true
    }

    /// Updates every unpaused action and drops the finished ones.
    pub fn update(&mut self, dt: f32, ctx: &mut SimContext<'_>) {
        let mut index = 0;
        while index < self.entries.len() {
            let entry = &mut self.entries[index];
            if entry.action.is_paused() {
                if let Some(kind) = slot_key(entry.action.as_ref())
                    && !self.slots.contains_key(&kind)
                {
                    self.slots.insert(kind, entry.handle);
                    entry.action.resume(ctx);
                }
                index += 1;
                continue;
            }
            entry.action.update(dt, ctx);
            if entry.action.is_finished() {
                let entry = self.entries.remove(index);
                self.detach(entry, ctx);
            } else {
                index += 1;
            }
        }
    }

    pub fn pause_all(&mut self) {
        for entry in &mut self.entries {
            entry.action.pause();
        }
    }

    pub fn resume_all(&mut self, ctx: &mut SimContext<'_>) {
        for entry in &mut self.entries {
            entry.action.resume(ctx);
        }
    }

    pub fn remove_all(&mut self, ctx: &mut SimContext<'_>) {
        self.remove_where(ctx, |_| true);
    }

    /// Cancels everything a player could have issued.
    pub fn remove_all_verb_actions(&mut self, ctx: &mut SimContext<'_>) {
        self.remove_where(ctx, |a| a.is_verb());
    }

    fn remove_where(&mut self, ctx: &mut SimContext<'_>, doomed: impl Fn(&dyn Action) -> bool) {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| doomed(e.action.as_ref()));
        self.entries = kept;
        for entry in removed {
            self.detach(entry, ctx);
        }
    }

    /// Whether any attached action must finish before the owner acts again.
    pub fn has_blocking_action(&self) -> bool {
        self.entries
            .iter()
            .any(|e| e.action.is_blocking_in_combat())
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// One child per attached action: the variant tag, `paused`, then the
    /// variant's own parameters.
    pub fn save(&self) -> Element {
        let mut out = Element::new("actions");
        for entry in &self.entries {
            out.push(save_action(entry.action.as_ref()));
        }
        out
    }

    /// Rebuilds saved actions against the owner. Unknown tags are skipped.
    ///
    /// Returns the handle given to each saved child, in save order; `None`
    /// for skipped children.
    ///
    /// # Errors
    ///
    /// Malformed parameters or configuration faults raised by `read_params`.
    pub fn restore(
        &mut self,
        input: &Element,
        ctx: &mut SimContext<'_>,
    ) -> Result<Vec<Option<ActionHandle>>, PersistError> {
        let mut handles = Vec::with_capacity(input.children.len());
        for child in &input.children {
            let mut action = match ctx.env.registry.create_by_tag(&child.name) {
                Ok(action) => action,
                Err(PersistError::UnknownTag(tag)) => {
                    tracing::warn!("{} skips unknown saved action <{}>", self.owner, tag);
                    handles.push(None);
                    continue;
                }
                Err(err) => return Err(err),
            };
            action.read_params(self.owner, child, ctx)?;
            let paused = child.flag("paused")?;
            if paused {
                action.pause();
            }
            let slot_free = slot_key(action.as_ref()).is_none_or(|kind| !self.slots.contains_key(&kind));
            if !paused && !slot_free {
                if let Some(kind) = slot_key(action.as_ref()) {
                    self.evict(kind, ctx);
                }
            }
            handles.push(Some(self.attach(action, !paused || slot_free)));
        }
        Ok(handles)
    }
}

/// Persisted form of a single live action.
pub(crate) fn save_action(action: &dyn Action) -> Element {
    let mut out = Element::new(action.kind().as_ref());
    if action.is_paused() {
        out.set("paused", true);
    }
    action.write_params(&mut out);
    out
}
