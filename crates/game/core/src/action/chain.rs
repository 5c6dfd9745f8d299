//! Sequential composition of actions, optionally performed by another entity.
//!
//! A chain owns its steps and forwards `update` to the head until it
//! finishes. With a performer other than the owner the steps act on that
//! entity instead (hand-off): its own actions are paused while the chain
//! runs and resumed when the chain is removed.
//!
//! Steps are built lazily. A chain restored before its performer exists
//! keeps its steps as unparsed documents and only rebuilds them once the
//! performer resolves.

use std::collections::VecDeque;

use crate::env::{Request, SimContext};
use crate::persist::{Element, PersistError};
use crate::state::EntityId;

use super::{
    Action, ActionCommand, ActionError, ActionKind, Binding, ChainParams, TargetRef, check_owner,
    mismatch,
};

const KIND: ActionKind = ActionKind::Chain;

#[derive(Debug)]
enum Queued {
    Command(ActionCommand),
    /// Persisted step, parsed once the performer is known.
    Document(Element),
}

impl Queued {
    fn to_element(&self) -> Element {
        match self {
            Self::Command(command) => command.to_element(),
            Self::Document(element) => element.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Chain {
    owner: EntityId,
    performer: Option<TargetRef>,
    queue: VecDeque<Queued>,
    current: Option<Box<dyn Action>>,
    paused: bool,
    finished: bool,
}

impl Chain {
    /// Entity the steps act on.
    pub fn performer(&self) -> EntityId {
        self.performer.map_or(self.owner, |p| p.id())
    }

    /// Steps not started yet.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn current_kind(&self) -> Option<ActionKind> {
        self.current.as_ref().map(|a| a.kind())
    }

    fn reset(&mut self, owner: EntityId, performer: Option<EntityId>) {
        *self = Self {
            owner,
            performer: performer.filter(|p| *p != owner).map(TargetRef::new),
            ..Self::default()
        };
    }

    fn is_handed_off(&self) -> bool {
        self.performer.is_some_and(|p| p.is_bound())
    }

    /// Performer for this frame, or `None` to wait.
    fn resolve_performer(&mut self, ctx: &mut SimContext<'_>) -> Option<EntityId> {
        let Some(target) = self.performer.as_mut() else {
            return Some(self.owner);
        };
        let id = target.id();
        match target.resolve(&*ctx.world) {
            Binding::Pending => None,
            Binding::Fresh(_) => {
                tracing::debug!("{} hands its chain to {}", self.owner, id);
                ctx.request(Request::PauseActions(id));
                Some(id)
            }
            Binding::Ready(_) => Some(id),
            Binding::Gone => {
                ctx.refuse(self.owner, KIND, "performer vanished");
                self.clear(ctx);
                self.performer = None;
                self.finished = true;
                None
            }
        }
    }

    fn clear(&mut self, ctx: &mut SimContext<'_>) {
        if let Some(mut current) = self.current.take() {
            current.on_remove(ctx);
        }
        self.queue.clear();
    }

    fn build(
        entry: Queued,
        performer: EntityId,
        ctx: &mut SimContext<'_>,
    ) -> Result<Box<dyn Action>, PersistError> {
        match entry {
            Queued::Command(command) => {
                let mut action = ctx.env.registry.create(command.kind())?;
                action.init(performer, &command, ctx)?;
                Ok(action)
            }
            Queued::Document(element) => {
                let mut action = ctx.env.registry.create_by_tag(&element.name)?;
                action.read_params(performer, &element, ctx)?;
                if element.flag("paused")? {
                    action.pause();
                }
                Ok(action)
            }
        }
    }

    /// Starts the next step that survives `init`. Steps that finish inside
    /// `init` are retired on the spot.
    fn start_next(&mut self, performer: EntityId, ctx: &mut SimContext<'_>) -> bool {
        while let Some(entry) = self.queue.pop_front() {
            match Self::build(entry, performer, ctx) {
                Ok(mut action) if action.is_finished() => action.on_remove(ctx),
                Ok(action) => {
                    tracing::debug!("{} chain starts {}", self.owner, action.kind());
                    self.current = Some(action);
                    return true;
                }
                Err(err) => tracing::warn!("{} chain skips a step: {}", self.owner, err),
            }
        }
        false
    }
}

impl Action for Chain {
    fn kind(&self) -> ActionKind {
        KIND
    }

    fn init(
        &mut self,
        owner: EntityId,
        command: &ActionCommand,
        ctx: &mut SimContext<'_>,
    ) -> Result<(), ActionError> {
        let ActionCommand::Chain(ChainParams { performer, steps }) = command else {
            return Err(mismatch(KIND, command));
        };
        check_owner(KIND, owner, ctx)?;
        self.reset(owner, *performer);
        self.queue = steps.iter().cloned().map(Queued::Command).collect();
        Ok(())
    }

    fn update(&mut self, dt: f32, ctx: &mut SimContext<'_>) {
        if self.finished || self.is_paused() {
            return;
        }
        let Some(performer) = self.resolve_performer(ctx) else {
            return;
        };
        if self.current.is_none() && !self.start_next(performer, ctx) {
            self.finished = true;
            return;
        }
        let Some(current) = self.current.as_mut() else {
            return;
        };
        current.update(dt, ctx);
        if current.is_finished() {
            current.on_remove(ctx);
            self.current = None;
            if self.queue.is_empty() {
                self.finished = true;
            }
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn is_paused(&self) -> bool {
        self.paused && self.current.as_ref().is_none_or(|a| a.is_paused())
    }

    fn pause(&mut self) {
        self.paused = true;
        if let Some(current) = self.current.as_mut() {
            current.pause();
        }
    }

    fn resume(&mut self, ctx: &mut SimContext<'_>) {
        self.paused = false;
        if let Some(current) = self.current.as_mut() {
            current.resume(ctx);
        }
    }

    fn is_blocking_in_combat(&self) -> bool {
        !self.finished
            && self
                .current
                .as_ref()
                .is_none_or(|a| a.is_blocking_in_combat())
    }

    fn on_remove(&mut self, ctx: &mut SimContext<'_>) {
        self.clear(ctx);
        if self.is_handed_off() {
            ctx.request(Request::ResumeActions(self.performer()));
        }
        self.finished = true;
    }

    fn write_params(&self, out: &mut Element) {
        if let Some(performer) = self.performer {
            out.set_entity("performer", performer.id());
        }
        if let Some(current) = &self.current {
            let mut step = Element::new(current.kind().as_ref());
            current.write_params(&mut step);
            if current.is_paused() {
                step.set("paused", true);
            }
            out.push(step);
        }
        for entry in &self.queue {
            out.push(entry.to_element());
        }
    }

    fn read_params(
        &mut self,
        owner: EntityId,
        input: &Element,
        ctx: &mut SimContext<'_>,
    ) -> Result<(), PersistError> {
        check_owner(KIND, owner, ctx)?;
        let performer = input.parse::<u32>("performer")?.map(EntityId);
        self.reset(owner, performer);
        self.queue = input.children.iter().cloned().map(Queued::Document).collect();
        Ok(())
    }
}
