//! Closed registry from variant tag to constructor.

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::persist::PersistError;

use super::{
    Action, ActionError, ActionKind, Attack, Chain, DisarmTrap, LookAround, LookAt, Lockpick,
    MockAttack, MoveTo, PickUp, SetBrainEnabled, Shout, TalkTo, UseGameObject, UseInventoryItem,
    UsePerk, Wait, Wander,
};

/// Builds an uninitialised instance of one variant.
pub type ActionFactory = fn() -> Box<dyn Action>;

fn boxed<A: Action + Default + 'static>() -> Box<dyn Action> {
    Box::new(A::default())
}

/// Maps every [`ActionKind`] to a factory.
///
/// Built-ins are registered by [`ActionRegistry::with_builtins`]. Hosts may
/// replace a factory at startup to swap in their own implementation of a
/// variant; the tag stays the same so saves remain readable.
#[derive(Clone, Debug)]
pub struct ActionRegistry {
    factories: BTreeMap<ActionKind, ActionFactory>,
}

impl ActionRegistry {
    /// Empty registry. Useful in tests that need a variant to be missing.
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(ActionKind::MoveTo, boxed::<MoveTo>);
        registry.register(ActionKind::Wander, boxed::<Wander>);
        registry.register(ActionKind::LookAround, boxed::<LookAround>);
        registry.register(ActionKind::Attack, boxed::<Attack>);
        registry.register(ActionKind::MockAttack, boxed::<MockAttack>);
        registry.register(ActionKind::UsePerk, || -> Box<dyn Action> {
            Box::new(UsePerk::perk())
        });
        registry.register(ActionKind::CastSpell, || -> Box<dyn Action> {
            Box::new(UsePerk::spell())
        });
        registry.register(ActionKind::UseInventoryItem, boxed::<UseInventoryItem>);
        registry.register(ActionKind::UseGameObject, boxed::<UseGameObject>);
        registry.register(ActionKind::Lockpick, boxed::<Lockpick>);
        registry.register(ActionKind::DisarmTrap, boxed::<DisarmTrap>);
        registry.register(ActionKind::PickUp, boxed::<PickUp>);
        registry.register(ActionKind::TalkTo, boxed::<TalkTo>);
        registry.register(ActionKind::Wait, boxed::<Wait>);
        registry.register(ActionKind::LookAt, boxed::<LookAt>);
        registry.register(ActionKind::Shout, boxed::<Shout>);
        registry.register(ActionKind::DisableAi, || -> Box<dyn Action> {
            Box::new(SetBrainEnabled::disable())
        });
        registry.register(ActionKind::EnableAi, || -> Box<dyn Action> {
            Box::new(SetBrainEnabled::enable())
        });
        registry.register(ActionKind::Chain, boxed::<Chain>);
        registry
    }

    /// Registers or replaces the factory for `kind`, returning the old one.
    pub fn register(&mut self, kind: ActionKind, factory: ActionFactory) -> Option<ActionFactory> {
        self.factories.insert(kind, factory)
    }

    pub fn contains(&self, kind: ActionKind) -> bool {
        self.factories.contains_key(&kind)
    }

    pub fn create(&self, kind: ActionKind) -> Result<Box<dyn Action>, ActionError> {
        self.factories
            .get(&kind)
            .map(|factory| factory())
            .ok_or(ActionError::UnregisteredKind(kind))
    }

    /// Builds the variant named by a persisted tag.
    pub fn create_by_tag(&self, tag: &str) -> Result<Box<dyn Action>, PersistError> {
        let kind =
            ActionKind::from_str(tag).map_err(|_| PersistError::UnknownTag(tag.to_owned()))?;
        Ok(self.create(kind)?)
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn builtins_cover_every_kind() {
        let registry = ActionRegistry::with_builtins();
        for kind in ActionKind::iter() {
            let action = registry.create(kind).expect("registered");
            assert_eq!(action.kind(), kind);
        }
    }

    #[test]
    fn unknown_tags_and_missing_factories_fail() {
        let registry = ActionRegistry::empty();
        assert_eq!(
            registry.create(ActionKind::Wait).unwrap_err(),
            ActionError::UnregisteredKind(ActionKind::Wait)
        );
        assert_eq!(
            ActionRegistry::with_builtins()
                .create_by_tag("teleport")
                .unwrap_err(),
            PersistError::UnknownTag("teleport".into())
        );
    }

    #[test]
    fn register_replaces_factory() {
        let mut registry = ActionRegistry::with_builtins();
        let previous = registry.register(ActionKind::Shout, boxed::<Wait>);
        assert!(previous.is_some());
        assert_eq!(
            registry.create(ActionKind::Shout).expect("registered").kind(),
            ActionKind::Wait
        );
    }
}
