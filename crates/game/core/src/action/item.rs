//! Using an item from the owner's inventory.

use crate::combat::apply_effects;
use crate::env::{ItemUse, SimContext, SimEvent, UseCondition};
use crate::persist::{Element, PersistError};
use crate::state::{Entity, EntityId, ItemId, Position};

use super::approach::{can_afford, charge_ap};
use super::{
    Action, ActionCommand, ActionError, ActionKind, ActionSlot, ActionTarget, Binding,
    Destination, ItemUseParams, MoveTo, TargetRef, check_owner, mismatch,
};

const KIND: ActionKind = ActionKind::UseInventoryItem;

#[derive(Debug, Default)]
pub struct UseInventoryItem {
    owner: EntityId,
    params: Option<ItemUseParams>,
    usage: Option<ItemUse>,
    target: Option<TargetRef>,
    target_tile: Position,
    mover: MoveTo,
    finished: bool,
}

impl UseInventoryItem {
    pub fn item(&self) -> Option<ItemId> {
        self.params.map(|p| p.item)
    }

    fn refuse(&mut self, ctx: &mut SimContext<'_>, reason: &'static str) {
        ctx.refuse(self.owner, KIND, reason);
        self.finished = true;
    }

    fn arrival(&self) -> impl Fn(&SimContext<'_>) -> bool + use<> {
        let (owner, tile) = (self.owner, self.target_tile);
        move |ctx: &SimContext<'_>| {
            ctx.entity(owner)
                .is_none_or(|me| me.tile().is_next_to_or_on(tile) || ctx.can_see(owner, tile))
        }
    }

    fn bind(&mut self, tile: Position, ctx: &mut SimContext<'_>) {
        self.target_tile = tile;
        let arrived = self.arrival();
        self.mover
            .begin(self.owner, &Destination::tile(tile), ctx, &arrived);
    }

    fn resolve(&mut self, ctx: &mut SimContext<'_>) {
        self.finished = true;
        let (Some(params), Some(usage)) = (self.params, self.usage.take()) else {
            return;
        };
        let reachable = ctx.entity(self.owner).is_some_and(|me| {
            me.tile().is_next_to_or_on(self.target_tile) || ctx.can_see(self.owner, self.target_tile)
        });
        if !reachable {
            self.refuse(ctx, "cannot see the target");
            return;
        }
        let cost = ctx.rules().ap.use_item;
        if !can_afford(ctx, self.owner, cost) {
            self.refuse(ctx, "not enough AP");
            return;
        }

        let isometric = ctx.map().is_isometric();
        let facing = self.target_tile.to_world();
        let Some(me) = ctx.entity_mut(self.owner) else {
            return;
        };
        if !me.inventory.take_one(params.item) {
            self.refuse(ctx, "item no longer carried");
            return;
        }
        if usage.targeted {
            me.face(isometric, facing);
        }

        let recipient = match params.target {
            _ if !usage.targeted => Some(self.owner),
            ActionTarget::Entity(id) => Some(id),
            ActionTarget::Tile(tile) => ctx.world.entity_at(tile).map(|e| e.id),
        };
        if let Some(recipient) = recipient {
            apply_effects(ctx, self.owner, recipient, &usage.effects);
        }
        charge_ap(ctx, self.owner, cost);
        tracing::info!("{} used item {}", self.owner, params.item.0);
        ctx.emit(SimEvent::ItemUsed {
            actor: self.owner,
            item: params.item,
        });
    }
}

/// First condition `user` fails, as a log key.
fn failed_condition(user: &Entity, conditions: &[UseCondition], combat: bool) -> Option<&'static str> {
    conditions.iter().find_map(|condition| match *condition {
        UseCondition::MinSkill { skill, rank } if user.stats.skills.rank(skill) < rank => {
            Some("skill too low")
        }
        UseCondition::NotInCombat if combat => Some("not usable in combat"),
        UseCondition::OnlyInCombat if !combat => Some("only usable in combat"),
        _ => None,
    })
}

impl Action for UseInventoryItem {
    fn kind(&self) -> ActionKind {
        KIND
    }

    fn init(
        &mut self,
        owner: EntityId,
        command: &ActionCommand,
        ctx: &mut SimContext<'_>,
    ) -> Result<(), ActionError> {
        let ActionCommand::UseInventoryItem(params) = command else {
            return Err(mismatch(KIND, command));
        };
        check_owner(KIND, owner, ctx)?;
        let definition = ctx
            .env
            .items()?
            .item(params.item)
            .ok_or(ActionError::UnknownItem(params.item))?;

        *self = Self {
            owner,
            params: Some(*params),
            usage: definition.usable.clone(),
            ..Self::default()
        };

        let Some(usage) = &self.usage else {
            self.refuse(ctx, "item cannot be used");
            return Ok(());
        };
        let Some(user) = ctx.entity(owner) else {
            return Err(ActionError::UnknownEntity(owner));
        };
        let failed = if user.inventory.has(params.item) {
            failed_condition(user, &usage.conditions, ctx.combat)
        } else {
            Some("item not carried")
        };
        if let Some(reason) = failed {
            self.refuse(ctx, reason);
            return Ok(());
        }

        if !usage.targeted {
            self.target_tile = user.tile();
            self.resolve(ctx);
            return Ok(());
        }
        match params.target {
            ActionTarget::Tile(tile) => self.bind(tile, ctx),
            ActionTarget::Entity(id) => {
                self.target = Some(TargetRef::new(id));
                let binding = self.target.as_mut().map(|t| t.resolve(&*ctx.world));
                if let Some(Binding::Fresh(tile)) = binding {
                    self.bind(tile, ctx);
                }
            }
        }
        Ok(())
    }

    fn update(&mut self, dt: f32, ctx: &mut SimContext<'_>) {
        if self.finished || self.mover.is_paused() {
            return;
        }
        if self.target.is_some_and(|t| !t.is_bound()) {
            match self.target.as_mut().map(|t| t.resolve(&*ctx.world)) {
                Some(Binding::Fresh(tile)) => self.bind(tile, ctx),
                _ => {
                    self.refuse(ctx, "target vanished");
                    return;
                }
            }
        }
        let arrived = self.arrival();
        self.mover.step(dt, ctx, &arrived);
        if self.mover.is_finished() {
            self.resolve(ctx);
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn is_paused(&self) -> bool {
        self.mover.is_paused()
    }

    fn pause(&mut self) {
        self.mover.request_pause();
    }

    fn resume(&mut self, ctx: &mut SimContext<'_>) {
        let arrived = self.arrival();
        self.mover.resume_with(ctx, &arrived);
    }

    fn is_blocking_in_combat(&self) -> bool {
        !self.finished
    }

    fn slot(&self) -> ActionSlot {
        ActionSlot::Exclusive(ActionKind::MoveTo)
    }

    fn on_remove(&mut self, ctx: &mut SimContext<'_>) {
        self.mover.stop(ctx);
        self.finished = true;
    }

    fn write_params(&self, out: &mut Element) {
        let Some(params) = self.params else {
            return;
        };
        out.set("item", params.item.0);
        match params.target {
            ActionTarget::Entity(id) => out.set_entity("target", id),
            ActionTarget::Tile(tile) => out.set_tile(tile),
        }
    }

    fn read_params(
        &mut self,
        owner: EntityId,
        input: &Element,
        ctx: &mut SimContext<'_>,
    ) -> Result<(), PersistError> {
        let item = ItemId(input.require("item")?);
        let target = match input.parse::<u32>("target")? {
            Some(id) => ActionTarget::Entity(EntityId(id)),
            None => ActionTarget::Tile(input.tile()?),
        };
        self.init(
            owner,
            &ActionCommand::UseInventoryItem(ItemUseParams { item, target }),
            ctx,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{Catalog, Effect, ItemDefinition};
    use crate::state::{Capabilities, ItemStack, Skill};
    use crate::testing::Fixture;

    const HERO: EntityId = EntityId(1);
    const ALLY: EntityId = EntityId(2);
    const POTION: ItemId = ItemId(1);
    const BOMB: ItemId = ItemId(2);

    fn fixture() -> Fixture {
        let mut hero = Entity::new(HERO, "hero", Capabilities::PC).at(Position::new(1, 1));
        hero.stats.hp.current = 4;
        hero.inventory.add(ItemStack { item: POTION, count: 2 });
        hero.inventory.add(ItemStack { item: BOMB, count: 1 });
        let mut fx = Fixture::corridor()
            .with_entity(hero)
            .with_entity(Entity::new(ALLY, "ally", Capabilities::NPC).at(Position::new(6, 1)));
        fx.catalog = Catalog::new()
            .with_item(ItemDefinition {
                id: POTION,
                name: "potion".into(),
                usable: Some(ItemUse {
                    targeted: false,
                    conditions: vec![UseCondition::NotInCombat],
                    effects: vec![Effect::Heal(3)],
                }),
            })
            .with_item(ItemDefinition {
                id: BOMB,
                name: "bomb".into(),
                usable: Some(ItemUse {
                    targeted: true,
                    conditions: vec![UseCondition::MinSkill {
                        skill: Skill::Thrown,
                        rank: 1,
                    }],
                    effects: vec![Effect::Damage { min: 5, max: 5 }],
                }),
            });
        fx
    }

    fn use_on(item: ItemId, target: ActionTarget) -> ActionCommand {
        ActionCommand::UseInventoryItem(ItemUseParams { item, target })
    }

    #[test]
    fn self_targeted_item_applies_immediately() {
        let mut fx = fixture();
        let mut drink = UseInventoryItem::default();
        drink
            .init(HERO, &use_on(POTION, ActionTarget::Entity(HERO)), &mut fx.ctx(false))
            .expect("init");

        assert!(drink.is_finished());
        let hero = fx.entity(HERO);
        assert_eq!(hero.stats.hp.current, 7);
        assert_eq!(hero.inventory.count(POTION), 1);
    }

    #[test]
    fn failed_conditions_refuse_without_consuming() {
        let mut fx = fixture();
        let mut drink = UseInventoryItem::default();
        drink
            .init(HERO, &use_on(POTION, ActionTarget::Entity(HERO)), &mut fx.ctx(true))
            .expect("init");
        assert!(drink.is_finished());
        assert_eq!(fx.entity(HERO).inventory.count(POTION), 2);

        let mut throw = UseInventoryItem::default();
        throw
            .init(HERO, &use_on(BOMB, ActionTarget::Entity(ALLY)), &mut fx.ctx(false))
            .expect("init");
        assert!(matches!(
            fx.events().last(),
            Some(SimEvent::Refused { reason: "skill too low", .. })
        ));
    }

    #[test]
    fn targeted_item_in_sight_is_thrown_from_place() {
        let mut fx = fixture();
        fx.entity_mut(HERO).stats.skills.set(Skill::Thrown, 1);
        let mut throw = UseInventoryItem::default();
        throw
            .init(HERO, &use_on(BOMB, ActionTarget::Entity(ALLY)), &mut fx.ctx(true))
            .expect("init");
        fx.run(&mut throw, true);

        assert_eq!(fx.entity(HERO).tile(), Position::new(1, 1));
        assert_eq!(fx.entity(HERO).stats.ap.current, 6);
        assert_eq!(fx.entity(ALLY).stats.hp.current, 5);
        assert!(!fx.entity(HERO).inventory.has(BOMB));
    }

    #[test]
    fn unknown_items_are_configuration_errors() {
        let mut fx = fixture();
        let err = UseInventoryItem::default()
            .init(HERO, &use_on(ItemId(42), ActionTarget::Entity(HERO)), &mut fx.ctx(false))
            .unwrap_err();
        assert_eq!(err, ActionError::UnknownItem(ItemId(42)));
    }
}
