//! Random action dispatch
//!
//! Picks an [`Action`], resolves it against what the session can currently
//! see (entities, inventory, nearby blocks) and runs it. Nothing escapes:
//! a missing target turns into [`ActionOutcome::Skipped`] and a transport
//! failure into [`ActionOutcome::Failed`].

use super::catalog::{Action, ActionKind, BlockInteraction, WorldInteraction, BLOCK_REACH};
use crate::session::{Block, BotSession, Control, Vec3};
use crate::Result;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use std::sync::Mutex;

/// Result of one dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// The capability call went through
    Performed(ActionKind),

    /// Nothing to act on; no call was made
    Skipped { kind: ActionKind, reason: &'static str },

    /// The capability call failed and was swallowed
    Failed { kind: ActionKind, error: String },
}

impl ActionOutcome {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Performed(kind) => *kind,
            Self::Skipped { kind, .. } | Self::Failed { kind, .. } => *kind,
        }
    }

    pub fn is_performed(&self) -> bool {
        matches!(self, Self::Performed(_))
    }
}

/// An action with every random choice already made
#[derive(Debug, Clone)]
enum Step {
    SetControl(Control),
    LookAndNavigate(Vec3),
    Look { yaw: f64, pitch: f64 },
    SelectSlot(usize),
    Toss { item_type: u32, count: u32 },
    Chat(String),
    Dig(Block),
    Place { reference: Block, face: Vec3 },
}

/// Selects and performs randomized actions on a session
pub struct ActionDispatcher {
    rng: Mutex<StdRng>,
}

impl Default for ActionDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionDispatcher {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic dispatcher
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Pick one action uniformly from the catalog and perform it
    pub async fn perform_random_action(&self, session: &dyn BotSession) -> ActionOutcome {
        let action = {
            let mut rng = self.lock_rng();
            Action::random(&mut *rng)
        };
        self.perform(session, action).await
    }

    /// Perform a specific action
    pub async fn perform(&self, session: &dyn BotSession, action: Action) -> ActionOutcome {
        let kind = action.kind();
        let step = {
            let mut rng = self.lock_rng();
            resolve(action, session, &mut *rng)
        };

        let step = match step {
            Ok(step) => step,
            Err(reason) => {
                tracing::trace!(identity = session.identity(), %kind, reason, "Action skipped");
                return ActionOutcome::Skipped { kind, reason };
            }
        };

        match execute(step, session).await {
            Ok(()) => {
                tracing::trace!(identity = session.identity(), %kind, "Action performed");
                ActionOutcome::Performed(kind)
            }
            Err(e) => {
                tracing::debug!(identity = session.identity(), %kind, "Action failed: {}", e);
                ActionOutcome::Failed {
                    kind,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Send the configured one-shot chat line or command verbatim
    pub async fn perform_one_shot(&self, session: &dyn BotSession, text: &str) -> ActionOutcome {
        let action = if text.starts_with('/') {
            Action::Command(text.to_string())
        } else {
            Action::Chat(text.to_string())
        };
        self.perform(session, action).await
    }

    fn lock_rng(&self) -> std::sync::MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Fix every random choice that depends on session contents
fn resolve<R: Rng + ?Sized>(
    action: Action,
    session: &dyn BotSession,
    rng: &mut R,
) -> std::result::Result<Step, &'static str> {
    match action {
        Action::Movement(control) => Ok(Step::SetControl(control)),
        Action::Explore => {
            let mut entities: Vec<_> = session.entities().into_values().collect();
            entities.sort_by_key(|e| e.id);
            let entity = entities.choose(rng).ok_or("no entities nearby")?;
            entity
                .position
                .map(Step::LookAndNavigate)
                .ok_or("entity has no position")
        }
        Action::World(WorldInteraction::LookAround) => Ok(Step::Look {
            yaw: rng.gen::<f64>() * PI * 2.0,
            pitch: (rng.gen::<f64>() - 0.5) * PI,
        }),
        Action::World(WorldInteraction::SelectSlot) => match session.inventory_slots() {
            0 => Err("no inventory slots"),
            slots => Ok(Step::SelectSlot(rng.gen_range(0..slots))),
        },
        Action::World(WorldInteraction::DropItem) => {
            let items = session.inventory_items();
            let item = items.choose(rng).ok_or("inventory empty")?;
            Ok(Step::Toss {
                item_type: item.item_type,
                count: item.count,
            })
        }
        Action::Chat(text) | Action::Command(text) => Ok(Step::Chat(text)),
        Action::Block(BlockInteraction::Dig) => session
            .find_block(BLOCK_REACH)
            .map(Step::Dig)
            .ok_or("no block within reach"),
        Action::Block(BlockInteraction::Place) => {
            let reference = session
                .find_block(BLOCK_REACH)
                .ok_or("no block within reach")?;
            let face = *Vec3::FACES.choose(rng).ok_or("no faces")?;
            session
                .inventory_items()
                .iter()
                .find(|item| session.can_place_block(item, &reference))
                .ok_or("nothing placeable in inventory")?;
            Ok(Step::Place { reference, face })
        }
    }
}

async fn execute(step: Step, session: &dyn BotSession) -> Result<()> {
    match step {
        // Flags accumulate: a movement never clears earlier ones
        Step::SetControl(control) => session.set_control_state(control, true),
        Step::LookAndNavigate(target) => {
            session.look_at(target).await?;
            session.navigate_to(target).await
        }
        Step::Look { yaw, pitch } => session.look(yaw, pitch).await,
        Step::SelectSlot(slot) => session.select_slot(slot).await,
        Step::Toss { item_type, count } => session.toss(item_type, count).await,
        Step::Chat(text) => session.chat(&text).await,
        Step::Dig(block) => session.dig(&block).await,
        Step::Place { reference, face } => session.place_block(&reference, face).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Endpoint, ProtocolOptions};
    use crate::session::{
        ConnectBehavior, ConnectRequest, Connector, MemoryConnector, MemoryWorld,
    };
    use std::sync::Arc;

    async fn session_in(world: MemoryWorld) -> (MemoryConnector, Arc<dyn BotSession>) {
        let connector = MemoryConnector::with_world(ConnectBehavior::Ready, world);
        let request = ConnectRequest {
            endpoint: Endpoint::new("memory", None),
            identity: "Dispatch1".to_string(),
            options: ProtocolOptions::default(),
            default_port: 25565,
        };
        let connection = connector.connect(&request).await.unwrap();
        (connector, connection.session)
    }

    #[tokio::test]
    async fn test_empty_world_never_fails_outward() {
        let (_connector, session) = session_in(MemoryWorld::empty()).await;
        let dispatcher = ActionDispatcher::with_seed(1);

        for _ in 0..300 {
            let outcome = dispatcher.perform_random_action(session.as_ref()).await;
            assert!(!matches!(outcome, ActionOutcome::Failed { .. }));
        }
    }

    #[tokio::test]
    async fn test_transport_failures_are_swallowed() {
        let mut world = MemoryWorld::sample();
        world.fail_actions = true;
        let (_connector, session) = session_in(world).await;
        let dispatcher = ActionDispatcher::with_seed(2);

        let mut failed = 0;
        for _ in 0..100 {
            if let ActionOutcome::Failed { .. } =
                dispatcher.perform_random_action(session.as_ref()).await
            {
                failed += 1;
            }
        }
        assert!(failed > 0);
    }

    #[tokio::test]
    async fn test_movement_flags_accumulate() {
        let (connector, session) = session_in(MemoryWorld::empty()).await;
        let dispatcher = ActionDispatcher::with_seed(3);

        for control in [Control::Sprint, Control::Jump, Control::Forward] {
            let outcome = dispatcher
                .perform(session.as_ref(), Action::Movement(control))
                .await;
            assert_eq!(outcome, ActionOutcome::Performed(ActionKind::Movement));
        }

        let record = connector.sessions()[0].record();
        assert_eq!(record.controls.len(), 3);
        assert!(record.controls.values().all(|on| *on));
    }

    #[tokio::test]
    async fn test_explore_skips_entity_without_position() {
        let mut world = MemoryWorld::sample();
        world.entities.retain(|_, e| e.position.is_none());
        let (_connector, session) = session_in(world).await;
        let dispatcher = ActionDispatcher::with_seed(4);

        let outcome = dispatcher.perform(session.as_ref(), Action::Explore).await;
        assert_eq!(
            outcome,
            ActionOutcome::Skipped {
                kind: ActionKind::Explore,
                reason: "entity has no position"
            }
        );
    }

    #[tokio::test]
    async fn test_explore_looks_and_navigates() {
        let mut world = MemoryWorld::sample();
        world.entities.retain(|_, e| e.position.is_some());
        let (connector, session) = session_in(world).await;
        let dispatcher = ActionDispatcher::with_seed(5);

        let outcome = dispatcher.perform(session.as_ref(), Action::Explore).await;
        assert!(outcome.is_performed());

        let record = connector.sessions()[0].record();
        assert_eq!(record.look_targets, vec![Vec3::new(4.0, 64.0, -2.0)]);
        assert_eq!(record.navigation, record.look_targets);
    }

    #[tokio::test]
    async fn test_block_actions() {
        let (connector, session) = session_in(MemoryWorld::sample()).await;
        let dispatcher = ActionDispatcher::with_seed(6);

        let dug = dispatcher
            .perform(session.as_ref(), Action::Block(BlockInteraction::Dig))
            .await;
        assert!(dug.is_performed());

        let placed = dispatcher
            .perform(session.as_ref(), Action::Block(BlockInteraction::Place))
            .await;
        assert!(placed.is_performed());

        let record = connector.sessions()[0].record();
        assert_eq!(record.dug[0].name, "dirt");
        assert_eq!(record.placed.len(), 1);
        assert_eq!(record.placed[0].0.name, "stone");
        assert!(Vec3::FACES.contains(&record.placed[0].1));
    }

    #[tokio::test]
    async fn test_place_needs_placeable_item() {
        let mut world = MemoryWorld::sample();
        world.placeable.clear();
        let (_connector, session) = session_in(world).await;
        let dispatcher = ActionDispatcher::with_seed(7);

        let outcome = dispatcher
            .perform(session.as_ref(), Action::Block(BlockInteraction::Place))
            .await;
        assert!(matches!(outcome, ActionOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn test_look_around_ranges() {
        let (connector, session) = session_in(MemoryWorld::empty()).await;
        let dispatcher = ActionDispatcher::with_seed(8);

        for _ in 0..50 {
            dispatcher
                .perform(session.as_ref(), Action::World(WorldInteraction::LookAround))
                .await;
        }

        for (yaw, pitch) in connector.sessions()[0].record().looks {
            assert!((0.0..2.0 * PI).contains(&yaw));
            assert!((-PI / 2.0..PI / 2.0).contains(&pitch));
        }
    }

    #[tokio::test]
    async fn test_one_shot_is_sent_verbatim() {
        let (connector, session) = session_in(MemoryWorld::empty()).await;
        let dispatcher = ActionDispatcher::new();

        let outcome = dispatcher.perform_one_shot(session.as_ref(), "/spawn").await;
        assert_eq!(outcome.kind(), ActionKind::Command);
        let outcome = dispatcher.perform_one_shot(session.as_ref(), "gg").await;
        assert_eq!(outcome.kind(), ActionKind::Chat);

        assert_eq!(connector.sessions()[0].record().chat, vec!["/spawn", "gg"]);
    }
}
