//! The authoritative room state machine.
//!
//! One [`GameState`] per room, owned by the room task. Every mutation
//! goes through [`GameState::handle_intent`] (client traffic) or
//! [`GameState::handle_pacing`] (delayed beats); both return the
//! [`Effects`] the room actor must deliver and schedule. Invalid intents
//! come back as targeted `ActionError` notices — they never poison the
//! room.

use std::sync::Arc;

use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use tracing::{debug, info, warn};

use gloomhall_catalog::{
    Catalog, CardTemplate, Effect, EffectKind, StatusKind, TriggerTiming,
};
use gloomhall_dice::{d20, roll_or_zero};
use gloomhall_protocol::{
    CardId, CardKind, ClassId, ClientIntent, DmActionKind, EventOutcome,
    GameMode, GamePhase, PlayerActionKind, PlayerId, Recipient, Role,
    RoomCode, ServerNotice,
};

use crate::GameError;
use crate::actor::{HealthDice, Player};
use crate::cards::{CardInstance, InstanceCounter, MonsterInstance};
use crate::combat;
use crate::deck::Deck;
use crate::effects::{Effects, PacingEvent, PacingProfile};
use crate::events::classify_event_roll;
use crate::npc::{self, NpcAction};
use crate::snapshot::card_view;

/// Tunables for one room.
#[derive(Debug, Clone, Copy)]
pub struct GameConfig {
    /// Seats in the room, DM included.
    pub max_players: usize,
    /// Explorer seats filled (with NPCs if needed) at game start.
    pub party_size: usize,
    /// Lives per explorer.
    pub lives: u8,
    /// Explorers earn an event roll every Nth DM turn.
    pub event_roll_every: u32,
    /// Monster kills per difficulty stage.
    pub kills_per_stage: u32,
    pub pacing: PacingProfile,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_players: 5,
            party_size: 4,
            lives: 3,
            event_roll_every: 3,
            kills_per_stage: 3,
            pacing: PacingProfile::standard(),
        }
    }
}

/// Full mutable state of one room.
pub struct GameState {
    pub(crate) catalog: Arc<Catalog>,
    pub(crate) config: GameConfig,
    pub(crate) room_code: RoomCode,
    pub(crate) phase: GamePhase,
    pub(crate) mode: GameMode,
    pub(crate) players: Vec<Player>,
    /// Fixed at game start: the DM first, explorers shuffled after.
    pub(crate) turn_order: Vec<PlayerId>,
    /// −1 until the first turn begins.
    pub(crate) current_turn_index: i32,
    pub(crate) board: Vec<MonsterInstance>,
    pub(crate) monster_deck: Deck,
    pub(crate) world_event_deck: Deck,
    pub(crate) current_world_event: Option<CardInstance>,
    pub(crate) instance_ids: InstanceCounter,
    /// DM turns completed.
    pub(crate) turns_elapsed: u32,
    pub(crate) monsters_defeated: u32,
    pub(crate) stage: u32,
    pub(crate) finished: bool,
}

impl GameState {
    pub fn new(catalog: Arc<Catalog>, config: GameConfig, room_code: RoomCode) -> Self {
        Self {
            catalog,
            config,
            room_code,
            phase: GamePhase::Lobby,
            mode: GameMode::Beginner,
            players: Vec::new(),
            turn_order: Vec::new(),
            current_turn_index: -1,
            board: Vec::new(),
            monster_deck: Deck::default(),
            world_event_deck: Deck::default(),
            current_world_event: None,
            instance_ids: InstanceCounter::new(),
            turns_elapsed: 0,
            monsters_defeated: 0,
            stage: 1,
            finished: false,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// The party has wiped; the room is done.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Connected human seats. The room layer destroys the room when this
    /// hits zero.
    pub fn human_count(&self) -> usize {
        self.players.iter().filter(|p| !p.is_npc).count()
    }

    pub fn contains_player(&self, id: PlayerId) -> bool {
        self.players.iter().any(|p| p.id == id)
    }

    /// The host seat: the longest-standing human.
    pub fn host_id(&self) -> PlayerId {
        self.players
            .iter()
            .find(|p| !p.is_npc)
            .map(|p| p.id)
            .unwrap_or(PlayerId(0))
    }

    /// Seats a new human player. Only possible in the lobby.
    pub fn join(&mut self, id: PlayerId, name: String) -> Result<Effects, GameError> {
        if !self.phase.is_lobby() {
            return Err(GameError::AlreadyStarted);
        }
        if self.contains_player(id) {
            return Err(GameError::AlreadySeated(id));
        }
        if self.players.len() >= self.config.max_players {
            return Err(GameError::RoomFull);
        }
        info!(room = %self.room_code, player = %id, %name, "player joined");
        self.players.push(Player::new(id, name, false, self.config.lives));

        let mut fx = Effects::new();
        fx.notify(
            Recipient::All,
            ServerNotice::PlayerListUpdate {
                players: self.roster(),
            },
        );
        self.push_snapshot(&mut fx);
        Ok(fx)
    }

    /// Removes a player. In the lobby the seat disappears; mid-game the
    /// seat switches to autopilot so the session keeps moving.
    pub fn leave(&mut self, id: PlayerId) -> Effects {
        let mut fx = Effects::new();
        if self.phase.is_lobby() {
            let before = self.players.len();
            self.players.retain(|p| p.id != id);
            if self.players.len() == before {
                return fx;
            }
            info!(room = %self.room_code, player = %id, "player left lobby");
            fx.notify(
                Recipient::All,
                ServerNotice::PlayerListUpdate {
                    players: self.roster(),
                },
            );
            if !self.players.is_empty() {
                self.push_snapshot(&mut fx);
            }
            return fx;
        }

        let (name, role) = {
            let Some(p) = self.players.iter_mut().find(|p| p.id == id) else {
                return fx;
            };
            p.is_npc = true;
            (p.name.clone(), p.role)
        };
        info!(room = %self.room_code, player = %id, "player left mid-game, seat on autopilot");
        fx.narrate(format!(
            "{name} drifts away into the gloom; the party presses on."
        ));
        if self.active_id() == Some(id) {
            let pacing = self.config.pacing;
            match role {
                Role::Explorer => {
                    fx.schedule(pacing.npc_think, PacingEvent::NpcTurn { actor: id })
                }
                Role::Dm => fx.schedule(pacing.npc_act, PacingEvent::AdvanceTurn),
            }
        }
        self.push_snapshot(&mut fx);
        fx
    }

    /// Handles one client intent. Always succeeds from the room's point
    /// of view; rejections are targeted notices inside the effects.
    pub fn handle_intent(
        &mut self,
        sender: PlayerId,
        intent: ClientIntent,
        rng: &mut impl Rng,
    ) -> Effects {
        match intent {
            ClientIntent::ChooseClass { class_id } => self.choose_class(sender, class_id),
            ClientIntent::StartGame { mode } => self.start_game(sender, mode, rng),
            ClientIntent::AdvancedCardChoice { kind } => {
                self.advanced_card_choice(sender, kind, rng)
            }
            ClientIntent::EndTurn => self.end_turn(sender, rng),
            ClientIntent::PlayerAction { action, narrative } => {
                self.player_action(sender, action, narrative, rng)
            }
            ClientIntent::DmAction { action } => self.dm_action(sender, action, rng),
            ClientIntent::EquipItem { card_id } => self.equip_item(sender, card_id),
            ClientIntent::RollForEvent => self.roll_for_event(sender, rng),
            ClientIntent::SelectEventCard { card_id } => {
                self.select_event_card(sender, card_id, rng)
            }
            ClientIntent::Chat { text } => self.chat(sender, text),
        }
    }

    /// Handles a pacing event that came due on the room's pacer.
    pub fn handle_pacing(&mut self, event: PacingEvent, rng: &mut impl Rng) -> Effects {
        match event {
            PacingEvent::AdvanceTurn => self.start_next_turn(rng),
            PacingEvent::SpawnMonster => {
                let mut fx = self.spawn_monster(rng);
                self.push_snapshot(&mut fx);
                fx
            }
            PacingEvent::NpcTurn { actor } => self.npc_turn(actor, rng),
            PacingEvent::NpcStrike { attacker, target } => {
                self.npc_strike(attacker, target, rng)
            }
        }
    }

    // ---- lobby ------------------------------------------------------

    fn choose_class(&mut self, sender: PlayerId, class_id: ClassId) -> Effects {
        let mut fx = Effects::new();
        if !self.phase.is_lobby() {
            fx.error_to(sender, "classes are chosen in the lobby");
            return fx;
        }
        let catalog = Arc::clone(&self.catalog);
        let Some(class) = catalog.class(class_id) else {
            fx.error_to(sender, format!("unknown class {class_id}"));
            return fx;
        };
        let Some(player) = self.players.iter_mut().find(|p| p.id == sender) else {
            return fx;
        };
        player.class = Some(class_id);
        player.health_dice = HealthDice {
            max: class.health_dice,
            current: class.health_dice,
        };
        player.recompute_stats(&catalog);
        debug!(player = %sender, class = %class.name, "class chosen");
        fx.notify(
            Recipient::All,
            ServerNotice::PlayerListUpdate {
                players: self.roster(),
            },
        );
        self.push_snapshot(&mut fx);
        fx
    }

    fn start_game(
        &mut self,
        sender: PlayerId,
        mode: GameMode,
        rng: &mut impl Rng,
    ) -> Effects {
        let mut fx = Effects::new();
        if !self.phase.is_lobby() {
            fx.error_to(sender, "the game has already started");
            return fx;
        }
        if sender != self.host_id() {
            fx.error_to(sender, "only the host can start the game");
            return fx;
        }
        if self.players.iter().any(|p| p.class.is_none()) {
            fx.error_to(sender, "every explorer needs a class first");
            return fx;
        }

        self.mode = mode;
        let catalog = Arc::clone(&self.catalog);

        if self.players.len() >= self.config.max_players {
            // A full table provides its own keeper.
            let idx = rng.random_range(0..self.players.len());
            self.players[idx].role = Role::Dm;
        } else {
            let mut next_npc = PlayerId::NPC_BASE;
            let needed = self.config.party_size.saturating_sub(self.players.len());
            for i in 0..needed {
                let name = self.fresh_npc_name(&catalog);
                let class = &catalog.classes()[i % catalog.classes().len()];
                let mut npc =
                    Player::new(PlayerId(next_npc), name, true, self.config.lives);
                next_npc += 1;
                npc.class = Some(class.id);
                npc.health_dice = HealthDice {
                    max: class.health_dice,
                    current: class.health_dice,
                };
                self.players.push(npc);
            }
            let mut dm = Player::new(
                PlayerId(next_npc),
                catalog.dm_name.clone(),
                true,
                self.config.lives,
            );
            dm.role = Role::Dm;
            self.players.push(dm);
        }

        for p in &mut self.players {
            if p.role == Role::Explorer {
                if let Some(t) = p
                    .class
                    .and_then(|c| catalog.class(c))
                    .and_then(|c| catalog.card(c.starter_weapon))
                {
                    p.weapon = Some(CardInstance::stamp(t, &mut self.instance_ids));
                }
            }
            p.recompute_stats(&catalog);
        }

        self.monster_deck = Deck::build(
            &catalog.templates_of(CardKind::Monster),
            &mut self.instance_ids,
            rng,
        );
        self.world_event_deck = Deck::build(
            &catalog.templates_of(CardKind::WorldEvent),
            &mut self.instance_ids,
            rng,
        );

        let dm = self
            .players
            .iter()
            .find(|p| p.role == Role::Dm)
            .map(|p| p.id)
            .unwrap_or(PlayerId(0));
        let mut explorers: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|p| p.role == Role::Explorer)
            .map(|p| p.id)
            .collect();
        explorers.shuffle(rng);
        self.turn_order = std::iter::once(dm).chain(explorers).collect();
        self.current_turn_index = -1;
        self.turns_elapsed = 0;
        self.monsters_defeated = 0;
        self.stage = 1;

        info!(
            room = %self.room_code,
            ?mode,
            seats = self.players.len(),
            "game started"
        );

        match mode {
            GameMode::Advanced => {
                self.phase = GamePhase::AdvancedSetupChoice;
                fx.notify(
                    Recipient::All,
                    ServerNotice::GameStarted {
                        snapshot: self.snapshot(),
                    },
                );
                fx.narrate("Each explorer chooses a boon before the descent begins.");
            }
            GameMode::Beginner => {
                self.phase = GamePhase::Active;
                fx.notify(
                    Recipient::All,
                    ServerNotice::GameStarted {
                        snapshot: self.snapshot(),
                    },
                );
                let next = self.start_next_turn(rng);
                fx.merge(next);
            }
        }
        fx
    }

    fn advanced_card_choice(
        &mut self,
        sender: PlayerId,
        kind: CardKind,
        rng: &mut impl Rng,
    ) -> Effects {
        let mut fx = Effects::new();
        if self.phase != GamePhase::AdvancedSetupChoice {
            fx.error_to(sender, "no setup choice is pending");
            return fx;
        }
        let catalog = Arc::clone(&self.catalog);
        let (class, name) = {
            let Some(p) = self.players.iter().find(|p| p.id == sender) else {
                return fx;
            };
            if p.role != Role::Explorer || p.is_npc {
                fx.error_to(sender, "no setup choice is pending");
                return fx;
            }
            if p.advanced_choice_made {
                fx.error_to(sender, "you already took your boon");
                return fx;
            }
            (p.class, p.name.clone())
        };

        let pool: Vec<&CardTemplate> = catalog
            .templates_of(kind)
            .into_iter()
            .filter(|t| !matches!(t.kind, CardKind::Monster | CardKind::WorldEvent | CardKind::PlayerEvent))
            .filter(|t| {
                t.class_affinity
                    .is_none_or(|a| class.is_some_and(|c| c == a))
            })
            .collect();
        let Some(template) = pool.choose(rng).copied() else {
            fx.error_to(sender, "no cards of that kind are available");
            return fx;
        };
        let card = CardInstance::stamp(template, &mut self.instance_ids);
        fx.narrate(format!("{name} claims the {}.", card.name()));
        if let Some(p) = self.players.iter_mut().find(|p| p.id == sender) {
            p.hand.push(card);
            p.advanced_choice_made = true;
        }

        let all_chosen = self
            .players
            .iter()
            .filter(|p| p.role == Role::Explorer && !p.is_npc)
            .all(|p| p.advanced_choice_made);
        if all_chosen {
            self.phase = GamePhase::Active;
            info!(room = %self.room_code, "setup choices complete, turns begin");
            let next = self.start_next_turn(rng);
            fx.merge(next);
        } else {
            self.push_snapshot(&mut fx);
        }
        fx
    }

    // ---- turn loop --------------------------------------------------

    fn end_turn(&mut self, sender: PlayerId, rng: &mut impl Rng) -> Effects {
        let mut fx = Effects::new();
        if !self.phase.is_active() {
            fx.error_to(sender, "the game has not started");
            return fx;
        }
        if self.active_id() != Some(sender) {
            fx.error_to(sender, "it is not your turn");
            return fx;
        }
        fx.merge(self.start_next_turn(rng));
        fx
    }

    fn start_next_turn(&mut self, rng: &mut impl Rng) -> Effects {
        let mut fx = Effects::new();
        if self.finished || self.turn_order.is_empty() {
            return fx;
        }

        // Turn-end statuses flare on the outgoing actor before the seat
        // passes.
        if let Some(&outgoing) = usize::try_from(self.current_turn_index)
            .ok()
            .and_then(|i| self.turn_order.get(i))
        {
            let catalog = Arc::clone(&self.catalog);
            let mut flare = 0;
            if let Some(p) = self.players.iter().find(|p| p.id == outgoing) {
                for status in &p.statuses {
                    if let Some(def) = catalog.status(status.kind) {
                        if def.trigger == TriggerTiming::TurnEnd
                            && !def.damage_dice.is_empty()
                        {
                            flare += roll_or_zero(&def.damage_dice, rng);
                        }
                    }
                }
                if flare > 0 {
                    fx.narrate(format!(
                        "{} suffers {} damage as their turn ends.",
                        p.name, flare
                    ));
                }
            }
            if flare > 0 {
                self.apply_damage_to_player(outgoing, flare, &mut fx);
                if self.finished {
                    self.push_snapshot(&mut fx);
                    return fx;
                }
            }
        }

        let len = self.turn_order.len() as i32;
        self.current_turn_index = (self.current_turn_index + 1).rem_euclid(len);
        let active = self.turn_order[self.current_turn_index as usize];
        debug!(%active, index = self.current_turn_index, "turn advanced");

        // Upkeep: reset AP and tick the actor's statuses.
        let catalog = Arc::clone(&self.catalog);
        let mut cannot_act = false;
        let mut upkeep_damage = 0;
        {
            let Some(p) = self.players.iter_mut().find(|p| p.id == active) else {
                return fx;
            };
            p.current_ap = p.stats.ap;
            for status in &mut p.statuses {
                if let Some(def) = catalog.status(status.kind) {
                    if def.trigger == TriggerTiming::TurnStart
                        && !def.damage_dice.is_empty()
                    {
                        upkeep_damage += roll_or_zero(&def.damage_dice, rng);
                    }
                    if def.cannot_act {
                        cannot_act = true;
                    }
                }
                status.remaining = status.remaining.saturating_sub(1);
            }
            p.statuses.retain(|s| s.remaining > 0);
            if upkeep_damage > 0 {
                fx.narrate(format!(
                    "{} suffers {} damage from lingering effects.",
                    p.name, upkeep_damage
                ));
            }
        }
        if upkeep_damage > 0 {
            self.apply_damage_to_player(active, upkeep_damage, &mut fx);
        }
        if self.finished {
            self.push_snapshot(&mut fx);
            return fx;
        }

        let (role, is_npc, fallen, name) = {
            let Some(p) = self.players.iter().find(|p| p.id == active) else {
                return fx;
            };
            (p.role, p.is_npc, p.fallen, p.name.clone())
        };

        if fallen || cannot_act {
            if fallen {
                fx.narrate(format!("{name} lies fallen; the turn passes."));
            } else {
                fx.narrate(format!("{name} is stunned and cannot act."));
            }
            fx.schedule(self.config.pacing.npc_act, PacingEvent::AdvanceTurn);
            self.push_snapshot(&mut fx);
            return fx;
        }

        match role {
            Role::Dm => {
                let dm_fx = self.begin_dm_turn(rng);
                fx.merge(dm_fx);
            }
            Role::Explorer => {
                if is_npc {
                    fx.schedule(
                        self.config.pacing.npc_think,
                        PacingEvent::NpcTurn { actor: active },
                    );
                }
            }
        }
        self.push_snapshot(&mut fx);
        fx
    }

    fn begin_dm_turn(&mut self, rng: &mut impl Rng) -> Effects {
        let mut fx = Effects::new();
        self.turns_elapsed += 1;
        self.current_world_event = None;
        let pacing = self.config.pacing;
        let dm_is_npc = self
            .players
            .iter()
            .find(|p| p.role == Role::Dm)
            .map(|p| p.is_npc)
            .unwrap_or(true);

        // Every Nth keeper turn, the explorers earn an event roll.
        if self.config.event_roll_every > 0
            && self.turns_elapsed % self.config.event_roll_every == 0
        {
            let mut granted = false;
            for p in self
                .players
                .iter_mut()
                .filter(|p| p.role == Role::Explorer && !p.fallen && !p.is_npc)
            {
                p.pending_event_roll = true;
                granted = true;
            }
            if granted {
                fx.narrate("Fate stirs. The explorers sense an opportunity...");
            }
        }

        if self.turns_elapsed == 1 {
            // Opening turn: no world event, just the first monster.
            if dm_is_npc {
                let spawn = self.spawn_monster(rng);
                fx.merge(spawn);
                fx.schedule(pacing.dm_advance, PacingEvent::AdvanceTurn);
            }
            return fx;
        }

        if self.board.is_empty() {
            // The fight is over: a world event lands now, the next
            // monster and the next turn follow on the pacer.
            let event_fx = self.play_world_event(rng);
            fx.merge(event_fx);
            fx.schedule(pacing.dm_spawn, PacingEvent::SpawnMonster);
            fx.schedule(pacing.dm_spawn + pacing.dm_advance, PacingEvent::AdvanceTurn);
            return fx;
        }

        if dm_is_npc {
            fx.schedule(pacing.dm_advance, PacingEvent::AdvanceTurn);
        }
        fx
    }

    fn spawn_monster(&mut self, rng: &mut impl Rng) -> Effects {
        let mut fx = Effects::new();
        let Some(card) = self.monster_deck.draw() else {
            fx.narrate("The keeper reaches into the dark... and finds nothing left.");
            return fx;
        };
        let bonus_hp = self.stage as i32 - 1;
        let monster = MonsterInstance::from_card(card, bonus_hp);
        let catalog = Arc::clone(&self.catalog);
        let dm_name = self.dm_name();
        fx.narrate(npc::flavor(
            &catalog.dialogue.dm_spawn,
            &dm_name,
            monster.name(),
            rng,
        ));
        info!(
            monster = monster.name(),
            hp = monster.max_hp,
            stage = self.stage,
            "monster spawned"
        );
        self.board.push(monster);
        fx
    }

    fn play_world_event(&mut self, rng: &mut impl Rng) -> Effects {
        let mut fx = Effects::new();
        let card = match self.world_event_deck.draw() {
            Some(c) => c,
            None => {
                // The world never runs out of surprises.
                let catalog = Arc::clone(&self.catalog);
                self.world_event_deck = Deck::build(
                    &catalog.templates_of(CardKind::WorldEvent),
                    &mut self.instance_ids,
                    rng,
                );
                debug!(room = %self.room_code, "world event deck rebuilt");
                match self.world_event_deck.draw() {
                    Some(c) => c,
                    None => return fx,
                }
            }
        };
        let catalog = Arc::clone(&self.catalog);
        let dm_name = self.dm_name();
        fx.narrate(npc::flavor(
            &catalog.dialogue.dm_event,
            &dm_name,
            card.name(),
            rng,
        ));
        fx.narrate(format!(
            "World event: {} — {}",
            card.name(),
            card.template.description
        ));
        info!(event = card.name(), "world event played");
        if let Some(effect) = card.template.effect.clone() {
            let targets: Vec<PlayerId> = self
                .players
                .iter()
                .filter(|p| p.role == Role::Explorer && !p.fallen)
                .map(|p| p.id)
                .collect();
            for id in targets {
                self.apply_effect_to_player(id, &effect, rng, &mut fx);
            }
        }
        self.current_world_event = Some(card);
        fx
    }

    // ---- explorer actions -------------------------------------------

    fn player_action(
        &mut self,
        sender: PlayerId,
        action: PlayerActionKind,
        narrative: Option<String>,
        rng: &mut impl Rng,
    ) -> Effects {
        let mut fx = Effects::new();
        if !self.phase.is_active() {
            fx.error_to(sender, "the game has not started");
            return fx;
        }
        if self.active_id() != Some(sender) {
            fx.error_to(sender, "it is not your turn");
            return fx;
        }
        let (role, fallen, name) = {
            let Some(p) = self.players.iter().find(|p| p.id == sender) else {
                return fx;
            };
            (p.role, p.fallen, p.name.clone())
        };
        if role != Role::Explorer {
            fx.error_to(sender, "the keeper does not act as an explorer");
            return fx;
        }
        if fallen {
            fx.error_to(sender, "the fallen cannot act");
            return fx;
        }
        if let Some(text) = narrative.filter(|t| !t.trim().is_empty()) {
            fx.narrate(format!("{name}: {text}"));
        }

        match action {
            PlayerActionKind::Attack { target } => {
                self.do_attack(sender, target, rng, &mut fx)
            }
            PlayerActionKind::BriefRespite => self.do_respite(sender, 1, rng, &mut fx),
            PlayerActionKind::FullRest => self.do_respite(sender, 2, rng, &mut fx),
            PlayerActionKind::Guard => self.do_guard(sender, &mut fx),
        }
        fx
    }

    fn do_attack(
        &mut self,
        attacker: PlayerId,
        target: CardId,
        rng: &mut impl Rng,
        fx: &mut Effects,
    ) {
        let (weapon_dice, ap_cost, damage_bonus, roll_mod, name) = {
            let Some(p) = self.players.iter().find(|p| p.id == attacker) else {
                return;
            };
            let Some(weapon) = &p.weapon else {
                fx.error_to(attacker, "you have no weapon equipped");
                return;
            };
            let dice = weapon
                .template
                .effect
                .as_ref()
                .map(|e| e.dice.clone())
                .unwrap_or_default();
            (
                dice,
                weapon.template.ap_cost as i32,
                p.stats.damage_bonus,
                self.roll_modifier_of(p),
                p.name.clone(),
            )
        };

        let Some(midx) = self.board.iter().position(|m| m.instance_id == target)
        else {
            fx.error_to(attacker, "no such monster on the board");
            return;
        };

        {
            let Some(p) = self.players.iter_mut().find(|p| p.id == attacker) else {
                return;
            };
            if p.current_ap < ap_cost {
                fx.error_to(attacker, "not enough AP for that attack");
                return;
            }
            p.current_ap -= ap_cost;
        }

        let report = {
            let m = &self.board[midx];
            combat::resolve_attack(
                damage_bonus,
                roll_mod,
                &weapon_dice,
                m.required_roll(),
                m.current_hp,
                rng,
            )
        };
        let monster_name = {
            let m = &mut self.board[midx];
            m.current_hp -= report.total_damage;
            m.name().to_string()
        };
        fx.notify(
            Recipient::All,
            ServerNotice::AttackResolved {
                attacker,
                target,
                report,
            },
        );
        if report.hit {
            fx.narrate(format!(
                "{name} hits the {monster_name} for {} damage (rolled {}).",
                report.total_damage, report.attack_roll
            ));
        } else {
            fx.narrate(format!(
                "{name} swings at the {monster_name} and misses (rolled {}).",
                report.attack_roll
            ));
        }
        debug!(
            %attacker,
            %target,
            roll = report.attack_roll,
            hit = report.hit,
            damage = report.total_damage,
            "attack resolved"
        );

        if report.target_defeated {
            self.board.remove(midx);
            self.monsters_defeated += 1;
            fx.narrate(format!("The {monster_name} is defeated!"));
            let new_stage = 1 + self.monsters_defeated / self.config.kills_per_stage;
            if new_stage > self.stage {
                self.stage = new_stage;
                info!(stage = new_stage, "stage advanced");
                fx.narrate(format!(
                    "The gloom deepens. The hall grows more dangerous (stage {new_stage})."
                ));
            }
        }
        self.push_snapshot(fx);
    }

    fn do_respite(
        &mut self,
        sender: PlayerId,
        dice_spent: u8,
        rng: &mut impl Rng,
        fx: &mut Effects,
    ) {
        let catalog = Arc::clone(&self.catalog);
        let costs = catalog.action_costs;
        let ap_cost = if dice_spent == 1 {
            costs.brief_respite
        } else {
            costs.full_rest
        };
        {
            let Some(p) = self.players.iter_mut().find(|p| p.id == sender) else {
                return;
            };
            if p.current_ap < ap_cost {
                fx.error_to(sender, "not enough AP to rest");
                return;
            }
            p.current_ap -= ap_cost;
            if p.health_dice.current < dice_spent {
                // Nothing happened, so nothing is spent.
                p.current_ap += ap_cost;
                fx.notify(
                    Recipient::Player(sender),
                    ServerNotice::Narration {
                        text: format!(
                            "{} reaches for reserves that are no longer there.",
                            p.name
                        ),
                    },
                );
                return;
            }
            p.health_dice.current -= dice_spent;
            let die = p
                .class
                .and_then(|c| catalog.class(c))
                .map(|c| c.health_die.clone())
                .unwrap_or_else(|| "1d6".to_string());
            let mut rolled = 0;
            for _ in 0..dice_spent {
                rolled += roll_or_zero(&die, rng);
            }
            let healed = p.heal(rolled);
            fx.narrate(format!(
                "{} binds their wounds and recovers {} HP.",
                p.name, healed
            ));
        }
        self.push_snapshot(fx);
    }

    fn do_guard(&mut self, sender: PlayerId, fx: &mut Effects) {
        let guard_cost = self.catalog.action_costs.guard;
        {
            let Some(p) = self.players.iter_mut().find(|p| p.id == sender) else {
                return;
            };
            if p.current_ap < guard_cost {
                fx.error_to(sender, "not enough AP to guard");
                return;
            }
            p.current_ap -= guard_cost;
            p.apply_status(StatusKind::Guarded, 2);
            fx.narrate(format!("{} takes a defensive stance.", p.name));
        }
        self.push_snapshot(fx);
    }

    // ---- DM actions -------------------------------------------------

    fn dm_action(
        &mut self,
        sender: PlayerId,
        action: DmActionKind,
        rng: &mut impl Rng,
    ) -> Effects {
        let mut fx = Effects::new();
        if !self.phase.is_active() {
            fx.error_to(sender, "the game has not started");
            return fx;
        }
        if self.active_id() != Some(sender) {
            fx.error_to(sender, "it is not your turn");
            return fx;
        }
        let is_dm = self
            .players
            .iter()
            .find(|p| p.id == sender)
            .is_some_and(|p| p.role == Role::Dm);
        if !is_dm {
            fx.error_to(sender, "only the keeper commands the gloom");
            return fx;
        }
        match action {
            DmActionKind::PlayMonster => {
                let spawn = self.spawn_monster(rng);
                fx.merge(spawn);
                self.push_snapshot(&mut fx);
            }
        }
        fx
    }

    // ---- cards and events -------------------------------------------

    fn equip_item(&mut self, sender: PlayerId, card_id: CardId) -> Effects {
        let mut fx = Effects::new();
        if !self.phase.is_active() {
            fx.error_to(sender, "the game has not started");
            return fx;
        }
        if self.active_id() != Some(sender) {
            fx.error_to(sender, "equipment changes wait for your turn");
            return fx;
        }
        let catalog = Arc::clone(&self.catalog);
        {
            let Some(p) = self.players.iter_mut().find(|p| p.id == sender) else {
                return fx;
            };
            let Some(pos) = p.hand.iter().position(|c| c.id == card_id) else {
                fx.error_to(sender, "that card is not in your hand");
                return fx;
            };
            match p.hand[pos].kind() {
                CardKind::Weapon => {
                    let card = p.hand.remove(pos);
                    let line = format!("{} readies the {}.", p.name, card.name());
                    if let Some(old) = p.weapon.replace(card) {
                        p.hand.push(old);
                    }
                    fx.narrate(line);
                }
                CardKind::Armor => {
                    let card = p.hand.remove(pos);
                    let line = format!("{} straps on the {}.", p.name, card.name());
                    if let Some(old) = p.armor.replace(card) {
                        p.hand.push(old);
                    }
                    fx.narrate(line);
                }
                _ => {
                    fx.error_to(sender, "only weapons and armor can be equipped");
                    return fx;
                }
            }
            p.recompute_stats(&catalog);
        }
        self.push_snapshot(&mut fx);
        fx
    }

    fn roll_for_event(&mut self, sender: PlayerId, rng: &mut impl Rng) -> Effects {
        let mut fx = Effects::new();
        if !self.phase.is_active() {
            fx.error_to(sender, "the game has not started");
            return fx;
        }
        let (name, class, roll_mod) = {
            let Some(p) = self.players.iter().find(|p| p.id == sender) else {
                return fx;
            };
            if !p.pending_event_roll {
                fx.error_to(sender, "you have no event roll pending");
                return fx;
            }
            (p.name.clone(), p.class, self.roll_modifier_of(p))
        };
        if let Some(p) = self.players.iter_mut().find(|p| p.id == sender) {
            p.pending_event_roll = false;
        }

        let roll = d20(rng) + roll_mod;
        let outcome = classify_event_roll(roll);
        fx.notify(
            Recipient::All,
            ServerNotice::EventRollResult {
                player_id: sender,
                roll,
                outcome,
            },
        );
        info!(player = %sender, roll, ?outcome, "event roll");

        if outcome == EventOutcome::Nothing {
            fx.narrate(format!("{name} senses nothing out of the ordinary."));
            return fx;
        }

        let catalog = Arc::clone(&self.catalog);
        let pool: Vec<&CardTemplate> = match outcome {
            EventOutcome::Discovery => {
                let filtered = class
                    .map(|c| catalog.discovery_for_class(c))
                    .unwrap_or_default();
                if filtered.len() >= 3 {
                    filtered
                } else {
                    catalog.discovery_templates()
                }
            }
            EventOutcome::PlayerEvent => catalog.templates_of(CardKind::PlayerEvent),
            EventOutcome::Nothing => unreachable!(),
        };
        let cards: Vec<CardInstance> = pool
            .choose_multiple(rng, 3)
            .map(|t| CardInstance::stamp(t, &mut self.instance_ids))
            .collect();
        let views = cards.iter().map(card_view).collect();
        if let Some(p) = self.players.iter_mut().find(|p| p.id == sender) {
            p.pending_event_choice = Some(cards);
        }
        fx.notify(
            Recipient::Player(sender),
            ServerNotice::EventCardReveal { cards: views },
        );
        let verb = match outcome {
            EventOutcome::Discovery => "something glints in the dark",
            _ => "fate takes an interest",
        };
        fx.narrate(format!("{name} rolls {roll} — {verb}."));
        fx
    }

    fn select_event_card(
        &mut self,
        sender: PlayerId,
        card_id: CardId,
        rng: &mut impl Rng,
    ) -> Effects {
        let mut fx = Effects::new();
        let card = {
            let Some(p) = self.players.iter_mut().find(|p| p.id == sender) else {
                return fx;
            };
            let Some(mut cards) = p.pending_event_choice.take() else {
                fx.error_to(sender, "you have no event choice pending");
                return fx;
            };
            match cards.iter().position(|c| c.id == card_id) {
                Some(pos) => cards.swap_remove(pos),
                None => {
                    p.pending_event_choice = Some(cards);
                    fx.error_to(sender, "that card was not offered");
                    return fx;
                }
            }
        };

        let name = self
            .players
            .iter()
            .find(|p| p.id == sender)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        if card.kind() == CardKind::PlayerEvent {
            fx.narrate(format!(
                "{} — {}",
                card.name(),
                card.template.description
            ));
            if let Some(effect) = card.template.effect.clone() {
                self.apply_effect_to_player(sender, &effect, rng, &mut fx);
            }
        } else {
            fx.narrate(format!("{name} claims the {}.", card.name()));
            if let Some(p) = self.players.iter_mut().find(|p| p.id == sender) {
                p.hand.push(card);
            }
        }
        self.push_snapshot(&mut fx);
        fx
    }

    fn chat(&mut self, sender: PlayerId, text: String) -> Effects {
        let mut fx = Effects::new();
        let Some(p) = self.players.iter().find(|p| p.id == sender) else {
            return fx;
        };
        fx.notify(
            Recipient::All,
            ServerNotice::Chat {
                from: p.name.clone(),
                text,
            },
        );
        fx
    }

    // ---- NPC turns --------------------------------------------------

    fn npc_turn(&mut self, actor: PlayerId, rng: &mut impl Rng) -> Effects {
        let mut fx = Effects::new();
        // Stale pacing entries (the seat changed hands, the turn moved
        // on) are dropped silently.
        if self.finished || self.active_id() != Some(actor) {
            return fx;
        }
        let catalog = Arc::clone(&self.catalog);
        let (decision, name) = {
            let Some(p) = self.players.iter().find(|p| p.id == actor) else {
                return fx;
            };
            let party: Vec<&Player> = self
                .players
                .iter()
                .filter(|q| q.role == Role::Explorer && !q.fallen)
                .collect();
            (
                npc::choose_action(p, &party, &self.board, catalog.action_costs.guard),
                p.name.clone(),
            )
        };
        let pacing = self.config.pacing;

        match decision {
            NpcAction::Attack { target } => {
                let target_name = self
                    .board
                    .iter()
                    .find(|m| m.instance_id == target)
                    .map(|m| m.name().to_string())
                    .unwrap_or_default();
                fx.narrate(npc::flavor(
                    &catalog.dialogue.attack,
                    &name,
                    &target_name,
                    rng,
                ));
                fx.schedule(
                    pacing.npc_attack_flavor,
                    PacingEvent::NpcStrike {
                        attacker: actor,
                        target,
                    },
                );
            }
            NpcAction::Heal { card_id, ally } => {
                self.npc_heal(actor, card_id, ally, rng, &mut fx);
                fx.schedule(pacing.npc_act, PacingEvent::AdvanceTurn);
            }
            NpcAction::Guard => {
                let guard_cost = catalog.action_costs.guard;
                if let Some(p) = self.players.iter_mut().find(|p| p.id == actor) {
                    p.current_ap -= guard_cost;
                    p.apply_status(StatusKind::Guarded, 2);
                }
                fx.narrate(npc::flavor(&catalog.dialogue.guard, &name, "", rng));
                fx.schedule(pacing.npc_act, PacingEvent::AdvanceTurn);
            }
            NpcAction::Idle => {
                fx.narrate(npc::flavor(&catalog.dialogue.idle, &name, "", rng));
                fx.schedule(pacing.npc_act, PacingEvent::AdvanceTurn);
            }
        }
        self.push_snapshot(&mut fx);
        fx
    }

    fn npc_heal(
        &mut self,
        actor: PlayerId,
        card_id: CardId,
        ally: PlayerId,
        rng: &mut impl Rng,
        fx: &mut Effects,
    ) {
        let catalog = Arc::clone(&self.catalog);
        let (card, actor_name) = {
            let Some(p) = self.players.iter_mut().find(|p| p.id == actor) else {
                return;
            };
            let Some(pos) = p.hand.iter().position(|c| c.id == card_id) else {
                return;
            };
            p.current_ap -= p.hand[pos].template.ap_cost as i32;
            (p.hand.remove(pos), p.name.clone())
        };
        let roll = card
            .template
            .effect
            .as_ref()
            .map(|e| roll_or_zero(&e.dice, rng))
            .unwrap_or(0);
        let ally_name = {
            let Some(target) = self.players.iter_mut().find(|p| p.id == ally) else {
                return;
            };
            let healed = target.heal(roll);
            debug!(%actor, %ally, healed, "npc heal");
            let n = target.name.clone();
            fx.narrate(format!("{n} recovers {healed} HP."));
            n
        };
        fx.narrate(npc::flavor(
            &catalog.dialogue.heal,
            &actor_name,
            &ally_name,
            rng,
        ));
    }

    fn npc_strike(
        &mut self,
        attacker: PlayerId,
        target: CardId,
        rng: &mut impl Rng,
    ) -> Effects {
        let mut fx = Effects::new();
        if self.finished || self.active_id() != Some(attacker) {
            return fx;
        }
        if self.board.iter().any(|m| m.instance_id == target) {
            self.do_attack(attacker, target, rng, &mut fx);
        }
        fx.schedule(self.config.pacing.npc_act, PacingEvent::AdvanceTurn);
        fx
    }

    // ---- shared helpers ---------------------------------------------

    pub(crate) fn active_id(&self) -> Option<PlayerId> {
        if self.current_turn_index < 0 {
            return None;
        }
        self.turn_order.get(self.current_turn_index as usize).copied()
    }

    fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    fn roll_modifier_of(&self, p: &Player) -> i32 {
        p.statuses
            .iter()
            .filter_map(|s| self.catalog.status(s.kind))
            .map(|d| d.roll_modifier)
            .sum()
    }

    fn dm_name(&self) -> String {
        self.players
            .iter()
            .find(|p| p.role == Role::Dm)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| self.catalog.dm_name.clone())
    }

    fn fresh_npc_name(&self, catalog: &Catalog) -> String {
        for candidate in &catalog.npc_names {
            if !self.players.iter().any(|p| p.name == *candidate) {
                return candidate.clone();
            }
        }
        format!("Wanderer {}", self.players.len() + 1)
    }

    /// Event-sourced damage: Guarded soaks `2 + shield_bonus` of it.
    fn apply_effect_to_player(
        &mut self,
        id: PlayerId,
        effect: &Effect,
        rng: &mut impl Rng,
        fx: &mut Effects,
    ) {
        match effect.kind {
            EffectKind::Damage => {
                let rolled = roll_or_zero(&effect.dice, rng).max(0);
                let (name, amount) = {
                    let Some(p) = self.player(id) else { return };
                    let amount = if p.has_status(StatusKind::Guarded) {
                        (rolled - (2 + p.stats.shield_bonus)).max(0)
                    } else {
                        rolled
                    };
                    (p.name.clone(), amount)
                };
                if amount > 0 {
                    fx.narrate(format!("{name} takes {amount} damage."));
                } else {
                    fx.narrate(format!("{name} weathers it unharmed."));
                }
                self.apply_damage_to_player(id, amount, fx);
            }
            EffectKind::Heal => {
                let roll = roll_or_zero(&effect.dice, rng).max(0);
                if let Some(p) = self.players.iter_mut().find(|p| p.id == id) {
                    let healed = p.heal(roll);
                    fx.narrate(format!("{} recovers {} HP.", p.name, healed));
                }
            }
            EffectKind::Status => {
                if let Some(kind) = effect.status {
                    if let Some(p) = self.players.iter_mut().find(|p| p.id == id) {
                        p.apply_status(kind, effect.status_duration);
                        fx.narrate(format!("{} is now {}.", p.name, kind));
                    }
                }
            }
            EffectKind::Utility => {}
        }
    }

    /// Raw HP loss plus the defeat rule: at 0 HP a life is spent; with
    /// lives left the explorer gets back up at full HP, otherwise they
    /// fall for good.
    fn apply_damage_to_player(
        &mut self,
        id: PlayerId,
        amount: i32,
        fx: &mut Effects,
    ) {
        if amount <= 0 {
            return;
        }
        let fell = {
            let Some(p) = self.players.iter_mut().find(|p| p.id == id) else {
                return;
            };
            p.stats.current_hp -= amount;
            if p.stats.current_hp > 0 {
                false
            } else {
                p.lives = p.lives.saturating_sub(1);
                if p.lives > 0 {
                    p.stats.current_hp = p.stats.max_hp;
                    fx.narrate(format!(
                        "{} collapses... and staggers back up! ({} lives left)",
                        p.name, p.lives
                    ));
                    false
                } else {
                    p.stats.current_hp = 0;
                    p.fallen = true;
                    warn!(player = %id, "explorer has fallen");
                    fx.narrate(format!("{} has fallen and can no longer act.", p.name));
                    true
                }
            }
        };
        if fell {
            self.check_party_wipe(fx);
        }
    }

    fn check_party_wipe(&mut self, fx: &mut Effects) {
        let wiped = self
            .players
            .iter()
            .filter(|p| p.role == Role::Explorer)
            .all(|p| p.fallen);
        if wiped && !self.finished {
            self.finished = true;
            info!(room = %self.room_code, "party wiped, game over");
            fx.narrate("The last light gutters out. The gloom claims the hall.");
        }
    }

    pub(crate) fn push_snapshot(&self, fx: &mut Effects) {
        fx.notify(
            Recipient::All,
            ServerNotice::RoomSnapshot {
                snapshot: self.snapshot(),
            },
        );
    }
}
