//! Table: the shared board and its synchronized primitives.
//!
//! All state lives behind one mutex. Single operations are available directly
//! on [`Board`]; multi-step sequences that must be atomic with respect to
//! every player (resolving a valid claim, refilling, reshuffling) take the
//! lock once through [`Board::lock`] and run on the returned [`BoardGuard`].

use super::{BoardError, ClaimOutcome, Hint, ItemId, Placement, PlayerId, Slot, SlotRequest};
use crate::config::SET_SIZE;
use crate::rules::Solver;
use crate::sink::Sink;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::{Mutex, MutexGuard};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Mutable board contents.
#[derive(Debug)]
struct BoardState {
    slot_to_item: Vec<Option<ItemId>>,
    item_to_slot: Vec<Placement>,
    /// Bumped on every placement and removal; stamps slot requests.
    generations: Vec<u64>,
    empty_slots: BTreeSet<Slot>,
    draw_pile: Vec<ItemId>,
    claims: Vec<Vec<Slot>>,
}

/// The shared board.
pub struct Board {
    state: Mutex<BoardState>,
    /// Pending-validation queue; capacity is the number of players.
    pending: Sender<PlayerId>,
    start_order: Mutex<Vec<PlayerId>>,
    exit_order: Mutex<Vec<PlayerId>>,
    placement_delay: Duration,
    sink: Arc<dyn Sink>,
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("state", &self.state)
            .field("start_order", &self.start_order)
            .field("exit_order", &self.exit_order)
            .field("placement_delay", &self.placement_delay)
            .finish_non_exhaustive()
    }
}

impl Board {
    /// Create an empty board with every item in the draw pile.
    ///
    /// Returns the board and the receiving end of its pending-validation
    /// queue, which belongs to the dealer.
    pub fn new(
        slots: usize,
        items: usize,
        players: usize,
        placement_delay: Duration,
        sink: Arc<dyn Sink>,
    ) -> (Self, Receiver<PlayerId>) {
        let (pending, claims) = bounded(players.max(1));
        let state = BoardState {
            slot_to_item: vec![None; slots],
            item_to_slot: vec![Placement::InPile; items],
            generations: vec![0; slots],
            empty_slots: (0..slots).collect(),
            draw_pile: (0..items).collect(),
            claims: vec![Vec::with_capacity(SET_SIZE); players],
        };
        let board = Self {
            state: Mutex::new(state),
            pending,
            start_order: Mutex::new(Vec::with_capacity(players)),
            exit_order: Mutex::new(Vec::with_capacity(players)),
            placement_delay,
            sink,
        };
        (board, claims)
    }

    /// Take the board lock for a sequence of operations.
    pub fn lock(&self) -> BoardGuard<'_> {
        BoardGuard {
            board: self,
            state: self.state.lock(),
        }
    }

    /// Place `item` from the draw pile into the empty `slot`.
    ///
    /// Takes at least the configured placement delay.
    ///
    /// # Errors
    ///
    /// Fails if the slot is occupied or the item is not in the draw pile.
    pub fn place_item(&self, slot: Slot, item: ItemId) -> Result<(), BoardError> {
        self.lock().place_item(slot, item)
    }

    /// Vacate `slot`, retiring its item or returning it to the draw pile.
    ///
    /// # Errors
    ///
    /// Fails if the slot is empty.
    pub fn remove_item(&self, slot: Slot, retire: bool) -> Result<ItemId, BoardError> {
        self.lock().remove_item(slot, retire)
    }

    /// Toggle `player`'s claim token on `slot`. See [`BoardGuard::toggle_claim`].
    pub fn toggle_claim(&self, player: PlayerId, slot: Slot) -> ClaimOutcome {
        self.lock().toggle_claim(player, slot)
    }

    /// Drop every claim token held by `player`.
    pub fn clear_claims(&self, player: PlayerId) {
        self.lock().clear_claims(player);
    }

    /// Slots currently claimed by `player`, in claim order.
    pub fn claims(&self, player: PlayerId) -> Vec<Slot> {
        self.lock().claims(player).to_vec()
    }

    /// Number of occupied slots. A snapshot; stale as soon as it returns.
    pub fn count_placed(&self) -> usize {
        self.lock().count_placed()
    }

    /// A request for `slot` stamped with its current placement, or `None` if
    /// the slot is empty.
    pub fn request_for(&self, slot: Slot) -> Option<SlotRequest> {
        self.lock().request_for(slot)
    }

    /// Number of slots.
    pub fn table_size(&self) -> usize {
        self.lock().state.slot_to_item.len()
    }

    /// Record that `player` has come up.
    pub fn register_start(&self, player: PlayerId) {
        self.start_order.lock().push(player);
    }

    /// Players in the order they came up.
    pub fn start_order(&self) -> Vec<PlayerId> {
        self.start_order.lock().clone()
    }

    /// Record that `player`'s thread is exiting.
    pub fn register_exit(&self, player: PlayerId) {
        self.exit_order.lock().push(player);
    }

    /// Players in the order their threads exited.
    pub fn exit_order(&self) -> Vec<PlayerId> {
        self.exit_order.lock().clone()
    }

    fn simulate_latency(&self) {
        if !self.placement_delay.is_zero() {
            thread::sleep(self.placement_delay);
        }
    }
}

/// Exclusive access to the board for a sequence of operations.
///
/// No other mutation is interleaved while the guard is alive.
pub struct BoardGuard<'a> {
    board: &'a Board,
    state: MutexGuard<'a, BoardState>,
}

impl BoardGuard<'_> {
    /// Place `item` from the draw pile into the empty `slot`.
    ///
    /// # Errors
    ///
    /// Fails if either index is out of range, the slot is occupied, or the
    /// item is not in the draw pile.
    pub fn place_item(&mut self, slot: Slot, item: ItemId) -> Result<(), BoardError> {
        self.check_slot(slot)?;
        let placement = self.placement(item).ok_or(BoardError::ItemOutOfRange {
            item,
            items: self.state.item_to_slot.len(),
        })?;
        if let Some(current) = self.state.slot_to_item[slot] {
            return Err(BoardError::SlotOccupied { slot, item: current });
        }
        if placement != Placement::InPile {
            return Err(BoardError::ItemUnavailable { item, placement });
        }
        let index = self
            .state
            .draw_pile
            .iter()
            .position(|&pile_item| pile_item == item)
            .ok_or(BoardError::ItemUnavailable { item, placement })?;

        self.board.simulate_latency();

        let state = &mut *self.state;
        state.draw_pile.swap_remove(index);
        state.slot_to_item[slot] = Some(item);
        state.item_to_slot[item] = Placement::OnBoard(slot);
        state.empty_slots.remove(&slot);
        state.generations[slot] += 1;
        self.board.sink.item_placed(item, slot);
        Ok(())
    }

    /// Vacate `slot`.
    ///
    /// With `retire` the item leaves the game for good; otherwise it goes
    /// back to the draw pile. Every player's token on the slot is removed.
    ///
    /// # Errors
    ///
    /// Fails if the slot is out of range or already empty.
    pub fn remove_item(&mut self, slot: Slot, retire: bool) -> Result<ItemId, BoardError> {
        self.check_slot(slot)?;
        let item = self.state.slot_to_item[slot].ok_or(BoardError::SlotEmpty(slot))?;

        self.board.simulate_latency();

        for player in 0..self.state.claims.len() {
            self.remove_token(player, slot);
        }
        let state = &mut *self.state;
        state.slot_to_item[slot] = None;
        if retire {
            state.item_to_slot[item] = Placement::Retired;
        } else {
            state.item_to_slot[item] = Placement::InPile;
            state.draw_pile.push(item);
        }
        state.empty_slots.insert(slot);
        state.generations[slot] += 1;
        self.board.sink.item_removed(slot);
        Ok(item)
    }

    /// Toggle `player`'s claim token on `slot`.
    ///
    /// - empty slot, unknown player or a fourth token: [`ClaimOutcome::NoOp`]
    /// - token already there: removed, [`ClaimOutcome::ToggledOff`]
    /// - otherwise the token is added; the third token enqueues the player
    ///   for validation and yields [`ClaimOutcome::CompletedTriple`], after
    ///   which the caller must wait for the dealer's verdict.
    pub fn toggle_claim(&mut self, player: PlayerId, slot: Slot) -> ClaimOutcome {
        if player >= self.state.claims.len() {
            tracing::warn!(player, "claim from unknown player");
            return ClaimOutcome::NoOp;
        }
        if self.item_at(slot).is_none() {
            return ClaimOutcome::NoOp;
        }
        if self.state.claims[player].contains(&slot) {
            self.remove_token(player, slot);
            return ClaimOutcome::ToggledOff;
        }
        if self.state.claims[player].len() >= SET_SIZE {
            return ClaimOutcome::NoOp;
        }

        self.state.claims[player].push(slot);
        self.board.sink.token_placed(player, slot);
        if self.state.claims[player].len() < SET_SIZE {
            return ClaimOutcome::ToggledOn;
        }

        match self.board.pending.try_send(player) {
            Ok(()) => {
                tracing::debug!(player, claims = ?self.state.claims[player], "claim submitted");
                ClaimOutcome::CompletedTriple
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::warn!(player, "no dealer is taking claims");
                self.remove_token(player, slot);
                ClaimOutcome::NoOp
            }
            Err(TrySendError::Full(_)) => {
                // one slot per player; a player has at most one claim in flight
                panic!("validation queue rejected player {player}");
            }
        }
    }

    /// Toggle a stamped request. Resolves to [`ClaimOutcome::NoOp`] if the
    /// slot has been vacated or refilled since the request was made.
    pub fn toggle_request(&mut self, player: PlayerId, request: SlotRequest) -> ClaimOutcome {
        if self.request_for(request.slot) != Some(request) {
            return ClaimOutcome::NoOp;
        }
        self.toggle_claim(player, request.slot)
    }

    /// Drop every claim token held by `player`.
    pub fn clear_claims(&mut self, player: PlayerId) {
        let Some(slots) = self.state.claims.get_mut(player).map(std::mem::take) else {
            return;
        };
        for slot in slots {
            self.board.sink.token_removed(player, slot);
        }
    }

    /// Slots claimed by `player`, in claim order.
    pub fn claims(&self, player: PlayerId) -> &[Slot] {
        self.state.claims.get(player).map_or(&[], Vec::as_slice)
    }

    /// The item in `slot`, if any.
    pub fn item_at(&self, slot: Slot) -> Option<ItemId> {
        self.state.slot_to_item.get(slot).copied().flatten()
    }

    /// Where `item` currently is, or `None` for an unknown item.
    pub fn placement(&self, item: ItemId) -> Option<Placement> {
        self.state.item_to_slot.get(item).copied()
    }

    /// A request for `slot` stamped with its current placement.
    pub fn request_for(&self, slot: Slot) -> Option<SlotRequest> {
        self.item_at(slot)?;
        Some(SlotRequest {
            slot,
            generation: self.state.generations[slot],
        })
    }

    /// Empty slots in ascending order.
    pub fn empty_slots(&self) -> Vec<Slot> {
        self.state.empty_slots.iter().copied().collect()
    }

    /// Occupied slots in ascending order.
    pub fn occupied_slots(&self) -> Vec<Slot> {
        (0..self.state.slot_to_item.len())
            .filter(|&slot| self.state.slot_to_item[slot].is_some())
            .collect()
    }

    /// Items still waiting to be dealt.
    pub fn draw_pile(&self) -> &[ItemId] {
        &self.state.draw_pile
    }

    /// Items currently on the board, in slot order.
    pub fn placed_items(&self) -> Vec<ItemId> {
        self.state.slot_to_item.iter().flatten().copied().collect()
    }

    /// Items still in play: the board plus the draw pile.
    pub fn items_in_play(&self) -> Vec<ItemId> {
        let mut items = self.placed_items();
        items.extend_from_slice(&self.state.draw_pile);
        items
    }

    /// Number of occupied slots.
    pub fn count_placed(&self) -> usize {
        self.state.slot_to_item.iter().filter(|item| item.is_some()).count()
    }

    /// Every set currently on the board.
    pub fn hints(&self, solver: &dyn Solver) -> Vec<Hint> {
        solver
            .find_sets(&self.placed_items(), usize::MAX)
            .into_iter()
            .filter_map(|set| {
                let mut pairs = [(0, 0); SET_SIZE];
                for (pair, &item) in pairs.iter_mut().zip(&set) {
                    match self.placement(item)? {
                        Placement::OnBoard(slot) => *pair = (slot, item),
                        Placement::InPile | Placement::Retired => return None,
                    }
                }
                pairs.sort_unstable();
                Some(Hint {
                    slots: pairs.map(|(slot, _)| slot),
                    items: pairs.map(|(_, item)| item),
                })
            })
            .collect()
    }

    /// Check the structural invariants: the slot/item bijection, the
    /// empty-slot set, the draw pile and the claim lists.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Corrupt`] describing the first violation.
    pub fn verify(&self) -> Result<(), BoardError> {
        let state = &*self.state;
        for (slot, item) in state.slot_to_item.iter().enumerate() {
            match item {
                Some(item) if state.item_to_slot.get(*item) != Some(&Placement::OnBoard(slot)) => {
                    return Err(BoardError::Corrupt(format!(
                        "slot {slot} holds item {item} mapped to {:?}",
                        state.item_to_slot.get(*item)
                    )));
                }
                Some(_) if state.empty_slots.contains(&slot) => {
                    return Err(BoardError::Corrupt(format!("occupied slot {slot} listed as empty")));
                }
                None if !state.empty_slots.contains(&slot) => {
                    return Err(BoardError::Corrupt(format!("empty slot {slot} not listed as empty")));
                }
                _ => {}
            }
        }
        for (item, placement) in state.item_to_slot.iter().enumerate() {
            let in_pile = state.draw_pile.contains(&item);
            let consistent = match placement {
                Placement::OnBoard(slot) => {
                    state.slot_to_item.get(*slot) == Some(&Some(item)) && !in_pile
                }
                Placement::InPile => in_pile,
                Placement::Retired => !in_pile,
            };
            if !consistent {
                return Err(BoardError::Corrupt(format!(
                    "item {item} mapped to {placement:?}, in pile: {in_pile}"
                )));
            }
        }
        for (player, slots) in state.claims.iter().enumerate() {
            let distinct: BTreeSet<&Slot> = slots.iter().collect();
            if slots.len() > SET_SIZE || distinct.len() != slots.len() {
                return Err(BoardError::Corrupt(format!("player {player} claims {slots:?}")));
            }
            if let Some(slot) = slots.iter().find(|&&slot| state.slot_to_item[slot].is_none()) {
                return Err(BoardError::Corrupt(format!(
                    "player {player} claims empty slot {slot}"
                )));
            }
        }
        Ok(())
    }

    fn remove_token(&mut self, player: PlayerId, slot: Slot) -> bool {
        let claims = &mut self.state.claims[player];
        let Some(index) = claims.iter().position(|&claimed| claimed == slot) else {
            return false;
        };
        claims.remove(index);
        self.board.sink.token_removed(player, slot);
        true
    }

    fn check_slot(&self, slot: Slot) -> Result<(), BoardError> {
        let slots = self.state.slot_to_item.len();
        if slot < slots {
            Ok(())
        } else {
            Err(BoardError::SlotOutOfRange { slot, slots })
        }
    }
}
