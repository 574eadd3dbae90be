//! Dual queue: in-flight queue and pending buffer.
//!
//! # Responsibilities
//! - Hold every command a node connection owns, with an explicit placement
//!   (pending or in-flight) per command
//! - Preserve submission order (pending) and dispatch order (in-flight)
//! - Hand both containers out in one step when the connection closes
//!
//! # Design Decisions
//! - Arena keyed by command id; the two order lists only hold ids, so a
//!   command can never sit in both containers at once
//! - Not synchronized; the owning handler wraps it in a mutex

use std::collections::{HashMap, VecDeque};

use crate::command::{Command, CommandId};
use crate::error::{QueueError, QueueErrorKind};

/// Where a command currently sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Accepted, not yet written to the transport.
    Pending,
    /// Written, awaiting a response.
    InFlight,
}

#[derive(Debug)]
struct Slot {
    command: Command,
    placement: Placement,
}

/// Contents of both containers taken out during close, in order.
#[derive(Debug, Default)]
pub struct Drained {
    pub in_flight: Vec<Command>,
    pub pending: Vec<Command>,
}

/// Arena-backed in-flight queue and pending buffer.
#[derive(Debug)]
pub struct CommandQueues {
    slots: HashMap<CommandId, Slot>,
    pending: VecDeque<CommandId>,
    in_flight: VecDeque<CommandId>,
    /// Upper bound on in-flight + pending. `None` is unbounded.
    limit: Option<usize>,
}

impl CommandQueues {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            slots: HashMap::new(),
            pending: VecDeque::new(),
            in_flight: VecDeque::new(),
            limit,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// True iff both containers are empty.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn placement(&self, id: CommandId) -> Option<Placement> {
        self.slots.get(&id).map(|slot| slot.placement)
    }

    /// Append to the pending buffer.
    pub fn push_pending(&mut self, command: Command) -> Result<(), QueueError> {
        if command.is_done() {
            return Err(QueueError::new(QueueErrorKind::AlreadyCompleted, command));
        }
        if self.slots.contains_key(&command.id()) {
            return Err(QueueError::new(QueueErrorKind::AlreadyQueued, command));
        }
        if let Some(limit) = self.limit {
            if self.slots.len() >= limit {
                return Err(QueueError::new(QueueErrorKind::QueueFull(limit), command));
            }
        }

        let id = command.id();
        self.slots.insert(
            id,
            Slot {
                command,
                placement: Placement::Pending,
            },
        );
        self.pending.push_back(id);
        Ok(())
    }

    /// Move a pending command to the back of the in-flight queue.
    pub fn promote(&mut self, id: CommandId) -> Result<Command, QueueErrorKind> {
        let slot = self.slots.get_mut(&id).ok_or(QueueErrorKind::NotQueued)?;
        if slot.placement != Placement::Pending {
            return Err(QueueErrorKind::NotQueued);
        }
        remove_id(&mut self.pending, id);
        slot.placement = Placement::InFlight;
        self.in_flight.push_back(id);
        Ok(slot.command.clone())
    }

    /// Undo a promotion whose transport write failed. The command goes back
    /// to the front of the pending buffer so submission order is kept.
    pub fn demote(&mut self, id: CommandId) -> Result<(), QueueErrorKind> {
        let slot = self.slots.get_mut(&id).ok_or(QueueErrorKind::NotQueued)?;
        if slot.placement != Placement::InFlight {
            return Err(QueueErrorKind::NotQueued);
        }
        remove_id(&mut self.in_flight, id);
        slot.placement = Placement::Pending;
        self.pending.push_front(id);
        Ok(())
    }

    /// Oldest command still in the pending buffer.
    pub fn front_pending(&self) -> Option<CommandId> {
        self.pending.front().copied()
    }

    /// Oldest command awaiting a response.
    pub fn front_in_flight(&self) -> Option<CommandId> {
        self.in_flight.front().copied()
    }

    /// Remove an in-flight command, returning it for completion.
    pub fn take_in_flight(&mut self, id: CommandId) -> Result<Command, QueueErrorKind> {
        match self.slots.get(&id) {
            Some(slot) if slot.placement == Placement::InFlight => {}
            _ => return Err(QueueErrorKind::NotQueued),
        }
        remove_id(&mut self.in_flight, id);
        self.slots
            .remove(&id)
            .map(|slot| slot.command)
            .ok_or(QueueErrorKind::NotQueued)
    }

    /// Empty both containers, returning their contents in order.
    pub fn drain(&mut self) -> Drained {
        let mut slots = std::mem::take(&mut self.slots);
        let mut take = |order: &mut VecDeque<CommandId>| -> Vec<Command> {
            order
                .drain(..)
                .filter_map(|id| slots.remove(&id).map(|slot| slot.command))
                .collect()
        };
        let in_flight = take(&mut self.in_flight);
        let pending = take(&mut self.pending);
        debug_assert!(slots.is_empty(), "arena slot without order entry");
        Drained { in_flight, pending }
    }
}

fn remove_id(order: &mut VecDeque<CommandId>, id: CommandId) {
    if order.front() == Some(&id) {
        order.pop_front();
    } else if let Some(pos) = order.iter().position(|x| *x == id) {
        order.remove(pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandDescriptor;
    use crate::error::CommandError;

    fn cmd(name: &str) -> Command {
        Command::new(CommandDescriptor::new(name)).0
    }

    #[test]
    fn test_push_promote_complete() {
        let mut q = CommandQueues::new(None);
        let a = cmd("A");
        let b = cmd("B");
        q.push_pending(a.clone()).unwrap();
        q.push_pending(b.clone()).unwrap();
        assert_eq!(q.pending_len(), 2);
        assert_eq!(q.front_pending(), Some(a.id()));

        q.promote(a.id()).unwrap();
        assert_eq!(q.placement(a.id()), Some(Placement::InFlight));
        assert_eq!(q.placement(b.id()), Some(Placement::Pending));
        assert_eq!(q.in_flight_len(), 1);
        assert_eq!(q.pending_len(), 1);

        let taken = q.take_in_flight(a.id()).unwrap();
        assert_eq!(taken.id(), a.id());
        assert_eq!(q.placement(a.id()), None);
        assert!(!q.is_empty());
    }

    #[test]
    fn test_promote_requires_pending() {
        let mut q = CommandQueues::new(None);
        let a = cmd("A");
        assert_eq!(q.promote(a.id()).unwrap_err(), QueueErrorKind::NotQueued);

        q.push_pending(a.clone()).unwrap();
        q.promote(a.id()).unwrap();
        assert_eq!(q.promote(a.id()).unwrap_err(), QueueErrorKind::NotQueued);
    }

    #[test]
    fn test_take_requires_in_flight() {
        let mut q = CommandQueues::new(None);
        let a = cmd("A");
        q.push_pending(a.clone()).unwrap();
        assert_eq!(q.take_in_flight(a.id()).unwrap_err(), QueueErrorKind::NotQueued);
        assert_eq!(q.pending_len(), 1);
    }

    #[test]
    fn test_rejects_duplicate_and_completed() {
        let mut q = CommandQueues::new(None);
        let a = cmd("A");
        q.push_pending(a.clone()).unwrap();
        let err = q.push_pending(a.clone()).unwrap_err();
        assert_eq!(err.kind, QueueErrorKind::AlreadyQueued);

        let done = cmd("B");
        done.fail(CommandError::ConnectionClosed);
        let err = q.push_pending(done).unwrap_err();
        assert_eq!(err.kind, QueueErrorKind::AlreadyCompleted);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_limit_counts_both_containers() {
        let mut q = CommandQueues::new(Some(2));
        let a = cmd("A");
        q.push_pending(a.clone()).unwrap();
        q.promote(a.id()).unwrap();
        q.push_pending(cmd("B")).unwrap();

        let err = q.push_pending(cmd("C")).unwrap_err();
        assert_eq!(err.kind, QueueErrorKind::QueueFull(2));
        assert_eq!(err.into_command().descriptor().name, "C");
    }

    #[test]
    fn test_demote_restores_front() {
        let mut q = CommandQueues::new(None);
        let a = cmd("A");
        let b = cmd("B");
        q.push_pending(a.clone()).unwrap();
        q.push_pending(b.clone()).unwrap();
        q.promote(a.id()).unwrap();
        q.demote(a.id()).unwrap();
        assert_eq!(q.front_pending(), Some(a.id()));
        assert_eq!(q.in_flight_len(), 0);
    }

    #[test]
    fn test_drain_keeps_order_and_empties() {
        let mut q = CommandQueues::new(None);
        let cmds: Vec<_> = ["A", "B", "C", "D"].into_iter().map(cmd).collect();
        for c in &cmds {
            q.push_pending(c.clone()).unwrap();
        }
        q.promote(cmds[0].id()).unwrap();
        q.promote(cmds[1].id()).unwrap();

        let drained = q.drain();
        let names = |v: &[Command]| v.iter().map(|c| c.descriptor().name.clone()).collect::<Vec<_>>();
        assert_eq!(names(&drained.in_flight), ["A", "B"]);
        assert_eq!(names(&drained.pending), ["C", "D"]);
        assert!(q.is_empty());
        assert_eq!(q.pending_len() + q.in_flight_len(), 0);
    }
}
