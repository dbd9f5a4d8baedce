use dashmap::{mapref::entry::Entry, DashMap};
use serenity::model::id::GuildId;
use std::sync::Arc;

use super::queue::Queue;

/// Guild → session map.
///
/// Creation goes through the `DashMap` entry API so the live-session check
/// and the insert happen under the same shard lock. Everything else is
/// last-writer-wins.
pub struct QueueRegistry<D> {
    queues: DashMap<GuildId, Arc<Queue<D>>>,
}

impl<D> QueueRegistry<D> {
    pub fn new() -> Self {
        Self {
            queues: DashMap::new(),
        }
    }

    /// Returns the live queue for `guild_id`, or stores the one built by
    /// `make`. A destroyed queue counts as absent and is replaced.
    ///
    /// The flag is `true` when a new queue was stored.
    pub fn get_or_insert_with(
        &self,
        guild_id: GuildId,
        make: impl FnOnce() -> Queue<D>,
    ) -> (Arc<Queue<D>>, bool) {
        match self.queues.entry(guild_id) {
            Entry::Occupied(mut entry) => {
                if !entry.get().is_destroyed() {
                    return (Arc::clone(entry.get()), false);
                }
                let queue = Arc::new(make());
                entry.insert(Arc::clone(&queue));
                (queue, true)
            }
            Entry::Vacant(entry) => {
                let queue = Arc::new(make());
                entry.insert(Arc::clone(&queue));
                (queue, true)
            }
        }
    }

    /// Existence check; destroyed queues still count.
    pub fn has(&self, guild_id: GuildId) -> bool {
        self.queues.contains_key(&guild_id)
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Arc<Queue<D>>> {
        self.queues.get(&guild_id).map(|queue| Arc::clone(queue.value()))
    }

    /// Unconditional replace. The previous queue, if any, is returned as is:
    /// tearing it down is up to the caller.
    pub fn set(&self, guild_id: GuildId, queue: Arc<Queue<D>>) -> Option<Arc<Queue<D>>> {
        self.queues.insert(guild_id, queue)
    }

    /// Drops the mapping without touching the connection.
    pub fn remove(&self, guild_id: GuildId) -> Option<Arc<Queue<D>>> {
        self.queues.remove(&guild_id).map(|(_, queue)| queue)
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}

impl<D> Default for QueueRegistry<D> {
    fn default() -> Self {
        Self::new()
    }
}
