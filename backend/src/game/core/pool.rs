use super::item::ChallengeItem;
use rand::Rng;
use tracing::warn;

/// Result of drawing from the pool
#[derive(Debug, PartialEq)]
pub enum Draw {
    Item(ChallengeItem),
    Exhausted,
}

/// Challenge items for one session, drawn without replacement
#[derive(Debug, Default)]
pub struct ItemPool {
    items: Vec<ChallengeItem>,
    remaining: Vec<usize>,
}

impl ItemPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the pool contents. Every index starts out undrawn.
    pub fn load(&mut self, items: Vec<ChallengeItem>) {
        let before = items.len();
        self.items = items.into_iter().filter(|i| !i.steps.is_empty()).collect();
        if self.items.len() != before {
            warn!(
                dropped = before - self.items.len(),
                "Dropped challenge items without steps"
            );
        }
        self.remaining = (0..self.items.len()).collect();
    }

    pub fn draw(&mut self) -> Draw {
        self.draw_with(&mut rand::rng())
    }

    /// Pick uniformly among the undrawn items and swap-remove the chosen index
    pub fn draw_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Draw {
        if self.remaining.is_empty() {
            return Draw::Exhausted;
        }

        let position = rng.random_range(0..self.remaining.len());
        let index = self.remaining.swap_remove(position);
        Draw::Item(self.items[index].clone())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    pub fn drawn(&self) -> usize {
        self.items.len() - self.remaining.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.remaining.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::core::item::{Expected, Step};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn items(n: usize) -> Vec<ChallengeItem> {
        (0..n)
            .map(|i| {
                ChallengeItem::single(
                    format!("item-{i}"),
                    Step::new(format!("prompt {i}"), Expected::literal(format!("answer {i}"))),
                )
            })
            .collect()
    }

    #[test]
    fn draws_every_item_once_then_exhausts() {
        let mut pool = ItemPool::new();
        pool.load(items(20));

        let mut seen = HashSet::new();
        for _ in 0..20 {
            let Draw::Item(item) = pool.draw() else {
                panic!("pool exhausted early");
            };
            assert!(seen.insert(item.id), "item drawn twice");
        }

        assert_eq!(seen.len(), 20);
        assert!(pool.is_exhausted());
        assert_eq!(pool.draw(), Draw::Exhausted);
    }

    #[test]
    fn remaining_and_drawn_partition_the_pool() {
        let mut pool = ItemPool::new();
        pool.load(items(5));
        let mut rng = StdRng::seed_from_u64(7);

        for drawn in 1..=5 {
            assert!(matches!(pool.draw_with(&mut rng), Draw::Item(_)));
            assert_eq!(pool.drawn(), drawn);
            assert_eq!(pool.remaining() + pool.drawn(), pool.len());
        }
    }

    #[test]
    fn empty_pool_is_exhausted_immediately() {
        let mut pool = ItemPool::new();
        pool.load(Vec::new());

        assert!(pool.is_empty());
        assert_eq!(pool.draw(), Draw::Exhausted);
    }

    #[test]
    fn load_replaces_previous_contents() {
        let mut pool = ItemPool::new();
        pool.load(items(3));
        let _ = pool.draw();

        pool.load(items(4));
        assert_eq!(pool.len(), 4);
        assert_eq!(pool.remaining(), 4);
    }

    #[test]
    fn items_without_steps_are_dropped() {
        let mut pool = ItemPool::new();
        let mut loaded = items(2);
        loaded.push(ChallengeItem {
            id: "empty".to_string(),
            steps: Vec::new(),
        });

        pool.load(loaded);
        assert_eq!(pool.len(), 2);
    }
}
