// ============================================================================
// Stock Ledger
// Authoritative per-product stock levels with a reservation phase
// ============================================================================

use crate::domain::{LedgerError, ProductId};
use crate::numeric::Quantity;
use crossbeam_skiplist::SkipMap;
use parking_lot::{Mutex, MutexGuard};
use std::collections::BTreeMap;
use std::sync::Arc;

// ============================================================================
// Per-Product Entry
// ============================================================================

/// Stock counters for one product.
///
/// Invariant: `reserved <= on_hand`, so `available` never underflows and a
/// commit of previously reserved units never drives `on_hand` negative.
#[derive(Debug, Clone, Copy)]
struct StockLevels {
    on_hand: u32,
    reserved: u32,
}

impl StockLevels {
    fn available(&self) -> u32 {
        self.on_hand - self.reserved
    }
}

#[derive(Debug)]
struct StockEntry {
    levels: Mutex<StockLevels>,
}

impl StockEntry {
    fn new(on_hand: u32) -> Self {
        Self {
            levels: Mutex::new(StockLevels {
                on_hand,
                reserved: 0,
            }),
        }
    }
}

// ============================================================================
// Stock Ledger
// ============================================================================

/// The single source of truth for "how many units of product P are free to
/// sell right now".
///
/// Checkouts earmark stock with `reserve`, give it back with `release`, and
/// turn it into a durable decrement with `commit`. Only `commit`, `restock`
/// and `set_stock` change the on-hand count.
///
/// Each product has its own lock, so ledger traffic for different products
/// never contends; the skip map holding the entries is itself lock-free.
pub struct StockLedger {
    entries: SkipMap<ProductId, Arc<StockEntry>>,
}

impl StockLedger {
    pub fn new() -> Self {
        Self {
            entries: SkipMap::new(),
        }
    }

    /// Start managing a product with its current on-hand count.
    ///
    /// Tracking an already-tracked product leaves its counters untouched.
    pub fn track(&self, product_id: ProductId, on_hand: u32) {
        self.entries
            .get_or_insert(product_id, Arc::new(StockEntry::new(on_hand)));
    }

    pub fn is_tracked(&self, product_id: ProductId) -> bool {
        self.entries.contains_key(&product_id)
    }

    fn entry(&self, product_id: ProductId) -> Result<Arc<StockEntry>, LedgerError> {
        self.entries
            .get(&product_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(LedgerError::ProductNotFound(product_id))
    }

    // ========================================================================
    // Reservation Flow
    // ========================================================================

    /// Earmark units for an in-flight order.
    ///
    /// # Errors
    /// Fails with `InsufficientStock` if fewer than `quantity` units are
    /// free to sell; the counters are untouched on failure.
    pub fn reserve(&self, product_id: ProductId, quantity: Quantity) -> Result<(), LedgerError> {
        let entry = self.entry(product_id)?;
        let mut levels = entry.levels.lock();
        let requested = quantity.get();
        let available = levels.available();
        if available < requested {
            return Err(LedgerError::InsufficientStock {
                available,
                requested,
            });
        }
        levels.reserved += requested;
        tracing::trace!(%product_id, requested, available = levels.available(), "reserved stock");
        Ok(())
    }

    /// Give back previously earmarked units.
    ///
    /// # Errors
    /// Fails with `OverRelease` when releasing more than is currently
    /// reserved for the product.
    pub fn release(&self, product_id: ProductId, quantity: Quantity) -> Result<(), LedgerError> {
        let entry = self.entry(product_id)?;
        let mut levels = entry.levels.lock();
        let requested = quantity.get();
        if levels.reserved < requested {
            return Err(LedgerError::OverRelease {
                reserved: levels.reserved,
                requested,
            });
        }
        levels.reserved -= requested;
        tracing::trace!(%product_id, requested, available = levels.available(), "released stock");
        Ok(())
    }

    /// Convert a reservation into a durable stock decrement.
    ///
    /// Returns the new on-hand count so the caller can write it back to the
    /// product entity.
    ///
    /// # Errors
    /// Fails with `ReservationNotFound` when committing more than is
    /// currently reserved for the product.
    pub fn commit(&self, product_id: ProductId, quantity: Quantity) -> Result<u32, LedgerError> {
        let entry = self.entry(product_id)?;
        let mut levels = entry.levels.lock();
        let requested = quantity.get();
        if levels.reserved < requested {
            return Err(LedgerError::ReservationNotFound {
                reserved: levels.reserved,
                requested,
            });
        }
        levels.reserved -= requested;
        levels.on_hand -= requested;
        tracing::debug!(%product_id, requested, on_hand = levels.on_hand, "committed stock");
        Ok(levels.on_hand)
    }

    // ========================================================================
    // Multi-Product Flow
    // ========================================================================

    /// Commit reservations for a whole order in one step.
    ///
    /// Quantities are grouped per product; entry locks are taken in sorted
    /// product-id order and every line is validated before anything is
    /// applied, so the commit is all-or-nothing and deadlock-free. Returns
    /// the new on-hand count per product.
    pub fn commit_all(
        &self,
        lines: &[(ProductId, u32)],
    ) -> Result<Vec<(ProductId, u32)>, LedgerError> {
        let entries = self.sorted_entries(lines)?;
        let mut guards: Vec<MutexGuard<'_, StockLevels>> = entries
            .iter()
            .map(|(_, _, entry)| entry.levels.lock())
            .collect();

        for ((_, requested, _), guard) in entries.iter().zip(guards.iter()) {
            if guard.reserved < *requested {
                return Err(LedgerError::ReservationNotFound {
                    reserved: guard.reserved,
                    requested: *requested,
                });
            }
        }

        let mut committed = Vec::with_capacity(entries.len());
        for ((product_id, requested, _), guard) in entries.iter().zip(guards.iter_mut()) {
            guard.reserved -= requested;
            guard.on_hand -= requested;
            committed.push((*product_id, guard.on_hand));
        }
        tracing::debug!(products = committed.len(), "committed order reservations");
        Ok(committed)
    }

    /// Release reservations for a whole order in one step, with the same
    /// validate-then-apply discipline as [`commit_all`](Self::commit_all).
    pub fn release_all(&self, lines: &[(ProductId, u32)]) -> Result<(), LedgerError> {
        let entries = self.sorted_entries(lines)?;
        let mut guards: Vec<MutexGuard<'_, StockLevels>> = entries
            .iter()
            .map(|(_, _, entry)| entry.levels.lock())
            .collect();

        for ((_, requested, _), guard) in entries.iter().zip(guards.iter()) {
            if guard.reserved < *requested {
                return Err(LedgerError::OverRelease {
                    reserved: guard.reserved,
                    requested: *requested,
                });
            }
        }

        for ((_, requested, _), guard) in entries.iter().zip(guards.iter_mut()) {
            guard.reserved -= requested;
        }
        tracing::debug!(products = entries.len(), "released order reservations");
        Ok(())
    }

    /// Group line quantities per product, sorted by product id. Callers lock
    /// the returned entries in order, which gives a consistent global lock
    /// order across concurrent multi-product transitions.
    fn sorted_entries(
        &self,
        lines: &[(ProductId, u32)],
    ) -> Result<Vec<(ProductId, u32, Arc<StockEntry>)>, LedgerError> {
        let mut totals: BTreeMap<ProductId, u32> = BTreeMap::new();
        for (product_id, quantity) in lines {
            let slot = totals.entry(*product_id).or_insert(0);
            *slot = slot
                .checked_add(*quantity)
                .ok_or(LedgerError::StockOverflow(*product_id))?;
        }

        totals
            .into_iter()
            .map(|(product_id, quantity)| Ok((product_id, quantity, self.entry(product_id)?)))
            .collect()
    }

    // ========================================================================
    // Stock Administration
    // ========================================================================

    /// Add units to the on-hand count (returns/restocking).
    pub fn restock(&self, product_id: ProductId, additional: u32) -> Result<u32, LedgerError> {
        let entry = self.entry(product_id)?;
        let mut levels = entry.levels.lock();
        levels.on_hand = levels
            .on_hand
            .checked_add(additional)
            .ok_or(LedgerError::StockOverflow(product_id))?;
        tracing::debug!(%product_id, additional, on_hand = levels.on_hand, "restocked");
        Ok(levels.on_hand)
    }

    /// Overwrite the on-hand count (inventory correction).
    ///
    /// # Errors
    /// Fails with `StockUnderflow` if the new count is below what is
    /// currently reserved, which would let reservations oversell.
    pub fn set_stock(&self, product_id: ProductId, on_hand: u32) -> Result<u32, LedgerError> {
        let entry = self.entry(product_id)?;
        let mut levels = entry.levels.lock();
        if on_hand < levels.reserved {
            return Err(LedgerError::StockUnderflow {
                product_id,
                reserved: levels.reserved,
            });
        }
        levels.on_hand = on_hand;
        Ok(levels.on_hand)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Units free to sell right now: on-hand minus reserved.
    pub fn available(&self, product_id: ProductId) -> Result<u32, LedgerError> {
        Ok(self.entry(product_id)?.levels.lock().available())
    }

    /// Durable on-hand count (includes reserved units).
    pub fn on_hand(&self, product_id: ProductId) -> Result<u32, LedgerError> {
        Ok(self.entry(product_id)?.levels.lock().on_hand)
    }

    /// Units currently earmarked by in-flight orders.
    pub fn reserved(&self, product_id: ProductId) -> Result<u32, LedgerError> {
        Ok(self.entry(product_id)?.levels.lock().reserved)
    }
}

impl Default for StockLedger {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    fn qty(units: u32) -> Quantity {
        Quantity::new(units).unwrap()
    }

    fn tracked(on_hand: u32) -> (StockLedger, ProductId) {
        let ledger = StockLedger::new();
        let product_id = ProductId::new();
        ledger.track(product_id, on_hand);
        (ledger, product_id)
    }

    #[test]
    fn test_reserve_release_cycle() {
        let (ledger, product) = tracked(10);
        assert_eq!(ledger.available(product).unwrap(), 10);

        ledger.reserve(product, qty(4)).unwrap();
        assert_eq!(ledger.available(product).unwrap(), 6);
        assert_eq!(ledger.on_hand(product).unwrap(), 10);
        assert_eq!(ledger.reserved(product).unwrap(), 4);

        ledger.release(product, qty(4)).unwrap();
        assert_eq!(ledger.available(product).unwrap(), 10);
        assert_eq!(ledger.reserved(product).unwrap(), 0);
    }

    #[test]
    fn test_reserve_insufficient_stock() {
        let (ledger, product) = tracked(3);
        ledger.reserve(product, qty(2)).unwrap();

        let err = ledger.reserve(product, qty(2)).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientStock {
                available: 1,
                requested: 2,
            }
        );
        // Failure changed nothing
        assert_eq!(ledger.available(product).unwrap(), 1);
    }

    #[test]
    fn test_over_release() {
        let (ledger, product) = tracked(5);
        ledger.reserve(product, qty(2)).unwrap();

        let err = ledger.release(product, qty(3)).unwrap_err();
        assert_eq!(
            err,
            LedgerError::OverRelease {
                reserved: 2,
                requested: 3,
            }
        );
        assert_eq!(ledger.reserved(product).unwrap(), 2);
    }

    #[test]
    fn test_commit_decrements_on_hand() {
        let (ledger, product) = tracked(10);
        ledger.reserve(product, qty(4)).unwrap();

        let on_hand = ledger.commit(product, qty(4)).unwrap();
        assert_eq!(on_hand, 6);
        assert_eq!(ledger.on_hand(product).unwrap(), 6);
        assert_eq!(ledger.reserved(product).unwrap(), 0);
        assert_eq!(ledger.available(product).unwrap(), 6);
    }

    #[test]
    fn test_commit_without_reservation() {
        let (ledger, product) = tracked(10);
        ledger.reserve(product, qty(1)).unwrap();

        let err = ledger.commit(product, qty(2)).unwrap_err();
        assert_eq!(
            err,
            LedgerError::ReservationNotFound {
                reserved: 1,
                requested: 2,
            }
        );
        assert_eq!(ledger.on_hand(product).unwrap(), 10);
    }

    #[test]
    fn test_untracked_product() {
        let ledger = StockLedger::new();
        let ghost = ProductId::new();
        assert_eq!(
            ledger.reserve(ghost, qty(1)).unwrap_err(),
            LedgerError::ProductNotFound(ghost)
        );
        assert!(!ledger.is_tracked(ghost));
    }

    #[test]
    fn test_track_is_idempotent() {
        let (ledger, product) = tracked(10);
        ledger.reserve(product, qty(3)).unwrap();

        // Re-tracking must not reset live counters
        ledger.track(product, 99);
        assert_eq!(ledger.on_hand(product).unwrap(), 10);
        assert_eq!(ledger.reserved(product).unwrap(), 3);
    }

    #[test]
    fn test_commit_all_across_products() {
        let ledger = StockLedger::new();
        let a = ProductId::new();
        let b = ProductId::new();
        ledger.track(a, 10);
        ledger.track(b, 5);
        ledger.reserve(a, qty(3)).unwrap();
        ledger.reserve(b, qty(5)).unwrap();

        let committed = ledger.commit_all(&[(a, 3), (b, 5)]).unwrap();
        let mut on_hand: Vec<u32> = committed.iter().map(|(_, n)| *n).collect();
        on_hand.sort_unstable();
        assert_eq!(on_hand, vec![0, 7]);
        assert_eq!(ledger.reserved(a).unwrap(), 0);
        assert_eq!(ledger.reserved(b).unwrap(), 0);
    }

    #[test]
    fn test_commit_all_groups_repeated_products() {
        let (ledger, product) = tracked(10);
        ledger.reserve(product, qty(3)).unwrap();
        ledger.reserve(product, qty(4)).unwrap();

        // Two lines for the same product commit as one grouped quantity
        let committed = ledger.commit_all(&[(product, 3), (product, 4)]).unwrap();
        assert_eq!(committed, vec![(product, 3)]);
        assert_eq!(ledger.on_hand(product).unwrap(), 3);
    }

    #[test]
    fn test_commit_all_is_all_or_nothing() {
        let ledger = StockLedger::new();
        let a = ProductId::new();
        let b = ProductId::new();
        ledger.track(a, 10);
        ledger.track(b, 10);
        ledger.reserve(a, qty(2)).unwrap();
        // No reservation for b

        let err = ledger.commit_all(&[(a, 2), (b, 1)]).unwrap_err();
        assert!(matches!(err, LedgerError::ReservationNotFound { .. }));
        // a's reservation survived intact
        assert_eq!(ledger.reserved(a).unwrap(), 2);
        assert_eq!(ledger.on_hand(a).unwrap(), 10);
    }

    #[test]
    fn test_release_all() {
        let ledger = StockLedger::new();
        let a = ProductId::new();
        let b = ProductId::new();
        ledger.track(a, 10);
        ledger.track(b, 10);
        ledger.reserve(a, qty(3)).unwrap();
        ledger.reserve(b, qty(5)).unwrap();

        ledger.release_all(&[(a, 3), (b, 5)]).unwrap();
        assert_eq!(ledger.available(a).unwrap(), 10);
        assert_eq!(ledger.available(b).unwrap(), 10);
    }

    #[test]
    fn test_restock_and_set_stock() {
        let (ledger, product) = tracked(2);
        assert_eq!(ledger.restock(product, 8).unwrap(), 10);

        ledger.reserve(product, qty(6)).unwrap();
        let err = ledger.set_stock(product, 5).unwrap_err();
        assert_eq!(
            err,
            LedgerError::StockUnderflow {
                product_id: product,
                reserved: 6,
            }
        );
        assert_eq!(ledger.set_stock(product, 6).unwrap(), 6);
        assert_eq!(ledger.available(product).unwrap(), 0);
    }

    #[test]
    fn test_concurrent_reservations_cannot_oversell() {
        let (ledger, product) = tracked(1);
        let ledger = Arc::new(ledger);
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    ledger.reserve(product, Quantity::ONE).is_ok()
                })
            })
            .collect();

        let outcomes: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
        assert_eq!(ledger.available(product).unwrap(), 0);
        assert_eq!(ledger.on_hand(product).unwrap(), 1);
    }

    #[test]
    fn test_concurrent_traffic_on_distinct_products() {
        let ledger = Arc::new(StockLedger::new());
        let products: Vec<ProductId> = (0..4).map(|_| ProductId::new()).collect();
        for product in &products {
            ledger.track(*product, 1_000);
        }

        let handles: Vec<_> = products
            .iter()
            .map(|product| {
                let ledger = Arc::clone(&ledger);
                let product = *product;
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        ledger.reserve(product, Quantity::ONE).unwrap();
                        ledger.commit(product, Quantity::ONE).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        for product in &products {
            assert_eq!(ledger.on_hand(*product).unwrap(), 0);
            assert_eq!(ledger.reserved(*product).unwrap(), 0);
        }
    }
}
