// ============================================================================
// Persistence Interfaces
// Collaborator traits for order and product storage
// ============================================================================

use crate::domain::{Order, OrderError, OrderId, OrderNumber, Product, ProductId};
use parking_lot::RwLock;
use std::collections::HashMap;

// ============================================================================
// Traits
// ============================================================================

/// Order persistence seam. Every call is atomic from the engine's point of
/// view; the engine serializes writers per order on top of this.
pub trait OrderStore: Send + Sync {
    fn find(&self, order_id: OrderId) -> Option<Order>;

    fn find_by_number(&self, number: &OrderNumber) -> Option<Order>;

    /// Insert or overwrite an order.
    ///
    /// # Errors
    /// Fails with `DuplicateOrderNumber` when a different live order already
    /// holds the same order number.
    fn save(&self, order: &Order) -> Result<(), OrderError>;

    /// Remove an order and the line items it owns. Returns whether it
    /// existed.
    fn delete(&self, order_id: OrderId) -> bool;

    fn all(&self) -> Vec<Order>;
}

/// Product persistence seam.
pub trait ProductStore: Send + Sync {
    fn find(&self, product_id: ProductId) -> Option<Product>;

    fn save(&self, product: &Product);

    fn delete(&self, product_id: ProductId) -> bool;

    fn all(&self) -> Vec<Product>;
}

// ============================================================================
// In-Memory Implementations
// ============================================================================

#[derive(Default)]
struct OrderIndex {
    orders: HashMap<OrderId, Order>,
    numbers: HashMap<String, OrderId>,
}

/// Map-backed order store for tests and embedding.
#[derive(Default)]
pub struct InMemoryOrderStore {
    inner: RwLock<OrderIndex>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderStore for InMemoryOrderStore {
    fn find(&self, order_id: OrderId) -> Option<Order> {
        self.inner.read().orders.get(&order_id).cloned()
    }

    fn find_by_number(&self, number: &OrderNumber) -> Option<Order> {
        let inner = self.inner.read();
        let order_id = inner.numbers.get(number.as_str())?;
        inner.orders.get(order_id).cloned()
    }

    fn save(&self, order: &Order) -> Result<(), OrderError> {
        let mut inner = self.inner.write();
        if let Some(holder) = inner.numbers.get(order.order_number().as_str()) {
            if *holder != order.id() {
                return Err(OrderError::DuplicateOrderNumber(
                    order.order_number().clone(),
                ));
            }
        }
        inner
            .numbers
            .insert(order.order_number().as_str().to_owned(), order.id());
        inner.orders.insert(order.id(), order.clone());
        Ok(())
    }

    fn delete(&self, order_id: OrderId) -> bool {
        let mut inner = self.inner.write();
        match inner.orders.remove(&order_id) {
            Some(order) => {
                inner.numbers.remove(order.order_number().as_str());
                true
            },
            None => false,
        }
    }

    fn all(&self) -> Vec<Order> {
        self.inner.read().orders.values().cloned().collect()
    }
}

/// Map-backed product store for tests and embedding.
#[derive(Default)]
pub struct InMemoryProductStore {
    products: RwLock<HashMap<ProductId, Product>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProductStore for InMemoryProductStore {
    fn find(&self, product_id: ProductId) -> Option<Product> {
        self.products.read().get(&product_id).cloned()
    }

    fn save(&self, product: &Product) {
        self.products
            .write()
            .insert(product.id(), product.clone());
    }

    fn delete(&self, product_id: ProductId) -> bool {
        self.products.write().remove(&product_id).is_some()
    }

    fn all(&self) -> Vec<Product> {
        self.products.read().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;
    use crate::numeric::Money;

    #[test]
    fn test_order_store_round_trip() {
        let store = InMemoryOrderStore::new();
        let order = Order::new(OrderNumber::new("ORD-AAAA0001"), UserId::new());
        store.save(&order).unwrap();

        let loaded = store.find(order.id()).unwrap();
        assert_eq!(loaded.order_number(), order.order_number());

        let by_number = store
            .find_by_number(&OrderNumber::new("ORD-AAAA0001"))
            .unwrap();
        assert_eq!(by_number.id(), order.id());

        assert!(store.delete(order.id()));
        assert!(store.find(order.id()).is_none());
        assert!(!store.delete(order.id()));
    }

    #[test]
    fn test_duplicate_order_number_rejected() {
        let store = InMemoryOrderStore::new();
        let first = Order::new(OrderNumber::new("ORD-SAME"), UserId::new());
        let second = Order::new(OrderNumber::new("ORD-SAME"), UserId::new());

        store.save(&first).unwrap();
        // Re-saving the same order under its own number is fine
        store.save(&first).unwrap();

        let err = store.save(&second).unwrap_err();
        assert!(matches!(err, OrderError::DuplicateOrderNumber(_)));

        // The number frees up once the holder is gone
        store.delete(first.id());
        store.save(&second).unwrap();
    }

    #[test]
    fn test_product_store_round_trip() {
        let store = InMemoryProductStore::new();
        let product = Product::new("Desk", Money::from_integer(100).unwrap(), 4).unwrap();
        store.save(&product);

        let loaded = store.find(product.id()).unwrap();
        assert_eq!(loaded.stock_quantity(), 4);
        assert_eq!(store.all().len(), 1);
        assert!(store.delete(product.id()));
    }
}
