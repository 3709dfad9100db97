//! Cart management. A user's cart is created on first access.

use std::sync::Arc;

use tracing::{debug, instrument};
use uuid::Uuid;

use super::ServiceError;
use crate::domain::aggregates::{Cart, CartItem, CartLine, CartSummary, NewCartItem};
use crate::domain::value_objects::{normalize_variant, Quantity, QuantityError};
use crate::storage::{Database, StoreError, Transaction};

#[derive(Debug, Clone, PartialEq)]
pub struct AddToCart {
    pub product_id: Uuid,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
}

#[derive(Clone)]
pub struct CartService {
    db: Arc<dyn Database>,
}

/// Locked cart of the user, created if missing.
async fn cart_for(tx: &mut dyn Transaction, user_id: Uuid) -> Result<Cart, StoreError> {
    match tx.lock_cart(user_id).await? {
        Some(cart) => Ok(cart),
        None => tx.create_cart(user_id).await,
    }
}

/// Quantity of `product_id` across all variant lines, excluding `skip`.
fn quantity_in_cart(items: &[CartItem], product_id: Uuid, skip: Option<Uuid>) -> Result<i32, QuantityError> {
    items
        .iter()
        .filter(|i| i.product_id == product_id && Some(i.id) != skip)
        .try_fold(0i32, |total, i| total.checked_add(i.quantity))
        .ok_or(QuantityError::Overflow)
}

async fn summarize(tx: &mut dyn Transaction, cart: Cart) -> Result<CartSummary, StoreError> {
    let items = tx.cart_items(cart.id).await?;
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        if let Some(product) = tx.find_product(item.product_id).await? {
            lines.push(CartLine { item, product });
        }
    }
    Ok(CartSummary { cart, lines })
}

impl CartService {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: Uuid) -> Result<CartSummary, ServiceError> {
        let mut tx = self.db.begin().await?;
        let cart = cart_for(&mut *tx, user_id).await?;
        let summary = summarize(&mut *tx, cart).await?;
        tx.commit().await?;
        Ok(summary)
    }

    /// Adds to the line with the same product and variant tags, or starts a new one.
    #[instrument(skip(self))]
    pub async fn add_item(&self, user_id: Uuid, request: AddToCart) -> Result<CartSummary, ServiceError> {
        let quantity = Quantity::new(request.quantity)?;
        let size = normalize_variant(request.size);
        let color = normalize_variant(request.color);

        let mut tx = self.db.begin().await?;
        let product = tx
            .find_product(request.product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(ServiceError::ProductNotFound)?;
        let cart = cart_for(&mut *tx, user_id).await?;

        // Variant lines share the product's stock.
        let items = tx.cart_items(cart.id).await?;
        let in_cart = quantity_in_cart(&items, product.id, None)?;
        let wanted = in_cart.checked_add(quantity.value()).ok_or(QuantityError::Overflow)?;
        product.ensure_available(wanted)?;

        tx.upsert_cart_item(cart.id, NewCartItem { product_id: product.id, quantity: quantity.value(), size, color })
            .await?;
        let summary = summarize(&mut *tx, cart).await?;
        tx.commit().await?;

        debug!(product_id = %product.id, in_cart = wanted, "cart line updated");
        Ok(summary)
    }

    #[instrument(skip(self))]
    pub async fn update_item(&self, user_id: Uuid, item_id: Uuid, quantity: i32) -> Result<CartSummary, ServiceError> {
        let quantity = Quantity::new(quantity)?;

        let mut tx = self.db.begin().await?;
        let cart = tx.lock_cart(user_id).await?.ok_or(ServiceError::CartItemNotFound)?;
        let items = tx.cart_items(cart.id).await?;
        let item = items.iter().find(|i| i.id == item_id).ok_or(ServiceError::CartItemNotFound)?;
        let product = tx.find_product(item.product_id).await?.ok_or(ServiceError::ProductNotFound)?;
        let others = quantity_in_cart(&items, product.id, Some(item.id))?;
        product.ensure_available(others.checked_add(quantity.value()).ok_or(QuantityError::Overflow)?)?;

        tx.set_cart_item_quantity(item_id, quantity.value()).await?;
        let summary = summarize(&mut *tx, cart).await?;
        tx.commit().await?;
        Ok(summary)
    }

    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<CartSummary, ServiceError> {
        let mut tx = self.db.begin().await?;
        let cart = tx.lock_cart(user_id).await?.ok_or(ServiceError::CartItemNotFound)?;
        if tx.delete_cart_item(cart.id, item_id).await? == 0 {
            return Err(ServiceError::CartItemNotFound);
        }
        let summary = summarize(&mut *tx, cart).await?;
        tx.commit().await?;
        Ok(summary)
    }

    #[instrument(skip(self))]
    pub async fn clear(&self, user_id: Uuid) -> Result<(), ServiceError> {
        let mut tx = self.db.begin().await?;
        if let Some(cart) = tx.lock_cart(user_id).await? {
            let removed = tx.clear_cart(cart.id).await?;
            debug!(removed, "cart cleared");
        }
        tx.commit().await?;
        Ok(())
    }
}
