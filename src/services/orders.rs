//! Order placement and lifecycle.
//!
//! Placement turns the user's cart into an order in one transaction: the
//! products in the cart and the coupon (if any) are locked, stock and coupon
//! validity are checked against the locked rows, and then the order, its item
//! snapshots, the stock decrements, the coupon usage and the cart clearing are
//! written together. Any failure leaves the store untouched.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{Paginated, ServiceError};
use crate::domain::aggregates::{
    generate_order_number, requested_per_product, Address, Coupon, CouponOutcome, NewOrder, NewOrderItem, Order,
    OrderStatus, PaymentMethod, Product,
};
use crate::domain::events::{CouponEvent, DomainEvent, OrderEvent, ProductEvent};
use crate::domain::pricing::PricingPolicy;
use crate::domain::value_objects::CouponCode;
use crate::messaging::EventPublisher;
use crate::storage::{Database, OrderFilter, Page, StoreError, Transaction};

#[derive(Debug, Clone, PartialEq)]
pub struct PlaceOrder {
    pub shipping_address: Address,
    /// Defaults to the shipping address.
    pub billing_address: Option<Address>,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub coupon_code: Option<String>,
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<dyn Database>,
    pricing: PricingPolicy,
    events: Arc<dyn EventPublisher>,
}

/// Locks the coupon and returns it with its discount if it applies to `subtotal`.
async fn redeemable_coupon(
    tx: &mut dyn Transaction,
    code: &str,
    now: DateTime<Utc>,
    subtotal: Decimal,
) -> Result<Option<(Coupon, Decimal)>, StoreError> {
    let Ok(code) = CouponCode::new(code) else {
        return Ok(None);
    };
    let Some(coupon) = tx.lock_coupon(&code).await? else {
        debug!(%code, "unknown coupon ignored at checkout");
        return Ok(None);
    };
    match coupon.evaluate(now, subtotal) {
        CouponOutcome::Applied { discount } => Ok(Some((coupon, discount))),
        outcome => {
            debug!(%code, ?outcome, "coupon not applied");
            Ok(None)
        }
    }
}

/// Puts every item's quantity back on its product and marks the order cancelled.
async fn cancel_and_restock(tx: &mut dyn Transaction, order: &Order) -> Result<(Order, Vec<DomainEvent>), StoreError> {
    let items = tx.order_items(order.id).await?;
    let mut events = Vec::with_capacity(items.len() + 1);
    for item in &items {
        tx.adjust_stock(item.product_id, item.quantity).await?;
        events.push(DomainEvent::Product(ProductEvent::StockRestored {
            product_id: item.product_id,
            quantity: item.quantity,
        }));
    }
    let mut cancelled = tx.update_order_status(order.id, OrderStatus::Cancelled).await?;
    cancelled.items = items;
    Ok((cancelled, events))
}

async fn with_items(tx: &mut dyn Transaction, mut order: Order) -> Result<Order, StoreError> {
    order.items = tx.order_items(order.id).await?;
    Ok(order)
}

impl OrderService {
    pub fn new(db: Arc<dyn Database>, pricing: PricingPolicy, events: Arc<dyn EventPublisher>) -> Self {
        Self { db, pricing, events }
    }

    #[instrument(skip(self, request), fields(coupon = request.coupon_code.as_deref()))]
    pub async fn place_order(&self, user_id: Uuid, request: PlaceOrder) -> Result<Order, ServiceError> {
        let now = Utc::now();
        let failed = ServiceError::OrderCreationFailed;

        let mut tx = self.db.begin().await.map_err(failed)?;

        // Items are read only after the cart row is locked so a concurrent
        // checkout or cart edit cannot interleave with this one.
        let Some(cart) = tx.lock_cart(user_id).await.map_err(failed)? else {
            return Err(ServiceError::EmptyCart);
        };
        let items = tx.cart_items(cart.id).await.map_err(failed)?;
        if items.is_empty() {
            return Err(ServiceError::EmptyCart);
        }

        let requested = requested_per_product(&items)?;
        let ids: Vec<Uuid> = requested.keys().copied().collect();
        let products: HashMap<Uuid, Product> =
            tx.lock_products(&ids).await.map_err(failed)?.into_iter().map(|p| (p.id, p)).collect();

        for (product_id, quantity) in &requested {
            let product = products.get(product_id).ok_or(ServiceError::ProductNotFound)?;
            product.ensure_available(*quantity)?;
        }

        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            let product = products.get(&item.product_id).ok_or(ServiceError::ProductNotFound)?;
            lines.push(NewOrderItem {
                product_id: product.id,
                product_name: product.name.clone(),
                price: product.price,
                quantity: item.quantity,
                size: item.size,
                color: item.color,
            });
        }
        let subtotal: Decimal = lines.iter().map(NewOrderItem::total).sum();

        let coupon = match request.coupon_code.as_deref() {
            Some(code) => redeemable_coupon(&mut *tx, code, now, subtotal).await.map_err(failed)?,
            None => None,
        };
        let discount = coupon.as_ref().map_or(Decimal::ZERO, |(_, discount)| *discount);
        let totals = self.pricing.quote(subtotal, discount);

        let billing_address = request.billing_address.unwrap_or_else(|| request.shipping_address.clone());
        let mut order = tx
            .insert_order(NewOrder {
                order_number: generate_order_number(now),
                user_id,
                payment_method: request.payment_method,
                subtotal: totals.subtotal,
                shipping: totals.shipping,
                tax: totals.tax,
                discount: totals.discount,
                total: totals.total,
                coupon_code: coupon.as_ref().map(|(c, _)| c.code.to_string()),
                shipping_address: request.shipping_address,
                billing_address,
                notes: request.notes,
            })
            .await
            .map_err(failed)?;

        let mut events = Vec::new();
        for line in lines {
            order.items.push(tx.insert_order_item(order.id, line).await.map_err(failed)?);
        }
        for (product_id, quantity) in &requested {
            tx.adjust_stock(*product_id, -quantity).await.map_err(failed)?;
            events.push(DomainEvent::Product(ProductEvent::StockReserved {
                product_id: *product_id,
                quantity: *quantity,
            }));
        }
        if let Some((coupon, _)) = &coupon {
            tx.increment_coupon_usage(coupon.id).await.map_err(failed)?;
            events.push(DomainEvent::Coupon(CouponEvent::Redeemed {
                coupon_id: coupon.id,
                code: coupon.code.to_string(),
                order_id: order.id,
            }));
        }
        tx.clear_cart(cart.id).await.map_err(failed)?;
        tx.commit().await.map_err(failed)?;

        info!(order_number = %order.order_number, total = %order.total, "order placed");
        events.insert(
            0,
            DomainEvent::Order(OrderEvent::Placed {
                order_id: order.id,
                order_number: order.order_number.clone(),
                user_id,
                total: order.total,
            }),
        );
        self.events.publish_all(events).await;

        Ok(order)
    }

    /// Owner cancellation; only pending orders qualify.
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, user_id: Uuid, order_id: Uuid) -> Result<Order, ServiceError> {
        let mut tx = self.db.begin().await?;
        let order = tx
            .lock_order(order_id)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or(ServiceError::OrderNotFound)?;
        if order.status != OrderStatus::Pending {
            return Err(ServiceError::OrderNotCancellable { status: order.status });
        }

        let (cancelled, mut events) = cancel_and_restock(&mut *tx, &order).await?;
        tx.commit().await?;

        info!(order_number = %cancelled.order_number, "order cancelled by customer");
        events.push(DomainEvent::Order(OrderEvent::Cancelled { order_id, by_admin: false }));
        self.events.publish_all(events).await;
        Ok(cancelled)
    }

    /// Admin status change. Moving to `cancelled` restores stock.
    #[instrument(skip(self))]
    pub async fn update_status(&self, order_id: Uuid, status: OrderStatus) -> Result<Order, ServiceError> {
        let mut tx = self.db.begin().await?;
        let order = tx.lock_order(order_id).await?.ok_or(ServiceError::OrderNotFound)?;
        let from = order.status;

        if from == status {
            let order = with_items(&mut *tx, order).await?;
            tx.commit().await?;
            return Ok(order);
        }
        if !from.can_transition_to(status) {
            return Err(ServiceError::InvalidStatusTransition { from, to: status });
        }

        let (updated, mut events) = if status == OrderStatus::Cancelled {
            let (cancelled, mut events) = cancel_and_restock(&mut *tx, &order).await?;
            events.push(DomainEvent::Order(OrderEvent::Cancelled { order_id, by_admin: true }));
            (cancelled, events)
        } else {
            let updated = tx.update_order_status(order_id, status).await?;
            (with_items(&mut *tx, updated).await?, Vec::new())
        };
        tx.commit().await?;

        info!(order_number = %updated.order_number, %from, to = %status, "order status changed");
        events.insert(0, DomainEvent::Order(OrderEvent::StatusChanged { order_id, from, to: status }));
        self.events.publish_all(events).await;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, user_id: Uuid, order_id: Uuid) -> Result<Order, ServiceError> {
        let mut tx = self.db.begin().await?;
        let order = tx
            .find_order(order_id)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or(ServiceError::OrderNotFound)?;
        let order = with_items(&mut *tx, order).await?;
        tx.commit().await?;
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn list_orders(&self, filter: OrderFilter, page: Page) -> Result<Paginated<Order>, ServiceError> {
        let mut tx = self.db.begin().await?;
        let (orders, total) = tx.list_orders(filter, page).await?;
        let mut data = Vec::with_capacity(orders.len());
        for order in orders {
            data.push(with_items(&mut *tx, order).await?);
        }
        tx.commit().await?;
        Ok(Paginated::new(data, total, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{DiscountType, NewCartItem};
    use crate::domain::value_objects::QuantityError;
    use crate::messaging::RecordingPublisher;
    use crate::storage::memory::{FailPoint, MemoryDatabase};

    struct Fixture {
        db: MemoryDatabase,
        events: RecordingPublisher,
        service: OrderService,
        user: Uuid,
    }

    async fn fixture() -> Fixture {
        let db = MemoryDatabase::new();
        let events = RecordingPublisher::new();
        let user = db.insert_user("Ada", "ada@example.com", false, "token").await.id;
        let service = OrderService::new(Arc::new(db.clone()), PricingPolicy::default(), Arc::new(events.clone()));
        Fixture { db, events, service, user }
    }

    async fn fill_cart(db: &MemoryDatabase, user: Uuid, lines: &[(&Product, i32, Option<&str>)]) {
        let mut tx = db.begin().await.unwrap();
        let cart = tx.create_cart(user).await.unwrap();
        for (product, quantity, size) in lines {
            let item = NewCartItem {
                product_id: product.id,
                quantity: *quantity,
                size: size.map(str::to_string),
                color: None,
            };
            tx.upsert_cart_item(cart.id, item).await.unwrap();
        }
        tx.commit().await.unwrap();
    }

    fn request(coupon: Option<&str>) -> PlaceOrder {
        PlaceOrder {
            shipping_address: Address {
                full_name: "Ada Lovelace".into(),
                phone: "+44 20 7946 0000".into(),
                email: "ada@example.com".into(),
                line1: "12 St James's Square".into(),
                line2: None,
                city: "London".into(),
                state: "London".into(),
                postal_code: "SW1Y 4JH".into(),
                country: "GB".into(),
            },
            billing_address: None,
            payment_method: PaymentMethod::Card,
            notes: None,
            coupon_code: coupon.map(str::to_string),
        }
    }

    async fn cart_len(db: &MemoryDatabase, user: Uuid) -> usize {
        let mut tx = db.begin().await.unwrap();
        let cart = tx.find_cart(user).await.unwrap().unwrap();
        tx.cart_items(cart.id).await.unwrap().len()
    }

    #[tokio::test]
    async fn placing_an_order_prices_reserves_and_clears() {
        let f = fixture().await;
        let product = f.db.insert_product(Product::new("Jacket", Decimal::from(200), 5)).await;
        fill_cart(&f.db, f.user, &[(&product, 2, None)]).await;

        let order = f.service.place_order(f.user, request(None)).await.unwrap();

        assert_eq!(order.subtotal, Decimal::from(400));
        assert_eq!(order.shipping, Decimal::new(1500, 2));
        assert_eq!(order.tax, Decimal::from(32));
        assert_eq!(order.total, Decimal::new(44700, 2));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.billing_address, order.shipping_address);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].product_name, "Jacket");
        assert!(order.order_number.starts_with("ORD-"));

        assert_eq!(f.db.product(product.id).await.unwrap().stock, 3);
        assert_eq!(cart_len(&f.db, f.user).await, 0);

        let events = f.events.events().await;
        assert!(matches!(events[0], DomainEvent::Order(OrderEvent::Placed { .. })), "got {events:?}");
        assert!(events.contains(&DomainEvent::Product(ProductEvent::StockReserved {
            product_id: product.id,
            quantity: 2
        })));
    }

    #[tokio::test]
    async fn empty_cart_is_rejected() {
        let f = fixture().await;
        let result = f.service.place_order(f.user, request(None)).await;
        assert!(matches!(result, Err(ServiceError::EmptyCart)), "got {result:?}");
    }

    #[tokio::test]
    async fn insufficient_stock_leaves_everything_untouched() {
        let f = fixture().await;
        let plenty = f.db.insert_product(Product::new("Socks", Decimal::from(5), 10)).await;
        let scarce = f.db.insert_product(Product::new("Boots", Decimal::from(90), 1)).await;
        fill_cart(&f.db, f.user, &[(&plenty, 3, None), (&scarce, 2, None)]).await;

        let result = f.service.place_order(f.user, request(None)).await;
        assert!(
            matches!(
                &result,
                Err(ServiceError::InsufficientStock { product, available: 1, requested: 2 }) if product == "Boots"
            ),
            "got {result:?}"
        );
        assert_eq!(f.db.product(plenty.id).await.unwrap().stock, 10);
        assert_eq!(f.db.product(scarce.id).await.unwrap().stock, 1);
        assert_eq!(f.db.order_count().await, 0);
        assert_eq!(cart_len(&f.db, f.user).await, 2);
        assert!(f.events.events().await.is_empty());
    }

    #[tokio::test]
    async fn variants_of_one_product_share_its_stock() {
        let f = fixture().await;
        let shirt = f.db.insert_product(Product::new("Shirt", Decimal::from(20), 3)).await;
        fill_cart(&f.db, f.user, &[(&shirt, 2, Some("M")), (&shirt, 2, Some("L"))]).await;

        let result = f.service.place_order(f.user, request(None)).await;
        assert!(
            matches!(result, Err(ServiceError::InsufficientStock { available: 3, requested: 4, .. })),
            "got {result:?}"
        );
    }

    #[tokio::test]
    async fn inactive_product_reports_nothing_available() {
        let f = fixture().await;
        let mut retired = Product::new("Retired", Decimal::from(20), 8);
        retired.is_active = false;
        let retired = f.db.insert_product(retired).await;
        fill_cart(&f.db, f.user, &[(&retired, 1, None)]).await;

        let result = f.service.place_order(f.user, request(None)).await;
        assert!(matches!(result, Err(ServiceError::InsufficientStock { available: 0, .. })), "got {result:?}");
    }

    #[tokio::test]
    async fn storage_failure_rolls_back_every_write() {
        for point in [FailPoint::InsertOrderItem, FailPoint::AdjustStock, FailPoint::ClearCart, FailPoint::Commit] {
            let f = fixture().await;
            let product = f.db.insert_product(Product::new("Lamp", Decimal::from(40), 4)).await;
            let mut coupon = Coupon::new(CouponCode::new("TENOFF").unwrap(), DiscountType::Fixed, Decimal::from(10));
            coupon.usage_limit = Some(5);
            f.db.insert_coupon(coupon).await;
            fill_cart(&f.db, f.user, &[(&product, 2, None)]).await;
            f.db.fail_at(Some(point)).await;

            let result = f.service.place_order(f.user, request(Some("tenoff"))).await;
            assert!(matches!(result, Err(ServiceError::OrderCreationFailed(_))), "{point:?}: got {result:?}");

            f.db.fail_at(None).await;
            assert_eq!(f.db.order_count().await, 0, "{point:?}");
            assert_eq!(f.db.product(product.id).await.unwrap().stock, 4, "{point:?}");
            assert_eq!(f.db.coupon("TENOFF").await.unwrap().used_count, 0, "{point:?}");
            assert_eq!(cart_len(&f.db, f.user).await, 1, "{point:?}");
        }
    }

    #[tokio::test]
    async fn applied_coupon_discounts_before_tax_and_counts_once() {
        let f = fixture().await;
        let product = f.db.insert_product(Product::new("Desk", Decimal::from(500), 5)).await;
        let mut coupon = Coupon::new(CouponCode::new("SAVE20").unwrap(), DiscountType::Percentage, Decimal::from(20));
        coupon.max_discount = Some(Decimal::from(100));
        coupon.usage_limit = Some(1);
        f.db.insert_coupon(coupon).await;
        fill_cart(&f.db, f.user, &[(&product, 2, None)]).await;

        let order = f.service.place_order(f.user, request(Some(" save20 "))).await.unwrap();
        assert_eq!(order.discount, Decimal::from(100));
        assert_eq!(order.tax, Decimal::from(72));
        assert_eq!(order.total, Decimal::new(98700, 2));
        assert_eq!(order.coupon_code.as_deref(), Some("SAVE20"));
        assert_eq!(f.db.coupon("SAVE20").await.unwrap().used_count, 1);

        fill_cart(&f.db, f.user, &[(&product, 1, None)]).await;
        let second = f.service.place_order(f.user, request(Some("SAVE20"))).await.unwrap();
        assert_eq!(second.discount, Decimal::ZERO);
        assert_eq!(second.coupon_code, None);
        assert_eq!(f.db.coupon("SAVE20").await.unwrap().used_count, 1);
    }

    #[tokio::test]
    async fn unknown_or_unmet_coupon_is_ignored() {
        let f = fixture().await;
        let product = f.db.insert_product(Product::new("Mug", Decimal::from(12), 50)).await;
        let mut coupon = Coupon::new(CouponCode::new("BIG").unwrap(), DiscountType::Fixed, Decimal::from(50));
        coupon.min_order_amount = Some(Decimal::from(500));
        f.db.insert_coupon(coupon).await;

        for code in ["NOPE", "BIG", "   "] {
            fill_cart(&f.db, f.user, &[(&product, 1, None)]).await;
            let order = f.service.place_order(f.user, request(Some(code))).await.unwrap();
            assert_eq!(order.discount, Decimal::ZERO, "{code}");
        }
        assert_eq!(f.db.coupon("BIG").await.unwrap().used_count, 0);
    }

    #[tokio::test]
    async fn cancelling_pending_order_restores_stock() {
        let f = fixture().await;
        let product = f.db.insert_product(Product::new("Chair", Decimal::from(80), 4)).await;
        fill_cart(&f.db, f.user, &[(&product, 3, None)]).await;
        let order = f.service.place_order(f.user, request(None)).await.unwrap();
        assert_eq!(f.db.product(product.id).await.unwrap().stock, 1);

        let cancelled = f.service.cancel_order(f.user, order.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(cancelled.cancelled_at.is_some());
        assert_eq!(f.db.product(product.id).await.unwrap().stock, 4);

        let again = f.service.cancel_order(f.user, order.id).await;
        assert!(matches!(again, Err(ServiceError::OrderNotCancellable { .. })), "got {again:?}");
    }

    #[tokio::test]
    async fn shipped_or_foreign_orders_cannot_be_cancelled() {
        let f = fixture().await;
        let product = f.db.insert_product(Product::new("Chair", Decimal::from(80), 4)).await;
        fill_cart(&f.db, f.user, &[(&product, 1, None)]).await;
        let order = f.service.place_order(f.user, request(None)).await.unwrap();

        let stranger = f.db.insert_user("Eve", "eve@example.com", false, "eve").await;
        let result = f.service.cancel_order(stranger.id, order.id).await;
        assert!(matches!(result, Err(ServiceError::OrderNotFound)), "got {result:?}");

        f.db.set_order_status(order.id, OrderStatus::Shipped).await;
        let result = f.service.cancel_order(f.user, order.id).await;
        assert!(
            matches!(result, Err(ServiceError::OrderNotCancellable { status: OrderStatus::Shipped })),
            "got {result:?}"
        );
        assert_eq!(f.db.product(product.id).await.unwrap().stock, 3);
    }

    #[tokio::test]
    async fn admin_status_changes_follow_the_lifecycle() {
        let f = fixture().await;
        let product = f.db.insert_product(Product::new("Table", Decimal::from(150), 2)).await;
        fill_cart(&f.db, f.user, &[(&product, 2, None)]).await;
        let order = f.service.place_order(f.user, request(None)).await.unwrap();

        let shipped = f.service.update_status(order.id, OrderStatus::Shipped).await.unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);
        assert_eq!(shipped.items.len(), 1);

        let back = f.service.update_status(order.id, OrderStatus::Confirmed).await;
        assert!(matches!(back, Err(ServiceError::InvalidStatusTransition { .. })), "got {back:?}");

        let same = f.service.update_status(order.id, OrderStatus::Shipped).await.unwrap();
        assert_eq!(same.updated_at, shipped.updated_at);

        let cancelled = f.service.update_status(order.id, OrderStatus::Cancelled).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(f.db.product(product.id).await.unwrap().stock, 2);

        let reopen = f.service.update_status(order.id, OrderStatus::Pending).await;
        assert!(matches!(reopen, Err(ServiceError::InvalidStatusTransition { .. })), "got {reopen:?}");

        let events = f.events.events().await;
        assert!(events.contains(&DomainEvent::Order(OrderEvent::Cancelled { order_id: order.id, by_admin: true })));
    }

    #[tokio::test]
    async fn reads_are_scoped_to_the_owner() {
        let f = fixture().await;
        let product = f.db.insert_product(Product::new("Pen", Decimal::from(2), 100)).await;
        for _ in 0..3 {
            fill_cart(&f.db, f.user, &[(&product, 1, None)]).await;
            f.service.place_order(f.user, request(None)).await.unwrap();
        }
        let stranger = f.db.insert_user("Eve", "eve@example.com", false, "eve").await;

        let own = OrderFilter { user_id: Some(f.user), status: None };
        let mine = f.service.list_orders(own, Page::first()).await.unwrap();
        assert_eq!(mine.total, 3);
        assert!(mine.data.iter().all(|o| o.items.len() == 1));

        let other = OrderFilter { user_id: Some(stranger.id), status: None };
        let theirs = f.service.list_orders(other, Page::first()).await.unwrap();
        assert_eq!(theirs.total, 0);

        let id = mine.data[0].id;
        assert!(f.service.get_order(f.user, id).await.is_ok());
        assert!(matches!(f.service.get_order(stranger.id, id).await, Err(ServiceError::OrderNotFound)));

        let pending = OrderFilter { user_id: None, status: Some(OrderStatus::Pending) };
        assert_eq!(f.service.list_orders(pending, Page::first()).await.unwrap().total, 3);
    }

    #[tokio::test]
    async fn oversized_variant_totals_are_rejected_not_wrapped() {
        let f = fixture().await;
        let bulk = f.db.insert_product(Product::new("Bulk", Decimal::ONE, i32::MAX)).await;
        let lines = [
            (&bulk, 1_500_000_000, Some("S")),
            (&bulk, 1_500_000_000, Some("M")),
            (&bulk, 1_500_000_000, Some("L")),
        ];
        fill_cart(&f.db, f.user, &lines).await;

        let result = f.service.place_order(f.user, request(None)).await;
        assert!(
            matches!(result, Err(ServiceError::InvalidQuantity(QuantityError::Overflow))),
            "got {result:?}"
        );
        assert_eq!(f.db.product(bulk.id).await.unwrap().stock, i32::MAX);
        assert_eq!(f.db.order_count().await, 0);
    }

    #[tokio::test]
    async fn concurrent_checkouts_of_one_cart_place_a_single_order() {
        let f = fixture().await;
        let lamp = f.db.insert_product(Product::new("Lamp", Decimal::from(40), 10)).await;
        fill_cart(&f.db, f.user, &[(&lamp, 2, None)]).await;

        let (first, second) = tokio::join!(
            f.service.place_order(f.user, request(None)),
            f.service.place_order(f.user, request(None))
        );
        let placed = [&first, &second].iter().filter(|r| r.is_ok()).count();
        assert_eq!(placed, 1, "got {first:?} and {second:?}");
        assert!(
            [&first, &second].iter().any(|r| matches!(r, Err(ServiceError::EmptyCart))),
            "got {first:?} and {second:?}"
        );
        assert_eq!(f.db.product(lamp.id).await.unwrap().stock, 8);
        assert_eq!(f.db.order_count().await, 1);
    }
}
