use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::{Stream, StreamExt};
use log::{debug, error, info, warn};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::cart_merge::MergeBatch;
use crate::domain::cart::{Cart, CartItem, MergeRequest, MergeSummary};
use crate::domain::errors::DomainError;
use crate::domain::ports::{CartGateway, CartStore, DiscountLookup};
use crate::domain::upload::MergeUpload;

/// Per-username mutual exclusion for cart mutations.
///
/// An entry lives only while some caller holds or waits for its lock.
#[derive(Debug, Default)]
pub struct CartLeases {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl CartLeases {
    pub async fn acquire(&self, username: &str) -> CartLease<'_> {
        let lock = self
            .locks
            .entry(username.to_string())
            .or_default()
            .clone();
        CartLease {
            leases: self,
            username: username.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }
}

/// Exclusive hold on one username, released on drop.
pub struct CartLease<'a> {
    leases: &'a CartLeases,
    username: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for CartLease<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // The map's own reference is the last one once nobody waits.
        self.leases
            .locks
            .remove_if(&self.username, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn CartStore>,
    discounts: Arc<dyn DiscountLookup>,
    leases: Arc<CartLeases>,
}

impl CartService {
    pub fn new(store: Arc<dyn CartStore>, discounts: Arc<dyn DiscountLookup>) -> Self {
        Self {
            store,
            discounts,
            leases: Arc::new(CartLeases::default()),
        }
    }

    pub async fn get_cart(&self, username: &str) -> Result<Cart, DomainError> {
        self.store.get_cart(username).await
    }

    pub async fn create_cart(&self, cart: Cart) -> Result<Cart, DomainError> {
        cart.validate()?;
        let _lease = self.leases.acquire(&cart.username).await;
        match self.store.create_cart(cart).await {
            Ok(cart) => {
                info!(
                    "ShoppingCart is successfully created. Username: {}",
                    cart.username
                );
                Ok(cart)
            }
            Err(e) => {
                error!("ShoppingCart creation rejected: {}", e);
                Err(e)
            }
        }
    }

    pub async fn remove_item(&self, username: &str, product_id: i32) -> Result<bool, DomainError> {
        let _lease = self.leases.acquire(username).await;
        let removed = self.store.remove_item(username, product_id).await?;
        info!("Removed product {} from the cart of {}", product_id, username);
        Ok(removed)
    }

    /// Folds a stream of merge requests into the addressed carts.
    ///
    /// The stream is read to its end before any cart is touched; an error
    /// item abandons the whole batch. The named carts are then leased in
    /// username order, loaded, updated in arrival order against an in-memory
    /// working set and written back in a single commit.
    pub async fn merge_stream<S>(&self, requests: S) -> Result<MergeSummary, DomainError>
    where
        S: Stream<Item = Result<MergeRequest, DomainError>>,
    {
        futures::pin_mut!(requests);
        let mut received = Vec::new();
        while let Some(request) = requests.next().await {
            received.push(request?);
        }

        if received.is_empty() {
            info!("Merge stream ended without items; nothing to commit");
            return Ok(MergeSummary::from_count(0));
        }

        let usernames: BTreeSet<&str> = received.iter().map(|r| r.username.as_str()).collect();
        let mut leases = Vec::with_capacity(usernames.len());
        for username in &usernames {
            leases.push(self.leases.acquire(username).await);
        }

        let mut batch = MergeBatch::default();
        for username in usernames {
            batch.track(self.store.get_cart(username).await?);
        }
        for request in received {
            self.merge_one(&mut batch, request).await?;
        }

        let count = self.store.commit(batch.into_changes()).await?;
        drop(leases);
        info!("Merge stream committed {} cart item(s)", count);
        Ok(MergeSummary::from_count(count))
    }

    async fn merge_one(&self, batch: &mut MergeBatch, request: MergeRequest) -> Result<(), DomainError> {
        let MergeRequest {
            username,
            discount_code,
            item,
        } = request;

        if let Some(quantity) = batch.increment(&username, item.product_id)? {
            debug!(
                "Product {} already in the cart of {}; quantity is now {}",
                item.product_id, username, quantity
            );
            return Ok(());
        }

        if item.quantity <= 0 {
            return Err(DomainError::InvalidInput(format!(
                "quantity of product {} must be positive, got {}",
                item.product_id, item.quantity
            )));
        }

        let discount = self.discounts.get_discount(&discount_code).await?;
        if discount.amount > item.price {
            warn!(
                "Discount {} ({}) exceeds the price of product {} ({}); storing a zero price",
                discount.code, discount.amount, item.product_id, item.price
            );
        }
        let price = discount.apply_to(&item.price);
        debug!(
            "Adding product {} to the cart of {} at {} after discount {}",
            item.product_id, username, price, discount.code
        );
        batch.insert(&username, CartItem { price, ..item })
    }
}

#[async_trait]
impl CartGateway for CartService {
    async fn get_cart(&self, username: &str) -> Result<Cart, DomainError> {
        CartService::get_cart(self, username).await
    }

    async fn create_cart(&self, cart: Cart) -> Result<Cart, DomainError> {
        CartService::create_cart(self, cart).await
    }

    async fn open_merge(&self) -> Result<MergeUpload, DomainError> {
        let service = self.clone();
        Ok(MergeUpload::open(move |requests| {
            tokio::spawn(async move { service.merge_stream(requests).await })
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bigdecimal::BigDecimal;
    use futures::stream;

    use super::*;
    use crate::domain::cart::ItemChange;
    use crate::domain::discount::Discount;
    use crate::infrastructure::memory::{InMemoryCartStore, InMemoryDiscountTable};

    fn discounts() -> Arc<InMemoryDiscountTable> {
        Arc::new(InMemoryDiscountTable::new([
            Discount {
                id: 1,
                code: "CODE_10".to_string(),
                amount: BigDecimal::from(10),
            },
            Discount {
                id: 2,
                code: "CODE_500".to_string(),
                amount: BigDecimal::from(500),
            },
        ]))
    }

    fn service_with(store: Arc<dyn CartStore>) -> CartService {
        CartService::new(store, discounts())
    }

    fn service() -> CartService {
        service_with(Arc::new(InMemoryCartStore::new()))
    }

    fn request(username: &str, code: &str, product_id: i32, price: i32) -> MergeRequest {
        MergeRequest {
            username: username.to_string(),
            discount_code: code.to_string(),
            item: CartItem {
                product_id,
                product_name: format!("product {product_id}"),
                quantity: 1,
                color: "Black".to_string(),
                price: BigDecimal::from(price),
            },
        }
    }

    async fn merge(service: &CartService, requests: Vec<MergeRequest>) -> Result<MergeSummary, DomainError> {
        service
            .merge_stream(stream::iter(requests.into_iter().map(Ok)))
            .await
    }

    /// Store wrapper that counts commits.
    struct CountingStore {
        inner: InMemoryCartStore,
        commits: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl CartStore for CountingStore {
        async fn get_cart(&self, username: &str) -> Result<Cart, DomainError> {
            self.inner.get_cart(username).await
        }
        async fn create_cart(&self, cart: Cart) -> Result<Cart, DomainError> {
            self.inner.create_cart(cart).await
        }
        async fn remove_item(&self, username: &str, product_id: i32) -> Result<bool, DomainError> {
            self.inner.remove_item(username, product_id).await
        }
        async fn commit(&self, changes: Vec<ItemChange>) -> Result<usize, DomainError> {
            self.commits
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.inner.commit(changes).await
        }
    }

    #[tokio::test]
    async fn create_cart_twice_is_already_exists() {
        let service = service();
        service
            .create_cart(Cart::empty("alice"))
            .await
            .expect("create failed");
        let err = service.create_cart(Cart::empty("alice")).await.unwrap_err();
        assert!(matches!(err, DomainError::CartAlreadyExists(_)));
    }

    #[tokio::test]
    async fn create_cart_rejects_invalid_cart() {
        let err = service().create_cart(Cart::empty("")).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn first_merge_inserts_discounted_item() {
        let service = service();
        service
            .create_cart(Cart::empty("alice"))
            .await
            .expect("create failed");

        let summary = merge(&service, vec![request("alice", "CODE_10", 1, 100)])
            .await
            .expect("merge failed");
        assert_eq!(
            summary,
            MergeSummary {
                success: true,
                inserted_or_modified_count: 1
            }
        );

        let cart = service.get_cart("alice").await.expect("get failed");
        let item = cart.item(1).expect("item missing");
        assert_eq!(item.price, BigDecimal::from(90));
        assert_eq!(item.quantity, 1);
    }

    #[tokio::test]
    async fn repeat_merge_only_increments_quantity() {
        let service = service();
        service
            .create_cart(Cart::empty("alice"))
            .await
            .expect("create failed");
        merge(&service, vec![request("alice", "CODE_10", 1, 100)])
            .await
            .expect("first merge failed");

        let mut candidate = request("alice", "CODE_10", 1, 999);
        candidate.item.quantity = 7;
        candidate.item.color = "Red".to_string();
        let summary = merge(&service, vec![candidate]).await.expect("second merge failed");
        assert_eq!(summary.inserted_or_modified_count, 1);

        let cart = service.get_cart("alice").await.expect("get failed");
        assert_eq!(cart.items.len(), 1);
        let item = cart.item(1).expect("item missing");
        assert_eq!(item.quantity, 2);
        assert_eq!(item.price, BigDecimal::from(90));
        assert_eq!(item.color, "Black");
    }

    #[tokio::test]
    async fn two_requests_for_existing_product_add_two() {
        let service = service();
        service
            .create_cart(Cart {
                username: "alice".into(),
                items: vec![CartItem {
                    product_id: 3,
                    product_name: "p3".into(),
                    quantity: 5,
                    color: "Black".into(),
                    price: BigDecimal::from(20),
                }],
            })
            .await
            .expect("create failed");

        merge(
            &service,
            vec![
                request("alice", "CODE_10", 3, 30),
                request("alice", "CODE_10", 3, 30),
            ],
        )
        .await
        .expect("merge failed");

        let cart = service.get_cart("alice").await.expect("get failed");
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.item(3).map(|i| i.quantity), Some(7));
    }

    #[tokio::test]
    async fn discount_applies_only_to_first_occurrence() {
        let service = service();
        service
            .create_cart(Cart::empty("alice"))
            .await
            .expect("create failed");

        let summary = merge(
            &service,
            vec![
                request("alice", "CODE_10", 1, 100),
                request("alice", "UNKNOWN", 1, 100),
                request("alice", "UNKNOWN", 1, 100),
            ],
        )
        .await
        .expect("merge failed");
        assert_eq!(summary.inserted_or_modified_count, 1);

        let cart = service.get_cart("alice").await.expect("get failed");
        let item = cart.item(1).expect("item missing");
        assert_eq!(item.quantity, 3);
        assert_eq!(item.price, BigDecimal::from(90));
    }

    #[tokio::test]
    async fn missing_cart_fails_whole_stream_without_commit() {
        let store = Arc::new(CountingStore {
            inner: InMemoryCartStore::new(),
            commits: Default::default(),
        });
        let service = service_with(store.clone());
        service
            .create_cart(Cart::empty("alice"))
            .await
            .expect("create failed");

        let err = merge(
            &service,
            vec![
                request("alice", "CODE_10", 1, 100),
                request("nobody", "CODE_10", 2, 100),
            ],
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DomainError::CartNotFound(ref u) if u == "nobody"));
        assert_eq!(store.commits.load(std::sync::atomic::Ordering::SeqCst), 0);
        let cart = service.get_cart("alice").await.expect("get failed");
        assert!(cart.items.is_empty());
    }

    #[tokio::test]
    async fn unknown_discount_on_first_insert_fails_the_batch() {
        let service = service();
        service
            .create_cart(Cart::empty("alice"))
            .await
            .expect("create failed");

        let err = merge(
            &service,
            vec![
                request("alice", "CODE_10", 1, 100),
                request("alice", "NOPE", 2, 100),
            ],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DomainError::DiscountNotFound(_)));

        let cart = service.get_cart("alice").await.expect("get failed");
        assert!(cart.items.is_empty());
    }

    #[tokio::test]
    async fn empty_stream_does_not_touch_storage() {
        let store = Arc::new(CountingStore {
            inner: InMemoryCartStore::new(),
            commits: Default::default(),
        });
        let service = service_with(store.clone());

        let summary = merge(&service, Vec::new()).await.expect("merge failed");
        assert_eq!(
            summary,
            MergeSummary {
                success: false,
                inserted_or_modified_count: 0
            }
        );
        assert_eq!(store.commits.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn oversized_discount_floors_price_at_zero() {
        let service = service();
        service
            .create_cart(Cart::empty("alice"))
            .await
            .expect("create failed");
        merge(&service, vec![request("alice", "CODE_500", 4, 120)])
            .await
            .expect("merge failed");

        let cart = service.get_cart("alice").await.expect("get failed");
        assert_eq!(cart.item(4).map(|i| i.price.clone()), Some(BigDecimal::from(0)));
    }

    #[tokio::test]
    async fn non_positive_candidate_quantity_is_rejected_on_insert() {
        let service = service();
        service
            .create_cart(Cart::empty("alice"))
            .await
            .expect("create failed");
        let mut candidate = request("alice", "CODE_10", 1, 100);
        candidate.item.quantity = 0;

        let err = merge(&service, vec![candidate]).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn transport_error_mid_stream_commits_nothing() {
        let service = service();
        service
            .create_cart(Cart::empty("alice"))
            .await
            .expect("create failed");

        let items = vec![
            Ok(request("alice", "CODE_10", 1, 100)),
            Err(DomainError::Transport("connection reset".into())),
        ];
        let err = service
            .merge_stream(stream::iter(items))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Transport(_)));

        let cart = service.get_cart("alice").await.expect("get failed");
        assert!(cart.items.is_empty());
    }

    #[tokio::test]
    async fn get_cart_is_idempotent() {
        let service = service_with(Arc::new(InMemoryCartStore::seeded()));
        let first = service.get_cart("swn").await.expect("get failed");
        let second = service.get_cart("swn").await.expect("get failed");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn concurrent_streams_on_one_cart_do_not_lose_updates() {
        let service = service();
        service
            .create_cart(Cart::empty("alice"))
            .await
            .expect("create failed");
        merge(&service, vec![request("alice", "CODE_10", 1, 100)])
            .await
            .expect("seed merge failed");

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            tasks.push(tokio::spawn(async move {
                let slow = stream::iter(vec![
                    Ok(request("alice", "CODE_10", 1, 100)),
                    Ok(request("alice", "CODE_10", 1, 100)),
                ])
                .then(|item| async move {
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    item
                });
                service.merge_stream(slow).await
            }));
        }
        for task in tasks {
            task.await.expect("task panicked").expect("merge failed");
        }

        let cart = service.get_cart("alice").await.expect("get failed");
        assert_eq!(cart.item(1).map(|i| i.quantity), Some(17));
        assert!(service.leases.locks.is_empty());
    }

    fn slow_stream(
        requests: Vec<MergeRequest>,
    ) -> impl Stream<Item = Result<MergeRequest, DomainError>> {
        stream::iter(requests.into_iter().map(Ok)).then(|item| async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            item
        })
    }

    #[tokio::test]
    async fn streams_naming_users_in_opposite_orders_both_finish() {
        let service = service();
        for username in ["alice", "bob"] {
            service
                .create_cart(Cart::empty(username))
                .await
                .expect("create failed");
        }

        let forward = {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .merge_stream(slow_stream(vec![
                        request("alice", "CODE_10", 1, 100),
                        request("bob", "CODE_10", 1, 100),
                    ]))
                    .await
            })
        };
        let backward = {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .merge_stream(slow_stream(vec![
                        request("bob", "CODE_10", 2, 100),
                        request("alice", "CODE_10", 2, 100),
                    ]))
                    .await
            })
        };

        let (forward, backward) = tokio::time::timeout(Duration::from_secs(2), async {
            (forward.await, backward.await)
        })
        .await
        .expect("merges did not finish");
        forward.expect("task panicked").expect("merge failed");
        backward.expect("task panicked").expect("merge failed");

        tokio::time::timeout(Duration::from_secs(1), service.remove_item("alice", 1))
            .await
            .expect("remove_item blocked")
            .expect("remove failed");
        for username in ["alice", "bob"] {
            let cart = service.get_cart(username).await.expect("get failed");
            assert!(cart.item(2).is_some());
        }
    }

    #[tokio::test]
    async fn leases_are_dropped_once_released() {
        let service = service();
        service
            .create_cart(Cart::empty("alice"))
            .await
            .expect("create failed");
        merge(&service, vec![request("alice", "CODE_10", 1, 100)])
            .await
            .expect("merge failed");
        service.remove_item("alice", 1).await.expect("remove failed");
        let _ = service.remove_item("ghost", 1).await;
        let _ = merge(&service, vec![request("nobody", "CODE_10", 1, 100)]).await;

        assert!(service.leases.locks.is_empty());
    }

    #[tokio::test]
    async fn waiting_lease_keeps_the_entry() {
        let leases = Arc::new(CartLeases::default());
        let held = leases.acquire("alice").await;

        let waiter = {
            let leases = leases.clone();
            tokio::spawn(async move {
                let _lease = leases.acquire("alice").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        drop(held);
        // The waiter has not been polled since; its clone keeps the entry.
        assert!(leases.locks.contains_key("alice"));

        waiter.await.expect("waiter panicked");
        assert!(leases.locks.is_empty());
    }

    #[tokio::test]
    async fn dropped_merge_future_leaves_cart_unchanged() {
        let service = service();
        service
            .create_cart(Cart::empty("alice"))
            .await
            .expect("create failed");

        let never_ending = stream::iter(vec![Ok(request("alice", "CODE_10", 1, 100))])
            .chain(stream::pending());
        let outcome =
            tokio::time::timeout(Duration::from_millis(50), service.merge_stream(never_ending)).await;
        assert!(outcome.is_err(), "merge should still be waiting for input");

        let cart = service.get_cart("alice").await.expect("get failed");
        assert!(cart.items.is_empty());

        // The lease was released when the merge was dropped.
        merge(&service, vec![request("alice", "CODE_10", 1, 100)])
            .await
            .expect("follow-up merge failed");
    }

    #[tokio::test]
    async fn gateway_upload_round_trip() {
        let service = service();
        CartGateway::create_cart(&service, Cart::empty("alice"))
            .await
            .expect("create failed");

        let mut upload = service.open_merge().await.expect("open failed");
        upload
            .send(request("alice", "CODE_10", 1, 100))
            .await
            .expect("send failed");
        upload
            .send(request("alice", "CODE_10", 2, 50))
            .await
            .expect("send failed");
        let summary = upload.finish().await.expect("finish failed");
        assert_eq!(summary.inserted_or_modified_count, 2);

        let cart = CartGateway::get_cart(&service, "alice")
            .await
            .expect("get failed");
        assert_eq!(cart.item(2).map(|i| i.price.clone()), Some(BigDecimal::from(40)));
    }
}
