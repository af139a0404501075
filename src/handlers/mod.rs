pub mod addresses;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod common;
pub mod health;
pub mod orders;
pub mod payment_webhooks;
pub mod payments;
pub mod products;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::repositories::{AccountStore, CatalogStore, CommerceStore};
use crate::services::{
    accounts::AccountService, cart::CartService, catalog::CatalogService, orders::OrderService,
    payment_processor::PaymentProcessor, payments::PaymentService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub accounts: Arc<AccountService>,
    pub catalog: Arc<CatalogService>,
    pub carts: Arc<CartService>,
    pub orders: Arc<OrderService>,
    pub payments: Arc<PaymentService>,
    pub auth: Arc<AuthService>,
}

impl AppServices {
    /// Wires every service to one store implementing all three gateways.
    pub fn new<S>(
        store: Arc<S>,
        processor: Arc<dyn PaymentProcessor>,
        auth: Arc<AuthService>,
        config: &AppConfig,
    ) -> Self
    where
        S: CommerceStore + CatalogStore + AccountStore + 'static,
    {
        let commerce: Arc<dyn CommerceStore> = store.clone();
        let catalog_store: Arc<dyn CatalogStore> = store.clone();
        let account_store: Arc<dyn AccountStore> = store;

        let orders = OrderService::new(
            commerce.clone(),
            config.api_default_page_size,
            config.api_max_page_size,
        );
        let payments = PaymentService::new(
            commerce.clone(),
            orders.clone(),
            processor,
            config.payment_currency.clone(),
            Duration::from_secs(config.upstream_timeout_secs),
        );

        Self {
            accounts: Arc::new(AccountService::new(account_store, auth.clone())),
            catalog: Arc::new(CatalogService::new(
                catalog_store.clone(),
                config.api_default_page_size,
                config.api_max_page_size,
            )),
            carts: Arc::new(CartService::new(commerce, catalog_store)),
            orders: Arc::new(orders),
            payments: Arc::new(payments),
            auth,
        }
    }
}
