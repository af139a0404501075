// Storefront
pub mod catalog;
pub mod cart;

// Checkout and payments
pub mod orders;
pub mod payment_processor;
pub mod payments;

// Customer management
pub mod accounts;
