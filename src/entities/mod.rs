pub mod address;
pub mod cart;
pub mod cart_item;
pub mod category;
pub mod order;
pub mod order_item;
pub mod product;
pub mod user;

pub use order::OrderStatus;
pub use user::Role;
