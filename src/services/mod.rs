pub mod commission_service;
pub mod order_item_service;
pub mod order_item_store;
pub mod order_service;
pub mod split_service;
