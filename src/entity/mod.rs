pub mod farms;
pub mod offers;
pub mod order_items;
pub mod orders;

pub use farms::Entity as Farms;
pub use offers::Entity as Offers;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
