pub mod tree;
pub mod category;
pub mod manufacturer;
pub mod product;
pub mod spec_attribute;
pub mod product_attribute;
