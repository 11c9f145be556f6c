pub mod order;
pub mod recurring_payment;
pub mod return_request;
pub mod shipment;
