pub mod gateway;
pub mod server;

pub use gateway::{HttpRedemptionGateway, RedemptionGateway};
pub use server::RedemptionServer;
