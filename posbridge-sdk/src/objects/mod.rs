//! Wire objects exchanged between the bridge, the host window and the
//! settlement gateway.

pub mod host;
pub mod settlement;
pub mod step;

pub use host::{HostReply, RegisterSale};
pub use settlement::{GatewayResponse, GatewayStatus, PayRequest, RefundRequest, SettlementRequest};
pub use step::{SetupOptions, StepMessage};
