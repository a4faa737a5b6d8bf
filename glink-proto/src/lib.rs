/// GraphLink wire protocol
///
/// Protocol Buffers message definitions for the GraphLink transaction
/// channel. A transaction is one bidirectional gRPC stream carrying
/// `TransactionRequest` messages to the server and `TransactionResponse`
/// messages back; the `id` field of both correlates them.

mod concepts;
mod methods;
mod transaction;

pub use concepts::*;
pub use methods::*;
pub use transaction::*;

/// Fully qualified gRPC path of the bidirectional transaction stream
pub const TRANSACTION_PATH: &str = "/glink.protocol.GraphLink/transaction";
