mod account;
mod batch;
mod referral;
mod transaction;

pub use account::*;
pub use batch::*;
pub use referral::*;
pub use transaction::*;
