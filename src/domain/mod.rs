mod ledger;
mod money;
mod party;
mod transaction;

pub use ledger::*;
pub use money::*;
pub use party::*;
pub use transaction::*;
