pub mod order;
pub mod project;
pub mod purchase;
pub mod earnings;
pub mod withdrawal;
pub mod notification;
pub mod settlement;

pub use order::*;
pub use project::*;
pub use purchase::*;
pub use earnings::*;
pub use withdrawal::*;
pub use notification::*;
pub use settlement::*;
