pub mod enums;
pub mod reminder;
pub mod adherence;
pub mod subscription;
pub mod alert;

pub use enums::*;
pub use reminder::*;
pub use adherence::*;
pub use subscription::*;
pub use alert::*;
