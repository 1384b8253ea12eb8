//! 兑换服务数据模型

mod benefit;
mod claim;
mod code;
mod enums;

pub use benefit::*;
pub use claim::*;
pub use code::*;
pub use enums::*;
