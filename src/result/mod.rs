//! 结果模块：检测结果记录与输出格式
pub mod tech_stack;
pub mod report;

pub use self::tech_stack::TechStack;
pub use self::report::{JsonReporter, TextReporter};
