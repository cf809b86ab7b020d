//! 规则模块：规则数据模型与内置规则表
pub mod model;
pub mod catalogue;

// 导出核心接口
pub use self::model::{
    Category, GroupSpec, MatchPolicy, Matcher, PatternSpec, Rule, RuleGroup, RuleSpec, Source, Stage,
};
pub use self::catalogue::{BUILTIN_GROUPS, RuleCatalogue};
