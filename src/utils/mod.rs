//! 工具模块：Header/Cookie转换、URL校验
pub mod header_converter;
pub mod url_validator;

pub use self::header_converter::{Cookie, HeaderConverter};
pub use self::url_validator::{UrlValidator, ValidatedUrl};
