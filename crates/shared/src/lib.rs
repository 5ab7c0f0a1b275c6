//! 共享库
//!
//! 包含规则树引擎与宿主程序共用的配置、可观测性与测试工具代码。

pub mod config;
pub mod observability;
pub mod test_utils;
