//! 图书馆文档搜索 MCP 服务核心库
//! 检索、关键词统计与图表数据生成，外加 stdio / HTTP 两种传输。

pub mod chart;
pub mod classifier;
pub mod config;
pub mod counter;
pub mod error;
pub mod format;
pub mod http;
pub mod mcp;
pub mod model;
pub mod parser;
pub mod query;
pub mod search;
pub mod session_store;
pub mod store;
pub mod tools;
