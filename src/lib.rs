//! NestScope - static analyzer for declared-but-unused NestJS module imports
//!
//! This crate analyzes a TypeScript source tree and reports, per `@Module`
//! declaration, the entries of its `imports:` array that none of the
//! module's own providers or controllers actually consume.

pub mod analysis;
pub mod owners;
pub mod parser;
pub mod report;
pub mod resolver;
pub mod runner;
