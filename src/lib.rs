//! pyspack - PyPI to Spack recipe converter library
//!
//! This library provides the core functionality for converting PyPI
//! packages into Spack `package.py` recipes:
//! - Fetching release metadata from PyPI and build files from sdists
//! - Normalizing requirements, markers and build systems
//! - Compacting per-release requirements into conditioned clauses
//! - Rendering recipes and crawling dependencies within a budget

pub mod cli;
pub mod compact;
pub mod crawler;
pub mod domain;
pub mod error;
pub mod native;
pub mod normalize;
pub mod output;
pub mod parser;
pub mod progress;
pub mod recipe;
pub mod registry;
pub mod repository;
