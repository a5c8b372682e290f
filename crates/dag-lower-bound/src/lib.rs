#![doc = include_str!("../README.md")]

pub mod config;
pub mod critical_path;
pub mod dag;
pub mod dag_stats;
pub mod error;
pub mod experiment;
pub mod lower_bound;
pub mod modcp;
pub mod parsers;
pub mod partition;
pub mod resource;
pub mod run_stats;
pub mod stages;
pub mod task;
pub mod total_work;
