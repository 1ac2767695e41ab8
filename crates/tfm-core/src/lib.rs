//! TFM Core - Audit lifecycle domain logic
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `AuditRecord`, `Owner`, `AuditSummary`, `AuditState`
//! - **Use cases** - `AuditLifecycleUseCase`, `SequenceGenerator`
//! - **Port definitions** - `IDocumentStore`, implemented by storage adapters
//! - **Configuration** - YAML configuration shared by the adapters and the CLI
//!
//! # Architecture
//!
//! The domain module contains pure business logic with no I/O.
//! Ports define trait interfaces that adapter crates implement.
//! Use cases orchestrate domain entities through port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
