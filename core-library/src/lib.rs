//! # Library Catalogue Module
//!
//! Describes the track collection the player navigates.
//!
//! ## Overview
//!
//! This module provides:
//! - [`TrackId`] and [`CatalogueEntry`] models
//! - The [`CatalogueProvider`] contract the player calls on every navigation
//!   decision
//! - [`InMemoryCatalogue`], a provider for hosts that keep the ordered list in
//!   memory (and for tests)
//!
//! Track persistence, metadata extraction and ordering UI live with the host.

pub mod catalogue;
pub mod error;
pub mod models;

pub use catalogue::{CatalogueProvider, InMemoryCatalogue};
pub use error::{LibraryError, Result};
pub use models::{CatalogueEntry, TrackId};
