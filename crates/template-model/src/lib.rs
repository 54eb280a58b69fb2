//! Certforge Template Model
//!
//! Defines the core data contracts for Certforge templates:
//! - **Elements:** Shapes, text, and images with position and paint
//! - **Document:** Title, declared variables, and z-ordered elements
//! - **History:** Linear undo/redo over whole snapshots
//! - **Editor:** Document mutations that record history
//! - **Data:** Tabular records and variable-to-column mappings
//! - **Store:** Template persistence
//!
//! Coordinates are canvas pixels. Radial shapes are positioned by their
//! centre, rectangular shapes, text, and images by their top-left corner.

pub mod data;
pub mod document;
pub mod editor;
pub mod element;
pub mod history;
pub mod store;

pub use data::*;
pub use document::*;
pub use editor::*;
pub use element::*;
pub use history::*;
pub use store::*;
