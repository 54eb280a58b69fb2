//! Certforge Render Engine
//!
//! Turns a template plus rows of data into finished certificate files.
//!
//! # Pipeline Architecture
//!
//! ```text
//! template.json ──┐
//!                 ├── Substitute {{variables}}
//! data row ───────┘         │
//!                           ├── Serialize SVG ──────────────┐
//!                           │                               │
//!                           ├── Render surface (resvg)      │
//!                           │        │ settle               │
//!                           │        ▼                      │
//!                           │     Capture (PNG, 2x)         │
//!                           │        │                      │
//!                           │        ├── PDF page (lopdf)   │
//!                           │        ▼                      ▼
//!                           └──► Name ──► Artifact set ──► Zip / files
//!                                                     │
//!                                                     └──► Email / remote save
//! ```

pub mod archive;
pub mod assets;
pub mod encode;
pub mod naming;
pub mod notify;
pub mod pipeline;
pub mod substitute;
pub mod surface;
pub mod svg;

pub use archive::*;
pub use encode::*;
pub use naming::*;
pub use notify::*;
pub use pipeline::*;
pub use substitute::*;
pub use surface::*;
