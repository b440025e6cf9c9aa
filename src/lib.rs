//! ocrsnip: pick a screen region, save it for OCR.
//!
//! The overlay (`overlay`) shows a frozen snapshot and lets the user drag a
//! rectangle. `selection_logic` holds the drag state, `region` turns the drag
//! into the capture box, `capture` grabs and saves it, and `outcome` is what
//! the caller gets back. `pipeline` is the consumer side used by the
//! OCR/translation step.

pub mod capture;
pub mod config;
pub mod geometry;
pub mod magnifier;
pub mod outcome;
pub mod overlay;
pub mod pipeline;
pub mod quality;
pub mod region;
pub mod selection_logic;
pub mod session;
