//! Per-source markup extraction modules. Each source declares its selector
//! strategy tables and exposes pure parse functions over decoded documents.

pub mod komiku;
pub mod winbu;
