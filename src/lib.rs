pub mod config;
pub mod differ;
pub mod driver;
pub mod error;
pub mod filepair;
pub mod filespec;
pub mod format;
pub mod hash;
pub mod index;
pub mod path;
pub mod pipeline;
pub mod queue;
pub mod repository;
pub mod tempfile_glue;
pub mod textconv;
